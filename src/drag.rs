//! Interactive repositioning of placed pallets ("snap to stop").
//!
//! A drag gesture never holds an invalid intermediate state: every move
//! event resolves the raw pointer target into a position that is inside
//! the truck and free of overlaps BEFORE it is committed. The resolution
//! order is fixed:
//!
//! 1. clamp the raw target to the truck bounds,
//! 2. push the target back along the dominant axis of motion until it
//!    sits flush against the nearest obstruction,
//! 3. clamp again (a stop adjustment near a wall must not shove the
//!    pallet back out of the bed).
//!
//! Both clamp passes are mandatory. A final predicate check backs the
//! whole pipeline: if a pocket of obstacles leaves no valid outcome, the
//! move resolves to the last committed position and the pallet stalls.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::geometry;
use crate::model::{Pallet, TruckDims};
use crate::placement::position_available;

/// A point in truck coordinates (integer centimeters).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// State of the single active drag gesture.
///
/// The grab offset is fixed at drag start (pointer minus pallet origin),
/// so the pallet does not jump under the pointer. The pallet's own `x`/`y`
/// always hold the last committed - and therefore valid - position; no
/// separate shadow position is kept.
#[derive(Clone, Copy, Debug)]
pub struct DragState {
    pub pallet_id: u32,
    grab_dx: i32,
    grab_dy: i32,
}

impl DragState {
    /// Starts a gesture for `pallet` grabbed at `pointer`.
    ///
    /// Pointer coordinates arrive unchecked from the client, so the
    /// offset arithmetic saturates.
    pub fn begin(pallet: &Pallet, pointer: Point) -> Self {
        Self {
            pallet_id: pallet.id,
            grab_dx: pointer.x.saturating_sub(pallet.x),
            grab_dy: pointer.y.saturating_sub(pallet.y),
        }
    }

    /// Translates a pointer position into the raw drag target
    /// (pointer minus the grab offset, saturating).
    #[inline]
    pub fn raw_target(&self, pointer: Point) -> Point {
        Point::new(
            pointer.x.saturating_sub(self.grab_dx),
            pointer.y.saturating_sub(self.grab_dy),
        )
    }
}

/// Resolves a raw drag target into the next valid live position.
///
/// `pallet` must be the pallet being dragged; its current `x`/`y` are the
/// last committed position and define the dominant axis of the attempted
/// motion (|Δx| vs |Δy|, ties go to the horizontal axis). All other placed
/// pallets act as obstructions.
///
/// # Returns
/// The corrected position; equal to the last committed position when the
/// target cannot be reached at all.
pub fn resolve_target(
    pallet: &Pallet,
    raw: Point,
    pallets: &[Pallet],
    truck: &TruckDims,
) -> Point {
    let eff_length = pallet.effective_length();
    let eff_width = pallet.effective_width();

    // 1. Erste Begrenzung auf die Ladefläche.
    let (mut cx, mut cy) =
        geometry::clamp_origin(raw.x, raw.y, eff_length, eff_width, truck.length, truck.width);

    let dx = cx - pallet.x;
    let dy = cy - pallet.y;
    let horizontal = dx.abs() >= dy.abs();

    // 2. Snap to stop: push back along the dominant axis, flush against
    // each obstruction the candidate still overlaps. The push never goes
    // past the last committed coordinate - a stop cannot move the pallet
    // backwards through geometry it already cleared.
    for other in pallets {
        if !other.placed || other.id == pallet.id {
            continue;
        }
        let candidate = pallet.rect_at(cx, cy);
        let obstruction = other.rect();
        if !geometry::overlaps(&candidate, &obstruction) {
            continue;
        }

        if horizontal {
            if dx > 0 {
                cx = (obstruction.x - eff_length).max(pallet.x);
            } else if dx < 0 {
                cx = obstruction.right().min(pallet.x);
            }
        } else if dy > 0 {
            cy = (obstruction.y - eff_width).max(pallet.y);
        } else if dy < 0 {
            cy = obstruction.bottom().min(pallet.y);
        }
    }

    // 3. Second bounds pass, mandatory.
    let (cx, cy) =
        geometry::clamp_origin(cx, cy, eff_length, eff_width, truck.length, truck.width);

    // Final validity check; pocket geometries resolve to a stall.
    let resolved = pallet.rect_at(cx, cy);
    if position_available(&resolved, pallet.id, pallets, truck) {
        Point::new(cx, cy)
    } else {
        Point::new(pallet.x, pallet.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BatchSpec, GROUP_COLORS};

    fn truck() -> TruckDims {
        TruckDims::default()
    }

    fn placed(id: u32, width: i32, length: i32, x: i32, y: i32) -> Pallet {
        let spec = BatchSpec::new(width, length, 1, &truck()).unwrap();
        let mut p = Pallet::new(id, 1, &spec, GROUP_COLORS[0]);
        p.x = x;
        p.y = y;
        p.placed = true;
        p
    }

    fn assert_valid(pallet: &Pallet, others: &[Pallet]) {
        let t = truck();
        assert!(geometry::in_bounds(&pallet.rect(), t.length, t.width));
        for other in others {
            if other.placed && other.id != pallet.id {
                assert!(
                    !geometry::overlaps(&pallet.rect(), &other.rect()),
                    "pallet {} overlaps pallet {}",
                    pallet.id,
                    other.id
                );
            }
        }
    }

    #[test]
    fn free_move_reaches_the_target() {
        let dragged = placed(0, 80, 120, 100, 50);
        let pallets = vec![dragged.clone()];

        let pos = resolve_target(&dragged, Point::new(400, 90), &pallets, &truck());
        assert_eq!(pos, Point::new(400, 90));
    }

    #[test]
    fn target_beyond_the_walls_is_clamped() {
        let dragged = placed(0, 80, 120, 100, 50);
        let pallets = vec![dragged.clone()];

        let pos = resolve_target(&dragged, Point::new(5000, -40), &pallets, &truck());
        assert_eq!(pos, Point::new(1360 - 120, 0));
    }

    #[test]
    fn moving_right_stops_flush_at_the_obstruction() {
        let dragged = placed(0, 80, 120, 100, 0);
        let wall = placed(1, 80, 120, 400, 0);
        let pallets = vec![dragged.clone(), wall];

        let pos = resolve_target(&dragged, Point::new(350, 0), &pallets, &truck());
        // Flush: right edge of the dragged pallet == left edge of the wall.
        assert_eq!(pos, Point::new(280, 0));
    }

    #[test]
    fn moving_left_stops_flush_at_the_obstruction() {
        let dragged = placed(0, 80, 120, 500, 0);
        let wall = placed(1, 80, 120, 100, 0);
        let pallets = vec![dragged.clone(), wall];

        let pos = resolve_target(&dragged, Point::new(150, 0), &pallets, &truck());
        assert_eq!(pos, Point::new(220, 0));
    }

    #[test]
    fn vertical_motion_stops_flush_as_well() {
        let dragged = placed(0, 80, 120, 0, 0);
        let below = placed(1, 80, 120, 0, 140);
        let pallets = vec![dragged.clone(), below];

        let down = resolve_target(&dragged, Point::new(0, 120), &pallets, &truck());
        assert_eq!(down, Point::new(0, 60));

        let dragged_low = placed(0, 80, 120, 0, 160);
        let above = placed(1, 80, 120, 0, 20);
        let pallets = vec![dragged_low.clone(), above];
        let up = resolve_target(&dragged_low, Point::new(0, 60), &pallets, &truck());
        assert_eq!(up, Point::new(0, 100));
    }

    #[test]
    fn axis_tie_resolves_along_the_horizontal_axis() {
        // |Δx| == |Δy|: the horizontal axis wins the tie. The stop pushes
        // flush along x while the vertical part of the target survives.
        let dragged = placed(0, 100, 100, 0, 0);
        let wall = placed(1, 100, 100, 140, 0);
        let pallets = vec![dragged.clone(), wall];

        let pos = resolve_target(&dragged, Point::new(60, 60), &pallets, &truck());
        assert_eq!(pos, Point::new(40, 60));
    }

    #[test]
    fn stop_near_a_wall_stays_inside_the_truck() {
        // Obstruction flush with the right wall across the full width; the
        // re-clamp after the stop adjustment must never leave the bed.
        let dragged = placed(0, 80, 200, 900, 0);
        let wall = placed(1, 244, 160, 1200, 0);
        let pallets = vec![dragged.clone(), wall.clone()];

        let pos = resolve_target(&dragged, Point::new(1250, 0), &pallets, &truck());
        assert_eq!(pos, Point::new(1000, 0));

        let mut moved = dragged.clone();
        moved.x = pos.x;
        moved.y = pos.y;
        assert_valid(&moved, &pallets);
    }

    #[test]
    fn blocked_pocket_resolves_to_the_committed_position() {
        // The stop adjustment against the far obstruction lands the
        // candidate on a second, offset obstruction. No valid stop exists
        // for this target, so the move resolves to the committed position.
        let dragged = placed(0, 100, 100, 0, 0);
        let near = placed(1, 100, 100, 150, 50);
        let far = placed(2, 100, 100, 300, 0);
        let pallets = vec![dragged.clone(), near, far];

        let pos = resolve_target(&dragged, Point::new(250, 40), &pallets, &truck());
        assert_eq!(pos, Point::new(0, 0));
    }

    #[test]
    fn scripted_drag_sequence_holds_the_invariants_after_every_event() {
        let mut dragged = placed(0, 100, 120, 0, 0);
        let others = vec![
            placed(1, 100, 120, 400, 0),
            placed(2, 100, 120, 400, 100),
            placed(3, 244, 100, 800, 0),
        ];
        let mut all = others.clone();
        all.push(dragged.clone());

        let state = DragState::begin(&dragged, Point::new(10, 10));
        let script = [
            (60, 10),
            (160, 30),
            (320, 40),
            (520, 40),
            (760, 80),
            (1300, 120),
            (900, 260),
            (420, 200),
            (-50, -50),
        ];

        for (px, py) in script {
            let raw = state.raw_target(Point::new(px, py));
            let pos = resolve_target(&dragged, raw, &all, &truck());
            dragged.x = pos.x;
            dragged.y = pos.y;
            // Mirror the commit into the collection view.
            if let Some(slot) = all.iter_mut().find(|p| p.id == dragged.id) {
                slot.x = pos.x;
                slot.y = pos.y;
            }
            assert_valid(&dragged, &others);
        }
    }

    #[test]
    fn grab_offset_keeps_the_pallet_under_the_pointer() {
        let dragged = placed(0, 80, 120, 200, 40);
        let state = DragState::begin(&dragged, Point::new(230, 60));

        // Pointer moved +100/+20 -> raw target moves the same amount.
        assert_eq!(state.raw_target(Point::new(330, 80)), Point::new(300, 60));
    }

    #[test]
    fn extreme_pointer_coordinates_resolve_inside_the_truck() {
        // Clients may send any i32 pointer value; the grab arithmetic
        // saturates and the clamp passes keep the result on the bed.
        let dragged = placed(0, 80, 120, 100, 50);
        let pallets = vec![dragged.clone()];

        let state = DragState::begin(&dragged, Point::new(i32::MAX, i32::MAX));
        let raw = state.raw_target(Point::new(i32::MIN, i32::MIN));
        let pos = resolve_target(&dragged, raw, &pallets, &truck());
        assert_eq!(pos, Point::new(0, 0));

        let state = DragState::begin(&dragged, Point::new(i32::MIN, i32::MIN));
        let raw = state.raw_target(Point::new(i32::MAX, i32::MAX));
        let pos = resolve_target(&dragged, raw, &pallets, &truck());
        assert_eq!(pos, Point::new(1360 - 120, 244 - 80));
    }
}
