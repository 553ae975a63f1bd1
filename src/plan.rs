//! The loading plan: one owned store for pallets, counters and the
//! active drag gesture.
//!
//! Every mutating operation of the planner runs through `LoadPlan`; there
//! is no module-level state, so independent plans (one per truck, one per
//! test) coexist without touching each other. The store is the single
//! source of truth - rendering layers only ever consume `snapshot()` and
//! never feed positions back in.

use serde::Serialize;
use utoipa::ToSchema;

use crate::drag::{self, DragState, Point};
use crate::geometry::Rect;
use crate::model::{BatchSpec, Pallet, TruckDims, group_color};
use crate::placement::{
    self, PlacementConfig, PlacementEvent, PlacementReport, UnplacedPallet, position_available,
};
use crate::report::{self, LdmSummary};

/// Fehler der Plan-Operationen; keiner davon verändert den Bestand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    UnknownGroup(u32),
    UnknownPallet(u32),
    NotPlaced(u32),
    RotationInfeasible(u32),
    DragInProgress,
    NoActiveDrag,
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::UnknownGroup(id) => write!(f, "Unknown group: {}", id),
            PlanError::UnknownPallet(id) => write!(f, "Unknown pallet: {}", id),
            PlanError::NotPlaced(id) => write!(f, "Pallet {} has no position on the bed", id),
            PlanError::RotationInfeasible(id) => {
                write!(f, "Pallet {} cannot be rotated in the current layout", id)
            }
            PlanError::DragInProgress => write!(f, "Another drag gesture is already active"),
            PlanError::NoActiveDrag => write!(f, "No drag gesture is active"),
        }
    }
}

impl std::error::Error for PlanError {}

/// Wire view of one placed pallet.
///
/// Dimensions are the EFFECTIVE ones (rotation already applied), so the
/// rendering layer can draw the rectangle without knowing about rotation.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PalletView {
    pub id: u32,
    pub group_id: u32,
    pub color: String,
    pub width: i32,
    pub length: i32,
    pub x: i32,
    pub y: i32,
    pub rotated: bool,
}

impl From<&Pallet> for PalletView {
    fn from(p: &Pallet) -> Self {
        Self {
            id: p.id,
            group_id: p.group_id,
            color: p.color.to_string(),
            width: p.effective_width(),
            length: p.effective_length(),
            x: p.x,
            y: p.y,
            rotated: p.rotated,
        }
    }
}

/// Read-only projection of the whole plan for rendering.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PlanSnapshot {
    /// Truck bed envelope in cm.
    pub truck: TruckDims,
    /// All currently placed pallets.
    pub pallets: Vec<PalletView>,
    /// Pallets waiting for free space.
    pub unplaced: Vec<UnplacedPallet>,
    /// Per-group and total linear meters.
    pub ldm: LdmSummary,
}

/// Owned store for one truck loading plan.
///
/// Pallet ids count from 0, group ids from 1; both are monotonically
/// increasing and only `clear()` resets them. Colors rotate through the
/// palette in group creation order.
#[derive(Debug)]
pub struct LoadPlan {
    pallets: Vec<Pallet>,
    next_pallet_id: u32,
    next_group_id: u32,
    color_index: usize,
    config: PlacementConfig,
    drag: Option<DragState>,
}

impl Default for LoadPlan {
    fn default() -> Self {
        Self::new(PlacementConfig::default())
    }
}

impl LoadPlan {
    pub fn new(config: PlacementConfig) -> Self {
        Self {
            pallets: Vec::new(),
            next_pallet_id: 0,
            next_group_id: 1,
            color_index: 0,
            config,
            drag: None,
        }
    }

    pub fn pallets(&self) -> &[Pallet] {
        &self.pallets
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    fn index_of(&self, pallet_id: u32) -> Option<usize> {
        self.pallets.iter().position(|p| p.id == pallet_id)
    }

    /// Creates a load group from a validated batch spec and runs the
    /// placement pass.
    ///
    /// The pass also retries pallets from earlier groups that are still
    /// waiting for space. Already placed pallets are never moved.
    ///
    /// # Returns
    /// The new group id and the report of the placement pass
    pub fn add_group(&mut self, spec: BatchSpec) -> (u32, PlacementReport) {
        self.add_group_with_progress(spec, None, |_| {})
    }

    /// Wie `add_group`, meldet aber jeden Schritt über den Callback
    /// (Gruppenanlage, jede Platzierung, Abschluss). `allow_rotation`
    /// überschreibt die konfigurierte Drehungserlaubnis nur für diesen
    /// einen Lauf, einschließlich der erneut versuchten Altbestände.
    pub fn add_group_with_progress(
        &mut self,
        spec: BatchSpec,
        allow_rotation: Option<bool>,
        mut on_event: impl FnMut(&PlacementEvent),
    ) -> (u32, PlacementReport) {
        let group_id = self.next_group_id;
        self.next_group_id += 1;
        let color = group_color(self.color_index);
        self.color_index += 1;

        on_event(&PlacementEvent::GroupAdded {
            group_id,
            color: color.to_string(),
            quantity: spec.quantity,
        });

        for _ in 0..spec.quantity {
            let pallet = Pallet::new(self.next_pallet_id, group_id, &spec, color);
            self.next_pallet_id += 1;
            self.pallets.push(pallet);
        }

        let mut config = self.config;
        if let Some(allow) = allow_rotation {
            config.allow_rotation = allow;
        }
        let report = placement::place_unplaced_with_progress(&mut self.pallets, &config, on_event);
        (group_id, report)
    }

    /// Removes a whole load group and retries placement of any pallets
    /// still waiting, now that space may have been freed.
    pub fn remove_group(&mut self, group_id: u32) -> Result<PlacementReport, PlanError> {
        if !self.pallets.iter().any(|p| p.group_id == group_id) {
            return Err(PlanError::UnknownGroup(group_id));
        }
        self.pallets.retain(|p| p.group_id != group_id);

        // A gesture on a removed pallet ends with the group.
        if let Some(state) = self.drag {
            if self.index_of(state.pallet_id).is_none() {
                self.drag = None;
            }
        }

        Ok(placement::place_unplaced(&mut self.pallets, &self.config))
    }

    /// Empties the plan and resets all counters to their initial values.
    pub fn clear(&mut self) {
        self.pallets.clear();
        self.next_pallet_id = 0;
        self.next_group_id = 1;
        self.color_index = 0;
        self.drag = None;
    }

    /// Toggles the rotation of a placed pallet.
    ///
    /// The current origin is tried first, so a pallet that fits where it
    /// stands does not jump. Otherwise the first-fit search looks for a
    /// new position for the swapped footprint. On failure nothing
    /// changes.
    pub fn rotate_pallet(&mut self, pallet_id: u32) -> Result<(), PlanError> {
        let idx = self
            .index_of(pallet_id)
            .ok_or(PlanError::UnknownPallet(pallet_id))?;
        if !self.pallets[idx].placed {
            return Err(PlanError::NotPlaced(pallet_id));
        }

        let pallet = &self.pallets[idx];
        // Maße nach dem Umschalten: das aktuelle effektive Paar, getauscht.
        let new_width = pallet.effective_length();
        let new_length = pallet.effective_width();
        let truck = self.config.truck;
        if new_width > truck.width || new_length > truck.length {
            return Err(PlanError::RotationInfeasible(pallet_id));
        }

        let in_place = Rect::new(pallet.x, pallet.y, new_length, new_width);
        let target = if position_available(&in_place, pallet_id, &self.pallets, &truck) {
            Some((pallet.x, pallet.y))
        } else {
            placement::find_fit(new_width, new_length, pallet_id, &self.pallets, &self.config)
        };

        match target {
            Some((x, y)) => {
                let pallet = &mut self.pallets[idx];
                pallet.rotated = !pallet.rotated;
                pallet.x = x;
                pallet.y = y;
                Ok(())
            }
            None => Err(PlanError::RotationInfeasible(pallet_id)),
        }
    }

    /// Starts a drag gesture on a placed pallet.
    ///
    /// Only one gesture can be active at a time.
    ///
    /// # Returns
    /// The pallet's current position
    pub fn drag_start(&mut self, pallet_id: u32, pointer: Point) -> Result<Point, PlanError> {
        if self.drag.is_some() {
            return Err(PlanError::DragInProgress);
        }
        let pallet = self
            .pallets
            .iter()
            .find(|p| p.id == pallet_id)
            .ok_or(PlanError::UnknownPallet(pallet_id))?;
        if !pallet.placed {
            return Err(PlanError::NotPlaced(pallet_id));
        }

        let state = DragState::begin(pallet, pointer);
        let position = Point::new(pallet.x, pallet.y);
        self.drag = Some(state);
        Ok(position)
    }

    /// Resolves one pointer movement of the active gesture and commits
    /// the resulting live position.
    pub fn drag_move(&mut self, pointer: Point) -> Result<Point, PlanError> {
        let state = self.drag.ok_or(PlanError::NoActiveDrag)?;
        let idx = self
            .index_of(state.pallet_id)
            .ok_or(PlanError::NoActiveDrag)?;

        let position = drag::resolve_target(
            &self.pallets[idx],
            state.raw_target(pointer),
            &self.pallets,
            &self.config.truck,
        );
        let pallet = &mut self.pallets[idx];
        pallet.x = position.x;
        pallet.y = position.y;
        Ok(position)
    }

    /// Ends the active gesture.
    ///
    /// The last committed live position is already valid, so it simply
    /// becomes final.
    pub fn drag_end(&mut self) -> Result<Point, PlanError> {
        let state = self.drag.take().ok_or(PlanError::NoActiveDrag)?;
        let pallet = self
            .pallets
            .iter()
            .find(|p| p.id == state.pallet_id)
            .ok_or(PlanError::NoActiveDrag)?;
        Ok(Point::new(pallet.x, pallet.y))
    }

    /// Projects the plan into its wire form.
    pub fn snapshot(&self) -> PlanSnapshot {
        let pallets = self
            .pallets
            .iter()
            .filter(|p| p.placed)
            .map(PalletView::from)
            .collect();
        let unplaced = self
            .pallets
            .iter()
            .filter(|p| !p.placed)
            .map(|p| UnplacedPallet {
                id: p.id,
                group_id: p.group_id,
            })
            .collect();

        PlanSnapshot {
            truck: self.config.truck,
            pallets,
            unplaced,
            ldm: report::summarize(&self.pallets),
        }
    }
}
