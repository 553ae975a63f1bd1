//! Data models for the truck loading plan.
//!
//! This module defines the fundamental data structures of the planner:
//! - `Pallet`: One pallet with identity, group, dimensions and live position
//! - `TruckDims`: The fixed envelope of the truck bed
//! - `BatchSpec`: A validated request to create one load group
//!
//! All coordinates and dimensions are integer centimeters. A pallet's
//! `length` runs along the truck's long axis (x), its `width` along the
//! short axis (y); the `rotated` flag swaps the effective pair.

use crate::geometry::Rect;

/// Validation error for batch input.
#[derive(Debug, Clone)]
pub enum ValidationError {
    InvalidDimension(String),
    InvalidQuantity(String),
    ExceedsTruck(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidDimension(msg) => write!(f, "Invalid dimension: {}", msg),
            ValidationError::InvalidQuantity(msg) => write!(f, "Invalid quantity: {}", msg),
            ValidationError::ExceedsTruck(msg) => write!(f, "Pallet does not fit the truck: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Helper function to validate a single dimension (DRY principle).
fn validate_dimension(value: i32, name: &str) -> Result<(), ValidationError> {
    if value <= 0 {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// Group colors from the classic palette, assigned round-robin per group.
pub const GROUP_COLORS: [&str; 10] = [
    "#4a90e2", "#2ecc71", "#f39c12", "#9b59b6", "#e74c3c", "#1abc9c", "#3498db", "#f1c40f",
    "#95a5a6", "#d35400",
];

/// Returns the color for the given rotating color index.
#[inline]
pub fn group_color(color_index: usize) -> &'static str {
    GROUP_COLORS[color_index % GROUP_COLORS.len()]
}

/// The fixed truck bed envelope.
///
/// Defaults to a standard 13.6 m trailer: 1360 cm along the long axis,
/// 244 cm across. Configuration values, not protocol (they can be
/// overridden through the environment, see `config`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
pub struct TruckDims {
    /// Long axis (x) extent in cm.
    pub length: i32,
    /// Short axis (y) extent in cm.
    pub width: i32,
}

impl TruckDims {
    pub const DEFAULT_LENGTH_CM: i32 = 1360;
    pub const DEFAULT_WIDTH_CM: i32 = 244;

    /// Creates a truck envelope from explicit extents.
    #[inline]
    pub const fn new(length: i32, width: i32) -> Self {
        Self { length, width }
    }
}

impl Default for TruckDims {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LENGTH_CM, Self::DEFAULT_WIDTH_CM)
    }
}

/// A validated request to create one load group.
///
/// # Fields
/// * `width` - Pallet width in cm (short axis, must fit `truck.width`)
/// * `length` - Pallet length in cm (long axis, must fit `truck.length`)
/// * `quantity` - Number of identical pallets in the batch
#[derive(Clone, Copy, Debug)]
pub struct BatchSpec {
    pub width: i32,
    pub length: i32,
    pub quantity: i32,
}

impl BatchSpec {
    /// Creates a batch spec after validating it against the truck envelope.
    ///
    /// Rejects non-positive values and pallets that would not fit the
    /// truck even on their own; nothing is created in that case.
    ///
    /// # Returns
    /// `Ok(BatchSpec)` for valid values, otherwise `Err(ValidationError)`
    pub fn new(
        width: i32,
        length: i32,
        quantity: i32,
        truck: &TruckDims,
    ) -> Result<Self, ValidationError> {
        validate_dimension(width, "Width")?;
        validate_dimension(length, "Length")?;
        if quantity <= 0 {
            return Err(ValidationError::InvalidQuantity(format!(
                "Quantity must be positive, got: {}",
                quantity
            )));
        }
        if width > truck.width || length > truck.length {
            return Err(ValidationError::ExceedsTruck(format!(
                "pallet {}x{} cm exceeds the {}x{} cm bed",
                length, width, truck.length, truck.width
            )));
        }
        Ok(Self {
            width,
            length,
            quantity,
        })
    }
}

/// One pallet in the loading plan.
///
/// Identity fields (`id`, `group_id`, `color`, nominal dimensions) never
/// change after creation; `x`, `y`, `rotated` and `placed` mutate through
/// placement and interactive repositioning.
///
/// # Fields
/// * `id` - Unique, monotonically assigned pallet id
/// * `group_id` - The load group this pallet was created with
/// * `width` / `length` - Nominal dimensions in cm
/// * `color` - Display color shared by the whole group
/// * `x` / `y` - Current top-left origin in truck coordinates
/// * `rotated` - Swaps the effective width/length when set
/// * `placed` - Whether the pallet currently holds a valid position
#[derive(Clone, Debug)]
pub struct Pallet {
    pub id: u32,
    pub group_id: u32,
    pub width: i32,
    pub length: i32,
    pub color: &'static str,
    pub x: i32,
    pub y: i32,
    pub rotated: bool,
    pub placed: bool,
}

impl Pallet {
    /// Creates a fresh, unplaced pallet at the origin.
    pub fn new(id: u32, group_id: u32, spec: &BatchSpec, color: &'static str) -> Self {
        Self {
            id,
            group_id,
            width: spec.width,
            length: spec.length,
            color,
            x: 0,
            y: 0,
            rotated: false,
            placed: false,
        }
    }

    /// Extent along the short axis (y), accounting for rotation.
    #[inline]
    pub fn effective_width(&self) -> i32 {
        if self.rotated { self.length } else { self.width }
    }

    /// Extent along the long axis (x), accounting for rotation.
    #[inline]
    pub fn effective_length(&self) -> i32 {
        if self.rotated { self.width } else { self.length }
    }

    /// Bounding rectangle at the pallet's current position.
    #[inline]
    pub fn rect(&self) -> Rect {
        self.rect_at(self.x, self.y)
    }

    /// Bounding rectangle as if the pallet sat at `(x, y)`.
    ///
    /// Used to test candidate positions without mutating the pallet.
    #[inline]
    pub fn rect_at(&self, x: i32, y: i32) -> Rect {
        Rect::new(x, y, self.effective_length(), self.effective_width())
    }

    /// Far edge along the long axis; the pallet's contribution to LDM.
    #[inline]
    pub fn max_extent(&self) -> i32 {
        self.x + self.effective_length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn truck() -> TruckDims {
        TruckDims::default()
    }

    #[test]
    fn batch_spec_accepts_valid_input() {
        let spec = BatchSpec::new(120, 80, 3, &truck()).unwrap();
        assert_eq!(spec.width, 120);
        assert_eq!(spec.length, 80);
        assert_eq!(spec.quantity, 3);
    }

    #[test]
    fn batch_spec_rejects_non_positive_values() {
        assert!(matches!(
            BatchSpec::new(0, 80, 3, &truck()),
            Err(ValidationError::InvalidDimension(_))
        ));
        assert!(matches!(
            BatchSpec::new(120, -5, 3, &truck()),
            Err(ValidationError::InvalidDimension(_))
        ));
        assert!(matches!(
            BatchSpec::new(120, 80, 0, &truck()),
            Err(ValidationError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn batch_spec_rejects_pallet_wider_than_bed() {
        assert!(matches!(
            BatchSpec::new(250, 80, 1, &truck()),
            Err(ValidationError::ExceedsTruck(_))
        ));
        assert!(matches!(
            BatchSpec::new(120, 1400, 1, &truck()),
            Err(ValidationError::ExceedsTruck(_))
        ));
    }

    #[test]
    fn rotation_swaps_effective_dimensions() {
        let spec = BatchSpec::new(100, 120, 1, &truck()).unwrap();
        let mut pallet = Pallet::new(0, 1, &spec, GROUP_COLORS[0]);

        assert_eq!(pallet.effective_width(), 100);
        assert_eq!(pallet.effective_length(), 120);

        pallet.rotated = true;
        assert_eq!(pallet.effective_width(), 120);
        assert_eq!(pallet.effective_length(), 100);

        let r = pallet.rect_at(10, 20);
        assert_eq!(r, Rect::new(10, 20, 100, 120));
    }

    #[test]
    fn group_colors_cycle_after_palette_is_exhausted() {
        assert_eq!(group_color(0), GROUP_COLORS[0]);
        assert_eq!(group_color(9), GROUP_COLORS[9]);
        assert_eq!(group_color(10), GROUP_COLORS[0]);
        assert_eq!(group_color(23), GROUP_COLORS[3]);
    }
}
