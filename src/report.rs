//! LDM reporting over the current plan.
//!
//! LDM (Lademeter, linear meters) is the occupied length of the truck bed
//! along the long axis. A group's figure is the furthest far edge of any of
//! its placed pallets, in meters; the grand total takes the furthest far
//! edge over the whole bed. Unplaced pallets never contribute.

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::Pallet;

/// Centimeters per reported meter.
const CM_PER_METER: f64 = 100.0;

/// Occupied linear meters of one load group.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct GroupLdm {
    pub group_id: u32,
    /// Display color shared by the whole group.
    pub color: String,
    /// Placed pallets contributing to the figure.
    pub pallet_count: usize,
    /// Furthest far edge of the group along the long axis, in meters.
    pub ldm: f64,
}

/// Read-only summary consumed by the rendering layer.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct LdmSummary {
    /// One row per group with at least one placed pallet, ordered by group id.
    pub groups: Vec<GroupLdm>,
    /// Furthest far edge over all placed pallets, in meters.
    pub total_ldm: f64,
}

/// Computes the LDM summary from the pallet collection.
///
/// Groups without a single placed pallet are omitted entirely. Positions
/// are integer centimeters, so dividing by 100 loses nothing.
pub fn summarize(pallets: &[Pallet]) -> LdmSummary {
    // BTreeMap, damit die Zeilen nach Gruppen-Id sortiert bleiben.
    let mut by_group: BTreeMap<u32, (&'static str, usize, i32)> = BTreeMap::new();
    let mut total_extent = 0;

    for pallet in pallets.iter().filter(|p| p.placed) {
        let extent = pallet.max_extent();
        let entry = by_group
            .entry(pallet.group_id)
            .or_insert((pallet.color, 0, 0));
        entry.1 += 1;
        entry.2 = entry.2.max(extent);
        total_extent = total_extent.max(extent);
    }

    let groups = by_group
        .into_iter()
        .map(|(group_id, (color, pallet_count, extent))| GroupLdm {
            group_id,
            color: color.to_string(),
            pallet_count,
            ldm: f64::from(extent) / CM_PER_METER,
        })
        .collect();

    LdmSummary {
        groups,
        total_ldm: f64::from(total_extent) / CM_PER_METER,
    }
}
