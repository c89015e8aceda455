//! Post-hoc report on a computed layout.
//!
//! The shelf packer does not guarantee that very large snapshots fit: layers
//! keep stacking once the interior is full. The report makes that visible
//! instead of hiding it.

use serde::Serialize;
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::geometry::{intersects, respects_spacing, within_interior};
use crate::layout::{LayoutConfig, UsableInterior};
use crate::model::Placement;
use crate::types::{EPSILON_GENERAL, Extended};

/// Summary figures for one layout.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[schema(example = json!({
    "placements": 3,
    "layers": 1,
    "requested_volume": 24.5,
    "occupied_volume": 21.9,
    "interior_volume": 4608.0,
    "fill_ratio": 0.0047,
    "overflowing": [],
    "overlapping_pairs": 0,
    "crowded_pairs": 0
}))]
pub struct LayoutDiagnostics {
    pub placements: usize,
    pub layers: usize,
    /// Sum of all positive input volumes
    pub requested_volume: f64,
    /// Sum of the drawn box volumes
    pub occupied_volume: f64,
    pub interior_volume: f64,
    /// `occupied_volume / interior_volume`, 0 for an empty interior
    pub fill_ratio: f64,
    /// Categories whose box leaves the usable interior
    pub overflowing: Vec<String>,
    pub overlapping_pairs: usize,
    /// Pairs closer than the configured spacing
    pub crowded_pairs: usize,
}

impl LayoutDiagnostics {
    /// Audits a layout computed for `interior` with `config`.
    pub fn evaluate(
        placements: &[Placement<'_>],
        interior: &UsableInterior,
        config: &LayoutConfig,
    ) -> Self {
        let requested_volume: f64 = placements
            .iter()
            .map(|p| p.volume)
            .filter(|v| *v > 0.0)
            .sum();
        let occupied_volume: f64 = placements.iter().map(|p| p.volume()).sum();
        let interior_volume = interior.volume();
        let fill_ratio = if interior_volume > EPSILON_GENERAL {
            occupied_volume / interior_volume
        } else {
            0.0
        };

        let overflowing: Vec<String> = placements
            .iter()
            .filter(|p| !within_interior(p, interior))
            .map(|p| p.category.to_string())
            .collect();

        let mut overlapping_pairs = 0;
        let mut crowded_pairs = 0;
        for (idx, a) in placements.iter().enumerate() {
            for b in &placements[idx + 1..] {
                if intersects(a, b) {
                    overlapping_pairs += 1;
                } else if !respects_spacing(a, b, config.spacing) {
                    crowded_pairs += 1;
                }
            }
        }

        if !overflowing.is_empty() {
            tracing::warn!(
                count = overflowing.len(),
                categories = ?overflowing,
                "layout exceeds the usable interior"
            );
        }

        Self {
            placements: placements.len(),
            layers: count_layers(placements),
            requested_volume,
            occupied_volume,
            interior_volume,
            fill_ratio,
            overflowing,
            overlapping_pairs,
            crowded_pairs,
        }
    }

    /// True when every box is inside the interior and no two boxes collide.
    pub fn is_clean(&self) -> bool {
        self.overflowing.is_empty() && self.overlapping_pairs == 0
    }
}

/// Layers only ever move upward, so each rise of the floor starts a new one.
fn count_layers(placements: &[Placement<'_>]) -> usize {
    if placements.is_empty() {
        return 0;
    }
    1 + placements
        .windows(2)
        .filter(|pair| pair[1].min_corner().y > pair[0].min_corner().y + EPSILON_GENERAL)
        .count()
}
