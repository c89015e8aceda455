//! Shelf-packing layout engine for the warehouse occupancy view.
//!
//! Turns a snapshot of category volumes into non-overlapping boxes inside the
//! usable interior of a warehouse:
//! - categories are processed largest volume first (stable for ties)
//! - each box is sized from the cube root of its volume, capped per axis
//! - boxes fill a row along X, rows fill a layer along Z, layers stack along Y
//!
//! The engine never fails. Degenerate input is clamped to a minimum visible
//! box instead of being rejected.

use std::cmp::Ordering;

use serde::Serialize;

use crate::model::{CategoryVolume, Placement, WarehouseBounds};
use crate::types::{BoundingBox, Vec3};

/// Tunables for the layout engine.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LayoutConfig {
    /// Share of the warehouse length and width available for boxes
    pub horizontal_margin_ratio: f64,
    /// Share of the warehouse height available for boxes
    pub vertical_margin_ratio: f64,
    /// Gap kept between neighbouring boxes and between boxes and the interior edges
    pub spacing: f64,
    /// Lower limit for every box dimension
    pub min_visible_size: f64,
    /// A single box may take at most `1 / footprint_divisor` of the interior length or width
    pub footprint_divisor: f64,
}

impl LayoutConfig {
    pub const DEFAULT_HORIZONTAL_MARGIN_RATIO: f64 = 0.9;
    pub const DEFAULT_VERTICAL_MARGIN_RATIO: f64 = 0.8;
    pub const DEFAULT_SPACING: f64 = 0.1;
    pub const DEFAULT_MIN_VISIBLE_SIZE: f64 = 0.1;
    pub const DEFAULT_FOOTPRINT_DIVISOR: f64 = 4.0;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> LayoutConfigBuilder {
        LayoutConfigBuilder::default()
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            horizontal_margin_ratio: Self::DEFAULT_HORIZONTAL_MARGIN_RATIO,
            vertical_margin_ratio: Self::DEFAULT_VERTICAL_MARGIN_RATIO,
            spacing: Self::DEFAULT_SPACING,
            min_visible_size: Self::DEFAULT_MIN_VISIBLE_SIZE,
            footprint_divisor: Self::DEFAULT_FOOTPRINT_DIVISOR,
        }
    }
}

/// Builder for `LayoutConfig`.
#[derive(Clone, Debug, Default)]
pub struct LayoutConfigBuilder {
    config: LayoutConfig,
}

impl LayoutConfigBuilder {
    pub fn horizontal_margin_ratio(mut self, ratio: f64) -> Self {
        self.config.horizontal_margin_ratio = ratio;
        self
    }

    pub fn vertical_margin_ratio(mut self, ratio: f64) -> Self {
        self.config.vertical_margin_ratio = ratio;
        self
    }

    pub fn spacing(mut self, spacing: f64) -> Self {
        self.config.spacing = spacing;
        self
    }

    pub fn min_visible_size(mut self, size: f64) -> Self {
        self.config.min_visible_size = size;
        self
    }

    pub fn footprint_divisor(mut self, divisor: f64) -> Self {
        self.config.footprint_divisor = divisor;
        self
    }

    pub fn build(self) -> LayoutConfig {
        self.config
    }
}

/// The region of the warehouse boxes are laid out in.
///
/// Horizontally it is the warehouse footprint shrunk by the horizontal margin
/// and centered on the origin. Vertically it starts one spacing above the
/// floor and reaches the shrunk height from there.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UsableInterior {
    pub min: Vec3,
    pub max: Vec3,
}

impl UsableInterior {
    /// Derives the interior from raw warehouse bounds.
    ///
    /// Non-positive or non-finite bound components collapse to zero extent.
    pub fn from_bounds(bounds: &WarehouseBounds, config: &LayoutConfig) -> Self {
        let length = sanitize_bound(bounds.length) * config.horizontal_margin_ratio;
        let width = sanitize_bound(bounds.width) * config.horizontal_margin_ratio;
        let height = sanitize_bound(bounds.height) * config.vertical_margin_ratio;

        Self {
            min: Vec3::new(-length / 2.0, config.spacing, -width / 2.0),
            max: Vec3::new(length / 2.0, config.spacing + height, width / 2.0),
        }
    }

    /// Usable size as (length, height, width).
    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.min, self.max)
    }

    pub fn volume(&self) -> f64 {
        self.extent().volume()
    }
}

fn sanitize_bound(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Volume used for sizing: NaN and non-positive volumes size like an empty category.
fn sizing_volume(volume: f64) -> f64 {
    if volume > 0.0 { volume } else { 0.0 }
}

/// Volume used for ordering: NaN ranks like zero.
fn ordering_volume(volume: f64) -> f64 {
    if volume.is_nan() { 0.0 } else { volume }
}

/// Derives the box size for one category as (length, height, width).
///
/// Height follows the cube root of the volume and is capped by the usable
/// height. Width and length share the remaining volume and are each capped
/// at a fraction of the interior. Each dimension is floored at the minimum
/// visible size before it is used as a divisor.
///
/// # Examples
/// ```
/// use warehouse_layout::layout::{box_extent, LayoutConfig, UsableInterior};
/// use warehouse_layout::model::WarehouseBounds;
///
/// let config = LayoutConfig::default();
/// let bounds = WarehouseBounds::new(10.0, 10.0, 2.0).unwrap();
/// let interior = UsableInterior::from_bounds(&bounds, &config);
///
/// let extent = box_extent(8.0, &interior, &config);
/// assert!((extent.y - 1.6).abs() < 1e-9);
/// assert!((extent.z - 5.0_f64.sqrt()).abs() < 1e-9);
/// ```
pub fn box_extent(volume: f64, interior: &UsableInterior, config: &LayoutConfig) -> Vec3 {
    let volume = sizing_volume(volume);
    let usable = interior.extent();
    let floor = config.min_visible_size;

    let height = volume.cbrt().min(usable.y).max(floor);
    let width = (volume / height)
        .sqrt()
        .min(usable.z / config.footprint_divisor)
        .max(floor);
    let length = (volume / (height * width))
        .min(usable.x / config.footprint_divisor)
        .max(floor);

    Vec3::new(length, height, width)
}

/// Events reported while the layout is built, for live visualization.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum LayoutEvent<'a> {
    /// The cursor moved up to a new layer.
    LayerStarted { layer: usize, floor: f64 },
    /// The cursor moved forward to a new row within the current layer.
    RowStarted { layer: usize, row: usize, z: f64 },
    /// A box was emitted.
    CategoryPlaced {
        index: usize,
        layer: usize,
        row: usize,
        category: &'a str,
        center: (f64, f64, f64),
        extent: (f64, f64, f64),
        volume: f64,
    },
    /// All categories were processed.
    Finished { placements: usize, layers: usize },
}

/// Packing cursor threaded through the fold over sorted categories.
struct ShelfCursor<'a> {
    interior: UsableInterior,
    config: LayoutConfig,
    origin: Vec3,
    x: f64,
    y: f64,
    z: f64,
    layer_height: f64,
    /// Indices into `placements` of the boxes in the current row.
    row: Vec<usize>,
    layer_index: usize,
    row_index: usize,
    placements: Vec<Placement<'a>>,
}

impl<'a> ShelfCursor<'a> {
    fn new(interior: UsableInterior, config: LayoutConfig, capacity: usize) -> Self {
        let origin = Vec3::new(
            interior.min.x + config.spacing,
            interior.min.y,
            interior.min.z + config.spacing,
        );
        Self {
            interior,
            config,
            origin,
            x: origin.x,
            y: origin.y,
            z: origin.z,
            layer_height: 0.0,
            row: Vec::new(),
            layer_index: 0,
            row_index: 0,
            placements: Vec::with_capacity(capacity),
        }
    }

    /// Widest box (along Z) in the current row.
    fn row_depth(&self) -> f64 {
        self.row
            .iter()
            .map(|&idx| self.placements[idx].extent.z)
            .fold(0.0, f64::max)
    }

    fn place(&mut self, category: &'a CategoryVolume, on_event: &mut impl FnMut(&LayoutEvent<'_>)) {
        let extent = box_extent(category.volume, &self.interior, &self.config);
        let spacing = self.config.spacing;

        if self.x + extent.x > self.interior.max.x - spacing {
            self.z += spacing + self.row_depth();
            self.x = self.origin.x;
            self.row.clear();
            self.row_index += 1;
            on_event(&LayoutEvent::RowStarted {
                layer: self.layer_index,
                row: self.row_index,
                z: self.z,
            });
        }

        if self.z + extent.z > self.interior.max.z - spacing {
            self.z = self.origin.z;
            self.x = self.origin.x;
            self.y += spacing + self.layer_height;
            self.layer_height = 0.0;
            self.row.clear();
            self.layer_index += 1;
            self.row_index = 0;
            on_event(&LayoutEvent::LayerStarted {
                layer: self.layer_index,
                floor: self.y,
            });
        }

        let placement = Placement {
            category: &category.name,
            center: Vec3::new(self.x, self.y, self.z) + extent * 0.5,
            extent,
            volume: category.volume,
        };
        on_event(&LayoutEvent::CategoryPlaced {
            index: self.placements.len(),
            layer: self.layer_index,
            row: self.row_index,
            category: placement.category,
            center: placement.center.as_tuple(),
            extent: extent.as_tuple(),
            volume: placement.volume,
        });

        self.row.push(self.placements.len());
        self.placements.push(placement);
        self.layer_height = self.layer_height.max(extent.y);
        self.x += extent.x + spacing;
    }

    fn layer_count(&self) -> usize {
        if self.placements.is_empty() {
            0
        } else {
            self.layer_index + 1
        }
    }
}

/// Orders categories by descending volume, keeping input order for ties.
fn sorted_by_volume(categories: &[CategoryVolume]) -> Vec<&CategoryVolume> {
    let mut sorted: Vec<&CategoryVolume> = categories.iter().collect();
    sorted.sort_by(|a, b| {
        ordering_volume(b.volume)
            .partial_cmp(&ordering_volume(a.volume))
            .unwrap_or(Ordering::Equal)
    });
    sorted
}

/// Computes the placements for a category snapshot with the default configuration.
///
/// Returns one placement per category, largest volume first. An empty
/// snapshot yields an empty list.
///
/// # Examples
/// ```
/// use warehouse_layout::layout::compute_placements;
/// use warehouse_layout::model::{CategoryVolume, WarehouseBounds};
///
/// let bounds = WarehouseBounds::new(20.0, 12.0, 6.0).unwrap();
/// let categories = vec![
///     CategoryVolume::new("pallets", 3.0),
///     CategoryVolume::new("cement", 12.0),
/// ];
///
/// let placements = compute_placements(&categories, &bounds);
/// assert_eq!(placements.len(), 2);
/// assert_eq!(placements[0].category, "cement");
/// ```
pub fn compute_placements<'a>(
    categories: &'a [CategoryVolume],
    bounds: &WarehouseBounds,
) -> Vec<Placement<'a>> {
    compute_placements_with_config(categories, bounds, LayoutConfig::default())
}

/// Like `compute_placements`, with custom tunables.
pub fn compute_placements_with_config<'a>(
    categories: &'a [CategoryVolume],
    bounds: &WarehouseBounds,
    config: LayoutConfig,
) -> Vec<Placement<'a>> {
    compute_placements_with_progress(categories, bounds, config, |_| {})
}

/// Layout with a progress callback invoked for every cursor move and placement.
pub fn compute_placements_with_progress<'a>(
    categories: &'a [CategoryVolume],
    bounds: &WarehouseBounds,
    config: LayoutConfig,
    mut on_event: impl FnMut(&LayoutEvent<'_>),
) -> Vec<Placement<'a>> {
    let interior = UsableInterior::from_bounds(bounds, &config);
    tracing::debug!(
        categories = categories.len(),
        interior_length = interior.extent().x,
        interior_height = interior.extent().y,
        interior_width = interior.extent().z,
        "computing warehouse layout"
    );

    let cursor = sorted_by_volume(categories).into_iter().fold(
        ShelfCursor::new(interior, config, categories.len()),
        |mut cursor, category| {
            cursor.place(category, &mut on_event);
            cursor
        },
    );

    on_event(&LayoutEvent::Finished {
        placements: cursor.placements.len(),
        layers: cursor.layer_count(),
    });
    cursor.placements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EPSILON_GENERAL, Extended};

    fn bounds(length: f64, width: f64, height: f64) -> WarehouseBounds {
        WarehouseBounds::new(length, width, height).unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn uniform(count: usize, volume: f64) -> Vec<CategoryVolume> {
        (0..count)
            .map(|i| CategoryVolume::new(format!("cat-{i}"), volume))
            .collect()
    }

    #[test]
    fn empty_snapshot_yields_empty_layout() {
        let placements = compute_placements(&[], &bounds(10.0, 10.0, 3.0));
        assert!(placements.is_empty());
    }

    #[test]
    fn single_category_sizes_follow_caps() {
        let categories = vec![CategoryVolume::new("steel", 8.0)];
        let placements = compute_placements(&categories, &bounds(10.0, 10.0, 2.0));
        assert_eq!(placements.len(), 1);

        let p = &placements[0];
        let height = 8.0_f64.cbrt().min(2.0 * 0.8);
        let width = (8.0 / height).sqrt().min(10.0 * 0.9 / 4.0);
        let length = (8.0 / (height * width)).min(10.0 * 0.9 / 4.0);

        assert!(approx(p.extent.y, 1.6));
        assert!(approx(p.extent.y, height));
        assert!(approx(p.extent.z, width));
        assert!(approx(p.extent.z, 5.0_f64.sqrt()));
        assert!(approx(p.extent.x, length));
        assert!(approx(p.extent.x, 5.0_f64.sqrt()));
        assert_eq!(p.volume, 8.0);
        assert_eq!(p.category, "steel");
    }

    #[test]
    fn single_category_snaps_to_near_corner() {
        let config = LayoutConfig::default();
        let categories = vec![CategoryVolume::new("steel", 8.0)];
        let placements = compute_placements(&categories, &bounds(10.0, 10.0, 2.0));

        let corner = placements[0].min_corner();
        assert!(approx(corner.x, -4.5 + config.spacing));
        assert!(approx(corner.y, config.spacing));
        assert!(approx(corner.z, -4.5 + config.spacing));
    }

    #[test]
    fn degenerate_volumes_get_minimum_box() {
        let config = LayoutConfig::default();
        let categories = vec![
            CategoryVolume::new("empty", 0.0),
            CategoryVolume::new("negative", -5.0),
            CategoryVolume::new("nan", f64::NAN),
        ];
        let placements = compute_placements(&categories, &bounds(10.0, 10.0, 3.0));

        assert_eq!(placements.len(), 3);
        for p in &placements {
            assert!(p.extent.is_finite());
            assert!(approx(p.extent.x, config.min_visible_size));
            assert!(approx(p.extent.y, config.min_visible_size));
            assert!(approx(p.extent.z, config.min_visible_size));
            assert!(p.center.is_finite());
        }
        // NaN ranks like zero, so the negative volume comes last.
        assert_eq!(placements[2].category, "negative");
        assert_eq!(placements[2].volume, -5.0);
    }

    #[test]
    fn huge_volume_is_clamped_to_interior() {
        let config = LayoutConfig::default();
        let categories = vec![CategoryVolume::new("bulk", 1.0e9)];
        let b = bounds(10.0, 8.0, 4.0);
        let placements = compute_placements(&categories, &b);

        let extent = placements[0].extent;
        assert!(approx(extent.y, 4.0 * config.vertical_margin_ratio));
        assert!(approx(extent.z, 8.0 * 0.9 / 4.0));
        assert!(approx(extent.x, 10.0 * 0.9 / 4.0));
        assert_eq!(placements[0].volume, 1.0e9);
    }

    #[test]
    fn infinite_volume_stays_finite() {
        let categories = vec![CategoryVolume::new("inf", f64::INFINITY)];
        let placements = compute_placements(&categories, &bounds(10.0, 10.0, 3.0));
        assert!(placements[0].extent.is_finite());
        assert!(placements[0].center.is_finite());
    }

    #[test]
    fn degenerate_bounds_do_not_produce_nan() {
        let broken = WarehouseBounds {
            length: 0.0,
            width: f64::NAN,
            height: -3.0,
        };
        let categories = uniform(4, 2.0);
        let placements = compute_placements(&categories, &broken);

        assert_eq!(placements.len(), 4);
        for p in &placements {
            assert!(p.extent.is_finite());
            assert!(p.center.is_finite());
            assert!(p.extent.min_component() >= LayoutConfig::DEFAULT_MIN_VISIBLE_SIZE);
        }
    }

    #[test]
    fn output_sorted_by_volume_with_stable_ties() {
        let categories = vec![
            CategoryVolume::new("a", 1.0),
            CategoryVolume::new("b", 5.0),
            CategoryVolume::new("c", 1.0),
            CategoryVolume::new("d", 3.0),
            CategoryVolume::new("e", 5.0),
        ];
        let placements = compute_placements(&categories, &bounds(30.0, 30.0, 6.0));
        let order: Vec<&str> = placements.iter().map(|p| p.category).collect();
        assert_eq!(order, vec!["b", "e", "d", "a", "c"]);
    }

    #[test]
    fn small_categories_wrap_into_new_row() {
        let categories = uniform(12, 0.01);
        let placements = compute_placements(&categories, &bounds(2.0, 10.0, 10.0));

        let first = placements[0].min_corner();
        let wrapped = placements
            .iter()
            .position(|p| p.min_corner().z > first.z + EPSILON_GENERAL)
            .expect("expected a row wrap");
        assert!(wrapped > 1, "first row should hold several boxes");

        let corner = placements[wrapped].min_corner();
        assert!(approx(corner.x, first.x), "x resets at the start of a row");
        assert!(approx(corner.y, first.y), "row wrap stays in the same layer");

        let previous = placements[wrapped - 1].min_corner();
        assert!(previous.x > first.x);
    }

    #[test]
    fn full_layer_wraps_upward() {
        let config = LayoutConfig::default();
        let categories = uniform(10, 1.0);
        let placements = compute_placements(&categories, &bounds(2.0, 2.0, 10.0));

        // 0.45 wide boxes: three per row, three rows per layer.
        let first = placements[0].min_corner();
        assert!(approx(placements[3].min_corner().x, first.x));
        assert!(placements[3].min_corner().z > first.z);
        assert!(approx(placements[8].min_corner().y, first.y));

        let lifted = placements[9].min_corner();
        assert!(approx(lifted.x, first.x));
        assert!(approx(lifted.z, first.z));
        assert!(approx(lifted.y, first.y + config.spacing + 1.0));
    }

    #[test]
    fn fitting_layout_stays_inside_interior_without_overlap() {
        let config = LayoutConfig::default();
        let b = bounds(12.0, 9.0, 6.0);
        let interior = UsableInterior::from_bounds(&b, &config);
        let categories: Vec<CategoryVolume> = (0..14)
            .map(|i| CategoryVolume::new(format!("m{i}"), 0.2 + i as f64 * 0.35))
            .collect();
        let placements = compute_placements(&categories, &b);

        for (i, a) in placements.iter().enumerate() {
            assert!(
                interior
                    .bounding_box()
                    .contains(&a.bounding_box(), EPSILON_GENERAL),
                "{} leaves the interior",
                a.category
            );
            for other in &placements[i + 1..] {
                assert!(!a.bounding_box().intersects(&other.bounding_box()));
                assert!(
                    a.bounding_box().gap_to(&other.bounding_box())
                        >= config.spacing - EPSILON_GENERAL
                );
            }
        }
    }

    #[test]
    fn identical_input_gives_identical_layout() {
        let categories: Vec<CategoryVolume> = (0..20)
            .map(|i| CategoryVolume::new(format!("m{i}"), (i % 7) as f64 * 0.8))
            .collect();
        let b = bounds(15.0, 10.0, 5.0);
        assert_eq!(
            compute_placements(&categories, &b),
            compute_placements(&categories, &b)
        );
    }

    #[test]
    fn progress_reports_wraps_and_finish() {
        let categories = uniform(10, 1.0);
        let mut events = Vec::new();
        let placements = compute_placements_with_progress(
            &categories,
            &bounds(2.0, 2.0, 10.0),
            LayoutConfig::default(),
            |evt| events.push(format!("{evt:?}")),
        );

        let placed = events.iter().filter(|e| e.starts_with("CategoryPlaced")).count();
        let rows = events.iter().filter(|e| e.starts_with("RowStarted")).count();
        let layers = events.iter().filter(|e| e.starts_with("LayerStarted")).count();
        assert_eq!(placed, placements.len());
        assert_eq!(layers, 1);
        assert!(rows >= 2);
        assert_eq!(
            events.last().map(String::as_str),
            Some("Finished { placements: 10, layers: 2 }")
        );
    }

    #[test]
    fn custom_spacing_changes_gaps() {
        let config = LayoutConfig::builder().spacing(0.5).build();
        let categories = uniform(2, 1.0);
        let placements =
            compute_placements_with_config(&categories, &bounds(20.0, 20.0, 5.0), config);

        let gap = placements[0]
            .bounding_box()
            .gap_to(&placements[1].bounding_box());
        assert!(approx(gap, 0.5));
    }
}
