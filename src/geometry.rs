//! Pairwise geometric checks on computed placements.
//!
//! Used to audit a finished layout: collisions, spacing between neighbours
//! and containment in the usable interior.

use crate::layout::UsableInterior;
use crate::model::Placement;
use crate::types::{EPSILON_GENERAL, Extended};

/// Checks whether two placements occupy overlapping space.
///
/// Boxes that only touch along a face do not count as overlapping.
pub fn intersects(a: &Placement<'_>, b: &Placement<'_>) -> bool {
    a.bounding_box().intersects(&b.bounding_box())
}

/// Checks whether two placements are at least `spacing` apart along some axis.
pub fn respects_spacing(a: &Placement<'_>, b: &Placement<'_>, spacing: f64) -> bool {
    a.bounding_box().gap_to(&b.bounding_box()) >= spacing - EPSILON_GENERAL
}

/// Checks whether a placement lies completely inside the usable interior.
pub fn within_interior(placement: &Placement<'_>, interior: &UsableInterior) -> bool {
    interior
        .bounding_box()
        .contains(&placement.bounding_box(), EPSILON_GENERAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutConfig;
    use crate::model::WarehouseBounds;
    use crate::types::Vec3;

    fn placement(center: (f64, f64, f64), extent: (f64, f64, f64)) -> Placement<'static> {
        Placement {
            category: "test",
            center: center.into(),
            extent: extent.into(),
            volume: Vec3::from(extent).volume(),
        }
    }

    #[test]
    fn overlapping_boxes_intersect() {
        let a = placement((0.0, 1.0, 0.0), (2.0, 2.0, 2.0));
        let b = placement((1.0, 1.0, 1.0), (2.0, 2.0, 2.0));
        assert!(intersects(&a, &b));
        assert!(!respects_spacing(&a, &b, 0.1));
    }

    #[test]
    fn spaced_boxes_pass_spacing_check() {
        let a = placement((0.0, 1.0, 0.0), (2.0, 2.0, 2.0));
        let b = placement((2.1, 1.0, 0.0), (2.0, 2.0, 2.0));
        assert!(!intersects(&a, &b));
        assert!(respects_spacing(&a, &b, 0.1));
        assert!(!respects_spacing(&a, &b, 0.2));
    }

    #[test]
    fn interior_containment() {
        let bounds = WarehouseBounds::new(10.0, 10.0, 5.0).unwrap();
        let interior = UsableInterior::from_bounds(&bounds, &LayoutConfig::default());

        let inside = placement((0.0, 1.1, 0.0), (1.0, 2.0, 1.0));
        let sticking_out = placement((4.4, 1.1, 0.0), (1.0, 2.0, 1.0));
        let too_tall = placement((0.0, 2.6, 0.0), (1.0, 5.0, 1.0));

        assert!(within_interior(&inside, &interior));
        assert!(!within_interior(&sticking_out, &interior));
        assert!(!within_interior(&too_tall, &interior));
    }
}
