//! Containment merge: drop obstacles that lie wholly inside another.
//!
//! Pairwise and quadratic in the polygon count, so it runs once per index
//! build rather than per query.

use crate::geometry::point_in_polygon;
use crate::models::Polygon;

/// True when every vertex of `inner` lies inside `outer`.
///
/// Empty polygons are never contained and never contain anything. A bounding
/// box check rejects most pairs before the per-vertex tests run.
pub fn is_polygon_contained_in(inner: &Polygon, outer: &Polygon) -> bool {
    let (Some(inner_box), Some(outer_box)) = (inner.bbox(), outer.bbox()) else {
        return false;
    };
    if !outer_box.contains_box(&inner_box) {
        return false;
    }
    inner
        .vertices
        .iter()
        .all(|vertex| point_in_polygon(*vertex, outer))
}

/// Remove polygons fully contained in another polygon of the set.
///
/// Survivors keep their input order. A polygon already marked contained is
/// not used as a container for later checks.
pub fn remove_contained_polygons(polygons: Vec<Polygon>) -> Vec<Polygon> {
    if polygons.len() <= 1 {
        return polygons;
    }

    let mut contained = vec![false; polygons.len()];
    for i in 0..polygons.len() {
        if contained[i] {
            continue;
        }
        for j in 0..polygons.len() {
            if i == j || contained[j] {
                continue;
            }
            if is_polygon_contained_in(&polygons[i], &polygons[j]) {
                contained[i] = true;
                break;
            }
            if is_polygon_contained_in(&polygons[j], &polygons[i]) {
                contained[j] = true;
            }
        }
    }

    let before = polygons.len();
    let survivors: Vec<Polygon> = polygons
        .into_iter()
        .zip(contained)
        .filter_map(|(polygon, dropped)| (!dropped).then_some(polygon))
        .collect();

    tracing::debug!(
        "Containment merge kept {} of {} polygons",
        survivors.len(),
        before
    );
    survivors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_at(x: f64, y: f64, size: f64) -> Polygon {
        Polygon::from_coords(&[(x, y), (x + size, y), (x + size, y + size), (x, y + size)])
    }

    #[test]
    fn nested_polygon_is_removed() {
        let outer = square_at(0.0, 0.0, 10.0);
        let inner = square_at(2.0, 2.0, 3.0);
        let merged = remove_contained_polygons(vec![inner, outer.clone()]);
        assert_eq!(merged, vec![outer]);
    }

    #[test]
    fn chain_of_nesting_keeps_outermost() {
        let big = square_at(0.0, 0.0, 100.0);
        let mid = square_at(10.0, 10.0, 50.0);
        let small = square_at(20.0, 20.0, 5.0);
        let merged = remove_contained_polygons(vec![small, big.clone(), mid]);
        assert_eq!(merged, vec![big]);
    }

    #[test]
    fn overlapping_polygons_both_survive() {
        let a = square_at(0.0, 0.0, 10.0);
        let b = square_at(5.0, 5.0, 10.0);
        assert_eq!(remove_contained_polygons(vec![a.clone(), b.clone()]), vec![a, b]);
    }

    #[test]
    fn bbox_inside_but_vertex_outside_is_kept() {
        // L-shaped outer polygon whose bbox covers the notch.
        let outer = Polygon::from_coords(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 4.0),
            (4.0, 4.0),
            (4.0, 10.0),
            (0.0, 10.0),
        ]);
        let in_notch = square_at(6.0, 6.0, 2.0);
        assert!(!is_polygon_contained_in(&in_notch, &outer));
        assert_eq!(remove_contained_polygons(vec![outer, in_notch]).len(), 2);
    }

    #[test]
    fn empty_polygons_are_never_contained() {
        let outer = square_at(0.0, 0.0, 10.0);
        assert!(!is_polygon_contained_in(&Polygon::default(), &outer));
        assert!(!is_polygon_contained_in(&outer, &Polygon::default()));
    }
}
