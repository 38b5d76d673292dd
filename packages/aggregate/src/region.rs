//! Geographic extent of the whole dataset.
//!
//! Both summaries read every located record regardless of sale type, price,
//! or date: they describe where data exists at all, not where a particular
//! query has data.

use geo::{Coord, LineString, Point, Polygon};
use price_map_aggregate_models::{BoundingBox, Position, RegionPolygon};
use price_map_sale_models::SaleRecord;

use crate::AggregateError;

/// Computes the extent of all located records.
///
/// # Errors
///
/// Returns [`AggregateError::EmptyDataset`] if no record is located.
pub fn bounding_box<'a, I>(records: I) -> Result<BoundingBox, AggregateError>
where
    I: IntoIterator<Item = &'a SaleRecord>,
{
    records
        .into_iter()
        .filter_map(SaleRecord::location)
        .fold(None, |bbox: Option<BoundingBox>, loc| {
            Some(bbox.map_or_else(
                || BoundingBox::from_point(loc.latitude, loc.longitude),
                |b| b.extend(loc.latitude, loc.longitude),
            ))
        })
        .ok_or(AggregateError::EmptyDataset)
}

/// Computes the convex outline of all located records.
#[must_use]
pub fn region_polygon<'a, I>(records: I) -> RegionPolygon
where
    I: IntoIterator<Item = &'a SaleRecord>,
{
    let points: Vec<Coord<f64>> = records
        .into_iter()
        .filter_map(SaleRecord::location)
        .map(|loc| Coord {
            x: loc.longitude,
            y: loc.latitude,
        })
        .collect();

    log::debug!("Computing convex hull of {} located sales", points.len());

    convex_hull(points)
}

/// Andrew's monotone chain convex hull.
///
/// Returns a closed counter-clockwise ring without collinear vertices.
/// Fewer than three non-collinear distinct points yield
/// [`RegionPolygon::Degenerate`] with the single point or the two extreme
/// points; no points yield [`RegionPolygon::Empty`].
#[must_use]
pub fn convex_hull(mut points: Vec<Coord<f64>>) -> RegionPolygon {
    points.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    points.dedup();

    let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
        return RegionPolygon::Empty;
    };

    if points.len() == 1 {
        return RegionPolygon::Degenerate {
            vertices: vec![position(first)],
        };
    }

    let mut lower = half_hull(points.iter().copied());
    let mut upper = half_hull(points.iter().rev().copied());

    // Each half ends where the other begins.
    lower.pop();
    upper.pop();
    lower.append(&mut upper);

    if lower.len() < 3 {
        return RegionPolygon::Degenerate {
            vertices: vec![position(first), position(last)],
        };
    }

    let mut ring: Vec<Position> = lower.into_iter().map(position).collect();
    ring.push(ring[0]);

    RegionPolygon::Polygon { ring }
}

fn half_hull(points: impl Iterator<Item = Coord<f64>>) -> Vec<Coord<f64>> {
    let mut hull: Vec<Coord<f64>> = Vec::new();
    for p in points {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    hull
}

/// Z component of `(a - o) × (b - o)`; positive for a counter-clockwise turn.
fn cross(o: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - o.x).mul_add(b.y - o.y, -((a.y - o.y) * (b.x - o.x)))
}

const fn position(c: Coord<f64>) -> Position {
    [c.x, c.y]
}

const fn coord(p: Position) -> Coord<f64> {
    Coord { x: p[0], y: p[1] }
}

/// Renders an outline as a `GeoJSON` geometry.
///
/// A single vertex becomes a `Point`, two vertices a `LineString`, and a
/// ring a `Polygon`. [`RegionPolygon::Empty`] has no geometry.
#[must_use]
pub fn to_geojson(polygon: &RegionPolygon) -> Option<geojson::Geometry> {
    let value = match polygon {
        RegionPolygon::Empty => return None,
        RegionPolygon::Degenerate { vertices } => match vertices.as_slice() {
            [] => return None,
            [only] => geojson::Value::from(&Point::from(coord(*only))),
            many => {
                let line: LineString<f64> = many.iter().copied().map(coord).collect();
                geojson::Value::from(&line)
            }
        },
        RegionPolygon::Polygon { ring } => {
            let exterior: LineString<f64> = ring.iter().copied().map(coord).collect();
            geojson::Value::from(&Polygon::new(exterior, vec![]))
        }
    };

    Some(geojson::Geometry::new(value))
}

#[cfg(test)]
mod tests {
    use geo::{Area, ConvexHull, Intersects, MultiPoint};

    use super::*;
    use crate::test_support::sale;

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn ring_polygon(ring: &[Position]) -> Polygon<f64> {
        Polygon::new(ring.iter().copied().map(coord).collect(), vec![])
    }

    /// Deterministic pseudo-random cloud in a Stockholm-sized box.
    fn cloud(n: usize) -> Vec<Coord<f64>> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            #[allow(clippy::cast_precision_loss)]
            let unit = (state % 1_000_000) as f64 / 1_000_000.0;
            unit
        };
        (0..n)
            .map(|_| c(17.8 + next() * 0.5, 59.2 + next() * 0.3))
            .collect()
    }

    #[test]
    fn bounding_box_ignores_unlocated_records() {
        let mut unlocated = sale(1, 1, 1.0, 0.0, 0.0);
        unlocated.latitude = None;
        let mut placeholder = sale(2, 1, 1.0, 0.0, 0.0);
        placeholder.latitude = Some(0.0);
        placeholder.longitude = Some(0.0);

        let records = vec![
            unlocated,
            placeholder,
            sale(3, 1, 1.0, 59.30, 18.10),
            sale(4, 1, 1.0, 59.40, 17.90),
        ];

        assert_eq!(
            bounding_box(&records).unwrap(),
            BoundingBox {
                min_lat: 59.30,
                min_lng: 17.90,
                max_lat: 59.40,
                max_lng: 18.10,
            }
        );
    }

    #[test]
    fn bounding_box_of_nothing_is_empty_dataset() {
        let mut unlocated = sale(1, 1, 1.0, 0.0, 0.0);
        unlocated.longitude = None;
        assert_eq!(bounding_box(&[unlocated]), Err(AggregateError::EmptyDataset));
    }

    #[test]
    fn bounding_box_does_not_filter_by_price() {
        let mut unpriced = sale(1, 1, 1.0, 59.0, 18.0);
        unpriced.price = None;
        unpriced.sale_type = "Lagfart".to_string();
        assert!(bounding_box(&[unpriced]).is_ok());
    }

    #[test]
    fn hull_of_nothing_is_empty() {
        assert_eq!(convex_hull(vec![]), RegionPolygon::Empty);
        assert!(to_geojson(&RegionPolygon::Empty).is_none());
    }

    #[test]
    fn hull_of_one_point_is_that_point() {
        let hull = convex_hull(vec![c(18.0, 59.3), c(18.0, 59.3)]);
        assert_eq!(
            hull,
            RegionPolygon::Degenerate {
                vertices: vec![[18.0, 59.3]],
            }
        );
        let geometry = to_geojson(&hull).unwrap();
        assert!(matches!(geometry.value, geojson::Value::Point(_)));
    }

    #[test]
    fn hull_of_collinear_points_is_its_endpoints() {
        let hull = convex_hull(vec![c(2.0, 2.0), c(0.0, 0.0), c(1.0, 1.0), c(3.0, 3.0)]);
        assert_eq!(
            hull,
            RegionPolygon::Degenerate {
                vertices: vec![[0.0, 0.0], [3.0, 3.0]],
            }
        );
        let geometry = to_geojson(&hull).unwrap();
        assert!(matches!(geometry.value, geojson::Value::LineString(_)));
    }

    #[test]
    fn hull_of_square_drops_interior_and_edge_points() {
        let hull = convex_hull(vec![
            c(0.0, 0.0),
            c(1.0, 0.0),
            c(1.0, 1.0),
            c(0.0, 1.0),
            c(0.5, 0.5),
            c(0.5, 0.0),
        ]);
        assert_eq!(
            hull,
            RegionPolygon::Polygon {
                ring: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]],
            }
        );
    }

    #[test]
    fn hull_is_closed_counter_clockwise_and_contains_every_point() {
        let points = cloud(500);
        let RegionPolygon::Polygon { ring } = convex_hull(points.clone()) else {
            panic!("expected a polygon");
        };

        assert_eq!(ring.first(), ring.last());
        let polygon = ring_polygon(&ring);
        assert!(polygon.signed_area() > 0.0, "ring should wind counter-clockwise");

        for p in points {
            assert!(polygon.intersects(&Point::from(p)), "{p:?} outside hull");
        }
    }

    #[test]
    fn hull_area_matches_geo() {
        let points = cloud(300);
        let expected = MultiPoint::from(points.clone()).convex_hull().unsigned_area();

        let RegionPolygon::Polygon { ring } = convex_hull(points) else {
            panic!("expected a polygon");
        };
        let actual = ring_polygon(&ring).unsigned_area();

        assert!((actual - expected).abs() < 1e-12, "{actual} != {expected}");
    }

    #[test]
    fn region_polygon_is_idempotent() {
        let records: Vec<_> = cloud(50)
            .into_iter()
            .enumerate()
            .map(|(i, p)| sale(i64::try_from(i).unwrap(), 1, 1.0, p.y, p.x))
            .collect();
        assert_eq!(region_polygon(&records), region_polygon(&records));
    }

    #[test]
    fn polygon_renders_as_geojson_polygon() {
        let hull = convex_hull(vec![c(0.0, 0.0), c(1.0, 0.0), c(0.0, 1.0)]);
        let geometry = to_geojson(&hull).unwrap();
        let geojson::Value::Polygon(rings) = geometry.value else {
            panic!("expected a polygon");
        };
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 4);
    }
}
