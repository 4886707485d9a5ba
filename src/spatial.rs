use geo::{HaversineDistance, Point};
use rstar::{RTree, RTreeObject, AABB};

use crate::MapElement;

// under the true ~111.2km, so search boxes are never too small
const METRES_PER_DEGREE: f64 = 111_000.0;

/// Great-circle distance in metres.
pub fn distance(a: Point, b: Point) -> f64 {
    a.haversine_distance(&b)
}

#[derive(Debug)]
pub struct Neighbour<'a, E> {
    /// Position of the element in the indexed slice.
    pub index: usize,
    pub element: &'a E,
    /// Metres.
    pub distance: f64,
}

impl<E> Clone for Neighbour<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Neighbour<'_, E> {}

struct Entry {
    index: usize,
    position: [f64; 2],
}

impl RTreeObject for Entry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// Radius queries over a fixed slice of map elements.
///
/// The tree is keyed on raw longitude/latitude and only narrows the search;
/// every hit is checked against the haversine distance.
pub struct SpatialIndex<'a, E> {
    elements: &'a [E],
    tree: RTree<Entry>,
}

impl<'a, E: MapElement> SpatialIndex<'a, E> {
    pub fn new(elements: &'a [E]) -> Self {
        let entries = elements
            .iter()
            .enumerate()
            .map(|(index, x)| {
                let point = x.point();
                Entry {
                    index,
                    position: [point.x(), point.y()],
                }
            })
            .collect();

        Self {
            elements,
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn elements(&self) -> &'a [E] {
        self.elements
    }

    /// Every element within `max_distance` metres of `point`, nearest first.
    ///
    /// Elements at the same distance keep their input order. An infinite
    /// `max_distance` returns the whole collection.
    pub fn find_all_within(&self, point: Point, max_distance: f64) -> Vec<Neighbour<'a, E>> {
        let neighbour = |index: usize| {
            let element = &self.elements[index];
            Neighbour {
                index,
                element,
                distance: distance(point, element.point()),
            }
        };

        let mut found: Vec<_> = match search_box(point, max_distance) {
            Some(envelope) => self
                .tree
                .locate_in_envelope(&envelope)
                .map(|x| neighbour(x.index))
                .filter(|x| x.distance <= max_distance)
                .collect(),
            None => (0..self.elements.len())
                .map(neighbour)
                .filter(|x| x.distance <= max_distance)
                .collect(),
        };
        found.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.index.cmp(&b.index))
        });
        found
    }

    pub fn find_closest(&self, point: Point, max_distance: f64) -> Option<Neighbour<'a, E>> {
        self.find_all_within(point, max_distance).into_iter().next()
    }
}

/// Longitude/latitude box enclosing the circle, or `None` if the circle is
/// unbounded or wraps around a pole or the antimeridian.
fn search_box(point: Point, radius: f64) -> Option<AABB<[f64; 2]>> {
    if !radius.is_finite() {
        return None;
    }

    let dlat = radius / METRES_PER_DEGREE;
    let min_lat = point.y() - dlat;
    let max_lat = point.y() + dlat;
    if min_lat <= -90.0 || max_lat >= 90.0 {
        return None;
    }

    let widest = min_lat.abs().max(max_lat.abs()).to_radians().cos();
    let dlon = dlat / widest;
    let min_lon = point.x() - dlon;
    let max_lon = point.x() + dlon;
    if min_lon < -180.0 || max_lon > 180.0 {
        return None;
    }

    Some(AABB::from_corners([min_lon, min_lat], [max_lon, max_lat]))
}

#[cfg(test)]
mod tests {
    use _model::{OsmElement, OsmId};

    use super::*;

    fn elements() -> Vec<OsmElement> {
        vec![
            OsmElement::new(OsmId::Node(1), 0.0, 0.001),
            OsmElement::new(OsmId::Node(2), 0.0, 0.0001),
            OsmElement::new(OsmId::Node(3), 0.0, -0.0001),
            OsmElement::new(OsmId::Node(4), 1.0, 1.0),
        ]
    }

    #[test]
    fn haversine() {
        let d = distance(Point::new(0.0, 0.0), Point::new(0.0001, 0.0));
        assert!((d - 11.1).abs() < 0.1, "{d}");
    }

    #[test]
    fn within() {
        let elements = elements();
        let index = SpatialIndex::new(&elements);

        let found = index.find_all_within(Point::new(0.0, 0.0), 200.0);
        let ids: Vec<_> = found.iter().map(|x| x.element.id).collect();
        // equidistant elements keep input order
        assert_eq!(
            ids,
            vec![OsmId::Node(2), OsmId::Node(3), OsmId::Node(1)]
        );
        assert!(found.windows(2).all(|x| x[0].distance <= x[1].distance));

        assert!(index.find_all_within(Point::new(0.0, 0.0), 5.0).is_empty());
        assert_eq!(
            index.find_all_within(Point::new(0.0, 0.0), f64::INFINITY).len(),
            4
        );
    }

    #[test]
    fn closest() {
        let elements = elements();
        let index = SpatialIndex::new(&elements);

        let x = index.find_closest(Point::new(0.0011, 0.0), 1000.0).unwrap();
        assert_eq!(x.index, 0);
        assert!(x.distance < 12.0);
        assert!(index.find_closest(Point::new(50.0, 50.0), 1000.0).is_none());
    }

    #[test]
    fn antimeridian() {
        let elements = vec![
            OsmElement::new(OsmId::Node(1), 10.0, 179.9995),
            OsmElement::new(OsmId::Node(2), 10.0, -179.9995),
        ];
        let index = SpatialIndex::new(&elements);

        let found = index.find_all_within(Point::new(179.9999, 10.0), 500.0);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].index, 0);
    }

    #[test]
    fn high_latitude() {
        // one degree of longitude is ~19km at 80 degrees north
        let elements = vec![OsmElement::new(OsmId::Node(1), 80.0, 20.01)];
        let index = SpatialIndex::new(&elements);

        assert!(index.find_closest(Point::new(20.0, 80.0), 250.0).is_some());
        assert!(index.find_closest(Point::new(20.0, 80.0), 150.0).is_none());
    }
}
