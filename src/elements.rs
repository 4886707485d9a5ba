use std::fmt;

use _model::{OsmElement, OsmId, RefItem};
use geo::Point;

/// A located feature of the map being audited.
pub trait MapElement {
    type Id: Clone + Ord + fmt::Debug + fmt::Display;

    fn id(&self) -> Self::Id;

    /// Node position, or the centroid of a way or relation.
    fn point(&self) -> Point;

    fn tag(&self, key: &str) -> Option<&str>;

    fn has_tag(&self, key: &str) -> bool {
        self.tag(key).is_some()
    }

    fn url(&self) -> String;
}

/// A record of a reference dataset that is expected to be mapped.
pub trait DataItem {
    fn point(&self) -> Point;

    fn name(&self) -> String;

    fn report_string(&self) -> String {
        self.name()
    }
}

impl MapElement for OsmElement {
    type Id = OsmId;

    fn id(&self) -> OsmId {
        self.id
    }

    fn point(&self) -> Point {
        self.point
    }

    fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(|x| x.as_str())
    }

    fn url(&self) -> String {
        self.id.link()
    }
}

impl DataItem for RefItem {
    fn point(&self) -> Point {
        self.point
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn report_string(&self) -> String {
        if self.name == self.id {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.id)
        }
    }
}
