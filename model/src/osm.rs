use std::{collections::BTreeMap, fmt, path::Path, str::FromStr};

use anyhow::{bail, Context, Result};
use geo::Point;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OsmId {
    Node(u64),
    Way(u64),
    Relation(u64),
}

impl OsmId {
    pub fn link(&self) -> String {
        format!("https://www.openstreetmap.org/{self}")
    }
}

impl fmt::Display for OsmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(x) => write!(f, "node/{x}"),
            Self::Way(x) => write!(f, "way/{x}"),
            Self::Relation(x) => write!(f, "relation/{x}"),
        }
    }
}

impl FromStr for OsmId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, id) = s.split_once('/').context("expected type/id")?;
        let id = id.parse().with_context(|| format!("invalid id: {s}"))?;
        Ok(match kind {
            "node" | "n" => Self::Node(id),
            "way" | "w" => Self::Way(id),
            "relation" | "r" => Self::Relation(id),
            _ => bail!("unknown element type: {kind}"),
        })
    }
}

/// A tagged map feature positioned at its node location, or at the centre
/// Overpass computed for ways and relations.
#[derive(Clone, Debug)]
pub struct OsmElement {
    pub id: OsmId,
    pub point: Point,
    pub tags: BTreeMap<String, String>,
}

impl OsmElement {
    pub fn new(id: OsmId, lat: f64, lon: f64) -> Self {
        Self {
            id,
            point: Point::new(lon, lat),
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }
}

/// Loads the elements of an Overpass `out tags center` JSON response.
///
/// Elements Overpass returned without a position are skipped.
pub fn load_elements(path: &Path) -> Result<Vec<OsmElement>> {
    let response: OverpassResponse = serde_json::from_str(&crate::read(path)?)
        .with_context(|| format!("failed to parse overpass response {}", path.display()))?;
    Ok(response
        .elements
        .into_iter()
        .filter_map(|x| x.refine())
        .collect())
}

#[derive(Deserialize)]
struct OverpassResponse {
    elements: Vec<RawElement>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum RawElement {
    Node {
        id: u64,
        #[serde(flatten)]
        center: Option<RawPosition>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    Way {
        id: u64,
        center: Option<RawPosition>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    Relation {
        id: u64,
        center: Option<RawPosition>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
}

impl RawElement {
    fn refine(self) -> Option<OsmElement> {
        let (id, center, tags) = match self {
            Self::Node { id, center, tags } => (OsmId::Node(id), center, tags),
            Self::Way { id, center, tags } => (OsmId::Way(id), center, tags),
            Self::Relation { id, center, tags } => (OsmId::Relation(id), center, tags),
        };
        Some(OsmElement {
            id,
            point: center?.refine(),
            tags,
        })
    }
}

#[derive(Deserialize)]
struct RawPosition {
    lat: f64,
    lon: f64,
}

impl RawPosition {
    fn refine(self) -> Point {
        Point::new(self.lon, self.lat)
    }
}
