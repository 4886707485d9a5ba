use std::{collections::BTreeMap, fmt, path::Path};

use anyhow::{Context, Result};
use geo::Point;
use serde::Deserialize;

/// A record from an external dataset that is expected to exist on the map.
#[derive(Clone, Debug, PartialEq)]
pub struct RefItem {
    pub id: String,
    pub point: Point,
    pub name: String,
    pub tags: BTreeMap<String, String>,
}

impl RefItem {
    pub fn new(id: &str, name: &str, lat: f64, lon: f64) -> Self {
        Self {
            id: id.to_string(),
            point: Point::new(lon, lat),
            name: name.to_string(),
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    /// Looks up `id`, `name`, or any extra attribute of the record.
    pub fn field(&self, key: &str) -> Option<&str> {
        match key {
            "id" => Some(&self.id),
            "name" => Some(&self.name),
            _ => self.tags.get(key).map(|x| x.as_str()),
        }
    }
}

/// A record that was skipped because it can't be placed on the map.
#[derive(Clone, Debug, PartialEq)]
pub struct InvalidItem {
    pub line: usize,
    pub id: String,
    pub reason: String,
}

impl fmt::Display for InvalidItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} ({})", self.line, self.id, self.reason)
    }
}

#[derive(Debug, Default)]
pub struct Items {
    pub valid: Vec<RefItem>,
    pub invalid: Vec<InvalidItem>,
}

/// Loads a JSON Lines file of reference records, keeping file order.
pub fn load_items(path: &Path) -> Result<Items> {
    let mut items = Items::default();
    for (i, line) in crate::read(path)?.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let raw: RawItem = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid record", path.display(), i + 1))?;
        match raw.refine() {
            Ok(x) => items.valid.push(x),
            Err((id, reason)) => items.invalid.push(InvalidItem {
                line: i + 1,
                id,
                reason,
            }),
        }
    }
    Ok(items)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(x) => write!(f, "{x}"),
            Self::Text(x) => write!(f, "{x}"),
        }
    }
}

#[derive(Deserialize)]
struct RawItem {
    id: RawId,
    lat: Option<f64>,
    lon: Option<f64>,
    name: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

impl RawItem {
    fn refine(self) -> Result<RefItem, (String, String)> {
        let id = self.id.to_string();
        let (lat, lon) = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return Err((id, "missing coordinate".to_string())),
        };
        if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
            return Err((id, format!("invalid coordinate {lat},{lon}")));
        }
        if lat == 0.0 && lon == 0.0 {
            return Err((id, "null island".to_string()));
        }

        Ok(RefItem {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            point: Point::new(lon, lat),
            tags: self.tags,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.jsonl");
        fs::write(
            &path,
            concat!(
                r#"{"id": 17, "lat": -27.5, "lon": 153.0, "name": "Coles Central"}"#,
                "\n",
                r#"{"id": "a", "lat": -27.5}"#,
                "\n\n",
                r#"{"id": "b", "lat": 95.0, "lon": 10.0, "tags": {"ref": "B1"}}"#,
                "\n",
                r#"{"id": "c", "lat": -12.0, "lon": 130.0, "tags": {"ref": "C1"}}"#,
                "\n",
            ),
        )
        .unwrap();

        let items = load_items(&path).unwrap();
        assert_eq!(items.valid.len(), 2);
        assert_eq!(items.valid[0].id, "17");
        assert_eq!(items.valid[0].field("name"), Some("Coles Central"));
        assert_eq!(items.valid[1].name, "c");
        assert_eq!(items.valid[1].field("ref"), Some("C1"));
        assert_eq!(items.valid[1].field("brand"), None);

        assert_eq!(items.invalid.len(), 2);
        assert_eq!(items.invalid[0].line, 2);
        assert_eq!(items.invalid[0].reason, "missing coordinate");
        assert_eq!(items.invalid[1].line, 4);
    }

    #[test]
    fn malformed_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.jsonl");
        fs::write(&path, "{\"id\": 1, \"lat\": \n").unwrap();

        let err = load_items(&path).unwrap_err();
        assert!(err.to_string().contains(":1: invalid record"));
    }
}
