//! Analyzers described in a YAML file, correlating an Overpass extract with
//! a JSON Lines dataset.

use std::{
    collections::BTreeMap,
    fs::{create_dir_all, read_to_string, write},
    path::{Path, PathBuf},
};

use _model::{load_elements, load_items, OsmElement, OsmId, RefItem};
use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

use crate::{
    batches,
    grouping::normalise,
    report::{Report, ReportEntry},
    Correlation, CorrelationKind, Correlator, DataItemLabels, MarkdownReport, MatchStrength,
    MapElement, Parameters, ValidationRule, Validator,
};

const FUZZY_THRESHOLD: f64 = 0.9;

fn default_batches() -> Vec<String> {
    ["statistics", "unmatched-item", "matched-far", "unmatched-osm", "matched"]
        .iter()
        .map(|x| x.to_string())
        .collect()
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Analyzer {
    pub name: String,
    /// Overpass JSON response (`out tags center`).
    pub elements: PathBuf,
    /// JSON Lines, one record per line.
    pub items: PathBuf,
    /// Markdown report, with a `.json` dump of the pairs next to it.
    pub output: PathBuf,
    pub near: Option<f64>,
    pub far: Option<f64>,
    pub extra: Option<ExtraConfig>,
    pub labels: Option<LabelsConfig>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Strength when no rule applies. Without rules everything nearby is a
    /// good match.
    pub fallback: Option<MatchStrength>,
    /// Tags an unmatched element needs to count as a lone instance; `*`
    /// accepts any value.
    pub lone: Option<BTreeMap<String, String>>,
    pub lone_at_any_distance: Option<MatchStrength>,
    #[serde(default)]
    pub preview: Vec<String>,
    #[serde(default)]
    pub validate: Vec<Check>,
    #[serde(default = "default_batches")]
    pub batches: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtraConfig {
    pub strength: MatchStrength,
    pub distance: f64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabelsConfig {
    pub singular: String,
    pub plural: String,
}

/// Compares an element tag with an item field.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub tag: String,
    pub field: String,
    pub strength: MatchStrength,
    /// Jaro-Winkler similarity instead of equality.
    #[serde(default)]
    pub fuzzy: bool,
    /// A mismatch rules the candidate out entirely.
    #[serde(default)]
    pub veto: bool,
}

impl Rule {
    fn matches(&self, field: &str, tag: &str) -> bool {
        let field = normalise(field);
        // multiple values are separated by semicolons
        tag.split(';').map(normalise).any(|tag| {
            if self.fuzzy {
                jaro_winkler(&field, &tag) >= FUZZY_THRESHOLD
            } else {
                field == tag
            }
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Check {
    pub tag: String,
    /// Item field the tag must equal; without it the tag only has to exist.
    pub field: Option<String>,
    #[serde(default)]
    pub absent: bool,
}

pub fn compare(
    rules: &[Rule],
    fallback: MatchStrength,
    item: &RefItem,
    element: &OsmElement,
) -> MatchStrength {
    let mut best = None;
    for rule in rules {
        if let (Some(field), Some(tag)) = (item.field(&rule.field), element.tag(&rule.tag)) {
            if rule.matches(field, tag) {
                best = best.max(Some(rule.strength));
            } else if rule.veto {
                return MatchStrength::Unmatched;
            }
        }
    }
    best.unwrap_or(fallback)
}

/// Reads analyzer definitions, resolving their paths against the directory
/// of the config file.
pub fn load(path: &Path) -> Result<Vec<Analyzer>> {
    let mut analyzers: Vec<Analyzer> = serde_yaml::from_str(
        &read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?,
    )
    .with_context(|| format!("invalid config {}", path.display()))?;

    let base = path.parent().unwrap_or(Path::new(""));
    for x in &mut analyzers {
        x.elements = base.join(&x.elements);
        x.items = base.join(&x.items);
        x.output = base.join(&x.output);
    }
    Ok(analyzers)
}

#[derive(Debug, Serialize)]
struct MatchRecord<'a> {
    item: &'a str,
    osm: OsmId,
    strength: MatchStrength,
    distance: u32,
    far: bool,
}

#[derive(Debug)]
pub struct Summary {
    pub name: String,
    pub items: usize,
    pub invalid: usize,
    pub elements: usize,
    pub counts: BTreeMap<CorrelationKind, usize>,
    pub violations: usize,
}

impl Analyzer {
    pub fn parameters(&self) -> Result<Parameters<RefItem, OsmElement>> {
        let mut builder = Parameters::<RefItem, OsmElement>::builder();
        if let Some(x) = self.near {
            builder = builder.near_distance(x);
        }
        if let Some(x) = self.far {
            builder = builder.far_distance(x);
        }
        if let Some(x) = &self.extra {
            builder = builder.extra_distance(x.strength, x.distance);
        }
        if let Some(x) = &self.labels {
            builder = builder.labels(DataItemLabels::new(&x.singular, &x.plural));
        }

        if !self.rules.is_empty() || self.fallback.is_some() {
            let rules = self.rules.clone();
            let fallback = self.fallback.unwrap_or(MatchStrength::Regular);
            builder =
                builder.compare(move |item, element| compare(&rules, fallback, item, element));
        }

        if let Some(tags) = self.lone.clone() {
            builder = builder.lone(move |element: &OsmElement| {
                tags.iter().all(|(k, v)| match element.tag(k) {
                    Some(x) => v == "*" || x == v,
                    None => false,
                })
            });
        }
        if let Some(x) = self.lone_at_any_distance {
            builder = builder.match_lone_regardless_of_distance(x);
        }

        if !self.preview.is_empty() {
            let keys = self.preview.clone();
            builder = builder.preview(move |element: &OsmElement| {
                keys.iter()
                    .filter_map(|k| element.tag(k).map(|v| format!("{k}={v}")))
                    .collect::<Vec<_>>()
                    .join(", ")
            });
        }

        Ok(builder
            .build()
            .with_context(|| format!("invalid parameters for {}", self.name))?)
    }

    pub fn validator(&self) -> Validator<RefItem> {
        Validator::new(
            self.validate
                .iter()
                .map(|x| match (&x.field, x.absent) {
                    (_, true) => ValidationRule::TagAbsent(x.tag.clone()),
                    (Some(field), false) => {
                        let field = field.clone();
                        ValidationRule::tag_equals(&x.tag, move |item: &RefItem| {
                            item.field(&field).map(|x| x.to_string())
                        })
                    }
                    (None, false) => ValidationRule::TagPresent(x.tag.clone()),
                })
                .collect(),
        )
    }

    pub fn run(&self, json: bool) -> Result<Summary> {
        let elements = load_elements(&self.elements)?;
        let items = load_items(&self.items)?;
        info!(
            "{}: {} elements, {} items ({} invalid)",
            self.name,
            elements.len(),
            items.valid.len(),
            items.invalid.len()
        );

        let correlator = Correlator::new(&elements, &items.valid, self.parameters()?);
        let report = correlator.parse();

        let mut sink = MarkdownReport::new(&self.name);
        let mut rendered = Vec::new();
        for name in &self.batches {
            let batch = batches::named::<RefItem, OsmElement>(name)
                .with_context(|| format!("unknown batch: {name}"))?;
            rendered.push(batch);
        }
        let rendered: Vec<_> = rendered.iter().map(|x| &**x).collect();
        report.render(&mut sink, &rendered);

        if !items.invalid.is_empty() {
            warn!("{}: skipped {} invalid items", self.name, items.invalid.len());
            sink.add_group(
                "invalid-items",
                "Invalid items",
                Some("Skipped because they can't be placed on the map."),
                None,
            );
            for x in &items.invalid {
                sink.add_entry("invalid-items", ReportEntry::Issue(x.to_string()));
            }
        }

        let validator = self.validator();
        let violations = if validator.is_empty() {
            0
        } else {
            validator.render(&report, &mut sink)
        };

        if let Some(x) = self.output.parent() {
            create_dir_all(x)?;
        }
        write(&self.output, sink.render())
            .with_context(|| format!("failed to write {}", self.output.display()))?;

        if json {
            let records: Vec<_> = report
                .correlations()
                .iter()
                .filter_map(|x| match x {
                    Correlation::Matched(p) | Correlation::MatchedFar(p) => Some(MatchRecord {
                        item: &p.item.id,
                        osm: p.element.id,
                        strength: p.strength,
                        distance: p.distance.round() as u32,
                        far: matches!(x, Correlation::MatchedFar(_)),
                    }),
                    _ => None,
                })
                .collect();
            let mut contents = serde_json::to_string_pretty(&records)?;
            contents.push('\n');
            write(self.output.with_extension("json"), contents)?;
        }

        let mut counts = BTreeMap::new();
        for kind in CorrelationKind::all() {
            counts.insert(kind, report.count(kind));
        }
        Ok(Summary {
            name: self.name.clone(),
            items: items.valid.len(),
            invalid: items.invalid.len(),
            elements: elements.len(),
            counts,
            violations,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn rule(tag: &str, field: &str, strength: MatchStrength) -> Rule {
        Rule {
            tag: tag.to_string(),
            field: field.to_string(),
            strength,
            fuzzy: false,
            veto: false,
        }
    }

    #[test]
    fn rules() {
        let item = RefItem::new("1", "Coles Central", 0.0, 0.0).with_tag("ref", "123");
        let element = OsmElement::new(OsmId::Node(1), 0.0, 0.0)
            .with_tag("ref", "99;123")
            .with_tag("name", "coles  central");

        let rules = vec![
            rule("name", "name", MatchStrength::Good),
            rule("ref", "ref", MatchStrength::Strong),
        ];
        assert_eq!(
            compare(&rules, MatchStrength::Regular, &item, &element),
            MatchStrength::Strong
        );

        let other = OsmElement::new(OsmId::Node(2), 0.0, 0.0).with_tag("ref", "7");
        assert_eq!(
            compare(&rules, MatchStrength::Regular, &item, &other),
            MatchStrength::Regular
        );

        let mut veto = rule("ref", "ref", MatchStrength::Strong);
        veto.veto = true;
        assert_eq!(
            compare(&[veto], MatchStrength::Regular, &item, &other),
            MatchStrength::Unmatched
        );

        let mut fuzzy = rule("name", "name", MatchStrength::Good);
        fuzzy.fuzzy = true;
        let typo = OsmElement::new(OsmId::Node(3), 0.0, 0.0).with_tag("name", "Coles Centrl");
        assert_eq!(
            compare(&[fuzzy], MatchStrength::Unmatched, &item, &typo),
            MatchStrength::Good
        );
    }

    #[test]
    fn run() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("osm.json"),
            r#"{"elements": [
                {"type": "node", "id": 1, "lat": -27.4700, "lon": 153.0200, "tags": {"amenity": "drinking_water", "ref": "T1"}},
                {"type": "node", "id": 2, "lat": -27.4800, "lon": 153.0300, "tags": {"amenity": "drinking_water"}},
                {"type": "way", "id": 3, "center": {"lat": -27.4900, "lon": 153.0400}, "tags": {"amenity": "fountain"}}
            ]}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("taps.jsonl"),
            concat!(
                r#"{"id": "T1", "lat": -27.4701, "lon": 153.0201, "name": "Park tap", "tags": {"ref": "T1"}}"#,
                "\n",
                r#"{"id": "T2", "lat": -27.4600, "lon": 153.0100, "name": "Creek tap"}"#,
                "\n",
                r#"{"id": "T3", "name": "Nowhere tap"}"#,
                "\n",
            ),
        )
        .unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            r#"
- name: Drinking water
  elements: osm.json
  items: taps.jsonl
  output: out/taps.md
  near: 30
  far: 100
  labels: { singular: tap, plural: taps }
  rules:
    - { tag: ref, field: ref, strength: strong, veto: true }
  lone: { amenity: drinking_water }
  preview: [ref]
  validate:
    - { tag: ref, field: id }
  batches: [statistics, matched, unmatched-item, matched-lone-osm, ignored-osm]
"#,
        )
        .unwrap();

        let analyzers = load(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(analyzers.len(), 1);
        let summary = analyzers[0].run(true).unwrap();
        assert_eq!(summary.items, 2);
        assert_eq!(summary.invalid, 1);
        assert_eq!(summary.counts[&CorrelationKind::Matched], 1);
        assert_eq!(summary.counts[&CorrelationKind::UnmatchedItem], 1);
        assert_eq!(summary.counts[&CorrelationKind::MatchedLoneOsm], 1);
        assert_eq!(summary.counts[&CorrelationKind::IgnoredOsm], 1);
        assert_eq!(summary.violations, 0);

        let md = fs::read_to_string(dir.path().join("out/taps.md")).unwrap();
        assert!(md.starts_with("# Drinking water\n\n## Statistics\n\n- 2 taps, 3 osm\n"));
        assert!(md.contains("## Matched taps"));
        assert!(md.contains("Park tap (T1) ↔ [node/1](https://www.openstreetmap.org/node/1) ref=T1 (strong, 15m)"));
        assert!(md.contains("## Unmatched taps\n\nNo OSM element found for these taps.\n\n- Creek tap (T2)"));
        assert!(md.contains("## Invalid items\n\nSkipped because they can't be placed on the map.\n\n- line 3: T3 (missing coordinate)\n"));
        assert!(md.contains("## Tagging\n\n"));
        assert!(md.contains("_No tagging problems found._"));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("out/taps.json")).unwrap())
                .unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"item": "T1", "osm": {"node": 1}, "strength": "strong", "distance": 15, "far": false}
            ])
        );
    }

    #[test]
    fn invalid_parameters() {
        let analyzer: Vec<Analyzer> = serde_yaml::from_str(
            "- { name: x, elements: a, items: b, output: c, near: 100, far: 10 }",
        )
        .unwrap();
        let err = analyzer[0].parameters().unwrap_err();
        assert!(format!("{err:#}").contains("far distance 10 is shorter than near distance 100"));
    }

    #[test]
    fn unknown_field() {
        let result: Result<Vec<Analyzer>, _> =
            serde_yaml::from_str("- { name: x, elements: a, items: b, output: c, nearby: 5 }");
        assert!(result.is_err());
    }
}
