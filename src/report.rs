use std::fmt::{self, Write};

use geo::Point;
use log::warn;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MapPointStyle {
    Okay,
    Info,
    Warning,
    Problem,
}

impl MapPointStyle {
    fn marker(&self) -> &'static str {
        match self {
            Self::Okay => "ok",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Problem => "problem",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReportEntry {
    Issue(String),
    MapPoint {
        text: String,
        point: Point,
        style: MapPointStyle,
    },
    Description(String),
}

/// Where batches write what they found.
pub trait Report {
    fn add_group(
        &mut self,
        id: &str,
        title: &str,
        description: Option<&str>,
        empty_text: Option<&str>,
    );

    fn add_entry(&mut self, group: &str, entry: ReportEntry);
}

/// Link to a location on the OSM website.
pub fn map_link(point: Point) -> String {
    let (lon, lat) = point.x_y();
    format!("https://www.openstreetmap.org/?mlat={lat:.6}&mlon={lon:.6}#map=19/{lat:.6}/{lon:.6}")
}

#[derive(Debug)]
pub struct ReportGroup {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub empty_text: Option<String>,
    pub entries: Vec<ReportEntry>,
}

/// Collects groups in the order they were added and renders them as a
/// markdown document.
#[derive(Debug, Default)]
pub struct MarkdownReport {
    title: Option<String>,
    groups: Vec<ReportGroup>,
}

impl MarkdownReport {
    pub fn new(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            groups: Vec::new(),
        }
    }

    pub fn groups(&self) -> &[ReportGroup] {
        &self.groups
    }

    pub fn group(&self, id: &str) -> Option<&ReportGroup> {
        self.groups.iter().find(|x| x.id == id)
    }

    pub fn entries(&self, id: &str) -> &[ReportEntry] {
        self.group(id).map(|x| &*x.entries).unwrap_or_default()
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl Report for MarkdownReport {
    fn add_group(
        &mut self,
        id: &str,
        title: &str,
        description: Option<&str>,
        empty_text: Option<&str>,
    ) {
        if self.group(id).is_some() {
            return;
        }

        self.groups.push(ReportGroup {
            id: id.to_string(),
            title: title.to_string(),
            description: description.map(|x| x.to_string()),
            empty_text: empty_text.map(|x| x.to_string()),
            entries: Vec::new(),
        });
    }

    fn add_entry(&mut self, group: &str, entry: ReportEntry) {
        if self.group(group).is_none() {
            warn!("entry added to unknown group {group:?}");
            self.add_group(group, group, None, None);
        }
        if let Some(x) = self.groups.iter_mut().find(|x| x.id == group) {
            x.entries.push(entry);
        }
    }
}

impl fmt::Display for MarkdownReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(x) = &self.title {
            writeln!(f, "# {x}\n")?;
        }

        for group in &self.groups {
            writeln!(f, "## {}\n", group.title)?;
            if let Some(x) = &group.description {
                writeln!(f, "{x}\n")?;
            }
            if group.entries.is_empty() {
                if let Some(x) = &group.empty_text {
                    writeln!(f, "_{x}_\n")?;
                }
                continue;
            }

            let mut listing = false;
            for entry in &group.entries {
                match entry {
                    ReportEntry::Description(x) => {
                        if listing {
                            f.write_char('\n')?;
                            listing = false;
                        }
                        writeln!(f, "{x}\n")?;
                    }
                    ReportEntry::Issue(x) => {
                        writeln!(f, "- {x}")?;
                        listing = true;
                    }
                    ReportEntry::MapPoint { text, point, style } => {
                        writeln!(
                            f,
                            "- [{}] {text} ([map]({}))",
                            style.marker(),
                            map_link(*point)
                        )?;
                        listing = true;
                    }
                }
            }
            if listing {
                f.write_char('\n')?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render() {
        let mut report = MarkdownReport::new("Taps");
        report.add_group("stats", "Statistics", None, None);
        report.add_group("missing", "Missing", Some("Not on the map."), None);
        report.add_group("none", "Nothing", None, Some("All good."));
        report.add_entry("stats", ReportEntry::Description("- 3 taps".to_string()));
        report.add_entry("missing", ReportEntry::Issue("Tap 1".to_string()));
        report.add_entry(
            "missing",
            ReportEntry::MapPoint {
                text: "Tap 2".to_string(),
                point: Point::new(151.2, -33.9),
                style: MapPointStyle::Problem,
            },
        );

        assert_eq!(
            report.render(),
            concat!(
                "# Taps\n\n",
                "## Statistics\n\n",
                "- 3 taps\n\n",
                "## Missing\n\n",
                "Not on the map.\n\n",
                "- Tap 1\n",
                "- [problem] Tap 2 ([map](https://www.openstreetmap.org/?mlat=-33.900000&mlon=151.200000#map=19/-33.900000/151.200000))\n\n",
                "## Nothing\n\n",
                "_All good._\n\n",
            )
        );
    }

    #[test]
    fn groups() {
        let mut report = MarkdownReport::default();
        report.add_group("a", "A", None, None);
        report.add_group("a", "Again", None, None);
        report.add_entry("b", ReportEntry::Issue("x".to_string()));

        assert_eq!(report.groups().len(), 2);
        assert_eq!(report.group("a").unwrap().title, "A");
        assert_eq!(report.entries("b").len(), 1);
        assert!(report.entries("c").is_empty());
    }
}
