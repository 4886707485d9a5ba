//! Formatters turning a [`CorrelationReport`] into report entries.
//!
//! Each batch covers a fixed set of correlation kinds, so callers render
//! exactly the parts they care about.

use std::fmt::{self, Write};

use log::warn;

use crate::{
    correlation::{Correlation, CorrelationKind, CorrelationReport, Pair, Rescue},
    report::{map_link, MapPointStyle, Report, ReportEntry},
    DataItem, MapElement, Parameters,
};

pub trait Batch<T, E> {
    fn kinds(&self) -> Vec<CorrelationKind>;

    fn render(&self, report: &CorrelationReport<T, E>, sink: &mut dyn Report);
}

/// Looks a batch up by the slug of the kind it lists, or `statistics`.
pub fn named<T: DataItem, E: MapElement>(name: &str) -> Option<Box<dyn Batch<T, E>>> {
    let batch: Box<dyn Batch<T, E>> = match name {
        "matched" => Box::new(MatchedPairs),
        "matched-far" => Box::new(MatchedFarPairs),
        "unmatched-item" => Box::new(UnmatchedItems),
        "unmatched-osm" => Box::new(UnmatchedOsm),
        "matched-lone-osm" => Box::new(MatchedLoneOsm),
        "ignored-osm" => Box::new(IgnoredOsm),
        "statistics" => Box::new(Statistics),
        _ => return None,
    };
    Some(batch)
}

/// Element link, followed by its preview if one is configured.
pub fn describe_element<T, E: MapElement>(params: &Parameters<T, E>, element: &E) -> String {
    let link = format!("[{}]({})", element.id(), element.url());
    match params.preview(element) {
        Some(x) if !x.is_empty() => format!("{link} {x}"),
        _ => link,
    }
}

fn describe_pair<T: DataItem, E: MapElement>(
    params: &Parameters<T, E>,
    pair: &Pair<'_, T, E>,
) -> String {
    let mut text = format!(
        "{} ↔ {} ({}, {:.0}m",
        pair.item.report_string(),
        describe_element(params, pair.element),
        pair.strength,
        pair.distance
    );
    match pair.rescue {
        Some(Rescue::ExtraDistance) => text.push_str(", beyond far distance"),
        Some(Rescue::LoneOverride) => text.push_str(", lone element at any distance"),
        None => {}
    }
    text.push(')');
    text
}

fn select<'r, 'a, T, E>(
    report: &'r CorrelationReport<'a, T, E>,
    kinds: Vec<CorrelationKind>,
) -> impl Iterator<Item = &'r Correlation<'a, T, E>> + 'r {
    report
        .correlations()
        .iter()
        .filter(move |x| kinds.contains(&x.kind()))
}

/// Matched pairs as map points at the element.
pub struct MatchedPairs;

impl<T: DataItem, E: MapElement> Batch<T, E> for MatchedPairs {
    fn kinds(&self) -> Vec<CorrelationKind> {
        vec![CorrelationKind::Matched]
    }

    fn render(&self, report: &CorrelationReport<T, E>, sink: &mut dyn Report) {
        let params = report.params();
        let labels = params.labels();
        let count = report.count(CorrelationKind::Matched);
        sink.add_group(
            "matched",
            &format!("Matched {}", labels.plural),
            Some(&format!(
                "{} matched to OSM within {:.0}m.",
                labels.count(count),
                params.near_distance()
            )),
            Some(&format!("No {} matched.", labels.plural)),
        );

        for x in select(report, Batch::<T, E>::kinds(self)).filter_map(|x| x.pair()) {
            sink.add_entry(
                "matched",
                ReportEntry::MapPoint {
                    text: describe_pair(params, x),
                    point: x.element.point(),
                    style: MapPointStyle::Okay,
                },
            );
        }
    }
}

/// Pairs matched between the near and far distance, which deserve a look.
pub struct MatchedFarPairs;

impl<T: DataItem, E: MapElement> Batch<T, E> for MatchedFarPairs {
    fn kinds(&self) -> Vec<CorrelationKind> {
        vec![CorrelationKind::MatchedFar]
    }

    fn render(&self, report: &CorrelationReport<T, E>, sink: &mut dyn Report) {
        let params = report.params();
        let labels = params.labels();
        sink.add_group(
            "matched-far",
            "Far matches",
            Some(&format!(
                "Matched further than {:.0}m away, the OSM element might be a different {}.",
                params.near_distance(),
                labels.singular
            )),
            None,
        );

        for x in select(report, Batch::<T, E>::kinds(self)).filter_map(|x| x.pair()) {
            sink.add_entry(
                "matched-far",
                ReportEntry::MapPoint {
                    text: describe_pair(params, x),
                    point: x.element.point(),
                    style: MapPointStyle::Warning,
                },
            );
        }
    }
}

/// Data items missing from the map, as issues.
pub struct UnmatchedItems;

impl<T: DataItem, E: MapElement> Batch<T, E> for UnmatchedItems {
    fn kinds(&self) -> Vec<CorrelationKind> {
        vec![CorrelationKind::UnmatchedItem]
    }

    fn render(&self, report: &CorrelationReport<T, E>, sink: &mut dyn Report) {
        let labels = report.params().labels();
        sink.add_group(
            "unmatched-item",
            &format!("Unmatched {}", labels.plural),
            Some(&format!(
                "No OSM element found for these {}.",
                labels.plural
            )),
            Some(&format!("All {} matched.", labels.plural)),
        );

        for x in select(report, Batch::<T, E>::kinds(self)).filter_map(|x| x.item()) {
            sink.add_entry(
                "unmatched-item",
                ReportEntry::Issue(format!(
                    "{} ([location]({}))",
                    x.report_string(),
                    map_link(x.point())
                )),
            );
        }
    }
}

/// Map elements that should have matched a data item but didn't.
pub struct UnmatchedOsm;

impl<T: DataItem, E: MapElement> Batch<T, E> for UnmatchedOsm {
    fn kinds(&self) -> Vec<CorrelationKind> {
        vec![CorrelationKind::UnmatchedOsm]
    }

    fn render(&self, report: &CorrelationReport<T, E>, sink: &mut dyn Report) {
        let params = report.params();
        sink.add_group(
            "unmatched-osm",
            "Unmatched OSM elements",
            Some(&format!(
                "Not matched to any {}.",
                params.labels().singular
            )),
            None,
        );

        for x in select(report, Batch::<T, E>::kinds(self)).filter_map(|x| x.element()) {
            sink.add_entry(
                "unmatched-osm",
                ReportEntry::Issue(describe_element(params, x)),
            );
        }
    }
}

/// Unmatched map elements that still look like genuine instances.
pub struct MatchedLoneOsm;

impl<T: DataItem, E: MapElement> Batch<T, E> for MatchedLoneOsm {
    fn kinds(&self) -> Vec<CorrelationKind> {
        vec![CorrelationKind::MatchedLoneOsm]
    }

    fn render(&self, report: &CorrelationReport<T, E>, sink: &mut dyn Report) {
        let params = report.params();
        sink.add_group(
            "matched-lone-osm",
            "Lone OSM elements",
            Some(&format!(
                "Not matched to any {}, but look like one.",
                params.labels().singular
            )),
            None,
        );

        for x in select(report, Batch::<T, E>::kinds(self)).filter_map(|x| x.element()) {
            sink.add_entry(
                "matched-lone-osm",
                ReportEntry::MapPoint {
                    text: describe_element(params, x),
                    point: x.point(),
                    style: MapPointStyle::Info,
                },
            );
        }
    }
}

pub struct IgnoredOsm;

impl<T: DataItem, E: MapElement> Batch<T, E> for IgnoredOsm {
    fn kinds(&self) -> Vec<CorrelationKind> {
        vec![CorrelationKind::IgnoredOsm]
    }

    fn render(&self, report: &CorrelationReport<T, E>, sink: &mut dyn Report) {
        let params = report.params();
        sink.add_group(
            "ignored-osm",
            "Ignored OSM elements",
            Some("Unmatched, and not what is being checked here."),
            None,
        );

        for x in select(report, Batch::<T, E>::kinds(self)).filter_map(|x| x.element()) {
            sink.add_entry(
                "ignored-osm",
                ReportEntry::MapPoint {
                    text: describe_element(params, x),
                    point: x.point(),
                    style: MapPointStyle::Info,
                },
            );
        }
    }
}

fn statistics<T, E>(report: &CorrelationReport<T, E>) -> Result<String, fmt::Error> {
    let labels = report.params().labels();
    let count = |kind| report.count(kind);

    let mut md = String::new();
    writeln!(
        md,
        "- {}, {} osm",
        labels.count(report.item_count()),
        report.element_count()
    )?;
    writeln!(
        md,
        "- {} matched, {} matched far, {} unmatched",
        count(CorrelationKind::Matched),
        count(CorrelationKind::MatchedFar),
        count(CorrelationKind::UnmatchedItem)
    )?;
    writeln!(
        md,
        "- {} osm unmatched, {} lone, {} ignored",
        count(CorrelationKind::UnmatchedOsm),
        count(CorrelationKind::MatchedLoneOsm),
        count(CorrelationKind::IgnoredOsm)
    )?;
    if report.item_count() > 0 {
        write!(
            md,
            "- {:.01}% conflated",
            report.pairs().count() as f64 / report.item_count() as f64 * 100.0
        )?;
    }
    Ok(md)
}

/// Counts of every correlation kind.
pub struct Statistics;

impl<T: DataItem, E: MapElement> Batch<T, E> for Statistics {
    fn kinds(&self) -> Vec<CorrelationKind> {
        CorrelationKind::all()
    }

    fn render(&self, report: &CorrelationReport<T, E>, sink: &mut dyn Report) {
        let md = match statistics(report) {
            Ok(x) => x,
            Err(e) => {
                warn!("failed to format statistics: {e}");
                return;
            }
        };

        sink.add_group("statistics", "Statistics", None, None);
        sink.add_entry(
            "statistics",
            ReportEntry::Description(md.trim_end().to_string()),
        );
    }
}
