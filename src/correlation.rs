use std::fmt;

use crate::{report::Report, Batch, MatchStrength, Parameters};

/// Why a match beyond the far distance was accepted anyway.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rescue {
    ExtraDistance,
    LoneOverride,
}

/// A data item paired with the map element that won it.
#[derive(Debug)]
pub struct Pair<'a, T, E> {
    pub item: &'a T,
    pub element: &'a E,
    pub strength: MatchStrength,
    /// Metres.
    pub distance: f64,
    pub rescue: Option<Rescue>,
}

impl<T, E> Clone for Pair<'_, T, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, E> Copy for Pair<'_, T, E> {}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CorrelationKind {
    Matched,
    MatchedFar,
    UnmatchedItem,
    UnmatchedOsm,
    MatchedLoneOsm,
    IgnoredOsm,
}

impl CorrelationKind {
    pub fn all() -> Vec<Self> {
        vec![
            Self::Matched,
            Self::MatchedFar,
            Self::UnmatchedItem,
            Self::UnmatchedOsm,
            Self::MatchedLoneOsm,
            Self::IgnoredOsm,
        ]
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::MatchedFar => "matched-far",
            Self::UnmatchedItem => "unmatched-item",
            Self::UnmatchedOsm => "unmatched-osm",
            Self::MatchedLoneOsm => "matched-lone-osm",
            Self::IgnoredOsm => "ignored-osm",
        }
    }
}

impl fmt::Display for CorrelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

#[derive(Debug)]
pub enum Correlation<'a, T, E> {
    Matched(Pair<'a, T, E>),
    /// Matched, but further away than the near distance.
    MatchedFar(Pair<'a, T, E>),
    UnmatchedItem(&'a T),
    UnmatchedOsm(&'a E),
    /// Unmatched, but plausibly a real instance of what is being checked.
    MatchedLoneOsm(&'a E),
    /// Unmatched, and not something the check is interested in.
    IgnoredOsm(&'a E),
}

impl<T, E> Clone for Correlation<'_, T, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, E> Copy for Correlation<'_, T, E> {}

impl<'a, T, E> Correlation<'a, T, E> {
    pub fn kind(&self) -> CorrelationKind {
        match self {
            Self::Matched(_) => CorrelationKind::Matched,
            Self::MatchedFar(_) => CorrelationKind::MatchedFar,
            Self::UnmatchedItem(_) => CorrelationKind::UnmatchedItem,
            Self::UnmatchedOsm(_) => CorrelationKind::UnmatchedOsm,
            Self::MatchedLoneOsm(_) => CorrelationKind::MatchedLoneOsm,
            Self::IgnoredOsm(_) => CorrelationKind::IgnoredOsm,
        }
    }

    pub fn pair(&self) -> Option<&Pair<'a, T, E>> {
        match self {
            Self::Matched(x) | Self::MatchedFar(x) => Some(x),
            _ => None,
        }
    }

    pub fn item(&self) -> Option<&'a T> {
        match self {
            Self::Matched(x) | Self::MatchedFar(x) => Some(x.item),
            Self::UnmatchedItem(x) => Some(x),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<&'a E> {
        match self {
            Self::Matched(x) | Self::MatchedFar(x) => Some(x.element),
            Self::UnmatchedOsm(x) | Self::MatchedLoneOsm(x) | Self::IgnoredOsm(x) => Some(x),
            Self::UnmatchedItem(_) => None,
        }
    }
}

/// The outcome of one correlation run: one entry per data item, in input
/// order, followed by the map elements no item claimed.
pub struct CorrelationReport<'a, T, E> {
    correlations: Vec<Correlation<'a, T, E>>,
    params: &'a Parameters<T, E>,
    item_count: usize,
    element_count: usize,
}

impl<'a, T, E> CorrelationReport<'a, T, E> {
    pub(crate) fn new(
        correlations: Vec<Correlation<'a, T, E>>,
        params: &'a Parameters<T, E>,
        item_count: usize,
        element_count: usize,
    ) -> Self {
        Self {
            correlations,
            params,
            item_count,
            element_count,
        }
    }

    pub fn correlations(&self) -> &[Correlation<'a, T, E>] {
        &self.correlations
    }

    pub fn params(&self) -> &'a Parameters<T, E> {
        self.params
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    pub fn of_kind(
        &self,
        kind: CorrelationKind,
    ) -> impl Iterator<Item = &Correlation<'a, T, E>> + '_ {
        self.correlations.iter().filter(move |x| x.kind() == kind)
    }

    pub fn count(&self, kind: CorrelationKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Both near and far matches.
    pub fn pairs(&self) -> impl Iterator<Item = &Pair<'a, T, E>> + '_ {
        self.correlations.iter().filter_map(|x| x.pair())
    }

    pub fn matched(&self) -> impl Iterator<Item = &Pair<'a, T, E>> + '_ {
        self.correlations.iter().filter_map(|x| match x {
            Correlation::Matched(x) => Some(x),
            _ => None,
        })
    }

    pub fn matched_far(&self) -> impl Iterator<Item = &Pair<'a, T, E>> + '_ {
        self.correlations.iter().filter_map(|x| match x {
            Correlation::MatchedFar(x) => Some(x),
            _ => None,
        })
    }

    pub fn unmatched_items(&self) -> impl Iterator<Item = &'a T> + '_ {
        self.correlations.iter().filter_map(|x| match x {
            Correlation::UnmatchedItem(x) => Some(*x),
            _ => None,
        })
    }

    pub fn unmatched_osm(&self) -> impl Iterator<Item = &'a E> + '_ {
        self.elements_of(CorrelationKind::UnmatchedOsm)
    }

    pub fn matched_lone_osm(&self) -> impl Iterator<Item = &'a E> + '_ {
        self.elements_of(CorrelationKind::MatchedLoneOsm)
    }

    pub fn ignored_osm(&self) -> impl Iterator<Item = &'a E> + '_ {
        self.elements_of(CorrelationKind::IgnoredOsm)
    }

    fn elements_of(&self, kind: CorrelationKind) -> impl Iterator<Item = &'a E> + '_ {
        self.of_kind(kind).filter_map(|x| x.element())
    }

    /// Writes the selected batches into `sink`. Rendering only reads the
    /// report, so it can be repeated with other sinks or batches.
    pub fn render(&self, sink: &mut dyn Report, batches: &[&dyn Batch<T, E>]) {
        for batch in batches {
            batch.render(self, sink);
        }
    }
}
