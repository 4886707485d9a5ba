use log::{debug, info, trace};

use crate::{
    correlation::{Correlation, CorrelationKind, CorrelationReport, Pair, Rescue},
    spatial::{Neighbour, SpatialIndex},
    DataItem, MapElement, MatchStrength, Parameters,
};

enum Acceptance {
    Near,
    Far,
    Rescued(Rescue),
}

/// Pairs every data item with at most one map element.
///
/// Items are processed in the order given. Each item ranks its unclaimed
/// candidates (strongest first, then nearest) and the winner is classified by
/// its distance; a winner too far away for its strength leaves the item
/// unmatched. A claimed element is out of reach for every later item, so
/// reordering the items can change the result.
pub struct Correlator<'a, T, E> {
    items: &'a [T],
    index: SpatialIndex<'a, E>,
    params: Parameters<T, E>,
}

impl<'a, T: DataItem, E: MapElement> Correlator<'a, T, E> {
    pub fn new(elements: &'a [E], items: &'a [T], params: Parameters<T, E>) -> Self {
        Self {
            items,
            index: SpatialIndex::new(elements),
            params,
        }
    }

    pub fn params(&self) -> &Parameters<T, E> {
        &self.params
    }

    pub fn parse(&self) -> CorrelationReport<'_, T, E> {
        let elements = self.index.elements();
        let search_distance = self.params.search_distance();
        let mut claimed = vec![false; elements.len()];
        let mut correlations = Vec::with_capacity(self.items.len());

        for item in self.items {
            let candidates = self.index.find_all_within(item.point(), search_distance);

            let mut best: Option<(Neighbour<'a, E>, MatchStrength)> = None;
            for candidate in candidates {
                if claimed[candidate.index] {
                    continue;
                }

                let strength = self.params.compare(item, candidate.element);
                if !strength.is_match() {
                    continue;
                }

                // candidates arrive nearest first, so only a stronger one can win
                let wins = match &best {
                    Some((x, s)) => {
                        if *s == strength && x.distance == candidate.distance {
                            debug!(
                                "{}: {} and {} tie at {:.0}m, keeping {}",
                                item.name(),
                                x.element.id(),
                                candidate.element.id(),
                                x.distance,
                                x.element.id()
                            );
                        }
                        strength > *s
                    }
                    None => true,
                };
                if wins {
                    best = Some((candidate, strength));
                }
            }

            let Some((winner, strength)) = best else {
                trace!("{}: no candidates", item.name());
                correlations.push(Correlation::UnmatchedItem(item));
                continue;
            };
            let Some(acceptance) = self.accept(winner.element, strength, winner.distance) else {
                trace!(
                    "{}: best candidate {} ({strength}) too far at {:.0}m",
                    item.name(),
                    winner.element.id(),
                    winner.distance
                );
                correlations.push(Correlation::UnmatchedItem(item));
                continue;
            };

            claimed[winner.index] = true;
            let pair = |rescue| Pair {
                item,
                element: winner.element,
                strength,
                distance: winner.distance,
                rescue,
            };
            trace!(
                "{}: {} ({strength}, {:.0}m)",
                item.name(),
                winner.element.id(),
                winner.distance
            );
            correlations.push(match acceptance {
                Acceptance::Near => Correlation::Matched(pair(None)),
                Acceptance::Far => Correlation::MatchedFar(pair(None)),
                Acceptance::Rescued(x) => Correlation::Matched(pair(Some(x))),
            });
        }

        for (element, _) in elements.iter().zip(&claimed).filter(|(_, x)| !**x) {
            correlations.push(match self.params.is_lone(element) {
                Some(true) => Correlation::MatchedLoneOsm(element),
                Some(false) => Correlation::IgnoredOsm(element),
                None => Correlation::UnmatchedOsm(element),
            });
        }

        let report =
            CorrelationReport::new(correlations, &self.params, self.items.len(), elements.len());
        info!(
            "correlated {} against {} elements: {} matched, {} far, {} unmatched",
            self.params.labels().count(self.items.len()),
            elements.len(),
            report.count(CorrelationKind::Matched),
            report.count(CorrelationKind::MatchedFar),
            report.count(CorrelationKind::UnmatchedItem),
        );
        report
    }

    /// How a candidate scoring `strength` at `distance` would be classified,
    /// if at all.
    fn accept(&self, element: &E, strength: MatchStrength, distance: f64) -> Option<Acceptance> {
        if distance <= self.params.near_distance() {
            return Some(Acceptance::Near);
        }
        if distance <= self.params.far_distance() {
            return Some(Acceptance::Far);
        }
        if let Some(extra) = self.params.extra_distance() {
            if distance <= extra.distance && strength >= extra.min_strength {
                return Some(Acceptance::Rescued(Rescue::ExtraDistance));
            }
        }
        if let Some(min_strength) = self.params.lone_override() {
            if strength >= min_strength && self.params.is_lone(element) == Some(true) {
                return Some(Acceptance::Rescued(Rescue::LoneOverride));
            }
        }
        None
    }
}
