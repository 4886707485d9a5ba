use std::fmt;

use thiserror::Error;

use crate::MatchStrength;

/// Metres.
pub const DEFAULT_NEAR_DISTANCE: f64 = 50.0;

pub type CompareFn<T, E> = Box<dyn Fn(&T, &E) -> MatchStrength + Send + Sync>;
pub type LoneFn<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;
pub type PreviewFn<E> = Box<dyn Fn(&E) -> String + Send + Sync>;

#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("near distance must be a positive number of metres, got {0}")]
    NearDistance(f64),
    #[error("far distance {far} is shorter than near distance {near}")]
    FarDistance { near: f64, far: f64 },
    #[error("extra distance {extra} must be beyond far distance {far}")]
    ExtraDistance { far: f64, extra: f64 },
    #[error("{0} needs a minimum strength that is an actual match")]
    MinimumStrength(&'static str),
    #[error("matching lone elements regardless of distance needs a lone predicate")]
    MissingLonePredicate,
}

/// Singular and plural nouns for the kind of data item being checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataItemLabels {
    pub singular: String,
    pub plural: String,
}

impl DataItemLabels {
    pub fn new(singular: &str, plural: &str) -> Self {
        Self {
            singular: singular.to_string(),
            plural: plural.to_string(),
        }
    }

    pub fn noun(&self, count: usize) -> &str {
        if count == 1 {
            &self.singular
        } else {
            &self.plural
        }
    }

    /// "1 shop", "3 shops"
    pub fn count(&self, count: usize) -> String {
        format!("{count} {}", self.noun(count))
    }
}

impl Default for DataItemLabels {
    fn default() -> Self {
        Self::new("item", "items")
    }
}

/// Distance beyond the far threshold that is still accepted as a regular
/// match when the comparison is confident enough.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ExtraDistance {
    pub min_strength: MatchStrength,
    pub distance: f64,
}

/// Thresholds and callbacks of one correlation run.
pub struct Parameters<T, E> {
    near_distance: f64,
    far_distance: f64,
    extra_distance: Option<ExtraDistance>,
    lone_override: Option<MatchStrength>,
    labels: DataItemLabels,
    compare: Option<CompareFn<T, E>>,
    lone: Option<LoneFn<E>>,
    preview: Option<PreviewFn<E>>,
}

impl<T, E> Parameters<T, E> {
    pub fn builder() -> ParametersBuilder<T, E> {
        ParametersBuilder::default()
    }

    pub fn near_distance(&self) -> f64 {
        self.near_distance
    }

    pub fn far_distance(&self) -> f64 {
        self.far_distance
    }

    pub fn extra_distance(&self) -> Option<ExtraDistance> {
        self.extra_distance
    }

    pub fn lone_override(&self) -> Option<MatchStrength> {
        self.lone_override
    }

    pub fn labels(&self) -> &DataItemLabels {
        &self.labels
    }

    /// Radius that covers every distance a match could be accepted at.
    pub fn search_distance(&self) -> f64 {
        if self.lone_override.is_some() {
            return f64::INFINITY;
        }
        match self.extra_distance {
            Some(x) => x.distance.max(self.far_distance),
            None => self.far_distance,
        }
    }

    /// Strength of a candidate pairing, `Good` for everything when no
    /// comparison was configured.
    pub fn compare(&self, item: &T, element: &E) -> MatchStrength {
        match &self.compare {
            Some(f) => f(item, element),
            None => MatchStrength::Good,
        }
    }

    pub fn has_lone_predicate(&self) -> bool {
        self.lone.is_some()
    }

    /// `None` when no lone predicate was configured.
    pub fn is_lone(&self, element: &E) -> Option<bool> {
        self.lone.as_ref().map(|f| f(element))
    }

    pub fn preview(&self, element: &E) -> Option<String> {
        self.preview.as_ref().map(|f| f(element))
    }
}

impl<T, E> fmt::Debug for Parameters<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameters")
            .field("near_distance", &self.near_distance)
            .field("far_distance", &self.far_distance)
            .field("extra_distance", &self.extra_distance)
            .field("lone_override", &self.lone_override)
            .field("labels", &self.labels)
            .field("compare", &self.compare.is_some())
            .field("lone", &self.lone.is_some())
            .field("preview", &self.preview.is_some())
            .finish()
    }
}

pub struct ParametersBuilder<T, E> {
    near_distance: Option<f64>,
    far_distance: Option<f64>,
    extra_distance: Option<ExtraDistance>,
    lone_override: Option<MatchStrength>,
    labels: DataItemLabels,
    compare: Option<CompareFn<T, E>>,
    lone: Option<LoneFn<E>>,
    preview: Option<PreviewFn<E>>,
}

impl<T, E> Default for ParametersBuilder<T, E> {
    fn default() -> Self {
        Self {
            near_distance: None,
            far_distance: None,
            extra_distance: None,
            lone_override: None,
            labels: DataItemLabels::default(),
            compare: None,
            lone: None,
            preview: None,
        }
    }
}

impl<T, E> ParametersBuilder<T, E> {
    pub fn near_distance(mut self, metres: f64) -> Self {
        self.near_distance = Some(metres);
        self
    }

    pub fn far_distance(mut self, metres: f64) -> Self {
        self.far_distance = Some(metres);
        self
    }

    pub fn extra_distance(mut self, min_strength: MatchStrength, metres: f64) -> Self {
        self.extra_distance = Some(ExtraDistance {
            min_strength,
            distance: metres,
        });
        self
    }

    /// Accept lone elements scoring at least `min_strength` at any distance.
    pub fn match_lone_regardless_of_distance(mut self, min_strength: MatchStrength) -> Self {
        self.lone_override = Some(min_strength);
        self
    }

    pub fn labels(mut self, labels: DataItemLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn compare(
        mut self,
        f: impl Fn(&T, &E) -> MatchStrength + Send + Sync + 'static,
    ) -> Self {
        self.compare = Some(Box::new(f));
        self
    }

    pub fn lone(mut self, f: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.lone = Some(Box::new(f));
        self
    }

    pub fn preview(mut self, f: impl Fn(&E) -> String + Send + Sync + 'static) -> Self {
        self.preview = Some(Box::new(f));
        self
    }

    pub fn build(self) -> Result<Parameters<T, E>, ParameterError> {
        let near_distance = self.near_distance.unwrap_or(DEFAULT_NEAR_DISTANCE);
        if !near_distance.is_finite() || near_distance <= 0.0 {
            return Err(ParameterError::NearDistance(near_distance));
        }

        let far_distance = self.far_distance.unwrap_or(near_distance);
        if far_distance.is_nan() || far_distance < near_distance || far_distance.is_infinite() {
            return Err(ParameterError::FarDistance {
                near: near_distance,
                far: far_distance,
            });
        }

        if let Some(extra) = self.extra_distance {
            if !extra.min_strength.is_match() {
                return Err(ParameterError::MinimumStrength("extra distance"));
            }
            if !extra.distance.is_finite() || extra.distance <= far_distance {
                return Err(ParameterError::ExtraDistance {
                    far: far_distance,
                    extra: extra.distance,
                });
            }
        }

        if let Some(x) = self.lone_override {
            if !x.is_match() {
                return Err(ParameterError::MinimumStrength("lone override"));
            }
            if self.lone.is_none() {
                return Err(ParameterError::MissingLonePredicate);
            }
        }

        Ok(Parameters {
            near_distance,
            far_distance,
            extra_distance: self.extra_distance,
            lone_override: self.lone_override,
            labels: self.labels,
            compare: self.compare,
            lone: self.lone,
            preview: self.preview,
        })
    }
}
