use crate::{
    batches::describe_element,
    correlation::CorrelationReport,
    report::{Report, ReportEntry},
    DataItem, MapElement,
};

pub type ExpectedFn<T> = Box<dyn Fn(&T) -> Option<String> + Send + Sync>;

pub enum ValidationRule<T> {
    TagPresent(String),
    TagAbsent(String),
    /// The tag must hold the value derived from the data item. Items that
    /// yield `None` aren't checked.
    TagEquals { key: String, expected: ExpectedFn<T> },
}

impl<T> ValidationRule<T> {
    pub fn tag_equals(
        key: &str,
        expected: impl Fn(&T) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self::TagEquals {
            key: key.to_string(),
            expected: Box::new(expected),
        }
    }
}

#[derive(Debug)]
pub struct Violation<'a, T, E> {
    pub item: &'a T,
    pub element: &'a E,
    pub message: String,
}

/// Checks the tagging of every matched element against its data item.
pub struct Validator<T> {
    rules: Vec<ValidationRule<T>>,
}

impl<T> Default for Validator<T> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<T: DataItem> Validator<T> {
    pub fn new(rules: Vec<ValidationRule<T>>) -> Self {
        Self { rules }
    }

    pub fn rule(mut self, rule: ValidationRule<T>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn validate<'a, E: MapElement>(
        &self,
        report: &CorrelationReport<'a, T, E>,
    ) -> Vec<Violation<'a, T, E>> {
        let mut violations = Vec::new();
        for pair in report.pairs() {
            for rule in &self.rules {
                let message = match rule {
                    ValidationRule::TagPresent(key) => match pair.element.tag(key) {
                        Some(_) => None,
                        None => Some(format!("missing {key}")),
                    },
                    ValidationRule::TagAbsent(key) => pair
                        .element
                        .tag(key)
                        .map(|x| format!("unexpected {key}={x}")),
                    ValidationRule::TagEquals { key, expected } => {
                        match (expected(pair.item), pair.element.tag(key)) {
                            (None, _) => None,
                            (Some(x), None) => Some(format!("missing {key}, expected {x}")),
                            (Some(x), Some(y)) if x != y => {
                                Some(format!("{key}={y}, expected {x}"))
                            }
                            _ => None,
                        }
                    }
                };

                if let Some(message) = message {
                    violations.push(Violation {
                        item: pair.item,
                        element: pair.element,
                        message,
                    });
                }
            }
        }
        violations
    }

    /// Validates and writes every violation as an issue. Returns how many
    /// were found.
    pub fn render<E: MapElement>(
        &self,
        report: &CorrelationReport<'_, T, E>,
        sink: &mut dyn Report,
    ) -> usize {
        let params = report.params();
        let violations = self.validate(report);
        sink.add_group(
            "validation",
            "Tagging",
            Some(&format!(
                "Matched OSM elements whose tags disagree with the {} data.",
                params.labels().singular
            )),
            Some("No tagging problems found."),
        );
        for x in &violations {
            sink.add_entry(
                "validation",
                ReportEntry::Issue(format!(
                    "{}: {} ({})",
                    describe_element(params, x.element),
                    x.message,
                    x.item.report_string()
                )),
            );
        }
        violations.len()
    }
}

#[cfg(test)]
mod tests {
    use _model::{OsmElement, OsmId, RefItem};

    use super::*;
    use crate::{Correlator, MarkdownReport, Parameters};

    #[test]
    fn validate() {
        let elements = vec![
            OsmElement::new(OsmId::Node(1), 0.0, 0.0)
                .with_tag("ref", "A1")
                .with_tag("fixme", "check"),
            OsmElement::new(OsmId::Node(2), 1.0, 1.0).with_tag("ref", "B"),
            OsmElement::new(OsmId::Node(3), 2.0, 2.0),
        ];
        let items = vec![
            RefItem::new("a", "A", 0.0, 0.0).with_tag("ref", "A1"),
            RefItem::new("b", "B", 1.0, 1.0).with_tag("ref", "B2"),
            RefItem::new("c", "C", 2.0, 2.0),
            RefItem::new("d", "D", 3.0, 3.0).with_tag("ref", "D"),
        ];
        let correlator = Correlator::new(&elements, &items, Parameters::builder().build().unwrap());
        let report = correlator.parse();

        let validator = Validator::default()
            .rule(ValidationRule::tag_equals("ref", |x: &RefItem| {
                x.tags.get("ref").cloned()
            }))
            .rule(ValidationRule::TagAbsent("fixme".to_string()));
        let violations = validator.validate(&report);
        let messages: Vec<_> = violations
            .iter()
            .map(|x| (x.item.id.as_str(), x.message.as_str()))
            .collect();
        assert_eq!(
            messages,
            vec![
                ("a", "unexpected fixme=check"),
                ("b", "ref=B, expected B2"),
            ]
        );

        let validator = Validator::new(vec![ValidationRule::TagPresent("ref".to_string())]);
        let mut sink = MarkdownReport::default();
        assert_eq!(validator.render(&report, &mut sink), 1);
        assert_eq!(
            sink.entries("validation"),
            &[ReportEntry::Issue(
                "[node/3](https://www.openstreetmap.org/node/3): missing ref (C (c))".to_string()
            )]
        );
    }
}
