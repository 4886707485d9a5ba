//! Grouping map elements by the values of a set of tags.

use std::collections::HashMap;

use itertools::Itertools;

use crate::MapElement;

/// Values of the grouping keys, in key order. `None` marks a missing tag.
pub type Values = Vec<Option<String>>;

#[derive(Debug)]
pub struct ValueGroup<'a, E> {
    pub values: Values,
    pub elements: Vec<&'a E>,
}

/// Elements sharing identical values for `keys`, in order of first
/// appearance.
///
/// With `require_all`, elements missing any of the keys are left out;
/// otherwise they're grouped with `None` in place of the missing values.
pub fn group_by_values<'a, E: MapElement>(
    elements: &'a [E],
    keys: &[&str],
    require_all: bool,
) -> Vec<ValueGroup<'a, E>> {
    let mut groups: Vec<ValueGroup<E>> = Vec::new();
    let mut lookup: HashMap<Values, usize> = HashMap::new();

    for element in elements {
        let values: Values = keys
            .iter()
            .map(|k| element.tag(k).map(|x| x.to_string()))
            .collect();
        if require_all && values.iter().any(|x| x.is_none()) {
            continue;
        }

        match lookup.get(&values) {
            Some(i) => groups[*i].elements.push(element),
            None => {
                lookup.insert(values.clone(), groups.len());
                groups.push(ValueGroup {
                    values,
                    elements: vec![element],
                });
            }
        }
    }

    groups
}

/// Groups whose values were judged equivalent, merged together.
#[derive(Debug)]
pub struct CombinedGroup<'a, E> {
    /// Every distinct raw value tuple with its element count, most common
    /// first.
    pub variants: Vec<(Values, usize)>,
    pub elements: Vec<&'a E>,
}

impl<E> CombinedGroup<'_, E> {
    /// The most common raw values.
    pub fn values(&self) -> &Values {
        &self.variants[0].0
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut x = x;
        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }
        root
    }

    /// The lower root wins, so every set is rooted at its earliest member.
    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            self.parent[a.max(b)] = a.min(b);
        }
    }
}

/// Merges groups whose values `similar` considers equivalent.
///
/// Merging is transitive even when `similar` isn't: if A ~ B and B ~ C,
/// then A, B and C end up together although A and C might not compare
/// equal. Loose predicates can therefore chain unrelated values.
pub fn combine_by_similar_values<'a, E>(
    groups: Vec<ValueGroup<'a, E>>,
    similar: impl Fn(&Values, &Values) -> bool,
) -> Vec<CombinedGroup<'a, E>> {
    let mut sets = UnionFind::new(groups.len());
    for (i, j) in (0..groups.len()).tuple_combinations() {
        if sets.find(i) != sets.find(j) && similar(&groups[i].values, &groups[j].values) {
            sets.union(i, j);
        }
    }

    let mut combined: Vec<CombinedGroup<E>> = Vec::new();
    let mut roots: HashMap<usize, usize> = HashMap::new();
    for (i, group) in groups.into_iter().enumerate() {
        let root = sets.find(i);
        let index = *roots.entry(root).or_insert_with(|| {
            combined.push(CombinedGroup {
                variants: Vec::new(),
                elements: Vec::new(),
            });
            combined.len() - 1
        });

        let x = &mut combined[index];
        x.variants.push((group.values, group.elements.len()));
        x.elements.extend(group.elements);
    }

    for x in &mut combined {
        x.variants.sort_by(|a, b| b.1.cmp(&a.1));
    }
    combined
}

/// Lowercased with runs of whitespace collapsed.
pub fn normalise(value: &str) -> String {
    value.split_whitespace().join(" ").to_lowercase()
}

/// Equal after [`normalise`], value by value.
pub fn similar_values(a: &Values, b: &Values) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|pair| match pair {
            (Some(a), Some(b)) => normalise(a) == normalise(b),
            (None, None) => true,
            _ => false,
        })
}

/// Known alternative spellings, on top of [`similar_values`].
#[derive(Debug, Default)]
pub struct Aliases {
    sets: Vec<Vec<String>>,
}

impl Aliases {
    pub fn new(sets: &[&[&str]]) -> Self {
        Self {
            sets: sets
                .iter()
                .map(|x| x.iter().map(|x| normalise(x)).collect())
                .collect(),
        }
    }

    fn same(&self, a: &str, b: &str) -> bool {
        let (a, b) = (normalise(a), normalise(b));
        a == b || self.sets.iter().any(|x| x.contains(&a) && x.contains(&b))
    }

    pub fn similar(&self, a: &Values, b: &Values) -> bool {
        a.len() == b.len()
            && a.iter().zip(b).all(|pair| match pair {
                (Some(a), Some(b)) => self.same(a, b),
                (None, None) => true,
                _ => false,
            })
    }
}

#[cfg(test)]
mod tests {
    use _model::{OsmElement, OsmId};

    use super::*;

    fn brands(values: &[Option<&str>]) -> Vec<OsmElement> {
        values
            .iter()
            .enumerate()
            .map(|(i, x)| {
                let element = OsmElement::new(OsmId::Node(i as u64), 0.0, 0.0);
                match x {
                    Some(x) => element.with_tag("brand", x),
                    None => element,
                }
            })
            .collect()
    }

    fn v(x: &str) -> Values {
        vec![Some(x.to_string())]
    }

    #[test]
    fn group() {
        let elements = brands(&[Some("Foo"), Some("Bar"), None, Some("Foo")]);

        let groups = group_by_values(&elements, &["brand"], true);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].values, v("Foo"));
        assert_eq!(groups[0].elements.len(), 2);
        assert_eq!(groups[1].values, v("Bar"));

        let groups = group_by_values(&elements, &["brand"], false);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[2].values, vec![None]);
        assert_eq!(groups[2].elements[0].id, OsmId::Node(2));
    }

    #[test]
    fn group_multiple_keys() {
        let elements = vec![
            OsmElement::new(OsmId::Node(1), 0.0, 0.0)
                .with_tag("brand", "Foo")
                .with_tag("operator", "A"),
            OsmElement::new(OsmId::Node(2), 0.0, 0.0)
                .with_tag("brand", "Foo")
                .with_tag("operator", "B"),
            OsmElement::new(OsmId::Node(3), 0.0, 0.0).with_tag("brand", "Foo"),
        ];

        let groups = group_by_values(&elements, &["brand", "operator"], true);
        assert_eq!(groups.len(), 2);
        let groups = group_by_values(&elements, &["brand", "operator"], false);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[2].values, vec![Some("Foo".to_string()), None]);
    }

    #[test]
    fn combine_case_insensitive() {
        let elements = brands(&[Some("Foo"), Some("foo "), Some("FOO")]);
        let groups = group_by_values(&elements, &["brand"], true);
        assert_eq!(groups.len(), 3);

        let combined = combine_by_similar_values(groups, similar_values);
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].len(), 3);
        assert_eq!(
            combined[0].variants,
            vec![(v("Foo"), 1), (v("foo "), 1), (v("FOO"), 1)]
        );
    }

    #[test]
    fn combine_most_common_first() {
        let elements = brands(&[Some("bar"), Some("Foo"), Some("foo"), Some("foo"), Some("Bar")]);
        let groups = group_by_values(&elements, &["brand"], true);

        let combined = combine_by_similar_values(groups, similar_values);
        assert_eq!(combined.len(), 2);
        assert_eq!(combined[0].values(), &v("bar"));
        assert_eq!(combined[0].len(), 2);
        assert_eq!(combined[1].values(), &v("foo"));
        assert_eq!(combined[1].variants, vec![(v("foo"), 2), (v("Foo"), 1)]);
    }

    #[test]
    fn combine_transitively() {
        let elements = brands(&[Some("a"), Some("c"), Some("b")]);
        let groups = group_by_values(&elements, &["brand"], true);

        // only neighbouring letters are similar, yet a and c end up together
        let neighbours = |a: &Values, b: &Values| {
            let (a, b) = (a[0].as_deref().unwrap(), b[0].as_deref().unwrap());
            (a.as_bytes()[0] as i32 - b.as_bytes()[0] as i32).abs() == 1
        };
        let combined = combine_by_similar_values(groups, neighbours);
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].len(), 3);
    }

    #[test]
    fn aliases() {
        let aliases = Aliases::new(&[&["Seven Eleven", "7-Eleven", "7/11"]]);
        assert!(aliases.similar(&v("7-eleven"), &v("seven  eleven")));
        assert!(aliases.similar(&v("Coles"), &v("coles")));
        assert!(!aliases.similar(&v("Coles"), &v("7/11")));
        assert!(!aliases.similar(&v("Coles"), &vec![None]));
    }
}
