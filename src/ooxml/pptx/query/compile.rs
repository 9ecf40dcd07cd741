/// Selector compilation and evaluation.
///
/// A selector becomes a location path `//{rootParent}/{parent}{pattern}`
/// (parent defaults to `/`, i.e. anywhere below the root parent), a list of
/// conjunctive conditions on the last step, and an optional occurrence.
/// Evaluation walks the tree once in document order.
use crate::common::xml::{NodeId, XmlDocument};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::pptx::query::filter::{AttributeFilter, Selector};
use crate::ooxml::pptx::query::kind::{KindSpec, NodeKind};
use crate::ooxml::pptx::query::occurrence::Occurrence;
use smallvec::SmallVec;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// `/name`
    Child,
    /// `//name`
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub axis: Axis,
    /// Qualified name, or `*`
    pub name: String,
}

impl Step {
    fn matches(&self, doc: &XmlDocument, node: NodeId) -> bool {
        doc.is_element(node) && (self.name == "*" || doc.name(node) == self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Substring of the unescaped text content
    Contains(String),
    /// Substring of an attribute of the node
    Attribute { name: String, value: String },
    /// Some descendant `element` whose attribute contains `value`
    DescendantAttribute {
        element: String,
        name: String,
        value: String,
    },
}

impl Condition {
    fn test(&self, doc: &XmlDocument, node: NodeId) -> bool {
        let attr_contains = |n: NodeId, name: &str, value: &str| {
            doc.attr(n, name).unwrap_or_default().contains(value)
        };
        match self {
            Condition::Contains(text) => doc.text_content(node).contains(text.as_str()),
            Condition::Attribute { name, value } => attr_contains(node, name, value),
            Condition::DescendantAttribute {
                element,
                name,
                value,
            } => doc
                .descendants(node)
                .any(|d| doc.name(d) == element && attr_contains(d, name, value)),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Contains(text) => write!(f, "contains(., '{text}')"),
            Condition::Attribute { name, value } => write!(f, "contains(@{name}, \"{value}\")"),
            Condition::DescendantAttribute {
                element,
                name,
                value,
            } => write!(f, "descendant::{element}[contains(@{name}, \"{value}\")]"),
        }
    }
}

/// A selector normalized into a path plus conditions.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    kind: &'static KindSpec,
    steps: SmallVec<[Step; 6]>,
    conditions: Vec<Condition>,
    occurrence: Option<Occurrence>,
}

impl CompiledQuery {
    pub fn compile(selector: &Selector) -> Result<Self> {
        let spec = selector.kind.spec();
        let root_parent = selector.root_parent.as_deref().unwrap_or(spec.root_parent);
        let parent = match selector.parent.as_deref() {
            None | Some("") => "/".to_string(),
            Some(p) if p.ends_with('/') => p.to_string(),
            Some(p) => format!("{p}/"),
        };
        let path = format!("//{root_parent}/{parent}{}", spec.pattern);
        let steps = parse_path(&path)?;

        let mut conditions = Vec::new();
        if let Some(text) = &selector.contains {
            conditions.push(Condition::Contains(text.clone()));
        }
        for (key, filter) in &selector.attributes {
            match filter {
                AttributeFilter::Value(value) => conditions.push(Condition::Attribute {
                    name: key.clone(),
                    value: value.clone(),
                }),
                AttributeFilter::Number(n) => conditions.push(Condition::Attribute {
                    name: key.clone(),
                    value: n.to_string(),
                }),
                AttributeFilter::Descendant(map) => {
                    for (name, value) in map {
                        conditions.push(Condition::DescendantAttribute {
                            element: key.clone(),
                            name: name.clone(),
                            value: value.clone(),
                        });
                    }
                },
            }
        }

        let query = Self {
            kind: spec,
            steps,
            conditions,
            occurrence: selector.occurrence.clone(),
        };
        tracing::trace!(kind = %selector.kind, query = %query, "compiled selector");
        Ok(query)
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind.kind
    }

    #[inline]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[inline]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Matching nodes of `doc` in document order.
    pub fn evaluate(&self, doc: &XmlDocument) -> Vec<NodeId> {
        let root = doc.root();
        let matched: Vec<NodeId> = std::iter::once(root)
            .chain(doc.descendants(root))
            .filter(|&node| self.path_matches(doc, node, self.steps.len() - 1))
            .filter(|&node| self.kind.predicate.test(doc, node))
            .filter(|&node| self.conditions.iter().all(|c| c.test(doc, node)))
            .collect();

        match &self.occurrence {
            None => matched,
            Some(occurrence) => occurrence
                .resolve(matched.len())
                .into_iter()
                .map(|i| matched[i])
                .collect(),
        }
    }

    /// Whether `node` is reached by steps `0..=i`.
    fn path_matches(&self, doc: &XmlDocument, node: NodeId, i: usize) -> bool {
        let step = &self.steps[i];
        if !step.matches(doc, node) {
            return false;
        }
        if i == 0 {
            return match step.axis {
                Axis::Descendant => true,
                Axis::Child => doc.parent(node).is_none(),
            };
        }
        match step.axis {
            Axis::Child => doc
                .parent(node)
                .is_some_and(|p| self.path_matches(doc, p, i - 1)),
            Axis::Descendant => doc
                .ancestors(node)
                .any(|a| self.path_matches(doc, a, i - 1)),
        }
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut path = String::new();
        for step in &self.steps {
            path.push_str(match step.axis {
                Axis::Child => "/",
                Axis::Descendant => "//",
            });
            path.push_str(&step.name);
        }
        let mut conditions = vec!["1=1".to_string()];
        conditions.extend(self.conditions.iter().map(ToString::to_string));
        let main = format!("{path}[{}]", conditions.join(" and "));
        match &self.occurrence {
            None => f.write_str(&main),
            Some(occurrence) => write!(f, "({main})[{occurrence}]"),
        }
    }
}

/// Split a location path into steps. A run of two or more slashes is a
/// descendant step.
fn parse_path(path: &str) -> Result<SmallVec<[Step; 6]>> {
    let invalid = |why: &str| OoxmlError::InvalidSelector(format!("{why} in path '{path}'"));
    let mut steps = SmallVec::new();
    let mut rest = path;
    while !rest.is_empty() {
        let slashes = rest.len() - rest.trim_start_matches('/').len();
        if slashes == 0 {
            return Err(invalid("expected '/'"));
        }
        rest = &rest[slashes..];
        let end = rest.find('/').unwrap_or(rest.len());
        let name = &rest[..end];
        if name.is_empty() {
            // Trailing slashes
            break;
        }
        if !is_valid_name(name) {
            return Err(invalid(&format!("invalid element name '{name}'")));
        }
        steps.push(Step {
            axis: if slashes == 1 {
                Axis::Child
            } else {
                Axis::Descendant
            },
            name: name.to_string(),
        });
        rest = &rest[end..];
    }
    if steps.is_empty() {
        return Err(invalid("empty path"));
    }
    Ok(steps)
}

fn is_valid_name(name: &str) -> bool {
    if name == "*" {
        return true;
    }
    let mut parts = name.split(':');
    let ok = |s: &str| {
        s.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
            && s.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    };
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), None, None) => ok(local),
        (Some(prefix), Some(local), None) => ok(prefix) && ok(local),
        _ => false,
    }
}
