//! Graph model types: node kinds, edge kinds and their property bags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of node projected into the graph.
///
/// Declaration order is the order the entity phase syncs them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Course,
    Major,
    Skill,
    CareerPath,
}

impl NodeKind {
    pub const ALL: [NodeKind; 4] = [Self::Course, Self::Major, Self::Skill, Self::CareerPath];

    /// The Neo4j node label for this kind.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Course => "Course",
            Self::Major => "Major",
            Self::Skill => "Skill",
            Self::CareerPath => "CareerPath",
        }
    }

    /// Property holding the natural key.
    pub fn key_field(&self) -> &'static str {
        match self {
            Self::Course => "code",
            Self::Major | Self::Skill | Self::CareerPath => "name",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::Major => "major",
            Self::Skill => "skill",
            Self::CareerPath => "career_path",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of directed edge projected into the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// Course -> prerequisite Course.
    Requires,
    /// Course -> Skill, carries `level`.
    Teaches,
    /// Course -> CareerPath, carries `importance`.
    PreparesFor,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 3] = [Self::Requires, Self::Teaches, Self::PreparesFor];

    /// The Neo4j relationship type.
    pub fn rel_type(&self) -> &'static str {
        match self {
            Self::Requires => "REQUIRES",
            Self::Teaches => "TEACHES",
            Self::PreparesFor => "PREPARES_FOR",
        }
    }

    pub fn source_kind(&self) -> NodeKind {
        NodeKind::Course
    }

    pub fn target_kind(&self) -> NodeKind {
        match self {
            Self::Requires => NodeKind::Course,
            Self::Teaches => NodeKind::Skill,
            Self::PreparesFor => NodeKind::CareerPath,
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rel_type())
    }
}

/// A scalar property value stored on a node or edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Ordered bag of mapped attributes.
///
/// Property names are static: they come from the record mappers, never from
/// source data, so they are safe to splice into Cypher.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: Vec<(&'static str, PropertyValue)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. A repeated name replaces the earlier value.
    pub fn with(mut self, name: &'static str, value: impl Into<PropertyValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &'static str, value: impl Into<PropertyValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &PropertyValue)> {
        self.entries.iter().map(|(n, v)| (*n, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A node ready to be merged by `(kind, key)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub kind: NodeKind,
    pub key: String,
    pub properties: Properties,
}

/// An edge ready to be merged by `(kind, source, target)`.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub kind: EdgeKind,
    pub source: String,
    pub target: String,
    pub properties: Properties,
}
