//! Element queries, handles and keyboard keys understood by the page surface.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four ways the page can be asked for candidate elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryKind {
    RoleAndName,
    Placeholder,
    LabelAdjacency,
    Structural,
}

impl QueryKind {
    pub fn name(&self) -> &'static str {
        match self {
            QueryKind::RoleAndName => "by-role-and-name",
            QueryKind::Placeholder => "by-placeholder-text",
            QueryKind::LabelAdjacency => "by-label-adjacency",
            QueryKind::Structural => "by-structural-pattern",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single element query with its parameters.
///
/// Text parameters match case-insensitively as substrings, except
/// `Structural`, whose pattern is an XPath expression evaluated verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementQuery {
    /// Accessible role plus a substring of the accessible name.
    RoleAndName { role: String, name: String },

    /// Placeholder text of an input.
    Placeholder { text: String },

    /// A `<label>` containing the text, then the next input in document order.
    LabelAdjacency { label: String },

    /// Positional or attribute pattern; the most brittle of the four.
    Structural { pattern: String },
}

impl ElementQuery {
    pub fn role_and_name(role: impl Into<String>, name: impl Into<String>) -> Self {
        ElementQuery::RoleAndName {
            role: role.into(),
            name: name.into(),
        }
    }

    pub fn placeholder(text: impl Into<String>) -> Self {
        ElementQuery::Placeholder { text: text.into() }
    }

    pub fn label_adjacency(label: impl Into<String>) -> Self {
        ElementQuery::LabelAdjacency {
            label: label.into(),
        }
    }

    pub fn structural(pattern: impl Into<String>) -> Self {
        ElementQuery::Structural {
            pattern: pattern.into(),
        }
    }

    pub fn kind(&self) -> QueryKind {
        match self {
            ElementQuery::RoleAndName { .. } => QueryKind::RoleAndName,
            ElementQuery::Placeholder { .. } => QueryKind::Placeholder,
            ElementQuery::LabelAdjacency { .. } => QueryKind::LabelAdjacency,
            ElementQuery::Structural { .. } => QueryKind::Structural,
        }
    }

    /// The single textual parameter of the query.
    pub fn parameter(&self) -> &str {
        match self {
            ElementQuery::RoleAndName { name, .. } => name,
            ElementQuery::Placeholder { text } => text,
            ElementQuery::LabelAdjacency { label } => label,
            ElementQuery::Structural { pattern } => pattern,
        }
    }
}

impl fmt::Display for ElementQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementQuery::RoleAndName { role, name } => {
                write!(f, "{}({}, ~'{}')", self.kind(), role, name)
            }
            _ => write!(f, "{}('{}')", self.kind(), self.parameter()),
        }
    }
}

/// A re-resolvable reference to one match of a query.
///
/// Handles do not pin DOM nodes; acting on a handle re-runs its query and
/// addresses the match at `index` in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    pub query: ElementQuery,
    pub index: usize,
    /// Surface-specific description of the matched node (id, tag, name).
    pub node: String,
}

impl ElementHandle {
    pub fn new(query: ElementQuery, index: usize, node: impl Into<String>) -> Self {
        Self {
            query,
            index,
            node: node.into(),
        }
    }
}

/// Keyboard keys the workflow presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Enter,
    /// Platform select-all chord (Control+A).
    SelectAll,
}
