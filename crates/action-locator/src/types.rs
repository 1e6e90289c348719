//! Core types for target resolution

use cdp_adapter::{ElementHandle, ElementQuery, QueryKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One location strategy of a target: a query plus its selection policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorStrategy {
    /// Query issued against the page
    pub query: ElementQuery,

    /// More than one match is a hard failure instead of a silent pick
    pub singular: bool,
}

impl LocatorStrategy {
    pub fn new(query: ElementQuery) -> Self {
        Self {
            query,
            singular: false,
        }
    }

    pub fn kind(&self) -> QueryKind {
        self.query.kind()
    }

    /// Get strategy name as string
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }
}

/// Describes *what* to find as an ordered list of strategies.
///
/// Built with chained constructors; `singular()` applies to the strategy
/// declared just before it.
///
/// ```
/// use action_locator::TargetSpec;
///
/// let login = TargetSpec::new("login button")
///     .by_role("button", "login")
///     .by_structure("//a[normalize-space()='Login']");
/// assert_eq!(login.strategies().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    description: String,
    strategies: Vec<LocatorStrategy>,
}

impl TargetSpec {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            strategies: Vec::new(),
        }
    }

    pub fn by_role(self, role: impl Into<String>, name: impl Into<String>) -> Self {
        self.push(ElementQuery::role_and_name(role, name))
    }

    pub fn by_placeholder(self, text: impl Into<String>) -> Self {
        self.push(ElementQuery::placeholder(text))
    }

    pub fn by_label(self, label: impl Into<String>) -> Self {
        self.push(ElementQuery::label_adjacency(label))
    }

    pub fn by_structure(self, pattern: impl Into<String>) -> Self {
        self.push(ElementQuery::structural(pattern))
    }

    /// Mark the most recently added strategy as singular-expected.
    pub fn singular(mut self) -> Self {
        if let Some(last) = self.strategies.last_mut() {
            last.singular = true;
        }
        self
    }

    fn push(mut self, query: ElementQuery) -> Self {
        self.strategies.push(LocatorStrategy::new(query));
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn strategies(&self) -> &[LocatorStrategy] {
        &self.strategies
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Element resolution result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Handle of the selected match
    pub handle: ElementHandle,

    /// Kind of the strategy that produced the match
    pub strategy: QueryKind,

    /// Position of that strategy in the chain (0 = primary)
    pub position: usize,

    /// Number of matches the winning strategy produced
    pub match_count: usize,
}

impl Resolution {
    /// Whether a lower-priority strategy had to be used
    pub fn used_fallback(&self) -> bool {
        self.position > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategies_keep_declared_order() {
        let target = TargetSpec::new("username")
            .by_placeholder("Username")
            .by_label("Username")
            .by_structure("//input[@name='username']");
        let kinds: Vec<_> = target.strategies().iter().map(|s| s.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                QueryKind::Placeholder,
                QueryKind::LabelAdjacency,
                QueryKind::Structural
            ]
        );
    }

    #[test]
    fn singular_marks_only_previous_strategy() {
        let target = TargetSpec::new("download")
            .by_role("button", "download")
            .singular()
            .by_structure("//a[normalize-space()='Download']");
        assert!(target.strategies()[0].singular);
        assert!(!target.strategies()[1].singular);
    }

    #[test]
    fn singular_on_empty_target_is_noop() {
        let target = TargetSpec::new("nothing").singular();
        assert!(target.strategies().is_empty());
    }
}
