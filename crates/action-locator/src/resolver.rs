//! Element resolver with fallback chain orchestration

use crate::{errors::LocatorError, types::*};
use async_trait::async_trait;
use cdp_adapter::Page;
use tracing::{debug, info, warn};

/// Element resolver trait
#[async_trait]
pub trait ElementResolver: Send + Sync {
    /// Resolve the target against the current page state.
    ///
    /// A pure read: calling it repeatedly against an unchanged page returns
    /// the same handle.
    async fn resolve(
        &self,
        page: &dyn Page,
        target: &TargetSpec,
    ) -> Result<Resolution, LocatorError>;
}

/// Default element resolver: strict declared-order fallback chain
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultElementResolver;

impl DefaultElementResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ElementResolver for DefaultElementResolver {
    async fn resolve(
        &self,
        page: &dyn Page,
        target: &TargetSpec,
    ) -> Result<Resolution, LocatorError> {
        if target.strategies().is_empty() {
            return Err(LocatorError::InvalidTarget(format!(
                "{} declares no location strategies",
                target
            )));
        }

        debug!("Resolving target: {}", target);

        // A query error only counts as zero matches while some strategy answers.
        let mut answered = false;
        let mut last_error = None;

        for (position, strategy) in target.strategies().iter().enumerate() {
            debug!("Trying strategy {}: {}", position, strategy.query);

            let matches = match page.query(&strategy.query).await {
                Ok(matches) => {
                    answered = true;
                    matches
                }
                Err(e) => {
                    warn!("Strategy {} failed: {}", strategy.name(), e);
                    last_error = Some(e);
                    continue;
                }
            };

            if matches.is_empty() {
                debug!("Strategy {} returned no matches", strategy.name());
                continue;
            }

            let match_count = matches.len();
            if strategy.singular && match_count > 1 {
                warn!(
                    "Ambiguous match: {} matched {} elements for {}",
                    strategy.name(),
                    match_count,
                    target
                );
                return Err(LocatorError::AmbiguousMatch {
                    target: target.to_string(),
                    strategy: strategy.query.to_string(),
                    count: match_count,
                });
            }

            let handle = matches.into_iter().next().ok_or_else(|| {
                LocatorError::ElementNotFound {
                    target: target.to_string(),
                    tried: strategy.name().to_string(),
                }
            })?;

            info!(
                "Resolved {} using {} strategy: {} ({} match(es))",
                target,
                strategy.name(),
                handle.node,
                match_count
            );

            return Ok(Resolution {
                handle,
                strategy: strategy.kind(),
                position,
                match_count,
            });
        }

        if !answered {
            if let Some(err) = last_error {
                return Err(LocatorError::Query(err));
            }
        }

        // All strategies exhausted
        let tried = target
            .strategies()
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(", ");
        Err(LocatorError::ElementNotFound {
            target: target.to_string(),
            tried,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_adapter::fixture::{FixtureElement, FixturePage};
    use cdp_adapter::QueryKind;

    fn toolbar() -> FixturePage {
        FixturePage::new(vec![
            FixtureElement::button("refresh", "Refresh").matching("//a[.='Refresh']"),
            FixtureElement::button("actions", "Actions"),
            FixtureElement::button("refresh-2", "Refresh all"),
        ])
    }

    #[tokio::test]
    async fn test_first_matching_strategy_wins() {
        let page = toolbar();
        let target = TargetSpec::new("refresh")
            .by_role("button", "refresh")
            .by_placeholder("refresh")
            .by_structure("//a[.='Refresh']");

        let resolution = DefaultElementResolver::new()
            .resolve(&page, &target)
            .await
            .unwrap();

        assert_eq!(resolution.strategy, QueryKind::RoleAndName);
        assert_eq!(resolution.position, 0);
        assert_eq!(resolution.handle.node, "refresh");
        assert_eq!(page.query_count(QueryKind::RoleAndName), 1);
        assert_eq!(page.query_count(QueryKind::Placeholder), 0);
        assert_eq!(page.query_count(QueryKind::Structural), 0);
    }

    #[tokio::test]
    async fn test_falls_through_empty_strategies() {
        let page = toolbar();
        let target = TargetSpec::new("refresh")
            .by_role("link", "refresh")
            .by_structure("//a[.='Refresh']");

        let resolution = DefaultElementResolver::new()
            .resolve(&page, &target)
            .await
            .unwrap();

        assert_eq!(resolution.strategy, QueryKind::Structural);
        assert!(resolution.used_fallback());
        assert_eq!(page.total_queries(), 2);
    }

    #[tokio::test]
    async fn test_all_strategies_empty_is_not_found() {
        let page = toolbar();
        let target = TargetSpec::new("export")
            .by_role("menuitem", "export")
            .by_structure("//a[.='Export']");

        let err = DefaultElementResolver::new()
            .resolve(&page, &target)
            .await
            .unwrap_err();

        assert!(matches!(err, LocatorError::ElementNotFound { .. }));
    }

    #[tokio::test]
    async fn test_singular_strategy_rejects_multiple_matches() {
        let page = toolbar();
        let target = TargetSpec::new("refresh")
            .by_role("button", "refresh")
            .singular()
            .by_structure("//a[.='Refresh']");

        let err = DefaultElementResolver::new()
            .resolve(&page, &target)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            LocatorError::AmbiguousMatch {
                target: "refresh".to_string(),
                strategy: "by-role-and-name(button, ~'refresh')".to_string(),
                count: 2,
            }
        );
        assert_eq!(page.query_count(QueryKind::Structural), 0);
    }

    #[tokio::test]
    async fn test_non_singular_picks_first_in_document_order() {
        let page = toolbar();
        let target = TargetSpec::new("refresh").by_role("button", "refresh");
        let resolver = DefaultElementResolver::new();

        let first = resolver.resolve(&page, &target).await.unwrap();
        let second = resolver.resolve(&page, &target).await.unwrap();

        assert_eq!(first.handle.node, "refresh");
        assert_eq!(first.match_count, 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_target_is_invalid() {
        let page = toolbar();
        let err = DefaultElementResolver::new()
            .resolve(&page, &TargetSpec::new("nothing"))
            .await
            .unwrap_err();
        assert!(matches!(err, LocatorError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn test_dead_session_reports_query_failure() {
        let page = toolbar().failing_queries([QueryKind::RoleAndName, QueryKind::Structural]);
        let target = TargetSpec::new("login button")
            .by_role("button", "login")
            .by_structure("//a[.='Login']");

        let err = DefaultElementResolver::new()
            .resolve(&page, &target)
            .await
            .unwrap_err();

        match err {
            LocatorError::Query(source) => {
                assert_eq!(source.kind, cdp_adapter::AdapterErrorKind::CdpIo)
            }
            other => panic!("expected a query failure, got {other:?}"),
        }
        assert_eq!(page.total_queries(), 2);
    }

    #[tokio::test]
    async fn test_broken_strategy_tolerated_when_another_answers() {
        let page = toolbar().failing_queries([QueryKind::Structural]);

        let found = DefaultElementResolver::new()
            .resolve(
                &page,
                &TargetSpec::new("actions")
                    .by_structure("//a[.='Actions']")
                    .by_role("button", "actions"),
            )
            .await
            .unwrap();
        assert_eq!(found.handle.node, "actions");
        assert_eq!(found.position, 1);

        let err = DefaultElementResolver::new()
            .resolve(
                &page,
                &TargetSpec::new("export")
                    .by_structure("//a[.='Export']")
                    .by_role("menuitem", "export"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LocatorError::ElementNotFound { .. }));
    }
}
