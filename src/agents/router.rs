//! Lexical intent router.
//!
//! Each domain agent owns a keyword list. A query's score for an agent is the
//! number of that agent's keywords appearing as substrings of the lowercased
//! query; each keyword counts at most once. The highest score wins. Ties go
//! to the agent listed first in [`INTENT_TABLE`], which is therefore the
//! routing priority order. A query scoring zero everywhere goes to the
//! generic fallback agent.

use std::sync::Arc;

use serde::Serialize;

use super::base_agent::AgentContext;
use super::directory::AgentDirectory;
use super::error::{AgentError, CommunicationError};
use super::general;
use crate::policy::RolePolicy;
use crate::types::response::StructuredResponse;

/// Keyword table in priority order.
pub const INTENT_TABLE: &[(&str, &[&str])] = &[
    (
        "academic",
        &[
            "attendance", "timetable", "workload", "faculty", "course", "lesson", "co-po",
            "curriculum", "syllabus", "teaching",
        ],
    ),
    (
        "examination",
        &["exam", "result", "grade", "marks", "hall ticket", "certificate", "question paper"],
    ),
    ("finance", &["fee", "budget", "payment", "salary", "invoice", "purchase"]),
    ("quality", &["naac", "nba", "aqar", "accreditation", "iqac", "attainment"]),
    (
        "student_services",
        &["placement", "internship", "hostel", "scholarship", "grievance", "club"],
    ),
    ("administrative", &["leave", "hr", "meeting", "circular", "file", "staff"]),
    ("research", &["research", "publication", "patent", "project", "phd", "grant"]),
    ("compliance", &["aicte", "nirf", "aishe", "compliance", "regulation", "mandatory"]),
    (
        "accreditation_manager",
        &["washington accord", "mbgl", "digital audit", "sar", "po gap", "program outcome"],
    ),
];

/// One agent's keyword list.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub agent: String,
    pub keywords: Vec<String>,
}

impl IntentRule {
    /// Number of distinct keywords present in `query_lower`.
    pub fn score(&self, query_lower: &str) -> usize {
        self.keywords
            .iter()
            .filter(|kw| query_lower.contains(kw.as_str()))
            .count()
    }
}

/// Why a query went where it went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteReason {
    /// The caller's role has a dedicated agent.
    Direct,
    /// Highest keyword score.
    Scored { score: usize },
    /// Nothing scored.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub agent: String,
    pub reason: RouteReason,
}

#[derive(Debug)]
pub struct IntentRouter {
    directory: Arc<AgentDirectory>,
    rules: Vec<IntentRule>,
    policy: RolePolicy,
    fallback: String,
}

impl IntentRouter {
    /// Router over [`INTENT_TABLE`] with the generic agent as fallback.
    pub fn new(directory: Arc<AgentDirectory>, policy: RolePolicy) -> Self {
        let rules = INTENT_TABLE
            .iter()
            .map(|(agent, keywords)| IntentRule {
                agent: agent.to_string(),
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
            })
            .collect();
        Self {
            directory,
            rules,
            policy,
            fallback: general::NAME.to_string(),
        }
    }

    /// Pick the target agent for `query`. Agents that are not registered are
    /// never selected.
    pub fn route(&self, query: &str, context: &AgentContext) -> Route {
        if let Some(agent) = context
            .role_id
            .as_deref()
            .and_then(|role| self.policy.direct_route(role))
            .filter(|agent| self.directory.contains(agent))
        {
            return Route {
                agent: agent.to_string(),
                reason: RouteReason::Direct,
            };
        }

        let query_lower = query.to_lowercase();
        let mut best: Option<(&IntentRule, usize)> = None;
        for rule in &self.rules {
            if !self.directory.contains(&rule.agent) {
                continue;
            }
            let score = rule.score(&query_lower);
            // Strictly greater: earlier rules win ties.
            if score > 0 && best.map_or(true, |(_, top)| score > top) {
                best = Some((rule, score));
            }
        }

        match best {
            Some((rule, score)) => Route {
                agent: rule.agent.clone(),
                reason: RouteReason::Scored { score },
            },
            None => {
                log::debug!("[IntentRouter] no intent matched, using {}", self.fallback);
                Route {
                    agent: self.fallback.clone(),
                    reason: RouteReason::Fallback,
                }
            }
        }
    }

    /// Route `query` and let the chosen agent answer it.
    pub async fn dispatch(
        &self,
        query: &str,
        context: &AgentContext,
    ) -> Result<(Route, StructuredResponse), AgentError> {
        let route = self.route(query, context);
        log::info!("[IntentRouter] '{}' -> {} ({:?})", query, route.agent, route.reason);
        let agent = self
            .directory
            .get(&route.agent)
            .ok_or_else(|| CommunicationError::AgentUnavailable {
                agent: route.agent.clone(),
            })?;
        let response = agent.handle(query, context).await?;
        Ok((route, response))
    }

    /// Login briefing for `role`, prepared by its delegate or the fallback agent.
    pub async fn briefing(&self, role: &str) -> Result<StructuredResponse, AgentError> {
        let name = self.policy.briefing_delegate(role).unwrap_or(self.fallback.as_str());
        let agent = self
            .directory
            .get(name)
            .ok_or_else(|| CommunicationError::AgentUnavailable {
                agent: name.to_string(),
            })?;
        Ok(agent.briefing().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::base_agent::{ActionRegistry, Agent};
    use crate::llms::LlmError;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct Echo {
        name: String,
        actions: ActionRegistry,
    }

    #[async_trait]
    impl Agent for Echo {
        fn name(&self) -> &str {
            &self.name
        }
        fn display_name(&self) -> &str {
            &self.name
        }
        async fn handle(
            &self,
            _query: &str,
            _context: &AgentContext,
        ) -> Result<StructuredResponse, LlmError> {
            Ok(StructuredResponse::text(&self.name, format!("handled by {}", self.name)))
        }
        async fn briefing(&self) -> Result<StructuredResponse, LlmError> {
            Ok(StructuredResponse::text(&self.name, format!("briefing from {}", self.name)))
        }
        fn actions(&self) -> &ActionRegistry {
            &self.actions
        }
    }

    fn router() -> IntentRouter {
        let directory = Arc::new(AgentDirectory::new());
        let names = INTENT_TABLE
            .iter()
            .map(|(name, _)| *name)
            .chain([general::NAME]);
        for name in names {
            directory.register(Arc::new(Echo {
                name: name.to_string(),
                actions: ActionRegistry::new(),
            }));
        }
        IntentRouter::new(directory, RolePolicy::institutional())
    }

    fn target(router: &IntentRouter, query: &str) -> String {
        router.route(query, &AgentContext::default()).agent
    }

    #[test]
    fn test_highest_score_wins() {
        let router = router();
        assert_eq!(target(&router, "Show research publications and patent grants"), "research");
        assert_eq!(target(&router, "Pending fee payment for hostel"), "finance");
        let route = router.route("NAAC criteria and IQAC attainment", &AgentContext::default());
        assert_eq!(route.agent, "quality");
        assert_eq!(route.reason, RouteReason::Scored { score: 3 });
    }

    #[test]
    fn test_keyword_counts_once() {
        let router = router();
        let route = router.route("fee fee fee exam result", &AgentContext::default());
        // finance: fee (1). examination: exam + result (2).
        assert_eq!(route.agent, "examination");
        assert_eq!(route.reason, RouteReason::Scored { score: 2 });
    }

    #[test]
    fn test_ties_follow_priority_order() {
        let router = router();
        // examination (exam) vs finance (fee): examination is listed first.
        assert_eq!(target(&router, "exam fee"), "examination");
        // academic (faculty) vs finance (salary): academic is listed first.
        assert_eq!(target(&router, "faculty salary"), "academic");
        // finance (budget) vs research (grant)
        for _ in 0..10 {
            assert_eq!(target(&router, "budget grant"), "finance");
        }
    }

    #[test]
    fn test_zero_score_falls_back() {
        let router = router();
        let route = router.route("hello there", &AgentContext::default());
        assert_eq!(route.agent, general::NAME);
        assert_eq!(route.reason, RouteReason::Fallback);
    }

    #[test]
    fn test_routes_are_positive_or_fallback() {
        let router = router();
        let queries = [
            "timetable for tomorrow",
            "publish circular",
            "nirf ranking data",
            "Washington Accord mapping",
            "good morning",
            "scholarship status",
        ];
        for query in queries {
            let route = router.route(query, &AgentContext::default());
            match route.reason {
                RouteReason::Scored { score } => assert!(score > 0),
                RouteReason::Fallback => assert_eq!(route.agent, general::NAME),
                RouteReason::Direct => panic!("no role given"),
            }
        }
    }

    #[test]
    fn test_privileged_role_routes_directly() {
        let router = router();
        let ctx = AgentContext::for_role("accreditation_manager");
        let route = router.route("fee budget payment", &ctx);
        assert_eq!(route.agent, "accreditation_manager");
        assert_eq!(route.reason, RouteReason::Direct);

        let ctx = AgentContext::for_role("faculty");
        assert_eq!(router.route("fee budget", &ctx).agent, "finance");
    }

    #[tokio::test]
    async fn test_dispatch_and_briefing() {
        let router = router();
        let (route, resp) = router
            .dispatch("mark attendance", &AgentContext::default())
            .await
            .unwrap();
        assert_eq!(route.agent, "academic");
        assert_eq!(resp.content, "handled by academic");

        let brief = router.briefing("admin").await.unwrap();
        assert_eq!(brief.content, "briefing from administrative");
        let brief = router.briefing("principal").await.unwrap();
        assert_eq!(brief.content, "briefing from orchestrator");
    }

    #[tokio::test]
    async fn test_unregistered_agents_are_skipped() {
        let directory = Arc::new(AgentDirectory::new());
        let router = IntentRouter::new(directory, RolePolicy::institutional());
        assert_eq!(target(&router, "fee"), general::NAME);
        let err = router.dispatch("fee", &AgentContext::default()).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Communication(CommunicationError::AgentUnavailable { .. })
        ));
    }
}
