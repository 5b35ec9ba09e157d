//! Role → agent mappings used by the router and the recommendation store.

use std::collections::{BTreeMap, BTreeSet};

/// Role policy: direct routes, aggregator roles and briefing delegates.
#[derive(Debug, Clone, Default)]
pub struct RolePolicy {
    /// Role → agent that handles every query from that role.
    direct_routes: BTreeMap<String, String>,

    /// Roles that see recommendations addressed to any role.
    aggregators: BTreeSet<String>,

    /// Role → agent that prepares the role's briefing.
    briefing_delegates: BTreeMap<String, String>,
}

impl RolePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// The institutional defaults: accreditation managers talk to their own
    /// agent, the orchestrator role aggregates, and faculty, admin and
    /// student logins are briefed by their domain agents.
    pub fn institutional() -> Self {
        let mut policy = Self::new();
        policy.add_direct_route("accreditation_manager", "accreditation_manager");
        policy.add_aggregator("orchestrator");
        policy.add_briefing_delegate("faculty", "academic");
        policy.add_briefing_delegate("admin", "administrative");
        policy.add_briefing_delegate("student", "student_services");
        policy
    }

    /// Route every query from `role` to `agent`, bypassing intent scoring.
    pub fn add_direct_route(&mut self, role: &str, agent: &str) {
        self.direct_routes
            .insert(role.to_string(), agent.to_string());
    }

    pub fn add_aggregator(&mut self, role: &str) {
        self.aggregators.insert(role.to_string());
    }

    pub fn add_briefing_delegate(&mut self, role: &str, agent: &str) {
        self.briefing_delegates
            .insert(role.to_string(), agent.to_string());
    }

    /// Dedicated agent for `role`, if any. Role names match exactly.
    pub fn direct_route(&self, role: &str) -> Option<&str> {
        self.direct_routes.get(role).map(String::as_str)
    }

    /// Whether `role` may read recommendations targeted at other roles.
    pub fn is_aggregator(&self, role: &str) -> bool {
        self.aggregators.contains(role)
    }

    pub fn briefing_delegate(&self, role: &str) -> Option<&str> {
        self.briefing_delegates.get(role).map(String::as_str)
    }

    /// Whether a caller in `caller_role` may see an item addressed to `target_role`.
    pub fn can_view(&self, caller_role: &str, target_role: &str) -> bool {
        caller_role == target_role || self.is_aggregator(caller_role)
    }
}
