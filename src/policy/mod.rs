//! Caller-role policy.
//!
//! Roles arrive as plain strings on each request (`role_id`). The policy
//! decides three things about a role: whether it is routed straight to a
//! dedicated agent, whether it may see every recommendation, and which agent
//! prepares its login briefing.

pub mod roles;

pub use roles::RolePolicy;
