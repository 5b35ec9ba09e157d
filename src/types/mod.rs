//! Shared wire types.
//!
//! [`StructuredResponse`] is the contract every agent answer, provider reply
//! and mock reply conforms to.

pub mod response;

pub use response::{ActionItem, Document, Notification, StructuredResponse, Visualization};
