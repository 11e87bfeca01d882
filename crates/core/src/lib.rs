//! Core business logic for huddle.
//!
//! Authentication, session tokens, authorization predicates and the
//! services that apply them to groups, events, subscriptions and comments.

pub mod services;

pub use services::*;
