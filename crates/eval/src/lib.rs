//! tagmod-eval: applies parsed tag modification rules to way records.
//!
//! Takes a [`tagmod_core::RuleSet`] and a slice of [`Record`]s, evaluates
//! conditions, executes actions and reports what changed.

pub mod action;
pub mod condition;
pub mod engine;
pub mod numeric;
pub mod types;

pub use engine::{ApplyError, ApplyReport, RuleEngine};
pub use types::{Diagnostic, EvalError, Record, Tag, TagSet};
