#![allow(clippy::result_large_err)]
//! tagmod-core: the tag modification rule language.
//!
//! Turns rule text into a fully resolved [`RuleSet`]. Nothing here touches
//! records; see `tagmod-eval` for application.
//!
//! # Public API
//!
//! - [`parse_rules()`] / [`parse_rule()`] -- parse rule text
//! - [`load_rules()`] -- read and parse a rule file
//! - [`ParseError`], [`LoadError`] -- failure types
//! - AST types: [`Rule`], [`RuleKind`], [`ActionNode`], [`AtomicAction`],
//!   [`Condition`], [`ConditionRpn`]

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod source;

pub use ast::{
    ActionNode, AtomicAction, CompareOp, Condition, ConditionRpn, Frequency, LogicOp, RpnToken,
    Rule, RuleKind, RuleSet,
};
pub use error::{LoadError, ParseError, ParseErrorKind};
pub use parser::{parse_rule, parse_rules};
pub use source::{load_rules, load_rules_from, FileSystemSource, InMemorySource, RuleSource};
