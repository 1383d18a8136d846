//! Action execution.
//!
//! Every function here reports whether the record was mutated. That flag
//! drives OR short-circuiting and the apply report.

use tagmod_core::{ActionNode, AtomicAction};

use crate::numeric::{format_number, parse_number};
use crate::types::{Diagnostic, Record};

/// Execution context for one (record, rule) pair.
pub struct ActionContext<'a> {
    pub rule_line: usize,
    pub diagnostics: &'a mut Vec<Diagnostic>,
}

/// Execute an action tree.
///
/// AND runs both sides and reports `left && right`. OR stops after the
/// left side if it mutated the record.
pub fn execute(node: &ActionNode, record: &mut Record, ctx: &mut ActionContext<'_>) -> bool {
    match node {
        ActionNode::Atomic(action) => execute_atomic(action, record, ctx),
        ActionNode::And { left, right } => {
            let l = execute(left, record, ctx);
            let r = execute(right, record, ctx);
            l && r
        }
        ActionNode::Or { left, right } => execute(left, record, ctx) || execute(right, record, ctx),
    }
}

pub fn execute_atomic(action: &AtomicAction, record: &mut Record, ctx: &mut ActionContext<'_>) -> bool {
    match action {
        AtomicAction::Assign { key, value } => record.tags.set_first(key, value.as_str()),
        AtomicAction::Increment { key, delta } => adjust(record, key, *delta, "increment", ctx),
        AtomicAction::Decrement { key, delta } => adjust(record, key, -*delta, "decrement", ctx),
        AtomicAction::Add { key, value } => {
            if record.tags.contains(key) {
                return false;
            }
            record.tags.push(key.as_str(), value.as_str());
            true
        }
        AtomicAction::Remove { key } => record.tags.remove_all(key) > 0,
        AtomicAction::Update { key, value } => {
            if !record.tags.set_first(key, value.as_str()) {
                record.tags.push(key.as_str(), value.as_str());
            }
            true
        }
        AtomicAction::NoOp => false,
    }
}

fn adjust(record: &mut Record, key: &str, delta: f64, verb: &str, ctx: &mut ActionContext<'_>) -> bool {
    let Some(current) = record.tags.get(key) else {
        return false;
    };
    let Some(n) = parse_number(current) else {
        let message = format!("skipping {} of non-numeric '{}' = '{}'", verb, key, current);
        tracing::warn!(way = record.id, rule_line = ctx.rule_line, "{}", message);
        ctx.diagnostics.push(Diagnostic {
            record_id: record.id,
            rule_line: ctx.rule_line,
            message,
        });
        return false;
    };
    record.tags.set_first(key, format_number(n + delta))
}
