//! Rule application.
//!
//! Records are visited in order; for each record every rule runs in file
//! order, so later rules see what earlier ones changed. A rule with a
//! frequency gate is tested with a fresh draw for every record.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tagmod_core::{Rule, RuleKind, RuleSet};

use crate::action::{execute, ActionContext};
use crate::condition::evaluate_rpn;
use crate::types::{Diagnostic, EvalError, Record};

/// Counters and recoverable diagnostics from one `apply` run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplyReport {
    /// Records visited
    pub records: usize,
    /// (record, rule) pairs that passed the frequency gate and ran
    pub evaluations: usize,
    /// (record, rule) pairs skipped by the frequency gate
    pub skipped_by_frequency: usize,
    /// Evaluations whose action reported a mutation
    pub mutations: usize,
    /// Records changed by at least one rule
    pub records_modified: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// A fatal error while applying one rule to one record. The run stops here;
/// records already visited keep their mutations.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyError {
    pub record_id: i64,
    pub rule_line: usize,
    pub rule_text: String,
    pub source: EvalError,
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "way {}: {} in rule on line {}: {}",
            self.record_id, self.source, self.rule_line, self.rule_text
        )
    }
}

impl std::error::Error for ApplyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

// ──────────────────────────────────────────────
// Engine
// ──────────────────────────────────────────────

/// Owns a rule set and the random source behind its frequency gates.
pub struct RuleEngine<R = StdRng> {
    rules: RuleSet,
    rng: R,
}

impl RuleEngine<StdRng> {
    /// Engine with an entropy-seeded generator.
    pub fn new(rules: RuleSet) -> Self {
        Self::with_rng(rules, StdRng::from_entropy())
    }

    /// Engine whose frequency draws are reproducible for a given seed.
    pub fn seeded(rules: RuleSet, seed: u64) -> Self {
        Self::with_rng(rules, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RuleEngine<R> {
    pub fn with_rng(rules: RuleSet, rng: R) -> Self {
        RuleEngine { rules, rng }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Apply every rule to every record, mutating them in place.
    pub fn apply(&mut self, records: &mut [Record]) -> Result<ApplyReport, ApplyError> {
        let mut report = ApplyReport::default();
        for record in records.iter_mut() {
            report.records += 1;
            if self.apply_record(record, &mut report)? {
                report.records_modified += 1;
            }
        }
        tracing::info!(
            records = report.records,
            modified = report.records_modified,
            mutations = report.mutations,
            skipped = report.skipped_by_frequency,
            diagnostics = report.diagnostics.len(),
            "rules applied"
        );
        Ok(report)
    }

    /// Run all rules against one record. Returns whether any rule mutated it.
    pub fn apply_record(&mut self, record: &mut Record, report: &mut ApplyReport) -> Result<bool, ApplyError> {
        let mut modified = false;
        for rule in self.rules.iter() {
            if let Some(freq) = &rule.frequency {
                let sample: f64 = self.rng.gen();
                if sample >= freq.probability() {
                    report.skipped_by_frequency += 1;
                    continue;
                }
            }
            report.evaluations += 1;
            let mutated = run_rule(rule, record, &mut report.diagnostics).map_err(|source| ApplyError {
                record_id: record.id,
                rule_line: rule.line_no,
                rule_text: rule.text.clone(),
                source,
            })?;
            if mutated {
                tracing::debug!(way = record.id, line = rule.line_no, "rule fired");
                report.mutations += 1;
                modified = true;
            }
        }
        Ok(modified)
    }
}

fn run_rule(rule: &Rule, record: &mut Record, diagnostics: &mut Vec<Diagnostic>) -> Result<bool, EvalError> {
    let mut ctx = ActionContext {
        rule_line: rule.line_no,
        diagnostics,
    };
    let action = match &rule.kind {
        RuleKind::Unconditional { action } => action,
        RuleKind::Conditional {
            condition,
            then_action,
            else_action,
        } => {
            if evaluate_rpn(condition, record)? {
                then_action
            } else {
                match else_action {
                    Some(e) => e,
                    None => return Ok(false),
                }
            }
        }
    };
    Ok(execute(action, record, &mut ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TagSet;
    use tagmod_core::parse_rules;

    fn record(id: i64, pairs: &[(&str, &str)]) -> Record {
        Record::new(id, pairs.iter().copied().collect::<TagSet>())
    }

    fn engine(src: &str) -> RuleEngine {
        RuleEngine::seeded(parse_rules(src).unwrap(), 7)
    }

    #[test]
    fn engine_keeps_parsed_rules() {
        let engine = engine("# header\nADD A=1\n\nREMOVE B");
        let lines: Vec<usize> = engine.rules().rules().iter().map(|r| r.line_no).collect();
        assert_eq!(engine.rules().len(), 2);
        assert_eq!(lines, vec![2, 4]);
    }

    #[test]
    fn later_rules_see_earlier_mutations() {
        let mut records = vec![record(1, &[])];
        let report = engine("ADD SURFACE=paved\nIF SURFACE==paved THEN UPDATE MAXSPEED TO 30")
            .apply(&mut records)
            .unwrap();
        assert_eq!(records[0], record(1, &[("SURFACE", "paved"), ("MAXSPEED", "30")]));
        assert_eq!(report.mutations, 2);
        assert_eq!(report.records_modified, 1);
    }

    #[test]
    fn else_branch_and_missing_else() {
        let mut records = vec![record(1, &[("LANES", "1")]), record(2, &[("LANES", "3")])];
        let report = engine("IF LANES>1 THEN ADD HEIGHT=5 ELSE UPDATE LANES TO 2\nIF EXISTS NOPE THEN REMOVE LANES")
            .apply(&mut records)
            .unwrap();
        assert_eq!(records[0], record(1, &[("LANES", "2")]));
        assert_eq!(records[1], record(2, &[("LANES", "3"), ("HEIGHT", "5")]));
        assert_eq!(report.evaluations, 4);
        assert_eq!(report.mutations, 2);
    }

    #[test]
    fn fatal_error_names_record_and_rule() {
        let mut records = vec![record(10, &[("SURFACE", "1")]), record(11, &[("SURFACE", "paved")])];
        let err = engine("REMOVE X\nIF SURFACE>0 THEN ADD Y=1")
            .apply(&mut records)
            .unwrap_err();
        assert_eq!(err.record_id, 11);
        assert_eq!(err.rule_line, 2);
        assert_eq!(err.rule_text, "IF SURFACE>0 THEN ADD Y=1");
        assert!(matches!(err.source, EvalError::NonNumericComparison { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn diagnostics_are_collected() {
        let mut records = vec![record(5, &[("MAXSPEED", "fast")])];
        let report = engine("MAXSPEED+=10").apply(&mut records).unwrap();
        assert_eq!(report.mutations, 0);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].record_id, 5);
        assert_eq!(report.diagnostics[0].rule_line, 1);
    }

    #[test]
    fn full_frequency_never_skips() {
        let mut records: Vec<Record> = (0..100).map(|i| record(i, &[])).collect();
        let report = engine("ADD A=1 FREQ 1/1").apply(&mut records).unwrap();
        assert_eq!(report.skipped_by_frequency, 0);
        assert_eq!(report.records_modified, 100);
    }

    #[test]
    fn same_seed_same_outcome() {
        let rules = "ADD A=1 FREQ 1/3\nADD B=1 FREQ 2/3";
        let run = || {
            let mut records: Vec<Record> = (0..200).map(|i| record(i, &[])).collect();
            engine(rules).apply(&mut records).unwrap();
            records
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn report_serializes() {
        let report = ApplyReport {
            records: 2,
            mutations: 1,
            ..Default::default()
        };
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["records"], 2);
        assert_eq!(v["diagnostics"], serde_json::json!([]));
    }
}
