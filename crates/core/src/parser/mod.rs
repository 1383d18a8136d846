//! Rule-line parser.
//!
//! A rule file is parsed completely or not at all: the first malformed line
//! aborts with a [`ParseError`] naming it.

use crate::ast::{Frequency, Rule, RuleKind, RuleSet};
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::is_word_at;

mod actions;
mod conditions;

pub use actions::{classify_action, parse_action_expression};
pub use conditions::{parse_atomic_condition, parse_condition_clause};

// ──────────────────────────────────────────────
// Line context
// ──────────────────────────────────────────────

/// The line being parsed. Every error built from it carries the full line.
#[derive(Debug, Clone, Copy)]
pub struct LineContext<'a> {
    pub line_no: usize,
    pub text: &'a str,
}

impl<'a> LineContext<'a> {
    pub fn new(line_no: usize, text: &'a str) -> Self {
        LineContext { line_no, text }
    }

    pub(crate) fn err(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(self.line_no, self.text, kind)
    }
}

// ──────────────────────────────────────────────
// Entry points
// ──────────────────────────────────────────────

/// Parse a whole rule source. Blank lines and `#` comments are skipped.
pub fn parse_rules(src: &str) -> Result<RuleSet, ParseError> {
    let mut rules = Vec::new();
    for (idx, raw) in src.lines().enumerate() {
        let normalized = raw.replace('\u{a0}', " ");
        let line = normalized.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let rule = parse_rule(line, idx + 1)?;
        tracing::debug!(line = rule.line_no, rule = %rule, "loaded rule");
        rules.push(rule);
    }
    Ok(RuleSet::new(rules))
}

/// Parse one already-trimmed rule line.
pub fn parse_rule(line: &str, line_no: usize) -> Result<Rule, ParseError> {
    let ctx = LineContext::new(line_no, line);
    let (body, frequency) = split_frequency(line, &ctx)?;

    let kind = match strip_keyword(body, "IF") {
        Some(rest) => parse_conditional(rest, &ctx)?,
        None => RuleKind::Unconditional {
            action: parse_action_expression(body, &ctx)?,
        },
    };

    Ok(Rule {
        line_no,
        text: line.to_owned(),
        kind,
        frequency,
    })
}

fn parse_conditional(rest: &str, ctx: &LineContext<'_>) -> Result<RuleKind, ParseError> {
    let invalid = || ctx.err(ParseErrorKind::InvalidConditional);

    let (cond_part, after_then) = find_keyword(rest, "THEN").ok_or_else(invalid)?;
    let (then_part, else_part) = match find_keyword(after_then, "ELSE") {
        Some((then_part, else_part)) => (then_part, Some(else_part)),
        None => (after_then, None),
    };

    let cond_part = cond_part.trim();
    let then_part = then_part.trim();
    if cond_part.is_empty() || then_part.is_empty() {
        return Err(invalid());
    }

    let condition = parse_condition_clause(cond_part, ctx)?;
    let then_action = parse_action_expression(then_part, ctx)?;
    let else_action = match else_part.map(str::trim) {
        Some("") => return Err(invalid()),
        Some(e) => Some(parse_action_expression(e, ctx)?),
        None => None,
    };

    Ok(RuleKind::Conditional {
        condition,
        then_action,
        else_action,
    })
}

// ──────────────────────────────────────────────
// Keyword helpers
// ──────────────────────────────────────────────

/// If `line` starts with `kw` followed by whitespace, return the remainder
/// (leading whitespace kept).
fn strip_keyword<'s>(line: &'s str, kw: &str) -> Option<&'s str> {
    let rest = line.strip_prefix(kw)?;
    rest.starts_with(char::is_whitespace).then_some(rest)
}

/// First occurrence of `kw` with whitespace on both sides. Returns the text
/// before and after it.
fn find_keyword<'s>(s: &'s str, kw: &str) -> Option<(&'s str, &'s str)> {
    s.match_indices(kw).find_map(|(idx, _)| {
        let before = &s[..idx];
        let after = &s[idx + kw.len()..];
        let spaced = before.ends_with(char::is_whitespace) && after.starts_with(char::is_whitespace);
        spaced.then_some((before, after))
    })
}

/// Split off a trailing `FREQ n/d`. Only the last whole-word `FREQ` counts.
fn split_frequency<'s>(
    line: &'s str,
    ctx: &LineContext<'_>,
) -> Result<(&'s str, Option<Frequency>), ParseError> {
    let Some(idx) = line
        .rmatch_indices("FREQ")
        .map(|(idx, _)| idx)
        .find(|&idx| is_word_at(line, idx, "FREQ"))
    else {
        return Ok((line, None));
    };

    let body = line[..idx].trim_end();
    let spec = line[idx + "FREQ".len()..].trim();
    let invalid = || {
        ctx.err(ParseErrorKind::InvalidFrequency {
            spec: spec.to_owned(),
        })
    };

    let mut parts = spec.split('/');
    let (Some(num), Some(den), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };
    let numerator: f64 = num.trim().parse().map_err(|_| invalid())?;
    let denominator: f64 = den.trim().parse().map_err(|_| invalid())?;

    let freq = Frequency {
        numerator,
        denominator,
    };
    let value = freq.probability();
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(ctx.err(ParseErrorKind::FrequencyOutOfRange { value }));
    }
    Ok((body, Some(freq)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ActionNode, AtomicAction, CompareOp, Condition, LogicOp, RpnToken};

    fn kind_of(line: &str) -> ParseErrorKind {
        parse_rule(line, 1).unwrap_err().kind
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let src = "# header\n\n   \n  # indented comment\nREMOVE A\n";
        let rules = parse_rules(src).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.rules()[0].line_no, 5);
    }

    #[test]
    fn normalizes_non_breaking_space() {
        let rules = parse_rules("UPDATE\u{a0}NAME\u{a0}TO\u{a0}Main Street").unwrap();
        let rule = &rules.rules()[0];
        assert_eq!(rule.text, "UPDATE NAME TO Main Street");
        assert_eq!(
            rule.kind,
            RuleKind::Unconditional {
                action: ActionNode::Atomic(AtomicAction::Update {
                    key: "NAME".into(),
                    value: "Main Street".into(),
                })
            }
        );
    }

    #[test]
    fn conditional_with_else() {
        let rule = parse_rule(
            "IF LANES>1 AND NOTEXISTS HEIGHT THEN ADD HEIGHT=5 ELSE UPDATE LANES TO 2",
            1,
        )
        .unwrap();
        let RuleKind::Conditional {
            condition,
            then_action,
            else_action,
        } = rule.kind
        else {
            panic!("expected conditional");
        };
        assert_eq!(
            condition.tokens(),
            &[
                RpnToken::Condition(Condition::Compare {
                    key: "LANES".into(),
                    op: CompareOp::Gt,
                    value: "1".into(),
                }),
                RpnToken::Condition(Condition::NotExists {
                    key: "HEIGHT".into()
                }),
                RpnToken::Operator(LogicOp::And),
            ]
        );
        assert_eq!(then_action.to_string(), "ADD HEIGHT=5");
        assert_eq!(else_action.unwrap().to_string(), "UPDATE LANES TO 2");
    }

    #[test]
    fn first_then_and_first_else_win() {
        let rule = parse_rule("IF A==1 THEN B=2 ELSE C=3 ELSE D=4", 1).unwrap();
        let RuleKind::Conditional { else_action, .. } = rule.kind else {
            panic!("expected conditional");
        };
        // Values may contain spaces, so the second ELSE lands in C's value.
        assert_eq!(
            else_action,
            Some(ActionNode::Atomic(AtomicAction::Assign {
                key: "C".into(),
                value: "3 ELSE D=4".into(),
            }))
        );
    }

    #[test]
    fn conditional_syntax_errors() {
        assert_eq!(kind_of("IF A==1"), ParseErrorKind::InvalidConditional);
        assert_eq!(kind_of("IF A==1 THEN"), ParseErrorKind::InvalidConditional);
        assert_eq!(kind_of("IF  THEN A=1"), ParseErrorKind::InvalidConditional);
        assert_eq!(kind_of("IF A==1 THEN B=1 ELSE "), ParseErrorKind::InvalidConditional);
    }

    #[test]
    fn frequency_is_split_off() {
        let rule = parse_rule("UPDATE MAXSPEED TO 50 FREQ 1/4", 1).unwrap();
        assert_eq!(rule.frequency.map(|f| f.probability()), Some(0.25));
        assert_eq!(rule.kind.to_string(), "UPDATE MAXSPEED TO 50");

        let rule = parse_rule("IF EXISTS A THEN REMOVE A FREQ 0.5/1", 1).unwrap();
        assert_eq!(rule.frequency.map(|f| f.probability()), Some(0.5));
        assert!(rule.is_conditional());
    }

    #[test]
    fn freq_inside_a_key_is_not_a_specifier() {
        let rule = parse_rule("ADD FREQUENCY=high", 1).unwrap();
        assert!(rule.frequency.is_none());
    }

    #[test]
    fn frequency_errors() {
        assert!(matches!(
            kind_of("REMOVE A FREQ half"),
            ParseErrorKind::InvalidFrequency { .. }
        ));
        assert!(matches!(
            kind_of("REMOVE A FREQ 1/2/3"),
            ParseErrorKind::InvalidFrequency { .. }
        ));
        assert!(matches!(
            kind_of("REMOVE A FREQ 3/2"),
            ParseErrorKind::FrequencyOutOfRange { .. }
        ));
        assert!(matches!(
            kind_of("REMOVE A FREQ 0/2"),
            ParseErrorKind::FrequencyOutOfRange { .. }
        ));
        assert!(matches!(
            kind_of("REMOVE A FREQ 1/0"),
            ParseErrorKind::FrequencyOutOfRange { .. }
        ));
    }

    #[test]
    fn error_reports_line_and_text() {
        let err = parse_rules("REMOVE A\n\nA==1\n").unwrap_err();
        assert_eq!(err.line_no, 3);
        assert_eq!(err.line, "A==1");
        assert!(matches!(err.kind, ParseErrorKind::ReservedOperator { .. }));
        assert!(err.to_string().contains("line 3"));
        assert_eq!(err.to_json_value()["kind"], "reserved_operator");
    }

    #[test]
    fn bare_if_word_is_an_action() {
        let rule = parse_rule("IFFY=1", 1).unwrap();
        assert_eq!(rule.kind.to_string(), "IFFY=1");
    }
}
