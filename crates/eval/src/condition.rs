use tagmod_core::{CompareOp, Condition, ConditionRpn, LogicOp, RpnToken};

use crate::numeric::{compare, parse_number};
use crate::types::{EvalError, Record};

/// Evaluate one atomic condition against a record.
pub fn evaluate_condition(cond: &Condition, record: &Record) -> Result<bool, EvalError> {
    match cond {
        Condition::Exists { key } => {
            let n = record.tags.count(key);
            if n > 1 {
                tracing::warn!(
                    way = record.id,
                    key = %key,
                    count = n,
                    "EXISTS is false for a key that appears more than once"
                );
            }
            Ok(n == 1)
        }
        Condition::NotExists { key } => Ok(!record.tags.contains(key)),
        Condition::Compare { key, op, value } => {
            let Some(tag_value) = record.tags.get(key) else {
                return Ok(false);
            };
            compare_values(key, *op, tag_value, value)
        }
    }
}

fn compare_values(key: &str, op: CompareOp, tag_value: &str, literal: &str) -> Result<bool, EvalError> {
    if let (Some(l), Some(r)) = (parse_number(tag_value), parse_number(literal)) {
        return Ok(compare(op, l, r));
    }
    if op.is_ordering() {
        return Err(EvalError::NonNumericComparison {
            key: key.to_owned(),
            op,
            tag_value: tag_value.to_owned(),
            literal: literal.to_owned(),
        });
    }
    Ok((tag_value == literal) == (op == CompareOp::Eq))
}

/// Run the RPN stack machine. Every atomic condition is evaluated, so a
/// fatal comparison error surfaces wherever it sits in the clause.
pub fn evaluate_rpn(rpn: &ConditionRpn, record: &Record) -> Result<bool, EvalError> {
    let mut stack: Vec<bool> = Vec::with_capacity(rpn.tokens().len());
    for token in rpn.tokens() {
        match token {
            RpnToken::Condition(c) => stack.push(evaluate_condition(c, record)?),
            RpnToken::Operator(op) => {
                let (Some(b), Some(a)) = (stack.pop(), stack.pop()) else {
                    return Err(EvalError::MissingOperands { op: op.to_string() });
                };
                stack.push(match op {
                    LogicOp::And => a && b,
                    LogicOp::Or => a || b,
                });
            }
        }
    }
    match stack.as_slice() {
        [result] => Ok(*result),
        rest => Err(EvalError::UnbalancedCondition {
            remaining: rest.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TagSet;
    use tagmod_core::parser::{parse_condition_clause, LineContext};

    fn record(pairs: &[(&str, &str)]) -> Record {
        Record::new(1, pairs.iter().copied().collect::<TagSet>())
    }

    fn eval(clause: &str, rec: &Record) -> Result<bool, EvalError> {
        let rpn = parse_condition_clause(clause, &LineContext::new(1, clause)).unwrap();
        evaluate_rpn(&rpn, rec)
    }

    #[test]
    fn exists_means_exactly_one() {
        assert!(eval("EXISTS A", &record(&[("A", "1")])).unwrap());
        assert!(!eval("EXISTS A", &record(&[])).unwrap());
        assert!(!eval("EXISTS A", &record(&[("A", "1"), ("A", "2")])).unwrap());
        assert!(!eval("NOTEXISTS A", &record(&[("A", "1"), ("A", "2")])).unwrap());
        assert!(eval("NOTEXISTS A", &record(&[("B", "1")])).unwrap());
    }

    #[test]
    fn absent_key_is_false_for_every_operator() {
        let rec = record(&[("B", "1")]);
        for op in ["==", "!=", ">", "<", ">=", "<="] {
            assert!(!eval(&format!("A{op}1"), &rec).unwrap(), "A{op}1");
        }
    }

    #[test]
    fn numeric_comparison_ignores_formatting() {
        let rec = record(&[("MAXSPEED", "30.0")]);
        assert!(eval("MAXSPEED==30", &rec).unwrap());
        assert!(eval("MAXSPEED>=30", &rec).unwrap());
        assert!(!eval("MAXSPEED!=30", &rec).unwrap());
    }

    #[test]
    fn string_equality_fallback() {
        let rec = record(&[("SURFACE", "paved")]);
        assert!(eval("SURFACE==paved", &rec).unwrap());
        assert!(eval("SURFACE!=gravel", &rec).unwrap());
        assert!(!eval("SURFACE==30", &rec).unwrap());
    }

    #[test]
    fn ordering_on_text_is_fatal() {
        let rec = record(&[("SURFACE", "paved"), ("LANES", "2")]);
        // The failing comparison is evaluated even though the OR is already decided.
        let err = eval("LANES==2 OR SURFACE>1", &rec).unwrap_err();
        assert!(matches!(err, EvalError::NonNumericComparison { .. }));
        assert!(err.to_string().contains("SURFACE"));
    }

    #[test]
    fn lanes_and_height_example() {
        let mut rec = record(&[("LANES", "3")]);
        assert!(eval("LANES>1 AND NOTEXISTS HEIGHT", &rec).unwrap());
        rec.tags.push("HEIGHT", "5");
        assert!(!eval("LANES>1 AND NOTEXISTS HEIGHT", &rec).unwrap());
    }

    #[test]
    fn and_before_or() {
        // true OR (false AND false)
        let rec = record(&[("A", "1")]);
        assert!(eval("EXISTS A OR EXISTS B AND EXISTS C", &rec).unwrap());
        // (false AND ...) OR false
        assert!(!eval("EXISTS B AND EXISTS A OR EXISTS C", &rec).unwrap());
    }

    #[test]
    fn malformed_rpn_is_rejected() {
        let rec = record(&[]);
        let lonely_op = ConditionRpn(vec![
            RpnToken::Condition(Condition::Exists { key: "A".into() }),
            RpnToken::Operator(LogicOp::And),
        ]);
        assert_eq!(
            evaluate_rpn(&lonely_op, &rec),
            Err(EvalError::MissingOperands { op: "AND".into() })
        );

        let two_values = ConditionRpn(vec![
            RpnToken::Condition(Condition::Exists { key: "A".into() }),
            RpnToken::Condition(Condition::Exists { key: "B".into() }),
        ]);
        assert_eq!(
            evaluate_rpn(&two_values, &rec),
            Err(EvalError::UnbalancedCondition { remaining: 2 })
        );
        assert_eq!(
            evaluate_rpn(&ConditionRpn(Vec::new()), &rec),
            Err(EvalError::UnbalancedCondition { remaining: 0 })
        );
    }
}
