use super::{strip_keyword, LineContext};
use crate::ast::{CompareOp, Condition, ConditionRpn, LogicOp, RpnToken};
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{lex_conditions, Token};

/// Parse a flat condition chain and convert it to reverse-polish order.
///
/// The chain must alternate condition / operator and start and end with a
/// condition. There is no grouping; AND binds tighter than OR.
pub fn parse_condition_clause(clause: &str, ctx: &LineContext<'_>) -> Result<ConditionRpn, ParseError> {
    let tokens = lex_conditions(clause);
    if tokens.len() % 2 == 0 {
        return Err(ctx.err(ParseErrorKind::InvalidConditionChain));
    }

    let mut infix = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        let expect_condition = i % 2 == 0;
        let item = match (token, expect_condition) {
            (Token::Atom(text), true) => RpnToken::Condition(parse_atomic_condition(text, ctx)?),
            (Token::And, false) => RpnToken::Operator(LogicOp::And),
            (Token::Or, false) => RpnToken::Operator(LogicOp::Or),
            _ => return Err(ctx.err(ParseErrorKind::InvalidConditionChain)),
        };
        infix.push(item);
    }
    Ok(shunting_yard(infix))
}

/// Operator-precedence pass over an already validated infix chain.
/// Equal precedence pops, so both operators associate to the left.
fn shunting_yard(infix: Vec<RpnToken>) -> ConditionRpn {
    let mut output = Vec::with_capacity(infix.len());
    let mut ops: Vec<LogicOp> = Vec::new();
    for token in infix {
        match token {
            RpnToken::Operator(op) => {
                while let Some(&top) = ops.last() {
                    if top.precedence() < op.precedence() {
                        break;
                    }
                    output.push(RpnToken::Operator(top));
                    ops.pop();
                }
                ops.push(op);
            }
            cond @ RpnToken::Condition(_) => output.push(cond),
        }
    }
    while let Some(op) = ops.pop() {
        output.push(RpnToken::Operator(op));
    }
    ConditionRpn(output)
}

fn is_bare_word(s: &str) -> bool {
    !s.is_empty() && !s.contains(char::is_whitespace)
}

/// Parse `EXISTS k`, `NOTEXISTS k` or `k <op> v`.
pub fn parse_atomic_condition(text: &str, ctx: &LineContext<'_>) -> Result<Condition, ParseError> {
    let text = text.trim();
    let invalid = || {
        ctx.err(ParseErrorKind::InvalidCondition {
            fragment: text.to_owned(),
        })
    };

    if let Some(rest) = strip_keyword(text, "NOTEXISTS") {
        let key = rest.trim();
        return if is_bare_word(key) {
            Ok(Condition::NotExists { key: key.to_owned() })
        } else {
            Err(invalid())
        };
    }
    if let Some(rest) = strip_keyword(text, "EXISTS") {
        let key = rest.trim();
        return if is_bare_word(key) {
            Ok(Condition::Exists { key: key.to_owned() })
        } else {
            Err(invalid())
        };
    }

    let start = text.find(['=', '!', '<', '>']).ok_or_else(invalid)?;
    let after = &text[start..];
    let op = [2, 1]
        .into_iter()
        .filter_map(|len| after.get(..len))
        .find_map(CompareOp::from_symbol)
        .ok_or_else(invalid)?;

    let key = text[..start].trim();
    let value = after[op.symbol().len()..].trim();
    if !is_bare_word(key) || !is_bare_word(value) {
        return Err(invalid());
    }
    Ok(Condition::Compare {
        key: key.to_owned(),
        op,
        value: value.to_owned(),
    })
}
