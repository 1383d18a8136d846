use super::{find_keyword, strip_keyword, LineContext};
use crate::ast::{ActionNode, AtomicAction};
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{lex_actions, Token};

/// Parse a compound action expression such as `(REMOVE A AND ADD B=1) OR C=2`.
pub fn parse_action_expression(expr: &str, ctx: &LineContext<'_>) -> Result<ActionNode, ParseError> {
    let tokens = lex_actions(expr);
    if tokens.is_empty() {
        return Err(ctx.err(ParseErrorKind::EmptyAction));
    }
    let mut parser = ActionParser {
        tokens: &tokens,
        pos: 0,
        ctx,
    };
    let node = parser.parse_expr()?;
    if parser.pos != tokens.len() {
        return Err(ctx.err(ParseErrorKind::TrailingTokens));
    }
    Ok(node)
}

// ──────────────────────────────────────────────
// Recursive descent
// ──────────────────────────────────────────────

struct ActionParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    ctx: &'a LineContext<'a>,
}

impl<'a> ActionParser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn err(&self, kind: ParseErrorKind) -> ParseError {
        self.ctx.err(kind)
    }

    // expr -> term (OR term)*
    fn parse_expr(&mut self) -> Result<ActionNode, ParseError> {
        let mut left = self.parse_term()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let right = self.parse_term()?;
            left = ActionNode::or(left, right);
        }
        Ok(left)
    }

    // term -> factor (AND factor)*
    fn parse_term(&mut self) -> Result<ActionNode, ParseError> {
        let mut left = self.parse_factor()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let right = self.parse_factor()?;
            left = ActionNode::and(left, right);
        }
        Ok(left)
    }

    // factor -> atomic | '(' expr ')'
    fn parse_factor(&mut self) -> Result<ActionNode, ParseError> {
        match self.advance() {
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.err(ParseErrorKind::MissingCloseParen)),
                }
            }
            Some(Token::Atom(fragment)) => Ok(ActionNode::Atomic(classify_action(fragment, self.ctx)?)),
            Some(other) => Err(self.err(ParseErrorKind::UnexpectedToken {
                found: other.to_string(),
            })),
            None => Err(self.err(ParseErrorKind::UnexpectedToken {
                found: "end of input".to_owned(),
            })),
        }
    }
}

// ──────────────────────────────────────────────
// Atomic classification
// ──────────────────────────────────────────────

fn is_key(s: &str) -> bool {
    !s.is_empty() && !s.contains(char::is_whitespace)
}

/// Classify a single action fragment.
///
/// Fragments starting with `ADD`, `REMOVE` or `UPDATE` must match that form;
/// they never fall back to the bare assignment forms.
pub fn classify_action(fragment: &str, ctx: &LineContext<'_>) -> Result<AtomicAction, ParseError> {
    let fragment = fragment.trim();
    let invalid = || {
        ctx.err(ParseErrorKind::InvalidAction {
            fragment: fragment.to_owned(),
        })
    };
    let reserved = || {
        ctx.err(ParseErrorKind::ReservedOperator {
            fragment: fragment.to_owned(),
        })
    };

    if fragment == "DONOTHING" {
        return Ok(AtomicAction::NoOp);
    }

    if let Some(rest) = strip_keyword(fragment, "ADD") {
        let (key, value) = rest.split_once('=').ok_or_else(invalid)?;
        let (key, value) = (key.trim(), value.trim());
        if value.starts_with('=') {
            return Err(reserved());
        }
        if !is_key(key) || value.is_empty() {
            return Err(invalid());
        }
        return Ok(AtomicAction::Add {
            key: key.to_owned(),
            value: value.to_owned(),
        });
    }

    if let Some(rest) = strip_keyword(fragment, "REMOVE") {
        let key = rest.trim();
        if !is_key(key) {
            return Err(invalid());
        }
        return Ok(AtomicAction::Remove { key: key.to_owned() });
    }

    if let Some(rest) = strip_keyword(fragment, "UPDATE") {
        let (key, value) = find_keyword(rest, "TO").ok_or_else(invalid)?;
        let (key, value) = (key.trim(), value.trim());
        if !is_key(key) || value.is_empty() {
            return Err(invalid());
        }
        return Ok(AtomicAction::Update {
            key: key.to_owned(),
            value: value.to_owned(),
        });
    }

    // Bare forms: the operator sits at the first '='.
    let eq = fragment.find('=').ok_or_else(invalid)?;
    let value = &fragment[eq + 1..];
    if value.starts_with('=') {
        return Err(reserved());
    }
    let value = value.trim();
    let head = &fragment[..eq];

    let (key, sign) = if let Some(k) = head.strip_suffix('+') {
        (k, Some(1.0))
    } else if let Some(k) = head.strip_suffix('-') {
        (k, Some(-1.0))
    } else {
        (head, None)
    };
    let key = key.trim();
    if !is_key(key) || value.is_empty() {
        return Err(invalid());
    }

    let Some(sign) = sign else {
        return Ok(AtomicAction::Assign {
            key: key.to_owned(),
            value: value.to_owned(),
        });
    };

    let delta = value
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite())
        .ok_or_else(|| {
            ctx.err(ParseErrorKind::NonNumericDelta {
                fragment: fragment.to_owned(),
                delta: value.to_owned(),
            })
        })?;
    let key = key.to_owned();
    Ok(if sign > 0.0 {
        AtomicAction::Increment { key, delta }
    } else {
        AtomicAction::Decrement { key, delta }
    })
}
