//! Tokenizers for action expressions and condition clauses.
//!
//! Neither tokenizer can fail: anything that is not a structural symbol is
//! carried through as an [`Token::Atom`] and judged later by the parser.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Untouched rule fragment between structural symbols, trimmed, never empty
    Atom(String),
    LParen,
    RParen,
    And,
    Or,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Atom(s) => write!(f, "'{}'", s),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::And => write!(f, "'AND'"),
            Token::Or => write!(f, "'OR'"),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// True when `src[pos..]` starts with `word` and neither neighbour is a word
/// character.
pub(crate) fn is_word_at(src: &str, pos: usize, word: &str) -> bool {
    if !src[pos..].starts_with(word) {
        return false;
    }
    let before_ok = src[..pos].chars().next_back().is_none_or(|c| !is_word_char(c));
    let after_ok = src[pos + word.len()..]
        .chars()
        .next()
        .is_none_or(|c| !is_word_char(c));
    before_ok && after_ok
}

fn flush_atom(src: &str, start: usize, end: usize, tokens: &mut Vec<Token>) {
    let fragment = src[start..end].trim();
    if !fragment.is_empty() {
        tokens.push(Token::Atom(fragment.to_owned()));
    }
}

/// Split an action expression at parentheses and the whole words `AND`/`OR`.
///
/// Atomic fragments keep their inner text untouched (`UPDATE NAME TO Main
/// Street` stays one token).
pub fn lex_actions(src: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut atom_start = 0usize;
    let mut pos = 0usize;

    while pos < src.len() {
        let rest = &src[pos..];
        let structural = if rest.starts_with('(') {
            Some((Token::LParen, 1))
        } else if rest.starts_with(')') {
            Some((Token::RParen, 1))
        } else if is_word_at(src, pos, "AND") {
            Some((Token::And, 3))
        } else if is_word_at(src, pos, "OR") {
            Some((Token::Or, 2))
        } else {
            None
        };

        match structural {
            Some((token, len)) => {
                flush_atom(src, atom_start, pos, &mut tokens);
                tokens.push(token);
                pos += len;
                atom_start = pos;
            }
            None => {
                // Advance by a whole char so slicing stays on UTF-8 boundaries.
                pos += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
    }
    flush_atom(src, atom_start, src.len(), &mut tokens);
    tokens
}

/// Split a condition clause on whitespace-delimited `AND`/`OR`.
///
/// Consecutive non-keyword words are re-joined with single spaces into one
/// [`Token::Atom`]. Parentheses carry no meaning in conditions and are left
/// inside the atoms.
pub fn lex_conditions(src: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut words: Vec<&str> = Vec::new();

    for word in src.split_whitespace() {
        let op = match word {
            "AND" => Token::And,
            "OR" => Token::Or,
            _ => {
                words.push(word);
                continue;
            }
        };
        if !words.is_empty() {
            tokens.push(Token::Atom(words.join(" ")));
            words.clear();
        }
        tokens.push(op);
    }
    if !words.is_empty() {
        tokens.push(Token::Atom(words.join(" ")));
    }
    tokens
}
