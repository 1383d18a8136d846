use std::path::PathBuf;

/// A rule that could not be parsed. Carries the 1-based line number and the
/// full text of the offending line.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("line {line_no}: {kind} in rule: {line}")]
pub struct ParseError {
    pub line_no: usize,
    pub line: String,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("empty action expression")]
    EmptyAction,
    #[error("missing closing parenthesis in action expression")]
    MissingCloseParen,
    #[error("unexpected {found} in action expression")]
    UnexpectedToken { found: String },
    #[error("invalid or extra tokens in action expression")]
    TrailingTokens,
    #[error("invalid action '{fragment}'")]
    InvalidAction { fragment: String },
    #[error("non-numeric delta '{delta}' in '{fragment}'")]
    NonNumericDelta { fragment: String, delta: String },
    #[error("'==' is reserved for conditions, use '=' for assignment in '{fragment}'")]
    ReservedOperator { fragment: String },
    #[error("invalid condition '{fragment}'")]
    InvalidCondition { fragment: String },
    #[error("invalid condition expression")]
    InvalidConditionChain,
    #[error("invalid conditional rule syntax")]
    InvalidConditional,
    #[error("invalid frequency format '{spec}'")]
    InvalidFrequency { spec: String },
    #[error("frequency {value} is outside (0, 1]")]
    FrequencyOutOfRange { value: f64 },
}

impl ParseErrorKind {
    /// Stable identifier used in JSON error output.
    pub fn code(&self) -> &'static str {
        match self {
            ParseErrorKind::EmptyAction => "empty_action",
            ParseErrorKind::MissingCloseParen => "missing_close_paren",
            ParseErrorKind::UnexpectedToken { .. } => "unexpected_token",
            ParseErrorKind::TrailingTokens => "trailing_tokens",
            ParseErrorKind::InvalidAction { .. } => "invalid_action",
            ParseErrorKind::NonNumericDelta { .. } => "non_numeric_delta",
            ParseErrorKind::ReservedOperator { .. } => "reserved_operator",
            ParseErrorKind::InvalidCondition { .. } => "invalid_condition",
            ParseErrorKind::InvalidConditionChain => "invalid_condition_chain",
            ParseErrorKind::InvalidConditional => "invalid_conditional",
            ParseErrorKind::InvalidFrequency { .. } => "invalid_frequency",
            ParseErrorKind::FrequencyOutOfRange { .. } => "frequency_out_of_range",
        }
    }
}

impl ParseError {
    pub fn new(line_no: usize, line: &str, kind: ParseErrorKind) -> Self {
        ParseError {
            line_no,
            line: line.to_owned(),
            kind,
        }
    }

    /// Serialize for `--output json` error reporting. Always includes every field.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "kind":    self.kind.code(),
            "line":    self.line_no,
            "message": self.kind.to_string(),
            "rule":    self.line,
        })
    }
}

/// Failure to load a rule file from disk.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not read rule file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
}
