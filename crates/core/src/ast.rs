//! Rule AST types.
//!
//! These types are produced by the parser and consumed by the evaluator.
//! Everything is fully resolved at parse time: executing a rule never
//! re-reads rule text.

use std::fmt;

use serde::{Serialize, Serializer};

// ──────────────────────────────────────────────
// Actions
// ──────────────────────────────────────────────

/// A single tag mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AtomicAction {
    /// `key=value`: overwrite an existing key, never create one
    Assign { key: String, value: String },
    /// `key+=delta`
    Increment { key: String, delta: f64 },
    /// `key-=delta`
    Decrement { key: String, delta: f64 },
    /// `ADD key=value`: create only if absent
    Add { key: String, value: String },
    /// `REMOVE key`: drop every tag with the key
    Remove { key: String },
    /// `UPDATE key TO value`: upsert
    Update { key: String, value: String },
    /// `DONOTHING`
    NoOp,
}

impl fmt::Display for AtomicAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomicAction::Assign { key, value } => write!(f, "{}={}", key, value),
            AtomicAction::Increment { key, delta } => write!(f, "{}+={}", key, delta),
            AtomicAction::Decrement { key, delta } => write!(f, "{}-={}", key, delta),
            AtomicAction::Add { key, value } => write!(f, "ADD {}={}", key, value),
            AtomicAction::Remove { key } => write!(f, "REMOVE {}", key),
            AtomicAction::Update { key, value } => write!(f, "UPDATE {} TO {}", key, value),
            AtomicAction::NoOp => write!(f, "DONOTHING"),
        }
    }
}

/// Compound action expression. AND binds tighter than OR.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum ActionNode {
    Atomic(AtomicAction),
    And {
        left: Box<ActionNode>,
        right: Box<ActionNode>,
    },
    Or {
        left: Box<ActionNode>,
        right: Box<ActionNode>,
    },
}

impl ActionNode {
    pub fn and(left: ActionNode, right: ActionNode) -> Self {
        ActionNode::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: ActionNode, right: ActionNode) -> Self {
        ActionNode::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            ActionNode::Or { .. } => 1,
            ActionNode::And { .. } => 2,
            ActionNode::Atomic(_) => 3,
        }
    }

    /// Number of atomic actions in the tree.
    pub fn atom_count(&self) -> usize {
        match self {
            ActionNode::Atomic(_) => 1,
            ActionNode::And { left, right } | ActionNode::Or { left, right } => {
                left.atom_count() + right.atom_count()
            }
        }
    }
}

impl From<AtomicAction> for ActionNode {
    fn from(action: AtomicAction) -> Self {
        ActionNode::Atomic(action)
    }
}

fn write_operand(
    f: &mut fmt::Formatter<'_>,
    child: &ActionNode,
    wrap: bool,
) -> fmt::Result {
    if wrap {
        write!(f, "({})", child)
    } else {
        write!(f, "{}", child)
    }
}

impl fmt::Display for ActionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (left, right, word) = match self {
            ActionNode::Atomic(a) => return write!(f, "{}", a),
            ActionNode::And { left, right } => (left, right, "AND"),
            ActionNode::Or { left, right } => (left, right, "OR"),
        };
        let prec = self.precedence();
        // Parsing is left-associative, so only a right child of equal
        // precedence needs parentheses to keep its grouping.
        write_operand(f, left, left.precedence() < prec)?;
        write!(f, " {} ", word)?;
        write_operand(f, right, right.precedence() <= prec)
    }
}

// ──────────────────────────────────────────────
// Conditions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Gte => ">=",
            CompareOp::Lte => "<=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "==" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::Ne),
            ">" => Some(CompareOp::Gt),
            "<" => Some(CompareOp::Lt),
            ">=" => Some(CompareOp::Gte),
            "<=" => Some(CompareOp::Lte),
            _ => None,
        }
    }

    /// `>`, `<`, `>=` and `<=` require numeric operands.
    pub fn is_ordering(self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::Ne)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Serialize for CompareOp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

/// Atomic condition tested against a record's tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    Exists {
        key: String,
    },
    NotExists {
        key: String,
    },
    Compare {
        key: String,
        op: CompareOp,
        value: String,
    },
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Exists { key } => write!(f, "EXISTS {}", key),
            Condition::NotExists { key } => write!(f, "NOTEXISTS {}", key),
            Condition::Compare { key, op, value } => write!(f, "{} {} {}", key, op, value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicOp {
    And,
    Or,
}

impl LogicOp {
    pub fn precedence(self) -> u8 {
        match self {
            LogicOp::Or => 1,
            LogicOp::And => 2,
        }
    }
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicOp::And => f.write_str("AND"),
            LogicOp::Or => f.write_str("OR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RpnToken {
    Condition(Condition),
    Operator(LogicOp),
}

/// A condition clause in reverse-polish order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConditionRpn(pub Vec<RpnToken>);

impl ConditionRpn {
    pub fn tokens(&self) -> &[RpnToken] {
        &self.0
    }

    /// Rebuild the infix clause. `None` if the token sequence does not
    /// reduce to a single expression.
    fn to_infix(&self) -> Option<String> {
        let mut stack: Vec<(String, u8)> = Vec::new();
        for token in &self.0 {
            match token {
                RpnToken::Condition(c) => stack.push((c.to_string(), u8::MAX)),
                RpnToken::Operator(op) => {
                    let (right, rp) = stack.pop()?;
                    let (left, lp) = stack.pop()?;
                    let prec = op.precedence();
                    let left = if lp < prec { format!("({})", left) } else { left };
                    let right = if rp <= prec {
                        format!("({})", right)
                    } else {
                        right
                    };
                    stack.push((format!("{} {} {}", left, op, right), prec));
                }
            }
        }
        match stack.len() {
            1 => stack.pop().map(|(s, _)| s),
            _ => None,
        }
    }
}

impl fmt::Display for ConditionRpn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(infix) = self.to_infix() {
            return f.write_str(&infix);
        }
        // Malformed sequences are shown token by token in RPN order.
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|t| match t {
                RpnToken::Condition(c) => c.to_string(),
                RpnToken::Operator(op) => op.to_string(),
            })
            .collect();
        f.write_str(&parts.join(" "))
    }
}

// ──────────────────────────────────────────────
// Rules
// ──────────────────────────────────────────────

/// A `FREQ numerator/denominator` gate. The ratio is always in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Frequency {
    pub numerator: f64,
    pub denominator: f64,
}

impl Frequency {
    pub fn probability(&self) -> f64 {
        self.numerator / self.denominator
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    Unconditional {
        action: ActionNode,
    },
    Conditional {
        condition: ConditionRpn,
        then_action: ActionNode,
        #[serde(skip_serializing_if = "Option::is_none")]
        else_action: Option<ActionNode>,
    },
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Unconditional { action } => write!(f, "{}", action),
            RuleKind::Conditional {
                condition,
                then_action,
                else_action,
            } => {
                write!(f, "IF {} THEN {}", condition, then_action)?;
                if let Some(e) = else_action {
                    write!(f, " ELSE {}", e)?;
                }
                Ok(())
            }
        }
    }
}

/// One parsed rule line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    /// 1-based line in the rule source
    pub line_no: usize,
    /// Rule text as it appeared (trimmed)
    pub text: String,
    #[serde(flatten)]
    pub kind: RuleKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
}

impl Rule {
    pub fn is_conditional(&self) -> bool {
        matches!(self.kind, RuleKind::Conditional { .. })
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(freq) = &self.frequency {
            write!(f, " FREQ {}", freq)?;
        }
        Ok(())
    }
}

/// Ordered rules of one source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        RuleSet { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
