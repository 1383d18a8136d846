//! Numeric reading and rendering of tag values.
//!
//! Tag values are text. Arithmetic and ordering treat them as `f64` when
//! they parse as one; results are written back in the shortest form that
//! reads back to the same number.

use tagmod_core::CompareOp;

/// Largest magnitude at which every integer is exactly representable.
const EXACT_INT_LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53

/// Parse a tag value or literal as a number. Surrounding whitespace is
/// ignored; `inf` and `NaN` stay text.
pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|x| x.is_finite())
}

/// Render an arithmetic result: `3` rather than `3.0`, `2.5` as is, and
/// exponent form (`1e308`) once the digits would run long.
pub fn format_number(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < EXACT_INT_LIMIT {
        (x as i64).to_string()
    } else {
        // Debug is the shortest text that parses back to `x`.
        format!("{:?}", x)
    }
}

pub fn compare(op: CompareOp, left: f64, right: f64) -> bool {
    match op {
        CompareOp::Eq => left == right,
        CompareOp::Ne => left != right,
        CompareOp::Gt => left > right,
        CompareOp::Lt => left < right,
        CompareOp::Gte => left >= right,
        CompareOp::Lte => left <= right,
    }
}
