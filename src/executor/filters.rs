//! Field predicates over JSON documents
//!
//! Used to build query filters from text such as `age>=30` or
//! `name=alice`. Comparison is strict: no type coercion, missing or null
//! fields never match.

use serde_json::Value;

/// Comparison operator of a field predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// `=`
    Eq,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
}

/// `field op value` over a top-level document field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPredicate {
    /// Field name
    pub field: String,
    /// Operator
    pub op: FilterOp,
    /// Right-hand side
    pub value: Value,
}

impl FieldPredicate {
    /// Creates a predicate
    pub fn new(field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Parses `field<op>value`.
    ///
    /// The value is read as JSON when it parses (`30`, `true`, `"x"`) and as
    /// a bare string otherwise.
    pub fn parse(text: &str) -> Result<Self, String> {
        let op_start = text
            .find(|c| matches!(c, '=' | '<' | '>'))
            .ok_or_else(|| format!("no operator in predicate: {:?}", text))?;

        let field = text[..op_start].trim();
        if field.is_empty() {
            return Err(format!("missing field name in predicate: {:?}", text));
        }

        let rest = &text[op_start..];
        let (op, raw) = if let Some(v) = rest.strip_prefix(">=") {
            (FilterOp::Gte, v)
        } else if let Some(v) = rest.strip_prefix("<=") {
            (FilterOp::Lte, v)
        } else if let Some(v) = rest.strip_prefix("==") {
            (FilterOp::Eq, v)
        } else if let Some(v) = rest.strip_prefix('=') {
            (FilterOp::Eq, v)
        } else if let Some(v) = rest.strip_prefix('>') {
            (FilterOp::Gt, v)
        } else if let Some(v) = rest.strip_prefix('<') {
            (FilterOp::Lt, v)
        } else {
            return Err(format!("unsupported operator in predicate: {:?}", text));
        };

        let raw = raw.trim();
        let value =
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));

        Ok(Self::new(field, op, value))
    }

    /// Checks the predicate against a document
    pub fn matches(&self, document: &Value) -> bool {
        let actual = match document.get(&self.field) {
            Some(v) if !v.is_null() => v,
            _ => return false,
        };

        match self.op {
            FilterOp::Eq => actual == &self.value,
            op => match compare(actual, &self.value) {
                Some(ordering) => match op {
                    FilterOp::Gt => ordering.is_gt(),
                    FilterOp::Gte => ordering.is_ge(),
                    FilterOp::Lt => ordering.is_lt(),
                    FilterOp::Lte => ordering.is_le(),
                    FilterOp::Eq => ordering.is_eq(),
                },
                None => false,
            },
        }
    }
}

/// Orders numbers with numbers and strings with strings; other pairs are
/// incomparable.
fn compare(actual: &Value, bound: &Value) -> Option<std::cmp::Ordering> {
    match (actual, bound) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(ai), Some(bi)) = (a.as_i64(), b.as_i64()) {
                return Some(ai.cmp(&bi));
            }
            if let (Some(au), Some(bu)) = (a.as_u64(), b.as_u64()) {
                return Some(au.cmp(&bu));
            }
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Evaluates a conjunction of predicates
pub struct PredicateFilter;

impl PredicateFilter {
    /// Checks if a document matches all predicates
    pub fn matches(document: &Value, predicates: &[FieldPredicate]) -> bool {
        predicates.iter().all(|pred| pred.matches(document))
    }
}
