//! Field-based ordering of JSON documents

use std::cmp::Ordering;

use serde_json::Value;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

/// Sort by one top-level field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Field name
    pub field: String,
    /// Direction
    pub direction: SortDirection,
}

impl SortSpec {
    /// Ascending on `field`
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Descending on `field`
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parses `field` (ascending) or `-field` (descending).
    pub fn parse(text: &str) -> Result<Self, String> {
        let text = text.trim();
        let spec = match text.strip_prefix('-') {
            Some(field) => Self::desc(field),
            None => Self::asc(text),
        };
        if spec.field.is_empty() {
            return Err("empty sort field".to_string());
        }
        Ok(spec)
    }
}

/// Compares documents by a sort spec
pub struct ResultSorter;

impl ResultSorter {
    /// Orders two documents according to `spec`.
    pub fn compare(spec: &SortSpec, a: &Value, b: &Value) -> Ordering {
        let ordering = Self::compare_values(a.get(&spec.field), b.get(&spec.field));
        match spec.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    // missing < null < bool < number < string < array < object;
    // arrays and objects compare equal among themselves
    fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        let (a_val, b_val) = match (a, b) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a), Some(b)) => (a, b),
        };

        let type_order = |v: &Value| -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Number(_) => 2,
                Value::String(_) => 3,
                Value::Array(_) => 4,
                Value::Object(_) => 5,
            }
        };

        let by_type = type_order(a_val).cmp(&type_order(b_val));
        if by_type != Ordering::Equal {
            return by_type;
        }

        match (a_val, b_val) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => {
                if let (Some(xi), Some(yi)) = (x.as_i64(), y.as_i64()) {
                    return xi.cmp(&yi);
                }
                let xf = x.as_f64().unwrap_or(0.0);
                let yf = y.as_f64().unwrap_or(0.0);
                xf.partial_cmp(&yf).unwrap_or(Ordering::Equal)
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            _ => Ordering::Equal,
        }
    }
}
