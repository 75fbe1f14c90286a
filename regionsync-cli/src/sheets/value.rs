//! Cell value representation shared by every store back-end

use serde_json::Value as JsonValue;

/// A single spreadsheet cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Blank cell
    #[default]
    Empty,
    /// Text cell
    Text(String),
    /// Whole number
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Boolean (TRUE/FALSE)
    Bool(bool),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }

    /// Check if the cell carries no value (blank or empty text)
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Interpret the cell as a 1-based row index
    ///
    /// Blank cells read as `Some(0)`. Whole floats and numeric text are
    /// accepted; anything else is `None`.
    pub fn as_row_index(&self) -> Option<i64> {
        match self {
            CellValue::Empty => Some(0),
            CellValue::Int(i) => Some(*i),
            CellValue::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            CellValue::Float(_) => None,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Some(0);
                }
                trimmed.parse::<i64>().ok().or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.fract() == 0.0 && f.is_finite())
                        .map(|f| f as i64)
                })
            }
            CellValue::Bool(_) => None,
        }
    }

    /// Convert from a JSON cell as returned by the Sheets values API
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => CellValue::Empty,
            JsonValue::Bool(b) => CellValue::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CellValue::Int(i)
                } else {
                    CellValue::Float(n.as_f64().unwrap_or_default())
                }
            }
            JsonValue::String(s) => CellValue::text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }

    /// Convert to JSON for the Sheets values API (blank cells become "")
    pub fn to_json(&self) -> JsonValue {
        match self {
            CellValue::Empty => JsonValue::String(String::new()),
            CellValue::Text(s) => JsonValue::String(s.clone()),
            CellValue::Int(i) => JsonValue::from(*i),
            CellValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            CellValue::Bool(b) => JsonValue::Bool(*b),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::text(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_index_parsing() {
        assert_eq!(CellValue::Int(5).as_row_index(), Some(5));
        assert_eq!(CellValue::Float(6.0).as_row_index(), Some(6));
        assert_eq!(CellValue::Float(6.5).as_row_index(), None);
        assert_eq!(CellValue::text(" 12 ").as_row_index(), Some(12));
        assert_eq!(CellValue::Empty.as_row_index(), Some(0));
        assert_eq!(CellValue::text("n/a").as_row_index(), None);
    }

    #[test]
    fn test_json_conversion() {
        assert_eq!(CellValue::from_json(&json!(3)), CellValue::Int(3));
        assert_eq!(CellValue::from_json(&json!(2.5)), CellValue::Float(2.5));
        assert_eq!(CellValue::from_json(&json!("")), CellValue::Empty);
        assert_eq!(CellValue::from_json(&json!(true)), CellValue::Bool(true));
        assert_eq!(CellValue::Empty.to_json(), json!(""));
    }
}
