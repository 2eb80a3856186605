//! Structural matcher.
//!
//! An [`ExpectedShape`] is a list of `(JSON pointer, expected value)` pairs.
//! Each pointer is resolved in the observed object and compared with deep,
//! total equality: maps must have exactly the expected keys, and numbers
//! compare by value whatever their width.  A missing field never matches.

use serde::Serialize;
use serde_json::Value;

use super::poller::Verdict;

/// One expected field that did not hold.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldMismatch {
    pub path: String,
    pub expected: Value,
    /// `None` when the field is absent from the observed object.
    pub observed: Option<Value>,
}

impl std::fmt::Display for FieldMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.observed {
            Some(observed) => write!(
                f,
                "{}: expected {}, observed {}",
                self.path, self.expected, observed
            ),
            None => write!(f, "{}: expected {}, observed absent", self.path, self.expected),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpectedShape {
    fields: Vec<(String, Value)>,
}

impl ExpectedShape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect the value at `path` (an RFC 6901 pointer such as
    /// `/metadata/labels`) to equal `expected`.
    pub fn field(mut self, path: impl Into<String>, expected: impl Into<Value>) -> Self {
        self.fields.push((path.into(), expected.into()));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(p, v)| (p.as_str(), v))
    }

    /// Every expected field that the observed document fails to satisfy.
    pub fn mismatches(&self, observed: &Value) -> Vec<FieldMismatch> {
        self.fields
            .iter()
            .filter_map(|(path, expected)| {
                let actual = observed.pointer(path);
                match actual {
                    Some(actual) if deep_equal(expected, actual) => None,
                    _ => Some(FieldMismatch {
                        path: path.clone(),
                        expected: expected.clone(),
                        observed: actual.cloned(),
                    }),
                }
            })
            .collect()
    }

    /// Serialize `observed` and compare.  A value that cannot be serialized
    /// counts as not matching.
    pub fn verdict<T: Serialize>(&self, observed: &T) -> Verdict {
        let doc = match serde_json::to_value(observed) {
            Ok(doc) => doc,
            Err(e) => return Verdict::pending(format!("observed value not serializable: {e}")),
        };
        let mismatches = self.mismatches(&doc);
        if mismatches.is_empty() {
            Verdict::Satisfied
        } else {
            let lines: Vec<String> = mismatches.iter().map(ToString::to_string).collect();
            Verdict::Pending(lines.join("; "))
        }
    }
}

/// Deep equality where numbers compare by value.
pub fn deep_equal(expected: &Value, observed: &Value) -> bool {
    match (expected, observed) {
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, x)| b.get(k).is_some_and(|y| deep_equal(x, y)))
        }
        (a, b) => a == b,
    }
}

fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    let as_int = |n: &serde_json::Number| {
        n.as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
    };
    match (as_int(a), as_int(b)) {
        (Some(x), Some(y)) => x == y,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}
