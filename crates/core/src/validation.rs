//! Field-level validation error collection.

use serde_json::{Map, Value};

/// Ordered collection of `(field, message)` validation failures.
///
/// Messages are kept in the order the rules ran, so the first entry is the
/// most relevant one to show on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    entries: Vec<(String, String)>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.entries.push((field.into(), message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any failure was recorded for `field`.
    pub fn has(&self, field: &str) -> bool {
        self.entries.iter().any(|(f, _)| f == field)
    }

    /// Messages recorded for `field`, in rule order.
    pub fn messages_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(f, _)| f == field)
            .map(|(_, m)| m.as_str())
    }

    /// `Ok(value)` when no failures were recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }

    /// Messages grouped per field: `{"title": ["..."], "price": ["...", "..."]}`.
    pub fn to_json(&self) -> Value {
        let mut grouped = Map::new();
        for (field, message) in &self.entries {
            let slot = grouped
                .entry(field.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(messages) = slot {
                messages.push(Value::String(message.clone()));
            }
        }
        Value::Object(grouped)
    }
}

impl core::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let Some((_, first)) = self.entries.first() else {
            return f.write_str("no errors");
        };
        match self.entries.len() - 1 {
            0 => f.write_str(first),
            1 => write!(f, "{first} (and 1 more error)"),
            n => write!(f, "{first} (and {n} more errors)"),
        }
    }
}
