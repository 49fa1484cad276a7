use serde_json::Value as JsonValue;

/// Filter on a top-level document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Field equals the JSON value exactly.
    Eq { field: &'static str, value: JsonValue },
    /// String field contains `needle`, ignoring case.
    ContainsIgnoreCase { field: &'static str, needle: String },
}

impl Predicate {
    pub fn eq(field: &'static str, value: impl Into<JsonValue>) -> Self {
        Self::Eq {
            field,
            value: value.into(),
        }
    }

    pub fn contains_ignore_case(field: &'static str, needle: impl Into<String>) -> Self {
        Self::ContainsIgnoreCase {
            field,
            needle: needle.into(),
        }
    }

    pub fn matches(&self, doc: &JsonValue) -> bool {
        match self {
            Predicate::Eq { field, value } => doc.get(field) == Some(value),
            Predicate::ContainsIgnoreCase { field, needle } => doc
                .get(field)
                .and_then(JsonValue::as_str)
                .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase())),
        }
    }
}

/// Conjunction of predicates with an optional result limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentQuery {
    pub predicates: Vec<Predicate>,
    pub limit: Option<usize>,
}

impl DocumentQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, doc: &JsonValue) -> bool {
        self.predicates.iter().all(|p| p.matches(doc))
    }
}
