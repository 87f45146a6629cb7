use crate::constants::{ANNOTATION_KEYS, PLACEHOLDER};
use crate::error::AnalysisError;
use std::collections::HashMap;
use std::fmt;

/// Values of the recognised attribute keys, in `ANNOTATION_KEYS` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeProjection {
    values: [String; ANNOTATION_KEYS.len()],
}

impl AttributeProjection {
    /// Projection used when nothing overlaps: every field is the placeholder.
    pub fn placeholder() -> Self {
        Self {
            values: std::array::from_fn(|_| PLACEHOLDER.to_string()),
        }
    }

}

impl fmt::Display for AttributeProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.values.join("\t"))
    }
}

/// Parses a GTF attribute column (`key "value"; key "value";`).
///
/// Unrecognised keys are dropped, missing recognised keys become `.`, and a
/// repeated key keeps its last value. A non-blank field without any `"` is
/// an error.
pub fn parse_attributes(raw: &str) -> Result<AttributeProjection, AnalysisError> {
    let trimmed = raw.trim();
    let body = trimmed.strip_suffix(';').unwrap_or(trimmed);

    let mut parsed: HashMap<&str, &str> = HashMap::new();
    for field in body.split(';') {
        if field.trim().is_empty() {
            continue;
        }
        let mut parts = field.split('"');
        let key = parts.next().unwrap_or_default().trim();
        let value = parts
            .next()
            .ok_or_else(|| AnalysisError::MalformedAttribute(field.to_string()))?;
        parsed.insert(key, value);
    }

    let values = std::array::from_fn(|idx| {
        parsed
            .get(ANNOTATION_KEYS[idx])
            .map_or_else(|| PLACEHOLDER.to_string(), |v| v.to_string())
    });
    Ok(AttributeProjection { values })
}
