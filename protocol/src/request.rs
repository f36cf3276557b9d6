use serde::Deserialize;
use serde::Serialize;

use crate::schemas::SchemaId;

/// One generation attempt as submitted by the caller. Immutable once built.
///
/// When `schema` is set, the schema's request prompt template is what gets
/// sent to the backend; the user's own prompt only decided (at the caller's
/// level) that a schema applies.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub schema: Option<SchemaId>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, schema: Option<SchemaId>) -> Self {
        Self {
            prompt: prompt.into(),
            schema,
        }
    }

    /// The text actually sent to the backend: the schema's template fully
    /// replaces the user prompt when a schema was requested.
    pub fn backend_prompt(&self) -> &str {
        match self.schema {
            Some(schema) => schema.request_prompt(),
            None => &self.prompt,
        }
    }
}
