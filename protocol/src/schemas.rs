use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;

/// Closed enumeration of structured-output shapes the backend can be asked
/// to produce. Each identifier carries the human-readable description shown
/// to users and the full prompt template sent to the backend in place of the
/// user's own prompt.
///
/// Adding a schema means adding a variant here, its payload type below, and
/// one decode arm in the extractor; the extraction algorithm itself is
/// schema-independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SchemaId {
    PetList,
}

impl SchemaId {
    pub fn description(self) -> &'static str {
        match self {
            SchemaId::PetList => "pet list",
        }
    }

    pub fn request_prompt(self) -> &'static str {
        match self {
            SchemaId::PetList => PET_LIST_REQUEST_PROMPT,
        }
    }
}

const PET_LIST_REQUEST_PROMPT: &str = r#"Provide a JSON list of at least 3 pets. Each pet must have the following fields:
- "type": the kind of pet (string, e.g. "dog", "cat", "parrot")
- "name": the pet's name (string)
- "hobby": the pet's favourite activity (string)

Output pure JSON with no extra text or Markdown. Example:
{
  "pets": [
    {
      "type": "dog",
      "name": "Rex",
      "hobby": "fetch"
    },
    {
      "type": "cat",
      "name": "Mimi",
      "hobby": "sunbathing"
    }
  ]
}
Return JSON matching this structure."#;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Pet {
    pub r#type: String,
    pub name: String,
    pub hobby: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PetListResponse {
    pub pets: Vec<Pet>,
}

/// Typed result of a successful structured-output extraction, one variant
/// per [`SchemaId`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "schema", rename_all = "snake_case")]
pub enum DecodedPayload {
    PetList(PetListResponse),
}

impl DecodedPayload {
    pub fn schema(&self) -> SchemaId {
        match self {
            DecodedPayload::PetList(_) => SchemaId::PetList,
        }
    }
}
