use thiserror::Error;

use prompttalk_protocol::DecodedPayload;
use prompttalk_protocol::PetListResponse;
use prompttalk_protocol::SchemaId;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no structured block found in model output")]
    NoStructuredBlock,
    #[error("structured block did not decode: {0}")]
    DecodeFailed(#[from] serde_json::Error),
}

/// Pull a single structured payload out of free-form generated text and
/// decode it against `schema`. Pure function of its inputs.
///
/// The candidate block is the widest span from the first `{` to the last `}`
/// in the text. Prose containing stray brace characters outside the JSON
/// block can therefore over-capture; that is a documented limitation of the
/// span rule, not something this function tries to repair.
pub fn extract_structured(
    raw_text: &str,
    schema: SchemaId,
) -> std::result::Result<DecodedPayload, ExtractError> {
    let start = raw_text.find('{').ok_or(ExtractError::NoStructuredBlock)?;
    let block = match raw_text.rfind('}') {
        Some(end) if end > start => &raw_text[start..=end],
        // An opening brace with no closer still looks like an attempted
        // block; let the decoder report what is wrong with it.
        _ => &raw_text[start..],
    };

    // Unknown fields are ignored by the decode for forward compatibility;
    // missing required fields are a decode failure.
    let payload = match schema {
        SchemaId::PetList => {
            DecodedPayload::PetList(serde_json::from_str::<PetListResponse>(block)?)
        }
    };
    Ok(payload)
}
