//! Data types shared between the PromptTalk session core and its callers.
//!
//! Nothing in this crate performs I/O; it is the vocabulary the controller
//! speaks over its state stream plus the registry of structured-output
//! schemas the backend can be asked to produce.

mod request;
mod schemas;
mod state;

pub use request::GenerationRequest;
pub use schemas::DecodedPayload;
pub use schemas::Pet;
pub use schemas::PetListResponse;
pub use schemas::SchemaId;
pub use state::SessionState;
