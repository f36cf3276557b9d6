//! Gemini `generateContent` backend for PromptTalk.

mod client;

pub use client::GEMINI_API_KEY_ENV;
pub use client::GeminiClient;
