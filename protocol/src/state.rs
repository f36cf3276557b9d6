use serde::Deserialize;
use serde::Serialize;

use crate::schemas::DecodedPayload;

/// Observable state of one generation attempt.
///
/// Exactly one variant is current at any time; transitions are monotonic
/// (`Idle → Pending → Revealing* → Committed | Failed`) and only a new
/// submission returns the session to `Pending`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionState {
    /// No generation in progress and no revealed text.
    #[default]
    Idle,
    /// A request is in flight; no text is available yet.
    Pending,
    /// A result has been obtained and is being revealed one character per
    /// tick. `shown_prefix` is always a prefix of `final_text`.
    Revealing {
        final_text: String,
        shown_prefix: String,
        structured: Option<DecodedPayload>,
    },
    /// Terminal success. `final_text` is the full reveal on natural
    /// completion, or whatever had been revealed when the caller stopped
    /// early.
    Committed {
        final_text: String,
        structured: Option<DecodedPayload>,
    },
    /// Terminal failure with a human-readable reason.
    Failed { reason: String },
}

impl SessionState {
    /// True once no further transitions will occur for the current attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Idle | SessionState::Committed { .. } | SessionState::Failed { .. }
        )
    }

    /// The text a renderer should currently display, if any.
    pub fn visible_text(&self) -> Option<&str> {
        match self {
            SessionState::Idle | SessionState::Pending => None,
            SessionState::Revealing { shown_prefix, .. } => Some(shown_prefix),
            SessionState::Committed { final_text, .. } => Some(final_text),
            SessionState::Failed { reason } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn revealing_serializes_with_type_tag() {
        let state = SessionState::Revealing {
            final_text: "hi".to_string(),
            shown_prefix: "h".to_string(),
            structured: None,
        };
        let json = serde_json::to_value(&state).expect("serialize state");
        assert_eq!(json["type"], "revealing");
        assert_eq!(json["shown_prefix"], "h");
    }

    #[test]
    fn visible_text_tracks_the_reveal() {
        assert_eq!(SessionState::Pending.visible_text(), None);
        let revealing = SessionState::Revealing {
            final_text: "hi".to_string(),
            shown_prefix: "h".to_string(),
            structured: None,
        };
        assert_eq!(revealing.visible_text(), Some("h"));
        let committed = SessionState::Committed {
            final_text: "hi".to_string(),
            structured: None,
        };
        assert_eq!(committed.visible_text(), Some("hi"));
    }

    #[test]
    fn terminal_states_are_terminal() {
        assert!(SessionState::Idle.is_terminal());
        assert!(
            SessionState::Failed {
                reason: "boom".to_string()
            }
            .is_terminal()
        );
        assert!(!SessionState::Pending.is_terminal());
    }
}
