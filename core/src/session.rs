use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use prompttalk_protocol::DecodedPayload;
use prompttalk_protocol::GenerationRequest;
use prompttalk_protocol::SchemaId;
use prompttalk_protocol::SessionState;

use crate::backend::GenerationBackend;
use crate::config::Config;
use crate::error::Result;
use crate::error::TalkErr;
use crate::extract::extract_structured;

/// Streaming session controller.
///
/// Owns at most one generation attempt at a time: `submit` cancels whatever
/// is in flight before the new attempt becomes observable, and
/// `stop_and_commit_current` freezes the reveal at its current prefix. State
/// is published through a watch channel, so subscribers always see the
/// latest state and late subscribers see no history.
///
/// Created once per chat session; dropping the session cancels any in-flight
/// attempt with no further state emissions.
pub struct TalkSession {
    backend: Arc<dyn GenerationBackend>,
    config: Arc<Config>,
    state_tx: watch::Sender<SessionState>,
    current_attempt: Mutex<Option<RunningAttempt>>,
}

struct RunningAttempt {
    cancellation_token: CancellationToken,
    /// Aborts the attempt task when the attempt is replaced or the session
    /// is dropped.
    _handle: AbortOnDropHandle<()>,
}

impl TalkSession {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: Arc<Config>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            backend,
            config,
            state_tx,
            current_attempt: Mutex::new(None),
        }
    }

    /// Subscribe to the session's state stream. The receiver replays the
    /// latest value on subscription and coalesces states a slow observer
    /// missed.
    pub fn state_stream(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn current_state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    /// Cancel any in-flight attempt and start a new one for `prompt`.
    ///
    /// When `schema` is set, the schema's request prompt template is sent to
    /// the backend instead of `prompt` and the response is decoded against
    /// the schema before anything is revealed.
    ///
    /// Must be called from within a tokio runtime. Serialized against
    /// `stop_and_commit_current`; the superseded attempt emits no further
    /// states once the new attempt's `Pending` is observable.
    pub fn submit(&self, prompt: impl Into<String>, schema: Option<SchemaId>) {
        let request = GenerationRequest::new(prompt, schema);
        let mut current = self.lock_attempt();

        if let Some(previous) = current.take() {
            debug!("superseding in-flight attempt");
            previous.cancellation_token.cancel();
            // `previous` is dropped below, aborting its task. Emissions were
            // already fenced off by the cancel: attempt tasks publish through
            // `emit_unless_cancelled`, which rechecks the token inside the
            // watch channel's send lock.
        }
        self.state_tx.send_replace(SessionState::Pending);

        let cancellation_token = CancellationToken::new();
        let handle = tokio::spawn(run_attempt(
            Arc::clone(&self.backend),
            Arc::clone(&self.config),
            self.state_tx.clone(),
            cancellation_token.child_token(),
            request,
        ));
        *current = Some(RunningAttempt {
            cancellation_token,
            _handle: AbortOnDropHandle::new(handle),
        });
    }

    /// Stop the current attempt and keep what is already shown.
    ///
    /// A `Pending` attempt has nothing to commit and returns the session to
    /// `Idle`; a `Revealing` attempt is committed at its current prefix,
    /// permanently truncating the visible result. No-op when nothing is in
    /// flight or the attempt already reached a terminal state.
    pub fn stop_and_commit_current(&self) {
        let mut current = self.lock_attempt();
        let Some(attempt) = current.take() else {
            return;
        };
        attempt.cancellation_token.cancel();

        match self.current_state() {
            SessionState::Pending => {
                debug!("stopped while pending; nothing to commit");
                self.state_tx.send_replace(SessionState::Idle);
            }
            SessionState::Revealing {
                shown_prefix,
                structured,
                ..
            } => {
                debug!(
                    shown_chars = shown_prefix.chars().count(),
                    "reveal stopped; committing the revealed prefix"
                );
                self.state_tx.send_replace(SessionState::Committed {
                    final_text: shown_prefix,
                    structured,
                });
            }
            // The attempt finished on its own; the state is already terminal.
            _ => {}
        }
    }

    fn lock_attempt(&self) -> MutexGuard<'_, Option<RunningAttempt>> {
        self.current_attempt
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TalkSession {
    fn drop(&mut self) {
        if let Some(attempt) = self.lock_attempt().take() {
            debug!("session dropped; cancelling in-flight attempt");
            attempt.cancellation_token.cancel();
        }
    }
}

/// One generation attempt, run on its own task: backend call, optional
/// structured extraction, then the reveal loop.
async fn run_attempt(
    backend: Arc<dyn GenerationBackend>,
    config: Arc<Config>,
    state_tx: watch::Sender<SessionState>,
    cancellation_token: CancellationToken,
    request: GenerationRequest,
) {
    let prompt = request.backend_prompt().to_string();
    debug!(schema = ?request.schema, "sending prompt to backend");

    // Racing against the token drops the backend future on cancellation; a
    // backend that cannot be interrupted simply never gets its result read.
    let response = tokio::select! {
        _ = cancellation_token.cancelled() => {
            debug!("attempt cancelled while awaiting backend");
            return;
        }
        response = call_backend(backend.as_ref(), &prompt, config.request_timeout()) => response,
    };

    let raw_text = match response {
        Ok(text) => text,
        Err(err) => {
            warn!("backend call failed: {err}");
            emit_unless_cancelled(
                &state_tx,
                &cancellation_token,
                SessionState::Failed {
                    reason: err.to_string(),
                },
            );
            return;
        }
    };
    trace!(len = raw_text.len(), "received raw backend response");

    let mut structured = None;
    let final_text = match request.schema {
        Some(schema) => match extract_structured(&raw_text, schema) {
            Ok(payload) => {
                debug!(%schema, "structured payload decoded");
                let text = substitute_display_text(schema);
                structured = Some(payload);
                text
            }
            Err(err) => {
                warn!(%schema, "structured extraction failed: {err}");
                emit_unless_cancelled(
                    &state_tx,
                    &cancellation_token,
                    SessionState::Failed {
                        reason: TalkErr::from(err).to_string(),
                    },
                );
                return;
            }
        },
        None => raw_text.trim().to_string(),
    };

    if final_text.is_empty() {
        warn!("backend response contained no usable text");
        emit_unless_cancelled(
            &state_tx,
            &cancellation_token,
            SessionState::Failed {
                reason: "backend returned no usable text".to_string(),
            },
        );
        return;
    }

    reveal(
        &state_tx,
        &cancellation_token,
        final_text,
        structured,
        config.reveal_interval(),
    )
    .await;
}

async fn call_backend(
    backend: &dyn GenerationBackend,
    prompt: &str,
    timeout: Option<Duration>,
) -> Result<String> {
    let generated = match timeout {
        Some(limit) => tokio::time::timeout(limit, backend.generate(prompt))
            .await
            .map_err(|_| TalkErr::Timeout(limit))??,
        None => backend.generate(prompt).await?,
    };
    Ok(generated.text)
}

/// Reveal `final_text` one character per tick. For N characters this emits
/// exactly N `Revealing` states with strictly growing prefixes, then one
/// `Committed`. Every emission is preceded by a tick-length suspension, so
/// cancellation always has a window and observers never see two states fused
/// into one wakeup.
async fn reveal(
    state_tx: &watch::Sender<SessionState>,
    cancellation_token: &CancellationToken,
    final_text: String,
    structured: Option<DecodedPayload>,
    tick: Duration,
) {
    for (idx, ch) in final_text.char_indices() {
        tokio::select! {
            _ = cancellation_token.cancelled() => return,
            _ = tokio::time::sleep(tick) => {}
        }
        let boundary = idx + ch.len_utf8();
        let emitted = emit_unless_cancelled(
            state_tx,
            cancellation_token,
            SessionState::Revealing {
                final_text: final_text.clone(),
                shown_prefix: final_text[..boundary].to_string(),
                structured: structured.clone(),
            },
        );
        if !emitted {
            return;
        }
    }

    tokio::select! {
        _ = cancellation_token.cancelled() => return,
        _ = tokio::time::sleep(tick) => {}
    }
    emit_unless_cancelled(
        state_tx,
        cancellation_token,
        SessionState::Committed {
            final_text,
            structured,
        },
    );
}

/// Publish `state` unless the attempt has been cancelled.
///
/// The token check runs inside the watch channel's send lock. `submit` and
/// `stop_and_commit_current` cancel the token before publishing their own
/// state through the same sender, so a superseded attempt can never slip a
/// state in afterwards.
fn emit_unless_cancelled(
    state_tx: &watch::Sender<SessionState>,
    cancellation_token: &CancellationToken,
    state: SessionState,
) -> bool {
    state_tx.send_if_modified(|current| {
        if cancellation_token.is_cancelled() {
            return false;
        }
        *current = state;
        true
    })
}

/// Human-readable stand-in revealed instead of raw JSON when a schema
/// decoded successfully; the typed payload travels alongside it.
fn substitute_display_text(schema: SchemaId) -> String {
    format!(
        "Fetched the {}; see the attached details.",
        schema.description()
    )
}
