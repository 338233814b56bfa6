//! Browser session lifecycle with request deduplication.
//!
//! [`SessionService`] is created once per signed-in user (and dropped, or
//! [`logout`](SessionService::logout) called, when they sign out). Clones share
//! the same state, so every part of an application can hold a handle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::auth::{CredentialSource, Credentials};
use crate::client::BackendClient;
use crate::config::SpectraConfig;
use crate::error::{Result, SpectraError};
use crate::types::{SessionOutcome, SessionState};
use crate::util::retry::RetryPolicy;

/// Identifies start requests that may share one backend call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StartKey {
    pub uid: String,
    pub enable_recording: bool,
}

const SIGNED_OUT: &str = "Signed out before the session was ready";

type SharedStart = Shared<BoxFuture<'static, SessionOutcome>>;

struct InFlight {
    id: u64,
    start: SharedStart,
}

struct Inner {
    backend: BackendClient,
    credentials: Arc<dyn CredentialSource>,
    state: watch::Sender<SessionState>,
    in_flight: Mutex<HashMap<StartKey, InFlight>>,
    /// Cancelled and replaced on logout; starts launched before it stop writing state.
    epoch: Mutex<CancellationToken>,
    next_start: AtomicU64,
    ready_delay: Duration,
}

/// Starts and ends the signed-in user's browser session.
#[derive(Clone)]
pub struct SessionService {
    inner: Arc<Inner>,
    agent_retry: RetryPolicy,
}

impl SessionService {
    pub fn new(config: SpectraConfig, credentials: Arc<dyn CredentialSource>) -> Result<Self> {
        Ok(Self::with_backend(BackendClient::new(config)?, credentials))
    }

    pub fn with_backend(backend: BackendClient, credentials: Arc<dyn CredentialSource>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        let ready_delay = backend.config().ready_delay;
        Self {
            inner: Arc::new(Inner {
                backend,
                credentials,
                state,
                in_flight: Mutex::new(HashMap::new()),
                epoch: Mutex::new(CancellationToken::new()),
                next_start: AtomicU64::new(0),
                ready_delay,
            }),
            agent_retry: RetryPolicy::agent_session(),
        }
    }

    /// Override the retry policy used when creating the agent session.
    pub fn with_agent_retry(mut self, policy: RetryPolicy) -> Self {
        self.agent_retry = policy;
        self
    }

    /// Current state snapshot.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Stream of state changes, starting with the current state.
    pub fn subscribe(&self) -> WatchStream<SessionState> {
        WatchStream::new(self.inner.state.subscribe())
    }

    /// Start (or reuse) the user's browser session.
    ///
    /// Concurrent calls with the same user and recording setting share one
    /// backend request and receive the same outcome. The request runs on its
    /// own task, so it completes (and releases the loading state) even if
    /// every caller stops waiting.
    pub async fn start_session(&self, enable_recording: bool) -> SessionOutcome {
        let credentials = match self.inner.credentials.credentials().await {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(error = %e, "cannot start session");
                return SessionOutcome::failure(e.to_string());
            }
        };

        let key = StartKey {
            uid: credentials.identity.uid.clone(),
            enable_recording,
        };

        let start = {
            let mut in_flight = self.inner.in_flight.lock().unwrap();
            if let Some(existing) = in_flight.get(&key) {
                debug!(uid = %key.uid, enable_recording, "start-session in flight, attaching");
                existing.start.clone()
            } else {
                if !claim_loading(&self.inner.state) {
                    debug!(uid = %key.uid, "session is already loading, skipping request");
                    return SessionOutcome::failure("Session is already being started");
                }
                let id = self.inner.next_start.fetch_add(1, Ordering::Relaxed);
                let epoch = self.inner.epoch.lock().unwrap().clone();
                let task = tokio::spawn(run_start(
                    self.inner.clone(),
                    self.agent_retry.clone(),
                    key.clone(),
                    id,
                    epoch,
                    credentials,
                ));
                let start = task
                    .map(|joined| {
                        joined.unwrap_or_else(|e| {
                            SessionOutcome::failure(format!("Session start failed: {e}"))
                        })
                    })
                    .boxed()
                    .shared();
                in_flight.insert(
                    key,
                    InFlight {
                        id,
                        start: start.clone(),
                    },
                );
                start
            }
        };

        start.await
    }

    /// End the active browser session.
    pub async fn end_session(&self) -> SessionOutcome {
        let mut rejection = None;
        self.inner.state.send_if_modified(|state| {
            if !state.is_active {
                rejection = Some("No active session to end");
                false
            } else if state.is_loading {
                rejection = Some("Session is already being ended");
                false
            } else {
                state.is_loading = true;
                true
            }
        });
        if let Some(message) = rejection {
            return SessionOutcome::failure(message);
        }

        let result = match self.inner.credentials.credentials().await {
            Ok(credentials) => self.inner.backend.end_session(credentials.bearer()).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(response) => {
                let session_id = self.state().session_id;
                self.inner.state.send_replace(SessionState::default());
                info!(session_id = ?session_id, "browser session ended");
                SessionOutcome::success(
                    response
                        .message
                        .unwrap_or_else(|| "Session ended successfully".to_string()),
                    None,
                )
            }
            Err(e) => {
                warn!(error = %e, "end-session failed");
                self.inner.state.send_modify(|state| state.is_loading = false);
                SessionOutcome::failure(user_message(&e))
            }
        }
    }

    /// Forget the local session state without contacting the backend.
    pub fn clear_session(&self) {
        self.inner.state.send_replace(SessionState::default());
    }

    /// Drop all state on sign-out. Pending starts are abandoned and never
    /// write their result back.
    pub fn logout(&self) {
        {
            let mut in_flight = self.inner.in_flight.lock().unwrap();
            let previous =
                std::mem::replace(&mut *self.inner.epoch.lock().unwrap(), CancellationToken::new());
            previous.cancel();
            in_flight.clear();
        }
        self.clear_session();
    }

    /// Wait out the provisioning warm-up after a successful start.
    ///
    /// Returns the session id once it is usable, or `None` for a failed outcome.
    pub async fn wait_ready(&self, outcome: &SessionOutcome) -> Option<String> {
        if !outcome.success {
            return None;
        }
        let session_id = outcome.session_id.clone()?;
        tokio::time::sleep(self.inner.ready_delay).await;
        Some(session_id)
    }
}

/// Mark the state as loading unless it already is.
fn claim_loading(state: &watch::Sender<SessionState>) -> bool {
    state.send_if_modified(|state| {
        if state.is_loading {
            false
        } else {
            state.is_loading = true;
            true
        }
    })
}

/// Apply `update` unless the service was logged out since `epoch` was taken.
///
/// `logout` cancels the epoch before resetting the state, and the check runs
/// under the channel's write lock, so a stale write can never land last.
fn update_if_current<F>(
    state: &watch::Sender<SessionState>,
    epoch: &CancellationToken,
    update: F,
) -> bool
where
    F: FnOnce(&mut SessionState),
{
    state.send_if_modified(|state| {
        if epoch.is_cancelled() {
            return false;
        }
        update(state);
        true
    })
}

/// Remove this start's map entry, leaving any newer start for the same key alone.
fn forget_start(inner: &Inner, key: &StartKey, id: u64) {
    let mut in_flight = inner.in_flight.lock().unwrap();
    if in_flight.get(key).is_some_and(|entry| entry.id == id) {
        in_flight.remove(key);
    }
}

async fn run_start(
    inner: Arc<Inner>,
    agent_retry: RetryPolicy,
    key: StartKey,
    id: u64,
    epoch: CancellationToken,
    credentials: Credentials,
) -> SessionOutcome {
    let result = tokio::select! {
        _ = epoch.cancelled() => None,
        result = provision(&inner, &agent_retry, &credentials, key.enable_recording, &epoch) => {
            Some(result)
        }
    };
    forget_start(&inner, &key, id);

    if epoch.is_cancelled() {
        debug!(uid = %key.uid, "start-session abandoned after logout");
        return SessionOutcome::failure(SIGNED_OUT);
    }

    match result {
        Some(Ok(outcome)) => outcome,
        Some(Err(e)) => {
            warn!(uid = %key.uid, error = %e, "start-session failed");
            update_if_current(&inner.state, &epoch, |state| state.is_loading = false);
            SessionOutcome::failure(user_message(&e))
        }
        None => SessionOutcome::failure(SIGNED_OUT),
    }
}

async fn provision(
    inner: &Inner,
    agent_retry: &RetryPolicy,
    credentials: &Credentials,
    enable_recording: bool,
    epoch: &CancellationToken,
) -> Result<SessionOutcome> {
    let started = inner
        .backend
        .start_session(credentials.bearer(), enable_recording)
        .await?;
    let active = SessionState::active(&started);
    if !update_if_current(&inner.state, epoch, |state| *state = active) {
        return Err(SpectraError::InvalidState(SIGNED_OUT.to_string()));
    }
    info!(
        session_id = %started.session_id,
        reused = started.is_existing(),
        "browser session started"
    );

    ensure_agent_session(inner, agent_retry, credentials, &started.session_id).await;

    let message = if started.is_existing() {
        "Session already exists and is ready"
    } else {
        "Session started successfully"
    };
    Ok(SessionOutcome::success(message, Some(started.session_id)))
}

/// Create the agent session, retrying every failure. Never fails the start.
async fn ensure_agent_session(
    inner: &Inner,
    agent_retry: &RetryPolicy,
    credentials: &Credentials,
    session_id: &str,
) {
    let backend = &inner.backend;
    let token = credentials.bearer();
    let uid = credentials.identity.uid.as_str();

    let result = agent_retry
        .execute_when(|| backend.create_agent_session(token, uid, session_id), |_| true)
        .await;

    match result {
        Ok(()) => debug!(session_id, "agent session ready"),
        Err(e) => error!(session_id, error = %e, "max retries reached for agent session creation"),
    }
}

/// The part of an error worth showing to the user.
fn user_message(error: &SpectraError) -> String {
    match error {
        SpectraError::Api { message, .. }
        | SpectraError::Authentication(message)
        | SpectraError::InvalidState(message) => message.clone(),
        other => other.to_string(),
    }
}
