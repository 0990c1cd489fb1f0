//! Worker lifecycle: install, activate and fetch hooks driven through the
//! service worker state machine.
//!
//! ```text
//! Parsed ──install()──► Installing ──ok──► Installed ──activate()──► Activating ──► Activated
//!                            │                 ▲  (skip_waiting activates at once)
//!                            └──err──► Redundant
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

use crate::error::{SwError, SwResult};
use crate::request::Request;
use crate::interceptor::FetchOutcome;
use crate::platform::Platform;

/// Worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorkerState {
    /// Initial state, script evaluated.
    #[default]
    Parsed,
    /// Install hook running.
    Installing,
    /// Installed but waiting for activation.
    Installed,
    /// Activate hook running.
    Activating,
    /// Active and intercepting requests.
    Activated,
    /// Install failed or replaced.
    Redundant,
}

impl WorkerState {
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

/// Lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    StateChange {
        version: String,
        new_state: WorkerState,
    },
}

/// Passed to the install hook.
pub struct InstallEvent<'a> {
    platform: &'a dyn Platform,
    skip_waiting: &'a AtomicBool,
}

impl<'a> InstallEvent<'a> {
    pub fn platform(&self) -> &'a dyn Platform {
        self.platform
    }

    /// Activate as soon as install completes instead of waiting for
    /// existing clients to close.
    pub fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }
}

/// Passed to the activate hook.
pub struct ActivateEvent<'a> {
    platform: &'a dyn Platform,
}

impl<'a> ActivateEvent<'a> {
    pub fn platform(&self) -> &'a dyn Platform {
        self.platform
    }
}

/// Passed to the fetch hook.
pub struct FetchEvent<'a> {
    platform: &'a dyn Platform,
    pub request: Request,
}

impl<'a> FetchEvent<'a> {
    pub fn platform(&self) -> &'a dyn Platform {
        self.platform
    }
}

/// The three lifecycle hooks a worker registers.
///
/// The runtime awaits each hook to completion before it considers the
/// phase finished.
#[async_trait]
pub trait WorkerHandler: Send + Sync {
    /// Version tag reported in lifecycle events.
    fn version(&self) -> &str;

    async fn install(&self, event: &InstallEvent<'_>) -> SwResult<()>;

    async fn activate(&self, event: &ActivateEvent<'_>) -> SwResult<()>;

    async fn fetch(&self, event: FetchEvent<'_>) -> FetchOutcome;
}

/// Drives one worker version through its lifecycle on a platform.
pub struct WorkerRuntime<H, P> {
    handler: Arc<H>,
    platform: Arc<P>,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
    event_tx: mpsc::UnboundedSender<WorkerEvent>,
}

impl<H: WorkerHandler, P: Platform> WorkerRuntime<H, P> {
    /// Create a runtime and the receiver for its lifecycle events.
    pub fn new(handler: Arc<H>, platform: Arc<P>) -> (Self, mpsc::UnboundedReceiver<WorkerEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (
            Self {
                handler,
                platform,
                state: RwLock::new(WorkerState::Parsed),
                skip_waiting: AtomicBool::new(false),
                event_tx,
            },
            event_rx,
        )
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    fn notify(&self, new_state: WorkerState) {
        info!(version = self.handler.version(), state = ?new_state, "Worker state changed");
        let _ = self.event_tx.send(WorkerEvent::StateChange {
            version: self.handler.version().to_string(),
            new_state,
        });
    }

    async fn set_state(&self, new_state: WorkerState) {
        *self.state.write().await = new_state;
        self.notify(new_state);
    }

    /// Move `from` → `to`, failing if the worker is elsewhere.
    async fn transition(&self, from: WorkerState, to: WorkerState) -> SwResult<()> {
        {
            let mut state = self.state.write().await;
            if *state != from {
                return Err(SwError::State(format!(
                    "cannot move to {to:?} from {:?}",
                    *state
                )));
            }
            *state = to;
        }
        self.notify(to);
        Ok(())
    }

    /// Run the install hook. If it asked to skip waiting, activation
    /// follows immediately.
    ///
    /// A failed hook makes the worker redundant; it never activates.
    pub async fn install(&self) -> SwResult<WorkerState> {
        self.transition(WorkerState::Parsed, WorkerState::Installing).await?;

        let event = InstallEvent {
            platform: self.platform.as_ref(),
            skip_waiting: &self.skip_waiting,
        };
        if let Err(e) = self.handler.install(&event).await {
            warn!(version = self.handler.version(), error = %e, "Install failed");
            self.set_state(WorkerState::Redundant).await;
            return Err(SwError::InstallFailed(e.to_string()));
        }
        self.set_state(WorkerState::Installed).await;

        if self.skip_waiting.load(Ordering::SeqCst) {
            self.activate().await?;
        }
        Ok(self.state().await)
    }

    /// Activate an installed worker.
    ///
    /// An activate hook failure is logged; the worker still becomes active.
    pub async fn activate(&self) -> SwResult<()> {
        self.transition(WorkerState::Installed, WorkerState::Activating).await?;

        let event = ActivateEvent {
            platform: self.platform.as_ref(),
        };
        if let Err(e) = self.handler.activate(&event).await {
            warn!(version = self.handler.version(), error = %e, "Activate hook failed");
        }
        self.set_state(WorkerState::Activated).await;
        Ok(())
    }

    /// Dispatch a fetch event. Only an activated worker intercepts.
    ///
    /// Requests arriving while the worker is still `Activating` go straight
    /// to the network instead of being held until activation settles; the
    /// previous version (or none) is still the controller at that point.
    pub async fn handle_fetch(&self, request: Request) -> FetchOutcome {
        if !self.state().await.can_intercept_fetch() {
            return FetchOutcome::PassThrough;
        }
        let event = FetchEvent {
            platform: self.platform.as_ref(),
            request,
        };
        self.handler.fetch(event).await
    }

    /// Mark the worker as replaced.
    pub async fn make_redundant(&self) {
        self.set_state(WorkerState::Redundant).await;
    }
}
