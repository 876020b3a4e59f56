// ── Requester side of the sync worker ──

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::error::{CoreError, SyncError};
use crate::model::{DeviceState, DeviceSummary, LinkState};
use crate::registry::DeviceRegistry;

/// Requests drained by the worker at the top of each iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// (Re)initialize the API client.
    Init,
    /// Run a switch reconciliation now instead of at the next tick.
    SyncNow,
    /// Read the UI toggle for this device, set it as intent and push it.
    PushIntent { entity_id: String },
    SetEnabled { entity_id: String, enabled: bool },
    Stop,
}

/// Cheaply cloneable handle to a running sync worker.
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::Sender<Command>,
    registry: Arc<DeviceRegistry>,
    state: watch::Receiver<LinkState>,
}

impl SyncHandle {
    pub(crate) fn new(
        tx: mpsc::Sender<Command>,
        registry: Arc<DeviceRegistry>,
        state: watch::Receiver<LinkState>,
    ) -> Self {
        Self {
            tx,
            registry,
            state,
        }
    }

    fn send(&self, cmd: Command) -> Result<(), CoreError> {
        debug!(?cmd, "queueing sync command");
        self.tx.try_send(cmd).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => CoreError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => CoreError::WorkerStopped,
        })
    }

    fn resolve(&self, ident: &str) -> Result<String, SyncError> {
        self.registry
            .resolve(ident)
            .ok_or_else(|| SyncError::UnknownDevice(ident.to_owned()))
    }

    pub fn request_init(&self) -> Result<(), CoreError> {
        self.send(Command::Init)
    }

    pub fn request_sync(&self) -> Result<(), CoreError> {
        self.send(Command::SyncNow)
    }

    pub fn stop(&self) -> Result<(), CoreError> {
        self.send(Command::Stop)
    }

    /// Ask the worker to take the UI toggle for `ident` (entity id or key)
    /// and push it immediately.
    pub fn push_intent(&self, ident: &str) -> Result<(), CoreError> {
        let entity_id = self.resolve(ident)?;
        self.send(Command::PushIntent { entity_id })
    }

    /// Record a user intent; it is pushed on the next cycle.
    pub fn set_local_intent(&self, ident: &str, intent: DeviceState) -> Result<(), CoreError> {
        let entity_id = self.resolve(ident)?;
        self.registry
            .update(&entity_id, |r| r.set_local_intent(intent))
            .ok_or(SyncError::UnknownDevice(entity_id))??;
        Ok(())
    }

    pub fn set_enabled(&self, ident: &str, enabled: bool) -> Result<(), CoreError> {
        let entity_id = self.resolve(ident)?;
        self.send(Command::SetEnabled { entity_id, enabled })
    }

    pub fn summaries(&self) -> Vec<DeviceSummary> {
        self.registry.summaries()
    }

    pub fn summary(&self, ident: &str) -> Option<DeviceSummary> {
        self.registry
            .resolve(ident)
            .and_then(|id| self.registry.summary(&id))
    }

    pub fn link_state(&self) -> LinkState {
        *self.state.borrow()
    }

    pub fn is_initialized(&self) -> bool {
        self.link_state().is_initialized()
    }

    /// Subscribe to link state changes.
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.state.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
