// ── Connectivity supervisor ──
//
// Owns the worker lifecycle. Connect starts a worker (or nudges a running
// one); disconnect tears it down together with its records.

use std::marker::PhantomData;

use hasslink_api::HassClient;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::StateApi;
use crate::config::SyncConfig;
use crate::error::CoreError;
use crate::handle::SyncHandle;
use crate::model::LinkState;
use crate::orchestrator::{Bridges, Orchestrator, Worker};

pub struct Supervisor<A, F> {
    config: SyncConfig,
    bridges: Bridges,
    factory: F,
    worker: Option<Worker>,
    _api: PhantomData<fn() -> A>,
}

impl<A, F> Supervisor<A, F>
where
    A: StateApi,
    F: FnMut() -> A,
{
    /// `factory` builds a fresh, uninitialized API client for each worker.
    pub fn new(config: SyncConfig, bridges: Bridges, factory: F) -> Self {
        Self {
            config,
            bridges,
            factory,
            worker: None,
            _api: PhantomData,
        }
    }

    pub fn handle(&self) -> Option<SyncHandle> {
        self.worker.as_ref().map(|w| w.handle.clone())
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.join.is_finished())
    }

    /// Start a worker unless one is already running.
    pub fn start(&mut self) -> SyncHandle {
        if let Some(worker) = self.worker.as_ref().filter(|w| !w.join.is_finished()) {
            return worker.handle.clone();
        }
        let api = (self.factory)();
        let worker = Orchestrator::spawn(api, &self.config, &self.bridges);
        let handle = worker.handle.clone();
        self.worker = Some(worker);
        handle
    }

    /// Cancel the worker and wait for it. Its records are dropped.
    pub async fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            info!("stopping sync worker");
            worker.shutdown().await;
        }
        self.bridges.ui.set_status(LinkState::Offline);
    }

    pub async fn on_connectivity_change(&mut self, connected: bool) -> Result<(), CoreError> {
        if !connected {
            info!("connectivity lost");
            self.stop().await;
            return Ok(());
        }

        info!("connectivity established");
        if !self.is_running() {
            let handle = self.start();
            return handle.request_init();
        }
        let handle = self.start();
        if handle.is_initialized() {
            handle.request_sync()
        } else {
            handle.request_init()
        }
    }

    /// Drive the worker from a connectivity flag until `cancel` fires or the
    /// sender goes away, then stop it.
    pub async fn follow(mut self, mut link: watch::Receiver<bool>, cancel: CancellationToken) {
        let initial = *link.borrow_and_update();
        if let Err(e) = self.on_connectivity_change(initial).await {
            warn!(error = %e, "connectivity handling failed");
        }

        loop {
            let changed = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                changed = link.changed() => changed,
            };
            if changed.is_err() {
                break;
            }
            let connected = *link.borrow_and_update();
            if let Err(e) = self.on_connectivity_change(connected).await {
                warn!(error = %e, "connectivity handling failed");
            }
        }

        self.stop().await;
    }
}

/// Factory producing a fresh `HassClient` for each worker.
pub fn hass_client_factory(config: &SyncConfig) -> impl FnMut() -> HassClient + Send + 'static {
    let server = config.server.clone();
    let transport = config.transport.clone();
    move || HassClient::new(server.clone(), transport.clone())
}
