//! `hasslink run`: the sync worker behind a console panel.
//!
//! The network is assumed up at start; `offline`/`online` drive the
//! supervisor the way a Wi-Fi event handler would.

use std::sync::Arc;
use std::time::Duration;

use hasslink_core::{
    Bridges, DeviceSpec, DeviceState, StateApi, Supervisor, SyncHandle, hass_client_factory,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use super::console::{ConsoleBridge, ConsoleCommand, HELP};
use super::health::HostHealth;
use crate::cli::{GlobalOpts, RunArgs};
use crate::config::Target;
use crate::error::CliError;
use crate::output;

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub async fn handle(args: RunArgs, target: Target, global: &GlobalOpts) -> Result<(), CliError> {
    let Target {
        profile_name,
        mut sync,
    } = target;

    if let Some(secs) = args.interval {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        sync.schedule.sync_interval = Duration::from_secs(secs);
    }
    for entity_id in args.switches {
        if sync.devices.iter().any(|d| d.entity_id == entity_id) {
            continue;
        }
        let key = entity_id
            .split_once('.')
            .map_or(entity_id.as_str(), |(_, object)| object)
            .to_owned();
        sync.devices.push(DeviceSpec::new(entity_id, key));
    }
    if sync.devices.is_empty() {
        return Err(CliError::Validation {
            field: "switches".into(),
            reason: "nothing to track; add one with `hasslink config add-switch` or --switch"
                .into(),
        });
    }

    let url = sync.server.base_url()?;
    let console = Arc::new(ConsoleBridge::new(
        &sync,
        output::should_color(global.color),
        global.quiet,
    ));
    info!(
        profile = %profile_name,
        %url,
        devices = sync.devices.len(),
        sensors = sync.sensors.len(),
        "starting sync"
    );
    console.note(&format!(
        "tracking {} device(s) on {url}; type 'help' for commands",
        sync.devices.len()
    ));

    let factory = hass_client_factory(&sync);
    let bridges = Bridges::new(console.clone()).with_health(Arc::new(HostHealth::default()));
    let mut supervisor = Supervisor::new(sync, bridges, factory);
    supervisor.on_connectivity_change(true).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match ConsoleCommand::parse(&line) {
                    Ok(Some(cmd)) => match apply(cmd, &mut supervisor, &console).await {
                        Ok(Flow::Quit) => break,
                        Ok(Flow::Continue) => {}
                        Err(e) => console.note(&format!("error: {e}")),
                    },
                    Ok(None) => {}
                    Err(msg) => console.note(&msg),
                },
                // Keep syncing without a console until interrupted.
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!(error = %e, "stdin closed");
                    stdin_open = false;
                }
            },
        }
    }

    supervisor.stop().await;
    Ok(())
}

async fn apply<A, F>(
    cmd: ConsoleCommand,
    supervisor: &mut Supervisor<A, F>,
    console: &ConsoleBridge,
) -> Result<Flow, CliError>
where
    A: StateApi,
    F: FnMut() -> A,
{
    match cmd {
        ConsoleCommand::Quit => return Ok(Flow::Quit),
        ConsoleCommand::Help => console.note(HELP),
        ConsoleCommand::Online => supervisor.on_connectivity_change(true).await?,
        ConsoleCommand::Offline => supervisor.on_connectivity_change(false).await?,
        other => {
            let Some(handle) = supervisor.handle().filter(|h| !h.is_closed()) else {
                console.note("offline; type 'online' to reconnect");
                return Ok(Flow::Continue);
            };
            on_worker(other, &handle, console)?;
        }
    }
    Ok(Flow::Continue)
}

fn on_worker(
    cmd: ConsoleCommand,
    handle: &SyncHandle,
    console: &ConsoleBridge,
) -> Result<(), CliError> {
    match cmd {
        ConsoleCommand::Toggle(ident) => {
            let key = handle
                .summary(&ident)
                .map(|s| s.key)
                .ok_or_else(|| CliError::NotFound {
                    entity_id: ident.clone(),
                })?;
            console.flip(&key);
            handle.push_intent(&ident)?;
        }
        ConsoleCommand::Set(ident, on) => {
            handle.set_local_intent(&ident, DeviceState::from(on))?;
            handle.request_sync()?;
        }
        ConsoleCommand::Enable(ident, enabled) => handle.set_enabled(&ident, enabled)?,
        ConsoleCommand::Sync => handle.request_sync()?,
        ConsoleCommand::Status => console.print_status(handle.link_state(), &handle.summaries()),
        ConsoleCommand::Online
        | ConsoleCommand::Offline
        | ConsoleCommand::Help
        | ConsoleCommand::Quit => {}
    }
    Ok(())
}
