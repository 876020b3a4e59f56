//! Command handlers.

pub mod config_cmd;
mod connection;
mod console;
mod health;
mod run;
mod sensor;
mod states;
mod switch;

use hasslink_api::HassClient;

use crate::cli::{Command, GlobalOpts};
use crate::config::Target;
use crate::error::CliError;

pub async fn dispatch(cmd: Command, target: Target, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(args, target, global).await,
        Command::States(args) => states::handle(args, &target, global).await,
        Command::Switch(args) => switch::handle(args, &target, global).await,
        Command::Scene(args) => switch::scene(args, &target, global).await,
        Command::Sensor(args) => sensor::handle(args, &target, global).await,
        Command::Test => connection::handle(&target, global).await,
        // Handled in main before a target is resolved
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

/// An initialized client for one-shot commands.
fn client(target: &Target) -> Result<HassClient, CliError> {
    let client = HassClient::connect(target.sync.server.clone(), target.sync.transport.clone())?;
    Ok(client)
}
