//! `hasslink switch` and `hasslink scene`: one-shot service calls.

use hasslink_api::{ApiResponse, Service, ServiceCall, SwitchAction};
use hasslink_core::SwitchDomain;
use serde::Serialize;

use crate::cli::{GlobalOpts, SceneArgs, SwitchArgs, SwitchVerb};
use crate::config::Target;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct ServiceOutcome {
    entity_id: String,
    service: String,
    status: u16,
    /// State read back after the call, when the read succeeded.
    state: Option<String>,
}

fn detail(o: &ServiceOutcome) -> String {
    match o.state {
        Some(ref state) => format!("✓ {} → {} (now {state})", o.service, o.entity_id),
        None => format!("✓ {} → {}", o.service, o.entity_id),
    }
}

fn outcome(service: Service, entity_id: &str, resp: &ApiResponse) -> ServiceOutcome {
    ServiceOutcome {
        entity_id: entity_id.to_owned(),
        service: format!("{}.{}", service.domain(), service.service()),
        status: resp.status,
        state: None,
    }
}

fn action(verb: SwitchVerb) -> SwitchAction {
    match verb {
        SwitchVerb::On => SwitchAction::TurnOn,
        SwitchVerb::Off => SwitchAction::TurnOff,
        SwitchVerb::Toggle => SwitchAction::Toggle,
    }
}

pub async fn handle(args: SwitchArgs, target: &Target, global: &GlobalOpts) -> Result<(), CliError> {
    let client = super::client(target)?;
    let id = args.entity_id.as_str();
    let action = action(args.action);

    let (service, result) = match SwitchDomain::from_entity_id(id) {
        SwitchDomain::Switch => {
            let result = match action {
                SwitchAction::TurnOn => client.turn_on_switch(id).await,
                SwitchAction::TurnOff => client.turn_off_switch(id).await,
                SwitchAction::Toggle => client.toggle_switch(id).await,
            };
            (Service::Switch(action), result)
        }
        SwitchDomain::Light => {
            let service = Service::Light(action);
            let result = client.call_service(&ServiceCall::new(service, id)).await;
            (service, result)
        }
    };
    let resp = result.map_err(|e| CliError::for_entity(e, id))?;

    let mut done = outcome(service, id, &resp);
    tokio::time::sleep(target.sync.policy.verify_delay).await;
    done.state = client.get_entity_state(id).await.ok().map(|s| s.state);

    let out = output::render_single(global.output, &done, detail, |o| {
        o.state.clone().unwrap_or_default()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn scene(args: SceneArgs, target: &Target, global: &GlobalOpts) -> Result<(), CliError> {
    let client = super::client(target)?;
    let resp = client
        .activate_scene(&args.scene_id)
        .await
        .map_err(|e| CliError::for_entity(e, &args.scene_id))?;

    let done = outcome(Service::SceneActivate, &args.scene_id, &resp);
    let out = output::render_single(global.output, &done, detail, |o| o.status.to_string());
    output::print_output(&out, global.quiet);
    Ok(())
}
