//! `hasslink states`: one-shot entity reads.

use hasslink_api::{ApiError, EntityState};
use tabled::Tabled;
use tracing::warn;

use crate::cli::{GlobalOpts, StatesArgs};
use crate::config::Target;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct StateRow {
    #[tabled(rename = "Entity")]
    entity_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Last changed")]
    last_changed: String,
}

impl StateRow {
    fn new(s: &EntityState, color: bool) -> Self {
        Self {
            entity_id: s.entity_id.clone(),
            name: s.friendly_name.clone().unwrap_or_default(),
            state: output::paint_state(&s.state, color),
            last_changed: s
                .last_changed
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Ids named on the command line, else everything the profile tracks.
fn requested_ids(args: StatesArgs, target: &Target) -> Vec<String> {
    if !args.entity_ids.is_empty() {
        return args.entity_ids;
    }
    target
        .sync
        .devices
        .iter()
        .map(|d| d.entity_id.clone())
        .chain(target.sync.sensors.iter().map(|s| s.entity_id.clone()))
        .collect()
}

pub async fn handle(args: StatesArgs, target: &Target, global: &GlobalOpts) -> Result<(), CliError> {
    let ids = requested_ids(args, target);
    if ids.is_empty() {
        return Err(CliError::Validation {
            field: "entity_ids".into(),
            reason: "none given and the profile tracks no entities".into(),
        });
    }

    let client = super::client(target)?;
    let states = if let [only] = ids.as_slice() {
        let state = client
            .get_entity_state(only)
            .await
            .map_err(|e| CliError::for_entity(e, only))?;
        vec![state]
    } else {
        match client.get_multiple_entity_states(&ids).await {
            Ok(states) => states,
            Err(ApiError::PartialNotFound { states, .. }) => {
                for (id, slot) in ids.iter().zip(&states) {
                    if slot.is_none() {
                        warn!(entity = %id, "not in bulk response");
                        eprintln!(
                            "warning: {id} not found in the first {} states",
                            target.sync.transport.bulk_scan_limit
                        );
                    }
                }
                states.into_iter().flatten().collect()
            }
            Err(ApiError::NotFound) => {
                return Err(CliError::NotFound {
                    entity_id: ids.join(", "),
                });
            }
            Err(e) => return Err(e.into()),
        }
    };

    let color = output::should_color(global.color);
    let out = output::render_list(
        global.output,
        &states,
        |s| StateRow::new(s, color),
        |s| format!("{}={}", s.entity_id, s.state),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
