//! `hasslink sensor`: read one numeric sensor.

use serde::Serialize;

use crate::cli::{GlobalOpts, SensorArgs};
use crate::config::Target;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct Reading {
    entity_id: String,
    value: f32,
    unit: Option<String>,
}

pub async fn handle(args: SensorArgs, target: &Target, global: &GlobalOpts) -> Result<(), CliError> {
    let client = super::client(target)?;
    let value = client
        .get_sensor_value(&args.entity_id)
        .await
        .map_err(|e| CliError::for_entity(e, &args.entity_id))?;

    let unit = target
        .sync
        .sensors
        .iter()
        .find(|s| s.entity_id == args.entity_id)
        .and_then(|s| s.unit.clone());
    let reading = Reading {
        entity_id: args.entity_id,
        value,
        unit,
    };

    let out = output::render_single(
        global.output,
        &reading,
        |r| format!("{}: {}{}", r.entity_id, r.value, r.unit.as_deref().unwrap_or("")),
        |r| r.value.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
