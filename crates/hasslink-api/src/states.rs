// Bulk `/api/states` scan.

use serde_json::Value;

use crate::error::ApiError;
use crate::models::{EntityState, parse_error};

/// Pick the requested ids out of a bulk states body.
///
/// The result is positional with `ids`. At most `scan_limit` entries are
/// examined and scanning stops as soon as every requested id has been
/// located, so an id that only appears past the limit comes back as `None`.
pub(crate) fn pick(
    body: &str,
    ids: &[String],
    scan_limit: usize,
) -> Result<Vec<Option<EntityState>>, ApiError> {
    let entries: Vec<Value> = serde_json::from_str(body).map_err(|e| parse_error(&e, body))?;

    let mut out: Vec<Option<EntityState>> = vec![None; ids.len()];
    let mut found = 0;

    for entry in entries.into_iter().take(scan_limit) {
        let Some(entity_id) = entry.get("entity_id").and_then(Value::as_str) else {
            continue;
        };
        let slots: Vec<usize> = ids
            .iter()
            .enumerate()
            .filter(|(i, id)| *id == entity_id && out.get(*i).is_some_and(Option::is_none))
            .map(|(i, _)| i)
            .collect();
        if slots.is_empty() {
            continue;
        }
        // Malformed entries for a tracked id count as not found.
        let Ok(state) = EntityState::from_value(entry) else {
            continue;
        };
        for i in slots {
            if let Some(slot) = out.get_mut(i) {
                *slot = Some(state.clone());
                found += 1;
            }
        }
        if found == ids.len() {
            break;
        }
    }

    Ok(out)
}
