//! Conversions from raw host states to the values rules work with.

use serde_json::Value;
use tracing::warn;

const OCCUPIED_STATES: [&str; 4] = ["on", "home", "true", "True"];

/// Whether an occupancy sensor state means someone is present
pub fn is_occupied(state: Option<&str>) -> bool {
    state.is_some_and(|s| OCCUPIED_STATES.contains(&s))
}

fn is_sentinel(raw: &str) -> bool {
    matches!(raw, "unknown" | "unavailable")
}

/// Integer reading of an entity state, truncated toward zero.
///
/// Missing, `unknown` and `unavailable` states read as 0. Any other
/// non-numeric state also reads as 0 but is logged.
pub fn state_to_int(entity_id: &str, state: Option<&str>) -> i64 {
    let raw = match state {
        Some(raw) => raw.trim(),
        None => return 0,
    };
    if is_sentinel(raw) {
        return 0;
    }

    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => v.trunc() as i64,
        _ => {
            warn!("{}: non-numeric reading '{}', using 0", entity_id, raw);
            0
        }
    }
}

/// Integer reading of an attribute value
pub fn value_to_int(entity_id: &str, value: Option<&Value>) -> i64 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(n)) => n.as_f64().map(|v| v.trunc() as i64).unwrap_or(0),
        Some(Value::String(s)) => state_to_int(entity_id, Some(s)),
        Some(Value::Bool(b)) => i64::from(*b),
        Some(other) => {
            warn!("{}: non-numeric value {}, using 0", entity_id, other);
            0
        }
    }
}
