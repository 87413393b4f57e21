//! Hyperparameter Normalization
//!
//! Clients frequently send every hyperparameter as a string. Strings made
//! only of ASCII digits become integers, other strings that parse as a
//! finite float become floats, and everything else is kept as given.

use modelhub_databases::ParamMap;
use serde_json::{Number, Value};
use tracing::{debug, info};

/// Normalize every value of a parameter mapping. Never fails.
pub fn normalize_params(params: &ParamMap) -> ParamMap {
    debug!("Converting parameters: {:?}", params);

    let converted: ParamMap = params
        .iter()
        .map(|(key, value)| (key.clone(), normalize_value(key, value)))
        .collect();

    info!(
        "Parameters conversion completed. Converted {} parameters",
        converted.len()
    );
    converted
}

/// Normalize a single value
pub fn normalize_value(key: &str, value: &Value) -> Value {
    match value {
        Value::String(raw) => convert_string(key, raw),
        other => {
            debug!("Parameter {key} kept as non-string value: {other}");
            other.clone()
        }
    }
}

fn convert_string(key: &str, raw: &str) -> Value {
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(int) = raw.parse::<i64>() {
            debug!("Parameter {key} converted to int: {int}");
            return Value::from(int);
        }
        if let Ok(int) = raw.parse::<u64>() {
            debug!("Parameter {key} converted to int: {int}");
            return Value::from(int);
        }
    }

    match raw.trim().parse::<f64>().ok().and_then(Number::from_f64) {
        Some(number) => {
            debug!("Parameter {key} converted to float: {number}");
            Value::Number(number)
        }
        None => {
            debug!("Parameter {key} kept as string: {raw}");
            Value::String(raw.to_string())
        }
    }
}
