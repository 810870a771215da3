use rand::{Rng, distributions::Alphanumeric};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::time::Instant;

/// A query parameter carrying a JSON document, e.g. `viewport={"north":..}`.
///
/// Malformed documents are logged and treated as absent, so a bad filter
/// never fails the request; it just stops restricting anything.
#[derive(Debug)]
pub struct JsonParam<T>(pub Option<T>);

impl<T> Default for JsonParam<T> {
    fn default() -> Self {
        JsonParam(None)
    }
}

impl<T> JsonParam<T> {
    pub fn into_inner(self) -> Option<T> {
        self.0
    }
}

impl<'de, T> Deserialize<'de> for JsonParam<T>
where
    T: DeserializeOwned,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.trim().is_empty() {
            return Ok(JsonParam(None));
        }
        match serde_json::from_str::<T>(&s) {
            Ok(value) => Ok(JsonParam(Some(value))),
            Err(err) => {
                log::warn!("Ignoring malformed JSON query parameter '{s}': {err}");
                Ok(JsonParam(None))
            }
        }
    }
}

/// Query-string number. Values that don't parse are logged and treated as
/// absent instead of failing the request.
pub fn query_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|s| match s.trim().parse::<f64>() {
        Ok(number) => Some(number),
        Err(err) => {
            log::warn!("Ignoring non-numeric query parameter '{s}': {err}");
            None
        }
    }))
}

/// Query-string flag (`true`/`false`); anything else is logged and absent.
pub fn query_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|s| match s.trim().parse::<bool>() {
        Ok(flag) => Some(flag),
        Err(err) => {
            log::warn!("Ignoring non-boolean query parameter '{s}': {err}");
            None
        }
    }))
}

/// Deserializes a field that should be a JSON number; anything else (strings,
/// booleans, objects) is treated as absent.
pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()))
}

/// Deserializes an identifier given either as a string or a number.
pub fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Deserializes a field that should be a string; other JSON types are absent.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Deserializes a field that should be a boolean; other JSON types are absent.
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_bool()))
}

/// Deserializes an optional value, logging and discarding it when it does not
/// have the expected shape.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| parse_or_warn(v, "field")))
}

/// Deserializes an optional list, dropping (and logging) elements that do not
/// parse. A value that isn't an array at all is treated as absent.
pub fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Array(items)) => Some(parse_elements(items, "list element")),
        _ => None,
    })
}

/// Parses every element of `items`, skipping the ones that don't fit `T`.
pub fn parse_elements<T: DeserializeOwned>(items: Vec<serde_json::Value>, what: &str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| parse_or_warn(item, what))
        .collect()
}

fn parse_or_warn<T: DeserializeOwned>(value: serde_json::Value, what: &str) -> Option<T> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            log::warn!("Skipping malformed {what}: {err}");
            None
        }
    }
}

pub fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// Wall-clock timer for the `performance` block of map responses.
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Stopwatch {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.started.elapsed()
    }

    /// Elapsed time in fractional milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}
