use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

/// Parse a `snake_case` enum value using serde-deserialization.
pub fn parse_enum<T>(raw: &str, field: &str) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(normalized))
        .map_err(|error| anyhow::anyhow!("invalid {field} '{raw}': {error}"))
}

/// Parse a `key=value` pair. The value is read as JSON when it parses,
/// otherwise it is kept as a plain string.
pub fn parse_key_value(raw: &str, field: &str) -> anyhow::Result<(String, serde_json::Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        anyhow::bail!("invalid {field} '{raw}': expected key=value");
    };
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("invalid {field} '{raw}': key must not be empty");
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Collect repeated `key=value` flags into a map; later keys overwrite earlier ones.
pub fn parse_key_values(
    raw: &[String],
    field: &str,
) -> anyhow::Result<BTreeMap<String, serde_json::Value>> {
    raw.iter().map(|pair| parse_key_value(pair, field)).collect()
}
