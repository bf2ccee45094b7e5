use amem_rs_vector::Metadata;
use serde_json::Value;

/// Build flat metadata from string pairs.
pub fn flat_metadata<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Metadata {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
        .collect()
}
