//! Schema-driven coercion of credential data.
//!
//! Credential data usually arrives as a flat map of strings (configuration
//! files, environment). Some credential types declare numeric or boolean
//! properties and the platform rejects strings for those, so string values
//! are converted according to the credential-type schema before creation.
//!
//! Coercion is best-effort: anything that cannot be converted is sent as-is
//! and left for the platform to judge.

use serde_json::{Map, Number, Value};

use crate::gateway::CredentialGateway;

/// Convert string values in `data` according to the `properties` of a JSON
/// schema.
///
/// - `number` / `integer`: parsed as an integer when possible, otherwise as a
///   finite float
/// - `boolean`: `1 t T true TRUE True` / `0 f F false FALSE False`
///
/// Non-string values, keys without a schema property, properties without a
/// `type`, and unparsable strings are kept unchanged.
pub fn coerce_to_schema(schema: &Value, data: Map<String, Value>) -> Map<String, Value> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        tracing::debug!("credential schema has no properties, using data as-is");
        return data;
    };

    data.into_iter()
        .map(|(key, value)| {
            let coerced = match &value {
                Value::String(raw) => properties
                    .get(&key)
                    .and_then(|property| coerce_value(&key, raw, property)),
                _ => None,
            };
            (key, coerced.unwrap_or(value))
        })
        .collect()
}

fn coerce_value(key: &str, raw: &str, property: &Value) -> Option<Value> {
    let property_type = property.get("type").and_then(Value::as_str)?;

    let converted = match property_type {
        "number" | "integer" => parse_number(raw),
        "boolean" => parse_bool(raw).map(Value::Bool),
        _ => return None,
    };

    match &converted {
        Some(value) => tracing::debug!(key, %value, property_type, "coerced credential field"),
        None => tracing::debug!(key, property_type, "could not coerce credential field, keeping string"),
    }
    converted
}

fn parse_number(raw: &str) -> Option<Value> {
    if let Ok(int) = raw.parse::<i64>() {
        return Some(Value::Number(int.into()));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Fetch the schema for `credential_type` and coerce `data` with it.
///
/// A failed or empty schema lookup is logged and the data is returned
/// unchanged; this step never fails the caller.
pub async fn coerce_with_gateway<C>(
    gateway: &C,
    credential_type: &str,
    data: Map<String, Value>,
) -> Map<String, Value>
where
    C: CredentialGateway + ?Sized,
{
    match gateway.schema(credential_type).await {
        Ok(Some(schema)) => coerce_to_schema(&schema, data),
        Ok(None) => data,
        Err(error) => {
            tracing::warn!(
                credential_type,
                %error,
                "could not fetch credential schema, using string values as-is"
            );
            data
        }
    }
}
