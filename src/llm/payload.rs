//! Decoding helpers for untrusted model output.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::llm::gateway::{GatewayError, GatewayResult};

/// Parse a JSON object out of raw model text.
///
/// Accepts a bare object, an object wrapped in a Markdown code fence, or an object
/// surrounded by stray prose.
///
/// # Errors
/// Returns `GatewayError::Malformed` if no JSON object can be recovered.
pub fn parse_json_payload(raw: &str) -> GatewayResult<Value> {
    let trimmed = strip_code_fence(raw.trim());
    if trimmed.is_empty() {
        return Err(GatewayError::EmptyOutput);
    }

    let value = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => value,
        Err(first_err) => {
            let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
                return Err(GatewayError::Malformed(first_err.to_string()));
            };
            if end <= start {
                return Err(GatewayError::Malformed(first_err.to_string()));
            }
            serde_json::from_str::<Value>(&trimmed[start..=end])
                .map_err(|err| GatewayError::Malformed(err.to_string()))?
        }
    };

    if value.is_object() {
        Ok(value)
    } else {
        Err(GatewayError::Malformed(
            "expected a JSON object at the top level".to_string(),
        ))
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Deserialize a list that the model may send as `null`.
///
/// # Errors
/// Returns an error if the value is neither `null` nor a list of `T`.
pub fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Deserialize an optional count that the model may send as a number or chatty text.
///
/// Text such as `"1,200 kcal"` or `"about 450"` yields the first number found in it.
/// Anything that carries no usable count becomes `None` rather than an error.
///
/// # Errors
/// Returns an error only if the underlying JSON cannot be read.
pub fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_f64().and_then(float_to_u32),
        Some(Value::String(text)) => first_number(&text).and_then(float_to_u32),
        _ => None,
    })
}

fn first_number(text: &str) -> Option<f64> {
    let compact: String = text.chars().filter(|c| !matches!(c, ',' | '_')).collect();
    let start = compact.find(|c: char| c.is_ascii_digit())?;
    let run: String = compact[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let run = run.trim_end_matches('.');
    run.parse()
        .ok()
        .or_else(|| run.split('.').next().and_then(|whole| whole.parse().ok()))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn float_to_u32(value: f64) -> Option<u32> {
    if !value.is_finite() || value < 0.0 || value > f64::from(u32::MAX) {
        return None;
    }
    Some(value.round() as u32)
}
