use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::errors::PipelineError;

/// Purchase payload as posted by Google Sheets scripts, Make scenarios or Keitaro.
///
/// Nothing here is trusted: text fields accept any JSON scalar (spreadsheets
/// happily send phones as numbers) and `null` reads as absent. Unknown keys
/// are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLead {
    /// First name (required)
    #[serde(default, deserialize_with = "loose_string")]
    pub nombre: Option<String>,

    /// Last name
    #[serde(default, deserialize_with = "loose_string")]
    pub apellido: Option<String>,

    /// Phone in any format (required)
    #[serde(default, deserialize_with = "loose_string")]
    pub phone: Option<String>,

    /// Purchase value in ARS, number or numeric string (required)
    #[serde(default)]
    pub amount: Option<Value>,

    /// When the purchase happened; date string or epoch number
    #[serde(default)]
    pub event_time: Option<Value>,

    /// Caller-side dedup id (e.g. the sheet's contact_id)
    #[serde(default, deserialize_with = "loose_string")]
    pub event_id: Option<String>,

    /// Meta browser id cookie (`_fbp`)
    #[serde(default, deserialize_with = "loose_string")]
    pub fbp: Option<String>,

    /// Meta click id cookie (`_fbc`)
    #[serde(default, deserialize_with = "loose_string")]
    pub fbc: Option<String>,

    #[serde(default, deserialize_with = "loose_string")]
    pub click_id: Option<String>,

    /// Events Manager test code, forwarded as-is when set
    #[serde(default, deserialize_with = "loose_string")]
    pub test_event_code: Option<String>,
}

/// The required part of a [`RawLead`], checked and parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedLead<'a> {
    pub first_name: &'a str,
    pub last_name: Option<&'a str>,
    pub phone: &'a str,
    pub amount: f64,
}

impl RawLead {
    /// Checks the required fields and parses `amount`.
    ///
    /// Blank strings count as missing. A non-numeric or non-finite amount is
    /// rejected instead of being forwarded to Meta.
    pub fn validate(&self) -> Result<ValidatedLead<'_>, PipelineError> {
        let first_name = non_blank(&self.nombre);
        let phone = non_blank(&self.phone);
        let amount = self.amount.as_ref().filter(|v| !is_blank_value(v));

        let (Some(first_name), Some(phone), Some(amount)) = (first_name, phone, amount) else {
            return Err(PipelineError::Validation(
                "Missing required fields (nombre, phone, amount)".to_string(),
            ));
        };

        let amount = parse_amount(amount).ok_or_else(|| {
            PipelineError::Validation(format!("amount must be a number, got {}", amount))
        })?;

        Ok(ValidatedLead {
            first_name,
            last_name: self.apellido.as_deref(),
            phone,
            amount,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

fn is_blank_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn parse_amount(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Accepts any JSON scalar as a string; `null`, arrays and objects read as absent.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}
