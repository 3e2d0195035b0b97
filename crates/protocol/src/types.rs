//! Common types used across the bridge surface

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::BridgeError;

/// Unique identifier for one script run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value held by the shared cell ("pasteboard").
///
/// Scripts may store anything; the host keeps the value opaque until a
/// consumer needs its display form. Structured data (objects, arrays)
/// crosses the script boundary as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    /// Unset slot; reads as `undefined` on the script side
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
    Structured(serde_json::Value),
}

impl CellValue {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Build a cell value from a JSON value produced by the script side.
    ///
    /// `null` folds into [`CellValue::Empty`]: the cell does not
    /// distinguish a cleared slot from an explicit null.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Empty,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Structured(other),
        }
    }

    /// JSON form of the value, or `None` for an empty slot.
    #[must_use]
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::Empty => None,
            Self::Bool(b) => Some(serde_json::Value::Bool(*b)),
            Self::Number(n) => Some(
                serde_json::Number::from_f64(*n)
                    .map_or(serde_json::Value::Null, serde_json::Value::Number),
            ),
            Self::Text(s) => Some(serde_json::Value::String(s.clone())),
            Self::Structured(v) => Some(v.clone()),
        }
    }

    /// Display string form, used when a component stringifies the cell
    /// (e.g. the alert message field). Whole numbers drop the fraction,
    /// so `123.0` renders as `"123"`.
    #[must_use]
    pub fn display_string(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::Text(s) => s.clone(),
            Self::Structured(v) => v.to_string(),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_string())
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A native alert prompt request, consumed exactly once by the invoker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRequest {
    pub title: String,
    /// Already in display string form (see [`CellValue::display_string`])
    pub message: String,
    /// Label for the confirmation button
    pub action_label: String,
}

impl AlertRequest {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        action_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            action_label: action_label.into(),
        }
    }
}

/// Validate a URL handed to the external dispatcher.
///
/// The dispatch target is checked only for non-emptiness and a plausible
/// URI scheme; whether any application handles the scheme is not
/// observable at this layer.
pub fn validate_route_target(url: &str) -> Result<(), BridgeError> {
    if url.trim().is_empty() {
        return Err(BridgeError::InvalidTarget("empty URL".into()));
    }
    let Some((scheme, _)) = url.split_once(':') else {
        return Err(BridgeError::InvalidTarget(format!("{url:?} has no scheme")));
    };
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid {
        return Err(BridgeError::InvalidTarget(format!(
            "{url:?} has an invalid scheme"
        )));
    }
    Ok(())
}
