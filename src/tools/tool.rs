//! Tool trait and types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::reservations::ReservationError;

/// Error type for tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error(transparent)]
    Reservation(#[from] ReservationError),
}

/// Call context a tool executes in: which restaurant owns the call and who
/// is calling.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub restaurant_id: Uuid,
    pub caller_number: Option<String>,
}

/// Definition of a tool's parameters using JSON Schema; serialized as-is
/// into the assistant configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Trait for tools the voice model can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name.
    fn name(&self) -> &str;

    /// Get a description of what the tool does.
    fn description(&self) -> &str;

    /// Get the JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool. On success, the returned string is spoken to the
    /// customer verbatim.
    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<String, ToolError>;

    /// Get the tool schema for the model's function-calling config.
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Boundary adapter: render an error kind as the sentence the assistant
/// speaks next. The caller never sees a structured error.
pub fn user_message(err: &ToolError) -> String {
    let text = match err {
        ToolError::InvalidParameters(_) => {
            "Je n'ai pas bien compris votre demande, pouvez-vous reformuler ?"
        }
        ToolError::Reservation(err) => match err {
            ReservationError::UnresolvedDate(_) => {
                "Je n'ai pas compris la date souhaitée, pouvez-vous la répéter ?"
            }
            ReservationError::MissingPhone => {
                "Il me faut un numéro de téléphone pour la réservation, pouvez-vous me le donner ?"
            }
            ReservationError::DailyLimitExceeded => {
                "Vous avez déjà deux réservations ce jour-là, je ne peux pas en ajouter une troisième."
            }
            ReservationError::NothingToUpdate => {
                "Que souhaitez-vous modifier : l'heure ou le nombre de personnes ?"
            }
            ReservationError::NotFound => {
                "Je ne trouve aucune réservation confirmée à ce nom."
            }
            ReservationError::Ambiguous => {
                "J'ai trouvé plusieurs réservations à ce nom, pouvez-vous me donner votre numéro de téléphone ?"
            }
            ReservationError::Store(_) => {
                "Désolé, une erreur technique est survenue, pouvez-vous réessayer dans un instant ?"
            }
        },
    };
    text.to_string()
}

/// Extract a required string argument.
pub(crate) fn str_arg(params: &serde_json::Value, key: &str) -> Result<String, ToolError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidParameters(format!("missing '{key}' parameter")))
}

/// Extract an optional string argument; absent and empty are equivalent.
pub(crate) fn opt_str_arg(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Coerce an argument the model may send as an integer or as a numeric
/// string into a positive party size.
pub(crate) fn party_size_arg(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<i32>, ToolError> {
    let value = match params.get(key) {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(value) => value,
    };

    let parsed = match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match parsed {
        Some(n) if n > 0 && n <= i32::MAX as i64 => Ok(Some(n as i32)),
        _ => Err(ToolError::InvalidParameters(format!(
            "'{key}' must be a positive integer"
        ))),
    }
}
