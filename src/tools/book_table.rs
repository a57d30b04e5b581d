//! Table booking tool.

use std::sync::Arc;

use async_trait::async_trait;

use crate::reservations::ReservationManager;
use crate::temporal;
use crate::tools::tool::{opt_str_arg, party_size_arg, str_arg, Tool, ToolContext, ToolError};

/// Creates a confirmed reservation for the restaurant owning the call.
pub struct BookTableTool {
    manager: Arc<ReservationManager>,
}

impl BookTableTool {
    pub fn new(manager: Arc<ReservationManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Tool for BookTableTool {
    fn name(&self) -> &str {
        "book_table"
    }

    fn description(&self) -> &str {
        "Enregistrer une réservation une fois le nom, le nombre de personnes et l'heure obtenus."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Nom du client"
                },
                "size": {
                    "type": "integer",
                    "description": "Nombre de personnes"
                },
                "time_str": {
                    "type": "string",
                    "description": "Date et heure souhaitées, telles que dites par le client (ex: 'ce soir à 20h')"
                },
                "phone_backup": {
                    "type": "string",
                    "description": "Numéro de téléphone dicté par le client, si l'appel n'en fournit pas"
                }
            },
            "required": ["name", "size", "time_str"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<String, ToolError> {
        let name = str_arg(&params, "name")?;
        let party_size = party_size_arg(&params, "size")?
            .ok_or_else(|| ToolError::InvalidParameters("missing 'size' parameter".to_string()))?;
        let time_str = str_arg(&params, "time_str")?;
        let phone_backup = opt_str_arg(&params, "phone_backup");

        // The call's own number wins; a dictated backup covers phone-less
        // (web test) calls.
        let phone = ctx.caller_number.clone().or(phone_backup);

        let booking = self
            .manager
            .create(
                ctx.restaurant_id,
                &name,
                phone.as_deref(),
                party_size,
                &time_str,
                self.manager.now_local(),
            )
            .await?;

        Ok(format!(
            "C'est noté ! Réservation confirmée pour {} personne{} {}.",
            booking.party_size,
            if booking.party_size > 1 { "s" } else { "" },
            temporal::format_local(booking.reserved_at),
        ))
    }
}
