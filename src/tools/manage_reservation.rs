//! Reservation management tool: update or cancel an existing booking.

use std::sync::Arc;

use async_trait::async_trait;

use crate::reservations::{
    Applied, FindOutcome, ManageAction, ReservationError, ReservationManager,
};
use crate::temporal;
use crate::tools::tool::{opt_str_arg, party_size_arg, str_arg, Tool, ToolContext, ToolError};

/// Finds the customer's confirmed reservation by name (phone as the only
/// disambiguation signal) and applies a cancel or an update to it.
pub struct ManageReservationTool {
    manager: Arc<ReservationManager>,
}

impl ManageReservationTool {
    pub fn new(manager: Arc<ReservationManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Tool for ManageReservationTool {
    fn name(&self) -> &str {
        "manage_reservation"
    }

    fn description(&self) -> &str {
        "Modifier ou annuler une réservation existante, retrouvée par le nom du client."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Nom sous lequel la réservation a été prise"
                },
                "phone": {
                    "type": "string",
                    "description": "Numéro de téléphone du client, si plusieurs réservations portent ce nom"
                },
                "action": {
                    "type": "string",
                    "enum": ["cancel", "update"],
                    "description": "Annuler ou modifier la réservation"
                },
                "new_size": {
                    "type": "integer",
                    "description": "Nouveau nombre de personnes"
                },
                "new_time": {
                    "type": "string",
                    "description": "Nouvelle date et heure, telles que dites par le client"
                }
            },
            "required": ["name", "action"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<String, ToolError> {
        let name = str_arg(&params, "name")?;
        let phone = opt_str_arg(&params, "phone");
        let action: ManageAction = match str_arg(&params, "action")?.as_str() {
            "cancel" => ManageAction::Cancel,
            "update" => ManageAction::Update,
            other => {
                return Err(ToolError::InvalidParameters(format!(
                    "unknown action: {other}"
                )));
            }
        };
        let new_size = party_size_arg(&params, "new_size")?;
        let new_time = opt_str_arg(&params, "new_time");

        let target = match self
            .manager
            .find_active(ctx.restaurant_id, &name, phone.as_deref())
            .await?
        {
            FindOutcome::Unique(reservation) => reservation,
            FindOutcome::NotFound => return Err(ReservationError::NotFound.into()),
            FindOutcome::Ambiguous => return Err(ReservationError::Ambiguous.into()),
        };

        let applied = self
            .manager
            .apply_action(
                &target,
                action,
                new_size,
                new_time.as_deref(),
                self.manager.now_local(),
            )
            .await?;

        Ok(match applied {
            Applied::Cancelled => "Votre réservation est annulée. À bientôt !".to_string(),
            Applied::Updated {
                party_size,
                reserved_at,
            } => {
                let mut changes = Vec::new();
                if let Some(size) = party_size {
                    changes.push(format!("pour {size} personne{}", if size > 1 { "s" } else { "" }));
                }
                if let Some(at) = reserved_at {
                    changes.push(temporal::format_local(at));
                }
                format!("C'est modifié ! Votre réservation est maintenant {}.", changes.join(", "))
            }
        })
    }
}
