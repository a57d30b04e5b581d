//! System-prompt and assistant-configuration construction for call init.

use crate::db::{MenuItem, Restaurant};
use crate::tools::ToolSchema;
use crate::vapi::{Assistant, AssistantResponse, ModelConfig};

const MODEL_PROVIDER: &str = "openai";
const MODEL_NAME: &str = "gpt-4o";

/// Build the system prompt the model converses with: restaurant identity,
/// the menu of the day, and the conversational rules.
pub fn system_prompt(restaurant: &Restaurant, menu: &[MenuItem]) -> String {
    let menu_text = if menu.is_empty() {
        "(aucun plat disponible aujourd'hui)".to_string()
    } else {
        menu.iter()
            .map(|item| format!("- {} ({}€)", item.name, item.price))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Tu es l'assistant vocal du restaurant {name}.\n\
         Ton rôle est de prendre des réservations et répondre aux questions sur le menu.\n\
         \n\
         MENU ACTUEL DU JOUR :\n\
         {menu_text}\n\
         IMPORTANT : Si un client demande un plat qui n'est pas dans cette liste, dis poliment qu'il est en rupture.\n\
         \n\
         Règles :\n\
         - Sois chaleureux et bref.\n\
         - Pour réserver, demande toujours : Nom, Nombre de personnes, et Heure souhaitée, puis utilise l'outil 'book_table'.\n\
         - Pour modifier ou annuler une réservation existante, utilise l'outil 'manage_reservation'.",
        name = restaurant.name,
    )
}

/// Assistant configuration for a recognized restaurant.
pub fn assistant_config(
    restaurant: &Restaurant,
    menu: &[MenuItem],
    tools: Vec<ToolSchema>,
) -> AssistantResponse {
    AssistantResponse {
        assistant: Assistant {
            first_message: None,
            model: ModelConfig {
                provider: MODEL_PROVIDER.to_string(),
                model: MODEL_NAME.to_string(),
                system_prompt: Some(system_prompt(restaurant, menu)),
                functions: tools,
                messages: Vec::new(),
            },
        },
    }
}

/// Apology configuration when no restaurant owns the called number. The
/// call still gets a well-formed assistant so the conversation can end
/// politely.
pub fn unknown_restaurant() -> AssistantResponse {
    AssistantResponse {
        assistant: Assistant {
            first_message: Some(
                "Désolé, je ne trouve pas le restaurant associé à ce numéro.".to_string(),
            ),
            model: ModelConfig {
                provider: MODEL_PROVIDER.to_string(),
                model: MODEL_NAME.to_string(),
                system_prompt: None,
                functions: Vec::new(),
                messages: Vec::new(),
            },
        },
    }
}
