//! Wire types for the voice-AI telephony platform.
//!
//! Payload shapes follow the platform's webhook envelope: tool invocations
//! arrive as `message.functionCall`, the telephony context as `message.call`.
//! Call-init requests carry the called number directly under
//! `message.phone_number`.

use serde::{Deserialize, Serialize};

use crate::tools::ToolSchema;

/// Inbound webhook envelope. Every field is optional on the wire; helpers
/// below flatten the paths the backend actually needs.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub message: WebhookMessage,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookMessage {
    #[serde(rename = "functionCall", default)]
    pub function_call: Option<FunctionCall>,
    #[serde(default)]
    pub call: Option<CallInfo>,
    #[serde(rename = "phone_number", default)]
    pub phone_number: Option<PhoneNumber>,
}

/// A tool invocation issued by the model.
#[derive(Debug, Default, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

/// Telephony context forwarded alongside tool invocations.
#[derive(Debug, Default, Deserialize)]
pub struct CallInfo {
    #[serde(rename = "phone_number", default)]
    pub phone_number: Option<PhoneNumber>,
    #[serde(default)]
    pub customer: Option<Customer>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PhoneNumber {
    #[serde(default)]
    pub number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub number: Option<String>,
}

impl WebhookPayload {
    /// Number the platform was dialed on. Revisions of the platform put it
    /// either at the message top level (call init) or inside the call
    /// context (tool calls); accept both.
    pub fn called_number(&self) -> Option<String> {
        let top = self
            .message
            .phone_number
            .as_ref()
            .and_then(|p| p.number.clone());
        top.or_else(|| {
            self.message
                .call
                .as_ref()
                .and_then(|c| c.phone_number.as_ref())
                .and_then(|p| p.number.clone())
        })
    }

    /// The customer's own number, when the call has a phone leg.
    pub fn caller_number(&self) -> Option<String> {
        self.message
            .call
            .as_ref()
            .and_then(|c| c.customer.as_ref())
            .and_then(|c| c.number.clone())
    }

    /// Arguments the model supplied to the tool.
    pub fn tool_parameters(&self) -> serde_json::Value {
        self.message
            .function_call
            .as_ref()
            .map(|f| f.parameters.clone())
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Body returned from every tool endpoint: prose fed back into the
/// conversation, never a structured error.
#[derive(Debug, Serialize, Deserialize)]
pub struct ToolResult {
    pub result: String,
}

/// Assistant configuration returned from call init.
#[derive(Debug, Serialize)]
pub struct AssistantResponse {
    pub assistant: Assistant,
}

#[derive(Debug, Serialize)]
pub struct Assistant {
    #[serde(rename = "firstMessage", skip_serializing_if = "Option::is_none")]
    pub first_message: Option<String>,
    pub model: ModelConfig,
}

#[derive(Debug, Serialize)]
pub struct ModelConfig {
    pub provider: String,
    pub model: String,
    #[serde(rename = "systemPrompt", skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<ToolSchema>,
    pub messages: Vec<serde_json::Value>,
}
