//! SMS delivery tool.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use super::{McpTool, ToolContext};
use crate::error::{ToolError, ToolResult};
use crate::models::SendTextInput;

/// Digits with an optional leading `+`, 7-15 digits total (E.164 ceiling).
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("valid phone regex"));

/// TextBelt rejects bodies past the long-SMS concatenation limit.
const MAX_MESSAGE_LEN: usize = 1600;

/// SMS sending tool.
pub struct SendTextTool;

#[async_trait::async_trait]
impl McpTool for SendTextTool {
    fn name(&self) -> &'static str {
        "send_text"
    }

    fn description(&self) -> &'static str {
        "Send a text message to a phone number via the TextBelt API. \
         The free tier allows 1 message per day per phone number."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "phone": {
                    "type": "string",
                    "description": "Phone number (e.g., 5551234567)"
                },
                "message": {
                    "type": "string",
                    "description": "Text message to send"
                }
            },
            "required": ["phone", "message"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let params: SendTextInput = serde_json::from_value(input)?;

        if !PHONE_RE.is_match(&params.phone) {
            return Err(ToolError::validation(
                "phone",
                "must be 7-15 digits with an optional leading '+'",
            ));
        }
        if params.message.is_empty() {
            return Err(ToolError::validation("message", "cannot be empty"));
        }
        if params.message.len() > MAX_MESSAGE_LEN {
            return Err(ToolError::validation(
                "message",
                format!("cannot exceed {MAX_MESSAGE_LEN} characters"),
            ));
        }

        tracing::info!(phone = %mask_phone(&params.phone), "Sending SMS");

        let outcome = ctx.sms.send_text(&params.phone, &params.message).await?;

        // Delivery rejections are tool output, not protocol errors
        if outcome.success {
            let mut status = format!("Text sent to {}", params.phone);
            if let Some(quota) = outcome.quota_remaining {
                status.push_str(&format!(" (quota remaining: {quota})"));
            }
            tracing::info!(phone = %mask_phone(&params.phone), "SMS accepted");
            Ok(status)
        } else {
            let message = format!("Failed: {}", outcome.error_or_default());
            tracing::warn!(phone = %mask_phone(&params.phone), error = %outcome.error_or_default(), "SMS rejected");
            Ok(message)
        }
    }
}

/// Mask a phone number for logs, keeping the first and last 3 characters.
fn mask_phone(phone: &str) -> String {
    if phone.len() <= 6 {
        return "***".to_string();
    }
    format!("{}***{}", &phone[..3], &phone[phone.len() - 3..])
}
