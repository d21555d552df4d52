use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

pub const NO_TOKENS_MESSAGE: &str = "No tokens found for these users.";

/// Aggregate outcome of one dispatch.
///
/// `success == false` without an error means none of the addressed users had a device
/// token, in which case the transport was not contacted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub success: bool,
    /// Number of distinct tokens handed to the transport
    pub delivered_token_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Raw transport result, forwarded unchanged
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub response: Option<Value>,
}

impl DispatchResult {
    pub fn no_recipients() -> Self {
        Self {
            success: false,
            delivered_token_count: 0,
            message: Some(NO_TOKENS_MESSAGE.to_string()),
            response: None,
        }
    }

    pub fn delivered(delivered_token_count: usize, response: Value) -> Self {
        Self {
            success: true,
            delivered_token_count,
            message: None,
            response: Some(response),
        }
    }
}
