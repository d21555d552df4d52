use serde::Serialize;
use std::collections::BTreeMap;

/// Value of the `type` data field attached to every dispatched notification
pub const CUSTOM_NOTIFICATION_TYPE: &str = "custom_notification";

/// Visible notification content plus auxiliary key/value data delivered alongside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

impl PushPayload {
    pub fn custom(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: BTreeMap::from([("type".to_string(), CUSTOM_NOTIFICATION_TYPE.to_string())]),
        }
    }
}
