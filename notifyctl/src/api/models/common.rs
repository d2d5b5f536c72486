//! Enumerations shared by several resources.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// A messaging medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "channel", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Whatsapp,
    Rcs,
    Email,
    Voicebot,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Sms => "sms",
            Channel::Whatsapp => "whatsapp",
            Channel::Rcs => "rcs",
            Channel::Email => "email",
            Channel::Voicebot => "voicebot",
        };
        f.write_str(name)
    }
}

/// Active/inactive status used by plans, resellers and vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "record_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Inactive,
}

/// Body of responses that only confirm an action.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_wire_names() {
        let channels: Vec<Channel> = serde_json::from_str(r#"["sms","whatsapp","rcs","email","voicebot"]"#).unwrap();
        let names: Vec<String> = channels.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["sms", "whatsapp", "rcs", "email", "voicebot"]);
        assert!(serde_json::from_str::<Channel>("\"fax\"").is_err());
    }
}
