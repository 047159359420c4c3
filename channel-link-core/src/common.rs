//! Request and response data types exchanged with the messaging platform's
//! interactions webhook, and the replies sent back to users.

use crate::identity::Username;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The kind of an incoming interaction
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, ToSchema)]
#[serde(transparent)]
pub struct InteractionType(pub u8);

impl InteractionType {
    /// A liveness check sent by the platform when registering the endpoint
    pub const PING: Self = Self(1);
    /// A slash command invoked by a user
    pub const APPLICATION_COMMAND: Self = Self(2);
}

/// An interaction delivered to the webhook
#[derive(Deserialize, Serialize, Clone, Debug, ToSchema)]
pub struct Interaction {
    /// Interaction kind
    #[serde(rename = "type")]
    pub kind: InteractionType,
    /// Command payload, present for application commands
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<CommandData>,
    /// The channel the interaction was sent from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// The server ("guild") the interaction was sent from. Absent for direct messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
}

/// The invoked command and its arguments
#[derive(Deserialize, Serialize, Clone, Debug, ToSchema)]
pub struct CommandData {
    /// Name of the invoked command
    pub name: String,
    /// Arguments supplied by the user
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

/// A single named command argument
#[derive(Deserialize, Serialize, Clone, Debug, ToSchema)]
pub struct CommandOption {
    /// Argument name
    pub name: String,
    /// Argument value, as sent by the platform
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
}

/// How the platform should treat an interaction response
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, ToSchema)]
#[serde(transparent)]
pub struct CallbackType(pub u8);

impl CallbackType {
    /// Acknowledge a ping
    pub const PONG: Self = Self(1);
    /// Respond with a message in the channel
    pub const CHANNEL_MESSAGE_WITH_SOURCE: Self = Self(4);
}

/// Response to an interaction
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, ToSchema)]
pub struct InteractionResponse {
    /// Response kind
    #[serde(rename = "type")]
    pub kind: CallbackType,
    /// Message payload, absent for pongs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<MessageData>,
}

/// Message content of an interaction response
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, ToSchema)]
pub struct MessageData {
    /// Text shown to the user
    pub content: String,
}

impl InteractionResponse {
    /// Answer to a [`InteractionType::PING`]
    pub fn pong() -> Self {
        Self {
            kind: CallbackType::PONG,
            data: None,
        }
    }

    /// Answer with a text message
    pub fn message(content: impl ToString) -> Self {
        Self {
            kind: CallbackType::CHANNEL_MESSAGE_WITH_SOURCE,
            data: Some(MessageData {
                content: content.to_string(),
            }),
        }
    }
}

/// The user-visible outcome of a command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// The channel is now bound to the identity
    Connected(Username),
    /// The code doesn't exist (anymore)
    InvalidCode,
    /// The command was sent from a shared channel instead of a direct message
    WrongContext,
    /// The command name isn't known
    UnknownCommand(String),
    /// Something went wrong on our end, the code can be used again
    Failed,
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Connected(username) => write!(
                f,
                "Successfully connected this channel to receive notifications for the tee time searches of {username}"
            ),
            Reply::InvalidCode => write!(f, "Invalid verification code"),
            Reply::WrongContext => write!(f, "This command cannot be used in a server"),
            Reply::UnknownCommand(name) => write!(f, "Unknown command: {name}"),
            Reply::Failed => write!(
                f,
                "Something went wrong while verifying your code, please try again later"
            ),
        }
    }
}

impl From<Reply> for InteractionResponse {
    fn from(reply: Reply) -> Self {
        InteractionResponse::message(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use testresult::TestResult;

    #[test]
    fn test_parse_ping() -> TestResult {
        let interaction: Interaction = serde_json::from_value(json!({ "type": 1 }))?;
        assert_eq!(interaction.kind, InteractionType::PING);
        assert!(interaction.data.is_none());
        Ok(())
    }

    #[test]
    fn test_parse_command_ignores_unknown_fields() -> TestResult {
        let interaction: Interaction = serde_json::from_value(json!({
            "type": 2,
            "id": "786008729715212338",
            "channel_id": "645027906669510667",
            "data": {
                "id": "771825006014889984",
                "name": "verify",
                "options": [{ "name": "code", "type": 3, "value": "ABC123" }]
            }
        }))?;

        assert_eq!(interaction.kind, InteractionType::APPLICATION_COMMAND);
        assert_eq!(interaction.channel_id.as_deref(), Some("645027906669510667"));
        assert_eq!(interaction.guild_id, None);

        let data = interaction.data.unwrap();
        assert_eq!(data.name, "verify");
        assert_eq!(data.options[0].value, json!("ABC123"));
        Ok(())
    }

    #[test]
    fn test_serialize_responses() -> TestResult {
        assert_eq!(
            serde_json::to_value(InteractionResponse::pong())?,
            json!({ "type": 1 })
        );
        assert_eq!(
            serde_json::to_value(InteractionResponse::from(Reply::InvalidCode))?,
            json!({ "type": 4, "data": { "content": "Invalid verification code" } })
        );
        Ok(())
    }

    #[test]
    fn test_connected_reply_names_user() -> TestResult {
        let reply = Reply::Connected("alice".parse()?);
        assert!(reply.to_string().ends_with("tee time searches of alice"));
        Ok(())
    }
}
