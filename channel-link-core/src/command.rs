//! Parsing slash commands out of interactions

use crate::common::{CommandData, Interaction};
use thiserror::Error;

/// Name of the command used to redeem a verification code
pub const VERIFY_COMMAND: &str = "verify";

/// Name of the `verify` command's option carrying the code
pub const CODE_OPTION: &str = "code";

/// A command understood by the server
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Redeem a verification code for the current channel
    Redeem(RedeemCommand),
    /// Any other command name
    Unknown(String),
}

/// Request to bind the current channel using a verification code.
///
/// The fields are kept unvalidated here: a malformed code still needs
/// to be answered with a user-visible reply rather than a transport error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedeemCommand {
    /// The code as typed by the user
    pub code: String,
    /// The channel the command was sent from, supplied by the platform
    pub channel_id: String,
    /// Whether the command was sent in a direct message
    pub is_direct_context: bool,
}

/// Errors for interactions that don't carry a usable command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The interaction carries no command data
    #[error("Interaction is missing command data")]
    MissingData,
    /// A required option wasn't supplied
    #[error("Missing option {name:?} for command {command:?}")]
    MissingOption {
        /// The command name
        command: String,
        /// The option that's missing
        name: &'static str,
    },
    /// The platform didn't tell us which channel this came from
    #[error("Interaction is missing a channel id")]
    MissingChannel,
}

impl Command {
    /// Parse the command out of an application command interaction
    pub fn from_interaction(interaction: &Interaction) -> Result<Self, CommandError> {
        let data = interaction.data.as_ref().ok_or(CommandError::MissingData)?;

        if data.name != VERIFY_COMMAND {
            return Ok(Self::Unknown(data.name.clone()));
        }

        let code = option_str(data, CODE_OPTION).ok_or(CommandError::MissingOption {
            command: data.name.clone(),
            name: CODE_OPTION,
        })?;

        let channel_id = interaction
            .channel_id
            .clone()
            .ok_or(CommandError::MissingChannel)?;

        Ok(Self::Redeem(RedeemCommand {
            code,
            channel_id,
            is_direct_context: interaction.guild_id.is_none(),
        }))
    }
}

/// Look up an option by name, falling back to the first option.
/// Numeric values are accepted and turned into their string form.
fn option_str(data: &CommandData, name: &str) -> Option<String> {
    let option = data
        .options
        .iter()
        .find(|option| option.name == name)
        .or_else(|| data.options.first())?;

    match &option.value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
