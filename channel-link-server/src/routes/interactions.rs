//! Messaging platform interactions webhook.

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    extract::signature::VerifiedInteraction,
    metrics::{outcome, record_redemption},
    redemption::{Redemption, RedemptionService},
    setups::{AttributeStore, CodeStore, ServerSetup},
};
use axum::{
    self,
    extract::{Json, State},
    http::StatusCode,
};
use channel_link_core::{
    command::{Command, RedeemCommand},
    common::{InteractionResponse, InteractionType, Reply},
    identity::{ChannelId, VerificationCode},
};

/// POST handler for signed interactions.
///
/// Answers pings and the `verify` command.
#[utoipa::path(
    post,
    path = "/interactions",
    request_body = Interaction,
    params(
        ("x-signature-ed25519" = String, Header, description = "Hex-encoded ed25519 signature of timestamp and body"),
        ("x-signature-timestamp" = String, Header, description = "Timestamp the signature covers"),
    ),
    responses(
        (status = 200, description = "Interaction handled", body=InteractionResponse),
        (status = 400, description = "Unsupported or malformed interaction", body=AppError),
        (status = 401, description = "Missing or invalid signature", body=AppError),
    )
)]
pub async fn post<S: ServerSetup>(
    State(state): State<AppState<S>>,
    VerifiedInteraction(interaction): VerifiedInteraction,
) -> AppResult<Json<InteractionResponse>> {
    match interaction.kind {
        InteractionType::PING => Ok(Json(InteractionResponse::pong())),
        InteractionType::APPLICATION_COMMAND => {
            let reply = match Command::from_interaction(&interaction)? {
                Command::Redeem(command) => redeem(&state.redemptions, command).await?,
                Command::Unknown(name) => {
                    tracing::debug!(%name, "Unknown command");
                    Reply::UnknownCommand(name)
                }
            };

            Ok(Json(reply.into()))
        }
        InteractionType(other) => Err(AppError::new(
            StatusCode::BAD_REQUEST,
            Some(format!("Unsupported interaction type {other}")),
        )),
    }
}

/// Handle a `verify` command, turning the redemption outcome into a reply.
///
/// Only a malformed channel id, which the platform supplies, fails the request.
/// Everything else is answered with a message to the user.
pub async fn redeem<C: CodeStore, A: AttributeStore>(
    redemptions: &RedemptionService<C, A>,
    command: RedeemCommand,
) -> AppResult<Reply> {
    if !command.is_direct_context {
        record_redemption(outcome::REJECTED);
        return Ok(Reply::WrongContext);
    }

    let channel_id: ChannelId = command.channel_id.parse()?;

    let Ok(code) = command.code.parse::<VerificationCode>() else {
        tracing::debug!("Malformed verification code");
        record_redemption(outcome::INVALID);
        return Ok(Reply::InvalidCode);
    };

    let reply = match redemptions.redeem(&code, &channel_id).await {
        Ok(Redemption::RedeemedAs(username)) => {
            record_redemption(outcome::REDEEMED);
            Reply::Connected(username)
        }
        Ok(Redemption::Invalid) => {
            record_redemption(outcome::INVALID);
            Reply::InvalidCode
        }
        Err(err) => {
            let err = anyhow::Error::from(err);
            tracing::error!(%channel_id, "Redemption failed: {err:#}");
            record_redemption(outcome::FAILED);
            Reply::Failed
        }
    };

    Ok(reply)
}
