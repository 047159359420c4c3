//! Redeeming verification codes.
//!
//! A redemption looks up who a code was issued for, binds the requesting
//! channel to that identity's profile and then consumes the code.
//! The code is only consumed once the binding is stored, so a failed
//! redemption can simply be retried with the same code.

use crate::setups::{
    AttributeStore, AttributeStoreError, AttributeType, CodeStore, CodeStoreError,
};
use channel_link_core::identity::{ChannelId, Username, VerificationCode};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// The result of a redemption that didn't run into infrastructure errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redemption {
    /// The channel is now bound to this identity & the code is consumed
    RedeemedAs(Username),
    /// The code doesn't exist. Nothing was modified.
    Invalid,
}

/// Unrecovered failures while redeeming a code.
///
/// The code stays redeemable for all of these except [`RedeemError::RaceLost`].
#[derive(Debug, Error)]
pub enum RedeemError {
    /// The code store failed while looking up or deleting the code
    #[error("Code store unavailable")]
    CodeStoreUnavailable(#[source] anyhow::Error),
    /// The attribute store failed, even after defining the attribute schema
    #[error("Couldn't bind channel to identity")]
    AttributeStore(#[from] AttributeStoreError),
    /// Another redemption consumed the code between our lookup & delete
    #[error("Verification code was consumed by a concurrent redemption")]
    RaceLost,
}

/// Orchestrates a [`CodeStore`] and an [`AttributeStore`] to redeem codes.
///
/// Cloning is cheap, as long as the stores are.
#[derive(Debug, Clone)]
pub struct RedemptionService<C, A> {
    codes: C,
    attributes: A,
    channel_attribute: String,
}

impl<C: CodeStore, A: AttributeStore> RedemptionService<C, A> {
    /// Create a redemption service binding channels to `channel_attribute`
    pub fn new(codes: C, attributes: A, channel_attribute: impl Into<String>) -> Self {
        Self {
            codes,
            attributes,
            channel_attribute: channel_attribute.into(),
        }
    }

    /// The store codes are looked up in
    pub fn code_store(&self) -> &C {
        &self.codes
    }

    /// The store channel bindings are written to
    pub fn attribute_store(&self) -> &A {
        &self.attributes
    }

    /// Name of the profile attribute holding the channel binding
    pub fn channel_attribute(&self) -> &str {
        &self.channel_attribute
    }

    /// Redeem `code`, binding `channel_id` to the identity the code was issued for.
    #[instrument(skip_all, fields(channel_id = %channel_id))]
    pub async fn redeem(
        &self,
        code: &VerificationCode,
        channel_id: &ChannelId,
    ) -> Result<Redemption, RedeemError> {
        let username = match self.codes.lookup(code).await {
            Ok(username) => username,
            Err(CodeStoreError::NotFound) => {
                debug!("Verification code not found");
                return Ok(Redemption::Invalid);
            }
            Err(CodeStoreError::Unavailable(e)) => {
                return Err(RedeemError::CodeStoreUnavailable(e));
            }
        };

        debug!(%username, "Found identity for verification code");

        self.bind_channel(&username, channel_id).await?;

        match self.codes.delete(code).await {
            Ok(()) => {}
            Err(CodeStoreError::NotFound) => {
                warn!(%username, "Verification code was consumed concurrently");
                return Err(RedeemError::RaceLost);
            }
            Err(CodeStoreError::Unavailable(e)) => {
                return Err(RedeemError::CodeStoreUnavailable(e));
            }
        }

        info!(%username, "Connected channel to identity");
        Ok(Redemption::RedeemedAs(username))
    }

    /// Set the channel attribute. If the attribute isn't declared yet,
    /// declare it and try exactly once more.
    async fn bind_channel(
        &self,
        username: &Username,
        channel_id: &ChannelId,
    ) -> Result<(), AttributeStoreError> {
        let attribute = self.channel_attribute.as_str();
        let mut defined = false;

        loop {
            match self
                .attributes
                .set_attribute(username, attribute, channel_id.as_str())
                .await
            {
                Ok(()) => return Ok(()),
                Err(AttributeStoreError::SchemaMissing { .. }) if !defined => {
                    info!(attribute, "Channel attribute not declared, defining it");
                    self.define_channel_attribute().await?;
                    defined = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn define_channel_attribute(&self) -> Result<(), AttributeStoreError> {
        match self
            .attributes
            .define_attribute(&self.channel_attribute, AttributeType::String)
            .await
        {
            // Someone else got there first, which is just as good
            Ok(()) | Err(AttributeStoreError::AlreadyDefined { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
