//! The Axum Application State

use crate::{
    extract::signature::InteractionKey,
    redemption::RedemptionService,
    setups::ServerSetup,
};
use anyhow::{anyhow, Result};
use axum::extract::FromRef;

/// The redemption service as configured by a setup
pub type Redemptions<S> =
    RedemptionService<<S as ServerSetup>::CodeStore, <S as ServerSetup>::AttributeStore>;

#[derive(Clone)]
/// Global application route state.
pub struct AppState<S: ServerSetup> {
    /// Redeems verification codes against the setup's stores
    pub redemptions: Redemptions<S>,
    /// The key interactions need to be signed with
    pub interaction_key: InteractionKey,
}

impl<S: ServerSetup> FromRef<AppState<S>> for InteractionKey {
    fn from_ref(state: &AppState<S>) -> Self {
        state.interaction_key
    }
}

/// Builder for [`AppState`]
#[derive(Debug)]
pub struct AppStateBuilder<S: ServerSetup> {
    code_store: Option<S::CodeStore>,
    attribute_store: Option<S::AttributeStore>,
    channel_attribute: Option<String>,
    interaction_key: Option<InteractionKey>,
}

impl<S: ServerSetup> Default for AppStateBuilder<S> {
    fn default() -> Self {
        Self {
            code_store: None,
            attribute_store: None,
            channel_attribute: None,
            interaction_key: None,
        }
    }
}

impl<S: ServerSetup> AppStateBuilder<S> {
    /// Finalize the builder and return the [`AppState`]
    pub fn finalize(self) -> Result<AppState<S>> {
        let code_store = self
            .code_store
            .ok_or_else(|| anyhow!("code_store is required"))?;

        let attribute_store = self
            .attribute_store
            .ok_or_else(|| anyhow!("attribute_store is required"))?;

        let channel_attribute = self
            .channel_attribute
            .ok_or_else(|| anyhow!("channel_attribute is required"))?;

        let interaction_key = self
            .interaction_key
            .ok_or_else(|| anyhow!("interaction_key is required"))?;

        Ok(AppState {
            redemptions: RedemptionService::new(code_store, attribute_store, channel_attribute),
            interaction_key,
        })
    }

    /// Set the store verification codes are looked up in
    pub fn with_code_store(mut self, code_store: S::CodeStore) -> Self {
        self.code_store = Some(code_store);
        self
    }

    /// Set the store channel bindings are written to
    pub fn with_attribute_store(mut self, attribute_store: S::AttributeStore) -> Self {
        self.attribute_store = Some(attribute_store);
        self
    }

    /// Set the name of the profile attribute holding the channel binding
    pub fn with_channel_attribute(mut self, channel_attribute: impl Into<String>) -> Self {
        self.channel_attribute = Some(channel_attribute.into());
        self
    }

    /// Set the key interactions are verified with
    pub fn with_interaction_key(mut self, interaction_key: InteractionKey) -> Self {
        self.interaction_key = Some(interaction_key);
        self
    }
}

impl<S> std::fmt::Debug for AppState<S>
where
    S: ServerSetup,
    S::CodeStore: std::fmt::Debug,
    S::AttributeStore: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("redemptions", &self.redemptions)
            .field("interaction_key", &self.interaction_key)
            .finish()
    }
}
