//! Helpers for running isolated webserver instances
use crate::{
    app_state::{AppState, AppStateBuilder},
    extract::signature::InteractionKey,
    router::setup_app_router,
    setups::test::{TestAttributeStore, TestCodeStore, TestSetup},
};
use anyhow::Result;
use axum::Router;
use ed25519_dalek::SigningKey;

/// The attribute channel bindings are stored in during tests
pub const CHANNEL_ATTRIBUTE: &str = "custom:channel_id";

/// A reference to a server instance backed by in-memory stores
#[derive(Debug)]
pub struct TestContext {
    app: Router,
    app_state: AppState<TestSetup>,
    signing_key: SigningKey,
}

impl TestContext {
    /// Create a new test context with the channel attribute already declared
    pub fn new() -> Result<Self> {
        Self::new_with_state(|builder| builder)
    }

    pub fn new_with_state<F>(f: F) -> Result<Self>
    where
        F: FnOnce(AppStateBuilder<TestSetup>) -> AppStateBuilder<TestSetup>,
    {
        let signing_key = SigningKey::from_bytes(&[7u8; 32]);

        let builder = AppStateBuilder::default()
            .with_code_store(TestCodeStore::default())
            .with_attribute_store(TestAttributeStore::default().with_schema(CHANNEL_ATTRIBUTE))
            .with_channel_attribute(CHANNEL_ATTRIBUTE)
            .with_interaction_key(InteractionKey::new(signing_key.verifying_key()));

        let app_state = f(builder).finalize()?;

        let app = setup_app_router(app_state.clone());

        Ok(Self {
            app,
            app_state,
            signing_key,
        })
    }

    pub fn app(&self) -> Router {
        self.app.clone()
    }

    pub fn code_store(&self) -> &TestCodeStore {
        self.app_state.redemptions.code_store()
    }

    pub fn attribute_store(&self) -> &TestAttributeStore {
        self.app_state.redemptions.attribute_store()
    }

    /// The key the platform would sign interactions with
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}
