//! Server setup for local development & easier integration testing

use super::{
    prod::PgCodeStore, AttributeStore, AttributeStoreError, AttributeType, ServerSetup,
};
use async_trait::async_trait;
use channel_link_core::identity::Username;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;

/// Implementation of `ServerSetup` for local environments.
/// This allows you to run the server against a local postgres
/// without any user pool.
#[derive(Debug, Clone)]
pub struct LocalSetup;

impl ServerSetup for LocalSetup {
    type CodeStore = PgCodeStore;
    type AttributeStore = LocalAttributeStore;
}

/// An `AttributeStore` that keeps attributes in memory and
/// logs every change via tracing.
///
/// It starts out without any declared attributes, so the first
/// redemption goes through the schema definition path.
#[derive(Debug, Clone, Default)]
pub struct LocalAttributeStore {
    schemas: Arc<DashSet<String>>,
    attributes: Arc<DashMap<(Username, String), String>>,
}

impl LocalAttributeStore {
    /// Create an empty attribute store
    pub fn new() -> Self {
        Self::default()
    }

    /// Read back an attribute
    pub fn get_attribute(&self, username: &Username, attribute: &str) -> Option<String> {
        self.attributes
            .get(&(username.clone(), attribute.to_string()))
            .map(|value| value.clone())
    }
}

#[async_trait]
impl AttributeStore for LocalAttributeStore {
    async fn set_attribute(
        &self,
        username: &Username,
        attribute: &str,
        value: &str,
    ) -> Result<(), AttributeStoreError> {
        if !self.schemas.contains(attribute) {
            tracing::info!(attribute, "attribute has no schema (local)");
            return Err(AttributeStoreError::SchemaMissing {
                attribute: attribute.to_string(),
            });
        }

        tracing::info!(%username, attribute, value, "setting attribute (local)");
        self.attributes
            .insert((username.clone(), attribute.to_string()), value.to_string());
        Ok(())
    }

    async fn define_attribute(
        &self,
        attribute: &str,
        attribute_type: AttributeType,
    ) -> Result<(), AttributeStoreError> {
        tracing::info!(attribute, ?attribute_type, "defining attribute (local)");
        if self.schemas.insert(attribute.to_string()) {
            Ok(())
        } else {
            Err(AttributeStoreError::AlreadyDefined {
                attribute: attribute.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use testresult::TestResult;

    #[test_log::test(tokio::test)]
    async fn test_local_store_requires_schema() -> TestResult {
        let store = LocalAttributeStore::new();
        let alice: Username = "alice".parse()?;

        assert_matches!(
            store.set_attribute(&alice, "custom:channel_id", "chan-42").await,
            Err(AttributeStoreError::SchemaMissing { .. })
        );

        store
            .define_attribute("custom:channel_id", AttributeType::String)
            .await?;
        assert_matches!(
            store
                .define_attribute("custom:channel_id", AttributeType::String)
                .await,
            Err(AttributeStoreError::AlreadyDefined { .. })
        );

        store
            .set_attribute(&alice, "custom:channel_id", "chan-42")
            .await?;
        assert_eq!(
            store.get_attribute(&alice, "custom:channel_id").as_deref(),
            Some("chan-42")
        );

        Ok(())
    }
}
