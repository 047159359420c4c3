//! This abstracts the server's external stores into "setups".
//!
//! This module defines the traits, submodules define test, local & production
//! collections of implementations.
use async_trait::async_trait;
use channel_link_core::identity::{Username, VerificationCode};
use thiserror::Error;

pub mod local;
pub mod prod;

/// This trait groups type parameters to the server's `AppState` struct.
///
/// It captures the setup of the server, distinguishing between e.g.
/// unit testing & production setups.
pub trait ServerSetup: Clone + Send + Sync + 'static {
    /// Which implementation to use for looking up & consuming verification codes
    type CodeStore: CodeStore;
    /// Which implementation to use for writing identity profile attributes
    type AttributeStore: AttributeStore;
}

/// Errors coming out of a [`CodeStore`]
#[derive(Debug, Error)]
pub enum CodeStoreError {
    /// There's no such code (anymore)
    #[error("Verification code not found")]
    NotFound,
    /// The store couldn't be reached or failed otherwise
    #[error("Code store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

/// Durable mapping from verification codes to the identity that owns them.
#[async_trait]
pub trait CodeStore: Clone + Send + Sync + 'static {
    /// Find the identity a code was issued for. Doesn't modify anything.
    async fn lookup(&self, code: &VerificationCode) -> Result<Username, CodeStoreError>;

    /// Delete the code, if it still exists.
    ///
    /// This must be atomic: of two concurrent calls for the same code,
    /// at most one may return `Ok`, the other gets [`CodeStoreError::NotFound`].
    async fn delete(&self, code: &VerificationCode) -> Result<(), CodeStoreError>;

    /// Check whether the store is reachable
    async fn ping(&self) -> Result<(), CodeStoreError> {
        Ok(())
    }
}

/// Declared type of a profile attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    /// Free-form text
    String,
    /// A number
    Number,
}

impl AttributeType {
    /// The type's name in the user pool API
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::String => "String",
            AttributeType::Number => "Number",
        }
    }
}

/// Errors coming out of an [`AttributeStore`]
#[derive(Debug, Error)]
pub enum AttributeStoreError {
    /// The attribute can't be set, since it has no declared schema
    #[error("Attribute {attribute:?} has no schema")]
    SchemaMissing {
        /// The attribute's name
        attribute: String,
    },
    /// The attribute schema to define exists already
    #[error("Attribute {attribute:?} is already defined")]
    AlreadyDefined {
        /// The attribute's name
        attribute: String,
    },
    /// The identity to update doesn't exist
    #[error("Identity {username} not found")]
    IdentityNotFound {
        /// The identity's username
        username: Username,
    },
    /// The store couldn't be reached or failed otherwise
    #[error("Attribute store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

/// Identity profile store with schema-checked attributes.
#[async_trait]
pub trait AttributeStore: Clone + Send + Sync + 'static {
    /// Set a profile attribute of an identity.
    /// Fails with [`AttributeStoreError::SchemaMissing`] if the attribute wasn't declared.
    async fn set_attribute(
        &self,
        username: &Username,
        attribute: &str,
        value: &str,
    ) -> Result<(), AttributeStoreError>;

    /// Declare a profile attribute, so it can be set afterwards.
    /// Fails with [`AttributeStoreError::AlreadyDefined`] if it's declared already.
    async fn define_attribute(
        &self,
        attribute: &str,
        attribute_type: AttributeType,
    ) -> Result<(), AttributeStoreError>;
}
