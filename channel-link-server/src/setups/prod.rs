//! Production server setup code

use crate::{
    db::{self, Pool},
    middleware::client::Logger,
    models::verification_code::VerificationCodeRecord,
    settings,
    setups::{
        AttributeStore, AttributeStoreError, AttributeType, CodeStore, CodeStoreError, ServerSetup,
    },
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use channel_link_core::identity::{Username, VerificationCode};
use diesel_async::RunQueryDsl;
use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use url::Url;
use validator::ValidationErrors;

/// Production implementation of `ServerSetup`.
/// Codes live in postgres, identities in the configured user pool.
#[derive(Clone, Debug, Default)]
pub struct ProdSetup;

impl ServerSetup for ProdSetup {
    type CodeStore = PgCodeStore;
    type AttributeStore = UserPoolAttributeStore;
}

/// A `CodeStore` backed by the `verification_codes` postgres table.
#[derive(Clone)]
pub struct PgCodeStore {
    pool: Pool,
}

impl std::fmt::Debug for PgCodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgCodeStore").finish_non_exhaustive()
    }
}

impl PgCodeStore {
    /// Create a code store using given connection pool
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn connect(&self) -> Result<db::Conn<'_>, CodeStoreError> {
        db::connect(&self.pool)
            .await
            .map_err(CodeStoreError::Unavailable)
    }
}

#[async_trait]
impl CodeStore for PgCodeStore {
    async fn lookup(&self, code: &VerificationCode) -> Result<Username, CodeStoreError> {
        let mut conn = self.connect().await?;

        let record = VerificationCodeRecord::find(&mut conn, code.as_str())
            .await
            .map_err(|e| CodeStoreError::Unavailable(e.into()))?
            .ok_or(CodeStoreError::NotFound)?;

        record.username.parse().map_err(|e: ValidationErrors| {
            CodeStoreError::Unavailable(anyhow!("Stored username is invalid: {e}"))
        })
    }

    async fn delete(&self, code: &VerificationCode) -> Result<(), CodeStoreError> {
        let mut conn = self.connect().await?;

        let consumed = VerificationCodeRecord::consume(&mut conn, code.as_str())
            .await
            .map_err(|e| CodeStoreError::Unavailable(e.into()))?;

        if consumed {
            Ok(())
        } else {
            Err(CodeStoreError::NotFound)
        }
    }

    async fn ping(&self) -> Result<(), CodeStoreError> {
        let mut conn = self.connect().await?;

        diesel::sql_query("SELECT 1")
            .execute(&mut conn)
            .await
            .map_err(|e| CodeStoreError::Unavailable(e.into()))?;

        Ok(())
    }
}

const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const AMZ_JSON: &str = "application/x-amz-json-1.1";
const CUSTOM_PREFIX: &str = "custom:";

/// An `AttributeStore` talking to a user pool admin API via its JSON protocol.
///
/// Requests aren't signed, so the endpoint is expected to be a user pool
/// emulator or a proxy that adds credentials.
#[derive(Clone, Debug)]
pub struct UserPoolAttributeStore {
    client: ClientWithMiddleware,
    endpoint: Url,
    user_pool_id: String,
}

/// Error body returned by the user pool API
#[derive(Clone, Debug, Deserialize)]
struct UserPoolError {
    #[serde(rename = "__type")]
    kind: String,
    #[serde(default, alias = "Message")]
    message: String,
}

impl UserPoolError {
    /// Error types may be namespaced, e.g. `com.amazonaws...#InvalidParameterException`
    fn kind(&self) -> &str {
        self.kind.rsplit('#').next().unwrap_or(&self.kind)
    }

    fn is_schema_missing(&self) -> bool {
        self.kind() == "InvalidParameterException"
            && self.message.contains("does not exist in the schema")
    }

    fn is_already_defined(&self) -> bool {
        self.kind() == "InvalidParameterException" && self.message.contains("already")
    }

    fn is_user_not_found(&self) -> bool {
        self.kind() == "UserNotFoundException"
    }
}

impl UserPoolAttributeStore {
    /// Build a client with logging & transient-error retries as configured.
    pub fn new(settings: &settings::IdentityPool) -> Result<Self> {
        let http = &settings.http_client;
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(
                Duration::from_millis(http.retry_options.bounds_low_ms),
                Duration::from_millis(http.retry_options.bounds_high_ms),
            )
            .build_with_max_retries(http.retry_options.count);

        let client = reqwest::Client::builder()
            .timeout(http.timeout())
            .pool_idle_timeout(http.pool_idle_timeout())
            .build()?;

        let client = ClientBuilder::new(client)
            .with(Logger)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self::new_with(
            client,
            settings.endpoint.clone(),
            settings.user_pool_id.clone(),
        ))
    }

    /// Create an attribute store using given client
    pub fn new_with(client: ClientWithMiddleware, endpoint: Url, user_pool_id: String) -> Self {
        Self {
            client,
            endpoint,
            user_pool_id,
        }
    }

    /// Call an API operation. API-level rejections are returned as `Ok(Some(_))`,
    /// anything that prevented getting an answer as `Err(_)`.
    async fn call(
        &self,
        operation: &str,
        payload: serde_json::Value,
    ) -> Result<Option<UserPoolError>> {
        tracing::debug!(operation, "Calling user pool API");

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{operation}"))
            .header(CONTENT_TYPE, AMZ_JSON)
            .body(serde_json::to_vec(&payload)?)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(None);
        }

        let body = response.bytes().await?;
        match serde_json::from_slice::<UserPoolError>(&body) {
            Ok(err) if status.is_client_error() => Ok(Some(err)),
            Ok(err) => Err(anyhow!("User pool {operation} failed ({status}): {err:?}")),
            Err(_) => Err(anyhow!(
                "User pool {operation} failed ({status}): {}",
                String::from_utf8_lossy(&body)
            )),
        }
    }
}

#[async_trait]
impl AttributeStore for UserPoolAttributeStore {
    async fn set_attribute(
        &self,
        username: &Username,
        attribute: &str,
        value: &str,
    ) -> Result<(), AttributeStoreError> {
        let payload = json!({
            "UserPoolId": self.user_pool_id,
            "Username": username,
            "UserAttributes": [{ "Name": attribute, "Value": value }],
        });

        match self
            .call("AdminUpdateUserAttributes", payload)
            .await
            .map_err(AttributeStoreError::Unavailable)?
        {
            None => Ok(()),
            Some(err) if err.is_schema_missing() => Err(AttributeStoreError::SchemaMissing {
                attribute: attribute.to_string(),
            }),
            Some(err) if err.is_user_not_found() => Err(AttributeStoreError::IdentityNotFound {
                username: username.clone(),
            }),
            Some(err) => Err(AttributeStoreError::Unavailable(anyhow!(
                "User pool rejected attribute update: {err:?}"
            ))),
        }
    }

    async fn define_attribute(
        &self,
        attribute: &str,
        attribute_type: AttributeType,
    ) -> Result<(), AttributeStoreError> {
        // The API adds the prefix on its own
        let name = attribute.strip_prefix(CUSTOM_PREFIX).unwrap_or(attribute);

        let payload = json!({
            "UserPoolId": self.user_pool_id,
            "CustomAttributes": [{
                "Name": name,
                "AttributeDataType": attribute_type.as_str(),
                "Mutable": true,
            }],
        });

        match self
            .call("AddCustomAttributes", payload)
            .await
            .map_err(AttributeStoreError::Unavailable)?
        {
            None => Ok(()),
            Some(err) if err.is_already_defined() => Err(AttributeStoreError::AlreadyDefined {
                attribute: attribute.to_string(),
            }),
            Some(err) => Err(AttributeStoreError::Unavailable(anyhow!(
                "User pool rejected attribute definition: {err:?}"
            ))),
        }
    }
}
