//! Helpers for running requests
use crate::extract::signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use anyhow::{anyhow, Result};
use axum::Router;
use bytes::Bytes;
use ed25519_dalek::{Signer, SigningKey};
use http::{Method, Request, StatusCode, Uri};
use hyper::Body;
use mime::{Mime, APPLICATION_JSON};
use serde::{de::DeserializeOwned, Serialize};
use tower::ServiceExt;

#[derive(Debug)]
pub struct RouteBuilder {
    app: Router,
    method: Method,
    path: Uri,
    body: Option<(Mime, Vec<u8>)>,
    signature: Option<(SigningKey, String)>,
    accept_mime: Option<Mime>,
}

impl RouteBuilder {
    pub fn new<U>(app: Router, method: Method, path: U) -> Self
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        Self {
            app,
            method,
            path: TryFrom::try_from(path).map_err(Into::into).unwrap(),
            body: Default::default(),
            signature: Default::default(),
            accept_mime: Default::default(),
        }
    }

    /// Sign `timestamp || body` and attach the signature headers
    pub fn signed_by(mut self, key: &SigningKey, timestamp: &str) -> Self {
        self.signature = Some((key.clone(), timestamp.to_string()));
        self
    }

    pub fn with_json_body<T>(mut self, body: T) -> Result<Self>
    where
        T: Serialize,
    {
        self.body = Some((APPLICATION_JSON, serde_json::to_vec(&body)?));

        Ok(self)
    }

    pub async fn into_raw_response(mut self) -> Result<(StatusCode, Bytes)> {
        let request = self.build_request()?;
        let response = self.app.oneshot(request).await?;
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await?;

        Ok((status, body))
    }

    pub async fn into_json_response<T>(mut self) -> Result<(StatusCode, T)>
    where
        T: DeserializeOwned,
    {
        self.accept_mime = self.accept_mime.or(Some(APPLICATION_JSON));

        let request = self.build_request()?;
        let response = self.app.oneshot(request).await?;
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await?;
        match serde_json::from_slice::<T>(&body) {
            Ok(body) => Ok((status, body)),
            Err(e) => Err(anyhow!(
                "Couldn't parse {}: {e}",
                String::from_utf8_lossy(&body)
            )),
        }
    }

    fn build_request(&mut self) -> Result<Request<Body>> {
        let mut builder = Request::builder()
            .method(self.method.clone())
            .uri(self.path.clone());

        if let Some(mime) = self.accept_mime.take() {
            builder = builder.header(http::header::ACCEPT, mime.as_ref())
        }

        let (mime, body) = match self.body.take() {
            Some((mime, body)) => (Some(mime), body),
            None => (None, vec![]),
        };

        if let Some((key, timestamp)) = self.signature.take() {
            let message = [timestamp.as_bytes(), &body].concat();
            let signature = hex::encode(key.sign(&message).to_bytes());

            builder = builder
                .header(SIGNATURE_HEADER, signature)
                .header(TIMESTAMP_HEADER, timestamp);
        }

        if let Some(mime) = mime {
            builder = builder.header(http::header::CONTENT_TYPE, mime.as_ref());
        }

        Ok(builder.body(Body::from(body))?)
    }
}
