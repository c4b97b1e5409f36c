//! Identity provider abstraction.
//!
//! The hosted backend owns accounts, sessions and documents. This module
//! defines the `IdentityProvider` trait the sign-in flow talks to, so the
//! flow can run against the real REST client or an in-memory fake.

mod http;

pub use http::HttpIdentityProvider;

use async_trait::async_trait;
use petcare_common::Principal;
use reqwest::Url;
use serde_json::{Map, Value};

use crate::retry::RateLimited;

/// Scopes requested when the provider reports a missing grant.
pub const EXPANDED_SCOPES: [&str; 3] = ["email", "profile", "openid"];

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Insufficient scope: {0}")]
    ScopeInsufficient(String),
    #[error("No active session")]
    NoSession,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("HTTP request failed: {0}")]
    Request(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Provider error {status}: {message}")]
    Provider { status: u16, message: String },
}

impl RateLimited for IdentityError {
    fn is_rate_limited(&self) -> bool {
        matches!(self, IdentityError::RateLimited(_))
    }
}

/// Caller credential forwarded to the provider on session lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Raw value of the provider's session cookie
    Cookie(String),
    /// Short-lived JWT minted by the provider's client SDK
    Jwt(String),
    /// Nothing was presented
    Anonymous,
}

/// A document in a provider collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    /// Deserialize the document into a typed record, merging the id in as `id`.
    pub fn into_record<T: serde::de::DeserializeOwned>(self) -> Result<T, IdentityError> {
        let mut fields = self.fields;
        fields.insert("id".to_string(), Value::String(self.id));
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))
    }
}

/// Document query filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equal { attribute: String, value: Value },
    /// Array attribute holding any of `values`
    Contains { attribute: String, values: Vec<Value> },
}

impl Filter {
    pub fn equal(attribute: &str, value: impl Into<Value>) -> Self {
        Filter::Equal {
            attribute: attribute.to_string(),
            value: value.into(),
        }
    }

    pub fn contains<V: Into<Value>>(attribute: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::Contains {
            attribute: attribute.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Check a document against the filter.
    pub fn matches(&self, fields: &Map<String, Value>) -> bool {
        match self {
            Filter::Equal { attribute, value } => fields.get(attribute) == Some(value),
            Filter::Contains { attribute, values } => match fields.get(attribute) {
                Some(Value::Array(items)) => items.iter().any(|item| values.contains(item)),
                _ => false,
            },
        }
    }
}

/// Contract of the hosted identity/database service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the principal behind the caller's credential.
    async fn current_session(&self, credential: &Credential) -> Result<Principal, IdentityError>;

    /// List documents in a collection matching every filter.
    async fn find_documents(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, IdentityError>;

    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, IdentityError>;

    /// Patch the given fields of an existing document.
    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, IdentityError>;

    /// Build the URL that starts an OAuth login with the given provider.
    fn oauth_redirect_url(
        &self,
        provider: &str,
        success_url: &str,
        failure_url: &str,
        scopes: &[&str],
    ) -> Result<Url, IdentityError>;
}
