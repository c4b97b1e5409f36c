use async_trait::async_trait;
use petcare_common::Principal;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{Credential, Document, Filter, IdentityError, IdentityProvider};
use crate::config::IdentityConfig;

/// REST client for the hosted identity/database service.
pub struct HttpIdentityProvider {
    http_client: Client,
    endpoint: String,
    project_id: String,
    api_key: String,
    database_id: String,
    session_cookie: String,
}

/// Error body returned by the provider.
#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    error_type: String,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    #[serde(rename = "$id")]
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    prefs: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct DocumentListResponse {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    documents: Vec<Map<String, Value>>,
}

/// Documents requested per page when listing a collection.
const PAGE_SIZE: usize = 100;

impl HttpIdentityProvider {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            http_client: Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
            database_id: config.database_id.clone(),
            session_cookie: config.session_cookie_name(),
        }
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.endpoint, self.database_id, collection
        )
    }

    /// Attach project and server key headers for document access.
    fn with_server_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", &self.api_key)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, IdentityError> {
        let response = builder
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status, &body))
    }

    async fn read_document(response: Response) -> Result<Document, IdentityError> {
        let raw: Map<String, Value> = response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))?;
        to_document(raw)
    }
}

/// Map a failed provider response onto the error taxonomy.
fn classify_error(status: StatusCode, body: &str) -> IdentityError {
    let parsed: ProviderErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = if parsed.message.is_empty() {
        body.to_string()
    } else {
        parsed.message
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => IdentityError::RateLimited(message),
        StatusCode::UNAUTHORIZED => {
            if parsed.error_type == "general_unauthorized_scope"
                || message.to_lowercase().contains("missing scope")
            {
                IdentityError::ScopeInsufficient(message)
            } else {
                IdentityError::NoSession
            }
        }
        StatusCode::NOT_FOUND => IdentityError::NotFound(message),
        _ => IdentityError::Provider {
            status: status.as_u16(),
            message,
        },
    }
}

/// Split provider metadata (`$`-prefixed keys) from document fields.
fn to_document(mut raw: Map<String, Value>) -> Result<Document, IdentityError> {
    let id = match raw.remove("$id") {
        Some(Value::String(id)) => id,
        _ => return Err(IdentityError::InvalidResponse("document without $id".to_string())),
    };
    raw.retain(|key, _| !key.starts_with('$'));
    Ok(Document { id, fields: raw })
}

fn encode_filter(filter: &Filter) -> String {
    match filter {
        Filter::Equal { attribute, value } => json!({
            "method": "equal",
            "attribute": attribute,
            "values": [value],
        })
        .to_string(),
        Filter::Contains { attribute, values } => json!({
            "method": "contains",
            "attribute": attribute,
            "values": values,
        })
        .to_string(),
    }
}

fn encode_page(limit: usize, offset: usize) -> [String; 2] {
    [
        json!({ "method": "limit", "values": [limit] }).to_string(),
        json!({ "method": "offset", "values": [offset] }).to_string(),
    ]
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn current_session(&self, credential: &Credential) -> Result<Principal, IdentityError> {
        let url = format!("{}/account", self.endpoint);
        let builder = self
            .http_client
            .get(&url)
            .header("X-Appwrite-Project", &self.project_id);

        let builder = match credential {
            Credential::Cookie(value) => {
                builder.header("Cookie", format!("{}={}", self.session_cookie, value))
            }
            Credential::Jwt(token) => builder.header("X-Appwrite-JWT", token),
            Credential::Anonymous => return Err(IdentityError::NoSession),
        };

        tracing::debug!("Fetching current account from {}", url);

        let account: AccountResponse = self
            .send(builder)
            .await?
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))?;

        let avatar = account
            .prefs
            .get("avatar")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(String::from);

        Ok(Principal {
            id: account.id,
            email: account.email,
            name: account.name,
            avatar,
        })
    }

    async fn find_documents(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, IdentityError> {
        let filters: Vec<String> = filters.iter().map(encode_filter).collect();
        let mut documents = Vec::new();

        // Page until the reported total is reached or a page comes back empty.
        loop {
            let queries: Vec<(&str, String)> = filters
                .iter()
                .cloned()
                .chain(encode_page(PAGE_SIZE, documents.len()))
                .map(|q| ("queries[]", q))
                .collect();

            let builder = self
                .with_server_auth(self.http_client.get(self.documents_url(collection)))
                .query(&queries);

            let page: DocumentListResponse = self
                .send(builder)
                .await?
                .json()
                .await
                .map_err(|e| IdentityError::InvalidResponse(e.to_string()))?;

            let fetched = page.documents.len();
            for raw in page.documents {
                documents.push(to_document(raw)?);
            }

            if fetched == 0 || documents.len() >= page.total {
                break;
            }
            tracing::debug!("Fetched {}/{} documents from {}", documents.len(), page.total, collection);
        }

        Ok(documents)
    }

    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, IdentityError> {
        let builder = self
            .with_server_auth(self.http_client.post(self.documents_url(collection)))
            .json(&json!({ "documentId": id, "data": fields }));

        let response = self.send(builder).await?;
        tracing::debug!("Created document {} in {}", id, collection);
        Self::read_document(response).await
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, IdentityError> {
        let url = format!("{}/{}", self.documents_url(collection), id);
        let builder = self
            .with_server_auth(self.http_client.patch(&url))
            .json(&json!({ "data": fields }));

        let response = self.send(builder).await?;
        tracing::debug!("Updated document {} in {}", id, collection);
        Self::read_document(response).await
    }

    fn oauth_redirect_url(
        &self,
        provider: &str,
        success_url: &str,
        failure_url: &str,
        scopes: &[&str],
    ) -> Result<Url, IdentityError> {
        let base = format!("{}/account/sessions/oauth2/{}", self.endpoint, provider);
        let mut params = vec![
            ("project", self.project_id.as_str()),
            ("success", success_url),
            ("failure", failure_url),
        ];
        params.extend(scopes.iter().map(|scope| ("scopes[]", *scope)));

        Url::parse_with_params(&base, &params)
            .map_err(|e| IdentityError::InvalidResponse(format!("bad OAuth URL: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> HttpIdentityProvider {
        HttpIdentityProvider::new(&crate::test_util::test_config("https://baas.test/v1/").identity)
    }

    #[test]
    fn test_classify_rate_limit() {
        let body = r#"{"message":"Rate limit for the current endpoint has been exceeded.","code":429,"type":"general_rate_limit_exceeded"}"#;
        let err = classify_error(StatusCode::TOO_MANY_REQUESTS, body);
        assert!(matches!(err, IdentityError::RateLimited(ref m) if m.contains("Rate limit")));
    }

    #[test]
    fn test_classify_missing_scope_by_type() {
        let body = r#"{"message":"User (role: guests) missing scope (account)","code":401,"type":"general_unauthorized_scope"}"#;
        let err = classify_error(StatusCode::UNAUTHORIZED, body);
        assert!(matches!(err, IdentityError::ScopeInsufficient(_)));
    }

    #[test]
    fn test_classify_missing_scope_by_message() {
        let body = r#"{"message":"Missing scope: email","code":401,"type":"user_unauthorized"}"#;
        let err = classify_error(StatusCode::UNAUTHORIZED, body);
        assert!(matches!(err, IdentityError::ScopeInsufficient(_)));
    }

    #[test]
    fn test_classify_plain_unauthorized_is_no_session() {
        let body = r#"{"message":"Invalid session","code":401,"type":"user_session_not_found"}"#;
        assert!(matches!(classify_error(StatusCode::UNAUTHORIZED, body), IdentityError::NoSession));
    }

    #[test]
    fn test_classify_non_json_body() {
        let err = classify_error(StatusCode::BAD_GATEWAY, "upstream exploded");
        match err {
            IdentityError::Provider { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_to_document_strips_metadata() {
        let raw = json!({
            "$id": "doc-1",
            "$collectionId": "profiles",
            "$createdAt": "2024-01-01T00:00:00.000+00:00",
            "accountId": "abc",
            "role": "user"
        });
        let doc = to_document(raw.as_object().unwrap().clone()).unwrap();
        assert_eq!(doc.id, "doc-1");
        assert_eq!(doc.fields.len(), 2);
        assert_eq!(doc.fields["accountId"], "abc");
    }

    #[test]
    fn test_to_document_requires_id() {
        let raw = json!({"accountId": "abc"});
        assert!(matches!(
            to_document(raw.as_object().unwrap().clone()),
            Err(IdentityError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_encode_equal_filter() {
        let encoded = encode_filter(&Filter::equal("accountId", "abc"));
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["method"], "equal");
        assert_eq!(value["attribute"], "accountId");
        assert_eq!(value["values"], json!(["abc"]));
    }

    #[test]
    fn test_encode_contains_filter() {
        let encoded = encode_filter(&Filter::contains("status", ["Pending", "pending"]));
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["method"], "contains");
        assert_eq!(value["attribute"], "status");
        assert_eq!(value["values"], json!(["Pending", "pending"]));
    }

    #[test]
    fn test_encode_page() {
        let [limit, offset] = encode_page(100, 25);
        let limit: Value = serde_json::from_str(&limit).unwrap();
        let offset: Value = serde_json::from_str(&offset).unwrap();
        assert_eq!(limit, json!({"method": "limit", "values": [100]}));
        assert_eq!(offset, json!({"method": "offset", "values": [25]}));
    }

    #[test]
    fn test_oauth_redirect_url_with_scopes() {
        let url = provider()
            .oauth_redirect_url(
                "google",
                "https://app.test/auth/callback",
                "https://app.test/login",
                &["email", "profile", "openid"],
            )
            .unwrap();

        assert_eq!(url.path(), "/v1/account/sessions/oauth2/google");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("project".to_string(), "petcare-test".to_string())));
        assert!(pairs.contains(&("success".to_string(), "https://app.test/auth/callback".to_string())));
        assert!(pairs.contains(&("failure".to_string(), "https://app.test/login".to_string())));
        let scopes: Vec<&str> = pairs
            .iter()
            .filter(|(k, _)| k == "scopes[]")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(scopes, vec!["email", "profile", "openid"]);
    }

    #[tokio::test]
    async fn test_anonymous_credential_skips_request() {
        let result = provider().current_session(&Credential::Anonymous).await;
        assert!(matches!(result, Err(IdentityError::NoSession)));
    }
}
