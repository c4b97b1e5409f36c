use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use petcare_common::{Principal, Profile};
use reqwest::Url;
use serde_json::{json, Map, Value};

use crate::identity::{Credential, Document, Filter, IdentityError, IdentityProvider};

/// In-memory identity provider with call counters and scripted failures.
///
/// Principals are keyed by the credential token (cookie value or JWT).
/// Documents of every collection share one store.
#[derive(Default)]
pub struct FakeIdentityProvider {
    principals: Mutex<HashMap<String, Principal>>,
    documents: Mutex<Vec<Document>>,
    session_failures: Mutex<VecDeque<IdentityError>>,
    find_failures: Mutex<VecDeque<IdentityError>>,
    session_calls: AtomicUsize,
    find_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

impl FakeIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_principal(&self, token: &str, principal: Principal) {
        self.principals.lock().unwrap().insert(token.to_string(), principal);
    }

    /// Seed a profile document. Returns its id.
    pub fn insert_profile(&self, account_id: &str, role: &str, status: &[&str], avatar: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let fields = json!({
            "accountId": account_id,
            "email": format!("{}@x.com", account_id),
            "name": account_id,
            "avatar": avatar,
            "role": role,
            "status": status,
        });
        self.documents.lock().unwrap().push(Document {
            id: id.clone(),
            fields: fields.as_object().cloned().unwrap_or_default(),
        });
        id
    }

    /// Queue an error for the next `current_session` call.
    pub fn fail_session_with(&self, error: IdentityError) {
        self.session_failures.lock().unwrap().push_back(error);
    }

    /// Queue an error for the next `find_documents` call.
    pub fn fail_find_with(&self, error: IdentityError) {
        self.find_failures.lock().unwrap().push_back(error);
    }

    pub fn profiles(&self) -> Vec<Profile> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .filter_map(|d| d.into_record().ok())
            .collect()
    }

    pub fn session_calls(&self) -> usize {
        self.session_calls.load(Ordering::SeqCst)
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn current_session(&self, credential: &Credential) -> Result<Principal, IdentityError> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.session_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let token = match credential {
            Credential::Cookie(token) | Credential::Jwt(token) => token,
            Credential::Anonymous => return Err(IdentityError::NoSession),
        };
        self.principals
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or(IdentityError::NoSession)
    }

    async fn find_documents(
        &self,
        _collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, IdentityError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.find_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter(|d| filters.iter().all(|f| f.matches(&d.fields)))
            .cloned()
            .collect())
    }

    async fn create_document(
        &self,
        _collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, IdentityError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let document = Document {
            id: id.to_string(),
            fields,
        };
        self.documents.lock().unwrap().push(document.clone());
        Ok(document)
    }

    async fn update_document(
        &self,
        _collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, IdentityError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut documents = self.documents.lock().unwrap();
        let document = documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| IdentityError::NotFound(format!("document {}", id)))?;
        document.fields.extend(fields);
        Ok(document.clone())
    }

    fn oauth_redirect_url(
        &self,
        provider: &str,
        success_url: &str,
        failure_url: &str,
        scopes: &[&str],
    ) -> Result<Url, IdentityError> {
        let mut params = vec![("success", success_url), ("failure", failure_url)];
        params.extend(scopes.iter().map(|scope| ("scopes[]", *scope)));
        Url::parse_with_params(&format!("https://identity.test/oauth2/{}", provider), &params)
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))
    }
}
