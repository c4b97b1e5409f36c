//! Typed access to the profile collection.

use std::sync::Arc;

use petcare_common::{status, Principal, Profile, DEFAULT_ROLE};
use serde_json::{json, Map, Value};

use crate::identity::{Filter, IdentityError, IdentityProvider};

/// Profile documents stored through the identity provider.
#[derive(Clone)]
pub struct ProfileStore {
    provider: Arc<dyn IdentityProvider>,
    collection: String,
}

impl ProfileStore {
    pub fn new(provider: Arc<dyn IdentityProvider>, collection: &str) -> Self {
        Self {
            provider,
            collection: collection.to_string(),
        }
    }

    /// Find the profile owned by a principal. The first match wins.
    pub async fn find_by_account(&self, account_id: &str) -> Result<Option<Profile>, IdentityError> {
        let documents = self
            .provider
            .find_documents(&self.collection, &[Filter::equal("accountId", account_id)])
            .await?;

        if documents.len() > 1 {
            tracing::warn!("{} profiles found for account {}", documents.len(), account_id);
        }

        documents.into_iter().next().map(|d| d.into_record()).transpose()
    }

    /// Create the first profile of a principal.
    pub async fn create(&self, principal: &Principal, avatar: &str) -> Result<Profile, IdentityError> {
        let id = uuid::Uuid::new_v4().to_string();
        let fields = object(json!({
            "accountId": principal.id,
            "email": principal.email,
            "name": principal.name,
            "avatar": avatar,
            "role": DEFAULT_ROLE,
            "status": [status::ACTIVE],
        }));

        let document = self.provider.create_document(&self.collection, &id, fields).await?;
        tracing::info!("Created profile {} for account {}", document.id, principal.id);
        document.into_record()
    }

    pub async fn update_avatar(&self, profile_id: &str, avatar: &str) -> Result<Profile, IdentityError> {
        let fields = object(json!({ "avatar": avatar }));
        self.provider
            .update_document(&self.collection, profile_id, fields)
            .await?
            .into_record()
    }

    /// Replace the status tags of a profile.
    pub async fn set_status(&self, profile_id: &str, tags: &[&str]) -> Result<Profile, IdentityError> {
        let fields = object(json!({ "status": tags }));
        let profile: Profile = self
            .provider
            .update_document(&self.collection, profile_id, fields)
            .await?
            .into_record()?;
        tracing::info!("Profile {} status set to {:?}", profile_id, profile.status);
        Ok(profile)
    }

    /// Profiles awaiting an admin decision.
    pub async fn list_pending(&self) -> Result<Vec<Profile>, IdentityError> {
        let pending_tags = [status::PENDING.to_string(), status::PENDING.to_lowercase()];
        let documents = self
            .provider
            .find_documents(&self.collection, &[Filter::contains("status", pending_tags)])
            .await?;
        let mut pending = Vec::new();
        for document in documents {
            let profile: Profile = document.into_record()?;
            if profile.is_pending() {
                pending.push(profile);
            }
        }
        Ok(pending)
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
