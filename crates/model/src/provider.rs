//! Provider registrations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use orbit_core::{DomainError, DomainResult, Entity, ProviderId, Validate};

/// An external collaborator that executes part of a command's work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: ProviderId,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_code: Option<String>,
    /// Event types the provider subscribes to.
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Provider {
    pub fn new(id: impl Into<ProviderId>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            auth_code: None,
            events: Vec::new(),
            properties: BTreeMap::new(),
        }
    }
}

impl Entity for Provider {
    type Id = ProviderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Validate for Provider {
    fn validate(&self) -> DomainResult<()> {
        if self.id.is_blank() {
            return Err(DomainError::validation("provider id must not be blank"));
        }
        if !(self.url.starts_with("https://") || self.url.starts_with("http://")) {
            return Err(DomainError::validation(format!(
                "provider '{}' url must be absolute http(s)",
                self.id
            )));
        }
        Ok(())
    }
}
