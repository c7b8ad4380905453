//! Identity collaborator
//!
//! Resolves an opaque bearer token to a user id. The engine never
//! authenticates — everything past this seam deals in `Uuid` actors only.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::Result;
use crate::store::Store;

/// Token -> user resolution backed either by the api_tokens table or, in
/// tests, by a fixed map.
#[derive(Clone)]
pub enum Identity {
    Tokens(Store),
    Static(HashMap<String, Uuid>),
}

impl Identity {
    pub async fn resolve(&self, token: &str) -> Result<Option<Uuid>> {
        match self {
            Identity::Tokens(store) => store.resolve_token(token).await,
            Identity::Static(map) => Ok(map.get(token).copied()),
        }
    }
}
