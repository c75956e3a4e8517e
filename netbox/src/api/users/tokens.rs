//! Token API implementation (`/api/users/tokens/`)

use super::super::common::deserialize_null_default;
use super::super::{ApiError, Client};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

const TOKENS_PATH: &str = "/api/users/tokens/";

fn token_path(id: i64) -> String {
    format!("{}{}/", TOKENS_PATH, id)
}

/// Token as returned by the API
#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub id: i64,
    #[serde(default)]
    pub user: Option<UserRef>,
    /// Only returned when the server allows token retrieval, or at creation
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub allowed_ips: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub write_enabled: bool,
    #[serde(default)]
    pub last_used: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub expires: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub description: String,
}

/// The owning user, either nested or as a bare primary key
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Id(i64),
    Nested(NestedUser),
}

impl UserRef {
    pub fn id(&self) -> i64 {
        match self {
            UserRef::Id(id) => *id,
            UserRef::Nested(user) => user.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NestedUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
}

/// Request body for creating and updating tokens
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WritableToken {
    pub user: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub allowed_ips: Vec<String>,
    pub write_enabled: bool,
    pub description: String,
    /// `None` leaves the field out, `Some(None)` clears the expiry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<Option<DateTime<FixedOffset>>>,
}

/// Tokens API for token operations
pub struct TokensApi<'a> {
    client: &'a Client,
}

impl<'a> TokensApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /api/users/tokens/
    pub async fn create(&self, token: &WritableToken) -> Result<Token, ApiError> {
        self.client.post(TOKENS_PATH, token).await
    }

    /// GET /api/users/tokens/{id}/
    pub async fn get(&self, id: i64) -> Result<Token, ApiError> {
        self.client.get(&token_path(id)).await
    }

    /// PUT /api/users/tokens/{id}/
    pub async fn update(&self, id: i64, token: &WritableToken) -> Result<Token, ApiError> {
        self.client.put(&token_path(id), token).await
    }

    /// DELETE /api/users/tokens/{id}/
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.client.delete(&token_path(id)).await
    }
}
