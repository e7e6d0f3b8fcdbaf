use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

/// Identity and roles of an authenticated caller as reported by the
/// external user service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolesResponse {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Public display data for a user, used to enrich reservation views.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// HTTP client for the external user service. Roles and public profiles
/// are cached in-process; role cache entries are evicted when the user
/// service rejects the token.
pub struct UserServiceClient {
    http: reqwest::Client,
    base_url: String,
    roles_cache: Mutex<HashMap<String, RolesResponse>>,
    profile_cache: Mutex<HashMap<String, PublicProfile>>,
}

const MAX_ROLE_FETCH_RETRIES: u32 = 2;

impl UserServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build user service HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            roles_cache: Mutex::new(HashMap::new()),
            profile_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Resolve the caller's identity and roles from the bearer header,
    /// retrying transient failures but never auth rejections.
    pub async fn my_roles(&self, bearer: &str) -> AppResult<RolesResponse> {
        if bearer.trim().is_empty() {
            return Err(AppError::Authentication(
                "Authorization header is required".to_string(),
            ));
        }

        if let Some(cached) = self.roles_cache.lock().unwrap().get(bearer) {
            debug!("roles cache HIT");
            return Ok(cached.clone());
        }
        debug!("roles cache MISS");

        let url = format!("{}/api-user/my-roles", self.base_url);
        let mut attempt = 0;
        loop {
            let response = self
                .http
                .get(&url)
                .header(AUTHORIZATION, bearer)
                .send()
                .await;

            match response {
                Ok(res) if res.status().is_success() => {
                    let roles: RolesResponse = res.json().await.map_err(|e| {
                        AppError::ServiceUnavailable(format!(
                            "invalid roles response from user service: {e}"
                        ))
                    })?;
                    let roles = normalize(roles);
                    self.roles_cache
                        .lock()
                        .unwrap()
                        .insert(bearer.to_string(), roles.clone());
                    return Ok(roles);
                }
                Ok(res) if res.status() == StatusCode::UNAUTHORIZED => {
                    self.evict_roles(bearer);
                    return Err(AppError::Authentication(
                        "user service rejected the token".to_string(),
                    ));
                }
                Ok(res) if res.status() == StatusCode::FORBIDDEN => {
                    self.evict_roles(bearer);
                    return Err(AppError::Forbidden(
                        "user service denied access".to_string(),
                    ));
                }
                Ok(res) if attempt >= MAX_ROLE_FETCH_RETRIES => {
                    return Err(AppError::ServiceUnavailable(format!(
                        "user service returned {}",
                        res.status()
                    )));
                }
                Err(e) if attempt >= MAX_ROLE_FETCH_RETRIES => {
                    return Err(AppError::ServiceUnavailable(format!(
                        "user service unreachable: {e}"
                    )));
                }
                _ => {}
            }

            attempt += 1;
            tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
        }
    }

    /// Cached public-profile lookup by id. Failures degrade to `None`; the
    /// view assembler falls back to generic display names.
    pub async fn public_profile(&self, id: &str) -> Option<PublicProfile> {
        if let Some(cached) = self.profile_cache.lock().unwrap().get(id) {
            return Some(cached.clone());
        }

        let url = format!("{}/api-user/public/profile", self.base_url);
        let response = self.http.get(&url).query(&[("id", id)]).send().await;

        match response {
            Ok(res) if res.status().is_success() => match res.json::<PublicProfile>().await {
                Ok(profile) => {
                    self.profile_cache
                        .lock()
                        .unwrap()
                        .insert(id.to_string(), profile.clone());
                    Some(profile)
                }
                Err(e) => {
                    warn!("invalid public profile response for {id}: {e}");
                    None
                }
            },
            Ok(res) => {
                warn!("public profile lookup for {id} returned {}", res.status());
                None
            }
            Err(e) => {
                warn!("public profile lookup for {id} failed: {e}");
                None
            }
        }
    }

    fn evict_roles(&self, bearer: &str) {
        self.roles_cache.lock().unwrap().remove(bearer);
    }
}

fn normalize(mut roles: RolesResponse) -> RolesResponse {
    for role in &mut roles.roles {
        *role = role.to_uppercase();
    }
    roles
}
