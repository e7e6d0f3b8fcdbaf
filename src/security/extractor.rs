use axum::{async_trait, extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};

use crate::app_state::AppState;
use crate::error::AppError;

/// Authenticated caller, resolved through the user service. The engines
/// only ever see the opaque id; role checks happen at the handler edge.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub roles: Vec<String>,
}

impl CurrentUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn require_role(&self, role: &str) -> Result<(), AppError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("role {role} required")))
        }
    }

    pub fn require_any_role(&self, roles: &[&str]) -> Result<(), AppError> {
        if roles.iter().any(|r| self.has_role(r)) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "one of roles {} required",
                roles.join(", ")
            )))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Authentication("missing Authorization header".to_string())
            })?;

        let me = state.users.my_roles(bearer).await?;
        Ok(CurrentUser {
            id: me.id,
            roles: me.roles,
        })
    }
}
