use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::{
    entity::sea_orm_active_enums::UserRole,
    error::ApiError,
    state::AppState,
};

/// Header set by the Telegram Mini App bridge. Presence alone grants read
/// access to the bonus endpoint for first-run sessions; the handshake itself
/// is validated upstream.
pub const TELEGRAM_INIT_HEADER: &str = "x-telegram-init-data";

#[derive(Debug, Clone)]
pub struct SessionUser {
    pub sub: String,
    pub role: UserRole,
    pub specialist_id: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppUser {
    Session(SessionUser),
    /// Request carrying Telegram init data but no session yet.
    Telegram,
    Unauthorized,
}

impl AppUser {
    pub fn sub(&self) -> Result<String, ApiError> {
        match self {
            AppUser::Session(user) => Ok(user.sub.clone()),
            AppUser::Telegram => Err(ApiError::unauthorized(
                "Telegram request does not carry a session",
            )),
            AppUser::Unauthorized => Err(ApiError::unauthorized("Not authenticated")),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            AppUser::Session(SessionUser {
                role: UserRole::Admin,
                ..
            })
        )
    }

    /// Specialist id when the session belongs to a specialist account.
    pub fn specialist_id(&self) -> Option<&str> {
        match self {
            AppUser::Session(SessionUser {
                role: UserRole::Specialist,
                specialist_id,
                ..
            }) => specialist_id.as_deref(),
            _ => None,
        }
    }

    pub fn is_telegram(&self) -> bool {
        matches!(self, AppUser::Telegram)
    }

    /// Same user, or admin.
    pub fn can_access_user(&self, user_id: &str) -> bool {
        match self {
            AppUser::Session(user) => user.role == UserRole::Admin || user.sub == user_id,
            _ => false,
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin access required"))
        }
    }
}

fn parse_role(role: &str) -> UserRole {
    match role.to_uppercase().as_str() {
        "ADMIN" => UserRole::Admin,
        "SPECIALIST" => UserRole::Specialist,
        _ => UserRole::User,
    }
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response<Body>, ApiError> {
    let mut request = request;

    if let Some(auth_header) = request.headers().get(AUTHORIZATION)
        && let Ok(token) = auth_header.to_str()
    {
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
        let claims = state.validate_token(token)?;
        let user = AppUser::Session(SessionUser {
            sub: claims.sub,
            role: parse_role(&claims.role),
            specialist_id: claims.specialist_id,
        });
        request.extensions_mut().insert::<AppUser>(user);
        return Ok(next.run(request).await);
    }

    if request.headers().contains_key(TELEGRAM_INIT_HEADER) {
        request.extensions_mut().insert::<AppUser>(AppUser::Telegram);
        return Ok(next.run(request).await);
    }

    request
        .extensions_mut()
        .insert::<AppUser>(AppUser::Unauthorized);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!(parse_role("admin"), UserRole::Admin);
        assert_eq!(parse_role("SPECIALIST"), UserRole::Specialist);
        assert_eq!(parse_role("user"), UserRole::User);
        assert_eq!(parse_role("something-else"), UserRole::User);
    }

    #[test]
    fn telegram_user_has_no_sub() {
        assert!(AppUser::Telegram.sub().is_err());
        assert!(!AppUser::Telegram.can_access_user("u1"));
        assert!(AppUser::Telegram.is_telegram());
    }

    #[test]
    fn session_user_access_rules() {
        let admin = AppUser::Session(SessionUser {
            sub: "a1".into(),
            role: UserRole::Admin,
            specialist_id: None,
        });
        let user = AppUser::Session(SessionUser {
            sub: "u1".into(),
            role: UserRole::User,
            specialist_id: None,
        });
        assert!(admin.can_access_user("u1"));
        assert!(user.can_access_user("u1"));
        assert!(!user.can_access_user("u2"));
        assert!(user.require_admin().is_err());
    }
}
