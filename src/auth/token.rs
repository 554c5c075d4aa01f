use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::db::models::{Role, User};
use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenPayload {
    user_id: i32,
    tenant_id: i32,
    role: Role,
    exp: i64,
}

/// resolved auth context attached to the request once the bearer token
/// verifies.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i32,
    pub tenant_id: i32,
    pub role: Role,
}

impl AuthContext {
    pub fn require_mutate(&self) -> AppResult<()> {
        if self.role.can_mutate() {
            Ok(())
        } else {
            Err(AppError::Forbidden("admin or owner role required".into()))
        }
    }

    pub fn require_owner(&self) -> AppResult<()> {
        if self.role == Role::Owner {
            Ok(())
        } else {
            Err(AppError::Forbidden("owner role required".into()))
        }
    }
}

/// constant-time byte comparison, avoiding early-exit timing leaks on the
/// signature check. Hand-rolled rather than a new dependency, matching the
/// teacher's small-helper style (`TelegramRateLimiter`, `hash_content`).
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn sign(signing_key: &[u8], payload_b64: &str) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(signing_key)
        .map_err(|_| AppError::Internal("invalid token signing key".into()))?;
    mac.update(payload_b64.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// issues an opaque `{base64 payload}.{hex hmac}` bearer token. Not a JWT:
/// no alg negotiation, no header — the smallest thing that does the job.
pub fn issue(signing_key: &[u8], user: &User, lifetime_secs: i64) -> AppResult<String> {
    let payload = TokenPayload {
        user_id: user.id,
        tenant_id: user.tenant_id,
        role: user.role,
        exp: Utc::now().timestamp() + lifetime_secs,
    };
    let payload_json = serde_json::to_vec(&payload)?;
    let payload_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(payload_json);
    let signature = sign(signing_key, &payload_b64)?;
    Ok(format!("{payload_b64}.{signature}"))
}

pub fn verify(signing_key: &[u8], token: &str) -> AppResult<AuthContext> {
    let (payload_b64, signature) = token
        .split_once('.')
        .ok_or_else(|| AppError::Unauthenticated("malformed bearer token".into()))?;

    let expected = sign(signing_key, payload_b64)?;
    if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        return Err(AppError::Unauthenticated("bearer token signature mismatch".into()));
    }

    let payload_json = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthenticated("malformed bearer token".into()))?;
    let payload: TokenPayload = serde_json::from_slice(&payload_json)
        .map_err(|_| AppError::Unauthenticated("malformed bearer token".into()))?;

    if payload.exp < Utc::now().timestamp() {
        return Err(AppError::Unauthenticated("bearer token expired".into()));
    }

    Ok(AuthContext {
        user_id: payload.user_id,
        tenant_id: payload.tenant_id,
        role: payload.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc as ChronoUtc;

    fn sample_user() -> User {
        User {
            id: 7,
            tenant_id: 3,
            telegram_id: 1001,
            username: Some("alice".into()),
            first_name: "Alice".into(),
            last_name: None,
            photo_url: None,
            role: Role::Admin,
            is_active: true,
            created_at: ChronoUtc::now(),
            last_login: None,
        }
    }

    #[test]
    fn round_trips_a_freshly_issued_token() {
        let key = b"test-signing-key";
        let user = sample_user();
        let token = issue(key, &user, 3600).unwrap();
        let ctx = verify(key, &token).unwrap();
        assert_eq!(ctx.user_id, user.id);
        assert_eq!(ctx.tenant_id, user.tenant_id);
        assert_eq!(ctx.role, user.role);
    }

    #[test]
    fn rejects_token_signed_with_a_different_key() {
        let user = sample_user();
        let token = issue(b"key-a", &user, 3600).unwrap();
        assert!(verify(b"key-b", &token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let user = sample_user();
        let token = issue(b"test-signing-key", &user, -1).unwrap();
        assert!(verify(b"test-signing-key", &token).is_err());
    }
}
