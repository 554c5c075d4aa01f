use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

const MAX_AUTH_AGE_SECS: i64 = 24 * 60 * 60;

/// the payload Telegram's login widget hands back to the client, forwarded
/// to `/auth/register` and `/auth/telegram` verbatim.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramLoginPayload {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    pub auth_date: i64,
    pub hash: String,
}

impl TelegramLoginPayload {
    fn data_check_string(&self) -> String {
        let mut fields: Vec<(&str, String)> = vec![
            ("auth_date", self.auth_date.to_string()),
            ("first_name", self.first_name.clone()),
            ("id", self.id.to_string()),
        ];
        if let Some(last_name) = &self.last_name {
            fields.push(("last_name", last_name.clone()));
        }
        if let Some(username) = &self.username {
            fields.push(("username", username.clone()));
        }
        if let Some(photo_url) = &self.photo_url {
            fields.push(("photo_url", photo_url.clone()));
        }
        fields.sort_by(|a, b| a.0.cmp(b.0));
        fields
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// verifies the Telegram-login HMAC-SHA256 data-check string and the
/// `auth_date` freshness bound.
pub fn verify(bot_token: &str, payload: &TelegramLoginPayload) -> AppResult<()> {
    let secret_key = Sha256::digest(bot_token.as_bytes());
    let mut mac = HmacSha256::new_from_slice(&secret_key)
        .map_err(|_| AppError::Internal("invalid HMAC key length".into()))?;
    mac.update(payload.data_check_string().as_bytes());
    let computed = hex::encode(mac.finalize().into_bytes());

    if computed != payload.hash.to_lowercase() {
        return Err(AppError::Unauthenticated("telegram login hash mismatch".into()));
    }

    let age = Utc::now().timestamp() - payload.auth_date;
    if age > MAX_AUTH_AGE_SECS {
        return Err(AppError::Unauthenticated("telegram login payload expired".into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_payload(bot_token: &str, auth_date: i64) -> TelegramLoginPayload {
        let mut payload = TelegramLoginPayload {
            id: 1001,
            first_name: "Alice".into(),
            last_name: None,
            username: Some("alice".into()),
            photo_url: None,
            auth_date,
            hash: String::new(),
        };
        let secret_key = Sha256::digest(bot_token.as_bytes());
        let mut mac = HmacSha256::new_from_slice(&secret_key).unwrap();
        mac.update(payload.data_check_string().as_bytes());
        payload.hash = hex::encode(mac.finalize().into_bytes());
        payload
    }

    #[test]
    fn accepts_correctly_signed_fresh_payload() {
        let payload = signed_payload("test-token", Utc::now().timestamp());
        assert!(verify("test-token", &payload).is_ok());
    }

    #[test]
    fn rejects_tampered_hash() {
        let mut payload = signed_payload("test-token", Utc::now().timestamp());
        payload.hash = "0".repeat(64);
        assert!(verify("test-token", &payload).is_err());
    }

    #[test]
    fn rejects_stale_auth_date() {
        let payload = signed_payload("test-token", Utc::now().timestamp() - MAX_AUTH_AGE_SECS - 10);
        assert!(verify("test-token", &payload).is_err());
    }
}
