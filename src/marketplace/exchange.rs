//! Token endpoint payloads.
//!
//! Maps the marketplace's token response onto `TokenData` for both the
//! authorization-code grant and the refresh grant.

use crate::credentials::TokenData;
use serde::Deserialize;

/// OAuth token response
#[derive(Deserialize, Debug)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Bundle from an authorization-code exchange.
    pub fn into_token_data(self, created_at: i64) -> TokenData {
        TokenData {
            access_token: self.access_token,
            refresh_token: self.refresh_token.unwrap_or_default(),
            user_id: self.user_id,
            expires_in: self.expires_in,
            scope: self.scope.unwrap_or_default(),
            token_type: self.token_type.unwrap_or_default(),
            created_at,
        }
    }

    /// Bundle from a refresh. Fields the provider omits keep their previous values,
    /// in particular the refresh token when no new one is issued.
    pub fn merge_refresh(self, previous: &TokenData, created_at: i64) -> TokenData {
        TokenData {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .filter(|token| !token.is_empty())
                .unwrap_or_else(|| previous.refresh_token.clone()),
            user_id: self.user_id.or(previous.user_id),
            expires_in: self.expires_in,
            scope: self.scope.unwrap_or_else(|| previous.scope.clone()),
            token_type: self
                .token_type
                .unwrap_or_else(|| previous.token_type.clone()),
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn previous() -> TokenData {
        TokenData {
            access_token: "APP_USR-old".to_string(),
            refresh_token: "TG-old".to_string(),
            user_id: Some(555),
            expires_in: 21_600,
            scope: "offline_access read".to_string(),
            token_type: "bearer".to_string(),
            created_at: 1_000,
        }
    }

    #[test]
    fn test_token_response_deserialization() {
        let json = r#"{
            "access_token": "APP_USR-123",
            "token_type": "bearer",
            "expires_in": 21600,
            "scope": "offline_access read write",
            "user_id": 987654,
            "refresh_token": "TG-456"
        }"#;

        let tokens = serde_json::from_str::<TokenResponse>(json)
            .unwrap()
            .into_token_data(42);

        assert_eq!(tokens.access_token, "APP_USR-123");
        assert_eq!(tokens.refresh_token, "TG-456");
        assert_eq!(tokens.user_id, Some(987654));
        assert_eq!(tokens.expires_in, 21600);
        assert_eq!(tokens.created_at, 42);
    }

    #[test]
    fn test_refresh_keeps_previous_refresh_token() {
        let json = r#"{"access_token": "APP_USR-new", "expires_in": 21600}"#;
        let merged = serde_json::from_str::<TokenResponse>(json)
            .unwrap()
            .merge_refresh(&previous(), 2_000);

        assert_eq!(merged.access_token, "APP_USR-new");
        assert_eq!(merged.refresh_token, "TG-old");
        assert_eq!(merged.user_id, Some(555));
        assert_eq!(merged.scope, "offline_access read");
        assert_eq!(merged.created_at, 2_000);
    }

    #[test]
    fn test_refresh_rotates_refresh_token() {
        let json = r#"{"access_token": "APP_USR-new", "refresh_token": "TG-new", "expires_in": 100, "user_id": 555}"#;
        let merged = serde_json::from_str::<TokenResponse>(json)
            .unwrap()
            .merge_refresh(&previous(), 2_000);

        assert_eq!(merged.refresh_token, "TG-new");
        assert_eq!(merged.expires_in, 100);
    }
}
