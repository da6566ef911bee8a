use serde::Serialize;

use crate::auth::repo_types::User;
use crate::validation::{Rule, RuleTable};

pub const REGISTER_RULES: RuleTable = &[
    ("name", &[Rule::Required, Rule::String, Rule::Max(50)]),
    (
        "email",
        &[
            Rule::Required,
            Rule::String,
            Rule::Email,
            Rule::Max(100),
            Rule::Unique { table: "users", column: "email" },
        ],
    ),
    ("password", &[Rule::Required, Rule::String, Rule::Min(6), Rule::Confirmed]),
];

pub const LOGIN_RULES: RuleTable = &[
    ("email", &[Rule::Required, Rule::Email, Rule::Max(100)]),
    ("password", &[Rule::Required, Rule::String]),
];

/// Response returned after registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: &'static str,
    pub data: User,
    pub token: String,
}

/// Response returned after login or refresh.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Seconds until the token expires.
    pub expires_in: i64,
}

impl TokenResponse {
    pub fn bearer(access_token: String, ttl_minutes: i64) -> Self {
        Self {
            access_token,
            token_type: "bearer",
            expires_in: ttl_minutes * 60,
        }
    }
}

/// Plain `{message}` body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_reports_seconds() {
        let json = serde_json::to_value(TokenResponse::bearer("abc".into(), 60)).unwrap();
        assert_eq!(json["token_type"], "bearer");
        assert_eq!(json["expires_in"], 3600);
        assert_eq!(json["access_token"], "abc");
    }
}
