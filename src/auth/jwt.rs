use serde::{Deserialize, Serialize};

use jsonwebtoken::{DecodingKey, Validation, decode};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
    #[serde(default)]
    pub department_id: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

/// Tokens are minted by the identity service; tests mint their own.
#[cfg(test)]
pub fn issue_token(role: crate::model::role::Role, token_type: TokenType, secret: &str) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let claims = Claims {
        user_id: 7,
        sub: format!("{:?}", role).to_lowercase(),
        role: role as u8,
        exp: (chrono::Utc::now().timestamp() + 900) as usize,
        jti: uuid::Uuid::new_v4().to_string(),
        token_type,
        employee_id: None,
        department_id: Some(3),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
