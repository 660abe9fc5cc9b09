//! Identity context for history access
//!
//! Provides:
//! - Account registration and login with Argon2id password hashes
//! - JWT issuance and verification
//! - Resolution of an `Authorization` header into the caller's [`OwnerId`]

pub mod jwt;
pub mod password;
pub mod users;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::history::OwnerId;
use crate::services::input::required_text;
use crate::types::{PolicyError, Result};

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenValidationResult};
pub use password::{hash_password, verify_password, MIN_PASSWORD_LEN};
pub use users::{MemoryUserStore, MongoUserStore, UserAccount, UserStore};

/// Generic login failure, the same for unknown users and wrong passwords
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Credenciales inválidas";

pub const REGISTERED_MESSAGE: &str = "Usuario registrado con éxito";

const USERNAME_FIELD: &str = "username";
const PASSWORD_FIELD: &str = "password";

/// Username and password from a register or login body
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn from_raw(raw: &Value) -> Result<Self> {
        let values = required_text(raw, &[USERNAME_FIELD, PASSWORD_FIELD])?;
        Ok(Self {
            username: values[0].trim().to_string(),
            password: values[1].to_string(),
        })
    }
}

/// Issued session
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub username: String,
}

/// Create an account from a raw register body
pub async fn register(users: &dyn UserStore, raw: &Value) -> Result<UserAccount> {
    let credentials = Credentials::from_raw(raw)?;

    if credentials.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PolicyError::BadRequest(format!(
            "La contraseña debe tener al menos {} caracteres",
            MIN_PASSWORD_LEN
        )));
    }

    let password_hash = hash_password(&credentials.password)?;
    let account = users.create(&credentials.username, password_hash).await?;

    info!(username = %account.username, "Registration successful");
    Ok(account)
}

/// Check credentials from a raw login body and issue a token
pub async fn login(users: &dyn UserStore, jwt: &JwtValidator, raw: &Value) -> Result<Session> {
    let credentials = Credentials::from_raw(raw)?;
    let invalid = || PolicyError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string());

    let Some(account) = users.find_by_username(&credentials.username).await? else {
        warn!(username = %credentials.username, "Login failed - user not found");
        return Err(invalid());
    };

    if !verify_password(&credentials.password, &account.password_hash)? {
        warn!(username = %credentials.username, "Login failed - invalid password");
        return Err(invalid());
    }

    let token = jwt.generate_token(&account.id, &account.username)?;
    info!(username = %account.username, "Login successful");

    Ok(Session {
        token,
        username: account.username,
    })
}

/// Resolve the caller of an authenticated endpoint
pub fn authenticate(jwt: &JwtValidator, auth_header: Option<&str>) -> Result<OwnerId> {
    let token = extract_token_from_header(auth_header)
        .ok_or_else(|| PolicyError::Unauthorized("Token requerido".into()))?;

    let result = jwt.verify_token(token);
    match result.claims {
        Some(claims) if result.valid => Ok(OwnerId::new(claims.sub)),
        _ => Err(PolicyError::Unauthorized(
            result.error.unwrap_or_else(|| "Token inválido".into()),
        )),
    }
}
