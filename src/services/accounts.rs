//! Registration and login
//!
//! Registration validates the request the same way for every role, hashes
//! the password and inserts the user and profile rows in one transaction.

use serde::Deserialize;
use tracing::{debug, info};

use crate::auth::{hash_password, verify_password, JwtValidator, Role};
use crate::care::record::{parse_date, BloodGroup, MedicalHistory};
use crate::db::accounts::{create_account, find_user_by_email};
use crate::db::{CareDb, ProfileInput};
use crate::types::JananiError;

/// Registration body: credentials plus the role's profile fields
#[derive(Debug, Deserialize)]
pub struct RegisterRequest<P> {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(flatten)]
    pub profile: P,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user_id: i64,
    pub role: Role,
    pub token: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check credentials and profile fields before anything is written
pub fn validate_registration(
    email: &str,
    password: &str,
    profile: &ProfileInput,
) -> Result<(), JananiError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(JananiError::Validation(
            "Missing required fields: email, password".into(),
        ));
    }
    if !email.contains('@') {
        return Err(JananiError::Validation(format!("Invalid email: {}", email.trim())));
    }

    let check_age = |age: Option<i64>, field: &str| -> Result<(), JananiError> {
        match age {
            Some(a) if !(1..=120).contains(&a) => {
                Err(JananiError::Validation(format!("Invalid {}: {}", field, a)))
            }
            _ => Ok(()),
        }
    };

    match profile {
        ProfileInput::Mother(m) => {
            check_age(m.age, "age")?;
            if let Some(lmp) = m.lmp_date.as_deref().filter(|d| !d.trim().is_empty()) {
                parse_date(lmp)?;
            }
            if let Some(group) = m.blood_group.as_deref() {
                group.parse::<BloodGroup>()?;
            }
            if let Some(history) = m.pre_existing_conditions.as_deref().filter(|h| !h.trim().is_empty()) {
                serde_json::from_str::<MedicalHistory>(history).map_err(|e| {
                    JananiError::Validation(format!("Invalid pre_existing_conditions: {}", e))
                })?;
            }
        }
        ProfileInput::Father(f) => check_age(f.wife_age, "wife_age")?,
        ProfileInput::HealthWorker(_) => {}
    }

    Ok(())
}

/// Create an account; returns the new user id
pub fn register(
    db: &CareDb,
    email: &str,
    password: &str,
    profile: &ProfileInput,
) -> Result<i64, JananiError> {
    validate_registration(email, password, profile)?;

    let email = normalize_email(email);
    let password_hash = hash_password(password)?;
    let user_id = db.with_conn_mut(|conn| create_account(conn, &email, &password_hash, profile))?;

    info!("Registered {} account {} ({})", profile.role(), user_id, email);
    Ok(user_id)
}

/// Verify credentials and issue a token.
///
/// Unknown email is `NotFound` and a wrong password is `Unauthorized`;
/// callers present both the same way.
pub fn login(
    db: &CareDb,
    jwt: &JwtValidator,
    email: &str,
    password: &str,
) -> Result<LoginOutcome, JananiError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(JananiError::Validation(
            "Missing required fields: email, password".into(),
        ));
    }

    let email = normalize_email(email);
    let user = db
        .with_conn(|conn| find_user_by_email(conn, &email))?
        .ok_or_else(|| JananiError::NotFound("User not found".into()))?;

    if !verify_password(password, &user.password_hash)? {
        debug!("Password mismatch for user {}", user.id);
        return Err(JananiError::Unauthorized("Invalid credentials".into()));
    }

    let role: Role = user
        .role
        .parse()
        .map_err(|e: JananiError| JananiError::Internal(e.to_string()))?;
    let token = jwt.generate_token(user.id, role)?;
    info!("Login: user {} ({})", user.id, role);

    Ok(LoginOutcome {
        user_id: user.id,
        role,
        token,
    })
}
