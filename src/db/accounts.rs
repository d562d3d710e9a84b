//! Account rows: `users` plus one role-profile row per account

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Deserialize;
use tracing::debug;

use crate::auth::Role;
use crate::types::JananiError;

/// Mother profile fields as submitted at registration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMother {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub blood_group: Option<String>,
    /// JSON-encoded medical history
    #[serde(default)]
    pub pre_existing_conditions: Option<String>,
    /// ISO date (YYYY-MM-DD)
    #[serde(default)]
    pub lmp_date: Option<String>,
}

/// Father/family profile fields as submitted at registration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewFather {
    #[serde(default)]
    pub father_name: Option<String>,
    #[serde(default)]
    pub wife_name: Option<String>,
    #[serde(default)]
    pub wife_age: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Health worker profile fields as submitted at registration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewHealthWorker {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub anganwadi_location: Option<String>,
}

/// Role-specific profile to insert alongside the user row
#[derive(Debug, Clone)]
pub enum ProfileInput {
    Mother(NewMother),
    Father(NewFather),
    HealthWorker(NewHealthWorker),
}

impl ProfileInput {
    pub fn role(&self) -> Role {
        match self {
            ProfileInput::Mother(_) => Role::Mother,
            ProfileInput::Father(_) => Role::Father,
            ProfileInput::HealthWorker(_) => Role::HealthWorker,
        }
    }
}

/// Row from the `users` table
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub role: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
}

impl UserRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            role: row.get("role")?,
            email: row.get("email")?,
            password_hash: row.get("password")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Insert a user row and its role-profile row atomically.
///
/// Either both rows are committed or neither is. A duplicate email surfaces
/// as `JananiError::Conflict`.
pub fn create_account(
    conn: &mut Connection,
    email: &str,
    password_hash: &str,
    profile: &ProfileInput,
) -> Result<i64, JananiError> {
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO users (role, email, password) VALUES (?, ?, ?)",
        params![profile.role().as_str(), email, password_hash],
    )?;
    let user_id = tx.last_insert_rowid();
    debug!("User row {} inserted, inserting {} profile", user_id, profile.role());

    match profile {
        ProfileInput::Mother(m) => {
            tx.execute(
                r#"
                INSERT INTO mothers (
                    user_id, full_name, age, phone_number, village, location,
                    blood_group, pre_existing_conditions, lmp_date
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    user_id,
                    m.full_name,
                    m.age,
                    m.phone_number,
                    m.village,
                    m.location,
                    m.blood_group,
                    m.pre_existing_conditions,
                    m.lmp_date,
                ],
            )?;
        }
        ProfileInput::Father(f) => {
            tx.execute(
                "INSERT INTO fathers (user_id, father_name, wife_name, wife_age, location) VALUES (?, ?, ?, ?, ?)",
                params![user_id, f.father_name, f.wife_name, f.wife_age, f.location],
            )?;
        }
        ProfileInput::HealthWorker(w) => {
            tx.execute(
                "INSERT INTO health_workers (user_id, full_name, anganwadi_location) VALUES (?, ?, ?)",
                params![user_id, w.full_name, w.anganwadi_location],
            )?;
        }
    }

    tx.commit()?;
    Ok(user_id)
}

/// Look up a user by email
pub fn find_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>, JananiError> {
    let user = conn
        .query_row(
            "SELECT id, role, email, password, created_at FROM users WHERE email = ?",
            params![email],
            |row| UserRow::from_row(row),
        )
        .optional()?;
    Ok(user)
}
