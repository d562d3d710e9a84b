//! Mother profile queries

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::types::JananiError;

const MOTHER_COLUMNS: &str = r#"
    m.id, m.user_id, m.full_name, m.age, m.phone_number, m.village, m.location,
    m.blood_group, m.pre_existing_conditions, m.lmp_date, m.created_at, u.email
"#;

/// Mother profile joined with the account email
#[derive(Debug, Clone, Serialize)]
pub struct MotherRow {
    pub id: i64,
    pub user_id: i64,
    pub full_name: Option<String>,
    pub age: Option<i64>,
    pub phone_number: Option<String>,
    pub village: Option<String>,
    pub location: Option<String>,
    pub blood_group: Option<String>,
    pub pre_existing_conditions: Option<String>,
    pub lmp_date: Option<String>,
    pub created_at: String,
    pub email: String,
}

impl MotherRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            full_name: row.get("full_name")?,
            age: row.get("age")?,
            phone_number: row.get("phone_number")?,
            village: row.get("village")?,
            location: row.get("location")?,
            blood_group: row.get("blood_group")?,
            pre_existing_conditions: row.get("pre_existing_conditions")?,
            lmp_date: row.get("lmp_date")?,
            created_at: row.get("created_at")?,
            email: row.get("email")?,
        })
    }
}

/// All mothers, newest registration first
pub fn list_mothers(conn: &Connection) -> Result<Vec<MotherRow>, JananiError> {
    let sql = format!(
        "SELECT {} FROM mothers m JOIN users u ON m.user_id = u.id ORDER BY m.created_at DESC, m.id DESC",
        MOTHER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt
        .query_map([], |row| MotherRow::from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Mother profile belonging to a user account
pub fn get_mother_by_user(conn: &Connection, user_id: i64) -> Result<Option<MotherRow>, JananiError> {
    let sql = format!(
        "SELECT {} FROM mothers m JOIN users u ON m.user_id = u.id WHERE m.user_id = ?",
        MOTHER_COLUMNS
    );
    let row = conn
        .query_row(&sql, params![user_id], |row| MotherRow::from_row(row))
        .optional()?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::accounts::{create_account, NewMother, ProfileInput};
    use crate::db::CareDb;

    fn mother(name: &str) -> ProfileInput {
        ProfileInput::Mother(NewMother {
            full_name: Some(name.into()),
            age: Some(24),
            blood_group: Some("O+".into()),
            lmp_date: Some("2025-08-15".into()),
            ..Default::default()
        })
    }

    #[test]
    fn test_list_mothers_newest_first_with_email() {
        let db = CareDb::open_in_memory().unwrap();
        db.with_conn_mut(|conn| create_account(conn, "priya@example.com", "h", &mother("Priya")))
            .unwrap();
        db.with_conn_mut(|conn| create_account(conn, "anita@example.com", "h", &mother("Anita")))
            .unwrap();

        let rows = db.with_conn(list_mothers).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].full_name.as_deref(), Some("Anita"));
        assert_eq!(rows[0].email, "anita@example.com");
        assert_eq!(rows[1].full_name.as_deref(), Some("Priya"));
    }

    #[test]
    fn test_get_mother_by_user() {
        let db = CareDb::open_in_memory().unwrap();
        let user_id = db
            .with_conn_mut(|conn| create_account(conn, "kavita@example.com", "h", &mother("Kavita")))
            .unwrap();

        let row = db
            .with_conn(|conn| get_mother_by_user(conn, user_id))
            .unwrap()
            .unwrap();
        assert_eq!(row.lmp_date.as_deref(), Some("2025-08-15"));
        assert!(db.with_conn(|conn| get_mother_by_user(conn, 999)).unwrap().is_none());
    }
}
