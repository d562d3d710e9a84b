//! User roles and per-role authorization

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::JananiError;

/// The three kinds of account the service knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Mother,
    Father,
    HealthWorker,
}

impl Role {
    /// Value stored in `users.role` and carried in token claims
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Mother => "mother",
            Role::Father => "father",
            Role::HealthWorker => "health_worker",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = JananiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mother" => Ok(Role::Mother),
            "father" => Ok(Role::Father),
            "health_worker" | "healthworker" | "worker" => Ok(Role::HealthWorker),
            other => Err(JananiError::Validation(format!("Unknown role: {}", other))),
        }
    }
}

/// Roles allowed to act on any mother record
pub const ANY_ROLE: &[Role] = &[Role::Mother, Role::Father, Role::HealthWorker];
pub const WORKER_ONLY: &[Role] = &[Role::HealthWorker];
pub const MOTHER_ONLY: &[Role] = &[Role::Mother];
pub const MOTHER_OR_WORKER: &[Role] = &[Role::Mother, Role::HealthWorker];
pub const FAMILY: &[Role] = &[Role::Mother, Role::Father];
pub const FATHER_ONLY: &[Role] = &[Role::Father];
pub const FATHER_OR_WORKER: &[Role] = &[Role::Father, Role::HealthWorker];

/// Check whether `role` is one of `allowed`
pub fn is_role_allowed(role: Role, allowed: &[Role]) -> bool {
    allowed.contains(&role)
}

/// Fail with `Forbidden` unless `role` is one of `allowed`
pub fn require_role(role: Role, allowed: &[Role]) -> Result<(), JananiError> {
    if is_role_allowed(role, allowed) {
        Ok(())
    } else {
        Err(JananiError::Forbidden(format!(
            "Role '{}' is not permitted to perform this action",
            role
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_through_storage_value() {
        for role in ANY_ROLE {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), *role);
        }
    }

    #[test]
    fn test_worker_aliases() {
        assert_eq!("healthworker".parse::<Role>().unwrap(), Role::HealthWorker);
        assert_eq!("worker".parse::<Role>().unwrap(), Role::HealthWorker);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(Role::HealthWorker, WORKER_ONLY).is_ok());
        assert!(matches!(
            require_role(Role::Mother, WORKER_ONLY),
            Err(JananiError::Forbidden(_))
        ));
        assert!(require_role(Role::Father, FAMILY).is_ok());
    }
}
