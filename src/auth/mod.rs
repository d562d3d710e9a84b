//! Authentication and authorization
//!
//! Provides:
//! - JWT session token generation and validation
//! - Password hashing with Argon2
//! - Role definitions and per-role access checks

pub mod jwt;
pub mod password;
pub mod roles;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenValidationResult};
pub use password::{hash_password, verify_password};
pub use roles::{is_role_allowed, require_role, Role};
