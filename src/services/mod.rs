//! Service layer between HTTP handlers and storage

pub mod accounts;

pub use accounts::{login, register, LoginOutcome, LoginRequest, RegisterRequest};
