//! JananiSetu - maternal health tracking backend
//!
//! Serves three roles over HTTP/JSON:
//! - Mothers record weight, symptoms, IFA intake and medical history
//! - Fathers and family track birth preparedness
//! - Anganwadi health workers verify, monitor and report on their caseload
//!
//! Accounts live in SQLite; the care session (records, notifications,
//! visits, chat) is an in-process store seeded from the registered mothers.

pub mod auth;
pub mod care;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use types::{JananiError, Result};
