//! Configuration for JananiSetu
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::auth::JwtValidator;
use crate::types::JananiError;

/// Minimum accepted length of the token signing secret
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// JananiSetu - maternal health tracking backend
#[derive(Parser, Debug, Clone)]
#[command(name = "janani-setu")]
#[command(about = "Maternal health tracking backend for mothers, families and Anganwadi workers")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "janani_setu.db")]
    pub database_path: PathBuf,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Enable development mode (dev signing secret, permissive CORS)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Origin allowed to call the API from a browser
    #[arg(long, env = "ALLOWED_ORIGIN")]
    pub allowed_origin: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        match &self.jwt_secret {
            None if !self.dev_mode => {
                return Err("JWT_SECRET is required in production mode".to_string());
            }
            Some(secret) if secret.len() < MIN_JWT_SECRET_LEN => {
                return Err(format!(
                    "JWT_SECRET must be at least {} characters",
                    MIN_JWT_SECRET_LEN
                ));
            }
            _ => {}
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Token signer/validator for this configuration.
    ///
    /// Dev mode without a secret falls back to the built-in dev secret.
    pub fn jwt_validator(&self) -> Result<JwtValidator, JananiError> {
        match &self.jwt_secret {
            Some(secret) => JwtValidator::new(secret.clone(), self.jwt_expiry_seconds),
            None if self.dev_mode => Ok(JwtValidator::new_dev()),
            None => Err(JananiError::Config(
                "JWT_SECRET is required in production mode".into(),
            )),
        }
    }

    /// Value for `Access-Control-Allow-Origin`, if any
    pub fn cors_origin(&self) -> Option<String> {
        match &self.allowed_origin {
            Some(origin) => Some(origin.clone()),
            None if self.dev_mode => Some("*".to_string()),
            None => None,
        }
    }
}
