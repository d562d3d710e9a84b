//! HTTP routes for registration and login
//!
//! - POST /api/register/mother
//! - POST /api/register/father
//! - POST /api/register/healthworker
//! - POST /api/login

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::response::{
    error_response, json_response, method_not_allowed, not_found_response, parse_json_body,
    BoxBody, ErrorResponse,
};
use crate::auth::Role;
use crate::db::{NewFather, NewHealthWorker, NewMother, ProfileInput};
use crate::server::AppState;
use crate::services::{self, LoginRequest, RegisterRequest};
use crate::types::JananiError;

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub role: Role,
}

fn registered_message(role: Role) -> &'static str {
    match role {
        Role::Mother => "Mother registered successfully",
        Role::Father => "Father registered successfully",
        Role::HealthWorker => "Health worker registered successfully",
    }
}

async fn read_registration(
    req: Request<Incoming>,
    role: Role,
) -> Result<(String, String, ProfileInput), JananiError> {
    Ok(match role {
        Role::Mother => {
            let body: RegisterRequest<NewMother> = parse_json_body(req).await?;
            (body.email, body.password, ProfileInput::Mother(body.profile))
        }
        Role::Father => {
            let body: RegisterRequest<NewFather> = parse_json_body(req).await?;
            (body.email, body.password, ProfileInput::Father(body.profile))
        }
        Role::HealthWorker => {
            let body: RegisterRequest<NewHealthWorker> = parse_json_body(req).await?;
            (body.email, body.password, ProfileInput::HealthWorker(body.profile))
        }
    })
}

/// POST /api/register/{role}
async fn handle_register(
    req: Request<Incoming>,
    state: Arc<AppState>,
    role: Role,
) -> Response<BoxBody> {
    let origin = state.origin();

    let (email, password, profile) = match read_registration(req, role).await {
        Ok(parts) => parts,
        Err(e) => return error_response(&e, origin),
    };

    info!("Registration request: role={} email={}", role, email.trim());

    let user_id = match services::register(&state.db, &email, &password, &profile) {
        Ok(id) => id,
        Err(e) => return error_response(&e, origin),
    };

    if role == Role::Mother {
        if let Err(e) = state.refresh_mothers() {
            warn!("Mother {} registered but care store refresh failed: {}", user_id, e);
        }
    }

    json_response(
        StatusCode::OK,
        &RegisterResponse {
            message: registered_message(role).to_string(),
            id: user_id,
        },
        origin,
    )
}

/// POST /api/login
async fn handle_login(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let origin = state.origin();

    let body: LoginRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e, origin),
    };

    match services::login(&state.db, &state.jwt, &body.email, &body.password) {
        Ok(outcome) => json_response(
            StatusCode::OK,
            &LoginResponse {
                message: "Login successful".into(),
                token: outcome.token,
                role: outcome.role,
            },
            origin,
        ),
        Err(JananiError::NotFound(_)) | Err(JananiError::Unauthorized(_)) => {
            warn!("Failed login for {}", body.email.trim());
            json_response(
                StatusCode::UNAUTHORIZED,
                &ErrorResponse {
                    error: "Invalid credentials".into(),
                    code: Some("UNAUTHORIZED".into()),
                },
                origin,
            )
        }
        Err(e) => error_response(&e, origin),
    }
}

/// Handle registration and login requests.
///
/// Returns Some(response) if the request was handled, None if not an auth route.
pub async fn handle_auth_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    if !path.starts_with("/api/register") && path != "/api/login" {
        return None;
    }

    let response = match (&method, path.as_str()) {
        (&Method::POST, "/api/register/mother") => handle_register(req, state, Role::Mother).await,
        (&Method::POST, "/api/register/father") => handle_register(req, state, Role::Father).await,
        (&Method::POST, "/api/register/healthworker") => {
            handle_register(req, state, Role::HealthWorker).await
        }
        (&Method::POST, "/api/login") => handle_login(req, state).await,

        (_, "/api/register/mother")
        | (_, "/api/register/father")
        | (_, "/api/register/healthworker")
        | (_, "/api/login") => method_not_allowed(state.origin()),

        _ => not_found_response(&path, state.origin()),
    };

    Some(response)
}
