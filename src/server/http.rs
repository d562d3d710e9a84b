//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo; each connection runs on its own task.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::care::{CareStore, MaternalRecord, MotherView};
use crate::config::Args;
use crate::db::{mothers, CareDb};
use crate::routes::{self, BoxBody};
use crate::types::JananiError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub db: Arc<CareDb>,
    /// Session store for maternal records, seeded from the database
    pub care: RwLock<CareStore>,
    pub jwt: JwtValidator,
    pub cors_origin: Option<String>,
    pub started_at: Instant,
}

impl AppState {
    /// Build state and load the persisted mothers into the care store
    pub fn new(args: Args, db: Arc<CareDb>) -> Result<Self, JananiError> {
        let jwt = args.jwt_validator()?;
        let cors_origin = args.cors_origin();

        let rows = db.with_conn(mothers::list_mothers)?;
        let mut store = CareStore::new();
        store.seed_from_rows(&rows);

        Ok(Self {
            args,
            db,
            care: RwLock::new(store),
            jwt,
            cors_origin,
            started_at: Instant::now(),
        })
    }

    pub fn origin(&self) -> Option<&str> {
        self.cors_origin.as_deref()
    }

    pub fn care_read(&self) -> Result<RwLockReadGuard<'_, CareStore>, JananiError> {
        self.care
            .read()
            .map_err(|e| JananiError::Internal(format!("Lock poisoned: {}", e)))
    }

    pub fn care_write(&self) -> Result<RwLockWriteGuard<'_, CareStore>, JananiError> {
        self.care
            .write()
            .map_err(|e| JananiError::Internal(format!("Lock poisoned: {}", e)))
    }

    /// Pull mothers registered since the last load into the care store
    pub fn refresh_mothers(&self) -> Result<usize, JananiError> {
        let rows = self.db.with_conn(mothers::list_mothers)?;
        Ok(self.care_write()?.seed_from_rows(&rows))
    }

    /// The record owned by `user_id`, loading its profile row on a miss
    pub fn mother_for_user(&self, user_id: i64) -> Result<MotherView, JananiError> {
        let cached = self.care_read()?.find_by_user(user_id);
        if let Some(view) = cached {
            return Ok(view);
        }

        let row = self
            .db
            .with_conn(|conn| mothers::get_mother_by_user(conn, user_id))?
            .ok_or_else(|| JananiError::NotFound(format!("No mother profile for user {}", user_id)))?;
        let mut store = self.care_write()?;
        store.insert(MaternalRecord::from_row(&row));
        store
            .find_by_user(user_id)
            .ok_or_else(|| JananiError::Internal(format!("Mother for user {} not loaded", user_id)))
    }
}

/// Bind the configured address and serve forever
pub async fn run(state: Arc<AppState>) -> Result<(), JananiError> {
    let listener = TcpListener::bind(state.args.listen).await?;
    serve(listener, state).await
}

/// Serve connections from an already bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), JananiError> {
    info!("JananiSetu listening on {}", listener.local_addr()?);

    if state.args.dev_mode {
        warn!("Development mode enabled - dev signing secret and permissive CORS");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    if method == Method::OPTIONS {
        return Ok(routes::cors_preflight(state.origin()));
    }

    if path.starts_with("/api/register") || path == "/api/login" {
        if let Some(response) = routes::handle_auth_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(routes::not_found_response(&path, state.origin()));
    }

    if path.starts_with("/api/care/") || path == "/api/care" {
        return Ok(routes::handle_care_request(req, Arc::clone(&state)).await);
    }

    let response = match (method, path.as_str()) {
        (Method::GET, "/") => routes::root(&state),
        (Method::GET, "/health") => routes::health_check(&state),
        (Method::GET, "/api/mothers") => routes::handle_list_mothers(&req, &state),
        (_, "/") | (_, "/health") | (_, "/api/mothers") => routes::method_not_allowed(state.origin()),
        _ => routes::not_found_response(&path, state.origin()),
    };

    Ok(response)
}
