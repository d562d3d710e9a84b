//! GET /api/mothers - persisted mother profiles for health workers

use hyper::body::Incoming;
use hyper::{Request, Response};

use super::response::{get_auth_header, respond, BoxBody};
use crate::auth::{require_role, roles::WORKER_ONLY};
use crate::db::{mothers, MotherRow};
use crate::server::AppState;
use crate::types::JananiError;

fn list_for_worker(req: &Request<Incoming>, state: &AppState) -> Result<Vec<MotherRow>, JananiError> {
    let claims = state.jwt.authenticate(get_auth_header(req))?;
    require_role(claims.role, WORKER_ONLY)?;
    state.db.with_conn(mothers::list_mothers)
}

/// Mother profiles joined with account email, newest first
pub fn handle_list_mothers(req: &Request<Incoming>, state: &AppState) -> Response<BoxBody> {
    respond(list_for_worker(req, state), state.origin())
}
