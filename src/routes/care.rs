//! HTTP routes for maternal care
//!
//! All routes live under `/api/care` and require a bearer token. A mother
//! may only act on her own record; fathers and health workers act on any
//! record their role permits.

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::response::{
    error_response, get_auth_header, json_response, message_response, parse_json_body, BoxBody,
};
use crate::auth::roles::{
    ANY_ROLE, FAMILY, FATHER_ONLY, FATHER_OR_WORKER, MOTHER_ONLY, MOTHER_OR_WORKER, WORKER_ONLY,
};
use crate::auth::{require_role, Claims, Role};
use crate::care::{
    Audience, ChatSender, DeliveryReadinessUpdate, FamilyMember, HealthUpdate, MedicalHistoryUpdate,
    NewVisit, Notification,
};
use crate::server::AppState;
use crate::types::JananiError;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct WeightBody {
    weight: f64,
}

#[derive(Debug, Deserialize)]
struct SymptomsBody {
    #[serde(default)]
    symptoms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ReminderBody {
    #[serde(default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct HospitalBagBody {
    #[serde(default)]
    item: String,
    checked: bool,
}

#[derive(Debug, Deserialize)]
struct FatherDetailsBody {
    #[serde(default)]
    father_name: String,
    #[serde(default)]
    father_phone: String,
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct NotificationsResponse {
    unread: usize,
    notifications: Vec<Notification>,
}

fn ok<T: Serialize>(body: &T, origin: Option<&str>) -> Response<BoxBody> {
    json_response(StatusCode::OK, body, origin)
}

// =============================================================================
// Authorization
// =============================================================================

/// Check the caller's role, and for mothers that the record is their own
fn authorize_record(
    state: &AppState,
    id: &str,
    claims: &Claims,
    allowed: &[Role],
) -> Result<(), JananiError> {
    require_role(claims.role, allowed)?;

    if claims.role == Role::Mother {
        let store = state.care_read()?;
        let record = store.record(id)?;
        if record.user_id != Some(claims.user_id) {
            return Err(JananiError::Forbidden(
                "Mothers may only access their own record".into(),
            ));
        }
    }
    Ok(())
}

// =============================================================================
// Router
// =============================================================================

async fn route(
    req: Request<Incoming>,
    state: &AppState,
    claims: Claims,
) -> Result<Response<BoxBody>, JananiError> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let origin = state.origin();

    let segments: Vec<&str> = path
        .trim_start_matches("/api/care")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let response = match (&method, segments.as_slice()) {
        // ====================================================================
        // Mother records
        // ====================================================================
        (&Method::GET, ["mothers"]) => {
            require_role(claims.role, WORKER_ONLY)?;
            let mothers = state.care_read()?.list_mothers();
            ok(&mothers, origin)
        }

        (&Method::GET, ["me"]) => {
            require_role(claims.role, MOTHER_ONLY)?;
            let mother = state.mother_for_user(claims.user_id)?;
            ok(&mother, origin)
        }

        (&Method::GET, ["attention"]) => {
            require_role(claims.role, WORKER_ONLY)?;
            let mothers = state.care_read()?.attention_list();
            ok(&mothers, origin)
        }

        (&Method::GET, ["mothers", id]) => {
            authorize_record(state, id, &claims, ANY_ROLE)?;
            let mother = state.care_read()?.get_mother(id)?;
            ok(&mother, origin)
        }

        (&Method::POST, ["mothers", id, "weight"]) => {
            authorize_record(state, id, &claims, ANY_ROLE)?;
            let body: WeightBody = parse_json_body(req).await?;
            let change = state.care_write()?.update_weight(id, body.weight)?;
            ok(&change, origin)
        }

        (&Method::POST, ["mothers", id, "ifa"]) => {
            authorize_record(state, id, &claims, MOTHER_OR_WORKER)?;
            let tablets = state.care_write()?.mark_ifa_taken(id)?;
            ok(&serde_json::json!({ "ifa_tablets": tablets }), origin)
        }

        (&Method::POST, ["mothers", id, "ifa", "missed"]) => {
            authorize_record(state, id, &claims, MOTHER_OR_WORKER)?;
            let missed = state.care_write()?.record_missed_ifa_day(id)?;
            ok(&serde_json::json!({ "ifa_missed_days": missed }), origin)
        }

        (&Method::POST, ["mothers", id, "symptoms"]) => {
            authorize_record(state, id, &claims, ANY_ROLE)?;
            let body: SymptomsBody = parse_json_body(req).await?;
            let assessment = state.care_write()?.report_symptoms(id, &body.symptoms)?;
            ok(&assessment, origin)
        }

        (&Method::POST, ["mothers", id, "medical-history"]) => {
            authorize_record(state, id, &claims, MOTHER_OR_WORKER)?;
            let update: MedicalHistoryUpdate = parse_json_body(req).await?;
            let risk_level = state.care_write()?.update_medical_history(id, update)?;
            ok(&serde_json::json!({ "risk_level": risk_level }), origin)
        }

        (&Method::POST, ["mothers", id, "health"]) => {
            require_role(claims.role, WORKER_ONLY)?;
            let update: HealthUpdate = parse_json_body(req).await?;
            let mut store = state.care_write()?;
            store.update_health_data(id, update)?;
            ok(&store.get_mother(id)?, origin)
        }

        (&Method::GET, ["mothers", id, "eligibility"]) => {
            authorize_record(state, id, &claims, ANY_ROLE)?;
            let snapshot = state.care_write()?.check_scheme_eligibility(id)?;
            ok(&snapshot, origin)
        }

        (&Method::POST, ["mothers", id, "verify"]) => {
            require_role(claims.role, WORKER_ONLY)?;
            let mcp_number = state.care_write()?.verify_mother(id)?;
            ok(&serde_json::json!({ "mcp_number": mcp_number }), origin)
        }

        (&Method::POST, ["mothers", id, "high-risk"]) => {
            require_role(claims.role, WORKER_ONLY)?;
            let mut store = state.care_write()?;
            store.mark_high_risk(id)?;
            ok(&store.get_mother(id)?, origin)
        }

        (&Method::POST, ["mothers", id, "reminders"]) => {
            require_role(claims.role, WORKER_ONLY)?;
            let body: ReminderBody = parse_json_body(req).await?;
            state.care_write()?.send_reminder(id, &body.kind)?;
            message_response("Reminder sent", origin)
        }

        // ====================================================================
        // Family and birth preparedness
        // ====================================================================
        (&Method::POST, ["mothers", id, "family"]) => {
            authorize_record(state, id, &claims, FAMILY)?;
            let member: FamilyMember = parse_json_body(req).await?;
            let mut store = state.care_write()?;
            store.add_family_member(id, member)?;
            ok(&store.get_mother(id)?, origin)
        }

        (&Method::POST, ["mothers", id, "transport"]) => {
            require_role(claims.role, FATHER_ONLY)?;
            let mut store = state.care_write()?;
            store.confirm_transport(id)?;
            ok(&store.get_mother(id)?, origin)
        }

        (&Method::POST, ["mothers", id, "hospital-bag"]) => {
            authorize_record(state, id, &claims, FAMILY)?;
            let body: HospitalBagBody = parse_json_body(req).await?;
            let ready = state
                .care_write()?
                .update_hospital_bag(id, &body.item, body.checked)?;
            ok(&serde_json::json!({ "hospital_bag_ready": ready }), origin)
        }

        (&Method::POST, ["mothers", id, "father"]) => {
            authorize_record(state, id, &claims, FAMILY)?;
            let body: FatherDetailsBody = parse_json_body(req).await?;
            let mut store = state.care_write()?;
            store.update_father_details(id, &body.father_name, &body.father_phone)?;
            ok(&store.get_mother(id)?, origin)
        }

        (&Method::POST, ["mothers", id, "delivery-readiness"]) => {
            authorize_record(state, id, &claims, MOTHER_OR_WORKER)?;
            let update: DeliveryReadinessUpdate = parse_json_body(req).await?;
            let readiness = state.care_write()?.update_delivery_readiness(id, update)?;
            ok(&readiness, origin)
        }

        // ====================================================================
        // Visits, father tasks, chat
        // ====================================================================
        (&Method::GET, ["visits"]) => {
            require_role(claims.role, WORKER_ONLY)?;
            let visits = state.care_read()?.visits();
            ok(&visits, origin)
        }

        (&Method::POST, ["visits"]) => {
            require_role(claims.role, WORKER_ONLY)?;
            let visit: NewVisit = parse_json_body(req).await?;
            let visit = state.care_write()?.add_visit(visit)?;
            info!("Visit {} recorded for mother {}", visit.id, visit.mother_id);
            ok(&visit, origin)
        }

        (&Method::GET, ["father-tasks"]) => {
            require_role(claims.role, FATHER_ONLY)?;
            let tasks = state.care_read()?.father_tasks().to_vec();
            ok(&tasks, origin)
        }

        (&Method::POST, ["father-tasks", id, "toggle"]) => {
            require_role(claims.role, FATHER_ONLY)?;
            let task = state.care_write()?.toggle_father_task(id)?;
            ok(&task, origin)
        }

        (&Method::GET, ["chat"]) => {
            require_role(claims.role, FATHER_OR_WORKER)?;
            let messages = state.care_read()?.chat_messages().to_vec();
            ok(&messages, origin)
        }

        (&Method::POST, ["chat"]) => {
            require_role(claims.role, FATHER_OR_WORKER)?;
            let body: ChatBody = parse_json_body(req).await?;
            let from = if claims.role == Role::Father {
                ChatSender::Father
            } else {
                ChatSender::Worker
            };
            let message = state.care_write()?.send_chat_message(from, &body.message)?;
            ok(&message, origin)
        }

        // ====================================================================
        // Notifications and reporting
        // ====================================================================
        (&Method::GET, ["notifications"]) => {
            let audience = Audience::from(claims.role);
            let store = state.care_read()?;
            ok(
                &NotificationsResponse {
                    unread: store.unread_count(audience),
                    notifications: store.notifications_for(audience),
                },
                origin,
            )
        }

        (&Method::POST, ["notifications", id, "read"]) => {
            let id: u64 = id
                .parse()
                .map_err(|_| JananiError::Validation(format!("Invalid notification id: {}", id)))?;
            let audience = Audience::from(claims.role);
            if !state.care_write()?.mark_notification_read(id, audience) {
                debug!("Notification {} not visible to {:?}; left unread", id, audience);
            }
            message_response("Notification marked read", origin)
        }

        (&Method::GET, ["report"]) => {
            require_role(claims.role, WORKER_ONLY)?;
            let report = state.care_read()?.generate_report();
            ok(&report, origin)
        }

        _ => {
            debug!("No care route for {} {}", method, path);
            return Err(JananiError::NotFound(format!(
                "Care endpoint not found: {} {}",
                method, path
            )));
        }
    };

    Ok(response)
}

/// Handle a request under `/api/care`
pub async fn handle_care_request(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let claims = match state.jwt.authenticate(get_auth_header(&req)) {
        Ok(c) => c,
        Err(e) => return error_response(&e, state.origin()),
    };

    match route(req, &state, claims).await {
        Ok(response) => response,
        Err(e) => error_response(&e, state.origin()),
    }
}
