//! HTTP routes for JananiSetu

pub mod auth_routes;
pub mod care;
pub mod health;
pub mod mothers;
pub mod response;

pub use auth_routes::handle_auth_request;
pub use care::handle_care_request;
pub use health::{health_check, root};
pub use mothers::handle_list_mothers;
pub use response::{
    cors_preflight, error_response, json_response, method_not_allowed, not_found_response,
    BoxBody,
};
