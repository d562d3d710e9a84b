//! Maternal care domain
//!
//! - `record` - The maternal record and its LMP-derived timeline
//! - `rules` - Pure risk and eligibility evaluators
//! - `notify` - Role-addressed notification log
//! - `store` - Session store applying the rules to records

pub mod notify;
pub mod record;
pub mod rules;
pub mod store;

pub use notify::{Audience, Notification, NotificationLog, Severity};
pub use record::{
    BloodGroup, DeliveryReadiness, Eligibility, EligibilitySnapshot, FamilyMember, MaternalRecord,
    MedicalHistory, RiskLevel, VerificationStatus,
};
pub use rules::AttentionReason;
pub use store::{
    CareReport, CareStore, ChatMessage, ChatSender, DeliveryReadinessUpdate, FatherTask,
    HealthUpdate, MedicalHistoryUpdate, MotherView, NewVisit, Visit, VisitKind,
};
