//! Care session store
//!
//! Holds every maternal record plus the notification log, visits, father
//! tasks and chat thread. Each mutation validates its input first and then
//! applies one complete state transition, so a rejected call leaves the
//! store untouched.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::notify::{Audience, Notification, NotificationLog, Severity};
use super::record::{
    BloodGroup, BloodPressure, DeliveryReadiness, EligibilitySnapshot, FamilyMember,
    MaternalRecord, MedicalHistory, RiskLevel, VerificationStatus, WeightSample,
};
use super::rules::{
    self, AttentionReason, EligibilityInputs, SymptomAssessment, Urgency, WeightChange,
};
use crate::db::MotherRow;
use crate::types::JananiError;

/// Heaviest weight (kg) accepted from a report
pub const MAX_WEIGHT_KG: f64 = 300.0;

/// Highest hemoglobin (g/dL) accepted from a report
pub const MAX_HEMOGLOBIN: f64 = 25.0;

/// Bag size at which a fully packed bag is reported to the worker
pub const HOSPITAL_BAG_MIN_ITEMS: usize = 5;

/// Missed IFA days that are reported when the mother resumes
pub const IFA_MISSED_ALERT_DAYS: u32 = 3;

pub const MAX_READINESS_SCORE: u32 = 100;
pub const MAX_STRESS_LEVEL: u8 = 10;

const DEFAULT_FATHER_TASKS: &[(&str, &str, bool)] = &[
    ("1", "Arrange transport to hospital", false),
    ("2", "Buy iron & calcium supplements", true),
    ("3", "Accompany to next ANC visit", false),
    ("4", "Prepare hospital bag", false),
    ("5", "Save emergency money (Rs 5000)", true),
    ("6", "Know nearest blood bank", false),
];

/// Source of the current time
pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Record plus the fields derived from its LMP on the current day
#[derive(Debug, Clone, Serialize)]
pub struct MotherView {
    #[serde(flatten)]
    pub record: MaternalRecord,
    pub pregnancy_week: u32,
    pub due_date: Option<NaiveDate>,
    pub overdue_anc: bool,
    pub attention: Vec<AttentionReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitKind {
    Home,
    Clinic,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVisit {
    pub mother_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: String,
    pub kind: VisitKind,
    #[serde(default)]
    pub bp: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub risk_found: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Visit {
    pub id: String,
    pub mother_id: String,
    pub date: NaiveDate,
    pub notes: String,
    pub kind: VisitKind,
    pub bp: Option<String>,
    pub weight: Option<f64>,
    pub risk_found: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FatherTask {
    pub id: String,
    pub task: String,
    pub done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSender {
    Father,
    Worker,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub from: ChatSender,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Partial vitals update from a health worker
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthUpdate {
    #[serde(default)]
    pub bp: Option<String>,
    #[serde(default)]
    pub hemoglobin: Option<f64>,
    #[serde(default)]
    pub tt_vaccine: Option<bool>,
    #[serde(default)]
    pub anc_visits: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicalHistoryUpdate {
    #[serde(default)]
    pub blood_group: Option<BloodGroup>,
    #[serde(default)]
    pub medical_history: Option<MedicalHistory>,
}

/// Partial delivery readiness update; present fields replace stored ones
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryReadinessUpdate {
    #[serde(default)]
    pub checklist: Option<Vec<String>>,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub practiced: Option<Vec<String>>,
    #[serde(default)]
    pub stress_level: Option<u8>,
}

/// Caseload summary for the worker dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CareReport {
    pub total: usize,
    pub high_risk: usize,
    pub overdue_anc: usize,
    pub needs_attention: usize,
    pub verified: usize,
    pub home_visits: usize,
    pub pending: usize,
}

pub struct CareStore {
    mothers: Vec<MaternalRecord>,
    notifications: NotificationLog,
    visits: VecDeque<Visit>,
    father_tasks: Vec<FatherTask>,
    chat: Vec<ChatMessage>,
    clock: Clock,
}

impl Default for CareStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CareStore {
    pub fn new() -> Self {
        Self::with_clock(Box::new(Utc::now))
    }

    pub fn with_clock(clock: Clock) -> Self {
        let father_tasks = DEFAULT_FATHER_TASKS
            .iter()
            .map(|(id, task, done)| FatherTask {
                id: id.to_string(),
                task: task.to_string(),
                done: *done,
            })
            .collect();

        Self {
            mothers: Vec::new(),
            notifications: NotificationLog::new(),
            visits: VecDeque::new(),
            father_tasks,
            chat: Vec::new(),
            clock,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn find_mut<'a>(
        mothers: &'a mut [MaternalRecord],
        id: &str,
    ) -> Result<&'a mut MaternalRecord, JananiError> {
        mothers
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| JananiError::NotFound(format!("Mother not found: {}", id)))
    }

    fn find(&self, id: &str) -> Result<&MaternalRecord, JananiError> {
        self.mothers
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| JananiError::NotFound(format!("Mother not found: {}", id)))
    }

    fn view(&self, record: &MaternalRecord) -> MotherView {
        let today = self.today();
        let pregnancy_week = record.pregnancy_week(today);
        MotherView {
            record: record.clone(),
            pregnancy_week,
            due_date: record.due_date(),
            overdue_anc: rules::check_overdue_anc(record.anc_visits, pregnancy_week),
            attention: rules::needs_attention(record),
        }
    }

    // =========================================================================
    // Records
    // =========================================================================

    /// Add a record; an existing id keeps its session state
    pub fn insert(&mut self, record: MaternalRecord) -> bool {
        if self.mothers.iter().any(|m| m.id == record.id) {
            return false;
        }
        debug!("Care store: added mother {}", record.id);
        self.mothers.insert(0, record);
        true
    }

    /// Load persisted mothers (newest first) that are not yet in the store
    pub fn seed_from_rows(&mut self, rows: &[MotherRow]) -> usize {
        let added = rows
            .iter()
            .rev()
            .filter(|row| self.insert(MaternalRecord::from_row(row)))
            .count();
        if added > 0 {
            info!("Care store: loaded {} mother record(s)", added);
        }
        added
    }

    pub fn len(&self) -> usize {
        self.mothers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mothers.is_empty()
    }

    pub fn list_mothers(&self) -> Vec<MotherView> {
        self.mothers.iter().map(|m| self.view(m)).collect()
    }

    pub fn get_mother(&self, id: &str) -> Result<MotherView, JananiError> {
        self.find(id).map(|m| self.view(m))
    }

    pub fn record(&self, id: &str) -> Result<&MaternalRecord, JananiError> {
        self.find(id)
    }

    /// Record owned by a user account
    pub fn find_by_user(&self, user_id: i64) -> Option<MotherView> {
        self.mothers
            .iter()
            .find(|m| m.user_id == Some(user_id))
            .map(|m| self.view(m))
    }

    /// Mothers with at least one attention reason, in list order
    pub fn attention_list(&self) -> Vec<MotherView> {
        self.list_mothers()
            .into_iter()
            .filter(|v| !v.attention.is_empty())
            .collect()
    }

    // =========================================================================
    // Vitals
    // =========================================================================

    /// Record a weight sample; abnormal changes alert the worker
    pub fn update_weight(&mut self, id: &str, weight: f64) -> Result<WeightChange, JananiError> {
        validate_weight(weight)?;
        let now = self.now();
        let record = Self::find_mut(&mut self.mothers, id)?;

        let previous = record.weight;
        let change = rules::evaluate_weight_change(previous, weight);
        record.weight_history.push(WeightSample {
            date: now.date_naive(),
            weight,
        });
        record.weight = weight;

        if change.abnormal {
            warn!("Mother {}: abnormal weight change {:+.1}kg", id, change.delta);
            self.notifications.notify(
                format!(
                    "Abnormal weight change for {}: {}kg -> {}kg ({:+.1}kg)",
                    record.name, previous, weight, change.delta
                ),
                Severity::Warning,
                Audience::Worker,
                now,
            );
        }

        Ok(change)
    }

    /// Count one IFA tablet and reset the missed-day counter
    pub fn mark_ifa_taken(&mut self, id: &str) -> Result<u32, JananiError> {
        let now = self.now();
        let record = Self::find_mut(&mut self.mothers, id)?;

        if record.ifa_missed_days >= IFA_MISSED_ALERT_DAYS {
            self.notifications.notify(
                format!(
                    "{} had missed {} days of IFA before resuming",
                    record.name, record.ifa_missed_days
                ),
                Severity::Warning,
                Audience::Worker,
                now,
            );
        }
        record.ifa_tablets += 1;
        record.ifa_missed_days = 0;

        Ok(record.ifa_tablets)
    }

    pub fn record_missed_ifa_day(&mut self, id: &str) -> Result<u32, JananiError> {
        let record = Self::find_mut(&mut self.mothers, id)?;
        record.ifa_missed_days += 1;
        Ok(record.ifa_missed_days)
    }

    /// Partial vitals update; blood pressure must read "systolic/diastolic"
    pub fn update_health_data(&mut self, id: &str, update: HealthUpdate) -> Result<(), JananiError> {
        let bp = update
            .bp
            .as_deref()
            .map(|bp| bp.parse::<BloodPressure>())
            .transpose()?;
        if let Some(hb) = update.hemoglobin {
            if !hb.is_finite() || hb <= 0.0 || hb > MAX_HEMOGLOBIN {
                return Err(JananiError::Validation(format!("Invalid hemoglobin: {}", hb)));
            }
        }

        let record = Self::find_mut(&mut self.mothers, id)?;
        if let Some(bp) = bp {
            record.bp = bp.to_string();
        }
        if let Some(hb) = update.hemoglobin {
            record.hemoglobin = hb;
        }
        if let Some(tt) = update.tt_vaccine {
            record.tt_vaccine = tt;
        }
        if let Some(anc) = update.anc_visits {
            record.anc_visits = anc;
        }
        Ok(())
    }

    // =========================================================================
    // Risk
    // =========================================================================

    /// Merge reported symptoms into the danger signs and raise alerts
    pub fn report_symptoms(
        &mut self,
        id: &str,
        symptoms: &[String],
    ) -> Result<SymptomAssessment, JananiError> {
        let symptoms: Vec<String> = symptoms.iter().map(|s| s.trim().to_string()).collect();
        if symptoms.iter().any(|s| s.is_empty()) {
            return Err(JananiError::Validation("Symptoms must not be empty".into()));
        }

        let now = self.now();
        let record = Self::find_mut(&mut self.mothers, id)?;
        let assessment = rules::evaluate_symptom_report(&record.danger_signs, &symptoms);
        record.danger_signs = assessment.merged_signs.clone();

        match assessment.urgency {
            Urgency::Critical => {
                warn!("Mother {}: critical symptoms reported", id);
                record.escalate_risk(RiskLevel::High);
                self.notifications.notify(
                    format!(
                        "CRITICAL: {} reports severe symptoms: {}",
                        record.name,
                        symptoms.join(", ")
                    ),
                    Severity::Urgent,
                    Audience::Worker,
                    now,
                );
                self.notifications.notify(
                    format!("Emergency alert for {} - Please call 108 immediately", record.name),
                    Severity::Urgent,
                    Audience::Father,
                    now,
                );
            }
            Urgency::Warning => {
                self.notifications.notify(
                    format!("{} reports symptoms: {}", record.name, symptoms.join(", ")),
                    Severity::Warning,
                    Audience::Worker,
                    now,
                );
            }
            Urgency::Normal => {}
        }

        Ok(assessment)
    }

    /// Apply blood group and medical history; returns the resulting risk level
    pub fn update_medical_history(
        &mut self,
        id: &str,
        update: MedicalHistoryUpdate,
    ) -> Result<RiskLevel, JananiError> {
        let now = self.now();
        let record = Self::find_mut(&mut self.mothers, id)?;

        if let Some(group) = update.blood_group {
            record.blood_group = group;
            if rules::evaluate_blood_group_alert(group) {
                self.notifications.notify(
                    format!(
                        "Medical alert: {} has Rh negative blood group ({}). Check Anti-D status.",
                        record.name, group
                    ),
                    Severity::Urgent,
                    Audience::Worker,
                    now,
                );
            }
        }

        if let Some(mut history) = update.medical_history {
            if history.last_updated.is_empty() {
                history.last_updated = now.date_naive().to_string();
            }
            if rules::evaluate_medical_history_risk(&history.conditions, record.risk_level) {
                record.escalate_risk(RiskLevel::High);
                self.notifications.notify(
                    format!(
                        "High risk alert: {} marked high risk due to {}",
                        record.name,
                        history.conditions.join(", ")
                    ),
                    Severity::Urgent,
                    Audience::Worker,
                    now,
                );
            }
            record.medical_history = history;
        }

        Ok(record.risk_level)
    }

    /// Worker override to high risk
    pub fn mark_high_risk(&mut self, id: &str) -> Result<(), JananiError> {
        let now = self.now();
        let record = Self::find_mut(&mut self.mothers, id)?;
        record.escalate_risk(RiskLevel::High);
        info!("Mother {} marked high risk", id);
        self.notifications.notify(
            format!("HIGH RISK: {} has been flagged. Alert sent to ANM/PHC.", record.name),
            Severity::Urgent,
            Audience::All,
            now,
        );
        Ok(())
    }

    /// Evaluate and store scheme eligibility
    pub fn check_scheme_eligibility(&mut self, id: &str) -> Result<EligibilitySnapshot, JananiError> {
        let now = self.now();
        let record = Self::find_mut(&mut self.mothers, id)?;
        let inputs = EligibilityInputs::of(record, now.date_naive());
        let snapshot = EligibilitySnapshot {
            eligibility: rules::evaluate_eligibility(&inputs),
            evaluated_at: now,
        };
        record.scheme_eligibility = Some(snapshot);
        Ok(snapshot)
    }

    /// Assign an MCP number and activate the record
    pub fn verify_mother(&mut self, id: &str) -> Result<String, JananiError> {
        let now = self.now();
        let record = Self::find_mut(&mut self.mothers, id)?;
        let mcp_number = rules::assign_mcp_number(now);

        record.mcp_number = mcp_number.clone();
        record.verified = true;
        record.status = VerificationStatus::Active;
        info!("Mother {} verified as {}", id, mcp_number);

        self.notifications.notify(
            format!("{} has been verified. MCP Number: {}", record.name, mcp_number),
            Severity::Info,
            Audience::All,
            now,
        );
        Ok(mcp_number)
    }

    // =========================================================================
    // Family and birth preparedness
    // =========================================================================

    pub fn add_family_member(&mut self, id: &str, member: FamilyMember) -> Result<(), JananiError> {
        if member.name.trim().is_empty() || member.relation.trim().is_empty() {
            return Err(JananiError::Validation(
                "Family member name and relation are required".into(),
            ));
        }
        let now = self.now();
        let record = Self::find_mut(&mut self.mothers, id)?;
        self.notifications.notify(
            format!(
                "New family member added for {}: {} ({})",
                record.name, member.name, member.relation
            ),
            Severity::Info,
            Audience::Worker,
            now,
        );
        record.family_members.push(member);
        Ok(())
    }

    pub fn send_reminder(&mut self, id: &str, kind: &str) -> Result<(), JananiError> {
        let kind = kind.trim();
        if kind.is_empty() {
            return Err(JananiError::Validation("Reminder kind is required".into()));
        }
        let now = self.now();
        let name = self.find(id)?.name.clone();
        self.notifications.notify(
            format!("Reminder sent to {}: {}", name, kind),
            Severity::Info,
            Audience::Mother,
            now,
        );
        self.notifications.notify(
            format!("Reminder for your wife: {}", kind),
            Severity::Info,
            Audience::Father,
            now,
        );
        Ok(())
    }

    pub fn confirm_transport(&mut self, id: &str) -> Result<(), JananiError> {
        let now = self.now();
        let record = Self::find_mut(&mut self.mothers, id)?;
        record.transport_ready = true;
        record
            .birth_preparedness
            .insert("Transport arranged".to_string(), true);
        self.notifications.notify(
            format!("Transport arranged for {} by family", record.name),
            Severity::Info,
            Audience::Worker,
            now,
        );
        Ok(())
    }

    /// Check or uncheck a bag item; returns whether the bag is ready
    pub fn update_hospital_bag(
        &mut self,
        id: &str,
        item: &str,
        checked: bool,
    ) -> Result<bool, JananiError> {
        let item = item.trim();
        if item.is_empty() {
            return Err(JananiError::Validation("Hospital bag item is required".into()));
        }
        let now = self.now();
        let record = Self::find_mut(&mut self.mothers, id)?;
        record.hospital_bag_items.insert(item.to_string(), checked);

        let ready = record.hospital_bag_items.values().all(|v| *v);
        record.hospital_bag_ready = ready;
        if ready && record.hospital_bag_items.len() >= HOSPITAL_BAG_MIN_ITEMS {
            self.notifications.notify(
                format!("Hospital bag packed for {}", record.name),
                Severity::Info,
                Audience::Worker,
                now,
            );
        }
        Ok(ready)
    }

    pub fn update_father_details(
        &mut self,
        id: &str,
        father_name: &str,
        father_phone: &str,
    ) -> Result<(), JananiError> {
        if father_name.trim().is_empty() {
            return Err(JananiError::Validation("Father name is required".into()));
        }
        let record = Self::find_mut(&mut self.mothers, id)?;
        record.father_name = father_name.trim().to_string();
        record.emergency_contact = father_phone.trim().to_string();
        Ok(())
    }

    /// Merge a readiness update and return the result
    pub fn update_delivery_readiness(
        &mut self,
        id: &str,
        update: DeliveryReadinessUpdate,
    ) -> Result<DeliveryReadiness, JananiError> {
        if let Some(score) = update.score {
            if score > MAX_READINESS_SCORE {
                return Err(JananiError::Validation(format!("Invalid readiness score: {}", score)));
            }
        }
        if let Some(level) = update.stress_level {
            if !(1..=MAX_STRESS_LEVEL).contains(&level) {
                return Err(JananiError::Validation(format!("Invalid stress level: {}", level)));
            }
        }
        let checklist = update.checklist.map(|items| clean_items(&items)).transpose()?;
        let practiced = update.practiced.map(|items| clean_items(&items)).transpose()?;

        let record = Self::find_mut(&mut self.mothers, id)?;
        let readiness = &mut record.delivery_readiness;
        if let Some(checklist) = checklist {
            readiness.checklist = checklist;
        }
        if let Some(practiced) = practiced {
            readiness.practiced = practiced;
        }
        if let Some(score) = update.score {
            readiness.score = score;
        }
        if let Some(level) = update.stress_level {
            readiness.stress_level = level;
        }
        debug!("Mother {}: delivery readiness score {}", id, readiness.score);
        Ok(readiness.clone())
    }

    // =========================================================================
    // Visits, father tasks, chat
    // =========================================================================

    pub fn add_visit(&mut self, visit: NewVisit) -> Result<Visit, JananiError> {
        if let Some(bp) = visit.bp.as_deref() {
            bp.parse::<BloodPressure>()?;
        }
        if let Some(weight) = visit.weight {
            validate_weight(weight)?;
        }
        self.find(&visit.mother_id)?;

        let visit = Visit {
            id: Uuid::new_v4().to_string(),
            mother_id: visit.mother_id,
            date: visit.date,
            notes: visit.notes,
            kind: visit.kind,
            bp: visit.bp,
            weight: visit.weight,
            risk_found: visit.risk_found,
        };
        self.visits.push_front(visit.clone());
        Ok(visit)
    }

    /// Visits, newest first
    pub fn visits(&self) -> Vec<Visit> {
        self.visits.iter().cloned().collect()
    }

    pub fn father_tasks(&self) -> &[FatherTask] {
        &self.father_tasks
    }

    pub fn toggle_father_task(&mut self, id: &str) -> Result<FatherTask, JananiError> {
        let task = self
            .father_tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| JananiError::NotFound(format!("Task not found: {}", id)))?;
        task.done = !task.done;
        Ok(task.clone())
    }

    pub fn send_chat_message(
        &mut self,
        from: ChatSender,
        message: &str,
    ) -> Result<ChatMessage, JananiError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(JananiError::Validation("Message must not be empty".into()));
        }
        let msg = ChatMessage {
            id: Uuid::new_v4().to_string(),
            from,
            message: message.to_string(),
            timestamp: self.now(),
        };
        self.chat.push(msg.clone());
        Ok(msg)
    }

    /// Chat thread, oldest first
    pub fn chat_messages(&self) -> &[ChatMessage] {
        &self.chat
    }

    // =========================================================================
    // Notifications and reporting
    // =========================================================================

    pub fn notifications_for(&self, audience: Audience) -> Vec<Notification> {
        self.notifications.for_role(audience)
    }

    pub fn unread_count(&self, audience: Audience) -> usize {
        self.notifications.unread_count(audience)
    }

    /// Mark read only if the notification is addressed to `audience`
    pub fn mark_notification_read(&mut self, id: u64, audience: Audience) -> bool {
        self.notifications.mark_read(id, audience)
    }

    pub fn generate_report(&self) -> CareReport {
        let today = self.today();
        let verified = self.mothers.iter().filter(|m| m.verified).count();
        let needs_attention = self
            .mothers
            .iter()
            .filter(|m| !rules::needs_attention(m).is_empty())
            .count();
        CareReport {
            total: self.mothers.len(),
            high_risk: self
                .mothers
                .iter()
                .filter(|m| m.risk_level == RiskLevel::High)
                .count(),
            overdue_anc: self
                .mothers
                .iter()
                .filter(|m| rules::check_overdue_anc(m.anc_visits, m.pregnancy_week(today)))
                .count(),
            needs_attention,
            verified,
            home_visits: self.visits.len(),
            pending: self.mothers.len() - verified,
        }
    }
}

/// Trim list entries, reject blanks and drop repeats
fn clean_items(items: &[String]) -> Result<Vec<String>, JananiError> {
    let mut cleaned: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if item.is_empty() {
            return Err(JananiError::Validation("List entries must not be empty".into()));
        }
        if !cleaned.iter().any(|c| c == item) {
            cleaned.push(item.to_string());
        }
    }
    Ok(cleaned)
}

fn validate_weight(weight: f64) -> Result<(), JananiError> {
    if !weight.is_finite() || weight <= 0.0 || weight > MAX_WEIGHT_KG {
        return Err(JananiError::Validation(format!("Invalid weight: {}", weight)));
    }
    Ok(())
}
