//! Risk and eligibility rules
//!
//! Pure functions over record fields. The store applies them and decides
//! which notifications to emit.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use super::record::{BloodGroup, MaternalRecord, RiskLevel};

/// Symptoms that are an emergency on their own
pub const CRITICAL_SYMPTOMS: &[&str] = &["Vaginal bleeding", "Convulsions", "Water breaking early"];

/// Number of simultaneous symptoms treated as an emergency
pub const CRITICAL_SYMPTOM_COUNT: usize = 3;

/// Pre-existing conditions that make a pregnancy high risk
pub const HIGH_RISK_CONDITIONS: &[&str] = &[
    "High Blood Pressure",
    "Diabetes",
    "Heart Disease",
    "Epilepsy",
    "Severe Anemia",
];

/// Weight gain (kg) above which a change is abnormal
pub const MAX_WEIGHT_GAIN: f64 = 3.0;

/// Weight loss (kg) beyond which a change is abnormal
pub const MAX_WEIGHT_LOSS: f64 = 2.0;

/// Hemoglobin (g/dL) below which anemia is severe
pub const SEVERE_ANEMIA_HEMOGLOBIN: f64 = 9.0;

/// ANC visits below which a mother is flagged on the worker dashboard
pub const MIN_ANC_VISITS: u32 = 2;

/// Inputs the eligibility rules depend on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EligibilityInputs {
    pub anc_visits: u32,
    pub pregnancy_week: u32,
    pub age: u32,
    pub risk_level: RiskLevel,
}

impl EligibilityInputs {
    pub fn of(record: &MaternalRecord, today: NaiveDate) -> Self {
        Self {
            anc_visits: record.anc_visits,
            pregnancy_week: record.pregnancy_week(today),
            age: record.age,
            risk_level: record.risk_level,
        }
    }
}

/// Scheme eligibility.
///
/// Risk level is carried in the inputs but no scheme currently excludes
/// high-risk mothers.
pub fn evaluate_eligibility(inputs: &EligibilityInputs) -> super::record::Eligibility {
    super::record::Eligibility {
        maternity_benefit: inputs.anc_visits >= 1 && inputs.pregnancy_week >= 6,
        delivery_incentive: inputs.age >= 19,
        nutrition_support: inputs.pregnancy_week >= 12,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightChange {
    pub abnormal: bool,
    pub delta: f64,
}

/// Compare two scale readings.
///
/// The delta is rounded to 0.1 kg before the thresholds apply, so one-decimal
/// readings compare the way they were written.
pub fn evaluate_weight_change(previous: f64, new: f64) -> WeightChange {
    let delta = ((new - previous) * 10.0).round() / 10.0;
    WeightChange {
        abnormal: delta > MAX_WEIGHT_GAIN || delta < -MAX_WEIGHT_LOSS,
        delta,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Urgency {
    Normal,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymptomAssessment {
    pub urgency: Urgency,
    pub merged_signs: Vec<String>,
}

/// Classify a symptom report and merge it into the existing danger signs.
///
/// The merge keeps first-seen order and drops duplicates.
pub fn evaluate_symptom_report(existing: &[String], new: &[String]) -> SymptomAssessment {
    let urgency = if new.is_empty() {
        Urgency::Normal
    } else if new.len() >= CRITICAL_SYMPTOM_COUNT
        || new.iter().any(|s| CRITICAL_SYMPTOMS.contains(&s.as_str()))
    {
        Urgency::Critical
    } else {
        Urgency::Warning
    };

    let mut merged_signs: Vec<String> = Vec::with_capacity(existing.len() + new.len());
    for sign in existing.iter().chain(new.iter()) {
        if !merged_signs.contains(sign) {
            merged_signs.push(sign.clone());
        }
    }

    SymptomAssessment {
        urgency,
        merged_signs,
    }
}

pub fn has_high_risk_condition(conditions: &[String]) -> bool {
    conditions
        .iter()
        .any(|c| HIGH_RISK_CONDITIONS.contains(&c.as_str()))
}

/// True when the conditions should escalate a record that is not yet high risk
pub fn evaluate_medical_history_risk(conditions: &[String], current_risk: RiskLevel) -> bool {
    current_risk != RiskLevel::High && has_high_risk_condition(conditions)
}

/// Rh-negative groups need anti-D follow-up
pub fn evaluate_blood_group_alert(blood_group: BloodGroup) -> bool {
    matches!(
        blood_group,
        BloodGroup::ANegative | BloodGroup::BNegative | BloodGroup::ONegative | BloodGroup::AbNegative
    )
}

/// `MCP-<year>-<last four digits of the millisecond timestamp>`
pub fn assign_mcp_number(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().rem_euclid(10_000);
    format!("MCP-{}-{:04}", now.year(), millis)
}

/// Why a mother shows up on the worker's attention list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionReason {
    HighRisk,
    SevereAnemia,
    MissedAnc,
}

/// Reasons the worker should look at this record; empty when none apply
pub fn needs_attention(record: &MaternalRecord) -> Vec<AttentionReason> {
    let mut reasons = Vec::new();
    if record.risk_level == RiskLevel::High {
        reasons.push(AttentionReason::HighRisk);
    }
    if record.hemoglobin < SEVERE_ANEMIA_HEMOGLOBIN {
        reasons.push(AttentionReason::SevereAnemia);
    }
    if record.anc_visits < MIN_ANC_VISITS {
        reasons.push(AttentionReason::MissedAnc);
    }
    reasons
}

/// One ANC visit is expected per ten completed weeks
pub fn check_overdue_anc(anc_visits: u32, pregnancy_week: u32) -> bool {
    anc_visits < pregnancy_week / 10
}
