//! Maternal health record and its derived pregnancy timeline

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::db::MotherRow;
use crate::types::JananiError;

/// Days from LMP to the estimated due date (40 weeks)
pub const GESTATION_DAYS: i64 = 280;

/// Upper clamp for the derived pregnancy week
pub const MAX_PREGNANCY_WEEK: u32 = 42;

/// Stress level a new record starts at, on a 1-10 scale
pub const DEFAULT_STRESS_LEVEL: u8 = 3;

/// Completed weeks since LMP on `today`, clamped to `[0, 42]`
pub fn pregnancy_week(lmp: NaiveDate, today: NaiveDate) -> u32 {
    let days = (today - lmp).num_days();
    if days <= 0 {
        return 0;
    }
    ((days / 7) as u32).min(MAX_PREGNANCY_WEEK)
}

/// Estimated due date: LMP + 280 days
pub fn due_date(lmp: NaiveDate) -> NaiveDate {
    lmp + Duration::days(GESTATION_DAYS)
}

/// Parse an ISO `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate, JananiError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| JananiError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", value)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Active,
}

/// ABO group with Rh factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[default]
    Unknown,
}

impl BloodGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            BloodGroup::APositive => "A+",
            BloodGroup::ANegative => "A-",
            BloodGroup::BPositive => "B+",
            BloodGroup::BNegative => "B-",
            BloodGroup::OPositive => "O+",
            BloodGroup::ONegative => "O-",
            BloodGroup::AbPositive => "AB+",
            BloodGroup::AbNegative => "AB-",
            BloodGroup::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodGroup {
    type Err = JananiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A+" => Ok(BloodGroup::APositive),
            "A-" => Ok(BloodGroup::ANegative),
            "B+" => Ok(BloodGroup::BPositive),
            "B-" => Ok(BloodGroup::BNegative),
            "O+" => Ok(BloodGroup::OPositive),
            "O-" => Ok(BloodGroup::ONegative),
            "AB+" => Ok(BloodGroup::AbPositive),
            "AB-" => Ok(BloodGroup::AbNegative),
            "" | "UNKNOWN" => Ok(BloodGroup::Unknown),
            other => Err(JananiError::Validation(format!("Unknown blood group: {}", other))),
        }
    }
}

/// Blood pressure reading in mmHg, written "systolic/diastolic"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloodPressure {
    pub systolic: u16,
    pub diastolic: u16,
}

impl FromStr for BloodPressure {
    type Err = JananiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            JananiError::Validation(format!(
                "Invalid blood pressure '{}', expected systolic/diastolic",
                s
            ))
        };
        let (sys, dia) = s.trim().split_once('/').ok_or_else(invalid)?;
        let systolic: u16 = sys.trim().parse().map_err(|_| invalid())?;
        let diastolic: u16 = dia.trim().parse().map_err(|_| invalid())?;
        if systolic == 0 || diastolic == 0 || diastolic >= systolic {
            return Err(invalid());
        }
        Ok(Self {
            systolic,
            diastolic,
        })
    }
}

impl fmt::Display for BloodPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.systolic, self.diastolic)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSample {
    pub date: NaiveDate,
    pub weight: f64,
}

/// Self-reported medical history.
///
/// Field names match the JSON document stored in `mothers.pre_existing_conditions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalHistory {
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub other_condition: String,
    #[serde(default)]
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub name: String,
    pub relation: String,
    pub phone: String,
}

/// Labour preparation progress tracked by the mother
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReadiness {
    pub checklist: Vec<String>,
    pub score: u32,
    /// Breathing and positioning exercises practiced so far
    pub practiced: Vec<String>,
    pub stress_level: u8,
}

impl Default for DeliveryReadiness {
    fn default() -> Self {
        Self {
            checklist: Vec::new(),
            score: 0,
            practiced: Vec::new(),
            stress_level: DEFAULT_STRESS_LEVEL,
        }
    }
}

/// Scheme eligibility triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Eligibility {
    /// Maternity benefit (PMMVY)
    pub maternity_benefit: bool,
    /// Institutional delivery incentive (JSY)
    pub delivery_incentive: bool,
    /// Supplementary nutrition
    pub nutrition_support: bool,
}

/// Last computed eligibility together with when it was computed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EligibilitySnapshot {
    #[serde(flatten)]
    pub eligibility: Eligibility,
    pub evaluated_at: DateTime<Utc>,
}

/// The in-session model of one mother
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaternalRecord {
    pub id: String,
    /// Owning account, when the record came from registration
    pub user_id: Option<i64>,
    pub name: String,
    pub age: u32,
    pub village: String,
    pub location: String,
    pub phone: String,
    pub email: Option<String>,

    /// Last menstrual period; pregnancy week and due date derive from it
    pub lmp_date: Option<NaiveDate>,

    pub weight: f64,
    pub weight_history: Vec<WeightSample>,
    pub bp: String,
    pub hemoglobin: f64,
    pub ifa_tablets: u32,
    pub ifa_missed_days: u32,
    pub tt_vaccine: bool,
    pub anc_visits: u32,

    pub risk_level: RiskLevel,
    pub scheme_eligibility: Option<EligibilitySnapshot>,
    pub danger_signs: Vec<String>,

    pub status: VerificationStatus,
    pub verified: bool,
    pub mcp_number: String,

    pub blood_group: BloodGroup,
    pub medical_history: MedicalHistory,

    pub father_name: String,
    pub emergency_contact: String,
    pub family_members: Vec<FamilyMember>,
    pub birth_preparedness: BTreeMap<String, bool>,
    pub transport_ready: bool,
    pub hospital_bag_items: BTreeMap<String, bool>,
    pub hospital_bag_ready: bool,
    pub delivery_readiness: DeliveryReadiness,
}

impl MaternalRecord {
    /// Fresh record with default vitals
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: None,
            name: name.into(),
            age: 0,
            village: String::new(),
            location: String::new(),
            phone: String::new(),
            email: None,
            lmp_date: None,
            weight: 60.0,
            weight_history: Vec::new(),
            bp: "120/80".to_string(),
            hemoglobin: 12.0,
            ifa_tablets: 0,
            ifa_missed_days: 0,
            tt_vaccine: false,
            anc_visits: 0,
            risk_level: RiskLevel::Low,
            scheme_eligibility: None,
            danger_signs: Vec::new(),
            status: VerificationStatus::Pending,
            verified: false,
            mcp_number: String::new(),
            blood_group: BloodGroup::Unknown,
            medical_history: MedicalHistory::default(),
            father_name: String::new(),
            emergency_contact: String::new(),
            family_members: Vec::new(),
            birth_preparedness: BTreeMap::new(),
            transport_ready: false,
            hospital_bag_items: BTreeMap::new(),
            hospital_bag_ready: false,
            delivery_readiness: DeliveryReadiness::default(),
        }
    }

    /// Build a record from a persisted mother profile.
    ///
    /// Unparseable optional columns fall back to defaults; risk starts at
    /// `high` for an Rh-negative blood group or a high-risk recorded condition.
    pub fn from_row(row: &MotherRow) -> Self {
        let mut record = Self::new(row.id.to_string(), row.full_name.clone().unwrap_or_default());
        record.user_id = Some(row.user_id);
        record.age = row.age.and_then(|a| u32::try_from(a).ok()).unwrap_or(0);
        record.village = row.village.clone().unwrap_or_default();
        record.location = row.location.clone().unwrap_or_default();
        record.phone = row.phone_number.clone().unwrap_or_default();
        record.emergency_contact = record.phone.clone();
        record.email = Some(row.email.clone());

        record.lmp_date = row.lmp_date.as_deref().and_then(|d| match parse_date(d) {
            Ok(date) => Some(date),
            Err(e) => {
                warn!("Mother {}: ignoring stored LMP: {}", row.id, e);
                None
            }
        });

        record.blood_group = row
            .blood_group
            .as_deref()
            .and_then(|g| g.parse().ok())
            .unwrap_or_default();

        if let Some(json) = row.pre_existing_conditions.as_deref() {
            match serde_json::from_str::<MedicalHistory>(json) {
                Ok(history) => record.medical_history = history,
                Err(e) => warn!("Mother {}: ignoring stored medical history: {}", row.id, e),
            }
        }

        if super::rules::evaluate_blood_group_alert(record.blood_group)
            || super::rules::has_high_risk_condition(&record.medical_history.conditions)
        {
            record.risk_level = RiskLevel::High;
        }

        record
    }

    pub fn pregnancy_week(&self, today: NaiveDate) -> u32 {
        self.lmp_date.map(|lmp| pregnancy_week(lmp, today)).unwrap_or(0)
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.lmp_date.map(due_date)
    }

    /// Move risk toward `high`; never lowers it
    pub fn escalate_risk(&mut self, to: RiskLevel) -> bool {
        if to > self.risk_level {
            self.risk_level = to;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_pregnancy_week_and_due_date() {
        let lmp = date("2025-08-15");
        assert_eq!(pregnancy_week(lmp, date("2025-12-01")), 15);
        assert_eq!(due_date(lmp), date("2026-05-22"));
    }

    #[test]
    fn test_pregnancy_week_clamps() {
        let lmp = date("2025-08-15");
        assert_eq!(pregnancy_week(lmp, date("2025-08-01")), 0);
        assert_eq!(pregnancy_week(lmp, date("2025-08-21")), 0);
        assert_eq!(pregnancy_week(lmp, date("2025-08-22")), 1);
        assert_eq!(pregnancy_week(lmp, date("2027-01-01")), MAX_PREGNANCY_WEEK);
    }

    #[test]
    fn test_blood_group_parsing() {
        assert_eq!("ab-".parse::<BloodGroup>().unwrap(), BloodGroup::AbNegative);
        assert_eq!("O+".parse::<BloodGroup>().unwrap(), BloodGroup::OPositive);
        assert_eq!("Unknown".parse::<BloodGroup>().unwrap(), BloodGroup::Unknown);
        assert!("C+".parse::<BloodGroup>().is_err());
        assert_eq!(
            serde_json::to_string(&BloodGroup::BNegative).unwrap(),
            "\"B-\""
        );
    }

    #[test]
    fn test_blood_pressure_parsing() {
        let bp: BloodPressure = "140/95".parse().unwrap();
        assert_eq!(bp.systolic, 140);
        assert_eq!(bp.diastolic, 95);
        assert!("140".parse::<BloodPressure>().is_err());
        assert!("80/120".parse::<BloodPressure>().is_err());
        assert!("abc/def".parse::<BloodPressure>().is_err());
    }

    #[test]
    fn test_escalate_risk_is_monotone() {
        let mut record = MaternalRecord::new("m1", "Priya");
        assert!(record.escalate_risk(RiskLevel::Medium));
        assert!(record.escalate_risk(RiskLevel::High));
        assert!(!record.escalate_risk(RiskLevel::Low));
        assert_eq!(record.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_from_row_applies_defaults_and_initial_risk() {
        let row = MotherRow {
            id: 7,
            user_id: 3,
            full_name: Some("Anita Devi".into()),
            age: Some(22),
            phone_number: Some("9876543211".into()),
            village: Some("Jayanagar".into()),
            location: Some("Bangalore South".into()),
            blood_group: Some("B-".into()),
            pre_existing_conditions: Some(r#"{"conditions":["Asthma"],"otherCondition":"","lastUpdated":""}"#.into()),
            lmp_date: Some("2025-07-01".into()),
            created_at: "2026-01-01T00:00:00.000Z".into(),
            email: "anita@example.com".into(),
        };

        let record = MaternalRecord::from_row(&row);
        assert_eq!(record.id, "7");
        assert_eq!(record.user_id, Some(3));
        assert_eq!(record.emergency_contact, "9876543211");
        assert_eq!(record.medical_history.conditions, vec!["Asthma".to_string()]);
        assert_eq!(record.risk_level, RiskLevel::High);
        assert_eq!(record.due_date(), Some(date("2026-04-07")));
        assert_eq!(record.status, VerificationStatus::Pending);
        assert_eq!(record.delivery_readiness.stress_level, DEFAULT_STRESS_LEVEL);
    }

    #[test]
    fn test_from_row_high_risk_condition_starts_high() {
        let row = MotherRow {
            id: 8,
            user_id: 4,
            full_name: Some("Kavita Gowda".into()),
            age: Some(28),
            phone_number: None,
            village: None,
            location: None,
            blood_group: Some("O+".into()),
            pre_existing_conditions: Some(r#"{"conditions":["Diabetes"]}"#.into()),
            lmp_date: None,
            created_at: "2026-01-01T00:00:00.000Z".into(),
            email: "kavita@example.com".into(),
        };
        assert_eq!(MaternalRecord::from_row(&row).risk_level, RiskLevel::High);

        let plain = MotherRow {
            pre_existing_conditions: None,
            ..row
        };
        assert_eq!(MaternalRecord::from_row(&plain).risk_level, RiskLevel::Low);
    }
}
