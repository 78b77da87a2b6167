use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreatmentCategory {
    #[serde(rename = "Vacinas")]
    Vaccine,
    #[serde(rename = "Ectoparasitas")]
    Ectoparasiticide,
    #[serde(rename = "Vermífugo")]
    Vermifuge,
    #[serde(rename = "Tratamentos")]
    Other,
}

impl std::fmt::Display for TreatmentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TreatmentCategory::Vaccine => "Vacinas",
            TreatmentCategory::Ectoparasiticide => "Ectoparasitas",
            TreatmentCategory::Vermifuge => "Vermífugo",
            TreatmentCategory::Other => "Tratamentos",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TreatmentCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Vacinas" => Ok(TreatmentCategory::Vaccine),
            "Ectoparasitas" => Ok(TreatmentCategory::Ectoparasiticide),
            "Vermífugo" => Ok(TreatmentCategory::Vermifuge),
            "Tratamentos" => Ok(TreatmentCategory::Other),
            _ => Err(anyhow::anyhow!("Categoria desconhecida: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplierType {
    Veterinarian,
    Tutor,
}

impl std::fmt::Display for ApplierType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ApplierType::Veterinarian => "Veterinarian",
            ApplierType::Tutor => "Tutor",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ApplierType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Veterinarian" => Ok(ApplierType::Veterinarian),
            "Tutor" => Ok(ApplierType::Tutor),
            _ => Err(anyhow::anyhow!("Tipo de aplicador desconhecido: {s}")),
        }
    }
}

/// Derived scheduling state: `done` wins over the date; a treatment dated
/// today is still Scheduled (the expiry boundary is strictly before today).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TreatmentStatus {
    Scheduled,
    Expired,
    Done,
}

/// DB row struct — category/applier_type are fetched as TEXT; values are
/// constrained by the typed request DTOs and the DB check constraints.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Treatment {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub category: String,
    pub name: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub done: bool,
    pub applier_type: String,
    pub applier_name: Option<String>,
    pub applier_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Treatment {
    pub fn status_on(&self, today: NaiveDate) -> TreatmentStatus {
        if self.done {
            TreatmentStatus::Done
        } else if self.date < today {
            TreatmentStatus::Expired
        } else {
            TreatmentStatus::Scheduled
        }
    }
}

// Request DTOs; the fixed enumerations are validated here, at deserialization.
#[derive(Debug, Deserialize)]
pub struct CreateTreatmentRequest {
    pub category: TreatmentCategory,
    pub name: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub done: bool,
    pub applier_type: ApplierType,
    pub applier_name: Option<String>,
    pub applier_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTreatmentRequest {
    pub category: Option<TreatmentCategory>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub done: Option<bool>,
    pub applier_type: Option<ApplierType>,
    pub applier_name: Option<String>,
    pub applier_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn treatment(date: NaiveDate, done: bool) -> Treatment {
        Treatment {
            id: Uuid::new_v4(),
            pet_id: Uuid::new_v4(),
            category: "Vacinas".into(),
            name: "Antirrábica".into(),
            description: None,
            date,
            time: None,
            done,
            applier_type: "Tutor".into(),
            applier_name: None,
            applier_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_status_done_wins_over_date() {
        let today = d(2025, 8, 8);
        assert_eq!(
            treatment(d(2025, 1, 1), true).status_on(today),
            TreatmentStatus::Done
        );
        assert_eq!(
            treatment(d(2025, 12, 1), true).status_on(today),
            TreatmentStatus::Done
        );
    }

    #[test]
    fn test_status_today_is_not_expired() {
        let today = d(2025, 8, 8);
        assert_eq!(
            treatment(today, false).status_on(today),
            TreatmentStatus::Scheduled
        );
        assert_eq!(
            treatment(d(2025, 8, 7), false).status_on(today),
            TreatmentStatus::Expired
        );
        assert_eq!(
            treatment(d(2025, 8, 9), false).status_on(today),
            TreatmentStatus::Scheduled
        );
    }

    #[test]
    fn test_category_labels_round_trip() {
        for label in ["Vacinas", "Ectoparasitas", "Vermífugo", "Tratamentos"] {
            let cat: TreatmentCategory = label.parse().unwrap();
            assert_eq!(cat.to_string(), label);
        }
        assert!("Banho".parse::<TreatmentCategory>().is_err());
    }

    #[test]
    fn test_applier_type_round_trip() {
        assert_eq!(
            "Veterinarian".parse::<ApplierType>().unwrap(),
            ApplierType::Veterinarian
        );
        assert_eq!(ApplierType::Tutor.to_string(), "Tutor");
        assert!("Groomer".parse::<ApplierType>().is_err());
    }
}
