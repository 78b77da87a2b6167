//! Pure payload builders for the notification emails. No I/O happens here;
//! `today`/`tomorrow` are always passed in by the caller.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::treatment::Treatment;
use crate::services::treatments::{PetDue, PetMonthly};

const UNSPECIFIED: &str = "Não especificado";

/// One treatment as rendered in the daily reminder.
#[derive(Debug, Clone, Serialize)]
pub struct TreatmentLine {
    pub name: String,
    pub category: String,
    pub description: String,
    pub time: String,
    pub applier_type: String,
    pub applier_name: String,
}

/// Daily reminder payload, one per pet.
#[derive(Debug, Serialize)]
pub struct DailyReport {
    pub pet_name: String,
    pub pet_nickname: String,
    /// Data dos tratamentos (amanhã), d/m/Y.
    pub date: String,
    pub treatments: Vec<TreatmentLine>,
    pub total_treatments: usize,
}

/// One treatment as rendered in the monthly digest; `days_late` is only set
/// on expired entries.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyLine {
    pub name: String,
    pub category: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub applier_type: String,
    pub applier_name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_late: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PetSection {
    pub pet_name: String,
    pub pet_nickname: String,
    pub current_month_treatments: Vec<MonthlyLine>,
    pub expired_treatments: Vec<MonthlyLine>,
    pub total_current_treatments: usize,
    pub total_expired_treatments: usize,
    pub has_current_treatments: bool,
    pub has_expired_treatments: bool,
}

/// Consolidated monthly digest payload, one per tutor covering all their pets.
#[derive(Debug, Serialize)]
pub struct MonthlyReport {
    pub current_month: String,
    pub pets: Vec<PetSection>,
    pub total_pets: usize,
    pub total_current_treatments: usize,
    pub total_expired_treatments: usize,
    pub has_treatments: bool,
    pub report_date: String,
}

pub fn daily_report(pet: &PetDue, tomorrow: NaiveDate) -> DailyReport {
    let treatments: Vec<TreatmentLine> = pet.treatments.iter().map(treatment_line).collect();
    DailyReport {
        pet_name: pet.name.clone(),
        pet_nickname: pet.nickname.clone(),
        date: fmt_date_br(tomorrow),
        total_treatments: treatments.len(),
        treatments,
    }
}

pub fn monthly_report(pets: &[PetMonthly], today: NaiveDate) -> MonthlyReport {
    let mut sections = Vec::with_capacity(pets.len());
    let mut total_current = 0;
    let mut total_expired = 0;

    for pet in pets {
        let current: Vec<MonthlyLine> = pet
            .current_month
            .iter()
            .map(|t| monthly_line(t, "Agendado", None))
            .collect();
        let expired: Vec<MonthlyLine> = pet
            .expired
            .iter()
            .map(|t| monthly_line(t, "Expirado", Some((today - t.date).num_days())))
            .collect();

        total_current += current.len();
        total_expired += expired.len();

        sections.push(PetSection {
            pet_name: pet.name.clone(),
            pet_nickname: pet.nickname.clone(),
            total_current_treatments: current.len(),
            total_expired_treatments: expired.len(),
            has_current_treatments: !current.is_empty(),
            has_expired_treatments: !expired.is_empty(),
            current_month_treatments: current,
            expired_treatments: expired,
        });
    }

    MonthlyReport {
        current_month: fmt_month_br(today),
        total_pets: sections.len(),
        pets: sections,
        total_current_treatments: total_current,
        total_expired_treatments: total_expired,
        has_treatments: total_current > 0 || total_expired > 0,
        report_date: fmt_date_br(today),
    }
}

fn treatment_line(t: &Treatment) -> TreatmentLine {
    TreatmentLine {
        name: t.name.clone(),
        category: t.category.clone(),
        description: t.description.clone().unwrap_or_default(),
        time: fmt_time(t),
        applier_type: t.applier_type.clone(),
        applier_name: t.applier_name.clone().unwrap_or_default(),
    }
}

fn monthly_line(t: &Treatment, status: &str, days_late: Option<i64>) -> MonthlyLine {
    MonthlyLine {
        name: t.name.clone(),
        category: t.category.clone(),
        description: t.description.clone().unwrap_or_default(),
        date: fmt_date_br(t.date),
        time: fmt_time(t),
        applier_type: t.applier_type.clone(),
        applier_name: t.applier_name.clone().unwrap_or_default(),
        status: status.to_string(),
        days_late,
    }
}

fn fmt_time(t: &Treatment) -> String {
    match t.time {
        Some(time) => time.format("%H:%M").to_string(),
        None => UNSPECIFIED.to_string(),
    }
}

pub fn fmt_date_br(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Nome do mês por extenso, ex: "agosto de 2025".
pub fn fmt_month_br(date: NaiveDate) -> String {
    let months = [
        "janeiro", "fevereiro", "março", "abril", "maio", "junho",
        "julho", "agosto", "setembro", "outubro", "novembro", "dezembro",
    ];
    format!("{} de {}", months[date.month0() as usize], date.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};
    use uuid::Uuid;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn treatment(date: NaiveDate) -> Treatment {
        Treatment {
            id: Uuid::new_v4(),
            pet_id: Uuid::new_v4(),
            category: "Vacinas".into(),
            name: "Antirrábica".into(),
            description: Some("Vacina anual obrigatória".into()),
            date,
            time: Some(NaiveTime::from_hms_opt(14, 0, 0).unwrap()),
            done: false,
            applier_type: "Veterinarian".into(),
            applier_name: Some("Dr. Silva".into()),
            applier_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn bare_treatment(date: NaiveDate) -> Treatment {
        Treatment {
            description: None,
            time: None,
            applier_name: None,
            ..treatment(date)
        }
    }

    fn pet_due(treatments: Vec<Treatment>) -> PetDue {
        PetDue {
            pet_id: Uuid::new_v4(),
            name: "Rex".into(),
            nickname: "rex_1234".into(),
            accessor_ids: vec!["auth0|user1".into()],
            treatments,
        }
    }

    #[test]
    fn test_daily_report_fields() {
        let tomorrow = d(2025, 11, 9);
        let report = daily_report(&pet_due(vec![treatment(tomorrow)]), tomorrow);

        assert_eq!(report.pet_name, "Rex");
        assert_eq!(report.pet_nickname, "rex_1234");
        assert_eq!(report.date, "09/11/2025");
        assert_eq!(report.total_treatments, 1);
        let line = &report.treatments[0];
        assert_eq!(line.name, "Antirrábica");
        assert_eq!(line.category, "Vacinas");
        assert_eq!(line.time, "14:00");
        assert_eq!(line.applier_name, "Dr. Silva");
    }

    #[test]
    fn test_daily_report_defaults_for_missing_optionals() {
        let tomorrow = d(2025, 11, 9);
        let report = daily_report(&pet_due(vec![bare_treatment(tomorrow)]), tomorrow);

        let line = &report.treatments[0];
        assert_eq!(line.description, "");
        assert_eq!(line.time, "Não especificado");
        assert_eq!(line.applier_name, "");
    }

    #[test]
    fn test_monthly_report_days_late() {
        let today = d(2025, 8, 8);
        let pet = PetMonthly {
            pet_id: Uuid::new_v4(),
            name: "Rex".into(),
            nickname: "rex_1234".into(),
            accessor_ids: vec![],
            current_month: vec![treatment(d(2025, 8, 20))],
            expired: vec![
                bare_treatment(today - chrono::Duration::days(1)),
                bare_treatment(today - chrono::Duration::days(40)),
            ],
        };

        let report = monthly_report(&[pet], today);
        assert_eq!(report.total_pets, 1);
        assert_eq!(report.total_current_treatments, 1);
        assert_eq!(report.total_expired_treatments, 2);
        assert!(report.has_treatments);

        let section = &report.pets[0];
        assert_eq!(section.current_month_treatments[0].status, "Agendado");
        assert_eq!(section.current_month_treatments[0].days_late, None);
        assert_eq!(section.expired_treatments[0].status, "Expirado");
        assert_eq!(section.expired_treatments[0].days_late, Some(1));
        assert_eq!(section.expired_treatments[1].days_late, Some(40));
    }

    #[test]
    fn test_monthly_report_empty() {
        let report = monthly_report(&[], d(2025, 8, 8));
        assert_eq!(report.total_pets, 0);
        assert!(!report.has_treatments);
        assert_eq!(report.current_month, "agosto de 2025");
        assert_eq!(report.report_date, "08/08/2025");
    }

    #[test]
    fn test_month_name_localization() {
        assert_eq!(fmt_month_br(d(2025, 1, 15)), "janeiro de 2025");
        assert_eq!(fmt_month_br(d(2025, 12, 31)), "dezembro de 2025");
    }
}
