//! Batch drivers for the two notification runs: the daily reminder (treatments
//! scheduled for tomorrow, one email per pet per tutor) and the monthly digest
//! (current month + overdue, one consolidated email per tutor).
//!
//! Only the initial fetch can flip `success` to false; every per-recipient
//! failure is collected into `errors` and the run keeps going.

use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info};

use crate::models::profile::TutorContact;
use crate::services::mailer::Mailer;
use crate::services::profiles::ProfileService;
use crate::services::report::{daily_report, monthly_report};
use crate::services::treatments::{
    merge_monthly_windows, month_bounds, PetDue, PetMonthly, TreatmentService,
};

pub struct NotificationService;

#[derive(Debug, Serialize)]
pub struct DailySummary {
    pub success: bool,
    pub message: String,
    pub total_pets: usize,
    pub emails_sent: usize,
    pub errors: Vec<String>,
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
pub struct MonthlySummary {
    pub success: bool,
    pub message: String,
    pub total_pets: usize,
    pub total_tutors: usize,
    pub emails_sent: usize,
    pub total_current_treatments: usize,
    pub total_expired_treatments: usize,
    pub errors: Vec<String>,
    pub dry_run: bool,
}

/// Ephemeral per-tutor aggregation built for one run and discarded after
/// dispatch.
#[derive(Debug)]
pub struct TutorBundle {
    pub tutor: TutorContact,
    pub pets: Vec<PetMonthly>,
}

impl NotificationService {
    pub async fn run_daily(pool: &PgPool, mailer: &Mailer, dry_run: bool) -> DailySummary {
        Self::run_daily_for(pool, mailer, dry_run, Local::now().date_naive()).await
    }

    pub async fn run_daily_for(
        pool: &PgPool,
        mailer: &Mailer,
        dry_run: bool,
        today: NaiveDate,
    ) -> DailySummary {
        info!("Iniciando processamento de notificações diárias");
        let tomorrow = today + Duration::days(1);

        let pets = match Self::fetch_daily(pool, tomorrow).await {
            Ok(pets) => pets,
            Err(e) => {
                error!("Erro ao buscar tratamentos de amanhã: {e}");
                return DailySummary {
                    success: false,
                    message: format!("Erro ao buscar tratamentos: {e}"),
                    total_pets: 0,
                    emails_sent: 0,
                    errors: Vec::new(),
                    dry_run,
                };
            }
        };

        if pets.is_empty() {
            info!("Nenhum tratamento encontrado para amanhã");
            return DailySummary {
                success: true,
                message: "Nenhum tratamento agendado para amanhã".into(),
                total_pets: 0,
                emails_sent: 0,
                errors: Vec::new(),
                dry_run,
            };
        }

        let total_pets = pets.len();
        let mut emails_sent = 0;
        let mut errors = Vec::new();

        for (pet, tutors) in &pets {
            let report = daily_report(pet, tomorrow);
            for tutor in tutors {
                let result = mailer
                    .send_daily_reminder(&tutor.email, &tutor.name, &report, dry_run)
                    .await;
                if result.success {
                    emails_sent += 1;
                } else {
                    errors.push(result.message);
                }
            }
        }

        let mut message =
            format!("Processamento concluído: {emails_sent} emails enviados para {total_pets} pets");
        if !errors.is_empty() {
            message.push_str(&format!(", {} erros encontrados", errors.len()));
        }
        info!("{message}");

        DailySummary {
            success: true,
            message,
            total_pets,
            emails_sent,
            errors,
            dry_run,
        }
    }

    pub async fn run_monthly(pool: &PgPool, mailer: &Mailer, dry_run: bool) -> MonthlySummary {
        Self::run_monthly_for(pool, mailer, dry_run, Local::now().date_naive()).await
    }

    pub async fn run_monthly_for(
        pool: &PgPool,
        mailer: &Mailer,
        dry_run: bool,
        today: NaiveDate,
    ) -> MonthlySummary {
        info!("Iniciando processamento de relatórios mensais consolidados");

        let pets = match Self::fetch_monthly(pool, today).await {
            Ok(pets) => pets,
            Err(e) => {
                error!("Erro ao buscar tratamentos mensais: {e}");
                return MonthlySummary {
                    success: false,
                    message: format!("Erro ao buscar tratamentos: {e}"),
                    total_pets: 0,
                    total_tutors: 0,
                    emails_sent: 0,
                    total_current_treatments: 0,
                    total_expired_treatments: 0,
                    errors: Vec::new(),
                    dry_run,
                };
            }
        };

        if pets.is_empty() {
            info!("Nenhum tratamento encontrado para relatório mensal");
            return MonthlySummary {
                success: true,
                message: "Nenhum tratamento encontrado para relatório mensal".into(),
                total_pets: 0,
                total_tutors: 0,
                emails_sent: 0,
                total_current_treatments: 0,
                total_expired_treatments: 0,
                errors: Vec::new(),
                dry_run,
            };
        }

        let total_pets = pets.len();
        let bundles = group_by_tutor(pets);
        let total_tutors = bundles.len();

        let mut emails_sent = 0;
        let mut errors = Vec::new();
        let mut total_current = 0;
        let mut total_expired = 0;

        for bundle in &bundles {
            let report = monthly_report(&bundle.pets, today);
            total_current += report.total_current_treatments;
            total_expired += report.total_expired_treatments;

            let result = mailer
                .send_monthly_digest(&bundle.tutor.email, &bundle.tutor.name, &report, dry_run)
                .await;
            if result.success {
                emails_sent += 1;
            } else {
                errors.push(result.message);
            }
        }

        let mut message = format!(
            "Processamento concluído: {emails_sent} relatórios consolidados enviados para \
             {total_tutors} tutores ({total_pets} pets, {total_current} agendados, \
             {total_expired} expirados)"
        );
        if !errors.is_empty() {
            message.push_str(&format!(", {} erros encontrados", errors.len()));
        }
        info!("{message}");

        MonthlySummary {
            success: true,
            message,
            total_pets,
            total_tutors,
            emails_sent,
            total_current_treatments: total_current,
            total_expired_treatments: total_expired,
            errors,
            dry_run,
        }
    }

    /// Fetch + directory resolution for the daily window. Pets whose every
    /// accessor lacks a usable email are dropped here and never counted.
    async fn fetch_daily(
        pool: &PgPool,
        tomorrow: NaiveDate,
    ) -> anyhow::Result<Vec<(PetDue, Vec<TutorContact>)>> {
        let pets = TreatmentService::due_on(pool, tomorrow).await?;
        let mut out = Vec::with_capacity(pets.len());
        for pet in pets {
            let tutors = ProfileService::resolve_notifiable(pool, &pet.accessor_ids).await?;
            if !tutors.is_empty() {
                out.push((pet, tutors));
            }
        }
        Ok(out)
    }

    /// Fetch + merge + directory resolution for the monthly window.
    async fn fetch_monthly(
        pool: &PgPool,
        today: NaiveDate,
    ) -> anyhow::Result<Vec<(PetMonthly, Vec<TutorContact>)>> {
        let (first_day, last_day) = month_bounds(today);
        let current_month = TreatmentService::due_in_range(pool, first_day, last_day).await?;
        let overdue = TreatmentService::overdue_before(pool, today).await?;

        let merged = merge_monthly_windows(current_month, overdue);
        let mut out = Vec::with_capacity(merged.len());
        for pet in merged {
            let tutors = ProfileService::resolve_notifiable(pool, &pet.accessor_ids).await?;
            if !tutors.is_empty() {
                out.push((pet, tutors));
            }
        }
        Ok(out)
    }
}

/// Regroup the pet-keyed monthly data by tutor so each tutor receives exactly
/// one bundle. The key is `id|email` rather than the id alone: a changed
/// email deliberately becomes a fresh grouping.
pub fn group_by_tutor(pets: Vec<(PetMonthly, Vec<TutorContact>)>) -> Vec<TutorBundle> {
    let mut keyed: Vec<(String, TutorBundle)> = Vec::new();

    for (pet, tutors) in pets {
        for tutor in tutors {
            let key = format!("{}|{}", tutor.id, tutor.email);
            match keyed.iter_mut().find(|(k, _)| *k == key) {
                Some((_, bundle)) => bundle.pets.push(pet.clone()),
                None => keyed.push((
                    key,
                    TutorBundle {
                        tutor,
                        pets: vec![pet.clone()],
                    },
                )),
            }
        }
    }

    keyed.into_iter().map(|(_, bundle)| bundle).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn contact(id: &str, email: &str) -> TutorContact {
        TutorContact {
            id: id.into(),
            name: format!("Tutor {id}"),
            email: email.into(),
        }
    }

    fn pet(name: &str) -> PetMonthly {
        PetMonthly {
            pet_id: Uuid::new_v4(),
            name: name.into(),
            nickname: format!("{}_0001", name.to_lowercase()),
            accessor_ids: vec![],
            current_month: vec![crate::models::treatment::Treatment {
                id: Uuid::new_v4(),
                pet_id: Uuid::new_v4(),
                category: "Vacinas".into(),
                name: "V10".into(),
                description: None,
                date: NaiveDate::from_ymd_opt(2025, 8, 20).unwrap(),
                time: None,
                done: false,
                applier_type: "Tutor".into(),
                applier_name: None,
                applier_id: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }],
            expired: vec![],
        }
    }

    #[test]
    fn test_two_pets_same_tutor_one_bundle() {
        let joao = contact("auth0|1", "joao@email.com");
        let bundles = group_by_tutor(vec![
            (pet("Rex"), vec![joao.clone()]),
            (pet("Mia"), vec![joao.clone()]),
        ]);

        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].pets.len(), 2);
        assert_eq!(bundles[0].tutor.email, "joao@email.com");
    }

    #[test]
    fn test_shared_pet_lands_in_both_bundles() {
        let joao = contact("auth0|1", "joao@email.com");
        let vet = contact("auth0|2", "vet@clinica.com");
        let bundles = group_by_tutor(vec![(pet("Rex"), vec![joao, vet])]);

        assert_eq!(bundles.len(), 2);
        assert_eq!(bundles[0].pets.len(), 1);
        assert_eq!(bundles[1].pets.len(), 1);
        assert_eq!(bundles[0].pets[0].name, bundles[1].pets[0].name);
    }

    #[test]
    fn test_same_id_different_email_is_a_new_key() {
        let before = contact("auth0|1", "antigo@email.com");
        let after = contact("auth0|1", "novo@email.com");
        let bundles = group_by_tutor(vec![
            (pet("Rex"), vec![before]),
            (pet("Mia"), vec![after]),
        ]);

        assert_eq!(bundles.len(), 2);
    }

    #[test]
    fn test_empty_input_no_bundles() {
        assert!(group_by_tutor(Vec::new()).is_empty());
    }
}
