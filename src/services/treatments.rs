use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::treatment::{
    CreateTreatmentRequest, Treatment, TreatmentStatus, UpdateTreatmentRequest,
};
use crate::services::pets::PetService;

pub struct TreatmentService;

/// A pet paired with only the treatments matching a notification window,
/// plus the ids of everyone holding an active link to it.
#[derive(Debug, Clone)]
pub struct PetDue {
    pub pet_id: Uuid,
    pub name: String,
    pub nickname: String,
    pub accessor_ids: Vec<String>,
    pub treatments: Vec<Treatment>,
}

/// A pet's full treatment list bucketed by derived status.
#[derive(Debug, Serialize)]
pub struct TreatmentBuckets {
    pub scheduled: Vec<Treatment>,
    pub expired: Vec<Treatment>,
    pub done: Vec<Treatment>,
}

/// Monthly-window output: the current-month and overdue sub-queries merged by
/// pet, with the two treatment lists kept in separate buckets. A treatment
/// from earlier this month can legitimately appear in both.
#[derive(Debug, Clone)]
pub struct PetMonthly {
    pub pet_id: Uuid,
    pub name: String,
    pub nickname: String,
    pub accessor_ids: Vec<String>,
    pub current_month: Vec<Treatment>,
    pub expired: Vec<Treatment>,
}

impl TreatmentService {
    /// Add a treatment to a pet the user has access to. A veterinarian
    /// registering themselves as applier gains access to the pet.
    pub async fn add(
        pool: &PgPool,
        pet_id: Uuid,
        user_id: &str,
        req: &CreateTreatmentRequest,
    ) -> anyhow::Result<Treatment> {
        let pet = PetService::get_for_user(pool, pet_id, user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Pet não encontrado ou sem permissão"))?;

        if req.applier_type == crate::models::treatment::ApplierType::Veterinarian {
            if let Some(applier_id) = &req.applier_id {
                PetService::upsert_owner_link(pool, pet.id, applier_id).await?;
            }
        }

        let treatment = sqlx::query_as::<_, Treatment>(
            "INSERT INTO treatments
                 (id, pet_id, category, name, description, date, time, done,
                  applier_type, applier_name, applier_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(pet.id)
        .bind(req.category.to_string())
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.date)
        .bind(req.time)
        .bind(req.done)
        .bind(req.applier_type.to_string())
        .bind(&req.applier_name)
        .bind(&req.applier_id)
        .fetch_one(pool)
        .await?;
        Ok(treatment)
    }

    pub async fn update(
        pool: &PgPool,
        pet_id: Uuid,
        treatment_id: Uuid,
        user_id: &str,
        req: &UpdateTreatmentRequest,
    ) -> anyhow::Result<Option<Treatment>> {
        let treatment = sqlx::query_as::<_, Treatment>(
            "UPDATE treatments t
             SET category     = COALESCE($1, t.category),
                 name         = COALESCE($2, t.name),
                 description  = COALESCE($3, t.description),
                 date         = COALESCE($4, t.date),
                 time         = COALESCE($5, t.time),
                 done         = COALESCE($6, t.done),
                 applier_type = COALESCE($7, t.applier_type),
                 applier_name = COALESCE($8, t.applier_name),
                 applier_id   = COALESCE($9, t.applier_id),
                 updated_at   = NOW()
             WHERE t.id = $10
               AND t.pet_id = $11
               AND EXISTS(
                   SELECT 1 FROM pets p
                   JOIN pet_owners po ON po.pet_id = p.id
                   WHERE p.id = t.pet_id
                     AND p.deleted_at IS NULL
                     AND po.profile_id = $12
                     AND po.deleted_at IS NULL
               )
             RETURNING t.*",
        )
        .bind(req.category.map(|c| c.to_string()))
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.date)
        .bind(req.time)
        .bind(req.done)
        .bind(req.applier_type.map(|a| a.to_string()))
        .bind(&req.applier_name)
        .bind(&req.applier_id)
        .bind(treatment_id)
        .bind(pet_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(treatment)
    }

    /// Treatments are removed outright, there is no soft-delete for them.
    pub async fn delete(
        pool: &PgPool,
        pet_id: Uuid,
        treatment_id: Uuid,
        user_id: &str,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "DELETE FROM treatments t
             WHERE t.id = $1
               AND t.pet_id = $2
               AND EXISTS(
                   SELECT 1 FROM pets p
                   JOIN pet_owners po ON po.pet_id = p.id
                   WHERE p.id = t.pet_id
                     AND p.deleted_at IS NULL
                     AND po.profile_id = $3
                     AND po.deleted_at IS NULL
               )",
        )
        .bind(treatment_id)
        .bind(pet_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Dashboard view: the pet's treatments split into scheduled / expired /
    /// done buckets as of `today`.
    pub async fn list_buckets(
        pool: &PgPool,
        pet_id: Uuid,
        user_id: &str,
        today: NaiveDate,
    ) -> anyhow::Result<TreatmentBuckets> {
        let pet = PetService::get_for_user(pool, pet_id, user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Pet não encontrado ou sem permissão"))?;

        let treatments = sqlx::query_as::<_, Treatment>(
            "SELECT * FROM treatments WHERE pet_id = $1 ORDER BY date, time",
        )
        .bind(pet.id)
        .fetch_all(pool)
        .await?;

        Ok(bucket_by_status(treatments, today))
    }

    // ─── Window selector ─────────────────────────────────────────────────────

    /// Pets with at least one pending treatment dated exactly `date`.
    pub async fn due_on(pool: &PgPool, date: NaiveDate) -> anyhow::Result<Vec<PetDue>> {
        Self::due_in_range(pool, date, date).await
    }

    /// Pets with pending treatments dated strictly before `today`. The lower
    /// edge is deliberately unbounded: an old pending treatment resurfaces in
    /// every monthly run until it is marked done or deleted.
    pub async fn overdue_before(pool: &PgPool, today: NaiveDate) -> anyhow::Result<Vec<PetDue>> {
        let lower = NaiveDate::from_ymd_opt(1, 1, 1).expect("valid date");
        Self::due_in_range(pool, lower, today - chrono::Duration::days(1)).await
    }

    /// Pets with pending treatments inside the closed window [from, to],
    /// each paired with only the matching treatments. Soft-deleted pets and
    /// completed treatments never match.
    pub async fn due_in_range(
        pool: &PgPool,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<PetDue>> {
        let pets: Vec<(Uuid, String, String)> = sqlx::query_as(
            "SELECT DISTINCT p.id, p.name, p.nickname
             FROM pets p
             JOIN treatments t ON t.pet_id = p.id
             WHERE p.deleted_at IS NULL
               AND t.done = FALSE
               AND t.date >= $1 AND t.date <= $2
             ORDER BY p.name, p.id",
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

        let mut due = Vec::with_capacity(pets.len());
        for (pet_id, name, nickname) in pets {
            let treatments = sqlx::query_as::<_, Treatment>(
                "SELECT * FROM treatments
                 WHERE pet_id = $1 AND done = FALSE AND date >= $2 AND date <= $3
                 ORDER BY date, time",
            )
            .bind(pet_id)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await?;

            let accessor_ids: Vec<String> = sqlx::query_scalar(
                "SELECT profile_id FROM pet_owners
                 WHERE pet_id = $1 AND deleted_at IS NULL
                 ORDER BY profile_id",
            )
            .bind(pet_id)
            .fetch_all(pool)
            .await?;

            due.push(PetDue {
                pet_id,
                name,
                nickname,
                accessor_ids,
                treatments,
            });
        }
        Ok(due)
    }
}

/// Merge the two monthly sub-query results by pet id, preserving the order
/// pets first appeared in. Buckets are never concatenated.
pub fn merge_monthly_windows(
    current_month: Vec<PetDue>,
    overdue: Vec<PetDue>,
) -> Vec<PetMonthly> {
    let mut merged: Vec<PetMonthly> = Vec::new();

    for pet in current_month {
        merged.push(PetMonthly {
            pet_id: pet.pet_id,
            name: pet.name,
            nickname: pet.nickname,
            accessor_ids: pet.accessor_ids,
            current_month: pet.treatments,
            expired: Vec::new(),
        });
    }

    for pet in overdue {
        match merged.iter_mut().find(|m| m.pet_id == pet.pet_id) {
            Some(existing) => existing.expired = pet.treatments,
            None => merged.push(PetMonthly {
                pet_id: pet.pet_id,
                name: pet.name,
                nickname: pet.nickname,
                accessor_ids: pet.accessor_ids,
                current_month: Vec::new(),
                expired: pet.treatments,
            }),
        }
    }

    merged
}

pub fn bucket_by_status(treatments: Vec<Treatment>, today: NaiveDate) -> TreatmentBuckets {
    let mut buckets = TreatmentBuckets {
        scheduled: Vec::new(),
        expired: Vec::new(),
        done: Vec::new(),
    };
    for t in treatments {
        match t.status_on(today) {
            TreatmentStatus::Scheduled => buckets.scheduled.push(t),
            TreatmentStatus::Expired => buckets.expired.push(t),
            TreatmentStatus::Done => buckets.done.push(t),
        }
    }
    buckets
}

/// First and last day of the month containing `today` (December rolls over
/// into January of the next year).
pub fn month_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    use chrono::Datelike;

    let first = today.with_day(1).expect("day 1 always valid");
    let next_month_first = if today.month() == 12 {
        NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
    }
    .expect("first of month always valid");
    let last = next_month_first - chrono::Duration::days(1);
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn treatment(date: NaiveDate, done: bool) -> Treatment {
        let now: DateTime<Utc> = Utc::now();
        Treatment {
            id: Uuid::new_v4(),
            pet_id: Uuid::new_v4(),
            category: "Vermífugo".into(),
            name: "Drontal".into(),
            description: None,
            date,
            time: None,
            done,
            applier_type: "Tutor".into(),
            applier_name: None,
            applier_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_month_bounds_mid_year() {
        assert_eq!(month_bounds(d(2025, 8, 8)), (d(2025, 8, 1), d(2025, 8, 31)));
        assert_eq!(month_bounds(d(2025, 2, 14)), (d(2025, 2, 1), d(2025, 2, 28)));
    }

    #[test]
    fn test_month_bounds_december_rollover() {
        assert_eq!(
            month_bounds(d(2025, 12, 25)),
            (d(2025, 12, 1), d(2025, 12, 31))
        );
    }

    #[test]
    fn test_month_bounds_leap_february() {
        assert_eq!(month_bounds(d(2024, 2, 10)), (d(2024, 2, 1), d(2024, 2, 29)));
    }

    fn pet_due(pet_id: Uuid, name: &str, treatments: Vec<Treatment>) -> PetDue {
        PetDue {
            pet_id,
            name: name.into(),
            nickname: format!("{}_0001", name.to_lowercase()),
            accessor_ids: vec!["auth0|tutor1".into()],
            treatments,
        }
    }

    #[test]
    fn test_merge_monthly_windows_keeps_buckets_separate() {
        let id = Uuid::new_v4();
        let month = vec![pet_due(id, "Rex", vec![treatment(d(2025, 8, 20), false)])];
        let overdue = vec![pet_due(id, "Rex", vec![treatment(d(2025, 6, 1), false)])];

        let merged = merge_monthly_windows(month, overdue);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].current_month.len(), 1);
        assert_eq!(merged[0].expired.len(), 1);
    }

    #[test]
    fn test_merge_monthly_windows_disjoint_pets() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let month = vec![pet_due(a, "Rex", vec![treatment(d(2025, 8, 20), false)])];
        let overdue = vec![pet_due(b, "Mia", vec![treatment(d(2024, 1, 1), false)])];

        let merged = merge_monthly_windows(month, overdue);
        assert_eq!(merged.len(), 2);
        assert!(merged[0].expired.is_empty());
        assert!(merged[1].current_month.is_empty());
        assert_eq!(merged[1].expired.len(), 1);
    }

    #[test]
    fn test_bucket_by_status() {
        let today = d(2025, 8, 8);
        let buckets = bucket_by_status(
            vec![
                treatment(d(2025, 8, 9), false),  // agendado
                treatment(d(2025, 8, 8), false),  // hoje ainda é agendado
                treatment(d(2025, 8, 7), false),  // expirado
                treatment(d(2025, 8, 7), true),   // concluído
            ],
            today,
        );
        assert_eq!(buckets.scheduled.len(), 2);
        assert_eq!(buckets.expired.len(), 1);
        assert_eq!(buckets.done.len(), 1);
    }
}
