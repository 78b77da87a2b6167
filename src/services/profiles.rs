use sqlx::PgPool;

use crate::models::profile::{Profile, TutorContact, UpsertProfileRequest, VetSummary};

pub struct ProfileService;

impl ProfileService {
    pub async fn get(pool: &PgPool, id: &str) -> anyhow::Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT * FROM profiles WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(profile)
    }

    pub async fn get_by_email(pool: &PgPool, email: &str) -> anyhow::Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT * FROM profiles WHERE email = $1 AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;
        Ok(profile)
    }

    /// Create or update the caller's profile. The id and email come from the
    /// identity provider, never from the request body.
    pub async fn upsert(
        pool: &PgPool,
        id: &str,
        email: &str,
        req: &UpsertProfileRequest,
    ) -> anyhow::Result<Profile> {
        let address = req.address.as_ref();
        let profile = sqlx::query_as::<_, Profile>(
            "INSERT INTO profiles
                 (id, name, email, bio, address_street, address_city, address_state, address_zip, is_vet)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (id) DO UPDATE SET
                 name           = EXCLUDED.name,
                 email          = EXCLUDED.email,
                 bio            = EXCLUDED.bio,
                 address_street = EXCLUDED.address_street,
                 address_city   = EXCLUDED.address_city,
                 address_state  = EXCLUDED.address_state,
                 address_zip    = EXCLUDED.address_zip,
                 is_vet         = EXCLUDED.is_vet,
                 updated_at     = NOW()
             RETURNING *",
        )
        .bind(id)
        .bind(&req.name)
        .bind(email)
        .bind(&req.bio)
        .bind(address.and_then(|a| a.street.clone()))
        .bind(address.and_then(|a| a.city.clone()))
        .bind(address.and_then(|a| a.state.clone()))
        .bind(address.and_then(|a| a.zip.clone()))
        .bind(req.is_vet)
        .fetch_one(pool)
        .await?;
        Ok(profile)
    }

    /// Name search over veterinarian profiles, excluding the caller.
    pub async fn search_veterinarians(
        pool: &PgPool,
        term: &str,
        exclude_id: &str,
    ) -> anyhow::Result<Vec<VetSummary>> {
        let vets = sqlx::query_as::<_, VetSummary>(
            "SELECT id, name, email FROM profiles
             WHERE is_vet = TRUE
               AND deleted_at IS NULL
               AND id != $1
               AND name ILIKE '%' || $2 || '%'
             ORDER BY name
             LIMIT 10",
        )
        .bind(exclude_id)
        .bind(term)
        .fetch_all(pool)
        .await?;
        Ok(vets)
    }

    pub async fn get_veterinarian(pool: &PgPool, id: &str) -> anyhow::Result<Option<Profile>> {
        let vet = sqlx::query_as::<_, Profile>(
            "SELECT * FROM profiles WHERE id = $1 AND is_vet = TRUE AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(vet)
    }

    pub async fn get_veterinarians_by_ids(
        pool: &PgPool,
        ids: &[String],
    ) -> anyhow::Result<Vec<VetSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let vets = sqlx::query_as::<_, VetSummary>(
            "SELECT id, name, email FROM profiles
             WHERE id = ANY($1) AND is_vet = TRUE AND deleted_at IS NULL
             ORDER BY name",
        )
        .bind(ids)
        .fetch_all(pool)
        .await?;
        Ok(vets)
    }

    /// Tutor Directory lookup for the notification runs: resolves profile ids
    /// to {id, name, email}, dropping deleted profiles and entries whose
    /// email is blank. A blank name falls back to "Usuário".
    pub async fn resolve_notifiable(
        pool: &PgPool,
        ids: &[String],
    ) -> anyhow::Result<Vec<TutorContact>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let contacts = sqlx::query_as::<_, TutorContact>(
            "SELECT id,
                    COALESCE(NULLIF(name, ''), 'Usuário') AS name,
                    email
             FROM profiles
             WHERE id = ANY($1)
               AND deleted_at IS NULL
               AND email != ''
             ORDER BY id",
        )
        .bind(ids)
        .fetch_all(pool)
        .await?;
        Ok(contacts)
    }
}
