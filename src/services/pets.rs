use chrono::Utc;
use rand::Rng;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::pet::{CreatePetRequest, Pet, PetOwner, UpdatePetRequest};
use crate::models::profile::VetSummary;
use crate::models::Lifecycle;
use crate::services::profiles::ProfileService;

const NICKNAME_MAX_ATTEMPTS: u32 = 100;

pub struct PetService;

impl PetService {
    /// Pets the user has an active ownership link to (soft-deleted pets and
    /// revoked links excluded).
    pub async fn list_for_user(pool: &PgPool, user_id: &str) -> anyhow::Result<Vec<Pet>> {
        let pets = sqlx::query_as::<_, Pet>(
            "SELECT p.* FROM pets p
             JOIN pet_owners po ON po.pet_id = p.id
             WHERE po.profile_id = $1
               AND po.deleted_at IS NULL
               AND p.deleted_at IS NULL
             ORDER BY p.name",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(pets)
    }

    /// Fetch one pet, verifying the caller's access through the ownership link.
    pub async fn get_for_user(
        pool: &PgPool,
        pet_id: Uuid,
        user_id: &str,
    ) -> anyhow::Result<Option<Pet>> {
        let pet = sqlx::query_as::<_, Pet>(
            "SELECT p.* FROM pets p
             JOIN pet_owners po ON po.pet_id = p.id
             WHERE p.id = $1
               AND po.profile_id = $2
               AND po.deleted_at IS NULL
               AND p.deleted_at IS NULL",
        )
        .bind(pet_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(pet)
    }

    /// Nickname lookup. Returns the pet together with whether the requesting
    /// user holds an active link to it; the route decides how much to expose.
    pub async fn find_by_nickname(
        pool: &PgPool,
        nickname: &str,
        user_id: &str,
    ) -> anyhow::Result<Option<(Pet, bool)>> {
        let pet = sqlx::query_as::<_, Pet>(
            "SELECT * FROM pets WHERE nickname = $1 AND deleted_at IS NULL",
        )
        .bind(nickname)
        .fetch_optional(pool)
        .await?;

        let Some(pet) = pet else {
            return Ok(None);
        };

        let has_access: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                 SELECT 1 FROM pet_owners
                 WHERE pet_id = $1 AND profile_id = $2 AND deleted_at IS NULL
             )",
        )
        .bind(pet.id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(Some((pet, has_access)))
    }

    /// Create a pet with an auto-generated unique nickname; the creator
    /// becomes its first owner.
    pub async fn create(
        pool: &PgPool,
        user_id: &str,
        req: &CreatePetRequest,
    ) -> anyhow::Result<Pet> {
        let base = req
            .name
            .split_whitespace()
            .next()
            .unwrap_or("pet")
            .to_lowercase();
        let nickname = Self::generate_unique_nickname(pool, &base).await?;

        let mut tx = pool.begin().await?;

        let pet = sqlx::query_as::<_, Pet>(
            "INSERT INTO pets
                 (id, name, nickname, breed, pedigree_number, birth_date, species, gender, photo_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&req.name)
        .bind(&nickname)
        .bind(&req.breed)
        .bind(&req.pedigree_number)
        .bind(req.birth_date)
        .bind(req.species.to_string())
        .bind(req.gender.map(|g| g.to_string()))
        .bind(&req.photo_url)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO pet_owners (pet_id, profile_id) VALUES ($1, $2)")
            .bind(pet.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("Pet criado: {} ({})", pet.name, pet.nickname);
        Ok(pet)
    }

    pub async fn update(
        pool: &PgPool,
        pet_id: Uuid,
        user_id: &str,
        req: &UpdatePetRequest,
    ) -> anyhow::Result<Option<Pet>> {
        let pet = sqlx::query_as::<_, Pet>(
            "UPDATE pets p
             SET name            = COALESCE($1, p.name),
                 breed           = COALESCE($2, p.breed),
                 pedigree_number = COALESCE($3, p.pedigree_number),
                 birth_date      = COALESCE($4, p.birth_date),
                 species         = COALESCE($5, p.species),
                 gender          = COALESCE($6, p.gender),
                 photo_url       = COALESCE($7, p.photo_url),
                 updated_at      = NOW()
             WHERE p.id = $8
               AND p.deleted_at IS NULL
               AND EXISTS(
                   SELECT 1 FROM pet_owners po
                   WHERE po.pet_id = p.id AND po.profile_id = $9 AND po.deleted_at IS NULL
               )
             RETURNING p.*",
        )
        .bind(&req.name)
        .bind(&req.breed)
        .bind(&req.pedigree_number)
        .bind(req.birth_date)
        .bind(req.species.map(|s| s.to_string()))
        .bind(req.gender.map(|g| g.to_string()))
        .bind(&req.photo_url)
        .bind(pet_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(pet)
    }

    /// Soft-delete: the pet is marked, never erased.
    pub async fn soft_delete(pool: &PgPool, pet_id: Uuid, user_id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE pets p
             SET deleted_at = NOW(), updated_at = NOW()
             WHERE p.id = $1
               AND p.deleted_at IS NULL
               AND EXISTS(
                   SELECT 1 FROM pet_owners po
                   WHERE po.pet_id = p.id AND po.profile_id = $2 AND po.deleted_at IS NULL
               )",
        )
        .bind(pet_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Grant a veterinarian access to the pet. A previously revoked link is
    /// revived instead of duplicated. Returns false when the vet already had
    /// active access.
    pub async fn grant_vet_access(
        pool: &PgPool,
        pet_id: Uuid,
        owner_id: &str,
        vet_id: &str,
    ) -> anyhow::Result<bool> {
        let pet = Self::get_for_user(pool, pet_id, owner_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Pet não encontrado ou sem permissão"))?;

        let vet = ProfileService::get_veterinarian(pool, vet_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Veterinário não encontrado"))?;

        let granted = Self::upsert_owner_link(pool, pet.id, &vet.id).await?;
        if granted {
            info!("Acesso concedido: vet {} -> pet {}", vet.id, pet.nickname);
        }
        Ok(granted)
    }

    /// Insert or revive the ownership link. Also used when a vet registers a
    /// treatment on a pet and gains access automatically.
    pub async fn upsert_owner_link(
        pool: &PgPool,
        pet_id: Uuid,
        profile_id: &str,
    ) -> anyhow::Result<bool> {
        let existing = sqlx::query_as::<_, PetOwner>(
            "SELECT * FROM pet_owners WHERE pet_id = $1 AND profile_id = $2",
        )
        .bind(pet_id)
        .bind(profile_id)
        .fetch_optional(pool)
        .await?;

        match existing {
            Some(link) => match link.lifecycle() {
                Lifecycle::Active => Ok(false), // já tem acesso ativo
                Lifecycle::Deleted { .. } => {
                    sqlx::query("UPDATE pet_owners SET deleted_at = NULL WHERE id = $1")
                        .bind(link.id)
                        .execute(pool)
                        .await?;
                    Ok(true)
                }
            },
            None => {
                sqlx::query("INSERT INTO pet_owners (pet_id, profile_id) VALUES ($1, $2)")
                    .bind(pet_id)
                    .bind(profile_id)
                    .execute(pool)
                    .await?;
                Ok(true)
            }
        }
    }

    /// Revoke a vet's access by soft-deleting the link. Self-revocation is
    /// rejected so a pet never loses its last owner this way.
    pub async fn revoke_vet_access(
        pool: &PgPool,
        pet_id: Uuid,
        owner_id: &str,
        vet_id: &str,
    ) -> anyhow::Result<bool> {
        anyhow::ensure!(
            owner_id != vet_id,
            "Você não pode remover seu próprio acesso"
        );

        Self::get_for_user(pool, pet_id, owner_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Pet não encontrado ou sem permissão"))?;

        let result = sqlx::query(
            "UPDATE pet_owners SET deleted_at = NOW()
             WHERE pet_id = $1 AND profile_id = $2 AND deleted_at IS NULL",
        )
        .bind(pet_id)
        .bind(vet_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Veterinarians holding an active link to the pet, excluding the owner
    /// making the request.
    pub async fn list_vets_with_access(
        pool: &PgPool,
        pet_id: Uuid,
        owner_id: &str,
    ) -> anyhow::Result<Vec<VetSummary>> {
        Self::get_for_user(pool, pet_id, owner_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Pet não encontrado ou sem permissão"))?;

        let accessor_ids: Vec<String> = sqlx::query_scalar(
            "SELECT profile_id FROM pet_owners
             WHERE pet_id = $1 AND deleted_at IS NULL AND profile_id != $2",
        )
        .bind(pet_id)
        .bind(owner_id)
        .fetch_all(pool)
        .await?;

        ProfileService::get_veterinarians_by_ids(pool, &accessor_ids).await
    }

    /// Generate a unique `{base}_{4 digits}` nickname by random retry, falling
    /// back to a timestamp suffix if the random space is exhausted.
    async fn generate_unique_nickname(pool: &PgPool, base: &str) -> anyhow::Result<String> {
        for _ in 0..NICKNAME_MAX_ATTEMPTS {
            let candidate = nickname_candidate(base, rand::thread_rng().gen_range(0..10_000));

            let taken: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pets WHERE nickname = $1)")
                    .bind(&candidate)
                    .fetch_one(pool)
                    .await?;
            if !taken {
                return Ok(candidate);
            }
        }

        let ts = Utc::now().timestamp().to_string();
        let suffix = &ts[ts.len().saturating_sub(6)..];
        Ok(format!("{base}_{suffix}"))
    }
}

fn nickname_candidate(base: &str, code: u32) -> String {
    format!("{base}_{code:04}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nickname_candidate_shape() {
        assert_eq!(nickname_candidate("rex", 7), "rex_0007");
        assert_eq!(nickname_candidate("rex", 1234), "rex_1234");
        assert_eq!(nickname_candidate("bolinha", 9999), "bolinha_9999");
    }
}
