use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Lifecycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Cat,
    Dog,
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Species::Cat => "cat",
            Species::Dog => "dog",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Species {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cat" => Ok(Species::Cat),
            "dog" => Ok(Species::Dog),
            _ => Err(anyhow::anyhow!("Espécie desconhecida: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Gender::Male => "male",
            Gender::Female => "female",
        };
        write!(f, "{s}")
    }
}

/// DB row struct — species/gender are fetched as TEXT and validated at the
/// request-DTO boundary, so the row type stays a plain sqlx mapping.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pet {
    pub id: Uuid,
    pub name: String,
    pub nickname: String,
    pub breed: String,
    pub pedigree_number: Option<String>,
    pub birth_date: NaiveDate,
    pub species: String,
    pub gender: Option<String>,
    /// Photo reference only; upload/thumbnailing happen outside this service.
    pub photo_url: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pet {
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_deleted_at(self.deleted_at)
    }

    /// Whole years elapsed since `birth_date` as of `today`.
    pub fn age_in_years(&self, today: NaiveDate) -> i32 {
        age_in_years(self.birth_date, today)
    }
}

pub fn age_in_years(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut years = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    years.max(0)
}

/// Many-to-many link between a pet and a profile. Soft-deleting the link is
/// how vet access is revoked without touching the pet row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PetOwner {
    pub id: i64,
    pub pet_id: Uuid,
    pub profile_id: String,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PetOwner {
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_deleted_at(self.deleted_at)
    }
}

// Request/Response DTOs
#[derive(Debug, Deserialize)]
pub struct CreatePetRequest {
    pub name: String,
    pub breed: String,
    pub pedigree_number: Option<String>,
    pub birth_date: NaiveDate,
    pub species: Species,
    pub gender: Option<Gender>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePetRequest {
    pub name: Option<String>,
    pub breed: Option<String>,
    pub pedigree_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub species: Option<Species>,
    pub gender: Option<Gender>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GrantVetAccessRequest {
    pub vet_id: String,
}

/// Fields exposed to users without an ownership link (nickname lookup).
#[derive(Debug, Serialize)]
pub struct LimitedPetView {
    pub id: Uuid,
    pub name: String,
    pub nickname: String,
    pub breed: String,
    pub species: String,
    pub gender: Option<String>,
    pub birth_date: NaiveDate,
    pub has_access: bool,
}

impl From<&Pet> for LimitedPetView {
    fn from(p: &Pet) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            nickname: p.nickname.clone(),
            breed: p.breed.clone(),
            species: p.species.clone(),
            gender: p.gender.clone(),
            birth_date: p.birth_date,
            has_access: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_age_in_years_before_and_after_birthday() {
        let birth = d(2020, 6, 15);
        // Um dia antes do aniversário
        assert_eq!(age_in_years(birth, d(2025, 6, 14)), 4);
        // No aniversário
        assert_eq!(age_in_years(birth, d(2025, 6, 15)), 5);
        // Depois do aniversário
        assert_eq!(age_in_years(birth, d(2025, 12, 1)), 5);
    }

    #[test]
    fn test_age_never_negative() {
        let birth = d(2025, 6, 15);
        assert_eq!(age_in_years(birth, d(2025, 1, 1)), 0);
    }

    #[test]
    fn test_species_round_trip() {
        assert_eq!("cat".parse::<Species>().unwrap(), Species::Cat);
        assert_eq!(Species::Dog.to_string(), "dog");
        assert!("hamster".parse::<Species>().is_err());
    }
}
