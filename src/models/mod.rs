pub mod pet;
pub mod profile;
pub mod treatment;

use chrono::{DateTime, Utc};

/// Soft-delete state of a record, derived from the nullable `deleted_at`
/// column so both states stay exhaustive and pattern-matchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    Deleted { at: DateTime<Utc> },
}

impl Lifecycle {
    pub fn from_deleted_at(deleted_at: Option<DateTime<Utc>>) -> Self {
        match deleted_at {
            None => Lifecycle::Active,
            Some(at) => Lifecycle::Deleted { at },
        }
    }

    pub fn is_deleted(self) -> bool {
        matches!(self, Lifecycle::Deleted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_from_nullable_timestamp() {
        assert_eq!(Lifecycle::from_deleted_at(None), Lifecycle::Active);

        let at = Utc::now();
        match Lifecycle::from_deleted_at(Some(at)) {
            Lifecycle::Deleted { at: t } => assert_eq!(t, at),
            Lifecycle::Active => panic!("expected Deleted"),
        }
    }

    #[test]
    fn test_is_deleted() {
        assert!(!Lifecycle::from_deleted_at(None).is_deleted());
        assert!(Lifecycle::from_deleted_at(Some(Utc::now())).is_deleted());
    }
}
