use std::collections::BTreeSet;

use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const MAX_NAME_LEN: usize = 100;

/// Trimmed display name for communities, items, subscriptions and requests.
pub fn clean_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::bad_request(format!(
            "Name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Deduplicated ids; fails naming the first id outside `allowed`.
pub fn subset_of(
    requested: &[Uuid],
    allowed: &BTreeSet<Uuid>,
    what: &str,
) -> AppResult<Vec<Uuid>> {
    let unique: BTreeSet<Uuid> = requested.iter().copied().collect();
    if let Some(bad) = unique.iter().find(|id| !allowed.contains(id)) {
        return Err(AppError::bad_request(format!(
            "{what} {bad} is not available to you"
        )));
    }
    Ok(unique.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(clean_name("  Drill  ").unwrap(), "Drill");
        assert!(clean_name("   ").is_err());
        assert!(clean_name(&"x".repeat(MAX_NAME_LEN)).is_ok());
        assert!(clean_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn subset_dedups_and_rejects_foreign_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let allowed = BTreeSet::from([a]);

        assert_eq!(subset_of(&[a, a], &allowed, "Community").unwrap(), vec![a]);
        assert!(subset_of(&[], &allowed, "Community").unwrap().is_empty());

        let err = subset_of(&[a, b], &allowed, "Community").unwrap_err();
        assert!(err.to_string().contains(&b.to_string()));
    }
}
