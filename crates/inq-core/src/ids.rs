//! ID prefixes and generation.
//!
//! Every entity ID is `{prefix}-{16 lowercase hex}`, e.g. `inv-a3f8b2c10d9e4f77`.

use crate::errors::CoreError;

pub const PREFIX_INVESTIGATION: &str = "inv";
pub const PREFIX_ANOMALY: &str = "anm";
pub const PREFIX_AUDIT: &str = "aud";

pub const ALL_PREFIXES: &[&str] = &[PREFIX_INVESTIGATION, PREFIX_ANOMALY, PREFIX_AUDIT];

const ID_BYTES: usize = 8;

/// Generate a prefixed random ID from 8 bytes of OS entropy.
///
/// # Errors
///
/// Returns `CoreError::Other` if the OS random source is unavailable.
pub fn generate_id(prefix: &str) -> Result<String, CoreError> {
    let mut buf = [0u8; ID_BYTES];
    getrandom::fill(&mut buf)
        .map_err(|e| CoreError::Other(anyhow::anyhow!("random source unavailable: {e}")))?;
    let hex: String = buf.iter().map(|b| format!("{b:02x}")).collect();
    Ok(format!("{prefix}-{hex}"))
}

/// Check that `id` has the shape produced by [`generate_id`] for `prefix`.
#[must_use]
pub fn has_prefix(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|hex| {
            hex.len() == ID_BYTES * 2
                && hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generate_id_correct_format() {
        let id = generate_id(PREFIX_INVESTIGATION).unwrap();
        assert!(id.starts_with("inv-"), "ID should start with 'inv-': {id}");
        assert_eq!(id.len(), 20, "3 prefix + 1 dash + 16 hex: {id}");
        assert!(has_prefix(&id, PREFIX_INVESTIGATION));
    }

    #[test]
    fn generate_id_all_prefixes() {
        for prefix in ALL_PREFIXES {
            let id = generate_id(prefix).unwrap();
            assert!(has_prefix(&id, prefix), "{id}");
        }
    }

    #[test]
    fn generate_id_uniqueness() {
        let mut ids = HashSet::new();
        for _ in 0..10_000 {
            let id = generate_id("tst").unwrap();
            assert!(ids.insert(id.clone()), "Duplicate ID generated: {id}");
        }
    }

    #[test]
    fn has_prefix_rejects_malformed() {
        assert!(!has_prefix("inv-xyz", PREFIX_INVESTIGATION));
        assert!(!has_prefix("anm-a3f8b2c10d9e4f77", PREFIX_INVESTIGATION));
        assert!(!has_prefix("inva3f8b2c10d9e4f77", PREFIX_INVESTIGATION));
        assert!(!has_prefix("inv-a3f8b2c1", PREFIX_INVESTIGATION));
        assert!(!has_prefix("inv-../../etc/passwd", PREFIX_INVESTIGATION));
        assert!(has_prefix("inv-a3f8b2c10d9e4f77", PREFIX_INVESTIGATION));
    }
}
