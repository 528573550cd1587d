/// Compute effective limit with precedence: local arg -> global flag -> fallback.
#[must_use]
pub fn effective_limit(local: Option<u32>, global: Option<u32>, fallback: u32) -> u32 {
    local.or(global).unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::effective_limit;

    #[test]
    fn local_wins_over_global() {
        assert_eq!(effective_limit(Some(3), Some(50), 20), 3);
    }

    #[test]
    fn global_applies_without_local() {
        assert_eq!(effective_limit(None, Some(50), 20), 50);
    }

    #[test]
    fn configured_default_is_last_resort() {
        assert_eq!(effective_limit(None, None, 20), 20);
    }
}
