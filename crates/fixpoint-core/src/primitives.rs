//! # Runtime Primitives
//!
//! Hardcoded constants of the Fixpoint runtime.
//!
//! These are compiled into the binary and are immutable at runtime.

/// Name of the task wrapping the root function passed to `Context::run`.
pub const ROOT_TASK_NAME: &str = "main";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a type, attribute, index or handler name.
///
/// Longer names are rejected when the schema is frozen.
pub const MAX_IDENTIFIER_LENGTH: usize = 256;

/// Maximum length of a string value (64KB).
///
/// Longer strings are rejected by constructors and relation inserts.
pub const MAX_STRING_LENGTH: usize = 65536;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_ordered() {
        assert!(MAX_IDENTIFIER_LENGTH < MAX_STRING_LENGTH);
        assert!(!ROOT_TASK_NAME.is_empty());
    }
}
