use thiserror::Error;

use crate::Principal;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permissions {0:?}")]
    MissingAll(Vec<String>),

    #[error("forbidden: requires any of {0:?}")]
    MissingAny(Vec<String>),
}

impl AuthzError {
    /// Tokens that would have satisfied the check.
    pub fn missing(&self) -> &[String] {
        match self {
            AuthzError::MissingAll(keys) | AuthzError::MissingAny(keys) => keys,
        }
    }
}

/// Pass only if the principal holds every token in `required`.
///
/// The error lists every absent token, in the order given.
/// - No IO
/// - No panics
pub fn require_all(principal: &Principal, required: &[&str]) -> Result<(), AuthzError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|token| !principal.has_permission(token))
        .map(|token| token.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AuthzError::MissingAll(missing))
    }
}

/// Pass if the principal holds at least one token in `required`.
///
/// An empty requirement list passes.
pub fn require_any(principal: &Principal, required: &[&str]) -> Result<(), AuthzError> {
    if required.is_empty() || required.iter().any(|token| principal.has_permission(token)) {
        Ok(())
    } else {
        Err(AuthzError::MissingAny(
            required.iter().map(|token| token.to_string()).collect(),
        ))
    }
}
