//! Optimistic concurrency expectations for versioned rows.

use crate::error::{DomainError, DomainResult};

/// Version expectation presented by a writer.
///
/// Roles carry a monotonically increasing `version`; an admin client that read
/// version `n` sends `Exact(n)` and loses to any write that landed in between.
/// Clients that send nothing get `Any`: no check against a version they saw,
/// though storage still refuses a write whose row changed after it was read.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// No client-side expectation.
    Any,
    /// Require the row to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn from_option(version: Option<u64>) -> Self {
        match version {
            Some(v) => ExpectedVersion::Exact(v),
            None => ExpectedVersion::Any,
        }
    }

    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "stale version (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_matches_everything() {
        assert!(ExpectedVersion::Any.check(0).is_ok());
        assert!(ExpectedVersion::Any.check(99).is_ok());
    }

    #[test]
    fn exact_rejects_stale_writers() {
        assert!(ExpectedVersion::Exact(3).check(3).is_ok());
        let err = ExpectedVersion::Exact(2).check(3).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn from_option_maps_absence_to_any() {
        assert_eq!(ExpectedVersion::from_option(None), ExpectedVersion::Any);
        assert_eq!(ExpectedVersion::from_option(Some(4)), ExpectedVersion::Exact(4));
    }
}
