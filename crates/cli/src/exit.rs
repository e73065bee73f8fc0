//! Exit-code mapping (§6 "Exit codes").

use vgdb_core::Error;

pub const OK: i32 = 0;
pub const INVALID_ARGS: i32 = 2;
pub const STORAGE_FAILURE: i32 = 3;
pub const CLUSTER_UNREACHABLE: i32 = 4;

/// Maps an engine [`Error`] to one of the four documented exit codes.
/// Variants the taxonomy does not single out (`NotFound`, `ModeViolation`,
/// `Timeout`, `Fatal`, `ConcurrencyConflict`) fall back to
/// [`STORAGE_FAILURE`] as the closest "operation did not complete"
/// bucket — see DESIGN.md.
pub fn code_for(err: &Error) -> i32 {
    match err {
        Error::InvalidArgument(_) => INVALID_ARGS,
        Error::ConsensusTimeout(_) => CLUSTER_UNREACHABLE,
        Error::StorageFailure(_)
        | Error::NotFound(_)
        | Error::ConcurrencyConflict { .. }
        | Error::ModeViolation(_)
        | Error::Timeout(_)
        | Error::Fatal(_) => STORAGE_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_maps_to_two() {
        assert_eq!(code_for(&Error::InvalidArgument("x".into())), INVALID_ARGS);
    }

    #[test]
    fn consensus_timeout_maps_to_four() {
        assert_eq!(code_for(&Error::ConsensusTimeout("x".into())), CLUSTER_UNREACHABLE);
    }

    #[test]
    fn storage_failure_maps_to_three() {
        assert_eq!(code_for(&Error::StorageFailure("x".into())), STORAGE_FAILURE);
    }
}
