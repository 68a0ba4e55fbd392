// crates/trustchain-reputation/src/admission.rs
//
// Admission of signed direct-trust submissions.
//
// Checks run in a fixed order and the ledger state is only touched once
// every check has passed:
//   1. trust value within [-1, 1]
//   2. timestamp within the freshness window of local time
//   3. signature recovers to the claimed truster (case-insensitive)
//   4. truster is present in the identity registry

use tracing::debug;

use trustchain_core::crypto::recover_address_base64;
use trustchain_core::{TrustSubmission, TrustchainError};
use trustchain_store::LedgerState;

/// Validate a submission against `now` and apply it to the ledger state.
///
/// On success T(i, j) is overwritten in the graph and the direct-trust
/// store and both addresses join the roster. On any error the state is
/// unchanged.
pub fn admit_submission(
    state: &mut LedgerState,
    submission: &TrustSubmission,
    now: i64,
    window_secs: i64,
) -> Result<(), TrustchainError> {
    check_trust_value(submission.trust_value)?;
    check_timestamp(submission.timestamp, now, window_secs)?;

    let recovered = recover_address_base64(submission.message().as_bytes(), &submission.signature)?;
    if !recovered.eq_ignore_ascii_case(&submission.address_i) {
        debug!(
            claimed = %submission.address_i,
            recovered = %recovered,
            "Submission signature does not match truster"
        );
        return Err(TrustchainError::Authentication(format!(
            "signature recovers to {}, not {}",
            recovered, submission.address_i
        )));
    }

    if !state.identity().contains(&submission.address_i)? {
        return Err(TrustchainError::NotRegistered(submission.address_i.clone()));
    }

    state.record_direct_trust(
        &submission.address_i,
        &submission.address_j,
        submission.trust_value,
    )?;

    debug!(
        truster = %submission.address_i,
        trustee = %submission.address_j,
        value = submission.trust_value,
        "Direct trust accepted"
    );
    Ok(())
}

/// Reject trust values outside [-1, 1], including NaN.
pub fn check_trust_value(value: f64) -> Result<(), TrustchainError> {
    if (-1.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(TrustchainError::Validation(format!(
            "trust value {} outside [-1, 1]",
            value
        )))
    }
}

fn check_timestamp(timestamp: i64, now: i64, window_secs: i64) -> Result<(), TrustchainError> {
    if timestamp.abs_diff(now) > window_secs.unsigned_abs() {
        return Err(TrustchainError::Timestamp {
            timestamp,
            now,
            window_secs,
        });
    }
    Ok(())
}
