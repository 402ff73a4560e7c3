use crate::call::{Call, SignedCall};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors that can occur when validating a call
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Caller address is not a valid public key")]
    InvalidCaller,

    #[error("Invalid signature: signature does not match the call content")]
    InvalidSignature,

    #[error("Future timestamp: call timestamp is too far in the future")]
    FutureTimestamp,

    #[error("Expired: call is older than the accepted window")]
    Expired,
}

/// Validator for signed calls
pub struct CallValidator;

impl CallValidator {
    /// Check the signature against the key behind the caller's address
    pub fn validate(signed_call: &SignedCall) -> Result<Call, ValidationError> {
        let call = signed_call.call();
        let public_key = call
            .caller()
            .public_key()
            .map_err(|_| ValidationError::InvalidCaller)?;

        if !signed_call.verify(&public_key) {
            return Err(ValidationError::InvalidSignature);
        }

        Ok(call.clone())
    }

    /// Signature check plus a freshness window around `now`
    pub fn validate_fresh(
        signed_call: &SignedCall,
        future_tolerance_secs: u64,
        max_age_secs: u64,
    ) -> Result<Call, ValidationError> {
        let call = Self::validate(signed_call)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        if call.timestamp() > now.saturating_add(future_tolerance_secs) {
            return Err(ValidationError::FutureTimestamp);
        }
        if call.timestamp().saturating_add(max_age_secs) < now {
            return Err(ValidationError::Expired);
        }

        Ok(call)
    }
}
