//! JSON wire encoding for stored entities.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{RegistryError, Result};

pub fn encode<T: Serialize>(entity: &T, shape: &'static str) -> Result<Vec<u8>> {
    let bytes = serde_json::to_vec(entity).map_err(|err| RegistryError::Serialization {
        shape,
        reason: err.to_string(),
    })?;
    tracing::trace!(shape, payload = %String::from_utf8_lossy(&bytes), "encoded");
    Ok(bytes)
}

/// Every declared field must be present in `bytes`. Skipped fields such as
/// the ledger key are left for the caller to fill in.
pub fn decode<T: DeserializeOwned>(bytes: &[u8], shape: &'static str) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|err| {
        tracing::warn!(shape, error = %err, "stored payload does not decode");
        RegistryError::Deserialization {
            shape,
            payload: String::from_utf8_lossy(bytes).into_owned(),
            reason: err.to_string(),
        }
    })
}
