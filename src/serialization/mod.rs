//! CBOR serialization for multisig account state and signed requests.
//!
//! - CBOR via `ciborium` (NOT JSON or bincode)
//! - Deterministic encoding: signatures are computed over these bytes
//! - Schema evolution through `#[serde(default)]` on new fields

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Serialization errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializationError {
    /// CBOR encoding failed.
    #[error("CBOR encoding failed: {0}")]
    Encode(String),

    /// CBOR decoding failed.
    #[error("CBOR decoding failed: {0}")]
    Decode(String),
}

/// Serialize to CBOR bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| SerializationError::Encode(format!("{:?}", e)))?;
    Ok(bytes)
}

/// Deserialize from CBOR bytes.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializationError> {
    ciborium::from_reader(bytes).map_err(|e| SerializationError::Decode(format!("{:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeSet;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        sequence: u64,
        approvals: BTreeSet<[u8; 4]>,
    }

    #[test]
    fn test_cbor_deterministic_for_sets() {
        // Insertion order must not leak into the encoding
        let mut a = BTreeSet::new();
        a.insert([3u8; 4]);
        a.insert([1u8; 4]);
        let mut b = BTreeSet::new();
        b.insert([1u8; 4]);
        b.insert([3u8; 4]);

        let bytes_a = to_cbor(&Record { sequence: 7, approvals: a }).unwrap();
        let bytes_b = to_cbor(&Record { sequence: 7, approvals: b }).unwrap();
        assert_eq!(bytes_a, bytes_b);
    }

    #[test]
    fn test_cbor_backward_compatibility() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct V1 {
            threshold: u16,
        }

        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct V2 {
            threshold: u16,
            #[serde(default)]
            config_epoch: u64,
        }

        let bytes = to_cbor(&V1 { threshold: 2 }).unwrap();

        // V2 can read V1 data with default for the new field
        let v2: V2 = from_cbor(&bytes).unwrap();
        assert_eq!(v2.threshold, 2);
        assert_eq!(v2.config_epoch, 0);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result: Result<Record, _> = from_cbor(&[0xff, 0x00, 0x13]);
        assert!(matches!(result, Err(SerializationError::Decode(_))));
    }
}
