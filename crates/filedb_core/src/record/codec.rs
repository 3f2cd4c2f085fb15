//! Record body encoding.

use crate::config::BodyFormat;
use crate::error::{CoreError, CoreResult};
use crate::types::RecordId;
use serde::de::DeserializeOwned;
use serde::Serialize;

impl BodyFormat {
    /// Serializes a record body.
    pub(crate) fn encode<T: Serialize>(self, record: &T) -> CoreResult<Vec<u8>> {
        match self {
            Self::Json => serde_json::to_vec(record).map_err(|e| CoreError::codec(e.to_string())),
            Self::Cbor => {
                let mut buf = Vec::new();
                ciborium::into_writer(record, &mut buf)
                    .map_err(|e| CoreError::codec(e.to_string()))?;
                Ok(buf)
            }
        }
    }

    /// Deserializes the body of record `id`.
    pub(crate) fn decode<T: DeserializeOwned>(self, id: RecordId, bytes: &[u8]) -> CoreResult<T> {
        match self {
            Self::Json => {
                serde_json::from_slice(bytes).map_err(|e| CoreError::corrupt_record(id, e.to_string()))
            }
            Self::Cbor => {
                ciborium::from_reader(bytes).map_err(|e| CoreError::corrupt_record(id, e.to_string()))
            }
        }
    }
}
