use std::io::Read;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::response::ViewQueryResponse;

/// JSON encoding and decoding as the rest of the crate needs it.
///
/// Decode failures surface as [`Error::Decode`] with the offending location.
pub trait JsonCodec {
    /// Encode a value as a JSON literal for `key`, `startkey` or `endkey`.
    /// Strings come out quoted, composite keys as arrays.
    fn encode_query_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<String>;

    /// Encode a key list for a multi-key (`keys=`) query.
    fn encode_keys<T: Serialize>(&self, keys: &[T]) -> Result<String>;

    fn encode_document<T: Serialize + ?Sized>(&self, document: &T) -> Result<Vec<u8>>;

    fn decode_document<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;

    /// Decode from a reader, then drop it. Ownership of the reader moves in
    /// so the source is closed whether or not decoding succeeds.
    fn consume<T: DeserializeOwned, Rd: Read>(&self, reader: Rd) -> Result<T>;

    fn decode_view_response<R>(&self, bytes: &[u8]) -> Result<ViewQueryResponse<R>>
    where
        R: for<'de> Deserialize<'de>,
    {
        self.decode_document(bytes)
    }
}

/// `serde_json` backed codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeJsonCodec;

impl SerdeJsonCodec {
    pub fn new() -> Self {
        Self
    }
}

impl JsonCodec for SerdeJsonCodec {
    fn encode_query_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        serde_json::to_string(value).map_err(|e| Error::Encode(format!("Invalid query value: {e}")))
    }

    fn encode_keys<T: Serialize>(&self, keys: &[T]) -> Result<String> {
        serde_json::to_string(keys).map_err(|e| Error::Encode(format!("Invalid keys: {e}")))
    }

    fn encode_document<T: Serialize + ?Sized>(&self, document: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(document).map_err(|e| Error::Encode(format!("Invalid document: {e}")))
    }

    fn decode_document<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn consume<T: DeserializeOwned, Rd: Read>(&self, reader: Rd) -> Result<T> {
        let result = serde_json::from_reader(std::io::BufReader::new(reader));
        Ok(result?)
    }
}
