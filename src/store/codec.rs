//! Binary codec for store messages.
//!
//! In-process transports like [`MemoryStore`](crate::store::memory::MemoryStore)
//! pass [`StoreRequest`](crate::store::messages::StoreRequest) values around
//! directly, but any transport that crosses a process or network boundary
//! needs bytes. This module pins the one bincode configuration used for
//! that: `standard()` with fixed-int encoding, so a given message always
//! produces the same bytes and integers never change width between
//! builds.
//!
//! # Examples
//!
//! ```
//! use arcade_hub::store::codec::{decode, encode};
//! use arcade_hub::store::messages::{RequestBody, RequestId, StoreRequest};
//! use arcade_hub::GameId;
//!
//! let request = StoreRequest {
//!     id: RequestId::new(7),
//!     body: RequestBody::QueryTop {
//!         game: GameId::Guess,
//!         limit: 10,
//!     },
//! };
//! let bytes = encode(&request).expect("encoding should succeed");
//! let (back, _read): (StoreRequest, usize) = decode(&bytes).expect("decoding should succeed");
//! assert_eq!(back, request);
//! ```

use std::fmt;

use serde::{de::DeserializeOwned, Serialize};

fn config() -> impl bincode::config::Config {
    bincode::config::standard().with_fixed_int_encoding()
}

/// A failed encode or decode.
///
/// The detail strings are bincode's rendered messages; its error types
/// expose nothing more structured, and codec failures are rare enough that
/// the allocation is irrelevant.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    /// Serialization failed.
    Encode {
        /// bincode's rendered diagnostic.
        detail: String,
    },
    /// The caller's buffer cannot hold the encoded message.
    BufferTooSmall {
        /// Bytes the buffer had available.
        provided: usize,
    },
    /// Deserialization failed, typically truncated or corrupt input.
    Decode {
        /// bincode's rendered diagnostic.
        detail: String,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Encode { detail } => write!(f, "encode failed: {}", detail),
            CodecError::BufferTooSmall { provided } => {
                write!(f, "encode buffer too small: {} bytes available", provided)
            }
            CodecError::Decode { detail } => write!(f, "decode failed: {}", detail),
        }
    }
}

impl std::error::Error for CodecError {}

/// Encodes a value into a fresh `Vec<u8>`.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] when serialization fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serde::encode_to_vec(value, config()).map_err(|error| CodecError::Encode {
        detail: error.to_string(),
    })
}

/// Encodes a value into a caller-provided buffer and returns the bytes
/// written. Lets a transport reuse one buffer instead of allocating per
/// message.
///
/// # Errors
///
/// Returns [`CodecError::BufferTooSmall`] when the buffer runs out, and
/// [`CodecError::Encode`] for any other serialization failure.
pub fn encode_into<T: Serialize>(value: &T, buffer: &mut [u8]) -> Result<usize, CodecError> {
    let capacity = buffer.len();
    bincode::serde::encode_into_slice(value, buffer, config()).map_err(|error| match error {
        bincode::error::EncodeError::UnexpectedEnd => CodecError::BufferTooSmall {
            provided: capacity,
        },
        other => CodecError::Encode {
            detail: other.to_string(),
        },
    })
}

/// Decodes a value from a byte slice, returning it with the bytes consumed.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] when the bytes do not parse.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<(T, usize), CodecError> {
    bincode::serde::decode_from_slice(bytes, config()).map_err(|error| CodecError::Decode {
        detail: error.to_string(),
    })
}

/// [`decode`], dropping the consumed-byte count.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] when the bytes do not parse.
pub fn decode_value<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    decode(bytes).map(|(value, _)| value)
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::store::messages::{
        BestRecord, RawRecord, RequestBody, RequestId, ResponseBody, StoreRequest, StoreResponse,
    };
    use crate::{GameId, Score, UserId};

    fn sample_request() -> StoreRequest {
        StoreRequest {
            id: RequestId::new(41),
            body: RequestBody::RecordBest {
                game: GameId::Memory,
                record: BestRecord {
                    user_id: UserId::new("uid-1"),
                    display_name: "ada".to_owned(),
                    high_score: Score::new(12),
                    updated_at_ms: 1_700_000_000_000,
                },
            },
        }
    }

    #[test]
    fn request_roundtrip() {
        let original = sample_request();
        let bytes = encode(&original).unwrap();
        let (decoded, read): (StoreRequest, _) = decode(&bytes).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(read, bytes.len());
    }

    #[test]
    fn response_roundtrip_with_partial_records() {
        let original = StoreResponse {
            id: RequestId::new(7),
            body: ResponseBody::TopScores {
                records: vec![
                    RawRecord {
                        user_id: None,
                        display_name: Some("ghost".to_owned()),
                        high_score: Some(Score::new(3)),
                        updated_at_ms: None,
                    },
                    RawRecord::default(),
                ],
            },
        };
        let bytes = encode(&original).unwrap();
        let decoded: StoreResponse = decode_value(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn encode_into_reuses_a_buffer() {
        let request = sample_request();
        let mut buffer = [0_u8; 256];
        let len = encode_into(&request, &mut buffer).unwrap();
        assert!(len > 0);

        let (decoded, _): (StoreRequest, _) = decode(&buffer[..len]).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn encode_into_reports_a_tiny_buffer() {
        let request = sample_request();
        let mut buffer = [0_u8; 4];
        assert_eq!(
            encode_into(&request, &mut buffer),
            Err(CodecError::BufferTooSmall { provided: 4 })
        );
    }

    #[test]
    fn decoding_garbage_fails() {
        let garbage = [0xFF_u8, 0xFF, 0xFF];
        let result: Result<(StoreResponse, _), _> = decode(&garbage);
        assert!(matches!(result, Err(CodecError::Decode { .. })));
    }

    #[test]
    fn encoding_is_deterministic() {
        let request = sample_request();
        assert_eq!(encode(&request).unwrap(), encode(&request).unwrap());
    }

    #[test]
    fn errors_render_their_direction() {
        let err = CodecError::Encode {
            detail: "boom".to_owned(),
        };
        assert_eq!(err.to_string(), "encode failed: boom");

        let err = CodecError::Decode {
            detail: "boom".to_owned(),
        };
        assert_eq!(err.to_string(), "decode failed: boom");

        let err = CodecError::BufferTooSmall { provided: 10 };
        assert_eq!(err.to_string(), "encode buffer too small: 10 bytes available");
    }
}
