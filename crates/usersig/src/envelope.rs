//! Token envelope: JSON document → zlib → URL-safe base64.
//!
//! The outer base64 layer uses the alphabet `A-Z a-z 0-9 * -` with `_` as
//! the padding character, so a packed token can sit in a URL query without
//! escaping. Binary fields inside the JSON carry their own standard base64
//! layer, independent of this one.

use base64::Engine;
use base64::alphabet::Alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use flate2::bufread::ZlibDecoder;
use std::io::Read;
use usersig_core::{DEFAULT_COMPRESSION_LEVEL, DEFAULT_POOL_CAPACITY};

use crate::document::SigDocument;
use crate::error::{MalformedStage, UserSigError};
use crate::pool::CompressorPool;

const URL_ALPHABET: Alphabet =
    match Alphabet::new("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789*-") {
        Ok(alphabet) => alphabet,
        Err(_) => panic!("invalid token alphabet"),
    };

const URL_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &URL_ALPHABET,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

/// Padding character of the token alphabet.
const TOKEN_PAD: char = '_';

/// Upper bound on an inflated document.
pub const MAX_DOCUMENT_BYTES: u64 = 1 << 20;

/// Encode bytes with the token alphabet.
pub fn encode_url(data: &[u8]) -> String {
    URL_ENGINE.encode(data).replace('=', "_")
}

/// Decode bytes written with the token alphabet.
pub fn decode_url(token: &str) -> Result<Vec<u8>, UserSigError> {
    if token.contains('=') {
        return Err(UserSigError::malformed(
            MalformedStage::Base64,
            "'=' is not part of the token alphabet",
        ));
    }
    URL_ENGINE
        .decode(token.replace(TOKEN_PAD, "="))
        .map_err(|e| UserSigError::malformed(MalformedStage::Base64, e.to_string()))
}

/// Packs and unpacks token documents.
#[derive(Debug)]
pub struct Envelope {
    pool: CompressorPool,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL, DEFAULT_POOL_CAPACITY)
    }
}

impl Envelope {
    /// Create an envelope compressing at `level` with up to `pool_capacity`
    /// idle compressors.
    pub fn new(level: u32, pool_capacity: usize) -> Self {
        Self {
            pool: CompressorPool::new(level, pool_capacity),
        }
    }

    /// The compressor pool backing [`pack`](Self::pack).
    pub fn pool(&self) -> &CompressorPool {
        &self.pool
    }

    /// Serialize, compress and encode a document.
    pub fn pack(&self, document: &SigDocument) -> Result<String, UserSigError> {
        let mut json = serde_json::to_vec(document).map_err(|e| UserSigError::Serialization {
            reason: e.to_string(),
        })?;
        json.push(b'\n');

        let compressed = self.pool.checkout().compress(&json)?;
        Ok(encode_url(&compressed))
    }

    /// Decode, decompress and parse a token.
    pub fn unpack(token: &str) -> Result<SigDocument, UserSigError> {
        let compressed = decode_url(token)?;

        let mut decoder = ZlibDecoder::new(compressed.as_slice());
        let mut json = Vec::new();
        (&mut decoder)
            .take(MAX_DOCUMENT_BYTES + 1)
            .read_to_end(&mut json)
            .map_err(|e| UserSigError::malformed(MalformedStage::Zlib, e.to_string()))?;
        if json.len() as u64 > MAX_DOCUMENT_BYTES {
            return Err(UserSigError::malformed(
                MalformedStage::Zlib,
                format!("document exceeds {MAX_DOCUMENT_BYTES} bytes"),
            ));
        }
        // Bytes after the end of the zlib stream would let a token be
        // altered without touching the signed document.
        let trailing = decoder.get_ref().len();
        if trailing != 0 {
            return Err(UserSigError::malformed(
                MalformedStage::Zlib,
                format!("{trailing} bytes after end of zlib stream"),
            ));
        }

        serde_json::from_slice(&json)
            .map_err(|e| UserSigError::malformed(MalformedStage::Json, e.to_string()))
    }
}
