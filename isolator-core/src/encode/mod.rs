//! Serialisation of isolated audio into an uncompressed PCM container.

pub mod wav;

pub use wav::{encode_wav, quantize_for_container, WAV_HEADER_LEN};

/// Immutable encoded container bytes.
///
/// Produced once by `encode_wav` and handed to the host for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedContainer {
    bytes: Vec<u8>,
}

impl EncodedContainer {
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The PCM payload following the 44-byte header.
    pub fn pcm_data(&self) -> &[u8] {
        &self.bytes[WAV_HEADER_LEN.min(self.bytes.len())..]
    }
}

impl AsRef<[u8]> for EncodedContainer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
