//! 16-bit PCM RIFF/WAVE writer.
//!
//! ## Layout
//!
//! | Offset | Size | Field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 4    | `"RIFF"`                                |
//! | 4      | 4    | total size − 8 (= 36 + data length)     |
//! | 8      | 4    | `"WAVE"`                                |
//! | 12     | 4    | `"fmt "`                                |
//! | 16     | 4    | 16 (fmt chunk size)                     |
//! | 20     | 2    | 1 (PCM)                                 |
//! | 22     | 2    | channel count                           |
//! | 24     | 4    | sample rate                             |
//! | 28     | 4    | byte rate = rate × channels × 2         |
//! | 32     | 2    | block align = channels × 2              |
//! | 34     | 2    | 16 (bits per sample)                    |
//! | 36     | 4    | `"data"`                                |
//! | 40     | 4    | data length in bytes                    |
//! | 44     | …    | interleaved little-endian i16 samples   |
//!
//! All multi-byte fields are little-endian.

use super::EncodedContainer;
use crate::error::{IsolatorError, Result};

pub const WAV_HEADER_LEN: usize = 44;

const PCM_FORMAT: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: u32 = 2;

/// Quantize one f32 sample for the container: `round(clamp(x) * 32767)`.
///
/// Symmetric, unlike `gate::quantize_for_vad`; −1.0 maps to −32767.
pub fn quantize_for_container(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32_767.0).round() as i16
}

/// Encode per-channel samples as a 16-bit PCM WAV container.
///
/// Channels are interleaved frame by frame (`L R L R …` for stereo); a
/// single channel is written directly.
///
/// # Errors
/// Returns `IsolatorError::Encode` when `channels` is empty, the channels
/// differ in length, there are more than 65 535 channels, or the PCM data
/// would exceed the 4 GiB RIFF limit.
pub fn encode_wav<C: AsRef<[f32]>>(channels: &[C], sample_rate: u32) -> Result<EncodedContainer> {
    let Some(first) = channels.first() else {
        return Err(IsolatorError::Encode("no channels to encode".into()));
    };
    let frames = first.as_ref().len();
    if channels.iter().any(|c| c.as_ref().len() != frames) {
        return Err(IsolatorError::Encode(
            "channels must have equal length".into(),
        ));
    }
    let channel_count = u16::try_from(channels.len())
        .map_err(|_| IsolatorError::Encode(format!("{} channels", channels.len())))?;

    let data_len = u32::try_from(frames)
        .ok()
        .and_then(|f| f.checked_mul(u32::from(channel_count)))
        .and_then(|n| n.checked_mul(BYTES_PER_SAMPLE))
        .filter(|&n| n <= u32::MAX - 36)
        .ok_or_else(|| IsolatorError::Encode("PCM data exceeds RIFF size limit".into()))?;
    let byte_rate = sample_rate
        .checked_mul(u32::from(channel_count) * BYTES_PER_SAMPLE)
        .ok_or_else(|| IsolatorError::Encode("byte rate overflows u32".into()))?;
    let block_align = channel_count
        .checked_mul(BYTES_PER_SAMPLE as u16)
        .ok_or_else(|| IsolatorError::Encode("block align overflows u16".into()))?;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&PCM_FORMAT.to_le_bytes());
    out.extend_from_slice(&channel_count.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    if let [mono] = channels {
        for &s in mono.as_ref() {
            out.extend_from_slice(&quantize_for_container(s).to_le_bytes());
        }
    } else {
        for i in 0..frames {
            for ch in channels {
                out.extend_from_slice(&quantize_for_container(ch.as_ref()[i]).to_le_bytes());
            }
        }
    }

    Ok(EncodedContainer::from_bytes(out))
}
