//! WAV decoding into `SampleBuffer`.

use std::io::Read;
use std::path::Path;

use isolator_core::{error::Result, IsolatorError, SampleBuffer};

fn decode_err(e: hound::Error) -> IsolatorError {
    IsolatorError::Decode(e.to_string())
}

pub fn read_wav_file(path: &Path) -> Result<SampleBuffer> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| IsolatorError::Decode(format!("{}: {e}", path.display())))?;
    read_wav(reader)
}

pub fn read_wav_bytes<R: Read>(source: R) -> Result<SampleBuffer> {
    let reader = hound::WavReader::new(source).map_err(decode_err)?;
    read_wav(reader)
}

/// Integer PCM is scaled by `2^(bits-1)` so full scale lands in [-1, 1).
fn read_wav<R: Read>(mut reader: hound::WavReader<R>) -> Result<SampleBuffer> {
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(IsolatorError::Decode("wav header declares zero channels".into()));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(decode_err)?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(decode_err)?
        }
    };

    SampleBuffer::from_interleaved(&interleaved, spec.channels, spec.sample_rate)
        .map_err(|e| IsolatorError::Decode(e.to_string()))
}
