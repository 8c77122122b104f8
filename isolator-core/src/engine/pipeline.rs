//! Blocking isolation loop.
//!
//! ## Pipeline stages (per frame)
//!
//! ```text
//! 1. FrameSegmenter yields the next 20 ms frame of channel 0
//! 2. SpeechGate classifies it (resample → i16 → VAD)
//! 3. Speech → copy the original samples into the output at the same offset
//!    Silence → leave the output region at zero
//! 4. Report progress to the sink; stop if the sink asks to
//! ```
//!
//! One forward pass, in frame order, O(n) in the sample count. A verdict
//! never changes the output outside its own frame.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, info_span};

use crate::{
    audio::SampleBuffer,
    encode::{encode_wav, EncodedContainer},
    error::{IsolatorError, Result},
    framing::FrameSegmenter,
    gate::SpeechGate,
    vad::{VadDecision, VoiceActivityDetector},
};

/// Progress for one classified frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameProgress {
    pub frame_index: usize,
    pub total_frames: usize,
    /// `(frame_index + 1) / total_frames`; 1.0 after the last frame.
    pub progress: f32,
    pub is_speech: bool,
}

/// Receives progress after every frame and decides whether the run goes on.
pub trait ProgressSink {
    /// Return `false` to abandon the run before the next frame.
    fn report(&mut self, progress: &FrameProgress) -> bool;
}

impl<F> ProgressSink for F
where
    F: FnMut(&FrameProgress) -> bool,
{
    fn report(&mut self, progress: &FrameProgress) -> bool {
        self(progress)
    }
}

/// Sink that ignores progress and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _progress: &FrameProgress) -> bool {
        true
    }
}

/// Mono output of a run: same length and rate as the input, silence
/// wherever the gate did not report speech.
#[derive(Debug, Clone, PartialEq)]
pub struct IsolatedBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl IsolatedBuffer {
    fn silent(len: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![0.0; len],
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Consume the buffer into a mono 16-bit PCM WAV container.
    pub fn encode(self) -> Result<EncodedContainer> {
        encode_wav(&[self.samples], self.sample_rate)
    }
}

/// Summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IsolationReport {
    pub sample_rate: u32,
    pub frame_size: usize,
    pub total_frames: usize,
    pub speech_frames: usize,
    pub speech_samples: usize,
    /// Frames that resampled to fewer than 320 samples.
    pub short_frames: usize,
    pub vad_errors: usize,
    pub duration_secs: f64,
}

impl IsolationReport {
    /// Fraction of the input kept as speech.
    pub fn speech_ratio(&self) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.speech_frames as f64 / self.total_frames as f64
    }
}

/// Run the isolation loop over channel 0 of `input`.
///
/// `vad` is reset before the first frame and is invoked strictly in frame
/// order. The caller keeps ownership of the session.
///
/// # Errors
/// - `IsolatorError::Configuration` if `frame_duration` gives an empty frame
///   at the input rate (nothing is processed).
/// - `IsolatorError::Cancelled` if `sink` returns `false`; no buffer is returned.
pub fn run<V, S>(
    input: &SampleBuffer,
    frame_duration: Duration,
    gate: &SpeechGate,
    vad: &mut V,
    sink: &mut S,
) -> Result<(IsolatedBuffer, IsolationReport)>
where
    V: VoiceActivityDetector + ?Sized,
    S: ProgressSink + ?Sized,
{
    let sample_rate = input.sample_rate();
    let samples = input.primary_channel();
    let mut segmenter = FrameSegmenter::new(samples, sample_rate, frame_duration)?;

    let span = info_span!("isolation", vad = vad.name(), sample_rate);
    let _enter = span.enter();

    info!(
        samples = samples.len(),
        channels = input.channel_count(),
        frame_size = segmenter.frame_size(),
        total_frames = segmenter.total_frames(),
        "isolation started"
    );
    if input.channel_count() > 1 {
        debug!(
            ignored = input.channel_count() - 1,
            "analysing channel 0 only"
        );
    }

    vad.reset();

    let diagnostics_before = gate.diagnostics().snapshot();
    let mut output = IsolatedBuffer::silent(samples.len(), sample_rate);
    let mut report = IsolationReport {
        sample_rate,
        frame_size: segmenter.frame_size(),
        total_frames: segmenter.total_frames(),
        duration_secs: input.duration_secs(),
        ..IsolationReport::default()
    };

    while let Some(mut frame) = segmenter.next() {
        let is_speech = gate.classify(&frame, vad, sample_rate);
        frame.verdict = Some(VadDecision::from(is_speech));

        if frame.is_speech() {
            output.samples[frame.range()].copy_from_slice(frame.samples);
            report.speech_frames += 1;
            report.speech_samples += frame.len();
        }

        let progress = FrameProgress {
            frame_index: frame.index,
            total_frames: segmenter.total_frames(),
            progress: segmenter.progress(),
            is_speech,
        };
        if !sink.report(&progress) {
            info!(
                frame_index = frame.index,
                total_frames = segmenter.total_frames(),
                "isolation cancelled"
            );
            return Err(IsolatorError::Cancelled);
        }
    }

    let diagnostics_after = gate.diagnostics().snapshot();
    report.short_frames = diagnostics_after.short_frames - diagnostics_before.short_frames;
    report.vad_errors = diagnostics_after.vad_errors - diagnostics_before.vad_errors;

    info!(
        speech_frames = report.speech_frames,
        total_frames = report.total_frames,
        short_frames = report.short_frames,
        vad_errors = report.vad_errors,
        "isolation finished"
    );

    Ok((output, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    use crate::framing::DEFAULT_FRAME_DURATION;
    use crate::vad::VadFrame;

    /// Answers by call index: calls in `speech` are Speech, the rest Silence.
    struct ScriptedVad {
        speech: HashSet<usize>,
        calls: usize,
        resets: usize,
    }

    impl ScriptedVad {
        fn new(speech: &[usize]) -> Self {
            Self {
                speech: speech.iter().copied().collect(),
                calls: 0,
                resets: 0,
            }
        }
    }

    impl VoiceActivityDetector for ScriptedVad {
        fn process(&mut self, _frame: &VadFrame) -> Result<VadDecision> {
            let decision = VadDecision::from(self.speech.contains(&self.calls));
            self.calls += 1;
            Ok(decision)
        }

        fn reset(&mut self) {
            self.resets += 1;
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn tone(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (i as f32 * 0.05).sin() + 0.25)
            .collect()
    }

    #[test]
    fn only_forced_speech_frames_survive() {
        let frame = 320;
        let input = SampleBuffer::mono(tone(frame * 10), 16_000).unwrap();
        let mut vad = ScriptedVad::new(&[2, 5, 7]);
        let gate = SpeechGate::default();

        let (output, report) =
            run(&input, DEFAULT_FRAME_DURATION, &gate, &mut vad, &mut NoProgress).unwrap();

        assert_eq!(output.len(), input.len());
        assert_eq!(output.sample_rate(), 16_000);
        assert_eq!(report.total_frames, 10);
        assert_eq!(report.speech_frames, 3);
        assert_eq!(report.speech_samples, 3 * frame);

        for (i, (&out, &orig)) in output
            .samples()
            .iter()
            .zip(input.primary_channel())
            .enumerate()
        {
            if [2, 5, 7].contains(&(i / frame)) {
                assert_eq!(out, orig, "speech sample {i} not copied verbatim");
                assert_ne!(out, 0.0);
            } else {
                assert_eq!(out, 0.0, "non-speech sample {i} is not silent");
            }
        }
        assert_eq!(vad.resets, 1);
    }

    #[test]
    fn ragged_tail_is_processed_and_left_silent() {
        // 5 full frames + 100-sample tail at 16 kHz
        let input = SampleBuffer::mono(tone(320 * 5 + 100), 16_000).unwrap();
        let mut vad = ScriptedVad::new(&[0, 1, 2, 3, 4, 5]);
        let gate = SpeechGate::default();

        let (output, report) =
            run(&input, DEFAULT_FRAME_DURATION, &gate, &mut vad, &mut NoProgress).unwrap();

        assert_eq!(report.total_frames, 6);
        assert_eq!(report.short_frames, 1);
        assert_eq!(vad.calls, 5, "short tail must not reach the vad");
        assert!(output.samples()[1_600..].iter().all(|&s| s == 0.0));
        assert_eq!(&output.samples()[..1_600], &input.primary_channel()[..1_600]);
    }

    #[test]
    fn output_keeps_original_rate_and_precision_at_44k() {
        let input = SampleBuffer::mono(tone(882 * 4), 44_100).unwrap();
        let mut vad = ScriptedVad::new(&[1]);
        let gate = SpeechGate::default();

        let (output, _) =
            run(&input, DEFAULT_FRAME_DURATION, &gate, &mut vad, &mut NoProgress).unwrap();

        assert_eq!(output.sample_rate(), 44_100);
        assert_eq!(&output.samples()[882..1_764], &input.primary_channel()[882..1_764]);
        assert!(output.samples()[..882].iter().all(|&s| s == 0.0));
        assert!(output.samples()[1_764..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn stereo_input_uses_channel_zero() {
        let left = tone(640);
        let right = vec![0.9f32; 640];
        let input = SampleBuffer::new(vec![left.clone(), right], 16_000).unwrap();
        let mut vad = ScriptedVad::new(&[0, 1]);
        let gate = SpeechGate::default();

        let (output, _) =
            run(&input, DEFAULT_FRAME_DURATION, &gate, &mut vad, &mut NoProgress).unwrap();
        assert_eq!(output.samples(), &left[..]);
    }

    #[test]
    fn progress_reported_after_each_frame_and_reaches_one() {
        let input = SampleBuffer::mono(tone(320 * 4), 16_000).unwrap();
        let mut vad = ScriptedVad::new(&[]);
        let gate = SpeechGate::default();
        let mut seen = Vec::new();
        let mut sink = |p: &FrameProgress| {
            seen.push(*p);
            true
        };

        run(&input, DEFAULT_FRAME_DURATION, &gate, &mut vad, &mut sink).unwrap();

        let fractions: Vec<f32> = seen.iter().map(|p| p.progress).collect();
        assert_eq!(fractions, vec![0.25, 0.5, 0.75, 1.0]);
        assert!(seen.iter().all(|p| p.total_frames == 4 && !p.is_speech));
    }

    #[test]
    fn sink_can_cancel_between_frames() {
        let input = SampleBuffer::mono(tone(320 * 10), 16_000).unwrap();
        let mut vad = ScriptedVad::new(&[0, 1, 2]);
        let gate = SpeechGate::default();
        let mut sink = |p: &FrameProgress| p.frame_index < 2;

        let result = run(&input, DEFAULT_FRAME_DURATION, &gate, &mut vad, &mut sink);
        assert!(matches!(result, Err(IsolatorError::Cancelled)));
        assert_eq!(vad.calls, 3, "no frame processed after cancellation");
    }

    #[test]
    fn zero_sample_frame_is_configuration_error_before_any_vad_call() {
        let input = SampleBuffer::mono(tone(100), 16_000).unwrap();
        let mut vad = ScriptedVad::new(&[]);
        let gate = SpeechGate::default();

        let result = run(
            &input,
            Duration::from_micros(10),
            &gate,
            &mut vad,
            &mut NoProgress,
        );
        assert!(matches!(result, Err(IsolatorError::Configuration(_))));
        assert_eq!(vad.calls, 0);
        assert_eq!(vad.resets, 0);
    }

    #[test]
    fn empty_input_produces_empty_output() {
        let input = SampleBuffer::mono(vec![], 16_000).unwrap();
        let mut vad = ScriptedVad::new(&[]);
        let gate = SpeechGate::default();

        let (output, report) =
            run(&input, DEFAULT_FRAME_DURATION, &gate, &mut vad, &mut NoProgress).unwrap();
        assert!(output.is_empty());
        assert_eq!(report.total_frames, 0);
        assert_eq!(report.speech_ratio(), 0.0);
    }
}
