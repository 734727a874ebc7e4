use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::error::ClipperError;
use crate::models::{Sample, SignalSource, TimeSeries};

/// Computes a short-time RMS loudness envelope from a decoded WAV track.
/// The series is normalized by its own maximum so the detector's threshold
/// means the same thing across streams of different loudness.
#[derive(Debug, Clone)]
pub struct AudioEnergyExtractor {
    hop_secs: f64,
}

impl AudioEnergyExtractor {
    pub fn new(hop_secs: f64) -> Self {
        Self { hop_secs }
    }

    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<TimeSeries, ClipperError> {
        let (samples, sample_rate) =
            load_wav_mono(path.as_ref()).map_err(|e| ClipperError::Extraction {
                source: SignalSource::Audio,
                reason: format!("{e:#}"),
            })?;

        self.extract(&samples, sample_rate)
    }

    pub fn extract(&self, samples: &[f32], sample_rate: u32) -> Result<TimeSeries, ClipperError> {
        let malformed = |reason: String| ClipperError::Extraction {
            source: SignalSource::Audio,
            reason,
        };

        if samples.is_empty() {
            return Err(malformed("waveform is empty".to_string()));
        }
        if sample_rate == 0 {
            return Err(malformed("invalid sample rate 0".to_string()));
        }

        let hop = (self.hop_secs * sample_rate as f64) as usize;
        if hop == 0 {
            return Err(malformed(format!(
                "hop of {}s is below one sample at {} Hz",
                self.hop_secs, sample_rate
            )));
        }

        let mut envelope: Vec<Sample> = samples
            .chunks(hop)
            .enumerate()
            .map(|(i, chunk)| Sample {
                t: i as f64 * self.hop_secs,
                value: rms(chunk),
            })
            .collect();

        // Per-VOD normalization. An all-silent track stays at zero rather
        // than failing.
        let max = envelope.iter().map(|s| s.value).fold(0.0_f64, f64::max);
        if max > 0.0 {
            for sample in &mut envelope {
                sample.value /= max;
            }
        }

        TimeSeries::new(SignalSource::Audio, self.hop_secs, envelope)
    }
}

fn rms(chunk: &[f32]) -> f64 {
    if chunk.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = chunk.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / chunk.len() as f64).sqrt()
}

/// Read a WAV file and mix all channels down to mono f32.
fn load_wav_mono(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {path:?}"))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    if spec.sample_rate == 0 {
        return Err(anyhow!("WAV file reports a sample rate of 0"));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .context("Failed to decode WAV samples")?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("Failed to decode WAV samples")?,
    };

    let mono: Vec<f32> = interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    Ok((mono, spec.sample_rate))
}
