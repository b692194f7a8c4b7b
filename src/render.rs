//! WAV rendering
//!
//! Pulls samples from a terminal stream and writes them as mono signed
//! 32-bit PCM.

use crate::config::Config;
use crate::error::Error;
use crate::stream::Stream;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use tracing::{debug, info};

/// WAV header for a rack's output.
pub fn wav_spec(config: &Config) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate: config.sample_rate as u32,
        bits_per_sample: 32,
        sample_format: SampleFormat::Int,
    }
}

/// Scale a sample in `[-1, 1]` to the full `i32` range, clamping outliers.
#[inline]
pub fn to_pcm(sample: f64) -> i32 {
    (sample.clamp(-1.0, 1.0) * i32::MAX as f64) as i32
}

/// Write up to `samples` values of `stream` to `writer`.
///
/// Returns the number of samples written, which is smaller than `samples`
/// if the stream ended first.
pub fn render<W: Write + Seek>(
    stream: &mut Stream<f64>,
    samples: usize,
    writer: W,
    config: &Config,
) -> Result<usize, Error> {
    config.validate()?;
    let mut wav = WavWriter::new(writer, wav_spec(config))?;
    let per_second = (config.sample_rate as usize).max(1);
    let mut written = 0;
    let mut peak: f64 = 0.0;

    for sample in stream.by_ref().take(samples) {
        wav.write_sample(to_pcm(sample))?;
        peak = peak.max(sample.abs());
        written += 1;
        if written % per_second == 0 {
            debug!(seconds = written / per_second, "rendering");
        }
    }
    wav.finalize()?;

    info!(
        samples = written,
        seconds = written as f64 / config.sample_rate,
        peak,
        "render finished"
    );
    Ok(written)
}

/// [`render`] into a new file at `path`.
pub fn render_to_file(
    path: impl AsRef<Path>,
    stream: &mut Stream<f64>,
    samples: usize,
    config: &Config,
) -> Result<usize, Error> {
    config.validate()?;
    let path = path.as_ref();
    let file = BufWriter::new(File::create(path)?);
    info!(path = %path.display(), samples, "rendering to file");
    render(stream, samples, file, config)
}
