use crate::error::{Error, Result};
use hound::WavReader;
use std::io::Cursor;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::info;

/// A decoded recording: interleaved 16-bit PCM plus its format.
///
/// This is the segmenter's working form. Blobs stored in the library stay in
/// their original container; decoding happens once per `generate()` run.
#[derive(Debug)]
pub struct AudioClip {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioClip {
    /// Decode a WAV blob into PCM samples.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let reader = WavReader::new(Cursor::new(bytes))
            .map_err(|e| Error::Decode(e.to_string()))?;

        let spec = reader.spec();
        if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
            return Err(Error::Decode(format!(
                "expected 16-bit integer PCM, got {}-bit {:?}",
                spec.bits_per_sample, spec.sample_format
            )));
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Decode(e.to_string()))?;

        info!(
            "Decoded audio: {:.1}s, {}Hz, {} channels, {} samples",
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64),
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Total duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }
}

/// Validate that an imported byte stream is decodable audio before it is
/// accepted as an item's blob.
///
/// Uses container probing rather than a full decode so non-WAV imports
/// (M4A, MP3, FLAC, OGG) are accepted too. The file extension, when known,
/// narrows the probe.
pub fn probe_decodable(bytes: &[u8], name: &str) -> Result<()> {
    if bytes.is_empty() {
        return Err(Error::EmptyAudio);
    }

    let mut hint = Hint::new();
    if let Some(ext) = name.rsplit('.').next().filter(|ext| *ext != name) {
        hint.with_extension(ext);
    }

    let source = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::Decode(e.to_string()))?;

    Ok(())
}
