use crate::audio::clip::AudioClip;
use crate::error::{Error, Result};
use std::io::Cursor;
use tracing::{info, warn};

/// A bounded-duration contiguous slice of a recording, re-encoded as a
/// standalone WAV blob ready for the speech-to-text service.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk number within the recording (0-indexed)
    pub index: usize,
    /// Offset of the chunk's first sample, in seconds from recording start
    pub start_secs: f64,
    /// Chunk duration in seconds; only the final chunk may be shorter than
    /// the configured maximum
    pub duration_secs: f64,
    /// Encoded WAV bytes for this slice
    pub bytes: Vec<u8>,
}

/// Splits a decoded recording into fixed-length chunks.
///
/// Chunks are contiguous, non-overlapping, and cover the whole recording;
/// their count is `ceil(duration / max_chunk_secs)`. A chunk whose WAV
/// export fails is skipped with a diagnostic rather than aborting the split,
/// so callers must tolerate a shorter output list.
#[derive(Debug, Clone)]
pub struct Segmenter {
    max_chunk_secs: u64,
}

impl Segmenter {
    pub fn new(max_chunk_secs: u64) -> Self {
        Self { max_chunk_secs }
    }

    pub fn segment(&self, clip: &AudioClip) -> Result<Vec<Chunk>> {
        let total_frames = clip.frames();
        if total_frames == 0 {
            return Err(Error::EmptyAudio);
        }

        // Chunk arithmetic is done in whole frames so durations sum exactly.
        let frames_per_chunk = (self.max_chunk_secs * clip.sample_rate as u64) as usize;
        let count = total_frames.div_ceil(frames_per_chunk);
        let channels = clip.channels as usize;

        let mut chunks = Vec::with_capacity(count);
        for index in 0..count {
            let begin = index * frames_per_chunk;
            let end = usize::min(begin + frames_per_chunk, total_frames);
            let slice = &clip.samples[begin * channels..end * channels];

            match encode_wav(slice, clip.sample_rate, clip.channels) {
                Ok(bytes) => chunks.push(Chunk {
                    index,
                    start_secs: begin as f64 / clip.sample_rate as f64,
                    duration_secs: (end - begin) as f64 / clip.sample_rate as f64,
                    bytes,
                }),
                Err(e) => {
                    warn!("Chunk {} export failed, skipping: {}", index, e);
                }
            }
        }

        info!(
            "Segmented {:.1}s recording into {} chunks ({} expected, {}s max each)",
            clip.duration_seconds(),
            chunks.len(),
            count,
            self.max_chunk_secs
        );

        Ok(chunks)
    }
}

/// Encode one PCM slice as a standalone WAV blob.
fn encode_wav(
    samples: &[i16],
    sample_rate: u32,
    channels: u16,
) -> std::result::Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}
