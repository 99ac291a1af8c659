// Integration tests for audio segmentation
//
// These tests verify that a decoded recording splits into contiguous,
// non-overlapping, bounded-duration chunks whose durations sum to the
// recording's total duration.

use anyhow::Result;
use voxnotes::audio::{probe_decodable, AudioClip, Segmenter};
use voxnotes::Error;

/// Build a clip of the given duration directly from PCM samples.
fn make_clip(duration_secs: u64, sample_rate: u32, channels: u16) -> AudioClip {
    let frames = (duration_secs * sample_rate as u64) as usize;
    AudioClip {
        sample_rate,
        channels,
        samples: vec![0i16; frames * channels as usize],
    }
}

/// Encode a short WAV blob for decode/probe tests.
fn make_wav_bytes(duration_secs: u64, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..(duration_secs * sample_rate as u64) {
            writer.write_sample((i % 100) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

#[test]
fn test_250s_recording_with_120s_chunks_yields_120_120_10() -> Result<()> {
    let clip = make_clip(250, 100, 1);
    let chunks = Segmenter::new(120).segment(&clip)?;

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].duration_secs, 120.0);
    assert_eq!(chunks[1].duration_secs, 120.0);
    assert_eq!(chunks[2].duration_secs, 10.0);

    Ok(())
}

#[test]
fn test_short_recording_yields_single_chunk() -> Result<()> {
    let clip = make_clip(5, 100, 1);
    let chunks = Segmenter::new(10).segment(&clip)?;

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].index, 0);
    assert_eq!(chunks[0].start_secs, 0.0);
    assert_eq!(chunks[0].duration_secs, 5.0);

    Ok(())
}

#[test]
fn test_chunk_count_durations_and_contiguity() -> Result<()> {
    for &(duration, max_chunk) in &[(1u64, 1u64), (5, 2), (7, 3), (120, 120), (121, 120), (600, 120)] {
        let clip = make_clip(duration, 50, 1);
        let chunks = Segmenter::new(max_chunk).segment(&clip)?;

        let expected = (duration + max_chunk - 1) / max_chunk;
        assert_eq!(
            chunks.len() as u64,
            expected,
            "count mismatch for D={duration} C={max_chunk}"
        );

        let mut cursor = 0.0;
        let mut total = 0.0;
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert!(chunk.duration_secs > 0.0);
            assert!(chunk.duration_secs <= max_chunk as f64);
            assert_eq!(chunk.start_secs, cursor, "chunks must be contiguous");
            cursor += chunk.duration_secs;
            total += chunk.duration_secs;
        }
        assert_eq!(total, duration as f64, "durations must sum to the total");
    }

    Ok(())
}

#[test]
fn test_exact_multiple_has_no_short_tail() -> Result<()> {
    let clip = make_clip(240, 100, 1);
    let chunks = Segmenter::new(120).segment(&clip)?;

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].duration_secs, 120.0);
    assert_eq!(chunks[1].duration_secs, 120.0);

    Ok(())
}

#[test]
fn test_stereo_durations_sum_to_total() -> Result<()> {
    let clip = make_clip(30, 100, 2);
    let chunks = Segmenter::new(12).segment(&clip)?;

    assert_eq!(chunks.len(), 3);
    let total: f64 = chunks.iter().map(|chunk| chunk.duration_secs).sum();
    assert_eq!(total, 30.0);

    Ok(())
}

#[test]
fn test_empty_recording_fails() {
    let clip = make_clip(0, 100, 1);
    let err = Segmenter::new(120).segment(&clip).unwrap_err();
    assert!(matches!(err, Error::EmptyAudio));
}

#[test]
fn test_chunk_bytes_are_standalone_wav() -> Result<()> {
    let clip = make_clip(25, 100, 1);
    let chunks = Segmenter::new(10).segment(&clip)?;

    // The final chunk is a valid recording on its own, with the tail length.
    let tail = AudioClip::decode(&chunks[2].bytes)?;
    assert_eq!(tail.sample_rate, 100);
    assert_eq!(tail.frames(), 500);

    Ok(())
}

#[test]
fn test_decode_rejects_garbage() {
    let err = AudioClip::decode(b"definitely not audio").unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

#[test]
fn test_probe_accepts_wav_import() -> Result<()> {
    let bytes = make_wav_bytes(1, 8000);
    probe_decodable(&bytes, "lecture.wav")?;
    Ok(())
}

#[test]
fn test_probe_rejects_undecodable_import() {
    let err = probe_decodable(b"definitely not audio", "lecture.wav").unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

#[test]
fn test_probe_rejects_empty_import() {
    let err = probe_decodable(&[], "empty.wav").unwrap_err();
    assert!(matches!(err, Error::EmptyAudio));
}
