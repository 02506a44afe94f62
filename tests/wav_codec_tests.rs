// Integration tests for the WAV codec
//
// These tests verify that encoded audio survives a round trip, that streamed
// chunks reassemble into a regular WAV file, and that unsupported input is
// rejected with the right error.

use anyhow::Result;
use speech_stream::audio::wav::{self, WAV_HEADER_SIZE};
use speech_stream::{SpeechError, WavError};
use tempfile::TempDir;

fn sine(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (i as f32 * 0.05).sin() * 0.8)
        .collect()
}

#[test]
fn test_round_trip_within_one_quantisation_step() -> Result<()> {
    let samples = sine(1600);
    let bytes = wav::encode_full(&samples, 1, 16000)?;
    let decoded = wav::decode(&bytes)?;

    assert_eq!(decoded.sample_rate, 16000);
    assert_eq!(decoded.channels, 1);
    assert_eq!(decoded.bit_depth, 16);
    assert_eq!(decoded.pcm_samples.len(), samples.len());

    let step = 1.0 / i16::MAX as f32;
    for (original, restored) in samples.iter().zip(decoded.normalized()) {
        assert!((original - restored).abs() <= step, "{} vs {}", original, restored);
    }

    Ok(())
}

#[test]
fn test_empty_input_is_header_only() -> Result<()> {
    let bytes = wav::encode_full(&[], 1, 16000)?;
    assert_eq!(bytes.len(), WAV_HEADER_SIZE);

    let decoded = wav::decode(&bytes)?;
    assert!(decoded.pcm_samples.is_empty());

    Ok(())
}

#[test]
fn test_samples_are_clamped() -> Result<()> {
    let bytes = wav::encode_full(&[2.0, -3.0, f32::NAN, 1.0, -1.0], 1, 16000)?;
    let decoded = wav::decode(&bytes)?;

    assert_eq!(decoded.pcm_samples, vec![32767, -32767, 0, 32767, -32767]);

    Ok(())
}

#[test]
fn test_incremental_chunks_reassemble_into_full_file() -> Result<()> {
    let samples = sine(3000);
    let (first, rest) = samples.split_at(1000);

    let mut stream = wav::encode_incremental(first, 1, 16000, true)?;
    stream.extend(wav::encode_incremental(&rest[..1000], 1, 16000, false)?);
    stream.extend(wav::encode_incremental(&rest[1000..], 1, 16000, false)?);

    // Payload bytes already match; only the size fields describe the first chunk
    let full = wav::encode_full(&samples, 1, 16000)?;
    assert_eq!(stream.len(), full.len());
    assert_eq!(&stream[WAV_HEADER_SIZE..], &full[WAV_HEADER_SIZE..]);

    wav::finalize_stream_sizes(&mut stream)?;
    assert_eq!(stream, full);

    Ok(())
}

#[test]
fn test_single_chunk_stream_equals_full_encoding() -> Result<()> {
    let samples = sine(500);
    let stream = wav::encode_incremental(&samples, 1, 16000, true)?;
    assert_eq!(stream, wav::encode_full(&samples, 1, 16000)?);
    Ok(())
}

#[test]
fn test_encoded_file_is_readable_by_hound() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("encoded.wav");

    let samples = sine(4800);
    std::fs::write(&path, wav::encode_full(&samples, 2, 48000)?)?;

    let reader = hound::WavReader::open(&path)?;
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 48000);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);

    let read: Vec<i16> = reader.into_samples::<i16>().collect::<Result<_, _>>()?;
    let expected: Vec<i16> = samples.iter().map(|&s| wav::sample_to_i16(s)).collect();
    assert_eq!(read, expected);

    Ok(())
}

#[test]
fn test_decode_hound_written_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("hound.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;
    for sample in [0i16, 1000, -1000, i16::MAX, i16::MIN + 1] {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    let decoded = wav::decode(&std::fs::read(&path)?)?;
    assert_eq!(decoded.pcm_samples, vec![0, 1000, -1000, i16::MAX, i16::MIN + 1]);

    Ok(())
}

#[test]
fn test_eight_bit_audio_is_rejected() -> Result<()> {
    let mut bytes = wav::encode_full(&[0.0; 4], 1, 16000)?;
    bytes[34..36].copy_from_slice(&8u16.to_le_bytes());

    let result = wav::decode(&bytes);
    assert!(matches!(
        result,
        Err(SpeechError::UnsupportedAudioFormat(WavError::UnsupportedBitDepth(8)))
    ));

    Ok(())
}

#[test]
fn test_unknown_format_code_is_rejected() -> Result<()> {
    let mut bytes = wav::encode_full(&[0.0; 4], 1, 16000)?;
    bytes[20..22].copy_from_slice(&3u16.to_le_bytes());

    assert!(matches!(
        wav::decode(&bytes),
        Err(SpeechError::UnsupportedAudioFormat(WavError::UnsupportedFormatCode(3)))
    ));

    Ok(())
}

#[test]
fn test_extensible_format_code_is_accepted() -> Result<()> {
    let mut bytes = wav::encode_full(&[0.25; 4], 1, 16000)?;
    bytes[20..22].copy_from_slice(&65534u16.to_le_bytes());

    assert_eq!(wav::decode(&bytes)?.pcm_samples.len(), 4);

    Ok(())
}

#[test]
fn test_declared_size_beyond_buffer_is_rejected() -> Result<()> {
    let mut bytes = wav::encode_full(&[0.0; 4], 1, 16000)?;
    bytes[40..44].copy_from_slice(&100u32.to_le_bytes());

    assert!(matches!(
        wav::decode(&bytes),
        Err(SpeechError::UnsupportedAudioFormat(WavError::SizeMismatch {
            declared: 100,
            available: 8
        }))
    ));

    Ok(())
}

#[test]
fn test_truncated_header_is_rejected() {
    let result = wav::decode(b"RIFF\x00\x00\x00\x00WAVEfmt ");
    assert!(matches!(
        result,
        Err(SpeechError::UnsupportedAudioFormat(WavError::InvalidFormat(_)))
    ));
}

#[test]
fn test_headerless_buffer_is_raw_pcm() -> Result<()> {
    let mut raw = Vec::new();
    for sample in [1i16, -2, 300] {
        raw.extend_from_slice(&sample.to_le_bytes());
    }

    let decoded = wav::decode(&raw)?;
    assert_eq!(decoded.sample_rate, 16000);
    assert_eq!(decoded.channels, 1);
    assert_eq!(decoded.pcm_samples, vec![1, -2, 300]);

    Ok(())
}

#[test]
fn test_invalid_arguments() {
    assert!(matches!(
        wav::encode_full(&[0.0], 0, 16000),
        Err(SpeechError::InvalidAudioArguments(_))
    ));
    assert!(matches!(
        wav::encode_full(&[0.0], 1, 0),
        Err(SpeechError::InvalidAudioArguments(_))
    ));
}
