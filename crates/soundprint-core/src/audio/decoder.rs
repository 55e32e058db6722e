//! Audio decoding for multiple formats

use super::{resample_linear, AudioFormat};
use crate::error::{Result, SoundprintError};
use crate::model::Tags;
use anyhow::Context;
use std::path::Path;
use std::time::Duration;

/// Decoded mono audio ready for fingerprinting
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Mono samples at `sample_rate`, possibly truncated
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Duration of the whole source, before truncation
    pub duration_ms: u64,
    pub source_sample_rate: u32,
    pub source_channels: u16,
    pub format: AudioFormat,
}

impl AudioData {
    /// Technical tags stored with the track
    pub fn tags(&self) -> Tags {
        let mut tags = Tags::new();
        tags.insert("channels", self.source_channels.to_string());
        tags.insert("samplerate", self.source_sample_rate.to_string());
        tags.insert("format", self.format.name());
        tags
    }
}

/// Interleaved samples straight out of a decoder
struct RawAudio {
    /// At most `limit` frames worth of samples
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
    /// Frames in the whole stream, including the ones not kept
    total_frames: u64,
}

impl RawAudio {
    fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.total_frames * 1000 / self.sample_rate as u64
    }

    /// Average channels into one
    fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks(self.channels as usize)
            .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
            .collect()
    }
}

/// Interleaved samples to keep for `seconds` of audio, 0 keeps everything
fn sample_limit(seconds: u32, sample_rate: u32, channels: u16) -> usize {
    if seconds == 0 {
        return usize::MAX;
    }
    seconds as usize * sample_rate as usize * channels as usize
}

/// Decode a file to mono at `target_sample_rate`
///
/// Only the first `seconds_to_analyze` seconds are decoded and kept (0 keeps
/// everything). The reported duration still covers the whole file.
pub fn decode_audio(path: &Path, target_sample_rate: u32, seconds_to_analyze: u32) -> Result<AudioData> {
    let format = AudioFormat::from_path(path);

    let raw = decode_raw(path, format, seconds_to_analyze)
        .map_err(|e| SoundprintError::Decode(format!("{}: {:#}", path.display(), e)))?;

    if raw.sample_rate == 0 || raw.channels == 0 {
        return Err(SoundprintError::Decode(format!(
            "{}: stream reports no channels or sample rate",
            path.display()
        )));
    }

    let duration_ms = raw.duration_ms();
    let mut samples = resample_linear(&raw.to_mono(), raw.sample_rate, target_sample_rate);
    if seconds_to_analyze > 0 {
        samples.truncate(seconds_to_analyze as usize * target_sample_rate as usize);
    }

    log::debug!(
        "Decoded {} ({} Hz, {} ch, {} ms) to {} samples",
        path.display(),
        raw.sample_rate,
        raw.channels,
        duration_ms,
        samples.len()
    );

    Ok(AudioData {
        samples,
        sample_rate: target_sample_rate,
        duration_ms,
        source_sample_rate: raw.sample_rate,
        source_channels: raw.channels,
        format,
    })
}

/// Read the duration from container headers without decoding
///
/// `None` when the format does not expose it cheaply.
pub fn header_duration(path: &Path) -> Option<Duration> {
    match AudioFormat::from_path(path) {
        AudioFormat::Wav => {
            let reader = hound::WavReader::open(path).ok()?;
            let rate = reader.spec().sample_rate;
            (rate > 0).then(|| Duration::from_secs_f64(reader.duration() as f64 / rate as f64))
        }
        AudioFormat::Flac => {
            let reader = claxon::FlacReader::open(path).ok()?;
            let info = reader.streaminfo();
            let frames = info.samples?;
            (info.sample_rate > 0)
                .then(|| Duration::from_secs_f64(frames as f64 / info.sample_rate as f64))
        }
        _ => None,
    }
}

fn decode_raw(path: &Path, format: AudioFormat, seconds: u32) -> anyhow::Result<RawAudio> {
    match format {
        AudioFormat::Wav => decode_wav(path, seconds),
        AudioFormat::Mp3 => decode_mp3(path, seconds),
        AudioFormat::Flac => decode_flac(path, seconds),
        AudioFormat::Ogg => decode_ogg(path, seconds),
        AudioFormat::Unknown => anyhow::bail!("unsupported audio format"),
    }
}

/// Decode WAV file, reading no further than the limit
fn decode_wav(path: &Path, seconds: u32) -> anyhow::Result<RawAudio> {
    let mut reader = hound::WavReader::open(path).context("Failed to open WAV file")?;

    let spec = reader.spec();
    let total_frames = reader.duration() as u64;
    let limit = sample_limit(seconds, spec.sample_rate, spec.channels);

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .take(limit)
            .collect::<std::result::Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .take(limit)
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok(RawAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        total_frames,
    })
}

/// Decode MP3 file
///
/// MP3 has no reliable length header, so frames past the limit are still
/// decoded to count them but their samples are dropped.
fn decode_mp3(path: &Path, seconds: u32) -> anyhow::Result<RawAudio> {
    let file = std::fs::File::open(path).context("Failed to open MP3 file")?;

    let mut decoder = minimp3::Decoder::new(std::io::BufReader::new(file));
    let mut samples = Vec::new();
    let mut sample_rate = 0;
    let mut channels = 0;
    let mut limit = usize::MAX;
    let mut total_samples = 0u64;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    sample_rate = frame.sample_rate as u32;
                    channels = frame.channels as u16;
                    limit = sample_limit(seconds, sample_rate, channels);
                }
                total_samples += frame.data.len() as u64;
                let room = limit.saturating_sub(samples.len());
                samples.extend(frame.data.iter().take(room).map(|&s| s as f32 / 32768.0));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => anyhow::bail!("MP3 decode error: {}", e),
        }
    }

    Ok(RawAudio {
        samples,
        sample_rate,
        channels,
        total_frames: total_samples / channels.max(1) as u64,
    })
}

/// Decode FLAC file, reading no further than the limit
fn decode_flac(path: &Path, seconds: u32) -> anyhow::Result<RawAudio> {
    let mut reader = claxon::FlacReader::open(path).context("Failed to open FLAC file")?;

    let info = reader.streaminfo();
    let channels = info.channels as u16;
    let max_val = (1i64 << (info.bits_per_sample - 1)) as f32;
    let samples: Vec<f32> = reader
        .samples()
        .take(sample_limit(seconds, info.sample_rate, channels))
        .map(|s| s.map(|v| v as f32 / max_val))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    // streams without a length header report what was read
    let total_frames = info
        .samples
        .unwrap_or(samples.len() as u64 / channels.max(1) as u64);

    Ok(RawAudio {
        samples,
        sample_rate: info.sample_rate,
        channels,
        total_frames,
    })
}

/// Decode OGG Vorbis file
///
/// Packets past the limit are decoded only to count them.
fn decode_ogg(path: &Path, seconds: u32) -> anyhow::Result<RawAudio> {
    let file = std::fs::File::open(path).context("Failed to open OGG file")?;
    let mut reader = lewton::inside_ogg::OggStreamReader::new(file)?;

    let sample_rate = reader.ident_hdr.audio_sample_rate;
    let channels = reader.ident_hdr.audio_channels as u16;
    let limit = sample_limit(seconds, sample_rate, channels);

    let mut samples = Vec::new();
    let mut total_samples = 0u64;
    while let Some(packet) = reader.read_dec_packet_itl()? {
        total_samples += packet.len() as u64;
        let room = limit.saturating_sub(samples.len());
        samples.extend(packet.iter().take(room).map(|&s| s as f32 / 32768.0));
    }

    Ok(RawAudio {
        samples,
        sample_rate,
        channels,
        total_frames: total_samples / channels.max(1) as u64,
    })
}
