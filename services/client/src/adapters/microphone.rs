//! services/client/src/adapters/microphone.rs
//!
//! This module contains the adapter for microphone capture. The console
//! build reads a WAV file in place of a live input device and replays it as
//! fixed-length recording segments, each preceded by its time-domain sample
//! frame for amplitude analysis. An unset path is the permission-denied
//! case.

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use interview_buddy_core::domain::MicEvent;
use interview_buddy_core::ports::{MicrophoneService, MicrophoneStream, PortError, PortResult};
use std::collections::VecDeque;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

pub struct WavMicrophoneAdapter {
    wav_path: Option<PathBuf>,
    segment: Duration,
}

impl WavMicrophoneAdapter {
    pub fn new(wav_path: Option<PathBuf>, segment: Duration) -> Self {
        Self { wav_path, segment }
    }
}

#[async_trait]
impl MicrophoneService for WavMicrophoneAdapter {
    async fn open(&self) -> PortResult<Box<dyn MicrophoneStream>> {
        let Some(path) = self.wav_path.clone() else {
            return Err(PortError::Denied(
                "no microphone configured (set MICROPHONE_WAV_PATH)".to_string(),
            ));
        };
        let segment = self.segment;
        let stream = tokio::task::spawn_blocking(move || slice_wav(path, segment))
            .await
            .map_err(|e| PortError::Unexpected(format!("microphone task failed: {}", e)))??;
        Ok(Box::new(stream))
    }
}

/// Reads the whole WAV source and slices it into segment-length chunks. The
/// final partial chunk becomes the close-time tail rather than a segment.
fn slice_wav(path: PathBuf, segment: Duration) -> PortResult<SlicedWavStream> {
    let mut reader = hound::WavReader::open(&path)
        .map_err(|e| PortError::Unexpected(format!("opening {}: {}", path.display(), e)))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| PortError::Unexpected(format!("reading samples: {}", e)))?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| PortError::Unexpected(format!("reading samples: {}", e)))?
        }
    };

    let samples_per_segment =
        (spec.sample_rate as u128 * spec.channels as u128 * segment.as_millis() / 1000) as usize;
    if samples_per_segment == 0 {
        return Err(PortError::Unexpected(
            "voice segment length rounds to zero samples".to_string(),
        ));
    }

    let mut events = VecDeque::new();
    let mut tail = None;
    for chunk in samples.chunks(samples_per_segment) {
        let encoded = encode_wav(chunk, &spec)?;
        if chunk.len() == samples_per_segment {
            events.push_back(MicEvent::Frame(chunk.to_vec()));
            events.push_back(MicEvent::Segment(encoded));
        } else {
            tail = Some(encoded);
        }
    }
    debug!(
        "microphone source sliced into {} events",
        events.len()
    );

    Ok(SlicedWavStream {
        events,
        tail,
        pace: segment,
        closed: false,
    })
}

fn encode_wav(samples: &[f32], source: &WavSpec) -> PortResult<Vec<u8>> {
    let spec = WavSpec {
        channels: source.channels,
        sample_rate: source.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| PortError::Unexpected(format!("encoding segment: {}", e)))?;
        for sample in samples {
            writer
                .write_sample(*sample)
                .map_err(|e| PortError::Unexpected(format!("encoding segment: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| PortError::Unexpected(format!("encoding segment: {}", e)))?;
    }
    Ok(cursor.into_inner())
}

struct SlicedWavStream {
    events: VecDeque<MicEvent>,
    tail: Option<Vec<u8>>,
    pace: Duration,
    closed: bool,
}

#[async_trait]
impl MicrophoneStream for SlicedWavStream {
    async fn next_event(&mut self) -> Option<MicEvent> {
        if self.closed {
            return None;
        }
        let event = self.events.pop_front()?;
        // Segments are delivered in real time; the amplitude frame for a
        // slice arrives with no delay just before it.
        if matches!(event, MicEvent::Segment(_)) {
            tokio::time::sleep(self.pace).await;
        }
        Some(event)
    }

    async fn close(&mut self) -> Option<Vec<u8>> {
        self.closed = true;
        self.events.clear();
        self.tail.take()
    }
}
