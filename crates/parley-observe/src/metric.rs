//! Latency metrics and running aggregates.

use serde::{Deserialize, Serialize};

/// A single latency measurement from the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "metric", content = "value_ms", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Metric {
    /// Interval between utterance start and the first successful
    /// synthesizer push.
    TimeToFirstAudioMs(u64),
    /// Wall-clock latency of one translation request, including failed
    /// attempts (a timeout shows up here as elevated latency).
    TranslationLatencyMs(u64),
    /// Wall-clock latency of one synthesizer push.
    TtsPushLatencyMs(u64),
}

impl Metric {
    /// Returns the canonical metric name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TimeToFirstAudioMs(_) => "TIME_TO_FIRST_AUDIO_MS",
            Self::TranslationLatencyMs(_) => "TRANSLATION_LATENCY_MS",
            Self::TtsPushLatencyMs(_) => "TTS_PUSH_LATENCY_MS",
        }
    }

    /// Returns the measured value in milliseconds.
    pub fn value_ms(&self) -> u64 {
        match self {
            Self::TimeToFirstAudioMs(v)
            | Self::TranslationLatencyMs(v)
            | Self::TtsPushLatencyMs(v) => *v,
        }
    }
}

/// Running per-kind aggregates over pipeline metrics.
///
/// Cheap enough to keep per session; the session logs a one-line summary
/// when an utterance completes.
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    first_audio: Samples,
    translation: Samples,
    tts_push: Samples,
}

#[derive(Debug, Clone, Copy, Default)]
struct Samples {
    count: u64,
    total_ms: u64,
}

impl Samples {
    fn record(&mut self, value_ms: u64) {
        self.count += 1;
        self.total_ms += value_ms;
    }

    fn mean(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.total_ms / self.count
        }
    }
}

impl MetricsSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one measurement.
    pub fn record(&mut self, metric: Metric) {
        match metric {
            Metric::TimeToFirstAudioMs(v) => self.first_audio.record(v),
            Metric::TranslationLatencyMs(v) => self.translation.record(v),
            Metric::TtsPushLatencyMs(v) => self.tts_push.record(v),
        }
    }

    /// Total number of recorded samples across all kinds.
    pub fn sample_count(&self) -> u64 {
        self.first_audio.count + self.translation.count + self.tts_push.count
    }

    /// Mean translation latency in milliseconds, 0 if no samples.
    pub fn mean_translation_latency_ms(&self) -> u64 {
        self.translation.mean()
    }

    /// Mean time to first audio in milliseconds, 0 if no samples.
    pub fn mean_time_to_first_audio_ms(&self) -> u64 {
        self.first_audio.mean()
    }

    /// One-line human-readable summary for logging.
    pub fn summary(&self) -> String {
        if self.sample_count() == 0 {
            return "no samples yet".to_string();
        }
        format!(
            "first_audio: {}ms (n={}) | translation: {}ms (n={}) | tts_push: {}ms (n={})",
            self.first_audio.mean(),
            self.first_audio.count,
            self.translation.mean(),
            self.translation.count,
            self.tts_push.mean(),
            self.tts_push.count,
        )
    }
}
