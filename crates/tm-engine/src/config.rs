//! Mixer configuration.
//!
//! [`MixerConfig`] fixes the engine's shape at construction. [`RenderSettings`]
//! is handed to every render call, so a mixer has no hidden global state.

use thiserror::Error;
use tm_ir::MAX_CHANNELS;

/// Declick tuning constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeclickTuning {
    /// Number of output samples a declick blend lasts.
    pub ramp_window: u32,
    /// Volume jumps larger than this arm the ramp.
    pub volume_threshold: u16,
    /// Panning jumps larger than this arm the ramp.
    pub panning_threshold: u16,
}

impl Default for DeclickTuning {
    fn default() -> Self {
        Self { ramp_window: 64, volume_threshold: 32, panning_threshold: 48 }
    }
}

/// Structural mixer configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MixerConfig {
    /// Number of voices (playback channels), at most [`MAX_CHANNELS`].
    pub voices: usize,
    /// Largest number of frames mixed in one pass; bigger renders are split.
    pub max_block_frames: usize,
    /// Producers render raw per-tick buffers: no pending samples, no change events.
    pub buffer_mode: bool,
    pub tuning: DeclickTuning,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            voices: 4,
            max_block_frames: 1024,
            buffer_mode: false,
            tuning: DeclickTuning::default(),
        }
    }
}

impl MixerConfig {
    pub fn with_voices(voices: usize) -> Self {
        Self { voices, ..Self::default() }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.voices == 0 || self.voices > MAX_CHANNELS {
            return Err(ConfigError::VoiceCount { requested: self.voices, max: MAX_CHANNELS });
        }
        if self.max_block_frames == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        if self.tuning.ramp_window == 0 {
            return Err(ConfigError::ZeroRampWindow);
        }
        Ok(())
    }
}

/// Number of channels the mixer sums into.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputLayout {
    Mono,
    #[default]
    Stereo,
}

impl OutputLayout {
    pub const fn channels(self) -> usize {
        match self {
            OutputLayout::Mono => 1,
            OutputLayout::Stereo => 2,
        }
    }
}

/// Per-render output settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSettings {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    pub output: OutputLayout,
    /// Linear interpolation between source samples.
    pub interpolation: bool,
    /// Honour the surround panning sentinel (phase-inverted output).
    pub surround: bool,
    /// Stereo separation in percent, 0-100.
    pub stereo_separation: u8,
    /// Write right before left.
    pub swap_speakers: bool,
    /// Silent channels appended after each mixed frame.
    pub padding_channels: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            output: OutputLayout::Stereo,
            interpolation: true,
            surround: true,
            stereo_separation: 100,
            swap_speakers: false,
            padding_channels: 0,
        }
    }
}

impl RenderSettings {
    /// Interleaved values per output frame, padding included.
    pub fn frame_width(&self) -> usize {
        self.output.channels() + self.padding_channels
    }

    /// Stereo separation rescaled to 0-128.
    pub(crate) fn separation_128(&self) -> i32 {
        self.stereo_separation.min(100) as i32 * 128 / 100
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.stereo_separation > 100 {
            return Err(ConfigError::Separation(self.stereo_separation));
        }
        Ok(())
    }
}

/// Invalid mixer configuration.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("voice count {requested} outside 1..={max}")]
    VoiceCount { requested: usize, max: usize },
    #[error("block size must be at least one frame")]
    ZeroBlockSize,
    #[error("declick ramp window must be at least one sample")]
    ZeroRampWindow,
    #[error("sample rate must be non-zero")]
    ZeroSampleRate,
    #[error("stereo separation {0}% above 100%")]
    Separation(u8),
}
