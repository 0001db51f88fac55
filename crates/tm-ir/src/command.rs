//! Per-tick channel command sets.
//!
//! A [`ChannelCommands`] value is everything a producer asked of one channel
//! during one tick. Each field is independent; setting a field twice keeps
//! only the last value.

use crate::panning::Panning;
use crate::sample::{LoopRegion, SampleRef};

/// A sample to start playing, plus how to play it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplePlay {
    pub sample: SampleRef,
    /// Play from the end of the region towards its start.
    pub backwards: bool,
}

impl SamplePlay {
    pub fn forward(sample: SampleRef) -> Self {
        Self { sample, backwards: false }
    }

    pub fn backwards(sample: SampleRef) -> Self {
        Self { sample, backwards: true }
    }
}

/// A sample queued to take over when the current one ends or loops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingSample {
    pub play: SamplePlay,
    pub loop_region: Option<LoopRegion>,
}

/// A position change request, in frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeekRequest {
    pub offset: i32,
    /// Offset is added to the current position instead of replacing it.
    pub relative: bool,
}

/// Note metadata carried to observers only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoteInfo {
    /// Octave 0-9.
    pub octave: u8,
    /// Note within the octave, 0-11.
    pub note: u8,
}

/// Outstanding commands for one channel, drained once per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChannelCommands {
    /// Start a new sample from its beginning.
    pub trigger: Option<SamplePlay>,
    /// Loop region for the triggered sample, or a replacement loop for the
    /// sample already playing.
    pub loop_region: Option<LoopRegion>,
    /// Sample to switch to seamlessly at the next end-of-sample or loop.
    pub pending: Option<PendingSample>,
    /// New volume, 0-256.
    pub volume: Option<u16>,
    pub panning: Option<Panning>,
    /// New playback frequency in Hz.
    pub frequency: Option<u32>,
    pub seek: Option<SeekRequest>,
    /// Stop the voice and drop its loop and pending state.
    pub mute: bool,
    /// Report a note kick to observers without touching audio.
    pub virtual_trigger: bool,
    /// Sample number for observers; `Some(None)` means "unknown".
    pub sample_number: Option<Option<u16>>,
    pub note: Option<NoteInfo>,
}

impl ChannelCommands {
    /// Returns true if nothing was requested.
    pub fn is_empty(&self) -> bool {
        *self == ChannelCommands::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_commands_are_empty() {
        assert!(ChannelCommands::default().is_empty());
    }

    #[test]
    fn any_field_makes_commands_non_empty() {
        let cmds = ChannelCommands { volume: Some(10), ..Default::default() };
        assert!(!cmds.is_empty());
        let cmds = ChannelCommands { mute: true, ..Default::default() };
        assert!(!cmds.is_empty());
    }
}
