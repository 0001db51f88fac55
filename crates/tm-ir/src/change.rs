//! Change notifications for passive observers such as level meters.

use crate::command::{NoteInfo, SeekRequest};

/// Summary of what one tick's commands did to a channel.
///
/// Emitted at most once per channel per tick. Nothing in the audio path
/// depends on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelChanged {
    /// Channel is enabled in the mixer's channel mask.
    pub enabled: bool,
    pub muted: bool,
    pub note_kicked: bool,
    pub sample_number: Option<u16>,
    pub note: Option<NoteInfo>,
    /// Length in frames of the voice's current sample.
    pub sample_length: u32,
    pub looping: bool,
    /// Requested position change, if any.
    pub position: Option<SeekRequest>,
    pub volume: Option<u16>,
    pub frequency: Option<u32>,
}
