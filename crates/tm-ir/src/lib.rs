//! Core types for the tickmix mixer.
//!
//! Sample references, loop regions, the channel command interface used by
//! decoders, and the change events the mixer reports back.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod change;
pub mod channel;
pub mod command;
pub mod frequency;
pub mod panning;
pub mod sample;

pub use change::ChannelChanged;
pub use channel::{loop_over, Channel};
pub use command::{ChannelCommands, NoteInfo, PendingSample, SamplePlay, SeekRequest};
pub use frequency::{amiga_volume, clamp_period, note_to_period, period_to_frequency, AMIGA_CLOCK};
pub use panning::Panning;
pub use sample::{
    BitDepth, LoopKind, LoopRegion, SampleBank, SampleData, SampleFormat, SampleKey,
    SampleLayout, SampleRef,
};

/// Maximum number of playback channels.
pub const MAX_CHANNELS: usize = 64;
