//! Producer-side channel handle.
//!
//! Decoders call the setters once per tick. The handle accumulates them into
//! a [`ChannelCommands`] set that the mixer drains with [`Channel::take_commands`],
//! and remembers the last requested values so producers can read them back.

use crate::command::{ChannelCommands, NoteInfo, PendingSample, SamplePlay, SeekRequest};
use crate::frequency::{amiga_volume, period_to_frequency};
use crate::panning::Panning;
use crate::sample::{LoopKind, LoopRegion, SampleRef};

/// Command interface for one playback channel.
#[derive(Clone, Debug, Default)]
pub struct Channel {
    commands: ChannelCommands,
    active: bool,
    muted: bool,
    sample_number: Option<u16>,
    sample_length: u32,
    volume: u16,
    panning: Panning,
    frequency: u32,
    play_position: u32,
}

impl Channel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start playing `sample` from its beginning.
    pub fn play_sample(&mut self, sample_number: Option<u16>, play: SamplePlay) {
        self.commands.trigger = Some(play);
        self.commands.sample_number = Some(sample_number);
        self.sample_number = sample_number;
        self.sample_length = play.sample.length;
        self.muted = false;
    }

    /// Set the loop region of the current (or just triggered) sample.
    ///
    /// `start` and `length` are frames in the sample's buffer.
    pub fn set_loop(&mut self, start: u32, length: u32, kind: LoopKind) {
        self.commands.loop_region = Some(LoopRegion::new(start, length, kind));
    }

    /// Queue `play` to take over once the current sample ends or loops. No
    /// retrigger happens.
    pub fn set_pending_sample(&mut self, play: SamplePlay, loop_region: Option<LoopRegion>) {
        self.commands.pending = Some(PendingSample { play, loop_region });
    }

    /// Set the volume, 0-256.
    pub fn set_volume(&mut self, volume: u16) {
        let volume = volume.min(256);
        self.commands.volume = Some(volume);
        self.volume = volume;
    }

    /// Set the volume using the Amiga range, 0-64.
    pub fn set_amiga_volume(&mut self, volume: u8) {
        self.set_volume(amiga_volume(volume));
    }

    pub fn set_panning(&mut self, panning: Panning) {
        let panning = match panning {
            Panning::Position(p) => Panning::position(p),
            Panning::Surround => Panning::Surround,
        };
        self.commands.panning = Some(panning);
        self.panning = panning;
    }

    /// Set the playback frequency in Hz.
    pub fn set_frequency(&mut self, frequency: u32) {
        self.commands.frequency = Some(frequency);
        self.frequency = frequency;
    }

    /// Set the frequency from an Amiga period.
    pub fn set_amiga_period(&mut self, period: u32) {
        self.set_frequency(period_to_frequency(period));
    }

    /// Move the play position. Relative offsets may be negative.
    pub fn set_position(&mut self, offset: i32, relative: bool) {
        self.commands.seek = Some(SeekRequest { offset, relative });
    }

    /// Update the sample number reported to observers.
    pub fn set_sample_number(&mut self, sample_number: Option<u16>) {
        self.commands.sample_number = Some(sample_number);
        self.sample_number = sample_number;
    }

    /// Tell observers which note is playing.
    pub fn set_note(&mut self, octave: u8, note: u8) {
        self.commands.note = Some(NoteInfo { octave: octave.min(9), note: note.min(11) });
    }

    /// Report a note kick to observers without retriggering audio.
    pub fn virtual_trigger(&mut self) {
        self.commands.virtual_trigger = true;
    }

    /// Stop the channel immediately.
    pub fn mute(&mut self) {
        self.commands.mute = true;
        self.muted = true;
    }

    /// Drain the commands accumulated since the last call.
    pub fn take_commands(&mut self) -> ChannelCommands {
        core::mem::take(&mut self.commands)
    }

    /// Returns true if commands are waiting to be drained.
    pub fn has_commands(&self) -> bool {
        !self.commands.is_empty()
    }

    /// Record whether the mixer voice behind this channel is playing.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Record the voice's play position, in frames from the sample start.
    pub fn set_play_position(&mut self, frames: u32) {
        self.play_position = frames;
    }

    /// Whether the voice was playing as of the last mixer feedback.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn sample_number(&self) -> Option<u16> {
        self.sample_number
    }

    pub fn volume(&self) -> u16 {
        self.volume
    }

    pub fn panning(&self) -> Panning {
        self.panning
    }

    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Length in frames of the last triggered sample.
    pub fn sample_length(&self) -> u32 {
        self.sample_length
    }

    /// Play position in frames from the sample start, as of the last
    /// mixer feedback.
    pub fn sample_position(&self) -> u32 {
        self.play_position
    }
}

/// Convenience for setting loops from a [`SampleRef`]'s own coordinates.
pub fn loop_over(sample: &SampleRef, kind: LoopKind) -> LoopRegion {
    LoopRegion::new(sample.start, sample.length, kind)
}
