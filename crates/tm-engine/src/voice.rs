//! Voice: per-channel playback state.

use tm_ir::{
    LoopKind, LoopRegion, NoteInfo, Panning, PendingSample, SamplePlay, SampleRef, SeekRequest,
};

/// Fractional bits of fixed-point sample positions and increments.
pub const FRAC_BITS: u32 = 11;

/// Mask selecting the fractional part of a fixed-point position.
pub const FRAC_MASK: i64 = (1 << FRAC_BITS) - 1;

/// Playback state of one channel.
///
/// Voices live in a fixed array for the mixer's lifetime; only their
/// contents change.
#[derive(Clone, Copy, Debug)]
pub struct Voice {
    /// Is the voice contributing to the mix?
    pub active: bool,
    /// Restart from the sample start at the next render.
    pub kick: bool,
    /// Channel enabled in the channel mask; disabled voices mix at volume 0.
    pub enabled: bool,
    /// Current position (fixed-point, [`FRAC_BITS`] fraction bits).
    pub current: i64,
    /// Signed step per output sample (fixed-point). Negative plays backwards.
    pub increment: i64,
    pub sample: Option<SampleRef>,
    /// Loop region, only present when it actually loops.
    pub loop_region: Option<LoopRegion>,
    /// Sample adopted at the next end-of-sample or loop end.
    pub pending: Option<PendingSample>,
    /// The current sample was started backwards.
    pub backwards: bool,
    /// Currently travelling towards the start of the buffer.
    pub reverse: bool,
    /// Volume, 0-256.
    pub volume: u16,
    pub panning: Panning,
    /// Playback frequency in Hz.
    pub frequency: u32,
    /// Samples left in the declick blend.
    pub ramp_remaining: u32,
    /// Gain the blend starts from, captured when the ramp is armed.
    pub old_left: i32,
    pub old_right: i32,
    /// Left (or mono) volume chosen at the last render.
    pub left: i32,
    /// Right volume chosen at the last render.
    pub right: i32,
    /// Pending seek, consumed at the next render.
    pub seek: Option<SeekRequest>,
    // Observer metadata
    pub sample_number: Option<u16>,
    pub note: Option<NoteInfo>,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            active: false,
            kick: false,
            enabled: true,
            current: 0,
            increment: 0,
            sample: None,
            loop_region: None,
            pending: None,
            backwards: false,
            reverse: false,
            volume: 256,
            panning: Panning::CENTER,
            frequency: 0,
            ramp_remaining: 0,
            old_left: 0,
            old_right: 0,
            left: 0,
            right: 0,
            seek: None,
            sample_number: None,
            note: None,
        }
    }
}

impl Voice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `play` the current sample, with `loop_region` if it loops.
    ///
    /// Does not touch the play position; callers kick or reposition.
    pub fn adopt(&mut self, play: SamplePlay, loop_region: Option<LoopRegion>) {
        self.sample = Some(play.sample);
        self.loop_region = loop_region.filter(LoopRegion::is_looping);
        self.backwards = play.backwards;
        self.reverse = play.backwards;
    }

    /// Replace the loop of the current sample, or clear it.
    pub fn set_loop(&mut self, loop_region: LoopRegion) {
        self.loop_region = Some(loop_region).filter(LoopRegion::is_looping);
        if self.loop_region.is_none() && !self.backwards {
            self.reverse = false;
        }
    }

    /// Starting position of the current sample: its first frame, or its
    /// last frame when played backwards.
    pub fn start_position(&self) -> i64 {
        match self.sample {
            Some(s) if self.backwards => ((s.end() as i64) - 1).max(s.start as i64) << FRAC_BITS,
            Some(s) => (s.start as i64) << FRAC_BITS,
            None => 0,
        }
    }

    pub fn is_looping(&self) -> bool {
        self.loop_region.is_some()
    }

    pub fn is_bidirectional(&self) -> bool {
        self.loop_region.is_some_and(|l| l.kind == LoopKind::Bidirectional)
    }

    /// Stop producing audio.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.current = 0;
    }

    /// Integer frame index of the current position.
    pub fn frame(&self) -> i64 {
        self.current >> FRAC_BITS
    }

    /// Left and right gain of the next output sample, partway through any
    /// running blend.
    pub fn audible_gain(&self, ramp_window: u32) -> (i32, i32) {
        if self.ramp_remaining == 0 || ramp_window == 0 {
            return (self.left, self.right);
        }
        let ramp = self.ramp_remaining.min(ramp_window) as i64;
        let window = ramp_window as i64;
        let blend = |old: i32, new: i32| new + ((old - new) as i64 * ramp / window) as i32;
        (blend(self.old_left, self.left), blend(self.old_right, self.right))
    }

    /// Start a declick blend from whatever is audible now.
    pub fn arm_ramp(&mut self, ramp_window: u32) {
        let (left, right) = self.audible_gain(ramp_window);
        self.old_left = left;
        self.old_right = right;
        self.ramp_remaining = ramp_window;
    }
}
