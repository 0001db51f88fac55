//! Channel panning.

/// Stereo position of a channel, or phase-inverted surround.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Panning {
    /// 0 = hard left, 128 = center, 256 = hard right.
    Position(u16),
    /// Equal level on both sides with one side phase-inverted.
    Surround,
}

impl Panning {
    pub const LEFT: Panning = Panning::Position(0);
    pub const CENTER: Panning = Panning::Position(128);
    pub const RIGHT: Panning = Panning::Position(256);

    /// Create a positional panning, clamped to 0..=256.
    pub fn position(pan: u16) -> Self {
        Panning::Position(pan.min(256))
    }

    pub fn is_surround(self) -> bool {
        matches!(self, Panning::Surround)
    }
}

impl Default for Panning {
    fn default() -> Self {
        Panning::CENTER
    }
}
