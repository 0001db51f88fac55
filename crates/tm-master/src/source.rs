//! Tick-driven producers.
//!
//! A [`TickSource`] is whatever decides what the channels play: a module
//! decoder, a sequencer, a synthesized demo. It is called once per tick and
//! drives the mixer only through the [`Channel`] handles.

use tm_ir::Channel;

/// Default tick rate in Hz (PAL vertical blank).
pub const DEFAULT_TICK_RATE: f64 = 50.0;

/// Whether a source has more ticks to play.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickStatus {
    Continue,
    Finished,
}

/// A producer that issues channel commands once per tick.
pub trait TickSource: Send {
    /// Number of channels the source drives.
    fn channels(&self) -> usize;

    /// Ticks per second.
    fn tick_rate(&self) -> f64 {
        DEFAULT_TICK_RATE
    }

    /// Issue this tick's commands. Returning [`TickStatus::Finished`] ends
    /// playback; commands issued in that call are discarded.
    fn play_tick(&mut self, channels: &mut [Channel]) -> TickStatus;
}

impl<T: TickSource + ?Sized> TickSource for Box<T> {
    fn channels(&self) -> usize {
        (**self).channels()
    }

    fn tick_rate(&self) -> f64 {
        (**self).tick_rate()
    }

    fn play_tick(&mut self, channels: &mut [Channel]) -> TickStatus {
        (**self).play_tick(channels)
    }
}

/// Splits output time into ticks.
///
/// Frames per tick are rarely whole (44100 / 50 is, 48000 / 60 is not, and
/// BPM-derived tick rates almost never are); the clock hands out whole
/// frame counts whose running total never drifts from the exact time.
#[derive(Clone, Debug)]
pub struct TickClock {
    sample_rate: u64,
    /// Tick rate in millihertz.
    tick_rate: u64,
    ticks: u64,
}

impl TickClock {
    pub fn new(sample_rate: u32, tick_rate: f64) -> Self {
        // NaN and non-positive rates collapse to the 1 mHz floor
        let tick_rate = (tick_rate * 1000.0).round().max(1.0) as u64;
        Self { sample_rate: sample_rate as u64, tick_rate, ticks: 0 }
    }

    /// Frames in the next tick.
    pub fn next_tick_frames(&mut self) -> usize {
        let start = self.frames_at(self.ticks);
        self.ticks += 1;
        (self.frames_at(self.ticks) - start) as usize
    }

    /// Total frames elapsed at the start of tick `tick`.
    pub fn frames_at(&self, tick: u64) -> u64 {
        (tick as u128 * self.sample_rate as u128 * 1000 / self.tick_rate as u128) as u64
    }

    /// Ticks handed out so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_ticks_at_pal_rate() {
        let mut clock = TickClock::new(44100, 50.0);
        for _ in 0..10 {
            assert_eq!(clock.next_tick_frames(), 882);
        }
        assert_eq!(clock.ticks(), 10);
    }

    #[test]
    fn fractional_ticks_do_not_drift() {
        let mut clock = TickClock::new(48000, 60.0 * 1.001);
        let total: usize = (0..1000).map(|_| clock.next_tick_frames()).sum();
        assert_eq!(total as u64, clock.frames_at(1000));
        // 1000 ticks at 60.06 Hz is 16.65 s
        assert_eq!(total, 799_200);
    }

    #[test]
    fn tick_lengths_differ_by_at_most_one() {
        let mut clock = TickClock::new(44100, 48.0);
        let lengths: Vec<usize> = (0..100).map(|_| clock.next_tick_frames()).collect();
        let min = *lengths.iter().min().unwrap();
        let max = *lengths.iter().max().unwrap();
        assert!(max - min <= 1);
        assert_eq!(min, 918);
    }

    #[test]
    fn bad_rate_does_not_divide_by_zero() {
        let mut clock = TickClock::new(44100, 0.0);
        assert!(clock.next_tick_frames() > 0);
        let mut clock = TickClock::new(44100, f64::NAN);
        assert!(clock.next_tick_frames() > 0);
    }
}
