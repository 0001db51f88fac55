//! Amiga period and note conversions for producers.
//!
//! The mixer itself only understands frequencies in Hz. These helpers let
//! producers that think in Amiga periods or note numbers drive it.

/// PAL Amiga clock used to turn periods into frequencies.
pub const AMIGA_CLOCK: u32 = 3_546_895;

/// Lowest allowed period (highest pitch, B-3 in Amiga notation).
pub const PERIOD_MIN: u16 = 113;

/// Highest allowed period (lowest pitch, C-1 in Amiga notation).
pub const PERIOD_MAX: u16 = 856;

/// Base periods for the lowest octave (notes 36-47, C-1 to B-1 in Amiga notation).
const BASE_PERIODS: [u16; 12] = [
    856, 808, 762, 720, 678, 640, 604, 570, 538, 508, 480, 453,
];

/// Convert a note number to an Amiga period value.
///
/// Note 36 = C-1 (period 856), note 48 = C-2 (period 428), note 60 = C-3 (period 214).
/// Returns 0 for note 0 (no note).
pub fn note_to_period(note: u8) -> u16 {
    if note == 0 {
        return 0;
    }
    let offset = note as i16 - 36;
    let semitone = offset.rem_euclid(12) as usize;
    let octave = offset.div_euclid(12);
    let base = BASE_PERIODS[semitone] as u32;
    if octave >= 0 {
        (base >> octave as u32).max(1) as u16
    } else {
        (base << (-octave) as u32) as u16
    }
}

/// Convert an Amiga period to a playback frequency in Hz. Period 0 gives 0.
pub fn period_to_frequency(period: u32) -> u32 {
    if period == 0 {
        return 0;
    }
    AMIGA_CLOCK / period
}

/// Scale an Amiga volume (0-64) to the mixer's 0-256 range.
pub fn amiga_volume(volume: u8) -> u16 {
    volume.min(64) as u16 * 4
}

/// Clamp a period to the classic range.
pub fn clamp_period(period: u16) -> u16 {
    period.clamp(PERIOD_MIN, PERIOD_MAX)
}
