//! Channel command resolution.
//!
//! Applies one tick's [`ChannelCommands`] to a [`Voice`] and summarizes the
//! result for observers. Runs on the render side, between blocks.

use tm_ir::{ChannelChanged, ChannelCommands, LoopRegion, Panning};

use crate::config::DeclickTuning;
use crate::voice::Voice;

/// Panning value the surround sentinel counts as when measuring a jump.
const SURROUND_PAN: u16 = 512;

/// Apply `commands` to `voice`.
///
/// Order: volume, panning, frequency, mute, trigger, seek, pending sample.
/// A trigger in the same tick as a mute wins, leaving the voice kicked.
pub(crate) fn resolve(
    voice: &mut Voice,
    mut commands: ChannelCommands,
    tuning: &DeclickTuning,
    buffer_mode: bool,
) -> Option<ChannelChanged> {
    if commands.is_empty() {
        return None;
    }

    let mut changed = ChannelChanged { enabled: voice.enabled, ..Default::default() };

    if let Some(volume) = commands.volume {
        let volume = volume.min(256);
        // Large jumps click, so blend into them
        if volume.abs_diff(voice.volume) > tuning.volume_threshold {
            voice.arm_ramp(tuning.ramp_window);
        }
        voice.volume = volume;
        changed.volume = Some(volume);
    }

    if let Some(panning) = commands.panning {
        match panning {
            Panning::Surround => voice.panning = Panning::Surround,
            Panning::Position(pan) => {
                let pan = pan.min(256);
                let old = match voice.panning {
                    Panning::Position(p) => p,
                    Panning::Surround => SURROUND_PAN,
                };
                if pan.abs_diff(old) > tuning.panning_threshold {
                    voice.arm_ramp(tuning.ramp_window);
                }
                voice.panning = Panning::Position(pan);
            }
        }
    }

    if let Some(frequency) = commands.frequency {
        voice.frequency = frequency;
        changed.frequency = Some(frequency);
    }

    let busy = voice.active || voice.kick;

    if commands.mute {
        voice.active = false;
        voice.kick = false;
        voice.loop_region = None;
        voice.pending = None;
        voice.seek = None;
        changed.muted = true;
    }

    // An idle voice starts a queued sample right away
    let mut trigger = commands.trigger.map(|play| (play, commands.loop_region));
    if trigger.is_none() && !commands.mute && !busy {
        if let Some(pending) = commands.pending.take() {
            trigger = Some((pending.play, pending.loop_region));
        }
    }

    let live = !commands.mute || trigger.is_some();

    if let Some((play, loop_region)) = trigger {
        voice.adopt(play, loop_region);
        voice.pending = None;
        voice.kick = true;
        voice.ramp_remaining = 0;
        changed.note_kicked = true;
        changed.looping = voice.is_looping();
        log::trace!("voice kicked: {} frames, looping={}", play.sample.length, changed.looping);
    } else if let (Some(loop_region), true) = (commands.loop_region, live) {
        if voice.sample.is_some() {
            voice.set_loop(loop_region);
            changed.looping = voice.is_looping();
        }
    }

    if let (Some(seek), true) = (commands.seek, live) {
        voice.seek = Some(seek);
        changed.position = Some(seek);
    }

    if !buffer_mode && live {
        if let Some(pending) = commands.pending {
            if pending.play.sample.length >= LoopRegion::MIN_LENGTH {
                voice.pending = Some(pending);
                changed.looping = true;
            }
        }
    }

    if commands.virtual_trigger {
        changed.note_kicked = true;
    }
    if let Some(number) = commands.sample_number {
        voice.sample_number = number;
    }
    if let Some(note) = commands.note {
        voice.note = Some(note);
    }

    changed.sample_number = voice.sample_number;
    changed.note = voice.note;
    changed.sample_length = voice.sample.map_or(0, |s| s.length);

    if buffer_mode {
        None
    } else {
        Some(changed)
    }
}
