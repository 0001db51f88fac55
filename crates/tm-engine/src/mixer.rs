//! Main mixing engine.

use alloc::vec;
use alloc::vec::Vec;
use arrayvec::ArrayVec;
use tm_ir::{
    Channel, ChannelChanged, ChannelCommands, Panning, SampleBank, SampleData, SeekRequest,
    MAX_CHANNELS,
};

use crate::config::{ConfigError, DeclickTuning, MixerConfig, OutputLayout, RenderSettings};
use crate::convert::convert;
use crate::resolver::resolve;
use crate::routines::{mix_chunk, MixJob, Routing, Source};
use crate::voice::{Voice, FRAC_BITS};

/// Change events produced by one tick, tagged with their channel.
pub type ChangeList = heapless::Vec<(usize, ChannelChanged), MAX_CHANNELS>;

/// The software mixer: a fixed set of voices and a summing buffer.
pub struct Mixer {
    config: MixerConfig,
    voices: ArrayVec<Voice, MAX_CHANNELS>,
    /// Interleaved summing buffer, sized for the largest block.
    accum: Vec<i32>,
}

impl Mixer {
    /// Create a mixer with `config.voices` idle voices.
    pub fn new(config: MixerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let voices = (0..config.voices).map(|_| Voice::new()).collect();
        let accum = vec![0; config.max_block_frames * OutputLayout::Stereo.channels()];
        log::debug!(
            "mixer created: {} voices, {} frame blocks, buffer_mode={}",
            config.voices,
            config.max_block_frames,
            config.buffer_mode
        );
        Ok(Self { config, voices, accum })
    }

    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Get a voice. Panics if `channel` is outside the voice array.
    pub fn voice(&self, channel: usize) -> &Voice {
        assert!(channel < self.voices.len(), "channel {channel} out of range");
        &self.voices[channel]
    }

    /// Whether a voice is playing or about to start.
    pub fn is_active(&self, channel: usize) -> bool {
        let v = self.voice(channel);
        v.active || v.kick
    }

    /// Bit `n` set when voice `n` is playing or about to start.
    pub fn active_mask(&self) -> u64 {
        self.voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.active || v.kick)
            .fold(0, |mask, (i, _)| mask | (1 << i))
    }

    /// Enable or disable a channel. Disabled channels keep their position
    /// moving but mix at volume 0.
    pub fn set_channel_enabled(&mut self, channel: usize, enabled: bool) {
        assert!(channel < self.voices.len(), "channel {channel} out of range");
        self.voices[channel].enabled = enabled;
    }

    /// Apply one channel's commands for this tick.
    pub fn apply(&mut self, channel: usize, commands: ChannelCommands) -> Option<ChannelChanged> {
        assert!(channel < self.voices.len(), "channel {channel} out of range");
        resolve(&mut self.voices[channel], commands, &self.config.tuning, self.config.buffer_mode)
    }

    /// Drain and apply the commands of every channel handle.
    pub fn apply_tick(&mut self, channels: &mut [Channel]) -> ChangeList {
        assert!(channels.len() <= self.voices.len(), "more channels than voices");
        let mut changes = ChangeList::new();
        for (i, channel) in channels.iter_mut().enumerate() {
            if let Some(changed) = self.apply(i, channel.take_commands()) {
                // Capacity matches the voice array
                let _ = changes.push((i, changed));
            }
        }
        changes
    }

    /// Feed voice activity and play positions back to the channel handles.
    pub fn sync_channels(&self, channels: &mut [Channel]) {
        for (i, channel) in channels.iter_mut().enumerate().take(self.voices.len()) {
            channel.set_active(self.is_active(i));
            channel.set_play_position(self.play_position(i));
        }
    }

    /// Frames from the start of the playing sample, 0 when idle or about
    /// to restart.
    pub fn play_position(&self, channel: usize) -> u32 {
        let v = self.voice(channel);
        match v.sample {
            Some(s) if v.active && !v.kick => (v.frame() - s.start as i64).max(0) as u32,
            _ => 0,
        }
    }

    /// Render interleaved 16-bit PCM into `out`.
    ///
    /// `out` must hold a whole number of frames of `settings.frame_width()`
    /// values each.
    pub fn render(&mut self, bank: &SampleBank, settings: &RenderSettings, out: &mut [i16]) {
        let width = settings.frame_width();
        assert!(settings.sample_rate > 0, "sample rate must be non-zero");
        assert!(
            out.len() % width == 0,
            "output length {} is not a multiple of the {width}-value frame",
            out.len()
        );

        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.render_blocks(bank, settings, out));
        #[cfg(not(feature = "alloc_check"))]
        self.render_blocks(bank, settings, out);
    }

    fn render_blocks(&mut self, bank: &SampleBank, settings: &RenderSettings, out: &mut [i16]) {
        let width = settings.frame_width();
        let mixed = settings.output.channels();
        for block in out.chunks_mut(self.config.max_block_frames * width) {
            let frames = block.len() / width;
            self.mix(bank, settings, frames);
            let accum = &self.accum[..frames * mixed];
            convert(accum, block, mixed, settings.swap_speakers, settings.padding_channels);
        }
    }

    /// Mix `frames` frames of all voices into the summing buffer and return it.
    pub fn mix(&mut self, bank: &SampleBank, settings: &RenderSettings, frames: usize) -> &[i32] {
        assert!(frames <= self.config.max_block_frames, "block of {frames} frames too large");
        let len = frames * settings.output.channels();
        let accum = &mut self.accum[..len];
        accum.fill(0);
        for voice in self.voices.iter_mut() {
            if prepare(voice, settings) {
                mix_voice(voice, bank, settings, &self.config.tuning, accum, frames);
            }
        }
        &self.accum[..len]
    }
}

/// Per-render voice setup: kick, increment, seek and volume split.
/// Returns false if the voice has nothing to play.
fn prepare(voice: &mut Voice, settings: &RenderSettings) -> bool {
    if voice.kick {
        voice.current = voice.start_position();
        voice.kick = false;
        voice.active = true;
    }
    if voice.frequency == 0 {
        voice.active = false;
    }
    if !voice.active {
        return false;
    }

    voice.increment = ((voice.frequency as i64) << FRAC_BITS) / settings.sample_rate as i64;
    if voice.reverse {
        voice.increment = -voice.increment;
    }

    if let Some(seek) = voice.seek.take() {
        apply_seek(voice, seek);
    }

    // Only the blend target moves here; Voice::arm_ramp sets its start
    let vol = if voice.enabled { voice.volume as i32 } else { 0 };
    match (settings.output, voice.panning) {
        (OutputLayout::Stereo, Panning::Position(pan)) => {
            let pan = ((pan as i32 - 128) * settings.separation_128()) / 128 + 128;
            voice.left = (vol * (256 - pan)) >> 8;
            voice.right = (vol * pan) >> 8;
        }
        (OutputLayout::Stereo, Panning::Surround) => {
            voice.left = vol / 2;
            voice.right = vol / 2;
        }
        (OutputLayout::Mono, _) => {
            voice.left = vol;
            voice.right = 0;
        }
    }
    true
}

/// Move to a requested position if it lies inside the playable region;
/// otherwise drop the request.
fn apply_seek(voice: &mut Voice, seek: SeekRequest) {
    let Some(sample) = voice.sample else { return };
    let target = if seek.relative {
        voice.frame() + seek.offset as i64
    } else {
        seek.offset as i64
    };
    let limit = voice.loop_region.map_or(sample.end(), |l| l.end()) as i64;
    if (sample.start as i64..limit).contains(&target) {
        voice.current = target << FRAC_BITS;
    }
}

/// Fixed-point boundaries of the region a voice is playing.
#[derive(Clone, Copy, Debug)]
struct Bounds {
    /// First position of the sample region.
    lower: i64,
    /// Last position of the sample region.
    end: i64,
    /// First and last position of the loop, if looping.
    looped: Option<(i64, i64)>,
}

/// A voice's sample data, validated against the bank.
struct SampleView<'a> {
    source: Source<'a>,
    stride: usize,
    bounds: Bounds,
}

impl<'a> SampleView<'a> {
    /// `None` if the data is missing, changed format, or is too short for
    /// the voice's region or loop.
    fn new(bank: &'a SampleBank, voice: &Voice) -> Option<Self> {
        let sample = voice.sample?;
        let data = bank.get(sample.key)?;
        if data.format() != sample.format {
            return None;
        }
        let frames = data.frames() as u64;
        if sample.length == 0 || sample.end() as u64 > frames {
            return None;
        }
        if voice.loop_region.is_some_and(|l| l.end() as u64 > frames) {
            return None;
        }

        let source = match data {
            SampleData::Mono8(v) | SampleData::Stereo8(v) => Source::Bits8(v),
            SampleData::Mono16(v) | SampleData::Stereo16(v) => Source::Bits16(v),
        };
        let bounds = Bounds {
            lower: (sample.start as i64) << FRAC_BITS,
            end: ((sample.end() as i64) << FRAC_BITS) - 1,
            looped: voice
                .loop_region
                .map(|l| ((l.start as i64) << FRAC_BITS, ((l.end() as i64) << FRAC_BITS) - 1)),
        };
        Some(Self { source, stride: sample.format.layout.stride(), bounds })
    }
}

/// Outcome of resolving a voice's position against its boundaries.
enum Settle {
    Playing,
    /// The pending sample took over.
    Switched,
    Stopped,
}

/// Wrap, bounce, switch or stop a voice whose position crossed a boundary.
///
/// Overshoot is folded modulo the loop span, so even increments larger
/// than the loop land inside it.
fn settle(voice: &mut Voice, bounds: &Bounds) -> Settle {
    if voice.reverse {
        match bounds.looped {
            Some((start, end)) if voice.current < start => {
                let over = (start - 1 - voice.current) % (end + 1 - start);
                if voice.is_bidirectional() {
                    voice.current = start + over;
                    voice.increment = -voice.increment;
                    voice.reverse = false;
                } else {
                    voice.current = end - over;
                }
            }
            Some(_) => {}
            None if voice.current < bounds.lower => return Settle::Stopped,
            None => {}
        }
    } else if let Some((start, end)) = bounds.looped {
        if voice.current > end {
            if let Some(pending) = voice.pending.take() {
                switch_to_pending(voice, pending);
                return Settle::Switched;
            }
            let over = (voice.current - end - 1) % (end + 1 - start);
            if voice.is_bidirectional() {
                voice.current = end - over;
                voice.increment = -voice.increment;
                voice.reverse = true;
            } else {
                voice.current = start + over;
            }
        }
    } else if voice.current > bounds.end {
        if let Some(pending) = voice.pending.take() {
            switch_to_pending(voice, pending);
            return Settle::Switched;
        }
        return Settle::Stopped;
    }
    Settle::Playing
}

/// Gapless switch: the pending sample replaces the current one without a
/// kick or a ramp reset.
fn switch_to_pending(voice: &mut Voice, pending: tm_ir::PendingSample) {
    voice.adopt(pending.play, pending.loop_region);
    voice.current = voice.start_position();
    let step = voice.increment.abs();
    voice.increment = if voice.reverse { -step } else { step };
    log::trace!("voice switched to pending sample ({} frames)", pending.play.sample.length);
}

/// Frames until the next boundary event, capped at `todo`.
fn chunk_length(voice: &Voice, bounds: &Bounds, todo: usize) -> usize {
    if voice.increment == 0 {
        return 0;
    }
    let steps = if voice.reverse {
        let end = bounds.looped.map_or(bounds.lower, |(start, _)| start);
        (voice.current - end) / -voice.increment + 1
    } else {
        let end = bounds.looped.map_or(bounds.end, |(_, end)| end);
        (end - voice.current) / voice.increment + 1
    };
    steps.clamp(0, todo as i64) as usize
}

/// Mix one voice into `accum`, one boundary-delimited chunk at a time.
fn mix_voice(
    voice: &mut Voice,
    bank: &SampleBank,
    settings: &RenderSettings,
    tuning: &DeclickTuning,
    accum: &mut [i32],
    frames: usize,
) {
    let channels = settings.output.channels();
    let Some(mut view) = SampleView::new(bank, voice) else {
        log::trace!("voice has no playable sample data; stopping");
        voice.deactivate();
        return;
    };

    let routing = match settings.output {
        OutputLayout::Mono => Routing::Mono,
        OutputLayout::Stereo if settings.surround && voice.panning.is_surround() => {
            Routing::Surround
        }
        OutputLayout::Stereo => Routing::Stereo,
    };

    let mut done = 0;
    loop {
        match settle(voice, &view.bounds) {
            Settle::Playing => {}
            Settle::Switched => {
                match SampleView::new(bank, voice) {
                    Some(next) => view = next,
                    None => {
                        voice.deactivate();
                        break;
                    }
                }
                continue;
            }
            Settle::Stopped => {
                voice.deactivate();
                break;
            }
        }

        let todo = frames - done;
        if todo == 0 {
            break;
        }
        let count = chunk_length(voice, &view.bounds, todo);
        if count == 0 {
            voice.deactivate();
            break;
        }

        let silent = voice.left == 0
            && voice.right == 0
            && (voice.ramp_remaining == 0 || (voice.old_left == 0 && voice.old_right == 0));
        if silent {
            voice.current += count as i64 * voice.increment;
            voice.ramp_remaining = voice.ramp_remaining.saturating_sub(count as u32);
        } else {
            let dest = &mut accum[done * channels..(done + count) * channels];
            let interpolate = settings.interpolation;
            mix_passes(voice, &view, routing, interpolate, tuning.ramp_window, dest, count);
        }
        done += count;
    }
}

/// Run the inner routine over one chunk. Stereo sources take one pass per
/// side; outside surround each pass is silenced on the opposite output.
fn mix_passes(
    voice: &mut Voice,
    view: &SampleView<'_>,
    routing: Routing,
    interpolate: bool,
    ramp_window: u32,
    dest: &mut [i32],
    count: usize,
) {
    let base = MixJob {
        index: voice.current,
        increment: voice.increment,
        stride: view.stride,
        channel: 0,
        left: voice.left,
        right: voice.right,
        old_left: voice.old_left,
        old_right: voice.old_right,
        ramp: voice.ramp_remaining,
        ramp_window,
    };

    let last = if view.stride == 1 {
        let mut job = base;
        mix_chunk(view.source, routing, interpolate, &mut job, dest, count);
        job
    } else {
        let (mut left, mut right) = if routing == Routing::Stereo {
            (
                MixJob { right: 0, old_right: 0, ..base },
                MixJob { channel: 1, left: 0, old_left: 0, ..base },
            )
        } else {
            (base, MixJob { channel: 1, ..base })
        };
        mix_chunk(view.source, routing, interpolate, &mut left, dest, count);
        mix_chunk(view.source, routing, interpolate, &mut right, dest, count);
        right
    };

    voice.current = last.index;
    voice.ramp_remaining = last.ramp;
}
