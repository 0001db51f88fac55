//! Headless controller for the tickmix mixer.
//!
//! Drives a [`TickSource`] against a [`Mixer`], either offline (render to
//! memory or WAV) or split across a tick thread and a real-time renderer.

pub mod demo;
mod error;
mod handoff;
mod realtime;
mod source;
mod wav;

use std::sync::Arc;

use ringbuf::traits::Split;
use ringbuf::HeapRb;
use tm_engine::Mixer;
use tm_ir::{Channel, ChannelChanged, SampleBank, MAX_CHANNELS};

use crate::realtime::Feedback;

// Re-export common types so callers don't need tm-ir/tm-engine directly.
pub use tm_engine::{ConfigError, DeclickTuning, MixerConfig, OutputLayout, RenderSettings};

pub use error::MasterError;
pub use handoff::{tick_queue, Received, TickMessage, TickReceiver, TickSender};
pub use realtime::{Renderer, TickThread};
pub use source::{TickClock, TickSource, TickStatus, DEFAULT_TICK_RATE};
pub use wav::{samples_to_wav, write_wav};

/// Receives the change events the mixer reports for each tick.
pub trait ChannelObserver: Send {
    fn on_change(&mut self, channel: usize, changed: &ChannelChanged);
}

impl<F: FnMut(usize, &ChannelChanged) + Send> ChannelObserver for F {
    fn on_change(&mut self, channel: usize, changed: &ChannelChanged) {
        self(channel, changed)
    }
}

/// Owns a tick source, its channel handles and a mixer, and renders audio
/// one tick at a time.
pub struct Controller<S> {
    source: S,
    channels: Vec<Channel>,
    bank: Arc<SampleBank>,
    mixer: Mixer,
    settings: RenderSettings,
    clock: TickClock,
    observers: Vec<Box<dyn ChannelObserver>>,
    /// Frames left in the current tick.
    tick_remaining: usize,
    finished: bool,
}

impl<S: TickSource> Controller<S> {
    pub fn new(
        source: S,
        bank: SampleBank,
        config: MixerConfig,
        settings: RenderSettings,
    ) -> Result<Self, MasterError> {
        settings.validate()?;
        let channels = source.channels();
        if channels > config.voices {
            return Err(MasterError::ChannelCount { channels, voices: config.voices });
        }
        let mixer = Mixer::new(config)?;
        let clock = TickClock::new(settings.sample_rate, source.tick_rate());
        log::debug!(
            "controller: {channels} channels at {} Hz tick rate, {} Hz output",
            source.tick_rate(),
            settings.sample_rate
        );

        Ok(Self {
            source,
            channels: vec![Channel::new(); channels],
            bank: Arc::new(bank),
            mixer,
            settings,
            clock,
            observers: Vec::new(),
            tick_remaining: 0,
            finished: false,
        })
    }

    pub fn add_observer(&mut self, observer: impl ChannelObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn bank(&self) -> &SampleBank {
        &self.bank
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn set_channel_enabled(&mut self, channel: usize, enabled: bool) {
        self.mixer.set_channel_enabled(channel, enabled);
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    // --- Offline rendering ---

    /// Run the next tick. Returns its length in frames, or `None` once the
    /// source has finished.
    fn tick(&mut self) -> Option<usize> {
        if self.finished {
            return None;
        }
        self.mixer.sync_channels(&mut self.channels);
        if self.source.play_tick(&mut self.channels) == TickStatus::Finished {
            log::debug!("tick source finished after {} ticks", self.clock.ticks());
            self.finished = true;
            return None;
        }
        for (channel, changed) in self.mixer.apply_tick(&mut self.channels) {
            for observer in self.observers.iter_mut() {
                observer.on_change(channel, &changed);
            }
        }
        Some(self.clock.next_tick_frames())
    }

    /// Render up to `max_frames` frames of interleaved PCM, stopping early
    /// if the source finishes.
    pub fn render(&mut self, max_frames: usize) -> Vec<i16> {
        let width = self.settings.frame_width();
        let mut out = Vec::with_capacity(max_frames * width);
        let mut frames = 0;
        while frames < max_frames {
            if self.tick_remaining == 0 {
                match self.tick() {
                    Some(n) => self.tick_remaining = n,
                    None => break,
                }
                continue;
            }
            let n = self.tick_remaining.min(max_frames - frames);
            let start = out.len();
            out.resize(start + n * width, 0);
            self.mixer.render(&self.bank, &self.settings, &mut out[start..]);
            self.tick_remaining -= n;
            frames += n;
        }
        out
    }

    /// Render up to `max_seconds` of audio as a WAV file.
    pub fn render_to_wav(&mut self, max_seconds: u32) -> Vec<u8> {
        let max_frames = self.settings.sample_rate as usize * max_seconds as usize;
        let samples = self.render(max_frames);
        samples_to_wav(&samples, self.settings.frame_width() as u16, self.settings.sample_rate)
    }

    // --- Real-time playback ---

    /// Move the source onto a tick thread and return it with the renderer
    /// for the audio callback. `queue_ticks` is how many ticks the thread
    /// may run ahead.
    pub fn into_realtime(self, queue_ticks: usize) -> Result<(TickThread, Renderer), MasterError>
    where
        S: 'static,
    {
        let (sender, receiver) = tick_queue(self.channels.len(), queue_ticks);
        let (change_tx, change_rx) =
            HeapRb::<(usize, ChannelChanged)>::new(MAX_CHANNELS * queue_ticks.max(1)).split();
        let feedback = Arc::new(Feedback::new(&self.mixer));

        let thread = TickThread::spawn(
            self.source,
            self.channels,
            self.clock,
            sender,
            change_rx,
            self.observers,
            feedback.clone(),
        )
        .map_err(MasterError::Spawn)?;
        let renderer =
            Renderer::new(self.mixer, self.bank, self.settings, receiver, change_tx, feedback);
        Ok((thread, renderer))
    }
}
