//! Real-time operation: a tick thread feeding a device-side renderer.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use ringbuf::traits::{Consumer, Producer};
use ringbuf::{HeapCons, HeapProd};
use tm_engine::{Mixer, RenderSettings};
use tm_ir::{Channel, ChannelChanged, SampleBank};

use crate::handoff::{Received, TickReceiver, TickSender};
use crate::source::{TickClock, TickSource, TickStatus};
use crate::ChannelObserver;

/// How long the tick thread waits when the queue is full.
const BACKOFF: Duration = Duration::from_millis(1);

/// Voice state the renderer publishes back to the tick thread.
pub(crate) struct Feedback {
    /// Bit `n` set while voice `n` plays.
    active: AtomicU64,
    /// Play position of each voice, in frames from its sample start.
    positions: Vec<AtomicU32>,
}

impl Feedback {
    pub(crate) fn new(mixer: &Mixer) -> Self {
        let feedback = Self {
            active: AtomicU64::new(0),
            positions: (0..mixer.voices().len()).map(|_| AtomicU32::new(0)).collect(),
        };
        feedback.publish(mixer);
        feedback
    }

    fn publish(&self, mixer: &Mixer) {
        self.active.store(mixer.active_mask(), Ordering::Relaxed);
        for (i, position) in self.positions.iter().enumerate() {
            position.store(mixer.play_position(i), Ordering::Relaxed);
        }
    }

    fn apply(&self, channels: &mut [Channel]) {
        let mask = self.active.load(Ordering::Relaxed);
        for (i, channel) in channels.iter_mut().enumerate() {
            channel.set_active(mask & (1 << i) != 0);
            if let Some(position) = self.positions.get(i) {
                channel.set_play_position(position.load(Ordering::Relaxed));
            }
        }
    }
}

/// Render side of real-time playback. Call [`Renderer::render`] from the
/// audio device callback; it neither locks nor allocates.
pub struct Renderer {
    mixer: Mixer,
    bank: Arc<SampleBank>,
    settings: RenderSettings,
    receiver: TickReceiver,
    changes: HeapProd<(usize, ChannelChanged)>,
    feedback: Arc<Feedback>,
    /// Frames left in the current tick.
    tick_remaining: usize,
    ticks: u64,
    underruns: u64,
    finished: bool,
}

impl Renderer {
    pub(crate) fn new(
        mixer: Mixer,
        bank: Arc<SampleBank>,
        settings: RenderSettings,
        receiver: TickReceiver,
        changes: HeapProd<(usize, ChannelChanged)>,
        feedback: Arc<Feedback>,
    ) -> Self {
        Self {
            mixer,
            bank,
            settings,
            receiver,
            changes,
            feedback,
            tick_remaining: 0,
            ticks: 0,
            underruns: 0,
            finished: false,
        }
    }

    /// Fill `out` with interleaved PCM, applying queued ticks at their
    /// boundaries. With no complete tick queued the current voices keep
    /// playing and the underrun is counted.
    pub fn render(&mut self, out: &mut [i16]) {
        let width = self.settings.frame_width();
        assert!(
            out.len() % width == 0,
            "output length {} is not a multiple of {width}",
            out.len()
        );

        let mut pos = 0;
        while pos < out.len() {
            if self.tick_remaining == 0 && !self.finished {
                let changes = &mut self.changes;
                match self.receiver.next_tick(&mut self.mixer, |ch, changed| {
                    let _ = changes.try_push((ch, changed));
                }) {
                    Received::Tick { frames } => {
                        self.ticks += 1;
                        self.tick_remaining = frames;
                        continue;
                    }
                    Received::Finished => self.finished = true,
                    Received::Empty => self.underruns += 1,
                }
            }

            let left = (out.len() - pos) / width;
            let frames =
                if self.tick_remaining > 0 { self.tick_remaining.min(left) } else { left };
            self.mixer.render(&self.bank, &self.settings, &mut out[pos..pos + frames * width]);
            self.tick_remaining = self.tick_remaining.saturating_sub(frames);
            pos += frames * width;
        }

        self.feedback.publish(&self.mixer);
    }

    /// Enable or disable a channel from the render side.
    pub fn set_channel_enabled(&mut self, channel: usize, enabled: bool) {
        self.mixer.set_channel_enabled(channel, enabled);
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Ticks applied so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Render calls that found no complete tick queued.
    pub fn underruns(&self) -> u64 {
        self.underruns
    }

    /// The source finished and every queued tick was rendered.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Handle to the thread running a [`TickSource`]. Dropping it stops the thread.
pub struct TickThread {
    stop_signal: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    ticks_sent: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl TickThread {
    pub(crate) fn spawn<S: TickSource + 'static>(
        source: S,
        channels: Vec<Channel>,
        clock: TickClock,
        sender: TickSender,
        changes: HeapCons<(usize, ChannelChanged)>,
        observers: Vec<Box<dyn ChannelObserver>>,
        feedback: Arc<Feedback>,
    ) -> std::io::Result<Self> {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let ticks_sent = Arc::new(AtomicU64::new(0));

        let mut worker = TickWorker {
            source,
            channels,
            clock,
            sender,
            changes,
            observers,
            feedback,
            stop: stop_signal.clone(),
            ticks_sent: ticks_sent.clone(),
        };
        let done = finished.clone();
        let thread = std::thread::Builder::new().name("tm-tick".into()).spawn(move || {
            worker.run();
            done.store(true, Ordering::Relaxed);
        })?;

        Ok(Self { stop_signal, finished, ticks_sent, thread: Some(thread) })
    }

    /// The source has finished (or the thread was stopped).
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }

    pub fn ticks_sent(&self) -> u64 {
        self.ticks_sent.load(Ordering::Relaxed)
    }

    /// Wait for the source to finish on its own.
    pub fn join(mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    /// Stop the thread and wait for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_signal.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TickThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct TickWorker<S> {
    source: S,
    channels: Vec<Channel>,
    clock: TickClock,
    sender: TickSender,
    changes: HeapCons<(usize, ChannelChanged)>,
    observers: Vec<Box<dyn ChannelObserver>>,
    feedback: Arc<Feedback>,
    stop: Arc<AtomicBool>,
    ticks_sent: Arc<AtomicU64>,
}

impl<S: TickSource> TickWorker<S> {
    fn run(&mut self) {
        log::debug!("tick thread started: {} channels", self.channels.len());
        while !self.stop.load(Ordering::Relaxed) {
            self.notify();
            if !self.sender.has_room() {
                std::thread::sleep(BACKOFF);
                continue;
            }

            self.feedback.apply(&mut self.channels);

            match self.source.play_tick(&mut self.channels) {
                TickStatus::Continue => {
                    let frames = self.clock.next_tick_frames() as u32;
                    if self.sender.send_tick(&mut self.channels, frames).is_ok() {
                        self.ticks_sent.fetch_add(1, Ordering::Relaxed);
                    }
                }
                TickStatus::Finished => {
                    while self.sender.send_finished().is_err() {
                        if self.stop.load(Ordering::Relaxed) {
                            break;
                        }
                        std::thread::sleep(BACKOFF);
                    }
                    log::debug!("tick source finished after {} ticks", self.clock.ticks());
                    break;
                }
            }
        }
        self.notify();
    }

    fn notify(&mut self) {
        while let Some((channel, changed)) = self.changes.try_pop() {
            for observer in self.observers.iter_mut() {
                observer.on_change(channel, &changed);
            }
        }
    }
}
