//! Lock-free tick handoff between the tick thread and the render side.
//!
//! Commands travel as a stream of messages over an SPSC ring; a tick only
//! takes effect once its closing [`TickMessage::EndOfTick`] arrives, so the
//! renderer never sees half a tick.

use arrayvec::ArrayVec;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tm_engine::Mixer;
use tm_ir::{Channel, ChannelChanged, ChannelCommands, MAX_CHANNELS};

use crate::MasterError;

#[derive(Clone, Copy, Debug)]
pub enum TickMessage {
    Channel { index: u8, commands: ChannelCommands },
    EndOfTick { frames: u32 },
    Finished,
}

/// Result of polling for the next tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Received {
    /// A tick was applied; render this many frames before the next one.
    Tick { frames: usize },
    Finished,
    /// No complete tick queued.
    Empty,
}

/// Create a queue holding at least `ticks` full ticks of `channels` channels.
pub fn tick_queue(channels: usize, ticks: usize) -> (TickSender, TickReceiver) {
    let per_tick = channels.min(MAX_CHANNELS) + 1;
    let (prod, cons) = HeapRb::<TickMessage>::new(per_tick * ticks.max(1)).split();
    (TickSender { prod, per_tick }, TickReceiver { cons, staged: ArrayVec::new() })
}

pub struct TickSender {
    prod: HeapProd<TickMessage>,
    /// Messages in the largest possible tick.
    per_tick: usize,
}

impl TickSender {
    /// Whether a whole tick fits right now.
    pub fn has_room(&self) -> bool {
        self.prod.vacant_len() >= self.per_tick
    }

    /// Drain every channel's commands into the queue, followed by the tick
    /// length. Nothing is sent or drained if a whole tick does not fit.
    pub fn send_tick(&mut self, channels: &mut [Channel], frames: u32) -> Result<(), MasterError> {
        if !self.has_room() {
            return Err(MasterError::QueueFull);
        }
        for (index, channel) in channels.iter_mut().enumerate().take(MAX_CHANNELS) {
            if channel.has_commands() {
                let commands = channel.take_commands();
                let _ = self.prod.try_push(TickMessage::Channel { index: index as u8, commands });
            }
        }
        let _ = self.prod.try_push(TickMessage::EndOfTick { frames });
        Ok(())
    }

    pub fn send_finished(&mut self) -> Result<(), MasterError> {
        self.prod.try_push(TickMessage::Finished).map_err(|_| MasterError::QueueFull)
    }
}

pub struct TickReceiver {
    cons: HeapCons<TickMessage>,
    /// Commands of a tick whose end has not arrived yet.
    staged: ArrayVec<(u8, ChannelCommands), MAX_CHANNELS>,
}

impl TickReceiver {
    /// Apply the next complete tick to `mixer`, passing its change events
    /// to `on_change`.
    pub fn next_tick(
        &mut self,
        mixer: &mut Mixer,
        mut on_change: impl FnMut(usize, ChannelChanged),
    ) -> Received {
        while let Some(msg) = self.cons.try_pop() {
            match msg {
                TickMessage::Channel { index, commands } => {
                    let _ = self.staged.try_push((index, commands));
                }
                TickMessage::EndOfTick { frames } => {
                    let voices = mixer.voices().len();
                    for (index, commands) in self.staged.drain(..) {
                        let index = index as usize;
                        if index < voices {
                            if let Some(changed) = mixer.apply(index, commands) {
                                on_change(index, changed);
                            }
                        }
                    }
                    return Received::Tick { frames: frames as usize };
                }
                TickMessage::Finished => return Received::Finished,
            }
        }
        Received::Empty
    }
}
