//! Built-in demo: synthesized instruments and a short four-channel tune.
//!
//! Exercises forward and bidirectional loops, backwards playback, pending
//! sample switches, seeks, surround and panning sweeps without needing any
//! file format.

use tm_ir::{
    loop_over, note_to_period, Channel, LoopKind, LoopRegion, Panning, SampleBank, SampleData,
    SamplePlay, SampleRef,
};

use crate::source::{TickSource, TickStatus};

/// Ticks per row.
const SPEED: u32 = 6;
const ROWS: u32 = 64;

const BASS_LINE: [u8; 8] = [36, 36, 43, 41, 36, 36, 39, 41];
const MELODY: [u8; 8] = [60, 63, 67, 70, 67, 63, 65, 62];

/// Synthesized sample set.
#[derive(Clone, Copy, Debug)]
pub struct Instruments {
    /// 8-bit mono square, one cycle.
    pub square: SampleRef,
    /// 16-bit mono sine with a bidirectional sustain loop.
    pub sine: SampleRef,
    /// 8-bit mono noise burst, no loop.
    pub noise: SampleRef,
    /// 16-bit mono swell, played backwards.
    pub swell: SampleRef,
    /// 16-bit stereo pad, two alternating variants.
    pub pad_a: SampleRef,
    pub pad_b: SampleRef,
}

impl Instruments {
    /// Synthesize the instruments into `bank`.
    pub fn synthesize(bank: &mut SampleBank) -> Option<Self> {
        let square: Vec<i8> = (0..32).map(|i| if i < 16 { 96 } else { -96 }).collect();

        let sine: Vec<i16> = (0..512)
            .map(|i| (parabolic_sine(i as u32 * 8 % 256) as i32 * 24000 / 32767) as i16)
            .collect();

        let mut seed = 0x1234_5678u32;
        let noise: Vec<i8> = (0..4000)
            .map(|i| {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                let decay = (4000 - i) as i32;
                ((seed >> 24) as i8 as i32 * decay / 4000) as i8
            })
            .collect();

        let swell: Vec<i16> = (0..6000)
            .map(|i: i32| {
                let saw = ((i * 37) % 2000 - 1000) * 16;
                (saw * i / 6000) as i16
            })
            .collect();

        let pad = |detune: i32| -> Vec<i16> {
            (0..1024)
                .flat_map(|i: i32| {
                    let l = ((i * 3) % 512 - 256) * 48;
                    let r = ((i * (3 + detune)) % 512 - 256) * 48;
                    [l as i16, r as i16]
                })
                .collect()
        };

        let mut add = |data| {
            let key = bank.insert(data);
            bank.whole(key)
        };
        Some(Self {
            square: add(SampleData::Mono8(square))?,
            sine: add(SampleData::Mono16(sine))?,
            noise: add(SampleData::Mono8(noise))?,
            swell: add(SampleData::Mono16(swell))?,
            pad_a: add(SampleData::Stereo16(pad(1)))?,
            pad_b: add(SampleData::Stereo16(pad(2)))?,
        })
    }
}

/// Integer sine approximation over a 256-step cycle, in i16 range.
fn parabolic_sine(phase: u32) -> i16 {
    let x = (phase % 128) as i32 - 64;
    let y = 32767 - x * x * 32767 / 4096;
    if phase < 128 {
        y as i16
    } else {
        -y as i16
    }
}

/// Four-channel demo tune.
pub struct DemoSource {
    inst: Instruments,
    tick: u32,
    loops: u32,
}

impl DemoSource {
    pub fn new(inst: Instruments) -> Self {
        Self { inst, tick: 0, loops: 1 }
    }

    /// Play the tune `loops` times before finishing.
    pub fn with_loops(mut self, loops: u32) -> Self {
        self.loops = loops.max(1);
        self
    }

    /// Ticks in one pass of the tune.
    pub const fn ticks_per_loop() -> u32 {
        ROWS * SPEED
    }

    fn bass(&self, ch: &mut Channel, row: u32, tick: u32) {
        if tick != 0 || row % 4 != 0 {
            return;
        }
        let note = BASS_LINE[(row / 4 % 8) as usize];
        ch.play_sample(Some(1), SamplePlay::forward(self.inst.square));
        ch.set_loop(0, self.inst.square.length, LoopKind::Forward);
        ch.set_amiga_period(note_to_period(note) as u32);
        ch.set_note((note / 12) - 1, note % 12);
        ch.set_amiga_volume(40);
        ch.set_panning(Panning::Position(80));
    }

    fn lead(&self, ch: &mut Channel, row: u32, tick: u32) {
        if tick == 0 && row % 8 == 0 {
            let note = MELODY[(row / 8 % 8) as usize];
            ch.play_sample(Some(2), SamplePlay::forward(self.inst.sine));
            ch.set_loop(256, 256, LoopKind::Bidirectional);
            ch.set_amiga_period(note_to_period(note) as u32);
            ch.set_note((note / 12) - 1, note % 12);
            ch.set_amiga_volume(48);
        }
        // Slow panning sweep, ramped by the mixer
        let t = row * SPEED + tick;
        let sweep = (t * 4) % 512;
        let pan = if sweep < 256 { sweep } else { 511 - sweep };
        ch.set_panning(Panning::position(pan as u16));
        // Fade out over each note
        if tick == 0 && row % 8 == 4 {
            ch.set_amiga_volume(24);
        }
    }

    fn drums(&self, ch: &mut Channel, row: u32, tick: u32) {
        if tick != 0 {
            return;
        }
        match row % 16 {
            4 | 12 => {
                ch.play_sample(Some(3), SamplePlay::forward(self.inst.noise));
                ch.set_frequency(22050);
                ch.set_volume(200);
                ch.set_panning(Panning::CENTER);
            }
            14 => {
                // Skip the attack of the previous hit
                ch.play_sample(Some(3), SamplePlay::forward(self.inst.noise));
                ch.set_position(1500, false);
            }
            15 if row == 63 => {
                ch.play_sample(Some(4), SamplePlay::backwards(self.inst.swell));
                ch.set_frequency(32000);
                ch.set_volume(160);
            }
            _ if row % 16 == 8 => ch.virtual_trigger(),
            _ => {}
        }
    }

    fn pad(&self, ch: &mut Channel, row: u32, tick: u32) {
        if tick != 0 {
            return;
        }
        match row {
            0 => {
                ch.play_sample(Some(5), SamplePlay::forward(self.inst.pad_a));
                ch.set_loop(0, self.inst.pad_a.length, LoopKind::Forward);
                ch.set_frequency(11025);
                ch.set_volume(96);
                ch.set_panning(Panning::Surround);
            }
            16 | 48 => ch.set_pending_sample(
                SamplePlay::forward(self.inst.pad_b),
                Some(loop_over(&self.inst.pad_b, LoopKind::Bidirectional)),
            ),
            32 => ch.set_pending_sample(
                SamplePlay::forward(self.inst.pad_a),
                Some(LoopRegion::new(0, self.inst.pad_a.length, LoopKind::Forward)),
            ),
            56 => ch.set_position(-200, true),
            62 => ch.mute(),
            _ => {}
        }
    }
}

impl TickSource for DemoSource {
    fn channels(&self) -> usize {
        4
    }

    fn play_tick(&mut self, channels: &mut [Channel]) -> TickStatus {
        if self.tick >= Self::ticks_per_loop() * self.loops {
            return TickStatus::Finished;
        }
        let t = self.tick % Self::ticks_per_loop();
        let (row, tick) = (t / SPEED, t % SPEED);
        if let [bass, lead, drums, pad] = channels {
            self.bass(bass, row, tick);
            self.lead(lead, row, tick);
            self.drums(drums, row, tick);
            self.pad(pad, row, tick);
        }
        self.tick += 1;
        TickStatus::Continue
    }
}
