//! End-to-end render behaviour through the public channel and mixer API.

use tm_engine::{Mixer, MixerConfig, OutputLayout, RenderSettings, FRAC_BITS};
use tm_ir::{
    Channel, LoopKind, LoopRegion, Panning, SampleBank, SampleData, SamplePlay, SampleRef,
};

const RATE: u32 = 44100;

fn mono_plain() -> RenderSettings {
    RenderSettings {
        sample_rate: RATE,
        output: OutputLayout::Mono,
        interpolation: false,
        ..Default::default()
    }
}

/// One channel, one mixer, one bank.
struct Rig {
    bank: SampleBank,
    mixer: Mixer,
    channels: Vec<Channel>,
}

impl Rig {
    fn new(block: usize) -> Self {
        let config = MixerConfig { max_block_frames: block, ..MixerConfig::with_voices(1) };
        Self {
            bank: SampleBank::new(),
            mixer: Mixer::new(config).unwrap(),
            channels: vec![Channel::new()],
        }
    }

    fn add(&mut self, data: SampleData) -> SampleRef {
        let key = self.bank.insert(data);
        self.bank.whole(key).unwrap()
    }

    fn tick(&mut self, f: impl FnOnce(&mut Channel)) {
        f(&mut self.channels[0]);
        self.mixer.apply_tick(&mut self.channels);
    }

    fn render(&mut self, settings: &RenderSettings, frames: usize) -> Vec<i16> {
        let mut out = vec![0i16; frames * settings.frame_width()];
        self.mixer.render(&self.bank, settings, &mut out);
        out
    }
}

#[test]
fn ten_sample_scenario() {
    let mut rig = Rig::new(12);
    let values: Vec<i8> = vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100];
    let sample = rig.add(SampleData::Mono8(values.clone()));
    rig.tick(|ch| {
        ch.play_sample(Some(1), SamplePlay::forward(sample));
        ch.set_frequency(RATE);
        ch.set_volume(256);
        ch.set_panning(Panning::Position(128));
    });

    let out = rig.render(&mono_plain(), 12);
    let expected: Vec<i16> = values.iter().map(|&v| v as i16 * 256).chain([0, 0]).collect();
    assert_eq!(out, expected);
    assert!(!rig.mixer.is_active(0));
}

#[test]
fn unlooped_voice_ends_after_its_length() {
    for len in [1usize, 2, 3, 17, 64, 500] {
        let mut rig = Rig::new(1024);
        let sample = rig.add(SampleData::Mono16(vec![300; len]));
        rig.tick(|ch| {
            ch.play_sample(None, SamplePlay::forward(sample));
            ch.set_frequency(RATE);
        });
        let out = rig.render(&mono_plain(), len + 40);
        assert!(out[..len].iter().all(|&s| s == 300), "len {len}");
        assert!(out[len..].iter().all(|&s| s == 0), "len {len}");
        assert!(!rig.mixer.is_active(0), "len {len}");
    }
}

#[test]
fn bidirectional_loop_bounces_at_each_boundary() {
    let mut rig = Rig::new(1024);
    let sample = rig.add(SampleData::Mono8(vec![20; 40]));
    let (start, len) = (10u32, 8u32);
    rig.tick(|ch| {
        ch.play_sample(None, SamplePlay::forward(sample));
        ch.set_loop(start, len, LoopKind::Bidirectional);
        ch.set_frequency(RATE);
    });

    let settings = mono_plain();
    rig.render(&settings, start as usize);
    let lo = (start as i64) << FRAC_BITS;
    let hi = ((start + len) as i64) << FRAC_BITS;
    let mut last_sign = rig.mixer.voice(0).increment.signum();
    let mut flips = 0;
    for _ in 0..(3 * len) {
        rig.render(&settings, 1);
        let v = rig.mixer.voice(0);
        assert!(v.current >= lo && v.current < hi);
        let sign = v.increment.signum();
        if sign != last_sign {
            flips += 1;
            // Direction flips only when the read position sits on a loop edge
            let frame = v.current >> FRAC_BITS;
            assert!(frame == start as i64 || frame == (start + len - 1) as i64, "flip at {frame}");
            last_sign = sign;
        }
    }
    assert!(flips >= 3);
}

#[test]
fn volume_jump_is_ramped_not_stepped() {
    let mut rig = Rig::new(1024);
    let sample = rig.add(SampleData::Mono16(vec![1024; 4000]));
    rig.tick(|ch| {
        ch.play_sample(None, SamplePlay::forward(sample));
        ch.set_frequency(RATE);
        ch.set_volume(100);
    });
    // Let the trigger-time ramp settle
    let settings = mono_plain();
    rig.render(&settings, 100);
    rig.tick(|ch| ch.set_volume(200));
    let out = rig.render(&settings, 100);

    assert_eq!(out[0], 400);
    assert!(out[..64].windows(2).all(|w| w[1] >= w[0]));
    assert!(out[63] < 800);
    assert!(out[64..].iter().all(|&s| s == 800));
}

/// Render a 100 -> 200 volume jump, `block` frames per render call.
fn volume_jump_in_blocks(block: usize) -> Vec<i16> {
    let mut rig = Rig::new(1024);
    let sample = rig.add(SampleData::Mono16(vec![1000; 4000]));
    rig.tick(|ch| {
        ch.play_sample(None, SamplePlay::forward(sample));
        ch.set_frequency(RATE);
        ch.set_volume(100);
    });
    let settings = mono_plain();
    rig.render(&settings, 100);
    rig.tick(|ch| ch.set_volume(200));
    let mut out = Vec::new();
    while out.len() < 80 {
        out.extend(rig.render(&settings, block));
    }
    out.truncate(80);
    out
}

#[test]
fn volume_ramp_is_independent_of_block_size() {
    let whole = volume_jump_in_blocks(80);
    assert!(whole[..64].windows(2).all(|w| w[1] >= w[0]));
    assert!(whole[8] < whole[63]);
    assert!(whole[64..].iter().all(|&s| s == 781));
    for block in [1, 8, 30, 64] {
        assert_eq!(volume_jump_in_blocks(block), whole, "block {block}");
    }
}

#[test]
fn separation_extremes() {
    let mut rig = Rig::new(1024);
    let sample = rig.add(SampleData::Mono16(vec![1000; 4000]));
    rig.tick(|ch| {
        ch.play_sample(None, SamplePlay::forward(sample));
        ch.set_frequency(RATE);
    });

    let narrow =
        RenderSettings { stereo_separation: 0, interpolation: false, ..Default::default() };
    for pan in [0u16, 50, 128, 200, 256] {
        rig.tick(|ch| ch.set_panning(Panning::Position(pan)));
        rig.render(&narrow, 100);
        let out = rig.render(&narrow, 1);
        assert_eq!(out[0], out[1], "pan {pan}");
    }

    let wide = RenderSettings { interpolation: false, ..Default::default() };
    rig.tick(|ch| ch.set_panning(Panning::LEFT));
    rig.render(&wide, 100);
    assert_eq!(rig.render(&wide, 1)[1], 0);
    rig.tick(|ch| ch.set_panning(Panning::RIGHT));
    rig.render(&wide, 100);
    assert_eq!(rig.render(&wide, 1)[0], 0);
}

#[test]
fn pending_sample_follows_without_gap() {
    let mut rig = Rig::new(1024);
    let first = rig.add(SampleData::Mono16(vec![111; 30]));
    let second = rig.add(SampleData::Mono16(vec![222; 30]));
    rig.tick(|ch| {
        ch.play_sample(Some(1), SamplePlay::forward(first));
        ch.set_frequency(RATE);
    });
    let settings = mono_plain();
    let head = rig.render(&settings, 10);
    rig.tick(|ch| ch.set_pending_sample(SamplePlay::forward(second), None));
    let tail = rig.render(&settings, 60);

    let out: Vec<i16> = head.into_iter().chain(tail).collect();
    assert!(out[..30].iter().all(|&s| s == 111));
    assert!(out[30..60].iter().all(|&s| s == 222));
    assert!(out[60..].iter().all(|&s| s == 0));
}

#[test]
fn short_pending_sample_is_ignored() {
    let mut rig = Rig::new(1024);
    let first = rig.add(SampleData::Mono16(vec![111; 10]));
    let tiny = rig.add(SampleData::Mono16(vec![222; 2]));
    rig.tick(|ch| {
        ch.play_sample(None, SamplePlay::forward(first));
        ch.set_frequency(RATE);
    });
    rig.render(&mono_plain(), 1);
    rig.tick(|ch| ch.set_pending_sample(SamplePlay::forward(tiny), None));
    let out = rig.render(&mono_plain(), 12);
    assert!(out[..9].iter().all(|&s| s == 111));
    assert!(out[9..].iter().all(|&s| s == 0));
}

/// xorshift32 for reproducible fuzzing.
struct Rng(u32);

impl Rng {
    fn next(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }

    fn below(&mut self, n: u32) -> u32 {
        self.next() % n.max(1)
    }

    fn chance(&mut self, percent: u32) -> bool {
        self.below(100) < percent
    }
}

fn random_data(rng: &mut Rng, frames: usize) -> SampleData {
    match rng.below(4) {
        0 => SampleData::Mono8((0..frames).map(|_| rng.next() as i8).collect()),
        1 => SampleData::Mono16((0..frames).map(|_| rng.next() as i16).collect()),
        2 => SampleData::Stereo8((0..frames * 2).map(|_| rng.next() as i8).collect()),
        _ => SampleData::Stereo16((0..frames * 2).map(|_| rng.next() as i16).collect()),
    }
}

fn random_loop(rng: &mut Rng, sample: &SampleRef) -> LoopRegion {
    let start = sample.start + rng.below(sample.length);
    let length = 1 + rng.below(sample.end() - start);
    let kind = match rng.below(3) {
        0 => LoopKind::None,
        1 => LoopKind::Forward,
        _ => LoopKind::Bidirectional,
    };
    LoopRegion::new(start, length, kind)
}

fn random_play(rng: &mut Rng, bank: &SampleBank, key: tm_ir::SampleKey, frames: u32) -> SamplePlay {
    let start = rng.below(frames);
    let length = 1 + rng.below(frames - start);
    let sample = bank.reference(key, start, length).unwrap();
    if rng.chance(30) {
        SamplePlay::backwards(sample)
    } else {
        SamplePlay::forward(sample)
    }
}

#[test]
fn position_stays_inside_active_sample() {
    let mut rng = Rng(0x9e37_79b9);
    for case in 0..300 {
        let mut rig = Rig::new(1 + rng.below(256) as usize);
        let frames = 1 + rng.below(300);
        let data = random_data(&mut rng, frames as usize);
        let a = rig.bank.insert(data);
        let data = random_data(&mut rng, frames as usize);
        let b = rig.bank.insert(data);

        let settings = RenderSettings {
            sample_rate: [8000, 22050, 44100, 48000][rng.below(4) as usize],
            output: if rng.chance(50) { OutputLayout::Mono } else { OutputLayout::Stereo },
            interpolation: rng.chance(50),
            surround: rng.chance(50),
            stereo_separation: rng.below(101) as u8,
            ..Default::default()
        };

        for _ in 0..20 {
            let play = random_play(&mut rng, &rig.bank, a, frames);
            let pending = random_play(&mut rng, &rig.bank, b, frames);
            let freq = rng.below(200_000);
            let roll = rng.below(8);
            let lp = random_loop(&mut rng, &play.sample);
            let plp = random_loop(&mut rng, &pending.sample);
            let seek = rng.below(frames + 10) as i32 - 5;
            rig.tick(|ch| {
                match roll {
                    0 => {
                        ch.play_sample(None, play);
                        ch.set_loop(lp.start, lp.length, lp.kind);
                        ch.set_frequency(freq);
                    }
                    1 => ch.set_pending_sample(pending, Some(plp)),
                    2 => ch.set_position(seek, seek < 0),
                    3 if freq % 2 == 0 => ch.set_panning(Panning::Surround),
                    3 => ch.set_panning(Panning::position((freq % 257) as u16)),
                    4 => ch.set_volume((freq % 257) as u16),
                    5 => ch.mute(),
                    _ => ch.set_frequency(freq),
                }
            });

            let n = 1 + rng.below(700) as usize;
            rig.render(&settings, n);

            let v = rig.mixer.voice(0);
            if v.active {
                let s = v.sample.unwrap();
                let lo = (s.start as i64) << FRAC_BITS;
                let hi = (s.end() as i64) << FRAC_BITS;
                assert!(
                    v.current >= lo && v.current < hi,
                    "case {case}: {} outside [{lo}, {hi})",
                    v.current
                );
            }
        }
    }
}
