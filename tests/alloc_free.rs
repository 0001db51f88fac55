//! Allocation-free render path tests.
//!
//! These tests verify that resolving ticks and rendering never touch the
//! heap once the mixer is built. They drive the demo tune, which covers
//! loops, backwards playback, pending switches, seeks and surround.
//!
//! Runs under a plain `cargo test`.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use tm_engine::{Mixer, MixerConfig, OutputLayout, RenderSettings};
use tm_ir::{Channel, SampleBank};
use tm_master::demo::{DemoSource, Instruments};
use tm_master::{Controller, TickClock, TickSource, TickStatus};

fn demo(bank: &mut SampleBank) -> DemoSource {
    DemoSource::new(Instruments::synthesize(bank).unwrap())
}

/// Run the demo through a bare mixer, aborting on any heap allocation.
fn assert_mixer_alloc_free(settings: RenderSettings) {
    let mut bank = SampleBank::new();
    let mut source = demo(&mut bank);
    let mut mixer = Mixer::new(MixerConfig::with_voices(4)).unwrap();
    let mut channels = vec![Channel::new(); 4];
    let mut clock = TickClock::new(settings.sample_rate, source.tick_rate());
    let mut out = vec![0i16; 4096 * settings.frame_width()];

    assert_no_alloc(|| {
        while source.play_tick(&mut channels) == TickStatus::Continue {
            mixer.apply_tick(&mut channels);
            let frames = clock.next_tick_frames();
            mixer.render(&bank, &settings, &mut out[..frames * settings.frame_width()]);
            mixer.sync_channels(&mut channels);
        }
    });
}

#[test]
fn stereo_interpolated_alloc_free() {
    assert_mixer_alloc_free(RenderSettings::default());
}

#[test]
fn mono_plain_alloc_free() {
    assert_mixer_alloc_free(RenderSettings {
        output: OutputLayout::Mono,
        interpolation: false,
        ..Default::default()
    });
}

#[test]
fn padded_swapped_alloc_free() {
    assert_mixer_alloc_free(RenderSettings {
        sample_rate: 48000,
        surround: false,
        swap_speakers: true,
        padding_channels: 2,
        stereo_separation: 50,
        ..Default::default()
    });
}

#[test]
fn realtime_renderer_alloc_free() {
    let mut bank = SampleBank::new();
    let source = demo(&mut bank);
    let config = MixerConfig::with_voices(4);
    let ctrl = Controller::new(source, bank, config, RenderSettings::default()).unwrap();
    let queue = DemoSource::ticks_per_loop() as usize + 1;
    let (thread, mut renderer) = ctrl.into_realtime(queue).unwrap();
    thread.join();

    let mut block = vec![0i16; 512 * 2];
    assert_no_alloc(|| {
        for _ in 0..700 {
            renderer.render(&mut block);
        }
    });
    assert!(renderer.is_finished());
}
