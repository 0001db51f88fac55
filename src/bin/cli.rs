//! tickmix CLI: render the built-in demo headlessly.
//!
//! Usage:
//!   cargo run --bin tm-cli -- --wav demo.wav
//!   cargo run --bin tm-cli -- --wav demo.wav --rate 48000 --mono --no-interp
//!   cargo run --bin tm-cli -- --realtime --wav demo.wav

use std::{env, fs};

use tm_ir::{ChannelChanged, SampleBank};
use tm_master::demo::{DemoSource, Instruments};
use tm_master::{Controller, MixerConfig, OutputLayout, RenderSettings};

const USAGE: &str = "Usage: tm-cli [--wav out.wav] [--seconds N] [--loops N] [--rate HZ] \
[--mono] [--no-interp] [--no-surround] [--separation 0-100] [--swap] [--pad N] [--realtime]";

/// Callback size used when simulating an audio device.
const DEVICE_FRAMES: usize = 512;

struct Options {
    wav: Option<String>,
    seconds: u32,
    loops: u32,
    realtime: bool,
    settings: RenderSettings,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let opts = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("{e}");
        eprintln!("{USAGE}");
        std::process::exit(1);
    });

    let mut bank = SampleBank::new();
    let Some(inst) = Instruments::synthesize(&mut bank) else {
        eprintln!("Failed to synthesize demo instruments");
        std::process::exit(1);
    };
    let source = DemoSource::new(inst).with_loops(opts.loops);

    let mut ctrl = Controller::new(source, bank, MixerConfig::with_voices(4), opts.settings)
        .unwrap_or_else(|e| {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        });
    ctrl.add_observer(|ch: usize, changed: &ChannelChanged| {
        if changed.note_kicked {
            log::debug!("ch {ch}: kick sample {:?} note {:?}", changed.sample_number, changed.note);
        }
    });

    let s = &opts.settings;
    println!("Sample rate: {} Hz", s.sample_rate);
    println!("Output:      {:?} (+{} padding)", s.output, s.padding_channels);
    println!("Interp:      {}", s.interpolation);
    println!("Surround:    {}", s.surround);
    println!("Separation:  {}%", s.stereo_separation);
    println!();

    let max_frames = s.sample_rate as usize * opts.seconds as usize;
    let width = s.frame_width();
    let samples = if opts.realtime {
        render_realtime(ctrl, max_frames)
    } else {
        println!("Rendering offline...");
        ctrl.render(max_frames)
    };

    let peak = samples.iter().map(|v| v.unsigned_abs()).max().unwrap_or(0);
    println!("Rendered {} frames, peak {}", samples.len() / width, peak);

    if let Some(path) = opts.wav {
        let wav = tm_master::samples_to_wav(&samples, width as u16, s.sample_rate);
        fs::write(&path, &wav).unwrap_or_else(|e| {
            eprintln!("Failed to write {}: {}", path, e);
            std::process::exit(1);
        });
        println!("Wrote {} bytes to {}", wav.len(), path);
    }
    println!("Done.");
}

/// Drive the real-time split the way an audio callback would, in small
/// fixed blocks.
fn render_realtime(ctrl: Controller<DemoSource>, max_frames: usize) -> Vec<i16> {
    let width = ctrl.settings().frame_width();
    let (thread, mut renderer) = ctrl.into_realtime(16).unwrap_or_else(|e| {
        eprintln!("Failed to start real-time playback: {e}");
        std::process::exit(1);
    });
    println!("Rendering through the tick thread...");

    let mut out = Vec::with_capacity(max_frames * width);
    let mut block = vec![0i16; DEVICE_FRAMES * width];
    while out.len() < max_frames * width && !renderer.is_finished() {
        renderer.render(&mut block);
        out.extend_from_slice(&block);
    }
    out.truncate(max_frames * width);
    thread.stop();

    println!("Ticks: {}, underruns: {}", renderer.ticks(), renderer.underruns());
    out
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut opts = Options {
        wav: None,
        seconds: 60,
        loops: 1,
        realtime: false,
        settings: RenderSettings::default(),
    };

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--wav" => opts.wav = Some(value(&mut it, arg)?),
            "--seconds" => opts.seconds = number(&mut it, arg)?,
            "--loops" => opts.loops = number(&mut it, arg)?,
            "--rate" => opts.settings.sample_rate = number(&mut it, arg)?,
            "--separation" => opts.settings.stereo_separation = number(&mut it, arg)?,
            "--pad" => opts.settings.padding_channels = number(&mut it, arg)?,
            "--mono" => opts.settings.output = OutputLayout::Mono,
            "--no-interp" => opts.settings.interpolation = false,
            "--no-surround" => opts.settings.surround = false,
            "--swap" => opts.settings.swap_speakers = true,
            "--realtime" => opts.realtime = true,
            "-h" | "--help" => return Err("tickmix demo renderer".into()),
            other => return Err(format!("Unknown argument: {other}")),
        }
    }
    Ok(opts)
}

fn value<'a>(it: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<String, String> {
    it.next().cloned().ok_or_else(|| format!("{flag} needs a value"))
}

fn number<'a, T: std::str::FromStr>(
    it: &mut impl Iterator<Item = &'a String>,
    flag: &str,
) -> Result<T, String> {
    let v = value(it, flag)?;
    v.parse().map_err(|_| format!("{flag}: not a number: {v}"))
}
