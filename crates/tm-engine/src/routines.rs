//! Inner mixing routines.
//!
//! One routine per source bit depth, output layout (mono, stereo, surround)
//! and interpolation setting: twelve in all, monomorphized from one generic
//! body and picked once per chunk by [`mix_chunk`].

use crate::voice::{FRAC_BITS, FRAC_MASK};

/// Source sample data for one chunk.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Source<'a> {
    Bits8(&'a [i8]),
    Bits16(&'a [i16]),
}

/// How a chunk is summed into the accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Routing {
    Mono,
    Stereo,
    /// Equal level on both sides, right side phase-inverted.
    Surround,
}

/// Position, volume and declick state for one pass over a chunk.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MixJob {
    /// Fixed-point position in frames.
    pub index: i64,
    pub increment: i64,
    /// Interleaved values per source frame.
    pub stride: usize,
    /// Which interleaved value of the frame to read.
    pub channel: usize,
    pub left: i32,
    pub right: i32,
    pub old_left: i32,
    pub old_right: i32,
    pub ramp: u32,
    pub ramp_window: u32,
}

impl MixJob {
    /// Volumes for the next output sample, stepping the declick blend.
    #[inline]
    fn volumes(&mut self) -> (i64, i64) {
        if self.ramp == 0 {
            return (self.left as i64, self.right as i64);
        }
        let ramp = self.ramp as i64;
        let window = self.ramp_window as i64;
        let left = self.left as i64 + (self.old_left - self.left) as i64 * ramp / window;
        let right = self.right as i64 + (self.old_right - self.right) as i64 * ramp / window;
        self.ramp -= 1;
        (left, right)
    }
}

/// A stored sample value widened to the 16-bit range.
pub(crate) trait Pcm: Copy {
    fn widen(self) -> i64;
}

impl Pcm for i8 {
    #[inline]
    fn widen(self) -> i64 {
        (self as i64) << 8
    }
}

impl Pcm for i16 {
    #[inline]
    fn widen(self) -> i64 {
        self as i64
    }
}

/// Output side of a routine.
trait Writer {
    const CHANNELS: usize;
    fn write(dest: &mut [i32], sample: i64, left: i64, right: i64);
}

struct MonoOut;
struct StereoOut;
struct SurroundOut;

impl Writer for MonoOut {
    const CHANNELS: usize = 1;

    #[inline]
    fn write(dest: &mut [i32], sample: i64, left: i64, _right: i64) {
        dest[0] = dest[0].wrapping_add((sample * left) as i32);
    }
}

impl Writer for StereoOut {
    const CHANNELS: usize = 2;

    #[inline]
    fn write(dest: &mut [i32], sample: i64, left: i64, right: i64) {
        dest[0] = dest[0].wrapping_add((sample * left) as i32);
        dest[1] = dest[1].wrapping_add((sample * right) as i32);
    }
}

impl Writer for SurroundOut {
    const CHANNELS: usize = 2;

    #[inline]
    fn write(dest: &mut [i32], sample: i64, left: i64, right: i64) {
        if left >= right {
            let v = (sample * left) as i32;
            dest[0] = dest[0].wrapping_add(v);
            dest[1] = dest[1].wrapping_sub(v);
        } else {
            let v = (sample * right) as i32;
            dest[0] = dest[0].wrapping_sub(v);
            dest[1] = dest[1].wrapping_add(v);
        }
    }
}

/// Mix up to `frames` output frames of `src` into `dest`.
///
/// Stops early, leaving `job.index` on the unread position, if the position
/// leaves the buffer.
fn mix<S: Pcm, W: Writer, const INTERPOLATE: bool>(
    src: &[S],
    job: &mut MixJob,
    dest: &mut [i32],
    frames: usize,
) {
    for out in dest.chunks_exact_mut(W::CHANNELS).take(frames) {
        if job.index < 0 {
            break;
        }
        let idx = (job.index >> FRAC_BITS) as usize * job.stride + job.channel;
        let Some(a) = src.get(idx) else { break };
        let a = a.widen();
        let sample = if INTERPOLATE {
            let b = src.get(idx + job.stride).map_or(a, |b| b.widen());
            a + (((b - a) * (job.index & FRAC_MASK)) >> FRAC_BITS)
        } else {
            a
        };
        job.index += job.increment;
        let (left, right) = job.volumes();
        W::write(out, sample, left, right);
    }
}

/// Mix one chunk with the routine matching `source`, `routing` and `interpolate`.
pub(crate) fn mix_chunk(
    source: Source<'_>,
    routing: Routing,
    interpolate: bool,
    job: &mut MixJob,
    dest: &mut [i32],
    frames: usize,
) {
    match (source, routing, interpolate) {
        (Source::Bits8(s), Routing::Mono, false) => mix::<i8, MonoOut, false>(s, job, dest, frames),
        (Source::Bits8(s), Routing::Mono, true) => mix::<i8, MonoOut, true>(s, job, dest, frames),
        (Source::Bits8(s), Routing::Stereo, false) => {
            mix::<i8, StereoOut, false>(s, job, dest, frames)
        }
        (Source::Bits8(s), Routing::Stereo, true) => {
            mix::<i8, StereoOut, true>(s, job, dest, frames)
        }
        (Source::Bits8(s), Routing::Surround, false) => {
            mix::<i8, SurroundOut, false>(s, job, dest, frames)
        }
        (Source::Bits8(s), Routing::Surround, true) => {
            mix::<i8, SurroundOut, true>(s, job, dest, frames)
        }
        (Source::Bits16(s), Routing::Mono, false) => {
            mix::<i16, MonoOut, false>(s, job, dest, frames)
        }
        (Source::Bits16(s), Routing::Mono, true) => mix::<i16, MonoOut, true>(s, job, dest, frames),
        (Source::Bits16(s), Routing::Stereo, false) => {
            mix::<i16, StereoOut, false>(s, job, dest, frames)
        }
        (Source::Bits16(s), Routing::Stereo, true) => {
            mix::<i16, StereoOut, true>(s, job, dest, frames)
        }
        (Source::Bits16(s), Routing::Surround, false) => {
            mix::<i16, SurroundOut, false>(s, job, dest, frames)
        }
        (Source::Bits16(s), Routing::Surround, true) => {
            mix::<i16, SurroundOut, true>(s, job, dest, frames)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(increment: i64, left: i32, right: i32) -> MixJob {
        MixJob {
            index: 0,
            increment,
            stride: 1,
            channel: 0,
            left,
            right,
            old_left: left,
            old_right: right,
            ramp: 0,
            ramp_window: 64,
        }
    }

    #[test]
    fn mono_accumulates_scaled_samples() {
        let src: [i8; 4] = [1, 2, 3, 4];
        let mut dest = [100i32; 4];
        let mut j = job(1 << FRAC_BITS, 2, 0);
        mix_chunk(Source::Bits8(&src), Routing::Mono, false, &mut j, &mut dest, 4);
        assert_eq!(dest, [100 + 512, 100 + 1024, 100 + 1536, 100 + 2048]);
        assert_eq!(j.index, 4 << FRAC_BITS);
    }

    #[test]
    fn stereo_splits_by_volume() {
        let src: [i16; 2] = [1000, -1000];
        let mut dest = [0i32; 4];
        let mut j = job(1 << FRAC_BITS, 3, 1);
        mix_chunk(Source::Bits16(&src), Routing::Stereo, false, &mut j, &mut dest, 2);
        assert_eq!(dest, [3000, 1000, -3000, -1000]);
    }

    #[test]
    fn surround_inverts_right() {
        let src: [i16; 1] = [100];
        let mut dest = [0i32; 2];
        let mut j = job(1 << FRAC_BITS, 5, 5);
        mix_chunk(Source::Bits16(&src), Routing::Surround, false, &mut j, &mut dest, 1);
        assert_eq!(dest, [500, -500]);
    }

    #[test]
    fn interpolation_blends_neighbours() {
        let src: [i16; 2] = [0, 1000];
        let mut dest = [0i32; 1];
        let mut j = job(1 << FRAC_BITS, 1, 0);
        j.index = 1 << (FRAC_BITS - 1); // halfway
        mix_chunk(Source::Bits16(&src), Routing::Mono, true, &mut j, &mut dest, 1);
        assert_eq!(dest[0], 500);
    }

    #[test]
    fn interpolation_holds_last_sample() {
        let src: [i16; 2] = [0, 1000];
        let mut dest = [0i32; 1];
        let mut j = job(1 << FRAC_BITS, 1, 0);
        j.index = (1 << FRAC_BITS) + 100;
        mix_chunk(Source::Bits16(&src), Routing::Mono, true, &mut j, &mut dest, 1);
        assert_eq!(dest[0], 1000);
    }

    #[test]
    fn stride_and_channel_select_interleaved_side() {
        let src: [i16; 4] = [1, 10, 2, 20];
        let mut dest = [0i32; 2];
        let mut j = job(1 << FRAC_BITS, 1, 0);
        j.stride = 2;
        j.channel = 1;
        mix_chunk(Source::Bits16(&src), Routing::Mono, false, &mut j, &mut dest, 2);
        assert_eq!(dest, [10, 20]);
    }

    #[test]
    fn ramp_blends_old_to_new_monotonically() {
        let src = [1000i16; 80];
        let mut dest = [0i32; 80];
        let mut j = job(1 << FRAC_BITS, 200, 0);
        j.old_left = 100;
        j.ramp = 64;
        mix_chunk(Source::Bits16(&src), Routing::Mono, false, &mut j, &mut dest, 80);
        assert_eq!(dest[0], 100 * 1000);
        for w in dest.windows(2).take(64) {
            assert!(w[1] >= w[0]);
        }
        assert!(dest[63] < 200 * 1000);
        assert_eq!(dest[64], 200 * 1000);
        assert_eq!(dest[79], 200 * 1000);
        assert_eq!(j.ramp, 0);
    }

    #[test]
    fn stops_at_end_of_buffer() {
        let src: [i8; 2] = [1, 1];
        let mut dest = [0i32; 4];
        let mut j = job(1 << FRAC_BITS, 1, 0);
        mix_chunk(Source::Bits8(&src), Routing::Mono, false, &mut j, &mut dest, 4);
        assert_eq!(dest, [256, 256, 0, 0]);
        assert_eq!(j.index, 2 << FRAC_BITS);
    }

    #[test]
    fn reverse_increment_reads_backwards() {
        let src: [i16; 3] = [1, 2, 3];
        let mut dest = [0i32; 3];
        let mut j = job(-(1 << FRAC_BITS), 1, 0);
        j.index = 2 << FRAC_BITS;
        mix_chunk(Source::Bits16(&src), Routing::Mono, false, &mut j, &mut dest, 3);
        assert_eq!(dest, [3, 2, 1]);
    }
}
