//! Output conversion: summing buffer to interleaved 16-bit PCM.

/// Down-shift from accumulator scale (16-bit sample times 8-bit volume)
/// to 16-bit output.
pub const MIX_SHIFT: u32 = 8;

/// Convert `accum` (interleaved, `mixed_channels` per frame) into `out`.
///
/// Each value is shifted down by [`MIX_SHIFT`] and saturated. With `swap`
/// a stereo frame is written right first. `padding` silent channels follow
/// every frame.
pub fn convert(accum: &[i32], out: &mut [i16], mixed_channels: usize, swap: bool, padding: usize) {
    let width = mixed_channels + padding;
    assert_eq!(
        accum.len() / mixed_channels,
        out.len() / width,
        "accumulator and output hold different frame counts"
    );

    for (src, dst) in accum.chunks_exact(mixed_channels).zip(out.chunks_exact_mut(width)) {
        let (mixed, pad) = dst.split_at_mut(mixed_channels);
        match (src, swap) {
            ([l, r], true) => {
                mixed[0] = clip(*r);
                mixed[1] = clip(*l);
            }
            _ => {
                for (d, s) in mixed.iter_mut().zip(src) {
                    *d = clip(*s);
                }
            }
        }
        pad.fill(0);
    }
}

#[inline]
fn clip(v: i32) -> i16 {
    (v >> MIX_SHIFT).clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
