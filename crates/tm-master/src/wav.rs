//! WAV encoding for interleaved 16-bit PCM.

use std::io::Write;

/// Write `samples` (interleaved, `channels` per frame) as a PCM WAV file.
pub fn write_wav(
    w: &mut impl Write,
    samples: &[i16],
    channels: u16,
    sample_rate: u32,
) -> std::io::Result<()> {
    let bits_per_sample: u16 = 16;
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;

    write_riff_header(w, data_size)?;
    write_fmt_chunk(w, channels, sample_rate, block_align, bits_per_sample)?;
    write_data_chunk(w, samples, data_size)
}

pub fn samples_to_wav(samples: &[i16], channels: u16, sample_rate: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(44 + samples.len() * 2);
    write_wav(&mut buf, samples, channels, sample_rate).expect("Vec<u8> write cannot fail");
    buf
}

fn write_riff_header(w: &mut impl Write, data_size: u32) -> std::io::Result<()> {
    w.write_all(b"RIFF")?;
    w.write_all(&(36 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")
}

fn write_fmt_chunk(
    w: &mut impl Write,
    channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
) -> std::io::Result<()> {
    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&1u16.to_le_bytes())?;
    w.write_all(&channels.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    w.write_all(&(sample_rate * block_align as u32).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&bits_per_sample.to_le_bytes())
}

fn write_data_chunk(w: &mut impl Write, samples: &[i16], data_size: u32) -> std::io::Result<()> {
    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    for s in samples {
        w.write_all(&s.to_le_bytes())?;
    }
    Ok(())
}
