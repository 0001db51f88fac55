//! Sample data, the sample bank, and borrowed sample references.

use alloc::vec::Vec;
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Key for referencing sample data in a [`SampleBank`].
    pub struct SampleKey;
}

/// Bit depth of stored sample data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BitDepth {
    #[default]
    Bits8,
    Bits16,
}

/// Channel layout of stored sample data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SampleLayout {
    #[default]
    Mono,
    /// Interleaved left/right pairs.
    Stereo,
}

impl SampleLayout {
    /// Number of interleaved values per sample frame.
    pub const fn stride(self) -> usize {
        match self {
            SampleLayout::Mono => 1,
            SampleLayout::Stereo => 2,
        }
    }
}

/// Encoding of a sample buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SampleFormat {
    pub bits: BitDepth,
    pub layout: SampleLayout,
}

/// Sample audio data.
///
/// Stereo variants hold interleaved `left, right` pairs.
#[derive(Clone, Debug)]
pub enum SampleData {
    /// 8-bit mono samples
    Mono8(Vec<i8>),
    /// 16-bit mono samples
    Mono16(Vec<i16>),
    /// 8-bit interleaved stereo samples
    Stereo8(Vec<i8>),
    /// 16-bit interleaved stereo samples
    Stereo16(Vec<i16>),
}

impl SampleData {
    /// Get the number of sample frames.
    pub fn frames(&self) -> usize {
        match self {
            SampleData::Mono8(v) => v.len(),
            SampleData::Mono16(v) => v.len(),
            SampleData::Stereo8(v) => v.len() / 2,
            SampleData::Stereo16(v) => v.len() / 2,
        }
    }

    /// Returns true if there is no complete frame of data.
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Encoding of this buffer.
    pub fn format(&self) -> SampleFormat {
        match self {
            SampleData::Mono8(_) => {
                SampleFormat { bits: BitDepth::Bits8, layout: SampleLayout::Mono }
            }
            SampleData::Mono16(_) => {
                SampleFormat { bits: BitDepth::Bits16, layout: SampleLayout::Mono }
            }
            SampleData::Stereo8(_) => {
                SampleFormat { bits: BitDepth::Bits8, layout: SampleLayout::Stereo }
            }
            SampleData::Stereo16(_) => {
                SampleFormat { bits: BitDepth::Bits16, layout: SampleLayout::Stereo }
            }
        }
    }
}

/// Producer-owned store of sample buffers.
///
/// The mixer never copies or frees sample data: voices hold [`SampleKey`]s
/// and the renderer borrows the bank for the duration of a render call.
#[derive(Clone, Debug, Default)]
pub struct SampleBank {
    samples: SlotMap<SampleKey, SampleData>,
}

impl SampleBank {
    /// Create an empty bank.
    pub fn new() -> Self {
        Self { samples: SlotMap::with_key() }
    }

    /// Store a buffer and return its key.
    pub fn insert(&mut self, data: SampleData) -> SampleKey {
        self.samples.insert(data)
    }

    /// Remove a buffer. Callers must stop any voice still using it first.
    pub fn remove(&mut self, key: SampleKey) -> Option<SampleData> {
        self.samples.remove(key)
    }

    pub fn get(&self, key: SampleKey) -> Option<&SampleData> {
        self.samples.get(key)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Build a reference to `length` frames starting at `start`.
    ///
    /// Returns `None` if the key is unknown, the region is empty, or the
    /// region runs past the end of the buffer.
    pub fn reference(&self, key: SampleKey, start: u32, length: u32) -> Option<SampleRef> {
        let data = self.samples.get(key)?;
        let end = start as u64 + length as u64;
        if length == 0 || end > data.frames() as u64 {
            return None;
        }
        Some(SampleRef { key, start, length, format: data.format() })
    }

    /// Reference to the whole buffer.
    pub fn whole(&self, key: SampleKey) -> Option<SampleRef> {
        let frames = self.samples.get(key)?.frames() as u32;
        self.reference(key, 0, frames)
    }
}

/// Immutable view of a playable region of a bank buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleRef {
    /// Buffer the region lives in.
    pub key: SampleKey,
    /// First frame of the region.
    pub start: u32,
    /// Number of frames in the region.
    pub length: u32,
    /// Encoding the buffer had when the reference was made.
    pub format: SampleFormat,
}

impl SampleRef {
    /// One past the last frame of the region.
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.length)
    }
}

/// Loop topology.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopKind {
    /// No loop
    #[default]
    None,
    /// Jump back to the loop start at the loop end
    Forward,
    /// Ping-pong between loop start and loop end
    Bidirectional,
}

/// Loop region within the sample's buffer, in frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopRegion {
    pub start: u32,
    pub length: u32,
    pub kind: LoopKind,
}

impl LoopRegion {
    /// Shortest loop that is honoured; anything shorter plays unlooped.
    pub const MIN_LENGTH: u32 = 3;

    pub fn new(start: u32, length: u32, kind: LoopKind) -> Self {
        Self { start, length, kind }
    }

    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.length)
    }

    /// Returns true if this region actually loops.
    pub fn is_looping(&self) -> bool {
        self.kind != LoopKind::None && self.length >= Self::MIN_LENGTH
    }
}
