//! Mixing engine for tickmix.
//!
//! Resolves per-tick channel commands into voice state and mixes all voices
//! into interleaved 16-bit PCM.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod config;
mod convert;
mod mixer;
mod resolver;
mod routines;
mod voice;

pub use config::{ConfigError, DeclickTuning, MixerConfig, OutputLayout, RenderSettings};
pub use convert::{convert, MIX_SHIFT};
pub use mixer::{ChangeList, Mixer};
pub use voice::{Voice, FRAC_BITS, FRAC_MASK};
