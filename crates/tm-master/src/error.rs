use thiserror::Error;
use tm_engine::ConfigError;

#[derive(Debug, Error)]
pub enum MasterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("source drives {channels} channels but the mixer has {voices} voices")]
    ChannelCount { channels: usize, voices: usize },
    #[error("tick queue has no room for a whole tick")]
    QueueFull,
    #[error("failed to start tick thread: {0}")]
    Spawn(std::io::Error),
}
