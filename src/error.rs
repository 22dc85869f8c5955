// Error types for the metronome engine

/// Errors surfaced to callers of the engine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetronomeError {
    /// The audio output could not be created (no device, unsupported format...)
    #[error("Audio output unavailable: {0}")]
    AudioUnavailable(String),

    /// The output exists but could not leave its suspended state
    #[error("Failed to resume audio output: {0}")]
    ResumeFailed(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// The engine thread is no longer running
    #[error("Metronome engine has stopped")]
    EngineStopped,

    #[error("Failed to spawn engine thread: {0}")]
    Spawn(String),
}

impl MetronomeError {
    /// Playback errors are all recoverable by calling `start` again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MetronomeError::AudioUnavailable(_) | MetronomeError::ResumeFailed(_)
        )
    }
}
