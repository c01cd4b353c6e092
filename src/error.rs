//! Error types.
//!
//! Nothing here ever reaches the caller of a `play_*` function: sound is an
//! enhancement layer, so the engine logs these and carries on. They are
//! returned from the lower-level APIs ([`AudioEndpoint`](crate::AudioEndpoint),
//! [`SoundEngine::try_play`](crate::SoundEngine::try_play)) for callers who
//! want to know.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// The platform could not provide an output device or stream at all.
    EndpointUnavailable(String),
    /// The unlock/resume request was refused or failed.
    ResumeFailed(String),
    /// No recipe is registered under this name.
    UnknownSound(String),
    /// The operation needs an offline endpoint (one rendering into a capture buffer).
    NotOffline,
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::EndpointUnavailable(why) => write!(f, "audio endpoint unavailable: {why}"),
            AudioError::ResumeFailed(why) => write!(f, "failed to resume audio endpoint: {why}"),
            AudioError::UnknownSound(name) => write!(f, "unknown sound '{name}'"),
            AudioError::NotOffline => write!(f, "endpoint is attached to a device, not an offline capture"),
        }
    }
}

impl std::error::Error for AudioError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_cause() {
        let err = AudioError::EndpointUnavailable("no default output device".into());
        assert_eq!(err.to_string(), "audio endpoint unavailable: no default output device");
        assert_eq!(AudioError::UnknownSound("boom".into()).to_string(), "unknown sound 'boom'");
    }
}
