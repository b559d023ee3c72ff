// crates/oggplay-core/src/error.rs
//
// The engine's error taxonomy. Protocol/usage errors (calling Play twice,
// Stopping an idle player) are distinguished from I/O and decode failures so
// callers can decide which ones are worth surfacing to a user.

use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    /// `open()` called while a file is already open.
    AlreadyOpen,
    /// `play()`/`pause()` called while not in a state that allows it.
    NotPlaying,
    NotPaused,
    /// The scheduler worker has already been joined; no further calls are valid.
    SchedulerShutdown,
    /// `clear()` called while the player/scheduler state is non-idle.
    ClearWithLiveState,
    /// Failure opening/reading the backing source.
    Io(std::io::Error),
    /// Decoder-reported failure; carries the decoder's message.
    Decode(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::AlreadyOpen => write!(f, "a file is already open"),
            EngineError::NotPlaying => write!(f, "player is not playing"),
            EngineError::NotPaused => write!(f, "player is not paused"),
            EngineError::SchedulerShutdown => write!(f, "scheduler has already shut down"),
            EngineError::ClearWithLiveState => {
                write!(f, "clear() called while player/scheduler state is non-idle")
            }
            EngineError::Io(e) => write!(f, "i/o error: {e}"),
            EngineError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e)
    }
}
