// crates/oggplay-core/src/event.rs
//
// Lifecycle events crossing the two callback boundaries: decoder → player,
// and player → host. Kept as plain enums rather than bare integers.

/// Emitted by a `Decoder` while servicing a decode task, consumed by the
/// engine's `DecodeSink` implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecoderEvent {
    /// Every known stream has reached end-of-stream.
    Ready,
    /// The audio stream's format is now known. Always precedes `Ready`, and
    /// precedes the first `PlayerEvent::Play` the host observes.
    AudioInfo { samplerate: u32, nchannels: u16 },
}

/// Emitted by the player, consumed by the host application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Decoder reached end-of-stream; a `CloseFile` teardown has been scheduled.
    DecodeReady,
    /// Audio format became known (samplerate, channel count).
    AudioInfo { samplerate: u32, nchannels: u16 },
    /// Pre-buffer complete; the host may start pulling audio / presenting frames.
    Play,
    /// Teardown complete; the host must tear down any audio stream it opened
    /// in response to `Play`.
    Reset,
}
