// crates/oggplay-engine/src/decoder.rs
//
// The trait boundary the engine drives, standing in for the original's
// Theora/Vorbis function-pointer callbacks (`rxp_decoder`). A real container
// and codec implementation lives outside this crate; `testing::FakeDecoder`
// (feature `testing`, or available under `#[cfg(test)]`) is the only
// implementation shipped here, used to drive the end-to-end scenario tests
// without linking a real demuxer.

use std::path::Path;

use oggplay_core::error::EngineError;
use oggplay_core::event::DecoderEvent;

/// One image plane handed to `DecodeSink::video_frame` by the decoder.
#[derive(Clone, Copy, Debug)]
pub struct YuvPlaneData<'a> {
    pub data:   &'a [u8],
    pub width:  u32,
    pub height: u32,
    pub stride: u32,
}

impl<'a> YuvPlaneData<'a> {
    pub(crate) fn as_tuple(&self) -> (&'a [u8], u32, u32, u32) {
        (self.data, self.width, self.height, self.stride)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeStatus {
    Continue,
    Eos,
}

/// Receives decoded output and lifecycle events from a `Decoder` while it
/// services a single `decode(goal_pts)` call. The engine's `Player`
/// implements this; a decoder must never retain a reference past the call
/// that handed it one.
pub trait DecodeSink {
    fn video_frame(&self, pts: u64, y: YuvPlaneData<'_>, u: YuvPlaneData<'_>, v: YuvPlaneData<'_>);

    /// `pcm` holds one slice per channel (non-interleaved), each `nframes`
    /// samples long. The sink is responsible for interleaving.
    fn audio_frames(&self, pcm: &[&[f32]], nframes: usize);

    fn event(&self, event: DecoderEvent);
}

/// Demux + decode capability the scheduler's worker thread drives. Out of
/// scope per the spec: a real implementation backs onto Theora/Vorbis (or
/// any other codec) and is supplied by the host crate.
pub trait Decoder: Send {
    fn open(&mut self, path: &Path) -> Result<(), EngineError>;
    fn close(&mut self) -> Result<(), EngineError>;

    /// Blocking: pull packets from the container until every known,
    /// non-ended stream has reported decoded output past `goal_pts` (via the
    /// sink, which forwards progress to the scheduler), or until EOS/error.
    fn decode(&mut self, goal_pts: u64, sink: &dyn DecodeSink) -> Result<DecodeStatus, EngineError>;
}
