// crates/oggplay-engine/src/testing.rs
//
// A scripted `Decoder` double used by the scenario tests in `player.rs` (and
// available to any downstream crate under the `testing` feature) to drive
// the engine end-to-end without linking a real Theora/Vorbis demuxer.
//
// `FakeDecoder` is handed a fixed script at construction time. Each call to
// `decode(goal_pts, sink)` walks the script forward from where the previous
// call left off, feeding items to the sink until either the script is
// exhausted (Eos) or a video frame with `pts >= goal_pts` has been emitted
// (Continue) — mirroring a real decoder's "decode until caught up" contract.

use std::path::{Path, PathBuf};

use oggplay_core::error::EngineError;
use oggplay_core::event::DecoderEvent;

use crate::decoder::{DecodeSink, DecodeStatus, Decoder, YuvPlaneData};

/// One scripted unit of decoder output.
#[derive(Clone, Debug)]
pub enum ScriptItem {
    AudioInfo { samplerate: u32, nchannels: u16 },
    /// A single-pixel, solid-color YUV420P frame at `pts` (nanoseconds).
    VideoFrame { pts: u64 },
    /// `nframes` samples per channel, all silence, timestamped by the
    /// player's clock rather than carrying their own pts.
    AudioFrames { nframes: usize, nchannels: u16 },
}

/// A `Decoder` that replays a fixed `Vec<ScriptItem>`, ending with an
/// implicit `Ready` event once the script is exhausted.
pub struct FakeDecoder {
    script:     Vec<ScriptItem>,
    cursor:     usize,
    opened:     Option<PathBuf>,
    sent_ready: bool,
}

impl FakeDecoder {
    pub fn new(script: Vec<ScriptItem>) -> Self {
        Self { script, cursor: 0, opened: None, sent_ready: false }
    }

    fn frame(pts: u64) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        (vec![pts as u8; 4], vec![0u8; 1], vec![0u8; 1])
    }
}

impl Decoder for FakeDecoder {
    fn open(&mut self, path: &Path) -> Result<(), EngineError> {
        self.opened = Some(path.to_path_buf());
        self.cursor = 0;
        self.sent_ready = false;
        Ok(())
    }

    fn close(&mut self) -> Result<(), EngineError> {
        self.opened = None;
        Ok(())
    }

    fn decode(&mut self, goal_pts: u64, sink: &dyn DecodeSink) -> Result<DecodeStatus, EngineError> {
        while self.cursor < self.script.len() {
            let item = self.script[self.cursor].clone();
            self.cursor += 1;

            match item {
                ScriptItem::AudioInfo { samplerate, nchannels } => {
                    sink.event(DecoderEvent::AudioInfo { samplerate, nchannels });
                }
                ScriptItem::AudioFrames { nframes, nchannels } => {
                    let silence = vec![0.0f32; nframes];
                    let channels: Vec<&[f32]> = (0..nchannels).map(|_| silence.as_slice()).collect();
                    sink.audio_frames(&channels, nframes);
                }
                ScriptItem::VideoFrame { pts } => {
                    let (y, u, v) = Self::frame(pts);
                    sink.video_frame(
                        pts,
                        YuvPlaneData { data: &y, width: 2, height: 2, stride: 2 },
                        YuvPlaneData { data: &u, width: 1, height: 1, stride: 1 },
                        YuvPlaneData { data: &v, width: 1, height: 1, stride: 1 },
                    );
                    if pts >= goal_pts {
                        return Ok(DecodeStatus::Continue);
                    }
                }
            }
        }

        if !self.sent_ready {
            self.sent_ready = true;
            sink.event(DecoderEvent::Ready);
        }
        Ok(DecodeStatus::Eos)
    }
}
