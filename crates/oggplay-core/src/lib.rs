// crates/oggplay-core/src/lib.rs
//
// Plain data types shared by the playback engine and its host: packets,
// the audio ringbuffer, the clock, player/scheduler state bits, events and
// errors. No threading, no codec, no I/O — see oggplay-engine for that.

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod packet;
pub mod ringbuffer;
pub mod state;

pub use clock::{Clock, ClockKind};
pub use config::PlayerConfig;
pub use error::EngineError;
pub use event::{DecoderEvent, PlayerEvent};
pub use packet::{Packet, PacketKind, PacketPool, VideoPlane};
pub use ringbuffer::Ringbuffer;
pub use state::{PlayerState, SchedulerState};
