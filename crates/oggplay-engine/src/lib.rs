// crates/oggplay-engine/src/lib.rs
//
// Threaded decode-scheduling and playback-synchronization engine built on
// top of the plain data types in `oggplay-core`. See `player::Player` for
// the public entry point.

mod decoder;
mod packet_queue;
mod player;
mod scheduler;
mod task;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use decoder::{DecodeSink, DecodeStatus, Decoder, YuvPlaneData};
pub use packet_queue::{PlaneBuf, RenderFrame};
pub use player::Player;
pub use scheduler::{Scheduler, SchedulerCallbacks, SchedulerHandle};
