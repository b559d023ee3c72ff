// crates/oggplay-engine/src/task.rs
//
// Work items handed from the render thread (or from event handling on the
// worker thread itself, e.g. scheduling `CloseFile` in response to an EOS
// event) to the scheduler's worker. The original's hand-rolled singly-linked
// FIFO + mutex + condvar is realized here as the payload type carried over a
// `crossbeam_channel` — see `scheduler::worker_loop` for the batch-steal and
// Stop-preemption logic that consumes these.

use std::path::PathBuf;

#[derive(Debug)]
pub enum Task {
    Decode(u64),
    Play,
    OpenFile(PathBuf),
    CloseFile,
    Stop,
}
