// crates/oggplay-engine/src/scheduler.rs
//
// Worker thread, goal-PTS control loop, and the task-queue-to-callbacks
// dispatch. The original's hand-rolled task queue (mutex + condvar + singly
// linked list) is realized as a `crossbeam_channel` unbounded channel: a
// blocking `recv()` for the first task followed by non-blocking `try_recv()`
// drains the rest of whatever batch piled up while the worker was busy —
// the same atomic-steal-the-whole-list semantics as the original's `reset`,
// without hand-written pointer surgery.
//
// The two-pass Stop-preemption discipline in `worker_loop` is preserved
// literally (§9): it is the core teardown invariant.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use oggplay_core::config::PlayerConfig;
use oggplay_core::error::EngineError;
use oggplay_core::state::SchedulerState;

use crate::task::Task;

/// The five callbacks the scheduler's worker thread invokes. Implemented by
/// the `Player`; owned exclusively by the worker thread for the lifetime of
/// one `Scheduler::start()` run, so no `Sync` bound is needed — only `Send`
/// to cross into the spawned thread.
pub trait SchedulerCallbacks: Send {
    fn open_file(&mut self, path: &Path);
    fn close_file(&mut self);
    fn play(&mut self);
    fn stop(&mut self);
    fn decode(&mut self, goal_pts: u64);
}

struct SchedulerCounters {
    state:       SchedulerState,
    goal_pts:    u64,
    decoded_pts: u64,
    played_pts:  u64,
}

struct SchedulerShared {
    inner: Mutex<SchedulerCounters>,
}

impl SchedulerShared {
    fn new() -> Self {
        Self {
            inner: Mutex::new(SchedulerCounters {
                state: SchedulerState::NONE,
                goal_pts: 0,
                decoded_pts: 0,
                played_pts: 0,
            }),
        }
    }

    fn set_started(&self) {
        self.inner.lock().state.insert(SchedulerState::STARTED);
    }

    fn set_decoding(&self) {
        self.inner.lock().state.insert(SchedulerState::DECODING);
    }

    fn clear_decoding(&self) {
        self.inner.lock().state.remove(SchedulerState::DECODING);
    }

    fn clear_all(&self) {
        self.inner.lock().state = SchedulerState::NONE;
    }

    fn state(&self) -> SchedulerState {
        self.inner.lock().state
    }

    /// Raise `goal_pts` to at least `floor`, returning the new value.
    fn bump_goal_pts(&self, floor: u64) -> u64 {
        let mut g = self.inner.lock();
        g.goal_pts = g.goal_pts.max(floor);
        g.goal_pts
    }

    /// Raise `goal_pts` to at least `played_pts + lookahead`, returning the new value.
    fn extend_goal_pts(&self, lookahead: u64) -> u64 {
        let mut g = self.inner.lock();
        g.goal_pts = g.goal_pts.max(g.played_pts.saturating_add(lookahead));
        g.goal_pts
    }

    /// If `Decoding` is clear and `decoded_pts < goal`, set `Decoding` and
    /// return true — the sole gate ensuring at most one Decode is in flight.
    fn try_start_decode(&self, goal: u64) -> bool {
        let mut g = self.inner.lock();
        if !g.state.contains(SchedulerState::DECODING) && g.decoded_pts < goal {
            g.state.insert(SchedulerState::DECODING);
            true
        } else {
            false
        }
    }

    fn update_decoded(&self, pts: u64) {
        let mut g = self.inner.lock();
        g.decoded_pts = g.decoded_pts.max(pts);
    }

    fn update_played(&self, pts: u64) {
        let mut g = self.inner.lock();
        g.played_pts = g.played_pts.max(pts);
    }

    fn decoded_pts(&self) -> u64 {
        self.inner.lock().decoded_pts
    }

    fn played_pts(&self) -> u64 {
        self.inner.lock().played_pts
    }

    fn goal_pts(&self) -> u64 {
        self.inner.lock().goal_pts
    }
}

/// A cheaply-cloneable front end to a running (or not-yet-started)
/// scheduler's task queue and counters. Held by the `Player` both for
/// render-thread-driven calls (`update`, `open_file`, ...) and by the
/// decode-sink side to report progress (`update_decode_pts`) and to
/// self-schedule `CloseFile` in response to an EOS event, from the worker
/// thread itself.
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: Sender<Task>,
    shared: Arc<SchedulerShared>,
    config: PlayerConfig,
}

impl SchedulerHandle {
    /// Seed `goal_pts` to the open-prebuffer horizon, enqueue `OpenFile` and
    /// an initial `Decode`, and mark `Decoding`.
    pub fn open_file(&self, path: PathBuf) {
        let goal = self.shared.bump_goal_pts(self.config.open_prebuffer.as_nanos() as u64);
        self.shared.set_decoding();
        let _ = self.sender.send(Task::OpenFile(path));
        let _ = self.sender.send(Task::Decode(goal));
    }

    pub fn schedule_play(&self) {
        let _ = self.sender.send(Task::Play);
    }

    pub fn close_file(&self) {
        let _ = self.sender.send(Task::CloseFile);
    }

    pub fn schedule_stop(&self) {
        let _ = self.sender.send(Task::Stop);
    }

    /// Extend `goal_pts` by the running lookahead and, if no Decode is
    /// already in flight and there is ground left to cover, enqueue one.
    pub fn update(&self) {
        let goal = self.shared.extend_goal_pts(self.config.running_lookahead.as_nanos() as u64);
        if self.shared.try_start_decode(goal) {
            let _ = self.sender.send(Task::Decode(goal));
        }
    }

    pub fn update_decode_pts(&self, pts: u64) {
        self.shared.update_decoded(pts);
    }

    pub fn update_played_pts(&self, pts: u64) {
        self.shared.update_played(pts);
    }

    pub fn decoded_pts(&self) -> u64 {
        self.shared.decoded_pts()
    }

    pub fn played_pts(&self) -> u64 {
        self.shared.played_pts()
    }

    pub fn goal_pts(&self) -> u64 {
        self.shared.goal_pts()
    }
}

/// Owns the worker thread. A `Scheduler` is single-use: once `stop()` joins
/// the worker, the channel's receiver has been consumed and the instance
/// cannot be restarted — `Player` builds a fresh `Scheduler` (and rewires its
/// `SchedulerHandle`) the next time a file is opened after a full teardown.
pub struct Scheduler {
    handle:   SchedulerHandle,
    receiver: Mutex<Option<Receiver<Task>>>,
    worker:   Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(config: PlayerConfig) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            handle: SchedulerHandle { sender, shared: Arc::new(SchedulerShared::new()), config },
            receiver: Mutex::new(Some(receiver)),
            worker: Mutex::new(None),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Spawn the worker thread, taking ownership of `callbacks` for its
    /// lifetime. No-op (with a warning) if called twice on the same
    /// `Scheduler`.
    pub fn start(&self, callbacks: Box<dyn SchedulerCallbacks>) {
        let mut worker_guard = self.worker.lock();
        if worker_guard.is_some() {
            log::warn!("scheduler start() called while already running");
            return;
        }
        let rx = match self.receiver.lock().take() {
            Some(rx) => rx,
            None => {
                log::warn!("scheduler start() called after its task channel was consumed");
                return;
            }
        };
        self.handle.shared.set_started();
        let shared = Arc::clone(&self.handle.shared);
        *worker_guard = Some(thread::spawn(move || worker_loop(rx, shared, callbacks)));
    }

    /// Enqueue a `Stop` task and block until the worker thread has joined.
    pub fn stop(&self) -> Result<(), EngineError> {
        let _ = self.handle.sender.send(Task::Stop);
        match self.worker.lock().take() {
            Some(h) => {
                let _ = h.join();
                Ok(())
            }
            None => Err(EngineError::SchedulerShutdown),
        }
    }

    /// Refuses (returns `Err`) unless the scheduler state is fully idle, to
    /// prevent a teardown race against a still-running worker.
    pub fn clear(&self) -> Result<(), EngineError> {
        if self.handle.shared.state() != SchedulerState::NONE {
            return Err(EngineError::ClearWithLiveState);
        }
        Ok(())
    }
}

fn worker_loop(rx: Receiver<Task>, shared: Arc<SchedulerShared>, mut callbacks: Box<dyn SchedulerCallbacks>) {
    while let Ok(first) = rx.recv() {
        let mut batch = vec![first];
        while let Ok(t) = rx.try_recv() {
            batch.push(t);
        }

        if let Some(stop_idx) = batch.iter().position(|t| matches!(t, Task::Stop)) {
            for t in &batch[..stop_idx] {
                if matches!(t, Task::CloseFile) {
                    callbacks.close_file();
                }
            }
            callbacks.stop();
            shared.clear_all();
            return;
        }

        for t in batch {
            match t {
                Task::OpenFile(path) => callbacks.open_file(&path),
                Task::CloseFile => callbacks.close_file(),
                Task::Play => callbacks.play(),
                Task::Decode(goal) => callbacks.decode(goal),
                Task::Stop => unreachable!("Stop is always handled by the preemption branch above"),
            }
        }
        shared.clear_decoding();
    }
}
