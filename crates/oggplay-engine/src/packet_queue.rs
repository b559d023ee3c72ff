// crates/oggplay-engine/src/packet_queue.rs
//
// Thread-safe wrapper around `oggplay_core::packet::PacketPool` implementing
// the §4.2 selection policy used by `Player::update`. Producers (the decoder,
// on the worker thread) append under the lock; the scan also runs under the
// lock but the selected frame's bytes are cloned out before the lock is
// released, so the render callback itself never runs while the lock is held.

use parking_lot::Mutex;

use oggplay_core::packet::{PacketPool, VideoPlane};

use crate::decoder::YuvPlaneData;

/// An owned snapshot of a selected video frame, safe to hand to a render
/// callback outside the packet queue's lock.
#[derive(Clone, Debug)]
pub struct RenderFrame {
    pub pts:    u64,
    pub y:      PlaneBuf,
    pub u:      PlaneBuf,
    pub v:      PlaneBuf,
}

#[derive(Clone, Debug)]
pub struct PlaneBuf {
    pub width:  u32,
    pub height: u32,
    pub stride: u32,
    pub data:   Vec<u8>,
}

impl From<(&VideoPlane, &[u8])> for PlaneBuf {
    fn from((plane, data): (&VideoPlane, &[u8])) -> Self {
        Self { width: plane.width, height: plane.height, stride: plane.stride, data: data.to_vec() }
    }
}

#[derive(Debug, Default)]
pub struct PacketQueue {
    pool: Mutex<PacketPool>,
}

impl PacketQueue {
    pub fn new() -> Self {
        Self { pool: Mutex::new(PacketPool::new()) }
    }

    pub fn push_yuv(&self, pts: u64, y: YuvPlaneData<'_>, u: YuvPlaneData<'_>, v: YuvPlaneData<'_>) {
        let mut pool = self.pool.lock();
        pool.push_yuv(pts, y.as_tuple(), u.as_tuple(), v.as_tuple());
    }

    /// Apply the §4.2 selection policy and return the due frame, if any.
    /// Packets with `pts <= last_used_pts` are freed for reuse along the way.
    pub fn select_due_frame(&self, now: u64, last_used_pts: u64, decode_ready: bool) -> Option<RenderFrame> {
        let mut pool = self.pool.lock();
        let handles: Vec<_> = pool.iter_in_order().collect();

        for (i, &handle) in handles.iter().enumerate() {
            let pts = pool.get(handle).pts;

            if pts <= last_used_pts {
                pool.free(handle);
                continue;
            }

            if pts > now {
                // Not yet due, and every packet after this one has a later
                // pts still, so nothing further down the queue can be due.
                return None;
            }

            let next_pts = handles.get(i + 1).map(|&h| pool.get(h).pts);
            match next_pts {
                Some(next) if now < next => {
                    let packet = pool.get(handle);
                    return Some(RenderFrame {
                        pts,
                        y: (&packet.planes[0], packet.y()).into(),
                        u: (&packet.planes[1], packet.u()).into(),
                        v: (&packet.planes[2], packet.v()).into(),
                    });
                }
                Some(_) => {
                    // now has already moved past this packet's whole window
                    // (the render side fell behind by more than one frame
                    // interval) — free it and keep scanning forward instead
                    // of wedging here, matching `tail = tail->next`.
                    pool.free(handle);
                    continue;
                }
                None => {
                    if !decode_ready {
                        return None;
                    }
                    let packet = pool.get(handle);
                    return Some(RenderFrame {
                        pts,
                        y: (&packet.planes[0], packet.y()).into(),
                        u: (&packet.planes[1], packet.u()).into(),
                        v: (&packet.planes[2], packet.v()).into(),
                    });
                }
            }
        }

        None
    }

    pub fn len(&self) -> usize {
        self.pool.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(q: &PacketQueue, pts: u64) {
        let y = vec![1u8; 4];
        let u = vec![2u8; 1];
        let v = vec![3u8; 1];
        q.push_yuv(
            pts,
            YuvPlaneData { data: &y, width: 2, height: 2, stride: 2 },
            YuvPlaneData { data: &u, width: 1, height: 1, stride: 1 },
            YuvPlaneData { data: &v, width: 1, height: 1, stride: 1 },
        );
    }

    #[test]
    fn selects_the_bracketing_frame_and_no_later() {
        let q = PacketQueue::new();
        push(&q, 0);
        push(&q, 100);
        push(&q, 200);

        let frame = q.select_due_frame(150, 0, false).unwrap();
        assert_eq!(frame.pts, 100);
    }

    #[test]
    fn never_selects_a_pts_beyond_now() {
        let q = PacketQueue::new();
        push(&q, 100);
        push(&q, 1_000);
        // 100 <= 500 < 1000 brackets pts=100; pts=1000 is never selected here.
        let frame = q.select_due_frame(500, 0, false).unwrap();
        assert!(frame.pts <= 500);
    }

    #[test]
    fn drains_remaining_frames_after_decode_ready() {
        let q = PacketQueue::new();
        push(&q, 500);
        // No next packet, so only the decode_ready drain path can select it.
        assert!(q.select_due_frame(600, 0, false).is_none());
        let frame = q.select_due_frame(600, 0, true).unwrap();
        assert_eq!(frame.pts, 500);
    }

    #[test]
    fn selection_is_monotone_and_frees_superseded_frames() {
        let q = PacketQueue::new();
        push(&q, 100);
        push(&q, 200);
        push(&q, 300);

        let f1 = q.select_due_frame(150, 0, false).unwrap();
        assert_eq!(f1.pts, 100);
        let f2 = q.select_due_frame(250, f1.pts, false).unwrap();
        assert_eq!(f2.pts, 200);
        assert!(f2.pts >= f1.pts);
        assert_eq!(q.len(), 2); // pts=100 freed, pts=200 and pts=300 remain
    }

    #[test]
    fn scan_skips_past_frames_the_render_thread_fell_behind_on() {
        // `now` has jumped two frame intervals ahead of the oldest live
        // packets. The old implementation returned None forever here because
        // it only checked "does this packet bracket now", never "did we
        // already blow past this packet's whole window" — a hitch bigger
        // than one frame interval would wedge playback permanently.
        let q = PacketQueue::new();
        push(&q, 100);
        push(&q, 200);
        push(&q, 300);
        push(&q, 400);

        let frame = q.select_due_frame(350, 0, false).unwrap();
        assert_eq!(frame.pts, 300);
        // pts=100 and pts=200 were both stale and freed while scanning past.
        assert_eq!(q.len(), 2);
    }
}
