// crates/oggplay-core/src/state.rs
//
// Player and scheduler state bitsets. The original C sources carry two
// incompatible flavors of these constants — a sequential `0x0001, 0x0002,
// 0x0003 ...` enumeration and a shifted `1 << 0, 1 << 1, 1 << 2 ...` one.
// Only the shifted form supports simultaneous flags (e.g. Playing set at the
// same time as DecodeReady), which the player genuinely needs, so that's the
// one modeled here via `bitflags`.

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PlayerState: u8 {
        const NONE          = 0;
        const PLAYING       = 1 << 0;
        const PAUSED        = 1 << 1;
        const DECODE_READY  = 1 << 2;
        const SHUTTING_DOWN = 1 << 3;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SchedulerState: u8 {
        const NONE     = 0;
        const STARTED  = 1 << 0;
        const DECODING = 1 << 1;
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        PlayerState::NONE
    }
}

impl Default for SchedulerState {
    fn default() -> Self {
        SchedulerState::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playing_and_decode_ready_coexist() {
        let mut s = PlayerState::NONE;
        s.insert(PlayerState::PLAYING);
        s.insert(PlayerState::DECODE_READY);
        assert!(s.contains(PlayerState::PLAYING));
        assert!(s.contains(PlayerState::DECODE_READY));
        s.remove(PlayerState::PLAYING);
        assert!(!s.contains(PlayerState::PLAYING));
        assert!(s.contains(PlayerState::DECODE_READY));
    }
}
