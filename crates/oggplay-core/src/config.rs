// crates/oggplay-core/src/config.rs
//
// Tunables the original hard-codes as constants. Exposed here so a host can
// override pre-buffer horizons or ringbuffer sizing without forking the engine.

use std::time::Duration;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Decode horizon seeded on `open()`, before playback has produced any
    /// played_pts to extend from.
    pub open_prebuffer: Duration,
    /// Running lookahead added to `played_pts` on every `Update()`.
    pub running_lookahead: Duration,
    /// Ringbuffer capacity allocated once an audio stream is known.
    pub audio_ringbuffer_capacity: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            open_prebuffer: Duration::from_secs(3),
            running_lookahead: Duration::from_secs(5),
            audio_ringbuffer_capacity: 5 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_horizons() {
        let cfg = PlayerConfig::default();
        assert_eq!(cfg.open_prebuffer, Duration::from_secs(3));
        assert_eq!(cfg.running_lookahead, Duration::from_secs(5));
        assert_eq!(cfg.audio_ringbuffer_capacity, 5 * 1024 * 1024);
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = PlayerConfig {
            open_prebuffer: Duration::from_millis(1500),
            running_lookahead: Duration::from_secs(2),
            audio_ringbuffer_capacity: 1024,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: PlayerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
