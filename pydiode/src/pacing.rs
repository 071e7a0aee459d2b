//! Paces packet emission to a target bitrate by sleeping between sends,
//! in the style of this workspace's `PeriodicTimer` helper
//! (`client/periodic_timer.rs` in the `turn` crate): a single
//! `tokio::time::sleep` against a deadline computed from elapsed work,
//! rather than a fixed per-packet delay that would drift under jitter.

use std::time::Duration;

use tokio::time::Instant;

pub struct Pacer {
    rate_bps: u64,
    start: Instant,
    bytes_sent: u64,
}

impl Pacer {
    pub fn new(rate_bps: u64) -> Self {
        Pacer { rate_bps, start: Instant::now(), bytes_sent: 0 }
    }

    /// Call after sending `packet_bytes` of wire data (header + payload).
    /// Sleeps just long enough to keep the running average at `rate_bps`.
    /// A `rate_bps` of zero disables pacing entirely.
    pub async fn pace(&mut self, packet_bytes: usize) {
        if self.rate_bps == 0 {
            return;
        }
        self.bytes_sent += packet_bytes as u64;
        let target_secs = (self.bytes_sent as f64 * 8.0) / self.rate_bps as f64;
        let target = self.start + Duration::from_secs_f64(target_secs);
        let now = Instant::now();
        if target > now {
            tokio::time::sleep(target - now).await;
        }
    }
}
