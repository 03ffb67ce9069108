//! Round-trip latency measurement with echoed timestamps.
//!
//! Timestamps are fractional milliseconds on the sender's own monotonic
//! clock. The peer echoes them unchanged, so only differences matter.

use crate::message::Message;
use std::time::{Duration, Instant};

/// Monotonic millisecond clock anchored at creation.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks the single in-flight ping and the last measured round trip.
#[derive(Debug, Clone)]
pub struct LatencyTracker {
    cooldown_ms: f64,
    last_sent: Option<f64>,
    outstanding: Option<f64>,
    latency_ms: Option<f64>,
}

impl LatencyTracker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown_ms: cooldown.as_secs_f64() * 1000.0,
            last_sent: None,
            outstanding: None,
            latency_ms: None,
        }
    }

    /// Returns a `Ping` to send once the cooldown since the previous ping has
    /// passed. A ping that never got its pong is replaced by the new one.
    pub fn poll(&mut self, now_ms: f64) -> Option<Message> {
        if let Some(last) = self.last_sent {
            if now_ms - last < self.cooldown_ms {
                return None;
            }
        }
        self.last_sent = Some(now_ms);
        self.outstanding = Some(now_ms);
        Some(Message::Ping { timestamp: now_ms })
    }

    /// Records a pong. Only the echo of the outstanding ping counts; the echo
    /// is bit-identical, so exact comparison is sound.
    pub fn on_pong(&mut self, echoed: f64, now_ms: f64) -> Option<f64> {
        if self.outstanding != Some(echoed) {
            return None;
        }
        self.outstanding = None;
        let rtt = (now_ms - echoed).max(0.0);
        self.latency_ms = Some(rtt);
        Some(rtt)
    }

    pub fn latency_ms(&self) -> Option<f64> {
        self.latency_ms
    }

    pub fn outstanding(&self) -> Option<f64> {
        self.outstanding
    }
}
