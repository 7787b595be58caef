/// Monotonic playback counter. Advanced by scaled frame deltas so it can run
/// faster or slower than the host clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackClock {
    elapsed: f32,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-positive or non-finite deltas leave the counter untouched.
    pub fn advance(&mut self, delta_seconds: f32) {
        if delta_seconds.is_finite() && delta_seconds > 0.0 {
            self.elapsed += delta_seconds;
        }
    }

    pub fn seconds(&self) -> f32 {
        self.elapsed
    }
}

/// Wall-clock debounce keyed on host timestamps (milliseconds), independent of frame count.
#[derive(Debug, Clone, Copy)]
pub struct TimeGate {
    interval_ms: f64,
    last: Option<f64>,
}

impl TimeGate {
    pub fn new(interval_ms: f64) -> Self {
        Self { interval_ms: interval_ms.max(0.0), last: None }
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    /// Returns true and re-arms when at least `interval_ms` passed since the last pass.
    /// The first call always passes; a timestamp earlier than the last pass is treated
    /// as a clock reset.
    pub fn ready(&mut self, now_ms: f64) -> bool {
        let pass = match self.last {
            None => true,
            Some(last) if now_ms < last => true,
            Some(last) => now_ms - last >= self.interval_ms,
        };
        if pass {
            self.last = Some(now_ms);
        }
        pass
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_ignores_paused_and_rewound_frames() {
        let mut clock = PlaybackClock::new();
        clock.advance(0.5);
        clock.advance(0.0);
        clock.advance(-1.0);
        clock.advance(f32::NAN);
        assert!((clock.seconds() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn gate_passes_first_then_waits_for_interval() {
        let mut gate = TimeGate::new(100.0);
        assert!(gate.ready(0.0));
        assert!(!gate.ready(50.0));
        assert!(!gate.ready(99.9));
        assert!(gate.ready(100.0));
        assert!(!gate.ready(150.0));
        assert!(gate.ready(230.0));
    }

    #[test]
    fn gate_rearms_after_clock_reset() {
        let mut gate = TimeGate::new(1000.0);
        assert!(gate.ready(5000.0));
        assert!(gate.ready(10.0), "an earlier timestamp restarts the gate");
        assert!(!gate.ready(500.0));
    }
}
