use std::time::Duration;

/// Seconds elapsed on the host's animation loop.
#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    pub time_seconds: f32,
}

impl PlaybackClock {
    pub fn advance(&mut self, delta: f32) {
        self.time_seconds = (self.time_seconds + delta).max(0.0);
    }
}

/// One-shot fallback timer armed when the screen activates. If the audio
/// callback was missed, its firing stands in for it.
#[derive(Debug, Clone)]
pub struct IdleTimer {
    timeout_seconds: f32,
    deadline: Option<f32>,
}

impl IdleTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout_seconds: timeout.as_secs_f32(),
            deadline: None,
        }
    }

    pub fn arm(&mut self, clock: &PlaybackClock) {
        self.deadline = Some(clock.time_seconds + self.timeout_seconds);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true exactly once, on the first poll at or after the deadline.
    pub fn poll(&mut self, clock: &PlaybackClock) -> bool {
        match self.deadline {
            Some(deadline) if clock.time_seconds >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
