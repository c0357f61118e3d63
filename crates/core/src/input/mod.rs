use std::f64::consts::PI;

/// Rotation events needed before the character flips over.
const EVENTS_PER_FLIP: u32 = 30;

/// Turns digital crown rotation into an occasional half-turn of the
/// character sprite. Purely cosmetic; lesson state never sees it.
#[derive(Debug, Default, Clone)]
pub struct CrownTracker {
    events: u32,
    rotation: f64,
}

impl CrownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one rotation event. The delta's magnitude is ignored; only the
    /// event count matters. Returns the new sprite rotation on a flip.
    pub fn rotated(&mut self, _delta: f64) -> Option<f64> {
        self.events += 1;
        if self.events < EVENTS_PER_FLIP {
            return None;
        }

        self.events = 0;
        self.rotation += PI;
        Some(self.rotation)
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }
}
