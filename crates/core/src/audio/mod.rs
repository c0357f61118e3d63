use std::path::PathBuf;

/// Bundled clips are AAC in an MPEG-4 container.
pub const CLIP_EXTENSION: &str = "m4a";

/// Volume every clip is played back at.
pub const PLAYBACK_VOLUME: f32 = 0.5;

/// Resolves a clip name to the file the platform player should open.
pub fn clip_path(bundle_root: &std::path::Path, clip: &str) -> PathBuf {
    bundle_root.join(format!("{clip}.{CLIP_EXTENSION}"))
}

/// Keeps track of which clip, if any, the presenter is currently playing.
///
/// The presenter only ever tells us when a clip finishes, so this is the
/// sequencer's sole view of whether audio is running.
#[derive(Debug, Default, Clone)]
pub struct AudioTracker {
    playing: Option<String>,
}

impl AudioTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&mut self, clip: impl Into<String>) {
        self.playing = Some(clip.into());
    }

    pub fn finished(&mut self) {
        self.playing = None;
    }

    /// Stops tracking the current clip, returning it so it can be paused.
    pub fn pause(&mut self) -> Option<String> {
        self.playing.take()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.is_some()
    }

    pub fn current(&self) -> Option<&str> {
        self.playing.as_deref()
    }
}
