use crate::{scene::BackgroundStyle, KaliError, Result};

/// Presentation backend abstraction. Implemented by the platform layer that
/// owns sprite rendering, audio playback and atlas loading.
///
/// Completion is never reported through this trait: the host delivers
/// `AudioFinished` and `AtlasLoaded` events to the session instead.
pub trait Presenter {
    /// Whether a scene is attached to draw into.
    fn has_scene(&self) -> bool;

    fn render_animation(
        &mut self,
        frames: &[String],
        fps: u32,
        repeats: bool,
        background: BackgroundStyle,
    ) -> Result<()>;

    /// Starts a clip at `volume` (0.0 to 1.0). An error means it never started.
    fn play_audio(&mut self, clip: &str, volume: f32) -> Result<()>;

    fn pause_audio(&mut self, clip: &str);

    fn preload_assets(&mut self, atlas: &str) -> Result<()>;

    fn rotate_sprite(&mut self, radians: f64);
}

/// One call received by a [`RecordingPresenter`].
#[derive(Debug, Clone, PartialEq)]
pub enum PresenterCall {
    Render {
        first_frame: Option<String>,
        frame_count: usize,
        fps: u32,
        repeats: bool,
        background: BackgroundStyle,
    },
    Play { clip: String, volume: f32 },
    Pause(String),
    Preload(String),
    Rotate(f64),
}

/// In-memory presenter that records every call. Used by the command line
/// simulator and by tests.
#[derive(Debug)]
pub struct RecordingPresenter {
    scene_attached: bool,
    calls: Vec<PresenterCall>,
    failing_clips: Vec<String>,
    fail_next_render: bool,
}

impl Default for RecordingPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self {
            scene_attached: true,
            calls: Vec::new(),
            failing_clips: Vec::new(),
            fail_next_render: false,
        }
    }

    /// A presenter with no scene, as when the interface outlet is unhooked.
    pub fn detached() -> Self {
        Self {
            scene_attached: false,
            ..Self::new()
        }
    }

    /// Makes `play_audio` fail for the named clip.
    pub fn fail_clip(&mut self, clip: impl Into<String>) {
        self.failing_clips.push(clip.into());
    }

    /// Makes the next `render_animation` call fail.
    pub fn fail_next_render(&mut self) {
        self.fail_next_render = true;
    }

    pub fn calls(&self) -> &[PresenterCall] {
        &self.calls
    }

    pub fn drain(&mut self) -> Vec<PresenterCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn played(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                PresenterCall::Play { clip, .. } => Some(clip.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Presenter for RecordingPresenter {
    fn has_scene(&self) -> bool {
        self.scene_attached
    }

    fn render_animation(
        &mut self,
        frames: &[String],
        fps: u32,
        repeats: bool,
        background: BackgroundStyle,
    ) -> Result<()> {
        if std::mem::take(&mut self.fail_next_render) {
            return Err(KaliError::msg("scene rejected the animation"));
        }
        self.calls.push(PresenterCall::Render {
            first_frame: frames.first().cloned(),
            frame_count: frames.len(),
            fps,
            repeats,
            background,
        });
        Ok(())
    }

    fn play_audio(&mut self, clip: &str, volume: f32) -> Result<()> {
        if self.failing_clips.iter().any(|failing| failing == clip) {
            return Err(KaliError::AudioPlayback {
                clip: clip.to_string(),
                reason: "player could not be created".to_string(),
            });
        }
        self.calls.push(PresenterCall::Play {
            clip: clip.to_string(),
            volume,
        });
        Ok(())
    }

    fn pause_audio(&mut self, clip: &str) {
        self.calls.push(PresenterCall::Pause(clip.to_string()));
    }

    fn preload_assets(&mut self, atlas: &str) -> Result<()> {
        self.calls.push(PresenterCall::Preload(atlas.to_string()));
        Ok(())
    }

    fn rotate_sprite(&mut self, radians: f64) {
        self.calls.push(PresenterCall::Rotate(radians));
    }
}
