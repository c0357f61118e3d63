//! Core library for the Kali the Coder watch application.
//!
//! The crate holds the lesson sequencer that walks a child through the
//! alphabet and the thin session layer that hands its requests to a
//! platform presenter. Sprite rendering, audio playback and atlas loading
//! stay behind the [`Presenter`] trait; everything here is synchronous and
//! driven by events the host delivers one at a time.

pub mod assets;
pub mod audio;
pub mod config;
pub mod error;
pub mod input;
pub mod render;
pub mod scene;
pub mod sequencer;
pub mod session;
pub mod timeline;

pub use assets::{AssetManifest, AssetReadiness, AtlasKind, LessonCatalog, LoadState};
pub use audio::AudioTracker;
pub use config::{AdvancePolicy, AppConfig, LaunchConfig, LessonConfig, TimingConfig};
pub use error::{KaliError, Result};
pub use input::CrownTracker;
pub use render::{Presenter, PresenterCall, RecordingPresenter};
pub use scene::{
    BackgroundStyle, CongratulationVariant, FrameSource, LessonState, PresentationRequest,
};
pub use sequencer::{Event, LessonSequencer};
pub use session::LessonSession;
pub use timeline::{IdleTimer, PlaybackClock};
