use crate::{
    assets::AssetManifest,
    audio::PLAYBACK_VOLUME,
    config::AppConfig,
    input::CrownTracker,
    render::Presenter,
    scene::{LessonState, PresentationRequest},
    sequencer::{Event, LessonSequencer},
    timeline::{IdleTimer, PlaybackClock},
    KaliError, Result,
};

/// Binds a [`LessonSequencer`] to a [`Presenter`]: executes the requests the
/// sequencer emits, forwards preloads, and owns the idle fallback timer and
/// crown handling for one on-screen lesson.
#[derive(Debug)]
pub struct LessonSession<P: Presenter> {
    sequencer: LessonSequencer,
    presenter: P,
    clock: PlaybackClock,
    idle: IdleTimer,
    crown: CrownTracker,
}

impl<P: Presenter> LessonSession<P> {
    /// Creates the session and starts loading the intro atlas.
    pub fn new(config: &AppConfig, manifest: &AssetManifest, presenter: P) -> Result<Self> {
        if !presenter.has_scene() {
            return Err(KaliError::missing("no scene is attached to the presenter"));
        }

        let sequencer = LessonSequencer::new(config, manifest)?;
        let mut session = Self {
            sequencer,
            presenter,
            clock: PlaybackClock::default(),
            idle: IdleTimer::new(config.timing.idle_timeout()),
            crown: CrownTracker::new(),
        };
        session.flush_preloads()?;

        tracing::info!(
            letters = config.lesson.letters.len(),
            policy = ?config.lesson.advance_policy,
            first_launch = config.launch.first_launch,
            "lesson session ready"
        );
        Ok(session)
    }

    pub fn state(&self) -> &LessonState {
        self.sequencer.state()
    }

    pub fn sequencer(&self) -> &LessonSequencer {
        &self.sequencer
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn into_presenter(self) -> P {
        self.presenter
    }

    /// Delivers one event and carries out whatever the sequencer asks for.
    pub fn dispatch(&mut self, event: Event) -> Result<()> {
        let request = self.sequencer.handle_event(event);
        self.execute(request)?;
        self.flush_preloads()
    }

    /// Screen came to the foreground: replay the current step and arm the
    /// idle fallback.
    pub fn activate(&mut self) -> Result<()> {
        self.idle.arm(&self.clock);
        let request = self.sequencer.activate();
        self.execute(request)?;
        self.flush_preloads()
    }

    /// Screen left the foreground.
    pub fn deactivate(&mut self) {
        self.idle.disarm();
        if let Some(clip) = self.sequencer.deactivate() {
            self.presenter.pause_audio(&clip);
        }
    }

    /// Advances the session clock, firing the idle timer when it is due.
    pub fn tick(&mut self, delta_seconds: f32) -> Result<()> {
        self.clock.advance(delta_seconds);
        if self.idle.poll(&self.clock) {
            self.dispatch(Event::IdleTimerFired)?;
        }
        Ok(())
    }

    /// Crown rotation only spins the character, and only once it is loaded.
    pub fn crown_rotated(&mut self, delta: f64) {
        if *self.sequencer.state() == LessonState::LoadingIntro {
            return;
        }
        if let Some(rotation) = self.crown.rotated(delta) {
            self.presenter.rotate_sprite(rotation);
        }
    }

    fn execute(&mut self, request: Option<PresentationRequest>) -> Result<()> {
        let mut next = request;
        while let Some(request) = next.take() {
            match self.present(&request) {
                Ok(()) => {}
                Err(err @ KaliError::AudioPlayback { .. }) => {
                    tracing::warn!(error = %err, state = %self.sequencer.state(), "skipping step");
                    next = self
                        .sequencer
                        .handle_event(Event::AudioFinished { success: true });
                }
                Err(err) => {
                    self.sequencer.abandon_clip();
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn present(&mut self, request: &PresentationRequest) -> Result<()> {
        self.presenter.render_animation(
            &request.frames.frame_names(),
            request.fps,
            request.repeats,
            request.background,
        )?;
        self.presenter.play_audio(&request.audio_clip, PLAYBACK_VOLUME)
    }

    fn flush_preloads(&mut self) -> Result<()> {
        while let Some(kind) = self.sequencer.take_preload() {
            tracing::debug!(atlas = kind.atlas_name(), "preloading atlas");
            self.presenter.preload_assets(kind.atlas_name())?;
        }
        Ok(())
    }
}
