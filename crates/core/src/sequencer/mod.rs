//! Lesson progression.
//!
//! [`LessonSequencer`] owns the lesson state and the letter cursor. Each
//! delivered [`Event`] moves it through intro, letter, letter object and
//! congratulation, and yields at most one [`PresentationRequest`] for the
//! presenter to execute. The sequencer performs no I/O; the host feeds it
//! events one at a time.

use std::collections::VecDeque;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    assets::{AssetManifest, AssetReadiness, AtlasKind, LessonCatalog, LoadState},
    audio::AudioTracker,
    config::{AdvancePolicy, AppConfig},
    scene::{CongratulationVariant, LessonState, PresentationRequest},
    Result,
};

/// Something that happened outside the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// The child tapped the watch face.
    Tap,
    /// The clip started by the last request stopped. `success` is false when
    /// it was interrupted or failed to decode.
    AudioFinished { success: bool },
    /// The activation fallback timer elapsed.
    IdleTimerFired,
    /// A texture atlas finished loading in the background.
    AtlasLoaded(AtlasKind),
}

#[derive(Debug)]
pub struct LessonSequencer {
    state: LessonState,
    letters: Vec<String>,
    index: usize,
    policy: AdvancePolicy,
    rng: StdRng,
    catalog: LessonCatalog,
    readiness: AssetReadiness,
    audio: AudioTracker,
    first_launch: bool,
    lessons_completed: u32,
    preload_after_lessons: u32,
    long_congratulation_after_lessons: u32,
    pending_preloads: VecDeque<AtlasKind>,
}

impl LessonSequencer {
    /// Builds a sequencer in [`LessonState::LoadingIntro`], with the intro
    /// atlas queued for preloading.
    ///
    /// Fails if the configuration is invalid or if any clip or atlas the
    /// lessons would ask for is absent from `manifest`.
    pub fn new(config: &AppConfig, manifest: &AssetManifest) -> Result<Self> {
        config.validate()?;

        let catalog = LessonCatalog::new(config.timing.fps);
        manifest.verify(&catalog, &config.lesson.letters)?;

        let rng = match config.lesson.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut readiness = AssetReadiness::default();
        readiness.mark_requested(AtlasKind::Intro);

        Ok(Self {
            state: LessonState::LoadingIntro,
            letters: config.lesson.letters.clone(),
            index: 0,
            policy: config.lesson.advance_policy,
            rng,
            catalog,
            readiness,
            audio: AudioTracker::new(),
            first_launch: config.launch.first_launch,
            lessons_completed: 0,
            preload_after_lessons: config.lesson.preload_after_lessons,
            long_congratulation_after_lessons: config.lesson.long_congratulation_after_lessons,
            pending_preloads: VecDeque::from([AtlasKind::Intro]),
        })
    }

    pub fn state(&self) -> &LessonState {
        &self.state
    }

    pub fn letter_index(&self) -> usize {
        self.index
    }

    pub fn current_letter(&self) -> &str {
        &self.letters[self.index]
    }

    pub fn lessons_completed(&self) -> u32 {
        self.lessons_completed
    }

    pub fn readiness(&self) -> &AssetReadiness {
        &self.readiness
    }

    pub fn is_audio_playing(&self) -> bool {
        self.audio.is_playing()
    }

    /// Hands the host the next atlas the sequencer wants loaded in the
    /// background, oldest first.
    pub fn take_preload(&mut self) -> Option<AtlasKind> {
        self.pending_preloads.pop_front()
    }

    /// Consumes one event. Events with no transition from the current state
    /// are ignored and leave everything untouched.
    pub fn handle_event(&mut self, event: Event) -> Option<PresentationRequest> {
        let event = match event {
            Event::IdleTimerFired if self.audio.is_playing() => {
                tracing::trace!(
                    state = %self.state,
                    clip = ?self.audio.current(),
                    "idle timer fired while audio plays"
                );
                return None;
            }
            Event::IdleTimerFired => Event::AudioFinished { success: true },
            Event::AudioFinished { .. } => {
                self.audio.finished();
                event
            }
            Event::AtlasLoaded(kind) => {
                self.readiness.mark_loaded(kind);
                event
            }
            Event::Tap => event,
        };

        let Some((next, request)) = self.transition(event) else {
            tracing::trace!(state = %self.state, ?event, "event ignored");
            return None;
        };

        tracing::debug!(from = %self.state, to = %next, ?event, "lesson transition");
        self.state = next;
        self.begin(request)
    }

    /// The presenter never started the clip of the last request. Stops
    /// treating it as playing so the idle timer can recover the step.
    pub fn abandon_clip(&mut self) {
        if let Some(clip) = self.audio.pause() {
            tracing::debug!(clip = %clip, state = %self.state, "clip abandoned");
        }
    }

    /// Called when the screen comes back. Presenting states replay their
    /// animation and clip so the interrupted step repeats.
    pub fn activate(&mut self) -> Option<PresentationRequest> {
        let request = match &self.state {
            LessonState::PlayingIntro => Some(self.catalog.intro(self.first_launch)),
            LessonState::Letter(letter) => Some(self.catalog.letter(letter)),
            LessonState::LetterObject(letter) => Some(self.catalog.letter_object(letter)),
            LessonState::GoodJob(variant) => Some(self.catalog.congratulation(*variant)),
            LessonState::LoadingIntro
            | LessonState::Intro
            | LessonState::AwaitingLetterTap(_)
            | LessonState::AwaitingLetterObjectTap(_) => None,
        };

        tracing::debug!(state = %self.state, replay = request.is_some(), "activated");
        self.begin(request)
    }

    /// Called when the screen goes away. Stops tracking audio and revokes any
    /// pending tap so the prompt that asked for it plays again. Returns the
    /// clip the presenter should pause.
    pub fn deactivate(&mut self) -> Option<String> {
        let revoked = match &self.state {
            LessonState::AwaitingLetterTap(letter) => Some(LessonState::Letter(letter.clone())),
            LessonState::AwaitingLetterObjectTap(letter) => {
                Some(LessonState::LetterObject(letter.clone()))
            }
            _ => None,
        };

        if let Some(previous) = revoked {
            tracing::debug!(from = %self.state, to = %previous, "pending tap revoked");
            self.state = previous;
        }

        self.audio.pause()
    }

    fn transition(&mut self, event: Event) -> Option<(LessonState, Option<PresentationRequest>)> {
        use LessonState::*;

        let finished = matches!(event, Event::AudioFinished { success: true });

        match (self.state.clone(), event) {
            (LoadingIntro, Event::AtlasLoaded(AtlasKind::Intro)) => Some((Intro, None)),
            (Intro, Event::Tap) => {
                let request = self.catalog.intro(self.first_launch);
                Some((PlayingIntro, Some(request)))
            }
            (PlayingIntro, _) if finished => {
                let letter = self.current_letter().to_string();
                let request = self.catalog.letter(&letter);
                Some((Letter(letter), Some(request)))
            }
            (Letter(letter), _) if finished => Some((AwaitingLetterTap(letter), None)),
            (AwaitingLetterTap(letter), Event::Tap) => {
                let request = self.catalog.letter_object(&letter);
                Some((LetterObject(letter), Some(request)))
            }
            (LetterObject(letter), _) if finished => {
                self.queue_congratulation_preload();
                Some((AwaitingLetterObjectTap(letter), None))
            }
            (AwaitingLetterObjectTap(_), Event::Tap) => {
                self.lessons_completed += 1;
                if self.readiness.is_loaded(AtlasKind::Congratulation) {
                    let variant = self.pick_congratulation();
                    Some((GoodJob(variant), Some(self.catalog.congratulation(variant))))
                } else {
                    Some(self.advance_letter())
                }
            }
            (GoodJob(_), Event::Tap) => Some(self.advance_letter()),
            (GoodJob(_), _) if finished => Some(self.advance_letter()),
            _ => None,
        }
    }

    fn begin(&mut self, request: Option<PresentationRequest>) -> Option<PresentationRequest> {
        if let Some(request) = &request {
            self.audio.started(request.audio_clip.clone());
        }
        request
    }

    fn queue_congratulation_preload(&mut self) {
        if self.lessons_completed < self.preload_after_lessons
            || self.readiness.state(AtlasKind::Congratulation) != LoadState::NotRequested
        {
            return;
        }

        tracing::debug!(
            lessons = self.lessons_completed,
            "requesting congratulation atlas preload"
        );
        self.readiness.mark_requested(AtlasKind::Congratulation);
        self.pending_preloads.push_back(AtlasKind::Congratulation);
    }

    fn pick_congratulation(&mut self) -> CongratulationVariant {
        let earned = self.lessons_completed >= self.long_congratulation_after_lessons;
        if earned && self.rng.gen_bool(0.5) {
            CongratulationVariant::Long
        } else {
            CongratulationVariant::Short
        }
    }

    fn advance_letter(&mut self) -> (LessonState, Option<PresentationRequest>) {
        self.index = next_index(self.policy, self.index, self.letters.len(), &mut self.rng);

        let letter = self.letters[self.index].clone();
        let request = self.catalog.letter(&letter);
        (LessonState::Letter(letter), Some(request))
    }
}

/// Next cursor position under `policy`. `len` is never zero.
fn next_index(policy: AdvancePolicy, current: usize, len: usize, rng: &mut impl Rng) -> usize {
    match policy {
        AdvancePolicy::Sequential => (current + 1) % len,
        AdvancePolicy::Random if len < 2 => current,
        AdvancePolicy::Random => {
            let pick = rng.gen_range(0..len - 1);
            if pick >= current {
                pick + 1
            } else {
                pick
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LessonConfig;

    const DONE: Event = Event::AudioFinished { success: true };

    fn config(letters: &[&str]) -> AppConfig {
        AppConfig {
            lesson: LessonConfig {
                seed: Some(42),
                ..LessonConfig::with_letters(letters.iter().copied())
            },
            ..AppConfig::default()
        }
    }

    fn sequencer_with(config: &AppConfig) -> LessonSequencer {
        let catalog = LessonCatalog::new(config.timing.fps);
        let manifest = AssetManifest::bundled(&catalog, &config.lesson.letters);
        LessonSequencer::new(config, &manifest).unwrap()
    }

    fn at_intro(letters: &[&str]) -> LessonSequencer {
        let mut sequencer = sequencer_with(&config(letters));
        assert_eq!(sequencer.take_preload(), Some(AtlasKind::Intro));
        sequencer.handle_event(Event::AtlasLoaded(AtlasKind::Intro));
        assert_eq!(sequencer.state(), &LessonState::Intro);
        sequencer
    }

    fn feed(sequencer: &mut LessonSequencer, events: &[Event]) {
        for event in events {
            sequencer.handle_event(*event);
        }
    }

    /// Drives one whole lesson from `Letter(l)` back to the next `Letter`.
    fn complete_lesson(sequencer: &mut LessonSequencer) {
        feed(sequencer, &[DONE, Event::Tap, DONE, Event::Tap]);
        if let LessonState::GoodJob(_) = sequencer.state() {
            sequencer.handle_event(DONE);
        }
        assert!(matches!(sequencer.state(), LessonState::Letter(_)));
    }

    #[test]
    fn starts_loading_and_waits_for_intro_atlas() {
        let mut sequencer = sequencer_with(&config(&["A"]));
        assert_eq!(sequencer.state(), &LessonState::LoadingIntro);
        assert_eq!(sequencer.readiness().state(AtlasKind::Intro), LoadState::Requested);

        assert_eq!(sequencer.handle_event(Event::Tap), None);
        assert_eq!(sequencer.state(), &LessonState::LoadingIntro);

        assert_eq!(sequencer.handle_event(Event::AtlasLoaded(AtlasKind::Intro)), None);
        assert_eq!(sequencer.state(), &LessonState::Intro);
    }

    #[test]
    fn tap_on_intro_plays_the_intro_once() {
        let mut sequencer = at_intro(&["A", "B", "C"]);

        let request = sequencer.handle_event(Event::Tap).expect("intro request");
        assert_eq!(sequencer.state(), &LessonState::PlayingIntro);
        assert_eq!(request.audio_clip, "Kali_Intro_05");
        assert!(sequencer.is_audio_playing());

        assert_eq!(sequencer.handle_event(Event::Tap), None);
        assert_eq!(sequencer.state(), &LessonState::PlayingIntro);
    }

    #[test]
    fn returning_child_gets_the_short_intro() {
        let mut config = config(&["A"]);
        config.launch.first_launch = false;
        let mut sequencer = sequencer_with(&config);
        sequencer.handle_event(Event::AtlasLoaded(AtlasKind::Intro));

        let request = sequencer.handle_event(Event::Tap).unwrap();
        assert_eq!(request.audio_clip, "Kali_Intro_Short");
    }

    #[test]
    fn walks_through_a_lesson() {
        let mut sequencer = at_intro(&["A", "B", "C"]);

        sequencer.handle_event(Event::Tap);
        let letter = sequencer.handle_event(DONE).unwrap();
        assert_eq!(letter.audio_clip, "Kali_Letter_A");
        assert!(letter.repeats);
        assert_eq!(sequencer.state(), &LessonState::Letter("A".into()));

        assert_eq!(sequencer.handle_event(DONE), None);
        assert_eq!(sequencer.state(), &LessonState::AwaitingLetterTap("A".into()));

        let object = sequencer.handle_event(Event::Tap).unwrap();
        assert_eq!(object.audio_clip, "Kali_Object_A");
        assert_eq!(sequencer.state(), &LessonState::LetterObject("A".into()));

        assert_eq!(sequencer.handle_event(DONE), None);
        assert_eq!(sequencer.state(), &LessonState::AwaitingLetterObjectTap("A".into()));
    }

    #[test]
    fn scripted_sequence_reaches_object_tap_then_completes() {
        let mut sequencer = at_intro(&["A", "B", "C"]);
        feed(&mut sequencer, &[Event::Tap, DONE, DONE, Event::Tap, DONE]);
        assert_eq!(sequencer.state(), &LessonState::AwaitingLetterObjectTap("A".into()));

        sequencer.handle_event(Event::Tap);
        assert_eq!(sequencer.state(), &LessonState::Letter("B".into()));
        assert_eq!(sequencer.lessons_completed(), 1);
    }

    #[test]
    fn unsuccessful_audio_does_not_advance() {
        let mut sequencer = at_intro(&["A"]);
        sequencer.handle_event(Event::Tap);

        assert_eq!(sequencer.handle_event(Event::AudioFinished { success: false }), None);
        assert_eq!(sequencer.state(), &LessonState::PlayingIntro);
        assert!(!sequencer.is_audio_playing());
    }

    #[test]
    fn ignored_events_leave_state_untouched() {
        let mut sequencer = at_intro(&["A", "B"]);
        let ignored = [DONE, Event::IdleTimerFired, Event::AtlasLoaded(AtlasKind::Letters)];
        for event in ignored {
            assert_eq!(sequencer.handle_event(event), None);
            assert_eq!(sequencer.state(), &LessonState::Intro);
        }

        feed(&mut sequencer, &[Event::Tap, DONE]);
        assert_eq!(sequencer.handle_event(Event::Tap), None);
        assert_eq!(sequencer.state(), &LessonState::Letter("A".into()));
        assert_eq!(sequencer.letter_index(), 0);
    }

    #[test]
    fn events_without_a_transition_are_ignored_in_every_state() {
        const FAILED: Event = Event::AudioFinished { success: false };
        const IDLE: Event = Event::IdleTimerFired;
        const TAP: Event = Event::Tap;
        let congratulation = Event::AtlasLoaded(AtlasKind::Congratulation);
        let intro = Event::AtlasLoaded(AtlasKind::Intro);

        let loading: Vec<Event> = Vec::new();
        let to_intro = vec![intro];
        let to_playing = vec![intro, TAP];
        let to_letter = vec![intro, TAP, DONE];
        let to_letter_tap = vec![intro, TAP, DONE, DONE];
        let to_object = vec![intro, TAP, DONE, DONE, TAP];
        let to_object_tap = vec![intro, TAP, DONE, DONE, TAP, DONE];
        let to_good_job = vec![congratulation, intro, TAP, DONE, DONE, TAP, DONE, TAP];

        let cases: Vec<(&[Event], Event)> = vec![
            (&loading[..], TAP),
            (&loading[..], DONE),
            (&loading[..], FAILED),
            (&loading[..], IDLE),
            (&loading[..], congratulation),
            (&to_intro[..], DONE),
            (&to_intro[..], FAILED),
            (&to_intro[..], IDLE),
            (&to_intro[..], Event::AtlasLoaded(AtlasKind::Letters)),
            (&to_playing[..], TAP),
            (&to_playing[..], FAILED),
            (&to_playing[..], IDLE),
            (&to_playing[..], intro),
            (&to_letter[..], TAP),
            (&to_letter[..], FAILED),
            (&to_letter[..], IDLE),
            (&to_letter_tap[..], DONE),
            (&to_letter_tap[..], FAILED),
            (&to_letter_tap[..], IDLE),
            (&to_object[..], TAP),
            (&to_object[..], FAILED),
            (&to_object[..], IDLE),
            (&to_object_tap[..], DONE),
            (&to_object_tap[..], FAILED),
            (&to_object_tap[..], IDLE),
            (&to_good_job[..], IDLE),
            (&to_good_job[..], FAILED),
            (&to_good_job[..], congratulation),
        ];

        for (setup, event) in cases {
            let mut sequencer = sequencer_with(&config(&["A", "B", "C"]));
            feed(&mut sequencer, setup);
            let before = sequencer.state().clone();
            let index = sequencer.letter_index();

            assert_eq!(sequencer.handle_event(event), None, "{before} + {event:?}");
            assert_eq!(sequencer.state(), &before, "{before} + {event:?}");
            assert_eq!(sequencer.letter_index(), index);
        }
    }

    #[test]
    fn sequential_cursor_counts_lessons_modulo_letters() {
        let mut sequencer = at_intro(&["A", "B", "C"]);
        feed(&mut sequencer, &[Event::Tap, DONE]);

        for n in 1..=7 {
            complete_lesson(&mut sequencer);
            assert_eq!(sequencer.letter_index(), n % 3);
        }
        assert_eq!(sequencer.state(), &LessonState::Letter("B".into()));
    }

    #[test]
    fn congratulation_only_once_atlas_is_loaded() {
        let mut sequencer = at_intro(&["A", "B", "C"]);
        feed(&mut sequencer, &[Event::Tap, DONE, DONE, Event::Tap, DONE]);
        assert_eq!(sequencer.take_preload(), None);

        sequencer.handle_event(Event::Tap);
        assert_eq!(sequencer.state(), &LessonState::Letter("B".into()));

        feed(&mut sequencer, &[DONE, Event::Tap, DONE]);
        assert_eq!(sequencer.take_preload(), Some(AtlasKind::Congratulation));
        assert_eq!(sequencer.take_preload(), None);
        assert_eq!(
            sequencer.readiness().state(AtlasKind::Congratulation),
            LoadState::Requested
        );

        sequencer.handle_event(Event::AtlasLoaded(AtlasKind::Congratulation));
        assert_eq!(sequencer.state(), &LessonState::AwaitingLetterObjectTap("B".into()));

        let request = sequencer.handle_event(Event::Tap).unwrap();
        assert_eq!(sequencer.state(), &LessonState::GoodJob(CongratulationVariant::Short));
        assert_eq!(request.audio_clip, "Kali_GoodJob_Short");

        let next = sequencer.handle_event(DONE).unwrap();
        assert_eq!(sequencer.state(), &LessonState::Letter("C".into()));
        assert_eq!(next.audio_clip, "Kali_Letter_C");
    }

    #[test]
    fn tap_skips_the_congratulation() {
        let mut sequencer = at_intro(&["A", "B"]);
        sequencer.handle_event(Event::AtlasLoaded(AtlasKind::Congratulation));
        feed(&mut sequencer, &[Event::Tap, DONE, DONE, Event::Tap, DONE, Event::Tap]);
        assert!(matches!(sequencer.state(), LessonState::GoodJob(_)));

        sequencer.handle_event(Event::Tap);
        assert_eq!(sequencer.state(), &LessonState::Letter("B".into()));
    }

    #[test]
    fn long_congratulation_appears_after_enough_lessons() {
        let mut sequencer = at_intro(&["A", "B", "C"]);
        sequencer.handle_event(Event::AtlasLoaded(AtlasKind::Congratulation));
        feed(&mut sequencer, &[Event::Tap, DONE]);

        let mut variants = Vec::new();
        for _ in 0..40 {
            feed(&mut sequencer, &[DONE, Event::Tap, DONE, Event::Tap]);
            if let LessonState::GoodJob(variant) = sequencer.state() {
                variants.push(*variant);
            }
            sequencer.handle_event(DONE);
        }

        assert_eq!(variants.len(), 40);
        assert!(variants[..2].iter().all(|v| *v == CongratulationVariant::Short));
        assert!(variants.contains(&CongratulationVariant::Long));
    }

    #[test]
    fn random_policy_never_repeats_the_current_letter() {
        let mut config = config(&["A", "B", "C", "D"]);
        config.lesson.advance_policy = AdvancePolicy::Random;
        let mut sequencer = sequencer_with(&config);
        sequencer.handle_event(Event::AtlasLoaded(AtlasKind::Intro));
        feed(&mut sequencer, &[Event::Tap, DONE]);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..50 {
            let before = sequencer.letter_index();
            complete_lesson(&mut sequencer);
            assert_ne!(sequencer.letter_index(), before);
            assert!(sequencer.letter_index() < 4);
            seen.insert(sequencer.letter_index());
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn random_policy_with_one_letter_stays_put() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(next_index(AdvancePolicy::Random, 0, 1, &mut rng), 0);
        assert_eq!(next_index(AdvancePolicy::Sequential, 2, 3, &mut rng), 0);
    }

    #[test]
    fn idle_timer_stands_in_for_missed_audio_callback() {
        let mut sequencer = at_intro(&["A"]);
        sequencer.handle_event(Event::Tap);

        assert_eq!(sequencer.handle_event(Event::IdleTimerFired), None);
        assert_eq!(sequencer.state(), &LessonState::PlayingIntro);

        sequencer.deactivate();
        let request = sequencer.handle_event(Event::IdleTimerFired).unwrap();
        assert_eq!(sequencer.state(), &LessonState::Letter("A".into()));
        assert_eq!(request.audio_clip, "Kali_Letter_A");
    }

    #[test]
    fn deactivation_revokes_pending_letter_tap() {
        let mut sequencer = at_intro(&["A", "B"]);
        feed(&mut sequencer, &[Event::Tap, DONE, DONE]);
        assert_eq!(sequencer.state(), &LessonState::AwaitingLetterTap("A".into()));

        sequencer.deactivate();
        let replay = sequencer.activate().expect("letter replays");
        assert_eq!(sequencer.state(), &LessonState::Letter("A".into()));
        assert_eq!(replay.audio_clip, "Kali_Letter_A");
        assert!(sequencer.is_audio_playing());
    }

    #[test]
    fn deactivation_revokes_pending_object_tap() {
        let mut sequencer = at_intro(&["A", "B"]);
        feed(&mut sequencer, &[Event::Tap, DONE, DONE, Event::Tap]);
        assert_eq!(sequencer.deactivate().as_deref(), Some("Kali_Object_A"));

        feed(&mut sequencer, &[DONE]);
        sequencer.deactivate();
        assert_eq!(sequencer.state(), &LessonState::LetterObject("A".into()));
        assert_eq!(sequencer.activate().unwrap().audio_clip, "Kali_Object_A");
    }

    #[test]
    fn activation_outside_presenting_states_is_silent() {
        let mut sequencer = at_intro(&["A"]);
        sequencer.deactivate();
        assert_eq!(sequencer.activate(), None);
        assert_eq!(sequencer.state(), &LessonState::Intro);
    }

    #[test]
    fn construction_requires_bundled_assets() {
        let config = config(&["A", "B"]);
        let err = LessonSequencer::new(&config, &AssetManifest::new()).unwrap_err();
        assert!(matches!(err, crate::KaliError::MissingCollaborator(_)));
    }

    #[test]
    fn construction_rejects_empty_letters() {
        let mut config = config(&["A"]);
        config.lesson.letters.clear();
        let err = LessonSequencer::new(&config, &AssetManifest::new()).unwrap_err();
        assert!(matches!(err, crate::KaliError::Config(_)));
    }
}
