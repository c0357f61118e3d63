use std::{collections::BTreeSet, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    scene::{BackgroundStyle, CongratulationVariant, FrameSource, PresentationRequest},
    KaliError, Result,
};

const INTRO_ATLAS: &str = "Kali";
const LETTERS_ATLAS: &str = "Kali_Letters";
const CONGRATULATION_ATLAS: &str = "Kali_GoodJob";

const LETTER_FRAMES: u32 = 60;
const OBJECT_FRAMES: u32 = 90;

/// The atlases the sequencer cares about by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AtlasKind {
    Intro,
    Letters,
    Congratulation,
}

impl AtlasKind {
    pub fn atlas_name(self) -> &'static str {
        match self {
            Self::Intro => INTRO_ATLAS,
            Self::Letters => LETTERS_ATLAS,
            Self::Congratulation => CONGRATULATION_ATLAS,
        }
    }

    pub fn all() -> [AtlasKind; 3] {
        [Self::Intro, Self::Letters, Self::Congratulation]
    }

    pub fn from_atlas_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|kind| kind.atlas_name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadState {
    #[default]
    NotRequested,
    Requested,
    Loaded,
}

/// Load progress of the atlases that gate lesson transitions. Only changed by
/// the sequencer, in response to delivered events or its own preload queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetReadiness {
    intro: LoadState,
    letters: LoadState,
    congratulation: LoadState,
}

impl AssetReadiness {
    pub fn state(&self, kind: AtlasKind) -> LoadState {
        match kind {
            AtlasKind::Intro => self.intro,
            AtlasKind::Letters => self.letters,
            AtlasKind::Congratulation => self.congratulation,
        }
    }

    pub fn is_loaded(&self, kind: AtlasKind) -> bool {
        self.state(kind) == LoadState::Loaded
    }

    pub(crate) fn mark_requested(&mut self, kind: AtlasKind) {
        let slot = self.slot(kind);
        if *slot == LoadState::NotRequested {
            *slot = LoadState::Requested;
        }
    }

    pub(crate) fn mark_loaded(&mut self, kind: AtlasKind) {
        *self.slot(kind) = LoadState::Loaded;
    }

    fn slot(&mut self, kind: AtlasKind) -> &mut LoadState {
        match kind {
            AtlasKind::Intro => &mut self.intro,
            AtlasKind::Letters => &mut self.letters,
            AtlasKind::Congratulation => &mut self.congratulation,
        }
    }
}

/// Maps each step of a lesson to the animation and clip that present it.
#[derive(Debug, Clone)]
pub struct LessonCatalog {
    fps: u32,
}

impl LessonCatalog {
    pub fn new(fps: u32) -> Self {
        Self { fps }
    }

    /// First launch plays the full introduction; later launches a short hello.
    pub fn intro(&self, first_launch: bool) -> PresentationRequest {
        let (prefix, first, last) = if first_launch {
            ("Kali_Intro_05", 242, 447)
        } else {
            ("Kali_Intro_Short", 0, 89)
        };
        self.request(
            FrameSource::new(INTRO_ATLAS, prefix, first, last),
            prefix,
            false,
            BackgroundStyle::Cream,
        )
    }

    pub fn letter(&self, letter: &str) -> PresentationRequest {
        let name = format!("Kali_Letter_{letter}");
        self.request(
            FrameSource::new(LETTERS_ATLAS, name.clone(), 0, LETTER_FRAMES - 1),
            name,
            true,
            BackgroundStyle::Chalkboard,
        )
    }

    pub fn letter_object(&self, letter: &str) -> PresentationRequest {
        let name = format!("Kali_Object_{letter}");
        self.request(
            FrameSource::new(LETTERS_ATLAS, name.clone(), 0, OBJECT_FRAMES - 1),
            name,
            false,
            BackgroundStyle::Chalkboard,
        )
    }

    pub fn congratulation(&self, variant: CongratulationVariant) -> PresentationRequest {
        let (name, frames) = match variant {
            CongratulationVariant::Short => ("Kali_GoodJob_Short", 45),
            CongratulationVariant::Long => ("Kali_GoodJob_Long", 120),
        };
        self.request(
            FrameSource::new(CONGRATULATION_ATLAS, name, 0, frames - 1),
            name,
            false,
            BackgroundStyle::Rainbow,
        )
    }

    /// Every request the catalog can produce for the given letters.
    pub fn all_requests(&self, letters: &[String]) -> Vec<PresentationRequest> {
        let mut requests = vec![self.intro(true), self.intro(false)];
        for letter in letters {
            requests.push(self.letter(letter));
            requests.push(self.letter_object(letter));
        }
        requests.push(self.congratulation(CongratulationVariant::Short));
        requests.push(self.congratulation(CongratulationVariant::Long));
        requests
    }

    fn request(
        &self,
        frames: FrameSource,
        clip: impl Into<String>,
        repeats: bool,
        background: BackgroundStyle,
    ) -> PresentationRequest {
        PresentationRequest {
            frames,
            audio_clip: clip.into(),
            repeats,
            background,
            fps: self.fps,
        }
    }
}

/// Registry of the atlases and audio clips bundled with the app.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetManifest {
    atlases: BTreeSet<String>,
    clips: BTreeSet<String>,
}

impl AssetManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Manifest listing exactly what `catalog` needs for `letters`.
    pub fn bundled(catalog: &LessonCatalog, letters: &[String]) -> Self {
        let mut manifest = Self::new();
        for kind in AtlasKind::all() {
            manifest.register_atlas(kind.atlas_name());
        }
        for request in catalog.all_requests(letters) {
            manifest.register_clip(request.audio_clip);
        }
        manifest
    }

    pub fn register_atlas(&mut self, name: impl Into<String>) {
        self.atlases.insert(name.into());
    }

    pub fn register_clip(&mut self, name: impl Into<String>) {
        self.clips.insert(name.into());
    }

    pub fn require_atlas(&self, name: &str) -> Result<()> {
        if self.atlases.contains(name) {
            Ok(())
        } else {
            Err(KaliError::missing(format!("texture atlas `{name}` is not bundled")))
        }
    }

    pub fn require_clip(&self, name: &str) -> Result<()> {
        if self.clips.contains(name) {
            Ok(())
        } else {
            Err(KaliError::missing(format!("audio clip `{name}` is not bundled")))
        }
    }

    /// Checks that every request the catalog can issue is backed by assets.
    pub fn verify(&self, catalog: &LessonCatalog, letters: &[String]) -> Result<()> {
        for request in catalog.all_requests(letters) {
            self.require_atlas(&request.frames.atlas)?;
            self.require_clip(&request.audio_clip)?;
        }
        Ok(())
    }
}
