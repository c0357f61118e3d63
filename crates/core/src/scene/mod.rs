use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the lesson currently stands. Exactly one state is active at a time;
/// the letter-bearing variants carry the letter being taught.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LessonState {
    LoadingIntro,
    Intro,
    PlayingIntro,
    Letter(String),
    AwaitingLetterTap(String),
    LetterObject(String),
    AwaitingLetterObjectTap(String),
    GoodJob(CongratulationVariant),
}

impl LessonState {
    /// True while the state is waiting on the child rather than on audio.
    pub fn is_awaiting_tap(&self) -> bool {
        matches!(
            self,
            Self::Intro | Self::AwaitingLetterTap(_) | Self::AwaitingLetterObjectTap(_)
        )
    }
}

impl fmt::Display for LessonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadingIntro => f.write_str("loading-intro"),
            Self::Intro => f.write_str("intro"),
            Self::PlayingIntro => f.write_str("playing-intro"),
            Self::Letter(l) => write!(f, "letter({l})"),
            Self::AwaitingLetterTap(l) => write!(f, "awaiting-letter-tap({l})"),
            Self::LetterObject(l) => write!(f, "letter-object({l})"),
            Self::AwaitingLetterObjectTap(l) => write!(f, "awaiting-letter-object-tap({l})"),
            Self::GoodJob(v) => write!(f, "good-job({v:?})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CongratulationVariant {
    Short,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackgroundStyle {
    /// Cream backdrop used for the intro.
    Cream,
    /// Backdrop behind letters and letter objects.
    Chalkboard,
    /// Rainbow backdrop behind congratulations.
    Rainbow,
}

/// A contiguous run of frames inside a texture atlas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSource {
    pub atlas: String,
    pub prefix: String,
    pub first_frame: u32,
    pub last_frame: u32,
}

impl FrameSource {
    pub fn new(
        atlas: impl Into<String>,
        prefix: impl Into<String>,
        first: u32,
        last: u32,
    ) -> Self {
        Self {
            atlas: atlas.into(),
            prefix: prefix.into(),
            first_frame: first,
            last_frame: last,
        }
    }

    pub fn len(&self) -> usize {
        if self.last_frame < self.first_frame {
            0
        } else {
            (self.last_frame - self.first_frame) as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Texture identifiers in playback order, e.g. `Kali_Intro_05_00242`.
    pub fn frame_names(&self) -> Vec<String> {
        (self.first_frame..=self.last_frame)
            .map(|frame| frame_name(&self.prefix, frame))
            .collect()
    }
}

/// Atlas texture names zero-pad the frame number to five digits.
pub fn frame_name(prefix: &str, frame: u32) -> String {
    format!("{prefix}_{frame:05}")
}

/// Everything the presentation layer needs to run one step of a lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationRequest {
    pub frames: FrameSource,
    pub audio_clip: String,
    pub repeats: bool,
    pub background: BackgroundStyle,
    pub fps: u32,
}
