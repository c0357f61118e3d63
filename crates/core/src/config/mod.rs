use std::{collections::HashSet, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{KaliError, Result};

/// Top-level configuration structure for the application.
///
/// Built once at startup and handed to the sequencer by value; nothing
/// mutates it afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub lesson: LessonConfig,
    pub timing: TimingConfig,
    pub launch: LaunchConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file and validates it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.lesson.validate()?;
        self.timing.validate()
    }
}

/// How the letter cursor moves once a lesson is complete.
///
/// Both behaviours shipped at different times, so both are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancePolicy {
    /// Step to the following letter, wrapping back to the first.
    #[default]
    Sequential,
    /// Pick any letter other than the current one, uniformly.
    Random,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LessonConfig {
    pub letters: Vec<String>,
    pub advance_policy: AdvancePolicy,
    /// Completed lessons required before the congratulation atlas is preloaded.
    pub preload_after_lessons: u32,
    /// Completed lessons required before the long congratulation may play.
    pub long_congratulation_after_lessons: u32,
    /// Fixed RNG seed, mostly useful for reproducible sessions.
    pub seed: Option<u64>,
}

impl Default for LessonConfig {
    fn default() -> Self {
        Self {
            letters: ('A'..='Z').map(String::from).collect(),
            advance_policy: AdvancePolicy::Sequential,
            preload_after_lessons: 1,
            long_congratulation_after_lessons: 3,
            seed: None,
        }
    }
}

impl LessonConfig {
    pub fn with_letters<I, S>(letters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            letters: letters.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.letters.is_empty() {
            return Err(KaliError::config("at least one letter must be configured"));
        }

        let mut seen = HashSet::new();
        for letter in &self.letters {
            if letter.trim().is_empty() {
                return Err(KaliError::config("letters must not be blank"));
            }
            if !seen.insert(letter.as_str()) {
                return Err(KaliError::config(format!("letter `{letter}` is listed twice")));
            }
        }

        Ok(())
    }
}

/// Configuration for frame pacing and the idle fallback timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub idle_timeout_secs: f32,
    pub fps: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 1.5,
            fps: 30,
        }
    }
}

impl TimingConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs_f32(self.idle_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(KaliError::config("fps must be positive"));
        }
        if !self.idle_timeout_secs.is_finite() || self.idle_timeout_secs <= 0.0 {
            return Err(KaliError::config("idle timeout must be a positive number of seconds"));
        }
        Ok(())
    }
}

/// Values read once from the platform settings store at launch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    pub first_launch: bool,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self { first_launch: true }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_teach_the_full_alphabet() {
        let config = AppConfig::default();
        assert_eq!(config.lesson.letters.len(), 26);
        assert_eq!(config.lesson.letters[0], "A");
        assert_eq!(config.timing.idle_timeout(), Duration::from_millis(1500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_empty_and_duplicate_letters() {
        let mut config = AppConfig::default();
        config.lesson.letters.clear();
        assert!(matches!(config.validate(), Err(KaliError::Config(_))));

        config.lesson = LessonConfig::with_letters(["A", "B", "A"]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("`A`"));
    }

    #[test]
    fn loads_partial_json_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "lesson": {{ "letters": ["A", "B", "C"], "advance_policy": "random", "seed": 7 }},
                 "launch": {{ "first_launch": false }} }}"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.lesson.letters, vec!["A", "B", "C"]);
        assert_eq!(config.lesson.advance_policy, AdvancePolicy::Random);
        assert_eq!(config.lesson.seed, Some(7));
        assert_eq!(config.lesson.preload_after_lessons, 1);
        assert!(!config.launch.first_launch);
        assert_eq!(config.timing.fps, 30);
    }

    #[test]
    fn load_reports_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        assert!(matches!(AppConfig::load(file.path()), Err(KaliError::Json(_))));
    }
}
