use anyhow::{anyhow, bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

const ENV_FEEDBACK_URL: &str = "REPCOACH_FEEDBACK_URL";
const ENV_FEEDBACK_PROVIDER: &str = "REPCOACH_FEEDBACK_PROVIDER";
const ENV_DATABASE: &str = "REPCOACH_DB";

const DEFAULT_DB_FILE: &str = "repcoach.sqlite3";

/// Knobs of the per-frame analysis. Defaults reproduce the reference scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Landmarks below this confidence are ignored for angle computation.
    pub min_confidence: f64,
    /// A joint is reported as a common error when it is out of range in
    /// strictly more than this share of frames (percent).
    pub error_threshold_pct: f64,
    /// Frame rate used to turn hold ticks into seconds.
    pub assumed_fps: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            error_threshold_pct: 30.0,
            assumed_fps: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackProviderKind {
    /// Always use the locally generated feedback.
    None,
    /// POST `{prompt, metadata}` to a relay that answers `{feedback}`.
    Relay,
    /// Call an OpenAI-compatible chat completions endpoint directly.
    ChatCompletions,
}

impl AnalysisSettings {
    /// Rejects values that would make scores, error rates or hold times
    /// meaningless.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            bail!(
                "analysis.min_confidence must lie in [0, 1], got {}",
                self.min_confidence
            );
        }
        if !(0.0..=100.0).contains(&self.error_threshold_pct) {
            bail!(
                "analysis.error_threshold_pct must lie in [0, 100], got {}",
                self.error_threshold_pct
            );
        }
        if !(self.assumed_fps.is_finite() && self.assumed_fps > 0.0) {
            bail!(
                "analysis.assumed_fps must be a positive number, got {}",
                self.assumed_fps
            );
        }
        Ok(())
    }
}

impl std::str::FromStr for FeedbackProviderKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "none" => Ok(FeedbackProviderKind::None),
            "relay" => Ok(FeedbackProviderKind::Relay),
            "chat_completions" => Ok(FeedbackProviderKind::ChatCompletions),
            other => Err(anyhow!("unknown feedback provider '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackSettings {
    pub provider: FeedbackProviderKind,
    /// Relay URL, or the chat completions base URL (e.g. `https://api.openai.com/v1`).
    pub endpoint: Option<String>,
    pub model: String,
    /// Name of the environment variable holding the bearer key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            provider: FeedbackProviderKind::None,
            endpoint: None,
            model: "gpt-4o-mini".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            timeout_secs: 20,
            temperature: 0.7,
            max_tokens: 500,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub analysis: AnalysisSettings,
    pub feedback: FeedbackSettings,
    pub database_path: Option<PathBuf>,
}

impl Settings {
    /// Database location, resolved against `base_dir` when unset.
    pub fn database_path(&self, base_dir: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| base_dir.join(DEFAULT_DB_FILE))
    }

    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;
        let temperature = self.feedback.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            bail!("feedback.temperature must lie in [0, 2], got {temperature}");
        }
        Ok(())
    }

    /// Applies `REPCOACH_*` environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = env::var(ENV_FEEDBACK_URL) {
            self.feedback.endpoint = Some(url);
        }
        if let Ok(provider) = env::var(ENV_FEEDBACK_PROVIDER) {
            self.feedback.provider = provider
                .parse()
                .with_context(|| format!("invalid {ENV_FEEDBACK_PROVIDER}"))?;
        }
        if let Ok(path) = env::var(ENV_DATABASE) {
            self.database_path = Some(PathBuf::from(path));
        }
        Ok(())
    }
}

/// JSON-backed settings file. A missing file yields defaults; an unreadable
/// one is logged and replaced by defaults on the next write. Well-formed
/// files with out-of-range values are rejected.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring malformed settings at {}: {err}",
                    path.display()
                );
                Settings::default()
            })
        } else {
            Settings::default()
        };
        data.validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Settings {
        self.read().clone()
    }

    pub fn update(&self, settings: Settings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create settings directory {}", parent.display())
                })?;
            }
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.get(), Settings::default());
        assert_eq!(store.get().analysis.min_confidence, 0.3);
    }

    #[test]
    fn test_update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut settings = store.get();
        settings.feedback.provider = FeedbackProviderKind::Relay;
        settings.feedback.endpoint = Some("http://localhost:3001/api/analyze".into());
        store.update(settings.clone()).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.get(), settings);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"analysis":{"assumed_fps":60.0}}"#).unwrap();

        let store = SettingsStore::new(path).unwrap();
        let analysis = store.get().analysis;
        assert_eq!(analysis.assumed_fps, 60.0);
        assert_eq!(analysis.error_threshold_pct, 30.0);
        assert_eq!(store.get().feedback.max_tokens, 500);
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.get(), Settings::default());
    }

    #[test]
    fn test_database_path_defaults_next_to_base_dir() {
        let settings = Settings::default();
        assert_eq!(
            settings.database_path(Path::new("/data")),
            PathBuf::from("/data").join(DEFAULT_DB_FILE)
        );
    }

    #[test]
    fn test_provider_kind_parses() {
        assert_eq!(
            "chat_completions".parse::<FeedbackProviderKind>().unwrap(),
            FeedbackProviderKind::ChatCompletions
        );
        assert!("openai".parse::<FeedbackProviderKind>().is_err());
    }

    fn load(json: &str) -> Result<SettingsStore> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, json).unwrap();
        SettingsStore::new(path)
    }

    #[test]
    fn test_zero_fps_is_rejected() {
        let err = load(r#"{"analysis":{"assumed_fps":0.0}}"#).err().unwrap();
        assert!(format!("{err:#}").contains("assumed_fps"), "{err:#}");
        assert!(load(r#"{"analysis":{"assumed_fps":-25.0}}"#).is_err());
    }

    #[test]
    fn test_confidence_outside_unit_range_is_rejected() {
        let err = load(r#"{"analysis":{"min_confidence":1.5}}"#).err().unwrap();
        assert!(format!("{err:#}").contains("min_confidence"), "{err:#}");
        assert!(load(r#"{"analysis":{"min_confidence":-0.1}}"#).is_err());
    }

    #[test]
    fn test_threshold_outside_percent_range_is_rejected() {
        let err = load(r#"{"analysis":{"error_threshold_pct":120.0}}"#)
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("error_threshold_pct"), "{err:#}");
        assert!(load(r#"{"analysis":{"error_threshold_pct":-1.0}}"#).is_err());
    }

    #[test]
    fn test_temperature_outside_range_is_rejected() {
        assert!(load(r#"{"feedback":{"temperature":3.5}}"#).is_err());
    }

    #[test]
    fn test_boundary_values_are_accepted() {
        let store = load(
            r#"{"analysis":{"min_confidence":0.0,"error_threshold_pct":100.0,"assumed_fps":0.5}}"#,
        )
        .unwrap();
        assert_eq!(store.get().analysis.assumed_fps, 0.5);
    }

    #[test]
    fn test_update_refuses_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut settings = store.get();
        settings.analysis.assumed_fps = f64::NAN;
        assert!(store.update(settings).is_err());
        assert!(!path.exists());
        assert_eq!(store.get(), Settings::default());
    }
}
