//! Configuration management
//!
//! Engine options can be built in code, parsed from JSON, or read from
//! the `[speech]` section of `~/.unitts.cfg`.

use crate::playback::PLAYBACK_GRACE;
use crate::scratch::{DEFAULT_DIR_NAME, DEFAULT_PREFIX};
use crate::{Result, TtsError};
use ini::Ini;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options understood by the synthesis backends
///
/// Each backend reads only the keys it knows: `rate`, `volume` and
/// `voice` drive the local engine, `lang`, `region` and `slow` the
/// network engine. Unknown keys in JSON input are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Speaking rate in words per minute
    pub rate: Option<u32>,

    /// Volume, 0.0 to 1.0
    pub volume: Option<f32>,

    /// Backend-specific voice id
    pub voice: Option<String>,

    /// Language code for network synthesis
    pub lang: String,

    /// Regional variant (top-level domain of the service host)
    pub region: String,

    /// Slower network speech
    pub slow: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            rate: None,
            volume: None,
            voice: None,
            lang: "en".to_string(),
            region: "com".to_string(),
            slow: false,
        }
    }
}

impl EngineOptions {
    /// Parse options from a JSON object
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Settings file for sessions
pub struct Config {
    /// INI configuration storage
    ini: Ini,

    /// Config file path (~/.unitts.cfg)
    path: PathBuf,
}

impl Config {
    /// Load configuration from disk or create default
    pub fn load() -> Result<Self> {
        Self::from_path(Self::config_path())
    }

    /// Load from a specific file, writing defaults there if it's missing
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(&path)
                .map_err(|e| TtsError::IniParse(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file not found, creating default");
            let default = Self::default_config();
            default
                .write_to_file(&path)
                .map_err(|e| TtsError::IniParse(format!("Failed to write config: {}", e)))?;
            default
        };

        Ok(Self { ini, path })
    }

    /// Parse configuration from INI text (not backed by a file until saved)
    pub fn from_ini_str(text: &str, path: impl Into<PathBuf>) -> Result<Self> {
        let ini = Ini::load_from_str(text)
            .map_err(|e| TtsError::IniParse(format!("Failed to parse config: {}", e)))?;
        Ok(Self {
            ini,
            path: path.into(),
        })
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving config to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| TtsError::Config(format!("Failed to save config: {}", e)))
    }

    /// Get config file path (~/.unitts.cfg)
    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".unitts.cfg")
    }

    /// Expose the config file path for display
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create default configuration
    fn default_config() -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("speech"))
            .set("engine", "pyttsx3")
            .set("lang", "en")
            .set("region", "com")
            .set("slow", "false");

        ini.with_section(Some("scratch"))
            .set("prefix", DEFAULT_PREFIX)
            .set("playback_grace_ms", PLAYBACK_GRACE.as_millis().to_string());

        ini
    }

    /// Get a boolean value from config
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get a string value from config
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .to_string()
    }

    /// Get an integer value from config
    pub fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Set a value in config
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    /// Backend name (`pyttsx3`, `google`, ...)
    pub fn engine(&self) -> String {
        self.get_string("speech", "engine", "pyttsx3")
    }

    /// Engine options from the `[speech]` section
    pub fn options(&self) -> EngineOptions {
        let defaults = EngineOptions::default();
        EngineOptions {
            rate: self.get_int("speech", "rate", -1).try_into().ok(),
            volume: self
                .ini
                .get_from(Some("speech"), "volume")
                .and_then(|v| v.parse().ok()),
            voice: self
                .ini
                .get_from(Some("speech"), "voice")
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            lang: self.get_string("speech", "lang", &defaults.lang),
            region: self.get_string("speech", "region", &defaults.region),
            slow: self.get_bool("speech", "slow", defaults.slow),
        }
    }

    /// Scratch directory for temporary audio
    pub fn scratch_dir(&self) -> PathBuf {
        self.ini
            .get_from(Some("scratch"), "dir")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DIR_NAME))
    }

    /// File name prefix for temporary audio
    pub fn scratch_prefix(&self) -> String {
        self.get_string("scratch", "prefix", DEFAULT_PREFIX)
    }

    /// Pause between successful playback and deletion
    pub fn playback_grace(&self) -> Duration {
        let ms = self.get_int("scratch", "playback_grace_ms", PLAYBACK_GRACE.as_millis() as i64);
        Duration::from_millis(ms.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_defaults() {
        let opts = EngineOptions::default();
        assert_eq!(opts.lang, "en");
        assert_eq!(opts.region, "com");
        assert!(!opts.slow);
        assert!(opts.rate.is_none());
        assert!(opts.volume.is_none());
        assert!(opts.voice.is_none());
    }

    #[test]
    fn test_options_from_json_ignores_unknown_keys() {
        let opts =
            EngineOptions::from_json(r#"{"rate": 150, "lang": "fr", "pitch": 3, "tld": "fr"}"#)
                .unwrap();
        assert_eq!(opts.rate, Some(150));
        assert_eq!(opts.lang, "fr");
        assert_eq!(opts.region, "com");
    }

    #[test]
    fn test_options_from_bad_json() {
        assert!(matches!(
            EngineOptions::from_json("[1, 2"),
            Err(TtsError::Config(_))
        ));
    }

    #[test]
    fn test_ini_options() {
        let config = Config::from_ini_str(
            "[speech]\nengine = google\nrate = 180\nvolume = 0.4\nlang = de\nslow = true\n",
            "test.cfg",
        )
        .unwrap();

        assert_eq!(config.engine(), "google");
        let opts = config.options();
        assert_eq!(opts.rate, Some(180));
        assert_eq!(opts.volume, Some(0.4));
        assert_eq!(opts.voice, None);
        assert_eq!(opts.lang, "de");
        assert_eq!(opts.region, "com");
        assert!(opts.slow);
    }

    #[test]
    fn test_negative_rate_is_unset() {
        let config = Config::from_ini_str("[speech]\nrate = -5\n", "test.cfg").unwrap();
        assert_eq!(config.options().rate, None);
    }

    #[test]
    fn test_scratch_settings() {
        let config = Config::from_ini_str(
            "[scratch]\ndir = /tmp/unitts-test\nprefix = clip\nplayback_grace_ms = 20\n",
            "test.cfg",
        )
        .unwrap();

        assert_eq!(config.scratch_dir(), PathBuf::from("/tmp/unitts-test"));
        assert_eq!(config.scratch_prefix(), "clip");
        assert_eq!(config.playback_grace(), Duration::from_millis(20));
    }

    #[test]
    fn test_scratch_defaults() {
        let config = Config::from_ini_str("", "test.cfg").unwrap();
        assert_eq!(config.scratch_dir(), std::env::temp_dir().join(DEFAULT_DIR_NAME));
        assert_eq!(config.scratch_prefix(), DEFAULT_PREFIX);
        assert_eq!(config.playback_grace(), PLAYBACK_GRACE);
        assert_eq!(config.engine(), "pyttsx3");
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unitts.cfg");

        let config = Config::from_path(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.engine(), "pyttsx3");
        assert_eq!(config.path(), path.as_path());
    }

    #[test]
    fn test_set_and_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unitts.cfg");

        let mut config = Config::from_path(&path).unwrap();
        config.set("speech", "engine", "google");
        config.set("speech", "lang", "ja");
        config.save().unwrap();

        let reloaded = Config::from_path(&path).unwrap();
        assert_eq!(reloaded.engine(), "google");
        assert_eq!(reloaded.options().lang, "ja");
    }
}
