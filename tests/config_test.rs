//! Configuration loading tests
//!
//! Tests that settings files load correctly and feed sessions.

use std::time::Duration;
use tempfile::TempDir;
use unitts::{Config, Session, TtsError};

#[test]
fn test_config_loads_successfully() {
    let tmp = TempDir::new().unwrap();
    let config = Config::from_path(tmp.path().join("unitts.cfg")).expect("Failed to load config");

    assert_eq!(config.engine(), "pyttsx3");
    let options = config.options();
    assert_eq!(options.lang, "en");
    assert_eq!(options.region, "com");
    assert!(!options.slow);
    assert_eq!(config.playback_grace(), Duration::from_millis(500));
}

#[test]
fn test_config_methods() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("unitts.cfg");
    std::fs::write(
        &path,
        "[speech]\nengine = google\nvoice = \nvolume = 0.25\n[scratch]\nprefix = clip\n",
    )
    .unwrap();

    let config = Config::from_path(&path).unwrap();
    assert!(config.path().to_str().unwrap().contains("unitts.cfg"));
    assert_eq!(config.engine(), "google");
    assert_eq!(config.options().voice, None);
    assert_eq!(config.options().volume, Some(0.25));
    assert_eq!(config.scratch_prefix(), "clip");
}

#[test]
fn test_unknown_engine_in_config() {
    let config = Config::from_ini_str("[speech]\nengine = festival\n", "unused.cfg").unwrap();
    assert!(matches!(
        Session::from_config(&config),
        Err(TtsError::EngineNotFound(_))
    ));
}

#[test]
fn test_session_from_config_uses_scratch_settings() {
    let tmp = TempDir::new().unwrap();
    let scratch = tmp.path().join("audio");
    let text = format!(
        "[speech]\nengine = google\nlang = es\n[scratch]\ndir = {}\n",
        scratch.display()
    );
    let config = Config::from_ini_str(&text, tmp.path().join("unitts.cfg")).unwrap();

    let session = Session::from_config(&config).expect("network engine needs no device");
    assert_eq!(session.scratch_dir(), scratch.as_path());
    assert_eq!(session.options().lang, "es");
}
