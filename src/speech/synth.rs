//! Speech synthesizer abstraction
//!
//! Provides a unified interface over two engines with different
//! execution models. The on-device engine speaks by itself. The network
//! engine can only render MP3, so speaking means rendering to a scratch
//! file, handing it to the playback chain and deleting it afterwards.

use super::backends::native::NativeEngine;
use super::backends::remote::GoogleTranslateEngine;
use crate::config::EngineOptions;
use crate::playback::PlaybackDispatcher;
use crate::scratch::TempFileManager;
use crate::text::with_default_extension;
use crate::{Result, TtsError};
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;
use std::time::Duration;

/// Suffix for network renders in the scratch directory
pub const REMOTE_SUFFIX: &str = ".mp3";

/// Extension added to local renders that have none
pub const LOCAL_EXTENSION: &str = "wav";

/// Languages offered by the network engine
const REMOTE_VOICES: &[(&str, &str)] = &[
    ("en", "English"),
    ("fr", "French"),
    ("es", "Spanish"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("zh", "Chinese"),
];

/// Which engine a session drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// On-device engine, speaks directly
    Local,
    /// Network engine, renders audio files
    Remote,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Local => "local",
            Backend::Remote => "remote",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pyttsx3" | "local" | "native" => Ok(Backend::Local),
            "google" | "gtts" | "remote" => Ok(Backend::Remote),
            _ => Err(TtsError::EngineNotFound(format!(
                "Engine '{}' is not supported. Use 'pyttsx3' or 'google'.",
                s
            ))),
        }
    }
}

/// A voice as reported by an engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
    pub languages: Vec<String>,
}

impl VoiceInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, languages: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            languages,
        }
    }
}

/// The fixed language table of the network engine
pub fn remote_voices() -> Vec<VoiceInfo> {
    REMOTE_VOICES
        .iter()
        .map(|&(id, name)| VoiceInfo::new(id, name, vec![id.to_string()]))
        .collect()
}

/// Clamp a volume into 0.0..=1.0 (NaN becomes silence)
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Capabilities of an on-device engine
///
/// Every call blocks until the engine is done.
pub trait LocalEngine {
    /// Set speaking rate in words per minute
    fn set_rate(&mut self, wpm: u32) -> Result<()>;

    /// Set volume (already clamped to 0.0..=1.0)
    fn set_volume(&mut self, volume: f32) -> Result<()>;

    /// Select a voice by engine id
    fn set_voice(&mut self, id: &str) -> Result<()>;

    /// Speak and return once speech has finished
    fn speak_and_wait(&mut self, text: &str) -> Result<()>;

    /// Render speech into an audio file
    fn render_to_file(&mut self, text: &str, path: &Path) -> Result<()>;

    /// Voices the engine offers right now
    fn voices(&self) -> Result<Vec<VoiceInfo>>;
}

/// One rendering job for a network engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteRequest<'a> {
    pub text: &'a str,
    pub lang: &'a str,
    pub region: &'a str,
    pub slow: bool,
}

/// Capabilities of a network engine: render text to an audio file
pub trait RemoteEngine {
    fn render(&self, request: &RemoteRequest<'_>, path: &Path) -> Result<()>;
}

/// Settings read by the network engine on every call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub lang: String,
    pub region: String,
    pub slow: bool,
}

impl RemoteSettings {
    fn request<'a>(&'a self, text: &'a str) -> RemoteRequest<'a> {
        RemoteRequest {
            text,
            lang: &self.lang,
            region: &self.region,
            slow: self.slow,
        }
    }
}

impl From<&EngineOptions> for RemoteSettings {
    fn from(options: &EngineOptions) -> Self {
        Self {
            lang: options.lang.clone(),
            region: options.region.clone(),
            slow: options.slow,
        }
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self::from(&EngineOptions::default())
    }
}

/// What happened to a `speak` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// Empty text, nothing done
    Skipped,
    /// Spoken directly by the on-device engine
    Spoken,
    /// Rendered, played and the temporary file deleted
    Played,
    /// Played, but the temporary file could not be deleted
    PlayedNotDeleted(PathBuf),
    /// Rendered but no player worked; the file is kept at this path
    NotPlayed(PathBuf),
}

/// Scratch space and players lent to a network `speak`
pub struct Playback<'a> {
    pub scratch: &'a mut TempFileManager,
    pub player: &'a PlaybackDispatcher,
    /// Wait between successful playback and deletion
    pub grace: Duration,
}

/// The two engines behind one interface
pub enum Synthesizer {
    Local {
        engine: Box<dyn LocalEngine>,
    },
    Remote {
        engine: Box<dyn RemoteEngine>,
        settings: RemoteSettings,
    },
}

impl Synthesizer {
    /// Create the real engine for a backend
    pub fn create(backend: Backend) -> Result<Self> {
        info!("Creating {} speech synthesizer", backend);
        match backend {
            Backend::Local => Ok(Self::local(
                NativeEngine::new().map_err(uniform("Failed to initialize local engine"))?,
            )),
            Backend::Remote => Ok(Self::remote(
                GoogleTranslateEngine::new().map_err(uniform("Failed to initialize network engine"))?,
            )),
        }
    }

    pub fn local(engine: impl LocalEngine + 'static) -> Self {
        Synthesizer::Local {
            engine: Box::new(engine),
        }
    }

    pub fn remote(engine: impl RemoteEngine + 'static) -> Self {
        Synthesizer::Remote {
            engine: Box::new(engine),
            settings: RemoteSettings::default(),
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Synthesizer::Local { .. } => Backend::Local,
            Synthesizer::Remote { .. } => Backend::Remote,
        }
    }

    /// Apply every option this engine understands
    pub fn configure(&mut self, options: &EngineOptions) -> Result<()> {
        if let Synthesizer::Remote { settings, .. } = self {
            *settings = RemoteSettings::from(options);
            return Ok(());
        }

        if let Some(rate) = options.rate {
            self.set_rate(rate)?;
        }
        if let Some(volume) = options.volume {
            self.set_volume(volume)?;
        }
        if let Some(voice) = &options.voice {
            self.set_voice(voice)?;
        }
        Ok(())
    }

    pub fn set_rate(&mut self, wpm: u32) -> Result<()> {
        match self {
            Synthesizer::Local { engine } => engine
                .set_rate(wpm)
                .map_err(uniform("Error setting speech rate")),
            Synthesizer::Remote { .. } => {
                debug!("Rate is not adjustable on the network engine, ignoring {}", wpm);
                Ok(())
            }
        }
    }

    /// Set volume, clamped to 0.0..=1.0
    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        match self {
            Synthesizer::Local { engine } => engine
                .set_volume(clamp_volume(volume))
                .map_err(uniform("Error setting speech volume")),
            Synthesizer::Remote { .. } => {
                debug!("Volume is not adjustable on the network engine, ignoring {}", volume);
                Ok(())
            }
        }
    }

    /// Select a voice id (local) or language code (network)
    pub fn set_voice(&mut self, id: &str) -> Result<()> {
        match self {
            Synthesizer::Local { engine } => {
                engine.set_voice(id).map_err(uniform("Error setting voice"))
            }
            Synthesizer::Remote { settings, .. } => {
                settings.lang = id.to_string();
                Ok(())
            }
        }
    }

    /// Render speech straight to `path`
    ///
    /// Local renders get a `.wav` extension when `path` has none. Returns
    /// the path actually written.
    pub fn synthesize_to_file(&mut self, text: &str, path: &Path) -> Result<PathBuf> {
        match self {
            Synthesizer::Local { engine } => {
                let path = with_default_extension(path, LOCAL_EXTENSION);
                engine
                    .render_to_file(text, &path)
                    .map_err(uniform("Error saving speech to file"))?;
                Ok(path)
            }
            Synthesizer::Remote { engine, settings } => {
                engine
                    .render(&settings.request(text), path)
                    .map_err(uniform("Error saving speech to file"))?;
                Ok(path.to_path_buf())
            }
        }
    }

    /// Speak text, blocking until playback is over
    ///
    /// The network path leaves the rendered file in place (and tracked,
    /// but preserved) when no player could play it.
    pub fn synthesize_and_speak(
        &mut self,
        text: &str,
        playback: Playback<'_>,
    ) -> Result<SpeakOutcome> {
        match self {
            Synthesizer::Local { engine } => {
                engine
                    .speak_and_wait(text)
                    .map_err(uniform("Error during speech synthesis"))?;
                Ok(SpeakOutcome::Spoken)
            }
            Synthesizer::Remote { engine, settings } => {
                let path = playback
                    .scratch
                    .allocate(REMOTE_SUFFIX)
                    .map_err(uniform("Error during speech synthesis"))?;

                engine
                    .render(&settings.request(text), &path)
                    .map_err(uniform("Error during network TTS processing"))?;

                if !playback.player.play(&path) {
                    playback.scratch.preserve(&path);
                    warn!(
                        "Could not play audio automatically. File saved at: {}",
                        path.display()
                    );
                    warn!("You can play this file manually.");
                    return Ok(SpeakOutcome::NotPlayed(path));
                }

                // Let buffered audio drain before the file goes away
                thread::sleep(playback.grace);

                if playback.scratch.release(&path) {
                    Ok(SpeakOutcome::Played)
                } else {
                    Ok(SpeakOutcome::PlayedNotDeleted(path))
                }
            }
        }
    }

    /// Voices offered by the engine, queried fresh on every call
    pub fn voices(&self) -> Result<Vec<VoiceInfo>> {
        match self {
            Synthesizer::Local { engine } => engine.voices().map_err(uniform("Error listing voices")),
            Synthesizer::Remote { .. } => Ok(remote_voices()),
        }
    }
}

/// Fold any engine error into `TtsError::Synthesis`, prefixed with context
fn uniform(context: &'static str) -> impl Fn(TtsError) -> TtsError {
    move |err| match err {
        TtsError::Synthesis(msg) => TtsError::Synthesis(format!("{}: {}", context, msg)),
        other => TtsError::synthesis(context, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_names() {
        assert_eq!("pyttsx3".parse::<Backend>().unwrap(), Backend::Local);
        assert_eq!("Native".parse::<Backend>().unwrap(), Backend::Local);
        assert_eq!("google".parse::<Backend>().unwrap(), Backend::Remote);
        assert_eq!(" GTTS ".parse::<Backend>().unwrap(), Backend::Remote);
    }

    #[test]
    fn test_unknown_backend() {
        let err = "festival".parse::<Backend>().unwrap_err();
        assert!(matches!(err, TtsError::EngineNotFound(_)));
        assert!(err.to_string().contains("festival"));
    }

    #[test]
    fn test_clamp_volume() {
        assert_eq!(clamp_volume(-0.5), 0.0);
        assert_eq!(clamp_volume(1.7), 1.0);
        assert_eq!(clamp_volume(0.3), 0.3);
        assert_eq!(clamp_volume(f32::NAN), 0.0);
    }

    #[test]
    fn test_remote_voice_table() {
        let voices = remote_voices();
        assert_eq!(voices.len(), 10);
        assert_eq!(voices[0], VoiceInfo::new("en", "English", vec!["en".into()]));
        assert!(voices.iter().any(|v| v.id == "zh" && v.name == "Chinese"));
    }

    #[test]
    fn test_uniform_wraps_other_errors() {
        let io = TtsError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        match uniform("Error saving speech to file")(io) {
            TtsError::Synthesis(msg) => {
                assert!(msg.starts_with("Error saving speech to file"));
                assert!(msg.contains("disk full"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_remote_settings_from_options() {
        let options = EngineOptions {
            lang: "pt".into(),
            region: "com.br".into(),
            slow: true,
            ..EngineOptions::default()
        };
        let settings = RemoteSettings::from(&options);
        let request = settings.request("Olá");
        assert_eq!(request.lang, "pt");
        assert_eq!(request.region, "com.br");
        assert!(request.slow);
        assert_eq!(request.text, "Olá");
    }
}
