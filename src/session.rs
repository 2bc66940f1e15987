//! Session facade
//!
//! A [`Session`] ties one synthesizer to a scratch directory and a
//! playback chain. It owns the cleanup contract: every `speak` ends with
//! a sweep of the temporary files it tracked, and `cleanup()` or dropping
//! the session removes whatever is left in the scratch directory.

use crate::config::{Config, EngineOptions};
use crate::playback::{PlaybackDispatcher, PLAYBACK_GRACE};
use crate::scratch::{TempFile, TempFileManager};
use crate::speech::{clamp_volume, Backend, Playback, SpeakOutcome, Synthesizer, VoiceInfo};
use crate::text::ensure_parent_dir;
use crate::{Result, TtsError};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One text-to-speech session
pub struct Session {
    /// Current options, kept in step with every setter
    options: EngineOptions,

    synth: Synthesizer,

    /// Temporary audio for network speech
    scratch: TempFileManager,

    player: PlaybackDispatcher,

    /// Wait between successful playback and deleting the file
    grace: Duration,
}

impl Session {
    /// Create a session for a named engine
    ///
    /// `pyttsx3`/`local`/`native` pick the on-device engine,
    /// `google`/`gtts`/`remote` the network engine. Any other name fails
    /// with [`TtsError::EngineNotFound`].
    pub fn new(engine: &str, options: EngineOptions) -> Result<Self> {
        let backend: Backend = engine.parse()?;
        let synth = Synthesizer::create(backend)?;
        Self::from_parts(synth, options, TempFileManager::new(), PlaybackDispatcher::new())
    }

    /// Create a session from a settings file
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend: Backend = config.engine().parse()?;
        let synth = Synthesizer::create(backend)?;
        let scratch =
            TempFileManager::with_dir(config.scratch_dir()).with_prefix(config.scratch_prefix());

        let session = Self::from_parts(synth, config.options(), scratch, PlaybackDispatcher::new())?;
        Ok(session.with_playback_grace(config.playback_grace()))
    }

    /// Assemble a session from ready-made parts, applying `options`
    pub fn from_parts(
        mut synth: Synthesizer,
        mut options: EngineOptions,
        scratch: TempFileManager,
        player: PlaybackDispatcher,
    ) -> Result<Self> {
        options.volume = options.volume.map(clamp_volume);
        synth.configure(&options)?;

        info!(
            "Temporary audio files will be stored in: {}",
            scratch.dir().display()
        );

        Ok(Self {
            options,
            synth,
            scratch,
            player,
            grace: PLAYBACK_GRACE,
        })
    }

    /// Override the pause between playback and deletion
    pub fn with_playback_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn backend(&self) -> Backend {
        self.synth.backend()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.dir()
    }

    /// Temporary files created and not yet deleted
    pub fn tracked_files(&self) -> &[TempFile] {
        self.scratch.tracked()
    }

    /// Speak text, blocking until it has been heard
    ///
    /// Empty text does nothing. Playback problems are not errors: they are
    /// logged and reported through the returned [`SpeakOutcome`].
    pub fn speak(&mut self, text: &str) -> Result<SpeakOutcome> {
        if text.is_empty() {
            return Ok(SpeakOutcome::Skipped);
        }

        let result = self.synth.synthesize_and_speak(
            text,
            Playback {
                scratch: &mut self.scratch,
                player: &self.player,
                grace: self.grace,
            },
        );

        // Runs on success and failure alike
        let stuck = self.scratch.release_transient();
        if stuck > 0 {
            debug!("{} temporary file(s) could not be removed after speak", stuck);
        }

        match &result {
            Ok(SpeakOutcome::PlayedNotDeleted(path)) => warn!(
                "Speech played but {} could not be deleted; it will be removed on cleanup",
                path.display()
            ),
            Ok(SpeakOutcome::NotPlayed(path)) => warn!(
                "Speech rendered but not played. You can play {} manually.",
                path.display()
            ),
            Ok(outcome) => debug!("Speak finished: {:?}", outcome),
            Err(e) => debug!("Speak failed: {}", e),
        }

        result
    }

    /// Render speech to a file without playing it
    ///
    /// Empty text does nothing and returns `None`. Otherwise returns the
    /// path written, which gains a `.wav` extension on the local engine
    /// when `path` has none.
    pub fn save_to_file(
        &mut self,
        text: &str,
        path: impl AsRef<Path>,
    ) -> Result<Option<PathBuf>> {
        if text.is_empty() {
            return Ok(None);
        }

        let path = path.as_ref();
        ensure_parent_dir(path)
            .map_err(|e| TtsError::synthesis("Error saving speech to file", e))?;

        let written = self.synth.synthesize_to_file(text, path)?;
        info!("Saved speech to {}", written.display());
        Ok(Some(written))
    }

    /// Set speaking rate in words per minute (ignored by the network engine)
    pub fn set_rate(&mut self, wpm: u32) -> Result<()> {
        self.synth.set_rate(wpm)?;
        self.options.rate = Some(wpm);
        Ok(())
    }

    /// Set volume, clamped to 0.0..=1.0 (ignored by the network engine)
    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        let volume = clamp_volume(volume);
        self.synth.set_volume(volume)?;
        self.options.volume = Some(volume);
        Ok(())
    }

    /// Select a voice id, or a language code on the network engine
    pub fn set_voice(&mut self, id: &str) -> Result<()> {
        self.synth.set_voice(id)?;
        match self.backend() {
            Backend::Local => self.options.voice = Some(id.to_string()),
            Backend::Remote => self.options.lang = id.to_string(),
        }
        Ok(())
    }

    /// Voices available from the engine right now
    pub fn list_voices(&self) -> Result<Vec<VoiceInfo>> {
        self.synth.voices()
    }

    /// Remove every temporary file, tracked or not
    ///
    /// Safe to call repeatedly; dropping the session does the same.
    pub fn cleanup(&mut self) {
        info!("Cleaning up all temporary files...");
        self.scratch.teardown();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!("Shutting down {} session", self.backend());
        self.scratch.teardown();
    }
}
