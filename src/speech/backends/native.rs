//! On-device TTS backend using the tts crate
//!
//! The `tts` crate provides a unified interface to:
//! - Speech Dispatcher on Linux (via native bindings)
//! - AVFoundation on macOS/iOS
//! - WinRT / SAPI on Windows
//!
//! It has no file output, so rendering to a file goes through the
//! `espeak-ng` command with the same rate, volume and language.

use crate::process;
use crate::speech::{LocalEngine, VoiceInfo};
use crate::{Result, TtsError};
use log::{debug, warn};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use tts::{Tts as TtsCrate, UtteranceId};

/// Words per minute treated as the engine's normal rate
const NORMAL_WPM: f32 = 200.0;

/// Words per minute mapped to the engine's minimum and maximum rate
const MIN_WPM: f32 = 80.0;
const MAX_WPM: f32 = 450.0;

/// How often `is_speaking` is polled while waiting for speech to end
const SPEAKING_POLL: Duration = Duration::from_millis(50);

/// How long to wait for queued speech to start before giving up on it
const SPEECH_START_LIMIT: Duration = Duration::from_secs(5);

/// Native TTS engine
pub struct NativeEngine {
    /// The tts crate's TTS instance
    tts: TtsCrate,

    /// Rate in words per minute, also used for file renders
    rate: Option<u32>,

    /// Volume 0.0-1.0, also used for file renders
    volume: Option<f32>,

    /// Language of the selected voice, passed to espeak-ng
    voice_lang: Option<String>,
}

impl NativeEngine {
    /// Initialize the platform TTS engine
    pub fn new() -> Result<Self> {
        debug!("Creating native TTS backend");

        let tts = TtsCrate::default()
            .map_err(|e| TtsError::Synthesis(format!("Failed to initialize TTS: {}", e)))?;

        debug!("Native TTS backend created successfully");

        Ok(Self {
            tts,
            rate: None,
            volume: None,
            voice_lang: None,
        })
    }

    /// Map words per minute onto the engine's own rate range
    ///
    /// `NORMAL_WPM` lands on the normal rate; slower and faster rates are
    /// interpolated towards the engine minimum and maximum.
    fn convert_rate(wpm: u32, min: f32, normal: f32, max: f32) -> f32 {
        let wpm = (wpm as f32).clamp(MIN_WPM, MAX_WPM);
        if wpm <= NORMAL_WPM {
            min + (normal - min) * (wpm - MIN_WPM) / (NORMAL_WPM - MIN_WPM)
        } else {
            normal + (max - normal) * (wpm - NORMAL_WPM) / (MAX_WPM - NORMAL_WPM)
        }
    }

    /// Map 0.0-1.0 onto the engine's volume range
    fn convert_volume(volume: f32, min: f32, max: f32) -> f32 {
        min + (max - min) * volume
    }

    /// Convert a 0.0-1.0 volume to espeak amplitude (0-200, 100 is normal)
    fn espeak_amplitude(volume: f32) -> u32 {
        (volume.clamp(0.0, 1.0) * 100.0).round() as u32
    }

    /// Find an espeak executable
    fn find_espeak() -> Result<&'static str> {
        for path in ["espeak-ng", "espeak"] {
            if let Ok(status) = Command::new(path)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
            {
                if status.success() {
                    return Ok(path);
                }
            }
        }

        Err(TtsError::Synthesis(
            "espeak-ng not found. Install with: sudo apt install espeak-ng".to_string(),
        ))
    }

    /// Speak and block until the engine reports this utterance ended
    /// or was stopped
    fn speak_until_end(&mut self, text: &str) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let stop_tx = tx.clone();
        self.tts
            .on_utterance_end(Some(Box::new(move |id: UtteranceId| {
                let _ = tx.send(id);
            })))
            .map_err(|e| TtsError::Synthesis(format!("Failed to watch speech: {}", e)))?;
        self.tts
            .on_utterance_stop(Some(Box::new(move |id: UtteranceId| {
                let _ = stop_tx.send(id);
            })))
            .map_err(|e| TtsError::Synthesis(format!("Failed to watch speech: {}", e)))?;

        let spoken = self
            .tts
            .speak(text, false)
            .map_err(|e| TtsError::Synthesis(format!("Speak failed: {}", e)));

        let result = spoken.map(|utterance| {
            let finished = match utterance {
                Some(utterance) => wait_for_utterance(&rx, |id| same_utterance(id, &utterance)),
                None => wait_for_utterance(&rx, |_| true),
            };
            if !finished {
                warn!("Speech engine dropped its callbacks before the utterance ended");
            }
        });

        // Unregistering drops the senders held by the callbacks
        let _ = self.tts.on_utterance_end(None);
        let _ = self.tts.on_utterance_stop(None);
        result
    }

    fn espeak_command(&self, espeak: &str, text: &str, path: &Path) -> Command {
        let mut cmd = Command::new(espeak);
        cmd.arg("-w").arg(path);
        cmd.arg("-s")
            .arg(self.rate.unwrap_or(NORMAL_WPM as u32).to_string());
        cmd.arg("-a")
            .arg(Self::espeak_amplitude(self.volume.unwrap_or(1.0)).to_string());
        if let Some(lang) = &self.voice_lang {
            cmd.arg("-v").arg(lang.to_lowercase());
        }
        // Text after `--` so a leading dash isn't read as an option
        cmd.arg("--").arg(text);
        cmd
    }
}

/// Block until `rx` yields an id accepted by `matches`
///
/// Returns `false` if every sender went away first.
fn wait_for_utterance<T>(rx: &Receiver<T>, matches: impl Fn(&T) -> bool) -> bool {
    while let Ok(id) = rx.recv() {
        if matches(&id) {
            return true;
        }
        debug!("Ignoring end of an earlier utterance");
    }
    false
}

#[cfg(not(any(target_os = "macos", target_os = "ios")))]
fn same_utterance(a: &UtteranceId, b: &UtteranceId) -> bool {
    a == b
}

// AVFoundation ids are opaque object pointers without equality; callbacks
// are registered per utterance, so any end belongs to this one.
#[cfg(any(target_os = "macos", target_os = "ios"))]
fn same_utterance(_: &UtteranceId, _: &UtteranceId) -> bool {
    true
}

/// Wait for speech to begin, then for it to finish
///
/// The speaking flag only turns on once the engine actually starts, which
/// can lag behind `speak` returning. If it never turns on within
/// `start_limit` the utterance is assumed done (or dropped).
fn wait_while_speaking(
    mut speaking: impl FnMut() -> Result<bool>,
    start_limit: Duration,
    poll: Duration,
) -> Result<()> {
    let started = Instant::now();
    while !speaking()? {
        if started.elapsed() >= start_limit {
            debug!("Speech didn't start within {:?}", start_limit);
            return Ok(());
        }
        thread::sleep(poll);
    }

    while speaking()? {
        thread::sleep(poll);
    }
    Ok(())
}

impl LocalEngine for NativeEngine {
    fn set_rate(&mut self, wpm: u32) -> Result<()> {
        debug!("Setting rate to {} wpm", wpm);
        self.rate = Some(wpm);

        let features = self.tts.supported_features();
        if !features.rate {
            warn!("Rate control not supported on this platform");
            return Ok(());
        }

        let rate = Self::convert_rate(
            wpm,
            self.tts.min_rate(),
            self.tts.normal_rate(),
            self.tts.max_rate(),
        );
        self.tts
            .set_rate(rate)
            .map_err(|e| TtsError::Synthesis(format!("Failed to set rate: {}", e)))?;

        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        debug!("Setting volume to {}", volume);
        self.volume = Some(volume);

        let features = self.tts.supported_features();
        if !features.volume {
            warn!("Volume control not supported on this platform");
            return Ok(());
        }

        let converted = Self::convert_volume(volume, self.tts.min_volume(), self.tts.max_volume());
        self.tts
            .set_volume(converted)
            .map_err(|e| TtsError::Synthesis(format!("Failed to set volume: {}", e)))?;

        Ok(())
    }

    fn set_voice(&mut self, id: &str) -> Result<()> {
        debug!("Setting voice to {}", id);

        let voices = self
            .tts
            .voices()
            .map_err(|e| TtsError::Synthesis(format!("Failed to get voices: {}", e)))?;

        let voice = voices
            .iter()
            .find(|v| v.id() == id)
            .ok_or_else(|| TtsError::Synthesis(format!("Voice '{}' not found", id)))?;

        self.tts
            .set_voice(voice)
            .map_err(|e| TtsError::Synthesis(format!("Failed to set voice: {}", e)))?;
        self.voice_lang = Some(voice.language().to_string());

        Ok(())
    }

    fn speak_and_wait(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        debug!("Speaking: {}", text);
        let features = self.tts.supported_features();
        if features.utterance_callbacks {
            return self.speak_until_end(text);
        }

        self.tts
            .speak(text, false)
            .map_err(|e| TtsError::Synthesis(format!("Speak failed: {}", e)))?;

        if !features.is_speaking {
            debug!("Engine can't report speaking state, returning without waiting");
            return Ok(());
        }

        let tts = &self.tts;
        wait_while_speaking(
            || {
                tts.is_speaking().map_err(|e| {
                    TtsError::Synthesis(format!("Speaking state unavailable: {}", e))
                })
            },
            SPEECH_START_LIMIT,
            SPEAKING_POLL,
        )
    }

    fn render_to_file(&mut self, text: &str, path: &Path) -> Result<()> {
        let espeak = Self::find_espeak()?;
        debug!("Rendering to {:?} with {}", path, espeak);

        process::run(&mut self.espeak_command(espeak, text, path), None)
            .map_err(|e| TtsError::Synthesis(format!("{} failed: {}", espeak, e)))
    }

    fn voices(&self) -> Result<Vec<VoiceInfo>> {
        let voices = self
            .tts
            .voices()
            .map_err(|e| TtsError::Synthesis(format!("Failed to get voices: {}", e)))?;

        Ok(voices
            .iter()
            .map(|v| VoiceInfo::new(v.id(), v.name(), vec![v.language().to_string()]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_engine() {
        // Fails without speech-dispatcher or in CI without audio
        match NativeEngine::new() {
            Ok(_) => println!("✓ Native TTS backend initialized successfully"),
            Err(e) => println!("⚠ TTS initialization failed (may be expected in CI): {}", e),
        }
    }

    #[test]
    fn test_rate_conversion() {
        // speech-dispatcher style range
        assert_eq!(NativeEngine::convert_rate(200, -100.0, 0.0, 100.0), 0.0);
        assert_eq!(NativeEngine::convert_rate(80, -100.0, 0.0, 100.0), -100.0);
        assert_eq!(NativeEngine::convert_rate(450, -100.0, 0.0, 100.0), 100.0);
        assert_eq!(NativeEngine::convert_rate(140, -100.0, 0.0, 100.0), -50.0);

        // Out of range input is clamped
        assert_eq!(NativeEngine::convert_rate(10, 0.1, 1.0, 10.0), 0.1);
        assert_eq!(NativeEngine::convert_rate(1000, 0.1, 1.0, 10.0), 10.0);
    }

    #[test]
    fn test_volume_conversion() {
        assert_eq!(NativeEngine::convert_volume(0.0, 0.0, 1.0), 0.0);
        assert_eq!(NativeEngine::convert_volume(0.5, 0.0, 1.0), 0.5);
        assert_eq!(NativeEngine::convert_volume(1.0, 0.0, 100.0), 100.0);
    }

    #[test]
    fn test_waits_for_late_start() {
        // Not speaking for a few polls, then speaking for a few more
        let states = [false, false, false, true, true, true, false];
        let mut calls = 0;
        wait_while_speaking(
            || {
                let state = states[calls.min(states.len() - 1)];
                calls += 1;
                Ok(state)
            },
            Duration::from_secs(5),
            Duration::from_millis(1),
        )
        .unwrap();
        assert_eq!(calls, states.len());
    }

    #[test]
    fn test_speech_that_never_starts_is_bounded() {
        let limit = Duration::from_millis(30);
        let started = Instant::now();
        wait_while_speaking(|| Ok(false), limit, Duration::from_millis(1)).unwrap();
        assert!(started.elapsed() >= limit);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_speaking_state_error_propagates() {
        let result = wait_while_speaking(
            || Err(TtsError::Synthesis("gone".into())),
            Duration::from_secs(1),
            Duration::from_millis(1),
        );
        assert!(matches!(result, Err(TtsError::Synthesis(_))));
    }

    #[test]
    fn test_waits_for_matching_utterance_end() {
        let (tx, rx) = mpsc::channel();
        let late = thread::spawn(move || {
            tx.send(1u64).unwrap();
            thread::sleep(Duration::from_millis(20));
            tx.send(2u64).unwrap();
        });
        assert!(wait_for_utterance(&rx, |id| *id == 2));
        late.join().unwrap();
    }

    #[test]
    fn test_utterance_wait_ends_when_callbacks_drop() {
        let (tx, rx) = mpsc::channel::<u64>();
        tx.send(7).unwrap();
        drop(tx);
        assert!(!wait_for_utterance(&rx, |id| *id == 8));
    }

    #[test]
    fn test_espeak_amplitude() {
        assert_eq!(NativeEngine::espeak_amplitude(0.0), 0);
        assert_eq!(NativeEngine::espeak_amplitude(0.5), 50);
        assert_eq!(NativeEngine::espeak_amplitude(1.0), 100);
    }
}
