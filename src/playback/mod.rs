//! Audio file playback with per-platform fallback
//!
//! Each way of playing a file is a [`Candidate`]. The dispatcher holds an
//! ordered list of them for the current platform and tries each in turn
//! until one plays the file to completion:
//!
//! **Windows:**
//! 1. winmm `PlaySound` (WAV only)
//! 2. PowerShell `System.Media.SoundPlayer` (WAV only)
//! 3. PowerShell `System.Windows.Media.MediaPlayer` (any format, 10s ceiling)
//! 4. rodio
//!
//! **Linux / macOS / others:**
//! 1. rodio
//! 2. `afplay`, `aplay`, `mpg123`, `mpg321`, `play` (SoX)
//!
//! A failed candidate is logged and skipped. Only running out of
//! candidates counts as a failure, and even that is reported as `false`
//! rather than an error.

pub mod helper;
pub mod win;

use crate::platform::{prepare_wsl_audio, Platform};
use crate::process;
use log::{debug, info};
use std::io;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// Pause after successful playback before the file may be deleted,
/// so buffered audio can drain
pub const PLAYBACK_GRACE: Duration = Duration::from_millis(500);

/// Command-line players for Unix, in preference order
const UNIX_PLAYERS: &[(&str, &[&str])] = &[
    ("afplay", &[]),
    ("aplay", &["-q"]),
    ("mpg123", &["-q"]),
    ("mpg321", &["-q"]),
    ("play", &["-q"]),
];

type PlayFn = Box<dyn Fn(&Path) -> io::Result<()>>;

/// One way of playing an audio file to completion
pub struct Candidate {
    name: String,
    play: PlayFn,
}

impl Candidate {
    pub fn new(name: impl Into<String>, play: impl Fn(&Path) -> io::Result<()> + 'static) -> Self {
        Self {
            name: name.into(),
            play: Box::new(play),
        }
    }

    /// Run `program [args...] <file>` and wait for it to exit successfully
    pub fn command(program: &'static str, args: &'static [&'static str]) -> Self {
        Self::new(program, move |path: &Path| {
            let mut cmd = Command::new(program);
            cmd.args(args).arg(path);
            process::run(&mut cmd, None)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attempt(&self, path: &Path) -> io::Result<()> {
        (self.play)(path)
    }
}

/// Ordered playback chain for one platform
pub struct PlaybackDispatcher {
    candidates: Vec<Candidate>,
}

impl PlaybackDispatcher {
    /// Chain for the platform this process runs on
    pub fn new() -> Self {
        let platform = Platform::current();
        if platform == Platform::Unix {
            prepare_wsl_audio();
        }
        Self::for_platform(platform)
    }

    /// Default chain for a given platform
    pub fn for_platform(platform: Platform) -> Self {
        let candidates = match platform {
            Platform::Windows => vec![
                Candidate::new("PlaySound", win::play_sound),
                Candidate::new("PowerShell SoundPlayer", win::sound_player),
                Candidate::new("PowerShell MediaPlayer", win::media_player),
                Candidate::new("rodio", helper::play_file),
            ],
            Platform::Unix => {
                let mut chain = vec![Candidate::new("rodio", helper::play_file)];
                chain.extend(
                    UNIX_PLAYERS
                        .iter()
                        .map(|&(program, args)| Candidate::command(program, args)),
                );
                chain
            }
        };

        Self { candidates }
    }

    /// Chain made of exactly these candidates
    pub fn with_candidates(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// Candidate names in the order they are tried
    pub fn candidate_names(&self) -> Vec<&str> {
        self.candidates.iter().map(Candidate::name).collect()
    }

    /// Play a file, blocking until done
    ///
    /// Returns `true` as soon as one candidate succeeds. Returns `false`
    /// when every candidate failed; the file is left untouched.
    pub fn play(&self, path: &Path) -> bool {
        info!("Playing audio... (file: {})", path.display());

        for candidate in &self.candidates {
            debug!("Trying playback via {}", candidate.name());
            match candidate.attempt(path) {
                Ok(()) => {
                    info!("Audio playback completed via {}", candidate.name());
                    return true;
                }
                Err(e) => debug!("Playback via {} failed: {}", candidate.name(), e),
            }
        }

        debug!("All {} playback candidates failed", self.candidates.len());
        false
    }
}

impl Default for PlaybackDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
