//! unitts - one text-to-speech interface over two kinds of engines
//!
//! An on-device engine (via the `tts` crate) speaks directly. A network
//! engine renders MP3 to a temporary file that is played through the
//! best available player on the platform and deleted afterwards.
//!
//! ```no_run
//! use unitts::{EngineOptions, Session};
//!
//! let mut session = Session::new("google", EngineOptions::default())?;
//! session.speak("Hello world")?;
//! session.save_to_file("Saved for later", "hello.mp3")?;
//! # Ok::<(), unitts::TtsError>(())
//! ```

pub mod config;
pub mod error;
pub mod platform;
pub mod playback;
pub mod process;
pub mod scratch;
pub mod session;
pub mod speech;
pub mod text;

pub use config::{Config, EngineOptions};
pub use error::{Result, TtsError};
pub use session::Session;
pub use speech::{Backend, SpeakOutcome, VoiceInfo};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "unitts";
