//! Speech engine backends

// On-device TTS using the tts crate (cross-platform)
pub mod native;

// Network TTS via Google Translate, rendered to MP3
pub mod remote;
