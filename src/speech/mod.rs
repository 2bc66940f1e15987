//! Speech synthesis system

pub mod backends;
pub mod synth;

pub use synth::{
    clamp_volume, remote_voices, Backend, LocalEngine, Playback, RemoteEngine, RemoteRequest,
    RemoteSettings, SpeakOutcome, Synthesizer, VoiceInfo,
};
