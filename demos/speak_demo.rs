//! Try both engines end to end
//!
//! Run with: cargo run --example speak_demo -- [pyttsx3|google]

use unitts::{EngineOptions, Session, SpeakOutcome};

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let engine = std::env::args().nth(1).unwrap_or_else(|| "google".to_string());
    println!("Testing {} speech synthesis...", engine);

    let mut session = match Session::new(&engine, EngineOptions::default()) {
        Ok(s) => {
            println!("✓ Session created ({} engine)", s.backend());
            s
        }
        Err(e) => {
            eprintln!("✗ Failed to create session: {}", e);
            std::process::exit(1);
        }
    };

    println!("\nAvailable voices:");
    match session.list_voices() {
        Ok(voices) => {
            for voice in voices.iter().take(10) {
                println!("  {} - {} {:?}", voice.id, voice.name, voice.languages);
            }
        }
        Err(e) => eprintln!("✗ Could not list voices: {}", e),
    }

    println!("\nTesting basic speech...");
    match session.speak("Hello from unitts") {
        Ok(SpeakOutcome::NotPlayed(path)) => {
            println!("⚠ Could not play audio automatically. File saved at: {}", path.display())
        }
        Ok(outcome) => println!("✓ Basic speech finished: {:?}", outcome),
        Err(e) => {
            eprintln!("✗ Speech failed: {}", e);
            std::process::exit(1);
        }
    }

    println!("\nTesting rate and volume control...");
    session.set_rate(120).ok();
    session.set_volume(0.5).ok();
    session.speak("This is slow and quiet").ok();
    session.set_rate(200).ok();
    session.set_volume(1.0).ok();
    println!("✓ Rate and volume control test passed");

    println!("\nTesting save to file...");
    let target = std::env::temp_dir().join("unitts_demo");
    match session.save_to_file("This sentence was saved to a file.", &target) {
        Ok(Some(path)) => println!("✓ Saved to {}", path.display()),
        Ok(None) => println!("Nothing to save"),
        Err(e) => eprintln!("✗ Save failed: {}", e),
    }

    session.cleanup();
    println!("\n✓ All tests passed!");
}
