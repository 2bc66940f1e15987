//! Cross-platform playback through rodio

use log::debug;
use rodio::{Decoder, OutputStream, Sink};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// Decode a file and play it on the default output device, blocking until done
pub fn play_file(path: &Path) -> io::Result<()> {
    let (_stream, handle) = OutputStream::try_default()
        .map_err(|e| other(format!("Failed to get output device: {}", e)))?;

    let file = File::open(path)?;
    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| other(format!("Failed to decode audio: {}", e)))?;

    let sink = Sink::try_new(&handle)
        .map_err(|e| other(format!("Failed to create sink: {}", e)))?;

    sink.append(source);
    sink.sleep_until_end();

    debug!("rodio playback completed");
    Ok(())
}

fn other(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::Other, msg)
}
