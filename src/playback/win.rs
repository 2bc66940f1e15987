//! Windows playback: winmm `PlaySound` and PowerShell media objects

use crate::process;
use std::io;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// Ceiling for the PowerShell MediaPlayer attempt
pub const MEDIA_PLAYER_TIMEOUT: Duration = Duration::from_secs(10);

/// Reject anything that isn't a WAV file
///
/// `PlaySound` and `System.Media.SoundPlayer` only understand WAV.
pub fn require_wav(path: &Path) -> io::Result<()> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);

    if is_wav {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("{} is not a WAV file", path.display()),
        ))
    }
}

/// Play a WAV file synchronously with `PlaySoundW`
#[cfg(windows)]
pub fn play_sound(path: &Path) -> io::Result<()> {
    use std::os::windows::ffi::OsStrExt;
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::HMODULE;
    use windows::Win32::Media::Audio::{PlaySoundW, SND_FILENAME, SND_NODEFAULT, SND_SYNC};

    require_wav(path)?;

    let wide: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    // SAFETY: `wide` is NUL-terminated and outlives the synchronous call
    let played = unsafe {
        PlaySoundW(
            PCWSTR(wide.as_ptr()),
            HMODULE::default(),
            SND_FILENAME | SND_SYNC | SND_NODEFAULT,
        )
    };

    if played.as_bool() {
        Ok(())
    } else {
        Err(io::Error::new(io::ErrorKind::Other, "PlaySound failed"))
    }
}

#[cfg(not(windows))]
pub fn play_sound(path: &Path) -> io::Result<()> {
    require_wav(path)?;
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "PlaySound is only available on Windows",
    ))
}

/// Play a WAV file with `System.Media.SoundPlayer.PlaySync()`
pub fn sound_player(path: &Path) -> io::Result<()> {
    require_wav(path)?;
    let script = format!(
        "(New-Object Media.SoundPlayer '{}').PlaySync()",
        quote(path)
    );
    process::run(&mut powershell(&script), None)
}

/// Play any format with `System.Windows.Media.MediaPlayer`
///
/// MediaPlayer is asynchronous, so the script waits for the clip
/// duration. The whole attempt is bounded by `MEDIA_PLAYER_TIMEOUT`.
pub fn media_player(path: &Path) -> io::Result<()> {
    process::run(&mut powershell(&media_player_script(path)), Some(MEDIA_PLAYER_TIMEOUT))
}

fn media_player_script(path: &Path) -> String {
    format!(
        r#"
Add-Type -AssemblyName PresentationCore
$player = New-Object System.Windows.Media.MediaPlayer
$player.Open([uri]'{}')
$tries = 0
while (-not $player.NaturalDuration.HasTimeSpan -and $tries -lt 30) {{
    Start-Sleep -Milliseconds 100
    $tries++
}}
$player.Play()
if ($player.NaturalDuration.HasTimeSpan) {{
    Start-Sleep -Milliseconds ([int]$player.NaturalDuration.TimeSpan.TotalMilliseconds)
}} else {{
    Start-Sleep -Seconds 5
}}
$player.Stop()
$player.Close()
"#,
        quote(path)
    )
}

fn powershell(script: &str) -> Command {
    let mut cmd = Command::new("powershell");
    cmd.arg("-NoProfile")
        .arg("-NonInteractive")
        .arg("-Command")
        .arg(script);
    cmd
}

/// Escape a path for a single-quoted PowerShell string
fn quote(path: &Path) -> String {
    path.display().to_string().replace('\'', "''")
}
