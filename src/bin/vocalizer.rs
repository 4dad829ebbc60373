//! vocalizer: child process that speaks the words found in `WORDS`.
//!
//! Takes no arguments. The words arrive through the environment so no
//! command-line quoting rules apply to them. Output is rendered by piping the
//! words into the configured speech command. Completion is signaled by exit.

use std::io::Write;
use std::path::Path;
use std::process::{Command, ExitCode, Stdio};

use tracing::{debug, error};

use automation_voice::{logging, Config, WORDS_VAR};

/// Binary name of the plugin driver; the speech command must not be it.
const DRIVER_NAME: &str = "automation-voice";

fn main() -> ExitCode {
    let Some(words) = std::env::var_os(WORDS_VAR) else {
        eprintln!("Expected the environment variable {WORDS_VAR} to be set, but it was not set.");
        return ExitCode::from(1);
    };
    let words = words.to_string_lossy().into_owned();

    let config = logging::bootstrap(|| Config::load(None));
    logging::init("vocalizer", false, config.logging.directory.as_deref());

    println!("{words}");

    match render(&config.vocalizer.speech_command, &words) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::from(2)
        }
    }
}

fn render(command: &[String], words: &str) -> Result<(), String> {
    let (program, args) = command
        .split_first()
        .ok_or("vocalizer.speech_command is empty")?;

    // Speaking through the plugin itself would re-enter the host.
    if Path::new(program).file_stem().and_then(|s| s.to_str()) == Some(DRIVER_NAME) {
        return Err(format!("Refusing to render through {program}"));
    }

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to spawn {program}: {e}"))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(words.as_bytes())
            .map_err(|e| format!("Failed to write to {program}: {e}"))?;
    }

    let status = child
        .wait()
        .map_err(|e| format!("{program} failed: {e}"))?;
    if !status.success() {
        return Err(format!("{program} exited with {status}"));
    }

    debug!("Rendered {} characters via {program}", words.chars().count());
    Ok(())
}
