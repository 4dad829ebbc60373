//! Integration tests: the real `vocalizer` binary under the supervisor.
//!
//! Each run gets its own working directory holding an `automation-voice.yaml`
//! whose speech command is slow and leaves a marker file when it finishes, so
//! a marker appearing after an abort means the speech command outlived it.

#![cfg(unix)]

use std::fs;
use std::io::Read;
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use automation_voice::config::VocalizerConfig;
use automation_voice::{
    AbortSignal, BookmarkEvent, EngineSite, FragmentSequencer, LocalRelayClient, SiteError,
    TextFragment, VocalizationSupervisor, Vocalize, VocalizeOutcome,
};

const VOCALIZER: &str = env!("CARGO_BIN_EXE_vocalizer");

/// Write a config making the vocalizer render through a command that takes
/// `seconds` and then creates `marker`.
fn slow_speech_config(dir: &Path, seconds: u32, marker: &Path) {
    let command = vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("cat >/dev/null; sleep {seconds}; touch '{}'", marker.display()),
    ];
    fs::write(
        dir.join("automation-voice.yaml"),
        format!(
            "vocalizer:\n  speech_command: {}\n",
            serde_json::to_string(&command).unwrap()
        ),
    )
    .unwrap();
}

fn supervisor(working_dir: &Path) -> VocalizationSupervisor {
    VocalizationSupervisor::new(&VocalizerConfig {
        executable: PathBuf::from(VOCALIZER),
        working_dir: Some(working_dir.to_path_buf()),
        poll_period_ms: 50,
        env_capacity: 1 << 20,
        ..VocalizerConfig::default()
    })
}

#[test]
fn vocalizer_renders_through_configured_command() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("rendered");
    slow_speech_config(dir.path(), 0, &marker);

    let mut sup = supervisor(dir.path());
    let outcome = sup.vocalize("hello", &AtomicBool::new(false)).unwrap();

    assert_eq!(outcome, VocalizeOutcome::Completed);
    assert!(marker.exists());
}

#[test]
fn abort_silences_the_speech_command() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("rendered");
    slow_speech_config(dir.path(), 2, &marker);

    let mut sup = supervisor(dir.path());
    let abort = Arc::new(AtomicBool::new(false));
    let setter = {
        let abort = abort.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(400));
            abort.store(true, Ordering::Relaxed);
        })
    };

    let outcome = sup.vocalize("a long sentence", abort.as_ref()).unwrap();
    setter.join().unwrap();
    assert_eq!(outcome, VocalizeOutcome::Cancelled);

    thread::sleep(Duration::from_millis(2500));
    assert!(!marker.exists(), "speech command kept running after abort");
}

#[test]
fn interrupt_silences_the_previous_speech_command() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("rendered");
    slow_speech_config(dir.path(), 2, &marker);

    let mut sup = supervisor(dir.path());
    sup.start("old speech").unwrap();
    thread::sleep(Duration::from_millis(300));
    sup.interrupt();

    thread::sleep(Duration::from_millis(2500));
    assert!(!marker.exists(), "old speech command survived the interrupt");
}

struct AbortingSite;

impl AbortSignal for AbortingSite {
    fn abort_requested(&self) -> bool {
        true
    }
}

impl EngineSite for AbortingSite {
    fn event_interest(&self) -> Result<u64, SiteError> {
        Ok(0)
    }

    fn add_event(&self, _event: BookmarkEvent) -> Result<(), SiteError> {
        Ok(())
    }
}

fn spawn_listener(path: &Path) -> mpsc::Receiver<String> {
    let listener = UnixListener::bind(path).unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut buf = String::new();
            if stream.read_to_string(&mut buf).is_ok() && tx.send(buf).is_err() {
                break;
            }
        }
    });
    rx
}

#[test]
fn aborted_utterance_still_relays_every_fragment() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("rendered");
    slow_speech_config(dir.path(), 2, &marker);
    let socket = dir.path().join("relay.sock");
    let messages = spawn_listener(&socket);

    let mut sequencer =
        FragmentSequencer::new(LocalRelayClient::new(&socket), supervisor(dir.path()));
    sequencer
        .speak(
            &[
                TextFragment::speech("first"),
                TextFragment::speech("second"),
                TextFragment::speech("third"),
            ],
            &AbortingSite,
        )
        .unwrap();
    drop(sequencer);

    let received: Vec<String> = messages.iter().take(5).collect();
    assert_eq!(
        received,
        vec![
            "lifecycle:Voice initialization succeeded",
            "speech:first",
            "speech:second",
            "speech:third",
            "lifecycle:Voice destroyed",
        ]
    );

    thread::sleep(Duration::from_millis(2500));
    assert!(!marker.exists());
}
