//! Vocalization subprocess supervisor.
//!
//! Spawns the child renderer with the words in its environment, then waits on
//! it in bounded slices so the host's abort flag is seen within one poll
//! period. At most one child is alive per supervisor.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::VocalizerConfig;
use crate::env_block::ChildEnvironment;
use crate::error::VocalizeError;
use crate::process_tree::{self, ProcessTree};
use crate::site::AbortSignal;

/// Granularity of the exit check inside one poll period.
const WAIT_SLICE: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VocalizeOutcome {
    /// The child exited on its own.
    Completed,
    /// The host aborted and the child was terminated.
    Cancelled,
}

/// Something that can render text audibly.
pub trait Vocalize {
    /// Terminate a still-running child left over from an earlier call.
    fn interrupt(&mut self);

    fn vocalize(
        &mut self,
        text: &str,
        abort: &dyn AbortSignal,
    ) -> Result<VocalizeOutcome, VocalizeError>;
}

/// Ownership of one live child and its descendants. Dropping it releases the
/// process handles without signalling anything.
#[derive(Debug)]
pub struct VocalizationHandle {
    child: Child,
    tree: Option<ProcessTree>,
}

impl VocalizationHandle {
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Wait for exit for at most `timeout`. `Ok(None)` means still running.
    fn wait_timeout(&mut self, timeout: Duration) -> io::Result<Option<ExitStatus>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(Some(status));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            thread::sleep(WAIT_SLICE.min(deadline - now));
        }
    }

    /// Kill the child together with anything it spawned, then reap it.
    /// Failures are logged only.
    pub fn terminate(mut self) {
        let pid = self.id();
        let tree_killed = match self.tree.as_ref().map(ProcessTree::kill) {
            Some(Ok(())) => true,
            Some(Err(e)) => {
                warn!("Failed to terminate process tree of vocalizer pid {pid}: {e}");
                false
            }
            None => false,
        };
        if !tree_killed {
            if let Err(e) = self.child.kill() {
                warn!("Failed to terminate vocalizer pid {pid}: {e}");
            }
        }
        match self.child.wait() {
            Ok(status) => debug!("Vocalizer pid {pid} terminated ({status})"),
            Err(e) => warn!("Failed to reap vocalizer pid {pid}: {e}"),
        }
    }
}

pub struct VocalizationSupervisor {
    executable: PathBuf,
    working_dir: Option<PathBuf>,
    poll_period: Duration,
    env_capacity: usize,
    active: Option<VocalizationHandle>,
}

impl VocalizationSupervisor {
    pub fn new(config: &VocalizerConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            working_dir: config.working_dir.clone(),
            poll_period: config.poll_period(),
            env_capacity: config.env_capacity,
            active: None,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Whether a child from an earlier `start` is still running.
    pub fn is_active(&mut self) -> bool {
        self.active.as_mut().is_some_and(VocalizationHandle::is_running)
    }

    /// Launch a child for `text` and return its pid.
    ///
    /// A child from an earlier call must already have been purged with
    /// [`Vocalize::interrupt`]; the fragment sequencer does this before every
    /// vocalization.
    pub fn start(&mut self, text: &str) -> Result<u32, VocalizeError> {
        let env = ChildEnvironment::from_current(text, self.env_capacity)?;

        let mut cmd = Command::new(&self.executable);
        cmd.env_clear()
            .envs(env.entries())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        process_tree::configure(&mut cmd);

        let child = cmd.spawn().map_err(|source| VocalizeError::SpawnFailed {
            executable: self.executable.clone(),
            source,
        })?;

        let pid = child.id();
        let tree = match ProcessTree::attach(&child) {
            Ok(tree) => Some(tree),
            Err(e) => {
                warn!("Vocalizer pid {pid} is not in its own process tree: {e}");
                None
            }
        };
        debug!(
            "Spawned vocalizer pid {pid} ({} chars, {} env units)",
            text.chars().count(),
            env.len()
        );
        self.active = Some(VocalizationHandle { child, tree });
        Ok(pid)
    }

    /// Wait for the active child, polling `abort` once per poll period.
    ///
    /// If waiting itself fails the child stays registered as active, so the
    /// next `interrupt` (or drop) still terminates it.
    pub fn supervise(&mut self, abort: &dyn AbortSignal) -> VocalizeOutcome {
        let Some(mut handle) = self.active.take() else {
            return VocalizeOutcome::Completed;
        };

        loop {
            match handle.wait_timeout(self.poll_period) {
                Ok(Some(status)) => {
                    if !status.success() {
                        warn!("Vocalizer pid {} exited with {status}", handle.id());
                    }
                    return VocalizeOutcome::Completed;
                }
                Ok(None) => {
                    if abort.abort_requested() {
                        info!("Abort requested, terminating vocalizer pid {}", handle.id());
                        handle.terminate();
                        return VocalizeOutcome::Cancelled;
                    }
                }
                Err(e) => {
                    warn!("Failed waiting on vocalizer pid {}: {e}", handle.id());
                    self.active = Some(handle);
                    return VocalizeOutcome::Completed;
                }
            }
        }
    }
}

impl Vocalize for VocalizationSupervisor {
    fn interrupt(&mut self) {
        if let Some(handle) = self.active.take() {
            info!("Interrupting previous vocalizer pid {}", handle.id());
            handle.terminate();
        }
    }

    fn vocalize(
        &mut self,
        text: &str,
        abort: &dyn AbortSignal,
    ) -> Result<VocalizeOutcome, VocalizeError> {
        self.start(text)?;
        Ok(self.supervise(abort))
    }
}

impl Drop for VocalizationSupervisor {
    fn drop(&mut self) {
        self.interrupt();
    }
}
