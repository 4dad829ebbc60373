//! Fragment sequencer: drives one `speak` call.
//!
//! Bookmark fragments go to the host as events. Speech fragments are relayed
//! and then vocalized, strictly in order. A relay failure ends the utterance;
//! a vocalization failure or a host abort only costs its own fragment.

use tracing::{debug, info, warn};

use crate::bookmark;
use crate::error::{EngineError, VocalizeError};
use crate::fragment::{decode_host_fragments, FragmentKind, HostFragment, TextFragment};
use crate::relay::{RelayChannel, RelayMessage};
use crate::site::EngineSite;
use crate::supervisor::{Vocalize, VocalizeOutcome};

pub struct FragmentSequencer<R: RelayChannel, V: Vocalize> {
    relay: R,
    vocalizer: V,
}

impl<R: RelayChannel, V: Vocalize> FragmentSequencer<R, V> {
    pub fn new(relay: R, vocalizer: V) -> Self {
        let sequencer = Self { relay, vocalizer };
        sequencer.report(RelayMessage::lifecycle("Voice initialization succeeded"));
        sequencer
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    pub fn vocalizer(&self) -> &V {
        &self.vocalizer
    }

    /// Host entry point: validate the raw fragment chain, then speak it.
    /// Malformed input is rejected before anything is relayed or spawned.
    pub fn speak_host<S: EngineSite>(
        &mut self,
        raw: &[HostFragment<'_>],
        site: &S,
    ) -> Result<(), EngineError> {
        let fragments = decode_host_fragments(raw)?;
        self.speak(&fragments, site)
    }

    /// Render one utterance.
    ///
    /// The result is the relay error if relaying failed, otherwise the last
    /// vocalization error not followed by a successful vocalization.
    pub fn speak<S: EngineSite>(
        &mut self,
        fragments: &[TextFragment],
        site: &S,
    ) -> Result<(), EngineError> {
        if fragments.is_empty() {
            return Err(EngineError::InvalidInput("empty fragment list".into()));
        }

        info!("Speak: {} fragments", fragments.len());
        let mut pending: Option<VocalizeError> = None;

        for (i, fragment) in fragments.iter().enumerate() {
            match fragment.kind {
                FragmentKind::Bookmark => self.bookmark(&fragment.text, site),
                FragmentKind::Speech => {
                    if let Err(e) = self.relay.send(&RelayMessage::speech(&fragment.text)) {
                        warn!("Relay failed on fragment {i}: {e}");
                        self.report(RelayMessage::error("Emission failed"));
                        return Err(e.into());
                    }

                    // New speech purges old speech.
                    self.vocalizer.interrupt();

                    match self.vocalizer.vocalize(&fragment.text, site) {
                        Ok(VocalizeOutcome::Completed) => pending = None,
                        Ok(VocalizeOutcome::Cancelled) => {
                            info!("Vocalization of fragment {i} aborted by host");
                            pending = None;
                        }
                        Err(e) => {
                            warn!("Vocalization failed on fragment {i}: {e}");
                            self.report(RelayMessage::error("Vocalization failed"));
                            pending = Some(e);
                        }
                    }
                }
            }
        }

        match pending {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn bookmark<S: EngineSite>(&self, text: &str, site: &S) {
        let interest = match site.event_interest() {
            Ok(mask) => mask,
            Err(e) => {
                warn!("Event interest query failed: {e}");
                self.report(RelayMessage::error(
                    "Unable to query output site for event interest.",
                ));
                return;
            }
        };

        if let Err(e) = bookmark::maybe_emit(site, interest, text) {
            warn!("Failed to deliver bookmark {text:?}: {e}");
        }
    }

    /// Best-effort diagnostic over the relay. Failures are only logged.
    fn report(&self, message: RelayMessage) {
        if let Err(e) = self.relay.send(&message) {
            debug!("Dropped {} diagnostic: {e}", message.category);
        }
    }
}

impl<R: RelayChannel, V: Vocalize> Drop for FragmentSequencer<R, V> {
    fn drop(&mut self) {
        self.vocalizer.interrupt();
        self.report(RelayMessage::lifecycle("Voice destroyed"));
    }
}
