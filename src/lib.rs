//! automation-voice: the rendering core of a speech plugin.
//!
//! The host hands over one utterance at a time as a sequence of fragments.
//! Speech is relayed to an external observer and vocalized by a separate
//! child process; bookmarks are echoed back to the host as events.

pub mod bookmark;
pub mod config;
pub mod env_block;
pub mod error;
pub mod fragment;
#[cfg(unix)]
pub mod listener;
pub mod logging;
pub mod process_tree;
pub mod relay;
pub mod sequencer;
pub mod site;
pub mod supervisor;

pub use config::Config;
pub use env_block::{ChildEnvironment, WORDS_VAR};
pub use error::{EngineError, EnvBlockError, RelayError, SiteError, VocalizeError};
pub use fragment::{FragmentKind, HostFragment, TextFragment};
pub use relay::{LocalRelayClient, MessageCategory, RelayChannel, RelayMessage};
pub use sequencer::FragmentSequencer;
pub use site::{AbortSignal, BookmarkEvent, EngineSite, ACTION_ABORT, EVENT_INTEREST_BOOKMARK};
pub use supervisor::{VocalizationSupervisor, Vocalize, VocalizeOutcome};
