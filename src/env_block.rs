//! Child environment blocks.
//!
//! A block is the inherited environment copied entry by entry as
//! `NAME=VALUE\0`, then one `WORDS=<text>\0`, then a final `\0`. Units are
//! bytes on unix and UTF-16 code units on Windows, matching what each platform
//! hands a new process.

use std::ffi::{OsStr, OsString};

use crate::error::EnvBlockError;

/// Variable the child reads its words from.
pub const WORDS_VAR: &str = "WORDS";

#[cfg(unix)]
pub type EnvUnit = u8;
#[cfg(windows)]
pub type EnvUnit = u16;

const NUL: EnvUnit = 0;
const EQUALS: EnvUnit = b'=' as EnvUnit;

#[cfg(unix)]
pub fn encode(s: &OsStr) -> Vec<EnvUnit> {
    use std::os::unix::ffi::OsStrExt;
    s.as_bytes().to_vec()
}

#[cfg(windows)]
pub fn encode(s: &OsStr) -> Vec<EnvUnit> {
    use std::os::windows::ffi::OsStrExt;
    s.encode_wide().collect()
}

#[cfg(unix)]
fn decode(units: &[EnvUnit]) -> OsString {
    use std::os::unix::ffi::OsStrExt;
    OsStr::from_bytes(units).to_os_string()
}

#[cfg(windows)]
fn decode(units: &[EnvUnit]) -> OsString {
    use std::os::windows::ffi::OsStringExt;
    OsString::from_wide(units)
}

/// A built, double-NUL-terminated environment block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEnvironment {
    units: Vec<EnvUnit>,
}

impl ChildEnvironment {
    /// Build from the current process environment.
    pub fn from_current(text: &str, capacity: usize) -> Result<Self, EnvBlockError> {
        Self::build(std::env::vars_os(), text, capacity)
    }

    /// Build from an explicit base environment, in iteration order.
    ///
    /// An inherited `WORDS` entry is copied like any other; the appended entry
    /// comes later in the block and therefore wins. On failure nothing is
    /// returned, partial or otherwise.
    pub fn build<I, K, V>(base: I, text: &str, capacity: usize) -> Result<Self, EnvBlockError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        if text.contains('\0') {
            return Err(EnvBlockError::InvalidText("text contains NUL".into()));
        }

        let mut units = Vec::with_capacity(capacity.min(4096));

        for (name, value) in base {
            let name = encode(name.as_ref());
            if name.is_empty() {
                return Err(EnvBlockError::EnvironmentUnavailable(
                    "inherited entry with empty name".into(),
                ));
            }
            push_entry(&mut units, &name, &encode(value.as_ref()), capacity)?;
        }

        push_entry(
            &mut units,
            &encode(OsStr::new(WORDS_VAR)),
            &encode(OsStr::new(text)),
            capacity,
        )?;

        // Block terminator.
        reserve(&units, 1, capacity)?;
        units.push(NUL);

        Ok(Self { units })
    }

    /// The raw block, including both trailing NULs.
    pub fn as_units(&self) -> &[EnvUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Entries in block order as (name, value) pairs.
    ///
    /// Names may start with `=` (Windows per-drive entries), so the separator
    /// is the first `=` after the first unit.
    pub fn entries(&self) -> impl Iterator<Item = (OsString, OsString)> + '_ {
        self.units
            .split(|u| *u == NUL)
            .take_while(|entry| !entry.is_empty())
            .map(|entry| {
                let split = entry
                    .iter()
                    .skip(1)
                    .position(|u| *u == EQUALS)
                    .map(|p| p + 1)
                    .unwrap_or(entry.len());
                let value = entry.get(split + 1..).unwrap_or(&[]);
                (decode(&entry[..split]), decode(value))
            })
    }

    /// Value a reader of this block sees for `name`: the last entry wins.
    pub fn resolve(&self, name: &str) -> Option<OsString> {
        self.entries()
            .filter(|(n, _)| n == name)
            .last()
            .map(|(_, v)| v)
    }
}

fn reserve(units: &[EnvUnit], extra: usize, capacity: usize) -> Result<(), EnvBlockError> {
    let needed = units.len() + extra;
    if needed > capacity {
        return Err(EnvBlockError::BufferOverflow { needed, capacity });
    }
    Ok(())
}

fn push_entry(
    units: &mut Vec<EnvUnit>,
    name: &[EnvUnit],
    value: &[EnvUnit],
    capacity: usize,
) -> Result<(), EnvBlockError> {
    // name '=' value NUL, plus room for the block terminator
    reserve(units, name.len() + value.len() + 3, capacity)?;
    units.extend_from_slice(name);
    units.push(EQUALS);
    units.extend_from_slice(value);
    units.push(NUL);
    Ok(())
}
