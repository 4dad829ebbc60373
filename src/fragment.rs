//! Text fragments of one utterance.
//!
//! The host hands over a chain of bounded UTF-16 spans. They are validated and
//! copied into owned [`TextFragment`]s up front, so nothing aliases host memory
//! once `speak` starts.

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Bookmark,
    Speech,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFragment {
    pub kind: FragmentKind,
    pub text: String,
}

impl TextFragment {
    pub fn speech(text: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Speech,
            text: text.into(),
        }
    }

    pub fn bookmark(text: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Bookmark,
            text: text.into(),
        }
    }
}

/// A fragment as the host presents it: a span plus an explicit length.
/// The span is not NUL-terminated; only the first `len` units belong to it.
#[derive(Debug, Clone, Copy)]
pub struct HostFragment<'a> {
    pub kind: FragmentKind,
    pub units: &'a [u16],
    pub len: usize,
}

/// Validate and decode the host's fragment chain.
///
/// Fails with `InvalidInput` on an empty chain or a length that runs past its
/// span. Unpaired surrogates decode to U+FFFD.
pub fn decode_host_fragments(raw: &[HostFragment<'_>]) -> Result<Vec<TextFragment>, EngineError> {
    if raw.is_empty() {
        return Err(EngineError::InvalidInput("empty fragment list".into()));
    }

    raw.iter()
        .enumerate()
        .map(|(i, frag)| {
            let span = frag.units.get(..frag.len).ok_or_else(|| {
                EngineError::InvalidInput(format!(
                    "fragment {i} declares {} units but only {} are present",
                    frag.len,
                    frag.units.len()
                ))
            })?;
            Ok(TextFragment {
                kind: frag.kind,
                text: String::from_utf16_lossy(span),
            })
        })
        .collect()
}

/// Split text with inline `<bookmark mark="..."/>` tags into fragments.
///
/// Text between tags becomes Speech fragments (whitespace-only runs are
/// dropped); each tag becomes a Bookmark fragment carrying the mark value.
/// An unterminated tag is kept as speech.
pub fn parse_markup(input: &str) -> Vec<TextFragment> {
    const OPEN: &str = "<bookmark";

    let mut fragments = Vec::new();
    let mut rest = input;

    while let Some(start) = rest.find(OPEN) {
        let Some(end) = rest[start..].find("/>").map(|e| start + e) else {
            break;
        };

        push_speech(&mut fragments, &rest[..start]);
        if let Some(mark) = mark_attribute(&rest[start + OPEN.len()..end]) {
            fragments.push(TextFragment::bookmark(mark));
        }
        rest = &rest[end + 2..];
    }

    push_speech(&mut fragments, rest);
    fragments
}

fn push_speech(fragments: &mut Vec<TextFragment>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        fragments.push(TextFragment::speech(text));
    }
}

fn mark_attribute(attrs: &str) -> Option<&str> {
    let value = attrs.trim().strip_prefix("mark")?.trim_start();
    let value = value.strip_prefix('=')?.trim_start();
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &value[1..];
    value.find(quote).map(|end| &value[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[test]
    fn decodes_only_declared_span() {
        let units = wide("Hello world");
        let frags = decode_host_fragments(&[HostFragment {
            kind: FragmentKind::Speech,
            units: &units,
            len: 5,
        }])
        .unwrap();
        assert_eq!(frags, vec![TextFragment::speech("Hello")]);
    }

    #[test]
    fn length_past_span_is_invalid_input() {
        let units = wide("Hi");
        let err = decode_host_fragments(&[HostFragment {
            kind: FragmentKind::Speech,
            units: &units,
            len: 3,
        }])
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn empty_list_is_invalid_input() {
        assert!(matches!(
            decode_host_fragments(&[]),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn lone_surrogate_decodes_lossily() {
        let units = [0x0048, 0xD800, 0x0069];
        let frags = decode_host_fragments(&[HostFragment {
            kind: FragmentKind::Speech,
            units: &units,
            len: 3,
        }])
        .unwrap();
        assert_eq!(frags[0].text, "H\u{FFFD}i");
    }

    #[test]
    fn markup_splits_speech_and_bookmarks() {
        let frags = parse_markup(r#"Hi <bookmark mark="42"/> Bye"#);
        assert_eq!(
            frags,
            vec![
                TextFragment::speech("Hi"),
                TextFragment::bookmark("42"),
                TextFragment::speech("Bye"),
            ]
        );
    }

    #[test]
    fn markup_without_tags_is_one_fragment() {
        assert_eq!(parse_markup("  plain text "), vec![TextFragment::speech("plain text")]);
    }

    #[test]
    fn unterminated_tag_stays_speech() {
        assert_eq!(
            parse_markup(r#"a <bookmark mark="1""#),
            vec![TextFragment::speech(r#"a <bookmark mark="1""#)]
        );
    }
}
