//! Tag event stream over a project document.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// A structural event of the document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagEvent {
    Open {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Close {
        name: String,
    },
}

#[cfg(test)]
impl TagEvent {
    pub fn open(name: &str, attrs: &[(&str, &str)]) -> Self {
        TagEvent::Open {
            name: name.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn close(name: &str) -> Self {
        TagEvent::Close {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenizeError {
    #[error("XML error at byte {position}: {source}")]
    Xml {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },
    #[error("document is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("document ended inside <{0}>")]
    Unclosed(String),
}

/// What the head of a file looks like.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    /// XML project document
    Project,
    /// Binary project from before version 1.0
    LegacyBinary,
    Unknown,
}

/// Number of leading bytes inspected by [`detect`].
pub const DETECT_LEN: usize = 256;

/// Classify a file from its first bytes.
pub fn detect(data: &[u8]) -> DocumentKind {
    // The last byte of the window is never examined.
    let head = &data[..data.len().min(DETECT_LEN - 1)];
    if head.starts_with(b"AudacityProject") {
        return DocumentKind::LegacyBinary;
    }
    if head.starts_with(b"<?xml")
        && (contains(head, b"<audacityproject") || contains(head, b"<project"))
    {
        return DocumentKind::Project;
    }
    DocumentKind::Unknown
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Streaming tokenizer yielding open/close events.
///
/// Empty elements yield an open event immediately followed by a close.
pub struct Tokenizer<'a> {
    reader: Reader<&'a [u8]>,
    buf: Vec<u8>,
    open: Vec<String>,
    pending_close: Option<String>,
    done: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(document: &'a [u8]) -> Self {
        let mut reader = Reader::from_reader(document);
        reader.trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            open: Vec::new(),
            pending_close: None,
            done: false,
        }
    }

    fn next_event(&mut self) -> Result<Option<TagEvent>, TokenizeError> {
        if let Some(name) = self.pending_close.take() {
            return Ok(Some(TagEvent::Close { name }));
        }

        loop {
            self.buf.clear();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|source| TokenizeError::Xml {
                    position: self.reader.buffer_position(),
                    source,
                })?;
            let position = self.reader.buffer_position();
            match event {
                Event::Start(ref e) => {
                    let (name, attrs) = read_start(e, position)?;
                    self.open.push(name.clone());
                    return Ok(Some(TagEvent::Open { name, attrs }));
                }
                Event::Empty(ref e) => {
                    let (name, attrs) = read_start(e, position)?;
                    self.pending_close = Some(name.clone());
                    return Ok(Some(TagEvent::Open { name, attrs }));
                }
                Event::End(ref e) => {
                    let name = std::str::from_utf8(e.name().as_ref())?.to_string();
                    self.open.pop();
                    return Ok(Some(TagEvent::Close { name }));
                }
                Event::Eof => {
                    return match self.open.pop() {
                        Some(name) => Err(TokenizeError::Unclosed(name)),
                        None => Ok(None),
                    };
                }
                _ => {}
            }
        }
    }
}

fn read_start(
    e: &BytesStart,
    position: usize,
) -> Result<(String, Vec<(String, String)>), TokenizeError> {
    let name = std::str::from_utf8(e.name().as_ref())?.to_string();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| TokenizeError::Xml {
            position,
            source: err.into(),
        })?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr
            .unescape_value()
            .map_err(|source| TokenizeError::Xml { position, source })?
            .into_owned();
        attrs.push((key, value));
    }
    Ok((name, attrs))
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<TagEvent, TokenizeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
