//! Streaming snapshot parser.
//!
//! A pull parser over `quick_xml` events. It walks
//! `Idle → InRoot → InCollection → InRecord → InField` and yields one
//! finished `Record` at a time, so the document is never held in memory.
//!
//! Anything nested inside a field element is rich-text markup owned by that
//! field. It is not interpreted: tags, attributes, text, CDATA and comments
//! are copied byte for byte into the field's raw text.

use std::io::BufRead;

use chrono::NaiveDateTime;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::codec;
use crate::export::{COLUMN_ATTR, EXPORTED_ATTR, ROOT_TAG, TYPE_ATTR};
use crate::model::{Collection, Field, Record, ValueKind};
use crate::progress::CancelToken;
use crate::{Error, Result};

/// What one call to `next_record` produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseStep {
    /// A complete record, ready for insertion.
    Record(Record),
    /// Cancellation was observed at a collection boundary.
    Canceled,
    /// The root element closed and input is exhausted.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    InRoot,
    InCollection(Collection),
    InRecord(Collection),
    InField(Collection),
}

/// A field element whose closing tag has not been seen yet.
struct OpenField {
    name: String,
    column: String,
    kind: ValueKind,
    raw: Vec<u8>,
    /// Depth of nested markup inside the field.
    depth: usize,
}

pub struct SnapshotParser<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    state: State,
    record: Option<Record>,
    field: Option<OpenField>,
    records: u64,
    seen_root: bool,
    exported_at: Option<NaiveDateTime>,
}

impl<R: BufRead> SnapshotParser<R> {
    pub fn new(input: R) -> Self {
        Self {
            reader: Reader::from_reader(input),
            buf: Vec::new(),
            state: State::Idle,
            record: None,
            field: None,
            records: 0,
            seen_root: false,
            exported_at: None,
        }
    }

    /// Records finalized since the root element was entered.
    pub fn records_parsed(&self) -> u64 {
        self.records
    }

    /// Export clock from the root element, if present and readable.
    pub fn exported_at(&self) -> Option<NaiveDateTime> {
        self.exported_at
    }

    /// Advance until the next record completes, cancellation is observed,
    /// or the document ends.
    pub fn next_record(&mut self, cancel: &CancelToken) -> Result<ParseStep> {
        let mut buf = std::mem::take(&mut self.buf);
        let step = self.pump(&mut buf, cancel);
        buf.clear();
        self.buf = buf;
        step
    }

    fn pump(&mut self, buf: &mut Vec<u8>, cancel: &CancelToken) -> Result<ParseStep> {
        loop {
            buf.clear();
            match self.reader.read_event_into(buf)? {
                Event::Start(e) => {
                    if let Some(field) = self.field.as_mut() {
                        field.depth += 1;
                        field.raw.push(b'<');
                        field.raw.extend_from_slice(&e);
                        field.raw.push(b'>');
                    } else if let Some(step) = self.on_start(&e, cancel)? {
                        return Ok(step);
                    }
                }
                Event::Empty(e) => {
                    if let Some(field) = self.field.as_mut() {
                        field.raw.push(b'<');
                        field.raw.extend_from_slice(&e);
                        field.raw.extend_from_slice(b"/>");
                    } else {
                        if let Some(step) = self.on_start(&e, cancel)? {
                            return Ok(step);
                        }
                        if let Some(step) = self.on_end()? {
                            return Ok(step);
                        }
                    }
                }
                Event::End(e) => {
                    match self.field.as_mut() {
                        Some(field) if field.depth > 0 => {
                            field.depth -= 1;
                            field.raw.extend_from_slice(b"</");
                            field.raw.extend_from_slice(&e);
                            field.raw.push(b'>');
                        }
                        _ => {
                            if let Some(step) = self.on_end()? {
                                return Ok(step);
                            }
                        }
                    }
                }
                Event::Text(e) => {
                    if let Some(field) = self.field.as_mut() {
                        field.raw.extend_from_slice(&e);
                    }
                }
                Event::CData(e) => {
                    if let Some(field) = self.field.as_mut() {
                        field.raw.extend_from_slice(b"<![CDATA[");
                        field.raw.extend_from_slice(&e);
                        field.raw.extend_from_slice(b"]]>");
                    }
                }
                Event::Comment(e) => {
                    if let Some(field) = self.field.as_mut() {
                        field.raw.extend_from_slice(b"<!--");
                        field.raw.extend_from_slice(&e);
                        field.raw.extend_from_slice(b"-->");
                    }
                }
                Event::Eof => {
                    return match self.state {
                        State::Idle if self.seen_root => Ok(ParseStep::Finished),
                        State::Idle => Err(self.malformed(format!("document has no <{ROOT_TAG}> element"))),
                        state => Err(self.malformed(format!("document ended inside {state:?}"))),
                    };
                }
                // declarations, processing instructions, doctype
                _ => {}
            }
        }
    }

    fn on_start(&mut self, e: &BytesStart<'_>, cancel: &CancelToken) -> Result<Option<ParseStep>> {
        let name = e.name();
        let name = name.as_ref();

        match self.state {
            State::Idle => {
                if name != ROOT_TAG.as_bytes() {
                    return Err(self.malformed(format!(
                        "expected <{ROOT_TAG}>, found <{}>",
                        String::from_utf8_lossy(name)
                    )));
                }
                self.exported_at = self.attribute(e, EXPORTED_ATTR)?
                    .and_then(|v| NaiveDateTime::parse_from_str(&v, codec::TIMESTAMP_FORMAT).ok());
                self.records = 0;
                self.seen_root = true;
                self.state = State::InRoot;
            }
            State::InRoot => {
                let Some(collection) = Collection::from_block_tag(name) else {
                    return Err(self.malformed(format!(
                        "unknown collection <{}>",
                        String::from_utf8_lossy(name)
                    )));
                };
                if cancel.is_canceled() {
                    debug!(collection = collection.block_tag(), "import canceled at collection boundary");
                    return Ok(Some(ParseStep::Canceled));
                }
                debug!(collection = collection.block_tag(), "importing collection");
                self.state = State::InCollection(collection);
            }
            State::InCollection(collection) => {
                if name != collection.record_tag().as_bytes() {
                    return Err(self.malformed(format!(
                        "expected <{}> inside <{}>, found <{}>",
                        collection.record_tag(),
                        collection.block_tag(),
                        String::from_utf8_lossy(name)
                    )));
                }
                self.record = Some(Record::new(collection));
                self.state = State::InRecord(collection);
            }
            State::InRecord(collection) => {
                let field_name = self.utf8(name.to_vec())?;
                let column = self.attribute(e, COLUMN_ATTR)?.ok_or_else(|| {
                    self.malformed(format!("field <{field_name}> has no {COLUMN_ATTR} attribute"))
                })?;
                let tag = self.attribute(e, TYPE_ATTR)?.ok_or_else(|| {
                    self.malformed(format!("field <{field_name}> has no {TYPE_ATTR} attribute"))
                })?;
                let kind = ValueKind::from_tag(&tag).ok_or_else(|| {
                    self.malformed(format!("field <{field_name}> has unknown type '{tag}'"))
                })?;
                self.field = Some(OpenField {
                    name: field_name,
                    column,
                    kind,
                    raw: Vec::new(),
                    depth: 0,
                });
                self.state = State::InField(collection);
            }
            State::InField(_) => {
                return Err(self.malformed("element opened while a field was being closed".into()));
            }
        }
        Ok(None)
    }

    fn on_end(&mut self) -> Result<Option<ParseStep>> {
        match self.state {
            State::InField(collection) => {
                let Some(field) = self.field.take() else {
                    return Err(self.malformed("field state without an open field".into()));
                };
                let raw = self.utf8(field.raw)?;
                let value = codec::decode(field.kind, &field.name, &raw)?;
                let Some(record) = self.record.as_mut() else {
                    return Err(self.malformed("field outside of a record".into()));
                };
                record.push(Field::new(field.name, field.column, value));
                self.state = State::InRecord(collection);
            }
            State::InRecord(collection) => {
                let Some(record) = self.record.take() else {
                    return Err(self.malformed("record state without an open record".into()));
                };
                self.records += 1;
                self.state = State::InCollection(collection);
                return Ok(Some(ParseStep::Record(record)));
            }
            State::InCollection(_) => self.state = State::InRoot,
            State::InRoot => self.state = State::Idle,
            State::Idle => return Err(self.malformed("closing tag outside the root element".into())),
        }
        Ok(None)
    }

    fn utf8(&self, bytes: Vec<u8>) -> Result<String> {
        String::from_utf8(bytes).map_err(|e| self.malformed(format!("invalid UTF-8: {e}")))
    }

    fn attribute(&self, e: &BytesStart<'_>, key: &str) -> Result<Option<String>> {
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            if attr.key.as_ref() == key.as_bytes() {
                return String::from_utf8(attr.value.into_owned())
                    .map(Some)
                    .map_err(|e| self.malformed(format!("attribute {key} is not UTF-8: {e}")));
            }
        }
        Ok(None)
    }

    fn malformed(&self, message: String) -> Error {
        Error::Malformed {
            position: self.reader.buffer_position() as u64,
            message,
        }
    }
}
