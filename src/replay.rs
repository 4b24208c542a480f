//! File replay of raw dump containers.
//!
//! A dump starts with the magic `DIFD` and a version byte, followed by
//! tagged records: `b'E'` opens an event, `b'B'` carries one DIF buffer as a
//! big-endian u32 length plus that many payload bytes. An event owns every
//! buffer record up to the next `b'E'` or the end of the file.
//!
//! Replay treats a malformed record the way the loop treats a malformed
//! buffer: log it and stop yielding, never abort the caller mid-run.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use log::{debug, warn};

use difraw::process::looper::EventSource;
use difraw::structs::buffer::Buffer;

use crate::input::InputReader;

pub const DUMP_MAGIC: [u8; 4] = *b"DIFD";
pub const DUMP_VERSION: u8 = 1;

const EVENT_TAG: u8 = b'E';
const BUFFER_TAG: u8 = b'B';

/// Buffers above this size indicate a corrupt length field.
const MAX_BUFFER_LEN: u32 = 16 << 20;

/// Replays a raw dump container as an [`EventSource`].
pub struct RawFileSource {
    input: InputReader,
    /// Set when an event tag was consumed while looking for buffers.
    pending_event: bool,
    current: Buffer,
    exhausted: bool,
    buffers_read: u64,
}

impl RawFileSource {
    /// Opens `path` ("-" for stdin) and checks the container preamble.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_input(InputReader::new(path)?)
    }

    pub fn from_reader<R: Read + 'static>(reader: R) -> Result<Self> {
        Self::from_input(InputReader::from_reader(reader))
    }

    fn from_input(mut input: InputReader) -> Result<Self> {
        let mut preamble = [0u8; 5];
        input
            .read_exact(&mut preamble)
            .context("reading container preamble")?;
        if preamble[..4] != DUMP_MAGIC {
            bail!("not a DIF dump container (bad magic)");
        }
        if preamble[4] != DUMP_VERSION {
            bail!("unsupported container version {}", preamble[4]);
        }
        Ok(Self {
            input,
            pending_event: false,
            current: Buffer::default(),
            exhausted: false,
            buffers_read: 0,
        })
    }

    pub fn buffers_read(&self) -> u64 {
        self.buffers_read
    }

    fn next_tag(&mut self) -> Option<u8> {
        match self.input.read_byte() {
            Ok(tag) => tag,
            Err(e) => {
                warn!("dump read failed: {e}");
                self.exhausted = true;
                None
            }
        }
    }

    fn read_buffer(&mut self) -> bool {
        let mut len_bytes = [0u8; 4];
        if let Err(e) = self.input.read_exact(&mut len_bytes) {
            warn!("truncated buffer record: {e}");
            self.exhausted = true;
            return false;
        }
        let len = u32::from_be_bytes(len_bytes);
        if len > MAX_BUFFER_LEN {
            warn!("buffer record claims {len} bytes, stopping replay");
            self.exhausted = true;
            return false;
        }
        let mut payload = vec![0u8; len as usize];
        if let Err(e) = self.input.read_exact(&mut payload) {
            warn!("truncated buffer payload: {e}");
            self.exhausted = true;
            return false;
        }
        self.buffers_read += 1;
        debug!("replayed DIF buffer #{} ({len} bytes)", self.buffers_read);
        self.current = Buffer::from(payload);
        true
    }
}

impl EventSource for RawFileSource {
    fn next_event(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        if self.pending_event {
            self.pending_event = false;
            return true;
        }
        match self.next_tag() {
            Some(EVENT_TAG) => true,
            Some(other) => {
                warn!("expected an event record, found tag {other:#04x}; stopping replay");
                self.exhausted = true;
                false
            }
            None => {
                self.exhausted = true;
                false
            }
        }
    }

    fn next_dif_buffer(&mut self) -> bool {
        if self.exhausted || self.pending_event {
            return false;
        }
        match self.next_tag() {
            Some(BUFFER_TAG) => self.read_buffer(),
            Some(EVENT_TAG) => {
                self.pending_event = true;
                false
            }
            Some(other) => {
                warn!("unknown record tag {other:#04x}; stopping replay");
                self.exhausted = true;
                false
            }
            None => {
                self.exhausted = true;
                false
            }
        }
    }

    fn current_buffer(&self) -> Buffer {
        self.current.clone()
    }
}
