//! Supply event log on disk.
//!
//! One frame per event: `[u32 LE length][ProtoEventRecord bytes]`.
//!
//! The file only ever grows by whole frames. `committed_len` is the end of
//! the last frame known to be durable; a failed append truncates the file
//! back to it, and the next append re-checks it before writing.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use prost::Message;
use tracing::{debug, warn};

use crate::proto_types::ProtoEventRecord;

/// Upper bound on a single frame; anything larger is corruption.
const MAX_FRAME_LEN: usize = 1024 * 1024;

const LEN_PREFIX: usize = 4;

/// Append handle on `events.log`. Kept open for the life of the store.
pub struct EventStore {
    path: PathBuf,
    file: File,
    committed_len: u64,
    last_id: i64,
}

impl EventStore {
    /// Open or create the log at `path`, reading every frame once to find
    /// the last id. A damaged file is refused rather than repaired.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;
        let committed_len = file.metadata()?.len();
        let frames = read_frames(&file, committed_len)?;
        let last_id = frames.last().map(|e| e.id).unwrap_or(0);

        debug!(path = %path.display(), frames = frames.len(), last_id, "event log opened");
        Ok(Self {
            path: path.to_path_buf(),
            file,
            committed_len,
            last_id,
        })
    }

    /// Append one event. Its id must be exactly `last_id + 1`.
    pub fn append_event(&mut self, event: &ProtoEventRecord) -> io::Result<()> {
        self.append_with(event, |file, frame| {
            file.write_all(frame)?;
            file.sync_data()
        })
    }

    /// Append through `write`. On failure, the file is cut back to the
    /// last whole frame before the error is returned.
    fn append_with(
        &mut self,
        event: &ProtoEventRecord,
        write: impl FnOnce(&mut File, &[u8]) -> io::Result<()>,
    ) -> io::Result<()> {
        let expected = self.last_id + 1;
        if event.id != expected {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("event id {} out of order, expected {}", event.id, expected),
            ));
        }

        let frame = encode_frame(event)?;

        // A previous rollback may itself have failed.
        if self.file.metadata()?.len() != self.committed_len {
            self.truncate_to_committed()?;
        }

        if let Err(err) = write(&mut self.file, &frame) {
            warn!(id = event.id, error = %err, "event append failed, rolling back");
            if let Err(rollback) = self.truncate_to_committed() {
                warn!(error = %rollback, path = %self.path.display(), "event log rollback failed");
            }
            return Err(err);
        }

        self.committed_len += frame.len() as u64;
        self.last_id = event.id;
        debug!(id = event.id, bytes = frame.len(), "event frame appended");
        Ok(())
    }

    fn truncate_to_committed(&mut self) -> io::Result<()> {
        self.file.set_len(self.committed_len)?;
        self.file.sync_all()
    }

    /// Every committed event, in file order.
    pub fn load_all_events(&self) -> io::Result<Vec<ProtoEventRecord>> {
        read_frames(&self.file, self.committed_len)
    }

    pub fn last_id(&self) -> i64 {
        self.last_id
    }
}

fn encode_frame(event: &ProtoEventRecord) -> io::Result<Vec<u8>> {
    let body_len = event.encoded_len();
    if body_len == 0 || body_len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("event {} encodes to {} bytes", event.id, body_len),
        ));
    }
    let mut frame = Vec::with_capacity(LEN_PREFIX + body_len);
    frame.extend_from_slice(&(body_len as u32).to_le_bytes());
    event
        .encode(&mut frame)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    Ok(frame)
}

/// Decode the first `len` bytes of `file` as frames. Truncated, oversized
/// or undecodable frames are `InvalidData`.
fn read_frames(file: &File, len: u64) -> io::Result<Vec<ProtoEventRecord>> {
    let mut handle = file;
    handle.seek(SeekFrom::Start(0))?;
    let mut reader = BufReader::new(handle.take(len));
    let mut events = Vec::new();
    let mut len_buf = [0u8; LEN_PREFIX];

    loop {
        match reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }

        let body_len = u32::from_le_bytes(len_buf) as usize;
        if body_len == 0 || body_len > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame {} has invalid length {}", events.len() + 1, body_len),
            ));
        }

        let mut body = vec![0u8; body_len];
        reader.read_exact(&mut body).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame {} truncated: {}", events.len() + 1, e),
            )
        })?;

        let event = ProtoEventRecord::decode(body.as_slice()).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame {} undecodable: {}", events.len() + 1, e),
            )
        })?;
        events.push(event);
    }

    Ok(events)
}
