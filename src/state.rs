//! Durable record of the rotation position.
//!
//! Layout: `[cursor][entry 0][entry 1]..[entry N-1]`, every field an
//! unsigned 32-bit little-endian integer. There is no header or checksum;
//! a record that cannot be read back as a valid permutation is discarded.

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Error;
use crate::permutation::Permutation;

const FIELD_WIDTH: usize = std::mem::size_of::<u32>();

/// File holding the persisted cursor and permutation.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the whole record with `order`'s cursor and entries.
    ///
    /// The record is written beside the target and renamed over it, so a
    /// crash leaves either the old or the new record in place.
    ///
    /// # Errors
    /// Returns [`Error::StatePersistence`] if the record cannot be written or
    /// a value does not fit the field width.
    pub fn write_full(&self, order: &Permutation) -> Result<(), Error> {
        let mut bytes = Vec::with_capacity((order.size() + 1) * FIELD_WIDTH);
        bytes.extend_from_slice(&self.encode(order.cursor())?);
        for &entry in order.as_slice() {
            bytes.extend_from_slice(&self.encode(entry)?);
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &bytes).map_err(|e| Error::persistence(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| Error::persistence(&self.path, e))?;
        debug!(
            path = %self.path.display(),
            cursor = order.cursor(),
            entries = order.size(),
            "wrote full rotation state"
        );
        Ok(())
    }

    /// Overwrite only the leading cursor field, leaving the entries as they
    /// are.
    ///
    /// # Errors
    /// Returns [`Error::StatePersistence`] if the record cannot be opened or
    /// written; the record must already exist.
    pub fn write_pos(&self, cursor: usize) -> Result<(), Error> {
        let field = self.encode(cursor)?;
        let write = || -> io::Result<()> {
            let mut file = OpenOptions::new().write(true).open(&self.path)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&field)?;
            file.flush()
        };
        write().map_err(|e| Error::persistence(&self.path, e))?;
        debug!(path = %self.path.display(), cursor, "wrote rotation cursor");
        Ok(())
    }

    /// Load the persisted order.
    ///
    /// Returns `None` when the record is absent, unreadable, shorter than a
    /// cursor plus one entry, misaligned, or not a valid permutation; the
    /// caller then starts a fresh shuffle. `expected_len` only sizes the
    /// buffer.
    #[must_use]
    pub fn read_state(&self, expected_len: usize) -> Option<Permutation> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no rotation state; starting fresh");
                return None;
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "rotation state unreadable; starting fresh");
                return None;
            }
        };

        if bytes.len() < 2 * FIELD_WIDTH || bytes.len() % FIELD_WIDTH != 0 {
            warn!(
                path = %self.path.display(),
                bytes = bytes.len(),
                "rotation state truncated; starting fresh"
            );
            return None;
        }

        let mut fields = bytes.chunks_exact(FIELD_WIDTH).map(|chunk| {
            let mut raw = [0u8; FIELD_WIDTH];
            raw.copy_from_slice(chunk);
            u32::from_le_bytes(raw) as usize
        });
        let cursor = fields.next()?;
        let mut entries = Vec::with_capacity(expected_len);
        entries.extend(fields);

        let order = Permutation::from_parts(cursor, entries);
        if order.is_none() {
            warn!(path = %self.path.display(), "rotation state is not a permutation; starting fresh");
        }
        order
    }

    fn encode(&self, value: usize) -> Result<[u8; FIELD_WIDTH], Error> {
        u32::try_from(value)
            .map(u32::to_le_bytes)
            .map_err(|_| {
                Error::persistence(
                    &self.path,
                    io::Error::new(
                        ErrorKind::InvalidInput,
                        format!("{value} does not fit a 32-bit state field"),
                    ),
                )
            })
    }
}
