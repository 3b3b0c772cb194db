//! Zip assembly over an unnamed spool file.
//!
//! The archive is written to a `tempfile::tempfile` spool, not streamed
//! straight to the client: the central directory lands at the end of the
//! file, and entries finish in fetch-completion order. Only once every
//! entry has settled is the spool rewound and handed to the response body,
//! so stream-end always denotes a complete archive.

use crate::error::ServiceError;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub struct ZipSink {
    writer: ZipWriter<File>,
    options: SimpleFileOptions,
}

impl ZipSink {
    pub fn create() -> Result<Self, ServiceError> {
        let spool = tempfile::tempfile().map_err(archive_io)?;
        Ok(Self {
            writer: ZipWriter::new(spool),
            options: SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated),
        })
    }

    /// Append a complete text entry in one call.
    pub fn add_text(&mut self, path: &str, contents: &str) -> Result<(), ServiceError> {
        self.writer.start_file(path, self.options)?;
        self.writer
            .write_all(contents.as_bytes())
            .map_err(archive_io)?;
        Ok(())
    }

    /// Open a streamed entry; its body follows via `write_chunk`.
    pub fn begin_entry(&mut self, path: &str) -> Result<(), ServiceError> {
        self.writer.start_file(path, self.options)?;
        Ok(())
    }

    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), ServiceError> {
        self.writer.write_all(chunk).map_err(archive_io)
    }

    /// Drop the entry currently being streamed.
    ///
    /// Called when a fetch dies mid-body; the alternative is a truncated
    /// image silently shipped to the client.
    pub fn abort_entry(&mut self) -> Result<(), ServiceError> {
        self.writer.abort_file()?;
        Ok(())
    }

    /// Write the central directory and rewind the spool for streaming.
    pub fn finish(self) -> Result<File, ServiceError> {
        let mut spool = self.writer.finish()?;
        spool.seek(SeekFrom::Start(0)).map_err(archive_io)?;
        Ok(spool)
    }
}

fn archive_io(err: std::io::Error) -> ServiceError {
    ServiceError::Archive(err.to_string())
}

// =============================================================================
// Tests
// =============================================================================
