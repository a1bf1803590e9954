//! Splits an inbound byte stream into newline-delimited frames.

use std::io::{self, Read};

use super::TransportError;

const CHUNK_BYTES: usize = 4096;

/// Reads newline-terminated frames, enforcing a per-frame size limit.
pub(crate) struct FrameReader<R> {
    source: R,
    buffer: Vec<u8>,
    limit: usize,
}

impl<R: Read> FrameReader<R> {
    pub(crate) const fn new(source: R, limit: usize) -> Self {
        Self {
            source,
            buffer: Vec::new(),
            limit,
        }
    }

    pub(crate) const fn get_ref(&self) -> &R {
        &self.source
    }

    /// Returns the next frame without its delimiter, or `None` once the peer
    /// has closed the stream. A trailing frame without a newline is returned
    /// as-is.
    pub(crate) fn next_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut chunk = [0_u8; CHUNK_BYTES];
        loop {
            if let Some(end) = self.buffer.iter().position(|byte| *byte == b'\n') {
                self.enforce_limit(end + 1)?;
                let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
                line.pop();
                return Ok(Some(line));
            }
            self.enforce_limit(self.buffer.len())?;

            let read = read_chunk_with_retry(&mut self.source, &mut chunk)
                .map_err(|source| TransportError::Read { source })?;
            if read == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.buffer)));
            }
            self.buffer
                .extend_from_slice(chunk.get(..read).unwrap_or_default());
        }
    }

    const fn enforce_limit(&self, size: usize) -> Result<(), TransportError> {
        if size > self.limit {
            return Err(TransportError::FrameTooLarge { limit: self.limit });
        }
        Ok(())
    }
}

fn read_chunk_with_retry(source: &mut impl Read, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match source.read(chunk) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
}
