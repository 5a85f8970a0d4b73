//! Streaming copy with a reusable buffer.
//!
//! One [`CopyBuffer`] lives as long as an [`ExtractionEngine`] and is
//! reused for every file entry, so extracting an archive with many small
//! files does not allocate a fresh buffer per entry.
//!
//! [`ExtractionEngine`]: crate::extraction::ExtractionEngine

use std::io;
use std::io::Read;
use std::io::Write;

/// Buffer size for entry copies (64 KiB).
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Fixed-size buffer for [`copy_with_buffer`].
///
/// # Examples
///
/// ```
/// use extractorr_core::copy::{CopyBuffer, copy_with_buffer};
///
/// let mut buffer = CopyBuffer::new();
/// let mut output = Vec::new();
/// let copied = copy_with_buffer(&mut b"payload".as_slice(), &mut output, &mut buffer).unwrap();
/// assert_eq!(copied, 7);
/// ```
#[derive(Debug)]
pub struct CopyBuffer {
    buf: Box<[u8]>,
}

impl CopyBuffer {
    /// Creates a zeroed buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: vec![0u8; COPY_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Returns the buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.buf.len()
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies `reader` into `writer` through `buffer` until end of stream.
///
/// Interrupted reads are retried. Returns the number of bytes copied.
///
/// # Errors
///
/// Returns the first read or write error.
#[inline]
pub fn copy_with_buffer<R, W>(reader: &mut R, writer: &mut W, buffer: &mut CopyBuffer) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut total: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer.buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        writer.write_all(&buffer.buf[..bytes_read])?;
        total += bytes_read as u64;
    }

    Ok(total)
}
