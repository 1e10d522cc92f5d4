//! Forward-only cursor over a snapshot buffer.
//!
//! Text lines and fixed-width little-endian values share one position, so
//! callers interleave [`ByteReader::read_line`] with the binary reads in
//! exactly the order the snapshot was written.

use thiserror::Error;

/// Failure reading fixed-width data from a [`ByteReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReadError {
    /// The read would run past the end of the buffer.
    #[error("read of {wanted} bytes at offset {position} runs past end of buffer ({len} bytes)")]
    OutOfBounds {
        /// Cursor position when the read started.
        position: usize,
        /// Number of bytes requested.
        wanted: usize,
        /// Total buffer length.
        len: usize,
    },
}

/// Stateful cursor over an immutable byte buffer.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, position: 0 }
    }

    /// Current cursor offset. May exceed [`Self::len`] after alignment.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Whether every byte of the buffer has been consumed.
    #[must_use]
    pub const fn is_at_end(&self) -> bool {
        self.position >= self.buf.len()
    }

    /// Reads one newline-terminated line, treating each byte as one
    /// character. The newline is consumed but not returned.
    ///
    /// Running out of buffer before a newline is not an error: whatever was
    /// accumulated is returned.
    pub fn read_line(&mut self) -> String {
        let rest = self.buf.get(self.position..).unwrap_or_default();

        let (line, consumed) = match rest.iter().position(|&b| b == b'\n') {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };

        self.position += consumed;
        line.iter().copied().map(char::from).collect()
    }

    /// Reads a line that must exist, unlike [`Self::read_line`] which
    /// tolerates an exhausted buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::OutOfBounds`] if the cursor is already at the end
    /// of the buffer.
    pub fn read_required_line(&mut self) -> Result<String, ReadError> {
        if self.is_at_end() {
            return Err(ReadError::OutOfBounds {
                position: self.position,
                wanted: 1,
                len: self.buf.len(),
            });
        }
        Ok(self.read_line())
    }

    /// Advances the cursor to the next multiple of 4.
    pub const fn align_to_4(&mut self) {
        self.position = self.position.next_multiple_of(4);
    }

    /// Skips `n` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::OutOfBounds`] if fewer than `n` bytes remain.
    pub fn skip(&mut self, n: usize) -> Result<(), ReadError> {
        self.take(n).map(|_| ())
    }

    /// Reads a little-endian `i32`.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::OutOfBounds`] if fewer than 4 bytes remain.
    pub fn read_i32(&mut self) -> Result<i32, ReadError> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads `count` little-endian `u16` values.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::OutOfBounds`] if fewer than `count * 2` bytes
    /// remain. The cursor is left untouched in that case.
    pub fn read_u16_array(&mut self, count: usize) -> Result<Vec<u16>, ReadError> {
        let wanted = count.saturating_mul(2);
        let bytes = self.take(wanted)?;
        Ok(bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ReadError> {
        let out_of_bounds = ReadError::OutOfBounds {
            position: self.position,
            wanted: n,
            len: self.buf.len(),
        };

        let end = self.position.checked_add(n).ok_or(out_of_bounds)?;
        let bytes = self.buf.get(self.position..end).ok_or(out_of_bounds)?;
        self.position = end;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_lines_and_consumes_newline() {
        let mut reader = ByteReader::new(b"first\nsecond\n");
        assert_eq!(reader.read_line(), "first");
        assert_eq!(reader.position(), 6);
        assert_eq!(reader.read_line(), "second");
        assert!(reader.is_at_end());
    }

    #[test]
    fn line_without_newline_returns_remainder() {
        let mut reader = ByteReader::new(b"abc");
        assert_eq!(reader.read_line(), "abc");
        assert!(reader.is_at_end());
        assert_eq!(reader.read_line(), "");
    }

    #[test]
    fn required_line_fails_at_end() {
        let mut reader = ByteReader::new(b"only");
        assert_eq!(reader.read_required_line().unwrap(), "only");
        assert!(reader.read_required_line().is_err());
    }

    #[test]
    fn bytes_are_single_characters() {
        let mut reader = ByteReader::new(&[0x44, 0xF1, 0x61, b'\n']);
        assert_eq!(reader.read_line(), "D\u{f1}a");
    }

    #[test]
    fn aligns_to_four_bytes() {
        let mut reader = ByteReader::new(&[0; 16]);
        reader.align_to_4();
        assert_eq!(reader.position(), 0);
        reader.skip(1).unwrap();
        reader.align_to_4();
        assert_eq!(reader.position(), 4);
        reader.skip(3).unwrap();
        reader.align_to_4();
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn reads_little_endian_values() {
        let mut bytes = (-2i32).to_le_bytes().to_vec();
        bytes.extend_from_slice(&513u16.to_le_bytes());
        bytes.extend_from_slice(&7u16.to_le_bytes());

        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_i32().unwrap(), -2);
        assert_eq!(reader.read_u16_array(2).unwrap(), vec![513, 7]);
        assert!(reader.is_at_end());
    }

    #[test]
    fn reading_past_end_is_out_of_bounds() {
        let mut reader = ByteReader::new(&[1, 2, 3]);
        let err = reader.read_i32().unwrap_err();
        assert_eq!(
            err,
            ReadError::OutOfBounds {
                position: 0,
                wanted: 4,
                len: 3
            }
        );
        assert_eq!(reader.position(), 0);

        reader.skip(2).unwrap();
        assert!(reader.read_u16_array(1).is_err());
    }
}
