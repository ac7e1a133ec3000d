//! Sequential byte cursors used to lay out and read back frame fields.
//! Every multi-byte field is read at the cursor position and the cursor is
//! then advanced by the width actually consumed, so fields can never overlap.
use crate::error::{ByteReaderError, ByteWriterError};

/// Byte order of multi-byte fields, fixed per deployment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

//==================================================================================BYTEREADER
/// Reader extracting fixed-width fields from a `&[u8]` without copies.
pub struct ByteReader<'a> {
    /// Source buffer (typically the bytes received for one frame).
    buffer: &'a [u8],
    /// Number of bytes consumed from the beginning.
    cursor: usize,
    endianness: Endianness,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of the provided buffer.
    pub fn new(buffer: &'a [u8], endianness: Endianness) -> Self {
        Self {
            buffer,
            cursor: 0,
            endianness,
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Bytes still available after the cursor.
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    /// Everything read so far, from the first byte up to the cursor.
    pub fn consumed(&self) -> &'a [u8] {
        &self.buffer[..self.cursor]
    }

    /// Take `N` bytes and advance the cursor.
    fn take<const N: usize>(&mut self) -> Result<[u8; N], ByteReaderError> {
        let slice = self.read_slice(N)?;
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(slice);
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, ByteReaderError> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ByteReaderError> {
        let bytes = self.take::<2>()?;
        Ok(match self.endianness {
            Endianness::Little => u16::from_le_bytes(bytes),
            Endianness::Big => u16::from_be_bytes(bytes),
        })
    }

    pub fn read_u32(&mut self) -> Result<u32, ByteReaderError> {
        let bytes = self.take::<4>()?;
        Ok(match self.endianness {
            Endianness::Little => u32::from_le_bytes(bytes),
            Endianness::Big => u32::from_be_bytes(bytes),
        })
    }

    /// Return a slice of `len` bytes from the current position.
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ByteReaderError> {
        let available = self.remaining();
        if len > available {
            return Err(ByteReaderError::OutOfBounds {
                asked: len,
                available,
            });
        }
        let slice = &self.buffer[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(slice)
    }
}

//==================================================================================BYTEWRITER
/// Writer laying fixed-width fields into a `&mut [u8]`.
pub struct ByteWriter<'a> {
    /// Target buffer (the frame under construction).
    buffer: &'a mut [u8],
    /// Number of bytes written so far.
    cursor: usize,
    endianness: Endianness,
}

impl<'a> ByteWriter<'a> {
    /// Create a writer positioned at the start of the buffer.
    pub fn new(buffer: &'a mut [u8], endianness: Endianness) -> Self {
        Self {
            buffer,
            cursor: 0,
            endianness,
        }
    }

    /// Bytes written so far; the encoded length once writing is done.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Everything written so far.
    pub fn written(&self) -> &[u8] {
        &self.buffer[..self.cursor]
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), ByteWriterError> {
        self.write_slice(&[value])
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), ByteWriterError> {
        let bytes = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        self.write_slice(&bytes)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), ByteWriterError> {
        let bytes = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        self.write_slice(&bytes)
    }

    /// Copy `data` at the cursor and advance past it.
    pub fn write_slice(&mut self, data: &[u8]) -> Result<(), ByteWriterError> {
        let available = self.buffer.len() - self.cursor;
        if data.len() > available {
            return Err(ByteWriterError::OutOfBounds {
                asked: data.len(),
                available,
            });
        }
        self.buffer[self.cursor..self.cursor + data.len()].copy_from_slice(data);
        self.cursor += data.len();
        Ok(())
    }
}
