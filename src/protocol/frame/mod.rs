//! The three wire frames (Start, Ack, Data) and the codec turning them into
//! bytes and back.
//!
//! Decoding reads the declared fields strictly in order, each at its own
//! width, and fails closed: a wrong header or tail yields
//! [`FrameError::Malformed`], a checksum mismatch yields
//! [`FrameError::Integrity`], and no partially filled frame is ever returned.
use crate::core::{
    AckCode, Address, FrameKind, ACK_FRAME_LEN, CRC_LEN, DATA_FRAME_OVERHEAD, MAX_PAYLOAD_LEN,
    PACKET_VERSION, START_FRAME_LEN, TAIL, VERSION_MAJOR,
};
use crate::error::FrameError;
use crate::infra::codec::bytes::{ByteReader, ByteWriter, Endianness};
use crate::infra::codec::checksum::{Checksum, Crc32};

//==================================================================================FRAMES
/// Announces an incoming transfer of `payload_len` bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StartFrame {
    pub version: u16,
    pub id: u32,
    pub destination: Address,
    pub payload_len: u16,
}

impl StartFrame {
    pub const LEN: usize = START_FRAME_LEN;

    pub fn new(id: u32, destination: Address, payload_len: u16) -> Self {
        Self {
            version: PACKET_VERSION,
            id,
            destination,
            payload_len,
        }
    }
}

/// Accepts or rejects a Start frame, or answers a Data frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AckFrame {
    pub version: u16,
    pub destination: Address,
    pub code: AckCode,
}

impl AckFrame {
    pub const LEN: usize = ACK_FRAME_LEN;

    pub fn new(destination: Address, code: AckCode) -> Self {
        Self {
            version: PACKET_VERSION,
            destination,
            code,
        }
    }
}

/// Carries the payload. Borrows the bytes it was decoded from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataFrame<'a> {
    pub version: u16,
    pub id: u32,
    pub destination: Address,
    pub payload: &'a [u8],
}

impl<'a> DataFrame<'a> {
    pub fn new(id: u32, destination: Address, payload: &'a [u8]) -> Self {
        Self {
            version: PACKET_VERSION,
            id,
            destination,
            payload,
        }
    }

    /// Size of the encoded frame.
    pub fn encoded_len(&self) -> usize {
        DATA_FRAME_OVERHEAD + self.payload.len()
    }
}

/// Any decoded frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Frame<'a> {
    Start(StartFrame),
    Ack(AckFrame),
    Data(DataFrame<'a>),
}

impl Frame<'_> {
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Start(_) => FrameKind::Start,
            Frame::Ack(_) => FrameKind::Ack,
            Frame::Data(_) => FrameKind::Data,
        }
    }
}

//==================================================================================CODEC
/// Serializes and parses frames with a fixed byte order and checksum.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameCodec<C: Checksum = Crc32> {
    endianness: Endianness,
    checksum: C,
}

impl<C: Checksum> FrameCodec<C> {
    pub fn new(endianness: Endianness, checksum: C) -> Self {
        Self {
            endianness,
            checksum,
        }
    }

    //==================================================================================Encode
    /// Encode a Start frame into `out`, returning the number of bytes written.
    pub fn encode_start(&self, frame: &StartFrame, out: &mut [u8]) -> Result<usize, FrameError> {
        self.encode_fields(
            out,
            FrameKind::Start,
            frame.version,
            Some(frame.id),
            frame.destination,
            frame.payload_len,
            &[],
        )
    }

    /// Encode an Ack frame into `out`, returning the number of bytes written.
    pub fn encode_ack(&self, frame: &AckFrame, out: &mut [u8]) -> Result<usize, FrameError> {
        self.encode_fields(
            out,
            FrameKind::Ack,
            frame.version,
            None,
            frame.destination,
            frame.code.0,
            &[],
        )
    }

    /// Encode a Data frame into `out`, returning the number of bytes written.
    pub fn encode_data(&self, frame: &DataFrame<'_>, out: &mut [u8]) -> Result<usize, FrameError> {
        if frame.payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLarge {
                len: frame.payload.len(),
            });
        }
        self.encode_fields(
            out,
            FrameKind::Data,
            frame.version,
            Some(frame.id),
            frame.destination,
            frame.payload.len() as u16,
            frame.payload,
        )
    }

    pub fn encode(&self, frame: &Frame<'_>, out: &mut [u8]) -> Result<usize, FrameError> {
        match frame {
            Frame::Start(start) => self.encode_start(start, out),
            Frame::Ack(ack) => self.encode_ack(ack, out),
            Frame::Data(data) => self.encode_data(data, out),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn encode_fields(
        &self,
        out: &mut [u8],
        kind: FrameKind,
        version: u16,
        id: Option<u32>,
        destination: Address,
        len_or_code: u16,
        payload: &[u8],
    ) -> Result<usize, FrameError> {
        let needed = 1 + 2 + id.map_or(0, |_| 4) + 2 + 2 + payload.len() + CRC_LEN + 1;
        if out.len() < needed {
            return Err(FrameError::BufferTooSmall {
                needed,
                available: out.len(),
            });
        }

        let mut writer = ByteWriter::new(out, self.endianness);
        writer.write_u8(kind.header())?;
        writer.write_u16(version)?;
        if let Some(id) = id {
            writer.write_u32(id)?;
        }
        writer.write_u16(destination.0)?;
        writer.write_u16(len_or_code)?;
        writer.write_slice(payload)?;

        // Checksum covers header..payload.
        let crc = self.checksum.checksum(writer.written(), 0);
        writer.write_u32(crc)?;
        writer.write_u8(TAIL)?;

        Ok(writer.position())
    }

    //==================================================================================Decode
    /// Decode whichever frame `bytes` holds.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Result<Frame<'a>, FrameError> {
        self.decode_fields(bytes, None)
    }

    /// Decode a Start frame; any other header is malformed here.
    pub fn decode_start(&self, bytes: &[u8]) -> Result<StartFrame, FrameError> {
        match self.decode_fields(bytes, Some(FrameKind::Start))? {
            Frame::Start(frame) => Ok(frame),
            _ => Err(FrameError::Malformed),
        }
    }

    /// Decode an Ack frame; any other header is malformed here.
    pub fn decode_ack(&self, bytes: &[u8]) -> Result<AckFrame, FrameError> {
        match self.decode_fields(bytes, Some(FrameKind::Ack))? {
            Frame::Ack(frame) => Ok(frame),
            _ => Err(FrameError::Malformed),
        }
    }

    /// Decode a Data frame; any other header is malformed here.
    pub fn decode_data<'a>(&self, bytes: &'a [u8]) -> Result<DataFrame<'a>, FrameError> {
        match self.decode_fields(bytes, Some(FrameKind::Data))? {
            Frame::Data(frame) => Ok(frame),
            _ => Err(FrameError::Malformed),
        }
    }

    fn decode_fields<'a>(
        &self,
        bytes: &'a [u8],
        expected: Option<FrameKind>,
    ) -> Result<Frame<'a>, FrameError> {
        let mut reader = ByteReader::new(bytes, self.endianness);

        let header = reader.read_u8()?;
        let kind = FrameKind::from_header(header).ok_or(FrameError::Malformed)?;
        if expected.is_some_and(|expected| expected != kind) {
            return Err(FrameError::Malformed);
        }

        let version = reader.read_u16()?;
        let id = match kind {
            FrameKind::Ack => 0,
            FrameKind::Start | FrameKind::Data => reader.read_u32()?,
        };
        let destination = Address(reader.read_u16()?);
        let len_or_code = reader.read_u16()?;
        let payload = match kind {
            FrameKind::Data => reader.read_slice(len_or_code as usize)?,
            FrameKind::Start | FrameKind::Ack => &[],
        };

        let covered = reader.consumed();
        let embedded = reader.read_u32()?;
        let tail = reader.read_u8()?;
        if tail != TAIL {
            return Err(FrameError::Malformed);
        }

        let computed = self.checksum.checksum(covered, 0);
        if computed != embedded {
            return Err(FrameError::Integrity {
                expected: embedded,
                computed,
            });
        }

        if (version >> 8) as u8 != VERSION_MAJOR {
            return Err(FrameError::UnsupportedVersion { version });
        }

        Ok(match kind {
            FrameKind::Start => Frame::Start(StartFrame {
                version,
                id,
                destination,
                payload_len: len_or_code,
            }),
            FrameKind::Ack => Frame::Ack(AckFrame {
                version,
                destination,
                code: AckCode(len_or_code),
            }),
            FrameKind::Data => Frame::Data(DataFrame {
                version,
                id,
                destination,
                payload,
            }),
        })
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
