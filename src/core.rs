//! Shared vocabulary of the protocol: wire sentinels, reserved addresses,
//! frame sizes and the small value types passed between the codec, the
//! session manager and the engine.
//!
//! Wire layout of the three frame kinds (byte counts):
//!
//! ```text
//! | Header | Version | Id | Addr | Len/Ack | Payload | CRC | Tail |
//! |   1B   |   2B    | 4B |  2B  |   2B    |  Len B  | 4B  |  1B  |
//! ```
//!
//! Ack frames carry no `Id` and no payload; only Data frames carry a payload.

//==================================================================================VERSION
/// Major protocol version. Frames with another major version are rejected.
pub const VERSION_MAJOR: u8 = 1;
/// Minor protocol version.
pub const VERSION_MINOR: u8 = 0;
/// Version word written into every frame.
pub const PACKET_VERSION: u16 = ((VERSION_MAJOR as u16) << 8) | VERSION_MINOR as u16;

//==================================================================================SENTINELS
/// Header announcing an incoming transfer.
pub const HEADER_START: u8 = 0xA0;
/// Header of an acknowledgment frame.
pub const HEADER_ACK: u8 = 0xA2;
/// Header of a payload-carrying frame.
pub const HEADER_DATA: u8 = 0xA4;
/// Closing sentinel shared by every frame kind.
pub const TAIL: u8 = 0xED;

//==================================================================================SIZES
/// Size of the checksum field.
pub const CRC_LEN: usize = 4;
/// Encoded size of a Start frame.
pub const START_FRAME_LEN: usize = 1 + 2 + 4 + 2 + 2 + CRC_LEN + 1;
/// Encoded size of an Ack frame.
pub const ACK_FRAME_LEN: usize = 1 + 2 + 2 + 2 + CRC_LEN + 1;
/// Fixed bytes around a Data payload (header fields, checksum and tail).
pub const DATA_FRAME_OVERHEAD: usize = START_FRAME_LEN;
/// Largest payload a single Data frame can describe.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

//==================================================================================KEEP_ALIVE
/// Probe payload sent by the controller to check a target is alive.
pub const ALIVE_CONTROLLER_TO_TARGET: &[u8] = b"DORIME";
/// Probe payload sent by a target toward the controller.
pub const ALIVE_TARGET_TO_CONTROLLER: &[u8] = b"AMENO";

/// Tells whether a payload is one of the keep-alive probes.
pub fn is_alive_probe(payload: &[u8]) -> bool {
    payload == ALIVE_CONTROLLER_TO_TARGET || payload == ALIVE_TARGET_TO_CONTROLLER
}

//==================================================================================ADDRESS
/// 16-bit device address on the serial line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address(pub u16);

impl Address {
    /// Reserved address of the controller.
    pub const CONTROLLER: Address = Address(0x0000);
    /// Reserved address matched by every receiver.
    pub const BROADCAST: Address = Address(0xFFFF);

    pub const fn is_controller(self) -> bool {
        self.0 == Self::CONTROLLER.0
    }

    pub const fn is_broadcast(self) -> bool {
        self.0 == Self::BROADCAST.0
    }

    /// A frame addressed to `destination` concerns this device when it names
    /// the device itself or everybody.
    pub const fn accepts(self, destination: Address) -> bool {
        destination.0 == self.0 || destination.is_broadcast()
    }
}

impl From<u16> for Address {
    fn from(value: u16) -> Self {
        Address(value)
    }
}

impl From<Address> for u16 {
    fn from(value: Address) -> Self {
        value.0
    }
}

//==================================================================================ROLE
/// Position of a device on the line, derived from its configured address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// The single coordinating device (address `0x0000`).
    Controller,
    /// Any other addressed device; it only ever talks to the controller.
    Target,
}

impl Role {
    pub const fn from_address(address: Address) -> Self {
        if address.is_controller() {
            Role::Controller
        } else {
            Role::Target
        }
    }
}

//==================================================================================ACK_CODE
/// Code carried by an Ack frame in the `len` slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AckCode(pub u16);

impl AckCode {
    /// Positive acknowledgment.
    pub const ACK: AckCode = AckCode(0x0000);
    /// Rejection.
    pub const NACK: AckCode = AckCode(0x0101);

    pub const fn is_ack(self) -> bool {
        self.0 == Self::ACK.0
    }
}

//==================================================================================FRAME_KIND
/// Discriminant of the three wire frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameKind {
    Start,
    Ack,
    Data,
}

impl FrameKind {
    /// Header byte opening a frame of this kind.
    pub const fn header(self) -> u8 {
        match self {
            FrameKind::Start => HEADER_START,
            FrameKind::Ack => HEADER_ACK,
            FrameKind::Data => HEADER_DATA,
        }
    }

    /// Map a header byte back to its frame kind.
    pub const fn from_header(header: u8) -> Option<Self> {
        match header {
            HEADER_START => Some(FrameKind::Start),
            HEADER_ACK => Some(FrameKind::Ack),
            HEADER_DATA => Some(FrameKind::Data),
            _ => None,
        }
    }
}
