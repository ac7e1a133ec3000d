//! Error definitions shared across library modules.
//! API calls return [`DorimeError`]; the codec reports [`FrameError`];
//! protocol-level failures reach the application as a [`FailureReason`]
//! inside a `ReceiveFailed` event, never as a return code.
use thiserror_no_std::Error;

//==================================================================================API_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors returned synchronously by the public API.
pub enum DorimeError {
    /// No handle is installed behind the shared cell.
    #[error("Invalid handle")]
    InvalidHandle,
    /// The handle was used before a successful `init`.
    #[error("Handle not initialized")]
    NotInitialized,
    /// Configuration rejected by `init` or by a call's arguments.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(#[from] ConfigError),
    /// The operation is not allowed in the current state or role.
    #[error("Operation not allowed now")]
    Busy,
    /// The adapter reported a failure; the core never retries on its own.
    #[error("Transport failure during {0:?}")]
    TransportFailure(TransportOp),
    /// The payload does not fit the 16-bit length field.
    #[error("Payload too large: {len} bytes")]
    PayloadTooLarge { len: usize },
    /// A frame could not be encoded.
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
    /// The buffer allocator could not provide the session buffer.
    #[error("Buffer allocation failed for {size} bytes")]
    AllocationFailed { size: usize },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Configuration problems detected at `init` time or on `send_data`.
pub enum ConfigError {
    /// `ms_per_tick` must be at least one.
    #[error("Tick scale must not be zero")]
    ZeroTickScale,
    /// Every timeout must be at least one millisecond.
    #[error("Timeout must not be zero: {which}")]
    ZeroTimeout { which: &'static str },
    /// A device cannot live at the broadcast address.
    #[error("Device address is reserved")]
    ReservedAddress,
    /// A transfer cannot target the sending device itself.
    #[error("Destination is the local device")]
    SelfAddressed,
    /// Targets only talk to the controller.
    #[error("Targets may only address the controller")]
    TargetToTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Adapter call that failed.
pub enum TransportOp {
    Transmit,
    Receive,
    SelectDirection,
}

//==================================================================================FRAME_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Failures of the frame codec.
pub enum FrameError {
    /// Header or tail sentinel does not match the expected frame kind.
    #[error("Malformed frame")]
    Malformed,
    /// Embedded checksum disagrees with the recomputed one.
    #[error("Checksum mismatch -> embedded: {expected:#010X}, computed: {computed:#010X}")]
    Integrity { expected: u32, computed: u32 },
    /// Not enough bytes to read the declared layout.
    #[error("Truncated frame -> needed: {needed}, available: {available}")]
    Truncated { needed: usize, available: usize },
    /// The frame was produced by an incompatible major version.
    #[error("Unsupported protocol version {version:#06X}")]
    UnsupportedVersion { version: u16 },
    /// Payload does not fit the 16-bit length field.
    #[error("Payload too large: {len} bytes")]
    PayloadTooLarge { len: usize },
    /// Output buffer too small to encode the frame.
    #[error("Buffer too small -> needed: {needed}, available: {available}")]
    BufferTooSmall { needed: usize, available: usize },
}

impl From<ByteReaderError> for FrameError {
    fn from(err: ByteReaderError) -> Self {
        match err {
            ByteReaderError::OutOfBounds { asked, available } => FrameError::Truncated {
                needed: asked,
                available,
            },
        }
    }
}

impl From<ByteWriterError> for FrameError {
    fn from(err: ByteWriterError) -> Self {
        match err {
            ByteWriterError::OutOfBounds { asked, available } => FrameError::BufferTooSmall {
                needed: asked,
                available,
            },
        }
    }
}

//==================================================================================FAILURE_REASON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Why a transfer failed, as reported by `ReceiveFailed`.
pub enum FailureReason {
    /// Bad header, bad tail, truncated or incompatible frame.
    Malformed,
    /// Checksum mismatch.
    Integrity,
    /// A deadline expired while waiting for the transport or the peer.
    Timeout,
    /// A well-formed frame that does not belong to the running transfer.
    UnexpectedFrame,
    /// The session buffer could not be allocated.
    Allocation,
}

impl From<FrameError> for FailureReason {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Integrity { .. } => FailureReason::Integrity,
            _ => FailureReason::Malformed,
        }
    }
}

//==================================================================================BYTEREADER_ERRORS
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised while reading fields from a byte buffer.
pub enum ByteReaderError {
    /// Attempted to read past the end of the buffer.
    #[error("Attempted to read out of bounds -> asked: {asked}, available: {available}")]
    OutOfBounds { asked: usize, available: usize },
}

//==================================================================================BYTEWRITER_ERRORS
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised while writing fields into a byte buffer.
pub enum ByteWriterError {
    /// Attempted to write beyond the provided capacity.
    #[error("Attempted to write out of bounds -> asked: {asked}, available: {available}")]
    OutOfBounds { asked: usize, available: usize },
}
