//! Per-transfer bookkeeping owned by the engine: the [`Session`] describing
//! the transfer in flight, the [`SessionBuffer`] holding its variable-size
//! frame, and the [`FrameStore`] receiving the fixed-size Start/Ack frames.
//!
//! The session buffer is allocated at most once per transfer and released
//! exactly once; [`SessionBuffer::release`] is idempotent so every cleanup
//! path can call it unconditionally.
use crate::core::{AckCode, Address, FrameKind, ACK_FRAME_LEN, START_FRAME_LEN};
use crate::error::{DorimeError, FailureReason};
use crate::protocol::frame::StartFrame;
use crate::protocol::transport::traits::allocator::BufferAllocator;

//==================================================================================DEADLINE
/// Absolute tick value after which a wait is over. Comparisons tolerate
/// counter wrap-around as long as waits stay under `u32::MAX / 2` ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Deadline(pub u32);

impl Deadline {
    /// Deadline `ticks` after `now`.
    pub fn after(now: u32, ticks: u32) -> Self {
        Deadline(now.wrapping_add(ticks))
    }

    /// True once `now` reached or passed the deadline.
    pub fn has_elapsed(self, now: u32) -> bool {
        (now.wrapping_sub(self.0) as i32) >= 0
    }
}

//==================================================================================SESSION
/// Which side of the transfer this device is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Origin {
    /// Announced by a peer's Start frame.
    Incoming,
    /// Started locally through `send_data`.
    Outgoing,
}

/// Transient state of the single transfer in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Session {
    pub origin: Origin,
    /// Sender-assigned counter; receivers use it to spot retransmissions.
    pub transfer_id: u32,
    pub destination: Address,
    /// Payload length announced by the Start frame.
    pub expected_len: u16,
    pub(crate) send_deadline: Option<Deadline>,
    pub(crate) receive_deadline: Option<Deadline>,
    pub(crate) failure: Option<FailureReason>,
    pub(crate) reply: AckCode,
}

impl Session {
    /// Session for a transfer announced by `start`.
    pub fn incoming(start: &StartFrame) -> Self {
        Self::new(
            Origin::Incoming,
            start.id,
            start.destination,
            start.payload_len,
        )
    }

    /// Session for a locally started transfer.
    pub fn outgoing(transfer_id: u32, destination: Address, expected_len: u16) -> Self {
        Self::new(Origin::Outgoing, transfer_id, destination, expected_len)
    }

    fn new(origin: Origin, transfer_id: u32, destination: Address, expected_len: u16) -> Self {
        Self {
            origin,
            transfer_id,
            destination,
            expected_len,
            send_deadline: None,
            receive_deadline: None,
            failure: None,
            reply: AckCode::ACK,
        }
    }

    /// Broadcast transfers are never acknowledged.
    pub fn is_broadcast(&self) -> bool {
        self.destination.is_broadcast()
    }

    pub fn send_deadline(&self) -> Option<Deadline> {
        self.send_deadline
    }

    pub fn receive_deadline(&self) -> Option<Deadline> {
        self.receive_deadline
    }
}

//==================================================================================SESSION_BUFFER
/// Owner of the one heap buffer a handle may hold.
pub struct SessionBuffer<A: BufferAllocator> {
    allocator: A,
    buffer: Option<A::Buffer>,
    /// Valid bytes at the front of the buffer.
    filled: usize,
}

impl<A: BufferAllocator> SessionBuffer<A> {
    pub fn new(allocator: A) -> Self {
        Self {
            allocator,
            buffer: None,
            filled: 0,
        }
    }

    /// Allocate a buffer of `size` bytes. Refused while one is still held.
    pub fn allocate(&mut self, size: usize) -> Result<(), DorimeError> {
        if self.buffer.is_some() {
            return Err(DorimeError::Busy);
        }
        let buffer = self
            .allocator
            .allocate(size)
            .ok_or(DorimeError::AllocationFailed { size })?;
        self.buffer = Some(buffer);
        self.filled = 0;
        Ok(())
    }

    /// Give the buffer back to the allocator. Returns whether one was held;
    /// calling it with nothing held is a no-op.
    pub fn release(&mut self) -> bool {
        self.filled = 0;
        match self.buffer.take() {
            Some(buffer) => {
                self.allocator.free(buffer);
                true
            }
            None => false,
        }
    }

    pub fn is_held(&self) -> bool {
        self.buffer.is_some()
    }

    /// Size of the held buffer, `0` when none is held.
    pub fn capacity(&self) -> usize {
        self.buffer.as_ref().map_or(0, |buffer| buffer.as_ref().len())
    }

    /// Copy received bytes to the front of the buffer, clamped to its
    /// capacity. Returns the number of bytes kept.
    pub fn fill(&mut self, data: &[u8]) -> usize {
        let Some(buffer) = self.buffer.as_mut() else {
            return 0;
        };
        let storage = buffer.as_mut();
        let kept = data.len().min(storage.len());
        storage[..kept].copy_from_slice(&data[..kept]);
        self.filled = kept;
        kept
    }

    /// Whole buffer, for encoding in place. Call [`set_filled`](Self::set_filled) afterwards.
    pub fn storage_mut(&mut self) -> Option<&mut [u8]> {
        self.buffer.as_mut().map(|buffer| buffer.as_mut())
    }

    pub fn set_filled(&mut self, len: usize) {
        self.filled = len.min(self.capacity());
    }

    /// Valid bytes (received or encoded).
    pub fn bytes(&self) -> &[u8] {
        match self.buffer.as_ref() {
            Some(buffer) => &buffer.as_ref()[..self.filled],
            None => &[],
        }
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }
}

//==================================================================================FRAME_STORE
/// How incoming Start and Ack frames are kept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufferStrategy {
    /// One shared slot; only the latest frame, whatever its kind, is kept.
    #[default]
    Overlapped,
    /// One slot per kind; the last Start and the last Ack stay inspectable.
    Separate,
}

#[derive(Clone, Copy, Debug)]
struct FrameSlot<const N: usize> {
    bytes: [u8; N],
    len: usize,
    ready: bool,
    stored: bool,
}

impl<const N: usize> FrameSlot<N> {
    const fn new() -> Self {
        Self {
            bytes: [0; N],
            len: 0,
            ready: false,
            stored: false,
        }
    }

    fn store(&mut self, data: &[u8]) {
        let kept = data.len().min(N);
        self.bytes[..kept].copy_from_slice(&data[..kept]);
        self.len = kept;
        self.ready = true;
        self.stored = true;
    }

    fn bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

#[derive(Clone, Copy, Debug)]
enum Storage {
    Overlapped {
        kind: Option<FrameKind>,
        slot: FrameSlot<START_FRAME_LEN>,
    },
    Separate {
        start: FrameSlot<START_FRAME_LEN>,
        ack: FrameSlot<ACK_FRAME_LEN>,
    },
}

/// Landing area for the fixed-size frames handed over by `rx_event`.
#[derive(Clone, Copy, Debug)]
pub struct FrameStore {
    storage: Storage,
}

impl FrameStore {
    pub const fn new(strategy: BufferStrategy) -> Self {
        let storage = match strategy {
            BufferStrategy::Overlapped => Storage::Overlapped {
                kind: None,
                slot: FrameSlot::new(),
            },
            BufferStrategy::Separate => Storage::Separate {
                start: FrameSlot::new(),
                ack: FrameSlot::new(),
            },
        };
        Self { storage }
    }

    pub fn strategy(&self) -> BufferStrategy {
        match self.storage {
            Storage::Overlapped { .. } => BufferStrategy::Overlapped,
            Storage::Separate { .. } => BufferStrategy::Separate,
        }
    }

    /// Keep the bytes received for a frame of `kind`, marking it ready.
    /// Data frames never land here.
    pub fn store(&mut self, kind: FrameKind, data: &[u8]) {
        match (&mut self.storage, kind) {
            (Storage::Overlapped { kind: current, slot }, FrameKind::Start | FrameKind::Ack) => {
                *current = Some(kind);
                slot.store(data);
            }
            (Storage::Separate { start, .. }, FrameKind::Start) => start.store(data),
            (Storage::Separate { ack, .. }, FrameKind::Ack) => ack.store(data),
            (_, FrameKind::Data) => {}
        }
    }

    /// Bytes of a ready, not yet consumed frame of `kind`.
    pub fn pending(&self, kind: FrameKind) -> Option<&[u8]> {
        match self.slot(kind) {
            Some((ready, bytes)) if ready => Some(bytes),
            _ => None,
        }
    }

    /// Last bytes stored for `kind`, consumed or not. The overlapped
    /// strategy loses them as soon as another kind is stored.
    pub fn last(&self, kind: FrameKind) -> Option<&[u8]> {
        self.slot(kind).map(|(_, bytes)| bytes)
    }

    /// Mark the frame of `kind` as handled.
    pub fn consume(&mut self, kind: FrameKind) {
        match (&mut self.storage, kind) {
            (Storage::Overlapped { kind: current, slot }, _) if *current == Some(kind) => {
                slot.ready = false;
            }
            (Storage::Separate { start, .. }, FrameKind::Start) => start.ready = false,
            (Storage::Separate { ack, .. }, FrameKind::Ack) => ack.ready = false,
            _ => {}
        }
    }

    /// Drop every ready flag.
    pub fn clear(&mut self) {
        match &mut self.storage {
            Storage::Overlapped { slot, .. } => slot.ready = false,
            Storage::Separate { start, ack } => {
                start.ready = false;
                ack.ready = false;
            }
        }
    }

    fn slot(&self, kind: FrameKind) -> Option<(bool, &[u8])> {
        match (&self.storage, kind) {
            (Storage::Overlapped { kind: current, slot }, _) if *current == Some(kind) => {
                Some((slot.ready, slot.bytes()))
            }
            (Storage::Separate { start, .. }, FrameKind::Start) if start.stored => {
                Some((start.ready, start.bytes()))
            }
            (Storage::Separate { ack, .. }, FrameKind::Ack) if ack.stored => {
                Some((ack.ready, ack.bytes()))
            }
            _ => None,
        }
    }
}
