//! Notifications delivered to the application through a single callback.
//!
//! Events are dispatched synchronously from the context driving
//! [`Dorime::handler`](crate::Dorime::handler). Payload views borrow the
//! session buffer, which is released right after the transfer ends: copy
//! out anything that must outlive the callback.
use crate::core::{AckCode, Address, Role};
use crate::error::FailureReason;

/// Discriminant of [`Event`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    AddressMatch,
    DataReceived,
    ResponseReceived,
    ReceiveFailed,
    AckOk,
}

/// Notification and its parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event<'a> {
    /// A Start frame concerning this device was accepted and its buffer
    /// allocated.
    AddressMatch {
        /// Destination the Start frame carried (own address or broadcast).
        address: Address,
        transfer_id: u32,
        len: u16,
    },
    /// A Data frame passed every check.
    DataReceived {
        transfer_id: u32,
        destination: Address,
        /// Valid only during the callback.
        payload: &'a [u8],
    },
    /// The peer answered a local transfer with something else than an ack.
    ResponseReceived { transfer_id: u32, code: AckCode },
    /// The transfer failed; nothing was (or will be) delivered for it.
    ReceiveFailed {
        transfer_id: u32,
        reason: FailureReason,
    },
    /// A local transfer completed: acknowledged by the peer, or, for a
    /// broadcast, fully transmitted.
    AckOk {
        transfer_id: u32,
        destination: Address,
    },
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::AddressMatch { .. } => EventKind::AddressMatch,
            Event::DataReceived { .. } => EventKind::DataReceived,
            Event::ResponseReceived { .. } => EventKind::ResponseReceived,
            Event::ReceiveFailed { .. } => EventKind::ReceiveFailed,
            Event::AckOk { .. } => EventKind::AckOk,
        }
    }
}

/// Identity of the handle raising an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandleInfo {
    pub address: Address,
    pub role: Role,
}

/// Application side of the dispatcher. Must not block.
pub trait EventHandler {
    fn on_event(&mut self, info: &HandleInfo, event: Event<'_>);
}

impl<F> EventHandler for F
where
    F: FnMut(&HandleInfo, Event<'_>),
{
    fn on_event(&mut self, info: &HandleInfo, event: Event<'_>) {
        self(info, event)
    }
}
