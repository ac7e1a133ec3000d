//! `dorime-sp` library: a half-duplex packet protocol for one controller and
//! any number of addressed targets sharing a serial line, written for
//! `no_std` targets. The crate exposes the wire codec infrastructure, the
//! tick-polled protocol engine and the transport abstraction a board has to
//! implement.
#![no_std]

extern crate alloc;

//==================================================================================
/// Protocol constants and small domain types (addresses, roles, frame kinds).
pub mod core;
/// API errors, codec errors and the failure reasons reported to applications.
pub mod error;
/// Byte cursors and checksum strategies used by the frame codec.
pub mod infra;
/// Protocol implementation: frames, sessions, events, transport traits and
/// the state machine driving them.
pub mod protocol;
//==================================================================================

pub use crate::core::{Address, Role};
pub use crate::error::{DorimeError, FailureReason, FrameError};
pub use crate::protocol::engine::{Config, Dorime, State};
pub use crate::protocol::events::{Event, EventHandler, EventKind, HandleInfo};
pub use crate::protocol::shared::SharedDorime;
pub use crate::protocol::transport::traits::{
    allocator::{BufferAllocator, HeapAllocator},
    serial_port::{Direction, SerialPort},
};
