//! Handle shared between the main loop and interrupt handlers.
//!
//! Serial drivers usually report completions from an interrupt while the
//! application polls `handler` from its main loop. [`SharedDorime`] keeps the
//! handle behind an `embassy-sync` blocking mutex so both sides can reach it
//! from a `static`; the choice of raw mutex decides what "locked" means
//! (critical section, single-core, no-op in single-threaded tests).
use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::RawMutex, Mutex};

use crate::core::Address;
use crate::error::DorimeError;
use crate::infra::codec::checksum::{Checksum, Crc32};
use crate::protocol::engine::{Dorime, State};
use crate::protocol::events::EventHandler;
use crate::protocol::transport::traits::allocator::{BufferAllocator, HeapAllocator};
use crate::protocol::transport::traits::serial_port::SerialPort;

/// Cell holding at most one [`Dorime`] handle.
pub struct SharedDorime<M, P, H, A = HeapAllocator, C = Crc32>
where
    M: RawMutex,
    P: SerialPort,
    H: EventHandler,
    A: BufferAllocator,
    C: Checksum,
{
    inner: Mutex<M, RefCell<Option<Dorime<P, H, A, C>>>>,
}

impl<M, P, H, A, C> SharedDorime<M, P, H, A, C>
where
    M: RawMutex,
    P: SerialPort,
    H: EventHandler,
    A: BufferAllocator,
    C: Checksum,
{
    /// Empty cell, usable in a `static`.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Put a handle in the cell, returning the one it replaces.
    pub fn install(&self, dorime: Dorime<P, H, A, C>) -> Option<Dorime<P, H, A, C>> {
        self.inner.lock(|cell| cell.borrow_mut().replace(dorime))
    }

    /// Remove the handle from the cell.
    pub fn take(&self) -> Option<Dorime<P, H, A, C>> {
        self.inner.lock(|cell| cell.borrow_mut().take())
    }

    pub fn is_installed(&self) -> bool {
        self.inner.lock(|cell| cell.borrow().is_some())
    }

    /// Run `op` on the installed handle under the mutex.
    ///
    /// Fails with [`DorimeError::InvalidHandle`] when the cell is empty and
    /// with [`DorimeError::Busy`] when called again from inside `op` (for
    /// instance from an event callback).
    pub fn with<R>(
        &self,
        op: impl FnOnce(&mut Dorime<P, H, A, C>) -> Result<R, DorimeError>,
    ) -> Result<R, DorimeError> {
        self.inner.lock(|cell| {
            let mut slot = cell.try_borrow_mut().map_err(|_| DorimeError::Busy)?;
            match slot.as_mut() {
                Some(dorime) => op(dorime),
                None => Err(DorimeError::InvalidHandle),
            }
        })
    }

    pub fn init(&self) -> Result<(), DorimeError> {
        self.with(|dorime| dorime.init())
    }

    pub fn handler(&self) -> Result<(), DorimeError> {
        self.with(|dorime| dorime.handler())
    }

    pub fn tick(&self, elapsed: u32) -> Result<(), DorimeError> {
        self.with(|dorime| dorime.tick(elapsed))
    }

    /// To be called from the receive-complete interrupt.
    pub fn rx_event(&self, data: &[u8]) -> Result<(), DorimeError> {
        self.with(|dorime| dorime.rx_event(data))
    }

    /// To be called from the transmit-complete interrupt.
    pub fn tx_event(&self) -> Result<(), DorimeError> {
        self.with(|dorime| dorime.tx_event())
    }

    pub fn abort(&self) -> Result<(), DorimeError> {
        self.with(|dorime| dorime.abort())
    }

    pub fn send_data(&self, destination: Address, payload: &[u8]) -> Result<u32, DorimeError> {
        self.with(|dorime| dorime.send_data(destination, payload))
    }

    pub fn send_alive(&self, destination: Address) -> Result<u32, DorimeError> {
        self.with(|dorime| dorime.send_alive(destination))
    }

    pub fn state(&self) -> Result<State, DorimeError> {
        self.with(|dorime| Ok(dorime.state()))
    }
}

impl<M, P, H, A, C> Default for SharedDorime<M, P, H, A, C>
where
    M: RawMutex,
    P: SerialPort,
    H: EventHandler,
    A: BufferAllocator,
    C: Checksum,
{
    fn default() -> Self {
        Self::new()
    }
}
