//! Minimal abstraction of a half-duplex serial line. Lets the engine drive
//! any UART driver (DMA or interrupt based, embedded HAL or desktop).
//!
//! Every operation is non-blocking: `transmit` and `receive` only start the
//! transfer, and the driver later reports completion through
//! [`Dorime::tx_event`](crate::Dorime::tx_event) and
//! [`Dorime::rx_event`](crate::Dorime::rx_event).

/// Line direction requested from the transceiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Tx,
    Rx,
    /// Transceiver released; neither driving nor listening.
    Sleep,
}

/// Contract between the protocol engine and the board's serial driver.
pub trait SerialPort {
    type Error: core::fmt::Debug;

    /// Start sending `bytes`. The driver must copy them (or finish with them)
    /// before returning, then call `tx_event` once they left the wire.
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Start receiving exactly `len` bytes; hand them to `rx_event` once
    /// they arrived.
    fn receive(&mut self, len: usize) -> Result<(), Self::Error>;

    /// Switch a half-duplex transceiver. Ports without direction control
    /// keep the default.
    fn select_direction(&mut self, _direction: Direction) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Cancel every outstanding transmit and receive.
    fn abort_all(&mut self) {}

    /// Monotonic tick counter. Wraps around.
    fn now(&self) -> u32;

    /// Advance a software tick counter by `elapsed` ticks. Ports reading a
    /// free-running hardware timer keep the default.
    fn advance(&mut self, _elapsed: u32) {}

    /// Enter the critical section shared with interrupt handlers.
    fn lock(&mut self) {}

    /// Leave the critical section entered by [`lock`](Self::lock).
    fn unlock(&mut self) {}
}
