//! Handle configuration and its conversion into tick-based timing.
use embassy_time::Duration;

use crate::core::{Address, Role};
use crate::error::ConfigError;
use crate::infra::codec::bytes::Endianness;
use crate::protocol::session::BufferStrategy;
use crate::protocol::transport::{
    DEFAULT_BROADCAST_GAP_MS, DEFAULT_COOLDOWN_TIMEOUT_MS, DEFAULT_RECEIVE_TIMEOUT_MS,
    DEFAULT_SEND_TIMEOUT_MS,
};

/// Longest wait expressible without confusing wrapped deadlines.
const MAX_WAIT_TICKS: u32 = i32::MAX as u32;

/// Settings of one handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Own address; `0x0000` makes the device the controller.
    pub address: Address,
    /// Milliseconds represented by one tick of [`SerialPort::now`](crate::SerialPort::now).
    pub ms_per_tick: u32,
    /// Time allowed for a frame to leave the wire, and for the peer to
    /// acknowledge a local transfer.
    pub send_timeout: Duration,
    /// Time allowed for the Data frame once its Start was acknowledged.
    pub receive_timeout: Duration,
    /// Settle period spent in `Cooldown`.
    pub cooldown_timeout: Duration,
    /// Quiet period between a broadcast Start frame and its Data frame.
    /// Must cover two polling periods of the slowest target.
    pub broadcast_gap: Duration,
    pub endianness: Endianness,
    pub buffer_strategy: BufferStrategy,
}

impl Config {
    /// Defaults: 1 ms per tick, recommended timeouts, little endian,
    /// overlapped frame storage.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ms_per_tick: 1,
            send_timeout: Duration::from_millis(DEFAULT_SEND_TIMEOUT_MS),
            receive_timeout: Duration::from_millis(DEFAULT_RECEIVE_TIMEOUT_MS),
            cooldown_timeout: Duration::from_millis(DEFAULT_COOLDOWN_TIMEOUT_MS),
            broadcast_gap: Duration::from_millis(DEFAULT_BROADCAST_GAP_MS),
            endianness: Endianness::Little,
            buffer_strategy: BufferStrategy::Overlapped,
        }
    }

    pub fn with_ms_per_tick(mut self, ms_per_tick: u32) -> Self {
        self.ms_per_tick = ms_per_tick;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn with_cooldown_timeout(mut self, timeout: Duration) -> Self {
        self.cooldown_timeout = timeout;
        self
    }

    pub fn with_broadcast_gap(mut self, gap: Duration) -> Self {
        self.broadcast_gap = gap;
        self
    }

    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    pub fn with_buffer_strategy(mut self, strategy: BufferStrategy) -> Self {
        self.buffer_strategy = strategy;
        self
    }

    /// Role derived from the address.
    pub fn role(&self) -> Role {
        Role::from_address(self.address)
    }

    /// Check the settings and convert the timeouts to ticks.
    pub fn timing(&self) -> Result<Timing, ConfigError> {
        if self.address.is_broadcast() {
            return Err(ConfigError::ReservedAddress);
        }
        if self.ms_per_tick == 0 {
            return Err(ConfigError::ZeroTickScale);
        }
        Ok(Timing {
            send: self.ticks(self.send_timeout, "send")?,
            receive: self.ticks(self.receive_timeout, "receive")?,
            cooldown: self.ticks(self.cooldown_timeout, "cooldown")?,
            broadcast_gap: self.ticks(self.broadcast_gap, "broadcast gap")?,
        })
    }

    /// Rounds up so a timeout never expires early.
    fn ticks(&self, timeout: Duration, which: &'static str) -> Result<u32, ConfigError> {
        let millis = timeout.as_millis();
        if millis == 0 {
            return Err(ConfigError::ZeroTimeout { which });
        }
        let ticks = millis.div_ceil(self.ms_per_tick as u64);
        Ok(ticks.min(MAX_WAIT_TICKS as u64) as u32)
    }
}

/// Timeouts expressed in ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    pub send: u32,
    pub receive: u32,
    pub cooldown: u32,
    pub broadcast_gap: u32,
}
