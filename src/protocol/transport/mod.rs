//! Transport boundary: the traits a board implements (serial port, buffer
//! allocator) and the recommended timing defaults.
//!
//! ## Timing defaults
//!
//! These values suit a UART running at 115200 baud or faster with
//! transfers of a few hundred bytes. Slower links or larger payloads need a
//! longer receive timeout; see [`Config`](crate::protocol::engine::Config).

pub mod traits;

/// Recommended time allowed for a frame to leave the wire and, for the
/// sender, for the peer's acknowledgment to arrive (ms).
///
/// At 115200 baud a Start frame (16 bytes) takes ~1.4 ms; the margin
/// covers the peer's polling period and line turnaround.
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 100;

/// Recommended time allowed for the Data frame to arrive once the Start
/// frame was acknowledged (ms).
///
/// # Sizing
///
/// - 1 KiB payload @ 115200 baud: ~90 ms on the wire
/// - Sender turnaround after receiving the ack: one polling period
/// - Safety margin ×5 → 500 ms
pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 500;

/// Recommended settle period after a timeout or an abort before the line is
/// listened to again (ms). Lets trailing bytes of a broken transfer drain.
pub const DEFAULT_COOLDOWN_TIMEOUT_MS: u64 = 50;

/// Recommended quiet period between a broadcast Start frame and its Data
/// frame (ms). Broadcasts get no ack, so this gap is the only thing giving
/// targets time to decode the Start frame and arm their reception; it must
/// exceed twice the slowest target's polling period.
pub const DEFAULT_BROADCAST_GAP_MS: u64 = 10;
