//! Abstraction traits used by the engine (serial port and buffer allocator).
pub mod allocator;
pub mod serial_port;
