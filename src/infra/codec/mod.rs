//! Field-level codec primitives: sequential byte cursors and the pluggable
//! checksum strategy.
pub mod bytes;
pub mod checksum;
