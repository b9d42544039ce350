//! Thin transport adapters the control loops talk through.
//!
//! These are deliberately minimal byte sinks/sources: the scheduler and the
//! protocol layer never interpret transport errors, which surface as plain
//! [`std::io::Error`] values from here.

pub mod pipe;
pub mod serial;
pub mod udp;

pub use pipe::{Fifo, FifoMode};
pub use serial::{FlushDirection, SerialPort};
pub use udp::UdpSender;
