//! Pelco-D pan/tilt/zoom protocol codec.
//!
//! Every command is exactly seven bytes on the wire:
//!
//! ```text
//! sync (0xFF) | address | command1 | command2 | data1 | data2 | checksum
//! ```
//!
//! with the checksum the sum of the five middle bytes modulo 256. The
//! builders here produce validated frames for the classic command set:
//! movement, zoom, position query, absolute position set, presets, and
//! auxiliary outputs. Position responses decode to hundredths of a degree;
//! see [`Message::pan_angle`] and [`Message::tilt_angle`].
//!
//! The incremental byte-stream parser lives in [`parser`].

pub mod parser;

use thiserror::Error;

/// Leading byte of every frame.
pub const SYNC_BYTE: u8 = 0xFF;
/// Frame length on the wire.
pub const MESSAGE_SIZE: usize = 7;
/// Highest device address the protocol can carry. The `u8` address fields
/// enforce this bound at the type level.
pub const MAX_ADDRESS: u8 = 255;
/// Highest pan/tilt speed.
pub const MAX_SPEED: u8 = 0x3F;
/// Highest preset identifier.
pub const MAX_PRESET: u8 = 255;
/// Highest raw angle in hundredths of a degree (359.99°).
pub const MAX_ANGLE_RAW: u16 = 35999;

/// `command2` opcodes and movement bits.
pub mod cmd2 {
    pub const ZOOM_WIDE: u8 = 0x40;
    pub const ZOOM_TELE: u8 = 0x20;
    pub const TILT_DOWN: u8 = 0x10;
    pub const TILT_UP: u8 = 0x08;
    pub const PAN_LEFT: u8 = 0x04;
    pub const PAN_RIGHT: u8 = 0x02;

    pub const SET_PRESET: u8 = 0x03;
    pub const CLEAR_PRESET: u8 = 0x05;
    pub const CALL_PRESET: u8 = 0x07;
    pub const SET_AUX: u8 = 0x09;
    pub const CLEAR_AUX: u8 = 0x0B;

    pub const QUERY_PAN: u8 = 0x51;
    pub const QUERY_TILT: u8 = 0x53;
    pub const SET_PAN: u8 = 0x4B;
    pub const SET_TILT: u8 = 0x4D;
    pub const RESPONSE_PAN: u8 = 0x59;
    pub const RESPONSE_TILT: u8 = 0x5B;
}

/// Protocol-layer errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PelcoError {
    /// Speed above [`MAX_SPEED`].
    #[error("speed {0:#04x} exceeds the protocol maximum 0x3f")]
    InvalidSpeed(u8),

    /// Raw angle above [`MAX_ANGLE_RAW`].
    #[error("raw angle {0} is outside 0..=35999 hundredths of a degree")]
    InvalidAngle(u16),

    /// Auxiliary output outside 1..=8.
    #[error("auxiliary output {0} is outside 1..=8")]
    InvalidAux(u8),

    /// Byte buffer shorter than [`MESSAGE_SIZE`].
    #[error("buffer of {0} bytes is too small for a 7-byte frame")]
    BufferTooSmall(usize),

    /// Frame does not start with [`SYNC_BYTE`].
    #[error("sync byte {0:#04x} is not 0xff")]
    BadSync(u8),

    /// Stored checksum disagrees with the computed one.
    #[error("checksum mismatch: computed {computed:#04x}, found {found:#04x}")]
    Checksum {
        /// Checksum computed over the frame body.
        computed: u8,
        /// Checksum byte carried by the frame.
        found: u8,
    },
}

/// Pan movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanDirection {
    Stop,
    Left,
    Right,
}

/// Tilt movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiltDirection {
    Stop,
    Up,
    Down,
}

/// Zoom direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    Stop,
    Wide,
    Tele,
}

/// Axis selector for position queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Pan,
    Tilt,
}

/// One 7-byte Pelco-D frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Message {
    pub sync: u8,
    pub address: u8,
    pub command1: u8,
    pub command2: u8,
    pub data1: u8,
    pub data2: u8,
    pub checksum: u8,
}

impl Message {
    /// Build a frame from raw fields; the sync byte and checksum are filled
    /// in.
    pub fn new(address: u8, command1: u8, command2: u8, data1: u8, data2: u8) -> Self {
        let mut msg = Self {
            sync: SYNC_BYTE,
            address,
            command1,
            command2,
            data1,
            data2,
            checksum: 0,
        };
        msg.checksum = msg.compute_checksum();
        msg
    }

    /// Pan movement at the given speed. `data2` carries the speed.
    pub fn pan(address: u8, direction: PanDirection, speed: u8) -> Result<Self, PelcoError> {
        if speed > MAX_SPEED {
            return Err(PelcoError::InvalidSpeed(speed));
        }
        let command2 = match direction {
            PanDirection::Stop => 0x00,
            PanDirection::Left => cmd2::PAN_LEFT,
            PanDirection::Right => cmd2::PAN_RIGHT,
        };
        Ok(Self::new(address, 0x00, command2, 0x00, speed))
    }

    /// Tilt movement at the given speed. `data2` carries the speed.
    pub fn tilt(address: u8, direction: TiltDirection, speed: u8) -> Result<Self, PelcoError> {
        if speed > MAX_SPEED {
            return Err(PelcoError::InvalidSpeed(speed));
        }
        let command2 = match direction {
            TiltDirection::Stop => 0x00,
            TiltDirection::Up => cmd2::TILT_UP,
            TiltDirection::Down => cmd2::TILT_DOWN,
        };
        Ok(Self::new(address, 0x00, command2, 0x00, speed))
    }

    /// Zoom command.
    pub fn zoom(address: u8, direction: ZoomDirection) -> Self {
        let command2 = match direction {
            ZoomDirection::Stop => 0x00,
            ZoomDirection::Wide => cmd2::ZOOM_WIDE,
            ZoomDirection::Tele => cmd2::ZOOM_TELE,
        };
        Self::new(address, 0x00, command2, 0x00, 0x00)
    }

    /// Halt all movement (all-zero command and data bytes).
    pub fn stop(address: u8) -> Self {
        Self::new(address, 0x00, 0x00, 0x00, 0x00)
    }

    /// Ask the device for its current pan or tilt position.
    pub fn query_position(address: u8, axis: Axis) -> Self {
        let command2 = match axis {
            Axis::Pan => cmd2::QUERY_PAN,
            Axis::Tilt => cmd2::QUERY_TILT,
        };
        Self::new(address, 0x00, command2, 0x00, 0x00)
    }

    /// Drive the pan axis to an absolute position, in hundredths of a
    /// degree (0..=35999). The 16-bit angle splits big-endian across
    /// `data1:data2`.
    pub fn set_pan_angle(address: u8, angle_raw: u16) -> Result<Self, PelcoError> {
        if angle_raw > MAX_ANGLE_RAW {
            return Err(PelcoError::InvalidAngle(angle_raw));
        }
        let [data1, data2] = angle_raw.to_be_bytes();
        Ok(Self::new(address, 0x00, cmd2::SET_PAN, data1, data2))
    }

    /// Drive the tilt axis to an absolute position, in hundredths of a
    /// degree (0..=35999).
    pub fn set_tilt_angle(address: u8, angle_raw: u16) -> Result<Self, PelcoError> {
        if angle_raw > MAX_ANGLE_RAW {
            return Err(PelcoError::InvalidAngle(angle_raw));
        }
        let [data1, data2] = angle_raw.to_be_bytes();
        Ok(Self::new(address, 0x00, cmd2::SET_TILT, data1, data2))
    }

    /// Store the current position as a preset.
    pub fn set_preset(address: u8, preset: u8) -> Self {
        Self::new(address, 0x00, cmd2::SET_PRESET, 0x00, preset)
    }

    /// Recall a stored preset.
    pub fn call_preset(address: u8, preset: u8) -> Self {
        Self::new(address, 0x00, cmd2::CALL_PRESET, 0x00, preset)
    }

    /// Delete a stored preset.
    pub fn clear_preset(address: u8, preset: u8) -> Self {
        Self::new(address, 0x00, cmd2::CLEAR_PRESET, 0x00, preset)
    }

    /// Energize an auxiliary output (1..=8).
    pub fn set_aux(address: u8, aux: u8) -> Result<Self, PelcoError> {
        if !(1..=8).contains(&aux) {
            return Err(PelcoError::InvalidAux(aux));
        }
        Ok(Self::new(address, 0x00, cmd2::SET_AUX, 0x00, aux))
    }

    /// De-energize an auxiliary output (1..=8).
    pub fn clear_aux(address: u8, aux: u8) -> Result<Self, PelcoError> {
        if !(1..=8).contains(&aux) {
            return Err(PelcoError::InvalidAux(aux));
        }
        Ok(Self::new(address, 0x00, cmd2::CLEAR_AUX, 0x00, aux))
    }

    /// Checksum over the five body bytes, modulo 256.
    pub fn compute_checksum(&self) -> u8 {
        let sum = u32::from(self.address)
            + u32::from(self.command1)
            + u32::from(self.command2)
            + u32::from(self.data1)
            + u32::from(self.data2);
        (sum % 256) as u8
    }

    /// Check sync byte and checksum.
    pub fn validate(&self) -> Result<(), PelcoError> {
        if self.sync != SYNC_BYTE {
            return Err(PelcoError::BadSync(self.sync));
        }
        let computed = self.compute_checksum();
        if computed != self.checksum {
            return Err(PelcoError::Checksum {
                computed,
                found: self.checksum,
            });
        }
        Ok(())
    }

    /// Serialize to wire order.
    pub fn to_bytes(&self) -> [u8; MESSAGE_SIZE] {
        [
            self.sync,
            self.address,
            self.command1,
            self.command2,
            self.data1,
            self.data2,
            self.checksum,
        ]
    }

    /// Deserialize from wire order. The frame is returned as-is; call
    /// [`Message::validate`] separately.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, PelcoError> {
        if buf.len() < MESSAGE_SIZE {
            return Err(PelcoError::BufferTooSmall(buf.len()));
        }
        Ok(Self {
            sync: buf[0],
            address: buf[1],
            command1: buf[2],
            command2: buf[3],
            data1: buf[4],
            data2: buf[5],
            checksum: buf[6],
        })
    }

    /// Raw 16-bit position payload, big-endian across `data1:data2`.
    fn position_raw(&self) -> i32 {
        i32::from(u16::from_be_bytes([self.data1, self.data2]))
    }

    /// Decoded pan angle in whole degrees, for pan position responses.
    ///
    /// Raw pan positions run 0..=35999 hundredths of a degree clockwise.
    pub fn pan_angle(&self) -> Option<i32> {
        (self.command2 == cmd2::RESPONSE_PAN).then(|| self.position_raw() / 100)
    }

    /// Decoded tilt angle in whole degrees, for tilt position responses.
    ///
    /// Raw tilt positions above 18000 are upward (positive degrees), below
    /// 18000 downward (negative), and 18000 itself is level.
    pub fn tilt_angle(&self) -> Option<i32> {
        if self.command2 != cmd2::RESPONSE_TILT {
            return None;
        }
        let raw = self.position_raw();
        Some(match raw.cmp(&18000) {
            std::cmp::Ordering::Greater => (36000 - raw) / 100,
            std::cmp::Ordering::Less => -(raw / 100),
            std::cmp::Ordering::Equal => 0,
        })
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02X} {:02X} {:02X} {:02X} {:02X} {:02X} {:02X}",
            self.sync, self.address, self.command1, self.command2, self.data1, self.data2,
            self.checksum
        )
    }
}
