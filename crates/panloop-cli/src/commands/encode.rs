//! `panloop encode` — build a single Pelco-D frame from arguments.

use clap::Subcommand;

use panloop_core::pelco::{
    Axis, Message, PanDirection, PelcoError, TiltDirection, ZoomDirection,
};

#[derive(Subcommand)]
pub enum EncodeCommand {
    /// Pan movement command
    Pan {
        /// Device address
        #[arg(long, default_value_t = 1)]
        address: u8,

        #[arg(long, value_parser = ["left", "right", "stop"])]
        direction: String,

        /// Speed, 0x00..=0x3F
        #[arg(long, default_value_t = 0x20)]
        speed: u8,
    },

    /// Tilt movement command
    Tilt {
        #[arg(long, default_value_t = 1)]
        address: u8,

        #[arg(long, value_parser = ["up", "down", "stop"])]
        direction: String,

        /// Speed, 0x00..=0x3F
        #[arg(long, default_value_t = 0x20)]
        speed: u8,
    },

    /// Zoom command
    Zoom {
        #[arg(long, default_value_t = 1)]
        address: u8,

        #[arg(long, value_parser = ["wide", "tele", "stop"])]
        direction: String,
    },

    /// Halt all movement
    Stop {
        #[arg(long, default_value_t = 1)]
        address: u8,
    },

    /// Query the current pan or tilt position
    Query {
        #[arg(long, default_value_t = 1)]
        address: u8,

        #[arg(long, value_parser = ["pan", "tilt"])]
        axis: String,
    },

    /// Drive an axis to an absolute position
    SetAngle {
        #[arg(long, default_value_t = 1)]
        address: u8,

        #[arg(long, value_parser = ["pan", "tilt"])]
        axis: String,

        /// Position in hundredths of a degree, 0..=35999
        #[arg(long)]
        raw: u16,
    },

    /// Store, recall, or delete a preset
    Preset {
        #[arg(long, default_value_t = 1)]
        address: u8,

        #[arg(long, value_parser = ["set", "call", "clear"])]
        action: String,

        /// Preset identifier
        #[arg(long)]
        id: u8,
    },

    /// Energize or de-energize an auxiliary output
    Aux {
        #[arg(long, default_value_t = 1)]
        address: u8,

        #[arg(long, value_parser = ["set", "clear"])]
        action: String,

        /// Auxiliary output, 1..=8
        #[arg(long)]
        id: u8,
    },
}

pub fn run(command: EncodeCommand) {
    match build(command) {
        Ok(frame) => println!("{frame}"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn build(command: EncodeCommand) -> Result<Message, PelcoError> {
    match command {
        EncodeCommand::Pan {
            address,
            direction,
            speed,
        } => {
            let direction = match direction.as_str() {
                "left" => PanDirection::Left,
                "right" => PanDirection::Right,
                _ => PanDirection::Stop,
            };
            Message::pan(address, direction, speed)
        }
        EncodeCommand::Tilt {
            address,
            direction,
            speed,
        } => {
            let direction = match direction.as_str() {
                "up" => TiltDirection::Up,
                "down" => TiltDirection::Down,
                _ => TiltDirection::Stop,
            };
            Message::tilt(address, direction, speed)
        }
        EncodeCommand::Zoom { address, direction } => {
            let direction = match direction.as_str() {
                "wide" => ZoomDirection::Wide,
                "tele" => ZoomDirection::Tele,
                _ => ZoomDirection::Stop,
            };
            Ok(Message::zoom(address, direction))
        }
        EncodeCommand::Stop { address } => Ok(Message::stop(address)),
        EncodeCommand::Query { address, axis } => {
            let axis = if axis == "tilt" { Axis::Tilt } else { Axis::Pan };
            Ok(Message::query_position(address, axis))
        }
        EncodeCommand::SetAngle { address, axis, raw } => {
            if axis == "tilt" {
                Message::set_tilt_angle(address, raw)
            } else {
                Message::set_pan_angle(address, raw)
            }
        }
        EncodeCommand::Preset {
            address,
            action,
            id,
        } => Ok(match action.as_str() {
            "set" => Message::set_preset(address, id),
            "clear" => Message::clear_preset(address, id),
            _ => Message::call_preset(address, id),
        }),
        EncodeCommand::Aux {
            address,
            action,
            id,
        } => {
            if action == "set" {
                Message::set_aux(address, id)
            } else {
                Message::clear_aux(address, id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pan_command_builds_reference_frame() {
        let frame = build(EncodeCommand::Pan {
            address: 1,
            direction: "left".to_string(),
            speed: 0x20,
        })
        .unwrap();
        assert_eq!(frame.to_string(), "FF 01 00 04 00 20 25");
    }

    #[test]
    fn set_angle_selects_axis() {
        let pan = build(EncodeCommand::SetAngle {
            address: 1,
            axis: "pan".to_string(),
            raw: 4500,
        })
        .unwrap();
        assert_eq!(pan.command2, 0x4B);

        let tilt = build(EncodeCommand::SetAngle {
            address: 1,
            axis: "tilt".to_string(),
            raw: 4500,
        })
        .unwrap();
        assert_eq!(tilt.command2, 0x4D);
    }

    #[test]
    fn excess_speed_is_an_error() {
        assert!(
            build(EncodeCommand::Tilt {
                address: 1,
                direction: "up".to_string(),
                speed: 0x7F,
            })
            .is_err()
        );
    }
}
