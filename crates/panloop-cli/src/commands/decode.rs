//! `panloop decode` — run the streaming parser over caller-supplied bytes.

use std::io::Read;

use panloop_core::pelco::parser::{MessageKind, StreamParser};

pub fn run(hex: Option<&str>, stdin: bool) {
    let data = match (hex, stdin) {
        (Some(hex), _) => match parse_hex(hex) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
        (None, true) => {
            let mut data = Vec::new();
            if let Err(e) = std::io::stdin().read_to_end(&mut data) {
                eprintln!("Error reading stdin: {e}");
                std::process::exit(1);
            }
            data
        }
        (None, false) => {
            eprintln!("Error: provide --hex <bytes> or --stdin");
            std::process::exit(1);
        }
    };

    let mut parser = StreamParser::new();
    for parsed in parser.drain(&data) {
        match parsed.kind {
            MessageKind::PanPosition { degrees } => {
                println!("{}  pan position {degrees}°", parsed.frame);
            }
            MessageKind::TiltPosition { degrees } => {
                println!("{}  tilt position {degrees}°", parsed.frame);
            }
            MessageKind::Unknown => println!("{}  command", parsed.frame),
        }
    }
    println!(
        "{} frame(s) parsed, {} framing error(s)",
        parser.messages_parsed(),
        parser.parser_errors()
    );
}

/// Parse loosely formatted hex: whitespace, commas, and `0x` prefixes are
/// accepted between byte values.
fn parse_hex(input: &str) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    for token in input.split([' ', '\t', '\n', ',']).filter(|t| !t.is_empty()) {
        let token = token.strip_prefix("0x").unwrap_or(token);
        if token.len() > 2 {
            return Err(format!("byte value too long: {token:?}"));
        }
        let byte =
            u8::from_str_radix(token, 16).map_err(|_| format!("invalid hex byte: {token:?}"))?;
        out.push(byte);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spaced_hex() {
        assert_eq!(
            parse_hex("FF 01 00 51 00 00 52").unwrap(),
            vec![0xFF, 0x01, 0x00, 0x51, 0x00, 0x00, 0x52]
        );
    }

    #[test]
    fn accepts_prefixes_and_commas() {
        assert_eq!(parse_hex("0xff, 0x01").unwrap(), vec![0xFF, 0x01]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_hex("zz").is_err());
        assert!(parse_hex("123").is_err());
    }
}
