//! Incremental Pelco-D byte-stream parser.
//!
//! Consumes a possibly-fragmented byte stream one chunk at a time and
//! surfaces validated frames as they complete. On framing loss (checksum
//! mismatch, stray bytes) it resynchronizes by discarding input until the
//! next sync byte; recovery costs at most one frame length past the next
//! true sync byte. The parser owns only a work frame and two counters —
//! caller buffers are never retained.

use super::{Message, SYNC_BYTE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Sync,
    Address,
    Command1,
    Command2,
    Data1,
    Data2,
    Checksum,
}

/// Classification of a validated frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Pan position response (`command2 == 0x59`), angle in whole degrees.
    PanPosition { degrees: i32 },
    /// Tilt position response (`command2 == 0x5B`), angle in whole degrees,
    /// positive upward.
    TiltPosition { degrees: i32 },
    /// Any other valid frame.
    Unknown,
}

/// A validated frame plus its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedMessage {
    /// The raw frame as assembled from the stream.
    pub frame: Message,
    /// What the frame is.
    pub kind: MessageKind,
}

/// Outcome of one [`StreamParser::feed`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    /// A frame completed and validated. `consumed` bytes of the chunk were
    /// used; re-feed the remainder to surface any further frames.
    Message {
        parsed: ParsedMessage,
        consumed: usize,
    },
    /// The chunk was exhausted mid-frame (or yielded only invalid frames);
    /// feed more bytes.
    NeedMore,
}

/// Stateful stream parser. One owner; state persists across chunks.
#[derive(Debug)]
pub struct StreamParser {
    state: State,
    frame: Message,
    messages_parsed: u32,
    parser_errors: u32,
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamParser {
    pub fn new() -> Self {
        Self {
            state: State::Sync,
            frame: Message::default(),
            messages_parsed: 0,
            parser_errors: 0,
        }
    }

    /// Consume bytes from `data` until a frame completes or the chunk runs
    /// out.
    ///
    /// A chunk may hold several frames; on [`Feed::Message`] the caller
    /// re-feeds `data[consumed..]` (or uses [`StreamParser::drain`]).
    pub fn feed(&mut self, data: &[u8]) -> Feed {
        for (i, &byte) in data.iter().enumerate() {
            match self.state {
                State::Sync => {
                    // Discard until a sync byte shows up.
                    if byte == SYNC_BYTE {
                        self.frame = Message {
                            sync: byte,
                            ..Message::default()
                        };
                        self.state = State::Address;
                    }
                }
                State::Address => {
                    self.frame.address = byte;
                    self.state = State::Command1;
                }
                State::Command1 => {
                    self.frame.command1 = byte;
                    self.state = State::Command2;
                }
                State::Command2 => {
                    self.frame.command2 = byte;
                    self.state = State::Data1;
                }
                State::Data1 => {
                    self.frame.data1 = byte;
                    self.state = State::Data2;
                }
                State::Data2 => {
                    self.frame.data2 = byte;
                    self.state = State::Checksum;
                }
                State::Checksum => {
                    self.frame.checksum = byte;
                    self.state = State::Sync;
                    match self.frame.validate() {
                        Ok(()) => {
                            self.messages_parsed += 1;
                            return Feed::Message {
                                parsed: classify(self.frame),
                                consumed: i + 1,
                            };
                        }
                        Err(e) => {
                            // Resync: stay in Sync and keep scanning.
                            self.parser_errors += 1;
                            log::debug!("pelco parser resync: {e}");
                        }
                    }
                }
            }
        }
        Feed::NeedMore
    }

    /// Feed a whole chunk and collect every frame it completes.
    pub fn drain(&mut self, mut data: &[u8]) -> Vec<ParsedMessage> {
        let mut out = Vec::new();
        while let Feed::Message { parsed, consumed } = self.feed(data) {
            out.push(parsed);
            data = &data[consumed..];
        }
        out
    }

    /// Frames successfully parsed over the parser's lifetime.
    pub fn messages_parsed(&self) -> u32 {
        self.messages_parsed
    }

    /// Validation failures (checksum mismatches after a sync byte).
    pub fn parser_errors(&self) -> u32 {
        self.parser_errors
    }
}

fn classify(frame: Message) -> ParsedMessage {
    let kind = if let Some(degrees) = frame.pan_angle() {
        MessageKind::PanPosition { degrees }
    } else if let Some(degrees) = frame.tilt_angle() {
        MessageKind::TiltPosition { degrees }
    } else {
        MessageKind::Unknown
    };
    ParsedMessage { frame, kind }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pelco::{Axis, cmd2};

    fn response(command2: u8, raw: u16) -> [u8; 7] {
        let [data1, data2] = raw.to_be_bytes();
        Message::new(1, 0x00, command2, data1, data2).to_bytes()
    }

    #[test]
    fn parses_single_frame() {
        let mut parser = StreamParser::new();
        let bytes = Message::query_position(1, Axis::Pan).to_bytes();
        let Feed::Message { parsed, consumed } = parser.feed(&bytes) else {
            panic!("expected a parsed frame");
        };
        assert_eq!(consumed, 7);
        assert_eq!(parsed.kind, MessageKind::Unknown);
        assert_eq!(parsed.frame.command2, cmd2::QUERY_PAN);
        assert_eq!(parser.messages_parsed(), 1);
        assert_eq!(parser.parser_errors(), 0);
    }

    #[test]
    fn parses_across_fragmented_chunks() {
        let mut parser = StreamParser::new();
        let bytes = response(cmd2::RESPONSE_PAN, 4500);
        assert_eq!(parser.feed(&bytes[..3]), Feed::NeedMore);
        let Feed::Message { parsed, consumed } = parser.feed(&bytes[3..]) else {
            panic!("expected frame completion on second chunk");
        };
        assert_eq!(consumed, 4);
        assert_eq!(parsed.kind, MessageKind::PanPosition { degrees: 45 });
    }

    #[test]
    fn two_frames_with_leading_noise() {
        // Two valid query frames behind two noise bytes; noise costs nothing
        // but discarded input.
        let stream: &[u8] = &[
            0x00, 0x00, 0xFF, 0x01, 0x00, 0x51, 0x00, 0x00, 0x52, 0xFF, 0x01, 0x00, 0x53, 0x00,
            0x00, 0x54,
        ];
        let mut parser = StreamParser::new();
        let parsed = parser.drain(stream);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].kind, MessageKind::Unknown);
        assert_eq!(parsed[0].frame.command2, 0x51);
        assert_eq!(parsed[1].frame.command2, 0x53);
        assert_eq!(parser.messages_parsed(), 2);
        assert_eq!(parser.parser_errors(), 0);
    }

    #[test]
    fn resyncs_after_corrupt_frame() {
        let good = response(cmd2::RESPONSE_TILT, 20000);
        let mut corrupt = good;
        corrupt[4] ^= 0x01; // single bit flip in data1

        let mut stream = Vec::new();
        stream.extend_from_slice(&corrupt);
        stream.extend_from_slice(&good);

        let mut parser = StreamParser::new();
        let parsed = parser.drain(&stream);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].kind, MessageKind::TiltPosition { degrees: 160 });
        assert_eq!(parser.messages_parsed(), 1);
        assert!(parser.parser_errors() >= 1);
    }

    #[test]
    fn recovers_after_dropped_byte() {
        let frame = response(cmd2::RESPONSE_PAN, 9000);
        let mut stream = Vec::new();
        stream.extend_from_slice(&frame[..6]); // truncated frame
        stream.extend_from_slice(&frame);
        stream.extend_from_slice(&frame);

        let mut parser = StreamParser::new();
        let parsed = parser.drain(&stream);
        // The truncated frame swallows the following sync byte as its
        // checksum, so the first complete frame is lost too; the stream
        // recovers at the sync byte after that.
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].kind, MessageKind::PanPosition { degrees: 90 });
        assert_eq!(parser.parser_errors(), 1);
    }

    #[test]
    fn counters_accumulate_across_chunks() {
        let mut parser = StreamParser::new();
        for _ in 0..5 {
            let bytes = Message::stop(1).to_bytes();
            assert!(matches!(parser.feed(&bytes), Feed::Message { .. }));
        }
        assert_eq!(parser.messages_parsed(), 5);
    }

    #[test]
    fn empty_chunk_needs_more() {
        let mut parser = StreamParser::new();
        assert_eq!(parser.feed(&[]), Feed::NeedMore);
        assert!(parser.drain(&[]).is_empty());
    }

    #[test]
    fn tilt_classification_carries_sign() {
        let mut parser = StreamParser::new();
        let down = response(cmd2::RESPONSE_TILT, 4500);
        let Feed::Message { parsed, .. } = parser.feed(&down) else {
            panic!("expected tilt response to parse");
        };
        assert_eq!(parsed.kind, MessageKind::TiltPosition { degrees: -45 });
    }
}
