// ABOUTME: Incremental decoder from raw channel bytes to clean text.
// ABOUTME: Strips ANSI CSI sequences and carriage returns, carrying partial input across reads.

const ESC: u8 = 0x1b;
const CR: u8 = b'\r';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Ground,
    /// Saw ESC, waiting to learn whether a CSI sequence follows.
    Escape,
    /// Inside `ESC [`, consuming parameter and intermediate bytes.
    Csi,
}

/// Turns terminal output into plain text.
///
/// Input arrives in arbitrary chunks, so escape sequences and multi-byte
/// UTF-8 code points may be split between calls to [`Decoder::push`]. Both
/// are buffered until complete. Invalid UTF-8 is dropped.
#[derive(Debug, Default)]
pub struct Decoder {
    state: State,
    /// Filtered bytes not yet decoded (an incomplete UTF-8 tail).
    partial: Vec<u8>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of raw bytes, returning whatever text is now complete.
    pub fn push(&mut self, input: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.partial);
        bytes.reserve(input.len());

        for &b in input {
            match self.state {
                State::Ground => match b {
                    ESC => self.state = State::Escape,
                    CR => {}
                    _ => bytes.push(b),
                },
                State::Escape => {
                    if b == b'[' {
                        self.state = State::Csi;
                    } else if b == ESC {
                        bytes.push(ESC);
                    } else {
                        // Not a CSI sequence; leave it in the text.
                        self.state = State::Ground;
                        bytes.push(ESC);
                        if b != CR {
                            bytes.push(b);
                        }
                    }
                }
                State::Csi => match b {
                    0x20..=0x3f => {}
                    0x40..=0x7e => self.state = State::Ground,
                    ESC => self.state = State::Escape,
                    // Malformed sequence: drop what we have and resume.
                    _ => {
                        self.state = State::Ground;
                        if b != CR {
                            bytes.push(b);
                        }
                    }
                },
            }
        }

        self.decode(bytes)
    }

    fn decode(&mut self, mut bytes: Vec<u8>) -> String {
        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => rest = &after[len..],
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let keep = rest.len();
        if keep > 0 {
            let start = bytes.len() - keep;
            self.partial = bytes.split_off(start);
        }
        out
    }
}

/// Decode a complete byte string in one go.
pub fn clean(input: &[u8]) -> String {
    Decoder::new().push(input)
}
