//! Extraction of complete `<Hermes ...>...</Hermes>` envelopes from a byte stream.

const OPENING: &[u8] = b"<Hermes";
const CLOSING: &[u8] = b"</Hermes";

/// Receive buffer that transport code appends into and the dispatcher drains.
///
/// Bytes before an opening tag are garbage and are dropped. A trailing
/// partial envelope stays buffered until more bytes arrive.
#[derive(Debug, Default)]
pub struct MessageFramer {
    buffer: Vec<u8>,
    start: usize,
}

impl MessageFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of buffered bytes not yet consumed.
    pub fn pending(&self) -> usize {
        self.buffer.len() - self.start
    }

    /// Returns the next complete envelope, or `None` if only a partial one
    /// (or nothing) is buffered.
    pub fn next_message(&mut self) -> Option<&[u8]> {
        loop {
            let rest = &self.buffer[self.start..];
            let Some(lt) = rest.iter().position(|&b| b == b'<') else {
                self.start = self.buffer.len();
                return None;
            };
            self.start += lt;
            let rest = &self.buffer[self.start..];
            if rest.len() < OPENING.len() {
                return None;
            }
            if !rest.starts_with(OPENING) {
                self.start += 1;
                continue;
            }
            let closing = find(&rest[OPENING.len()..], CLOSING)? + OPENING.len();
            let after = closing + CLOSING.len();
            let gt = rest[after..].iter().position(|&b| b == b'>')? + after;

            let begin = self.start;
            self.start += gt + 1;
            return Some(&self.buffer[begin..self.start]);
        }
    }

    /// Drops consumed bytes so the buffer holds only the unconsumed remainder.
    pub fn compact(&mut self) {
        self.buffer.drain(..self.start);
        self.start = 0;
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.start = 0;
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
