//! Turns received bytes into typed messages, in arrival order.

use crate::envelope;
use crate::framer::MessageFramer;
use crate::message::{self, Decoder, Message};
use crate::Error;
use std::collections::HashMap;
use std::ops::ControlFlow;

/// Largest message the standard allows, in bytes.
pub const MAX_MESSAGE_SIZE: usize = 65_536;

/// Per-session registry of the message types a role understands, on top of
/// the session's receive buffer.
pub struct Dispatcher {
    framer: MessageFramer,
    decoders: HashMap<&'static str, Decoder>,
}

impl Dispatcher {
    /// A dispatcher decoding only `tags`; other message types are ignored.
    pub fn new(tags: &[&'static str]) -> Self {
        let decoders = tags
            .iter()
            .filter_map(|tag| message::decoder(tag).map(|decode| (*tag, decode)))
            .collect();
        Self {
            framer: MessageFramer::new(),
            decoders,
        }
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.decoders.contains_key(tag)
    }

    /// Buffers `bytes` and hands every complete message to `handler`, one at a
    /// time. Stops early if the handler breaks.
    ///
    /// Decode failures and oversized partial messages are returned as errors;
    /// the caller must end the session.
    pub fn dispatch<F>(&mut self, bytes: &[u8], mut handler: F) -> Result<(), Error>
    where
        F: FnMut(Message) -> ControlFlow<()>,
    {
        self.framer.push(bytes);
        while let Some(span) = self.framer.next_message() {
            let node = envelope::decode(span)?;
            let Some(decode) = self.decoders.get(node.name()) else {
                tracing::warn!(tag = node.name(), "ignoring unsupported message");
                continue;
            };
            let message = decode(&node)?;
            tracing::debug!(tag = message.tag(), "received");
            if handler(message).is_break() {
                self.framer.clear();
                return Ok(());
            }
        }
        if self.framer.pending() > MAX_MESSAGE_SIZE {
            return Err(Error::peer(format!(
                "maximum message size exceeded ({} > {MAX_MESSAGE_SIZE} bytes)",
                self.framer.pending()
            )));
        }
        self.framer.compact();
        Ok(())
    }
}
