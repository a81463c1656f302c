use std::collections::HashMap;

use super::message::{Message, MessageKey};

/// Deduplicated message collection that keeps insertion order.
///
/// Merging overlays new records on the existing ones: a known key is
/// replaced where it already sits, an unknown key is appended.
#[derive(Debug, Default, Clone)]
pub struct MessageLog {
    entries: Vec<Message>,
    index: HashMap<MessageKey, usize>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay `incoming` onto the log. Returns the number of new keys.
    pub fn merge<I>(&mut self, incoming: I) -> usize
    where
        I: IntoIterator<Item = Message>,
    {
        let mut added = 0;
        for message in incoming {
            let key = message.key();
            match self.index.get(&key) {
                Some(&slot) => self.entries[slot] = message,
                None => {
                    self.index.insert(key, self.entries.len());
                    self.entries.push(message);
                    added += 1;
                }
            }
        }
        added
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn get(&self, key: &MessageKey) -> Option<&Message> {
        self.index.get(key).map(|&slot| &self.entries[slot])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<Message> {
        self.entries.clone()
    }
}
