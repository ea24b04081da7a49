//! Append-only list of displayed messages.

use crate::state::{Message, MessageId, Sender};

/// What a transcript entry currently shows.
///
/// `T` is whatever the active markdown renderer produces.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeView<T> {
    /// Raw text, shown as-is. Bot replies grow one character at a time here.
    Plain(String),
    /// The finished, markdown-formatted reply.
    Rendered(T),
}

impl<T> NodeView<T> {
    pub fn as_rendered(&self) -> Option<&T> {
        match self {
            NodeView::Plain(_) => None,
            NodeView::Rendered(output) => Some(output),
        }
    }
}

/// A message and how it is currently displayed. Only the view changes after
/// the entry is appended.
#[derive(Debug, Clone)]
pub struct Entry<T> {
    id: MessageId,
    message: Message,
    pub view: NodeView<T>,
}

impl<T> Entry<T> {
    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn sender(&self) -> Sender {
        self.message.sender
    }
}

#[derive(Debug, Clone)]
pub struct Transcript<T> {
    entries: Vec<Entry<T>>,
    next_id: u64,
}

impl<T> Default for Transcript<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Transcript<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Appends a message with the given initial view and returns its id.
    pub fn append(&mut self, message: Message, view: NodeView<T>) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, message, view });
        id
    }

    pub fn get(&self, id: MessageId) -> Option<&Entry<T>> {
        // Ids are handed out in insertion order and entries are never removed.
        self.entries
            .binary_search_by_key(&id, |entry| entry.id)
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn get_mut(&mut self, id: MessageId) -> Option<&mut Entry<T>> {
        match self.entries.binary_search_by_key(&id, |entry| entry.id) {
            Ok(idx) => Some(&mut self.entries[idx]),
            Err(_) => None,
        }
    }

    pub fn last(&self) -> Option<&Entry<T>> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry<T>> {
        self.entries.iter()
    }
}
