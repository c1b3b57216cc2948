//! Per-conversation message logs.

use std::collections::HashMap;

use trustline_proto::Identity;

use crate::Message;

/// Ordered message histories keyed by conversation partner.
///
/// # Invariants
///
/// - A partner key exists only after [`append`](Self::append) or
///   [`replace`](Self::replace) was called for it. The key set is exactly the
///   set of partners the session interacted with.
/// - Within a conversation, messages are kept in call order. The store never
///   sorts, deduplicates or coalesces.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    conversations: HashMap<Identity, Vec<Message>>,
}

impl MessageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the conversation with `partner`.
    pub fn append(&mut self, partner: Identity, message: Message) {
        self.conversations.entry(partner).or_default().push(message);
    }

    /// Overwrite the conversation with `partner` with an authoritative
    /// history.
    ///
    /// Messages appended locally since the history was requested are
    /// discarded. Callers serialize this against concurrent appends.
    pub fn replace(&mut self, partner: Identity, messages: Vec<Message>) {
        self.conversations.insert(partner, messages);
    }

    /// Messages exchanged with `partner`. Empty if there are none.
    pub fn conversation(&self, partner: &Identity) -> &[Message] {
        self.conversations.get(partner).map_or(&[], Vec::as_slice)
    }

    /// Whether a conversation with `partner` exists.
    pub fn contains(&self, partner: &Identity) -> bool {
        self.conversations.contains_key(partner)
    }

    /// All partners with a conversation, in no particular order.
    pub fn partners(&self) -> impl Iterator<Item = &Identity> {
        self.conversations.keys()
    }

    /// Number of conversations.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Whether the store holds no conversations.
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Total number of messages across all conversations.
    pub fn message_count(&self) -> usize {
        self.conversations.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    fn msg(sender: &str, content: &str) -> Message {
        Message::new(id(sender), content, DateTime::UNIX_EPOCH)
    }

    #[test]
    fn unknown_partner_has_empty_conversation() {
        let store = MessageStore::new();
        assert!(store.conversation(&id("bob")).is_empty());
        assert!(!store.contains(&id("bob")));
        assert!(store.is_empty());
    }

    #[test]
    fn replace_then_append_keeps_order() {
        let mut store = MessageStore::new();
        store.append(id("bob"), msg("bob", "stale"));
        store.replace(id("bob"), vec![msg("bob", "a"), msg("alice", "b")]);
        store.append(id("bob"), msg("bob", "c"));

        let contents: Vec<_> =
            store.conversation(&id("bob")).iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["a", "b", "c"]);
    }

    #[test]
    fn replace_with_empty_history_creates_key() {
        let mut store = MessageStore::new();
        store.replace(id("carol"), Vec::new());
        assert!(store.contains(&id("carol")));
        assert_eq!(store.message_count(), 0);
    }

    #[test]
    fn conversations_are_independent() {
        let mut store = MessageStore::new();
        store.append(id("bob"), msg("bob", "1"));
        store.append(id("carol"), msg("carol", "2"));
        store.replace(id("carol"), Vec::new());

        assert_eq!(store.conversation(&id("bob")).len(), 1);
        assert_eq!(store.len(), 2);
    }
}
