//! Fixed rows inserted into an empty store at startup.

use super::NewMessage;

/// `(text, author)` pairs, in insertion order.
pub const SEED_MESSAGES: [(&str, &str); 10] = [
    ("Hello world", "alice"),
    ("Testing the API", "bob"),
    ("FastAPI is great", "alice"),
    ("Observability matters", "charlie"),
    ("Logging is important", "bob"),
    ("Metrics help debug", "alice"),
    ("Traces show flow", "charlie"),
    ("Health checks are vital", "bob"),
    ("PostgreSQL rocks", "alice"),
    ("Docker simplifies deployment", "charlie"),
];

/// The seed list as insertable messages.
pub fn default_messages() -> Vec<NewMessage> {
    SEED_MESSAGES
        .iter()
        .map(|(text, author)| NewMessage::new(*text, *author))
        .collect()
}
