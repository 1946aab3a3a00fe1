pub mod spam_client;

pub use spam_client::{DEFAULT_SPAM_API_URL, HttpSpamClassifier, SpamClassifier};
