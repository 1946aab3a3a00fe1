use crate::common::{ChatError, ChatResult, Message, Room, SendMessageRequest};
use crate::network::SpamClassifier;
use crate::storage::RoomStore;

/// Orchestrates room lookups, spam classification and persistence.
///
/// Submission reads the room, appends, and saves the whole room back. Two
/// concurrent submissions to one room can therefore lose a message: the later
/// save wins.
pub struct ChatService<S, C> {
    rooms: S,
    classifier: C,
}

impl<S: RoomStore, C: SpamClassifier> ChatService<S, C> {
    pub fn new(rooms: S, classifier: C) -> Self {
        Self { rooms, classifier }
    }

    /// Classify and append a message to an existing room.
    pub async fn send_message(&self, request: SendMessageRequest) -> ChatResult<Message> {
        let SendMessageRequest {
            room_id,
            sender,
            content,
        } = request;

        let Some(mut room) = self.rooms.find_by_room_id(&room_id)? else {
            log::warn!("Message from {sender} rejected: room {room_id} not found");
            return Err(ChatError::RoomNotFound(room_id));
        };

        let spam = self.classifier.classify(&content).await;
        let message = Message::new(sender, content, spam);

        room.messages.push(message.clone());
        self.rooms.save(room)?;

        log::info!(
            "Stored message from {} in room {} (spam level {:.3}{})",
            message.sender,
            room_id,
            message.spam_level,
            if message.is_spam { ", flagged" } else { "" }
        );

        Ok(message)
    }

    pub fn create_room(&self, room_id: &str) -> ChatResult<Room> {
        let room_id = room_id.trim();
        if room_id.is_empty() {
            return Err(ChatError::InvalidRequest("room id must not be blank".into()));
        }

        let room = Room::new(room_id);
        if !self.rooms.create(&room)? {
            return Err(ChatError::RoomAlreadyExists(room.room_id));
        }

        log::info!("Created room {}", room.room_id);
        Ok(room)
    }

    pub fn join_room(&self, room_id: &str) -> ChatResult<Room> {
        self.rooms
            .find_by_room_id(room_id)?
            .ok_or_else(|| ChatError::RoomNotFound(room_id.to_string()))
    }

    /// Page through a room's history, newest page first.
    ///
    /// Page 0 holds the latest `size` messages; each page is in chronological order.
    pub fn get_messages(
        &self,
        room_id: &str,
        page: usize,
        size: usize,
    ) -> ChatResult<Vec<Message>> {
        if size == 0 {
            return Err(ChatError::InvalidRequest("page size must be positive".into()));
        }

        let room = self.join_room(room_id)?;
        let total = room.messages.len();
        let Some(end) = total
            .checked_sub(page.saturating_mul(size))
            .filter(|end| *end > 0)
        else {
            return Ok(Vec::new());
        };
        let start = end.saturating_sub(size);

        Ok(room.messages[start..end].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ClassificationResult;
    use crate::network::HttpSpamClassifier;
    use crate::storage::RoomDatabase;
    use rusqlite::Result as SqlResult;
    use std::cell::{Cell, RefCell};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedClassifier {
        score: f64,
        calls: Cell<usize>,
    }

    impl FixedClassifier {
        fn new(score: f64) -> Self {
            Self {
                score,
                calls: Cell::new(0),
            }
        }
    }

    impl SpamClassifier for &FixedClassifier {
        async fn classify(&self, _content: &str) -> ClassificationResult {
            self.calls.set(self.calls.get() + 1);
            ClassificationResult::from_score(self.score)
        }
    }

    /// Store whose saves always fail, as a full disk would.
    struct FailingStore {
        room: Room,
        saves: RefCell<usize>,
    }

    impl RoomStore for &FailingStore {
        fn find_by_room_id(&self, room_id: &str) -> SqlResult<Option<Room>> {
            Ok((room_id == self.room.room_id).then(|| self.room.clone()))
        }

        fn create(&self, _room: &Room) -> SqlResult<bool> {
            Ok(false)
        }

        fn save(&self, _room: Room) -> SqlResult<Room> {
            *self.saves.borrow_mut() += 1;
            Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
                None,
            ))
        }
    }

    fn request(room_id: &str, sender: &str, content: &str) -> SendMessageRequest {
        SendMessageRequest {
            room_id: room_id.into(),
            sender: sender.into(),
            content: content.into(),
        }
    }

    fn service_with_room(classifier: &FixedClassifier) -> ChatService<RoomDatabase, &FixedClassifier> {
        let service = ChatService::new(RoomDatabase::in_memory().unwrap(), classifier);
        service.create_room("lobby").unwrap();
        service
    }

    #[tokio::test]
    async fn unknown_room_fails_without_classifying() {
        let classifier = FixedClassifier::new(0.9);
        let service = ChatService::new(RoomDatabase::in_memory().unwrap(), &classifier);

        let err = service.send_message(request("ghost", "alice", "hi")).await.unwrap_err();

        assert!(matches!(err, ChatError::RoomNotFound(ref id) if id == "ghost"));
        assert_eq!(classifier.calls.get(), 0);
    }

    #[tokio::test]
    async fn appends_exactly_one_stamped_message() {
        let classifier = FixedClassifier::new(0.1);
        let service = service_with_room(&classifier);

        let before = chrono::Utc::now();
        let message = service.send_message(request("lobby", "alice", "hello")).await.unwrap();
        let after = chrono::Utc::now();

        assert_eq!(message.sender, "alice");
        assert_eq!(message.content, "hello");
        assert!(message.time_stamp >= before && message.time_stamp <= after);
        assert_eq!(classifier.calls.get(), 1);

        let room = service.join_room("lobby").unwrap();
        assert_eq!(room.messages, vec![message]);
    }

    #[tokio::test]
    async fn high_score_marks_message_as_spam() {
        let classifier = FixedClassifier::new(0.9);
        let service = service_with_room(&classifier);

        let message = service.send_message(request("lobby", "bot", "free $$$")).await.unwrap();

        assert_eq!(message.spam_level, 0.9);
        assert!(message.is_spam);
    }

    #[tokio::test]
    async fn low_score_leaves_message_clean() {
        let classifier = FixedClassifier::new(0.3);
        let service = service_with_room(&classifier);

        let message = service.send_message(request("lobby", "bob", "lunch?")).await.unwrap();

        assert_eq!(message.spam_level, 0.3);
        assert!(!message.is_spam);
    }

    #[tokio::test]
    async fn messages_keep_arrival_order() {
        let classifier = FixedClassifier::new(0.0);
        let service = service_with_room(&classifier);

        for content in ["one", "two", "three"] {
            service.send_message(request("lobby", "alice", content)).await.unwrap();
        }

        let contents: Vec<_> = service
            .join_room("lobby")
            .unwrap()
            .messages
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, ["one", "two", "three"]);
    }

    #[tokio::test]
    async fn save_failure_surfaces_after_classifying() {
        let classifier = FixedClassifier::new(0.2);
        let store = FailingStore {
            room: Room::new("lobby"),
            saves: RefCell::new(0),
        };
        let service = ChatService::new(&store, &classifier);

        let err = service.send_message(request("lobby", "alice", "hi")).await.unwrap_err();

        assert!(matches!(err, ChatError::Persistence(_)));
        assert_eq!(classifier.calls.get(), 1);
        assert_eq!(*store.saves.borrow(), 1);
    }

    #[tokio::test]
    async fn classifier_timeout_still_delivers_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "spamLevel": 0.99 }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let classifier =
            HttpSpamClassifier::with_timeout(&server.uri(), Duration::from_millis(100)).unwrap();
        let service = ChatService::new(RoomDatabase::in_memory().unwrap(), classifier);
        service.create_room("lobby").unwrap();

        let message = service.send_message(request("lobby", "alice", "slow")).await.unwrap();

        assert_eq!(message.spam_level, 0.0);
        assert!(!message.is_spam);
        assert_eq!(service.join_room("lobby").unwrap().messages.len(), 1);
    }

    #[test]
    fn create_room_rejects_blank_and_duplicate_ids() {
        let classifier = FixedClassifier::new(0.0);
        let service = service_with_room(&classifier);

        assert!(matches!(service.create_room("  "), Err(ChatError::InvalidRequest(_))));
        assert!(matches!(
            service.create_room("lobby"),
            Err(ChatError::RoomAlreadyExists(ref id)) if id == "lobby"
        ));
    }

    #[test]
    fn join_unknown_room_is_not_found() {
        let classifier = FixedClassifier::new(0.0);
        let service = service_with_room(&classifier);

        assert!(matches!(service.join_room("ghost"), Err(ChatError::RoomNotFound(_))));
    }

    #[tokio::test]
    async fn pages_walk_backwards_from_newest() {
        let classifier = FixedClassifier::new(0.0);
        let service = service_with_room(&classifier);
        for i in 1..=5 {
            service
                .send_message(request("lobby", "alice", &format!("m{i}")))
                .await
                .unwrap();
        }

        let contents = |page| -> Vec<String> {
            service
                .get_messages("lobby", page, 2)
                .unwrap()
                .into_iter()
                .map(|m| m.content)
                .collect()
        };

        assert_eq!(contents(0), ["m4", "m5"]);
        assert_eq!(contents(1), ["m2", "m3"]);
        assert_eq!(contents(2), ["m1"]);
        assert!(contents(3).is_empty());
        assert!(matches!(
            service.get_messages("lobby", 0, 0),
            Err(ChatError::InvalidRequest(_))
        ));
    }
}
