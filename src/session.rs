use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
}

/// Client-held conversation: an opaque session token plus the append-only
/// message thread. Insertion order is display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub session_id: String,
    messages: Vec<Message>,
}

impl ChatSession {
    pub fn new(session_id: impl Into<String>, welcome: Message) -> Self {
        Self {
            session_id: session_id.into(),
            messages: vec![welcome],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub(crate) fn append(&mut self, msg: Message) -> &Message {
        self.messages.push(msg);
        &self.messages[self.messages.len() - 1]
    }
}

/// Time-derived message ids. Falls back to `previous + 1` whenever the
/// clock has not moved past the last id handed out.
#[derive(Debug, Default)]
pub struct MessageIds {
    last: i64,
}

impl MessageIds {
    pub fn next_at(&mut self, now: DateTime<Utc>) -> String {
        let millis = now.timestamp_millis();
        self.last = if millis > self.last { millis } else { self.last + 1 };
        self.last.to_string()
    }

    pub fn user(&mut self, content: impl Into<String>) -> Message {
        self.message(content, true)
    }

    pub fn assistant(&mut self, content: impl Into<String>) -> Message {
        self.message(content, false)
    }

    fn message(&mut self, content: impl Into<String>, is_user: bool) -> Message {
        let timestamp = Utc::now();
        Message {
            id: self.next_at(timestamp),
            content: content.into(),
            is_user,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ids_are_strictly_increasing_within_one_millisecond() {
        let mut ids = MessageIds::default();
        let t = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let a: i64 = ids.next_at(t).parse().unwrap();
        let b: i64 = ids.next_at(t).parse().unwrap();
        let c: i64 = ids.next_at(t).parse().unwrap();
        assert_eq!(a, 1_700_000_000_000);
        assert_eq!(b, a + 1);
        assert_eq!(c, a + 2);
    }

    #[test]
    fn ids_do_not_go_backwards_with_the_clock() {
        let mut ids = MessageIds::default();
        let later = Utc.timestamp_millis_opt(2_000).unwrap();
        let earlier = Utc.timestamp_millis_opt(1_000).unwrap();
        assert_eq!(ids.next_at(later), "2000");
        assert_eq!(ids.next_at(earlier), "2001");
        let jump = Utc.timestamp_millis_opt(5_000).unwrap();
        assert_eq!(ids.next_at(jump), "5000");
    }

    #[test]
    fn session_appends_in_order() {
        let mut ids = MessageIds::default();
        let mut s = ChatSession::new("abc", ids.assistant("Hi"));
        s.append(ids.user("Book an appointment"));
        s.append(ids.assistant("Sure, what date?"));
        let contents: Vec<_> = s.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["Hi", "Book an appointment", "Sure, what date?"]);
        assert!(s.messages()[1].is_user);
        assert!(!s.messages()[2].is_user);
        let parsed: Vec<i64> = s.messages().iter().map(|m| m.id.parse().unwrap()).collect();
        assert!(parsed.windows(2).all(|w| w[0] < w[1]));
    }
}
