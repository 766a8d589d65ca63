use std::fmt;
use std::num::TryFromIntError;

use teloxide::types::UserId;
use tokio::sync::RwLock;

/// Telegram user id of a broadcast recipient. For private chats this is also
/// the chat id messages are sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub i64);

impl TryFrom<UserId> for SubscriberId {
    type Error = TryFromIntError;

    fn try_from(id: UserId) -> Result<Self, Self::Error> {
        i64::try_from(id.0).map(Self)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// In-memory set of broadcast subscribers, kept in insertion order.
///
/// Nothing is persisted: the list starts empty on every launch.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    ids: RwLock<Vec<SubscriberId>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the id was not subscribed before.
    pub async fn add(&self, id: SubscriberId) -> bool {
        let mut ids = self.ids.write().await;
        if ids.contains(&id) {
            return false;
        }
        ids.push(id);
        true
    }

    /// Returns `true` if the id was subscribed.
    pub async fn remove(&self, id: SubscriberId) -> bool {
        let mut ids = self.ids.write().await;
        match ids.iter().position(|s| *s == id) {
            Some(idx) => {
                ids.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Snapshot of current membership. Later add/remove calls do not affect
    /// an iterator that has already been handed out.
    pub async fn all(&self) -> std::vec::IntoIter<SubscriberId> {
        self.ids.read().await.clone().into_iter()
    }

    pub async fn len(&self) -> usize {
        self.ids.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ids.read().await.is_empty()
    }
}
