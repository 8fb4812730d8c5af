// Message Service - direct messages and the conversations derived from them
// Conversations are not stored: they are grouped per counterparty on every read

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::core::{
    avatar_url, clock_label, current_time_millis, display_name, handle, time_ago_at, to_datetime,
};
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::SocialStore;
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{
    AuthorProfile, ConversationView, Message, MessageDirection, MessageId, Millis, ThreadMessage,
    UserId,
};

pub fn to_thread_message(message: &Message, viewer_id: UserId) -> ThreadMessage {
    ThreadMessage {
        id: message.id,
        from: if message.sender_id == viewer_id {
            MessageDirection::You
        } else {
            MessageDirection::Them
        },
        text: message.content.clone(),
        time: clock_label(message.created_at),
        created_at: to_datetime(message.created_at),
    }
}

struct Thread<'a> {
    latest: &'a Message,
    unread: u64,
}

/// Group both directions by counterparty. A thread's summary is its newest message;
/// `unread` counts only received messages. Counterparties without a user row are skipped.
pub fn build_conversations(
    viewer_id: UserId,
    sent: &[Message],
    received: &[Message],
    users: &HashMap<UserId, AuthorProfile>,
    now: Millis,
) -> Vec<ConversationView> {
    let mut threads: HashMap<UserId, Thread<'_>> = HashMap::new();

    let sent_pairs = sent.iter().map(|m| (m.receiver_id, m, false));
    let received_pairs = received.iter().map(|m| (m.sender_id, m, !m.is_read));
    for (counterpart, message, unread) in sent_pairs.chain(received_pairs) {
        if counterpart == viewer_id {
            continue;
        }
        let thread = threads.entry(counterpart).or_insert(Thread {
            latest: message,
            unread: 0,
        });
        if (message.created_at, message.id) > (thread.latest.created_at, thread.latest.id) {
            thread.latest = message;
        }
        if unread {
            thread.unread += 1;
        }
    }

    let mut conversations: Vec<(Millis, MessageId, ConversationView)> = threads
        .into_iter()
        .filter_map(|(counterpart, thread)| {
            let Some(user) = users.get(&counterpart) else {
                warn!("Skipping conversation with unknown user {}", counterpart);
                return None;
            };
            let view = ConversationView {
                id: counterpart,
                name: display_name(Some(user)),
                handle: handle(Some(user)),
                status: "offline".to_string(),
                avatar_url: avatar_url(Some(user)),
                last_message: thread.latest.content.clone(),
                last_active: time_ago_at(thread.latest.created_at, now),
                last_message_at: to_datetime(thread.latest.created_at),
                unread: thread.unread,
            };
            Some((thread.latest.created_at, thread.latest.id, view))
        })
        .collect();

    conversations.sort_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));
    conversations.into_iter().map(|(_, _, view)| view).collect()
}

pub struct MessageService {
    store: Arc<dyn SocialStore>,
    ids: Arc<IdGenerator>,
}

impl MessageService {
    pub fn new(store: Arc<dyn SocialStore>, ids: Arc<IdGenerator>) -> Self {
        Self { store, ids }
    }

    #[instrument(skip(self, vc, content))]
    pub async fn send_message(
        &self,
        vc: &ViewerContext,
        receiver_id: UserId,
        content: &str,
    ) -> AppResult<ThreadMessage> {
        let sender_id = vc.user_id()?;
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Message content cannot be empty".to_string()));
        }
        if receiver_id == sender_id {
            return Err(AppError::Validation("You cannot message yourself".to_string()));
        }

        let message = Message {
            id: self.ids.next_id(),
            sender_id,
            receiver_id,
            content: content.to_string(),
            created_at: current_time_millis(),
            is_read: false,
        };
        self.store.insert_message(&message).await?;
        info!("User {} messaged {}", sender_id, receiver_id);
        Ok(to_thread_message(&message, sender_id))
    }

    /// One entry per counterparty, most recent first
    #[instrument(skip(self, vc))]
    pub async fn fetch_conversations(&self, vc: &ViewerContext) -> AppResult<Vec<ConversationView>> {
        let viewer_id = vc.user_id()?;
        let (sent, received) = futures::join!(
            self.store.messages_sent_by(viewer_id),
            self.store.messages_received_by(viewer_id)
        );

        let (sent, received) = match (sent, received) {
            (Err(e), Err(_)) => return Err(e),
            (sent, received) => (
                sent.unwrap_or_else(|e| {
                    warn!("Failed to fetch sent messages: {}", e);
                    Vec::new()
                }),
                received.unwrap_or_else(|e| {
                    warn!("Failed to fetch received messages: {}", e);
                    Vec::new()
                }),
            ),
        };

        let mut counterparts: Vec<UserId> = sent
            .iter()
            .map(|m| m.receiver_id)
            .chain(received.iter().map(|m| m.sender_id))
            .filter(|id| *id != viewer_id)
            .collect();
        counterparts.sort_unstable();
        counterparts.dedup();

        let users: HashMap<UserId, AuthorProfile> = match self.store.users_by_ids(&counterparts).await {
            Ok(users) => users.iter().map(|u| (u.id, AuthorProfile::from(u))).collect(),
            Err(e) => {
                warn!("Failed to resolve conversation users: {}", e);
                HashMap::new()
            }
        };

        Ok(build_conversations(
            viewer_id,
            &sent,
            &received,
            &users,
            current_time_millis(),
        ))
    }

    /// Both directions between the viewer and `counterpart_id`, oldest first
    pub async fn fetch_thread_messages(
        &self,
        vc: &ViewerContext,
        counterpart_id: UserId,
    ) -> AppResult<Vec<ThreadMessage>> {
        let viewer_id = vc.user_id()?;
        let (mut sent, received) = futures::try_join!(
            self.store.messages_from_to(viewer_id, counterpart_id),
            self.store.messages_from_to(counterpart_id, viewer_id)
        )?;

        sent.extend(received);
        sent.sort_by_key(|m| (m.created_at, m.id));
        Ok(sent.iter().map(|m| to_thread_message(m, viewer_id)).collect())
    }

    /// Mark everything received from `counterpart_id` as read. Store failures are
    /// logged and reported as zero rows.
    #[instrument(skip(self, vc))]
    pub async fn mark_read(&self, vc: &ViewerContext, counterpart_id: UserId) -> AppResult<u64> {
        let viewer_id = vc.user_id()?;
        match self.store.mark_messages_read(viewer_id, counterpart_id).await {
            Ok(updated) => Ok(updated),
            Err(e) => {
                warn!("Failed to mark messages from {} read: {}", counterpart_id, e);
                Ok(0)
            }
        }
    }

    pub async fn unread_message_total(&self, vc: &ViewerContext) -> AppResult<u64> {
        let viewer_id = vc.user_id()?;
        let received = self.store.messages_received_by(viewer_id).await?;
        Ok(received.iter().filter(|m| !m.is_read).count() as u64)
    }
}
