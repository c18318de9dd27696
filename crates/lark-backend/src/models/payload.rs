//! Request bodies accepted by a custom-bot webhook

use digest_core::{Message, PostElement};
use serde::Serialize;

/// Webhook request body
///
/// Serializes as `{"msg_type": "...", "content": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "msg_type", content = "content", rename_all = "lowercase")]
pub enum WebhookPayload<'a> {
    Text { text: &'a str },
    Post { post: PostLocales<'a> },
}

/// Rich-text body keyed by locale
#[derive(Debug, Clone, Serialize)]
pub struct PostLocales<'a> {
    pub zh_cn: PostBody<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostBody<'a> {
    pub title: &'a str,
    pub content: &'a [Vec<PostElement>],
}

impl<'a> From<&'a Message> for WebhookPayload<'a> {
    fn from(message: &'a Message) -> Self {
        match message {
            Message::Text { body } => WebhookPayload::Text { text: body },
            Message::Post { title, rows } => WebhookPayload::Post {
                post: PostLocales {
                    zh_cn: PostBody {
                        title,
                        content: rows,
                    },
                },
            },
        }
    }
}
