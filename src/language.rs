//! Conversational reply engines.
//!
//! Chatter that is not a command may still deserve an answer. The dispatcher
//! classifies who the text was aimed at and asks a [`LanguageEngine`] for a
//! reply; engines are free to answer nothing.

use async_trait::async_trait;
use firefly_proto::Hostmask;

use crate::error::LanguageError;

/// Who a piece of text was aimed at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Addressing {
    /// Sent in a private query.
    Private,
    /// A channel message naming the bot; carries the nick as written.
    Mentioned(String),
    /// A channel message with no mention.
    Public,
}

/// Input to [`LanguageEngine::get_reply`].
#[derive(Clone, Debug)]
pub struct LanguageRequest<'a> {
    /// Text to answer, with any mention and separators removed.
    pub text: &'a str,
    pub addressing: Addressing,
    pub source: &'a Hostmask,
}

#[async_trait]
pub trait LanguageEngine: Send + Sync {
    /// A reply for `request`, or `None` to stay quiet.
    async fn get_reply(&self, request: &LanguageRequest<'_>) -> Result<Option<String>, LanguageError>;
}

/// An engine that never replies.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullLanguage;

#[async_trait]
impl LanguageEngine for NullLanguage {
    async fn get_reply(&self, _request: &LanguageRequest<'_>) -> Result<Option<String>, LanguageError> {
        Ok(None)
    }
}
