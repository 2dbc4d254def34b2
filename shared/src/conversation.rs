//! Client-side chat state: transcript, session identity, suggestion chips and
//! the single in-flight exchange.
//!
//! Every operation comes in two halves so an event loop can drive it:
//! `begin_*` applies the optimistic transition and hands back a
//! [`PendingExchange`], [`Conversation::complete`] applies the server's answer.
//! The async helpers (`submit`, `select_suggestion`, `select_button`) run both
//! halves around a [`ChatApi`].

use std::fmt;

use serde_json::Value;

use crate::api::ChatApi;
use crate::session::{self, SessionStore};
use crate::{Button, ChatReply, ChatRequest};

const WELCOME_TEXT: &str = "Hi there! Welcome. I can help with questions about our services.";
const EMPTY_REPLY_TEXT: &str = "Sorry, I don't have an answer for that.";
const FAILURE_TEXT: &str = "Sorry, something went wrong.";

pub const DEFAULT_SUGGESTIONS: [&str; 4] = [
    "What services do you offer?",
    "Do you provide AI/ML solutions?",
    "Can you help me build or improve my application?",
    "What is your development process and how do projects work?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Pending,
    Resolved,
    /// The server answered with neither text nor payload.
    Empty,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    id: TurnId,
    sender: Sender,
    text: Option<String>,
    payload: Option<Value>,
    status: TurnStatus,
}

impl Turn {
    pub fn id(&self) -> TurnId {
        self.id
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn status(&self) -> TurnStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == TurnStatus::Pending
    }

    /// Whether a renderer has anything to draw: a pending placeholder, text
    /// or at least one button.
    pub fn has_content(&self) -> bool {
        self.is_pending() || self.text.is_some() || !self.buttons().is_empty()
    }

    /// Buttons listed under `payload.buttons`. Entries that are not button
    /// objects are skipped.
    pub fn buttons(&self) -> Vec<Button> {
        self.payload
            .as_ref()
            .and_then(|payload| payload.get("buttons"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter(|item| item.is_object())
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// What a bot turn shows when the server had nothing to say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyReply {
    Fallback(String),
    /// Keep the turn without text. [`Turn::has_content`] is false for it.
    Silent,
}

impl Default for EmptyReply {
    fn default() -> Self {
        Self::Fallback(EMPTY_REPLY_TEXT.to_owned())
    }
}

#[derive(Debug, Clone)]
pub struct ConversationConfig {
    pub welcome: Option<String>,
    pub suggestions: Vec<String>,
    pub show_suggestions: bool,
    pub empty_reply: EmptyReply,
    pub failure_text: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            welcome: Some(WELCOME_TEXT.to_owned()),
            suggestions: DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            show_suggestions: true,
            empty_reply: EmptyReply::default(),
            failure_text: FAILURE_TEXT.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SuggestionSet {
    labels: Vec<String>,
    visible: bool,
}

impl SuggestionSet {
    pub fn new(labels: Vec<String>, visible: bool) -> Self {
        let visible = visible && !labels.is_empty();
        Self { labels, visible }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn replace(&mut self, labels: Vec<String>) {
        *self = Self::new(labels, true);
    }
}

/// Ticket for an exchange started by a `begin_*` call.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingExchange {
    pub turn: TurnId,
    pub request: ChatRequest,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    session_id: String,
    turns: Vec<Turn>,
    suggestions: SuggestionSet,
    in_flight: Option<TurnId>,
    next_id: u64,
    empty_reply: EmptyReply,
    failure_text: String,
}

impl Conversation {
    pub fn new(config: ConversationConfig, store: &mut impl SessionStore) -> Self {
        let mut conversation = Self {
            session_id: session::load_or_create(store),
            turns: Vec::new(),
            suggestions: SuggestionSet::new(config.suggestions, config.show_suggestions),
            in_flight: None,
            next_id: 0,
            empty_reply: config.empty_reply,
            failure_text: config.failure_text,
        };

        if let Some(welcome) = config.welcome.filter(|text| !text.trim().is_empty()) {
            conversation.push(Sender::Bot, Some(welcome), TurnStatus::Resolved);
        }

        conversation
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn turn(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|turn| turn.id == id)
    }

    pub fn suggestions(&self) -> &SuggestionSet {
        &self.suggestions
    }

    pub fn replace_suggestions(&mut self, labels: Vec<String>) {
        self.suggestions.replace(labels);
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Appends the user turn and a pending bot turn. `None` when the text is
    /// blank or another exchange has not finished yet.
    pub fn begin_submit(&mut self, text: &str) -> Option<PendingExchange> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Some(in_flight) = self.in_flight {
            tracing::debug!(%in_flight, "exchange in flight, ignoring submit");
            return None;
        }

        self.push(Sender::User, Some(text.to_owned()), TurnStatus::Resolved);
        let turn = self.push(Sender::Bot, None, TurnStatus::Pending);
        self.in_flight = Some(turn);

        Some(PendingExchange {
            turn,
            request: ChatRequest {
                text: text.to_owned(),
                session_id: Some(self.session_id.clone()),
            },
        })
    }

    pub fn begin_suggestion(&mut self, label: &str) -> Option<PendingExchange> {
        let exchange = self.begin_submit(label)?;
        self.suggestions.hide();
        Some(exchange)
    }

    /// Sends the button's payload (or title). The originating buttons stay in
    /// place so they can be picked again.
    pub fn begin_button(&mut self, turn: TurnId, button: &Button) -> Option<PendingExchange> {
        if !self.turn(turn).is_some_and(|t| t.sender == Sender::Bot) {
            tracing::debug!(%turn, "button selected on unknown turn");
            return None;
        }

        self.begin_submit(button.utterance())
    }

    pub fn complete<E: fmt::Display>(&mut self, turn: TurnId, outcome: Result<ChatReply, E>) {
        if self.in_flight != Some(turn) {
            tracing::warn!(%turn, "completion for a turn that is not in flight");
            return;
        }
        self.in_flight = None;

        let (text, payload, status) = match outcome {
            Ok(reply) => {
                let text = Some(reply.reply).filter(|text| !text.trim().is_empty());
                let payload = reply.payload.filter(|payload| !payload.is_null());

                if text.is_none() && payload.is_none() {
                    let text = match &self.empty_reply {
                        EmptyReply::Fallback(text) => Some(text.clone()),
                        EmptyReply::Silent => None,
                    };
                    (text, None, TurnStatus::Empty)
                } else {
                    (text, payload, TurnStatus::Resolved)
                }
            }
            Err(error) => {
                tracing::warn!(%turn, %error, "exchange failed");
                (Some(self.failure_text.clone()), None, TurnStatus::Failed)
            }
        };

        if let Some(pending) = self.turns.iter_mut().find(|t| t.id == turn) {
            pending.text = text;
            pending.payload = payload;
            pending.status = status;
        }
    }

    pub async fn submit<A: ChatApi + ?Sized>(&mut self, text: &str, api: &A) -> Option<TurnId> {
        let exchange = self.begin_submit(text)?;
        Some(self.run(exchange, api).await)
    }

    pub async fn select_suggestion<A: ChatApi + ?Sized>(
        &mut self,
        label: &str,
        api: &A,
    ) -> Option<TurnId> {
        let exchange = self.begin_suggestion(label)?;
        Some(self.run(exchange, api).await)
    }

    pub async fn select_button<A: ChatApi + ?Sized>(
        &mut self,
        turn: TurnId,
        button: &Button,
        api: &A,
    ) -> Option<TurnId> {
        let exchange = self.begin_button(turn, button)?;
        Some(self.run(exchange, api).await)
    }

    async fn run<A: ChatApi + ?Sized>(&mut self, exchange: PendingExchange, api: &A) -> TurnId {
        let outcome = api.send_message(exchange.request).await;
        self.complete(exchange.turn, outcome);
        exchange.turn
    }

    fn push(&mut self, sender: Sender, text: Option<String>, status: TurnStatus) -> TurnId {
        self.next_id += 1;
        let id = TurnId(self.next_id);
        self.turns.push(Turn {
            id,
            sender,
            text,
            payload: None,
            status,
        });
        id
    }
}
