use std::cell::RefCell;
use std::rc::Rc;

use shared::api::ChatApi;
use shared::conversation::{
    Conversation, ConversationConfig, PendingExchange, Sender, Turn, TurnId, DEFAULT_SUGGESTIONS,
};
use shared::Button;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::rpc::Client;
use crate::storage::LocalStorage;

fn default_welcome() -> Option<String> {
    ConversationConfig::default().welcome
}

fn default_suggestions() -> Vec<String> {
    DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
}

#[derive(Properties, PartialEq)]
pub struct ChatWidgetProps {
    /// Base URL of the proxy; empty means same origin.
    #[prop_or_default]
    pub endpoint: String,
    #[prop_or_else(default_welcome)]
    pub welcome_message: Option<String>,
    #[prop_or_else(default_suggestions)]
    pub suggestions: Vec<String>,
    #[prop_or_default]
    pub suggestions_url: Option<String>,
}

type Shared = Rc<RefCell<Conversation>>;

fn run_exchange(
    conversation: Shared,
    client: Rc<Client>,
    refresh: UseForceUpdateHandle,
    exchange: Option<PendingExchange>,
) {
    let Some(exchange) = exchange else {
        return;
    };
    refresh.force_update();

    wasm_bindgen_futures::spawn_local(async move {
        let outcome = client.send_message(exchange.request).await;
        conversation.borrow_mut().complete(exchange.turn, outcome);
        refresh.force_update();
    });
}

#[function_component]
pub fn ChatWidget(props: &ChatWidgetProps) -> Html {
    let conversation: Shared = {
        let config = ConversationConfig {
            welcome: props.welcome_message.clone(),
            suggestions: props.suggestions.clone(),
            ..ConversationConfig::default()
        };
        use_mut_ref(move || Conversation::new(config, &mut LocalStorage::open()))
    };
    let client = use_memo(|endpoint| Client::new(endpoint.clone()), props.endpoint.clone());
    let refresh = use_force_update();
    let draft = use_state(String::new);

    {
        let conversation = conversation.clone();
        let client = client.clone();
        let refresh = refresh.clone();

        use_effect_with_deps(
            move |url: &Option<String>| {
                if let Some(url) = url.clone() {
                    wasm_bindgen_futures::spawn_local(async move {
                        match client.fetch_suggestions_from(&url).await {
                            Ok(labels) => {
                                conversation.borrow_mut().replace_suggestions(labels);
                                refresh.force_update();
                            }
                            Err(err) => {
                                tracing::warn!(%url, error = %err, "could not load suggestions");
                            }
                        }
                    });
                }
                || ()
            },
            props.suggestions_url.clone(),
        );
    }

    let send = {
        let conversation = conversation.clone();
        let client = client.clone();
        let refresh = refresh.clone();
        let draft = draft.clone();

        Callback::from(move |_: ()| {
            let exchange = conversation.borrow_mut().begin_submit(&*draft);
            if exchange.is_some() {
                draft.set(String::new());
            }
            run_exchange(conversation.clone(), client.clone(), refresh.clone(), exchange);
        })
    };

    let oninput = {
        let draft = draft.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            draft.set(input.value());
        })
    };

    let onkeydown = {
        let send = send.clone();
        Callback::from(move |e: KeyboardEvent| {
            if e.key() == "Enter" {
                e.prevent_default();
                send.emit(());
            }
        })
    };

    let on_suggestion = {
        let conversation = conversation.clone();
        let client = client.clone();
        let refresh = refresh.clone();

        Callback::from(move |label: String| {
            let exchange = conversation.borrow_mut().begin_suggestion(&label);
            run_exchange(conversation.clone(), client.clone(), refresh.clone(), exchange);
        })
    };

    let on_button = {
        let conversation = conversation.clone();
        let client = client.clone();
        let refresh = refresh.clone();

        Callback::from(move |(turn, button): (TurnId, Button)| {
            let exchange = conversation.borrow_mut().begin_button(turn, &button);
            run_exchange(conversation.clone(), client.clone(), refresh.clone(), exchange);
        })
    };

    let state = conversation.borrow();
    let busy = state.is_busy();

    html! {
        <div class="chat-widget">
            if state.suggestions().is_visible() {
                <div class="chat-suggestions">
                    { for state.suggestions().labels().iter().map(|label| {
                        let on_suggestion = on_suggestion.clone();
                        let value = label.clone();
                        html! {
                            <button class="chat-chip" disabled={busy}
                                onclick={Callback::from(move |_| on_suggestion.emit(value.clone()))}>
                                { label.clone() }
                            </button>
                        }
                    }) }
                </div>
            }
            <div class="chat-transcript">
                { for state.turns().iter().map(|turn| view_turn(turn, &on_button, busy)) }
            </div>
            <div class="chat-input">
                <input
                    type="text"
                    placeholder="Type your message..."
                    value={(*draft).clone()}
                    disabled={busy}
                    {oninput}
                    {onkeydown}
                />
                <button disabled={busy} onclick={Callback::from(move |_| send.emit(()))}>
                    { "Send" }
                </button>
            </div>
        </div>
    }
}

fn view_turn(
    turn: &Turn,
    on_button: &Callback<(TurnId, Button)>,
    busy: bool,
) -> Html {
    let class = match turn.sender() {
        Sender::User => "chat-bubble user",
        Sender::Bot => "chat-bubble bot",
    };

    if !turn.has_content() {
        return Html::default();
    }

    if turn.is_pending() {
        return html! {
            <div key={turn.id().to_string()} class={class}>
                <em>{ "Typing…" }</em>
            </div>
        };
    }

    let id = turn.id();
    html! {
        <div key={id.to_string()} class={class}>
            if let Some(text) = turn.text() {
                <p>{ text.to_owned() }</p>
            }
            <div class="chat-buttons">
                { for turn.buttons().into_iter().map(|button| {
                    let on_button = on_button.clone();
                    let title = button.title.clone();
                    html! {
                        <button class="chat-chip" disabled={busy}
                            onclick={Callback::from(move |_| on_button.emit((id, button.clone())))}>
                            { title }
                        </button>
                    }
                }) }
            </div>
        </div>
    }
}
