use teloxide::utils::command::BotCommands;

use crate::ai::llm::GenerationRequest;
use crate::bot::{AppState, IncomingUpdate, Reply};

/// Placeholder prompt used for `/news`, free text and the daily broadcast.
pub const NEWS_PROMPT: &str = "AI News in Tomsk";

pub const PROVIDER_FALLBACK_TEXT: &str =
    "😔 Sorry, I couldn't fetch the news right now. Please try again later.";

const GREETING_TEXT: &str = "Hello Friend, Welcome. I'm happy to see you!";
const STOP_TEXT: &str = "You will no longer receive news updates from me.";
const CONTENT_TEXT: &str = "I am an AI News Generator based in Tomsk. I give you the latest \
     updates of what is happening in Tech in my city as well as global trends.";
const CONTACT_TEXT: &str = "I was developed at the AISiberia Research lab.";

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(
    rename_rule = "lowercase",
    description = "Hey there, I'm mangut_bot. Please follow these commands:"
)]
pub enum BotCommand {
    #[command(description = "to start the conversation and subscribe to daily news")]
    Start,
    #[command(description = "to stop receiving news updates")]
    Stop,
    #[command(description = "get help menu")]
    Help,
    #[command(description = "information")]
    Content,
    #[command(description = "contact information")]
    Contact,
    #[command(description = "get a fresh AI news summary")]
    News,
}

/// The request behind `/news`, free text and the daily broadcast.
pub fn news_request(state: &AppState) -> GenerationRequest {
    GenerationRequest::new(
        NEWS_PROMPT,
        state.config.news_max_length,
        state.config.news_token_budget,
    )
}

/// Route one update to its handler and return the single reply to send.
pub async fn dispatch(state: &AppState, update: &IncomingUpdate) -> Reply {
    match &update.command {
        Some(BotCommand::Start) => start(state, update).await,
        Some(BotCommand::Stop) => stop(state, update).await,
        Some(BotCommand::Help) => Reply::plain(help_text()),
        Some(BotCommand::Content) => Reply::plain(CONTENT_TEXT),
        Some(BotCommand::Contact) => Reply::plain(contact_text(state)),
        Some(BotCommand::News) => news(state).await,
        None => free_text(state, update).await,
    }
}

async fn start(state: &AppState, update: &IncomingUpdate) -> Reply {
    match update.user {
        Some(id) => {
            if state.subscribers.add(id).await {
                tracing::info!(
                    "User {} subscribed ({} total)",
                    id,
                    state.subscribers.len().await
                );
            }
        }
        None => tracing::warn!("/start without a sender, nothing to subscribe"),
    }
    Reply::plain(GREETING_TEXT)
}

async fn stop(state: &AppState, update: &IncomingUpdate) -> Reply {
    if let Some(id) = update.user {
        if state.subscribers.remove(id).await {
            tracing::info!("User {} unsubscribed", id);
        }
    }
    Reply::plain(STOP_TEXT)
}

async fn news(state: &AppState) -> Reply {
    match state.llm.generate(&news_request(state)).await {
        Ok(text) => Reply::plain(text),
        Err(e) => {
            tracing::warn!("News generation failed: {}", e);
            Reply::plain(PROVIDER_FALLBACK_TEXT)
        }
    }
}

// The message body is not forwarded; every chat message gets a news summary.
async fn free_text(state: &AppState, update: &IncomingUpdate) -> Reply {
    tracing::debug!(
        chars = update.text.chars().count(),
        "Free text received, answering with news"
    );
    news(state).await
}

fn contact_text(state: &AppState) -> String {
    match &state.config.contact_info {
        Some(info) => format!("{CONTACT_TEXT}\nIf you want to contact us, feel free to reach {info}"),
        None => CONTACT_TEXT.to_string(),
    }
}

fn help_text() -> String {
    format!("{}\n\nI hope this helps.", BotCommand::descriptions())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::ai::llm::TextGenerator;
    use crate::bot::messenger::Messenger;
    use crate::config::test_config;
    use crate::error::{DeliveryError, ProviderError};
    use crate::subscribers::{SubscriberId, SubscriberRegistry};

    /// Returns a canned answer (or failure) and records every prompt.
    struct ScriptedLlm {
        answer: Option<&'static str>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for ScriptedLlm {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            self.answer
                .map(str::to_string)
                .ok_or_else(|| ProviderError::Malformed("scripted failure".to_string()))
        }
    }

    struct NullMessenger;

    #[async_trait]
    impl Messenger for NullMessenger {
        async fn send(&self, _chat_id: i64, _reply: &Reply) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    fn state_with(answer: Option<&'static str>) -> (AppState, Arc<ScriptedLlm>) {
        let llm = Arc::new(ScriptedLlm {
            answer,
            prompts: Mutex::new(Vec::new()),
        });
        let state = AppState {
            config: test_config(),
            llm: llm.clone(),
            subscribers: Arc::new(SubscriberRegistry::new()),
            messenger: Arc::new(NullMessenger),
        };
        (state, llm)
    }

    fn command(user: i64, cmd: BotCommand) -> IncomingUpdate {
        IncomingUpdate {
            user: Some(SubscriberId(user)),
            text: format!("/{cmd:?}").to_lowercase(),
            command: Some(cmd),
        }
    }

    async fn members(state: &AppState) -> Vec<SubscriberId> {
        state.subscribers.all().await.collect()
    }

    #[tokio::test]
    async fn start_subscribes_exactly_once() {
        let (state, _) = state_with(None);
        let first = dispatch(&state, &command(42, BotCommand::Start)).await;
        dispatch(&state, &command(42, BotCommand::Start)).await;

        assert_eq!(first, Reply::plain(GREETING_TEXT));
        assert_eq!(members(&state).await, vec![SubscriberId(42)]);
    }

    #[tokio::test]
    async fn stop_after_start_unsubscribes() {
        let (state, _) = state_with(None);
        dispatch(&state, &command(42, BotCommand::Start)).await;
        let reply = dispatch(&state, &command(42, BotCommand::Stop)).await;

        assert_eq!(reply, Reply::plain(STOP_TEXT));
        assert!(!members(&state).await.contains(&SubscriberId(42)));
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let (state, _) = state_with(None);
        dispatch(&state, &command(7, BotCommand::Start)).await;
        let reply = dispatch(&state, &command(42, BotCommand::Stop)).await;

        assert_eq!(reply, Reply::plain(STOP_TEXT));
        assert_eq!(members(&state).await, vec![SubscriberId(7)]);
    }

    #[tokio::test]
    async fn start_without_sender_still_greets() {
        let (state, _) = state_with(None);
        let update = IncomingUpdate {
            user: None,
            text: "/start".to_string(),
            command: Some(BotCommand::Start),
        };
        assert_eq!(dispatch(&state, &update).await, Reply::plain(GREETING_TEXT));
        assert!(state.subscribers.is_empty().await);
    }

    #[tokio::test]
    async fn news_relays_generated_text_verbatim() {
        let (state, llm) = state_with(Some("Tomsk AI roundup"));
        let reply = dispatch(&state, &command(1, BotCommand::News)).await;

        assert_eq!(reply, Reply::plain("Tomsk AI roundup"));
        assert_eq!(*llm.prompts.lock().unwrap(), vec![NEWS_PROMPT.to_string()]);
    }

    #[tokio::test]
    async fn news_falls_back_on_provider_error() {
        let (state, _) = state_with(None);
        let reply = dispatch(&state, &command(1, BotCommand::News)).await;
        assert_eq!(reply, Reply::plain(PROVIDER_FALLBACK_TEXT));
    }

    #[tokio::test]
    async fn free_text_uses_placeholder_prompt() {
        let (state, llm) = state_with(Some("Tomsk AI roundup"));
        let update = IncomingUpdate {
            user: Some(SubscriberId(1)),
            text: "what's new with quantum computing?".to_string(),
            command: None,
        };

        let reply = dispatch(&state, &update).await;

        assert_eq!(reply, Reply::plain("Tomsk AI roundup"));
        assert_eq!(*llm.prompts.lock().unwrap(), vec![NEWS_PROMPT.to_string()]);
        assert!(state.subscribers.is_empty().await);
    }

    #[tokio::test]
    async fn static_commands_skip_the_provider() {
        let (state, llm) = state_with(Some("unused"));
        for cmd in [BotCommand::Help, BotCommand::Content, BotCommand::Contact] {
            let reply = dispatch(&state, &command(1, cmd)).await;
            assert!(!reply.text.is_empty());
        }
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn contact_includes_configured_details() {
        let (mut state, _) = state_with(None);
        let bare = dispatch(&state, &command(1, BotCommand::Contact)).await;
        assert_eq!(bare, Reply::plain(CONTACT_TEXT));

        state.config.contact_info = Some("lab@aisiberia.example".to_string());
        let reply = dispatch(&state, &command(1, BotCommand::Contact)).await;
        assert!(reply.text.starts_with(CONTACT_TEXT));
        assert!(reply.text.ends_with("lab@aisiberia.example"));
    }

    #[test]
    fn help_lists_every_command() {
        let help = help_text();
        for name in ["/start", "/stop", "/help", "/content", "/contact", "/news"] {
            assert!(help.contains(name), "help text is missing {name}");
        }
    }

    #[test]
    fn unknown_commands_do_not_parse() {
        assert_eq!(
            BotCommand::parse("/news@mangut_bot", "mangut_bot").unwrap(),
            BotCommand::News
        );
        assert!(BotCommand::parse("/weather", "mangut_bot").is_err());
    }
}
