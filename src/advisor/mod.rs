use log::{ debug, warn };
use std::sync::Arc;
use tokio::sync::{ Mutex, RwLock };
use uuid::Uuid;

use crate::config::prompt::PromptConfig;
use crate::error::RugError;
use crate::llm::chat::{ ChatClient, CompletionRequest };
use crate::models::chat::{ ChatMessage, Feedback, Role };

#[derive(Debug, Clone, Copy)]
pub struct AdviceOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AdviceOptions {
    fn default() -> Self {
        Self { temperature: 0.7, max_tokens: 500 }
    }
}

/// One user's chat with the advice generator. The transcript only grows:
/// every answered question adds the user turn and exactly one assistant
/// turn, even when the generator fails. A call abandoned before the
/// generator answers adds nothing.
pub struct AdvisorySession {
    client: Arc<dyn ChatClient>,
    prompts: Arc<PromptConfig>,
    options: AdviceOptions,
    transcript: RwLock<Vec<ChatMessage>>,
    generating: Mutex<()>,
}

impl AdvisorySession {
    pub fn new(client: Arc<dyn ChatClient>, prompts: Arc<PromptConfig>, options: AdviceOptions) -> Self {
        Self {
            client,
            prompts,
            options,
            transcript: RwLock::new(Vec::new()),
            generating: Mutex::new(()),
        }
    }

    pub fn prompts(&self) -> &PromptConfig {
        &self.prompts
    }

    pub fn is_generating(&self) -> bool {
        self.generating.try_lock().is_err()
    }

    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.read().await.clone()
    }

    /// Sends `prompt` to the advice generator and returns the assistant
    /// turn that was appended. Rejected with `Busy` while another ask is
    /// outstanding, and with `Validation` for a blank prompt; neither
    /// touches the transcript.
    pub async fn ask(&self, prompt: &str) -> Result<ChatMessage, RugError> {
        let _generating = self.generating
            .try_lock()
            .map_err(|_| RugError::Busy("an answer is still being generated".to_string()))?;

        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(RugError::Validation("question must not be empty".to_string()));
        }

        let question = ChatMessage::user(prompt);
        let request = CompletionRequest {
            system: self.prompts.system_instruction.clone(),
            prompt: prompt.to_string(),
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        };

        let reply = match self.client.complete(&request).await {
            Ok(resp) => {
                debug!("Advice generated with {} ({} chars)", self.client.get_model(), resp.response.len());
                ChatMessage::assistant(resp.response)
            }
            Err(e) => {
                warn!("Advice generation failed, answering with fallback: {}", e);
                ChatMessage::assistant(self.prompts.fallback_reply.clone())
            }
        };

        // Both turns land together so a dropped call never leaves a lone user turn.
        let mut transcript = self.transcript.write().await;
        transcript.push(question);
        transcript.push(reply.clone());
        Ok(reply)
    }

    /// Records thumbs-up/down on an assistant turn. Last write wins.
    pub async fn rate(&self, message_id: Uuid, feedback: Feedback) -> Result<ChatMessage, RugError> {
        let mut transcript = self.transcript.write().await;
        let message = transcript
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| RugError::NotFound(format!("message {}", message_id)))?;
        if message.role != Role::Assistant {
            return Err(RugError::Validation("only assistant messages can be rated".to_string()));
        }
        message.feedback = Some(feedback);
        Ok(message.clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::llm::chat::CompletionResponse;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;

    pub(crate) struct EchoClient;

    #[async_trait]
    impl ChatClient for EchoClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, RugError> {
            Ok(CompletionResponse { response: format!("re: {}", request.prompt) })
        }
        fn get_model(&self) -> String {
            "echo".to_string()
        }
    }

    pub(crate) struct FailingClient;

    #[async_trait]
    impl ChatClient for FailingClient {
        async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse, RugError> {
            Err(RugError::Network("connection refused".to_string()))
        }
        fn get_model(&self) -> String {
            "failing".to_string()
        }
    }

    struct GatedClient {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ChatClient for GatedClient {
        async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse, RugError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(CompletionResponse { response: "done".to_string() })
        }
        fn get_model(&self) -> String {
            "gated".to_string()
        }
    }

    fn session(client: Arc<dyn ChatClient>) -> AdvisorySession {
        AdvisorySession::new(client, Arc::new(PromptConfig::default()), AdviceOptions::default())
    }

    #[tokio::test]
    async fn successful_ask_appends_user_and_assistant() {
        let advisor = session(Arc::new(EchoClient));

        let reply = advisor.ask("How to spot a rug pull?").await.unwrap();
        let transcript = advisor.transcript().await;

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(transcript[1].role, Role::Assistant);
        assert_eq!(reply.content, "re: How to spot a rug pull?");
        assert_eq!(transcript[1].id, reply.id);
    }

    #[tokio::test]
    async fn failure_appends_fallback_reply() {
        let advisor = session(Arc::new(FailingClient));

        advisor.ask("Top safe tokens").await.unwrap();
        let reply = advisor.ask("Latest market trends").await.unwrap();
        let transcript = advisor.transcript().await;

        assert_eq!(transcript.len(), 4);
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(
            reply.content,
            "I apologize, but I'm unable to provide advice at the moment. Please try again later."
        );
        let roles: Vec<Role> = transcript.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn blank_prompt_leaves_transcript_untouched() {
        let advisor = session(Arc::new(EchoClient));
        assert!(matches!(advisor.ask("   ").await, Err(RugError::Validation(_))));
        assert!(advisor.transcript().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_ask_is_rejected_while_generating() {
        let client = Arc::new(GatedClient { entered: Notify::new(), release: Notify::new() });
        let advisor = Arc::new(session(client.clone()));

        let first = {
            let advisor = Arc::clone(&advisor);
            tokio::spawn(async move { advisor.ask("first").await })
        };
        client.entered.notified().await;

        assert!(advisor.is_generating());
        assert!(matches!(advisor.ask("second").await, Err(RugError::Busy(_))));

        client.release.notify_one();
        first.await.unwrap().unwrap();

        assert!(!advisor.is_generating());
        assert_eq!(advisor.transcript().await.len(), 2);
    }

    #[tokio::test]
    async fn abandoned_ask_leaves_transcript_balanced() {
        let client = Arc::new(GatedClient { entered: Notify::new(), release: Notify::new() });
        let advisor = session(client.clone());

        let outcome = tokio::time::timeout(Duration::from_millis(50), advisor.ask("hi")).await;

        assert!(outcome.is_err());
        assert!(advisor.transcript().await.is_empty());
        assert!(!advisor.is_generating());

        client.release.notify_one();
        advisor.ask("hi again").await.unwrap();
        let roles: Vec<Role> = advisor.transcript().await.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn feedback_last_write_wins() {
        let advisor = session(Arc::new(EchoClient));
        let reply = advisor.ask("What makes a token safe?").await.unwrap();

        advisor.rate(reply.id, Feedback::Accepted).await.unwrap();
        let rated = advisor.rate(reply.id, Feedback::Rejected).await.unwrap();

        assert_eq!(rated.feedback, Some(Feedback::Rejected));
        assert_eq!(advisor.transcript().await[1].feedback, Some(Feedback::Rejected));
    }

    #[tokio::test]
    async fn user_turns_and_unknown_ids_cannot_be_rated() {
        let advisor = session(Arc::new(EchoClient));
        advisor.ask("hi").await.unwrap();
        let user_id = advisor.transcript().await[0].id;

        assert!(matches!(advisor.rate(user_id, Feedback::Accepted).await, Err(RugError::Validation(_))));
        assert!(matches!(advisor.rate(Uuid::new_v4(), Feedback::Accepted).await, Err(RugError::NotFound(_))));
    }
}
