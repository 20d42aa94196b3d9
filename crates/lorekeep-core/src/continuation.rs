//! Continuation controller
//!
//! A provider may stop on its output budget. The controller re-invokes it
//! with the text produced so far as a trailing assistant turn until a reply
//! arrives untruncated, and hands back the joined text as one reply.

use lorekeep_llm::{DialogueAdapter, DialoguePrompt, Error as LlmError, Result as LlmResult};
use lorekeep_memory::{display_line, TurnRole};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Drives an adapter until a complete reply is assembled.
#[derive(Debug, Clone, Copy)]
pub struct ContinuationController {
    max_rounds: u32,
    timeout: Duration,
}

impl ContinuationController {
    /// `max_rounds` bounds the number of invocations for one reply.
    #[must_use]
    pub fn new(max_rounds: u32, timeout: Duration) -> Self {
        Self {
            max_rounds: max_rounds.max(1),
            timeout,
        }
    }

    /// Produce one complete reply for `prompt`.
    ///
    /// # Errors
    /// Any provider failure, `Timeout` when a single call exceeds the
    /// timeout, `InvalidResponse` when the finished reply is blank,
    /// `ContinuationLimit` when the reply is still truncated after
    /// `max_rounds` calls.
    #[instrument(skip(self, adapter, prompt), fields(provider = %adapter.kind()))]
    pub async fn generate(
        &self,
        adapter: &dyn DialogueAdapter,
        prompt: &DialoguePrompt,
    ) -> LlmResult<String> {
        let mut prompt = prompt.clone();
        let mut reply = String::new();

        for round in 1..=self.max_rounds {
            let payload = adapter.compose(&prompt);
            let generation = tokio::time::timeout(self.timeout, adapter.invoke(&payload))
                .await
                .map_err(|_| LlmError::Timeout(self.timeout.as_millis() as u64))??;

            reply.push_str(generation.text.trim_end());
            if !generation.truncated {
                if reply.trim().is_empty() {
                    warn!(round, "provider returned an empty reply");
                    return Err(LlmError::InvalidResponse("empty reply".to_string()));
                }
                debug!(round, chars = reply.len(), "reply complete");
                return Ok(reply);
            }

            debug!(
                round,
                partial = %display_line(TurnRole::Assistant, &reply),
                "reply truncated, continuing"
            );
            // The accumulated text replaces any earlier partial turn
            prompt.partial = Some(reply.clone());
        }

        warn!(rounds = self.max_rounds, "reply still truncated, giving up");
        Err(LlmError::ContinuationLimit(self.max_rounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorekeep_llm::{
        adapter_for, Generation, Message, MessageRole, MockProvider, ProviderKind,
        ProviderPayload,
    };
    use mockall::predicate::always;
    use std::sync::Arc;

    mockall::mock! {
        Adapter {}

        #[async_trait::async_trait]
        impl DialogueAdapter for Adapter {
            fn kind(&self) -> ProviderKind;
            fn compose(&self, prompt: &DialoguePrompt) -> ProviderPayload;
            async fn invoke(&self, payload: &ProviderPayload) -> LlmResult<Generation>;
        }
    }

    fn prompt() -> DialoguePrompt {
        DialoguePrompt::new("sys", vec![Message::user("Hi"), Message::assistant("Hello")], "How are you?")
    }

    fn controller() -> ContinuationController {
        ContinuationController::new(4, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_untruncated_reply_single_call() {
        let mock = MockProvider::new();
        mock.push_reply("Fine, thanks.");
        let adapter = adapter_for(ProviderKind::OpenAi, Arc::new(mock.clone()));

        let text = controller().generate(adapter.as_ref(), &prompt()).await.unwrap();
        assert_eq!(text, "Fine, thanks.");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_truncated_chunks_are_joined() {
        let mock = MockProvider::new();
        mock.push_response("Fine,   ", "length");
        mock.push_response(" thanks for\n", "length");
        mock.push_reply(" asking.");
        let adapter = adapter_for(ProviderKind::OpenAi, Arc::new(mock.clone()));

        let text = controller().generate(adapter.as_ref(), &prompt()).await.unwrap();
        assert_eq!(text, "Fine, thanks for asking.");

        // Each continuation carries exactly one trailing partial assistant turn
        let requests = mock.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].messages.len(), 4);
        let last = requests[2].messages.last().unwrap();
        assert_eq!(last.role, MessageRole::Assistant);
        assert_eq!(last.content, "Fine, thanks for");
        assert_eq!(requests[2].messages.len(), 5);
    }

    #[tokio::test]
    async fn test_anthropic_truncation_dialect() {
        let mock = MockProvider::named("anthropic");
        mock.push_response("Once upon", "max_tokens");
        mock.push_response(" a time.", "end_turn");
        let adapter = adapter_for(ProviderKind::Anthropic, Arc::new(mock.clone()));

        let text = controller().generate(adapter.as_ref(), &prompt()).await.unwrap();
        assert_eq!(text, "Once upon a time.");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_always_truncated_hits_limit() {
        let mut adapter = MockAdapter::new();
        adapter.expect_kind().return_const(ProviderKind::OpenAi);
        adapter
            .expect_compose()
            .times(4)
            .returning(|p| ProviderPayload::Chat {
                messages: vec![Message::user(p.utterance.clone())],
                options: p.options.clone(),
            });
        adapter.expect_invoke().with(always()).times(4).returning(|_| {
            Ok(Generation {
                text: "more".into(),
                truncated: true,
            })
        });

        let err = controller().generate(&adapter, &prompt()).await.unwrap_err();
        assert!(matches!(err, LlmError::ContinuationLimit(4)));
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let mut adapter = MockAdapter::new();
        adapter.expect_kind().return_const(ProviderKind::OpenAi);
        adapter.expect_compose().returning(|p| ProviderPayload::Chat {
            messages: vec![Message::user(p.utterance.clone())],
            options: p.options.clone(),
        });
        adapter
            .expect_invoke()
            .times(1)
            .returning(|_| Err(LlmError::Api("boom".into())));

        let err = controller().generate(&adapter, &prompt()).await.unwrap_err();
        assert!(matches!(err, LlmError::Api(_)));
    }

    #[tokio::test]
    async fn test_blank_reply_is_invalid_response() {
        let mock = MockProvider::new();
        mock.push_reply("   \n");
        let adapter = adapter_for(ProviderKind::OpenAi, Arc::new(mock.clone()));

        let err = controller().generate(adapter.as_ref(), &prompt()).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_blank_tail_after_partial_is_kept() {
        let mock = MockProvider::new();
        mock.push_response("All done", "length");
        mock.push_reply("");
        let adapter = adapter_for(ProviderKind::OpenAi, Arc::new(mock.clone()));

        let text = controller().generate(adapter.as_ref(), &prompt()).await.unwrap();
        assert_eq!(text, "All done");
    }

    struct StalledAdapter;

    #[async_trait::async_trait]
    impl DialogueAdapter for StalledAdapter {
        fn kind(&self) -> ProviderKind {
            ProviderKind::OpenAi
        }

        fn compose(&self, prompt: &DialoguePrompt) -> ProviderPayload {
            ProviderPayload::Chat {
                messages: vec![Message::user(prompt.utterance.clone())],
                options: prompt.options.clone(),
            }
        }

        async fn invoke(&self, _payload: &ProviderPayload) -> LlmResult<Generation> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(Generation {
                text: "too late".into(),
                truncated: false,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_provider_times_out() {
        let err = controller().generate(&StalledAdapter, &prompt()).await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout(5000)));
    }
}
