//! Triage workflow engine.
//!
//! **Core invariant: no guessing on failure.** If the oracle fails, the run
//! aborts and neither terminal handler fires.
//!
//! Flow:
//! 1. `Received → Classified` — classification prompt, oracle, parser
//! 2. `Classified → Spam | Legitimate` — pure branch on `is_spam`
//! 3. `Spam → Done` — spam handler, no oracle call
//! 4. `Legitimate → Drafted → Notified → Done` — drafting prompt, oracle,
//!    notify handler

use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use tracing::{debug, error, info};

use crate::error::{TriageError, TriageStep};
use crate::pipeline::handlers::TerminalHandler;
use crate::pipeline::oracle::Oracle;
use crate::pipeline::parser::{KeywordParser, ResponseParser};
use crate::pipeline::prompts::{build_classification_prompt, build_draft_prompt};
use crate::pipeline::types::{Email, Stage, TriageState};

/// Default number of emails triaged concurrently by `run_batch`.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;

/// Runs emails through the classify → branch → draft/reject workflow.
///
/// Holds no per-email state; every run owns its own `TriageState`, so one
/// workflow can serve any number of concurrent runs.
pub struct TriageWorkflow {
    oracle: Arc<dyn Oracle>,
    parser: Arc<dyn ResponseParser>,
    handler: Arc<dyn TerminalHandler>,
}

impl TriageWorkflow {
    /// Create a workflow using the keyword parser.
    pub fn new(oracle: Arc<dyn Oracle>, handler: Arc<dyn TerminalHandler>) -> Self {
        Self {
            oracle,
            parser: Arc::new(KeywordParser),
            handler,
        }
    }

    /// Replace the response parser.
    pub fn with_parser(mut self, parser: Arc<dyn ResponseParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Triage a single email to completion.
    pub async fn run(&self, email: Email) -> Result<TriageState, TriageError> {
        email.validate()?;

        let mut state = TriageState::new(email);
        info!(
            run_id = %state.id,
            sender = %state.email.sender,
            subject = %state.email.subject,
            "Processing email"
        );

        self.classify(&mut state).await?;

        if state.is_spam == Some(true) {
            state.advance(Stage::Spam);
            self.handler.handle_spam(&state).await;
            state.advance(Stage::Done);
            info!(
                run_id = %state.id,
                reason = state.spam_reason.as_deref().unwrap_or("unspecified"),
                "Email rejected as spam"
            );
        } else {
            state.advance(Stage::Legitimate);
            self.draft(&mut state).await?;
            state.advance(Stage::Notified);
            self.handler.notify(&state).await;
            state.advance(Stage::Done);
            info!(
                run_id = %state.id,
                category = state.category.map(|c| c.label()).unwrap_or("none"),
                "Draft ready for review"
            );
        }

        debug_assert!(state.invariants_hold());
        Ok(state)
    }

    /// Triage several independent emails, at most `concurrency` at a time.
    ///
    /// Results come back in input order. A failed email does not affect the
    /// others.
    pub async fn run_batch(
        &self,
        emails: Vec<Email>,
        concurrency: usize,
    ) -> Vec<Result<TriageState, TriageError>> {
        let count = emails.len();
        info!(count, concurrency, "Processing email batch");

        let results: Vec<_> = stream::iter(emails)
            .map(|email| self.run(email))
            .buffered(concurrency.max(1))
            .collect()
            .await;

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        info!(succeeded, total = count, "Batch processing complete");
        results
    }

    /// `Received → Classified`.
    async fn classify(&self, state: &mut TriageState) -> Result<(), TriageError> {
        let prompt = build_classification_prompt(&state.email);
        let response = self.invoke(state, TriageStep::Classify, &prompt).await?;

        let classification = self.parser.parse_classification(&response);
        debug!(
            run_id = %state.id,
            is_spam = classification.is_spam,
            reason = ?classification.reason,
            category = ?classification.category,
            "Classified email"
        );

        state.apply_classification(classification);
        state.record_exchange(&prompt, &response);
        state.advance(Stage::Classified);
        Ok(())
    }

    /// `Legitimate → Drafted`.
    async fn draft(&self, state: &mut TriageState) -> Result<(), TriageError> {
        let prompt = build_draft_prompt(&state.email, state.category);
        let response = self.invoke(state, TriageStep::Draft, &prompt).await?;

        state.draft = Some(self.parser.parse_draft(&response));
        state.record_exchange(&prompt, &response);
        state.advance(Stage::Drafted);
        Ok(())
    }

    async fn invoke(
        &self,
        state: &TriageState,
        step: TriageStep,
        prompt: &str,
    ) -> Result<String, TriageError> {
        self.oracle.invoke(prompt).await.map_err(|source| {
            error!(
                run_id = %state.id,
                sender = %state.email.sender,
                step = %step,
                error = %source,
                "Oracle call failed, aborting run"
            );
            TriageError::Oracle {
                run_id: state.id,
                sender: state.email.sender.clone(),
                subject: state.email.subject.clone(),
                step,
                source,
            }
        })
    }
}
