//! Email triage pipeline.
//!
//! Every email flows through:
//! 1. `Email::validate()` — reject blank sender/subject/body before any LLM call
//! 2. Classification — oracle + `ResponseParser` decide spam vs legitimate
//! 3. Spam → `TerminalHandler::handle_spam()`
//! 4. Legitimate → drafted reply → `TerminalHandler::notify()`
//!
//! **No fallback classification.** An oracle failure aborts the run.

pub mod handlers;
pub mod oracle;
pub mod parser;
pub mod prompts;
pub mod types;
pub mod workflow;

pub use handlers::{
    ConsoleHandler, NotificationRecord, RecordingHandler, RejectionRecord, TerminalHandler,
    TerminalRecord,
};
pub use oracle::{LlmOracle, Oracle};
pub use parser::{KeywordParser, ResponseParser};
pub use types::{Category, Classification, Email, Stage, TranscriptEntry, TriageState};
pub use workflow::TriageWorkflow;
