//! Email triage — classify incoming mail, reject spam, draft replies for review.

pub mod config;
pub mod error;
pub mod intake;
pub mod llm;
pub mod pipeline;
