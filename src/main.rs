use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use email_triage::config::TriageConfig;
use email_triage::intake::{load_emails, sample_emails};
use email_triage::llm::create_provider;
use email_triage::pipeline::{
    ConsoleHandler, Email, LlmOracle, RecordingHandler, TerminalHandler, TriageWorkflow,
};

const USAGE: &str = "Usage: email-triage [--json] [FILE.json | FILE.eml]...\n\
                     With no files, the built-in sample emails are triaged.\n\
                     --json prints one line per triaged email: {\"state\": ..., \"record\": ...}";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut json_output = false;
    let mut files: Vec<PathBuf> = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => json_output = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                return Ok(());
            }
            flag if flag.starts_with('-') => anyhow::bail!("unknown flag {flag}\n{USAGE}"),
            path => files.push(PathBuf::from(path)),
        }
    }

    let config = TriageConfig::from_env().context("invalid configuration")?;

    eprintln!("📬 Email Triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {} ({:?})", config.llm.model, config.llm.backend);
    eprintln!("   Endpoint: {}", config.llm.base_url);
    eprintln!("   Oracle timeout: {}s", config.oracle_timeout.as_secs());

    let emails: Vec<Email> = if files.is_empty() {
        eprintln!("   Input: built-in samples\n");
        sample_emails()
    } else {
        let mut emails = Vec::new();
        for path in &files {
            let loaded = load_emails(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            emails.extend(loaded);
        }
        eprintln!("   Input: {} email(s) from {} file(s)\n", emails.len(), files.len());
        emails
    };

    let llm = create_provider(&config.llm)?;
    let oracle = Arc::new(LlmOracle::from_config(llm, &config));
    let recorder = json_output.then(RecordingHandler::new);
    let handler: Arc<dyn TerminalHandler> = match &recorder {
        Some(recorder) => recorder.clone(),
        None => Arc::new(ConsoleHandler),
    };
    let workflow = TriageWorkflow::new(oracle, handler);

    let results = workflow.run_batch(emails, config.concurrency).await;

    let mut failures = 0usize;
    for result in results {
        match result {
            Ok(state) => {
                if let Some(recorder) = &recorder {
                    let record = recorder.record_for(state.id()).await;
                    let line = serde_json::json!({ "state": state, "record": record });
                    println!("{line}");
                }
            }
            Err(e) => {
                failures += 1;
                eprintln!("Error: {e}");
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} email(s) could not be triaged");
    }
    Ok(())
}
