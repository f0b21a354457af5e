//! Prompt construction for the classification and drafting steps.

use crate::pipeline::parser::{LEGITIMATE_MARKER, SPAM_MARKER};
use crate::pipeline::types::{Category, Email};

/// Body characters included in a prompt.
const BODY_PREVIEW_CHARS: usize = 4000;

/// Category used in the drafting prompt when none was detected.
pub const DEFAULT_CATEGORY: &str = "general";

fn push_email(prompt: &mut String, email: &Email) {
    let body: String = email.body.chars().take(BODY_PREVIEW_CHARS).collect();
    prompt.push_str("Email:\n");
    prompt.push_str(&format!("From: {}\n", email.sender));
    prompt.push_str(&format!("Subject: {}\n", email.subject));
    prompt.push_str(&format!("Body: {}\n", body));
}

/// Build the spam/legitimate classification prompt.
pub fn build_classification_prompt(email: &Email) -> String {
    let categories: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();

    let mut prompt = String::with_capacity(512 + email.body.len().min(BODY_PREVIEW_CHARS));
    prompt.push_str(
        "You are an email assistant. Analyze this email and determine if it is spam or legitimate.\n\n",
    );
    push_email(&mut prompt, email);
    prompt.push_str(&format!(
        "\nIf the email is spam, write {SPAM_MARKER} in capital letters, then write 'reason:' \
         followed by the spam reason on the same line.\n\
         If it is legitimate, write {LEGITIMATE_MARKER} in capital letters and categorize it as \
         exactly one of: {}.\n",
        categories.join(", ")
    ));
    prompt
}

/// Build the reply drafting prompt for a legitimate email.
pub fn build_draft_prompt(email: &Email, category: Option<Category>) -> String {
    let category = category.map(|c| c.label()).unwrap_or(DEFAULT_CATEGORY);

    let mut prompt = String::with_capacity(512 + email.body.len().min(BODY_PREVIEW_CHARS));
    prompt.push_str("You are an email assistant. Draft a polite preliminary response to this email.\n\n");
    push_email(&mut prompt, email);
    prompt.push_str(&format!("\nThis email has been categorized as: {category}\n\n"));
    prompt.push_str(
        "Draft a brief, professional response that the recipient can review and personalize before sending.\n",
    );
    prompt
}
