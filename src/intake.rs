//! Email intake — loading `Email`s from JSON or RFC 822 (`.eml`) files.

use std::path::Path;

use mail_parser::MessageParser;
use tracing::debug;

use crate::error::IntakeError;
use crate::pipeline::types::Email;

/// Load every email in a file.
///
/// - `.json`: a single `Email` object or an array of them
/// - `.eml`: one RFC 822 message
pub fn load_emails(path: &Path) -> crate::error::Result<Vec<Email>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let raw = std::fs::read(path).map_err(IntakeError::from)?;
    debug!(path = %path.display(), bytes = raw.len(), "Loading emails");

    let emails = match ext.as_str() {
        "json" => parse_json(&raw)?,
        "eml" => vec![parse_rfc822(&raw)?],
        other => {
            return Err(IntakeError::UnsupportedFormat(if other.is_empty() {
                path.display().to_string()
            } else {
                other.to_string()
            })
            .into());
        }
    };
    Ok(emails)
}

/// Parse a JSON email object or array of objects.
pub fn parse_json(raw: &[u8]) -> Result<Vec<Email>, IntakeError> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<Email>),
        One(Email),
    }

    Ok(match serde_json::from_slice::<OneOrMany>(raw)? {
        OneOrMany::Many(emails) => emails,
        OneOrMany::One(email) => vec![email],
    })
}

/// Parse a raw RFC 822 message into an `Email`.
///
/// Prefers the plain-text body, falling back to tag-stripped HTML. Missing
/// headers become empty strings so the workflow's own validation reports
/// them as malformed.
pub fn parse_rfc822(raw: &[u8]) -> Result<Email, IntakeError> {
    let parsed = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| IntakeError::InvalidMessage("not an RFC 822 message".to_string()))?;

    let sender = parsed
        .from()
        .and_then(|addr| addr.first())
        .and_then(|a| a.address())
        .map(|s| s.to_string())
        .unwrap_or_default();
    let subject = parsed.subject().unwrap_or_default().to_string();

    let body = if let Some(text) = parsed.body_text(0) {
        text.trim().to_string()
    } else if let Some(html) = parsed.body_html(0) {
        strip_html(html.as_ref())
    } else {
        String::new()
    };

    Ok(Email {
        sender,
        subject,
        body,
    })
}

/// Strip HTML tags from a string (basic, no parser dependency).
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    // Normalize whitespace
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The two demonstration emails: a consulting inquiry and a lottery scam.
pub fn sample_emails() -> Vec<Email> {
    vec![
        Email::new(
            "john.smith@example.com",
            "Question about your services",
            "Dear Mr. Hugg, I was referred to you by a colleague and I'm interested in learning \
             more about your consulting services. Could we schedule a call next week? \
             Best regards, John Smith",
        ),
        Email::new(
            "winner@lottery-intl.com",
            "YOU HAVE WON $5,000,000!!!",
            "CONGRATULATIONS! You have been selected as the winner of our international lottery! \
             To claim your $5,000,000 prize, please send us your bank details and a processing \
             fee of $100.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;

    const PLAIN_EML: &str = "From: Alice <alice@example.com>\r\n\
        To: bob@example.com\r\n\
        Subject: Pricing question\r\n\
        Content-Type: text/plain; charset=utf-8\r\n\
        \r\n\
        Hi, what does the premium plan cost?\r\n";

    const HTML_EML: &str = "From: news@example.com\r\n\
        Subject: Update\r\n\
        Content-Type: text/html; charset=utf-8\r\n\
        \r\n\
        <html><body><p>Hello   <b>there</b></p></body></html>\r\n";

    #[test]
    fn parse_plain_rfc822() {
        let email = parse_rfc822(PLAIN_EML.as_bytes()).unwrap();
        assert_eq!(email.sender, "alice@example.com");
        assert_eq!(email.subject, "Pricing question");
        assert_eq!(email.body, "Hi, what does the premium plan cost?");
    }

    #[test]
    fn parse_html_rfc822() {
        let email = parse_rfc822(HTML_EML.as_bytes()).unwrap();
        assert_eq!(email.sender, "news@example.com");
        assert!(email.body.contains("Hello"));
        assert!(email.body.contains("there"));
        assert!(!email.body.contains('<'));
    }

    #[test]
    fn parse_json_single_and_array() {
        let one = parse_json(br#"{"sender":"a@b.com","subject":"s","body":"b"}"#).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].sender, "a@b.com");

        let many = parse_json(
            br#"[{"sender":"a@b.com","subject":"s","body":"b"},{"sender":"c@d.com","subject":"t","body":"u"}]"#,
        )
        .unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many[1].subject, "t");
    }

    #[test]
    fn parse_json_rejects_missing_fields() {
        assert!(matches!(
            parse_json(br#"{"sender":"a@b.com"}"#),
            Err(IntakeError::Json(_))
        ));
    }

    #[test]
    fn load_from_files() {
        let dir = tempfile::tempdir().unwrap();

        let eml_path = dir.path().join("inquiry.eml");
        std::fs::File::create(&eml_path)
            .unwrap()
            .write_all(PLAIN_EML.as_bytes())
            .unwrap();
        let emails = load_emails(&eml_path).unwrap();
        assert_eq!(emails[0].subject, "Pricing question");

        let json_path = dir.path().join("batch.JSON");
        std::fs::write(
            &json_path,
            serde_json::to_vec(&sample_emails()).unwrap(),
        )
        .unwrap();
        let emails = load_emails(&json_path).unwrap();
        assert_eq!(emails, sample_emails());

        let txt_path = dir.path().join("notes.txt");
        std::fs::write(&txt_path, "hello").unwrap();
        assert!(matches!(
            load_emails(&txt_path),
            Err(Error::Intake(IntakeError::UnsupportedFormat(ext))) if ext == "txt"
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_emails(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, Error::Intake(IntakeError::Io(_))));
    }

    #[test]
    fn strip_html_basic() {
        assert_eq!(strip_html("<p>Hello</p>"), "Hello");
        assert_eq!(
            strip_html("<div><b>Bold</b> and <i>italic</i></div>"),
            "Bold and italic"
        );
        assert_eq!(strip_html("No HTML here"), "No HTML here");
    }

    #[test]
    fn samples_are_valid() {
        for email in sample_emails() {
            assert!(email.validate().is_ok());
        }
    }
}
