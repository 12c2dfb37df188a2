//! Reply addressing and threading helpers.

/// The parts of an original message a reply needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyContext {
    /// Original `From` header.
    pub from: Option<String>,
    /// Original `Subject` header.
    pub subject: Option<String>,
    /// Original `Message-ID` header.
    pub message_id: Option<String>,
    /// Original `References` header.
    pub references: Option<String>,
}

/// Extracts the bare address from a `From` header value.
///
/// `"Alice <alice@example.com>"` becomes `alice@example.com`; values without
/// angle brackets are returned trimmed.
#[must_use]
pub fn extract_address(from: &str) -> String {
    match (from.find('<'), from.find('>')) {
        (Some(lt), Some(gt)) if gt > lt => from[lt + 1..gt].trim().to_string(),
        _ => from.trim().to_string(),
    }
}

/// Builds the subject of a reply, adding `Re: ` once.
#[must_use]
pub fn reply_subject(subject: Option<&str>) -> String {
    let Some(subject) = subject else {
        return "Re:".to_string();
    };

    let subject = subject.trim();
    if subject
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("re:"))
    {
        subject.to_string()
    } else {
        format!("Re: {subject}")
    }
}

/// Builds the `References` header for a reply to `message_id`.
#[must_use]
pub fn thread_references(references: Option<&str>, message_id: &str) -> String {
    match references.map(str::trim) {
        None | Some("") => message_id.to_string(),
        Some(refs) if refs.contains(message_id) => refs.to_string(),
        Some(refs) => format!("{refs} {message_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_address() {
        assert_eq!(extract_address("Alice <alice@example.com>"), "alice@example.com");
        assert_eq!(extract_address("  bob@example.com "), "bob@example.com");
        assert_eq!(extract_address("broken > <"), "broken > <");
    }

    #[test]
    fn test_reply_subject() {
        assert_eq!(reply_subject(Some("Lunch")), "Re: Lunch");
        assert_eq!(reply_subject(Some("RE: Lunch")), "RE: Lunch");
        assert_eq!(reply_subject(Some("  re: lunch ")), "re: lunch");
        assert_eq!(reply_subject(None), "Re:");
        assert_eq!(reply_subject(Some("Ré")), "Re: Ré");
    }

    #[test]
    fn test_thread_references() {
        assert_eq!(thread_references(None, "<a@x>"), "<a@x>");
        assert_eq!(thread_references(Some("  "), "<a@x>"), "<a@x>");
        assert_eq!(thread_references(Some("<z@x>"), "<a@x>"), "<z@x> <a@x>");
        assert_eq!(thread_references(Some("<z@x> <a@x>"), "<a@x>"), "<z@x> <a@x>");
    }
}
