//! Plain-text weekly digest body.

use std::fmt::Write;

pub const SUBJECT: &str = "What's new in your Closeknit communities";

/// One line of the digest: a resource and who shares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub owner: String,
}

impl Entry {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Digest {
    pub items: Vec<Entry>,
    pub subscriptions: Vec<Entry>,
    pub requests: Vec<Entry>,
}

impl Digest {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.subscriptions.is_empty() && self.requests.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

fn section(out: &mut String, title: &str, entries: &[Entry]) {
    if entries.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}");
    for e in entries {
        let _ = writeln!(out, "- {} (shared by {})", e.name, e.owner);
    }
    out.push('\n');
}

/// Digest body for one recipient, or `None` when there is nothing to tell them.
pub fn compose(digest: &Digest, site_url: &str) -> Option<String> {
    if digest.is_empty() {
        return None;
    }
    let mut body = String::new();
    let _ = writeln!(body, "Here is what your Closeknit communities are sharing this week.\n");
    section(&mut body, "Available to borrow:", &digest.items);
    section(&mut body, "Subscriptions open for sharing:", &digest.subscriptions);
    section(&mut body, "Requested by your communities:", &digest.requests);
    let _ = writeln!(
        body,
        "Reach out to your neighbours if you'd like to borrow something, or add your own at {site_url}."
    );
    Some(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_digest_is_not_sent() {
        assert!(compose(&Digest::default(), "https://closeknit.test").is_none());
    }

    #[test]
    fn only_non_empty_sections_are_rendered() {
        let digest = Digest {
            items: vec![Entry::new("Drill", "ben"), Entry::new("Tent", "cleo")],
            subscriptions: vec![],
            requests: vec![Entry::new("Ladder", "dan")],
        };
        let body = compose(&digest, "https://closeknit.test").unwrap();

        assert!(body.contains("Available to borrow:\n- Drill (shared by ben)\n- Tent (shared by cleo)\n"));
        assert!(body.contains("Requested by your communities:\n- Ladder (shared by dan)\n"));
        assert!(!body.contains("Subscriptions open for sharing"));
        assert!(body.trim_end().ends_with("https://closeknit.test."));
    }
}
