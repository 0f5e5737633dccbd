//! Review moderation against a fixed deny-list.
//!
//! Matching is plain substring containment on the lowercased text. There is
//! no tokenisation, so short terms also match inside longer words
//! ("classic" contains "ass"). Redaction only ever applies to the copy shown
//! to readers; stored reviews keep their original text.

use std::{collections::BTreeSet, sync::Arc};

use crate::models::Review;

/// Body shown in place of a flagged review.
pub const REDACTED_PLACEHOLDER: &str =
    "This review has been hidden because it contains inappropriate language.";

const STANDARD_TERMS: &[&str] = &[
    // English
    "fuck",
    "fucking",
    "shit",
    "bitch",
    "bastard",
    "asshole",
    "ass",
    "dick",
    "cunt",
    "piss",
    "slut",
    "whore",
    "damn",
    "motherfucker",
    "wtf",
    "stfu",
    // Leetspeak and misspellings
    "fuk",
    "fck",
    "f0ck",
    "f*ck",
    "sh1t",
    "sh!t",
    "5hit",
    "b1tch",
    "b!tch",
    "a55",
    "@ss",
    "d1ck",
    "wh0re",
    "5lut",
    "biatch",
    // Arabic
    "كس",
    "زب",
    "شرموط",
    "منيك",
    "عرص",
    "خول",
    "حمار",
    "كلب",
    "حقير",
    "زبالة",
    "تفو",
    // Transliterated Arabic
    "sharmouta",
    "sharmota",
    "sharmoot",
    "manyak",
    "manyok",
    "a7a",
    "kos",
    "kuss",
    "zeb",
    "zebi",
    "3ars",
    "khawal",
    "7mar",
    "hmar",
    "kalb",
    "7aqeer",
    "5ara",
    "khara",
];

/// Immutable set of lowercased deny-listed substrings.
#[derive(Debug, Clone)]
pub struct DenyList {
    terms: Arc<BTreeSet<String>>,
}

impl DenyList {
    /// The canonical built-in list.
    pub fn standard() -> Self {
        Self::from_terms(STANDARD_TERMS.iter().copied())
    }

    /// Build a list from arbitrary terms; blank entries are ignored.
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .map(|term| term.as_ref().trim().to_lowercase())
            .filter(|term| !term.is_empty())
            .collect();
        Self {
            terms: Arc::new(terms),
        }
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the list has no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn first_match(&self, folded: &str) -> Option<&str> {
        self.terms
            .iter()
            .find(|term| folded.contains(term.as_str()))
            .map(String::as_str)
    }
}

/// Decides whether review text may be shown.
#[derive(Debug, Clone)]
pub struct ContentModerator {
    deny_list: DenyList,
}

impl ContentModerator {
    /// Moderator backed by `deny_list`.
    pub fn new(deny_list: DenyList) -> Self {
        Self { deny_list }
    }

    /// True when `text` contains any deny-listed term, ignoring case.
    pub fn is_inappropriate(&self, text: &str) -> bool {
        let folded = text.to_lowercase();
        match self.deny_list.first_match(&folded) {
            Some(term) => {
                tracing::debug!(term_len = term.chars().count(), "review text flagged");
                true
            }
            None => false,
        }
    }

    /// Copy of `review` suitable for display.
    pub fn moderate(&self, review: &Review) -> Review {
        let mut shown = review.clone();
        if self.is_inappropriate(&review.body) {
            shown.body = REDACTED_PLACEHOLDER.to_string();
        }
        shown
    }
}

impl Default for ContentModerator {
    fn default() -> Self {
        Self::new(DenyList::standard())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn review(body: &str) -> Review {
        Review {
            reviewer_id: "u1".to_string(),
            reviewer_name: "player one".to_string(),
            body: body.to_string(),
            rating: "Recommended".to_string(),
            profile_picture: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn flags_mixed_case_profanity() {
        let moderator = ContentModerator::default();
        assert!(moderator.is_inappropriate("This GaMe is FUCKING great"));
        assert!(!moderator.is_inappropriate("This game is great"));
    }

    #[test]
    fn matches_inside_words() {
        let moderator = ContentModerator::default();
        assert!(moderator.is_inappropriate("classic"));
    }

    #[test]
    fn covers_leetspeak_and_arabic() {
        let moderator = ContentModerator::default();
        assert!(moderator.is_inappropriate("total sh1t port"));
        assert!(moderator.is_inappropriate("انت حمار"));
        assert!(moderator.is_inappropriate("ya 7mar"));
    }

    #[test]
    fn every_standard_term_is_flagged_on_its_own() {
        let moderator = ContentModerator::default();
        for term in STANDARD_TERMS {
            assert!(moderator.is_inappropriate(term), "{term} not flagged");
            assert!(
                moderator.is_inappropriate(&format!("xx{}yy", term.to_uppercase())),
                "{term} not flagged mid-word"
            );
        }
    }

    #[test]
    fn moderation_only_changes_the_copy() {
        let moderator = ContentModerator::default();
        let original = review("what a piece of shit");
        let shown = moderator.moderate(&original);
        assert_eq!(shown.body, REDACTED_PLACEHOLDER);
        assert_eq!(original.body, "what a piece of shit");
        assert_eq!(shown.reviewer_id, original.reviewer_id);

        let clean = review("Loved the soundtrack");
        assert_eq!(moderator.moderate(&clean), clean);
    }

    #[test]
    fn custom_lists_ignore_blank_terms() {
        let list = DenyList::from_terms(["  Spoiler ", ""]);
        assert_eq!(list.len(), 1);
        let moderator = ContentModerator::new(list);
        assert!(moderator.is_inappropriate("no SPOILERS please"));
    }
}
