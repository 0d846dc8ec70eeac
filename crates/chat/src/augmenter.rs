//! Response augmentation — keyword-triggered knowledge appendices.
//!
//! After the backend replies, the *original* question (not the composed
//! prompt) is lowercased and checked against an ordered list of trigger
//! rules. Every rule that matches appends its knowledge entry to the reply:
//!
//! ```text
//! {reply}
//!
//! {lead_in}
//! {entry text}
//! ```
//!
//! Rules are independent: several may fire for one question, and they are
//! applied in declaration order. Appending is not de-duplicated; running the
//! augmenter twice appends twice.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::knowledge::KnowledgeBase;

/// A keyword condition that appends a knowledge entry to the reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRule {
    /// Rule name, for logs
    pub name: String,
    /// Matched by lowercase substring containment against the question
    pub keywords: Vec<String>,
    /// Key of the knowledge entry to append
    pub section: String,
    /// Line written before the appended entry
    pub lead_in: String,
}

impl TriggerRule {
    pub fn new<I, S>(
        name: impl Into<String>,
        keywords: I,
        section: impl Into<String>,
        lead_in: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
            section: section.into(),
            lead_in: lead_in.into(),
        }
        .normalized()
    }

    /// Lowercase the keywords so they can match the lowercased question.
    pub(crate) fn normalized(mut self) -> Self {
        for keyword in &mut self.keywords {
            *keyword = keyword.to_lowercase();
        }
        self.keywords.retain(|k| !k.is_empty());
        self
    }

    /// Whether any keyword occurs in `lowered_message`.
    pub fn matches(&self, lowered_message: &str) -> bool {
        self.keywords.iter().any(|k| lowered_message.contains(k.as_str()))
    }
}

/// An ordered pipeline of [`TriggerRule`]s.
#[derive(Debug, Clone, Default)]
pub struct ResponseAugmenter {
    rules: Vec<TriggerRule>,
}

impl ResponseAugmenter {
    pub fn new(rules: Vec<TriggerRule>) -> Self {
        Self { rules }
    }

    /// The location and facilities rules.
    pub fn standard() -> Self {
        Self::new(vec![
            TriggerRule::new(
                "location",
                ["location", "address", "where", "map", "directions", "how to get there"],
                "location_details",
                "Here's our exact location information:",
            ),
            TriggerRule::new(
                "facilities",
                ["campus", "building", "facilities", "look like", "pictures", "photos", "images"],
                "facilities",
                "Here's information about our campus facilities:",
            ),
        ])
    }

    /// Rules declared in the knowledge document, or [`Self::standard`] when
    /// it declares none.
    pub fn for_knowledge(kb: &KnowledgeBase) -> Self {
        if kb.triggers().is_empty() {
            Self::standard()
        } else {
            Self::new(kb.triggers().to_vec())
        }
    }

    /// Append a rule at the end of the pipeline.
    pub fn push(&mut self, rule: TriggerRule) {
        self.rules.push(rule.normalized());
    }

    pub fn rules(&self) -> &[TriggerRule] {
        &self.rules
    }

    /// Names of the rules that fire for `message`, in pipeline order.
    pub fn matching_rules(&self, message: &str) -> Vec<&str> {
        let lowered = message.to_lowercase();
        self.rules
            .iter()
            .filter(|r| r.matches(&lowered))
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Produce the final reply for `message`.
    pub fn augment(&self, message: &str, reply: &str, kb: &KnowledgeBase) -> String {
        let lowered = message.to_lowercase();
        let mut result = reply.to_string();

        for rule in self.rules.iter().filter(|r| r.matches(&lowered)) {
            match kb.section_text(&rule.section) {
                Some(text) => {
                    debug!(rule = %rule.name, section = %rule.section, "Trigger matched");
                    result.push_str("\n\n");
                    result.push_str(&rule.lead_in);
                    result.push('\n');
                    result.push_str(&text);
                }
                None => {
                    warn!(
                        rule = %rule.name,
                        section = %rule.section,
                        "Trigger matched but knowledge entry is missing; skipping"
                    );
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kb() -> KnowledgeBase {
        KnowledgeBase::embedded().unwrap()
    }

    fn location_block(kb: &KnowledgeBase) -> String {
        format!(
            "\n\nHere's our exact location information:\n{}",
            kb.section_text("location_details").unwrap()
        )
    }

    fn facilities_block(kb: &KnowledgeBase) -> String {
        format!(
            "\n\nHere's information about our campus facilities:\n{}",
            kb.section_text("facilities").unwrap()
        )
    }

    #[test]
    fn no_trigger_returns_reply_unchanged() {
        let kb = kb();
        let out = ResponseAugmenter::for_knowledge(&kb).augment("How much is tuition?", "It is PHP 500.", &kb);
        assert_eq!(out, "It is PHP 500.");
    }

    #[test]
    fn location_question_appends_location_details() {
        let kb = kb();
        let augmenter = ResponseAugmenter::for_knowledge(&kb);
        // "campus" also fires the facilities rule; location comes first.
        let out = augmenter.augment("Where is the campus located?", "We are in Antipolo.", &kb);

        assert!(out.starts_with("We are in Antipolo."));
        let expected = format!("We are in Antipolo.{}", location_block(&kb));
        assert!(out.starts_with(&expected));
        assert!(out.contains(&kb.section_text("location_details").unwrap()));
    }

    #[test]
    fn facilities_question_appends_facilities() {
        let kb = kb();
        let out = ResponseAugmenter::for_knowledge(&kb).augment(
            "What are your facilities like?",
            "We have many.",
            &kb,
        );
        assert_eq!(out, format!("We have many.{}", facilities_block(&kb)));
    }

    #[test]
    fn both_rules_fire_location_first() {
        let kb = kb();
        let out = ResponseAugmenter::for_knowledge(&kb).augment("Where are your facilities?", "Reply.", &kb);
        assert_eq!(
            out,
            format!("Reply.{}{}", location_block(&kb), facilities_block(&kb))
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        let kb = kb();
        let augmenter = ResponseAugmenter::for_knowledge(&kb);
        assert_eq!(augmenter.matching_rules("WHERE can I PARK?"), vec!["location"]);
        assert_eq!(augmenter.matching_rules("Show me PHOTOS"), vec!["facilities"]);
        assert_eq!(
            augmenter.matching_rules("How To Get There and what does it Look Like"),
            vec!["location", "facilities"]
        );
    }

    #[test]
    fn substring_containment_not_word_match() {
        let kb = kb();
        // "somewhere" contains "where"
        let augmenter = ResponseAugmenter::for_knowledge(&kb);
        assert_eq!(augmenter.matching_rules("somewhere"), vec!["location"]);
    }

    #[test]
    fn rerun_appends_again() {
        let kb = kb();
        let augmenter = ResponseAugmenter::for_knowledge(&kb);
        let once = augmenter.augment("What are your facilities like?", "Reply.", &kb);
        let twice = augmenter.augment("What are your facilities like?", &once, &kb);

        assert_eq!(twice, format!("Reply.{0}{0}", facilities_block(&kb)));
        assert_eq!(twice.matches("Here's information about our campus facilities:").count(), 2);
    }

    #[test]
    fn missing_section_is_skipped() {
        let kb = KnowledgeBase::new("Test", vec![]).unwrap();
        let out = ResponseAugmenter::standard().augment("where?", "Reply.", &kb);
        assert_eq!(out, "Reply.");
    }

    #[test]
    fn standard_matches_embedded_rules() {
        let kb = kb();
        assert_eq!(ResponseAugmenter::standard().rules(), kb.triggers());
    }

    #[test]
    fn pushed_rules_run_last_and_are_lowercased() {
        let kb = kb();
        let mut augmenter = ResponseAugmenter::standard();
        augmenter.push(TriggerRule {
            name: "scholarships".into(),
            keywords: vec!["Scholarship".into()],
            section: "scholarships".into(),
            lead_in: "Available scholarships:".into(),
        });

        assert_eq!(
            augmenter.matching_rules("where do I apply for a scholarship?"),
            vec!["location", "scholarships"]
        );
        let out = augmenter.augment("scholarship info", "Reply.", &kb);
        assert!(out.starts_with("Reply.\n\nAvailable scholarships:\n🎓 Available Scholarships:"));
    }
}
