//! The knowledge base: static reference data about the institution.
//!
//! Loaded once at startup from a TOML document (the embedded default in
//! `data/knowledge.toml`, or an operator-supplied file) and never mutated.
//! Entries keep their declaration order, which is also the order in which
//! they are rendered into the prompt context.

use std::collections::HashSet;
use std::path::Path;

use campusdesk_core::error::KnowledgeError;
use serde::Deserialize;

use crate::augmenter::TriggerRule;

/// The knowledge document compiled into the binary.
pub const EMBEDDED_KNOWLEDGE: &str = include_str!("../data/knowledge.toml");

/// Value of a top-level knowledge entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnowledgeValue {
    /// A block of informational text
    Text(String),
    /// One level of named sub-entries, in declaration order
    Nested(Vec<(String, String)>),
}

/// A single top-level entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeEntry {
    pub key: String,
    pub value: KnowledgeValue,
}

impl KnowledgeEntry {
    pub fn text(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: KnowledgeValue::Text(text.into()),
        }
    }

    pub fn nested<K, V>(key: impl Into<String>, sections: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            key: key.into(),
            value: KnowledgeValue::Nested(
                sections
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

/// An immutable, ordered knowledge base.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    subject: String,
    entries: Vec<KnowledgeEntry>,
    triggers: Vec<TriggerRule>,
}

// ── Document format ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawDocument {
    subject: String,
    #[serde(default)]
    entries: Vec<RawEntry>,
    #[serde(default)]
    triggers: Vec<TriggerRule>,
}

#[derive(Deserialize)]
struct RawEntry {
    key: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    sections: Vec<RawSection>,
}

#[derive(Deserialize)]
struct RawSection {
    key: String,
    text: String,
}

impl KnowledgeBase {
    /// Build a knowledge base, rejecting empty or duplicate keys.
    pub fn new(
        subject: impl Into<String>,
        entries: Vec<KnowledgeEntry>,
    ) -> Result<Self, KnowledgeError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.key.trim().is_empty() {
                return Err(KnowledgeError::EmptyKey);
            }
            if !seen.insert(entry.key.as_str()) {
                return Err(KnowledgeError::DuplicateKey(entry.key.clone()));
            }
        }

        Ok(Self {
            subject: subject.into(),
            entries,
            triggers: Vec::new(),
        })
    }

    /// Attach keyword trigger rules declared alongside the entries.
    pub fn with_triggers(mut self, triggers: Vec<TriggerRule>) -> Self {
        self.triggers = triggers.into_iter().map(TriggerRule::normalized).collect();
        self
    }

    /// Parse a knowledge document.
    pub fn from_toml_str(source: &str) -> Result<Self, KnowledgeError> {
        let raw: RawDocument =
            toml::from_str(source).map_err(|e| KnowledgeError::ParseError(e.to_string()))?;

        let entries = raw
            .entries
            .into_iter()
            .map(|e| match (e.text, e.sections.is_empty()) {
                (Some(text), true) => Ok(KnowledgeEntry::text(e.key, text)),
                (None, false) => Ok(KnowledgeEntry::nested(
                    e.key,
                    e.sections.into_iter().map(|s| (s.key, s.text)),
                )),
                (Some(_), false) => Err(KnowledgeError::ParseError(format!(
                    "entry '{}' has both text and sections",
                    e.key
                ))),
                (None, true) => Err(KnowledgeError::ParseError(format!(
                    "entry '{}' has neither text nor sections",
                    e.key
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(raw.subject, entries)?.with_triggers(raw.triggers))
    }

    /// Load a knowledge document from disk.
    pub fn load(path: &Path) -> Result<Self, KnowledgeError> {
        let source = std::fs::read_to_string(path).map_err(|e| KnowledgeError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&source)
    }

    /// The knowledge document compiled into the binary.
    pub fn embedded() -> Result<Self, KnowledgeError> {
        Self::from_toml_str(EMBEDDED_KNOWLEDGE)
    }

    /// Load `path` when given, otherwise the embedded document.
    pub fn load_or_embedded(path: Option<&Path>) -> Result<Self, KnowledgeError> {
        match path {
            Some(p) => Self::load(p),
            None => Self::embedded(),
        }
    }

    /// What the knowledge base is about (e.g. the institution's name).
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn triggers(&self) -> &[TriggerRule] {
        &self.triggers
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&KnowledgeValue> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    /// A nested value, e.g. `nested("campus_images", "logo")`.
    pub fn nested(&self, key: &str, sub_key: &str) -> Option<&str> {
        match self.get(key)? {
            KnowledgeValue::Nested(sections) => sections
                .iter()
                .find(|(k, _)| k == sub_key)
                .map(|(_, v)| v.as_str()),
            KnowledgeValue::Text(_) => None,
        }
    }

    /// Text of an entry as it is appended to replies. Nested entries render
    /// as `sub_key: text` blocks separated by blank lines.
    pub fn section_text(&self, key: &str) -> Option<String> {
        Some(match self.get(key)? {
            KnowledgeValue::Text(text) => text.clone(),
            KnowledgeValue::Nested(sections) => sections
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<_>>()
                .join("\n\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_document_loads() {
        let kb = KnowledgeBase::embedded().unwrap();
        assert_eq!(kb.subject(), "OLFU Antipolo Senior High School");
        assert_eq!(kb.len(), 24);
        assert_eq!(kb.entries()[0].key, "strands");
        assert_eq!(kb.entries()[23].key, "shs_curriculum");
        assert!(matches!(kb.get("strands"), Some(KnowledgeValue::Nested(s)) if s.len() == 4));
        assert!(matches!(kb.get("facilities"), Some(KnowledgeValue::Text(_))));
    }

    #[test]
    fn embedded_document_has_trigger_sections() {
        let kb = KnowledgeBase::embedded().unwrap();
        assert_eq!(kb.triggers().len(), 2);
        for rule in kb.triggers() {
            assert!(
                kb.get(&rule.section).is_some(),
                "trigger '{}' points at missing entry '{}'",
                rule.name,
                rule.section
            );
        }
    }

    #[test]
    fn embedded_text_is_verbatim() {
        let kb = KnowledgeBase::embedded().unwrap();
        let location = kb.section_text("location_details").unwrap();
        assert!(location.starts_with("📍 OLFU Antipolo Campus Location:\n\n"));
        assert!(location.ends_with("GPS Coordinates: 14.5844° N, 121.1763° E"));
        assert_eq!(kb.nested("campus_images", "logo"), Some("/static/logo.svg"));
    }

    #[test]
    fn declaration_order_is_preserved() {
        let kb = KnowledgeBase::from_toml_str(
            r#"
subject = "Test"

[[entries]]
key = "zeta"
text = "last letter"

[[entries]]
key = "alpha"
text = "first letter"
"#,
        )
        .unwrap();
        let keys: Vec<_> = kb.entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn duplicate_keys_rejected() {
        let result = KnowledgeBase::new(
            "Test",
            vec![KnowledgeEntry::text("fees", "a"), KnowledgeEntry::text("fees", "b")],
        );
        assert!(matches!(result, Err(KnowledgeError::DuplicateKey(k)) if k == "fees"));
    }

    #[test]
    fn empty_key_rejected() {
        let result = KnowledgeBase::new("Test", vec![KnowledgeEntry::text(" ", "a")]);
        assert!(matches!(result, Err(KnowledgeError::EmptyKey)));
    }

    #[test]
    fn entry_needs_exactly_one_value_kind() {
        let both = r#"
subject = "Test"
[[entries]]
key = "x"
text = "t"
[[entries.sections]]
key = "y"
text = "z"
"#;
        assert!(matches!(
            KnowledgeBase::from_toml_str(both),
            Err(KnowledgeError::ParseError(m)) if m.contains("both")
        ));

        let neither = "subject = \"Test\"\n[[entries]]\nkey = \"x\"\n";
        assert!(matches!(
            KnowledgeBase::from_toml_str(neither),
            Err(KnowledgeError::ParseError(m)) if m.contains("neither")
        ));
    }

    #[test]
    fn nested_lookup_and_section_text() {
        let kb = KnowledgeBase::new(
            "Test",
            vec![
                KnowledgeEntry::nested("images", [("logo", "/l.svg"), ("map", "/m.png")]),
                KnowledgeEntry::text("hours", "7:30 AM - 4:30 PM"),
            ],
        )
        .unwrap();

        assert_eq!(kb.nested("images", "map"), Some("/m.png"));
        assert_eq!(kb.nested("images", "missing"), None);
        assert_eq!(kb.nested("hours", "logo"), None);
        assert_eq!(
            kb.section_text("images").unwrap(),
            "logo: /l.svg\n\nmap: /m.png"
        );
        assert!(kb.section_text("nope").is_none());
    }

    #[test]
    fn missing_file_is_read_error() {
        let result = KnowledgeBase::load(Path::new("/nonexistent/knowledge.toml"));
        assert!(matches!(result, Err(KnowledgeError::ReadError { .. })));
    }
}
