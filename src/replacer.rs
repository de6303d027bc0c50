//! Glossary substitution layers around machine translation.
//!
//! Table keys are regular expressions (`regex` crate syntax). Values may
//! refer to capture groups the way JavaScript replacement strings do: `$1`
//! to `$99`, `$&` for the whole match, `$<name>` for a named group and `$$`
//! for a literal dollar. A reference to a group the key does not have is kept
//! as text. The pre-replacer matches case-sensitively on the
//! source text, the post-replacer case-insensitively on the translation and
//! records where each substitution landed. Entries apply in table order, each
//! one on the output of the previous.
//!
//! A key that does not compile is skipped with a warning; the remaining
//! entries still apply.

use crate::glossary::{GlossaryStore, GlossaryTable, ReplacerStage};
use crate::i18n::Language;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Span of a substitution, `-1` for both ends when not found.
///
/// Offsets count UTF-16 code units, the unit JavaScript string indices use.
/// For Gujarati and other BMP text that is one per character; characters
/// outside the BMP (emoji) count as two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub starting_index: i64,
    pub end_index: i64,
}

impl Span {
    pub const NOT_FOUND: Span = Span {
        starting_index: -1,
        end_index: -1,
    };

    fn from_byte_range(text: &str, start: usize, end: usize) -> Self {
        let starting_index = text[..start].encode_utf16().count();
        let end_index = starting_index + text[start..end].encode_utf16().count();
        Span {
            starting_index: starting_index as i64,
            end_index: end_index as i64,
        }
    }
}

/// One applied post-replacement substitution.
///
/// `old` is the first match before the substitution. `new` is the first
/// occurrence of the replacement value, as written in the table, afterwards.
/// It may be an unrelated earlier occurrence of the same text, and is
/// `NOT_FOUND` when the value expanded group references; treat it as a
/// display hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub from: String,
    pub to: String,
    pub old: Span,
    pub new: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostReplacement {
    pub result: String,
    pub changes: Vec<ChangeRecord>,
}

fn compile(pattern: &str, case_insensitive: bool) -> Option<Regex> {
    match RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
    {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!("Skipping glossary key {:?}: {}", pattern, e);
            None
        }
    }
}

/// Rewrite a JavaScript-style replacement value into `regex` crate syntax.
fn replacement_template(value: &str, regex: &Regex) -> String {
    let groups = regex.captures_len() - 1;
    let has_names = regex.capture_names().flatten().next().is_some();
    let group = |n: usize| format!("${{{}}}", n);

    let mut template = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(dollar) = rest.find('$') {
        template.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];
        let digits = after.as_bytes();

        let consumed = match after.chars().next() {
            Some('$') => {
                template.push_str("$$");
                1
            }
            Some('&') => {
                template.push_str("${0}");
                1
            }
            Some(c) if c.is_ascii_digit() => {
                let one = (digits[0] - b'0') as usize;
                let two = digits
                    .get(1)
                    .filter(|d| d.is_ascii_digit())
                    .map(|d| one * 10 + (d - b'0') as usize);
                match two {
                    Some(n) if (1..=groups).contains(&n) => {
                        template.push_str(&group(n));
                        2
                    }
                    _ if (1..=groups).contains(&one) => {
                        template.push_str(&group(one));
                        1
                    }
                    _ => {
                        template.push_str("$$");
                        0
                    }
                }
            }
            Some('<') if has_names => match after.find('>') {
                Some(end) => {
                    template.push_str(&format!("${{{}}}", &after[1..end]));
                    end + 1
                }
                None => {
                    template.push_str("$$");
                    0
                }
            },
            _ => {
                template.push_str("$$");
                0
            }
        };
        rest = &after[consumed..];
    }
    template.push_str(rest);
    template
}

/// Apply a pre-translation table (case-sensitive).
pub fn apply_pre(input: &str, table: &GlossaryTable) -> String {
    let mut text = input.to_string();

    for (pattern, replacement) in table.iter() {
        let Some(regex) = compile(pattern, false) else {
            continue;
        };
        let template = replacement_template(replacement, &regex);
        text = regex.replace_all(&text, template.as_str()).into_owned();
    }

    text
}

/// Apply a post-translation table (case-insensitive), recording each key
/// that matched.
pub fn apply_post(input: &str, table: &GlossaryTable) -> PostReplacement {
    let mut text = input.to_string();
    let mut changes = Vec::new();

    for (pattern, replacement) in table.iter() {
        let Some(regex) = compile(pattern, true) else {
            continue;
        };
        let Some(found) = regex.find(&text) else {
            continue;
        };

        let old = Span::from_byte_range(&text, found.start(), found.end());
        let template = replacement_template(replacement, &regex);
        text = regex.replace_all(&text, template.as_str()).into_owned();
        let new = text
            .find(replacement)
            .map(|start| Span::from_byte_range(&text, start, start + replacement.len()))
            .unwrap_or(Span::NOT_FOUND);

        changes.push(ChangeRecord {
            from: pattern.to_string(),
            to: replacement.to_string(),
            old,
            new,
        });
    }

    PostReplacement {
        result: text,
        changes,
    }
}

/// Runs the replacement layers against the default glossaries merged with
/// caller-supplied overrides.
#[derive(Debug, Clone)]
pub struct Replacer {
    store: Arc<GlossaryStore>,
}

impl Replacer {
    pub fn new(store: Arc<GlossaryStore>) -> Self {
        Self { store }
    }

    pub async fn pre_replace(
        &self,
        input: &str,
        language: Language,
        overrides: &GlossaryTable,
    ) -> String {
        let defaults = self.store.load(ReplacerStage::Pre, language).await;
        let table = defaults.merged(overrides);
        debug!(
            "Pre-replacing with {} entries for {}",
            table.len(),
            language.code()
        );
        apply_pre(input, &table)
    }

    pub async fn post_replace(
        &self,
        input: &str,
        language: Language,
        overrides: &GlossaryTable,
    ) -> PostReplacement {
        let defaults = self.store.load(ReplacerStage::Post, language).await;
        let table = defaults.merged(overrides);
        let replaced = apply_post(input, &table);
        debug!(
            "Post-replaced {} of {} entries for {}",
            replaced.changes.len(),
            table.len(),
            language.code()
        );
        replaced
    }
}
