//! Blocklist filtering and severity ordering.
//!
//! Blocked patterns use shell wildcard rules (`*`, `?`, `[...]`, `[!...]`)
//! and must match the whole alert type name. A blocked type is removed with
//! all of its records before the snapshot is grouped and ordered.

use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::{AlertRecord, Snapshot};

/// Compiled set of blocked alert type globs.
#[derive(Debug, Clone, Default)]
pub struct Blocklist {
    patterns: Vec<(String, Regex)>,
}

impl Blocklist {
    /// Compile a list of globs.
    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                let regex = Regex::new(&glob_to_regex(pattern))
                    .map_err(|e| AppError::pattern(pattern, e))?;
                Ok((pattern.clone(), regex))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// A blocklist that blocks nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// The first pattern matching `alert_type`, if any.
    pub fn matching_pattern(&self, alert_type: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, regex)| regex.is_match(alert_type))
            .map(|(pattern, _)| pattern.as_str())
    }

    pub fn is_blocked(&self, alert_type: &str) -> bool {
        self.matching_pattern(alert_type).is_some()
    }
}

/// Drop blocked alert types, then group and order what remains.
pub fn filter_and_sort(records: Vec<AlertRecord>, blocklist: &Blocklist) -> Snapshot {
    let total = records.len();
    let kept: Vec<AlertRecord> = records
        .into_iter()
        .filter(|record| match blocklist.matching_pattern(&record.event) {
            Some(pattern) => {
                log::debug!(
                    "Dropping {} for {} (blocked by '{}')",
                    record.event,
                    record.county_code,
                    pattern
                );
                false
            }
            None => true,
        })
        .collect();

    if kept.len() < total {
        log::info!("Blocklist removed {} of {} records", total - kept.len(), total);
    }

    Snapshot::from_records(kept)
}

/// Translate a shell glob into an anchored regular expression.
///
/// An unterminated `[` is taken literally.
fn glob_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^(?s:");
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.push_str(&translate_class(&chars[i..end]));
                    i = end + 1;
                }
                None => out.push_str(r"\["),
            },
            _ => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            }
        }
    }

    out.push_str(")$");
    out
}

/// Index of the `]` closing a class whose body starts at `start`.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    // A leading `]` is part of the class.
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() && chars[j] != ']' {
        j += 1;
    }
    (j < chars.len()).then_some(j)
}

fn translate_class(body: &[char]) -> String {
    let mut class = String::from("[");
    let mut rest = body;

    match rest.first() {
        Some('!') => {
            class.push('^');
            rest = &rest[1..];
        }
        Some('^') => {
            class.push_str(r"\^");
            rest = &rest[1..];
        }
        _ => {}
    }

    for &ch in rest {
        if matches!(ch, '\\' | '[' | '&' | '~') {
            class.push('\\');
        }
        class.push(ch);
    }

    class.push(']');
    class
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EndTime, Severity};

    fn blocklist(patterns: &[&str]) -> Blocklist {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        Blocklist::new(&patterns).unwrap()
    }

    fn record(county: &str, event: &str, severity: Severity) -> AlertRecord {
        AlertRecord {
            county_code: county.to_string(),
            severity,
            description: String::new(),
            end_time_utc: EndTime::Invalid,
            event: event.to_string(),
            headline: None,
            instruction: None,
        }
    }

    #[test]
    fn test_star_matches_any_run() {
        let list = blocklist(&["*Statement"]);
        assert!(list.is_blocked("Special Weather Statement"));
        assert!(list.is_blocked("Statement"));
        assert!(!list.is_blocked("Statement of Fact"));
    }

    #[test]
    fn test_question_mark_matches_one_char() {
        let list = blocklist(&["Test?"]);
        assert!(list.is_blocked("Test1"));
        assert!(!list.is_blocked("Test"));
        assert!(!list.is_blocked("Test12"));
    }

    #[test]
    fn test_exact_pattern_is_anchored_and_case_sensitive() {
        let list = blocklist(&["Flood Watch"]);
        assert!(list.is_blocked("Flood Watch"));
        assert!(!list.is_blocked("Flash Flood Watch"));
        assert!(!list.is_blocked("flood watch"));
    }

    #[test]
    fn test_character_classes() {
        let list = blocklist(&["Heat [AW]*"]);
        assert!(list.is_blocked("Heat Advisory"));
        assert!(list.is_blocked("Heat Warning"));
        assert!(!list.is_blocked("Heat Emergency"));

        let negated = blocklist(&["[!T]*Warning"]);
        assert!(negated.is_blocked("Flood Warning"));
        assert!(!negated.is_blocked("Tornado Warning"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let list = blocklist(&["Air Quality (PM2.5)"]);
        assert!(list.is_blocked("Air Quality (PM2.5)"));
        assert!(!list.is_blocked("Air Quality (PM2x5)"));
    }

    #[test]
    fn test_unterminated_bracket_is_literal() {
        let list = blocklist(&["[Test"]);
        assert!(list.is_blocked("[Test"));
        assert!(!list.is_blocked("Test"));
    }

    #[test]
    fn test_invalid_range_is_reported() {
        let err = Blocklist::new(&["[z-a]*".to_string()]).unwrap_err();
        assert!(matches!(err, AppError::Pattern { ref pattern, .. } if pattern == "[z-a]*"));
    }

    #[test]
    fn test_blocked_type_removed_at_every_severity() {
        let records = vec![
            record("A", "Tornado Warning", Severity::Extreme),
            record("A", "Special Weather Statement", Severity::Extreme),
            record("B", "Special Weather Statement", Severity::Minor),
            record("B", "Flood Watch", Severity::Severe),
        ];

        let snapshot = filter_and_sort(records, &blocklist(&["*Statement"]));
        let types: Vec<_> = snapshot.alert_types().collect();
        assert_eq!(types, vec!["Tornado Warning", "Flood Watch"]);
    }

    #[test]
    fn test_empty_blocklist_keeps_everything() {
        let records = vec![
            record("A", "Wind Advisory", Severity::Moderate),
            record("B", "Tornado Warning", Severity::Extreme),
        ];

        let snapshot = filter_and_sort(records, &Blocklist::empty());
        let types: Vec<_> = snapshot.alert_types().collect();
        assert_eq!(types, vec!["Tornado Warning", "Wind Advisory"]);
    }
}
