//! Error fingerprinting.
//!
//! A fingerprint turns a raw validator log into a stable [`Signature`] that is
//! equal for the same underlying failure regardless of volatile details such as
//! line numbers, timestamps, durations or temporary directories.
//!
//! The signature text has the form `<category>:<16 hex chars>` where the hash is
//! SHA-256 over the category and the normalised log. Including the category in
//! the hash keeps unrelated failures with similar wording apart.

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Category used when no known error class is found in a log.
pub const UNKNOWN_CATEGORY: &str = "unknown";

const SUMMARY_MAX_CHARS: usize = 200;

/// Normalised error signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    fn from_parts(category: &str, normalized: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(category.as_bytes());
        hasher.update(b"\n");
        hasher.update(normalized.as_bytes());
        let digest = hex::encode(hasher.finalize());
        Signature(format!("{}:{}", category, &digest[..16]))
    }

    /// Error category prefix of the signature.
    pub fn category(&self) -> &str {
        self.0
            .rsplit_once(':')
            .map(|(category, _)| category)
            .unwrap_or(UNKNOWN_CATEGORY)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Signature {
    fn from(value: String) -> Self {
        Signature(value)
    }
}

struct Patterns {
    ansi: Regex,
    iso_timestamp: Regex,
    clock: Regex,
    path: Regex,
    location: Regex,
    duration: Regex,
    hex_address: Regex,
    line_ref: Regex,
    long_number: Regex,
    placeholder: Regex,
    specific: Vec<(Regex, Option<&'static str>)>,
    timeout: Regex,
    jest: Regex,
    build: Regex,
    summary: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("fingerprint pattern must compile");
        Patterns {
            ansi: re(r"\x1b\[[0-9;?]*[ -/]*[@-~]"),
            iso_timestamp: re(
                r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?",
            ),
            clock: re(r"\b\d{1,2}:\d{2}:\d{2}(?:\.\d+)?\b"),
            path: re(r"(?:[A-Za-z]:)?(?:[\w.@~-]*[/\\])+[\w.@-]+"),
            location: re(r":\d+(?::\d+)?\b"),
            duration: re(r"(?i)\b\d+(?:\.\d+)?\s?(?:ms|s|sec|secs|seconds|m|min)\b"),
            hex_address: re(r"\b0x[0-9a-fA-F]+\b"),
            line_ref: re(r"(?i)\bline\s+\d+"),
            long_number: re(r"\b\d{3,}\b"),
            placeholder: re(r"<(?:ts|path|loc|dur|addr|n|num)>"),
            specific: vec![
                (re(r"\bTypeError\b"), Some("TypeError")),
                (re(r"\bSyntaxError\b"), Some("SyntaxError")),
                (re(r"\bReferenceError\b"), Some("ReferenceError")),
                (
                    re(r"(?i)cannot find module|module not found"),
                    Some("ModuleNotFound"),
                ),
                // TypeScript diagnostics keep their code as the category.
                (re(r"\bTS\d{3,5}\b"), None),
            ],
            timeout: re(r"(?i)\btimed?\s?out\b|\btimeout\b"),
            jest: re(r"●"),
            build: re(r"\bError:"),
            summary: re(r"(?i)error|failed|cannot|●|timeout|timed out|exception"),
        }
    })
}

/// Stateless fingerprinting functions.
pub struct Fingerprint;

impl Fingerprint {
    /// Compute the signature of a log.
    pub fn compute(log: &str) -> Signature {
        let category = Self::category(log);
        let normalized = Self::normalize(log);
        Signature::from_parts(&category, &normalized)
    }

    /// Extract the error category token.
    pub fn category(log: &str) -> String {
        let p = patterns();
        let stripped = p.ansi.replace_all(log, "");

        let earliest = p
            .specific
            .iter()
            .filter_map(|(re, label)| re.find(&stripped).map(|m| (m, label)))
            .min_by_key(|(m, _)| m.start());

        if let Some((m, label)) = earliest {
            return match label {
                Some(label) => (*label).to_string(),
                None => m.as_str().to_string(),
            };
        }
        if p.timeout.is_match(&stripped) {
            return "timeout".to_string();
        }
        if p.jest.is_match(&stripped) {
            return "jest".to_string();
        }
        if p.build.is_match(&stripped) {
            return "build".to_string();
        }
        UNKNOWN_CATEGORY.to_string()
    }

    /// Normalise a log by replacing volatile details with placeholders.
    pub fn normalize(log: &str) -> String {
        let p = patterns();
        let text = p.ansi.replace_all(log, "");
        let text = p.iso_timestamp.replace_all(&text, "<ts>");
        let text = p.clock.replace_all(&text, "<ts>");
        let text = p.path.replace_all(&text, |caps: &regex::Captures| {
            let candidate = &caps[0];
            if is_filesystem_path(candidate) {
                "<path>".to_string()
            } else {
                candidate.to_string()
            }
        });
        let text = p.location.replace_all(&text, ":<loc>");
        let text = p.duration.replace_all(&text, "<dur>");
        let text = p.hex_address.replace_all(&text, "<addr>");
        let text = p.line_ref.replace_all(&text, "line <n>");
        let text = p.long_number.replace_all(&text, "<num>");

        text.to_lowercase()
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !is_placeholder_only(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Token set of the normalised log, used for similarity scoring.
    pub fn tokens(log: &str) -> HashSet<String> {
        Self::normalize(log)
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| t.len() > 1)
            .map(str::to_string)
            .collect()
    }

    /// First meaningful error line of a log.
    pub fn summary(log: &str) -> Option<String> {
        let p = patterns();
        let stripped = p.ansi.replace_all(log, "");
        let mut lines = stripped.lines().map(str::trim).filter(|l| !l.is_empty());

        let first_error = stripped
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && p.summary.is_match(l));

        first_error.or_else(|| lines.next()).map(truncate)
    }
}

/// Compute the signature of a log.
pub fn fingerprint(log: &str) -> Signature {
    Fingerprint::compute(log)
}

/// Bare module specifiers (`next/link`, `@/lib/api`) name the failure and are
/// kept; absolute, relative and file-like paths are volatile.
fn is_filesystem_path(candidate: &str) -> bool {
    let absolute = candidate.starts_with(&['/', '\\', '~'][..])
        || candidate.as_bytes().get(1) == Some(&b':');
    let relative = candidate.starts_with("./")
        || candidate.starts_with("../")
        || candidate.starts_with(".\\")
        || candidate.starts_with("..\\");
    let has_extension = candidate
        .rsplit(&['/', '\\'][..])
        .next()
        .map_or(false, |name| name.contains('.'));
    absolute || relative || has_extension
}

fn is_placeholder_only(line: &str) -> bool {
    let without = patterns().placeholder.replace_all(line, "");
    !without.chars().any(|c| c.is_alphanumeric())
}

fn truncate(line: &str) -> String {
    if line.chars().count() <= SUMMARY_MAX_CHARS {
        line.to_string()
    } else {
        let cut: String = line.chars().take(SUMMARY_MAX_CHARS).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_ignores_line_numbers_and_temp_paths() {
        let a = "TypeError: Cannot read properties of undefined (reading 'map')\n    \
                 at Hero (/tmp/build-4821/src/components/Hero.tsx:12:5)";
        let b = "TypeError: Cannot read properties of undefined (reading 'map')\n    \
                 at Hero (/var/folders/xy/T/build-99/src/components/Hero.tsx:40:17)";
        assert_eq!(fingerprint(a), fingerprint(b));
    }

    #[test]
    fn test_signature_ignores_timestamps_and_durations() {
        let a = "[2024-05-01T10:11:12Z] Error: build failed after 1532ms";
        let b = "[2025-01-09T23:59:01.123Z] Error: build failed after 87ms";
        assert_eq!(fingerprint(a), fingerprint(b));
    }

    #[test]
    fn test_different_categories_differ() {
        let a = fingerprint("TypeError: Unexpected token '<'");
        let b = fingerprint("SyntaxError: Unexpected token '<'");
        assert_ne!(a, b);
        assert_eq!(a.category(), "TypeError");
        assert_eq!(b.category(), "SyntaxError");
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            Fingerprint::category("Error: Cannot find module 'react'"),
            "ModuleNotFound"
        );
        assert_eq!(
            Fingerprint::category("page.tsx(3,10): error TS2307: Cannot find module '@/x'"),
            "TS2307"
        );
        assert_eq!(
            Fingerprint::category("error TS2322: Type 'string' is not assignable"),
            "TS2322"
        );
        assert_eq!(Fingerprint::category("● Hero › renders title"), "jest");
        assert_eq!(
            Fingerprint::category("Exceeded timeout of 5000 ms for a test"),
            "timeout"
        );
        assert_eq!(Fingerprint::category("Error: something broke"), "build");
        assert_eq!(Fingerprint::category("all good"), UNKNOWN_CATEGORY);
    }

    #[test]
    fn test_ansi_codes_are_ignored() {
        let plain = "TypeError: x is not a function";
        let coloured = "\x1b[31mTypeError\x1b[0m: x is not a function";
        assert_eq!(fingerprint(plain), fingerprint(coloured));
    }

    #[test]
    fn test_signature_format() {
        let sig = fingerprint("ReferenceError: window is not defined");
        let (category, hash) = sig.as_str().split_once(':').unwrap();
        assert_eq!(category, "ReferenceError");
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_summary_picks_first_error_line() {
        let log = "\n> next build\n\nFailed to compile.\n./src/Hero.tsx\nType error: oops";
        assert_eq!(Fingerprint::summary(log).as_deref(), Some("Failed to compile."));
        assert_eq!(Fingerprint::summary("just output").as_deref(), Some("just output"));
        assert_eq!(Fingerprint::summary("  \n "), None);
    }

    #[test]
    fn test_missing_modules_keep_their_specifier() {
        let react_dom = fingerprint("Error: Cannot find module 'react-dom/client'");
        let next_link = fingerprint("Error: Cannot find module 'next/link'");
        assert_ne!(react_dom, next_link);

        let hero = fingerprint("Module not found: Can't resolve '@/components/Hero'");
        let api = fingerprint("Module not found: Can't resolve '@/lib/api'");
        assert_ne!(hero, api);
    }

    #[test]
    fn test_file_paths_are_still_masked() {
        let a = "Module not found: Can't resolve './Hero' in '/tmp/run-1/src/app'";
        let b = "Module not found: Can't resolve './Hero' in '/home/ci/run-2/src/app'";
        assert_eq!(fingerprint(a), fingerprint(b));

        let normalized = Fingerprint::normalize("at src/components/Hero.tsx:4:2 via next/link");
        assert!(normalized.contains("<path>"));
        assert!(normalized.contains("next/link"));
    }

    #[test]
    fn test_tokens_drop_volatile_details() {
        let tokens = Fingerprint::tokens("TypeError at /tmp/abc/Hero.tsx:10:2");
        assert!(tokens.contains("typeerror"));
        assert!(tokens.contains("path"));
        assert!(!tokens.contains("10"));
    }
}
