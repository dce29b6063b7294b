//! Socket and view naming rules.
//!
//! Names are split into words, then re-joined in camel case so that
//! `main-nav`, `main_nav` and `mainNav` all address the same socket.

use http::StatusCode;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SocketError;

lazy_static! {
    static ref SOCKET_NAME_RE: Regex = Regex::new(r"^[A-Za-z_-][0-9A-Za-z_-]*$").unwrap();
}

/// `foo_barBaz` -> `["foo", "bar", "Baz"]`
///
/// Splits on runs of non-alphanumeric characters and before every uppercase
/// letter, so camel-case output splits back into the words it was built from.
pub fn split_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();

    for c in input.chars() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_ascii_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// `uppEr` -> `Upper`
pub fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

pub fn camel_case<S: AsRef<str>>(words: &[S]) -> String {
    words
        .iter()
        .enumerate()
        .map(|(i, w)| {
            if i == 0 {
                w.as_ref().to_lowercase()
            } else {
                upper_first(w.as_ref())
            }
        })
        .collect()
}

/// Canonical identifier form of a socket name.
pub fn normalize(name: &str) -> String {
    camel_case(&split_words(name))
}

/// Validates a raw `af-sock` value.
///
/// Blank values mean "no socket" and yield `Ok(None)`. `namespace` is the full
/// ancestor namespace, used only for the error message.
pub fn validate_name(raw: &str, namespace: &str) -> Result<Option<String>, SocketError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let invalid = || SocketError::InvalidSocketName {
        name: trimmed.to_string(),
        namespace: namespace.to_string(),
    };

    if !SOCKET_NAME_RE.is_match(trimmed) {
        return Err(invalid());
    }

    let normalized = normalize(trimmed);
    if normalized.is_empty() {
        return Err(invalid());
    }
    Ok(Some(normalized))
}

// ═══════════════════════════════════════════════════════════════════════════════
// VIEW NAMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Identifiers derived from a document name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewNames {
    /// `NotFoundView`
    pub view_name: String,
    /// `notFoundSock`
    pub sock_name: String,
    /// `notFound`, the root socket namespace.
    pub sock_namespace: String,
    /// `not-found`
    pub name: String,
}

impl ViewNames {
    pub fn new(document_name: &str) -> Self {
        let source = status_reason(document_name).unwrap_or(document_name);
        let words = split_words(source);

        let mut view_words = words.clone();
        view_words.push("view".to_string());
        let mut sock_words = words.clone();
        sock_words.push("sock".to_string());

        Self {
            view_name: view_words.iter().map(|w| upper_first(w)).collect(),
            sock_name: camel_case(&sock_words),
            sock_namespace: camel_case(&words),
            name: words
                .iter()
                .map(|w| w.to_lowercase())
                .collect::<Vec<_>>()
                .join("-"),
        }
    }
}

/// Error pages are usually exported as `404.html`; name them after the reason.
fn status_reason(name: &str) -> Option<&'static str> {
    let code: u16 = name.trim().parse().ok()?;
    StatusCode::from_u16(code).ok()?.canonical_reason()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words() {
        assert_eq!(split_words("foo_barBaz"), vec!["foo", "bar", "Baz"]);
        assert_eq!(split_words("main-nav"), vec!["main", "nav"]);
        assert_eq!(split_words("item2Label"), vec!["item2", "Label"]);
        assert_eq!(split_words("navBar2"), vec!["nav", "Bar2"]);
        assert_eq!(split_words("aBC"), vec!["a", "B", "C"]);
        assert!(split_words("--").is_empty());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("main-nav"), "mainNav");
        assert_eq!(normalize("Main_Nav"), "mainNav");
        assert_eq!(normalize("Main_NAV"), "mainNAV");
        assert_eq!(normalize("mainNav"), "mainNav");
        assert_eq!(normalize("_submit"), "submit");
        assert_eq!(normalize("fooBarBaz"), "fooBarBaz");
    }

    #[test]
    fn test_single_letter_words_normalize_stably() {
        for raw in ["a-b-c", "x_y_z", "nav-a-b"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "{}", raw);
        }
        assert_eq!(normalize("a-b-c"), "aBC");
        assert_eq!(normalize("nav-a-b"), "navAB");
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  ", "home").unwrap(), None);
        assert_eq!(
            validate_name(" hero-title ", "home").unwrap(),
            Some("heroTitle".to_string())
        );

        let err = validate_name("9lives", "home.hero").unwrap_err();
        assert_eq!(
            err,
            SocketError::InvalidSocketName {
                name: "9lives".to_string(),
                namespace: "home.hero".to_string(),
            }
        );
        assert!(validate_name("a.b", "home").is_err());
        assert!(validate_name("-", "home").is_err());
    }

    #[test]
    fn test_view_names() {
        let names = ViewNames::new("about-us");
        assert_eq!(names.view_name, "AboutUsView");
        assert_eq!(names.sock_name, "aboutUsSock");
        assert_eq!(names.sock_namespace, "aboutUs");
        assert_eq!(names.name, "about-us");
    }

    #[test]
    fn test_view_names_from_status_code() {
        let names = ViewNames::new("404");
        assert_eq!(names.view_name, "NotFoundView");
        assert_eq!(names.sock_namespace, "notFound");
        assert_eq!(names.name, "not-found");
    }
}
