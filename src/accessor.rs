//! Accessor-style overrides.
//!
//! Used where overrides arrive as a flat list of named children instead of
//! nested compose boundaries. The caller pulls each socket by name with a
//! cardinality contract; anything declared but never pulled is reported under
//! the configured unused-override policy once the scope closes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::config::EngineConfig;
use crate::error::{Diagnostic, SocketError};
use crate::render::report_unused;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cardinality {
    /// Exactly one (no suffix).
    #[default]
    #[serde(rename = "")]
    One,
    #[serde(rename = "?")]
    Optional,
    #[serde(rename = "!")]
    Required,
    #[serde(rename = "+")]
    AtLeastOne,
    #[serde(rename = "*")]
    Any,
}

impl Cardinality {
    pub fn min(self) -> usize {
        match self {
            Cardinality::Optional | Cardinality::Any => 0,
            Cardinality::One | Cardinality::Required | Cardinality::AtLeastOne => 1,
        }
    }

    pub fn max(self) -> Option<usize> {
        match self {
            Cardinality::One | Cardinality::Optional | Cardinality::Required => Some(1),
            Cardinality::AtLeastOne | Cardinality::Any => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Cardinality::One => "",
            Cardinality::Optional => "?",
            Cardinality::Required => "!",
            Cardinality::AtLeastOne => "+",
            Cardinality::Any => "*",
        }
    }

    fn check(self, namespace: &str, socket: &str, count: usize) -> Result<(), SocketError> {
        if count < self.min() {
            return Err(SocketError::MissingRequiredOverride {
                namespace: namespace.to_string(),
                socket: socket.to_string(),
                cardinality: self,
            });
        }
        if self.max().is_some_and(|max| count > max) {
            return Err(SocketError::TooManyOverrides {
                namespace: namespace.to_string(),
                socket: socket.to_string(),
                cardinality: self,
                count,
            });
        }
        Ok(())
    }
}

impl FromStr for Cardinality {
    type Err = SocketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Cardinality::One),
            "?" => Ok(Cardinality::Optional),
            "!" => Ok(Cardinality::Required),
            "+" => Ok(Cardinality::AtLeastOne),
            "*" => Ok(Cardinality::Any),
            other => Err(SocketError::Config(format!("unknown cardinality \"{}\"", other))),
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cardinality::One => "exactly one",
            Cardinality::Optional => "optional",
            Cardinality::Required => "required",
            Cardinality::AtLeastOne => "at least one",
            Cardinality::Any => "any count",
        };
        f.write_str(name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPE
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Accessor<T> {
    namespace: String,
    children: IndexMap<String, Vec<T>>,
    pulled: HashSet<String>,
}

impl<T> Accessor<T> {
    fn new(namespace: &str, children: impl IntoIterator<Item = (String, T)>) -> Self {
        let mut grouped: IndexMap<String, Vec<T>> = IndexMap::new();
        for (name, child) in children {
            grouped.entry(name).or_default().push(child);
        }
        Self {
            namespace: namespace.to_string(),
            children: grouped,
            pulled: HashSet::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn count(&self, name: &str) -> usize {
        self.children.get(name).map_or(0, Vec::len)
    }

    /// Renders every child declared under `name`, after checking the count
    /// against `cardinality`.
    pub fn pull<U, F>(&mut self, name: &str, render: F, cardinality: Cardinality) -> Result<Vec<U>, SocketError>
    where
        F: FnMut(&T) -> U,
    {
        let mut render = render;
        self.try_pull(name, |child| Ok(render(child)), cardinality)
    }

    /// `pull` with a fallible render function.
    pub fn try_pull<U, F>(&mut self, name: &str, mut render: F, cardinality: Cardinality) -> Result<Vec<U>, SocketError>
    where
        F: FnMut(&T) -> Result<U, SocketError>,
    {
        self.pulled.insert(name.to_string());
        let children = self.children.get(name).map(Vec::as_slice).unwrap_or_default();
        cardinality.check(&self.namespace, name, children.len())?;
        children.iter().map(&mut render).collect()
    }

    fn unpulled(&self) -> Vec<&str> {
        self.children
            .keys()
            .filter(|name| !self.pulled.contains(name.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Groups `children` by name (duplicates append, first-seen order) and runs
/// `f` with an accessor over them.
pub fn create_scope<T, R, F>(
    config: &EngineConfig,
    namespace: &str,
    children: impl IntoIterator<Item = (String, T)>,
    f: F,
) -> Result<(R, Vec<Diagnostic>), SocketError>
where
    F: FnOnce(&mut Accessor<T>) -> Result<R, SocketError>,
{
    let mut accessor = Accessor::new(namespace, children);
    let result = f(&mut accessor)?;

    let mut diagnostics = Vec::new();
    report_unused(config, namespace, accessor.unpulled(), &mut diagnostics)?;
    Ok((result, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn children(names: &[&str]) -> Vec<(String, String)> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.to_string(), format!("{}{}", n, i)))
            .collect()
    }

    #[test]
    fn test_required_with_no_match() {
        let err = create_scope(&EngineConfig::default(), "menu", children(&[]), |a| {
            a.pull("x", |c: &String| c.clone(), Cardinality::Required)
        })
        .unwrap_err();
        assert_eq!(
            err,
            SocketError::MissingRequiredOverride {
                namespace: "menu".to_string(),
                socket: "x".to_string(),
                cardinality: Cardinality::Required,
            }
        );
    }

    #[test]
    fn test_exactly_one_with_two_matches() {
        let err = create_scope(&EngineConfig::default(), "menu", children(&["x", "x"]), |a| {
            a.pull("x", |c| c.clone(), Cardinality::One)
        })
        .unwrap_err();
        assert_eq!(err.code(), crate::error::ERR_TOO_MANY_OVERRIDES);
        assert_eq!(
            err.to_string(),
            "menu: socket \"x\" (exactly one) got 2 overrides"
        );
    }

    #[test]
    fn test_any_with_no_match_is_empty() {
        let (items, diagnostics) = create_scope(&EngineConfig::default(), "menu", children(&[]), |a| {
            a.pull("x", |c| c.clone(), Cardinality::Any)
        })
        .unwrap();
        assert!(items.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_duplicates_append_in_order() {
        let (items, _) = create_scope(
            &EngineConfig::default(),
            "menu",
            children(&["item", "title", "item"]),
            |a| {
                let title = a.pull("title", |c| c.clone(), Cardinality::Optional)?;
                assert_eq!(title, vec!["title1"]);
                a.pull("item", |c| c.to_uppercase(), Cardinality::AtLeastOne)
            },
        )
        .unwrap();
        assert_eq!(items, vec!["ITEM0", "ITEM2"]);
    }

    #[test]
    fn test_unpulled_child_follows_policy() {
        let (_, diagnostics) = create_scope(&EngineConfig::default(), "menu", children(&["x", "y"]), |a| {
            a.pull("x", |c| c.clone(), Cardinality::One)
        })
        .unwrap();
        assert_eq!(diagnostics, vec![Diagnostic::unused_override("menu", "y")]);

        let err = create_scope(&EngineConfig::strict(), "menu", children(&["x", "y"]), |a| {
            a.pull("x", |c| c.clone(), Cardinality::One)
        })
        .unwrap_err();
        assert_eq!(
            err,
            SocketError::UnrecognizedOverride {
                namespace: "menu".to_string(),
                socket: "y".to_string(),
            }
        );
    }

    #[test]
    fn test_cardinality_parsing() {
        assert_eq!("".parse::<Cardinality>().unwrap(), Cardinality::One);
        assert_eq!("+".parse::<Cardinality>().unwrap(), Cardinality::AtLeastOne);
        assert!("2".parse::<Cardinality>().is_err());
        assert_eq!(
            serde_json::to_string(&Cardinality::Optional).unwrap(),
            "\"?\""
        );
    }

    #[test]
    fn test_optional_and_required_reject_two() {
        for cardinality in [Cardinality::Optional, Cardinality::Required] {
            let err = create_scope(&EngineConfig::default(), "menu", children(&["x", "x"]), |a| {
                a.pull("x", |c| c.clone(), cardinality)
            })
            .unwrap_err();
            assert_eq!(
                err,
                SocketError::TooManyOverrides {
                    namespace: "menu".to_string(),
                    socket: "x".to_string(),
                    cardinality,
                    count: 2,
                }
            );
        }

        let (items, _) = create_scope(&EngineConfig::default(), "menu", children(&["x"]), |a| {
            a.pull("x", |c| c.clone(), Cardinality::Optional)
        })
        .unwrap();
        assert_eq!(items, vec!["x0"]);
    }

    #[test]
    fn test_at_least_one_rejects_zero() {
        let err = create_scope(&EngineConfig::default(), "menu", children(&[]), |a| {
            a.pull("x", |c: &String| c.clone(), Cardinality::AtLeastOne)
        })
        .unwrap_err();
        assert_eq!(err.code(), crate::error::ERR_MISSING_REQUIRED_OVERRIDE);
    }
}
