//! Filter - Selection rules shared by data sources
//!
//! A data source looks an object up either by id or by name. Name lookups
//! list the collection and keep the entries that match; exactly one
//! survivor is expected.

use crate::provider::ProviderError;
use crate::resource::{Attributes, Value};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("{id_attr} and {name_attr} cannot be both specified at the same time")]
    BothSpecified { id_attr: String, name_attr: String },

    #[error("please provide either the {id_attr} or the {name_attr}")]
    NeitherSpecified { id_attr: String, name_attr: String },

    #[error("'{attr}' must be a string")]
    NotAString { attr: String },

    #[error("no {kind} found with the specified criteria: {criteria}")]
    NoMatch { kind: String, criteria: String },

    #[error("more than one {kind} found with the specified criteria: {criteria} ({count} matches)")]
    Ambiguous {
        kind: String,
        criteria: String,
        count: usize,
    },
}

impl From<FilterError> for ProviderError {
    fn from(err: FilterError) -> Self {
        ProviderError::new(err.to_string()).with_cause(err)
    }
}

/// Name comparison used by name lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameMatch {
    pub name: String,
    /// Substring instead of whole-name comparison
    pub partial: bool,
}

impl NameMatch {
    pub fn exact(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partial: false,
        }
    }

    pub fn partial(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partial: true,
        }
    }

    /// Case-insensitive comparison
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = candidate.to_lowercase();
        let wanted = self.name.to_lowercase();
        if self.partial {
            candidate.contains(&wanted)
        } else {
            candidate == wanted
        }
    }
}

impl std::fmt::Display for NameMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.partial {
            write!(f, "name contains '{}'", self.name)
        } else {
            write!(f, "name '{}'", self.name)
        }
    }
}

/// How a data source query identifies its object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    ById(String),
    ByName(NameMatch),
}

impl Lookup {
    /// Decide between id and name lookup from the query attributes.
    ///
    /// `partial_match` is honoured only when the query sets it to `true`.
    pub fn from_query(
        attributes: &Attributes,
        id_attr: &str,
        name_attr: &str,
    ) -> Result<Self, FilterError> {
        let id = string_attr(attributes, id_attr)?;
        let name = string_attr(attributes, name_attr)?;
        let partial = matches!(attributes.get("partial_match"), Some(Value::Bool(true)));

        match (id, name) {
            (Some(_), Some(_)) => Err(FilterError::BothSpecified {
                id_attr: id_attr.to_string(),
                name_attr: name_attr.to_string(),
            }),
            (Some(id), None) => Ok(Lookup::ById(id.to_string())),
            (None, Some(name)) => Ok(Lookup::ByName(NameMatch {
                name: name.to_string(),
                partial,
            })),
            (None, None) => Err(FilterError::NeitherSpecified {
                id_attr: id_attr.to_string(),
                name_attr: name_attr.to_string(),
            }),
        }
    }
}

fn string_attr<'a>(attributes: &'a Attributes, attr: &str) -> Result<Option<&'a str>, FilterError> {
    match attributes.get(attr) {
        None => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(FilterError::NotAString {
            attr: attr.to_string(),
        }),
    }
}

/// Keep the items accepted by `predicate`.
pub fn filter_items<T, P>(items: Vec<T>, predicate: P) -> Vec<T>
where
    P: Fn(&T) -> bool,
{
    items.into_iter().filter(|item| predicate(item)).collect()
}

/// Return the single item accepted by `predicate`.
///
/// `kind` and `criteria` only feed the error message.
pub fn select_one<T, P>(
    items: Vec<T>,
    kind: &str,
    criteria: &str,
    predicate: P,
) -> Result<T, FilterError>
where
    P: Fn(&T) -> bool,
{
    let mut matches = filter_items(items, predicate);
    match matches.len() {
        0 => Err(FilterError::NoMatch {
            kind: kind.to_string(),
            criteria: criteria.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        count => Err(FilterError::Ambiguous {
            kind: kind.to_string(),
            criteria: criteria.to_string(),
            count,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn id_and_name_are_mutually_exclusive() {
        let attrs = query(&[("id", "abc".into()), ("name", "web".into())]);
        let err = Lookup::from_query(&attrs, "id", "name").unwrap_err();
        assert_eq!(
            err.to_string(),
            "id and name cannot be both specified at the same time"
        );
    }

    #[test]
    fn one_of_id_or_name_is_required() {
        let err = Lookup::from_query(&Attributes::new(), "id", "name").unwrap_err();
        assert!(matches!(err, FilterError::NeitherSpecified { .. }));
    }

    #[test]
    fn empty_strings_count_as_unset() {
        let attrs = query(&[("id", "".into()), ("name", "web".into())]);
        assert_eq!(
            Lookup::from_query(&attrs, "id", "name").unwrap(),
            Lookup::ByName(NameMatch::exact("web"))
        );
    }

    #[test]
    fn partial_match_flag_is_read() {
        let attrs = query(&[("name", "web".into()), ("partial_match", true.into())]);
        assert_eq!(
            Lookup::from_query(&attrs, "id", "name").unwrap(),
            Lookup::ByName(NameMatch::partial("web"))
        );
    }

    #[test]
    fn exact_match_ignores_case_only() {
        let m = NameMatch::exact("Web");
        assert!(m.matches("web"));
        assert!(!m.matches("web-1"));
    }

    #[test]
    fn partial_match_uses_substring() {
        let m = NameMatch::partial("web");
        assert!(m.matches("prod-WEB-1"));
        assert!(!m.matches("db"));
    }

    #[test]
    fn filtered_list_is_returned() {
        let names = vec!["backup-a", "other", "backup-b"];
        let kept = filter_items(names, |n| n.starts_with("backup"));
        assert_eq!(kept, vec!["backup-a", "backup-b"]);
    }

    #[test]
    fn select_one_requires_a_single_match() {
        let names = vec!["web-1", "web-2", "db"];
        let m = NameMatch::partial("web");

        let err = select_one(names.clone(), "server", &m.to_string(), |n| m.matches(n)).unwrap_err();
        assert!(matches!(err, FilterError::Ambiguous { count: 2, .. }));

        let err = select_one(names.clone(), "server", "name 'cache'", |n| *n == "cache").unwrap_err();
        assert_eq!(
            err.to_string(),
            "no server found with the specified criteria: name 'cache'"
        );

        assert_eq!(select_one(names, "server", "name 'db'", |n| *n == "db").unwrap(), "db");
    }

    #[test]
    fn filter_error_converts_into_provider_error() {
        let err: ProviderError = FilterError::NoMatch {
            kind: "dns zone".to_string(),
            criteria: "name 'example.com'".to_string(),
        }
        .into();

        assert_eq!(
            err.message,
            "no dns zone found with the specified criteria: name 'example.com'"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
