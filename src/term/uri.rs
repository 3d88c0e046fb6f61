//! URI (IRI) representation

use std::fmt;

use crate::error::{ErrorCode, RdfError, RdfResult};

/// An absolute IRI reference
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uri {
    value: String,
}

impl Uri {
    /// Create a new URI without validation
    pub fn new(value: String) -> Self {
        Uri { value }
    }

    /// Create a URI, checking that it is absolute and free of characters
    /// IRIs cannot contain
    pub fn parse(value: impl Into<String>) -> RdfResult<Self> {
        let value = value.into();
        let scheme_ok = value
            .split_once(':')
            .map(|(scheme, _)| {
                let mut chars = scheme.chars();
                chars.next().map_or(false, |c| c.is_ascii_alphabetic())
                    && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
            })
            .unwrap_or(false);
        if !scheme_ok {
            return Err(RdfError::new(
                ErrorCode::InvalidIri,
                format!("IRI is not absolute: {}", value),
            ));
        }
        if let Some(bad) = value
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\'))
        {
            return Err(RdfError::new(
                ErrorCode::InvalidIri,
                format!("IRI contains illegal character {:?}: {}", bad, value),
            ));
        }
        Ok(Uri { value })
    }

    /// Get the URI as a string slice
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Resolve a reference against this IRI used as a base
    pub fn resolve(&self, relative: &str) -> Uri {
        if let Ok(absolute) = Uri::parse(relative) {
            return absolute;
        }

        if relative.is_empty() {
            return self.clone();
        }

        if relative.starts_with('#') {
            let base = match self.value.find('#') {
                Some(pos) => &self.value[..pos],
                None => &self.value,
            };
            return Uri::new(format!("{}{}", base, relative));
        }

        if relative.starts_with('/') {
            if let Some(scheme_end) = self.value.find("://") {
                let authority_start = scheme_end + 3;
                let authority_end = self.value[authority_start..]
                    .find('/')
                    .map(|p| authority_start + p)
                    .unwrap_or(self.value.len());
                return Uri::new(format!("{}{}", &self.value[..authority_end], relative));
            }
        }

        let base = match self.value.rfind('/') {
            Some(pos) => &self.value[..=pos],
            None => &self.value,
        };
        Uri::new(format!("{}{}", base, relative))
    }
}

impl fmt::Debug for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.value)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.value)
    }
}

impl From<&str> for Uri {
    fn from(s: &str) -> Self {
        Uri::new(s.to_string())
    }
}

impl From<String> for Uri {
    fn from(s: String) -> Self {
        Uri::new(s)
    }
}
