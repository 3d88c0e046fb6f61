//! Literal value representation

use std::fmt;

use crate::core::namespaces::{rdf, xsd};
use crate::error::{ErrorCode, RdfError, RdfResult};

/// Datatype for a literal
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Datatype {
    /// Simple literal (no datatype, no language)
    Plain,
    /// Language-tagged literal
    Language(String),
    /// Typed literal with datatype URI
    Typed(String),
}

/// An RDF literal value
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    value: String,
    datatype: Datatype,
}

impl Literal {
    /// Create a literal from its parts.
    ///
    /// A literal carries at most one of a language tag and a datatype;
    /// supplying both is a `MalformedTerm` error. Language tags are
    /// normalised to lower case.
    pub fn new(
        value: impl Into<String>,
        language: Option<&str>,
        datatype: Option<&str>,
    ) -> RdfResult<Self> {
        let value = value.into();
        match (language, datatype) {
            (Some(lang), Some(dt)) => Err(RdfError::new(
                ErrorCode::LanguageAndDatatype,
                format!("Literal \"{}\" has both language @{} and datatype <{}>", value, lang, dt),
            )),
            (Some(lang), None) => {
                validate_language(lang)?;
                Ok(Literal::with_language(value, lang.to_string()))
            }
            (None, Some(dt)) => Ok(Literal::typed(value, dt.to_string())),
            (None, None) => Ok(Literal::plain(value)),
        }
    }

    /// Create a simple literal
    pub fn plain(value: String) -> Self {
        Literal {
            value,
            datatype: Datatype::Plain,
        }
    }

    /// Create a typed literal
    pub fn typed(value: String, datatype: String) -> Self {
        Literal {
            value,
            datatype: Datatype::Typed(datatype),
        }
    }

    /// Create a language-tagged literal
    pub fn with_language(value: String, lang: String) -> Self {
        Literal {
            value,
            datatype: Datatype::Language(lang.to_lowercase()),
        }
    }

    /// Get the lexical value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Get the datatype
    pub fn datatype(&self) -> &Datatype {
        &self.datatype
    }

    /// Check if this is a simple literal
    pub fn is_plain(&self) -> bool {
        matches!(self.datatype, Datatype::Plain)
    }

    /// Get the language tag if present
    pub fn language(&self) -> Option<&str> {
        match &self.datatype {
            Datatype::Language(lang) => Some(lang),
            _ => None,
        }
    }

    /// Get the datatype URI if present
    pub fn datatype_uri(&self) -> Option<&str> {
        match &self.datatype {
            Datatype::Typed(uri) => Some(uri),
            _ => None,
        }
    }

    /// The datatype IRI as seen by `DATATYPE()`: simple literals are
    /// xsd:string, language-tagged ones rdf:langString
    pub fn effective_datatype(&self) -> &str {
        match &self.datatype {
            Datatype::Plain => xsd::STRING,
            Datatype::Language(_) => rdf::LANG_STRING,
            Datatype::Typed(uri) => uri,
        }
    }

    /// Simple literal or xsd:string, the string-valued literals of SPARQL
    pub fn is_string(&self) -> bool {
        match &self.datatype {
            Datatype::Plain => true,
            Datatype::Typed(dt) => dt == xsd::STRING,
            Datatype::Language(_) => false,
        }
    }

    /// Whether the datatype is numeric (the lexical form may still be invalid)
    pub fn is_numeric(&self) -> bool {
        self.datatype_uri().map_or(false, xsd::is_numeric_type)
    }

    /// Integer value of an integer-typed literal
    pub fn as_integer(&self) -> Option<i64> {
        match self.datatype_uri() {
            Some(dt) if xsd::is_integer_type(dt) => self.value.trim().parse().ok(),
            _ => None,
        }
    }

    /// Numeric value of a numeric-typed literal
    pub fn as_double(&self) -> Option<f64> {
        if !self.is_numeric() {
            return None;
        }
        match self.value.trim() {
            "INF" | "+INF" => Some(f64::INFINITY),
            "-INF" => Some(f64::NEG_INFINITY),
            "NaN" => Some(f64::NAN),
            other => other.parse().ok(),
        }
    }

    /// Boolean value of an xsd:boolean literal
    pub fn as_boolean(&self) -> Option<bool> {
        if self.datatype_uri() != Some(xsd::BOOLEAN) {
            return None;
        }
        match self.value.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

/// Check the shape of a language tag: `alpha{1,8}(-alphanum{1,8})*`
fn validate_language(tag: &str) -> RdfResult<()> {
    let mut parts = tag.split('-');
    let primary_ok = parts
        .next()
        .map_or(false, |p| (1..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphabetic()));
    let rest_ok = parts.all(|p| (1..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric()));
    if primary_ok && rest_ok {
        Ok(())
    } else {
        Err(RdfError::new(
            ErrorCode::InvalidLanguageTag,
            format!("Invalid language tag: {}", tag),
        ))
    }
}

fn write_literal(lit: &Literal, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "\"")?;
    for c in lit.value.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\r' => write!(f, "\\r")?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "\"")?;
    match &lit.datatype {
        Datatype::Plain => Ok(()),
        Datatype::Language(lang) => write!(f, "@{}", lang),
        Datatype::Typed(dt) => write!(f, "^^<{}>", dt),
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_literal(self, f)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_literal(self, f)
    }
}
