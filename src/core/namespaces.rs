//! Standard RDF namespace and datatype IRI constants
//!
//! Compile-time namespace IRIs used by the term model, the expression
//! evaluator and the default prefix map of new graphs.

/// Standard namespace URI constants
pub mod ns {
    /// RDF namespace
    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    /// RDF Schema namespace
    pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
    /// XML Schema Datatypes namespace
    pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
    /// OWL Web Ontology Language namespace
    pub const OWL: &str = "http://www.w3.org/2002/07/owl#";

    /// The prefixes every new graph knows about
    pub const DEFAULT_PREFIXES: [(&str, &str); 4] =
        [("rdf", RDF), ("rdfs", RDFS), ("xsd", XSD), ("owl", OWL)];
}

/// XML Schema datatype IRIs
pub mod xsd {
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
    pub const FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
    pub const DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
    pub const TIME: &str = "http://www.w3.org/2001/XMLSchema#time";
    pub const DAY_TIME_DURATION: &str = "http://www.w3.org/2001/XMLSchema#dayTimeDuration";
    pub const BASE64_BINARY: &str = "http://www.w3.org/2001/XMLSchema#base64Binary";
    pub const HEX_BINARY: &str = "http://www.w3.org/2001/XMLSchema#hexBinary";

    /// Integer-valued datatypes derived from xsd:integer
    pub const INTEGER_TYPES: [&str; 13] = [
        INTEGER,
        "http://www.w3.org/2001/XMLSchema#long",
        "http://www.w3.org/2001/XMLSchema#int",
        "http://www.w3.org/2001/XMLSchema#short",
        "http://www.w3.org/2001/XMLSchema#byte",
        "http://www.w3.org/2001/XMLSchema#nonNegativeInteger",
        "http://www.w3.org/2001/XMLSchema#nonPositiveInteger",
        "http://www.w3.org/2001/XMLSchema#positiveInteger",
        "http://www.w3.org/2001/XMLSchema#negativeInteger",
        "http://www.w3.org/2001/XMLSchema#unsignedLong",
        "http://www.w3.org/2001/XMLSchema#unsignedInt",
        "http://www.w3.org/2001/XMLSchema#unsignedShort",
        "http://www.w3.org/2001/XMLSchema#unsignedByte",
    ];

    /// Whether the datatype is integer-valued
    pub fn is_integer_type(datatype: &str) -> bool {
        INTEGER_TYPES.contains(&datatype)
    }

    /// Whether the datatype is one of the numeric types
    pub fn is_numeric_type(datatype: &str) -> bool {
        is_integer_type(datatype) || matches!(datatype, DECIMAL | FLOAT | DOUBLE)
    }

    /// Whether the datatype is a date/time type
    pub fn is_temporal_type(datatype: &str) -> bool {
        matches!(datatype, DATE_TIME | DATE | TIME)
    }
}

/// Frequently used RDF vocabulary terms
pub mod rdf {
    pub const LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
}

#[cfg(test)]
mod tests {
    use super::{ns, xsd};

    #[test]
    fn test_default_prefixes() {
        assert!(ns::DEFAULT_PREFIXES.contains(&("xsd", ns::XSD)));
        assert!(xsd::INTEGER.starts_with(ns::XSD));
    }

    #[test]
    fn test_datatype_families() {
        assert!(xsd::is_integer_type("http://www.w3.org/2001/XMLSchema#int"));
        assert!(xsd::is_numeric_type(xsd::DECIMAL));
        assert!(!xsd::is_numeric_type(xsd::STRING));
        assert!(xsd::is_temporal_type(xsd::DATE));
        assert!(!xsd::is_temporal_type(xsd::HEX_BINARY));
    }
}
