//! Core abstractions and common definitions
//!
//! This module provides:
//! - `traits`: seams for external collaborators (`GraphResolver`, `ServiceHandler`)
//! - `namespaces`: standard RDF namespace IRI constants

pub mod namespaces;
pub mod traits;

pub use namespaces::ns;
pub use traits::{GraphResolver, ServiceHandler};
