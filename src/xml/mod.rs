//! XML element trees: parsing, canonical rendering and path queries.
//!
//! Files are parsed with quick-xml into an owned [`Element`] tree, queried
//! with a small path syntax ([`PathQuery`]) and rendered back to a
//! normalized, tab-indented form.

pub mod errors;
pub mod parser;
pub mod query;
pub mod serialize;
pub mod tree;

pub use errors::{QueryError, XmlError};
pub use parser::{parse_bytes, parse_file, parse_str};
pub use query::{PathQuery, Predicate, Step};
pub use serialize::to_pretty_string;
pub use tree::{Declaration, Document, Element};
