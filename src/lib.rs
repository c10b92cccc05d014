//! A reader for MaxMind DB (MMDB) files: memory-maps a database, locates
//! its metadata, and answers address lookups against the binary search
//! tree and self-describing data section.

pub mod address;
pub mod cursor;
pub mod db;
pub mod decoder;
pub mod error;
pub mod metadata;
pub mod tree;
pub mod value;

pub use db::{Database, Options};
pub use error::Error;
pub use metadata::Metadata;
pub use value::Value;
