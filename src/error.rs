//! Crate-wide error type, unifying each layer's own error enum behind
//! `#[from]` conversions.

use crate::address;
use crate::cursor;
use crate::decoder;
use crate::metadata;
use crate::tree;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error mapping database file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cursor: {0}")]
    Cursor(#[from] cursor::Error),
    #[error("Decoder: {0}")]
    Decoder(#[from] decoder::Error),
    #[error("Metadata: {0}")]
    Metadata(#[from] metadata::Error),
    #[error("Tree: {0}")]
    Tree(#[from] tree::Error),
    #[error("Address: {0}")]
    Address(#[from] address::Error),
}
