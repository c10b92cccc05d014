//! `Database`: memory-maps an MMDB file, locates its metadata, and answers
//! address lookups. This is the library's single public entry point: the
//! thing `lib.rs` wires the lower layers up into and the only type the CLI
//! touches directly.

use std::path::Path;

use memmap2::Mmap;

use crate::address::{self, ParsedAddress};
use crate::decoder;
use crate::error::Error;
use crate::metadata::{self, Metadata};
use crate::tree::{self, WalkResult};
use crate::value::Value;

/// Tuning knobs for opening a database. An explicit constructor parameter
/// rather than a compiled-in constant, since this crate is a library first
/// and a CLI second.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub max_decode_depth: usize,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            max_decode_depth: decoder::DEFAULT_MAX_DEPTH,
        }
    }
}

/// An open, memory-mapped MMDB file: the search tree, data section, and
/// parsed metadata, ready for lookups.
pub struct Database {
    mmap: Mmap,
    metadata: Metadata,
    options: Options,
}

impl Database {
    /// Maps `path` into memory and locates its metadata block. Does not
    /// read the whole file; the OS pages in the search tree and data
    /// section lazily as lookups touch them.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Database, Error> {
        Self::open_with_options(path, Options::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: Options) -> Result<Database, Error> {
        let file = std::fs::File::open(path.as_ref())?;
        let mmap = unsafe { Mmap::map(&file)? };
        log::debug!("mapped {} ({} bytes)", path.as_ref().display(), mmap.len());

        let metadata = metadata::locate_and_decode(&mmap)?;
        log::debug!(
            "metadata: {} nodes, record_size={}, ip_version={}",
            metadata.node_count,
            metadata.record_size,
            metadata.ip_version
        );

        Ok(Database {
            mmap,
            metadata,
            options,
        })
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Looks up `address` (either IPv4 dotted-quad or IPv6 colon-hex) and
    /// returns the decoded record, if any.
    pub fn lookup(&self, address: &str) -> Result<Option<Value>, Error> {
        Ok(self.lookup_prefix(address)?.map(|(value, _)| value))
    }

    /// As `lookup`, but also returns the number of leading bits of the
    /// address that the matched (or exhausted) search-tree prefix covers.
    pub fn lookup_prefix(&self, address: &str) -> Result<Option<(Value, usize)>, Error> {
        let parsed = address::parse(address)?;
        self.lookup_parsed(parsed)
    }

    fn lookup_parsed(&self, parsed: ParsedAddress) -> Result<Option<(Value, usize)>, Error> {
        let (start_bit, bit_count) = self.start_and_bit_count(parsed)?;
        let search_tree = &self.mmap[..self.metadata.search_tree_size_bytes()];

        let result = tree::walk(search_tree, &self.metadata, &parsed.bytes, start_bit, bit_count)?;
        match result {
            WalkResult::NotFound { .. } => Ok(None),
            WalkResult::Data { offset, prefix_len } => {
                // Pointer targets decoded inside the data section are
                // relative to its start, so the decoder must see exactly
                // the data section as `data` (offset 0 == data_section_start),
                // not the whole file with an absolute cursor position.
                let data_section = &self.mmap[self.metadata.data_section_start()..];
                let mut cursor = crate::cursor::Cursor::at(data_section, offset);
                let value =
                    decoder::decode_value_with_limit(data_section, &mut cursor, self.options.max_decode_depth)?;
                Ok(Some((value, start_bit + prefix_len)))
            }
        }
    }

    /// `address::parse` always places the real IPv4 octets at bytes
    /// `[12..16]` of the 16-byte form (see `ParsedAddress`), regardless of
    /// which family the database is. So a native IPv4 lookup skips the same
    /// 96-bit zero prefix an IPv4-in-IPv6 lookup does; IPv6 lookups against
    /// an IPv4-only database are rejected.
    fn start_and_bit_count(&self, parsed: ParsedAddress) -> Result<(usize, usize), Error> {
        match (self.metadata.ip_version, parsed.is_ipv4) {
            (4, true) => Ok((96, 32)),
            (4, false) => Err(tree::Error::UnsupportedAddressFamily.into()),
            (6, true) => Ok((96, 32)),
            (6, false) => Ok((0, 128)),
            _ => Ok((0, 128)),
        }
    }
}
