//! Walks the binary search tree that maps address bits to either another
//! node, a data-section pointer, or "no match", one bit at a time.
//!
//! Every node is a fixed-size record with exactly two children, selected by
//! the next bit of the address rather than a key comparison, so the walk
//! is iterative and bounded by the address length (128 bits) rather than
//! by tree depth.

use byteorder::{BigEndian, ByteOrder};

use crate::metadata::Metadata;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("Search tree has an unsupported record size: {0}.")]
    InvalidNodeSize(u16),
    #[error("Search tree node record pointed outside the tree ({0}).")]
    PointerOutOfRange(u64),
    #[error("This database has no IPv6 records (ip_version=4), but an IPv6 address was looked up.")]
    UnsupportedAddressFamily,
}

/// Outcome of walking the full bit length of an address.
pub enum WalkResult {
    /// The address resolved to a data-section pointer, given as an offset
    /// relative to the start of the data section (with the 16-byte
    /// separator bias already removed).
    Data { offset: usize, prefix_len: usize },
    /// No record exists for this address in this tree.
    NotFound { prefix_len: usize },
}

/// Walks the search tree in `search_tree` (the node-record bytes only, not
/// including the file's metadata or data section) for `address_bits`,
/// which must already be in the tree's address-family shape: 32 bits for
/// an IPv4 lookup in an IPv4 tree, or the full 128 bits (with the
/// IPv4-in-IPv6 prefix skipped by the caller) otherwise.
pub fn walk(
    search_tree: &[u8],
    metadata: &Metadata,
    address_bits: &[u8; 16],
    start_bit: usize,
    bit_count: usize,
) -> Result<WalkResult, Error> {
    if !matches!(metadata.record_size, 24 | 28 | 32) {
        return Err(Error::InvalidNodeSize(metadata.record_size));
    }

    let mut node_index: u64 = 0;
    for bit_offset in 0..bit_count {
        let bit_pos = start_bit + bit_offset;
        let byte = address_bits[bit_pos / 8];
        let bit = (byte >> (7 - (bit_pos % 8))) & 1;

        let record = read_node(search_tree, metadata, node_index as usize, bit)?;

        if record == metadata.node_count as u64 {
            return Ok(WalkResult::NotFound {
                prefix_len: bit_offset + 1,
            });
        }
        if record > metadata.node_count as u64 {
            // The 16-byte all-zero separator sits between the search tree
            // and the data section.
            let offset = record
                .checked_sub(metadata.node_count as u64 + 16)
                .ok_or(Error::PointerOutOfRange(record))? as usize;
            return Ok(WalkResult::Data {
                offset,
                prefix_len: bit_offset + 1,
            });
        }
        node_index = record;
    }

    Ok(WalkResult::NotFound { prefix_len: bit_count })
}

/// Reads the left (`bit == 0`) or right (`bit == 1`) record of node
/// `node_index`.
fn read_node(search_tree: &[u8], metadata: &Metadata, node_index: usize, bit: u8) -> Result<u64, Error> {
    let node_size = metadata.node_size_bytes();
    let node_start = node_index * node_size;
    let node = search_tree
        .get(node_start..node_start + node_size)
        .ok_or(Error::PointerOutOfRange(node_index as u64))?;

    let value = match metadata.record_size {
        24 => {
            let bytes = if bit == 0 { &node[0..3] } else { &node[3..6] };
            be_u64(bytes)
        }
        28 => {
            // Two 28-bit records packed as: left[0..3], middle nibble byte
            // (high nibble extends left, low nibble extends right),
            // right[4..7].
            let middle = node[3];
            if bit == 0 {
                let high = ((middle & 0xF0) as u64) << 20;
                high | be_u64(&node[0..3])
            } else {
                let low = ((middle & 0x0F) as u64) << 24;
                low | be_u64(&node[4..7])
            }
        }
        32 => {
            let bytes = if bit == 0 { &node[0..4] } else { &node[4..8] };
            be_u64(bytes)
        }
        other => return Err(Error::InvalidNodeSize(other)),
    };
    Ok(value)
}

fn be_u64(bytes: &[u8]) -> u64 {
    BigEndian::read_uint(bytes, bytes.len())
}
