//! Locates and decodes the metadata block: a reverse scan for a fixed
//! marker near the end of the file, followed by one `decoder::decode_value`
//! call and projection onto a typed struct. The marker is found by scanning
//! backward rather than read at a fixed offset, since the data section
//! (and therefore the metadata's start) has no fixed size.

use crate::decoder;
use crate::value::Value;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Metadata marker not found near the end of the file.")]
    MetadataMarkerMissing,
    #[error("Metadata is missing required field \"{0}\".")]
    MetadataFieldMissing(String),
    #[error("Metadata field \"{0}\" has the wrong type (expected {1}, found {2}).")]
    MetadataFieldType(String, &'static str, &'static str),
    #[error("Decoder: {0}")]
    Decoder(#[from] decoder::Error),
}

/// The 14-byte byte string that precedes the metadata section.
const METADATA_MARKER: &[u8] = b"\xAB\xCD\xEFMaxMind.com";

/// Bound the reverse scan the same way the reference readers do: metadata
/// is small, so scanning more than this many trailing bytes means the
/// marker is simply absent (or this isn't an MMDB file at all).
const MAX_METADATA_SCAN: usize = 128 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub node_count: u32,
    pub record_size: u16,
    pub ip_version: u16,
    pub database_type: String,
    pub languages: Vec<String>,
    pub binary_format_major_version: u16,
    pub binary_format_minor_version: u16,
    pub build_epoch: u64,
    pub description: Vec<(String, String)>,
}

impl Metadata {
    /// Bytes occupied by one record within a search-tree node.
    pub fn node_size_bytes(&self) -> usize {
        (self.record_size as usize * 2) / 8
    }

    /// Total size in bytes of the search tree (all nodes).
    pub fn search_tree_size_bytes(&self) -> usize {
        self.node_count as usize * self.node_size_bytes()
    }

    /// Offset, within the file, at which the data section begins: right
    /// after the search tree and its 16-byte all-zero separator.
    pub fn data_section_start(&self) -> usize {
        self.search_tree_size_bytes() + 16
    }
}

/// Scans `file` backward for the rightmost occurrence of the metadata
/// marker, decodes the metadata map that follows it, and projects it onto
/// a `Metadata`. `file` is the whole mapped database file.
pub fn locate_and_decode(file: &[u8]) -> Result<Metadata, Error> {
    let scan_from = file.len().saturating_sub(MAX_METADATA_SCAN);
    let marker_start = find_rightmost(&file[scan_from..], METADATA_MARKER)
        .map(|pos| scan_from + pos)
        .ok_or(Error::MetadataMarkerMissing)?;

    let metadata_offset = marker_start + METADATA_MARKER.len();
    let mut cursor = crate::cursor::Cursor::at(file, metadata_offset);
    let value = decoder::decode_value(file, &mut cursor)?;

    Metadata::from_value(&value)
}

/// Finds the rightmost (last) occurrence of `needle` in `haystack`.
/// The marker can legitimately appear more than once if it shows up inside
/// data-section bytes by coincidence; the rightmost match is always the
/// real one, since nothing else can follow it.
fn find_rightmost(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&i| haystack[i..i + needle.len()] == *needle)
}

impl Metadata {
    fn from_value(value: &Value) -> Result<Metadata, Error> {
        let field = |name: &str| -> Result<&Value, Error> {
            value
                .get(name)
                .ok_or_else(|| Error::MetadataFieldMissing(name.to_string()))
        };

        let node_count = field("node_count")?
            .as_u32()
            .ok_or_else(|| type_err("node_count", "uint32"))?;
        let record_size = field("record_size")?
            .as_u16()
            .ok_or_else(|| type_err("record_size", "uint16"))?;
        let ip_version = field("ip_version")?
            .as_u16()
            .ok_or_else(|| type_err("ip_version", "uint16"))?;
        let database_type = field("database_type")?
            .as_string()
            .ok_or_else(|| type_err("database_type", "string"))?
            .to_string();
        let languages = field("languages")?
            .as_array()
            .ok_or_else(|| type_err("languages", "array"))?
            .iter()
            .filter_map(|v| v.as_string().map(str::to_string))
            .collect();
        let binary_format_major_version = field("binary_format_major_version")?
            .as_u16()
            .ok_or_else(|| type_err("binary_format_major_version", "uint16"))?;
        let binary_format_minor_version = field("binary_format_minor_version")?
            .as_u16()
            .ok_or_else(|| type_err("binary_format_minor_version", "uint16"))?;

        let build_epoch = value.get("build_epoch").and_then(|v| v.as_u64()).unwrap_or(0);
        let description = value
            .get("description")
            .and_then(|v| v.as_map())
            .map(|pairs| {
                pairs
                    .iter()
                    .filter_map(|(k, v)| v.as_string().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        if !matches!(record_size, 24 | 28 | 32) {
            return Err(type_err("record_size", "24, 28, or 32"));
        }
        if !matches!(ip_version, 4 | 6) {
            return Err(type_err("ip_version", "4 or 6"));
        }

        Ok(Metadata {
            node_count,
            record_size,
            ip_version,
            database_type,
            languages,
            binary_format_major_version,
            binary_format_minor_version,
            build_epoch,
            description,
        })
    }
}

fn type_err(name: &str, expected: &'static str) -> Error {
    Error::MetadataFieldType(name.to_string(), expected, "other")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_string(s: &str) -> Vec<u8> {
        let mut out = vec![(2_u8 << 5) | s.len() as u8];
        out.extend_from_slice(s.as_bytes());
        out
    }

    fn encode_uint16(v: u16) -> Vec<u8> {
        if v == 0 {
            vec![5_u8 << 5]
        } else {
            vec![(5_u8 << 5) | 2, (v >> 8) as u8, v as u8]
        }
    }

    fn encode_uint32(v: u32) -> Vec<u8> {
        vec![(6_u8 << 5) | 4, (v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8, v as u8]
    }

    fn build_metadata_map(node_count: u32, record_size: u16) -> Vec<u8> {
        let entries: Vec<(Vec<u8>, Vec<u8>)> = vec![
            (encode_string("node_count"), encode_uint32(node_count)),
            (encode_string("record_size"), encode_uint16(record_size)),
            (encode_string("ip_version"), encode_uint16(6)),
            (encode_string("database_type"), encode_string("Test")),
            (
                encode_string("languages"),
                {
                    let mut a = vec![(11_u8 << 5) | 1];
                    a.extend(encode_string("en"));
                    a
                },
            ),
            (
                encode_string("binary_format_major_version"),
                encode_uint16(2),
            ),
            (
                encode_string("binary_format_minor_version"),
                encode_uint16(0),
            ),
        ];
        let mut out = vec![(7_u8 << 5) | entries.len() as u8];
        for (k, v) in entries {
            out.extend(k);
            out.extend(v);
        }
        out
    }

    #[test]
    fn test_locate_and_decode_finds_trailing_marker() {
        let mut file = vec![0_u8; 16]; // stand-in search tree + separator
        file.extend_from_slice(METADATA_MARKER);
        file.extend(build_metadata_map(1, 24));

        let metadata = locate_and_decode(&file).unwrap();
        assert_eq!(metadata.node_count, 1);
        assert_eq!(metadata.record_size, 24);
        assert_eq!(metadata.ip_version, 6);
        assert_eq!(metadata.database_type, "Test");
        assert_eq!(metadata.languages, vec!["en".to_string()]);
        assert_eq!(metadata.build_epoch, 0);
        assert!(metadata.description.is_empty());
    }

    #[test]
    fn test_missing_marker_errors() {
        let file = vec![0_u8; 32];
        assert_eq!(locate_and_decode(&file), Err(Error::MetadataMarkerMissing));
    }

    #[test]
    fn test_rightmost_marker_wins() {
        let mut file = Vec::new();
        file.extend_from_slice(METADATA_MARKER);
        file.extend(vec![0xFF; 8]); // a decoy stretch before the real block
        file.extend_from_slice(METADATA_MARKER);
        file.extend(build_metadata_map(2, 28));

        let metadata = locate_and_decode(&file).unwrap();
        assert_eq!(metadata.node_count, 2);
        assert_eq!(metadata.record_size, 28);
    }

    #[test]
    fn test_derived_sizes() {
        let metadata = Metadata {
            node_count: 10,
            record_size: 24,
            ip_version: 6,
            database_type: "Test".to_string(),
            languages: vec![],
            binary_format_major_version: 2,
            binary_format_minor_version: 0,
            build_epoch: 0,
            description: vec![],
        };
        assert_eq!(metadata.node_size_bytes(), 6);
        assert_eq!(metadata.search_tree_size_bytes(), 60);
        assert_eq!(metadata.data_section_start(), 76);
    }
}
