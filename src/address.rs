//! Parses textual IPv4 and IPv6 addresses into their 16-byte network-order
//! form used for tree lookups (IPv4 addresses are mapped into the last 4
//! bytes, per the IPv4-in-IPv6 convention).
//!
//! IPv6 parsing follows the canonical split-on-`::` algorithm (see
//! DESIGN.md), consistent with Rust's own `Ipv6Addr` parsing semantics.

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("\"{0}\" is not a valid address.")]
    AddressSyntax(AddressSyntaxKind),
    #[error("IPv6 address has more than two colons in a row, or more than one \"::\".")]
    TooManyColons,
}

/// Carries enough context to format a useful error message without
/// allocating a `String` inside the error type itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSyntaxKind {
    Ipv4,
    Ipv6,
}

impl std::fmt::Display for AddressSyntaxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressSyntaxKind::Ipv4 => write!(f, "IPv4"),
            AddressSyntaxKind::Ipv6 => write!(f, "IPv6"),
        }
    }
}

/// A parsed address: 16 bytes network order, plus which family it was
/// written in (the tree walker needs this to decide whether to skip the
/// IPv4-in-IPv6 prefix).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedAddress {
    pub bytes: [u8; 16],
    pub is_ipv4: bool,
}

/// Parses either family, dispatching on the presence of a `:`.
pub fn parse(s: &str) -> Result<ParsedAddress, Error> {
    if s.contains(':') {
        parse_ipv6(s).map(|bytes| ParsedAddress { bytes, is_ipv4: false })
    } else {
        parse_ipv4(s).map(|bytes| {
            let mut full = [0_u8; 16];
            full[12..].copy_from_slice(&bytes);
            ParsedAddress {
                bytes: full,
                is_ipv4: true,
            }
        })
    }
}

/// Parses a dotted-quad IPv4 address into 4 bytes.
pub fn parse_ipv4(s: &str) -> Result<[u8; 4], Error> {
    let err = || Error::AddressSyntax(AddressSyntaxKind::Ipv4);

    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() != 4 {
        return Err(err());
    }
    let mut out = [0_u8; 4];
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() || (part.len() > 1 && part.starts_with('0')) {
            return Err(err());
        }
        out[i] = part.parse::<u8>().map_err(|_| err())?;
    }
    Ok(out)
}

/// Parses a colon-hex IPv6 address into its 16-byte network-order form,
/// including `::` zero-run compression and the trailing dotted-quad form
/// (`::ffff:1.2.3.4`).
pub fn parse_ipv6(s: &str) -> Result<[u8; 16], Error> {
    let err = || Error::AddressSyntax(AddressSyntaxKind::Ipv6);

    if s.contains(":::") {
        return Err(Error::TooManyColons);
    }
    let double_colon_count = s.matches("::").count();
    if double_colon_count > 1 {
        return Err(Error::TooManyColons);
    }

    let (head, tail) = if let Some(pos) = s.find("::") {
        (&s[..pos], &s[pos + 2..])
    } else {
        (s, "")
    };
    let has_compression = s.contains("::");

    let head_groups = parse_groups(head)?;
    let tail_groups = parse_groups(tail)?;

    if !has_compression && head_groups.len() != 8 {
        return Err(err());
    }
    if has_compression && head_groups.len() + tail_groups.len() >= 8 {
        return Err(err());
    }
    if head_groups.len() + tail_groups.len() > 8 {
        return Err(err());
    }

    let mut groups = head_groups;
    if has_compression {
        let zeros = 8 - groups.len() - tail_groups.len();
        groups.extend(std::iter::repeat(0_u16).take(zeros));
    }
    groups.extend(tail_groups);

    if groups.len() != 8 {
        return Err(err());
    }

    let mut out = [0_u8; 16];
    for (i, g) in groups.iter().enumerate() {
        out[i * 2] = (g >> 8) as u8;
        out[i * 2 + 1] = *g as u8;
    }
    Ok(out)
}

/// Splits a (possibly empty) run of colon-separated groups, where the last
/// group may itself be a dotted-quad IPv4 literal.
fn parse_groups(s: &str) -> Result<Vec<u16>, Error> {
    let err = || Error::AddressSyntax(AddressSyntaxKind::Ipv6);

    if s.is_empty() {
        return Ok(Vec::new());
    }
    let parts: Vec<&str> = s.split(':').collect();
    let mut groups = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
        if part.contains('.') {
            if i != parts.len() - 1 {
                return Err(err());
            }
            let v4 = parse_ipv4(part)?;
            groups.push(u16::from_be_bytes([v4[0], v4[1]]));
            groups.push(u16::from_be_bytes([v4[2], v4[3]]));
            continue;
        }
        if part.is_empty() || part.len() > 4 {
            return Err(err());
        }
        let g = u16::from_str_radix(part, 16).map_err(|_| err())?;
        groups.push(g);
    }
    Ok(groups)
}

/// Formats 16 bytes back into the canonical compressed IPv6 textual form.
/// Used by tests to check the parse/format round trip.
pub fn format_ipv6(bytes: &[u8; 16]) -> String {
    let mut groups = [0_u16; 8];
    for i in 0..8 {
        groups[i] = u16::from_be_bytes([bytes[i * 2], bytes[i * 2 + 1]]);
    }

    // Find the longest run of zero groups to compress.
    let mut best_start = None;
    let mut best_len = 0;
    let mut cur_start = None;
    let mut cur_len = 0;
    for (i, g) in groups.iter().enumerate() {
        if *g == 0 {
            if cur_start.is_none() {
                cur_start = Some(i);
            }
            cur_len += 1;
            if cur_len > best_len {
                best_len = cur_len;
                best_start = cur_start;
            }
        } else {
            cur_start = None;
            cur_len = 0;
        }
    }

    if best_len < 2 {
        return groups
            .iter()
            .map(|g| format!("{:x}", g))
            .collect::<Vec<_>>()
            .join(":");
    }

    let start = best_start.unwrap();
    let end = start + best_len;
    let head: Vec<String> = groups[..start].iter().map(|g| format!("{:x}", g)).collect();
    let tail: Vec<String> = groups[end..].iter().map(|g| format!("{:x}", g)).collect();
    format!("{}::{}", head.join(":"), tail.join(":"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ipv4() {
        assert_eq!(parse_ipv4("1.2.3.4").unwrap(), [1, 2, 3, 4]);
        assert_eq!(parse_ipv4("0.0.0.0").unwrap(), [0, 0, 0, 0]);
    }

    #[test]
    fn test_parse_ipv4_rejects_malformed() {
        assert!(parse_ipv4("1.2.3").is_err());
        assert!(parse_ipv4("1.2.3.4.5").is_err());
        assert!(parse_ipv4("1.2.3.256").is_err());
        assert!(parse_ipv4("01.2.3.4").is_err());
        assert!(parse_ipv4("1.2.3.").is_err());
    }

    #[test]
    fn test_parse_ipv6_full_form() {
        let bytes = parse_ipv6("2001:0db8:0000:0000:0000:0000:0000:0001").unwrap();
        assert_eq!(bytes[0], 0x20);
        assert_eq!(bytes[1], 0x01);
        assert_eq!(bytes[15], 0x01);
    }

    #[test]
    fn test_parse_ipv6_compressed() {
        let bytes = parse_ipv6("2001:db8::1").unwrap();
        let expected = parse_ipv6("2001:0db8:0000:0000:0000:0000:0000:0001").unwrap();
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_parse_ipv6_all_zero() {
        assert_eq!(parse_ipv6("::").unwrap(), [0_u8; 16]);
    }

    #[test]
    fn test_parse_ipv6_ipv4_mapped() {
        let bytes = parse_ipv6("::ffff:1.2.3.4").unwrap();
        assert_eq!(&bytes[12..], &[1, 2, 3, 4]);
        assert_eq!(bytes[10], 0xff);
        assert_eq!(bytes[11], 0xff);
    }

    #[test]
    fn test_parse_ipv6_rejects_double_compression() {
        assert_eq!(parse_ipv6("2001::db8::1"), Err(Error::TooManyColons));
    }

    #[test]
    fn test_parse_ipv6_rejects_triple_colon() {
        assert_eq!(parse_ipv6("2001:::1"), Err(Error::TooManyColons));
    }

    #[test]
    fn test_parse_ipv6_rejects_too_many_groups() {
        assert!(parse_ipv6("1:2:3:4:5:6:7:8:9").is_err());
    }

    #[test]
    fn test_dispatch_by_colon() {
        assert!(parse("1.2.3.4").unwrap().is_ipv4);
        assert!(!parse("::1").unwrap().is_ipv4);
    }

    #[test]
    fn test_round_trip_format_parse() {
        let original = "2001:db8::1";
        let bytes = parse_ipv6(original).unwrap();
        let formatted = format_ipv6(&bytes);
        let reparsed = parse_ipv6(&formatted).unwrap();
        assert_eq!(bytes, reparsed);
    }
}
