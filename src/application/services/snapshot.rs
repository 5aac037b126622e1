//! Snapshot loading service
//!
//! A snapshot file lists one allocated block per line, optionally followed by
//! `key=value` annotations:
//!
//! ```text
//! # comment
//! 10.0.0.0/8 status=allocated cc=US
//! 10.1.0.0/16
//! 2001:db8::/32
//! AS64496-AS64511 requestor=example
//! ```
//!
//! Blocks are IPv4/IPv6 CIDRs, bare addresses (single-address ranges), `AS<n>`
//! or `AS<n>-AS<m>`. Annotation values cannot contain whitespace.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{AddressFamily, Forest, Range};
use crate::infrastructure::traits::FileSystem;

/// One parsed snapshot line.
#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    /// 1-based line number in the source file
    pub line: usize,
    pub range: Range,
    pub annotations: BTreeMap<String, String>,
}

/// All blocks of one snapshot file.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub path: PathBuf,
    pub entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Family of the first block, None for an empty snapshot.
    pub fn family(&self) -> Option<AddressFamily> {
        self.entries.first().map(|e| e.range.family())
    }

    /// Populate an unbuilt forest, carrying annotations over.
    ///
    /// Duplicate blocks and mixed families are reported with their line.
    pub fn into_forest(self) -> ApplicationResult<Forest> {
        let mut forest = Forest::new();
        for entry in self.entries {
            let identity = entry.range.identity().to_string();
            forest.insert(entry.range).map_err(|e| ApplicationError::Parse {
                path: self.path.clone(),
                line: entry.line,
                message: e.to_string(),
            })?;
            for (key, value) in entry.annotations {
                forest.annotate(&identity, key, value)?;
            }
        }
        Ok(forest)
    }
}

/// Reads and parses snapshot files.
pub struct SnapshotService {
    fs: Arc<dyn FileSystem>,
    asn_regex: Regex,
}

impl SnapshotService {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            asn_regex: Regex::new(r"(?i)^AS(\d+)(?:-AS(\d+))?$").expect("static regex"),
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<Snapshot> {
        if !self.fs.is_file(path) {
            return Err(ApplicationError::OperationFailed {
                context: format!("read snapshot: {}", path.display()),
                source: format!("no such file: {}", path.display()).into(),
            });
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read snapshot", path)?;
        let snapshot = self.parse(&content, path)?;
        debug!(blocks = snapshot.len(), "snapshot loaded");
        Ok(snapshot)
    }

    /// Load a snapshot straight into an unbuilt forest.
    pub fn load_forest(&self, path: &Path) -> ApplicationResult<Forest> {
        self.load(path)?.into_forest()
    }

    pub fn parse(&self, content: &str, path: &Path) -> ApplicationResult<Snapshot> {
        let mut entries = Vec::new();

        for (i, raw) in content.lines().enumerate() {
            let line = i + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let parse_err = |message: String| ApplicationError::Parse {
                path: path.to_path_buf(),
                line,
                message,
            };

            let mut fields = trimmed.split_whitespace();
            let block = fields.next().unwrap_or_default();
            let range = self.parse_block(block).map_err(parse_err)?;

            let mut annotations = BTreeMap::new();
            for field in fields {
                let (key, value) = field
                    .split_once('=')
                    .filter(|(k, _)| !k.is_empty())
                    .ok_or_else(|| parse_err(format!("expected key=value, got '{field}'")))?;
                annotations.insert(key.to_string(), value.to_string());
            }

            entries.push(SnapshotEntry {
                line,
                range,
                annotations,
            });
        }

        Ok(Snapshot {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Convert one block notation into a range whose identity is the block text.
    pub fn parse_block(&self, block: &str) -> Result<Range, String> {
        if let Some(caps) = self.asn_regex.captures(block) {
            let first = parse_asn(&caps[1])?;
            let last = match caps.get(2) {
                Some(m) => parse_asn(m.as_str())?,
                None => first,
            };
            return Range::spanning(block, AddressFamily::Asn, first, last).map_err(|e| e.to_string());
        }

        let (address, prefix) = match block.split_once('/') {
            Some((address, prefix)) => (address, Some(prefix)),
            None => (block, None),
        };
        let address: IpAddr = address
            .parse()
            .map_err(|_| format!("invalid address in block '{block}'"))?;

        let (family, bits, start) = match address {
            IpAddr::V4(v4) => (AddressFamily::Ipv4, 32u32, u32::from(v4) as u128),
            IpAddr::V6(v6) => (AddressFamily::Ipv6, 128u32, u128::from(v6)),
        };
        let prefix = match prefix {
            Some(p) => p
                .parse::<u32>()
                .ok()
                .filter(|&p| p <= bits)
                .ok_or_else(|| format!("invalid prefix length in block '{block}'"))?,
            None => bits,
        };

        let host_bits = bits - prefix;
        let host_mask = if host_bits == 128 {
            u128::MAX
        } else {
            (1u128 << host_bits) - 1
        };
        if start & host_mask != 0 {
            return Err(format!("block '{block}' has host bits set"));
        }
        Range::spanning(block, family, start, start | host_mask).map_err(|e| e.to_string())
    }
}

fn parse_asn(digits: &str) -> Result<u128, String> {
    digits
        .parse::<u32>()
        .map(u128::from)
        .map_err(|_| format!("AS number out of range: {digits}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::traits::RealFileSystem;

    fn service() -> SnapshotService {
        SnapshotService::new(Arc::new(RealFileSystem))
    }

    #[test]
    fn given_ipv4_cidr_when_parsing_block_then_spans_prefix() {
        let range = service().parse_block("10.0.0.0/8").unwrap();
        assert_eq!(range.family(), AddressFamily::Ipv4);
        assert_eq!(range.start(), 0x0a00_0000);
        assert_eq!(range.end(), 0x0aff_ffff);
        assert_eq!(range.address_count(), 1 << 24);
    }

    #[test]
    fn given_ipv6_cidr_when_parsing_block_then_spans_prefix() {
        let range = service().parse_block("2001:db8::/32").unwrap();
        assert_eq!(range.family(), AddressFamily::Ipv6);
        assert_eq!(range.address_count(), 1u128 << 96);
        assert_eq!(range.identity(), "2001:db8::/32");
    }

    #[test]
    fn given_bare_address_when_parsing_block_then_is_degenerate() {
        let range = service().parse_block("192.0.2.7").unwrap();
        assert!(range.is_degenerate());
    }

    #[test]
    fn given_asn_range_when_parsing_block_then_spans_numbers() {
        let range = service().parse_block("AS64496-AS64511").unwrap();
        assert_eq!(range.family(), AddressFamily::Asn);
        assert_eq!((range.start(), range.end()), (64496, 64511));
        let single = service().parse_block("as13335").unwrap();
        assert!(single.is_degenerate());
    }

    #[test]
    fn given_misaligned_cidr_when_parsing_block_then_rejects() {
        let err = service().parse_block("10.0.0.1/8").unwrap_err();
        assert!(err.contains("host bits"));
    }

    #[test]
    fn given_ipv4_full_space_when_parsing_block_then_accepts() {
        let range = service().parse_block("0.0.0.0/0").unwrap();
        assert_eq!(range.end(), u32::MAX as u128);
    }

    #[test]
    fn given_ipv6_full_space_when_parsing_block_then_rejects() {
        assert!(service().parse_block("::/0").is_err());
    }

    #[test]
    fn given_annotated_lines_when_parsing_then_keeps_line_numbers() {
        let content = "# header\n\n10.0.0.0/8 cc=US status=allocated\n10.1.0.0/16\n";
        let snapshot = service().parse(content, Path::new("day.txt")).unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.entries[0].line, 3);
        assert_eq!(snapshot.entries[0].annotations["cc"], "US");
        assert_eq!(snapshot.family(), Some(AddressFamily::Ipv4));
    }

    #[test]
    fn given_bad_annotation_when_parsing_then_reports_line() {
        let content = "10.0.0.0/8\n10.1.0.0/16 allocated\n";
        let err = service().parse(content, Path::new("day.txt")).unwrap_err();
        assert_eq!(err.to_string(), "day.txt:2: expected key=value, got 'allocated'");
    }

    #[test]
    fn given_duplicate_block_when_building_forest_then_reports_line() {
        let content = "10.0.0.0/8\n10.0.0.0/8\n";
        let snapshot = service().parse(content, Path::new("day.txt")).unwrap();
        let err = snapshot.into_forest().unwrap_err();
        assert_eq!(err.to_string(), "day.txt:2: duplicate range identity: 10.0.0.0/8");
    }
}
