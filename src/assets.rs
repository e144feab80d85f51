//! # Asset Partition Module
//!
//! Read-only asset bundle shipped next to the firmware. The whole bundle is
//! loaded once into an `Arc<[u8]>`; lookups hand out shared references into that
//! buffer, so images served from here are never copied.
//!
//! ## Bundle layout
//! ```text
//! magic   "WPAS"
//! count   u32 LE
//! sum     u32 LE   wrapping byte sum of the data region
//! entries count x { name_len u16 LE, name, offset u32 LE, size u32 LE }
//! data    offsets are relative to the start of this region
//! ```

use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

const MAGIC: &[u8; 4] = b"WPAS";
const HEADER_LEN: usize = 12;

/// A zero-copy view of one asset
#[derive(Debug, Clone)]
pub struct AssetRef {
    pub partition: Arc<[u8]>,
    pub range: Range<usize>,
}

impl AssetRef {
    pub fn bytes(&self) -> &[u8] {
        &self.partition[self.range.clone()]
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }
}

/// Indexed, checksum-verified asset storage.
///
/// Callers must check both validity predicates before trusting [`AssetStore::get`].
pub trait AssetStore: Send + Sync {
    fn partition_valid(&self) -> bool;
    fn checksum_valid(&self) -> bool;
    fn get(&self, name: &str) -> Option<AssetRef>;
}

#[derive(Debug)]
pub struct AssetPartition {
    data: Arc<[u8]>,
    entries: HashMap<String, Range<usize>>,
    partition_valid: bool,
    checksum_valid: bool,
}

impl AssetPartition {
    /// An empty partition that fails both validity checks
    pub fn empty() -> Self {
        Self {
            data: Arc::from(Vec::new()),
            entries: HashMap::new(),
            partition_valid: false,
            checksum_valid: false,
        }
    }

    /// Loads a bundle from disk. A missing or unreadable file gives an empty partition.
    pub fn open(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => {
                let partition = Self::from_bytes(bytes);
                log::info!(
                    "Asset bundle {}: {} entries, partition_valid={}, checksum_valid={}",
                    path.display(),
                    partition.entries.len(),
                    partition.partition_valid,
                    partition.checksum_valid
                );
                partition
            }
            Err(e) => {
                log::warn!("Asset bundle {} unavailable: {e}", path.display());
                Self::empty()
            }
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let data: Arc<[u8]> = Arc::from(bytes);

        let Some((entries, data_start, stored_sum)) = parse_table(&data) else {
            return Self {
                data,
                entries: HashMap::new(),
                partition_valid: false,
                checksum_valid: false,
            };
        };

        let checksum_valid = checksum(&data[data_start..]) == stored_sum;
        Self {
            data,
            entries,
            partition_valid: true,
            checksum_valid,
        }
    }

    /// Builds a bundle from `(name, bytes)` pairs.
    pub fn pack<N: AsRef<str>, B: AsRef<[u8]>>(assets: &[(N, B)]) -> Result<Vec<u8>, String> {
        let mut table = Vec::new();
        let mut payload = Vec::new();

        for (name, bytes) in assets {
            let name = name.as_ref().as_bytes();
            let bytes = bytes.as_ref();
            let name_len = u16::try_from(name.len())
                .map_err(|_| format!("Asset name too long: {} bytes", name.len()))?;
            let offset = u32::try_from(payload.len())
                .map_err(|_| "Asset bundle exceeds 4 GiB".to_string())?;
            let size = u32::try_from(bytes.len())
                .map_err(|_| "Asset exceeds 4 GiB".to_string())?;

            table.extend_from_slice(&name_len.to_le_bytes());
            table.extend_from_slice(name);
            table.extend_from_slice(&offset.to_le_bytes());
            table.extend_from_slice(&size.to_le_bytes());
            payload.extend_from_slice(bytes);
        }

        let count = u32::try_from(assets.len()).map_err(|_| "Too many assets".to_string())?;
        let mut out = Vec::with_capacity(HEADER_LEN + table.len() + payload.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&checksum(&payload).to_le_bytes());
        out.extend_from_slice(&table);
        out.extend_from_slice(&payload);
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl AssetStore for AssetPartition {
    fn partition_valid(&self) -> bool {
        self.partition_valid
    }

    fn checksum_valid(&self) -> bool {
        self.checksum_valid
    }

    fn get(&self, name: &str) -> Option<AssetRef> {
        self.entries.get(name).map(|range| AssetRef {
            partition: self.data.clone(),
            range: range.clone(),
        })
    }
}

fn checksum(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |acc, b| acc.wrapping_add(u32::from(*b)))
}

fn read_u16(buf: &[u8], pos: usize) -> Option<u16> {
    buf.get(pos..pos.checked_add(2)?)?
        .try_into()
        .ok()
        .map(u16::from_le_bytes)
}

fn read_u32(buf: &[u8], pos: usize) -> Option<u32> {
    buf.get(pos..pos.checked_add(4)?)?
        .try_into()
        .ok()
        .map(u32::from_le_bytes)
}

/// Parses header and entry table. `None` means the partition is malformed.
fn parse_table(buf: &[u8]) -> Option<(HashMap<String, Range<usize>>, usize, u32)> {
    if buf.get(..4)? != MAGIC {
        return None;
    }
    let count = read_u32(buf, 4)? as usize;
    let stored_sum = read_u32(buf, 8)?;

    let mut pos = HEADER_LEN;
    let mut raw = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let name_len = read_u16(buf, pos)? as usize;
        pos += 2;
        let name = std::str::from_utf8(buf.get(pos..pos.checked_add(name_len)?)?).ok()?;
        pos += name_len;
        let offset = read_u32(buf, pos)? as usize;
        let size = read_u32(buf, pos + 4)? as usize;
        pos += 8;
        raw.push((name.to_string(), offset, size));
    }

    let data_start = pos;
    let mut entries = HashMap::with_capacity(raw.len());
    for (name, offset, size) in raw {
        let start = data_start.checked_add(offset)?;
        let end = start.checked_add(size)?;
        if end > buf.len() {
            return None;
        }
        entries.insert(name, start..end);
    }

    Some((entries, data_start, stored_sum))
}
