//! On-disk format for [`PatriciaTrie`].
//!
//! ```text
//! file   := "PATRICIA" record
//! record := 'N'                                   absent root (empty trie)
//!         | 'L' key_len:u64 key:[u8; key_len] value:u64
//!         | 'I' crit_bit:i64 record(low) record(high)
//! ```
//!
//! All integers are little-endian. Records are written in pre-order (node,
//! low, high), the same order a recursive walk would produce, but both
//! directions use an explicit stack so nesting depth costs heap, not call
//! stack.
//!
//! The decoder rejects anything the tree cannot represent (unknown tags,
//! truncation, trailing bytes, `N` below a branch, negative bit indices). It
//! does not re-check bit ordering or key uniqueness.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{DictError, Result};
use crate::trie::{Branch, Leaf, Node, NodeArena, NodeId, PatriciaTrie};

pub const MAGIC: &[u8; 8] = b"PATRICIA";

const TAG_NONE: u8 = b'N';
const TAG_LEAF: u8 = b'L';
const TAG_BRANCH: u8 = b'I';

const NOT_A_DICTIONARY: &str = "Invalid file format or not a dictionary file.";
const TRUNCATED: &str = "Invalid file format: truncated record.";

/// Writes `trie` to `out`.
pub fn encode<W: Write>(trie: &PatriciaTrie, mut out: W) -> Result<()> {
    out.write_all(MAGIC)?;

    let mut stack: Vec<NodeId> = Vec::new();
    match trie.root {
        Some(root) => stack.push(root),
        None => out.write_all(&[TAG_NONE])?,
    }

    while let Some(id) = stack.pop() {
        match trie.nodes.get(id) {
            Node::Leaf(leaf) => {
                out.write_all(&[TAG_LEAF])?;
                out.write_all(&(leaf.key.len() as u64).to_le_bytes())?;
                out.write_all(&leaf.key)?;
                out.write_all(&leaf.value.to_le_bytes())?;
            }
            Node::Branch(b) => {
                // Bit indices stay below 2^62 + 64, well inside i64.
                out.write_all(&[TAG_BRANCH])?;
                out.write_all(&(b.crit_bit as i64).to_le_bytes())?;
                stack.push(b.children[1]);
                stack.push(b.children[0]);
            }
            Node::Vacant => unreachable!("vacant slot {id:?} reachable from root"),
        }
    }

    out.flush()?;
    Ok(())
}

/// A branch whose header has been read but whose children are still coming.
struct PendingBranch {
    crit_bit: u64,
    low: Option<NodeId>,
}

/// Reads a whole trie from `input`, which must end right after the root record.
pub fn decode<R: Read>(mut input: R) -> Result<PatriciaTrie> {
    let mut magic = [0u8; 8];
    input.read_exact(&mut magic).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => DictError::CorruptFormat(NOT_A_DICTIONARY),
        _ => DictError::Io(e),
    })?;
    if &magic != MAGIC {
        return Err(DictError::CorruptFormat(NOT_A_DICTIONARY));
    }

    let mut nodes = NodeArena::default();
    let mut pending: Vec<PendingBranch> = Vec::new();
    let mut len = 0usize;

    let root = 'records: loop {
        let mut done = match read_array::<1>(&mut input)?[0] {
            TAG_NONE if pending.is_empty() => break 'records None,
            TAG_NONE => {
                return Err(DictError::CorruptFormat(
                    "Corrupted file: absent child below a branch.",
                ))
            }
            TAG_LEAF => {
                let key_len = u64::from_le_bytes(read_array(&mut input)?);
                let key = read_key(&mut input, key_len)?;
                let value = u64::from_le_bytes(read_array(&mut input)?);
                nodes.reserve(1)?;
                len += 1;
                nodes.alloc(Node::Leaf(Leaf { key, value }))
            }
            TAG_BRANCH => {
                let crit_bit = i64::from_le_bytes(read_array(&mut input)?);
                let crit_bit = u64::try_from(crit_bit)
                    .map_err(|_| DictError::CorruptFormat("Corrupted file: negative bit index."))?;
                pending.try_reserve(1)?;
                pending.push(PendingBranch {
                    crit_bit,
                    low: None,
                });
                continue 'records;
            }
            _ => return Err(DictError::CorruptFormat("Corrupted file: unknown node marker.")),
        };

        // Hand the finished subtree to the innermost open branch, closing every
        // branch that becomes complete on the way up.
        loop {
            let Some(top) = pending.last_mut() else {
                break 'records Some(done);
            };
            match top.low {
                None => {
                    top.low = Some(done);
                    continue 'records;
                }
                Some(low) => {
                    let crit_bit = top.crit_bit;
                    pending.pop();
                    nodes.reserve(1)?;
                    done = nodes.alloc(Node::Branch(Branch {
                        crit_bit,
                        children: [low, done],
                    }));
                }
            }
        }
    };

    let mut extra = [0u8; 1];
    loop {
        match input.read(&mut extra) {
            Ok(0) => break,
            Ok(_) => {
                return Err(DictError::CorruptFormat(
                    "Corrupted file: trailing data detected.",
                ))
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(DictError::Io(e)),
        }
    }

    Ok(PatriciaTrie::from_parts(nodes, root, len))
}

fn truncated(e: io::Error) -> DictError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => DictError::CorruptFormat(TRUNCATED),
        _ => DictError::Io(e),
    }
}

fn read_array<const N: usize>(input: &mut impl Read) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    input.read_exact(&mut buf).map_err(truncated)?;
    Ok(buf)
}

/// Reads `len` key bytes without trusting `len` for the allocation size.
fn read_key(input: &mut impl Read, len: u64) -> Result<Vec<u8>> {
    let mut key = Vec::new();
    let read = input.take(len).read_to_end(&mut key)?;
    if read as u64 != len {
        return Err(DictError::CorruptFormat(TRUNCATED));
    }
    Ok(key)
}

impl PatriciaTrie {
    /// Writes the dictionary to `path`, creating or truncating the file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        encode(self, BufWriter::new(file))?;
        debug!(path = %path.display(), entries = self.len(), "saved dictionary");
        Ok(())
    }

    /// Reads a dictionary file into a new trie.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let trie = decode(BufReader::new(file)).inspect_err(|e| {
            warn!(path = %path.display(), error = %e, "rejected dictionary file");
        })?;
        debug!(path = %path.display(), entries = trie.len(), "loaded dictionary");
        Ok(trie)
    }

    /// Replaces the contents of `self` with the dictionary stored at `path`.
    ///
    /// `self` is only touched once the whole file has decoded cleanly.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        *self = Self::open(path)?;
        Ok(())
    }
}
