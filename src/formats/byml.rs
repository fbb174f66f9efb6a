//! BYML (Binary YAML) - typed tree used for stage and parameter data.
//!
//! Only the Switch revision (version 3) dialect is handled. Files from other
//! games or revisions may parse, but nothing guarantees it.
//!
//! ## Header (0x10 bytes)
//! ```text
//! [0x00] Magic "BY" (big-endian) / "YB" (little-endian)  (2 bytes)
//! [0x02] Version                                          (u16)
//! [0x04] KeyTableOffset    (0 = none)                     (u32)
//! [0x08] StringTableOffset (0 = none)                     (u32)
//! [0x0C] RootOffset        (0 = empty document)           (u32)
//! ```
//!
//! ## Nodes
//! Every value occupies a 4-byte slot. Small scalars (bool, int, uint,
//! float) are stored in the slot itself; everything else stores an absolute
//! offset to its payload.
//!
//! ```text
//! Array:       [tag C0][count u24][count × type u8][pad to 4][count × slot]
//! Dictionary:  [tag C1][count u24][count × (key index u24, type u8, slot)]
//! StringTable: [tag C2][count u24][count × u32 offset relative to the table]
//! ```
//!
//! Dictionary keys index the key table; string values index the string
//! table. Both tables are read once per document.

use std::collections::HashSet;

use tracing::debug;

use crate::cursor::{ByteCursor, Endian};
use crate::utils::align_up;
use crate::{Error, Result};

/// Nesting limit; deeper trees are treated as corrupt (or cyclic).
const MAX_DEPTH: usize = 256;

/// Node tags understood by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeType {
    String = 0xA0,
    Array = 0xC0,
    Dictionary = 0xC1,
    StringTable = 0xC2,
    Bool = 0xD0,
    Int = 0xD1,
    Float = 0xD2,
    UInt = 0xD3,
    Int64 = 0xD4,
    UInt64 = 0xD5,
    Double = 0xD6,
    Null = 0xFF,
}

impl TryFrom<u8> for NodeType {
    type Error = Error;
    fn try_from(v: u8) -> Result<Self> {
        Ok(match v {
            0xA0 => Self::String,
            0xC0 => Self::Array,
            0xC1 => Self::Dictionary,
            0xC2 => Self::StringTable,
            0xD0 => Self::Bool,
            0xD1 => Self::Int,
            0xD2 => Self::Float,
            0xD3 => Self::UInt,
            0xD4 => Self::Int64,
            0xD5 => Self::UInt64,
            0xD6 => Self::Double,
            0xFF => Self::Null,
            _ => return Err(Error::UnknownNodeType(v)),
        })
    }
}

/// A decoded BYML value.
#[derive(Debug, Clone, PartialEq)]
pub enum TableNode {
    Null,
    Bool(bool),
    Int(i32),
    UInt(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Array(Vec<TableNode>),
    /// Entries in stored order; keys are unique.
    Dictionary(Vec<(String, TableNode)>),
}

impl TableNode {
    /// Human-readable name of the node's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            TableNode::Null => "null",
            TableNode::Bool(_) => "bool",
            TableNode::Int(_) => "int",
            TableNode::UInt(_) => "uint",
            TableNode::Int64(_) => "int64",
            TableNode::UInt64(_) => "uint64",
            TableNode::Float(_) => "float",
            TableNode::Double(_) => "double",
            TableNode::String(_) => "string",
            TableNode::Array(_) => "array",
            TableNode::Dictionary(_) => "dictionary",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TableNode::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TableNode::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Any integer node widened to `i64` (`None` if a `u64` does not fit).
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            TableNode::Int(v) => Some(v.into()),
            TableNode::UInt(v) => Some(v.into()),
            TableNode::Int64(v) => Some(v),
            TableNode::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Either float node widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            TableNode::Float(v) => Some(v.into()),
            TableNode::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[TableNode]> {
        match self {
            TableNode::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&[(String, TableNode)]> {
        match self {
            TableNode::Dictionary(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a dictionary entry by key.
    pub fn get(&self, key: &str) -> Option<&TableNode> {
        self.as_dictionary()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// A parsed BYML document.
#[derive(Debug, Clone, PartialEq)]
pub struct Byml {
    pub endian: Endian,
    pub version: u16,
    /// Root array or dictionary (an empty dictionary when the file has no root).
    pub root: TableNode,
}

impl Byml {
    /// Parse a BYML document.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let endian = match data.get(0..2) {
            Some(b"BY") => Endian::Big,
            Some(b"YB") => Endian::Little,
            _ => return Err(Error::BadMagic),
        };
        let mut r = ByteCursor::new(data, endian);
        r.skip(2)?;
        let version = r.u16()?;
        let key_table_offset = r.u32()? as usize;
        let string_table_offset = r.u32()? as usize;
        let root_offset = r.u32()? as usize;

        if root_offset == 0 {
            return Ok(Self {
                endian,
                version,
                root: TableNode::Dictionary(Vec::new()),
            });
        }

        let mut tree = Tree {
            r,
            keys: Vec::new(),
            strings: Vec::new(),
        };
        if key_table_offset != 0 {
            tree.keys = tree.string_table(key_table_offset)?;
        }
        if string_table_offset != 0 {
            tree.strings = tree.string_table(string_table_offset)?;
        }

        let root_tag = tree.r.at(root_offset)?.u8()?;
        let root_type = match NodeType::try_from(root_tag) {
            Ok(t @ (NodeType::Array | NodeType::Dictionary)) => t,
            _ => return Err(Error::InvalidRoot(root_tag)),
        };
        // The header's root offset field doubles as the root's value slot.
        let root = tree.node(root_type, 0x0C, 0)?;

        debug!(
            ?endian,
            version,
            keys = tree.keys.len(),
            strings = tree.strings.len(),
            "parsed BYML document"
        );
        Ok(Self {
            endian,
            version,
            root,
        })
    }
}

struct Tree<'a> {
    r: ByteCursor<'a>,
    keys: Vec<String>,
    strings: Vec<String>,
}

impl Tree<'_> {
    fn u32_at(&self, offset: usize) -> Result<u32> {
        self.r.at(offset)?.u32()
    }

    /// Decode the node of type `ty` whose value slot is at `slot`.
    fn node(&self, ty: NodeType, slot: usize, depth: usize) -> Result<TableNode> {
        if depth > MAX_DEPTH {
            return Err(Error::MalformedHeader("BYML nesting too deep"));
        }
        let mut c = self.r.at(slot)?;

        Ok(match ty {
            NodeType::Null => TableNode::Null,
            NodeType::Bool => TableNode::Bool(c.u32()? != 0),
            NodeType::Int => TableNode::Int(c.i32()?),
            NodeType::UInt => TableNode::UInt(c.u32()?),
            NodeType::Float => TableNode::Float(c.f32()?),
            NodeType::String => {
                let index = c.u32()? as usize;
                let s = self
                    .strings
                    .get(index)
                    .ok_or(Error::UnresolvedReference("BYML string index out of range"))?;
                TableNode::String(s.clone())
            }
            NodeType::Int64 => TableNode::Int64(self.r.at(c.u32()? as usize)?.i64()?),
            NodeType::UInt64 => TableNode::UInt64(self.r.at(c.u32()? as usize)?.u64()?),
            NodeType::Double => TableNode::Double(self.r.at(c.u32()? as usize)?.f64()?),
            NodeType::Array => self.array(c.u32()? as usize, depth)?,
            NodeType::Dictionary => self.dictionary(c.u32()? as usize, depth)?,
            NodeType::StringTable => TableNode::Array(
                self.string_table(c.u32()? as usize)?
                    .into_iter()
                    .map(TableNode::String)
                    .collect(),
            ),
        })
    }

    /// Read a container's tag and 24-bit count.
    fn container_header(&self, offset: usize, expected: NodeType) -> Result<(ByteCursor<'_>, usize)> {
        let mut c = self.r.at(offset)?;
        if c.u8()? != expected as u8 {
            return Err(Error::MalformedHeader("BYML container tag mismatch"));
        }
        let count = c.u24()? as usize;
        Ok((c, count))
    }

    fn array(&self, offset: usize, depth: usize) -> Result<TableNode> {
        let (c, count) = self.container_header(offset, NodeType::Array)?;
        let types = c.slice_at(offset + 4, count)?;
        let values = offset + 4 + align_up(count as u64, 4) as usize;

        let mut items = Vec::with_capacity(count);
        for (i, &tag) in types.iter().enumerate() {
            let ty = NodeType::try_from(tag)?;
            items.push(self.node(ty, values + 4 * i, depth + 1)?);
        }
        Ok(TableNode::Array(items))
    }

    fn dictionary(&self, offset: usize, depth: usize) -> Result<TableNode> {
        let (mut c, count) = self.container_header(offset, NodeType::Dictionary)?;

        let mut seen = HashSet::with_capacity(count);
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let entry = c.position();
            let key_index = c.u24()? as usize;
            let ty = NodeType::try_from(c.u8()?)?;
            c.skip(4)?;

            let key = self
                .keys
                .get(key_index)
                .ok_or(Error::UnresolvedReference("BYML key index out of range"))?;
            if !seen.insert(key.as_str()) {
                return Err(Error::MalformedHeader("duplicate BYML dictionary key"));
            }
            entries.push((key.clone(), self.node(ty, entry + 4, depth + 1)?));
        }
        Ok(TableNode::Dictionary(entries))
    }

    fn string_table(&self, offset: usize) -> Result<Vec<String>> {
        let (_, count) = self.container_header(offset, NodeType::StringTable)?;
        (0..count)
            .map(|i| {
                let rel = self.u32_at(offset + 4 + 4 * i)? as usize;
                self.r.cstring_at(offset + rel)
            })
            .collect()
    }
}
