//! Typed memory blocks and the ways instructions address them.
//!
//! Addresses are 1-based. A block may declare `valid_ranges` to model sparse
//! hardware: addresses outside every window do not exist, whatever
//! `start..=end` says.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::context::ScanContext;
use crate::error::{LadderError, Result};
use crate::expression::Expression;
use crate::tag::{Tag, TagType, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IoDirection {
    Input,
    Output,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub name: String,
    pub tag_type: TagType,
    pub start: i64,
    pub end: i64,
    pub valid_ranges: Option<Arc<[(i64, i64)]>>,
    pub direction: Option<IoDirection>,
    pub retentive: bool,
    pub default: Value,
    cache: Arc<Mutex<BTreeMap<i64, Tag>>>,
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.tag_type == other.tag_type
            && self.start == other.start
            && self.end == other.end
            && self.valid_ranges == other.valid_ranges
    }
}

impl Block {
    pub fn new<S: Into<String>>(name: S, tag_type: TagType, start: i64, end: i64) -> Result<Self> {
        let name = name.into();
        if start > end {
            return Err(LadderError::InvalidRange {
                block: name,
                start,
                end,
            });
        }
        Ok(Block {
            name,
            tag_type,
            start,
            end,
            valid_ranges: None,
            direction: None,
            retentive: tag_type.default_retentive(),
            default: tag_type.default_value(),
            cache: Arc::new(Mutex::new(BTreeMap::new())),
        })
    }

    /// Restricts the block to the given inclusive windows.
    pub fn with_valid_ranges(mut self, ranges: &[(i64, i64)]) -> Result<Self> {
        let mut windows = ranges.to_vec();
        windows.sort_unstable();
        for (i, &(lo, hi)) in windows.iter().enumerate() {
            if lo > hi {
                return Err(LadderError::InvalidRange {
                    block: self.name.clone(),
                    start: lo,
                    end: hi,
                });
            }
            if lo < self.start || hi > self.end {
                return Err(LadderError::AddressOutOfBlock {
                    block: self.name.clone(),
                    address: if lo < self.start { lo } else { hi },
                });
            }
            if i > 0 && windows[i - 1].1 >= lo {
                return Err(LadderError::invalid(format!(
                    "overlapping valid ranges on block '{}'",
                    self.name
                )));
            }
        }
        self.valid_ranges = Some(windows.into());
        Ok(self)
    }

    pub fn with_direction(mut self, direction: IoDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_retentive(mut self, retentive: bool) -> Self {
        self.retentive = retentive;
        self
    }

    pub fn contains(&self, address: i64) -> bool {
        if address < self.start || address > self.end {
            return false;
        }
        match &self.valid_ranges {
            Some(windows) => windows.iter().any(|&(lo, hi)| lo <= address && address <= hi),
            None => true,
        }
    }

    /// Runtime pointer resolution. `None` is the address-error fault path.
    pub fn resolve_indirect(&self, pointer: i64) -> Option<i64> {
        self.contains(pointer).then_some(pointer)
    }

    pub fn tag_name(&self, address: i64) -> String {
        format!("{}{}", self.name, address)
    }

    /// Authoring-time element access.
    pub fn get(&self, address: i64) -> Result<Tag> {
        if !self.contains(address) {
            return Err(LadderError::AddressOutOfBlock {
                block: self.name.clone(),
                address,
            });
        }
        Ok(self.tag_at(address))
    }

    /// Materializes (or fetches from the cache) the tag backing a valid address.
    pub(crate) fn tag_at(&self, address: i64) -> Tag {
        let make = || Tag {
            name: self.tag_name(address),
            tag_type: self.tag_type,
            default: self.default.clone(),
            retentive: self.retentive,
        };
        match self.cache.lock() {
            Ok(mut cache) => cache.entry(address).or_insert_with(make).clone(),
            Err(_) => make(),
        }
    }

    /// Valid addresses within `start..=end`, ascending.
    pub fn addresses_between(&self, start: i64, end: i64) -> Vec<i64> {
        (start.max(self.start)..=end.min(self.end))
            .filter(|a| self.contains(*a))
            .collect()
    }

    pub fn select(&self, start: i64, end: i64) -> Result<BlockRange> {
        if start > end {
            return Err(LadderError::InvalidRange {
                block: self.name.clone(),
                start,
                end,
            });
        }
        for bound in [start, end] {
            if bound < self.start || bound > self.end {
                return Err(LadderError::AddressOutOfBlock {
                    block: self.name.clone(),
                    address: bound,
                });
            }
        }
        Ok(BlockRange {
            block: self.clone(),
            addresses: self.addresses_between(start, end),
            reverse: false,
        })
    }

    pub fn all(&self) -> BlockRange {
        BlockRange {
            block: self.clone(),
            addresses: self.addresses_between(self.start, self.end),
            reverse: false,
        }
    }

    pub fn at<E: Into<Expression>>(&self, pointer: E) -> IndirectRef {
        IndirectRef {
            block: self.clone(),
            pointer: pointer.into(),
        }
    }

    pub fn select_indirect<S: Into<Expression>, E: Into<Expression>>(
        &self,
        start: S,
        end: E,
    ) -> IndirectBlockRange {
        IndirectBlockRange {
            block: self.clone(),
            start: start.into(),
            end: end.into(),
            reverse: false,
        }
    }
}

/// Resolved, ordered addresses of one block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockRange {
    pub block: Block,
    /// Addresses in iteration order (already reversed when `reverse` is set).
    pub addresses: Vec<i64>,
    pub reverse: bool,
}

impl BlockRange {
    pub fn reverse(mut self) -> Self {
        self.addresses.reverse();
        self.reverse = !self.reverse;
        self
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn tag_type(&self) -> TagType {
        self.block.tag_type
    }

    pub fn tags(&self) -> Vec<Tag> {
        self.addresses.iter().map(|a| self.block.tag_at(*a)).collect()
    }
}

/// One element of a block chosen by a runtime pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectRef {
    pub block: Block,
    pub pointer: Expression,
}

impl IndirectRef {
    /// `None` when the pointer cannot be evaluated or lands outside the block.
    pub fn resolve(&self, ctx: &ScanContext) -> Option<Tag> {
        let pointer = self.pointer.evaluate(ctx).ok()?.as_i64()?;
        self.block
            .resolve_indirect(pointer)
            .map(|address| self.block.tag_at(address))
    }
}

/// A range whose bounds are computed every scan.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectBlockRange {
    pub block: Block,
    pub start: Expression,
    pub end: Expression,
    pub reverse: bool,
}

impl IndirectBlockRange {
    pub fn reverse(mut self) -> Self {
        self.reverse = !self.reverse;
        self
    }

    /// `Ok(None)` is the address-error fault path (unreadable or out-of-block
    /// bounds). Bounds in the wrong order are a programming mistake and fail.
    pub fn resolve(&self, ctx: &ScanContext) -> Result<Option<BlockRange>> {
        let bound = |e: &Expression| e.evaluate(ctx).ok().and_then(|v| v.as_i64());
        let (Some(start), Some(end)) = (bound(&self.start), bound(&self.end)) else {
            return Ok(None);
        };
        if start > end {
            return Err(LadderError::InvalidRange {
                block: self.block.name.clone(),
                start,
                end,
            });
        }
        if start < self.block.start || end > self.block.end {
            return Ok(None);
        }
        let mut addresses = self.block.addresses_between(start, end);
        if self.reverse {
            addresses.reverse();
        }
        Ok(Some(BlockRange {
            block: self.block.clone(),
            addresses,
            reverse: self.reverse,
        }))
    }
}

/// Range operand of an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeRef {
    Direct(BlockRange),
    Indirect(IndirectBlockRange),
}

impl From<BlockRange> for RangeRef {
    fn from(range: BlockRange) -> Self {
        RangeRef::Direct(range)
    }
}

impl From<IndirectBlockRange> for RangeRef {
    fn from(range: IndirectBlockRange) -> Self {
        RangeRef::Indirect(range)
    }
}

impl RangeRef {
    pub fn block(&self) -> &Block {
        match self {
            RangeRef::Direct(r) => &r.block,
            RangeRef::Indirect(r) => &r.block,
        }
    }

    pub fn tag_type(&self) -> TagType {
        self.block().tag_type
    }

    /// Length known at authoring time.
    pub fn static_len(&self) -> Option<usize> {
        match self {
            RangeRef::Direct(r) => Some(r.len()),
            RangeRef::Indirect(_) => None,
        }
    }

    pub fn resolve(&self, ctx: &ScanContext) -> Result<Option<BlockRange>> {
        match self {
            RangeRef::Direct(r) => Ok(Some(r.clone())),
            RangeRef::Indirect(r) => r.resolve(ctx),
        }
    }

    pub fn expect_type(&self, allowed: &[TagType], expected: &'static str) -> Result<()> {
        if allowed.contains(&self.tag_type()) {
            Ok(())
        } else {
            Err(LadderError::TagType {
                tag: self.block().name.clone(),
                expected,
                found: self.tag_type(),
            })
        }
    }
}

/// Scalar destination of an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum TagRef {
    Direct(Tag),
    Indirect(IndirectRef),
}

impl From<Tag> for TagRef {
    fn from(tag: Tag) -> Self {
        TagRef::Direct(tag)
    }
}

impl From<&Tag> for TagRef {
    fn from(tag: &Tag) -> Self {
        TagRef::Direct(tag.clone())
    }
}

impl From<IndirectRef> for TagRef {
    fn from(r: IndirectRef) -> Self {
        TagRef::Indirect(r)
    }
}

impl TagRef {
    pub fn tag_type(&self) -> TagType {
        match self {
            TagRef::Direct(t) => t.tag_type,
            TagRef::Indirect(r) => r.block.tag_type,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TagRef::Direct(t) => &t.name,
            TagRef::Indirect(r) => &r.block.name,
        }
    }

    pub fn resolve(&self, ctx: &ScanContext) -> Option<Tag> {
        match self {
            TagRef::Direct(t) => Some(t.clone()),
            TagRef::Indirect(r) => r.resolve(ctx),
        }
    }

    pub fn expect_type(&self, allowed: &[TagType], expected: &'static str) -> Result<()> {
        if allowed.contains(&self.tag_type()) {
            Ok(())
        } else {
            Err(LadderError::TagType {
                tag: self.name().to_owned(),
                expected,
                found: self.tag_type(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sparse() -> Block {
        Block::new("X", TagType::Bool, 1, 816)
            .unwrap()
            .with_valid_ranges(&[(101, 116), (1, 16)])
            .unwrap()
    }

    #[test]
    fn valid_windows_restrict_addresses() {
        let x = sparse();
        assert!(x.contains(16));
        assert!(!x.contains(17));
        assert!(x.contains(101));
        assert_eq!(x.resolve_indirect(50), None);
        assert!(x.get(50).is_err());
        assert_eq!(x.get(3).unwrap().name, "X3");
    }

    #[test]
    fn select_skips_gaps_and_reverses() {
        let x = sparse();
        let range = x.select(15, 102).unwrap();
        assert_eq!(range.addresses, vec![15, 16, 101, 102]);
        let reversed = range.reverse();
        assert_eq!(reversed.addresses, vec![102, 101, 16, 15]);
        assert!(reversed.reverse);
    }

    #[test]
    fn select_rejects_inverted_bounds() {
        let ds = Block::new("DS", TagType::Int, 1, 10).unwrap();
        assert!(matches!(
            ds.select(5, 2),
            Err(LadderError::InvalidRange { .. })
        ));
        assert!(ds.select(0, 2).is_err());
    }

    #[test]
    fn overlapping_windows_are_rejected() {
        let block = Block::new("Y", TagType::Bool, 1, 100).unwrap();
        assert!(block.with_valid_ranges(&[(1, 10), (5, 20)]).is_err());
    }

    #[test]
    fn tags_are_cached() {
        let ds = Block::new("DS", TagType::Int, 1, 10).unwrap();
        let first = ds.get(4).unwrap();
        assert_eq!(ds.get(4).unwrap(), first);
        assert_eq!(first.tag_type, TagType::Int);
    }
}
