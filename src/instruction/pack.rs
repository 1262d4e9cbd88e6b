//! Bit-level packing between BOOL/word ranges and numeric tags.
//!
//! Patterns are raw: a REAL takes or gives its IEEE-754 bits, never a
//! numeric cast. In the 32-bit word forms the first element is the low word.

use crate::block::{BlockRange, RangeRef, TagRef};
use crate::context::ScanContext;
use crate::error::{LadderError, Result};
use crate::system::Fault;
use crate::tag::{Tag, TagType, Value};

use super::copy::parse_signed_decimal;

const PACKABLE: [TagType; 4] = [TagType::Int, TagType::Dint, TagType::Word, TagType::Real];
const WIDE: [TagType; 2] = [TagType::Dint, TagType::Real];
const NARROW: [TagType; 2] = [TagType::Int, TagType::Word];

/// Raw bit pattern of a value stored in a tag of type `ty`.
pub fn pattern_of(value: &Value, ty: TagType) -> Option<u32> {
    Some(match ty {
        TagType::Bool => value.is_truthy() as u32,
        TagType::Int | TagType::Word => value.as_i64()? as u16 as u32,
        TagType::Dint => value.as_i64()? as i32 as u32,
        TagType::Real => (value.as_f64()? as f32).to_bits(),
        TagType::Char => return None,
    })
}

/// Value of type `ty` whose raw pattern is `bits`. `None` for patterns the
/// type cannot hold (non-finite REAL).
pub fn value_of(bits: u32, ty: TagType) -> Option<Value> {
    Some(match ty {
        TagType::Bool => Value::Bool(bits & 1 == 1),
        TagType::Int => Value::Int(bits as u16 as i16 as i64),
        TagType::Word => Value::Int(bits as u16 as i64),
        TagType::Dint => Value::Int(bits as i32 as i64),
        TagType::Real => {
            let x = f32::from_bits(bits);
            if !x.is_finite() {
                return None;
            }
            Value::Real(x as f64)
        }
        TagType::Char => return None,
    })
}

fn width_of(ty: TagType) -> usize {
    ty.bit_width().unwrap_or(0) as usize
}

fn check_static_len(range: &RangeRef, max: usize, exact: bool) -> Result<()> {
    match range.static_len() {
        Some(found) if found > max || (exact && found != max) => {
            Err(LadderError::LengthMismatch { expected: max, found })
        }
        _ => Ok(()),
    }
}

/// Resolves a range and a tag, raising the address fault on failure.
fn resolve_pair(
    range: &RangeRef,
    tag: &TagRef,
    ctx: &mut ScanContext,
) -> Result<Option<(BlockRange, Tag)>> {
    let resolved = range.resolve(ctx)?;
    match (resolved, tag.resolve(ctx)) {
        (Some(range), Some(tag)) => Ok(Some((range, tag))),
        _ => {
            ctx.set_fault(Fault::AddressError);
            Ok(None)
        }
    }
}

fn write_pattern(ctx: &mut ScanContext, tag: &Tag, bits: u32) {
    match value_of(bits, tag.tag_type) {
        Some(value) => ctx.write(tag, value),
        None => ctx.set_fault(Fault::OutOfRange),
    }
}

/// BOOL range into one numeric tag, first element as bit 0.
#[derive(Debug, Clone, PartialEq)]
pub struct PackBits {
    pub bits: RangeRef,
    pub target: TagRef,
}

impl PackBits {
    pub fn new<R: Into<RangeRef>, T: Into<TagRef>>(bits: R, target: T) -> Result<Self> {
        let (bits, target) = (bits.into(), target.into());
        bits.expect_type(&[TagType::Bool], "BOOL")?;
        target.expect_type(&PACKABLE, "INT, DINT, WORD or REAL")?;
        check_static_len(&bits, width_of(target.tag_type()), false)?;
        Ok(PackBits { bits, target })
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext) -> Result<()> {
        let Some((bits, target)) = resolve_pair(&self.bits, &self.target, ctx)? else {
            return Ok(());
        };
        if bits.len() > width_of(target.tag_type) {
            ctx.set_fault(Fault::OutOfRange);
            return Ok(());
        }
        let pattern = bits
            .tags()
            .iter()
            .enumerate()
            .filter(|(_, tag)| ctx.read_bool(tag))
            .fold(0u32, |acc, (i, _)| acc | (1 << i));
        write_pattern(ctx, &target, pattern);
        Ok(())
    }
}

/// Two 16-bit words into a DINT or REAL, low word first.
#[derive(Debug, Clone, PartialEq)]
pub struct PackWords {
    pub words: RangeRef,
    pub target: TagRef,
}

impl PackWords {
    pub fn new<R: Into<RangeRef>, T: Into<TagRef>>(words: R, target: T) -> Result<Self> {
        let (words, target) = (words.into(), target.into());
        words.expect_type(&NARROW, "INT or WORD")?;
        target.expect_type(&WIDE, "DINT or REAL")?;
        check_static_len(&words, 2, true)?;
        Ok(PackWords { words, target })
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext) -> Result<()> {
        let Some((words, target)) = resolve_pair(&self.words, &self.target, ctx)? else {
            return Ok(());
        };
        let tags = words.tags();
        if tags.len() != 2 {
            ctx.set_fault(Fault::OutOfRange);
            return Ok(());
        }
        let word = |tag: &Tag| pattern_of(&ctx.read(tag), tag.tag_type).unwrap_or(0) & 0xFFFF;
        let pattern = word(&tags[0]) | (word(&tags[1]) << 16);
        write_pattern(ctx, &target, pattern);
        Ok(())
    }
}

/// One numeric tag into a BOOL range, bit 0 into the first element.
#[derive(Debug, Clone, PartialEq)]
pub struct UnpackToBits {
    pub source: TagRef,
    pub bits: RangeRef,
}

impl UnpackToBits {
    pub fn new<S: Into<TagRef>, R: Into<RangeRef>>(source: S, bits: R) -> Result<Self> {
        let (source, bits) = (source.into(), bits.into());
        source.expect_type(&PACKABLE, "INT, DINT, WORD or REAL")?;
        bits.expect_type(&[TagType::Bool], "BOOL")?;
        check_static_len(&bits, width_of(source.tag_type()), false)?;
        Ok(UnpackToBits { source, bits })
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext) -> Result<()> {
        let Some((bits, source)) = resolve_pair(&self.bits, &self.source, ctx)? else {
            return Ok(());
        };
        if bits.len() > width_of(source.tag_type) {
            ctx.set_fault(Fault::OutOfRange);
            return Ok(());
        }
        let Some(pattern) = pattern_of(&ctx.read(&source), source.tag_type) else {
            ctx.set_fault(Fault::OutOfRange);
            return Ok(());
        };
        for (i, tag) in bits.tags().iter().enumerate() {
            ctx.write(tag, Value::Bool((pattern >> i) & 1 == 1));
        }
        Ok(())
    }
}

/// A DINT or REAL into two 16-bit words, low word first.
#[derive(Debug, Clone, PartialEq)]
pub struct UnpackToWords {
    pub source: TagRef,
    pub words: RangeRef,
}

impl UnpackToWords {
    pub fn new<S: Into<TagRef>, R: Into<RangeRef>>(source: S, words: R) -> Result<Self> {
        let (source, words) = (source.into(), words.into());
        source.expect_type(&WIDE, "DINT or REAL")?;
        words.expect_type(&NARROW, "INT or WORD")?;
        check_static_len(&words, 2, true)?;
        Ok(UnpackToWords { source, words })
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext) -> Result<()> {
        let Some((words, source)) = resolve_pair(&self.words, &self.source, ctx)? else {
            return Ok(());
        };
        let tags = words.tags();
        if tags.len() != 2 {
            ctx.set_fault(Fault::OutOfRange);
            return Ok(());
        }
        let Some(pattern) = pattern_of(&ctx.read(&source), source.tag_type) else {
            ctx.set_fault(Fault::OutOfRange);
            return Ok(());
        };
        for (tag, half) in tags.iter().zip([pattern & 0xFFFF, pattern >> 16]) {
            write_pattern(ctx, tag, half);
        }
        Ok(())
    }
}

/// Parses the text held by a CHAR range into a numeric tag.
///
/// INT and DINT take an optional sign and decimal digits, WORD takes hex
/// digits, REAL takes a decimal float that fits binary32.
#[derive(Debug, Clone, PartialEq)]
pub struct PackText {
    pub source: RangeRef,
    pub target: TagRef,
}

pub(crate) fn parse_text(text: &str, ty: TagType) -> Option<Value> {
    match ty {
        TagType::Int | TagType::Dint => {
            let n = parse_signed_decimal(text)?;
            let (lo, hi) = ty.bounds()?;
            (lo..=hi).contains(&n).then_some(Value::Int(n))
        }
        TagType::Word => {
            if text.is_empty() || text.len() > 4 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            u16::from_str_radix(text, 16).ok().map(|n| Value::Int(n as i64))
        }
        TagType::Real => {
            let grammar = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E');
            if text.is_empty() || !text.chars().all(grammar) {
                return None;
            }
            let x = text.parse::<f32>().ok()?;
            x.is_finite().then_some(Value::Real(x as f64))
        }
        TagType::Bool | TagType::Char => None,
    }
}

impl PackText {
    pub fn new<R: Into<RangeRef>, T: Into<TagRef>>(source: R, target: T) -> Result<Self> {
        let (source, target) = (source.into(), target.into());
        source.expect_type(&[TagType::Char], "CHAR")?;
        target.expect_type(&PACKABLE, "INT, DINT, WORD or REAL")?;
        Ok(PackText { source, target })
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext) -> Result<()> {
        let Some((source, target)) = resolve_pair(&self.source, &self.target, ctx)? else {
            return Ok(());
        };
        let text: String = source
            .tags()
            .iter()
            .filter_map(|t| ctx.read(t).as_text().map(str::to_owned))
            .collect();
        match parse_text(&text, target.tag_type) {
            Some(value) => ctx.write(&target, value),
            None => ctx.set_fault(Fault::OutOfRange),
        }
        Ok(())
    }
}
