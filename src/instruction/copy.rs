//! COPY, BLOCKCOPY and FILL.
//!
//! All three follow the copy store law (clamp into the destination domain).
//! Every write of one execution is staged first: a parse, width or pointer
//! failure anywhere aborts the whole instruction and only raises a fault.

use crate::block::{BlockRange, IndirectBlockRange, IndirectRef, RangeRef, TagRef};
use crate::context::ScanContext;
use crate::error::{LadderError, Result};
use crate::expression::Expression;
use crate::system::Fault;
use crate::tag::{Tag, TagType, Value};

/// Conversion applied between CHAR cells and numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyModifier {
    /// CHAR digit to its value; CHAR range to a signed decimal integer.
    AsValue,
    /// CHAR to its ASCII code.
    AsAscii,
    /// Number to decimal text (hex for WORD) spread over a CHAR range.
    AsText { suppress_zero: bool },
    /// ASCII code to CHAR.
    AsBinary,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CopySource {
    Value(Expression),
    Range(RangeRef),
}

impl From<Expression> for CopySource {
    fn from(expr: Expression) -> Self {
        CopySource::Value(expr)
    }
}

impl From<Tag> for CopySource {
    fn from(tag: Tag) -> Self {
        CopySource::Value(tag.into())
    }
}

impl From<&Tag> for CopySource {
    fn from(tag: &Tag) -> Self {
        CopySource::Value(tag.into())
    }
}

impl From<IndirectRef> for CopySource {
    fn from(r: IndirectRef) -> Self {
        CopySource::Value(r.into())
    }
}

impl From<i64> for CopySource {
    fn from(value: i64) -> Self {
        CopySource::Value(value.into())
    }
}

impl From<i32> for CopySource {
    fn from(value: i32) -> Self {
        CopySource::Value(value.into())
    }
}

impl From<f64> for CopySource {
    fn from(value: f64) -> Self {
        CopySource::Value(value.into())
    }
}

impl From<&str> for CopySource {
    fn from(value: &str) -> Self {
        CopySource::Value(value.into())
    }
}

impl From<BlockRange> for CopySource {
    fn from(range: BlockRange) -> Self {
        CopySource::Range(range.into())
    }
}

impl From<IndirectBlockRange> for CopySource {
    fn from(range: IndirectBlockRange) -> Self {
        CopySource::Range(range.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CopyTarget {
    Tag(TagRef),
    Range(RangeRef),
}

impl From<Tag> for CopyTarget {
    fn from(tag: Tag) -> Self {
        CopyTarget::Tag(tag.into())
    }
}

impl From<&Tag> for CopyTarget {
    fn from(tag: &Tag) -> Self {
        CopyTarget::Tag(tag.into())
    }
}

impl From<IndirectRef> for CopyTarget {
    fn from(r: IndirectRef) -> Self {
        CopyTarget::Tag(r.into())
    }
}

impl From<BlockRange> for CopyTarget {
    fn from(range: BlockRange) -> Self {
        CopyTarget::Range(range.into())
    }
}

impl From<IndirectBlockRange> for CopyTarget {
    fn from(range: IndirectBlockRange) -> Self {
        CopyTarget::Range(range.into())
    }
}

type Staged = std::result::Result<Vec<(Tag, Value)>, Fault>;

fn commit_staged(ctx: &mut ScanContext, staged: Staged) {
    match staged {
        Ok(writes) => {
            for (tag, value) in &writes {
                ctx.write(tag, value.clone());
            }
        }
        Err(fault) => ctx.set_fault(fault),
    }
}

fn store(tag: &Tag, value: &Value) -> std::result::Result<(Tag, Value), Fault> {
    tag.tag_type
        .store_copy(value)
        .map(|stored| (tag.clone(), stored))
        .ok_or(Fault::OutOfRange)
}

/// Stores an integer produced by a conversion; values outside the
/// destination domain are a width failure rather than a clamp.
fn store_exact(tag: &Tag, value: i64) -> std::result::Result<(Tag, Value), Fault> {
    if let Some((lo, hi)) = tag.tag_type.bounds() {
        if value < lo || value > hi {
            return Err(Fault::OutOfRange);
        }
    }
    store(tag, &Value::Int(value))
}

fn resolve_tag(target: &TagRef, ctx: &ScanContext) -> std::result::Result<Tag, Fault> {
    target.resolve(ctx).ok_or(Fault::AddressError)
}

fn resolve_range(
    range: &RangeRef,
    ctx: &ScanContext,
) -> Result<std::result::Result<BlockRange, Fault>> {
    Ok(range.resolve(ctx)?.ok_or(Fault::AddressError))
}

fn read_text(range: &BlockRange, ctx: &ScanContext) -> String {
    range
        .tags()
        .iter()
        .filter_map(|t| ctx.read(t).as_text().map(str::to_owned))
        .collect()
}

fn char_digit(value: &Value) -> std::result::Result<i64, Fault> {
    match value.as_text().and_then(|s| s.chars().next()) {
        Some(c) if c.is_ascii_digit() => Ok(c as i64 - '0' as i64),
        _ => Err(Fault::OutOfRange),
    }
}

fn char_code(value: &Value) -> std::result::Result<i64, Fault> {
    match value.as_text().and_then(|s| s.chars().next()) {
        Some(c) if c.is_ascii() => Ok(c as i64),
        _ => Err(Fault::OutOfRange),
    }
}

fn code_char(value: &Value) -> std::result::Result<Value, Fault> {
    match value.as_i64() {
        Some(code @ 0..=127) => Ok(Value::Char(((code as u8) as char).to_string())),
        _ => Err(Fault::OutOfRange),
    }
}

/// Optional sign followed by at least one decimal digit, nothing else.
pub(crate) fn parse_signed_decimal(text: &str) -> Option<i64> {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<i64>().ok()
}

/// Decimal rendering of a number for a CHAR range. WORD renders as hex.
/// Without `suppress_zero` integers are zero padded to the type's width.
fn render_text(value: &Value, source_type: Option<TagType>, suppress_zero: bool) -> Option<String> {
    let ty = match (source_type, value) {
        (Some(ty), _) if ty.is_numeric() || ty == TagType::Bool => ty,
        (_, Value::Real(_)) => TagType::Real,
        (_, Value::Bool(_)) => TagType::Bool,
        (_, Value::Int(_)) => TagType::Dint,
        _ => return None,
    };
    if ty == TagType::Real {
        let x = value.as_f64()?;
        if !x.is_finite() {
            return None;
        }
        return Some(format!("{}", x as f32));
    }
    let n = value.as_i64()?;
    let (width, hex) = match ty {
        TagType::Bool => (1, false),
        TagType::Int => (5, false),
        TagType::Word => (4, true),
        _ => (10, false),
    };
    if hex {
        if !(0..=0xFFFF).contains(&n) {
            return None;
        }
        return Some(if suppress_zero {
            format!("{:X}", n)
        } else {
            format!("{:0width$X}", n, width = width)
        });
    }
    let digits = if suppress_zero {
        n.unsigned_abs().to_string()
    } else {
        format!("{:0width$}", n.unsigned_abs(), width = width)
    };
    Some(if n < 0 { format!("-{}", digits) } else { digits })
}

fn is_text(expr: &Expression) -> bool {
    expr.static_type() == Some(TagType::Char)
}

/// Copies one value into one tag, or text into a CHAR range.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleCopy {
    pub source: CopySource,
    pub target: CopyTarget,
    pub modifier: Option<CopyModifier>,
}

impl SingleCopy {
    pub fn new<S: Into<CopySource>, T: Into<CopyTarget>>(source: S, target: T) -> Result<Self> {
        SingleCopy::build(source.into(), target.into(), None)
    }

    pub fn converted<S: Into<CopySource>, T: Into<CopyTarget>>(
        source: S,
        target: T,
        modifier: CopyModifier,
    ) -> Result<Self> {
        SingleCopy::build(source.into(), target.into(), Some(modifier))
    }

    fn build(
        source: CopySource,
        target: CopyTarget,
        modifier: Option<CopyModifier>,
    ) -> Result<Self> {
        let target_type = match &target {
            CopyTarget::Tag(t) => t.tag_type(),
            CopyTarget::Range(r) => r.tag_type(),
        };
        let char_target = target_type == TagType::Char;
        let valid = match (&source, &target, modifier) {
            (CopySource::Value(e), CopyTarget::Tag(_), None) => {
                if char_target { is_text(e) } else { e.is_numeric() }
            }
            (CopySource::Value(e), CopyTarget::Range(_), None) => char_target && is_text(e),
            (CopySource::Value(e), CopyTarget::Tag(_), Some(CopyModifier::AsValue)) => {
                is_text(e) && !char_target
            }
            (CopySource::Range(r), CopyTarget::Tag(_), Some(CopyModifier::AsValue)) => {
                r.tag_type() == TagType::Char && target_type.is_integer()
            }
            (CopySource::Value(e), CopyTarget::Tag(_), Some(CopyModifier::AsAscii)) => {
                is_text(e) && target_type.is_numeric()
            }
            (CopySource::Value(e), CopyTarget::Range(_), Some(CopyModifier::AsText { .. })) => {
                e.is_numeric() && char_target
            }
            (CopySource::Value(e), CopyTarget::Tag(_), Some(CopyModifier::AsBinary)) => {
                e.is_numeric() && char_target
            }
            _ => false,
        };
        if !valid {
            return Err(LadderError::invalid(format!(
                "copy cannot convert this source into {} with {:?}",
                target_type, modifier
            )));
        }
        Ok(SingleCopy {
            source,
            target,
            modifier,
        })
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext) -> Result<()> {
        let staged = self.stage(ctx)?;
        commit_staged(ctx, staged);
        Ok(())
    }

    fn stage(&self, ctx: &ScanContext) -> Result<Staged> {
        let value = match &self.source {
            CopySource::Value(expr) => match expr.evaluate(ctx) {
                Ok(v) => v,
                Err(e) => return Ok(Err(e.fault())),
            },
            CopySource::Range(range) => match resolve_range(range, ctx)? {
                Ok(resolved) => Value::Char(read_text(&resolved, ctx)),
                Err(fault) => return Ok(Err(fault)),
            },
        };

        let staged = match &self.target {
            CopyTarget::Tag(target) => {
                resolve_tag(target, ctx).and_then(|tag| self.convert_scalar(&tag, &value))
                    .map(|write| vec![write])
            }
            CopyTarget::Range(range) => match resolve_range(range, ctx)? {
                Ok(resolved) => self.spread_text(&resolved, &value),
                Err(fault) => Err(fault),
            },
        };
        Ok(staged)
    }

    fn convert_scalar(&self, tag: &Tag, value: &Value) -> std::result::Result<(Tag, Value), Fault> {
        match self.modifier {
            None => store(tag, value),
            Some(CopyModifier::AsValue) => {
                let n = match &self.source {
                    CopySource::Range(_) => {
                        value.as_text().and_then(parse_signed_decimal).ok_or(Fault::OutOfRange)?
                    }
                    CopySource::Value(_) => char_digit(value)?,
                };
                store_exact(tag, n)
            }
            Some(CopyModifier::AsAscii) => store_exact(tag, char_code(value)?),
            Some(CopyModifier::AsBinary) => store(tag, &code_char(value)?),
            Some(CopyModifier::AsText { .. }) => Err(Fault::OutOfRange),
        }
    }

    fn spread_text(&self, range: &BlockRange, value: &Value) -> Staged {
        let tags = range.tags();
        match self.modifier {
            Some(CopyModifier::AsText { suppress_zero }) => {
                let source_type = match &self.source {
                    CopySource::Value(e) => e.static_type(),
                    CopySource::Range(_) => None,
                };
                let text =
                    render_text(value, source_type, suppress_zero).ok_or(Fault::OutOfRange)?;
                if text.len() > tags.len() {
                    return Err(Fault::OutOfRange);
                }
                Ok(tags
                    .into_iter()
                    .zip(text.chars())
                    .map(|(tag, c)| (tag, Value::Char(c.to_string())))
                    .collect())
            }
            _ => {
                let text = value.as_text().ok_or(Fault::OutOfRange)?;
                if !text.is_ascii() || text.len() > tags.len() {
                    return Err(Fault::OutOfRange);
                }
                let mut chars = text.chars();
                Ok(tags
                    .into_iter()
                    .map(|tag| {
                        let cell = chars.next().map(String::from).unwrap_or_default();
                        (tag, Value::Char(cell))
                    })
                    .collect())
            }
        }
    }
}

/// Element-wise copy between two ranges of the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockCopy {
    pub source: RangeRef,
    pub target: RangeRef,
    pub modifier: Option<CopyModifier>,
}

impl BlockCopy {
    pub fn new<S: Into<RangeRef>, T: Into<RangeRef>>(source: S, target: T) -> Result<Self> {
        BlockCopy::build(source.into(), target.into(), None)
    }

    pub fn converted<S: Into<RangeRef>, T: Into<RangeRef>>(
        source: S,
        target: T,
        modifier: CopyModifier,
    ) -> Result<Self> {
        BlockCopy::build(source.into(), target.into(), Some(modifier))
    }

    fn build(source: RangeRef, target: RangeRef, modifier: Option<CopyModifier>) -> Result<Self> {
        let (src, dst) = (source.tag_type(), target.tag_type());
        let valid = match modifier {
            None => (src == TagType::Char) == (dst == TagType::Char),
            Some(CopyModifier::AsValue) | Some(CopyModifier::AsAscii) => {
                src == TagType::Char && dst.is_numeric()
            }
            Some(CopyModifier::AsBinary) => src.is_numeric() && dst == TagType::Char,
            Some(CopyModifier::AsText { .. }) => false,
        };
        if !valid {
            return Err(LadderError::invalid(format!(
                "blockcopy cannot copy {} into {} with {:?}",
                src, dst, modifier
            )));
        }
        if let (Some(expected), Some(found)) = (source.static_len(), target.static_len()) {
            if expected != found {
                return Err(LadderError::LengthMismatch { expected, found });
            }
        }
        Ok(BlockCopy {
            source,
            target,
            modifier,
        })
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext) -> Result<()> {
        let staged = self.stage(ctx)?;
        commit_staged(ctx, staged);
        Ok(())
    }

    fn stage(&self, ctx: &ScanContext) -> Result<Staged> {
        let source = match resolve_range(&self.source, ctx)? {
            Ok(r) => r,
            Err(fault) => return Ok(Err(fault)),
        };
        let target = match resolve_range(&self.target, ctx)? {
            Ok(r) => r,
            Err(fault) => return Ok(Err(fault)),
        };
        if source.len() != target.len() {
            return Ok(Err(Fault::AddressError));
        }

        let staged = source
            .tags()
            .iter()
            .zip(target.tags())
            .map(|(src, dst)| {
                let value = ctx.read(src);
                match self.modifier {
                    None => store(&dst, &value),
                    Some(CopyModifier::AsValue) => store_exact(&dst, char_digit(&value)?),
                    Some(CopyModifier::AsAscii) => store_exact(&dst, char_code(&value)?),
                    Some(CopyModifier::AsBinary) => store(&dst, &code_char(&value)?),
                    Some(CopyModifier::AsText { .. }) => Err(Fault::OutOfRange),
                }
            })
            .collect();
        Ok(staged)
    }
}

/// Writes one value into every element of a range.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub value: Expression,
    pub target: RangeRef,
}

impl Fill {
    pub fn new<E: Into<Expression>, T: Into<RangeRef>>(value: E, target: T) -> Result<Self> {
        let (value, target) = (value.into(), target.into());
        let valid = if target.tag_type() == TagType::Char {
            is_text(&value)
        } else {
            value.is_numeric()
        };
        if !valid {
            return Err(LadderError::invalid(format!(
                "fill value does not match {} range '{}'",
                target.tag_type(),
                target.block().name
            )));
        }
        Ok(Fill { value, target })
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext) -> Result<()> {
        let value = match self.value.evaluate(ctx) {
            Ok(v) => v,
            Err(e) => {
                ctx.set_fault(e.fault());
                return Ok(());
            }
        };
        let staged = match resolve_range(&self.target, ctx)? {
            Ok(range) => range.tags().iter().map(|tag| store(tag, &value)).collect(),
            Err(fault) => Err(fault),
        };
        commit_staged(ctx, staged);
        Ok(())
    }
}
