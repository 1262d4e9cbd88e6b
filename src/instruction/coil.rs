use crate::block::{BlockRange, IndirectBlockRange, RangeRef};
use crate::context::ScanContext;
use crate::error::Result;
use crate::system::Fault;
use crate::tag::{Tag, TagType, Value};

/// Destination of a coil: one tag or a whole range.
#[derive(Debug, Clone, PartialEq)]
pub enum CoilTarget {
    Tag(Tag),
    Range(RangeRef),
}

impl From<Tag> for CoilTarget {
    fn from(tag: Tag) -> Self {
        CoilTarget::Tag(tag)
    }
}

impl From<&Tag> for CoilTarget {
    fn from(tag: &Tag) -> Self {
        CoilTarget::Tag(tag.clone())
    }
}

impl From<BlockRange> for CoilTarget {
    fn from(range: BlockRange) -> Self {
        CoilTarget::Range(range.into())
    }
}

impl From<IndirectBlockRange> for CoilTarget {
    fn from(range: IndirectBlockRange) -> Self {
        CoilTarget::Range(range.into())
    }
}

impl CoilTarget {
    fn expect_bool(&self) -> Result<()> {
        match self {
            CoilTarget::Tag(tag) => tag.expect_type(&[TagType::Bool], "BOOL"),
            CoilTarget::Range(range) => range.expect_type(&[TagType::Bool], "BOOL"),
        }
    }

    /// Tags to drive this scan; `None` after raising the address fault.
    fn resolve(&self, ctx: &mut ScanContext) -> Result<Option<Vec<Tag>>> {
        match self {
            CoilTarget::Tag(tag) => Ok(Some(vec![tag.clone()])),
            CoilTarget::Range(range) => match range.resolve(ctx)? {
                Some(resolved) => Ok(Some(resolved.tags())),
                None => {
                    ctx.set_fault(Fault::AddressError);
                    Ok(None)
                }
            },
        }
    }

    fn drive(&self, ctx: &mut ScanContext, value: bool) -> Result<()> {
        if let Some(tags) = self.resolve(ctx)? {
            for tag in &tags {
                ctx.write(tag, Value::Bool(value));
            }
        }
        Ok(())
    }
}

/// Follows the rung: true while enabled, false otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Out {
    pub target: CoilTarget,
}

impl Out {
    pub fn new<T: Into<CoilTarget>>(target: T) -> Result<Self> {
        let target = target.into();
        target.expect_bool()?;
        Ok(Out { target })
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext, enabled: bool) -> Result<()> {
        self.target.drive(ctx, enabled)
    }
}

/// Sets its target and never clears it.
#[derive(Debug, Clone, PartialEq)]
pub struct Latch {
    pub target: CoilTarget,
}

impl Latch {
    pub fn new<T: Into<CoilTarget>>(target: T) -> Result<Self> {
        let target = target.into();
        target.expect_bool()?;
        Ok(Latch { target })
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext) -> Result<()> {
        self.target.drive(ctx, true)
    }
}

/// Writes every target tag's declared default. Works on any type.
#[derive(Debug, Clone, PartialEq)]
pub struct Reset {
    pub target: CoilTarget,
}

impl Reset {
    pub fn new<T: Into<CoilTarget>>(target: T) -> Result<Self> {
        Ok(Reset {
            target: target.into(),
        })
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext) -> Result<()> {
        if let Some(tags) = self.target.resolve(ctx)? {
            for tag in &tags {
                ctx.write(tag, tag.default.clone());
            }
        }
        Ok(())
    }
}
