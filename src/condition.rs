//! Boolean rung conditions.
//!
//! Conditions are pure: they only read through the [`ScanContext`]. A
//! comparison whose operand cannot be evaluated (bad pointer, division by
//! zero) is simply false.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::block::IndirectRef;
use crate::context::ScanContext;
use crate::error::{LadderError, Result};
use crate::expression::Expression;
use crate::state::prev_key;
use crate::tag::{Tag, TagType, Value};

/// Watched edge tags, mapped to the level an unwritten tag reads as.
pub type EdgeTags = BTreeMap<String, bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn is_equality(self) -> bool {
        matches!(self, CmpOp::Eq | CmpOp::Ne)
    }

    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            CmpOp::Eq => ordering == Ordering::Equal,
            CmpOp::Ne => ordering != Ordering::Equal,
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::Le => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            CmpOp::Ge => ordering != Ordering::Less,
        }
    }

    /// Applies the operator to two values. `None` when they cannot be
    /// compared (text against a number, ordering on text, NaN).
    pub fn apply(self, left: &Value, right: &Value) -> Option<bool> {
        let ordering = match (left, right) {
            (Value::Char(a), Value::Char(b)) => {
                if !self.is_equality() {
                    return None;
                }
                a.cmp(b)
            }
            (Value::Char(_), _) | (_, Value::Char(_)) => return None,
            (Value::Real(_), _) | (_, Value::Real(_)) => {
                left.as_f64()?.partial_cmp(&right.as_f64()?)?
            }
            _ => left.as_i64()?.cmp(&right.as_i64()?),
        };
        Some(self.holds(ordering))
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// BOOL tag is on.
    Bit(Tag),
    /// BOOL tag is off.
    NormallyClosed(Tag),
    /// Numeric tag is non-zero.
    IntTruthy(Tag),
    Compare {
        op: CmpOp,
        left: Tag,
        right: Expression,
    },
    CompareIndirect {
        op: CmpOp,
        left: IndirectRef,
        right: Expression,
    },
    /// Two arithmetic expressions; both sides are numeric.
    CompareExpr {
        op: CmpOp,
        left: Expression,
        right: Expression,
    },
    /// CHAR tag against a text literal, `==` or `!=` only.
    CompareText {
        op: CmpOp,
        left: Tag,
        right: String,
    },
    RisingEdge(Tag),
    FallingEdge(Tag),
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

fn check_comparison(op: CmpOp, left_type: TagType, name: &str, right: &Expression) -> Result<()> {
    if left_type == TagType::Char {
        if !op.is_equality() {
            return Err(LadderError::invalid(format!(
                "ordering comparison '{}' on CHAR tag '{}'",
                op.symbol(),
                name
            )));
        }
        if right.static_type() != Some(TagType::Char) {
            return Err(LadderError::invalid(format!(
                "CHAR tag '{}' can only be compared with text",
                name
            )));
        }
    } else if !right.is_numeric() {
        return Err(LadderError::invalid(format!(
            "{} tag '{}' compared with text",
            left_type, name
        )));
    }
    Ok(())
}

impl Condition {
    pub fn bit(tag: &Tag) -> Result<Self> {
        tag.expect_type(&[TagType::Bool], "BOOL")?;
        Ok(Condition::Bit(tag.clone()))
    }

    pub fn nc(tag: &Tag) -> Result<Self> {
        tag.expect_type(&[TagType::Bool], "BOOL")?;
        Ok(Condition::NormallyClosed(tag.clone()))
    }

    pub fn int_truthy(tag: &Tag) -> Result<Self> {
        tag.expect_type(
            &[TagType::Int, TagType::Dint, TagType::Word, TagType::Real],
            "a numeric type",
        )?;
        Ok(Condition::IntTruthy(tag.clone()))
    }

    pub fn compare<E: Into<Expression>>(op: CmpOp, left: &Tag, right: E) -> Result<Self> {
        let right = right.into();
        check_comparison(op, left.tag_type, &left.name, &right)?;
        Ok(Condition::Compare {
            op,
            left: left.clone(),
            right,
        })
    }

    pub fn compare_indirect<E: Into<Expression>>(
        op: CmpOp,
        left: IndirectRef,
        right: E,
    ) -> Result<Self> {
        let right = right.into();
        check_comparison(op, left.block.tag_type, &left.block.name, &right)?;
        Ok(Condition::CompareIndirect { op, left, right })
    }

    pub fn compare_expr<L: Into<Expression>, R: Into<Expression>>(
        op: CmpOp,
        left: L,
        right: R,
    ) -> Result<Self> {
        let (left, right) = (left.into(), right.into());
        if !left.is_numeric() || !right.is_numeric() {
            return Err(LadderError::invalid(
                "expression comparisons only accept numeric operands",
            ));
        }
        Ok(Condition::CompareExpr { op, left, right })
    }

    pub fn compare_text<S: Into<String>>(op: CmpOp, left: &Tag, text: S) -> Result<Self> {
        left.expect_type(&[TagType::Char], "CHAR")?;
        if !op.is_equality() {
            return Err(LadderError::invalid(format!(
                "text comparison on '{}' only supports == and !=",
                left.name
            )));
        }
        Ok(Condition::CompareText {
            op,
            left: left.clone(),
            right: text.into(),
        })
    }

    pub fn rise(tag: &Tag) -> Result<Self> {
        tag.expect_type(&[TagType::Bool], "BOOL")?;
        Ok(Condition::RisingEdge(tag.clone()))
    }

    pub fn fall(tag: &Tag) -> Result<Self> {
        tag.expect_type(&[TagType::Bool], "BOOL")?;
        Ok(Condition::FallingEdge(tag.clone()))
    }

    pub fn all<I: IntoIterator<Item = Condition>>(conditions: I) -> Self {
        Condition::All(conditions.into_iter().collect())
    }

    pub fn any<I: IntoIterator<Item = Condition>>(conditions: I) -> Self {
        Condition::Any(conditions.into_iter().collect())
    }

    pub fn evaluate(&self, ctx: &ScanContext) -> bool {
        match self {
            Condition::Bit(tag) => ctx.read_bool(tag),
            Condition::NormallyClosed(tag) => !ctx.read_bool(tag),
            Condition::IntTruthy(tag) => ctx.read(tag).is_truthy(),
            Condition::Compare { op, left, right } => {
                compare_with(*op, &ctx.read(left), right, ctx)
            }
            Condition::CompareIndirect { op, left, right } => match left.resolve(ctx) {
                Some(tag) => compare_with(*op, &ctx.read(&tag), right, ctx),
                None => false,
            },
            Condition::CompareExpr { op, left, right } => match left.evaluate(ctx) {
                Ok(value) => compare_with(*op, &value, right, ctx),
                Err(_) => false,
            },
            Condition::CompareText { op, left, right } => {
                let current = ctx.read(left);
                let equal = current.as_text() == Some(right.as_str());
                if *op == CmpOp::Eq { equal } else { !equal }
            }
            Condition::RisingEdge(tag) => {
                ctx.read_bool(tag) && !ctx.memory_bool(&prev_key(&tag.name))
            }
            Condition::FallingEdge(tag) => {
                !ctx.read_bool(tag) && ctx.memory_bool(&prev_key(&tag.name))
            }
            Condition::All(children) => children.iter().all(|c| c.evaluate(ctx)),
            Condition::Any(children) => children.iter().any(|c| c.evaluate(ctx)),
        }
    }

    /// Every tag an edge condition in this tree watches.
    pub fn edge_tags(&self) -> EdgeTags {
        let mut out = EdgeTags::new();
        self.collect_edge_tags(&mut out);
        out
    }

    pub fn collect_edge_tags(&self, out: &mut EdgeTags) {
        match self {
            Condition::RisingEdge(tag) | Condition::FallingEdge(tag) => {
                out.insert(tag.name.clone(), tag.default.is_truthy());
            }
            Condition::All(children) | Condition::Any(children) => {
                for child in children {
                    child.collect_edge_tags(out);
                }
            }
            _ => {}
        }
    }
}

fn compare_with(op: CmpOp, left: &Value, right: &Expression, ctx: &ScanContext) -> bool {
    match right.evaluate(ctx) {
        Ok(value) => op.apply(left, &value).unwrap_or(false),
        Err(_) => false,
    }
}
