use crate::block::{BlockRange, RangeRef};
use crate::condition::CmpOp;
use crate::context::ScanContext;
use crate::error::{LadderError, Result};
use crate::expression::Expression;
use crate::system::Fault;
use crate::tag::{Tag, TagType, Value};

/// What a search looks for.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchCondition {
    /// First element for which `element <op> value` holds.
    Number { op: CmpOp, value: Expression },
    /// First window of `text.len()` cells equal (or not equal) to `text`.
    Text { op: CmpOp, text: String },
}

/// Finds the first matching element of a range and reports its address.
///
/// In continuous mode the result tag doubles as the cursor: `0` restarts,
/// `-1` stays exhausted, any other value resumes strictly past that address.
#[derive(Debug, Clone, PartialEq)]
pub struct Search {
    pub range: RangeRef,
    pub condition: SearchCondition,
    pub result: Tag,
    pub found: Tag,
    pub continuous: bool,
}

impl Search {
    pub fn new<R: Into<RangeRef>>(
        range: R,
        condition: SearchCondition,
        result: &Tag,
        found: &Tag,
    ) -> Result<Self> {
        let range = range.into();
        result.expect_type(&[TagType::Int, TagType::Dint], "INT or DINT")?;
        found.expect_type(&[TagType::Bool], "BOOL")?;
        match &condition {
            SearchCondition::Number { value, .. } => {
                if !range.tag_type().is_numeric() || !value.is_numeric() {
                    return Err(LadderError::invalid(format!(
                        "numeric search needs a numeric range and value, '{}' is {}",
                        range.block().name,
                        range.tag_type()
                    )));
                }
            }
            SearchCondition::Text { op, text } => {
                range.expect_type(&[TagType::Char], "CHAR")?;
                if !op.is_equality() {
                    return Err(LadderError::invalid(format!(
                        "text search only supports == and !=, got {}",
                        op.symbol()
                    )));
                }
                if text.is_empty() || !text.is_ascii() {
                    return Err(LadderError::invalid(
                        "text search needs a non-empty ASCII pattern",
                    ));
                }
            }
        }
        Ok(Search {
            range,
            condition,
            result: result.clone(),
            found: found.clone(),
            continuous: false,
        })
    }

    pub fn continuous(mut self) -> Self {
        self.continuous = true;
        self
    }

    fn report(&self, ctx: &mut ScanContext, address: Option<i64>) {
        ctx.write(&self.result, Value::Int(address.unwrap_or(-1)));
        ctx.write(&self.found, Value::Bool(address.is_some()));
    }

    /// Index in iteration order where this activation starts looking, or
    /// `None` when a continuous search is exhausted.
    fn start_index(&self, range: &BlockRange, ctx: &ScanContext) -> Option<usize> {
        if !self.continuous {
            return Some(0);
        }
        match ctx.read_i64(&self.result) {
            0 => Some(0),
            -1 => None,
            last => {
                let past = |a: &i64| if range.reverse { *a < last } else { *a > last };
                Some(
                    range
                        .addresses
                        .iter()
                        .position(past)
                        .unwrap_or(range.len()),
                )
            }
        }
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext) -> Result<()> {
        let Some(range) = self.range.resolve(ctx)? else {
            ctx.set_fault(Fault::AddressError);
            return Ok(());
        };
        let Some(start) = self.start_index(&range, ctx) else {
            self.report(ctx, None);
            return Ok(());
        };
        let tags = range.tags();

        let hit = match &self.condition {
            SearchCondition::Number { op, value } => {
                let wanted = match value.evaluate(ctx) {
                    Ok(v) => v,
                    Err(e) => {
                        ctx.set_fault(e.fault());
                        return Ok(());
                    }
                };
                (start..tags.len())
                    .find(|&i| op.apply(&ctx.read(&tags[i]), &wanted) == Some(true))
            }
            SearchCondition::Text { op, text } => {
                let width = text.len();
                let cells: Vec<Value> = tags.iter().map(|t| ctx.read(t)).collect();
                let window_matches = |i: usize| {
                    text.chars().enumerate().all(|(k, c)| {
                        cells[i + k].as_text().and_then(|s| s.chars().next()) == Some(c)
                    })
                };
                let last_start = tags.len().checked_sub(width);
                last_start.and_then(|last| {
                    (start..=last).find(|&i| window_matches(i) == (*op == CmpOp::Eq))
                })
            }
        };
        self.report(ctx, hit.map(|i| range.addresses[i]));
        Ok(())
    }
}
