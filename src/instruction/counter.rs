//! Level-sensitive counters: the accumulator moves by one on every scan its
//! condition holds, not on edges.

use crate::condition::Condition;
use crate::context::ScanContext;
use crate::error::{LadderError, Result};
use crate::expression::Expression;
use crate::tag::{Tag, TagType, Value};

use super::timer::preset_value;

const DINT_MIN: i64 = i32::MIN as i64;
const DINT_MAX: i64 = i32::MAX as i64;

fn check_counter_tags(done: &Tag, accumulator: &Tag, preset: &Expression) -> Result<()> {
    done.expect_type(&[TagType::Bool], "BOOL")?;
    accumulator.expect_type(&[TagType::Int, TagType::Dint], "INT or DINT")?;
    if !preset.is_numeric() {
        return Err(LadderError::invalid(format!(
            "counter '{}' preset must be numeric",
            accumulator.name
        )));
    }
    Ok(())
}

/// Clears accumulator and done when the reset condition holds. Returns true
/// when the rest of the scan's logic must be skipped.
fn apply_reset(
    reset: &Option<Condition>,
    done: &Tag,
    accumulator: &Tag,
    ctx: &mut ScanContext,
) -> bool {
    match reset {
        Some(reset) if reset.evaluate(ctx) => {
            ctx.write(accumulator, Value::Int(0));
            ctx.write(done, Value::Bool(false));
            true
        }
        _ => false,
    }
}

fn store_accumulator(tag: &Tag, acc: i64, ctx: &mut ScanContext) {
    let value = tag
        .tag_type
        .store_copy(&Value::Int(acc.clamp(DINT_MIN, DINT_MAX)))
        .unwrap_or(Value::Int(0));
    ctx.write(tag, value);
}

/// Counts up while enabled and, optionally, down while `down` holds.
#[derive(Debug, Clone, PartialEq)]
pub struct CountUp {
    pub done: Tag,
    pub accumulator: Tag,
    pub preset: Expression,
    pub down: Option<Condition>,
    pub reset: Option<Condition>,
}

impl CountUp {
    pub fn new<E: Into<Expression>>(done: &Tag, accumulator: &Tag, preset: E) -> Result<Self> {
        let preset = preset.into();
        check_counter_tags(done, accumulator, &preset)?;
        Ok(CountUp {
            done: done.clone(),
            accumulator: accumulator.clone(),
            preset,
            down: None,
            reset: None,
        })
    }

    pub fn down_when(mut self, condition: Condition) -> Self {
        self.down = Some(condition);
        self
    }

    pub fn reset_when(mut self, condition: Condition) -> Self {
        self.reset = Some(condition);
        self
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext, enabled: bool) -> Result<()> {
        if apply_reset(&self.reset, &self.done, &self.accumulator, ctx) {
            return Ok(());
        }
        let mut delta = 0;
        if enabled {
            delta += 1;
        }
        if self.down.as_ref().is_some_and(|c| c.evaluate(ctx)) {
            delta -= 1;
        }
        let acc = (ctx.read_i64(&self.accumulator) + delta).clamp(DINT_MIN, DINT_MAX);
        store_accumulator(&self.accumulator, acc, ctx);
        if let Some(preset) = preset_value(&self.preset, ctx) {
            let acc = ctx.read_i64(&self.accumulator);
            ctx.write(&self.done, Value::Bool(acc >= preset));
        }
        Ok(())
    }
}

/// Counts down from zero; done once the accumulator reaches `-preset`.
#[derive(Debug, Clone, PartialEq)]
pub struct CountDown {
    pub done: Tag,
    pub accumulator: Tag,
    pub preset: Expression,
    pub reset: Option<Condition>,
}

impl CountDown {
    pub fn new<E: Into<Expression>>(done: &Tag, accumulator: &Tag, preset: E) -> Result<Self> {
        let preset = preset.into();
        check_counter_tags(done, accumulator, &preset)?;
        Ok(CountDown {
            done: done.clone(),
            accumulator: accumulator.clone(),
            preset,
            reset: None,
        })
    }

    pub fn reset_when(mut self, condition: Condition) -> Self {
        self.reset = Some(condition);
        self
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext, enabled: bool) -> Result<()> {
        if apply_reset(&self.reset, &self.done, &self.accumulator, ctx) {
            return Ok(());
        }
        if enabled {
            let acc = (ctx.read_i64(&self.accumulator) - 1).clamp(DINT_MIN, DINT_MAX);
            store_accumulator(&self.accumulator, acc, ctx);
        }
        if let Some(preset) = preset_value(&self.preset, ctx) {
            let acc = ctx.read_i64(&self.accumulator);
            ctx.write(&self.done, Value::Bool(acc <= -preset));
        }
        Ok(())
    }
}
