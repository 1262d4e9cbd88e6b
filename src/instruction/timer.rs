//! TON / RTON / TOF.
//!
//! The scan delta is converted into timer units and added to the
//! accumulator. The fractional part that does not make a whole unit is kept
//! under `_frac:<accumulator>` so that uneven deltas add up exactly.

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::context::ScanContext;
use crate::error::{LadderError, Result};
use crate::expression::Expression;
use crate::state::frac_key;
use crate::tag::{Tag, TagType, Value};

/// Accumulators saturate at the INT maximum.
pub const TIMER_MAX: i64 = i16::MAX as i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Ms,
    Sec,
    Min,
    Hour,
    Day,
}

impl TimeUnit {
    pub fn per_second(self) -> f64 {
        match self {
            TimeUnit::Ms => 1000.0,
            TimeUnit::Sec => 1.0,
            TimeUnit::Min => 1.0 / 60.0,
            TimeUnit::Hour => 1.0 / 3600.0,
            TimeUnit::Day => 1.0 / 86400.0,
        }
    }
}

/// Adds the current scan delta to `current` and persists the remainder
/// under `frac_key`. Returns the saturated accumulator.
pub(crate) fn accumulate(
    ctx: &mut ScanContext,
    frac_key: &str,
    current: i64,
    unit: TimeUnit,
) -> i64 {
    let carry = ctx.memory_f64(frac_key);
    let total = carry + ctx.dt().max(0.0) * unit.per_second();
    let whole = (total + 1e-9).floor();
    ctx.set_memory(frac_key, (total - whole).max(0.0));
    current.saturating_add(whole as i64).min(TIMER_MAX)
}

fn check_timer_tags(done: &Tag, accumulator: &Tag, preset: &Expression) -> Result<()> {
    done.expect_type(&[TagType::Bool], "BOOL")?;
    accumulator.expect_type(&[TagType::Int, TagType::Dint], "INT or DINT")?;
    if !preset.is_numeric() {
        return Err(LadderError::invalid(format!(
            "timer '{}' preset must be numeric",
            accumulator.name
        )));
    }
    Ok(())
}

/// Resolves a preset; `None` after raising the operand's fault.
pub(crate) fn preset_value(preset: &Expression, ctx: &mut ScanContext) -> Option<i64> {
    match preset.evaluate(ctx) {
        Ok(value) => value.as_i64(),
        Err(e) => {
            ctx.set_fault(e.fault());
            None
        }
    }
}

/// On-delay timer. With a reset condition it becomes retentive (RTON).
#[derive(Debug, Clone, PartialEq)]
pub struct OnDelay {
    pub done: Tag,
    pub accumulator: Tag,
    pub preset: Expression,
    pub unit: TimeUnit,
    pub reset: Option<Condition>,
}

impl OnDelay {
    pub fn new<E: Into<Expression>>(
        done: &Tag,
        accumulator: &Tag,
        preset: E,
        unit: TimeUnit,
    ) -> Result<Self> {
        let preset = preset.into();
        check_timer_tags(done, accumulator, &preset)?;
        Ok(OnDelay {
            done: done.clone(),
            accumulator: accumulator.clone(),
            preset,
            unit,
            reset: None,
        })
    }

    /// Makes the timer retentive: it holds while disabled and clears only
    /// while `condition` is true.
    pub fn reset_when(mut self, condition: Condition) -> Self {
        self.reset = Some(condition);
        self
    }

    fn clear(&self, ctx: &mut ScanContext) {
        ctx.write(&self.accumulator, Value::Int(0));
        ctx.write(&self.done, Value::Bool(false));
        ctx.set_memory(frac_key(&self.accumulator.name), 0.0);
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext, enabled: bool) -> Result<()> {
        if let Some(reset) = &self.reset {
            if reset.evaluate(ctx) {
                self.clear(ctx);
                return Ok(());
            }
        }
        if !enabled {
            if self.reset.is_none() {
                self.clear(ctx);
            }
            return Ok(());
        }
        let Some(preset) = preset_value(&self.preset, ctx) else {
            return Ok(());
        };
        let current = ctx.read_i64(&self.accumulator);
        let acc = accumulate(ctx, &frac_key(&self.accumulator.name), current, self.unit);
        ctx.write(&self.accumulator, Value::Int(acc));
        ctx.write(&self.done, Value::Bool(acc >= preset));
        Ok(())
    }
}

/// Off-delay timer: done follows the rung up and drops `preset` units after
/// the rung goes false.
#[derive(Debug, Clone, PartialEq)]
pub struct OffDelay {
    pub done: Tag,
    pub accumulator: Tag,
    pub preset: Expression,
    pub unit: TimeUnit,
}

impl OffDelay {
    pub fn new<E: Into<Expression>>(
        done: &Tag,
        accumulator: &Tag,
        preset: E,
        unit: TimeUnit,
    ) -> Result<Self> {
        let preset = preset.into();
        check_timer_tags(done, accumulator, &preset)?;
        Ok(OffDelay {
            done: done.clone(),
            accumulator: accumulator.clone(),
            preset,
            unit,
        })
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext, enabled: bool) -> Result<()> {
        if enabled {
            ctx.write(&self.done, Value::Bool(true));
            ctx.write(&self.accumulator, Value::Int(0));
            ctx.set_memory(frac_key(&self.accumulator.name), 0.0);
            return Ok(());
        }
        if !ctx.read_bool(&self.done) {
            return Ok(());
        }
        let Some(preset) = preset_value(&self.preset, ctx) else {
            return Ok(());
        };
        let current = ctx.read_i64(&self.accumulator);
        let acc = accumulate(ctx, &frac_key(&self.accumulator.name), current, self.unit);
        ctx.write(&self.accumulator, Value::Int(acc));
        if acc >= preset {
            ctx.write(&self.done, Value::Bool(false));
        }
        Ok(())
    }
}
