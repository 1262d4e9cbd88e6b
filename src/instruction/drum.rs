//! Drum sequencers.
//!
//! A drum walks a step × output BOOL pattern. The current step lives in a
//! user tag (1-based) next to a completion flag; bookkeeping that the author
//! never sees is kept in memory under the instruction handle:
//!
//! - `_drum_step_armed:<id>`: the current step's event has been seen low
//! - `_drum_frac:<id>`: fractional time carry of a time drum
//! - `_drum_jump:<id>` / `_drum_jog:<id>`: previous value of those conditions

use crate::condition::Condition;
use crate::context::ScanContext;
use crate::error::{LadderError, Result};
use crate::expression::Expression;
use crate::system::Fault;
use crate::tag::{Tag, TagType, Value};

use super::InstructionId;
use super::timer::{TimeUnit, accumulate, preset_value};

/// State and wiring shared by both drum kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct DrumCore {
    pub outputs: Vec<Tag>,
    /// One row per step, one column per output.
    pub pattern: Vec<Vec<bool>>,
    pub current_step: Tag,
    pub completion: Tag,
    pub reset: Option<Condition>,
    pub jump: Option<(Condition, Expression)>,
    pub jog: Option<Condition>,
}

/// What happened to the step this scan.
enum Transition {
    Stay,
    Advance,
    JumpTo(i64),
}

impl DrumCore {
    pub fn new(
        outputs: Vec<Tag>,
        pattern: Vec<Vec<bool>>,
        current_step: &Tag,
        completion: &Tag,
    ) -> Result<Self> {
        if pattern.is_empty() {
            return Err(LadderError::invalid("drum needs at least one step"));
        }
        for output in &outputs {
            output.expect_type(&[TagType::Bool], "BOOL")?;
        }
        for row in &pattern {
            if row.len() != outputs.len() {
                return Err(LadderError::LengthMismatch {
                    expected: outputs.len(),
                    found: row.len(),
                });
            }
        }
        current_step.expect_type(&[TagType::Int, TagType::Dint], "INT or DINT")?;
        completion.expect_type(&[TagType::Bool], "BOOL")?;
        Ok(DrumCore {
            outputs,
            pattern,
            current_step: current_step.clone(),
            completion: completion.clone(),
            reset: None,
            jump: None,
            jog: None,
        })
    }

    pub fn steps(&self) -> usize {
        self.pattern.len()
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.reset
            .iter()
            .chain(self.jump.iter().map(|(c, _)| c))
            .chain(self.jog.iter())
    }

    fn step(&self, ctx: &ScanContext) -> i64 {
        let step = ctx.read_i64(&self.current_step);
        if step < 1 || step > self.steps() as i64 {
            1
        } else {
            step
        }
    }

    fn apply_outputs(&self, ctx: &mut ScanContext, step: i64) {
        let row = &self.pattern[(step - 1) as usize];
        for (tag, bit) in self.outputs.iter().zip(row) {
            ctx.write(tag, Value::Bool(*bit));
        }
    }

    fn edge(condition: Option<&Condition>, key: String, ctx: &mut ScanContext) -> bool {
        let Some(condition) = condition else {
            return false;
        };
        let now = condition.evaluate(ctx);
        let rising = now && !ctx.memory_bool(&key);
        ctx.set_memory(key, now);
        rising
    }

    /// Shared prologue. Returns `None` when reset took the scan.
    fn begin(&self, id: InstructionId, ctx: &mut ScanContext, enabled: bool) -> Option<Transition> {
        let jump_edge = Self::edge(
            self.jump.as_ref().map(|(c, _)| c),
            id.memory_key("drum_jump"),
            ctx,
        );
        let jog_edge = Self::edge(self.jog.as_ref(), id.memory_key("drum_jog"), ctx);

        if self.reset.as_ref().is_some_and(|c| c.evaluate(ctx)) {
            ctx.write(&self.current_step, Value::Int(1));
            ctx.write(&self.completion, Value::Bool(false));
            ctx.set_memory(id.memory_key("drum_step_armed"), false);
            self.apply_outputs(ctx, 1);
            return None;
        }
        if !enabled {
            return Some(Transition::Stay);
        }
        if jump_edge {
            if let Some((_, target)) = &self.jump {
                let target = match target.evaluate(ctx) {
                    Ok(v) => v.as_i64(),
                    Err(e) => {
                        ctx.set_fault(e.fault());
                        None
                    }
                };
                match target {
                    Some(step) if step >= 1 && step <= self.steps() as i64 => {
                        return Some(Transition::JumpTo(step));
                    }
                    _ => ctx.set_fault(Fault::OutOfRange),
                }
            }
        }
        if jog_edge {
            return Some(Transition::Advance);
        }
        Some(Transition::Stay)
    }

    /// Applies `transition` and, while enabled, drives the resulting step's
    /// outputs. Advancing past the last step sets completion instead. Returns
    /// true when the step changed.
    fn finish(
        &self,
        id: InstructionId,
        ctx: &mut ScanContext,
        enabled: bool,
        transition: Transition,
    ) -> bool {
        let step = self.step(ctx);
        let moved = match transition {
            Transition::Stay => {
                ctx.write(&self.current_step, Value::Int(step));
                false
            }
            Transition::JumpTo(target) => {
                ctx.write(&self.current_step, Value::Int(target));
                ctx.write(&self.completion, Value::Bool(false));
                true
            }
            Transition::Advance => {
                if step < self.steps() as i64 {
                    ctx.write(&self.current_step, Value::Int(step + 1));
                } else {
                    ctx.write(&self.current_step, Value::Int(step));
                    ctx.write(&self.completion, Value::Bool(true));
                }
                true
            }
        };
        if moved {
            ctx.set_memory(id.memory_key("drum_step_armed"), false);
        }
        if enabled {
            let step = self.step(ctx);
            self.apply_outputs(ctx, step);
        }
        moved
    }

    pub fn reset_when(&mut self, condition: Condition) {
        self.reset = Some(condition);
    }

    pub fn jump_when<E: Into<Expression>>(&mut self, condition: Condition, step: E) {
        self.jump = Some((condition, step.into()));
    }

    pub fn jog_when(&mut self, condition: Condition) {
        self.jog = Some(condition);
    }
}

/// Advances when the current step's event goes from low to high.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDrum {
    pub drum: DrumCore,
    /// One event per step.
    pub events: Vec<Condition>,
}

impl EventDrum {
    pub fn new(drum: DrumCore, events: Vec<Condition>) -> Result<Self> {
        if events.len() != drum.steps() {
            return Err(LadderError::LengthMismatch {
                expected: drum.steps(),
                found: events.len(),
            });
        }
        Ok(EventDrum { drum, events })
    }

    pub fn reset_when(mut self, condition: Condition) -> Self {
        self.drum.reset_when(condition);
        self
    }

    pub fn jump_when<E: Into<Expression>>(mut self, condition: Condition, step: E) -> Self {
        self.drum.jump_when(condition, step);
        self
    }

    pub fn jog_when(mut self, condition: Condition) -> Self {
        self.drum.jog_when(condition);
        self
    }

    pub(crate) fn execute(
        &self,
        id: InstructionId,
        ctx: &mut ScanContext,
        enabled: bool,
    ) -> Result<()> {
        let Some(mut transition) = self.drum.begin(id, ctx, enabled) else {
            return Ok(());
        };
        if enabled
            && matches!(transition, Transition::Stay)
            && !ctx.read_bool(&self.drum.completion)
        {
            let step = self.drum.step(ctx);
            let armed_key = id.memory_key("drum_step_armed");
            let event = self.events[(step - 1) as usize].evaluate(ctx);
            if event && ctx.memory_bool(&armed_key) {
                transition = Transition::Advance;
            } else if !event {
                ctx.set_memory(armed_key, true);
            }
        }
        self.drum.finish(id, ctx, enabled, transition);
        Ok(())
    }
}

/// Advances when the time spent in the current step reaches its preset.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeDrum {
    pub drum: DrumCore,
    /// One preset per step, in `unit`.
    pub presets: Vec<Expression>,
    pub unit: TimeUnit,
    /// Time spent in the current step.
    pub accumulator: Tag,
}

impl TimeDrum {
    pub fn new(
        drum: DrumCore,
        presets: Vec<Expression>,
        unit: TimeUnit,
        accumulator: &Tag,
    ) -> Result<Self> {
        if presets.len() != drum.steps() {
            return Err(LadderError::LengthMismatch {
                expected: drum.steps(),
                found: presets.len(),
            });
        }
        if presets.iter().any(|p| !p.is_numeric()) {
            return Err(LadderError::invalid("time drum presets must be numeric"));
        }
        accumulator.expect_type(&[TagType::Int, TagType::Dint], "INT or DINT")?;
        Ok(TimeDrum {
            drum,
            presets,
            unit,
            accumulator: accumulator.clone(),
        })
    }

    pub fn reset_when(mut self, condition: Condition) -> Self {
        self.drum.reset_when(condition);
        self
    }

    pub fn jump_when<E: Into<Expression>>(mut self, condition: Condition, step: E) -> Self {
        self.drum.jump_when(condition, step);
        self
    }

    pub fn jog_when(mut self, condition: Condition) -> Self {
        self.drum.jog_when(condition);
        self
    }

    fn clear_timer(&self, id: InstructionId, ctx: &mut ScanContext) {
        ctx.write(&self.accumulator, Value::Int(0));
        ctx.set_memory(id.memory_key("drum_frac"), 0.0);
    }

    pub(crate) fn execute(
        &self,
        id: InstructionId,
        ctx: &mut ScanContext,
        enabled: bool,
    ) -> Result<()> {
        let Some(mut transition) = self.drum.begin(id, ctx, enabled) else {
            self.clear_timer(id, ctx);
            return Ok(());
        };
        if enabled
            && matches!(transition, Transition::Stay)
            && !ctx.read_bool(&self.drum.completion)
        {
            let step = self.drum.step(ctx);
            if let Some(preset) = preset_value(&self.presets[(step - 1) as usize], ctx) {
                let current = ctx.read_i64(&self.accumulator);
                let acc = accumulate(ctx, &id.memory_key("drum_frac"), current, self.unit);
                ctx.write(&self.accumulator, Value::Int(acc));
                if acc >= preset {
                    transition = Transition::Advance;
                }
            }
        }
        if self.drum.finish(id, ctx, enabled, transition) {
            self.clear_timer(id, ctx);
        }
        Ok(())
    }
}
