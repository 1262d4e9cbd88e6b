//! The unit of side effect in a ladder program.
//!
//! Every instruction kind is a typed struct wrapped by [`Op`]. An
//! [`Instruction`] adds the handle assigned by [`Program::new`] and the
//! oneshot flag. The AST never changes while scanning; per-instruction
//! runtime state goes to the [`crate::context::RuntimeTable`] or to reserved
//! memory keys derived from the handle.

use std::fmt;

use crate::condition::Condition;
use crate::context::ScanContext;
use crate::error::{LadderError, Result};
use crate::program::Program;

pub mod calc;
pub mod coil;
pub mod control;
pub mod copy;
pub mod counter;
pub mod drum;
pub mod function;
pub mod pack;
pub mod search;
pub mod shift;
pub mod timer;

#[cfg(test)]
mod tests;

pub use calc::{Calc, CalcMode};
pub use coil::{CoilTarget, Latch, Out, Reset};
pub use control::{Call, ForLoop, Return};
pub use copy::{BlockCopy, CopyModifier, CopySource, CopyTarget, Fill, SingleCopy};
pub use counter::{CountDown, CountUp};
pub use drum::{DrumCore, EventDrum, TimeDrum};
pub use function::{Bindings, EnabledHostFn, HostFn, RunEnabledFunction, RunFunction, Values};
pub use pack::{PackBits, PackText, PackWords, UnpackToBits, UnpackToWords};
pub use search::{Search, SearchCondition};
pub use shift::Shift;
pub use timer::{OffDelay, OnDelay, TimeUnit};

/// Stable handle of an instruction inside its [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct InstructionId(pub u32);

impl InstructionId {
    /// Reserved memory key for per-instruction bookkeeping, e.g. `_shift_clock:3`.
    pub fn memory_key(self, prefix: &str) -> String {
        format!("_{}:{}", prefix, self.0)
    }
}

impl fmt::Display for InstructionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of executing an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    /// Unwind to the enclosing subroutine boundary.
    Return,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Out(Out),
    Latch(Latch),
    Reset(Reset),
    Copy(SingleCopy),
    BlockCopy(BlockCopy),
    Fill(Fill),
    Calc(Calc),
    OnDelay(OnDelay),
    OffDelay(OffDelay),
    CountUp(CountUp),
    CountDown(CountDown),
    Shift(Shift),
    EventDrum(EventDrum),
    TimeDrum(TimeDrum),
    Search(Search),
    PackBits(PackBits),
    PackWords(PackWords),
    UnpackToBits(UnpackToBits),
    UnpackToWords(UnpackToWords),
    PackText(PackText),
    Call(Call),
    Return(Return),
    ForLoop(ForLoop),
    RunFunction(RunFunction),
    RunEnabledFunction(RunEnabledFunction),
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Out(_) => "out",
            Op::Latch(_) => "latch",
            Op::Reset(_) => "reset",
            Op::Copy(_) => "copy",
            Op::BlockCopy(_) => "blockcopy",
            Op::Fill(_) => "fill",
            Op::Calc(_) => "calc",
            Op::OnDelay(_) => "on_delay",
            Op::OffDelay(_) => "off_delay",
            Op::CountUp(_) => "count_up",
            Op::CountDown(_) => "count_down",
            Op::Shift(_) => "shift",
            Op::EventDrum(_) => "event_drum",
            Op::TimeDrum(_) => "time_drum",
            Op::Search(_) => "search",
            Op::PackBits(_) => "pack_bits",
            Op::PackWords(_) => "pack_words",
            Op::UnpackToBits(_) => "unpack_to_bits",
            Op::UnpackToWords(_) => "unpack_to_words",
            Op::PackText(_) => "pack_text",
            Op::Call(_) => "call",
            Op::Return(_) => "return",
            Op::ForLoop(_) => "for",
            Op::RunFunction(_) => "run_function",
            Op::RunEnabledFunction(_) => "run_enabled_function",
        }
    }

    /// Runs even when the rung is false, to reset or hold internal state.
    pub fn always_executes(&self) -> bool {
        matches!(
            self,
            Op::OnDelay(_)
                | Op::OffDelay(_)
                | Op::CountUp(_)
                | Op::CountDown(_)
                | Op::Shift(_)
                | Op::EventDrum(_)
                | Op::TimeDrum(_)
                | Op::RunEnabledFunction(_)
        )
    }

    /// Has nothing to do on `enabled = false`.
    pub fn inert_when_disabled(&self) -> bool {
        !self.always_executes() && !matches!(self, Op::Out(_) | Op::ForLoop(_))
    }

    /// Must be the last item of its execution flow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Op::EventDrum(_) | Op::TimeDrum(_))
    }

    pub fn supports_oneshot(&self) -> bool {
        !self.always_executes() && !matches!(self, Op::Call(_) | Op::Return(_))
    }

    /// Conditions embedded in the instruction (clocks, resets, drum events).
    pub fn conditions(&self) -> Vec<&Condition> {
        match self {
            Op::OnDelay(t) => t.reset.iter().collect(),
            Op::CountUp(c) => c.down.iter().chain(c.reset.iter()).collect(),
            Op::CountDown(c) => c.reset.iter().collect(),
            Op::Shift(s) => std::iter::once(&s.clock).chain(s.reset.iter()).collect(),
            Op::EventDrum(d) => d.events.iter().chain(d.drum.conditions()).collect(),
            Op::TimeDrum(d) => d.drum.conditions().collect(),
            _ => Vec::new(),
        }
    }

    /// Nested instructions executed by this one.
    pub fn children(&self) -> &[Instruction] {
        match self {
            Op::ForLoop(l) => &l.body,
            _ => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Instruction] {
        match self {
            Op::ForLoop(l) => &mut l.body,
            _ => &mut [],
        }
    }

    fn execute(
        &self,
        id: InstructionId,
        ctx: &mut ScanContext,
        enabled: bool,
        program: &Program,
    ) -> Result<ControlFlow> {
        match self {
            Op::Out(op) => op.execute(ctx, enabled),
            Op::Latch(op) => op.execute(ctx),
            Op::Reset(op) => op.execute(ctx),
            Op::Copy(op) => op.execute(ctx),
            Op::BlockCopy(op) => op.execute(ctx),
            Op::Fill(op) => op.execute(ctx),
            Op::Calc(op) => op.execute(ctx),
            Op::OnDelay(op) => op.execute(ctx, enabled),
            Op::OffDelay(op) => op.execute(ctx, enabled),
            Op::CountUp(op) => op.execute(ctx, enabled),
            Op::CountDown(op) => op.execute(ctx, enabled),
            Op::Shift(op) => op.execute(id, ctx, enabled),
            Op::EventDrum(op) => op.execute(id, ctx, enabled),
            Op::TimeDrum(op) => op.execute(id, ctx, enabled),
            Op::Search(op) => op.execute(ctx),
            Op::PackBits(op) => op.execute(ctx),
            Op::PackWords(op) => op.execute(ctx),
            Op::UnpackToBits(op) => op.execute(ctx),
            Op::UnpackToWords(op) => op.execute(ctx),
            Op::PackText(op) => op.execute(ctx),
            Op::Call(op) => return op.execute(ctx, program),
            Op::Return(_) => return Ok(ControlFlow::Return),
            Op::ForLoop(op) => return op.execute(ctx, enabled, program),
            Op::RunFunction(op) => op.execute(ctx),
            Op::RunEnabledFunction(op) => op.execute(ctx, enabled),
        }?;
        Ok(ControlFlow::Continue)
    }
}

macro_rules! op_from {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Op {
                fn from(op: $ty) -> Self {
                    Op::$variant(op)
                }
            }

            impl From<$ty> for Instruction {
                fn from(op: $ty) -> Self {
                    Instruction::new(Op::$variant(op))
                }
            }
        )*
    };
}

op_from! {
    Out => Out,
    Latch => Latch,
    Reset => Reset,
    SingleCopy => Copy,
    BlockCopy => BlockCopy,
    Fill => Fill,
    Calc => Calc,
    OnDelay => OnDelay,
    OffDelay => OffDelay,
    CountUp => CountUp,
    CountDown => CountDown,
    Shift => Shift,
    EventDrum => EventDrum,
    TimeDrum => TimeDrum,
    Search => Search,
    PackBits => PackBits,
    PackWords => PackWords,
    UnpackToBits => UnpackToBits,
    UnpackToWords => UnpackToWords,
    PackText => PackText,
    Call => Call,
    Return => Return,
    ForLoop => ForLoop,
    RunFunction => RunFunction,
    RunEnabledFunction => RunEnabledFunction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub id: InstructionId,
    pub oneshot: bool,
    pub op: Op,
}

impl From<Op> for Instruction {
    fn from(op: Op) -> Self {
        Instruction::new(op)
    }
}

impl Instruction {
    /// The handle stays at its default until the owning [`Program`] is built.
    pub fn new<O: Into<Op>>(op: O) -> Self {
        Instruction {
            id: InstructionId::default(),
            oneshot: false,
            op: op.into(),
        }
    }

    /// Fires once per activation instead of every enabled scan.
    pub fn oneshot(mut self) -> Result<Self> {
        if !self.op.supports_oneshot() {
            return Err(LadderError::invalid(format!(
                "{} does not support oneshot",
                self.op.name()
            )));
        }
        self.oneshot = true;
        Ok(self)
    }

    pub fn execute(
        &self,
        ctx: &mut ScanContext,
        enabled: bool,
        program: &Program,
    ) -> Result<ControlFlow> {
        if !enabled {
            if self.oneshot {
                ctx.set_oneshot(self.id, false);
            }
            if self.op.inert_when_disabled() {
                return Ok(ControlFlow::Continue);
            }
            return self.op.execute(self.id, ctx, false, program);
        }

        if self.oneshot {
            if ctx.oneshot_fired(self.id) {
                // A oneshot coil is a one-scan pulse.
                if let Op::Out(out) = &self.op {
                    out.execute(ctx, false)?;
                }
                return Ok(ControlFlow::Continue);
            }
            ctx.set_oneshot(self.id, true);
        }
        self.op.execute(self.id, ctx, true, program)
    }

    /// Depth-first walk over this instruction and everything nested in it.
    pub fn visit<F: FnMut(&Instruction)>(&self, f: &mut F) {
        f(self);
        for child in self.op.children() {
            child.visit(f);
        }
    }

    pub(crate) fn assign_ids(&mut self, next: &mut u32) {
        self.id = InstructionId(*next);
        *next += 1;
        for child in self.op.children_mut() {
            child.assign_ids(next);
        }
    }
}
