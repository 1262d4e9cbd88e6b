use crate::block::RangeRef;
use crate::condition::Condition;
use crate::context::ScanContext;
use crate::error::Result;
use crate::system::Fault;
use crate::tag::{TagType, Value};

use super::InstructionId;

/// Bit shift register over a BOOL range.
///
/// On a rising edge of `clock` every bit moves one position toward the end
/// of the range and the rung's enabled flag enters at the front. `reset` is
/// level-sensitive and beats a coincident clock edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Shift {
    pub range: RangeRef,
    pub clock: Condition,
    pub reset: Option<Condition>,
}

impl Shift {
    pub fn new<R: Into<RangeRef>>(range: R, clock: Condition) -> Result<Self> {
        let range = range.into();
        range.expect_type(&[TagType::Bool], "BOOL")?;
        Ok(Shift {
            range,
            clock,
            reset: None,
        })
    }

    pub fn reset_when(mut self, condition: Condition) -> Self {
        self.reset = Some(condition);
        self
    }

    pub(crate) fn execute(
        &self,
        id: InstructionId,
        ctx: &mut ScanContext,
        enabled: bool,
    ) -> Result<()> {
        let clock_key = id.memory_key("shift_clock");
        let clock = self.clock.evaluate(ctx);
        let rising = clock && !ctx.memory_bool(&clock_key);
        ctx.set_memory(clock_key, clock);

        let Some(range) = self.range.resolve(ctx)? else {
            ctx.set_fault(Fault::AddressError);
            return Ok(());
        };
        let tags = range.tags();

        if self.reset.as_ref().is_some_and(|c| c.evaluate(ctx)) {
            for tag in &tags {
                ctx.write(tag, Value::Bool(false));
            }
            return Ok(());
        }
        if !rising || tags.is_empty() {
            return Ok(());
        }

        let bits: Vec<bool> = tags.iter().map(|t| ctx.read_bool(t)).collect();
        ctx.write(&tags[0], Value::Bool(enabled));
        for (tag, bit) in tags.iter().skip(1).zip(bits) {
            ctx.write(tag, Value::Bool(bit));
        }
        Ok(())
    }
}
