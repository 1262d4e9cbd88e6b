use crate::context::ScanContext;
use crate::error::{LadderError, Result};
use crate::expression::Expression;
use crate::program::Program;
use crate::system::Fault;
use crate::tag::{Tag, TagType, Value};

use super::{ControlFlow, Instruction};

/// Runs a named subroutine in the current scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub subroutine: String,
}

impl Call {
    pub fn new<S: Into<String>>(subroutine: S) -> Self {
        Call {
            subroutine: subroutine.into(),
        }
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext, program: &Program) -> Result<ControlFlow> {
        program.call_subroutine(&self.subroutine, ctx)?;
        Ok(ControlFlow::Continue)
    }
}

/// Leaves the current subroutine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Return;

/// Repeats its body `count` times within one scan.
///
/// The count is resolved every scan: negative counts run nothing, counts
/// above the configured limit are clamped and raise `out_of_range`. When the
/// loop is disabled its body still sees `enabled = false`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    pub count: Expression,
    /// Receives the 0-based iteration number before each pass.
    pub index: Tag,
    pub body: Vec<Instruction>,
}

impl ForLoop {
    pub fn new<E, I, B>(count: E, index: &Tag, body: I) -> Result<Self>
    where
        E: Into<Expression>,
        I: IntoIterator<Item = B>,
        B: Into<Instruction>,
    {
        let count = count.into();
        if !count.is_numeric() {
            return Err(LadderError::invalid("for loop count must be numeric"));
        }
        index.expect_type(&[TagType::Int, TagType::Dint], "INT or DINT")?;
        Ok(ForLoop {
            count,
            index: index.clone(),
            body: body.into_iter().map(Into::into).collect(),
        })
    }

    fn iterations(&self, ctx: &mut ScanContext, limit: u32) -> u32 {
        let count = match self.count.evaluate(ctx) {
            Ok(value) => value.as_i64().unwrap_or(0),
            Err(e) => {
                ctx.set_fault(e.fault());
                return 0;
            }
        };
        if count > limit as i64 {
            crate::log_debug!("for loop count {} clamped to {}", count, limit);
            ctx.set_fault(Fault::OutOfRange);
            return limit;
        }
        count.max(0) as u32
    }

    pub(crate) fn execute(
        &self,
        ctx: &mut ScanContext,
        enabled: bool,
        program: &Program,
    ) -> Result<ControlFlow> {
        if !enabled {
            for child in &self.body {
                child.execute(ctx, false, program)?;
            }
            return Ok(ControlFlow::Continue);
        }

        let passes = self.iterations(ctx, program.limits().max_loop_iterations);
        for pass in 0..passes {
            if let Some(index) = self.index.tag_type.store_copy(&Value::Int(pass as i64)) {
                ctx.write(&self.index, index);
            }
            for child in &self.body {
                if child.execute(ctx, true, program)? == ControlFlow::Return {
                    return Ok(ControlFlow::Return);
                }
            }
        }
        Ok(ControlFlow::Continue)
    }
}
