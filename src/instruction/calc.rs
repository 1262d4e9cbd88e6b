use crate::block::TagRef;
use crate::context::ScanContext;
use crate::error::{LadderError, Result};
use crate::expression::{EvalFault, Expression};
use crate::system::Fault;
use crate::tag::{TagType, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalcMode {
    #[default]
    Decimal,
    /// Unsigned 16-bit wrap whatever the destination type.
    Hex,
}

/// Evaluates an expression and stores it with the calc law (modular wrap).
#[derive(Debug, Clone, PartialEq)]
pub struct Calc {
    pub expression: Expression,
    pub target: TagRef,
    pub mode: CalcMode,
}

impl Calc {
    pub fn new<E: Into<Expression>, T: Into<TagRef>>(expression: E, target: T) -> Result<Self> {
        let (expression, target) = (expression.into(), target.into());
        target.expect_type(
            &[TagType::Int, TagType::Dint, TagType::Real, TagType::Word],
            "a numeric type",
        )?;
        if !expression.is_numeric() {
            return Err(LadderError::invalid(format!(
                "calc into '{}' uses a text operand",
                target.name()
            )));
        }
        Ok(Calc {
            expression,
            target,
            mode: CalcMode::Decimal,
        })
    }

    pub fn hex(mut self) -> Self {
        self.mode = CalcMode::Hex;
        self
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext) -> Result<()> {
        let result = self.expression.evaluate(ctx);
        if result == Err(EvalFault::Address) {
            ctx.set_fault(Fault::AddressError);
            return Ok(());
        }
        let Some(tag) = self.target.resolve(ctx) else {
            ctx.set_fault(Fault::AddressError);
            return Ok(());
        };

        let hex = self.mode == CalcMode::Hex;
        let stored = result
            .ok()
            .and_then(|value| tag.tag_type.store_calc(&value, hex));
        match stored {
            Some(value) => ctx.write(&tag, value),
            None => {
                ctx.set_fault(Fault::DivisionError);
                let zero = tag
                    .tag_type
                    .store_calc(&Value::Int(0), hex)
                    .unwrap_or_else(|| tag.tag_type.default_value());
                ctx.write(&tag, zero);
            }
        }
        Ok(())
    }
}
