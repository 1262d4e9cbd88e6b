use crate::condition::{Condition, EdgeTags};
use crate::context::ScanContext;
use crate::error::Result;
use crate::instruction::{ControlFlow, Instruction};
use crate::program::Program;

/// Something a rung executes in order: an instruction or a nested branch.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionItem {
    Instruction(Instruction),
    /// Runs with the parent's enable AND its own conditions.
    Branch(Rung),
}

impl From<Instruction> for ExecutionItem {
    fn from(instruction: Instruction) -> Self {
        ExecutionItem::Instruction(instruction)
    }
}

impl From<Rung> for ExecutionItem {
    fn from(rung: Rung) -> Self {
        ExecutionItem::Branch(rung)
    }
}

/// AND-combined conditions gating an ordered list of items.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rung {
    pub conditions: Vec<Condition>,
    pub items: Vec<ExecutionItem>,
}

impl Rung {
    /// A rung with no conditions is always enabled.
    pub fn new() -> Self {
        Rung::default()
    }

    pub fn when<I: IntoIterator<Item = Condition>>(conditions: I) -> Self {
        Rung {
            conditions: conditions.into_iter().collect(),
            items: Vec::new(),
        }
    }

    pub fn then<I: Into<Instruction>>(mut self, instruction: I) -> Self {
        self.items.push(ExecutionItem::Instruction(instruction.into()));
        self
    }

    pub fn branch(mut self, branch: Rung) -> Self {
        self.items.push(ExecutionItem::Branch(branch));
        self
    }

    fn conditions_hold(&self, ctx: &ScanContext) -> bool {
        self.conditions.iter().all(|c| c.evaluate(ctx))
    }

    /// Enables of every nested branch, pre-order.
    fn collect_branch_enables(&self, parent: bool, ctx: &ScanContext, out: &mut Vec<bool>) {
        for item in &self.items {
            if let ExecutionItem::Branch(branch) = item {
                let enabled = parent && branch.conditions_hold(ctx);
                out.push(enabled);
                branch.collect_branch_enables(enabled, ctx, out);
            }
        }
    }

    /// Evaluates the rung and runs its items.
    ///
    /// The rung's enable and every branch enable are decided before the first
    /// instruction runs, so writes made by this rung never change them.
    pub fn execute(&self, ctx: &mut ScanContext, program: &Program) -> Result<ControlFlow> {
        let enabled = self.conditions_hold(ctx);
        let mut enables = Vec::new();
        self.collect_branch_enables(enabled, ctx, &mut enables);
        self.run(enabled, &mut enables.into_iter(), ctx, program)
    }

    fn run(
        &self,
        enabled: bool,
        enables: &mut impl Iterator<Item = bool>,
        ctx: &mut ScanContext,
        program: &Program,
    ) -> Result<ControlFlow> {
        for item in &self.items {
            let flow = match item {
                ExecutionItem::Instruction(instruction) => {
                    instruction.execute(ctx, enabled, program)?
                }
                ExecutionItem::Branch(branch) => {
                    let branch_enabled = enables.next().unwrap_or(false);
                    branch.run(branch_enabled, enables, ctx, program)?
                }
            };
            if flow == ControlFlow::Return {
                return Ok(ControlFlow::Return);
            }
        }
        Ok(ControlFlow::Continue)
    }

    /// Depth-first walk over every instruction, branches included.
    pub fn visit_instructions<F: FnMut(&Instruction)>(&self, f: &mut F) {
        for item in &self.items {
            match item {
                ExecutionItem::Instruction(instruction) => instruction.visit(f),
                ExecutionItem::Branch(branch) => branch.visit_instructions(f),
            }
        }
    }

    pub(crate) fn visit_instructions_mut<F: FnMut(&mut Instruction)>(&mut self, f: &mut F) {
        for item in &mut self.items {
            match item {
                ExecutionItem::Instruction(instruction) => f(instruction),
                ExecutionItem::Branch(branch) => branch.visit_instructions_mut(f),
            }
        }
    }

    /// Tags watched by edge conditions of this rung, its branches and its
    /// instructions.
    pub fn edge_tags(&self) -> EdgeTags {
        let mut out = EdgeTags::new();
        for condition in &self.conditions {
            condition.collect_edge_tags(&mut out);
        }
        for item in &self.items {
            if let ExecutionItem::Branch(branch) = item {
                out.extend(branch.edge_tags());
            }
        }
        self.visit_instructions(&mut |instruction: &Instruction| {
            for condition in instruction.op.conditions() {
                condition.collect_edge_tags(&mut out);
            }
        });
        out
    }
}
