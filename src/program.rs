//! Programs: main rungs plus named subroutines.
//!
//! Building a program is where malformed ladders are rejected. It also hands
//! every instruction a stable [`InstructionId`]: main rungs first, in order,
//! then subroutines in name order, depth-first through loop bodies.

use std::collections::BTreeMap;

use crate::condition::EdgeTags;
use crate::config::{EngineConfig, LimitsConfig};
use crate::context::{RuntimeTable, ScanContext};
use crate::error::{LadderError, Result};
use crate::instruction::{ControlFlow, Instruction, Op};
use crate::rung::{ExecutionItem, Rung};
use crate::state::SystemState;
use crate::system::{ALWAYS_ON, FIRST_SCAN, SCAN_COUNTER};
use crate::tag::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub rungs: Vec<Rung>,
    pub subroutines: BTreeMap<String, Vec<Rung>>,
    edge_tags: EdgeTags,
    limits: LimitsConfig,
    status_tags: bool,
    instruction_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ProgramBuilder {
    rungs: Vec<Rung>,
    subroutines: BTreeMap<String, Vec<Rung>>,
    config: EngineConfig,
}

impl ProgramBuilder {
    pub fn rung(mut self, rung: Rung) -> Self {
        self.rungs.push(rung);
        self
    }

    pub fn rungs<I: IntoIterator<Item = Rung>>(mut self, rungs: I) -> Self {
        self.rungs.extend(rungs);
        self
    }

    pub fn subroutine<S, I>(mut self, name: S, rungs: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = Rung>,
    {
        self.subroutines
            .insert(name.into(), rungs.into_iter().collect());
        self
    }

    pub fn config(mut self, config: &EngineConfig) -> Self {
        self.config = config.clone();
        self
    }

    pub fn build(self) -> Result<Program> {
        let ProgramBuilder {
            mut rungs,
            mut subroutines,
            config,
        } = self;

        for rung in &rungs {
            validate_items(&rung.items, false, &subroutines)?;
        }
        for body in subroutines.values() {
            for rung in body {
                validate_items(&rung.items, true, &subroutines)?;
            }
        }

        let mut next = 0u32;
        let mut assign = |instruction: &mut Instruction| instruction.assign_ids(&mut next);
        for rung in rungs.iter_mut() {
            rung.visit_instructions_mut(&mut assign);
        }
        for body in subroutines.values_mut() {
            for rung in body.iter_mut() {
                rung.visit_instructions_mut(&mut assign);
            }
        }

        let edge_tags = rungs
            .iter()
            .chain(subroutines.values().flatten())
            .flat_map(|rung| rung.edge_tags())
            .collect();

        let program = Program {
            rungs,
            subroutines,
            edge_tags,
            limits: config.limits,
            status_tags: config.system.status_tags,
            instruction_count: next as usize,
        };
        crate::log_info!(
            "Program built: {} rungs, {} subroutines, {} instructions",
            program.rungs.len(),
            program.subroutines.len(),
            program.instruction_count
        );
        Ok(program)
    }
}

fn validate_items(
    items: &[ExecutionItem],
    in_subroutine: bool,
    subroutines: &BTreeMap<String, Vec<Rung>>,
) -> Result<()> {
    for (i, item) in items.iter().enumerate() {
        let last = i + 1 == items.len();
        match item {
            ExecutionItem::Instruction(instruction) => {
                validate_instruction(instruction, last, in_subroutine, subroutines)?
            }
            ExecutionItem::Branch(branch) => {
                validate_items(&branch.items, in_subroutine, subroutines)?
            }
        }
    }
    Ok(())
}

fn validate_instruction(
    instruction: &Instruction,
    last: bool,
    in_subroutine: bool,
    subroutines: &BTreeMap<String, Vec<Rung>>,
) -> Result<()> {
    if instruction.op.is_terminal() && !last {
        return Err(LadderError::TerminalNotLast(instruction.op.name()));
    }
    match &instruction.op {
        Op::Call(call) if !subroutines.contains_key(&call.subroutine) => {
            return Err(LadderError::UnknownSubroutine(call.subroutine.clone()));
        }
        Op::Return(_) if !in_subroutine => return Err(LadderError::ReturnOutsideSubroutine),
        _ => {}
    }
    let body = instruction.op.children();
    for (i, child) in body.iter().enumerate() {
        validate_instruction(child, i + 1 == body.len(), in_subroutine, subroutines)?;
    }
    Ok(())
}

impl Program {
    /// Builds a program with the default engine configuration.
    pub fn new(rungs: Vec<Rung>, subroutines: BTreeMap<String, Vec<Rung>>) -> Result<Self> {
        ProgramBuilder {
            rungs,
            subroutines,
            config: EngineConfig::default(),
        }
        .build()
    }

    pub fn builder() -> ProgramBuilder {
        ProgramBuilder::default()
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Tags snapshotted under `_prev:<tag>` at every commit.
    pub fn edge_tags(&self) -> &EdgeTags {
        &self.edge_tags
    }

    pub fn instruction_count(&self) -> usize {
        self.instruction_count
    }

    /// Runs the main rungs once against `ctx`.
    ///
    /// Refreshes the status tags, clears the fault tags and registers the
    /// edge tags first. Time-based instructions read the delta staged with
    /// [`ScanContext::set_dt`].
    pub fn evaluate(&self, ctx: &mut ScanContext) -> Result<()> {
        ctx.watch_edges(self.edge_tags.iter().map(|(name, level)| (name.clone(), *level)));
        if self.status_tags {
            let scan_id = ctx.scan_id();
            ctx.set_tag(ALWAYS_ON, true);
            ctx.set_tag(FIRST_SCAN, scan_id == 0);
            ctx.set_tag(SCAN_COUNTER, Value::Int((scan_id + 1) as u32 as i32 as i64));
        }
        ctx.clear_faults();
        self.run_rungs(&self.rungs, ctx)?;
        Ok(())
    }

    /// Runs a subroutine in the caller's context. A RETURN inside it ends the
    /// subroutine and nothing else.
    pub fn call_subroutine(&self, name: &str, ctx: &mut ScanContext) -> Result<()> {
        let rungs = self
            .subroutines
            .get(name)
            .ok_or_else(|| LadderError::UnknownSubroutine(name.to_owned()))?;
        let limit = self.limits.max_call_depth as usize;
        if ctx.call_depth() >= limit {
            return Err(LadderError::CallDepthExceeded(limit));
        }
        ctx.enter_call();
        let outcome = self.run_rungs(rungs, ctx);
        ctx.exit_call();
        outcome.map(|_| ())
    }

    fn run_rungs(&self, rungs: &[Rung], ctx: &mut ScanContext) -> Result<ControlFlow> {
        for rung in rungs {
            if rung.execute(ctx, self)? == ControlFlow::Return {
                return Ok(ControlFlow::Return);
            }
        }
        Ok(ControlFlow::Continue)
    }

    /// One full scan: stage `dt`, evaluate, commit.
    pub fn scan(
        &self,
        state: &SystemState,
        runtime: &mut RuntimeTable,
        dt: f64,
    ) -> Result<SystemState> {
        let mut ctx = ScanContext::new(state, runtime);
        ctx.set_dt(dt);
        self.evaluate(&mut ctx)?;
        Ok(ctx.commit(dt))
    }

    /// Every instruction in handle order.
    pub fn visit_instructions<F: FnMut(&Instruction)>(&self, mut f: F) {
        for rung in self.rungs.iter().chain(self.subroutines.values().flatten()) {
            rung.visit_instructions(&mut f);
        }
    }
}
