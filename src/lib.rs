pub mod block;
pub mod condition;
pub mod config;
pub mod context;
pub mod error;
pub mod expression;
pub mod instruction;
pub mod logger;
pub mod program;
pub mod rung;
pub mod state;
pub mod system;
pub mod tag;

pub use block::{Block, BlockRange, IndirectBlockRange, IndirectRef, IoDirection, RangeRef, TagRef};
pub use condition::{CmpOp, Condition};
pub use config::EngineConfig;
pub use context::{RuntimeTable, ScanContext};
pub use error::{LadderError, Result};
pub use expression::{EvalFault, Expression};
pub use instruction::{ControlFlow, Instruction, InstructionId, Op};
pub use program::{Program, ProgramBuilder};
pub use rung::{ExecutionItem, Rung};
pub use state::SystemState;
pub use system::Fault;
pub use tag::{Tag, TagType, Value};
