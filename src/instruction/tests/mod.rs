use std::collections::BTreeMap;

use crate::context::RuntimeTable;
use crate::program::Program;
use crate::rung::Rung;
use crate::state::SystemState;
use crate::system::Fault;
use crate::tag::Value;

mod calc;
mod coil;
mod copy;
mod counter;
mod drum;
mod function;
mod search;
mod shift;

/// A program plus the driver-side state it runs against.
pub struct Sim {
    pub program: Program,
    pub state: SystemState,
    pub runtime: RuntimeTable,
}

impl Sim {
    pub fn new(rungs: Vec<Rung>) -> Sim {
        Sim::with_program(Program::new(rungs, BTreeMap::new()).unwrap())
    }

    pub fn with_program(program: Program) -> Sim {
        Sim {
            program,
            state: SystemState::new(),
            runtime: RuntimeTable::new(),
        }
    }

    pub fn set<V: Into<Value>>(&mut self, name: &str, value: V) {
        self.state = self.state.patched([(name, value)]);
    }

    pub fn scan(&mut self, dt: f64) {
        self.state = self
            .program
            .scan(&self.state, &mut self.runtime, dt)
            .unwrap();
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.state.tag(name).cloned()
    }

    pub fn int(&self, name: &str) -> i64 {
        self.get(name).and_then(|v| v.as_i64()).unwrap_or(0)
    }

    pub fn bit(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| v.is_truthy())
    }

    pub fn fault(&self, fault: Fault) -> bool {
        self.bit(fault.tag_name())
    }
}

/// One always-enabled rung.
pub fn run_once(rung: Rung, setup: &[(&str, Value)]) -> Sim {
    let mut sim = Sim::new(vec![rung]);
    for (name, value) in setup {
        sim.set(name, value.clone());
    }
    sim.scan(0.1);
    sim
}
