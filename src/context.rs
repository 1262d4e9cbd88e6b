use std::collections::HashMap;
use std::sync::Arc;

use crate::condition::EdgeTags;
use crate::instruction::InstructionId;
use crate::state::{DT_KEY, SystemState, ValueMap, prev_key};
use crate::system::Fault;
use crate::tag::{Tag, Value};

/// Mutable execution state of one instruction node, kept outside the program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstructionRuntime {
    pub oneshot_fired: bool,
}

/// Side table of per-instruction runtime state, keyed by instruction handle.
///
/// Owned by whoever drives the scans. Two simulations of the same
/// [`crate::program::Program`] must use two tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeTable {
    entries: HashMap<InstructionId, InstructionRuntime>,
}

impl RuntimeTable {
    pub fn new() -> Self {
        RuntimeTable::default()
    }

    pub fn get(&self, id: InstructionId) -> Option<&InstructionRuntime> {
        self.entries.get(&id)
    }

    pub fn entry(&mut self, id: InstructionId) -> &mut InstructionRuntime {
        self.entries.entry(id).or_default()
    }

    pub fn oneshot_fired(&self, id: InstructionId) -> bool {
        self.get(id).is_some_and(|r| r.oneshot_fired)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Transactional view over one [`SystemState`] for exactly one scan.
///
/// Writes are staged in an overlay and are visible to every later read of the
/// same scan. The wrapped state is never touched; [`ScanContext::commit`]
/// consumes the context and derives the next state.
pub struct ScanContext<'a> {
    state: &'a SystemState,
    runtime: &'a mut RuntimeTable,
    tags: ValueMap,
    memory: ValueMap,
    edge_tags: EdgeTags,
    call_depth: usize,
}

impl<'a> ScanContext<'a> {
    pub fn new(state: &'a SystemState, runtime: &'a mut RuntimeTable) -> Self {
        ScanContext {
            state,
            runtime,
            tags: ValueMap::new(),
            memory: ValueMap::new(),
            edge_tags: EdgeTags::new(),
            call_depth: 0,
        }
    }

    pub fn state(&self) -> &SystemState {
        self.state
    }

    pub fn scan_id(&self) -> u64 {
        self.state.scan_id
    }

    pub fn tag_ref(&self, name: &str) -> Option<&Value> {
        self.tags.get(name).or_else(|| self.state.tags.get(name))
    }

    pub fn get_tag(&self, name: &str, default: Value) -> Value {
        self.tag_ref(name).cloned().unwrap_or(default)
    }

    /// Current value of `tag`, falling back to its declared default.
    pub fn read(&self, tag: &Tag) -> Value {
        self.tag_ref(&tag.name)
            .cloned()
            .unwrap_or_else(|| tag.default.clone())
    }

    pub fn read_bool(&self, tag: &Tag) -> bool {
        match self.tag_ref(&tag.name) {
            Some(v) => v.is_truthy(),
            None => tag.default.is_truthy(),
        }
    }

    pub fn read_i64(&self, tag: &Tag) -> i64 {
        self.read(tag).as_i64().unwrap_or(0)
    }

    pub fn set_tag<S: Into<String>, V: Into<Value>>(&mut self, name: S, value: V) {
        self.tags.insert(name.into(), value.into());
    }

    pub fn set_tags<I, K, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (k, v) in values {
            self.set_tag(k, v);
        }
    }

    pub fn write(&mut self, tag: &Tag, value: Value) {
        self.tags.insert(tag.name.clone(), value);
    }

    pub fn memory_ref(&self, key: &str) -> Option<&Value> {
        self.memory.get(key).or_else(|| self.state.memory.get(key))
    }

    pub fn get_memory(&self, key: &str, default: Value) -> Value {
        self.memory_ref(key).cloned().unwrap_or(default)
    }

    pub fn memory_f64(&self, key: &str) -> f64 {
        self.memory_ref(key).and_then(Value::as_f64).unwrap_or(0.0)
    }

    pub fn memory_bool(&self, key: &str) -> bool {
        self.memory_ref(key).is_some_and(Value::is_truthy)
    }

    pub fn set_memory<S: Into<String>, V: Into<Value>>(&mut self, key: S, value: V) {
        self.memory.insert(key.into(), value.into());
    }

    /// Stages the delta of the running scan so time-based instructions can
    /// read it before commit.
    pub fn set_dt(&mut self, dt: f64) {
        self.set_memory(DT_KEY, dt);
    }

    /// Delta of the running scan in seconds.
    pub fn dt(&self) -> f64 {
        self.memory_f64(DT_KEY)
    }

    /// Tags whose final value is snapshotted for edge detection at commit,
    /// each with the level it reads as while unwritten.
    pub fn watch_edges<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        self.edge_tags
            .extend(tags.into_iter().map(|(name, default)| (name.into(), default)));
    }

    pub fn set_fault(&mut self, fault: Fault) {
        crate::log_debug!("scan {}: {} set", self.state.scan_id, fault.tag_name());
        self.set_tag(fault.tag_name(), true);
    }

    pub fn clear_faults(&mut self) {
        for fault in Fault::ALL {
            self.set_tag(fault.tag_name(), false);
        }
    }

    pub fn fault_active(&self, fault: Fault) -> bool {
        self.tag_ref(fault.tag_name()).is_some_and(Value::is_truthy)
    }

    pub fn runtime(&mut self) -> &mut RuntimeTable {
        self.runtime
    }

    pub fn oneshot_fired(&self, id: InstructionId) -> bool {
        self.runtime.oneshot_fired(id)
    }

    pub fn set_oneshot(&mut self, id: InstructionId, fired: bool) {
        if fired || self.runtime.get(id).is_some() {
            self.runtime.entry(id).oneshot_fired = fired;
        }
    }

    pub(crate) fn call_depth(&self) -> usize {
        self.call_depth
    }

    pub(crate) fn enter_call(&mut self) {
        self.call_depth += 1;
    }

    pub(crate) fn exit_call(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }

    /// Merges the overlay into the next immutable state.
    ///
    /// Stamps `_dt`, advances `scan_id` and `timestamp`, and records the final
    /// value of every watched edge tag under `_prev:<tag>`.
    pub fn commit(self, dt: f64) -> SystemState {
        let ScanContext {
            state,
            tags,
            mut memory,
            edge_tags,
            ..
        } = self;

        let mut next_tags = Arc::clone(&state.tags);
        if !tags.is_empty() {
            Arc::make_mut(&mut next_tags).extend(tags);
        }

        memory.insert(DT_KEY.to_owned(), Value::Real(dt));
        for (name, default) in &edge_tags {
            let current = next_tags.get(name).map_or(*default, Value::is_truthy);
            memory.insert(prev_key(name), Value::Bool(current));
        }
        let mut next_memory = Arc::clone(&state.memory);
        Arc::make_mut(&mut next_memory).extend(memory);

        SystemState {
            scan_id: state.scan_id + 1,
            timestamp: state.timestamp + dt,
            tags: next_tags,
            memory: next_memory,
        }
    }
}
