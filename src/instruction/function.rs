//! Calls into host Rust code.
//!
//! Inputs are evaluated into a name → value map, the function returns a map
//! of outputs and each named output goes to its tag through the copy store
//! law. A missing output leaves its tag alone.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::block::TagRef;
use crate::context::ScanContext;
use crate::error::Result;
use crate::expression::Expression;
use crate::system::Fault;
use crate::tag::{Tag, Value};

pub type Values = BTreeMap<String, Value>;

pub type HostFn = Arc<dyn Fn(&Values) -> Values + Send + Sync>;

/// Host function that also receives the rung's enabled flag.
pub type EnabledHostFn = Arc<dyn Fn(bool, &Values) -> Values + Send + Sync>;

/// Named operands and destinations shared by both function kinds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bindings {
    pub inputs: Vec<(String, Expression)>,
    pub outputs: Vec<(String, TagRef)>,
}

impl Bindings {
    pub fn input<S: Into<String>, E: Into<Expression>>(mut self, name: S, value: E) -> Self {
        self.inputs.push((name.into(), value.into()));
        self
    }

    pub fn output<S: Into<String>, T: Into<TagRef>>(mut self, name: S, target: T) -> Self {
        self.outputs.push((name.into(), target.into()));
        self
    }

    /// Evaluated inputs, or `None` after raising the first operand fault.
    fn gather(&self, ctx: &mut ScanContext) -> Option<Values> {
        let mut values = Values::new();
        for (name, expr) in &self.inputs {
            match expr.evaluate(ctx) {
                Ok(v) => {
                    values.insert(name.clone(), v);
                }
                Err(e) => {
                    ctx.set_fault(e.fault());
                    return None;
                }
            }
        }
        Some(values)
    }

    /// Writes every returned output, or nothing when any of them fails.
    fn scatter(&self, ctx: &mut ScanContext, results: &Values) {
        let mut writes: Vec<(Tag, Value)> = Vec::new();
        for (name, target) in &self.outputs {
            let Some(value) = results.get(name) else {
                continue;
            };
            let Some(tag) = target.resolve(ctx) else {
                ctx.set_fault(Fault::AddressError);
                return;
            };
            match tag.tag_type.store_copy(value) {
                Some(stored) => writes.push((tag, stored)),
                None => {
                    ctx.set_fault(Fault::OutOfRange);
                    return;
                }
            }
        }
        for (tag, value) in &writes {
            ctx.write(tag, value.clone());
        }
    }
}

/// Calls `function` on every enabled scan.
#[derive(Clone)]
pub struct RunFunction {
    pub name: String,
    pub function: HostFn,
    pub bindings: Bindings,
}

impl RunFunction {
    pub fn new<S, F>(name: S, function: F, bindings: Bindings) -> Self
    where
        S: Into<String>,
        F: Fn(&Values) -> Values + Send + Sync + 'static,
    {
        RunFunction {
            name: name.into(),
            function: Arc::new(function),
            bindings,
        }
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext) -> Result<()> {
        if let Some(inputs) = self.bindings.gather(ctx) {
            let results = (self.function)(&inputs);
            self.bindings.scatter(ctx, &results);
        }
        Ok(())
    }
}

impl fmt::Debug for RunFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunFunction")
            .field("name", &self.name)
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

impl PartialEq for RunFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && Arc::ptr_eq(&self.function, &other.function)
            && self.bindings == other.bindings
    }
}

/// Calls `function` on every scan with the rung's enabled flag.
#[derive(Clone)]
pub struct RunEnabledFunction {
    pub name: String,
    pub function: EnabledHostFn,
    pub bindings: Bindings,
}

impl RunEnabledFunction {
    pub fn new<S, F>(name: S, function: F, bindings: Bindings) -> Self
    where
        S: Into<String>,
        F: Fn(bool, &Values) -> Values + Send + Sync + 'static,
    {
        RunEnabledFunction {
            name: name.into(),
            function: Arc::new(function),
            bindings,
        }
    }

    pub(crate) fn execute(&self, ctx: &mut ScanContext, enabled: bool) -> Result<()> {
        if let Some(inputs) = self.bindings.gather(ctx) {
            let results = (self.function)(enabled, &inputs);
            self.bindings.scatter(ctx, &results);
        }
        Ok(())
    }
}

impl fmt::Debug for RunEnabledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunEnabledFunction")
            .field("name", &self.name)
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

impl PartialEq for RunEnabledFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && Arc::ptr_eq(&self.function, &other.function)
            && self.bindings == other.bindings
    }
}
