use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::block::Block;
use crate::condition::Condition;
use crate::expression::Expression;
use crate::instruction::{Bindings, RunEnabledFunction, RunFunction, Values};
use crate::tag::{Tag, TagType};

fn adder() -> RunFunction {
    let (a, b, sum) = (Tag::int("A"), Tag::int("B"), Tag::int("SUM"));
    RunFunction::new(
        "add",
        |inputs: &Values| {
            let total: i64 = inputs.values().filter_map(Value::as_i64).sum();
            Values::from([("sum".to_owned(), Value::Int(total))])
        },
        Bindings::default()
            .input("a", &a)
            .input("b", &b)
            .output("sum", &sum),
    )
}

#[test]
fn function_maps_inputs_to_outputs() {
    let sim = run_once(
        Rung::new().then(adder()),
        &[("A", 2.into()), ("B", 3.into())],
    );
    assert_eq!(sim.int("SUM"), 5);
}

#[test]
fn outputs_follow_the_copy_law() {
    let sim = run_once(
        Rung::new().then(adder()),
        &[("A", 30000.into()), ("B", 30000.into())],
    );
    assert_eq!(sim.int("SUM"), 32767);
}

#[test]
fn function_only_runs_when_enabled() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let en = Tag::bool("EN");
    let f = RunFunction::new(
        "count",
        move |_: &Values| {
            seen.fetch_add(1, Ordering::SeqCst);
            Values::new()
        },
        Bindings::default(),
    );
    let mut sim = Sim::new(vec![Rung::when([Condition::bit(&en).unwrap()]).then(f)]);
    sim.scan(0.1);
    sim.set("EN", true);
    sim.scan(0.1);
    sim.scan(0.1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn enabled_function_sees_the_rung_state() {
    let (en, out) = (Tag::bool("EN"), Tag::bool("OUT"));
    let f = RunEnabledFunction::new(
        "mirror",
        |enabled: bool, _: &Values| Values::from([("out".to_owned(), Value::Bool(!enabled))]),
        Bindings::default().output("out", &out),
    );
    let mut sim = Sim::new(vec![Rung::when([Condition::bit(&en).unwrap()]).then(f)]);
    sim.scan(0.1);
    assert!(sim.bit("OUT"));
    sim.set("EN", true);
    sim.scan(0.1);
    assert!(!sim.bit("OUT"));
}

#[test]
fn missing_outputs_leave_tags_alone() {
    let (x, y) = (Tag::int("X"), Tag::int("Y"));
    let f = RunFunction::new(
        "partial",
        |_: &Values| Values::from([("x".to_owned(), Value::Int(1))]),
        Bindings::default().output("x", &x).output("y", &y),
    );
    let sim = run_once(Rung::new().then(f), &[("Y", 9.into())]);
    assert_eq!((sim.int("X"), sim.int("Y")), (1, 9));
}

#[test]
fn one_bad_output_writes_nothing() {
    let (x, c) = (Tag::int("X"), Tag::char("C"));
    let f = RunFunction::new(
        "bad",
        |_: &Values| {
            Values::from([
                ("x".to_owned(), Value::Int(1)),
                ("c".to_owned(), Value::Int(65)),
            ])
        },
        Bindings::default().output("x", &x).output("c", &c),
    );
    let sim = run_once(Rung::new().then(f), &[("X", 9.into())]);
    assert!(sim.fault(Fault::OutOfRange));
    assert_eq!(sim.int("X"), 9);
}

#[test]
fn faulting_input_skips_the_call() {
    let (p, out) = (Tag::int("P"), Tag::int("OUT"));
    let ds = Block::new("DS", TagType::Int, 1, 4).unwrap();
    let f = RunFunction::new(
        "never",
        |_: &Values| Values::from([("out".to_owned(), Value::Int(1))]),
        Bindings::default()
            .input("v", Expression::from(ds.at(&p)))
            .output("out", &out),
    );
    let sim = run_once(Rung::new().then(f), &[("P", 40.into())]);
    assert!(sim.fault(Fault::AddressError));
    assert_eq!(sim.get("OUT"), None);
}
