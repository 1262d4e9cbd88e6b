use super::*;
use crate::block::Block;
use crate::condition::Condition;
use crate::expression::Expression;
use crate::instruction::{Instruction, Latch, Out, Reset};
use crate::tag::{Tag, TagType};

fn gated(x: &Tag, item: impl Into<Instruction>) -> Sim {
    Sim::new(vec![Rung::when([Condition::bit(x).unwrap()]).then(item)])
}

#[test]
fn out_follows_rung() {
    let (x, y) = (Tag::bool("X1"), Tag::bool("Y1"));
    let mut sim = gated(&x, Out::new(&y).unwrap());
    sim.set("X1", true);
    sim.scan(0.1);
    assert!(sim.bit("Y1"));
    sim.set("X1", false);
    sim.scan(0.1);
    assert_eq!(sim.get("Y1"), Some(Value::Bool(false)));
}

#[test]
fn latch_never_auto_resets() {
    let (x, y) = (Tag::bool("X1"), Tag::bool("Y1"));
    let mut sim = gated(&x, Latch::new(&y).unwrap());
    sim.set("X1", true);
    sim.scan(0.1);
    sim.set("X1", false);
    sim.scan(0.1);
    sim.scan(0.1);
    assert!(sim.bit("Y1"));
}

#[test]
fn reset_writes_declared_default() {
    let x = Tag::bool("X1");
    let n = Tag::int("N").with_default(5).unwrap();
    let mut sim = gated(&x, Reset::new(&n).unwrap());
    sim.set("N", 99);
    sim.set("X1", true);
    sim.scan(0.1);
    assert_eq!(sim.get("N"), Some(Value::Int(5)));
}

#[test]
fn coils_require_bool_targets() {
    assert!(Out::new(&Tag::int("N")).is_err());
    assert!(Latch::new(&Tag::real("R")).is_err());
    assert!(Reset::new(&Tag::real("R")).is_ok());
}

#[test]
fn oneshot_out_pulses_for_one_scan() {
    let (x, y) = (Tag::bool("X1"), Tag::bool("Y1"));
    let out = Instruction::new(Out::new(&y).unwrap()).oneshot().unwrap();
    let mut sim = gated(&x, out);
    sim.set("X1", true);
    sim.scan(0.1);
    assert!(sim.bit("Y1"));
    sim.scan(0.1);
    assert!(!sim.bit("Y1"));
    sim.scan(0.1);
    assert!(!sim.bit("Y1"));

    sim.set("X1", false);
    sim.scan(0.1);
    sim.set("X1", true);
    sim.scan(0.1);
    assert!(sim.bit("Y1"));
}

#[test]
fn out_drives_a_whole_range() {
    let x = Tag::bool("X1");
    let y = Block::new("Y", TagType::Bool, 1, 8).unwrap();
    let mut sim = gated(&x, Out::new(y.select(2, 4).unwrap()).unwrap());
    sim.set("X1", true);
    sim.scan(0.1);
    assert!(!sim.bit("Y1"));
    assert!(sim.bit("Y2") && sim.bit("Y3") && sim.bit("Y4"));
    assert!(!sim.bit("Y5"));
}

#[test]
fn indirect_range_outside_block_faults() {
    let x = Tag::bool("X1");
    let p = Tag::int("P");
    let y = Block::new("Y", TagType::Bool, 1, 8).unwrap();
    let target = y.select_indirect(&p, Expression::tag(&p) + 2);
    let mut sim = gated(&x, Latch::new(target).unwrap());
    sim.set("X1", true);
    sim.set("P", 7);
    sim.scan(0.1);
    assert!(sim.fault(Fault::AddressError));
    assert_eq!(sim.get("Y7"), None);

    sim.set("P", 2);
    sim.scan(0.1);
    assert!(!sim.fault(Fault::AddressError));
    assert!(sim.bit("Y2") && sim.bit("Y4"));
}
