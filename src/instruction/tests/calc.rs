use super::*;
use crate::block::Block;
use crate::expression::Expression;
use crate::instruction::Calc;
use crate::tag::{Tag, TagType};

#[test]
fn calc_wraps_into_int() {
    let n = Tag::int("N");
    let calc = Calc::new(Expression::lit(30000) + 30000, &n).unwrap();
    let sim = run_once(Rung::new().then(calc), &[]);
    assert_eq!(sim.get("N"), Some(Value::Int(-5536)));
    assert!(!sim.fault(Fault::OutOfRange));
}

#[test]
fn calc_wraps_into_dint_and_word() {
    let (d, w) = (Tag::dint("D"), Tag::word("W"));
    let rung = Rung::new()
        .then(Calc::new(Expression::lit(i32::MAX as i64) + 1, &d).unwrap())
        .then(Calc::new(Expression::lit(-1), &w).unwrap());
    let sim = run_once(rung, &[]);
    assert_eq!(sim.int("D"), i32::MIN as i64);
    assert_eq!(sim.int("W"), 0xFFFF);
}

#[test]
fn hex_mode_wraps_unsigned_sixteen_bits() {
    let w = Tag::word("W");
    let calc = Calc::new(Expression::lit(0xFFFF) + 2, &w).unwrap().hex();
    let sim = run_once(Rung::new().then(calc), &[]);
    assert_eq!(sim.int("W"), 1);
}

#[test]
fn division_by_zero_stores_zero() {
    let (n, d) = (Tag::int("N"), Tag::int("DIV"));
    let calc = Calc::new(Expression::lit(10) / Expression::tag(&d), &n).unwrap();
    let sim = run_once(Rung::new().then(calc), &[("N", 12.into()), ("DIV", 0.into())]);
    assert!(sim.fault(Fault::DivisionError));
    assert_eq!(sim.get("N"), Some(Value::Int(0)));
}

#[test]
fn fault_clears_on_the_next_clean_scan() {
    let (n, d) = (Tag::int("N"), Tag::int("DIV"));
    let calc = Calc::new(Expression::lit(10) / Expression::tag(&d), &n).unwrap();
    let mut sim = Sim::new(vec![Rung::new().then(calc)]);
    sim.scan(0.1);
    assert!(sim.fault(Fault::DivisionError));
    sim.set("DIV", 5);
    sim.scan(0.1);
    assert!(!sim.fault(Fault::DivisionError));
    assert_eq!(sim.int("N"), 2);
}

#[test]
fn bad_pointer_skips_the_write() {
    let (n, p) = (Tag::int("N"), Tag::int("P"));
    let ds = Block::new("DS", TagType::Int, 1, 10).unwrap();
    let calc = Calc::new(Expression::from(ds.at(&p)) * 2, &n).unwrap();
    let sim = run_once(Rung::new().then(calc), &[("N", 7.into()), ("P", 11.into())]);
    assert!(sim.fault(Fault::AddressError));
    assert!(!sim.fault(Fault::DivisionError));
    assert_eq!(sim.int("N"), 7);
}

#[test]
fn calc_rejects_text() {
    assert!(Calc::new(Expression::lit(1), &Tag::char("C")).is_err());
    assert!(Calc::new("A", &Tag::int("N")).is_err());
}
