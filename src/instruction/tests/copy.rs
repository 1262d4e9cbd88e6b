use super::*;
use crate::block::Block;
use crate::error::LadderError;
use crate::expression::Expression;
use crate::instruction::{BlockCopy, CopyModifier, Fill, SingleCopy};
use crate::tag::{Tag, TagType};

fn text_block() -> Block {
    Block::new("TXT", TagType::Char, 1, 8).unwrap()
}

#[test]
fn copy_clamps_into_destination() {
    let n = Tag::int("N");
    let sim = run_once(Rung::new().then(SingleCopy::new(70000, &n).unwrap()), &[]);
    assert_eq!(sim.get("N"), Some(Value::Int(32767)));
    assert!(!sim.fault(Fault::OutOfRange));
}

#[test]
fn copy_real_into_int_truncates_and_clamps() {
    let (r, n) = (Tag::real("R"), Tag::int("N"));
    let mut sim = Sim::new(vec![Rung::new().then(SingleCopy::new(&r, &n).unwrap())]);
    sim.set("R", -2.9);
    sim.scan(0.1);
    assert_eq!(sim.int("N"), -2);
    sim.set("R", -1.0e9);
    sim.scan(0.1);
    assert_eq!(sim.int("N"), -32768);
}

#[test]
fn indirect_copy_outside_valid_window_faults() {
    let p = Tag::int("P");
    let ds = Block::new("DS", TagType::Int, 1, 20)
        .unwrap()
        .with_valid_ranges(&[(1, 10)])
        .unwrap();
    let mut sim = Sim::new(vec![
        Rung::new().then(SingleCopy::new(42, ds.at(&p)).unwrap()),
    ]);
    sim.set("DS15", 7);
    sim.set("P", 15);
    sim.scan(0.1);
    assert!(sim.fault(Fault::AddressError));
    assert_eq!(sim.get("DS15"), Some(Value::Int(7)));

    sim.set("P", 3);
    sim.scan(0.1);
    assert!(!sim.fault(Fault::AddressError));
    assert_eq!(sim.get("DS3"), Some(Value::Int(42)));
}

#[test]
fn text_spreads_over_char_range() {
    let txt = text_block();
    let mut sim = Sim::new(vec![
        Rung::new().then(SingleCopy::new("HI", txt.select(1, 3).unwrap()).unwrap()),
    ]);
    sim.set("TXT3", "Z");
    sim.scan(0.1);
    assert_eq!(sim.get("TXT1"), Some(Value::Char("H".into())));
    assert_eq!(sim.get("TXT2"), Some(Value::Char("I".into())));
    assert_eq!(sim.get("TXT3"), Some(Value::Char(String::new())));
}

#[test]
fn as_value_parses_a_signed_decimal() {
    let txt = text_block();
    let d = Tag::dint("D");
    let copy =
        SingleCopy::converted(txt.select(1, 3).unwrap(), &d, CopyModifier::AsValue).unwrap();
    let mut sim = Sim::new(vec![Rung::new().then(copy)]);
    sim.set("TXT1", "-");
    sim.set("TXT2", "4");
    sim.set("TXT3", "2");
    sim.scan(0.1);
    assert_eq!(sim.get("D"), Some(Value::Int(-42)));

    sim.set("TXT2", "x");
    sim.scan(0.1);
    assert!(sim.fault(Fault::OutOfRange));
    assert_eq!(sim.get("D"), Some(Value::Int(-42)));
}

#[test]
fn as_ascii_and_as_binary() {
    let (c, n, out) = (Tag::char("C"), Tag::int("N"), Tag::char("OUT"));
    let mut sim = Sim::new(vec![
        Rung::new()
            .then(SingleCopy::converted(&c, &n, CopyModifier::AsAscii).unwrap())
            .then(SingleCopy::converted(&n, &out, CopyModifier::AsBinary).unwrap()),
    ]);
    sim.set("C", "A");
    sim.scan(0.1);
    assert_eq!(sim.int("N"), 65);
    assert_eq!(sim.get("OUT"), Some(Value::Char("A".into())));
}

#[test]
fn as_binary_rejects_codes_above_ascii() {
    let (n, out) = (Tag::int("N"), Tag::char("OUT"));
    let copy = SingleCopy::converted(&n, &out, CopyModifier::AsBinary).unwrap();
    let sim = run_once(Rung::new().then(copy), &[("N", Value::Int(200)), ("OUT", "q".into())]);
    assert!(sim.fault(Fault::OutOfRange));
    assert_eq!(sim.get("OUT"), Some(Value::Char("q".into())));
}

#[test]
fn as_text_never_writes_partially() {
    let txt = text_block();
    let d = Tag::dint("D");
    let copy = SingleCopy::converted(
        &d,
        txt.select(1, 3).unwrap(),
        CopyModifier::AsText { suppress_zero: true },
    )
    .unwrap();
    let mut sim = Sim::new(vec![Rung::new().then(copy)]);
    sim.set("D", 123456);
    sim.scan(0.1);
    assert!(sim.fault(Fault::OutOfRange));
    assert_eq!(sim.get("TXT1"), None);

    sim.set("D", 42);
    sim.set("TXT3", "!");
    sim.scan(0.1);
    assert!(!sim.fault(Fault::OutOfRange));
    assert_eq!(sim.get("TXT1"), Some(Value::Char("4".into())));
    assert_eq!(sim.get("TXT2"), Some(Value::Char("2".into())));
    assert_eq!(sim.get("TXT3"), Some(Value::Char("!".into())));
}

#[test]
fn copy_rejects_mismatched_operands() {
    let txt = text_block();
    assert!(SingleCopy::new("A", &Tag::int("N")).is_err());
    assert!(SingleCopy::new(5, txt.select(1, 2).unwrap()).is_err());
    assert!(
        SingleCopy::converted(&Tag::int("N"), &Tag::dint("D"), CopyModifier::AsAscii).is_err()
    );
}

#[test]
fn blockcopy_copies_element_wise() {
    let ds = Block::new("DS", TagType::Int, 1, 10).unwrap();
    let dd = Block::new("DD", TagType::Dint, 1, 10).unwrap();
    let copy = BlockCopy::new(ds.select(1, 3).unwrap(), dd.select(4, 6).unwrap()).unwrap();
    let sim = run_once(
        Rung::new().then(copy),
        &[("DS1", 1.into()), ("DS2", 2.into()), ("DS3", 3.into())],
    );
    assert_eq!(sim.int("DD4"), 1);
    assert_eq!(sim.int("DD5"), 2);
    assert_eq!(sim.int("DD6"), 3);
}

#[test]
fn blockcopy_lengths_must_match() {
    let ds = Block::new("DS", TagType::Int, 1, 10).unwrap();
    assert_eq!(
        BlockCopy::new(ds.select(1, 3).unwrap(), ds.select(4, 5).unwrap()),
        Err(LadderError::LengthMismatch {
            expected: 3,
            found: 2
        })
    );
}

#[test]
fn blockcopy_runtime_mismatch_is_an_address_error() {
    let p = Tag::int("P");
    let ds = Block::new("DS", TagType::Int, 1, 10).unwrap();
    let copy = BlockCopy::new(
        ds.select(1, 3).unwrap(),
        ds.select_indirect(5, Expression::tag(&p)),
    )
    .unwrap();
    let mut sim = Sim::new(vec![Rung::new().then(copy)]);
    sim.set("DS1", 9);
    sim.set("P", 6);
    sim.scan(0.1);
    assert!(sim.fault(Fault::AddressError));
    assert_eq!(sim.get("DS5"), None);

    sim.set("P", 7);
    sim.scan(0.1);
    assert!(!sim.fault(Fault::AddressError));
    assert_eq!(sim.int("DS5"), 9);
}

#[test]
fn fill_writes_every_element() {
    let ds = Block::new("DS", TagType::Int, 1, 10).unwrap();
    let fill = Fill::new(40000, ds.select(2, 4).unwrap()).unwrap();
    let sim = run_once(Rung::new().then(fill), &[]);
    assert_eq!(sim.get("DS1"), None);
    for name in ["DS2", "DS3", "DS4"] {
        assert_eq!(sim.int(name), 32767);
    }
}

#[test]
fn inverted_indirect_range_is_a_program_error() {
    let p = Tag::int("P");
    let ds = Block::new("DS", TagType::Int, 1, 10).unwrap();
    let fill = Fill::new(1, ds.select_indirect(&p, 2)).unwrap();
    let mut sim = Sim::new(vec![Rung::new().then(fill)]);
    sim.set("P", 6);
    let before = sim.state.clone();
    let result = sim.program.scan(&sim.state, &mut sim.runtime, 0.1);
    assert!(matches!(
        result,
        Err(LadderError::InvalidRange { start: 6, end: 2, .. })
    ));
    assert_eq!(sim.state, before);
    assert_eq!(sim.get("DS2"), None);
}
