use super::*;
use crate::block::Block;
use crate::condition::Condition;
use crate::instruction::Shift;
use crate::tag::{Tag, TagType};

fn register() -> Sim {
    let (data, clk, rst) = (Tag::bool("DATA"), Tag::bool("CLK"), Tag::bool("RST"));
    let c = Block::new("C", TagType::Bool, 1, 4).unwrap();
    let shift = Shift::new(c.select(1, 4).unwrap(), Condition::bit(&clk).unwrap())
        .unwrap()
        .reset_when(Condition::bit(&rst).unwrap());
    Sim::new(vec![Rung::when([Condition::bit(&data).unwrap()]).then(shift)])
}

fn bits(sim: &Sim) -> Vec<bool> {
    (1..=4).map(|i| sim.bit(&format!("C{i}"))).collect()
}

#[test]
fn shifts_only_on_clock_rising_edge() {
    let mut sim = register();
    sim.set("DATA", true);
    sim.scan(0.1);
    assert_eq!(bits(&sim), vec![false; 4]);

    sim.set("CLK", true);
    sim.scan(0.1);
    assert_eq!(bits(&sim), vec![true, false, false, false]);

    sim.set("DATA", false);
    sim.scan(0.1);
    assert_eq!(bits(&sim), vec![true, false, false, false]);

    sim.set("CLK", false);
    sim.scan(0.1);
    sim.set("CLK", true);
    sim.scan(0.1);
    assert_eq!(bits(&sim), vec![false, true, false, false]);
}

#[test]
fn reset_beats_a_coincident_edge() {
    let mut sim = register();
    sim.set("DATA", true);
    sim.set("CLK", true);
    sim.scan(0.1);
    sim.set("CLK", false);
    sim.scan(0.1);

    sim.set("CLK", true);
    sim.set("RST", true);
    sim.scan(0.1);
    assert_eq!(bits(&sim), vec![false; 4]);
}

#[test]
fn shift_needs_a_bool_range() {
    let ds = Block::new("DS", TagType::Int, 1, 4).unwrap();
    let clk = Tag::bool("CLK");
    assert!(Shift::new(ds.all(), Condition::bit(&clk).unwrap()).is_err());
}
