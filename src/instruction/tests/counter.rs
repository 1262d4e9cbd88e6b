use super::*;
use crate::condition::Condition;
use crate::instruction::{CountDown, CountUp};
use crate::tag::Tag;

#[test]
fn counts_every_enabled_scan() {
    let (en, done, acc) = (Tag::bool("EN"), Tag::bool("CT1"), Tag::dint("CTD1"));
    let ctu = CountUp::new(&done, &acc, 3).unwrap();
    let mut sim = Sim::new(vec![Rung::when([Condition::bit(&en).unwrap()]).then(ctu)]);
    sim.set("EN", true);
    let mut seen = Vec::new();
    for _ in 0..3 {
        sim.scan(0.1);
        seen.push((sim.int("CTD1"), sim.bit("CT1")));
    }
    assert_eq!(seen, vec![(1, false), (2, false), (3, true)]);

    sim.set("EN", false);
    sim.scan(0.1);
    assert_eq!((sim.int("CTD1"), sim.bit("CT1")), (3, true));
}

#[test]
fn reset_short_circuits_counting() {
    let (en, rst) = (Tag::bool("EN"), Tag::bool("RST"));
    let (done, acc) = (Tag::bool("CT1"), Tag::dint("CTD1"));
    let ctu = CountUp::new(&done, &acc, 2)
        .unwrap()
        .reset_when(Condition::bit(&rst).unwrap());
    let mut sim = Sim::new(vec![Rung::when([Condition::bit(&en).unwrap()]).then(ctu)]);
    sim.set("EN", true);
    sim.scan(0.1);
    sim.scan(0.1);
    assert!(sim.bit("CT1"));

    sim.set("RST", true);
    sim.scan(0.1);
    assert_eq!((sim.int("CTD1"), sim.bit("CT1")), (0, false));
    sim.scan(0.1);
    assert_eq!(sim.int("CTD1"), 0);
}

#[test]
fn up_down_counter_nets_its_inputs() {
    let (up, down) = (Tag::bool("UP"), Tag::bool("DN"));
    let (done, acc) = (Tag::bool("CT1"), Tag::dint("CTD1"));
    let ctu = CountUp::new(&done, &acc, 5)
        .unwrap()
        .down_when(Condition::bit(&down).unwrap());
    let mut sim = Sim::new(vec![Rung::when([Condition::bit(&up).unwrap()]).then(ctu)]);
    sim.set("UP", true);
    sim.scan(0.1);
    sim.set("DN", true);
    sim.scan(0.1);
    assert_eq!(sim.int("CTD1"), 1);
    sim.set("UP", false);
    sim.scan(0.1);
    sim.scan(0.1);
    assert_eq!(sim.int("CTD1"), -1);
}

#[test]
fn count_down_is_done_at_negative_preset() {
    let (en, done, acc) = (Tag::bool("EN"), Tag::bool("CT2"), Tag::dint("CTD2"));
    let ctd = CountDown::new(&done, &acc, 2).unwrap();
    let mut sim = Sim::new(vec![Rung::when([Condition::bit(&en).unwrap()]).then(ctd)]);
    sim.set("EN", true);
    sim.scan(0.1);
    assert_eq!((sim.int("CTD2"), sim.bit("CT2")), (-1, false));
    sim.scan(0.1);
    assert_eq!((sim.int("CTD2"), sim.bit("CT2")), (-2, true));
}

#[test]
fn accumulator_clamps_to_dint() {
    let (done, acc) = (Tag::bool("CT1"), Tag::dint("CTD1"));
    let ctu = CountUp::new(&done, &acc, 1).unwrap();
    let sim = run_once(Rung::new().then(ctu), &[("CTD1", Value::Int(i32::MAX as i64))]);
    assert_eq!(sim.int("CTD1"), i32::MAX as i64);
}
