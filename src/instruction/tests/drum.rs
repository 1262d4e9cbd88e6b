use super::*;
use crate::condition::Condition;
use crate::error::LadderError;
use crate::expression::Expression;
use crate::instruction::{DrumCore, EventDrum, Out, TimeDrum, TimeUnit};
use crate::tag::Tag;

fn core() -> DrumCore {
    DrumCore::new(
        vec![Tag::bool("Y1"), Tag::bool("Y2")],
        vec![vec![true, false], vec![false, true], vec![true, true]],
        &Tag::int("STEP"),
        &Tag::bool("DONE"),
    )
    .unwrap()
}

fn event_drum() -> Sim {
    let events = ["E1", "E2", "E3"]
        .iter()
        .map(|name| Condition::bit(&Tag::bool(*name)).unwrap())
        .collect();
    let drum = EventDrum::new(core(), events)
        .unwrap()
        .reset_when(Condition::bit(&Tag::bool("RST")).unwrap())
        .jump_when(Condition::bit(&Tag::bool("JMP")).unwrap(), 3)
        .jog_when(Condition::bit(&Tag::bool("JOG")).unwrap());
    let run = Tag::bool("RUN");
    Sim::new(vec![Rung::when([Condition::bit(&run).unwrap()]).then(drum)])
}

fn outputs(sim: &Sim) -> (bool, bool) {
    (sim.bit("Y1"), sim.bit("Y2"))
}

#[test]
fn event_drum_needs_a_fresh_rising_event() {
    let mut sim = event_drum();
    sim.set("RUN", true);
    sim.scan(0.1);
    assert_eq!(sim.int("STEP"), 1);
    assert_eq!(outputs(&sim), (true, false));

    sim.set("E1", true);
    sim.set("E2", true);
    sim.scan(0.1);
    assert_eq!(sim.int("STEP"), 2);
    assert_eq!(outputs(&sim), (false, true));

    sim.scan(0.1);
    assert_eq!(sim.int("STEP"), 2);

    sim.set("E2", false);
    sim.scan(0.1);
    sim.set("E2", true);
    sim.scan(0.1);
    assert_eq!(sim.int("STEP"), 3);

    sim.scan(0.1);
    sim.set("E3", false);
    sim.scan(0.1);
    sim.set("E3", true);
    sim.scan(0.1);
    assert!(sim.bit("DONE"));
    assert_eq!(sim.int("STEP"), 3);
    assert_eq!(outputs(&sim), (true, true));
}

#[test]
fn reset_returns_to_first_step() {
    let mut sim = event_drum();
    sim.set("RUN", true);
    sim.set("JMP", true);
    sim.scan(0.1);
    assert_eq!(sim.int("STEP"), 3);

    sim.set("RUN", false);
    sim.set("RST", true);
    sim.scan(0.1);
    assert_eq!(sim.int("STEP"), 1);
    assert!(!sim.bit("DONE"));
    assert_eq!(outputs(&sim), (true, false));
}

#[test]
fn jog_advances_on_its_edge_only() {
    let mut sim = event_drum();
    sim.set("RUN", true);
    sim.set("JOG", true);
    sim.scan(0.1);
    assert_eq!(sim.int("STEP"), 2);
    sim.scan(0.1);
    assert_eq!(sim.int("STEP"), 2);
}

#[test]
fn disabled_drum_holds_its_outputs() {
    let mut sim = event_drum();
    sim.set("RUN", true);
    sim.scan(0.1);
    sim.set("RUN", false);
    sim.set("Y1", false);
    sim.set("E1", true);
    sim.scan(0.1);
    assert_eq!(sim.int("STEP"), 1);
    assert!(!sim.bit("Y1"));
}

#[test]
fn time_drum_walks_its_presets() {
    let drum = TimeDrum::new(
        DrumCore::new(
            vec![Tag::bool("Y1")],
            vec![vec![true], vec![false]],
            &Tag::int("STEP"),
            &Tag::bool("DONE"),
        )
        .unwrap(),
        vec![Expression::lit(1000), Expression::lit(500)],
        TimeUnit::Ms,
        &Tag::int("ACC"),
    )
    .unwrap();
    let mut sim = Sim::new(vec![Rung::new().then(drum)]);

    sim.scan(0.5);
    assert_eq!((sim.int("STEP"), sim.int("ACC")), (1, 500));
    assert!(sim.bit("Y1"));

    sim.scan(0.5);
    assert_eq!((sim.int("STEP"), sim.int("ACC")), (2, 0));
    assert!(!sim.bit("Y1"));

    sim.scan(0.5);
    assert!(sim.bit("DONE"));
    assert_eq!(sim.int("STEP"), 2);
}

#[test]
fn drum_must_end_its_rung() {
    let drum = EventDrum::new(
        core(),
        vec![Condition::All(vec![]), Condition::All(vec![]), Condition::All(vec![])],
    )
    .unwrap();
    let rung = Rung::new()
        .then(drum)
        .then(Out::new(&Tag::bool("Y9")).unwrap());
    assert_eq!(
        Program::new(vec![rung], BTreeMap::new()),
        Err(LadderError::TerminalNotLast("event_drum"))
    );
}

#[test]
fn drum_pattern_rows_match_outputs() {
    assert!(
        DrumCore::new(
            vec![Tag::bool("Y1")],
            vec![vec![true, false]],
            &Tag::int("STEP"),
            &Tag::bool("DONE"),
        )
        .is_err()
    );
}
