use super::*;
use crate::block::Block;
use crate::condition::CmpOp;
use crate::instruction::{Search, SearchCondition};
use crate::tag::{Tag, TagType};

fn numbers() -> Block {
    Block::new("DS", TagType::Int, 1, 4).unwrap()
}

fn equals(value: i64) -> SearchCondition {
    SearchCondition::Number {
        op: CmpOp::Eq,
        value: value.into(),
    }
}

fn seeded(search: Search) -> Sim {
    let mut sim = Sim::new(vec![Rung::new().then(search)]);
    for (i, v) in [7, 0, 7, 0].into_iter().enumerate() {
        sim.set(&format!("DS{}", i + 1), v);
    }
    sim
}

#[test]
fn continuous_search_walks_then_exhausts() {
    let (result, found) = (Tag::int("R"), Tag::bool("F"));
    let search = Search::new(numbers().all(), equals(7), &result, &found)
        .unwrap()
        .continuous();
    let mut sim = seeded(search);
    let mut seen = Vec::new();
    for _ in 0..4 {
        sim.scan(0.1);
        seen.push((sim.int("R"), sim.bit("F")));
    }
    assert_eq!(
        seen,
        vec![(1, true), (3, true), (-1, false), (-1, false)]
    );

    sim.set("R", 0);
    sim.scan(0.1);
    assert_eq!(sim.int("R"), 1);
}

#[test]
fn one_shot_search_restarts_every_time() {
    let (result, found) = (Tag::int("R"), Tag::bool("F"));
    let search = Search::new(numbers().all(), equals(7), &result, &found).unwrap();
    let mut sim = seeded(search);
    sim.scan(0.1);
    sim.scan(0.1);
    assert_eq!(sim.int("R"), 1);
}

#[test]
fn reverse_range_reports_highest_first() {
    let (result, found) = (Tag::int("R"), Tag::bool("F"));
    let search = Search::new(numbers().all().reverse(), equals(7), &result, &found)
        .unwrap()
        .continuous();
    let mut sim = seeded(search);
    sim.scan(0.1);
    assert_eq!(sim.int("R"), 3);
    sim.scan(0.1);
    assert_eq!(sim.int("R"), 1);
    sim.scan(0.1);
    assert_eq!(sim.int("R"), -1);
}

#[test]
fn ordering_comparison() {
    let (result, found) = (Tag::int("R"), Tag::bool("F"));
    let cond = SearchCondition::Number {
        op: CmpOp::Lt,
        value: 5.into(),
    };
    let sim = run_once(
        Rung::new().then(Search::new(numbers().all(), cond, &result, &found).unwrap()),
        &[("DS1", 9.into()), ("DS2", 8.into()), ("DS3", 4.into())],
    );
    assert_eq!(sim.int("R"), 3);
}

#[test]
fn miss_reports_minus_one() {
    let (result, found) = (Tag::int("R"), Tag::bool("F"));
    let sim = run_once(
        Rung::new().then(Search::new(numbers().all(), equals(99), &result, &found).unwrap()),
        &[("R", 2.into()), ("F", true.into())],
    );
    assert_eq!((sim.int("R"), sim.bit("F")), (-1, false));
}

#[test]
fn text_search_matches_windows() {
    let txt = Block::new("TXT", TagType::Char, 1, 5).unwrap();
    let (result, found) = (Tag::int("R"), Tag::bool("F"));
    let cond = SearchCondition::Text {
        op: CmpOp::Eq,
        text: "AB".into(),
    };
    let search = Search::new(txt.all(), cond, &result, &found)
        .unwrap()
        .continuous();
    let mut sim = Sim::new(vec![Rung::new().then(search)]);
    for (i, c) in "ABCAB".chars().enumerate() {
        sim.set(&format!("TXT{}", i + 1), c.to_string());
    }
    sim.scan(0.1);
    assert_eq!(sim.int("R"), 1);
    sim.scan(0.1);
    assert_eq!(sim.int("R"), 4);
    sim.scan(0.1);
    assert_eq!(sim.int("R"), -1);
}

#[test]
fn text_search_rejects_ordering() {
    let txt = Block::new("TXT", TagType::Char, 1, 5).unwrap();
    let cond = SearchCondition::Text {
        op: CmpOp::Gt,
        text: "A".into(),
    };
    assert!(Search::new(txt.all(), cond, &Tag::int("R"), &Tag::bool("F")).is_err());
}
