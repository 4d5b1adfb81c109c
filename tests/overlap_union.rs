use std::error::Error;
use std::net::Ipv4Addr;

use bart_rs::Table;
use inetnum::addr::Prefix;

mod common {
    pub fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }
}

fn v4(a: u8, b: u8, c: u8, d: u8, len: u8) -> Result<Prefix, Box<dyn Error>> {
    Ok(Prefix::new(Ipv4Addr::new(a, b, c, d).into(), len)?)
}

#[test]
fn scenario_5_overlap_depends_on_prefix_relation() -> Result<(), Box<dyn Error>> {
    common::init();
    let mut t1: Table<u32> = Table::new();
    t1.insert(v4(10, 0, 0, 0, 8)?, 1)?;

    let mut disjoint: Table<u32> = Table::new();
    disjoint.insert(v4(172, 16, 0, 0, 12)?, 2)?;
    assert!(!t1.overlaps(&disjoint));
    assert!(!disjoint.overlaps(&t1));

    let mut nested: Table<u32> = Table::new();
    nested.insert(v4(10, 1, 0, 0, 16)?, 3)?;
    assert!(t1.overlaps(&nested));
    assert!(nested.overlaps(&t1));
    Ok(())
}

#[test]
fn overlaps_prefix_agrees_with_a_linear_scan() -> Result<(), Box<dyn Error>> {
    common::init();
    let mut t: Table<u32> = Table::new();
    t.insert(v4(10, 0, 0, 0, 8)?, 1)?;
    t.insert(v4(192, 168, 1, 0, 24)?, 2)?;

    assert!(t.overlaps_prefix(v4(10, 1, 0, 0, 16)?)?);
    assert!(t.overlaps_prefix(v4(10, 0, 0, 0, 7)?)?);
    assert!(!t.overlaps_prefix(v4(172, 16, 0, 0, 12)?)?);
    Ok(())
}

#[test]
fn union_merges_and_other_wins_on_collision() -> Result<(), Box<dyn Error>> {
    common::init();
    let mut t1: Table<u32> = Table::new();
    t1.insert(v4(10, 0, 0, 0, 8)?, 1)?;
    t1.insert(v4(10, 1, 0, 0, 16)?, 2)?;

    let mut t2: Table<u32> = Table::new();
    t2.insert(v4(10, 1, 0, 0, 16)?, 99)?; // collides, t2 should win
    t2.insert(v4(172, 16, 0, 0, 12)?, 3)?;

    t1.union(&t2);

    assert_eq!(t1.get(v4(10, 0, 0, 0, 8)?)?, Some(&1));
    assert_eq!(t1.get(v4(10, 1, 0, 0, 16)?)?, Some(&99));
    assert_eq!(t1.get(v4(172, 16, 0, 0, 12)?)?, Some(&3));
    assert_eq!(t1.size4(), 3);
    Ok(())
}

#[test]
fn union_persist_leaves_both_sources_untouched() -> Result<(), Box<dyn Error>> {
    common::init();
    let mut t1: Table<u32> = Table::new();
    t1.insert(v4(10, 0, 0, 0, 8)?, 1)?;

    let mut t2: Table<u32> = Table::new();
    t2.insert(v4(172, 16, 0, 0, 12)?, 2)?;

    let merged = t1.union_persist(&t2);
    assert_eq!(merged.size4(), 2);
    assert_eq!(t1.size4(), 1);
    assert_eq!(t2.size4(), 1);
    Ok(())
}
