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
fn scenario_4_insert_persist_leaves_source_untouched() -> Result<(), Box<dyn Error>> {
    common::init();
    let mut t1: Table<char> = Table::new();
    t1.insert(v4(10, 0, 0, 0, 8)?, 'A')?;

    let (t2, prior) = t1.insert_persist(v4(10, 0, 1, 0, 24)?, 'B')?;
    assert_eq!(prior, None);

    assert_eq!(t1.get(v4(10, 0, 1, 0, 24)?)?, None);
    assert_eq!(t2.get(v4(10, 0, 1, 0, 24)?)?, Some(&'B'));
    assert_eq!(t2.get(v4(10, 0, 0, 0, 8)?)?, Some(&'A'));
    Ok(())
}

#[test]
fn delete_persist_leaves_source_untouched() -> Result<(), Box<dyn Error>> {
    common::init();
    let mut t1: Table<u32> = Table::new();
    t1.insert(v4(10, 0, 0, 0, 8)?, 1)?;
    t1.insert(v4(10, 1, 0, 0, 16)?, 2)?;

    let (t2, removed) = t1.delete_persist(v4(10, 1, 0, 0, 16)?)?;
    assert_eq!(removed, Some(2));

    assert_eq!(t1.get(v4(10, 1, 0, 0, 16)?)?, Some(&2));
    assert_eq!(t2.get(v4(10, 1, 0, 0, 16)?)?, None);
    assert_eq!(t2.get(v4(10, 0, 0, 0, 8)?)?, Some(&1));
    Ok(())
}

#[test]
fn modify_persist_leaves_source_untouched() -> Result<(), Box<dyn Error>> {
    common::init();
    let mut t1: Table<u32> = Table::new();
    t1.insert(v4(10, 0, 0, 0, 8)?, 1)?;

    let (t2, prior, deleted) =
        t1.modify_persist(v4(10, 0, 0, 0, 8)?, |existing| Some(existing.copied().unwrap_or(0) + 10))?;
    assert_eq!(prior, Some(1));
    assert!(!deleted);

    assert_eq!(t1.get(v4(10, 0, 0, 0, 8)?)?, Some(&1));
    assert_eq!(t2.get(v4(10, 0, 0, 0, 8)?)?, Some(&11));
    Ok(())
}

#[test]
fn walk_persist_folds_a_derived_tree_without_mutating_the_source() -> Result<(), Box<dyn Error>> {
    common::init();
    let mut t: Table<u32> = Table::new();
    t.insert(v4(10, 0, 0, 0, 8)?, 1)?;
    t.insert(v4(10, 1, 0, 0, 16)?, 2)?;
    t.insert(v4(192, 168, 0, 1, 32)?, 3)?;

    let doubled = t.walk_persist(|acc, p, v| {
        let (next, _prior) = acc.insert_persist(p, v * 2).expect("insert_persist");
        (next, true)
    });

    assert_eq!(doubled.get(v4(10, 0, 0, 0, 8)?)?, Some(&2));
    assert_eq!(doubled.get(v4(10, 1, 0, 0, 16)?)?, Some(&4));
    assert_eq!(doubled.get(v4(192, 168, 0, 1, 32)?)?, Some(&6));

    assert_eq!(t.get(v4(10, 0, 0, 0, 8)?)?, Some(&1));
    assert_eq!(t.size4(), 3);
    Ok(())
}

#[test]
fn walk_persist_stops_early_when_the_continue_flag_is_false() -> Result<(), Box<dyn Error>> {
    common::init();
    let mut t: Table<u32> = Table::new();
    t.insert(v4(10, 0, 0, 0, 8)?, 1)?;
    t.insert(v4(10, 1, 0, 0, 16)?, 2)?;

    let mut visited = 0u32;
    let _ = t.walk_persist(|acc, _p, _v| {
        visited += 1;
        (acc, false)
    });

    assert_eq!(visited, 1);
    Ok(())
}
