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
fn scenario_1_most_specific_wins() -> Result<(), Box<dyn Error>> {
    common::init();
    let mut t: Table<char> = Table::new();
    t.insert(v4(10, 0, 0, 0, 8)?, 'A')?;
    t.insert(v4(10, 1, 0, 0, 16)?, 'B')?;
    t.insert(v4(10, 1, 1, 0, 24)?, 'C')?;

    assert_eq!(t.lookup(Ipv4Addr::new(10, 1, 1, 5).into()), Some(&'C'));
    assert_eq!(t.lookup(Ipv4Addr::new(10, 1, 2, 5).into()), Some(&'B'));
    assert_eq!(t.lookup(Ipv4Addr::new(10, 2, 0, 1).into()), Some(&'A'));
    assert_eq!(t.lookup(Ipv4Addr::new(11, 0, 0, 1).into()), None);
    Ok(())
}

#[test]
fn scenario_2_default_route() -> Result<(), Box<dyn Error>> {
    common::init();
    let mut t: Table<char> = Table::new();
    t.insert(v4(0, 0, 0, 0, 0)?, 'D')?;

    assert_eq!(t.lookup(Ipv4Addr::new(11, 0, 0, 1).into()), Some(&'D'));
    assert!(t.contains(Ipv4Addr::new(11, 0, 0, 1).into()));
    Ok(())
}

#[test]
fn get_requires_exact_prefix() -> Result<(), Box<dyn Error>> {
    common::init();
    let mut t: Table<u32> = Table::new();
    t.insert(v4(10, 0, 0, 0, 8)?, 1)?;

    assert_eq!(t.get(v4(10, 0, 0, 0, 8)?)?, Some(&1));
    assert_eq!(t.get(v4(10, 0, 0, 0, 16)?)?, None);
    Ok(())
}

#[test]
fn lookup_prefix_and_lpm_reconstruct_the_match() -> Result<(), Box<dyn Error>> {
    common::init();
    let mut t: Table<u32> = Table::new();
    t.insert(v4(10, 0, 0, 0, 8)?, 1)?;
    t.insert(v4(10, 1, 0, 0, 16)?, 2)?;

    let query = v4(10, 1, 2, 0, 24)?;
    assert_eq!(t.lookup_prefix(query)?, Some(&2));

    let (matched, value) = t.lookup_prefix_lpm(query)?.expect("expected a match");
    assert_eq!(matched.len(), 16);
    assert_eq!(matched.addr(), Ipv4Addr::new(10, 1, 0, 0).into());
    assert_eq!(value, &2);
    Ok(())
}

#[test]
fn canonicalization_masks_host_bits_on_insert() -> Result<(), Box<dyn Error>> {
    common::init();
    let mut t: Table<u32> = Table::new();
    // 10.1.2.3/8 has host bits set; insert must mask it to 10.0.0.0/8.
    t.insert(v4(10, 1, 2, 3, 8)?, 42)?;

    assert_eq!(t.get(v4(10, 0, 0, 0, 8)?)?, Some(&42));
    Ok(())
}
