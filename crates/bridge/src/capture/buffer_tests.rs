// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

fn filled(capacity: usize, count: usize) -> EventBuffer<u32> {
    let mut buf = EventBuffer::new(capacity, 0);
    for i in 0..count {
        buf.add(vec![i as u32], 1000 + i as u64, false);
    }
    buf
}

#[test]
fn add_preserves_insertion_order() {
    let buf = filled(10, 5);
    let values: Vec<u32> = buf.rows(0).into_iter().map(|r| r.record).collect();
    assert_eq!(values, vec![0, 1, 2, 3, 4]);
}

#[test]
fn overflow_evicts_oldest_first() {
    let mut buf = EventBuffer::new(3, 0);
    let evicted = buf.add(vec![1u32, 2, 3, 4, 5], 100, false);
    assert_eq!(evicted, vec![1, 2]);
    assert_eq!(buf.len(), 3);
    assert_eq!(buf.total_added(), 5);
    assert_eq!(buf.first_seq(), 2);
}

#[test]
fn sequence_numbers_survive_eviction() {
    let buf = filled(50, 60);
    let rows = buf.rows(0);
    assert_eq!(rows.len(), 50);
    assert_eq!(rows[0].seq, 10);
    assert_eq!(rows[49].seq, 59);
    assert_eq!(buf.first_seq(), 10);
}

#[test]
fn minimal_mode_halves_capacity() {
    let mut buf = EventBuffer::new(10, 0);
    buf.add((0..10u32).collect(), 100, false);
    assert_eq!(buf.len(), 10);
    let evicted = buf.add(vec![10], 101, true);
    // Effective capacity is 5; six oldest go.
    assert_eq!(evicted.len(), 6);
    assert_eq!(buf.len(), 5);
}

#[test]
fn clear_preserves_total_added() {
    let mut buf = filled(10, 7);
    assert_eq!(buf.clear(), 7);
    assert!(buf.is_empty());
    assert_eq!(buf.total_added(), 7);
    assert_eq!(buf.first_seq(), 7);
}

#[test]
fn ttl_filters_reads_but_not_storage() {
    let mut buf = EventBuffer::new(10, 5000);
    buf.add(vec![1u32], 1000, false);
    buf.add(vec![2u32], 4000, false);
    // At t=7000, the first entry is past its TTL but still buffered.
    let rows = buf.rows(7000);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].record, 2);
    assert_eq!(buf.len(), 2);
    // The sweep actually removes it.
    let swept = buf.sweep_expired(7000);
    assert_eq!(swept, vec![1]);
    assert_eq!(buf.len(), 1);
}

#[test]
fn evict_fraction_takes_at_least_one() {
    let mut buf = filled(10, 3);
    let evicted = buf.evict_fraction(4);
    assert_eq!(evicted, vec![0]);
    assert_eq!(buf.len(), 2);
}

#[test]
fn rows_since_watermark() {
    let buf = filled(10, 6);
    let rows = buf.rows_since(4, 0);
    let seqs: Vec<u64> = rows.iter().map(|r| r.seq).collect();
    assert_eq!(seqs, vec![4, 5]);
}

proptest! {
    /// len(records) <= capacity and total_added is consistent with the
    /// oldest surviving sequence number, under arbitrary add batches.
    #[test]
    fn capacity_and_counter_invariants(batches in prop::collection::vec(1usize..20, 0..30)) {
        let mut buf = EventBuffer::new(25, 0);
        let mut added = 0u64;
        for (i, n) in batches.iter().enumerate() {
            buf.add(vec![0u8; *n], i as u64, false);
            added += *n as u64;
            prop_assert!(buf.len() <= 25);
            prop_assert_eq!(buf.total_added(), added);
            prop_assert_eq!(buf.first_seq(), added - buf.len() as u64);
        }
    }

    /// Evicted entries are strictly older than every retained entry.
    #[test]
    fn eviction_is_oldest_first(count in 1usize..100, denom in 1usize..6) {
        let mut buf = EventBuffer::new(200, 0);
        for i in 0..count {
            buf.add(vec![i as u32], i as u64, false);
        }
        let evicted = buf.evict_fraction(denom);
        let max_evicted = evicted.iter().max().copied();
        let min_kept = buf.rows(0).first().map(|r| r.record);
        if let (Some(e), Some(k)) = (max_evicted, min_kept) {
            prop_assert!(e < k);
        }
    }
}
