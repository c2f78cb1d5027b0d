// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Property test for spec.md §8's "swap-remove stability" invariant: after
//! any sequence of allocate/free on a [`Table`], every still-live handle must
//! resolve to a slot whose `raw_id` round-trips back through
//! [`Table::get_handle`], and every freed handle must resolve to nothing.
//!
//! Pinned to a deterministic seed, mirroring `warp-core`'s
//! `proptest_seed_pinning.rs`.

use proptest::prelude::*;
use proptest::test_runner::{Config as PropConfig, RngAlgorithm, TestRng, TestRunner};

use outpost_core::handle::Handle;
use outpost_core::table::Table;

const SEED_BYTES: [u8; 32] = [
    0x5A, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0,
];

#[derive(Default, Clone)]
struct Row {
    tag: u32,
}

/// One step of a randomized churn sequence: allocate a fresh row, or free a
/// previously-allocated one (by index into the ever-growing handle list, so
/// the same handle can be targeted again after it's already been freed —
/// exercising the stale-handle path too).
#[derive(Clone, Debug)]
enum Op {
    Allocate,
    Free(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Allocate),
        2 => (0_usize..64).prop_map(Op::Free),
    ]
}

#[test]
fn swap_remove_preserves_handle_resolution_under_random_churn() {
    let rng = TestRng::from_seed(RngAlgorithm::ChaCha, &SEED_BYTES);
    let mut runner = TestRunner::new_with_rng(PropConfig::default(), rng);

    runner
        .run(&prop::collection::vec(op_strategy(), 0..400), |ops| {
            let mut table: Table<Row> = Table::new(0, 128);
            let mut handles: Vec<Handle> = Vec::new();
            let mut live: std::collections::HashSet<Handle> = std::collections::HashSet::new();

            for op in ops {
                match op {
                    Op::Allocate => {
                        if let Ok(h) = table.allocate() {
                            table.row_by_slot_mut(table.get_slot(h).unwrap()).tag =
                                h.raw_id();
                            handles.push(h);
                            live.insert(h);
                        }
                    }
                    Op::Free(i) => {
                        if handles.is_empty() {
                            continue;
                        }
                        let h = handles[i % handles.len()];
                        let was_live = live.remove(&h);
                        let result = table.free(h);
                        if was_live {
                            prop_assert!(result.is_ok());
                        } else {
                            prop_assert!(result.is_err());
                        }
                    }
                }

                // Invariant, checked after every single operation: every
                // handle we believe is live resolves to a slot whose
                // raw_id_of_slot matches, and the row tag we stamped at
                // allocation time survived any intervening swap-removes.
                for h in &handles {
                    match table.get_slot(*h) {
                        Some(slot) => {
                            prop_assert!(live.contains(h));
                            prop_assert_eq!(table.get_handle(slot), *h);
                            prop_assert_eq!(table.row_by_slot(slot).tag, h.raw_id());
                        }
                        None => {
                            prop_assert!(!live.contains(h));
                        }
                    }
                }
                prop_assert_eq!(table.count() as usize, live.len());
            }
            Ok(())
        })
        .expect("pinned property run should complete");
}
