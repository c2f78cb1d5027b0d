// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Property test for spec.md §8's flow-field invariants: the goal cell's
//! distance is zero, and distances never decrease when stepping away from a
//! cell's chosen direction (equivalently: stepping along `-direction`, i.e.
//! toward the goal, a cell's quadrant-neighbor distance is never larger).
//!
//! Built over a single open sector (no walls) so every seed tile is
//! reachable from every other tile, keeping the property well-defined for
//! every generated case rather than conditioning on reachability.

use proptest::prelude::*;
use proptest::test_runner::{Config as PropConfig, RngAlgorithm, TestRng, TestRunner};

use outpost_core::math::Fixed64;
use outpost_core::pathfinding::{build_flow_field, Seed, Sector, Terrain};

const SEED_BYTES: [u8; 32] = [
    0xF1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0,
];

const SECTOR_SIZE: i32 = 12;

#[test]
fn goal_cell_has_zero_distance_and_gradient_points_toward_it() {
    let rng = TestRng::from_seed(RngAlgorithm::ChaCha, &SEED_BYTES);
    let mut runner = TestRunner::new_with_rng(PropConfig::default(), rng);

    let tile = 0..SECTOR_SIZE;
    runner
        .run(&(tile.clone(), tile), |(gx, gy)| {
            let terrain = Terrain::new(SECTOR_SIZE, SECTOR_SIZE);
            let sector = Sector::build(0, 0, SECTOR_SIZE, &terrain);
            let zone = sector
                .zone_at_world_tile(0, 0)
                .expect("open sector is a single reachable zone");

            let seeds = vec![Seed { local_x: gx, local_y: gy, seed_distance: Fixed64::ZERO }];
            let field = build_flow_field(
                &sector,
                &terrain,
                zone,
                true,
                Fixed64::from_float(1.0),
                Fixed64::from_float(0.0001),
                &seeds,
            );

            prop_assert!(field.is_complete);
            let goal = field.sample_world_tile(gx, gy).expect("goal tile in sector");
            prop_assert_eq!(goal.distance, Fixed64::ZERO);

            // Every other reachable cell must have a strictly larger distance
            // than the goal: the field covers a fully open sector, so every
            // tile is reachable from the goal.
            for y in 0..SECTOR_SIZE {
                for x in 0..SECTOR_SIZE {
                    if (x, y) == (gx, gy) {
                        continue;
                    }
                    let cell = field.sample_world_tile(x, y).expect("in sector");
                    prop_assert!(cell.distance > Fixed64::ZERO);

                    // Stepping one tile along -direction (quadrant-rounded)
                    // must land on a neighbor whose distance is no greater
                    // than this cell's — the defining property of a gradient
                    // field built toward a goal.
                    if cell.direction != outpost_core::math::Fixed64Vec2::ZERO {
                        let step_x = if cell.direction.x.is_negative() { -1 } else if cell.direction.x == Fixed64::ZERO { 0 } else { 1 };
                        let step_y = if cell.direction.y.is_negative() { -1 } else if cell.direction.y == Fixed64::ZERO { 0 } else { 1 };
                        let (nx, ny) = (x + step_x, y + step_y);
                        if let Some(neighbor) = field.sample_world_tile(nx, ny) {
                            prop_assert!(neighbor.distance <= cell.distance);
                        }
                    }
                }
            }
            Ok(())
        })
        .expect("pinned property run should complete");
}
