// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic reciprocal-velocity-obstacle-style crowd avoidance for
//! combat units. Zombies skip this entirely — the density-gradient
//! separation field in [`crate::grid::SeparationField`] suffices for large
//! zombie populations.

use crate::math::{Fixed64, Fixed64Vec2};
use crate::rand;
use crate::scheduler::SimulationContext;
use crate::world::World;

const SALT_FALLBACK_AXIS: u32 = 0x7200_0001;

fn direction_from_degrees(degrees: i32) -> Fixed64Vec2 {
    let radians = Fixed64::from_int(degrees) * Fixed64::from_float(std::f64::consts::PI / 180.0);
    let (sin, cos) = radians.sin_cos();
    Fixed64Vec2::new(cos, sin)
}

/// RVO solver tunables.
#[derive(Clone, Copy, Debug)]
pub struct RvoConfig {
    pub neighbor_radius: Fixed64,
    pub max_neighbors: usize,
    pub time_horizon: Fixed64,
    pub avoidance_weight: Fixed64,
    pub max_avoidance_force: Fixed64,
    pub smoothing_alpha: Fixed64,
    pub default_agent_radius: Fixed64,
}

/// The minimal per-agent state the solver needs, gathered by the caller
/// from whichever table the agent lives in.
#[derive(Clone, Copy, Debug)]
pub struct RvoAgent {
    pub position: Fixed64Vec2,
    pub velocity: Fixed64Vec2,
    pub radius: Fixed64,
}

/// Phase 1: proximity push for idle/overlapping agents. If exactly
/// overlapping, pushes along a deterministic fallback axis derived from the
/// pair's relative slot ordering (passed in by the caller as `fallback_axis`
/// since this module has no access to table slots).
fn proximity_contribution(
    self_pos: Fixed64Vec2,
    other_pos: Fixed64Vec2,
    combined_radius: Fixed64,
    fallback_axis: Fixed64Vec2,
) -> Fixed64Vec2 {
    let delta = self_pos - other_pos;
    let dist_sq = delta.length_squared();
    let threshold = combined_radius * Fixed64::from_float(1.5);

    if dist_sq == Fixed64::ZERO {
        return fallback_axis * threshold;
    }
    let dist = dist_sq.sqrt();
    if dist >= threshold {
        return Fixed64Vec2::ZERO;
    }
    let falloff = (threshold - dist) / threshold;
    (delta / dist) * falloff * threshold
}

/// Phase 2: time-to-collision prediction. Returns `None` if the pair is
/// moving apart (no avoidance needed).
fn time_to_collision_contribution(
    self_pos: Fixed64Vec2,
    self_vel: Fixed64Vec2,
    other_pos: Fixed64Vec2,
    other_vel: Fixed64Vec2,
    combined_radius: Fixed64,
    time_horizon: Fixed64,
) -> Option<Fixed64Vec2> {
    let rel_pos = self_pos - other_pos;
    let rel_vel = self_vel - other_vel;

    // Solve |rel_pos + t * rel_vel| = combined_radius for the smallest
    // positive root: a quadratic in t.
    let a = rel_vel.length_squared();
    if a == Fixed64::ZERO {
        return None; // no relative motion, never collides
    }
    let b = rel_pos.dot(rel_vel) * Fixed64::from_int(2);
    let c = rel_pos.length_squared() - combined_radius * combined_radius;

    let discriminant = b * b - Fixed64::from_int(4) * a * c;
    if discriminant < Fixed64::ZERO {
        return None; // paths never come within combined_radius
    }
    let sqrt_disc = discriminant.sqrt();
    let t = (-b - sqrt_disc) / (Fixed64::from_int(2) * a);

    if t <= Fixed64::ZERO || t > time_horizon {
        return None;
    }

    let urgency = (time_horizon - t) / time_horizon;
    let perpendicular = rel_pos.perpendicular().normalized();
    // Push perpendicular to the relative-position axis, away from the
    // collision course: pick the side that increases separation given the
    // current relative velocity.
    let side = if perpendicular.dot(rel_vel) > Fixed64::ZERO {
        -perpendicular
    } else {
        perpendicular
    };
    Some(side * urgency)
}

/// Computes the avoidance-adjusted velocity for one agent against its
/// gathered neighbors, given its own preferred velocity.
///
/// `fallback_axis_for` supplies the deterministic overlap fallback
/// direction for a given neighbor index (callers typically derive this
/// from `(self_slot, neighbor_slot)` via [`crate::rand::range_with_seed`]
/// so it's stable across re-simulation but varies per-pair).
#[must_use]
pub fn solve_agent(
    config: &RvoConfig,
    agent: RvoAgent,
    preferred_velocity: Fixed64Vec2,
    smoothed_separation: Fixed64Vec2,
    neighbors: &[RvoAgent],
    fallback_axis_for: impl Fn(usize) -> Fixed64Vec2,
    dt: Fixed64,
    max_speed: Fixed64,
) -> (Fixed64Vec2, Fixed64Vec2) {
    let mut total = Fixed64Vec2::ZERO;

    for (i, neighbor) in neighbors.iter().take(config.max_neighbors).enumerate() {
        let combined_radius = agent.radius + neighbor.radius;
        let proximity = proximity_contribution(
            agent.position,
            neighbor.position,
            combined_radius,
            fallback_axis_for(i),
        );
        total += proximity;

        if let Some(ttc) = time_to_collision_contribution(
            agent.position,
            agent.velocity,
            neighbor.position,
            neighbor.velocity,
            combined_radius,
            config.time_horizon,
        ) {
            total += ttc;
        }
    }

    let clamped = total.clamp_length(config.max_avoidance_force);
    let new_smoothed = smoothed_separation.lerp(clamped, config.smoothing_alpha);

    let avoidance_velocity = if dt == Fixed64::ZERO {
        Fixed64Vec2::ZERO
    } else {
        new_smoothed * (Fixed64::ONE / dt)
    };

    let blended = preferred_velocity + avoidance_velocity * config.avoidance_weight;
    let final_velocity = blended.clamp_length(max_speed);
    (final_velocity, new_smoothed)
}

/// The `rvo` system (pipeline step 8): computes each living combat unit's
/// time-to-collision avoidance nudge against its nearby neighbors and folds
/// it into [`CombatUnit::smoothed_separation`]. Does not touch `velocity`
/// directly — [`crate::lifecycle::combat_unit_movement`] blends the smoothed
/// separation into the unit's steering after this runs.
pub fn rvo(world: &mut World, ctx: &SimulationContext) {
    let cfg = world.config;
    let rvo_config = RvoConfig {
        neighbor_radius: cfg.rvo_neighbor_radius,
        max_neighbors: cfg.rvo_max_neighbors,
        time_horizon: cfg.rvo_time_horizon,
        avoidance_weight: cfg.rvo_avoidance_weight,
        max_avoidance_force: cfg.rvo_max_avoidance_force,
        smoothing_alpha: cfg.rvo_smoothing_alpha,
        default_agent_radius: cfg.rvo_default_agent_radius,
    };
    let dt = ctx.delta_seconds;
    let max_speed = cfg.zombie_spawn_move_speed.max(cfg.unit_spawn_move_speed) * Fixed64::from_int(4);

    for slot in 0..world.combat_units.count() {
        let unit = world.combat_units.row_by_slot(slot).clone();
        if unit.mortal.is_dead() {
            continue;
        }

        let self_agent = RvoAgent {
            position: unit.position,
            velocity: unit.velocity,
            radius: rvo_config.default_agent_radius,
        };

        let neighbor_slots: Vec<u32> = world
            .combat_units
            .query_radius(unit.position, rvo_config.neighbor_radius)
            .into_iter()
            .filter(|&s| s != slot)
            .collect();

        let neighbors: Vec<(u32, RvoAgent)> = neighbor_slots
            .iter()
            .filter_map(|&s| {
                let other = world.combat_units.try_get_row(s)?;
                if other.mortal.is_dead() {
                    return None;
                }
                let dist_sq = (other.position - unit.position).length_squared();
                (dist_sq <= rvo_config.neighbor_radius * rvo_config.neighbor_radius).then_some((
                    s,
                    RvoAgent {
                        position: other.position,
                        velocity: other.velocity,
                        radius: rvo_config.default_agent_radius,
                    },
                ))
            })
            .collect();

        let agents: Vec<RvoAgent> = neighbors.iter().map(|(_, a)| *a).collect();
        let (_, new_smoothed) = solve_agent(
            &rvo_config,
            self_agent,
            unit.velocity,
            unit.smoothed_separation,
            &agents,
            |i| {
                let neighbor_slot = neighbors[i].0;
                let degrees = rand::degrees_0_359(
                    ctx.session_seed,
                    ctx.current_frame,
                    slot as i32,
                    neighbor_slot.wrapping_add(SALT_FALLBACK_AXIS),
                );
                direction_from_degrees(degrees)
            },
            dt,
            max_speed,
        );

        world.combat_units.row_by_slot_mut(slot).smoothed_separation = new_smoothed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_neighbors_yields_preferred_velocity() {
        let config = RvoConfig {
            neighbor_radius: Fixed64::from_int(96),
            max_neighbors: 8,
            time_horizon: Fixed64::from_int(2),
            avoidance_weight: Fixed64::ONE,
            max_avoidance_force: Fixed64::from_int(100),
            smoothing_alpha: Fixed64::from_float(0.3),
            default_agent_radius: Fixed64::from_int(12),
        };
        let agent = RvoAgent {
            position: Fixed64Vec2::ZERO,
            velocity: Fixed64Vec2::ZERO,
            radius: Fixed64::from_int(12),
        };
        let preferred = Fixed64Vec2::from_ints(10, 0);
        let (v, _) = solve_agent(
            &config,
            agent,
            preferred,
            Fixed64Vec2::ZERO,
            &[],
            |_| Fixed64Vec2::ZERO,
            Fixed64::ONE / Fixed64::from_int(30),
            Fixed64::from_int(100),
        );
        assert_eq!(v, preferred);
    }

    #[test]
    fn overlapping_agents_push_apart_along_fallback_axis() {
        let config = RvoConfig {
            neighbor_radius: Fixed64::from_int(96),
            max_neighbors: 8,
            time_horizon: Fixed64::from_int(2),
            avoidance_weight: Fixed64::ONE,
            max_avoidance_force: Fixed64::from_int(100),
            smoothing_alpha: Fixed64::ONE,
            default_agent_radius: Fixed64::from_int(12),
        };
        let agent = RvoAgent {
            position: Fixed64Vec2::ZERO,
            velocity: Fixed64Vec2::ZERO,
            radius: Fixed64::from_int(12),
        };
        let neighbor = RvoAgent {
            position: Fixed64Vec2::ZERO,
            velocity: Fixed64Vec2::ZERO,
            radius: Fixed64::from_int(12),
        };
        let (v, smoothed) = solve_agent(
            &config,
            agent,
            Fixed64Vec2::ZERO,
            Fixed64Vec2::ZERO,
            &[neighbor],
            |_| Fixed64Vec2::from_ints(1, 0),
            Fixed64::ONE / Fixed64::from_int(30),
            Fixed64::from_int(100),
        );
        assert_ne!(smoothed, Fixed64Vec2::ZERO);
        assert_ne!(v, Fixed64Vec2::ZERO);
    }

    #[test]
    fn moving_apart_has_no_ttc_contribution() {
        let a = RvoAgent {
            position: Fixed64Vec2::from_ints(-20, 0),
            velocity: Fixed64Vec2::from_ints(-5, 0),
            radius: Fixed64::from_int(8),
        };
        let b = RvoAgent {
            position: Fixed64Vec2::from_ints(20, 0),
            velocity: Fixed64Vec2::from_ints(5, 0),
            radius: Fixed64::from_int(8),
        };
        let contribution = time_to_collision_contribution(
            a.position,
            a.velocity,
            b.position,
            b.velocity,
            a.radius + b.radius,
            Fixed64::from_int(2),
        );
        assert!(contribution.is_none());
    }
}
