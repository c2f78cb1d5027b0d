// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Entity lifecycle: placement, movement-with-collision, and the two-phase
//! death sweep (mark, then reap after a delay).

use crate::math::{Fixed64, Fixed64Vec2};
use crate::pathfinding::lru::Lru;
use crate::pathfinding::Terrain;
use crate::query;
use crate::rows::{Building, CombatUnit, MortalFlags, MoveCommand, OrderKind, PowerFlags, Zombie};
use crate::scheduler::SimulationContext;
use crate::table::{Positioned, Table};
use crate::world::World;

/// A bounded, group-id-keyed queue of pending player move orders.
///
/// Backed by an [`Lru`] so that a flood of orders from many distinct groups
/// evicts the least-recently-issued group's order rather than growing
/// unboundedly or rejecting new orders outright.
pub struct MoveCommandQueue {
    lru: Lru<u32, MoveCommand>,
}

impl MoveCommandQueue {
    /// Builds an empty queue with room for `capacity` distinct groups.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { lru: Lru::new(capacity) }
    }

    /// Enqueues or replaces the standing order for `command.group_id`.
    pub fn enqueue(&mut self, command: MoveCommand) {
        self.lru.insert(command.group_id, command);
    }

    /// Iterates every queued order, most-recently-issued first.
    pub fn iter(&self) -> impl Iterator<Item = &MoveCommand> {
        self.lru.iter().map(|(_, command)| command)
    }

    /// Captures every queued order for a rollback snapshot, most-recently-issued first.
    #[must_use]
    pub fn to_snapshot(&self) -> Vec<MoveCommand> {
        self.iter().cloned().collect()
    }

    /// Restores queued orders captured by [`MoveCommandQueue::to_snapshot`].
    pub fn restore_from_snapshot(&mut self, commands: Vec<MoveCommand>) {
        let entries = commands.into_iter().map(|c| (c.group_id, c)).collect();
        self.lru.restore_most_recent_first(entries);
    }
}

/// The `move_command` system (pipeline step 11): applies every order queued
/// this frame to the combat units sharing its `(owner_slot, group_id)`,
/// replacing any standing order.
pub fn move_command(world: &mut World, ctx: &SimulationContext) {
    let commands: Vec<MoveCommand> =
        world.move_commands.iter().filter(|c| c.issued_frame == ctx.current_frame).cloned().collect();
    if commands.is_empty() {
        return;
    }

    for command in commands {
        for slot in 0..world.combat_units.count() {
            let unit = world.combat_units.row_by_slot_mut(slot);
            if unit.mortal.is_dead()
                || unit.owner_slot != command.owner_slot
                || unit.group_id != command.group_id
            {
                continue;
            }
            unit.order = if command.is_attack_move { OrderKind::AttackMove } else { OrderKind::Move };
            unit.order_target_tile = command.target_tile;
            unit.order_target = crate::handle::Handle::INVALID;
        }
    }
}

/// The `combat_unit_movement` system (pipeline step 13): turns each unit's
/// standing order into a velocity via the shared flow field, falling back to
/// straight-line steering where no flow covers the unit's position, then
/// blends in the RVO-smoothed separation nudge written by [`crate::rvo::rvo`].
pub fn combat_unit_movement(world: &mut World, _ctx: &SimulationContext) {
    let tile_size = world.map_config.tile_size_px;
    let separation_scale = world.config.separation_scale;
    let terrain = world.terrain.clone();

    for slot in 0..world.combat_units.count() {
        let unit = world.combat_units.row_by_slot(slot).clone();
        if unit.mortal.is_dead() {
            continue;
        }

        let direction = match unit.order {
            OrderKind::None | OrderKind::Hold => Fixed64Vec2::ZERO,
            OrderKind::Move | OrderKind::AttackMove => {
                let flow = world.pathfinding.get_flow_direction(
                    &terrain,
                    unit.position,
                    tile_size,
                    unit.order_target_tile,
                    false,
                );
                if flow == Fixed64Vec2::ZERO {
                    let dest = Fixed64Vec2::from_ints(
                        unit.order_target_tile.0 * tile_size,
                        unit.order_target_tile.1 * tile_size,
                    );
                    crate::pathfinding::PathfindingService::direct_direction(unit.position, dest)
                } else {
                    flow
                }
            }
        };

        let velocity = direction * unit.move_speed + unit.smoothed_separation * separation_scale;
        world.combat_units.row_by_slot_mut(slot).velocity = velocity;
    }
}

/// A row type that can be moved with terrain/occupancy collision.
pub trait Moveable: Positioned {
    fn velocity(&self) -> Fixed64Vec2;
    fn set_position(&mut self, position: Fixed64Vec2);
    fn set_velocity(&mut self, velocity: Fixed64Vec2);
}

impl Moveable for CombatUnit {
    fn velocity(&self) -> Fixed64Vec2 {
        self.velocity
    }
    fn set_position(&mut self, position: Fixed64Vec2) {
        self.position = position;
    }
    fn set_velocity(&mut self, velocity: Fixed64Vec2) {
        self.velocity = velocity;
    }
}

impl Moveable for Zombie {
    fn velocity(&self) -> Fixed64Vec2 {
        self.velocity
    }
    fn set_position(&mut self, position: Fixed64Vec2) {
        self.position = position;
    }
    fn set_velocity(&mut self, velocity: Fixed64Vec2) {
        self.velocity = velocity;
    }
}

fn tile_of(position: Fixed64Vec2, tile_size_px: i32) -> (i32, i32) {
    let ts = Fixed64::from_int(tile_size_px);
    ((position.x / ts).to_int(), (position.y / ts).to_int())
}

fn blocked(terrain: &Terrain, position: Fixed64Vec2, tile_size_px: i32) -> bool {
    let (tx, ty) = tile_of(position, tile_size_px);
    !terrain.is_passable(tx, ty, false)
}

/// Applies `position += velocity * dt` for every row in `table`, sliding
/// along a single axis if the full move is blocked, and zeroing velocity if
/// both axes are blocked. Projectiles do not use this (they move freely).
pub fn apply_movement_with_collision<R: Moveable + Clone + Default>(
    table: &mut Table<R>,
    terrain: &Terrain,
    tile_size_px: i32,
    dt: Fixed64,
) {
    for slot in 0..table.count() {
        let row = table.row_by_slot_mut(slot);
        let start = row.position();
        let velocity = row.velocity();
        let full_move = start + velocity * dt;

        if !blocked(terrain, full_move, tile_size_px) {
            row.set_position(full_move);
            continue;
        }

        let x_only = Fixed64Vec2::new(full_move.x, start.y);
        let y_only = Fixed64Vec2::new(start.x, full_move.y);

        if !blocked(terrain, x_only, tile_size_px) {
            row.set_position(x_only);
            row.set_velocity(Fixed64Vec2::new(velocity.x, Fixed64::ZERO));
        } else if !blocked(terrain, y_only, tile_size_px) {
            row.set_position(y_only);
            row.set_velocity(Fixed64Vec2::new(Fixed64::ZERO, velocity.y));
        } else {
            row.set_velocity(Fixed64Vec2::ZERO);
        }
    }
}

/// Validated inputs for a single building-placement request this frame.
#[derive(Clone, Copy, Debug)]
pub struct PlacementRequest {
    pub tile_x: i32,
    pub tile_y: i32,
    pub width: u8,
    pub height: u8,
    pub type_id: u16,
    pub owner: u8,
    pub max_health: Fixed64,
    pub armor: Fixed64,
    pub requires_power: bool,
}

/// Attempts to place a building. Validates map bounds and that every tile
/// in the footprint is empty of buildings/units and passable as terrain.
/// On success, stamps occupancy, invalidates the enclosing sector(s), and
/// marks the unit/combat spatial index dirty (caller must `spatial_sort`).
pub fn building_placement(
    buildings: &mut Table<Building>,
    terrain: &mut Terrain,
    pathfinding: &mut crate::pathfinding::PathfindingService,
    sector_size_tiles: i32,
    request: PlacementRequest,
) -> bool {
    for dy in 0..i32::from(request.height) {
        for dx in 0..i32::from(request.width) {
            let (x, y) = (request.tile_x + dx, request.tile_y + dy);
            if !terrain.in_bounds(x, y) || !terrain.is_passable(x, y, false) {
                return false;
            }
        }
    }

    if buildings.allocate().is_err() {
        return false;
    }
    let slot = buildings.count() - 1;
    let row = buildings.row_by_slot_mut(slot);
    row.tile_x = request.tile_x;
    row.tile_y = request.tile_y;
    row.width = request.width;
    row.height = request.height;
    row.type_id = request.type_id;
    row.owner = request.owner;
    row.health = request.max_health;
    row.max_health = request.max_health;
    row.armor = request.armor;
    row.power = PowerFlags::new(true, request.requires_power);
    row.mortal = MortalFlags::active();

    for dy in 0..i32::from(request.height) {
        for dx in 0..i32::from(request.width) {
            terrain.set_building_occupied(request.tile_x + dx, request.tile_y + dy, true);
        }
    }

    let sx_min = request.tile_x.div_euclid(sector_size_tiles);
    let sy_min = request.tile_y.div_euclid(sector_size_tiles);
    let sx_max = (request.tile_x + i32::from(request.width) - 1).div_euclid(sector_size_tiles);
    let sy_max = (request.tile_y + i32::from(request.height) - 1).div_euclid(sector_size_tiles);
    for sy in sy_min..=sy_max {
        for sx in sx_min..=sx_max {
            pathfinding.zone_graph_mut().invalidate_sector(sx, sy);
        }
    }

    true
}

/// The `mortal_death` system: marks newly-zero-health units/zombies dead,
/// counts zombie kills, then reaps rows past their death delay.
pub fn mortal_death(
    combat_units: &mut Table<CombatUnit>,
    zombies: &mut Table<Zombie>,
    match_stats: &mut crate::rows::MatchStats,
    current_frame: i32,
    unit_death_delay_frames: i32,
) {
    match_stats.unit_losses += u64::from(query::mark_newly_dead(combat_units, current_frame));
    match_stats.zombie_kills += u64::from(query::mark_newly_dead(zombies, current_frame));

    query::sweep_expired_dead(combat_units, current_frame, unit_death_delay_frames);
    query::sweep_expired_dead(zombies, current_frame, unit_death_delay_frames);
}

/// The `building_death` system: marks newly-zero-health buildings dead,
/// ejecting garrisoned units at half health, clearing occupancy, and
/// invalidating the zone graph; reaps after the (longer) building death
/// delay.
pub fn building_death(
    buildings: &mut Table<Building>,
    combat_units: &mut Table<CombatUnit>,
    terrain: &mut Terrain,
    pathfinding: &mut crate::pathfinding::PathfindingService,
    match_stats: &mut crate::rows::MatchStats,
    current_frame: i32,
    sector_size_tiles: i32,
    building_death_delay_frames: i32,
) {
    for slot in 0..buildings.count() {
        let row = buildings.row_by_slot_mut(slot);
        if row.health <= Fixed64::ZERO && !row.mortal.is_dead() {
            row.mortal.mark_dead();
            row.death_frame = current_frame;
            match_stats.buildings_lost += 1;

            for garrisoned in row.garrison_slots {
                if garrisoned.is_invalid() {
                    continue;
                }
                if let Some(unit_slot) = combat_units.get_slot(garrisoned) {
                    let unit = combat_units.row_by_slot_mut(unit_slot);
                    let half_health = unit.max_health / Fixed64::from_int(2);
                    unit.health = if half_health > Fixed64::ONE { half_health } else { Fixed64::ONE };
                }
            }
            row.garrison_slots = [crate::handle::Handle::INVALID; crate::rows::GARRISON_SLOTS];

            for dy in 0..i32::from(row.height) {
                for dx in 0..i32::from(row.width) {
                    terrain.set_building_occupied(row.tile_x + dx, row.tile_y + dy, false);
                }
            }

            let sx_min = row.tile_x.div_euclid(sector_size_tiles);
            let sy_min = row.tile_y.div_euclid(sector_size_tiles);
            let sx_max = (row.tile_x + i32::from(row.width) - 1).div_euclid(sector_size_tiles);
            let sy_max = (row.tile_y + i32::from(row.height) - 1).div_euclid(sector_size_tiles);
            for sy in sy_min..=sy_max {
                for sx in sx_min..=sx_max {
                    pathfinding.zone_graph_mut().invalidate_sector(sx, sy);
                }
            }
        }
    }

    let mut slot = buildings.count();
    while slot > 0 {
        slot -= 1;
        let row = buildings.row_by_slot(slot);
        if row.mortal.is_dead() && current_frame - row.death_frame >= building_death_delay_frames {
            buildings.free_by_slot(slot);
        }
    }
}
