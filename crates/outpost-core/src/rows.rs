// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Row record types for every core table.
//!
//! Field types are restricted to fixed-size scalars, [`Fixed64`],
//! [`Fixed64Vec2`], small bitflag bytes, enums, and fixed-length inline
//! arrays — no managed references, no variable-length arrays — so that a
//! column dump is a byte-for-byte deterministic snapshot.

use crate::handle::Handle;
use crate::math::{Fixed64, Fixed64Vec2};
use crate::table::Positioned;

/// Bit flags describing an entity's life state, shared by units and zombies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MortalFlags(u8);

impl MortalFlags {
    /// The row is occupied by a live entity.
    pub const ACTIVE: u8 = 1 << 0;
    /// The row has been marked dead and is awaiting its death-delay sweep.
    pub const DEAD: u8 = 1 << 1;

    /// Constructs a flag set with only `ACTIVE` set.
    #[must_use]
    pub const fn active() -> Self {
        Self(Self::ACTIVE)
    }

    /// Returns `true` if the `ACTIVE` bit is set.
    #[must_use]
    pub const fn is_active(self) -> bool {
        self.0 & Self::ACTIVE != 0
    }

    /// Returns `true` if the `DEAD` bit is set.
    #[must_use]
    pub const fn is_dead(self) -> bool {
        self.0 & Self::DEAD != 0
    }

    /// Sets the `DEAD` bit.
    pub fn mark_dead(&mut self) {
        self.0 |= Self::DEAD;
    }
}

/// Bit flags describing a building's power state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PowerFlags(u8);

impl PowerFlags {
    /// Whether the building is currently constructed and operational.
    pub const ACTIVE: u8 = 1 << 0;
    /// Whether the building needs power to function at all.
    pub const REQUIRES_POWER: u8 = 1 << 1;
    /// Whether the power network currently reaches this building.
    pub const POWERED: u8 = 1 << 2;

    #[must_use]
    pub const fn is_active(self) -> bool {
        self.0 & Self::ACTIVE != 0
    }

    #[must_use]
    pub const fn requires_power(self) -> bool {
        self.0 & Self::REQUIRES_POWER != 0
    }

    #[must_use]
    pub const fn is_powered(self) -> bool {
        self.0 & Self::POWERED != 0
    }

    pub fn set_powered(&mut self, powered: bool) {
        if powered {
            self.0 |= Self::POWERED;
        } else {
            self.0 &= !Self::POWERED;
        }
    }

    #[must_use]
    pub const fn new(active: bool, requires_power: bool) -> Self {
        let mut bits = 0u8;
        if active {
            bits |= Self::ACTIVE;
        }
        if requires_power {
            bits |= Self::REQUIRES_POWER;
        }
        Self(bits)
    }

    /// A turret may fire iff it does not require power, or the power
    /// network currently reaches it. See `DESIGN.md` for the resolution of
    /// the source material's partially-wired power semantics.
    #[must_use]
    pub const fn may_operate(self) -> bool {
        !self.requires_power() || self.is_powered()
    }
}

/// A unit's current standing order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderKind {
    /// No standing order; idle or auto-engaging in place.
    #[default]
    None,
    /// Move toward `order_target`, ignoring enemies en route.
    Move,
    /// Move toward `order_target`, engaging enemies encountered en route.
    AttackMove,
    /// Hold position; still auto-engages in range.
    Hold,
}

/// What kind of entity a zombie's `target`/`aggro_handle` refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetKind {
    /// No target.
    #[default]
    None,
    /// Targeting a `CombatUnit` row.
    Unit,
    /// Targeting a `Building` row.
    Building,
}

/// The zombie AI state machine's states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ZombieState {
    /// No threat nearby; periodically re-rolls a wander timer.
    #[default]
    Idle,
    /// Wandering in a slowly-rotating direction.
    Wander,
    /// Actively pursuing an acquired target.
    Chase,
    /// In range of a target; dealing periodic damage.
    Attack,
    /// Wave-triggered advance toward the command center; never idles.
    WaveChase,
}

/// A combat unit row.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatUnit {
    pub position: Fixed64Vec2,
    pub velocity: Fixed64Vec2,
    pub facing: Fixed64,
    pub type_id: u16,
    pub owner_slot: u8,
    pub health: Fixed64,
    pub max_health: Fixed64,
    pub damage: Fixed64,
    pub attack_range: Fixed64,
    pub move_speed: Fixed64,
    pub armor: Fixed64,
    pub attack_cooldown_timer: Fixed64,
    pub order: OrderKind,
    pub order_target: Handle,
    pub order_target_tile: (i32, i32),
    pub group_id: u32,
    pub veterancy_level: u8,
    pub kill_count: u32,
    pub selected_by: u8,
    pub mortal: MortalFlags,
    pub death_frame: i32,
    pub garrison_linkage: Handle,
    pub smoothed_separation: Fixed64Vec2,
    pub target: Handle,
    pub aggro_handle: Handle,
    pub noise_level: Fixed64,
    pub threat_level: Fixed64,
}

impl Default for CombatUnit {
    fn default() -> Self {
        Self {
            position: Fixed64Vec2::ZERO,
            velocity: Fixed64Vec2::ZERO,
            facing: Fixed64::ZERO,
            type_id: 0,
            owner_slot: 0,
            health: Fixed64::ZERO,
            max_health: Fixed64::ZERO,
            damage: Fixed64::ZERO,
            attack_range: Fixed64::ZERO,
            move_speed: Fixed64::ZERO,
            armor: Fixed64::ZERO,
            attack_cooldown_timer: Fixed64::ZERO,
            order: OrderKind::None,
            order_target: Handle::INVALID,
            order_target_tile: (0, 0),
            group_id: 0,
            veterancy_level: 0,
            kill_count: 0,
            selected_by: 0,
            mortal: MortalFlags::default(),
            death_frame: -1,
            garrison_linkage: Handle::INVALID,
            smoothed_separation: Fixed64Vec2::ZERO,
            target: Handle::INVALID,
            aggro_handle: Handle::INVALID,
            noise_level: Fixed64::ZERO,
            threat_level: Fixed64::ZERO,
        }
    }
}

impl Positioned for CombatUnit {
    fn position(&self) -> Fixed64Vec2 {
        self.position
    }
}

/// A zombie row.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Zombie {
    pub position: Fixed64Vec2,
    pub velocity: Fixed64Vec2,
    pub facing: Fixed64,
    pub type_id: u16,
    pub health: Fixed64,
    pub max_health: Fixed64,
    pub damage: Fixed64,
    pub attack_range: Fixed64,
    pub move_speed: Fixed64,
    pub ai_state: ZombieState,
    pub state_timer: i32,
    pub wander_seed: u32,
    pub wander_heading_deg: i32,
    pub threat_search_radius: Fixed64,
    pub noise_search_radius: Fixed64,
    pub target: Handle,
    pub target_kind: TargetKind,
    pub aggro_handle: Handle,
    pub flow_vector: Fixed64Vec2,
    pub mortal: MortalFlags,
    pub death_frame: i32,
    pub is_wave_zombie: bool,
    pub smoothed_separation: Fixed64Vec2,
}

impl Default for Zombie {
    fn default() -> Self {
        Self {
            position: Fixed64Vec2::ZERO,
            velocity: Fixed64Vec2::ZERO,
            facing: Fixed64::ZERO,
            type_id: 0,
            health: Fixed64::ZERO,
            max_health: Fixed64::ZERO,
            damage: Fixed64::ZERO,
            attack_range: Fixed64::ZERO,
            move_speed: Fixed64::ZERO,
            ai_state: ZombieState::Idle,
            state_timer: 0,
            wander_seed: 0,
            wander_heading_deg: 0,
            threat_search_radius: Fixed64::ZERO,
            noise_search_radius: Fixed64::ZERO,
            target: Handle::INVALID,
            target_kind: TargetKind::None,
            aggro_handle: Handle::INVALID,
            flow_vector: Fixed64Vec2::ZERO,
            mortal: MortalFlags::default(),
            death_frame: -1,
            is_wave_zombie: false,
            smoothed_separation: Fixed64Vec2::ZERO,
        }
    }
}

impl Positioned for Zombie {
    fn position(&self) -> Fixed64Vec2 {
        self.position
    }
}

/// Fixed-capacity production queue slot count.
pub const PRODUCTION_QUEUE_SLOTS: usize = 4;
/// Fixed-capacity garrison slot count.
pub const GARRISON_SLOTS: usize = 4;

/// A building row.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Building {
    pub tile_x: i32,
    pub tile_y: i32,
    pub width: u8,
    pub height: u8,
    pub type_id: u16,
    pub owner: u8,
    pub health: Fixed64,
    pub max_health: Fixed64,
    pub armor: Fixed64,
    pub turret_range: Fixed64,
    pub turret_damage: Fixed64,
    pub turret_cooldown_timer: Fixed64,
    pub production_queue: [u16; PRODUCTION_QUEUE_SLOTS],
    pub rally_point: Fixed64Vec2,
    pub power: PowerFlags,
    pub noise_level: Fixed64,
    pub threat_level: Fixed64,
    pub garrison_slots: [Handle; GARRISON_SLOTS],
    pub mortal: MortalFlags,
    pub death_frame: i32,
}

impl Default for Building {
    fn default() -> Self {
        Self {
            tile_x: 0,
            tile_y: 0,
            width: 1,
            height: 1,
            type_id: 0,
            owner: 0,
            health: Fixed64::ZERO,
            max_health: Fixed64::ZERO,
            armor: Fixed64::ZERO,
            turret_range: Fixed64::ZERO,
            turret_damage: Fixed64::ZERO,
            turret_cooldown_timer: Fixed64::ZERO,
            production_queue: [0; PRODUCTION_QUEUE_SLOTS],
            rally_point: Fixed64Vec2::ZERO,
            power: PowerFlags::default(),
            noise_level: Fixed64::ZERO,
            threat_level: Fixed64::ZERO,
            garrison_slots: [Handle::INVALID; GARRISON_SLOTS],
            mortal: MortalFlags::default(),
            death_frame: -1,
        }
    }
}

impl Building {
    /// World-space pixel center of this building's tile footprint.
    #[must_use]
    pub fn center(&self, tile_size: i32) -> Fixed64Vec2 {
        let cx = self.tile_x * tile_size + (i32::from(self.width) * tile_size) / 2;
        let cy = self.tile_y * tile_size + (i32::from(self.height) * tile_size) / 2;
        Fixed64Vec2::from_ints(cx, cy)
    }

    /// Closest point on this building's axis-aligned bounding box to `from`.
    #[must_use]
    pub fn closest_point(&self, from: Fixed64Vec2, tile_size: i32) -> Fixed64Vec2 {
        let min_x = Fixed64::from_int(self.tile_x * tile_size);
        let min_y = Fixed64::from_int(self.tile_y * tile_size);
        let max_x = Fixed64::from_int((self.tile_x + i32::from(self.width)) * tile_size);
        let max_y = Fixed64::from_int((self.tile_y + i32::from(self.height)) * tile_size);
        Fixed64Vec2::new(from.x.clamp(min_x, max_x), from.y.clamp(min_y, max_y))
    }
}

/// Bit flags describing a projectile's behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProjectileFlags(u8);

impl ProjectileFlags {
    pub const ACTIVE: u8 = 1 << 0;
    pub const HOMING: u8 = 1 << 1;
    pub const SPLASH_FALLOFF: u8 = 1 << 2;

    #[must_use]
    pub const fn new(active: bool, homing: bool, splash_falloff: bool) -> Self {
        let mut bits = 0;
        if active {
            bits |= Self::ACTIVE;
        }
        if homing {
            bits |= Self::HOMING;
        }
        if splash_falloff {
            bits |= Self::SPLASH_FALLOFF;
        }
        Self(bits)
    }

    #[must_use]
    pub const fn is_homing(self) -> bool {
        self.0 & Self::HOMING != 0
    }

    #[must_use]
    pub const fn has_splash_falloff(self) -> bool {
        self.0 & Self::SPLASH_FALLOFF != 0
    }
}

/// A projectile row.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Projectile {
    pub position: Fixed64Vec2,
    pub velocity: Fixed64Vec2,
    pub source: Handle,
    pub target: Handle,
    pub damage: Fixed64,
    pub splash_radius: Fixed64,
    pub pierce_count: u8,
    pub homing_strength: Fixed64,
    pub max_range: Fixed64,
    pub distance_traveled: Fixed64,
    pub lifetime_frames: i32,
    pub flags: ProjectileFlags,
}

impl Default for Projectile {
    fn default() -> Self {
        Self {
            position: Fixed64Vec2::ZERO,
            velocity: Fixed64Vec2::ZERO,
            source: Handle::INVALID,
            target: Handle::INVALID,
            damage: Fixed64::ZERO,
            splash_radius: Fixed64::ZERO,
            pierce_count: 0,
            homing_strength: Fixed64::ZERO,
            max_range: Fixed64::ZERO,
            distance_traveled: Fixed64::ZERO,
            lifetime_frames: 0,
            flags: ProjectileFlags::default(),
        }
    }
}

impl Positioned for Projectile {
    fn position(&self) -> Fixed64Vec2 {
        self.position
    }
}

/// Maximum concurrent players.
pub const MAX_PLAYERS: usize = 8;

/// A per-player state row. Indexed by `owner_slot`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerState {
    pub gold: Fixed64,
    pub energy: Fixed64,
    pub max_energy: Fixed64,
    pub population: u32,
    pub max_population: u32,
    pub unlocked_tech: u64,
    pub camera_pos: Fixed64Vec2,
    pub connected: bool,
    pub ready: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            gold: Fixed64::ZERO,
            energy: Fixed64::ZERO,
            max_energy: Fixed64::ZERO,
            population: 0,
            max_population: 0,
            unlocked_tech: 0,
            camera_pos: Fixed64Vec2::ZERO,
            connected: false,
            ready: false,
        }
    }
}

/// A resource node row (gold mine, energy well, etc.).
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceNode {
    pub position: Fixed64Vec2,
    pub resource_type: u8,
    pub amount: u32,
}

impl Positioned for ResourceNode {
    fn position(&self) -> Fixed64Vec2 {
        self.position
    }
}

/// A queued player move command, grouped by `group_id`.
///
/// The owning table is a bounded LRU: when full, the least-recently-issued
/// group's command is evicted to make room (see `lifecycle::MoveCommandQueue`).
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MoveCommand {
    pub group_id: u32,
    pub owner_slot: u8,
    pub target_tile: (i32, i32),
    pub issued_frame: i32,
    pub is_attack_move: bool,
}

/// Singleton wave-spawning state.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WaveState {
    pub wave_number: u32,
    pub next_wave_frame: i32,
    pub zombies_remaining_in_wave: u32,
    pub spawn_budget_this_tick: u32,
}

/// Singleton match-level statistics.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchStats {
    pub zombie_kills: u64,
    pub unit_losses: u64,
    pub buildings_lost: u64,
    pub elapsed_frames: i64,
    pub capacity_exceeded_skips: u64,
}

/// Singleton fixed-at-construction map parameters.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapConfig {
    pub width_tiles: i32,
    pub height_tiles: i32,
    pub tile_size_px: i32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width_tiles: 256,
            height_tiles: 256,
            tile_size_px: 32,
        }
    }
}
