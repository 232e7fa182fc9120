//! Shared battle-world state: the enemy fleet and the player fortress.
//!
//! One `BattleState` is shared (via `Arc`) between the hardware thread
//! and the render thread, serialized behind a single mutex. Writer
//! discipline: the hardware thread only calls [`BattleState::reset_round`]
//! at round boundaries (before the first event of the round is emitted)
//! and otherwise reads; all in-round mutation happens on the consumer
//! thread while applying drained events.

use crate::config::ShipSpec;
use parking_lot::Mutex;

/// Result of applying one point of damage to a ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// The ship survived the hit.
    Hit,
    /// The hit reduced the ship to zero health.
    Destroyed,
}

/// One enemy ship. Created once at startup, reset in place between
/// rounds, never reallocated.
#[derive(Debug, Clone)]
pub struct Ship {
    /// Display name.
    pub name: String,
    /// Hit points at full health.
    pub max_health: i32,
    /// Remaining hit points, always within `0..=max_health`.
    pub current_health: i32,
    /// Terminal until the next round reset.
    pub is_destroyed: bool,
    /// Fixed on-screen position, assigned by the render layer.
    pub battle_position: Option<(i32, i32)>,
}

impl Ship {
    fn new(spec: &ShipSpec) -> Self {
        Self {
            name: spec.name.clone(),
            max_health: spec.max_health,
            current_health: spec.max_health,
            is_destroyed: false,
            battle_position: None,
        }
    }

    fn reset(&mut self) {
        self.current_health = self.max_health;
        self.is_destroyed = false;
    }

    fn take_damage(&mut self) -> DamageOutcome {
        self.current_health = (self.current_health - 1).max(0);
        if self.current_health == 0 {
            self.is_destroyed = true;
            DamageOutcome::Destroyed
        } else {
            DamageOutcome::Hit
        }
    }
}

/// Reference to the current target: the first non-destroyed ship in
/// fixed roster order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRef {
    /// Position in the roster.
    pub index: usize,
    /// Ship name, for display and destruction events.
    pub name: String,
}

#[derive(Debug)]
struct Inner {
    fleet: Vec<Ship>,
    fortress_health: f32,
    fortress_max_health: f32,
}

/// Process-wide battle state, shared between both threads.
#[derive(Debug)]
pub struct BattleState {
    inner: Mutex<Inner>,
}

impl BattleState {
    /// Create an empty battle with the given fortress capacity.
    ///
    /// The roster is populated by [`initialize_roster`](Self::initialize_roster).
    pub fn new(fortress_max_health: f32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                fleet: Vec::new(),
                fortress_health: fortress_max_health,
                fortress_max_health,
            }),
        }
    }

    /// Populate the fleet from the configured roster.
    ///
    /// Idempotent: a no-op when the roster already exists.
    pub fn initialize_roster(&self, specs: &[ShipSpec]) {
        let mut inner = self.inner.lock();
        if !inner.fleet.is_empty() {
            return;
        }
        inner.fleet = specs.iter().map(Ship::new).collect();
    }

    /// Restore every ship to full health and the fortress to max,
    /// in place. Called by the hardware thread at round start.
    pub fn reset_round(&self) {
        let mut inner = self.inner.lock();
        for ship in &mut inner.fleet {
            ship.reset();
        }
        inner.fortress_health = inner.fortress_max_health;
    }

    /// The first non-destroyed ship in roster order, or `None` when
    /// every ship is destroyed (victory).
    pub fn current_target(&self) -> Option<TargetRef> {
        let inner = self.inner.lock();
        inner
            .fleet
            .iter()
            .enumerate()
            .find(|(_, ship)| !ship.is_destroyed)
            .map(|(index, ship)| TargetRef {
                index,
                name: ship.name.clone(),
            })
    }

    /// Apply one point of damage to the current target.
    ///
    /// Returns `None` when there is no target left.
    pub fn apply_damage_to_current(&self) -> Option<DamageOutcome> {
        let mut inner = self.inner.lock();
        inner
            .fleet
            .iter_mut()
            .find(|ship| !ship.is_destroyed)
            .map(Ship::take_damage)
    }

    /// Heal the fortress, clamped to max health.
    pub fn heal_fortress(&self, amount: f32) {
        let mut inner = self.inner.lock();
        inner.fortress_health = (inner.fortress_health + amount).min(inner.fortress_max_health);
    }

    /// Damage the fortress, clamped to zero.
    pub fn damage_fortress(&self, amount: f32) {
        let mut inner = self.inner.lock();
        inner.fortress_health = (inner.fortress_health - amount).max(0.0);
    }

    /// Current fortress health.
    pub fn fortress_health(&self) -> f32 {
        self.inner.lock().fortress_health
    }

    /// Fortress health capacity.
    pub fn fortress_max_health(&self) -> f32 {
        self.inner.lock().fortress_max_health
    }

    /// True once the fortress is depleted.
    pub fn fortress_depleted(&self) -> bool {
        self.fortress_health() <= 0.0
    }

    /// Snapshot of the whole fleet, for the render boundary.
    pub fn ship_snapshots(&self) -> Vec<Ship> {
        self.inner.lock().fleet.clone()
    }

    /// Record the fixed on-screen position picked for a ship.
    ///
    /// Out-of-range indices are ignored.
    pub fn set_ship_position(&self, index: usize, position: (i32, i32)) {
        let mut inner = self.inner.lock();
        if let Some(ship) = inner.fleet.get_mut(index) {
            ship.battle_position = Some(position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, max_health: i32) -> ShipSpec {
        ShipSpec {
            name: name.to_string(),
            max_health,
        }
    }

    fn two_ship_battle() -> BattleState {
        let battle = BattleState::new(10.0);
        battle.initialize_roster(&[spec("Sloop", 5), spec("Brigantine", 10)]);
        battle
    }

    #[test]
    fn test_roster_init_is_idempotent() {
        let battle = two_ship_battle();
        battle.initialize_roster(&[spec("Imposter", 99)]);
        let ships = battle.ship_snapshots();
        assert_eq!(ships.len(), 2);
        assert_eq!(ships[0].name, "Sloop");
    }

    #[test]
    fn test_health_never_leaves_bounds() {
        let battle = two_ship_battle();
        // Way more damage than total fleet health.
        for _ in 0..100 {
            battle.apply_damage_to_current();
        }
        for ship in battle.ship_snapshots() {
            assert!(ship.current_health >= 0);
            assert!(ship.current_health <= ship.max_health);
            assert!(ship.is_destroyed);
        }
        assert!(battle.current_target().is_none());
    }

    #[test]
    fn test_destroyed_is_terminal_until_reset() {
        let battle = two_ship_battle();
        for _ in 0..5 {
            battle.apply_damage_to_current();
        }
        assert!(battle.ship_snapshots()[0].is_destroyed);

        // Further damage goes to the next ship, never revives the first.
        battle.apply_damage_to_current();
        assert!(battle.ship_snapshots()[0].is_destroyed);

        battle.reset_round();
        let ships = battle.ship_snapshots();
        assert!(!ships[0].is_destroyed);
        assert_eq!(ships[0].current_health, 5);
        assert!(!ships[1].is_destroyed);
        assert_eq!(ships[1].current_health, 10);
    }

    #[test]
    fn test_fortress_clamps_both_directions() {
        let battle = two_ship_battle();
        battle.heal_fortress(100.0);
        assert!((battle.fortress_health() - 10.0).abs() < f32::EPSILON);

        battle.damage_fortress(3.5);
        assert!((battle.fortress_health() - 6.5).abs() < f32::EPSILON);

        battle.damage_fortress(100.0);
        assert!(battle.fortress_health().abs() < f32::EPSILON);
        assert!(battle.fortress_depleted());
    }

    #[test]
    fn test_target_switches_in_roster_order() {
        let battle = two_ship_battle();
        assert_eq!(battle.current_target().map(|t| t.index), Some(0));

        // Five hits sink the Sloop; each hit heals the fortress by 0.5
        // (already at max, so it stays clamped).
        battle.damage_fortress(4.0);
        for _ in 0..5 {
            let outcome = battle.apply_damage_to_current().expect("target");
            battle.heal_fortress(0.5);
            if battle.ship_snapshots()[0].is_destroyed {
                assert_eq!(outcome, DamageOutcome::Destroyed);
            } else {
                assert_eq!(outcome, DamageOutcome::Hit);
            }
        }

        let target = battle.current_target().expect("second ship");
        assert_eq!(target.index, 1);
        assert_eq!(target.name, "Brigantine");
        // 6.0 + 5 * 0.5 = 8.5, still under max.
        assert!((battle.fortress_health() - 8.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_reset_round_roundtrip() {
        let battle = two_ship_battle();
        for _ in 0..7 {
            battle.apply_damage_to_current();
        }
        battle.damage_fortress(9.0);

        battle.reset_round();
        let target = battle.current_target().expect("first ship back");
        assert_eq!(target.index, 0);
        assert_eq!(target.name, "Sloop");
        assert!((battle.fortress_health() - battle.fortress_max_health()).abs() < f32::EPSILON);
    }

    #[test]
    fn test_ship_positions_survive_reset() {
        let battle = two_ship_battle();
        battle.set_ship_position(1, (320, 200));
        battle.reset_round();
        assert_eq!(battle.ship_snapshots()[1].battle_position, Some((320, 200)));
        // Out of range is ignored.
        battle.set_ship_position(9, (0, 0));
    }
}
