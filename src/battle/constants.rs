//! Combat Constants
//!
//! Centralized location for the tuning numbers shared by the stat pipeline,
//! combat resolution and the movement/targeting code.

// ============================================================================
// Stat Pipeline
// ============================================================================

/// Health granted per point of vigor.
pub const HEALTH_PER_VIGOR: f32 = 100.0;

/// Effective damage granted per point of lethality.
pub const DAMAGE_PER_LETHALITY: f32 = 1.25;

/// Extra item flat-stat multiplier per threat level above 1.
pub const ITEM_THREAT_SCALING: f32 = 0.1;

/// Cap on the summed resistance contributed by equipment.
pub const ITEM_RESISTANCE_CAP: f32 = 60.0;

/// Cap on the resistance an enemy or summon template may carry.
pub const ENEMY_TEMPLATE_RESISTANCE_CAP: f32 = 50.0;

/// Final resistance range for heroes (after auras).
pub const HERO_RESISTANCE_RANGE: (f32, f32) = (-50.0, 80.0);

/// Final resistance range for enemies and summons (after auras).
pub const ENEMY_RESISTANCE_RANGE: (f32, f32) = (-50.0, 70.0);

/// Attack speed can never drop below this (a -90% slow caps the interval at 10x).
pub const MIN_ATTACK_SPEED: f32 = -90.0;

/// Fastest possible attack interval in milliseconds.
pub const MIN_ATTACK_INTERVAL_MS: f32 = 200.0;

/// Dodge chance ceiling (percent).
pub const MAX_DODGE: f32 = 75.0;

// ============================================================================
// Combat Resolution
// ============================================================================

/// Missing-health mark bonus at 0% missing health.
pub const MARK_MIN_BONUS: f32 = 0.10;

/// Missing-health mark bonus at (or beyond) `MARK_MISSING_HEALTH_CAP` missing.
pub const MARK_MAX_BONUS: f32 = 0.70;

/// Missing-health fraction at which the mark bonus stops growing.
pub const MARK_MISSING_HEALTH_CAP: f32 = 0.70;

/// Accuracy above this value eats into the target's dodge chance.
pub const BASE_ACCURACY: f32 = 100.0;

/// Share of a heal a treant redistributes to nearby allies.
pub const TREANT_BURST_RATIO: f32 = 0.5;

/// Radius of the treant heal burst.
pub const TREANT_BURST_RADIUS: f32 = 120.0;

// ============================================================================
// Targeting & Movement
// ============================================================================

/// A current target is kept while within this multiple of attack range.
pub const TARGET_RETAIN_RANGE_FACTOR: f32 = 1.2;

/// Distance improvement per frame below which a mover counts as stuck.
pub const STUCK_EPSILON: f32 = 0.05;

/// Consecutive stuck frames before a probe starts.
pub const STUCK_FRAME_THRESHOLD: u32 = 20;

/// Heading offset while probing around an obstruction (radians).
pub const PROBE_ANGLE: f32 = 1.6;

/// Maximum probe window in milliseconds.
pub const PROBE_DURATION_MS: f64 = 700.0;

/// Bodies may overlap by this fraction of their combined radius before blocking.
pub const BODY_OVERLAP_TOLERANCE: f32 = 0.8;

// ============================================================================
// Projectiles
// ============================================================================

/// Default projectile collision radius.
pub const PROJECTILE_HIT_RADIUS: f32 = 8.0;

/// Default projectile lifetime in milliseconds.
pub const PROJECTILE_LIFETIME_MS: f32 = 3000.0;

// ============================================================================
// Resources
// ============================================================================

/// Fury and corruption gauges cap at this value.
pub const MAX_RESOURCE: f32 = 100.0;

/// Fury gained when a berserker lands a basic attack.
pub const FURY_PER_BASIC_ATTACK: f32 = 10.0;

/// Fury gained when a berserker takes a hit.
pub const FURY_PER_HIT_TAKEN: f32 = 5.0;

/// Corruption gained when any combatant dies.
pub const CORRUPTION_PER_DEATH: f32 = 15.0;

/// Corruption gained per ability hit landed by a necromancer.
pub const CORRUPTION_PER_ABILITY_HIT: f32 = 5.0;

/// Notes remembered by a bard's composition.
pub const COMPOSITION_LENGTH: usize = 3;

// ============================================================================
// Timing
// ============================================================================

/// Default fixed step for headless simulation (60 Hz).
pub const HEADLESS_STEP_MS: f32 = 1000.0 / 60.0;

/// Default pre-battle placement window.
pub const PLACEMENT_DURATION_MS: f32 = 3000.0;

/// Default global cooldown after any successful ability.
pub const GLOBAL_COOLDOWN_MS: f32 = 600.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resistance_caps_are_ordered() {
        assert!(ENEMY_TEMPLATE_RESISTANCE_CAP < ITEM_RESISTANCE_CAP);
        assert!(HERO_RESISTANCE_RANGE.0 < HERO_RESISTANCE_RANGE.1);
        assert!(ENEMY_RESISTANCE_RANGE.0 < ENEMY_RESISTANCE_RANGE.1);
    }

    #[test]
    fn test_mark_bonus_range() {
        assert!(MARK_MIN_BONUS < MARK_MAX_BONUS);
        assert!(MARK_MISSING_HEALTH_CAP > 0.0 && MARK_MISSING_HEALTH_CAP <= 1.0);
    }

    #[test]
    fn test_retain_factor_extends_range() {
        assert!(TARGET_RETAIN_RANGE_FACTOR > 1.0);
    }
}
