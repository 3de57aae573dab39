//! Ranger: poison and projectiles.
//!
//! Poison Arrow stacks a poison that paralyzes at max stacks. Volley splashes
//! around its target and spreads the poison when the target already carries
//! it. Double Shot schedules a second arrow.

use crate::battle::abilities::AbilityId;
use crate::battle::ability_config::{AbilityConfig, AbilityError};
use crate::battle::areas::AreaSpec;
use crate::battle::effects::EffectResult;
use crate::battle::projectiles::{ProjectileSpec, Splash};
use crate::battle::scheduler::DelayedAction;

use super::{AbilityContext, AbilityHandlers};

pub fn register(handlers: &mut AbilityHandlers) {
    handlers.register(AbilityId::PoisonArrow, poison_arrow);
    handlers.register(AbilityId::VenomTrap, venom_trap);
    handlers.register(AbilityId::Volley, volley);
    handlers.register(AbilityId::DoubleShot, double_shot);
    handlers.register(AbilityId::Camouflage, camouflage);
}

fn arrow(ctx: &AbilityContext, config: &AbilityConfig, damage: f32) -> Result<Option<ProjectileSpec>, AbilityError> {
    let Some(target) = ctx.enemy_in_range(config.range) else {
        return Ok(None);
    };
    Ok(Some(ProjectileSpec::homing(
        ctx.caster.entity,
        ctx.caster.side,
        ctx.caster.position,
        target.entity,
        target.position,
        config.positive_prop("speed")?,
        damage,
        Some(ctx.ability),
    )))
}

fn poison_arrow(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let poison = ctx.require_aura(AbilityId::PoisonArrow)?;
    let damage = ctx.scaled_damage(config)?;
    Ok(arrow(ctx, config, damage)?
        .map(|spec| EffectResult::SpawnProjectile(spec.with_aura(poison)))
        .into_iter()
        .collect())
}

/// Drop a venom puddle under the target.
fn venom_trap(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let slow = ctx.require_aura(AbilityId::VenomTrap)?;
    let Some(target) = ctx.enemy_in_range(config.range) else {
        return Ok(vec![]);
    };
    Ok(vec![EffectResult::SpawnArea(AreaSpec {
        source: ctx.caster.entity,
        side: ctx.caster.side,
        ability: AbilityId::VenomTrap,
        position: target.position,
        radius: config.positive_prop("radius")?,
        tick_interval_ms: config.positive_prop("tick_interval_ms")?,
        duration_ms: config.positive_prop("area_duration_ms")?,
        damage_per_tick: ctx.caster.stats.damage * config.positive_prop("tick_damage_mult")?,
        aura: Some(slow),
    })])
}

fn volley(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let damage = ctx.scaled_damage(config)?;
    let radius = config.positive_prop("radius")?;
    let fraction = config.positive_prop("splash_fraction")?;
    let Some(spec) = arrow(ctx, config, damage)? else {
        return Ok(vec![]);
    };
    let poisoned = ctx
        .target
        .is_some_and(|t| t.has_aura(AbilityId::PoisonArrow));
    Ok(vec![EffectResult::SpawnProjectile(spec.with_splash(Splash {
        radius,
        damage_fraction: fraction,
        aura: poisoned.then_some(AbilityId::PoisonArrow),
    }))])
}

fn double_shot(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let damage = ctx.scaled_damage(config)?;
    let delay_ms = config.positive_prop("second_delay_ms")?;
    let Some(spec) = arrow(ctx, config, damage)? else {
        return Ok(vec![]);
    };
    let target = spec.target;
    Ok(vec![
        EffectResult::SpawnProjectile(spec),
        EffectResult::Schedule {
            delay_ms,
            caster: ctx.caster.entity,
            target,
            action: DelayedAction::SecondShot,
        },
    ])
}

/// Second Double Shot arrow. No-op if the target is gone or hidden.
pub fn second_shot(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    if ctx.caster.stunned {
        return Ok(vec![]);
    }
    let damage = ctx.scaled_damage(config)? * config.prop_or("second_mult", 1.0);
    // The second arrow only needs line of sight, not range.
    let Some(target) = ctx.enemy_target() else {
        return Ok(vec![]);
    };
    Ok(vec![EffectResult::SpawnProjectile(ProjectileSpec::homing(
        ctx.caster.entity,
        ctx.caster.side,
        ctx.caster.position,
        target.entity,
        target.position,
        config.positive_prop("speed")?,
        damage,
        Some(AbilityId::DoubleShot),
    ))])
}

/// Slip out of sight when something gets too close.
fn camouflage(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let aura = ctx.require_aura(AbilityId::Camouflage)?;
    let radius = config.positive_prop("trigger_radius")?;
    if ctx.caster.invisible || ctx.roster.enemies_within(ctx.caster.side, ctx.caster.position, radius).is_empty() {
        return Ok(vec![]);
    }
    Ok(vec![EffectResult::aura(ctx.caster.entity, ctx.caster.entity, aura)])
}

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use super::*;
    use crate::battle::abilities::ClassId;
    use crate::battle::class_ai::test_support::{effects, Arena};
    use crate::battle::components::Side;

    #[test]
    fn test_volley_spreads_poison_only_from_poisoned_target() {
        let mut arena = Arena::new();
        let ranger = arena.hero(ClassId::Ranger, Side::Heroes, Vec2::new(100.0, 300.0));
        let foe = arena.hero(ClassId::Guardian, Side::Opponents, Vec2::new(300.0, 300.0));

        let splash_aura = |effects: Vec<EffectResult>| match &effects[0] {
            EffectResult::SpawnProjectile(spec) => spec.splash.as_ref().unwrap().aura,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(splash_aura(effects(arena.cast(AbilityId::Volley, ranger, Some(foe)))), None);

        let poison = arena
            .content
            .aura_template(AbilityId::PoisonArrow)
            .unwrap()
            .instantiate(AbilityId::PoisonArrow, ranger, None, 0.0);
        arena.get_mut(foe).apply_aura(poison);
        assert_eq!(
            splash_aura(effects(arena.cast(AbilityId::Volley, ranger, Some(foe)))),
            Some(AbilityId::PoisonArrow)
        );
    }

    #[test]
    fn test_double_shot_schedules_second_arrow() {
        let mut arena = Arena::new();
        let ranger = arena.hero(ClassId::Ranger, Side::Heroes, Vec2::new(100.0, 300.0));
        let foe = arena.hero(ClassId::Guardian, Side::Opponents, Vec2::new(300.0, 300.0));
        let result = effects(arena.cast(AbilityId::DoubleShot, ranger, Some(foe)));
        assert!(matches!(
            result[1],
            EffectResult::Schedule {
                action: DelayedAction::SecondShot,
                target: Some(t),
                ..
            } if t == foe
        ));
    }
}
