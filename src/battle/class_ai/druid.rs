//! Druid: nature healer with a treant summon.

use bevy::prelude::*;

use crate::battle::abilities::{AbilityId, SummonKind};
use crate::battle::ability_config::{AbilityConfig, AbilityError};
use crate::battle::effects::{DamageEffect, EffectResult};

use super::{AbilityContext, AbilityHandlers};

pub fn register(handlers: &mut AbilityHandlers) {
    handlers.register(AbilityId::Rejuvenation, rejuvenation);
    handlers.register(AbilityId::SummonTreant, summon_treant);
    handlers.register(AbilityId::Entangle, entangle);
    handlers.register(AbilityId::Barkskin, barkskin);
}

/// HOT on the most injured ally that doesn't already carry one.
fn rejuvenation(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let aura = ctx.require_aura(AbilityId::Rejuvenation)?;
    let threshold = config.positive_prop("health_threshold")?;
    let target = ctx
        .roster
        .most_injured_ally_without(ctx.caster, config.range, threshold, AbilityId::Rejuvenation);
    let Some(target) = target else {
        return Ok(vec![]);
    };
    Ok(vec![EffectResult::aura(ctx.caster.entity, target.entity, aura)])
}

fn summon_treant(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let cap = config.positive_prop("max_summons")? as usize;
    if ctx.roster.summon_count(ctx.caster.entity, SummonKind::Treant) >= cap {
        return Ok(vec![]);
    }
    // Plant it between the druid and the fight.
    let offset = ctx
        .enemy_target()
        .map(|t| (t.position - ctx.caster.position).normalize_or_zero() * config.prop_or("offset", 40.0))
        .unwrap_or(Vec2::ZERO);
    Ok(vec![EffectResult::Summon {
        master: ctx.caster.entity,
        kind: SummonKind::Treant,
        position: ctx.caster.position + offset,
    }])
}

/// Root the target in place; never wasted on something already rooted.
fn entangle(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let aura = ctx.require_aura(AbilityId::Entangle)?;
    let Some(target) = ctx.enemy_in_range(config.range) else {
        return Ok(vec![]);
    };
    if target.has_aura(AbilityId::Entangle) {
        return Ok(vec![]);
    }
    let damage = ctx.scaled_damage(config)?;
    Ok(vec![
        EffectResult::Damage(DamageEffect::ability(ctx.caster.entity, target.entity, damage, AbilityId::Entangle)),
        EffectResult::aura(ctx.caster.entity, target.entity, aura),
    ])
}

/// Harden the most endangered ally.
fn barkskin(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let aura = ctx.require_aura(AbilityId::Barkskin)?;
    let threshold = config.positive_prop("health_threshold")?;
    let Some(target) = ctx
        .roster
        .most_injured_ally(ctx.caster, config.range, threshold)
        .filter(|a| !a.has_aura(AbilityId::Barkskin))
    else {
        return Ok(vec![]);
    };
    Ok(vec![EffectResult::aura(ctx.caster.entity, target.entity, aura)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::abilities::ClassId;
    use crate::battle::class_ai::test_support::{effects, Arena};
    use crate::battle::class_ai::CastOutcome;
    use crate::battle::components::Side;

    #[test]
    fn test_rejuvenation_picks_most_injured_ally() {
        let mut arena = Arena::new();
        let druid = arena.hero(ClassId::Druid, Side::Heroes, Vec2::new(100.0, 300.0));
        let scratched = arena.hero(ClassId::Guardian, Side::Heroes, Vec2::new(150.0, 300.0));
        let hurt = arena.hero(ClassId::Ranger, Side::Heroes, Vec2::new(160.0, 340.0));
        arena.get_mut(scratched).hp *= 0.8;
        arena.get_mut(hurt).hp *= 0.3;

        let result = effects(arena.cast(AbilityId::Rejuvenation, druid, None));
        assert_eq!(result, vec![EffectResult::aura(druid, hurt, AbilityId::Rejuvenation)]);
    }

    #[test]
    fn test_rejuvenation_with_healthy_party_fails() {
        let mut arena = Arena::new();
        let druid = arena.hero(ClassId::Druid, Side::Heroes, Vec2::new(100.0, 300.0));
        arena.hero(ClassId::Guardian, Side::Heroes, Vec2::new(150.0, 300.0));
        assert_eq!(arena.cast(AbilityId::Rejuvenation, druid, None), CastOutcome::Failed);
    }
}
