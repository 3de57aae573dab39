//! Necromancer: summoner and drain caster.
//!
//! Corruption builds from deaths and ability hits. At max corruption Drain
//! Soul heals for far more and empties the gauge.

use bevy::prelude::*;

use crate::battle::abilities::{AbilityId, ResourceKind, SummonKind};
use crate::battle::ability_config::{AbilityConfig, AbilityError};
use crate::battle::constants::MAX_RESOURCE;
use crate::battle::effects::{DamageEffect, EffectResult, ResourceChange};
use crate::battle::projectiles::ProjectileSpec;

use super::{AbilityContext, AbilityHandlers};

pub fn register(handlers: &mut AbilityHandlers) {
    handlers.register(AbilityId::RaiseSkeleton, raise_skeleton);
    handlers.register(AbilityId::BoneSpear, bone_spear);
    handlers.register(AbilityId::DrainSoul, drain_soul);
    handlers.register(AbilityId::Decay, decay);
}

fn raise_skeleton(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let cap = config.positive_prop("max_summons")? as usize;
    if ctx.roster.summon_count(ctx.caster.entity, SummonKind::Skeleton) >= cap {
        return Ok(vec![]);
    }
    // Raise it on the side facing the enemy.
    let toward = ctx
        .enemy_target()
        .map(|t| (t.position - ctx.caster.position).normalize_or_zero())
        .unwrap_or(Vec2::ZERO);
    let position = ctx.caster.position + toward * ctx.caster.stats.size;
    Ok(vec![EffectResult::Summon {
        master: ctx.caster.entity,
        kind: SummonKind::Skeleton,
        position,
    }])
}

/// A piercing spear down the line toward the target.
fn bone_spear(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let Some(target) = ctx.enemy_in_range(config.range) else {
        return Ok(vec![]);
    };
    let speed = config.positive_prop("speed")?;
    let damage = ctx.scaled_damage(config)?;
    let lifetime_ms = (config.range + ctx.caster.stats.size) / speed * 1000.0;
    Ok(vec![EffectResult::SpawnProjectile(ProjectileSpec::piercing(
        ctx.caster.entity,
        ctx.caster.side,
        ctx.caster.position,
        target.position - ctx.caster.position,
        speed,
        damage,
        AbilityId::BoneSpear,
        lifetime_ms,
    ))])
}

fn drain_soul(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let Some(target) = ctx.enemy_in_range(config.range) else {
        return Ok(vec![]);
    };
    let damage = ctx.scaled_damage(config)?;
    let ratio = config.positive_prop("drain_ratio")?;
    let empowered = ctx.caster.resources.corruption.unwrap_or(0.0) >= MAX_RESOURCE;

    let mut drain = ratio;
    if empowered {
        drain *= config.positive_prop("empowered_heal_mult")?;
    }
    let mut effects = vec![EffectResult::Damage(
        DamageEffect::ability(ctx.caster.entity, target.entity, damage, AbilityId::DrainSoul).with_drain(drain),
    )];
    if empowered {
        effects.push(EffectResult::Resource {
            entity: ctx.caster.entity,
            change: ResourceChange::Reset(ResourceKind::Corruption),
        });
        effects.push(EffectResult::notify(
            "Soul Feast!",
            ctx.caster.position,
            bevy::color::palettes::css::PURPLE.into(),
        ));
    }
    Ok(effects)
}

/// Rotting DOT; refreshing it on a target that already has it is wasted.
fn decay(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let aura = ctx.require_aura(AbilityId::Decay)?;
    let Some(target) = ctx.enemy_in_range(config.range) else {
        return Ok(vec![]);
    };
    if target.has_aura_from(AbilityId::Decay, ctx.caster.entity) {
        return Ok(vec![]);
    }
    Ok(vec![EffectResult::aura(ctx.caster.entity, target.entity, aura)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::abilities::ClassId;
    use crate::battle::class_ai::test_support::{effects, Arena};
    use crate::battle::class_ai::CastOutcome;
    use crate::battle::components::{Combatant, CombatantKind, Side};

    #[test]
    fn test_raise_skeleton_respects_cap() {
        let mut arena = Arena::new();
        let necro = arena.hero(ClassId::Necromancer, Side::Heroes, Vec2::new(100.0, 300.0));
        let cap = arena.config(AbilityId::RaiseSkeleton).prop("max_summons").unwrap() as usize;
        let template = arena.content.summon(SummonKind::Skeleton).unwrap().clone();
        for _ in 0..cap {
            arena.add(Combatant::new(
                "Skeleton",
                CombatantKind::SkeletonSummon { master: necro },
                Side::Heroes,
                template.clone(),
                Vec::new(),
                1,
                Vec2::new(120.0, 300.0),
            ));
        }
        assert_eq!(arena.cast(AbilityId::RaiseSkeleton, necro, None), CastOutcome::Failed);
    }

    #[test]
    fn test_drain_soul_empowered_at_max_corruption() {
        let mut arena = Arena::new();
        let necro = arena.hero(ClassId::Necromancer, Side::Heroes, Vec2::new(100.0, 300.0));
        let foe = arena.hero(ClassId::Guardian, Side::Opponents, Vec2::new(250.0, 300.0));
        let normal = effects(arena.cast(AbilityId::DrainSoul, necro, Some(foe)));
        arena.get_mut(necro).resources.corruption = Some(MAX_RESOURCE);
        let empowered = effects(arena.cast(AbilityId::DrainSoul, necro, Some(foe)));

        let drain_of = |effects: &[EffectResult]| {
            effects
                .iter()
                .find_map(|e| match e {
                    EffectResult::Damage(d) => Some(d.drain),
                    _ => None,
                })
                .unwrap()
        };
        assert!(!normal.iter().any(|e| matches!(e, EffectResult::Heal { .. })));
        assert!(drain_of(&normal) > 0.0);
        assert!(drain_of(&empowered) > drain_of(&normal));
        assert!(empowered.contains(&EffectResult::Resource {
            entity: necro,
            change: ResourceChange::Reset(ResourceKind::Corruption),
        }));
    }
}
