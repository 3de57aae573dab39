//! Berserker: fury-fueled melee.
//!
//! Fury builds from landing basic attacks and taking hits (see `dispatch`).
//! At max fury, Cleave is a guaranteed crit and empties the gauge. Rampage
//! spends fury outright and fails without it.

use crate::battle::abilities::{AbilityId, ResourceKind};
use crate::battle::ability_config::{AbilityConfig, AbilityError};
use crate::battle::constants::MAX_RESOURCE;
use crate::battle::effects::{CritMode, DamageEffect, EffectResult, ResourceChange};

use super::{AbilityContext, AbilityHandlers};

pub fn register(handlers: &mut AbilityHandlers) {
    handlers.register(AbilityId::Cleave, cleave);
    handlers.register(AbilityId::Rampage, rampage);
    handlers.register(AbilityId::Bloodlust, bloodlust);
    handlers.register(AbilityId::Charge, charge);
}

fn fury(ctx: &AbilityContext) -> f32 {
    ctx.caster.resources.fury.unwrap_or(0.0)
}

/// Hit the target and everything around it.
fn cleave(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let Some(target) = ctx.enemy_in_range(config.range) else {
        return Ok(vec![]);
    };
    let radius = config.positive_prop("radius")?;
    let damage = ctx.scaled_damage(config)?;
    let empowered = fury(ctx) >= MAX_RESOURCE;
    let crit = if empowered { CritMode::Always } else { CritMode::Roll };

    let mut effects: Vec<_> = ctx
        .roster
        .enemies_within(ctx.caster.side, target.position, radius)
        .into_iter()
        .map(|victim| {
            EffectResult::Damage(
                DamageEffect::ability(ctx.caster.entity, victim.entity, damage, AbilityId::Cleave).with_crit(crit),
            )
        })
        .collect();
    if empowered {
        effects.push(EffectResult::Resource {
            entity: ctx.caster.entity,
            change: ResourceChange::Reset(ResourceKind::Fury),
        });
    }
    Ok(effects)
}

/// Spend fury on a heavy strike that opens a bleed.
fn rampage(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let bleed = ctx.require_aura(AbilityId::Hemorrhage)?;
    let cost = config.positive_prop("fury_cost")?;
    if fury(ctx) < cost {
        return Ok(vec![]);
    }
    let Some(target) = ctx.enemy_in_range(config.range) else {
        return Ok(vec![]);
    };
    let damage = ctx.scaled_damage(config)?;
    Ok(vec![
        EffectResult::Resource {
            entity: ctx.caster.entity,
            change: ResourceChange::Gain(ResourceKind::Fury, -cost),
        },
        EffectResult::Damage(DamageEffect::ability(ctx.caster.entity, target.entity, damage, AbilityId::Rampage)),
        EffectResult::aura(ctx.caster.entity, target.entity, bleed),
    ])
}

/// Attack speed and lifesteal while in a fight.
fn bloodlust(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let aura = ctx.require_aura(AbilityId::Bloodlust)?;
    if ctx.enemy_in_range(config.range).is_none() || ctx.caster.has_aura(AbilityId::Bloodlust) {
        return Ok(vec![]);
    }
    Ok(vec![EffectResult::aura(ctx.caster.entity, ctx.caster.entity, aura)])
}

/// Dash at a distant target; the first swing on arrival hits harder.
fn charge(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let aura = ctx.require_aura(AbilityId::Charge)?;
    let min_distance = config.prop("min_distance")?;
    let Some(target) = ctx.enemy_in_range(config.range) else {
        return Ok(vec![]);
    };
    if ctx.caster.edge_distance(target) < min_distance {
        return Ok(vec![]);
    }
    Ok(vec![EffectResult::aura(ctx.caster.entity, ctx.caster.entity, aura)])
}
