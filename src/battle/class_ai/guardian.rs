//! Guardian: the frontline tank.
//!
//! - Shield Wall: block charges + resistance on self
//! - Taunt: forces nearby enemies to target the guardian
//! - Shield Bash: melee hit + stun; taunted targets take bonus damage
//! - Rally: shields allies around the guardian

use crate::battle::abilities::AbilityId;
use crate::battle::ability_config::{AbilityConfig, AbilityError};
use crate::battle::effects::{DamageEffect, EffectResult};

use super::{AbilityContext, AbilityHandlers};

pub fn register(handlers: &mut AbilityHandlers) {
    handlers.register(AbilityId::ShieldWall, shield_wall);
    handlers.register(AbilityId::Taunt, taunt);
    handlers.register(AbilityId::ShieldBash, shield_bash);
    handlers.register(AbilityId::Rally, rally);
}

/// Raise block charges once enemies are close.
fn shield_wall(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let aura = ctx.require_aura(AbilityId::ShieldWall)?;
    let radius = config.positive_prop("trigger_radius")?;
    if ctx.roster.enemies_within(ctx.caster.side, ctx.caster.position, radius).is_empty() {
        return Ok(vec![]);
    }
    Ok(vec![EffectResult::aura(ctx.caster.entity, ctx.caster.entity, aura)])
}

fn taunt(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let aura = ctx.require_aura(AbilityId::Taunt)?;
    let radius = config.positive_prop("radius")?;
    let caster = ctx.caster.entity;
    // Enemies already locked onto the guardian don't need it.
    let victims: Vec<_> = ctx
        .roster
        .enemies_within(ctx.caster.side, ctx.caster.position, radius)
        .into_iter()
        .filter(|e| e.target != Some(caster) || !e.has_aura_from(AbilityId::Taunt, caster))
        .collect();
    if victims.is_empty() {
        return Ok(vec![]);
    }
    let mut effects: Vec<_> = victims
        .iter()
        .map(|v| EffectResult::aura(caster, v.entity, aura))
        .collect();
    effects.push(EffectResult::notify(
        "Taunt!",
        ctx.caster.position,
        bevy::color::palettes::css::ORANGE.into(),
    ));
    Ok(effects)
}

fn shield_bash(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let aura = ctx.require_aura(AbilityId::ShieldBash)?;
    let Some(target) = ctx.enemy_in_range(config.range) else {
        return Ok(vec![]);
    };
    let mut damage = ctx.scaled_damage(config)?;
    if target.has_aura_from(AbilityId::Taunt, ctx.caster.entity) {
        damage *= config.prop_or("taunted_bonus", 1.0);
    }
    Ok(vec![
        EffectResult::Damage(DamageEffect::ability(ctx.caster.entity, target.entity, damage, AbilityId::ShieldBash)),
        EffectResult::aura(ctx.caster.entity, target.entity, aura),
    ])
}

/// Shield every injured or engaged ally nearby.
fn rally(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let radius = config.positive_prop("radius")?;
    let amount = config.positive_prop("shield")? + ctx.caster.stats.max_hp * config.prop_or("shield_max_hp", 0.0);
    let threshold = config.prop_or("health_threshold", 1.0);
    let allies = ctx.roster.allies_within(ctx.caster.side, ctx.caster.position, radius);
    if !allies.iter().any(|a| a.health_pct() < threshold) {
        return Ok(vec![]);
    }
    Ok(allies
        .into_iter()
        .map(|a| EffectResult::Shield {
            source: ctx.caster.entity,
            target: a.entity,
            amount,
        })
        .collect())
}
