//! Cleric: the dedicated healer.

use crate::battle::abilities::AbilityId;
use crate::battle::ability_config::{AbilityConfig, AbilityError};
use crate::battle::effects::{CritMode, EffectResult};

use super::{AbilityContext, AbilityHandlers};

pub fn register(handlers: &mut AbilityHandlers) {
    handlers.register(AbilityId::HolyLight, holy_light);
    handlers.register(AbilityId::Aegis, aegis);
    handlers.register(AbilityId::Renew, renew);
    handlers.register(AbilityId::DivineIntervention, divine_intervention);
}

fn holy_light(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let threshold = config.positive_prop("health_threshold")?;
    let Some(target) = ctx.roster.most_injured_ally(ctx.caster, config.range, threshold) else {
        return Ok(vec![]);
    };
    let heal = ctx.scaled_heal(config)?;
    Ok(vec![EffectResult::heal(ctx.caster.entity, target.entity, heal, CritMode::Roll)])
}

/// Shield plus a resistance buff; Aegis never stacks on the same ally.
fn aegis(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let aura = ctx.require_aura(AbilityId::Aegis)?;
    let threshold = config.positive_prop("health_threshold")?;
    let target = ctx
        .roster
        .most_injured_ally_without(ctx.caster, config.range, threshold, AbilityId::Aegis);
    let Some(target) = target else {
        return Ok(vec![]);
    };
    let amount = config.positive_prop("shield")? + ctx.caster.stats.healing_power * config.prop_or("shield_scaling", 1.0);
    Ok(vec![
        EffectResult::Shield {
            source: ctx.caster.entity,
            target: target.entity,
            amount,
        },
        EffectResult::aura(ctx.caster.entity, target.entity, aura),
    ])
}

fn renew(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let aura = ctx.require_aura(AbilityId::Renew)?;
    let threshold = config.positive_prop("health_threshold")?;
    let target = ctx
        .roster
        .most_injured_ally_without(ctx.caster, config.range, threshold, AbilityId::Renew);
    Ok(target
        .map(|t| EffectResult::aura(ctx.caster.entity, t.entity, aura))
        .into_iter()
        .collect())
}

/// Last-ditch invulnerability and heal on an ally about to die.
fn divine_intervention(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let aura = ctx.require_aura(AbilityId::DivineIntervention)?;
    let threshold = config.positive_prop("health_threshold")?;
    let Some(target) = ctx.roster.most_injured_ally(ctx.caster, config.range, threshold) else {
        return Ok(vec![]);
    };
    let heal = ctx.scaled_heal(config)?;
    Ok(vec![
        EffectResult::aura(ctx.caster.entity, target.entity, aura),
        EffectResult::heal(ctx.caster.entity, target.entity, heal, CritMode::Never),
        EffectResult::notify(
            "Divine Intervention!",
            target.position,
            bevy::color::palettes::css::LIGHT_YELLOW.into(),
        ),
    ])
}
