//! Assassin: burst from the shadows.
//!
//! Shadowstep channels briefly, then teleports behind the target and strikes
//! (a scheduled continuation). Backstab from invisibility always crits; a
//! marked target can't dodge it.

use crate::battle::abilities::AbilityId;
use crate::battle::ability_config::{AbilityConfig, AbilityError};
use crate::battle::components::visual::VfxKind;
use crate::battle::effects::{CritMode, DamageEffect, EffectResult};
use crate::battle::scheduler::DelayedAction;

use super::{point_behind, AbilityContext, AbilityHandlers};

pub fn register(handlers: &mut AbilityHandlers) {
    handlers.register(AbilityId::Shadowstep, shadowstep);
    handlers.register(AbilityId::MarkForDeath, mark_for_death);
    handlers.register(AbilityId::Backstab, backstab);
    handlers.register(AbilityId::Vanish, vanish);
}

fn shadowstep(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let channel_ms = config.positive_prop("channel_ms")?;
    let Some(target) = ctx.enemy_in_range(config.range) else {
        return Ok(vec![]);
    };
    // Already in its face: nothing to step to.
    if ctx.caster.in_range(target, ctx.caster.stats.range) {
        return Ok(vec![]);
    }
    Ok(vec![
        EffectResult::Schedule {
            delay_ms: channel_ms,
            caster: ctx.caster.entity,
            target: Some(target.entity),
            action: DelayedAction::ShadowstepStrike,
        },
        EffectResult::Vfx {
            kind: VfxKind::Teleport,
            position: ctx.caster.position,
            radius: ctx.caster.stats.size,
        },
    ])
}

/// End of the Shadowstep channel. A stun or a lost target cancels it.
pub fn shadowstep_strike(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    if ctx.caster.stunned {
        return Ok(vec![]);
    }
    let Some(target) = ctx.enemy_target() else {
        return Ok(vec![]);
    };
    let damage = ctx.scaled_damage(config)?;
    let landing = point_behind(
        ctx.caster.position,
        target.position,
        (ctx.caster.stats.size + target.stats.size) / 2.0,
    );
    Ok(vec![
        EffectResult::Teleport {
            entity: ctx.caster.entity,
            position: landing,
        },
        EffectResult::Damage(
            DamageEffect::ability(ctx.caster.entity, target.entity, damage, AbilityId::Shadowstep).never_miss(),
        ),
        EffectResult::Vfx {
            kind: VfxKind::Teleport,
            position: landing,
            radius: ctx.caster.stats.size,
        },
    ])
}

fn mark_for_death(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let aura = ctx.require_aura(AbilityId::MarkForDeath)?;
    let Some(target) = ctx.enemy_in_range(config.range) else {
        return Ok(vec![]);
    };
    if target.has_aura_from(AbilityId::MarkForDeath, ctx.caster.entity) {
        return Ok(vec![]);
    }
    Ok(vec![EffectResult::aura(ctx.caster.entity, target.entity, aura)])
}

fn backstab(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let Some(target) = ctx.enemy_in_range(config.range) else {
        return Ok(vec![]);
    };
    let mut damage = ctx.scaled_damage(config)?;
    let mut hit = DamageEffect::ability(ctx.caster.entity, target.entity, damage, AbilityId::Backstab);
    let mut effects = Vec::new();
    if ctx.caster.invisible {
        damage *= config.prop_or("stealth_mult", 1.0);
        hit.amount = damage;
        hit = hit.with_crit(CritMode::Always);
        effects.push(EffectResult::RemoveAura {
            target: ctx.caster.entity,
            aura: AbilityId::Vanish,
        });
    }
    if target.has_aura_from(AbilityId::MarkForDeath, ctx.caster.entity) {
        hit = hit.never_miss();
    }
    effects.insert(0, EffectResult::Damage(hit));
    Ok(effects)
}

fn vanish(ctx: &AbilityContext, _config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let aura = ctx.require_aura(AbilityId::Vanish)?;
    if ctx.caster.invisible {
        return Ok(vec![]);
    }
    Ok(vec![
        EffectResult::aura(ctx.caster.entity, ctx.caster.entity, aura),
        EffectResult::Vfx {
            kind: VfxKind::Teleport,
            position: ctx.caster.position,
            radius: ctx.caster.stats.size,
        },
    ])
}
