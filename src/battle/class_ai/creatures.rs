//! Enemy abilities and boss phase machines.
//!
//! ## Burrow (Sandworm)
//! `None → BurrowChanneling → BurrowRetreating → BurrowCharging → None`.
//! Each arrow is a scheduled continuation that first checks the worm is still
//! in the phase it left; a stun during the channel resets it to `None` (see
//! `boss`), so the rest of the chain no-ops.
//!
//! ## Leap (Ogre Chieftain)
//! `None → Airborne → None`, landing with an area stun.

use bevy::prelude::*;

use crate::battle::abilities::AbilityId;
use crate::battle::ability_config::{AbilityConfig, AbilityError};
use crate::battle::components::visual::VfxKind;
use crate::battle::components::BossState;
use crate::battle::effects::{CritMode, DamageEffect, EffectResult};
use crate::battle::projectiles::ProjectileSpec;
use crate::battle::scheduler::DelayedAction;

use super::{AbilityContext, AbilityHandlers};

pub fn register(handlers: &mut AbilityHandlers) {
    handlers.register(AbilityId::AimedShot, aimed_shot);
    handlers.register(AbilityId::MendAlly, mend_ally);
    handlers.register(AbilityId::Regenerate, regenerate);
    handlers.register(AbilityId::Smash, smash);
    handlers.register(AbilityId::Burrow, burrow);
    handlers.register(AbilityId::Leap, leap);
}

fn aimed_shot(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let Some(target) = ctx.enemy_in_range(config.range) else {
        return Ok(vec![]);
    };
    Ok(vec![EffectResult::SpawnProjectile(ProjectileSpec::homing(
        ctx.caster.entity,
        ctx.caster.side,
        ctx.caster.position,
        target.entity,
        target.position,
        config.positive_prop("speed")?,
        ctx.scaled_damage(config)?,
        Some(AbilityId::AimedShot),
    ))])
}

fn mend_ally(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let threshold = config.positive_prop("health_threshold")?;
    let Some(target) = ctx.roster.most_injured_ally(ctx.caster, config.range, threshold) else {
        return Ok(vec![]);
    };
    Ok(vec![EffectResult::heal(
        ctx.caster.entity,
        target.entity,
        ctx.scaled_heal(config)?,
        CritMode::Roll,
    )])
}

fn regenerate(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let aura = ctx.require_aura(AbilityId::Regenerate)?;
    let threshold = config.positive_prop("health_threshold")?;
    if ctx.caster.health_pct() >= threshold || ctx.caster.has_aura(AbilityId::Regenerate) {
        return Ok(vec![]);
    }
    Ok(vec![EffectResult::aura(ctx.caster.entity, ctx.caster.entity, aura)])
}

/// Ground slam around the target: damage and a daze.
fn smash(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let daze = ctx.require_aura(AbilityId::Dazed)?;
    let radius = config.positive_prop("radius")?;
    let Some(target) = ctx.enemy_in_range(config.range) else {
        return Ok(vec![]);
    };
    let damage = ctx.scaled_damage(config)?;
    let mut effects = Vec::new();
    for victim in ctx.roster.enemies_within(ctx.caster.side, target.position, radius) {
        effects.push(EffectResult::Damage(DamageEffect::ability(
            ctx.caster.entity,
            victim.entity,
            damage,
            AbilityId::Smash,
        )));
        effects.push(EffectResult::aura(ctx.caster.entity, victim.entity, daze));
    }
    effects.push(EffectResult::Vfx {
        kind: VfxKind::Burst,
        position: target.position,
        radius,
    });
    Ok(effects)
}

/// Start the burrow channel.
fn burrow(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let channel_ms = config.positive_prop("channel_ms")?;
    if ctx.caster.boss != BossState::None {
        return Ok(vec![]);
    }
    let Some(target) = ctx.enemy_in_range(config.range) else {
        return Ok(vec![]);
    };
    Ok(vec![
        EffectResult::SetBossState {
            entity: ctx.caster.entity,
            state: BossState::BurrowChanneling,
        },
        EffectResult::Schedule {
            delay_ms: channel_ms,
            caster: ctx.caster.entity,
            target: Some(target.entity),
            action: DelayedAction::BurrowSubmerge,
        },
        EffectResult::notify(
            format!("{} begins to burrow!", ctx.caster.name),
            ctx.caster.position,
            bevy::color::palettes::css::SANDY_BROWN.into(),
        ),
    ])
}

pub fn burrow_submerge(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let retreat_ms = config.positive_prop("retreat_ms")?;
    if ctx.caster.boss != BossState::BurrowChanneling {
        return Ok(vec![]);
    }
    Ok(vec![
        EffectResult::SetBossState {
            entity: ctx.caster.entity,
            state: BossState::BurrowRetreating,
        },
        EffectResult::Schedule {
            delay_ms: retreat_ms,
            caster: ctx.caster.entity,
            target: ctx.target.map(|t| t.entity),
            action: DelayedAction::BurrowCharge,
        },
        EffectResult::Vfx {
            kind: VfxKind::Burrow,
            position: ctx.caster.position,
            radius: ctx.caster.stats.size,
        },
    ])
}

pub fn burrow_charge(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let charge_ms = config.positive_prop("charge_ms")?;
    if ctx.caster.boss != BossState::BurrowRetreating {
        return Ok(vec![]);
    }
    // Charge at the original target, or whoever is closest if it died.
    let aim = ctx
        .enemy_target()
        .or_else(|| ctx.roster.nearest_targetable_enemy(ctx.caster));
    let heading = aim
        .map(|t| (t.position - ctx.caster.position).normalize_or_zero())
        .filter(|h| *h != Vec2::ZERO)
        .unwrap_or(Vec2::X);
    Ok(vec![
        EffectResult::SetBossState {
            entity: ctx.caster.entity,
            state: BossState::BurrowCharging {
                heading,
                struck: Default::default(),
            },
        },
        EffectResult::Schedule {
            delay_ms: charge_ms,
            caster: ctx.caster.entity,
            target: aim.map(|t| t.entity),
            action: DelayedAction::BurrowEmerge,
        },
    ])
}

pub fn burrow_emerge(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let stun = ctx.require_aura(AbilityId::Concussed)?;
    let radius = config.positive_prop("emerge_radius")?;
    if !matches!(ctx.caster.boss, BossState::BurrowCharging { .. }) {
        return Ok(vec![]);
    }
    let damage = ctx.caster.stats.damage * config.positive_prop("emerge_damage_mult")?;
    let mut effects = vec![EffectResult::SetBossState {
        entity: ctx.caster.entity,
        state: BossState::None,
    }];
    effects.extend(area_slam(ctx, AbilityId::Burrow, ctx.caster.position, radius, damage, stun));
    effects.push(EffectResult::Vfx {
        kind: VfxKind::Emerge,
        position: ctx.caster.position,
        radius,
    });
    Ok(effects)
}

/// Jump at a distant target.
fn leap(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let air_time_ms = config.positive_prop("air_time_ms")?;
    let min_distance = config.prop("min_distance")?;
    if ctx.caster.boss != BossState::None {
        return Ok(vec![]);
    }
    let Some(target) = ctx.enemy_in_range(config.range) else {
        return Ok(vec![]);
    };
    if ctx.caster.edge_distance(target) < min_distance {
        return Ok(vec![]);
    }
    Ok(vec![
        EffectResult::SetBossState {
            entity: ctx.caster.entity,
            state: BossState::Airborne {
                landing: target.position,
            },
        },
        EffectResult::Schedule {
            delay_ms: air_time_ms,
            caster: ctx.caster.entity,
            target: Some(target.entity),
            action: DelayedAction::LeapLand,
        },
    ])
}

pub fn leap_land(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let stun = ctx.require_aura(AbilityId::Concussed)?;
    let radius = config.positive_prop("radius")?;
    let BossState::Airborne { landing } = ctx.caster.boss else {
        return Ok(vec![]);
    };
    let damage = ctx.scaled_damage(config)?;
    let mut effects = vec![
        EffectResult::Teleport {
            entity: ctx.caster.entity,
            position: landing,
        },
        EffectResult::SetBossState {
            entity: ctx.caster.entity,
            state: BossState::None,
        },
    ];
    effects.extend(area_slam(ctx, AbilityId::Leap, landing, radius, damage, stun));
    effects.push(EffectResult::Vfx {
        kind: VfxKind::Landing,
        position: landing,
        radius,
    });
    Ok(effects)
}

fn area_slam(
    ctx: &AbilityContext,
    ability: AbilityId,
    center: Vec2,
    radius: f32,
    damage: f32,
    stun: AbilityId,
) -> Vec<EffectResult> {
    let mut effects = Vec::new();
    for victim in ctx.roster.enemies_within(ctx.caster.side, center, radius) {
        effects.push(EffectResult::Damage(
            DamageEffect::ability(ctx.caster.entity, victim.entity, damage, ability).never_miss(),
        ));
        effects.push(EffectResult::aura(ctx.caster.entity, victim.entity, stun));
    }
    effects
}
