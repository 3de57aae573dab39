//! Bard: songs that build a composition.
//!
//! Ballad adds a Verse, Anthem a Chorus, Dirge a Bridge. Once the last three
//! notes are all different, Crescendo becomes available and clears them.

use crate::battle::abilities::{AbilityId, Note, ResourceKind};
use crate::battle::ability_config::{AbilityConfig, AbilityError};
use crate::battle::effects::{CritMode, EffectResult, ResourceChange};

use super::{AbilityContext, AbilityHandlers};

pub fn register(handlers: &mut AbilityHandlers) {
    handlers.register(AbilityId::BalladOfMending, ballad_of_mending);
    handlers.register(AbilityId::WarAnthem, war_anthem);
    handlers.register(AbilityId::Dirge, dirge);
    handlers.register(AbilityId::Crescendo, crescendo);
}

fn note(ctx: &AbilityContext, note: Note) -> EffectResult {
    EffectResult::Resource {
        entity: ctx.caster.entity,
        change: ResourceChange::AddNote(note),
    }
}

fn ballad_of_mending(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let radius = config.positive_prop("radius")?;
    let heal = ctx.scaled_heal(config)?;
    let injured: Vec<_> = ctx
        .roster
        .allies_within(ctx.caster.side, ctx.caster.position, radius)
        .into_iter()
        .filter(|a| a.missing_health() > 0.0)
        .collect();
    if injured.is_empty() {
        return Ok(vec![]);
    }
    let mut effects: Vec<_> = injured
        .iter()
        .map(|a| EffectResult::heal(ctx.caster.entity, a.entity, heal, CritMode::Roll))
        .collect();
    effects.push(note(ctx, Note::Verse));
    Ok(effects)
}

fn war_anthem(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let aura = ctx.require_aura(AbilityId::WarAnthem)?;
    let radius = config.positive_prop("radius")?;
    let targets: Vec<_> = ctx
        .roster
        .allies_within(ctx.caster.side, ctx.caster.position, radius)
        .into_iter()
        .filter(|a| !a.has_aura(AbilityId::WarAnthem))
        .collect();
    if targets.is_empty() {
        return Ok(vec![]);
    }
    let mut effects: Vec<_> = targets
        .iter()
        .map(|a| EffectResult::aura(ctx.caster.entity, a.entity, aura))
        .collect();
    effects.push(note(ctx, Note::Chorus));
    Ok(effects)
}

fn dirge(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    let aura = ctx.require_aura(AbilityId::Dirge)?;
    let radius = config.positive_prop("radius")?;
    let Some(target) = ctx.enemy_in_range(config.range) else {
        return Ok(vec![]);
    };
    let mut effects: Vec<_> = ctx
        .roster
        .enemies_within(ctx.caster.side, target.position, radius)
        .into_iter()
        .map(|e| EffectResult::aura(ctx.caster.entity, e.entity, aura))
        .collect();
    effects.push(note(ctx, Note::Bridge));
    Ok(effects)
}

/// Cash in a complete composition: big party heal plus a buff.
fn crescendo(ctx: &AbilityContext, config: &AbilityConfig) -> Result<Vec<EffectResult>, AbilityError> {
    if !ctx.caster.resources.composition_complete() {
        return Ok(vec![]);
    }
    let aura = ctx.require_aura(AbilityId::Crescendo)?;
    let radius = config.positive_prop("radius")?;
    let heal = ctx.scaled_heal(config)?;
    let mut effects = Vec::new();
    for ally in ctx.roster.allies_within(ctx.caster.side, ctx.caster.position, radius) {
        effects.push(EffectResult::heal(ctx.caster.entity, ally.entity, heal, CritMode::Roll));
        effects.push(EffectResult::aura(ctx.caster.entity, ally.entity, aura));
    }
    effects.push(EffectResult::Resource {
        entity: ctx.caster.entity,
        change: ResourceChange::Reset(ResourceKind::Composition),
    });
    effects.push(EffectResult::notify(
        "Crescendo!",
        ctx.caster.position,
        bevy::color::palettes::css::GOLD.into(),
    ));
    Ok(effects)
}
