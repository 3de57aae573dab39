//! Effect Resolver
//!
//! Drains `PendingEffects` and applies each `EffectResult` to the world.
//! Follow-ups produced while resolving (lifesteal, treant bursts, stack
//! payoffs) go to a local work queue and resolve in the same pass.
//!
//! Every domain event is pushed to the `EventQueue`; presentation cues go to
//! the `PresentationFeed`.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use std::collections::VecDeque;

use crate::battle::abilities::{AbilityId, SummonKind};
use crate::battle::ability_config::ContentDefinitions;
use crate::battle::areas::{ActiveArea, AreaSpec};
use crate::battle::combat_core::{crit_damage, grant_shield, receive_heal, take_damage, DamageOutcome, IncomingHit};
use crate::battle::components::visual::{NumberKind, PresentationFeed, VfxKind, VisualCue};
use crate::battle::components::{
    ArenaBounds, AuraApplyOutcome, BattleClock, Combatant, CombatantKind, GameRng, MovementState,
};
use crate::battle::constants::{BASE_ACCURACY, TREANT_BURST_RADIUS};
use crate::battle::projectiles::{Projectile, ProjectileSpec};
use crate::battle::scheduler::ScheduledActions;
use crate::combat::events::{CombatEvent, EventQueue, HitResult};

use super::{CritMode, DamageEffect, EffectResult, PendingEffects, ResourceChange};

/// Safety valve against effect feedback loops.
const MAX_EFFECTS_PER_PASS: usize = 10_000;

/// Attacker-side numbers read before the target is borrowed mutably.
#[derive(Clone, Copy, Debug)]
struct SourceView {
    entity: Entity,
    credit: Entity,
    crit_chance: f32,
    crit_damage: f32,
    accuracy: f32,
    vampirism: f32,
}

/// Everything the resolver writes to.
#[derive(SystemParam)]
pub struct EffectSink<'w, 's> {
    commands: Commands<'w, 's>,
    clock: Res<'w, BattleClock>,
    content: Res<'w, ContentDefinitions>,
    bounds: Res<'w, ArenaBounds>,
    rng: ResMut<'w, GameRng>,
    queue: ResMut<'w, EventQueue>,
    scheduled: ResMut<'w, ScheduledActions>,
    feed: ResMut<'w, PresentationFeed>,
    combatants: Query<'w, 's, (Entity, &'static mut Combatant)>,
}

/// Resolve everything pending, including follow-ups.
pub fn resolve_pending_effects(mut pending: ResMut<PendingEffects>, mut sink: EffectSink) {
    if pending.is_empty() {
        return;
    }
    let mut work: VecDeque<EffectResult> = pending.drain().into();
    let mut resolved = 0;
    while let Some(effect) = work.pop_front() {
        resolved += 1;
        if resolved > MAX_EFFECTS_PER_PASS {
            warn!("Effect resolution exceeded {} effects; dropping the rest", MAX_EFFECTS_PER_PASS);
            break;
        }
        sink.apply(effect, &mut work);
    }
}

impl EffectSink<'_, '_> {
    /// Apply one effect. Missing entities and templates are skipped.
    pub fn apply(&mut self, effect: EffectResult, work: &mut VecDeque<EffectResult>) {
        match effect {
            EffectResult::Damage(damage) => self.apply_damage(damage, work),
            EffectResult::Heal {
                source,
                target,
                amount,
                crit,
                secondary,
            } => self.apply_heal(source, target, amount, crit, secondary, work),
            EffectResult::Shield { source, target, amount } => self.apply_shield(source, target, amount),
            EffectResult::ApplyAura { source, target, aura } => self.apply_aura(source, target, aura, work),
            EffectResult::RemoveAura { target, aura } => {
                if let Ok((_, mut combatant)) = self.combatants.get_mut(target) {
                    combatant.remove_aura(aura);
                }
            }
            EffectResult::SpawnProjectile(spec) => self.spawn_projectile(spec),
            EffectResult::SpawnArea(spec) => self.spawn_area(spec),
            EffectResult::Summon { master, kind, position } => self.summon(master, kind, position),
            EffectResult::Teleport { entity, position } => {
                let bounds = *self.bounds;
                if let Ok((_, mut combatant)) = self.combatants.get_mut(entity) {
                    if combatant.alive {
                        let size = combatant.stats.size;
                        combatant.position = bounds.clamp(position, size);
                        combatant.movement = MovementState::default();
                    }
                }
            }
            EffectResult::Knockback { target, from, distance } => {
                let bounds = *self.bounds;
                if let Ok((_, mut combatant)) = self.combatants.get_mut(target) {
                    if combatant.alive {
                        let dir = (combatant.position - from).normalize_or_zero();
                        let dir = if dir == Vec2::ZERO { Vec2::X } else { dir };
                        let size = combatant.stats.size;
                        combatant.position = bounds.clamp(combatant.position + dir * distance, size);
                    }
                }
            }
            EffectResult::Schedule {
                delay_ms,
                caster,
                target,
                action,
            } => {
                let fire_at = self.clock.now_ms + delay_ms.max(0.0) as f64;
                self.scheduled.schedule(fire_at, caster, target, action);
            }
            EffectResult::SetBossState { entity, state } => {
                if let Ok((_, mut combatant)) = self.combatants.get_mut(entity) {
                    if combatant.alive {
                        combatant.boss = state;
                    }
                }
            }
            EffectResult::Resource { entity, change } => {
                if let Ok((_, mut combatant)) = self.combatants.get_mut(entity) {
                    match change {
                        ResourceChange::Gain(kind, amount) => combatant.resources.gain(kind, amount),
                        ResourceChange::Reset(kind) => combatant.resources.reset(kind),
                        ResourceChange::AddNote(note) => combatant.resources.push_note(note),
                    }
                }
            }
            EffectResult::Notify { text, position, color } => {
                self.feed.cues.push(VisualCue::Notification {
                    text: text.clone(),
                    position,
                    color,
                });
                self.queue.push(CombatEvent::NotificationText {
                    text,
                    x: position.x,
                    y: position.y,
                    color,
                });
            }
            EffectResult::Vfx { kind, position, radius } => self.feed.vfx(kind, position, radius),
        }
    }

    fn source_view(&self, source: Entity) -> Option<SourceView> {
        self.combatants.get(source).ok().map(|(entity, c)| SourceView {
            entity,
            credit: c.credit_owner(entity),
            crit_chance: c.stats.crit_chance,
            crit_damage: c.stats.crit_damage,
            accuracy: c.stats.accuracy,
            vampirism: c.stats.vampirism,
        })
    }

    fn roll_crit(&mut self, mode: CritMode, source: Option<&SourceView>) -> bool {
        match mode {
            CritMode::Always => true,
            CritMode::Never => false,
            CritMode::Roll => source.is_some_and(|s| self.rng.roll_percent(s.crit_chance)),
        }
    }

    fn apply_damage(&mut self, damage: DamageEffect, work: &mut VecDeque<EffectResult>) {
        let source = damage.source.and_then(|s| self.source_view(s));
        let is_crit = self.roll_crit(damage.crit, source.as_ref());
        let raw = if is_crit {
            crit_damage(damage.amount, source.map_or(50.0, |s| s.crit_damage))
        } else {
            damage.amount
        };

        let Ok((_, mut target)) = self.combatants.get_mut(damage.target) else {
            return;
        };
        let hit = IncomingHit {
            raw,
            attacker: damage.source,
            accuracy: source.map_or(BASE_ACCURACY, |s| s.accuracy),
            never_miss: damage.never_miss,
        };
        let outcome = take_damage(&mut target, hit, &mut self.rng);
        let position = target.position;
        drop(target);

        match outcome {
            DamageOutcome::Missed => {
                if !damage.periodic {
                    self.feed.number(damage.target, position, 0.0, NumberKind::Miss, false);
                }
            }
            DamageOutcome::Dodged | DamageOutcome::Blocked => {
                let (result, kind) = if outcome == DamageOutcome::Dodged {
                    (HitResult::Dodge, NumberKind::Dodge)
                } else {
                    (HitResult::Block, NumberKind::Block)
                };
                self.queue.push(CombatEvent::DamageTaken {
                    target: damage.target,
                    attacker: damage.source,
                    amount: 0.0,
                    result,
                    is_crit: false,
                });
                self.feed.number(damage.target, position, 0.0, kind, false);
            }
            DamageOutcome::Hit { amount, absorbed, killed } => {
                if let Some(attacker) = damage.source {
                    self.queue.push(CombatEvent::DamageDealt {
                        attacker,
                        target: damage.target,
                        amount,
                        is_crit,
                        ability: damage.ability,
                    });
                }
                self.queue.push(CombatEvent::DamageTaken {
                    target: damage.target,
                    attacker: damage.source,
                    amount,
                    result: HitResult::Hit,
                    is_crit,
                });
                self.feed.number(damage.target, position, amount, NumberKind::Damage, is_crit);

                if let Some(source) = source {
                    if let Ok((_, mut credited)) = self.combatants.get_mut(source.credit) {
                        credited.report.damage_dealt += amount;
                        if killed {
                            credited.report.kills += 1;
                        }
                    }
                    let drained = (amount - absorbed) * damage.drain;
                    if drained > 0.0 {
                        work.push_back(EffectResult::heal(source.entity, source.entity, drained, CritMode::Never));
                    }
                    if !damage.periodic && source.vampirism > 0.0 {
                        work.push_back(EffectResult::Heal {
                            source: source.entity,
                            target: source.entity,
                            amount: amount * source.vampirism / 100.0,
                            crit: CritMode::Never,
                            secondary: true,
                        });
                    }
                }
                if killed {
                    self.queue.push(CombatEvent::EntityDied {
                        victim: damage.target,
                        killer: source.map(|s| s.credit),
                    });
                }
            }
        }
    }

    fn apply_heal(
        &mut self,
        source: Entity,
        target: Entity,
        amount: f32,
        crit: CritMode,
        secondary: bool,
        work: &mut VecDeque<EffectResult>,
    ) {
        let view = self.source_view(source);
        let is_crit = self.roll_crit(crit, view.as_ref());
        let amount = if is_crit {
            crit_damage(amount, view.map_or(50.0, |v| v.crit_damage))
        } else {
            amount
        };

        let Ok((_, mut healed)) = self.combatants.get_mut(target) else {
            return;
        };
        let outcome = receive_heal(&mut healed, amount, secondary);
        let (position, side) = (healed.position, healed.side);
        drop(healed);

        if outcome.applied > 0.0 {
            self.queue.push(CombatEvent::HealPerformed {
                caster: source,
                target,
                amount: outcome.applied,
                is_crit,
            });
            self.feed.number(target, position, outcome.applied, NumberKind::Heal, is_crit);
            if let Some(credit) = view.map(|v| v.credit) {
                if let Ok((_, mut credited)) = self.combatants.get_mut(credit) {
                    credited.report.healing_done += outcome.applied;
                }
            }
        }

        if let Some(burst) = outcome.burst {
            for (ally, c) in self.combatants.iter() {
                if ally != target && c.alive && c.side == side && c.position.distance(position) <= TREANT_BURST_RADIUS {
                    work.push_back(EffectResult::Heal {
                        source: target,
                        target: ally,
                        amount: burst,
                        crit: CritMode::Never,
                        secondary: true,
                    });
                }
            }
            self.feed.vfx(VfxKind::Burst, position, TREANT_BURST_RADIUS);
        }
    }

    fn apply_shield(&mut self, source: Entity, target: Entity, amount: f32) {
        let credit = self.source_view(source).map(|v| v.credit);
        let Ok((_, mut shielded)) = self.combatants.get_mut(target) else {
            return;
        };
        let granted = grant_shield(&mut shielded, amount);
        let position = shielded.position;
        drop(shielded);
        if granted <= 0.0 {
            return;
        }
        self.queue.push(CombatEvent::ShieldApplied {
            caster: source,
            target,
            amount: granted,
        });
        self.feed.number(target, position, granted, NumberKind::Shield, false);
        if let Some(credit) = credit {
            if let Ok((_, mut credited)) = self.combatants.get_mut(credit) {
                credited.report.shielding_granted += granted;
            }
        }
    }

    fn apply_aura(
        &mut self,
        source: Entity,
        target: Entity,
        aura: AbilityId,
        work: &mut VecDeque<EffectResult>,
    ) {
        let Some(template) = self.content.aura_template(aura) else {
            warn!("No aura template for {:?}", aura);
            return;
        };
        let source_stats = self.combatants.get(source).ok().map(|(_, c)| c.stats.clone());
        let instance = template.instantiate(aura, source, source_stats.as_ref(), self.clock.now_ms);

        let Ok((_, mut bearer)) = self.combatants.get_mut(target) else {
            return;
        };
        if !bearer.alive {
            return;
        }
        let position = bearer.position;
        let outcome = bearer.apply_aura(instance);
        drop(bearer);

        if let AuraApplyOutcome::ReachedMax(Some(payoff)) = outcome {
            work.push_front(EffectResult::ApplyAura {
                source,
                target,
                aura: payoff.apply,
            });
            work.push_back(EffectResult::notify(
                format!("{}!", payoff.apply.name()),
                position,
                bevy::color::palettes::css::YELLOW.into(),
            ));
        }
    }

    fn spawn_projectile(&mut self, spec: ProjectileSpec) {
        let source = self.source_view(spec.source);
        let is_crit = self.roll_crit(spec.crit, source.as_ref());
        self.commands.spawn(Projectile::launch(spec, is_crit));
    }

    fn spawn_area(&mut self, spec: AreaSpec) {
        self.feed.vfx(VfxKind::Burst, spec.position, spec.radius);
        let now = self.clock.now_ms;
        self.commands.spawn(ActiveArea::new(spec, now));
    }

    fn summon(&mut self, master: Entity, kind: SummonKind, position: Vec2) {
        let Some(template) = self.content.summon(kind).cloned() else {
            warn!("No summon template for {:?}", kind);
            return;
        };
        let Ok((_, owner)) = self.combatants.get(master) else {
            return;
        };
        if !owner.alive {
            return;
        }
        let summon_kind = match kind {
            SummonKind::Skeleton => CombatantKind::SkeletonSummon { master },
            SummonKind::Treant => CombatantKind::TreeSummon { master },
        };
        let name = format!("{}'s {}", owner.name, template.name);
        let (side, threat) = (owner.side, owner.threat);
        let position = self.bounds.clamp(position, template.size);
        let lifetime = template.lifetime_ms;

        let mut summon = Combatant::new(name, summon_kind, side, template, Vec::new(), threat, position);
        summon.expires_at_ms = lifetime.map(|l| self.clock.now_ms + l as f64);
        let id = self.commands.spawn(summon).id();

        self.queue.push(CombatEvent::SummonPerformed { caster: master, summon: id });
        self.feed.vfx(VfxKind::Summon, position, 0.0);
    }
}
