//! Projectile Systems
//!
//! Projectiles are transient entities that travel from a caster and resolve
//! collisions against opposing combatants. Hits go through the normal effect
//! resolver, so mitigation, shields, events and passives all apply.
//!
//! - Homing (non-piercing) projectiles steer toward their target, end on the
//!   first qualifying hit and expire harmlessly if the target dies first.
//! - Piercing projectiles fly straight, hit every opposing body they pass once,
//!   and end when their lifetime runs out.

use bevy::prelude::*;
use smallvec::SmallVec;

use super::abilities::AbilityId;
use super::components::visual::VfxKind;
use super::components::{BattleClock, Combatant, Side};
use super::constants::{PROJECTILE_HIT_RADIUS, PROJECTILE_LIFETIME_MS};
use super::effects::{CritMode, DamageEffect, EffectResult, PendingEffects};

/// Secondary area hit around the primary impact.
#[derive(Clone, Debug, PartialEq)]
pub struct Splash {
    pub radius: f32,
    /// Fraction of the primary damage dealt to each secondary target
    pub damage_fraction: f32,
    /// Aura spread to secondary targets
    pub aura: Option<AbilityId>,
}

/// Everything needed to launch a projectile.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectileSpec {
    pub source: Entity,
    pub side: Side,
    pub origin: Vec2,
    /// Homing target (ignored by piercing projectiles after launch)
    pub target: Option<Entity>,
    pub direction: Vec2,
    pub speed: f32,
    pub hit_radius: f32,
    pub lifetime_ms: f32,
    pub damage: f32,
    /// Rolled once when the projectile spawns
    pub crit: CritMode,
    /// `None` for basic attacks
    pub ability: Option<AbilityId>,
    pub aura: Option<AbilityId>,
    pub splash: Option<Splash>,
    pub pierce: bool,
}

impl ProjectileSpec {
    /// A homing projectile aimed at `target`.
    #[allow(clippy::too_many_arguments)]
    pub fn homing(
        source: Entity,
        side: Side,
        origin: Vec2,
        target: Entity,
        target_position: Vec2,
        speed: f32,
        damage: f32,
        ability: Option<AbilityId>,
    ) -> Self {
        Self {
            source,
            side,
            origin,
            target: Some(target),
            direction: (target_position - origin).normalize_or_zero(),
            speed,
            hit_radius: PROJECTILE_HIT_RADIUS,
            lifetime_ms: PROJECTILE_LIFETIME_MS,
            damage,
            crit: CritMode::Roll,
            ability,
            aura: None,
            splash: None,
            pierce: false,
        }
    }

    /// A straight-line projectile that passes through bodies.
    #[allow(clippy::too_many_arguments)]
    pub fn piercing(
        source: Entity,
        side: Side,
        origin: Vec2,
        direction: Vec2,
        speed: f32,
        damage: f32,
        ability: AbilityId,
        lifetime_ms: f32,
    ) -> Self {
        Self {
            source,
            side,
            origin,
            target: None,
            direction: direction.normalize_or_zero(),
            speed,
            hit_radius: PROJECTILE_HIT_RADIUS,
            lifetime_ms,
            damage,
            crit: CritMode::Roll,
            ability: Some(ability),
            aura: None,
            splash: None,
            pierce: true,
        }
    }

    pub fn with_aura(mut self, aura: AbilityId) -> Self {
        self.aura = Some(aura);
        self
    }

    pub fn with_splash(mut self, splash: Splash) -> Self {
        self.splash = Some(splash);
        self
    }

    pub fn with_crit(mut self, crit: CritMode) -> Self {
        self.crit = crit;
        self
    }
}

/// A projectile in flight.
#[derive(Component, Clone, Debug)]
pub struct Projectile {
    pub spec: ProjectileSpec,
    pub position: Vec2,
    pub direction: Vec2,
    pub remaining_ms: f32,
    pub is_crit: bool,
    /// Bodies already hit (piercing)
    pub hit: SmallVec<[Entity; 4]>,
    /// Set when the projectile has ended; despawn is deferred
    pub spent: bool,
}

impl Projectile {
    pub fn launch(spec: ProjectileSpec, is_crit: bool) -> Self {
        Self {
            position: spec.origin,
            direction: spec.direction,
            remaining_ms: spec.lifetime_ms,
            is_crit,
            hit: SmallVec::new(),
            spent: false,
            spec,
        }
    }
}

/// Advance projectiles; expire them on lifetime or (homing) when the target is gone.
pub fn move_projectiles(
    clock: Res<BattleClock>,
    mut commands: Commands,
    mut projectiles: Query<(Entity, &mut Projectile)>,
    combatants: Query<&Combatant>,
) {
    let dt = clock.delta_ms;
    for (entity, mut projectile) in projectiles.iter_mut() {
        if projectile.spent {
            continue;
        }
        projectile.remaining_ms -= dt;
        if projectile.remaining_ms <= 0.0 {
            projectile.spent = true;
            commands.entity(entity).despawn();
            continue;
        }

        if !projectile.spec.pierce {
            let target = projectile
                .spec
                .target
                .and_then(|t| combatants.get(t).ok())
                .filter(|c| c.alive);
            match target {
                Some(target) => {
                    let heading = (target.position - projectile.position).normalize_or_zero();
                    if heading != Vec2::ZERO {
                        projectile.direction = heading;
                    }
                }
                None => {
                    projectile.spent = true;
                    commands.entity(entity).despawn();
                    continue;
                }
            }
        }

        let step = projectile.direction * projectile.spec.speed * dt / 1000.0;
        projectile.position += step;
    }
}

/// Resolve projectile collisions into damage/aura/splash effects.
pub fn process_projectile_hits(
    mut commands: Commands,
    mut pending: ResMut<PendingEffects>,
    mut projectiles: Query<(Entity, &mut Projectile)>,
    combatants: Query<(Entity, &Combatant)>,
) {
    for (entity, mut projectile) in projectiles.iter_mut() {
        if projectile.spent {
            continue;
        }

        let mut candidates: Vec<(Entity, f32, Vec2)> = combatants
            .iter()
            .filter(|(e, c)| {
                *e != projectile.spec.source
                    && c.alive
                    && c.side != projectile.spec.side
                    && !c.is_untargetable()
                    && !projectile.hit.contains(e)
            })
            .filter_map(|(e, c)| {
                let distance = c.position.distance(projectile.position);
                (distance <= projectile.spec.hit_radius + c.stats.size / 2.0).then_some((e, distance, c.position))
            })
            .collect();
        if candidates.is_empty() {
            continue;
        }
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
        if !projectile.spec.pierce {
            candidates.truncate(1);
        }

        for (victim, _, impact) in candidates {
            let spec = &projectile.spec;
            pending.push(EffectResult::Damage(DamageEffect {
                ability: spec.ability,
                ..DamageEffect::basic(spec.source, victim, spec.damage, CritMode::from_flag(projectile.is_crit))
            }));
            if let Some(aura) = spec.aura {
                pending.push(EffectResult::aura(spec.source, victim, aura));
            }
            if let Some(splash) = &spec.splash {
                for (other, c) in combatants.iter() {
                    if other == victim
                        || other == spec.source
                        || !c.alive
                        || c.side == spec.side
                        || c.position.distance(impact) > splash.radius + c.stats.size / 2.0
                    {
                        continue;
                    }
                    pending.push(EffectResult::Damage(DamageEffect {
                        ability: spec.ability,
                        ..DamageEffect::basic(spec.source, other, spec.damage * splash.damage_fraction, CritMode::Never)
                    }));
                    if let Some(aura) = splash.aura {
                        pending.push(EffectResult::aura(spec.source, other, aura));
                    }
                }
                pending.push(EffectResult::Vfx {
                    kind: VfxKind::Burst,
                    position: impact,
                    radius: splash.radius,
                });
            } else {
                pending.push(EffectResult::Vfx {
                    kind: VfxKind::Impact,
                    position: impact,
                    radius: 0.0,
                });
            }
            projectile.hit.push(victim);
        }

        if !projectile.spec.pierce {
            projectile.spent = true;
            commands.entity(entity).despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use bevy::ecs::system::RunSystemOnce;

    use super::*;
    use crate::battle::abilities::ClassId;
    use crate::battle::ability_config::ContentDefinitions;
    use crate::battle::components::CombatantKind;

    fn world_with(step_ms: f32) -> World {
        let mut world = World::new();
        world.insert_resource(BattleClock {
            delta_ms: step_ms,
            ..BattleClock::fixed(step_ms)
        });
        world.init_resource::<PendingEffects>();
        world
    }

    fn spawn_hero(world: &mut World, class: ClassId, side: Side, position: Vec2) -> Entity {
        let content = ContentDefinitions::builtin().expect("builtin content");
        let template = content.class(class).expect("class template").clone();
        world
            .spawn(Combatant::new(
                class.name(),
                CombatantKind::AiHero(class),
                side,
                template,
                Vec::new(),
                1,
                position,
            ))
            .id()
    }

    fn damage_targets(world: &World) -> Vec<Entity> {
        world
            .resource::<PendingEffects>()
            .iter()
            .filter_map(|e| match e {
                EffectResult::Damage(d) => Some(d.target),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_homing_projectile_expires_when_target_dies() {
        let mut world = world_with(16.0);
        let ranger = spawn_hero(&mut world, ClassId::Ranger, Side::Heroes, Vec2::new(100.0, 300.0));
        let foe = spawn_hero(&mut world, ClassId::Cleric, Side::Opponents, Vec2::new(400.0, 300.0));
        let spec = ProjectileSpec::homing(
            ranger,
            Side::Heroes,
            Vec2::new(100.0, 300.0),
            foe,
            Vec2::new(400.0, 300.0),
            400.0,
            20.0,
            None,
        );
        let arrow = world.spawn(Projectile::launch(spec, false)).id();
        world.get_mut::<Combatant>(foe).unwrap().kill();

        world.run_system_once(move_projectiles).unwrap();
        world.run_system_once(process_projectile_hits).unwrap();

        assert!(!world.entities().contains(arrow));
        assert!(world.resource::<PendingEffects>().is_empty());
    }

    #[test]
    fn test_homing_projectile_hits_once_and_ends() {
        let mut world = world_with(16.0);
        let ranger = spawn_hero(&mut world, ClassId::Ranger, Side::Heroes, Vec2::new(100.0, 300.0));
        let foe = spawn_hero(&mut world, ClassId::Cleric, Side::Opponents, Vec2::new(110.0, 300.0));
        let spec = ProjectileSpec::homing(
            ranger,
            Side::Heroes,
            Vec2::new(100.0, 300.0),
            foe,
            Vec2::new(110.0, 300.0),
            400.0,
            20.0,
            None,
        );
        let arrow = world.spawn(Projectile::launch(spec, false)).id();

        world.run_system_once(process_projectile_hits).unwrap();
        assert_eq!(damage_targets(&world), vec![foe]);
        assert!(!world.entities().contains(arrow));
    }

    #[test]
    fn test_piercing_projectile_hits_each_body_once() {
        let mut world = world_with(16.0);
        let necro = spawn_hero(&mut world, ClassId::Necromancer, Side::Heroes, Vec2::new(100.0, 300.0));
        let first = spawn_hero(&mut world, ClassId::Guardian, Side::Opponents, Vec2::new(105.0, 300.0));
        let spec = ProjectileSpec::piercing(
            necro,
            Side::Heroes,
            Vec2::new(100.0, 300.0),
            Vec2::X,
            500.0,
            30.0,
            AbilityId::BoneSpear,
            1000.0,
        );
        let spear = world.spawn(Projectile::launch(spec, false)).id();

        world.run_system_once(process_projectile_hits).unwrap();
        world.run_system_once(process_projectile_hits).unwrap();
        assert_eq!(damage_targets(&world), vec![first]);
        // Still flying
        assert!(world.entities().contains(spear));
    }

    #[test]
    fn test_basic_attack_splash_stays_a_basic_attack() {
        let mut world = world_with(16.0);
        let ranger = spawn_hero(&mut world, ClassId::Ranger, Side::Heroes, Vec2::new(100.0, 300.0));
        let foe = spawn_hero(&mut world, ClassId::Cleric, Side::Opponents, Vec2::new(110.0, 300.0));
        let bystander = spawn_hero(&mut world, ClassId::Bard, Side::Opponents, Vec2::new(130.0, 300.0));
        let spec = ProjectileSpec::homing(
            ranger,
            Side::Heroes,
            Vec2::new(100.0, 300.0),
            foe,
            Vec2::new(110.0, 300.0),
            400.0,
            20.0,
            None,
        )
        .with_splash(Splash {
            radius: 40.0,
            damage_fraction: 0.5,
            aura: None,
        });
        world.spawn(Projectile::launch(spec, false));

        world.run_system_once(process_projectile_hits).unwrap();
        let hits: Vec<_> = world
            .resource::<PendingEffects>()
            .iter()
            .filter_map(|e| match e {
                EffectResult::Damage(d) => Some((d.target, d.ability)),
                _ => None,
            })
            .collect();
        assert_eq!(hits, vec![(foe, None), (bystander, None)]);
    }

    #[test]
    fn test_projectile_ignores_own_side() {
        let mut world = world_with(16.0);
        let ranger = spawn_hero(&mut world, ClassId::Ranger, Side::Heroes, Vec2::new(100.0, 300.0));
        spawn_hero(&mut world, ClassId::Guardian, Side::Heroes, Vec2::new(105.0, 300.0));
        let spec = ProjectileSpec::piercing(
            ranger,
            Side::Heroes,
            Vec2::new(100.0, 300.0),
            Vec2::X,
            500.0,
            30.0,
            AbilityId::Volley,
            1000.0,
        );
        world.spawn(Projectile::launch(spec, false));

        world.run_system_once(process_projectile_hits).unwrap();
        assert!(damage_targets(&world).is_empty());
    }
}
