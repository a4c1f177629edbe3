//! Timed abilities and status effects on units.
//!
//! Lifecycle: granted → applied → expired → removed.
//!
//! A grant stores an [`AbilityRecord`] under its [`AbilityKind`]. The
//! application pass applies stat multipliers exactly once, guarded by
//! the record's `applied` flag, and runs continuous effects (recovery,
//! poison) every tick. The expiry sweep reverses an applied record
//! exactly once by dividing by the same factor and then deletes it.
//!
//! Multipliers are checked when granted: a factor below
//! [`MIN_MULTIPLIER`], or one whose product with the stat is out of
//! range, is refused so that every applied factor can be divided back
//! out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::Health;
use crate::error::{GameError, Result};
use crate::math::{decimal_serde, fixed_serde, rate_over_millis, Fixed};
use crate::unit::{StatusFlags, Unit};

/// Smallest accepted stat multiplier (1/1024).
///
/// Below this the boosted stat keeps too few fractional bits to divide
/// back to its original value.
pub const MIN_MULTIPLIER: Fixed = Fixed::from_bits(1 << 22);

/// Key of an ability record. One record per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    /// Multiplies speed.
    SpeedBoost,
    /// Multiplies damage.
    DamageBoost,
    /// Multiplies maximum (and current) health.
    MaxHealthBoost,
    /// Blocks all damage.
    Immunity,
    /// Heals continuously.
    Recovery,
    /// Absorbs a fraction of incoming damage for a while.
    Shield,
    /// Absorbs a fraction of incoming damage forever.
    PermanentShield,
    /// Deals damage at a fixed interval.
    Poison,
    /// A key this build has no handler for.
    #[serde(other)]
    Unknown,
}

impl AbilityKind {
    /// Check if records of this kind absorb damage.
    #[must_use]
    pub const fn is_shield(self) -> bool {
        matches!(self, Self::Shield | Self::PermanentShield)
    }
}

/// A granted ability on one unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbilityRecord {
    /// Ability key.
    pub kind: AbilityKind,
    /// Multiplier, fraction, or amount, depending on the kind.
    #[serde(with = "fixed_serde")]
    pub value: Fixed,
    /// Lifetime in milliseconds; 0 is permanent.
    pub duration_ms: u64,
    /// Grant time.
    pub started_at_ms: u64,
    /// Whether the one-shot part has been applied (and not yet reversed).
    pub applied: bool,
    /// Interval for periodic effects.
    pub tick_rate_ms: Option<u64>,
    /// Last time a periodic effect fired.
    pub last_tick_ms: u64,
}

impl AbilityRecord {
    /// Create an unapplied record.
    #[must_use]
    pub fn new(kind: AbilityKind, value: Fixed, duration_ms: u64, now_ms: u64) -> Self {
        Self {
            kind,
            value,
            duration_ms,
            started_at_ms: now_ms,
            applied: false,
            tick_rate_ms: None,
            last_tick_ms: now_ms,
        }
    }

    /// Builder: make the effect periodic.
    #[must_use]
    pub fn with_tick_rate(mut self, tick_rate_ms: u64) -> Self {
        self.tick_rate_ms = Some(tick_rate_ms);
        self
    }

    /// Check if the record never expires.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.duration_ms == 0
    }

    /// Check if the record has run its course at `now_ms`.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        !self.is_permanent() && now_ms.saturating_sub(self.started_at_ms) >= self.duration_ms
    }
}

/// An ability-granting action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityGrant {
    /// Multiply speed by `factor`.
    SpeedBoost {
        /// Speed multiplier.
        #[serde(with = "decimal_serde")]
        factor: Fixed,
        /// Lifetime; 0 is permanent.
        duration_ms: u64,
    },
    /// Multiply damage by `factor`.
    DamageBoost {
        /// Damage multiplier.
        #[serde(with = "decimal_serde")]
        factor: Fixed,
        /// Lifetime; 0 is permanent.
        duration_ms: u64,
    },
    /// Take no damage.
    Immunity {
        /// Lifetime; 0 is permanent.
        duration_ms: u64,
    },
    /// Heal `per_second` health every second.
    Recovery {
        /// Healing rate.
        #[serde(with = "decimal_serde")]
        per_second: Fixed,
        /// Lifetime; 0 is permanent.
        duration_ms: u64,
    },
    /// Absorb `absorb` (0-1) of incoming damage forever.
    PermanentShield {
        /// Absorbed fraction.
        #[serde(with = "decimal_serde")]
        absorb: Fixed,
    },
    /// Absorb `absorb` (0-1) of incoming damage for a while.
    Shield {
        /// Absorbed fraction.
        #[serde(with = "decimal_serde")]
        absorb: Fixed,
        /// Lifetime; 0 is permanent.
        duration_ms: u64,
    },
    /// Take `damage` every `interval_ms`.
    Poison {
        /// Damage per pulse.
        #[serde(with = "decimal_serde")]
        damage: Fixed,
        /// Pulse interval.
        interval_ms: u64,
        /// Lifetime; 0 is permanent.
        duration_ms: u64,
    },
    /// Permanent boss upgrade: more health, more damage, and a shield.
    BossStature {
        /// Max health multiplier.
        #[serde(with = "decimal_serde")]
        health_factor: Fixed,
        /// Damage multiplier.
        #[serde(with = "decimal_serde")]
        damage_factor: Fixed,
        /// Absorbed damage fraction.
        #[serde(with = "decimal_serde")]
        absorb: Fixed,
    },
}

impl AbilityGrant {
    /// Records this grant creates at `now_ms`.
    #[must_use]
    pub fn into_records(self, now_ms: u64) -> Vec<AbilityRecord> {
        match self {
            Self::SpeedBoost {
                factor,
                duration_ms,
            } => vec![AbilityRecord::new(
                AbilityKind::SpeedBoost,
                factor,
                duration_ms,
                now_ms,
            )],
            Self::DamageBoost {
                factor,
                duration_ms,
            } => vec![AbilityRecord::new(
                AbilityKind::DamageBoost,
                factor,
                duration_ms,
                now_ms,
            )],
            Self::Immunity { duration_ms } => vec![AbilityRecord::new(
                AbilityKind::Immunity,
                Fixed::ONE,
                duration_ms,
                now_ms,
            )],
            Self::Recovery {
                per_second,
                duration_ms,
            } => vec![AbilityRecord::new(
                AbilityKind::Recovery,
                per_second,
                duration_ms,
                now_ms,
            )],
            Self::PermanentShield { absorb } => vec![AbilityRecord::new(
                AbilityKind::PermanentShield,
                absorb,
                0,
                now_ms,
            )],
            Self::Shield {
                absorb,
                duration_ms,
            } => vec![AbilityRecord::new(
                AbilityKind::Shield,
                absorb,
                duration_ms,
                now_ms,
            )],
            Self::Poison {
                damage,
                interval_ms,
                duration_ms,
            } => vec![
                AbilityRecord::new(AbilityKind::Poison, damage, duration_ms, now_ms)
                    .with_tick_rate(interval_ms),
            ],
            Self::BossStature {
                health_factor,
                damage_factor,
                absorb,
            } => vec![
                AbilityRecord::new(AbilityKind::MaxHealthBoost, health_factor, 0, now_ms),
                AbilityRecord::new(AbilityKind::DamageBoost, damage_factor, 0, now_ms),
                AbilityRecord::new(AbilityKind::PermanentShield, absorb, 0, now_ms),
            ],
        }
    }
}

/// A unit's abilities keyed by kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityMap(BTreeMap<AbilityKind, AbilityRecord>);

impl AbilityMap {
    /// Record for `kind`, if granted.
    #[must_use]
    pub fn get(&self, kind: AbilityKind) -> Option<&AbilityRecord> {
        self.0.get(&kind)
    }

    /// Check if `kind` is granted.
    #[must_use]
    pub fn contains(&self, kind: AbilityKind) -> bool {
        self.0.contains_key(&kind)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if nothing is granted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over records in key order.
    pub fn iter(&self) -> impl Iterator<Item = &AbilityRecord> {
        self.0.values()
    }
}

/// Effects the application pass had on a unit this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbilityTick {
    /// Health restored by recovery.
    pub healed: Fixed,
    /// Health lost to poison.
    pub poison_damage: Fixed,
}

/// Check that every multiplier in `records` can be applied to this unit
/// and later divided back out.
///
/// # Errors
///
/// Returns [`GameError::InvalidAbility`] for a factor below
/// [`MIN_MULTIPLIER`] or one that would push the stat out of range.
pub fn check_grant(unit: &Unit, health: &Health, records: &[AbilityRecord]) -> Result<()> {
    for record in records {
        let Some(stat) = multiplied_stat(unit, health, record.kind) else {
            continue;
        };
        if record.value < MIN_MULTIPLIER {
            return Err(GameError::InvalidAbility {
                kind: record.kind,
                reason: format!("factor {} is below {}", record.value, MIN_MULTIPLIER),
            });
        }
        if stat.checked_mul(record.value).is_none() {
            return Err(GameError::InvalidAbility {
                kind: record.kind,
                reason: format!("{} x {} is out of range", stat, record.value),
            });
        }
    }
    Ok(())
}

/// The stat `kind` multiplies, as it will be when the record applies:
/// an applied record of the same kind is divided out first.
fn multiplied_stat(unit: &Unit, health: &Health, kind: AbilityKind) -> Option<Fixed> {
    let stat = match kind {
        AbilityKind::SpeedBoost => unit.stats.speed,
        AbilityKind::DamageBoost => unit.stats.damage,
        AbilityKind::MaxHealthBoost => health.max.max(health.current),
        _ => return None,
    };
    match unit.abilities.get(kind) {
        Some(previous) if previous.applied => {
            Some(stat.checked_div(previous.value).unwrap_or(stat))
        }
        _ => Some(stat),
    }
}

/// Store `records` on the unit.
///
/// A record replacing an applied one of the same kind reverses the old
/// one first, so multipliers never stack.
pub fn grant(unit: &mut Unit, health: &mut Health, records: Vec<AbilityRecord>) {
    for record in records {
        if let Some(previous) = unit.abilities.0.remove(&record.kind) {
            if previous.applied {
                reverse(unit, health, &previous);
            }
        }
        tracing::debug!("Granted {:?} ({})", record.kind, record.value);
        unit.abilities.0.insert(record.kind, record);
    }
}

/// Run the per-tick application pass for one unit.
pub fn apply_abilities(
    unit: &mut Unit,
    health: &mut Health,
    now_ms: u64,
    dt_ms: u64,
) -> AbilityTick {
    let mut outcome = AbilityTick::default();
    let mut records = std::mem::take(&mut unit.abilities.0);
    let mut refused = Vec::new();

    for record in records.values_mut() {
        if !record.applied {
            if !apply_once(unit, health, record) {
                tracing::warn!(
                    "Dropping {:?}: factor {} cannot be applied",
                    record.kind,
                    record.value
                );
                refused.push(record.kind);
                continue;
            }
            record.applied = true;
        }

        match record.kind {
            AbilityKind::Recovery => {
                let amount = rate_over_millis(record.value, dt_ms);
                outcome.healed += health.heal(amount);
            }
            AbilityKind::Poison => {
                let interval = record.tick_rate_ms.unwrap_or(0);
                if interval > 0 && now_ms.saturating_sub(record.last_tick_ms) >= interval {
                    record.last_tick_ms = now_ms;
                    if !unit.is_immune() {
                        outcome.poison_damage += health.apply_damage(record.value);
                    }
                }
            }
            _ => {}
        }
    }

    for kind in refused {
        records.remove(&kind);
    }
    unit.abilities.0 = records;
    outcome
}

/// Reverse and delete every record that has expired at `now_ms`.
///
/// Returns the kinds removed, in key order.
pub fn expire_abilities(unit: &mut Unit, health: &mut Health, now_ms: u64) -> Vec<AbilityKind> {
    let expired: Vec<AbilityKind> = unit
        .abilities
        .iter()
        .filter(|record| record.is_expired(now_ms))
        .map(|record| record.kind)
        .collect();

    for kind in &expired {
        if let Some(record) = unit.abilities.0.remove(kind) {
            if record.applied {
                reverse(unit, health, &record);
            }
            tracing::debug!("Ability {:?} expired", kind);
        }
    }
    expired
}

/// Multiply `stat` in place. Refuses factors that could not be reversed.
fn multiply(stat: &mut Fixed, factor: Fixed) -> bool {
    if factor < MIN_MULTIPLIER {
        return false;
    }
    match stat.checked_mul(factor) {
        Some(product) => {
            *stat = product;
            true
        }
        None => false,
    }
}

/// Divide `stat` by a factor previously applied with [`multiply`].
fn divide(stat: &mut Fixed, factor: Fixed) {
    if let Some(quotient) = stat.checked_div(factor) {
        *stat = quotient;
    }
}

/// Returns `false` if the record's effect could not be applied.
fn apply_once(unit: &mut Unit, health: &mut Health, record: &AbilityRecord) -> bool {
    match record.kind {
        AbilityKind::SpeedBoost => return multiply(&mut unit.stats.speed, record.value),
        AbilityKind::DamageBoost => return multiply(&mut unit.stats.damage, record.value),
        AbilityKind::MaxHealthBoost => {
            if record.value < MIN_MULTIPLIER || !health.try_scale(record.value) {
                return false;
            }
            unit.stats.max_health = health.max;
        }
        AbilityKind::Immunity => unit.status.insert(StatusFlags::IMMUNE),
        AbilityKind::Recovery => unit.status.insert(StatusFlags::RECOVERING),
        AbilityKind::Shield | AbilityKind::PermanentShield => {
            unit.status.insert(StatusFlags::SHIELDED);
        }
        AbilityKind::Poison => unit.status.insert(StatusFlags::POISONED),
        AbilityKind::Unknown => {
            tracing::warn!("No handler to apply ability {:?}", record.kind);
        }
    }
    true
}

/// Undo an applied record. The record must already be out of the map.
fn reverse(unit: &mut Unit, health: &mut Health, record: &AbilityRecord) {
    match record.kind {
        AbilityKind::SpeedBoost => divide(&mut unit.stats.speed, record.value),
        AbilityKind::DamageBoost => divide(&mut unit.stats.damage, record.value),
        AbilityKind::MaxHealthBoost => {
            health.unscale(record.value);
            unit.stats.max_health = health.max;
        }
        AbilityKind::Immunity => unit.status.remove(StatusFlags::IMMUNE),
        AbilityKind::Recovery => unit.status.remove(StatusFlags::RECOVERING),
        AbilityKind::Shield | AbilityKind::PermanentShield => {
            if unit.shield().is_none() {
                unit.status.remove(StatusFlags::SHIELDED);
            }
        }
        AbilityKind::Poison => unit.status.remove(StatusFlags::POISONED),
        AbilityKind::Unknown => {
            tracing::warn!("No handler to reverse ability {:?}", record.kind);
            debug_assert!(
                record.kind != AbilityKind::Unknown,
                "ability record without a reversal handler"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::UnitStats;

    fn fixed(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn setup() -> (Unit, Health) {
        let stats = UnitStats {
            speed: fixed(60),
            damage: fixed(20),
            attack_range: fixed(40),
            autochase_range: fixed(200),
            max_health: fixed(100),
        };
        (Unit::new(stats), Health::new(fixed(100)))
    }

    #[test]
    fn test_speed_boost_lifecycle() {
        let (mut unit, mut health) = setup();
        let boost = AbilityGrant::SpeedBoost {
            factor: fixed(2),
            duration_ms: 1000,
        };
        grant(&mut unit, &mut health, boost.into_records(0));
        assert_eq!(unit.stats.speed, fixed(60));

        apply_abilities(&mut unit, &mut health, 50, 50);
        assert_eq!(unit.stats.speed, fixed(120));

        // Applying again does not stack.
        apply_abilities(&mut unit, &mut health, 100, 50);
        assert_eq!(unit.stats.speed, fixed(120));

        assert!(expire_abilities(&mut unit, &mut health, 999).is_empty());
        assert_eq!(
            expire_abilities(&mut unit, &mut health, 1000),
            vec![AbilityKind::SpeedBoost]
        );
        assert_eq!(unit.stats.speed, fixed(60));
        assert!(unit.abilities.is_empty());

        // A second sweep has nothing left to reverse.
        assert!(expire_abilities(&mut unit, &mut health, 2000).is_empty());
        assert_eq!(unit.stats.speed, fixed(60));
    }

    #[test]
    fn test_regrant_reverses_previous() {
        let (mut unit, mut health) = setup();
        let boost = |factor: i32| AbilityGrant::DamageBoost {
            factor: fixed(factor),
            duration_ms: 0,
        };
        grant(&mut unit, &mut health, boost(2).into_records(0));
        apply_abilities(&mut unit, &mut health, 50, 50);
        assert_eq!(unit.stats.damage, fixed(40));

        grant(&mut unit, &mut health, boost(3).into_records(60));
        assert_eq!(unit.stats.damage, fixed(20));
        apply_abilities(&mut unit, &mut health, 100, 50);
        assert_eq!(unit.stats.damage, fixed(60));
        assert_eq!(unit.abilities.len(), 1);
    }

    #[test]
    fn test_unapplied_record_is_not_reversed_on_expiry() {
        let (mut unit, mut health) = setup();
        let boost = AbilityGrant::SpeedBoost {
            factor: fixed(2),
            duration_ms: 100,
        };
        grant(&mut unit, &mut health, boost.into_records(0));
        expire_abilities(&mut unit, &mut health, 100);
        assert_eq!(unit.stats.speed, fixed(60));
    }

    #[test]
    fn test_permanent_never_expires() {
        let (mut unit, mut health) = setup();
        grant(
            &mut unit,
            &mut health,
            AbilityGrant::PermanentShield {
                absorb: Fixed::from_num(0.5),
            }
            .into_records(0),
        );
        apply_abilities(&mut unit, &mut health, 50, 50);
        assert!(expire_abilities(&mut unit, &mut health, u64::MAX).is_empty());
        assert_eq!(unit.shield(), Some(Fixed::from_num(0.5)));
        assert_eq!(unit.mitigate(fixed(10)), fixed(5));
    }

    #[test]
    fn test_immunity_toggles_flag() {
        let (mut unit, mut health) = setup();
        grant(
            &mut unit,
            &mut health,
            AbilityGrant::Immunity { duration_ms: 500 }.into_records(0),
        );
        apply_abilities(&mut unit, &mut health, 50, 50);
        assert!(unit.is_immune());
        expire_abilities(&mut unit, &mut health, 500);
        assert!(!unit.is_immune());
    }

    #[test]
    fn test_recovery_heals_per_second() {
        let (mut unit, mut health) = setup();
        health.apply_damage(fixed(50));
        grant(
            &mut unit,
            &mut health,
            AbilityGrant::Recovery {
                per_second: fixed(20),
                duration_ms: 0,
            }
            .into_records(0),
        );
        let outcome = apply_abilities(&mut unit, &mut health, 500, 500);
        assert_eq!(outcome.healed, fixed(10));
        assert_eq!(health.current, fixed(60));
    }

    #[test]
    fn test_poison_pulses_at_interval() {
        let (mut unit, mut health) = setup();
        grant(
            &mut unit,
            &mut health,
            AbilityGrant::Poison {
                damage: fixed(5),
                interval_ms: 200,
                duration_ms: 1000,
            }
            .into_records(0),
        );

        let mut now = 0;
        let mut total = Fixed::ZERO;
        while now < 1000 {
            now += 50;
            total += apply_abilities(&mut unit, &mut health, now, 50).poison_damage;
            expire_abilities(&mut unit, &mut health, now);
        }
        // Pulses at 200, 400, 600, 800, 1000.
        assert_eq!(total, fixed(25));
        assert_eq!(health.current, fixed(75));
        assert!(!unit.status.contains(StatusFlags::POISONED));
    }

    #[test]
    fn test_boss_stature_round_trip() {
        let (mut unit, mut health) = setup();
        let records = AbilityGrant::BossStature {
            health_factor: fixed(3),
            damage_factor: fixed(2),
            absorb: Fixed::from_num(0.25),
        }
        .into_records(0);
        assert_eq!(records.len(), 3);

        grant(&mut unit, &mut health, records);
        apply_abilities(&mut unit, &mut health, 50, 50);
        assert_eq!(health.max, fixed(300));
        assert_eq!(unit.stats.max_health, fixed(300));
        assert_eq!(unit.stats.damage, fixed(40));
        assert_eq!(unit.shield(), Some(Fixed::from_num(0.25)));
        assert!(unit.abilities.contains(AbilityKind::PermanentShield));
    }

    #[test]
    fn test_timed_shield_leaves_permanent_shield() {
        let (mut unit, mut health) = setup();
        let permanent = AbilityGrant::PermanentShield {
            absorb: Fixed::from_num(0.5),
        };
        grant(&mut unit, &mut health, permanent.into_records(0));
        apply_abilities(&mut unit, &mut health, 50, 50);

        let timed = AbilityGrant::Shield {
            absorb: Fixed::from_num(0.75),
            duration_ms: 100,
        };
        grant(&mut unit, &mut health, timed.into_records(50));
        apply_abilities(&mut unit, &mut health, 100, 50);
        assert_eq!(unit.shield(), Some(Fixed::from_num(0.75)));
        assert_eq!(unit.abilities.len(), 2);

        assert_eq!(
            expire_abilities(&mut unit, &mut health, 150),
            vec![AbilityKind::Shield]
        );
        assert_eq!(unit.shield(), Some(Fixed::from_num(0.5)));
        assert!(unit.status.contains(StatusFlags::SHIELDED));
        assert_eq!(unit.mitigate(fixed(10)), fixed(5));
    }

    #[test]
    fn test_last_shield_expiring_clears_flag() {
        let (mut unit, mut health) = setup();
        let timed = AbilityGrant::Shield {
            absorb: Fixed::from_num(0.5),
            duration_ms: 100,
        };
        grant(&mut unit, &mut health, timed.into_records(0));
        apply_abilities(&mut unit, &mut health, 50, 50);
        assert!(unit.status.contains(StatusFlags::SHIELDED));

        expire_abilities(&mut unit, &mut health, 100);
        assert_eq!(unit.shield(), None);
        assert!(!unit.status.contains(StatusFlags::SHIELDED));
    }

    #[test]
    fn test_check_grant_refuses_unreversible_factors() {
        let (unit, health) = setup();
        let speed = |factor: Fixed| {
            AbilityGrant::SpeedBoost {
                factor,
                duration_ms: 100,
            }
            .into_records(0)
        };

        assert!(check_grant(&unit, &health, &speed(Fixed::from_num(1.3))).is_ok());
        assert!(check_grant(&unit, &health, &speed(MIN_MULTIPLIER)).is_ok());
        for factor in [Fixed::ZERO, fixed(-2), MIN_MULTIPLIER / 2, fixed(100_000_000)] {
            assert!(matches!(
                check_grant(&unit, &health, &speed(factor)),
                Err(GameError::InvalidAbility {
                    kind: AbilityKind::SpeedBoost,
                    ..
                })
            ));
        }

        let boss = AbilityGrant::BossStature {
            health_factor: fixed(3),
            damage_factor: Fixed::ZERO,
            absorb: Fixed::from_num(0.25),
        };
        assert!(matches!(
            check_grant(&unit, &health, &boss.into_records(0)),
            Err(GameError::InvalidAbility {
                kind: AbilityKind::DamageBoost,
                ..
            })
        ));
        // Shields and other non-multipliers are not checked.
        let shield = AbilityGrant::Shield {
            absorb: Fixed::ZERO,
            duration_ms: 0,
        };
        assert!(check_grant(&unit, &health, &shield.into_records(0)).is_ok());
    }

    #[test]
    fn test_check_grant_divides_out_applied_record() {
        let (mut unit, mut health) = setup();
        let boost = |factor: Fixed| {
            AbilityGrant::SpeedBoost {
                factor,
                duration_ms: 0,
            }
            .into_records(0)
        };
        grant(&mut unit, &mut health, boost(fixed(1000)));
        apply_abilities(&mut unit, &mut health, 50, 50);
        assert_eq!(unit.stats.speed, fixed(60_000));

        // 60 x 30_000_000 fits; 60_000 x 30_000_000 would not.
        assert!(check_grant(&unit, &health, &boost(fixed(30_000_000))).is_ok());
    }

    #[test]
    fn test_unappliable_record_is_dropped() {
        let (mut unit, mut health) = setup();
        let huge = AbilityGrant::DamageBoost {
            factor: fixed(1_000_000_000),
            duration_ms: 0,
        };
        grant(&mut unit, &mut health, huge.into_records(0));
        apply_abilities(&mut unit, &mut health, 50, 50);
        assert_eq!(unit.stats.damage, fixed(20));
        assert!(unit.abilities.is_empty());

        let zero = AbilityGrant::BossStature {
            health_factor: Fixed::ZERO,
            damage_factor: fixed(2),
            absorb: Fixed::from_num(0.5),
        };
        grant(&mut unit, &mut health, zero.into_records(100));
        apply_abilities(&mut unit, &mut health, 150, 50);
        assert_eq!(health.max, fixed(100));
        assert!(!unit.abilities.contains(AbilityKind::MaxHealthBoost));
        assert_eq!(unit.stats.damage, fixed(40));
    }

    #[test]
    fn test_non_dyadic_factor_round_trip() {
        let (mut unit, mut health) = setup();
        let tolerance = Fixed::from_num(0.000_001);
        for factor in [Fixed::from_num(1.3), Fixed::from_num(0.1), fixed(12_345)] {
            let records = AbilityGrant::SpeedBoost {
                factor,
                duration_ms: 100,
            }
            .into_records(0);
            check_grant(&unit, &health, &records).unwrap();
            grant(&mut unit, &mut health, records);
            apply_abilities(&mut unit, &mut health, 50, 50);
            expire_abilities(&mut unit, &mut health, 100);
            assert!((unit.stats.speed - fixed(60)).abs() <= tolerance);
        }
    }

    #[test]
    fn test_unknown_kind_deserializes() {
        let kind: AbilityKind = serde_json::from_str("\"teleport\"").unwrap();
        assert_eq!(kind, AbilityKind::Unknown);
        let kind: AbilityKind = serde_json::from_str("\"speed_boost\"").unwrap();
        assert_eq!(kind, AbilityKind::SpeedBoost);
    }
}
