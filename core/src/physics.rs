// core/src/physics.rs
// Energibudsjett: endring i mekanisk energi + tap (luft/rulling) = tilført arbeid.
use crate::differentials::differentiate;
use crate::error::Result;
use crate::frame::{finite, map2, Column, Table};
use crate::metrics::METRICS;
use crate::models::PowerModel;
use crate::names::{
    AIR_SPEED, AVG_AIR_SPEED_2, CADENCE, CDA, CRR, DELTA_DISTANCE, DELTA_ELEVATION, DELTA_ENERGY,
    DELTA_SPEED_2, DELTA_TIME, ENERGY, HEADING, LOSS, POWER_ESTIMATE, SPEED,
};

pub const G: f64 = 9.8;                 // gravitasjon (m/s²)
pub const RHO: f64 = 1.225;             // lufttetthet (kg/m³)
pub const KJ_TO_KCAL: f64 = 0.239006;
pub const CALORIC_EFF_DEFAULT: f64 = 0.25; // mekanisk / metabolsk virkningsgrad

/// Energiendring per intervall (J). Positiv = energi vunnet (bakke opp / akselerasjon).
pub fn add_energy_budget(table: &Table, m: f64, g: f64) -> Result<Table> {
    let d_speed_2 = table.require(DELTA_SPEED_2)?;
    let d_elevation = table.require(DELTA_ELEVATION)?;
    let mut out = table.clone();
    out.set(DELTA_ENERGY, map2(d_speed_2, d_elevation, |dv2, dh| m * (dv2 / 2.0 + dh * g)));
    Ok(out)
}

/// Retning for vindleddet: første rad i et segment har ingen posisjonsdifferanse,
/// så den låner retningen fra første bevegelse. Selve `heading`-kolonnen endres ikke.
fn heading_for_wind(table: &Table) -> Result<Column> {
    let mut heading = table.require(HEADING)?.to_vec();
    for rows in table.segments() {
        if rows.len() > 1 && heading[rows.start].is_none() {
            heading[rows.start] = heading[rows.start + 1];
        }
    }
    Ok(heading)
}

/// Fart relativt til lufta, gitt konstant vind. Deriverer `air_speed` på nytt
/// slik at tapsleddene ser luftrelativ kinematikk.
pub fn add_air_speed(table: &Table, wind_speed: f64, wind_heading: f64) -> Result<Table> {
    let speed = table.require(SPEED)?;
    let heading = heading_for_wind(table)?;
    let air_speed = map2(speed, &heading, |v, h| v + wind_speed * (h - wind_heading).to_radians().cos());
    let mut out = table.clone();
    out.set(AIR_SPEED, air_speed);
    differentiate(&out, AIR_SPEED, &[])
}

/// Diagnostikk: CdA hvis *alt* tap skyldes luftmotstand.
pub fn add_cda_estimate(table: &Table, rho: f64) -> Result<Table> {
    let de = table.require(DELTA_ENERGY)?;
    let v2 = table.require(AVG_AIR_SPEED_2)?;
    let dd = table.require(DELTA_DISTANCE)?;
    let denom = map2(v2, dd, |v2, dd| rho * v2 * dd * 0.5);
    let mut out = table.clone();
    out.set(CDA, map2(de, &denom, |de, d| -de / d));
    Ok(out)
}

/// Diagnostikk: Crr hvis *alt* tap skyldes rullemotstand.
pub fn add_crr_estimate(table: &Table) -> Result<Table> {
    let de = table.require(DELTA_ENERGY)?;
    let dd = table.require(DELTA_DISTANCE)?;
    let mut out = table.clone();
    out.set(CRR, map2(de, dd, |de, dd| -de / dd));
    Ok(out)
}

/// Energi brukt på luft- og rullemotstand per intervall.
pub fn add_loss_estimate(table: &Table, cda: f64, crr: f64, rho: f64) -> Result<Table> {
    let v2 = table.require(AVG_AIR_SPEED_2)?;
    let dd = table.require(DELTA_DISTANCE)?;
    let mut out = table.clone();
    out.set(LOSS, map2(v2, dd, |v2, dd| (cda * rho * v2 * 0.5 + crr) * dd));
    Ok(out)
}

/// Effekt = (ΔE + tap) / Δt, klippet til ≥ 0.
///
/// Null ved frihjul (kadens < 1) og der effekten er udefinert.
/// `energy` er kumulativ sum av effekt·Δt, 0 på første rad.
pub fn add_power_estimate(table: &Table) -> Result<Table> {
    let de = table.require(DELTA_ENERGY)?;
    let loss = table.require(LOSS)?;
    let dt = table.require(DELTA_TIME)?;
    let cadence = table.column(CADENCE);

    let work = map2(de, loss, |de, loss| de + loss);
    let power: Column = work
        .iter()
        .zip(dt.iter())
        .enumerate()
        .map(|(i, (w, dt))| {
            let p = match (w, dt) {
                (Some(w), Some(dt)) => finite(w / dt).unwrap_or(0.0).max(0.0),
                _ => 0.0,
            };
            let freewheel = cadence.and_then(|c| c[i]).map_or(false, |c| c < 1.0);
            Some(if freewheel { 0.0 } else { p })
        })
        .collect();

    let mut energy = Vec::with_capacity(power.len());
    let mut acc = 0.0;
    for (i, (p, dt)) in power.iter().zip(dt.iter()).enumerate() {
        if i > 0 {
            if let (Some(p), Some(dt)) = (p, dt) {
                acc += p * dt;
            }
        }
        energy.push(Some(acc));
    }

    let mut out = table.clone();
    out.set(POWER_ESTIMATE, power);
    out.set(ENERGY, energy);
    Ok(out)
}

/// Ren foroverberegning av effekt for et gitt parametersett (ingen tilpasning).
pub fn evaluate(table: &Table, model: &PowerModel) -> Result<Table> {
    METRICS.evaluations_total.inc();
    log::trace!("evaluating {:?}", model);
    let out = add_energy_budget(table, model.m, G)?;
    let out = add_air_speed(&out, model.wind_speed, model.wind_heading)?;
    let out = add_loss_estimate(&out, model.cda, model.crr, RHO)?;
    add_power_estimate(&out)
}

/// Total energi (kJ): trapesintegral av effekt over tid; manglende effekt = 0.
pub fn total_energy_kj(table: &Table) -> Result<f64> {
    let power = table.require(POWER_ESTIMATE)?;
    let t = table.index();
    let mut joules = 0.0;
    for i in 1..t.len() {
        let p0 = power[i - 1].unwrap_or(0.0);
        let p1 = power[i].unwrap_or(0.0);
        joules += 0.5 * (p0 + p1) * (t[i] - t[i - 1]);
    }
    Ok(joules / 1000.0)
}

/// Kalorier (kcal) fra mekanisk energi og virkningsgrad.
#[inline]
pub fn calories_kcal(energy_kj: f64, caloric_eff: f64) -> f64 {
    energy_kj * KJ_TO_KCAL / caloric_eff
}
