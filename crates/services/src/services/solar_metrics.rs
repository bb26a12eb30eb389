//! Closed-form solar yield, carbon and payback formulas.

use rand::Rng;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Average full-output hours per day used for every yield estimate.
pub const PEAK_SUN_HOURS: f64 = 4.0;
pub const DAYS_PER_MONTH: f64 = 30.0;
pub const DAYS_PER_YEAR: f64 = 365.0;
/// kg CO₂ avoided per kWh fed instead of grid power.
pub const GRID_EMISSION_FACTOR_KG_PER_KWH: f64 = 0.82;
pub const SYSTEM_LIFE_YEARS: u32 = 25;

pub fn expected_daily_energy_kwh(capacity_kw: f64) -> f64 {
    capacity_kw * PEAK_SUN_HOURS
}

/// `capacity * 4 * 30`.
pub fn monthly_energy_target(capacity_kw: f64) -> f64 {
    expected_daily_energy_kwh(capacity_kw) * DAYS_PER_MONTH
}

pub fn carbon_offset_kg(energy_kwh: f64) -> f64 {
    energy_kwh * GRID_EMISSION_FACTOR_KG_PER_KWH
}

/// [`carbon_offset_kg`] to one decimal, as stored on a site.
pub fn stored_carbon_offset_kg(energy_kwh: f64) -> f64 {
    round1(carbon_offset_kg(energy_kwh))
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PaybackInputs {
    pub capex: f64,
    pub capacity_kw: f64,
    pub tariff_per_kwh: f64,
    /// Yearly tariff growth as a fraction, e.g. `0.03`.
    #[serde(default)]
    pub tariff_escalation: f64,
    /// Yearly output loss as a fraction, e.g. `0.005`.
    #[serde(default)]
    pub annual_degradation: f64,
    #[serde(default)]
    pub annual_om_cost: f64,
}

/// Years until cumulative savings cover `capex`, interpolated within the
/// final year. `None` when the investment is not recovered within
/// [`SYSTEM_LIFE_YEARS`].
pub fn payback_period_years(inputs: &PaybackInputs) -> Option<f64> {
    if inputs.capex <= 0.0 {
        return Some(0.0);
    }

    let mut production = expected_daily_energy_kwh(inputs.capacity_kw) * DAYS_PER_YEAR;
    let mut tariff = inputs.tariff_per_kwh;
    let mut recovered = 0.0;

    for year in 0..SYSTEM_LIFE_YEARS {
        let savings = production * tariff - inputs.annual_om_cost;
        if savings > 0.0 && recovered + savings >= inputs.capex {
            let fraction = (inputs.capex - recovered) / savings;
            return Some(f64::from(year) + fraction);
        }
        recovered += savings;
        production *= 1.0 - inputs.annual_degradation;
        tariff *= 1.0 + inputs.tariff_escalation;
    }

    None
}

/// Values stored on a new site before any production is measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteEstimates {
    pub energy_generated: f64,
    pub efficiency: f64,
    pub carbon_offset_kg: f64,
}

impl SiteEstimates {
    /// Efficiency is drawn uniformly from 75–95 %; energy is one month of
    /// expected output at that efficiency.
    pub fn placeholder<R: Rng + ?Sized>(capacity_kw: f64, rng: &mut R) -> Self {
        let efficiency = round1(rng.gen_range(75.0..95.0));
        Self::with_efficiency(capacity_kw, efficiency)
    }

    pub fn with_efficiency(capacity_kw: f64, efficiency: f64) -> Self {
        let energy_generated = round1(monthly_energy_target(capacity_kw) * efficiency / 100.0);
        Self {
            energy_generated,
            efficiency,
            carbon_offset_kg: stored_carbon_offset_kg(energy_generated),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn inputs(capex: f64) -> PaybackInputs {
        PaybackInputs {
            capex,
            capacity_kw: 100.0,
            tariff_per_kwh: 5.0,
            tariff_escalation: 0.0,
            annual_degradation: 0.0,
            annual_om_cost: 0.0,
        }
    }

    #[test]
    fn monthly_target_for_150_kw() {
        assert_eq!(monthly_energy_target(150.0), 18_000.0);
    }

    #[test]
    fn payback_interpolates_final_year() {
        // 100 kW * 4 h * 365 d * 5 = 730 000 per year
        assert_eq!(payback_period_years(&inputs(1_460_000.0)), Some(2.0));
        assert_eq!(payback_period_years(&inputs(365_000.0)), Some(0.5));
        assert_eq!(payback_period_years(&inputs(0.0)), Some(0.0));
    }

    #[test]
    fn payback_beyond_system_life_is_none() {
        assert_eq!(payback_period_years(&inputs(730_000.0 * 30.0)), None);

        let mut losing = inputs(1_000.0);
        losing.annual_om_cost = 1_000_000.0;
        assert_eq!(payback_period_years(&losing), None);
    }

    #[test]
    fn escalation_shortens_payback() {
        let flat = payback_period_years(&inputs(5_000_000.0)).unwrap();
        let mut escalating = inputs(5_000_000.0);
        escalating.tariff_escalation = 0.05;
        assert!(payback_period_years(&escalating).unwrap() < flat);
    }

    #[test]
    fn placeholder_estimates_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let estimates = SiteEstimates::placeholder(150.0, &mut rng);
            assert!((75.0..=95.0).contains(&estimates.efficiency));
            assert!(estimates.energy_generated <= 18_000.0);
            assert!(estimates.energy_generated >= 18_000.0 * 0.75 - 0.1);
        }
    }

    #[test]
    fn estimates_follow_efficiency() {
        let estimates = SiteEstimates::with_efficiency(100.0, 80.0);
        assert_eq!(estimates.energy_generated, 9_600.0);
        assert_eq!(estimates.carbon_offset_kg, 7_872.0);
    }
}
