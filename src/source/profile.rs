//! Shape functions shared by the synthetic generation, load, and price profiles.
//!
//! Every function takes a position within the day in `[0, 1)`.

use rand::{Rng, rngs::StdRng};

/// Phase of the load sinusoid; puts the daily peak near 19:00.
pub const LOAD_PHASE_RAD: f64 = 2.88;

/// Utility function to generate Gaussian noise using Box-Muller transform.
///
/// # Arguments
///
/// * `rng` - Random number generator
/// * `std_dev` - Standard deviation of the noise
///
/// # Returns
///
/// Random value from a Gaussian distribution with mean 0 and specified standard deviation
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

/// Position of timestep `t` within its day, in `[0, 1)`.
pub fn day_position(t: usize, steps_per_day: usize) -> f64 {
    let spd = steps_per_day.max(1);
    (t % spd) as f64 / spd as f64
}

/// Half-sine daylight fraction: 0 outside `[sunrise, sunset)`, 1 at solar noon.
pub fn daylight_frac(day_pos: f64, sunrise: f64, sunset: f64) -> f64 {
    if day_pos < sunrise || day_pos >= sunset || sunset <= sunrise {
        return 0.0;
    }
    let x = (day_pos - sunrise) / (sunset - sunrise);
    (std::f64::consts::PI * x).sin().max(0.0)
}

/// Sinusoidal daily load around `base_kw`, never negative.
pub fn load_shape_kw(day_pos: f64, base_kw: f64, amp_kw: f64) -> f64 {
    let angle = 2.0 * std::f64::consts::PI * day_pos + LOAD_PHASE_RAD;
    (base_kw + amp_kw * angle.sin()).max(0.0)
}

/// Two-level time-of-use tariff: `peak` inside `[peak_start, peak_end)`.
pub fn tou_price(day_pos: f64, offpeak: f64, peak: f64, peak_start: f64, peak_end: f64) -> f64 {
    if (peak_start..peak_end).contains(&day_pos) {
        peak
    } else {
        offpeak
    }
}
