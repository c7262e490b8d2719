//! Flat ΛCDM luminosity distances.
//!
//! Radiation (photons + massless neutrinos) is included so distances track the
//! usual WMAP9 reference values closely. The comoving integral is a composite
//! Simpson rule; `1/E(z)` is smooth so a fixed interval count is plenty.

use serde::{Deserialize, Serialize};

/// Speed of light in km/s.
const C_KM_S: f64 = 299_792.458;

/// Simpson intervals for the comoving distance integral (even).
const SIMPSON_INTERVALS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cosmology {
    /// Hubble constant in km/s/Mpc.
    pub h0: f64,
    /// Matter density today.
    pub om0: f64,
    /// CMB temperature today (K).
    pub tcmb0: f64,
    /// Effective number of neutrino species.
    pub neff: f64,
}

impl Default for Cosmology {
    fn default() -> Self {
        Self::wmap9()
    }
}

impl Cosmology {
    /// WMAP 9-year parameters (Hinshaw et al. 2013).
    pub fn wmap9() -> Self {
        Self {
            h0: 69.32,
            om0: 0.2865,
            tcmb0: 2.725,
            neff: 3.04,
        }
    }

    fn radiation_density(&self) -> f64 {
        let h = self.h0 / 100.0;
        let photons = 4.481_500_52e-7 * self.tcmb0.powi(4) / (h * h);
        let neutrinos = 0.227_107_317_66 * self.neff * photons;
        photons + neutrinos
    }

    /// Dimensionless Hubble parameter `E(z) = H(z)/H0`.
    pub fn efunc(&self, z: f64) -> f64 {
        let or0 = self.radiation_density();
        let ode0 = 1.0 - self.om0 - or0;
        let zp1 = 1.0 + z;
        (self.om0 * zp1.powi(3) + or0 * zp1.powi(4) + ode0).sqrt()
    }

    /// Comoving distance in Mpc.
    pub fn comoving_distance_mpc(&self, z: f64) -> f64 {
        if !(z > 0.0) {
            return 0.0;
        }
        let n = SIMPSON_INTERVALS;
        let h = z / n as f64;
        let mut sum = 1.0 / self.efunc(0.0) + 1.0 / self.efunc(z);
        for i in 1..n {
            let coef = if i % 2 == 1 { 4.0 } else { 2.0 };
            sum += coef / self.efunc(h * i as f64);
        }
        (C_KM_S / self.h0) * sum * h / 3.0
    }

    /// Luminosity distance in Mpc; monotonic increasing, 0 at `z = 0`.
    pub fn luminosity_distance_mpc(&self, z: f64) -> f64 {
        (1.0 + z) * self.comoving_distance_mpc(z)
    }
}
