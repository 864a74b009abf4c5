//! Physical parameters of the propagation medium and the room walls.
//!
//! The walls are modelled as a locally reacting surface whose only property is
//! its characteristic impedance `Z = ρ_wall · v_wall`. Relative to the medium
//! impedance `ρ · c` this gives the pressure reflection coefficient
//!
//! ```text
//! ξ = Z / (ρ · c)        R = (ξ - 1) / (ξ + 1)
//! ```
//!
//! `R = 1` is a rigid wall, `R = 0` an impedance-matched (anechoic) one.

use crate::error::ConfigurationError;

/// Physical constants for the acoustic model.
pub mod constants {
    /// Speed of sound at 0°C in dry air (m/s)
    pub const SPEED_OF_SOUND_0C: f64 = 331.3;

    /// Speed of sound in room air used by the reverb defaults (m/s)
    pub const SPEED_OF_SOUND_AIR: f64 = 346.0;

    /// Air density matching [`SPEED_OF_SOUND_AIR`] (kg/m³)
    pub const AIR_DENSITY: f64 = 1.168;

    /// Standard atmospheric pressure (Pa)
    pub const STANDARD_PRESSURE: f64 = 101325.0;

    /// Molar mass of dry air (kg/mol)
    pub const MOLAR_MASS_AIR: f64 = 0.02897;

    /// Universal gas constant (J/(mol·K))
    pub const GAS_CONSTANT: f64 = 8.314;

    /// Courant number `c·T/h` of the scheme. Its square is the interior
    /// coefficient `Dg1 = 1/4`.
    pub const COURANT_NUMBER: f64 = 0.5;
}

/// Speed of sound in dry air at the given temperature (Laplace's formula).
pub fn speed_of_sound_in_air(temperature_c: f64) -> f64 {
    let temp_k = temperature_c + 273.15;
    constants::SPEED_OF_SOUND_0C * (temp_k / 273.15).sqrt()
}

/// Density of dry air at standard pressure: ρ = P·M / (R·T).
pub fn air_density(temperature_c: f64) -> f64 {
    let temp_k = temperature_c + 273.15;
    constants::STANDARD_PRESSURE * constants::MOLAR_MASS_AIR / (constants::GAS_CONSTANT * temp_k)
}

/// Speed of sound and density of a material.
///
/// Used both for the medium filling the room and for the wall material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediumProperties {
    /// Speed of sound (m/s)
    pub speed_of_sound: f64,
    /// Density (kg/m³)
    pub density: f64,
}

impl Default for MediumProperties {
    fn default() -> Self {
        Self::room_air()
    }
}

impl MediumProperties {
    /// Room air with the reverb's reference constants (346 m/s, 1.168 kg/m³).
    pub fn room_air() -> Self {
        Self::custom(constants::SPEED_OF_SOUND_AIR, constants::AIR_DENSITY)
    }

    /// Dry air at the given temperature.
    pub fn air(temperature_c: f64) -> Self {
        Self::custom(speed_of_sound_in_air(temperature_c), air_density(temperature_c))
    }

    /// Fresh water (simplified Bilaniuk-Wong speed, linearised density).
    pub fn water(temperature_c: f64) -> Self {
        let t = temperature_c;
        let speed = 1402.7 + 5.0 * t - 0.055 * t * t + 0.00022 * t * t * t;
        let density = 998.0 - 0.05 * (t - 20.0);
        Self::custom(speed, density)
    }

    /// Poured concrete.
    pub fn concrete() -> Self {
        Self::custom(3200.0, 2400.0)
    }

    /// Fired clay brick (approximate).
    pub fn brick() -> Self {
        Self::custom(3600.0, 1800.0)
    }

    /// Softwood panelling (approximate).
    pub fn wood() -> Self {
        Self::custom(3300.0, 500.0)
    }

    /// Window glass (approximate).
    pub fn glass() -> Self {
        Self::custom(5200.0, 2500.0)
    }

    /// Material with user-defined properties.
    pub fn custom(speed_of_sound: f64, density: f64) -> Self {
        Self {
            speed_of_sound,
            density,
        }
    }

    /// Characteristic impedance ρ·c (Pa·s/m).
    pub fn impedance(&self) -> f64 {
        self.density * self.speed_of_sound
    }
}

/// Impedance ratio ξ of a wall against the medium.
pub fn impedance_ratio(medium: &MediumProperties, wall: &MediumProperties) -> f64 {
    wall.impedance() / medium.impedance()
}

/// Pressure reflection coefficient of a wall against the medium.
pub fn reflection_coefficient(medium: &MediumProperties, wall: &MediumProperties) -> f64 {
    let xi = impedance_ratio(medium, wall);
    (xi - 1.0) / (xi + 1.0)
}

/// How the six walls reflect sound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WallModel {
    /// Reflection coefficient given directly.
    Reflection(f64),
    /// Wall material; R follows from its impedance against the medium.
    Material(MediumProperties),
}

impl Default for WallModel {
    fn default() -> Self {
        WallModel::Reflection(0.95)
    }
}

impl WallModel {
    /// Resolve the reflection coefficient for walls facing `medium`.
    ///
    /// R must be finite and lie in `[0, 1]`: negative values come from walls
    /// softer than the medium, values above one are not passive.
    pub fn reflection(&self, medium: &MediumProperties) -> Result<f64, ConfigurationError> {
        let r = match self {
            WallModel::Reflection(r) => *r,
            WallModel::Material(wall) => {
                if wall.impedance() <= 0.0 || medium.impedance() <= 0.0 {
                    return Err(ConfigurationError::degenerate(
                        f64::NAN,
                        "wall and medium need positive speed and density",
                    ));
                }
                reflection_coefficient(medium, wall)
            }
        };

        if !r.is_finite() {
            return Err(ConfigurationError::degenerate(r, "reflection is not finite"));
        }
        if !(0.0..=1.0).contains(&r) {
            return Err(ConfigurationError::degenerate(
                r,
                "reflection must lie in [0, 1] for a passive wall",
            ));
        }
        Ok(r)
    }
}
