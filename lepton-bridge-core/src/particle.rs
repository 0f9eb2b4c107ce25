//! Particle identities as the engine encodes them
//!
//! The engine identifies a particle by a (flavor, doublet) pair of small
//! integers. Flavors 0..=2 are the lepton generations; flavor 3 is the pion,
//! which only ever appears in cascade output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParticleError {
    #[error("unknown flavor code {0}")]
    UnknownFlavor(i32),
    #[error("unknown doublet code {0}")]
    UnknownDoublet(i32),
    #[error("cannot parse particle {what} from `{input}`")]
    Parse { what: &'static str, input: String },
    #[error("{0} cannot be used as a propagating particle")]
    NotPropagating(Flavor),
    #[error("particle energy must be a positive finite number of GeV, got {0}")]
    InvalidEnergy(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    Electron,
    Muon,
    Tau,
    Pion,
}

impl Flavor {
    pub fn code(self) -> i32 {
        match self {
            Flavor::Electron => 0,
            Flavor::Muon => 1,
            Flavor::Tau => 2,
            Flavor::Pion => 3,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, ParticleError> {
        match code {
            0 => Ok(Flavor::Electron),
            1 => Ok(Flavor::Muon),
            2 => Ok(Flavor::Tau),
            3 => Ok(Flavor::Pion),
            other => Err(ParticleError::UnknownFlavor(other)),
        }
    }

    pub fn is_lepton(self) -> bool {
        !matches!(self, Flavor::Pion)
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Flavor::Electron => "Electron",
            Flavor::Muon => "Muon",
            Flavor::Tau => "Tau",
            Flavor::Pion => "Pion",
        };
        f.write_str(s)
    }
}

/// Accepts the numeric code or the name, as typed at the prompt.
impl FromStr for Flavor {
    type Err = ParticleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "e" | "electron" => Ok(Flavor::Electron),
            "1" | "mu" | "muon" => Ok(Flavor::Muon),
            "2" | "tau" => Ok(Flavor::Tau),
            "3" | "pi" | "pion" => Ok(Flavor::Pion),
            _ => Err(ParticleError::Parse {
                what: "flavor",
                input: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Doublet {
    Neutrino,
    Charged,
}

impl Doublet {
    pub fn code(self) -> i32 {
        match self {
            Doublet::Neutrino => 0,
            Doublet::Charged => 1,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, ParticleError> {
        match code {
            0 => Ok(Doublet::Neutrino),
            1 => Ok(Doublet::Charged),
            other => Err(ParticleError::UnknownDoublet(other)),
        }
    }
}

impl FromStr for Doublet {
    type Err = ParticleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "nu" | "neutrino" => Ok(Doublet::Neutrino),
            "1" | "charged" | "lepton" => Ok(Doublet::Charged),
            _ => Err(ParticleError::Parse {
                what: "doublet",
                input: s.to_string(),
            }),
        }
    }
}

/// A particle as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParticleDescriptor {
    pub flavor: Flavor,
    pub doublet: Doublet,
    /// [GeV]
    pub energy: f64,
}

impl ParticleDescriptor {
    /// Check that this particle can be handed to the engine as the primary.
    pub fn validate_primary(&self) -> Result<(), ParticleError> {
        if !self.flavor.is_lepton() {
            return Err(ParticleError::NotPropagating(self.flavor));
        }
        if !(self.energy.is_finite() && self.energy > 0.0) {
            return Err(ParticleError::InvalidEnergy(self.energy));
        }
        Ok(())
    }
}

/// Local rendition of the engine's naming scheme: "Tau Neutrino", "Muon",
/// "Pion+", "Pion0".
pub fn display_name(flavor: Flavor, doublet: Doublet) -> String {
    match (flavor, doublet) {
        (Flavor::Pion, Doublet::Charged) => "Pion+".to_string(),
        (Flavor::Pion, Doublet::Neutrino) => "Pion0".to_string(),
        (lepton, Doublet::Neutrino) => format!("{lepton} Neutrino"),
        (lepton, Doublet::Charged) => lepton.to_string(),
    }
}
