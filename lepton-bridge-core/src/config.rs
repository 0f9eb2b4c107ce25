//! Bridge configuration
//!
//! Loaded from a TOML file with three sections, all optional:
//!
//! ```toml
//! [runtime]   # how the foreign runtime is started
//! [engine]    # arguments for the parametrized engine constructor
//! [event]     # the particle and axis used by scripted runs
//! ```
//!
//! Every field has a default. The defaults reproduce the stock launcher:
//! a tau lepton at 1e10 GeV in ice with every process enabled, and a tau
//! neutrino event card through the detector origin pointing straight down.

use crate::foreign::Arg;
use crate::particle::{Doublet, Flavor, ParticleDescriptor, ParticleError};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub runtime: RuntimeConfig,
    pub engine: EngineSettings,
    pub event: EventCard,
}

impl BridgeConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.runtime.validate()?;
        self.engine.primary().validate_primary().map_err(invalid("engine"))?;
        self.event.particle().validate_primary().map_err(invalid("event"))?;
        if let AxisSpec::Direction { direction } = self.event.axis {
            if !direction.is_finite() || direction.length_squared() == 0.0 {
                return Err(ConfigError::Invalid(
                    "event axis direction must be a finite, non-zero vector".into(),
                ));
            }
        }
        if !self.event.position.is_finite() {
            return Err(ConfigError::Invalid("event position must be finite".into()));
        }
        if self.event.geometry_shift.is_some_and(|shift| !shift.is_finite()) {
            return Err(ConfigError::Invalid("event geometry shift must be finite".into()));
        }
        if let Some(cm) = self.event.start_location_cm {
            if !(cm.is_finite() && cm > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "event start location must be a positive distance in cm, got {cm}"
                )));
            }
        }
        Ok(())
    }
}

fn invalid(section: &'static str) -> impl Fn(ParticleError) -> ConfigError {
    move |err| ConfigError::Invalid(format!("[{section}] {err}"))
}

/// Options for starting the foreign runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub class_path: String,
    pub initial_heap_mb: u32,
    pub max_heap_mb: u32,
    pub verbose_jni: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            class_path: "../../../../classes".to_string(),
            initial_heap_mb: 256,
            max_heap_mb: 512,
            verbose_jni: false,
        }
    }
}

impl RuntimeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_heap_mb == 0 || self.max_heap_mb == 0 {
            return Err(ConfigError::Invalid("heap sizes must be positive".into()));
        }
        if self.initial_heap_mb > self.max_heap_mb {
            return Err(ConfigError::Invalid(format!(
                "initial heap ({} MB) exceeds maximum heap ({} MB)",
                self.initial_heap_mb, self.max_heap_mb
            )));
        }
        Ok(())
    }

    /// JVM option strings in launch order.
    pub fn jvm_options(&self) -> Vec<String> {
        let mut options = vec![
            format!("-Djava.class.path={}", self.class_path),
            format!("-Xms{}m", self.initial_heap_mb),
            format!("-Xmx{}m", self.max_heap_mb),
        ];
        if self.verbose_jni {
            options.push("-verbose:jni".to_string());
        }
        options
    }
}

/// Propagation medium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Medium {
    Ice,
    Rock,
}

impl Medium {
    pub fn code(self) -> i32 {
        match self {
            Medium::Ice => 0,
            Medium::Rock => 1,
        }
    }
}

/// Where along the axis the primary starts propagating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StartMode {
    /// At the point the axis enters the Earth
    EarthEntrance,
    /// 880 m before the detector origin
    NearDetector,
    /// At the axis point given by the geometry
    AxisOrigin,
}

impl StartMode {
    pub fn code(self) -> i32 {
        match self {
            StartMode::EarthEntrance => 1,
            StartMode::NearDetector => 2,
            StartMode::AxisOrigin => 3,
        }
    }
}

/// Per-channel interaction and decay switches, in constructor order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessToggles {
    pub charged_current: bool,
    pub neutral_current: bool,
    pub mu_bremsstrahlung: bool,
    pub tau_bremsstrahlung: bool,
    pub mu_knock_on: bool,
    pub tau_knock_on: bool,
    pub mu_to_e_pair: bool,
    pub tau_to_e_pair: bool,
    pub mu_to_mu_pair: bool,
    pub tau_to_mu_pair: bool,
    pub mu_to_tau_pair: bool,
    pub tau_to_tau_pair: bool,
    pub mu_photonuclear: bool,
    pub tau_photonuclear: bool,
    pub mu_decay: bool,
    pub tau_decay: bool,
}

impl Default for ProcessToggles {
    fn default() -> Self {
        Self::from_array([true; 16])
    }
}

impl ProcessToggles {
    pub const COUNT: usize = 16;

    pub fn from_array(t: [bool; Self::COUNT]) -> Self {
        Self {
            charged_current: t[0],
            neutral_current: t[1],
            mu_bremsstrahlung: t[2],
            tau_bremsstrahlung: t[3],
            mu_knock_on: t[4],
            tau_knock_on: t[5],
            mu_to_e_pair: t[6],
            tau_to_e_pair: t[7],
            mu_to_mu_pair: t[8],
            tau_to_mu_pair: t[9],
            mu_to_tau_pair: t[10],
            tau_to_tau_pair: t[11],
            mu_photonuclear: t[12],
            tau_photonuclear: t[13],
            mu_decay: t[14],
            tau_decay: t[15],
        }
    }

    pub fn to_array(self) -> [bool; Self::COUNT] {
        [
            self.charged_current,
            self.neutral_current,
            self.mu_bremsstrahlung,
            self.tau_bremsstrahlung,
            self.mu_knock_on,
            self.tau_knock_on,
            self.mu_to_e_pair,
            self.tau_to_e_pair,
            self.mu_to_mu_pair,
            self.tau_to_mu_pair,
            self.mu_to_tau_pair,
            self.tau_to_tau_pair,
            self.mu_photonuclear,
            self.tau_photonuclear,
            self.mu_decay,
            self.tau_decay,
        ]
    }
}

/// Arguments of the parametrized engine constructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    pub flavor: Flavor,
    pub doublet: Doublet,
    /// [GeV]
    pub energy: f64,
    pub medium: Medium,
    pub processes: ProcessToggles,
    pub start_mode: StartMode,
    pub seed: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            flavor: Flavor::Tau,
            doublet: Doublet::Charged,
            energy: 1e10,
            medium: Medium::Ice,
            processes: ProcessToggles::default(),
            start_mode: StartMode::EarthEntrance,
            seed: 1337,
        }
    }
}

impl EngineSettings {
    pub fn primary(&self) -> ParticleDescriptor {
        ParticleDescriptor {
            flavor: self.flavor,
            doublet: self.doublet,
            energy: self.energy,
        }
    }

    /// Constructor arguments: flavor, doublet, energy, medium, the process
    /// toggles as 0/1, start mode, seed.
    pub fn constructor_args(&self) -> Vec<Arg> {
        let mut args = Vec::with_capacity(4 + ProcessToggles::COUNT + 2);
        args.push(Arg::Int(self.flavor.code()));
        args.push(Arg::Int(self.doublet.code()));
        args.push(Arg::Double(self.energy));
        args.push(Arg::Int(self.medium.code()));
        args.extend(
            self.processes
                .to_array()
                .into_iter()
                .map(|on| Arg::Int(i32::from(on))),
        );
        args.push(Arg::Int(self.start_mode.code()));
        args.push(Arg::Long(self.seed));
        args
    }
}

/// Propagation axis of an event: an explicit direction or detector-frame angles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisSpec {
    Direction { direction: DVec3 },
    Angles { nadir_deg: f64, azimuth_deg: f64 },
}

impl Default for AxisSpec {
    fn default() -> Self {
        AxisSpec::Angles {
            nadir_deg: 0.0,
            azimuth_deg: 0.0,
        }
    }
}

/// The particle and axis for one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventCard {
    pub flavor: Flavor,
    pub doublet: Doublet,
    /// [GeV]
    pub energy: f64,
    /// Detector frame [cm]
    pub position: DVec3,
    pub axis: AxisSpec,
    /// Detector-frame point a near-detector start is measured from [cm]
    pub geometry_shift: Option<DVec3>,
    /// Start location along the axis, from the Earth entrance [cm]
    pub start_location_cm: Option<f64>,
}

impl Default for EventCard {
    fn default() -> Self {
        Self {
            flavor: Flavor::Tau,
            doublet: Doublet::Neutrino,
            energy: 1e10,
            position: DVec3::ZERO,
            axis: AxisSpec::default(),
            geometry_shift: None,
            start_location_cm: None,
        }
    }
}

impl EventCard {
    pub fn particle(&self) -> ParticleDescriptor {
        ParticleDescriptor {
            flavor: self.flavor,
            doublet: self.doublet,
            energy: self.energy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_launcher() {
        let config = BridgeConfig::default();
        assert_eq!(
            config.runtime.jvm_options(),
            vec!["-Djava.class.path=../../../../classes", "-Xms256m", "-Xmx512m"]
        );

        let args = config.engine.constructor_args();
        assert_eq!(args.len(), 22);
        assert_eq!(args[0], Arg::Int(2));
        assert_eq!(args[1], Arg::Int(1));
        assert_eq!(args[2], Arg::Double(1e10));
        assert_eq!(args[3], Arg::Int(0));
        assert!(args[4..20].iter().all(|a| *a == Arg::Int(1)));
        assert_eq!(args[20], Arg::Int(1));
        assert_eq!(args[21], Arg::Long(1337));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn verbose_jni_appends_flag() {
        let runtime = RuntimeConfig {
            verbose_jni: true,
            ..RuntimeConfig::default()
        };
        assert_eq!(runtime.jvm_options().last().unwrap(), "-verbose:jni");
    }

    #[test]
    fn toggles_keep_constructor_order() {
        let mut bits = [false; 16];
        bits[14] = true;
        let toggles = ProcessToggles::from_array(bits);
        assert!(toggles.mu_decay);
        assert!(!toggles.tau_decay);
        assert_eq!(toggles.to_array(), bits);
    }
}
