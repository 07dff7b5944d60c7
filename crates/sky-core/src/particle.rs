use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a primary particle, owned by this workspace.
///
/// Translation to the physics engine's own enumeration happens only at the
/// collaborator boundary (see [`crate::provider::PhysicsProvider`]); nothing
/// inside the event-generation core depends on engine particle codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleKind {
    /// A photon.
    Gamma,
    /// An electron.
    Electron,
    /// A positron.
    Positron,
    /// A proton.
    Proton,
    /// A neutron.
    Neutron,
    /// An alpha particle.
    Alpha,
    /// A non-interacting test particle.
    Geantino,
    /// A specific nucleus, possibly in an excited state.
    Nucleus {
        /// Proton number.
        z: u32,
        /// Mass number.
        a: u32,
        /// Excitation energy in keV (0 for ground state).
        excitation_kev: u32,
    },
}

impl ParticleKind {
    /// True for nuclei, which can carry a half-life.
    pub const fn is_nucleus(self) -> bool {
        matches!(self, Self::Nucleus { .. })
    }

    /// Parse the common particle names used in event-list files.
    ///
    /// Nuclei cannot be named this way; they always go through a
    /// [`ParticleSpec`] and the physics collaborator.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "gamma" | "photon" => Some(Self::Gamma),
            "e-" | "electron" => Some(Self::Electron),
            "e+" | "positron" => Some(Self::Positron),
            "proton" => Some(Self::Proton),
            "neutron" => Some(Self::Neutron),
            "alpha" => Some(Self::Alpha),
            "geantino" => Some(Self::Geantino),
            _ => None,
        }
    }
}

impl fmt::Display for ParticleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gamma => write!(f, "gamma"),
            Self::Electron => write!(f, "e-"),
            Self::Positron => write!(f, "e+"),
            Self::Proton => write!(f, "proton"),
            Self::Neutron => write!(f, "neutron"),
            Self::Alpha => write!(f, "alpha"),
            Self::Geantino => write!(f, "geantino"),
            Self::Nucleus {
                z,
                a,
                excitation_kev,
            } => write!(f, "nucleus[Z={z},A={a},E*={excitation_kev}keV]"),
        }
    }
}

/// How a source's particle is specified in configuration.
///
/// Resolution against the physics collaborator is deferred until run
/// initialization, when the collaborator is guaranteed to be ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleSpec {
    /// A particle named as in the configuration file ("gamma", "e-", ...).
    Named(String),
    /// A nucleus given by proton number, mass number, and excitation (keV).
    Nucleus {
        /// Proton number.
        z: u32,
        /// Mass number.
        a: u32,
        /// Excitation energy in keV.
        excitation_kev: u32,
    },
}

impl ParticleSpec {
    /// Shorthand for the most common case.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl fmt::Display for ParticleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::Nucleus {
                z,
                a,
                excitation_kev,
            } => write!(f, "nucleus[Z={z},A={a},E*={excitation_kev}keV]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nucleus_is_nucleus() {
        let k = ParticleKind::Nucleus {
            z: 13,
            a: 26,
            excitation_kev: 0,
        };
        assert!(k.is_nucleus());
        assert!(!ParticleKind::Gamma.is_nucleus());
    }

    #[test]
    fn display_forms() {
        assert_eq!(ParticleKind::Gamma.to_string(), "gamma");
        assert_eq!(ParticleKind::Positron.to_string(), "e+");
        let k = ParticleKind::Nucleus {
            z: 27,
            a: 57,
            excitation_kev: 14,
        };
        assert_eq!(k.to_string(), "nucleus[Z=27,A=57,E*=14keV]");
    }

    #[test]
    fn spec_roundtrips_through_serde() {
        let spec = ParticleSpec::Nucleus {
            z: 13,
            a: 26,
            excitation_kev: 0,
        };
        let json = serde_json::to_string(&spec).unwrap();
        let back: ParticleSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, back);
    }
}
