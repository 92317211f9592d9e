use std::collections::HashSet;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::core::state::ParticleData;
use crate::error::{Result, UpdaterError};

/// How a group picks its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GroupSelector {
    /// Every particle in the system.
    All,
    /// An explicit list of tags.
    Tags(Vec<usize>),
    /// Tags in `start..=end`.
    TagRange { start: usize, end: usize },
    /// Particles whose position lies inside the axis-aligned box `lo..=hi`.
    /// Re-evaluated every time the group is resolved.
    Region { lo: [f64; 3], hi: [f64; 3] },
}

/// A named subset of particles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GroupDef", into = "GroupDef")]
pub struct ParticleGroup {
    name: String,
    selector: GroupSelector,
}

#[derive(Serialize, Deserialize)]
struct GroupDef {
    name: String,
    selector: GroupSelector,
}

impl TryFrom<GroupDef> for ParticleGroup {
    type Error = UpdaterError;

    fn try_from(def: GroupDef) -> Result<Self> {
        Self::new(def.name, def.selector)
    }
}

impl From<ParticleGroup> for GroupDef {
    fn from(group: ParticleGroup) -> Self {
        Self {
            name: group.name,
            selector: group.selector,
        }
    }
}

impl ParticleGroup {
    pub fn new(name: impl Into<String>, selector: GroupSelector) -> Result<Self> {
        let name = name.into();
        match &selector {
            GroupSelector::Tags(tags) => {
                let mut seen = HashSet::with_capacity(tags.len());
                if let Some(dup) = tags.iter().find(|t| !seen.insert(**t)) {
                    return Err(UpdaterError::Configuration(format!(
                        "group '{name}' lists tag {dup} more than once"
                    )));
                }
            }
            GroupSelector::TagRange { start, end } if start > end => {
                return Err(UpdaterError::Configuration(format!(
                    "group '{name}' has an empty tag range {start}..={end}"
                )));
            }
            GroupSelector::Region { lo, hi } if (0..3).any(|k| lo[k] > hi[k]) => {
                return Err(UpdaterError::Configuration(format!(
                    "group '{name}' region has lo {lo:?} above hi {hi:?}"
                )));
            }
            _ => {}
        }
        Ok(Self { name, selector })
    }

    /// The group of every particle.
    pub fn all() -> Self {
        Self {
            name: "all".to_string(),
            selector: GroupSelector::All,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selector(&self) -> &GroupSelector {
        &self.selector
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.selector, GroupSelector::Region { .. })
    }

    /// Member tags against the current state, in ascending order for the
    /// range and region selectors and in listed order for `Tags`.
    ///
    /// Fails with `InvalidState` when a static selector names a particle that
    /// does not exist.
    pub fn resolve(&self, pdata: &ParticleData) -> Result<Vec<usize>> {
        let n = pdata.len();
        match &self.selector {
            GroupSelector::All => Ok((0..n).collect()),
            GroupSelector::Tags(tags) => {
                if let Some(bad) = tags.iter().find(|&&t| t >= n) {
                    return Err(UpdaterError::InvalidState(format!(
                        "group '{}' references tag {bad} but only {n} particles exist",
                        self.name
                    )));
                }
                Ok(tags.clone())
            }
            GroupSelector::TagRange { start, end } => {
                if *end >= n {
                    return Err(UpdaterError::InvalidState(format!(
                        "group '{}' range ends at {end} but only {n} particles exist",
                        self.name
                    )));
                }
                Ok((*start..=*end).collect())
            }
            GroupSelector::Region { lo, hi } => {
                let lo = DVec3::from_array(*lo);
                let hi = DVec3::from_array(*hi);
                Ok(pdata
                    .pos
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.cmpge(lo).all() && p.cmple(hi).all())
                    .map(|(i, _)| i)
                    .collect())
            }
        }
    }
}
