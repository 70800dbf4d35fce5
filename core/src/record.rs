//! Typed view of the SD tags that QM post-processing attaches to every conformer.
//!
//! Each calculation file holds the results of one [`LevelOfTheory`]. The tags of a
//! conformer are read into a [`ConformerRecord`], whose fields are `None` whenever
//! the tag is absent, unparsable, or the job was flagged as unfinished.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{Error, Result};

const DEFAULT_PACKAGE: &str = "Psi4";
const UNFINISHED_NOTE: &str = "Note on opt.";
const UNFINISHED_VALUE: &str = "DID NOT FINISH";

/// A (method, basis set) pair, together with the QM package that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelOfTheory {
    pub package: String,
    pub method: String,
    pub basis: String,
}

impl LevelOfTheory {
    pub fn new(
        package: impl Into<String>,
        method: impl Into<String>,
        basis: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            method: method.into(),
            basis: basis.into(),
        }
    }

    pub fn with_package(self, package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..self
        }
    }
}

impl FromStr for LevelOfTheory {
    type Err = Error;

    /// Parses `METHOD/BASIS`, e.g. `MP2/def2-TZVP`.
    fn from_str(s: &str) -> Result<Self> {
        let (method, basis) = s.split_once('/').ok_or_else(|| {
            Error::InvalidInput(format!("level of theory {s:?} is not METHOD/BASIS"))
        })?;
        let (method, basis) = (method.trim(), basis.trim());
        if method.is_empty() || basis.is_empty() {
            return Err(Error::InvalidInput(format!(
                "level of theory {s:?} has an empty method or basis"
            )));
        }

        Ok(Self::new(DEFAULT_PACKAGE, method, basis))
    }
}

impl fmt::Display for LevelOfTheory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.method, self.basis)
    }
}

/// The fixed set of numeric annotations a conformer can carry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagKind {
    FinalOptEnergy,
    InitialOptEnergy,
    SinglePointEnergy,
    MmEnergy,
    OriginalIndex,
    OptRuntime,
    SinglePointRuntime,
    OptSteps,
}

impl TagKind {
    pub const ALL: [TagKind; 8] = [
        TagKind::FinalOptEnergy,
        TagKind::InitialOptEnergy,
        TagKind::SinglePointEnergy,
        TagKind::MmEnergy,
        TagKind::OriginalIndex,
        TagKind::OptRuntime,
        TagKind::SinglePointRuntime,
        TagKind::OptSteps,
    ];

    /// The SD tag name this field is stored under for the given level of theory.
    pub fn label(self, theory: &LevelOfTheory) -> String {
        let LevelOfTheory {
            package,
            method,
            basis,
        } = theory;

        match self {
            TagKind::FinalOptEnergy => {
                format!("QM {package} Final Opt. Energy (Har) {method}/{basis}")
            }
            TagKind::InitialOptEnergy => {
                format!("QM {package} Initial Opt. Energy (Har) {method}/{basis}")
            }
            TagKind::SinglePointEnergy => {
                format!("QM {package} Single Pt. Energy (Har) {method}/{basis}")
            }
            TagKind::MmEnergy => "MM Szybki Newton Energy".to_owned(),
            TagKind::OriginalIndex => "Original omega conformer number".to_owned(),
            TagKind::OptRuntime => format!("QM {package} Opt. Runtime (sec) {method}/{basis}"),
            TagKind::SinglePointRuntime => {
                format!("QM {package} Single Pt. Runtime (sec) {method}/{basis}")
            }
            TagKind::OptSteps => format!("QM {package} Opt. Steps {method}/{basis}"),
        }
    }

    /// Whether an unfinished optimization invalidates this field.
    fn depends_on_job(self) -> bool {
        !matches!(self, TagKind::MmEnergy | TagKind::OriginalIndex)
    }
}

/// A named string annotation attached to a conformer record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdTag {
    pub name: String,
    pub value: String,
}

impl SdTag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

pub type SdTags = SmallVec<[SdTag; 8]>;

/// The numeric results of one conformer at one level of theory.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConformerRecord {
    /// final optimized energy, in Hartree
    pub final_energy: Option<f64>,
    /// energy of the starting geometry, in Hartree
    pub initial_energy: Option<f64>,
    pub single_point_energy: Option<f64>,
    pub mm_energy: Option<f64>,
    /// wall-clock time of the optimization, in seconds
    pub runtime: Option<f64>,
    pub single_point_runtime: Option<f64>,
    pub steps: Option<u32>,
    /// 0-based index of the conformer in the geometry-generation step
    pub original_index: Option<usize>,
}

impl ConformerRecord {
    /// Build a record from the tags of one conformer.
    pub fn from_tags(tags: &[SdTag], theory: &LevelOfTheory) -> Self {
        let unfinished = tags.iter().any(|tag| {
            tag.name.contains(UNFINISHED_NOTE) && tag.value.contains(UNFINISHED_VALUE)
        });

        let mut record = Self::default();
        for kind in TagKind::ALL {
            if unfinished && kind.depends_on_job() {
                continue;
            }
            let Some(value) = find_tag(tags, &kind.label(theory)) else {
                continue;
            };
            record.set(kind, value);
        }

        record
    }

    /// Write the record back out as tags. A missing final energy is written as
    /// an unfinished-job note.
    pub fn to_tags(&self, theory: &LevelOfTheory) -> SdTags {
        let mut tags = SdTags::new();

        if self.final_energy.is_none() {
            tags.push(SdTag::new(
                format!("{UNFINISHED_NOTE} {theory}"),
                format!("JOB {UNFINISHED_VALUE}"),
            ));
        }

        for kind in TagKind::ALL {
            let value = match kind {
                TagKind::OptSteps => self.steps.map(|steps| steps.to_string()),
                TagKind::OriginalIndex => self.original_index.map(|idx| (idx + 1).to_string()),
                _ => self.value(kind).map(|value| value.to_string()),
            };
            if let Some(value) = value {
                tags.push(SdTag::new(kind.label(theory), value));
            }
        }

        tags
    }

    /// Numeric value of a field, if present.
    pub fn value(&self, kind: TagKind) -> Option<f64> {
        match kind {
            TagKind::FinalOptEnergy => self.final_energy,
            TagKind::InitialOptEnergy => self.initial_energy,
            TagKind::SinglePointEnergy => self.single_point_energy,
            TagKind::MmEnergy => self.mm_energy,
            TagKind::OptRuntime => self.runtime,
            TagKind::SinglePointRuntime => self.single_point_runtime,
            TagKind::OptSteps => self.steps.map(f64::from),
            TagKind::OriginalIndex => self.original_index.map(|idx| idx as f64),
        }
    }

    fn set(&mut self, kind: TagKind, raw: &str) {
        match kind {
            TagKind::FinalOptEnergy => self.final_energy = parse_finite(raw),
            TagKind::InitialOptEnergy => self.initial_energy = parse_finite(raw),
            TagKind::SinglePointEnergy => self.single_point_energy = parse_finite(raw),
            TagKind::MmEnergy => self.mm_energy = parse_finite(raw),
            TagKind::OptRuntime => self.runtime = parse_finite(raw),
            TagKind::SinglePointRuntime => self.single_point_runtime = parse_finite(raw),
            TagKind::OptSteps => self.steps = raw.trim().parse().ok(),
            // appended on re-optimization as "3, 7"; the first entry is the original
            TagKind::OriginalIndex => {
                self.original_index = raw
                    .split(',')
                    .next()
                    .and_then(|first| first.trim().parse::<usize>().ok())
                    .and_then(|one_based| one_based.checked_sub(1))
            }
        }
    }
}

fn find_tag<'a>(tags: &'a [SdTag], label: &str) -> Option<&'a str> {
    let label = label.to_lowercase();
    tags.iter()
        .find(|tag| tag.name.to_lowercase().contains(&label))
        .map(|tag| tag.value.as_str())
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}
