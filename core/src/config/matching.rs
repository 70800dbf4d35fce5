use std::{fs::File, io::BufReader, path::Path};

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    matching::{CrossFileReconciler, MinimaMatcher, RMSD_THRESHOLD},
    record::TagKind,
    rmsd::SymmetricRmsd,
};

/// Matching settings as read from a JSON file. Every field is optional.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigMatching {
    /// RMSD cutoff in Å
    pub threshold: f64,
    pub automorph: bool,
    pub heavy_only: bool,
    pub overlay: bool,
    pub max_mappings: usize,
    pub energy: TagKind,
    pub time: TagKind,
}

impl Default for ConfigMatching {
    fn default() -> Self {
        let rmsd = SymmetricRmsd::default();
        let reconciler = CrossFileReconciler::default();

        Self {
            threshold: RMSD_THRESHOLD,
            automorph: rmsd.automorph,
            heavy_only: rmsd.heavy_only,
            overlay: rmsd.overlay,
            max_mappings: rmsd.max_mappings,
            energy: reconciler.energy,
            time: reconciler.time,
        }
    }
}

impl ConfigMatching {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }

        let read = || -> Result<Self> {
            let config: Self = serde_json::from_reader(BufReader::new(File::open(path)?))?;
            if !(config.threshold.is_finite() && config.threshold >= 0.0) {
                return Err(Error::InvalidInput(format!(
                    "RMSD threshold must be a non-negative number, got {}",
                    config.threshold
                )));
            }
            Ok(config)
        };
        read().map_err(|e| e.in_file(path))
    }
}

impl From<&ConfigMatching> for CrossFileReconciler {
    fn from(config: &ConfigMatching) -> Self {
        Self {
            matcher: MinimaMatcher {
                threshold: config.threshold,
            },
            energy: config.energy,
            time: config.time,
        }
    }
}

impl From<&ConfigMatching> for SymmetricRmsd {
    fn from(config: &ConfigMatching) -> Self {
        Self {
            automorph: config.automorph,
            heavy_only: config.heavy_only,
            overlay: config.overlay,
            max_mappings: config.max_mappings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unspecified_fields_take_defaults() {
        let config: ConfigMatching =
            serde_json::from_str(r#"{ "threshold": 0.25, "energy": "SinglePointEnergy" }"#)
                .unwrap();

        let reconciler = CrossFileReconciler::from(&config);
        assert_eq!(reconciler.matcher.threshold, 0.25);
        assert_eq!(reconciler.energy, TagKind::SinglePointEnergy);
        assert_eq!(reconciler.time, TagKind::OptRuntime);

        let rmsd = SymmetricRmsd::from(&config);
        assert!(rmsd.automorph && rmsd.overlay && !rmsd.heavy_only);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<ConfigMatching>(r#"{ "treshold": 0.25 }"#).is_err());
    }
}
