use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::perturb::PerturbOptions;

/// Perturbation settings for box generation, stored as JSON.
///
/// Missing fields take their defaults, so `{}` is a valid configuration:
///
/// ```json
/// {
///   "perturbation": { "noise_type": "gaussian", "noise_percentage": [0.04, 0.02, 0.04] },
///   "n_perturbations": 10
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerturbationConfig {
    pub perturbation: PerturbOptions,
    /// Boxes generated per source box.
    pub n_perturbations: usize,
}

impl Default for PerturbationConfig {
    fn default() -> Self {
        Self {
            perturbation: PerturbOptions::default(),
            n_perturbations: 10,
        }
    }
}

impl PerturbationConfig {
    pub fn validate(&self) -> Result<()> {
        let pct = &self.perturbation.noise_percentage;
        for (what, value) in [
            ("scale", pct.scale()),
            ("rotation", pct.rotation()),
            ("translation", pct.translation()),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidArgument(format!(
                    "{} noise percentage must be a non-negative number, got {}",
                    what, value
                )));
            }
        }
        Ok(())
    }

    /// Read and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    pub fn perturb_options(&self) -> PerturbOptions {
        self.perturbation
    }
}
