use featmat_core::default_thread_count;
use featmat_hog::{HogExtractor, HogParams};
use featmat_lbp::{LbpExtractor, LbpParams};
use featmat_orb::{OrbExtractor, OrbParams};
use featmat_sift::{SiftExtractor, SiftParams};

use crate::DatasetError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Complete settings for one extraction run: the common image size every
/// input is resized to, the thread count, and per-method parameters.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExtractionConfig {
    pub image_width: usize,
    pub image_height: usize,
    pub n_threads: usize,
    pub hog: HogParams,
    pub lbp: LbpParams,
    pub sift: SiftParams,
    pub orb: OrbParams,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            image_width: 128,
            image_height: 128,
            n_threads: default_thread_count(),
            hog: HogParams::default(),
            lbp: LbpParams::default(),
            sift: SiftParams::default(),
            orb: OrbParams::default(),
        }
    }
}

impl ExtractionConfig {
    /// Validate all parameters by constructing each extractor against the
    /// configured image size, so bad values surface before the walk starts
    /// rather than on the first image.
    pub fn validate(&self) -> Result<(), DatasetError> {
        HogExtractor::new(self.hog.clone(), self.image_width, self.image_height)?;
        LbpExtractor::new(self.lbp.clone())?;
        SiftExtractor::new(self.sift.clone())?;
        OrbExtractor::new(self.orb.clone(), self.image_width, self.image_height)?;
        Ok(())
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "ExtractionConfig: {}x{}, threads={}, hog[orient={}, cell={}, block={}], lbp[radius={}], sift[octaves={}, scales={}], orb[threshold={}, patch={}]",
            self.image_width, self.image_height, self.n_threads,
            self.hog.orientations, self.hog.cell_side, self.hog.block_side,
            self.lbp.radius,
            self.sift.octaves, self.sift.scales_per_octave,
            self.orb.threshold, self.orb.patch_size
        )
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to JSON string
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML string
    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserialize from TOML string
    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}
