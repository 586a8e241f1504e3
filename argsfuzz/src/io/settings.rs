//! Run settings: optional TOML file, then command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::model::Model;
use crate::core::sample::SampleSettings;
use crate::io::corpus::OutputFormat;

/// Generation settings (TOML).
///
/// Missing fields take their defaults; command-line flags override fields
/// individually after the file is read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FuzzSettings {
    /// Number of samples to emit.
    pub num_generations: usize,

    /// Fraction of samples that get a mutation.
    pub invalid_ratio: f64,

    pub output_format: OutputFormat,

    /// File (appended lines) or directory (`test_NNNNNN.txt` files).
    pub output_path: PathBuf,

    /// Seed for the run's random stream; drawn from the OS when absent.
    pub seed: Option<u64>,

    pub min_args: usize,

    /// Falls back to the document's `generation.max_args`.
    pub max_args: Option<usize>,

    /// Touch dummy files and create dummy directories on disk.
    pub create_dummy_files: bool,
}

impl Default for FuzzSettings {
    fn default() -> Self {
        Self {
            num_generations: 100,
            invalid_ratio: 0.0,
            output_format: OutputFormat::File,
            output_path: PathBuf::from("corpus.txt"),
            seed: None,
            min_args: 1,
            max_args: None,
            create_dummy_files: false,
        }
    }
}

/// Command-line values that replace settings fields when present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    pub num_generations: Option<usize>,
    pub invalid_ratio: Option<f64>,
    pub output_format: Option<OutputFormat>,
    pub output_path: Option<PathBuf>,
    pub seed: Option<u64>,
    pub min_args: Option<usize>,
    pub max_args: Option<usize>,
    pub create_dummy_files: bool,
}

impl FuzzSettings {
    pub fn apply(&mut self, overrides: &SettingsOverrides) {
        if let Some(value) = overrides.num_generations {
            self.num_generations = value;
        }
        if let Some(value) = overrides.invalid_ratio {
            self.invalid_ratio = value;
        }
        if let Some(value) = overrides.output_format {
            self.output_format = value;
        }
        if let Some(value) = &overrides.output_path {
            self.output_path = value.clone();
        }
        if overrides.seed.is_some() {
            self.seed = overrides.seed;
        }
        if let Some(value) = overrides.min_args {
            self.min_args = value;
        }
        if overrides.max_args.is_some() {
            self.max_args = overrides.max_args;
        }
        if overrides.create_dummy_files {
            self.create_dummy_files = true;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.invalid_ratio) {
            return Err(anyhow!(
                "invalid_ratio must be within [0, 1], got {}",
                self.invalid_ratio
            ));
        }
        if let Some(max_args) = self.max_args {
            if self.min_args > max_args {
                return Err(anyhow!(
                    "min_args {} exceeds max_args {}",
                    self.min_args,
                    max_args
                ));
            }
        }
        Ok(())
    }

    /// Sizing for the sample pipeline, resolving `max_args` against the model.
    pub fn sample_settings(&self, model: &Model) -> Result<SampleSettings> {
        self.validate()?;
        let max_args = self.max_args.unwrap_or(model.max_args);
        if self.min_args > max_args {
            return Err(anyhow!(
                "min_args {} exceeds generation.max_args {}",
                self.min_args,
                max_args
            ));
        }
        Ok(SampleSettings {
            min_args: self.min_args,
            max_args,
            invalid_ratio: self.invalid_ratio,
        })
    }
}

/// Load settings from `path`, or defaults when no file is given.
pub fn load_settings(path: Option<&Path>) -> Result<FuzzSettings> {
    let Some(path) = path else {
        return Ok(FuzzSettings::default());
    };
    let contents =
        fs::read_to_string(path).with_context(|| format!("read settings {}", path.display()))?;
    let settings: FuzzSettings =
        toml::from_str(&contents).with_context(|| format!("parse settings {}", path.display()))?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{document, flag, model};

    #[test]
    fn no_file_returns_default() {
        assert_eq!(load_settings(None).expect("load"), FuzzSettings::default());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("settings.toml");
        fs::write(
            &path,
            "num_generations = 5\nseed = 9\noutput_format = \"directory\"\n",
        )
        .expect("write");
        let settings = load_settings(Some(&path)).expect("load");
        assert_eq!(settings.num_generations, 5);
        assert_eq!(settings.seed, Some(9));
        assert_eq!(settings.output_format, OutputFormat::Directory);
        assert_eq!(settings.min_args, 1);
        assert_eq!(settings.output_path, PathBuf::from("corpus.txt"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_settings(Some(&temp.path().join("nope.toml"))).expect_err("missing");
        assert!(format!("{err:#}").contains("read settings"));
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let mut settings = FuzzSettings {
            seed: Some(1),
            ..FuzzSettings::default()
        };
        settings.apply(&SettingsOverrides {
            num_generations: Some(7),
            create_dummy_files: true,
            ..SettingsOverrides::default()
        });
        assert_eq!(settings.num_generations, 7);
        assert_eq!(settings.seed, Some(1));
        assert!(settings.create_dummy_files);
    }

    #[test]
    fn validate_rejects_bad_ratio_and_bounds() {
        let settings = FuzzSettings {
            invalid_ratio: 1.5,
            ..FuzzSettings::default()
        };
        assert!(settings.validate().is_err());

        let settings = FuzzSettings {
            min_args: 5,
            max_args: Some(2),
            ..FuzzSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn max_args_falls_back_to_document() {
        let mut doc = document(vec![flag("verbose")]);
        doc.generation.max_args = 3;
        let model = model(&doc);
        let resolved = FuzzSettings::default()
            .sample_settings(&model)
            .expect("settings");
        assert_eq!(resolved.max_args, 3);

        let settings = FuzzSettings {
            min_args: 4,
            ..FuzzSettings::default()
        };
        assert!(settings.sample_settings(&model).is_err());
    }
}
