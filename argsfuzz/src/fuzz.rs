//! `argsfuzz generate`: load, pre-check plugins, generate, write.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::core::model::Model;
use crate::core::registry::GeneratorRegistry;
use crate::core::rng::{entropy_seed, seeded};
use crate::core::sample::SampleBuilder;
use crate::core::values::ValueSynthesizer;
use crate::document::ValueSpec;
use crate::error::FuzzError;
use crate::io::corpus::{CorpusWriter, OutputFormat};
use crate::io::document_store::load_model;
use crate::io::fs::DiskPaths;
use crate::io::settings::FuzzSettings;

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzSummary {
    pub tool_name: String,
    pub seed: u64,
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub output_path: PathBuf,
    pub output_format: OutputFormat,
}

impl FuzzSummary {
    pub fn line(&self) -> String {
        format!(
            "generated {} test cases for {} ({} valid, {} invalid) seed={} {}={}",
            self.total,
            self.tool_name,
            self.valid,
            self.invalid,
            self.seed,
            self.output_format.as_str(),
            self.output_path.display()
        )
    }
}

/// Run the whole pipeline for the document at `config`.
#[instrument(skip_all, fields(config = %config.display()))]
pub fn run_generate(
    config: &Path,
    schema: Option<&Path>,
    settings: &FuzzSettings,
    registry: &GeneratorRegistry,
) -> Result<FuzzSummary> {
    let model = load_model(config, schema)?;
    check_generators(&model, registry)?;
    let sample_settings = settings.sample_settings(&model)?;

    let seed = match settings.seed {
        Some(seed) => seed,
        None => {
            let seed = entropy_seed();
            info!(seed, "no seed configured; drew one from the OS");
            seed
        }
    };
    let mut rng = seeded(seed);

    let paths = DiskPaths;
    let values = ValueSynthesizer::new(registry, &paths, settings.create_dummy_files);
    let builder = SampleBuilder::new(&model, values, sample_settings);

    let mut writer = CorpusWriter::create(&settings.output_path, settings.output_format)
        .context("prepare corpus output")?;
    info!(
        target = settings.num_generations,
        invalid_ratio = settings.invalid_ratio,
        "generating test cases"
    );

    let mut invalid = 0usize;
    for index in 0..settings.num_generations {
        let sample = builder.build(&mut rng)?;
        if sample.invalid {
            invalid += 1;
        }
        let line = sample.line();
        debug!(index, invalid = sample.invalid, tokens = sample.tokens.len(), "sample");
        writer.write(&line)?;
    }
    let total = writer.finish()?;

    let summary = FuzzSummary {
        tool_name: model.tool_name.clone(),
        seed,
        total,
        valid: total - invalid,
        invalid,
        output_path: settings.output_path.clone(),
        output_format: settings.output_format,
    };
    info!(total, valid = summary.valid, invalid, "generation complete");
    Ok(summary)
}

/// Every plugin name the model refers to must be registered.
///
/// Runs before any output is touched so a typo never leaves a partial corpus.
pub fn check_generators(model: &Model, registry: &GeneratorRegistry) -> Result<(), FuzzError> {
    for (_, scope) in model.scopes() {
        for arg in scope.arguments() {
            let override_name = arg.generator.as_ref().map(|g| g.name.as_str());
            let custom_name = custom_generator(&arg.value);
            for name in override_name.into_iter().chain(custom_name) {
                ensure_registered(registry, name, &arg.name)?;
            }
        }
        for pos in scope.positionals() {
            if let Some(name) = custom_generator(&pos.value) {
                ensure_registered(registry, name, &pos.name)?;
            }
        }
    }
    Ok(())
}

fn custom_generator(value: &ValueSpec) -> Option<&str> {
    match value {
        ValueSpec::Custom { generator, .. } => Some(generator.as_str()),
        _ => None,
    }
}

fn ensure_registered(registry: &GeneratorRegistry, name: &str, argument: &str) -> Result<(), FuzzError> {
    if registry.contains(name) {
        return Ok(());
    }
    Err(FuzzError::PluginNotFound {
        generator: name.to_string(),
        argument: argument.to_string(),
        available: registry.names(),
    })
}
