//! One sample end to end: select, size, value, heal, render, mutate, shuffle.

use std::collections::BTreeMap;

use rand::Rng;
use tracing::debug;

use crate::core::assemble::{Role, Token, format_argument, repeat_count, shuffle_flag_groups};
use crate::core::combination::{CombinationGenerator, pad, trim};
use crate::core::model::{ArgId, Argument, Model, Scope, ScopeRef, Selection, ValueMap};
use crate::core::mutator::Mutator;
use crate::core::rng::{chance, pick};
use crate::core::validator::{Conditions, ConstraintValidator};
use crate::core::values::ValueSynthesizer;
use crate::error::FuzzError;

/// Chance that an optional positional is emitted.
pub const POSITIONAL_PROBABILITY: f64 = 0.5;

/// Per-run sizing and validity knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSettings {
    pub min_args: usize,
    pub max_args: usize,
    pub invalid_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub scope: ScopeRef,
    pub invalid: bool,
    pub tokens: Vec<String>,
}

impl Sample {
    /// The corpus line: tokens joined by single spaces.
    pub fn line(&self) -> String {
        self.tokens.join(" ")
    }
}

pub struct SampleBuilder<'a> {
    model: &'a Model,
    values: ValueSynthesizer<'a>,
    settings: SampleSettings,
}

impl<'a> SampleBuilder<'a> {
    pub fn new(model: &'a Model, values: ValueSynthesizer<'a>, settings: SampleSettings) -> Self {
        Self {
            model,
            values,
            settings,
        }
    }

    pub fn build<R: Rng>(&self, rng: &mut R) -> Result<Sample, FuzzError> {
        let invalid = chance(rng, self.settings.invalid_ratio);
        let combination = CombinationGenerator::new(self.model).generate(rng);
        let scope_ref = combination.scope;
        let scope = self.model.scope(scope_ref);

        let target = rng.gen_range(self.settings.min_args..=self.settings.max_args);
        let mut selection = combination.selection;
        if selection.len() > target {
            selection = trim(rng, scope, selection, target);
        } else if selection.len() < target {
            selection = pad(rng, scope, selection, target);
        }

        let mut generated: BTreeMap<ArgId, Option<String>> = BTreeMap::new();
        for &id in &selection {
            let arg = scope.argument(id);
            generated.insert(id, self.value_for(rng, arg)?);
        }
        let known: ValueMap = generated
            .iter()
            .filter_map(|(id, value)| value.clone().map(|v| (*id, v)))
            .collect();
        let selection =
            ConstraintValidator::new(scope).ensure_valid(rng, selection, Conditions::Check(&known));
        generated.retain(|id, _| selection.contains(id));
        debug!(target, selected = selection.len(), invalid, "selection finalized");

        let mut tokens = Vec::new();
        if let Some(sub) = self.model.subcommand(scope_ref) {
            self.push_globals(rng, &mut tokens)?;
            let names: Vec<&String> = std::iter::once(&sub.name).chain(&sub.aliases).collect();
            let name = pick(rng, &names).map_or(&sub.name, |name| *name);
            tokens.push(Token::new(name.as_str(), Role::Subcommand));
        }

        for &id in &selection {
            let arg = scope.argument(id);
            let value = match generated.get(&id) {
                Some(value) => value.clone(),
                // Added by the second validation pass.
                None => self.value_for(rng, arg)?,
            };
            for _ in 0..repeat_count(rng, arg.repeat.as_ref()) {
                tokens.extend(format_argument(
                    rng,
                    arg,
                    value.as_deref(),
                    self.model.equals_form_probability,
                ));
            }
        }
        self.push_positionals(rng, scope, &mut tokens)?;

        let tokens = Mutator::new(self.model).mutate(rng, tokens, scope_ref, invalid);
        let tokens = shuffle_flag_groups(rng, tokens);
        Ok(Sample {
            scope: scope_ref,
            invalid,
            tokens,
        })
    }

    fn value_for<R: Rng>(&self, rng: &mut R, arg: &Argument) -> Result<Option<String>, FuzzError> {
        self.values
            .generate(rng, &arg.value, &arg.name, arg.generator.as_ref())
    }

    /// Root arguments listed as global, emitted ahead of the subcommand.
    ///
    /// The rolled globals are healed against the root rules; members the
    /// repair pulls in that are not global stay out of the line.
    fn push_globals<R: Rng>(&self, rng: &mut R, tokens: &mut Vec<Token>) -> Result<(), FuzzError> {
        let root = &self.model.root;
        let mut rolled = Selection::new();
        for &id in &self.model.global_arguments {
            let arg = root.argument(id);
            if arg.required || chance(rng, arg.probability) {
                rolled.insert(id);
            }
        }
        let healed = ConstraintValidator::new(root).ensure_valid(rng, rolled, Conditions::Skip);
        for &id in healed.iter().filter(|id| self.model.global_arguments.contains(*id)) {
            let arg = root.argument(id);
            let value = self.value_for(rng, arg)?;
            tokens.extend(format_argument(
                rng,
                arg,
                value.as_deref(),
                self.model.equals_form_probability,
            ));
        }
        Ok(())
    }

    fn push_positionals<R: Rng>(
        &self,
        rng: &mut R,
        scope: &Scope,
        tokens: &mut Vec<Token>,
    ) -> Result<(), FuzzError> {
        for pos in scope.positionals() {
            if !(pos.required || chance(rng, POSITIONAL_PROBABILITY)) {
                continue;
            }
            let count = if pos.variadic { rng.gen_range(1..=3) } else { 1 };
            for _ in 0..count {
                if let Some(value) = self.values.generate(rng, &pos.value, &pos.name, None)? {
                    if !value.is_empty() {
                        tokens.push(Token::new(value, Role::Positional));
                    }
                }
            }
        }
        Ok(())
    }
}
