//! Scope choice, base selection, and trim/pad toward a target size.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::seq::index;
use tracing::debug;

use crate::core::model::{ArgId, Model, Scope, ScopeRef, Selection};
use crate::core::rng::chance;
use crate::core::validator::{Conditions, ConstraintValidator};

/// Probability that a sample enters a subcommand when the tool has any.
pub const SUBCOMMAND_PROBABILITY: f64 = 0.7;

/// A rule-consistent selection within one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination {
    pub scope: ScopeRef,
    pub selection: Selection,
}

#[derive(Debug, Clone, Copy)]
pub struct CombinationGenerator<'m> {
    model: &'m Model,
}

impl<'m> CombinationGenerator<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self { model }
    }

    /// Produce one selection: scope, required plus Bernoulli draws, healed,
    /// then capped at `generation.max_args`.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Combination {
        let scope_ref = self.select_scope(rng);
        let scope = self.model.scope(scope_ref);

        let mut selection = Selection::new();
        for arg in scope.arguments() {
            if arg.required || chance(rng, arg.probability) {
                selection.insert(arg.id);
            }
        }

        let validator = ConstraintValidator::new(scope);
        let mut selection = validator.ensure_valid(rng, selection, Conditions::Skip);
        if selection.len() > self.model.max_args {
            selection = trim(rng, scope, selection, self.model.max_args);
        }
        debug!(scope = ?scope_ref, selected = selection.len(), "base combination");
        Combination {
            scope: scope_ref,
            selection,
        }
    }

    /// Enter a subcommand with fixed probability, chosen by weight.
    ///
    /// Falls back to the root scope when every weight is zero.
    pub fn select_scope<R: Rng + ?Sized>(&self, rng: &mut R) -> ScopeRef {
        if self.model.subcommands.is_empty() || !chance(rng, SUBCOMMAND_PROBABILITY) {
            return ScopeRef::Root;
        }
        let weights = self.model.subcommands.iter().map(|sub| sub.probability);
        match WeightedIndex::new(weights) {
            Ok(dist) => ScopeRef::Subcommand(dist.sample(rng)),
            Err(_) => ScopeRef::Root,
        }
    }
}

/// Shrink `selection` to `target` without touching [`ConstraintValidator::must_keep`].
///
/// When the protected set alone exceeds `target`, it is returned as is.
pub fn trim<R: Rng + ?Sized>(
    rng: &mut R,
    scope: &Scope,
    selection: Selection,
    target: usize,
) -> Selection {
    if selection.len() <= target {
        return selection;
    }
    let keep = ConstraintValidator::new(scope).must_keep(rng, &selection);
    if keep.len() > target {
        debug!(target, kept = keep.len(), "protected arguments exceed target");
        return keep;
    }

    let removable: Vec<ArgId> = selection.difference(&keep).copied().collect();
    let amount = (selection.len() - target).min(removable.len());
    let dropped: Selection = index::sample(rng, removable.len(), amount)
        .into_iter()
        .map(|idx| removable[idx])
        .collect();
    selection.difference(&dropped).copied().collect()
}

/// Grow `selection` toward `target` with positive-probability arguments that
/// do not break a `mutually_exclusive` rule.
pub fn pad<R: Rng + ?Sized>(
    rng: &mut R,
    scope: &Scope,
    selection: Selection,
    target: usize,
) -> Selection {
    if selection.len() >= target {
        return selection;
    }
    let mut pool: Vec<ArgId> = scope
        .arguments()
        .iter()
        .filter(|arg| arg.addable() && !selection.contains(&arg.id))
        .map(|arg| arg.id)
        .collect();
    pool.shuffle(rng);

    let validator = ConstraintValidator::new(scope);
    let mut current = selection;
    for id in pool {
        if current.len() >= target {
            break;
        }
        if !validator.check_rule_violation(&current, id) {
            current.insert(id);
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::seeded;
    use crate::document::SubcommandSpec;
    use crate::test_support::{document, flag, model, names, rule, selection};

    fn subcommand(name: &str, probability: f64) -> SubcommandSpec {
        SubcommandSpec {
            name: name.to_string(),
            description: String::new(),
            aliases: Vec::new(),
            probability,
            arguments: vec![flag("force")],
            positional: Vec::new(),
        }
    }

    #[test]
    fn required_zero_probability_is_always_selected() {
        let mut input = flag("input");
        input.required = true;
        input.probability = 0.0;
        let model = model(&document(vec![input, flag("quiet")]));
        let generator = CombinationGenerator::new(&model);

        for seed in 0..25 {
            let mut rng = seeded(seed);
            let combination = generator.generate(&mut rng);
            assert!(
                names(&model.root, &combination.selection).contains(&"input".to_string()),
                "seed {seed}"
            );
        }
    }

    #[test]
    fn zero_probability_arguments_are_never_drawn() {
        let mut never = flag("never");
        never.probability = 0.0;
        let model = model(&document(vec![never, flag("maybe")]));
        let generator = CombinationGenerator::new(&model);
        let never = model.root.lookup("never").expect("never");

        for seed in 0..25 {
            let mut rng = seeded(seed);
            assert!(!generator.generate(&mut rng).selection.contains(&never));
        }
    }

    #[test]
    fn scope_falls_back_to_root_when_weights_are_zero() {
        let mut doc = document(vec![flag("verbose")]);
        doc.subcommands = vec![subcommand("build", 0.0), subcommand("test", 0.0)];
        let model = model(&doc);
        let generator = CombinationGenerator::new(&model);

        for seed in 0..25 {
            let mut rng = seeded(seed);
            assert_eq!(generator.select_scope(&mut rng), ScopeRef::Root);
        }
    }

    #[test]
    fn scope_selection_only_reaches_weighted_subcommands() {
        let mut doc = document(vec![flag("verbose")]);
        doc.subcommands = vec![subcommand("build", 0.0), subcommand("test", 1.0)];
        let model = model(&doc);
        let generator = CombinationGenerator::new(&model);

        let mut saw_subcommand = false;
        for seed in 0..50 {
            let mut rng = seeded(seed);
            match generator.select_scope(&mut rng) {
                ScopeRef::Subcommand(idx) => {
                    assert_eq!(idx, 1);
                    saw_subcommand = true;
                }
                ScopeRef::Root => {}
            }
        }
        assert!(saw_subcommand);
    }

    #[test]
    fn base_selection_respects_max_args() {
        let args = (0..10).map(|i| flag(&format!("f{i}"))).collect();
        let mut doc = document(args);
        for arg in &mut doc.arguments {
            arg.probability = 1.0;
        }
        doc.generation.max_args = 4;
        let model = model(&doc);
        let mut rng = seeded(3);
        let combination = CombinationGenerator::new(&model).generate(&mut rng);
        assert_eq!(combination.selection.len(), 4);
    }

    #[test]
    fn trim_preserves_required_and_dependencies() {
        let mut req = flag("input");
        req.required = true;
        let mut out = flag("output");
        out.depends_on = vec!["format".to_string()];
        let doc = document(vec![req, out, flag("format"), flag("a"), flag("b"), flag("c")]);
        let model = model(&doc);

        for seed in 0..20 {
            let mut rng = seeded(seed);
            let start = selection(&model.root, &["input", "output", "format", "a", "b", "c"]);
            let trimmed = trim(&mut rng, &model.root, start, 3);
            assert_eq!(names(&model.root, &trimmed), vec!["format", "input", "output"]);
        }
    }

    #[test]
    fn trim_returns_protected_set_when_it_overshoots() {
        let mut a = flag("a");
        a.required = true;
        let mut b = flag("b");
        b.required = true;
        let model = model(&document(vec![a, b, flag("c")]));
        let mut rng = seeded(0);
        let trimmed = trim(&mut rng, &model.root, selection(&model.root, &["a", "b", "c"]), 1);
        assert_eq!(names(&model.root, &trimmed), vec!["a", "b"]);
    }

    #[test]
    fn pad_never_adds_exclusive_pair() {
        let mut doc = document(vec![flag("json"), flag("yaml"), flag("xml"), flag("quiet")]);
        doc.rules = vec![rule("mutually_exclusive", &["json", "yaml", "xml"])];
        let model = model(&doc);
        let exclusive = ["json", "yaml", "xml"];

        for seed in 0..30 {
            let mut rng = seeded(seed);
            let padded = pad(&mut rng, &model.root, Selection::new(), 4);
            let picked = names(&model.root, &padded);
            let hits = picked
                .iter()
                .filter(|name| exclusive.contains(&name.as_str()))
                .count();
            assert!(hits <= 1, "seed {seed}: {picked:?}");
            assert_eq!(padded.len(), 2);
        }
    }

    #[test]
    fn pad_skips_zero_probability() {
        let mut never = flag("never");
        never.probability = 0.0;
        let model = model(&document(vec![never, flag("a")]));
        let mut rng = seeded(1);
        let padded = pad(&mut rng, &model.root, Selection::new(), 5);
        assert_eq!(names(&model.root, &padded), vec!["a"]);
    }
}
