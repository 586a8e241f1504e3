//! Fixpoint engine: rule repair plus dependency resolution over a selection.
//!
//! Every draw happens against a sorted candidate list (ids are assigned in
//! name order), so the same seed always heals a selection the same way.

use rand::Rng;
use tracing::trace;

use crate::core::model::{ArgId, Reference, RuleKind, Scope, Selection, ValueMap};
use crate::core::rng::pick;

/// How conditional (`name=v1,v2`) dependencies are treated.
#[derive(Debug, Clone, Copy)]
pub enum Conditions<'a> {
    /// Values do not exist yet; treat conditions as plain dependencies.
    Skip,
    /// Check conditions against already-generated values.
    Check(&'a ValueMap),
}

/// Validates and heals argument selections within one scope.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintValidator<'m> {
    scope: &'m Scope,
}

impl<'m> ConstraintValidator<'m> {
    pub fn new(scope: &'m Scope) -> Self {
        Self { scope }
    }

    /// Drive `selection` to a state satisfying every rule and dependency.
    ///
    /// An argument removed during this call is never re-added by it, and an
    /// argument is only added while unselected, which bounds the loop by
    /// twice the scope size.
    pub fn ensure_valid<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        selection: Selection,
        conditions: Conditions<'_>,
    ) -> Selection {
        let mut selected = selection;
        let mut removed = Selection::new();
        let mut rounds = 0usize;
        loop {
            rounds += 1;
            let mut changed = self.repair_rules(rng, &mut selected, &mut removed);
            changed |= self.resolve_dependencies(rng, &mut selected, &mut removed, conditions);
            if !changed {
                break;
            }
        }
        trace!(rounds, selected = selected.len(), removed = removed.len(), "selection settled");
        selected
    }

    /// True if `selection ∪ {candidate}` holds two members of one
    /// `mutually_exclusive` expansion.
    pub fn check_rule_violation(&self, selection: &Selection, candidate: ArgId) -> bool {
        self.scope
            .rules()
            .iter()
            .filter(|rule| rule.kind == RuleKind::MutuallyExclusive)
            .any(|rule| {
                let hits = rule
                    .members
                    .iter()
                    .filter(|id| **id == candidate || selection.contains(*id))
                    .count();
                hits > 1
            })
    }

    /// Arguments a trim must not remove from `selection`.
    ///
    /// Required arguments, dependents, their selected dependency targets, and
    /// one representative per intersecting `one_of_required` expansion.
    pub fn must_keep<R: Rng + ?Sized>(&self, rng: &mut R, selection: &Selection) -> Selection {
        let mut keep = Selection::new();
        for &id in selection {
            let arg = self.scope.argument(id);
            if arg.required {
                keep.insert(id);
            }
            if arg.depends_on.is_empty() {
                continue;
            }
            keep.insert(id);
            for dep in &arg.depends_on {
                match &dep.target {
                    Reference::Argument(target) => {
                        if selection.contains(target) {
                            keep.insert(*target);
                        }
                    }
                    Reference::Group(label) => {
                        let members = self.scope.group(label).unwrap_or_default();
                        keep.extend(members.iter().filter(|m| selection.contains(*m)));
                    }
                    Reference::Unresolved(_) => {}
                }
            }
        }

        for rule in self.scope.rules() {
            if rule.kind != RuleKind::OneOfRequired {
                continue;
            }
            let hits: Vec<ArgId> = rule.members.intersection(selection).copied().collect();
            if let Some(id) = pick(rng, &hits) {
                keep.insert(*id);
            }
        }
        keep
    }

    /// One pass over the scope's rule expansions. Returns true on change.
    fn repair_rules<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        selected: &mut Selection,
        removed: &mut Selection,
    ) -> bool {
        let mut changed = false;
        for rule in self.scope.rules() {
            match rule.kind {
                RuleKind::MutuallyExclusive => {
                    let hits: Vec<ArgId> = rule.members.intersection(selected).copied().collect();
                    if hits.len() < 2 {
                        continue;
                    }
                    let Some(&survivor) = pick(rng, &hits) else {
                        continue;
                    };
                    for id in hits.into_iter().filter(|id| *id != survivor) {
                        selected.remove(&id);
                        removed.insert(id);
                    }
                    trace!(rule = %rule.label, survivor = survivor.index(), "kept one exclusive member");
                    changed = true;
                }
                RuleKind::OneOfRequired => {
                    if !rule.members.is_disjoint(selected) {
                        continue;
                    }
                    let candidates: Vec<ArgId> = rule
                        .members
                        .iter()
                        .copied()
                        .filter(|id| self.addable(*id, removed))
                        .collect();
                    if let Some(id) = pick(rng, &candidates) {
                        selected.insert(*id);
                        changed = true;
                    }
                }
                RuleKind::AllOrNone => {
                    if rule.members.is_disjoint(selected) {
                        continue;
                    }
                    for id in rule.members.iter().copied() {
                        if self.addable(id, removed) && selected.insert(id) {
                            changed = true;
                        }
                    }
                }
                RuleKind::Unknown => {}
            }
        }
        changed
    }

    /// One dependency pass; additions and removals land together.
    fn resolve_dependencies<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        selected: &mut Selection,
        removed: &mut Selection,
        conditions: Conditions<'_>,
    ) -> bool {
        let mut additions = Selection::new();
        let mut removals = Selection::new();

        for &id in selected.iter() {
            let arg = self.scope.argument(id);
            let mut wanted: Vec<ArgId> = Vec::new();
            let mut drop_self = false;

            for dep in &arg.depends_on {
                if let (Some(allowed), Conditions::Check(values)) = (&dep.condition, conditions) {
                    let satisfied = match &dep.target {
                        Reference::Argument(target) => {
                            selected.contains(target)
                                && values.get(target).is_some_and(|v| allowed.contains(v))
                        }
                        Reference::Group(_) | Reference::Unresolved(_) => false,
                    };
                    if !satisfied {
                        drop_self = true;
                        break;
                    }
                    continue;
                }

                let pending = |candidate: &ArgId| {
                    selected.contains(candidate)
                        || additions.contains(candidate)
                        || wanted.contains(candidate)
                };
                match &dep.target {
                    Reference::Argument(target) => {
                        if pending(target) {
                            continue;
                        }
                        let target_arg = self.scope.argument(*target);
                        if !removed.contains(target) && (target_arg.addable() || target_arg.required)
                        {
                            wanted.push(*target);
                        } else if !arg.required {
                            drop_self = true;
                            break;
                        }
                    }
                    Reference::Group(label) => {
                        let members = self.scope.group(label).unwrap_or_default();
                        if members.iter().any(pending) {
                            continue;
                        }
                        let candidates: Vec<ArgId> = members
                            .iter()
                            .copied()
                            .filter(|m| self.addable(*m, removed))
                            .collect();
                        match pick(rng, &candidates) {
                            Some(member) => wanted.push(*member),
                            None if !arg.required => {
                                drop_self = true;
                                break;
                            }
                            None => {}
                        }
                    }
                    Reference::Unresolved(_) => {}
                }
            }

            if drop_self {
                removals.insert(id);
            } else {
                additions.extend(wanted);
            }
        }

        let mut changed = false;
        for id in removals {
            trace!(argument = %self.scope.argument(id).name, "dropping argument with unmet dependency");
            changed |= selected.remove(&id);
            removed.insert(id);
        }
        for id in additions {
            if !removed.contains(&id) && selected.insert(id) {
                changed = true;
            }
        }
        changed
    }

    fn addable(&self, id: ArgId, removed: &Selection) -> bool {
        self.scope.argument(id).addable() && !removed.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::seeded;
    use crate::document::ValueSpec;
    use crate::test_support::{argument, document, flag, model, names, rule, selection};

    fn grouped(name: &str, group: &str) -> crate::document::ArgumentSpec {
        let mut arg = flag(name);
        arg.group = Some(group.to_string());
        arg
    }

    #[test]
    fn mutually_exclusive_keeps_exactly_one() {
        let mut doc = document(vec![flag("json"), flag("yaml"), flag("xml")]);
        doc.rules = vec![rule("mutually_exclusive", &["json", "yaml", "xml"])];
        let model = model(&doc);
        let validator = ConstraintValidator::new(&model.root);

        for seed in 0..20 {
            let mut rng = seeded(seed);
            let start = selection(&model.root, &["json", "yaml", "xml"]);
            let settled = validator.ensure_valid(&mut rng, start, Conditions::Skip);
            assert_eq!(settled.len(), 1, "seed {seed}");
        }
    }

    #[test]
    fn one_of_required_adds_positive_probability_member() {
        let mut never = flag("never");
        never.probability = 0.0;
        let mut doc = document(vec![flag("input"), never]);
        doc.rules = vec![rule("one_of_required", &["input", "never"])];
        let model = model(&doc);
        let validator = ConstraintValidator::new(&model.root);

        let mut rng = seeded(4);
        let settled = validator.ensure_valid(&mut rng, Selection::new(), Conditions::Skip);
        assert_eq!(names(&model.root, &settled), vec!["input"]);
    }

    #[test]
    fn one_of_required_without_eligible_members_is_noop() {
        let mut never = flag("never");
        never.probability = 0.0;
        let mut doc = document(vec![never]);
        doc.rules = vec![rule("one_of_required", &["never"])];
        let model = model(&doc);
        let validator = ConstraintValidator::new(&model.root);

        let mut rng = seeded(4);
        let settled = validator.ensure_valid(&mut rng, Selection::new(), Conditions::Skip);
        assert!(settled.is_empty());
    }

    #[test]
    fn all_or_none_completes_partial_selection() {
        let mut hidden = flag("cert");
        hidden.probability = 0.0;
        let mut doc = document(vec![flag("user"), flag("password"), hidden]);
        doc.rules = vec![rule("all_or_none", &["user", "password", "cert"])];
        let model = model(&doc);
        let validator = ConstraintValidator::new(&model.root);

        let mut rng = seeded(9);
        let settled =
            validator.ensure_valid(&mut rng, selection(&model.root, &["user"]), Conditions::Skip);
        assert_eq!(names(&model.root, &settled), vec!["password", "user"]);

        let untouched = validator.ensure_valid(&mut rng, Selection::new(), Conditions::Skip);
        assert!(untouched.is_empty());
    }

    #[test]
    fn plain_dependency_is_added() {
        let mut output = flag("output");
        output.depends_on = vec!["format".to_string()];
        let doc = document(vec![output, flag("format")]);
        let model = model(&doc);
        let validator = ConstraintValidator::new(&model.root);

        let mut rng = seeded(1);
        let settled =
            validator.ensure_valid(&mut rng, selection(&model.root, &["output"]), Conditions::Skip);
        assert_eq!(names(&model.root, &settled), vec!["format", "output"]);
    }

    #[test]
    fn group_dependency_adds_one_member_unless_present() {
        let mut compress = flag("compress");
        compress.depends_on = vec!["codec".to_string()];
        let doc = document(vec![compress, grouped("gzip", "codec"), grouped("zstd", "codec")]);
        let model = model(&doc);
        let validator = ConstraintValidator::new(&model.root);

        let mut rng = seeded(2);
        let settled = validator.ensure_valid(
            &mut rng,
            selection(&model.root, &["compress"]),
            Conditions::Skip,
        );
        assert_eq!(settled.len(), 2);
        assert!(settled.contains(&model.root.lookup("compress").expect("compress")));

        let settled = validator.ensure_valid(
            &mut rng,
            selection(&model.root, &["compress", "zstd"]),
            Conditions::Skip,
        );
        assert_eq!(names(&model.root, &settled), vec!["compress", "zstd"]);
    }

    #[test]
    fn dependency_on_zero_probability_argument_drops_dependent() {
        let mut verbose = flag("trace");
        verbose.depends_on = vec!["debug".to_string()];
        let mut debug = flag("debug");
        debug.probability = 0.0;
        let model = model(&document(vec![verbose, debug]));
        let validator = ConstraintValidator::new(&model.root);

        let mut rng = seeded(5);
        let settled =
            validator.ensure_valid(&mut rng, selection(&model.root, &["trace"]), Conditions::Skip);
        assert!(settled.is_empty());
    }

    #[test]
    fn conditional_dependency_drops_dependent_on_mismatch() {
        let mut a = flag("a");
        a.depends_on = vec!["b=x,y".to_string()];
        let b = argument(
            "b",
            ValueSpec::Enum {
                values: vec!["x".to_string(), "y".to_string(), "z".to_string()],
            },
        );
        let model = model(&document(vec![a, b]));
        let validator = ConstraintValidator::new(&model.root);
        let b_id = model.root.lookup("b").expect("b");

        let mut rng = seeded(6);
        let values = ValueMap::from([(b_id, "z".to_string())]);
        let settled = validator.ensure_valid(
            &mut rng,
            selection(&model.root, &["a", "b"]),
            Conditions::Check(&values),
        );
        assert_eq!(names(&model.root, &settled), vec!["b"]);

        let values = ValueMap::from([(b_id, "y".to_string())]);
        let settled = validator.ensure_valid(
            &mut rng,
            selection(&model.root, &["a", "b"]),
            Conditions::Check(&values),
        );
        assert_eq!(names(&model.root, &settled), vec!["a", "b"]);
    }

    #[test]
    fn conditional_dependency_without_value_drops_dependent() {
        let mut a = flag("a");
        a.depends_on = vec!["b=x".to_string()];
        let model = model(&document(vec![a, flag("b")]));
        let validator = ConstraintValidator::new(&model.root);

        let mut rng = seeded(6);
        let values = ValueMap::new();
        let settled = validator.ensure_valid(
            &mut rng,
            selection(&model.root, &["a"]),
            Conditions::Check(&values),
        );
        assert!(settled.is_empty());
    }

    #[test]
    fn skipped_conditions_act_as_plain_dependencies() {
        let mut a = flag("a");
        a.depends_on = vec!["b=x".to_string()];
        let model = model(&document(vec![a, flag("b")]));
        let validator = ConstraintValidator::new(&model.root);

        let mut rng = seeded(6);
        let settled =
            validator.ensure_valid(&mut rng, selection(&model.root, &["a"]), Conditions::Skip);
        assert_eq!(names(&model.root, &settled), vec!["a", "b"]);
    }

    #[test]
    fn dependency_removed_by_exclusion_is_not_readded() {
        // `tar` needs `gzip`, but `gzip` excludes `zstd`: whichever survives,
        // the loop must terminate with a consistent selection.
        let mut tar = flag("tar");
        tar.depends_on = vec!["gzip".to_string()];
        let mut doc = document(vec![tar, flag("gzip"), flag("zstd")]);
        doc.rules = vec![rule("mutually_exclusive", &["gzip", "zstd"])];
        let model = model(&doc);
        let validator = ConstraintValidator::new(&model.root);
        let gzip = model.root.lookup("gzip").expect("gzip");
        let zstd = model.root.lookup("zstd").expect("zstd");
        let tar = model.root.lookup("tar").expect("tar");

        for seed in 0..30 {
            let mut rng = seeded(seed);
            let start = selection(&model.root, &["tar", "gzip", "zstd"]);
            let settled = validator.ensure_valid(&mut rng, start, Conditions::Skip);
            assert!(!(settled.contains(&gzip) && settled.contains(&zstd)));
            if settled.contains(&tar) {
                assert!(settled.contains(&gzip));
            }
        }
    }

    #[test]
    fn check_rule_violation_flags_exclusive_pairs() {
        let mut doc = document(vec![flag("json"), flag("yaml"), flag("quiet")]);
        doc.rules = vec![rule("mutually_exclusive", &["json", "yaml"])];
        let model = model(&doc);
        let validator = ConstraintValidator::new(&model.root);
        let current = selection(&model.root, &["json"]);

        assert!(validator.check_rule_violation(&current, model.root.lookup("yaml").expect("yaml")));
        assert!(!validator.check_rule_violation(&current, model.root.lookup("quiet").expect("quiet")));
    }

    #[test]
    fn must_keep_covers_required_dependents_and_targets() {
        let mut out = flag("out");
        out.depends_on = vec!["fmt".to_string()];
        let mut req = flag("input");
        req.required = true;
        let mut doc = document(vec![out, flag("fmt"), req, flag("extra"), flag("a"), flag("b")]);
        doc.rules = vec![rule("one_of_required", &["a", "b"])];
        let model = model(&doc);
        let validator = ConstraintValidator::new(&model.root);

        let mut rng = seeded(11);
        let current = selection(&model.root, &["out", "fmt", "input", "extra", "a", "b"]);
        let keep = validator.must_keep(&mut rng, &current);
        let kept = names(&model.root, &keep);
        assert!(kept.contains(&"out".to_string()));
        assert!(kept.contains(&"fmt".to_string()));
        assert!(kept.contains(&"input".to_string()));
        assert!(!kept.contains(&"extra".to_string()));
        let representatives = ["a", "b"]
            .iter()
            .filter(|name| kept.contains(&name.to_string()))
            .count();
        assert_eq!(representatives, 1);
    }

    #[test]
    fn unknown_rules_are_not_enforced() {
        let mut doc = document(vec![flag("a"), flag("b")]);
        doc.rules = vec![rule("at_most_one", &["a", "b"])];
        let model = model(&doc);
        let validator = ConstraintValidator::new(&model.root);

        let mut rng = seeded(0);
        let settled =
            validator.ensure_valid(&mut rng, selection(&model.root, &["a", "b"]), Conditions::Skip);
        assert_eq!(settled.len(), 2);
    }
}
