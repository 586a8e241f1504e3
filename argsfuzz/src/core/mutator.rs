//! Token-level corruption for samples that should be rejected by the tool.

use rand::Rng;
use rand::seq::index;
use tracing::debug;

use crate::core::assemble::{Role, Token};
use crate::core::model::{ArgId, Model, RuleKind, ScopeRef};
use crate::core::rng::{chance, pick};

/// Characters used when inventing or corrupting flags.
pub const FLAG_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";

/// Value corruption draws from U+0020..=U+00FF.
const VALUE_CHAR_RANGE: std::ops::RangeInclusive<u8> = 0x20..=0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    InjectInvalidFlag,
    DuplicateFlag,
    RemoveRequired,
    AddConflicting,
    MutateValue,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::InjectInvalidFlag,
        Strategy::DuplicateFlag,
        Strategy::RemoveRequired,
        Strategy::AddConflicting,
        Strategy::MutateValue,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    Flag,
    Value,
}

impl Alphabet {
    fn draw<R: Rng + ?Sized>(self, rng: &mut R) -> char {
        match self {
            Alphabet::Flag => char::from(FLAG_CHARS[rng.gen_range(0..FLAG_CHARS.len())]),
            Alphabet::Value => char::from(rng.gen_range(VALUE_CHAR_RANGE)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Mutator<'m> {
    model: &'m Model,
}

impl<'m> Mutator<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self { model }
    }

    /// Apply one uniformly chosen strategy when `invalid`; otherwise return
    /// `tokens` untouched.
    pub fn mutate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        tokens: Vec<Token>,
        scope: ScopeRef,
        invalid: bool,
    ) -> Vec<Token> {
        if !invalid {
            return tokens;
        }
        let strategy = pick(rng, &Strategy::ALL)
            .copied()
            .unwrap_or(Strategy::InjectInvalidFlag);
        debug!(?strategy, "mutating sample");
        self.apply(rng, strategy, tokens, scope)
    }

    /// Run one strategy. Each is a no-op when its precondition fails.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        strategy: Strategy,
        mut tokens: Vec<Token>,
        scope: ScopeRef,
    ) -> Vec<Token> {
        match strategy {
            Strategy::InjectInvalidFlag => inject_invalid_flag(rng, &mut tokens),
            Strategy::DuplicateFlag => {
                if !self.model.syntax.allow_duplicates {
                    duplicate_flag(rng, &mut tokens);
                }
            }
            Strategy::RemoveRequired => self.remove_required(rng, &mut tokens, scope),
            Strategy::AddConflicting => self.add_conflicting(rng, &mut tokens, scope),
            Strategy::MutateValue => mutate_value(rng, &mut tokens),
        }
        tokens
    }

    fn remove_required<R: Rng + ?Sized>(&self, rng: &mut R, tokens: &mut Vec<Token>, scope: ScopeRef) {
        let scope = self.model.scope(scope);
        let required: Vec<ArgId> = scope
            .arguments()
            .iter()
            .filter(|arg| arg.required)
            .map(|arg| arg.id)
            .collect();
        let Some(&id) = pick(rng, &required) else {
            return;
        };

        for flag in &scope.argument(id).flags {
            let inline = format!("{flag}=");
            let found = tokens
                .iter()
                .position(|token| token.text == *flag || token.text.starts_with(&inline));
            let Some(idx) = found else {
                continue;
            };
            let removed = tokens.remove(idx);
            if removed.text == *flag && tokens.get(idx).is_some_and(|next| next.role == Role::Value) {
                tokens.remove(idx);
            }
            return;
        }
    }

    fn add_conflicting<R: Rng + ?Sized>(&self, rng: &mut R, tokens: &mut Vec<Token>, scope: ScopeRef) {
        let scope = self.model.scope(scope);
        let eligible: Vec<Vec<ArgId>> = scope
            .rules()
            .iter()
            .filter(|rule| rule.kind == RuleKind::MutuallyExclusive && rule.members.len() >= 2)
            .map(|rule| rule.members.iter().copied().collect())
            .collect();
        let Some(members) = pick(rng, &eligible) else {
            return;
        };
        for idx in index::sample(rng, members.len(), 2) {
            if let Some(flag) = pick(rng, &scope.argument(members[idx]).flags) {
                tokens.push(Token::flag(flag.as_str()));
            }
        }
    }
}

fn inject_invalid_flag<R: Rng + ?Sized>(rng: &mut R, tokens: &mut Vec<Token>) {
    if !tokens.is_empty() && chance(rng, 0.5) {
        let flags: Vec<&str> = flag_texts(tokens).collect();
        if let Some(flag) = pick(rng, &flags) {
            let mutated = mutate_string(rng, flag, Alphabet::Flag);
            let at = rng.gen_range(0..=tokens.len());
            tokens.insert(at, Token::flag(mutated));
            return;
        }
    }

    let invented = if chance(rng, 0.5) {
        format!("-{}", Alphabet::Flag.draw(rng))
    } else {
        let len = rng.gen_range(3..=15);
        let body: String = (0..len).map(|_| Alphabet::Flag.draw(rng)).collect();
        format!("--{body}")
    };
    let at = rng.gen_range(0..=tokens.len());
    tokens.insert(at, Token::flag(invented));
}

fn duplicate_flag<R: Rng + ?Sized>(rng: &mut R, tokens: &mut Vec<Token>) {
    let flags: Vec<&str> = flag_texts(tokens).collect();
    let Some(flag) = pick(rng, &flags).map(|flag| Token::flag(*flag)) else {
        return;
    };
    let at = rng.gen_range(0..=tokens.len());
    tokens.insert(at, flag);
}

/// Mutation keeps the token's role, so a corrupted value still travels with
/// its flag through the shuffle.
fn mutate_value<R: Rng + ?Sized>(rng: &mut R, tokens: &mut [Token]) {
    if !tokens.is_empty() && chance(rng, 0.5) {
        let flags: Vec<usize> = (0..tokens.len())
            .filter(|&i| tokens[i].role == Role::Flag)
            .collect();
        if let Some(&idx) = pick(rng, &flags) {
            let mutated = mutate_string(rng, &tokens[idx].text, Alphabet::Flag);
            tokens[idx].text = mutated;
        }
        return;
    }

    let values: Vec<usize> = (0..tokens.len())
        .filter(|&i| tokens[i].role == Role::Value)
        .collect();
    if let Some(&idx) = pick(rng, &values) {
        let mutated = mutate_string(rng, &tokens[idx].text, Alphabet::Value);
        tokens[idx].text = mutated;
    }
}

fn flag_texts(tokens: &[Token]) -> impl Iterator<Item = &str> {
    tokens
        .iter()
        .filter(|token| token.role == Role::Flag)
        .map(|token| token.text.as_str())
}

/// Add, remove, or replace one character at a uniform position.
///
/// An empty input becomes a single random character; removal on a
/// one-character input degrades to replacement.
pub fn mutate_string<R: Rng + ?Sized>(rng: &mut R, input: &str, alphabet: Alphabet) -> String {
    let mut chars: Vec<char> = input.chars().collect();
    if chars.is_empty() {
        return alphabet.draw(rng).to_string();
    }
    match rng.gen_range(0..3) {
        0 => {
            let at = rng.gen_range(0..=chars.len());
            chars.insert(at, alphabet.draw(rng));
        }
        1 if chars.len() > 1 => {
            let at = rng.gen_range(0..chars.len());
            chars.remove(at);
        }
        _ => {
            let at = rng.gen_range(0..chars.len());
            chars[at] = alphabet.draw(rng);
        }
    }
    chars.into_iter().collect()
}
