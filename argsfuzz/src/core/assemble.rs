//! Rendering a selection into command-line tokens, and the final shuffle.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::core::model::Argument;
use crate::core::rng::{chance, pick};
use crate::document::RepeatSpec;

/// What a token was emitted as. Assigned at assembly time so grouping never
/// has to guess from the text (`-3` is a value, not a flag).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A flag, including the `--flag=value` form.
    Flag,
    /// The detached value of the flag right before it.
    Value,
    Subcommand,
    Positional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub role: Role,
}

impl Token {
    pub fn new(text: impl Into<String>, role: Role) -> Self {
        Self {
            text: text.into(),
            role,
        }
    }

    pub fn flag(text: impl Into<String>) -> Self {
        Self::new(text, Role::Flag)
    }

    pub fn value(text: impl Into<String>) -> Self {
        Self::new(text, Role::Value)
    }
}

/// Tokens for one occurrence: `flag`, `flag value`, or `--flag=value`.
///
/// The `=` form is only rolled for long flags.
pub fn format_argument<R: Rng + ?Sized>(
    rng: &mut R,
    arg: &Argument,
    value: Option<&str>,
    equals_form_probability: f64,
) -> Vec<Token> {
    let Some(flag) = pick(rng, &arg.flags) else {
        return Vec::new();
    };
    let Some(value) = value else {
        return vec![Token::flag(flag.as_str())];
    };
    if flag.starts_with("--") && chance(rng, equals_form_probability) {
        return vec![Token::flag(format!("{flag}={value}"))];
    }
    vec![Token::flag(flag.as_str()), Token::value(value)]
}

/// How many times to emit an argument under its repeat policy.
pub fn repeat_count<R: Rng + ?Sized>(rng: &mut R, repeat: Option<&RepeatSpec>) -> u32 {
    let Some(repeat) = repeat else {
        return 1;
    };
    if chance(rng, repeat.probability) {
        rng.gen_range(repeat.min_occurs..=repeat.max_occurs)
    } else {
        1
    }
}

/// Shuffle the leading run of flag groups and render the line's tokens.
///
/// A group is a flag with its value token, or a lone flag. When the run stops
/// at the subcommand token, the run right after it is shuffled as well.
/// Everything else keeps its position.
pub fn shuffle_flag_groups<R: Rng + ?Sized>(rng: &mut R, tokens: Vec<Token>) -> Vec<String> {
    let (mut head, end) = flag_groups(&tokens, 0);
    head.shuffle(rng);
    let mut shuffled: Vec<&Token> = head.concat();

    let mut rest = end;
    if tokens.get(end).is_some_and(|t| t.role == Role::Subcommand) {
        shuffled.push(&tokens[end]);
        let (mut tail, tail_end) = flag_groups(&tokens, end + 1);
        tail.shuffle(rng);
        shuffled.extend(tail.concat());
        rest = tail_end;
    }
    shuffled.extend(&tokens[rest..]);
    shuffled.into_iter().map(|token| token.text.clone()).collect()
}

/// Group the flag run starting at `start`; returns the groups and the index
/// of the first token after the run.
fn flag_groups(tokens: &[Token], start: usize) -> (Vec<Vec<&Token>>, usize) {
    let mut groups = Vec::new();
    let mut idx = start;
    while idx < tokens.len() && tokens[idx].role == Role::Flag {
        let flag = &tokens[idx];
        match tokens.get(idx + 1) {
            Some(value) if value.role == Role::Value => {
                groups.push(vec![flag, value]);
                idx += 2;
            }
            _ => {
                groups.push(vec![flag]);
                idx += 1;
            }
        }
    }
    (groups, idx)
}
