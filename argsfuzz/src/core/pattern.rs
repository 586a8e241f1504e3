//! Regex-directed string synthesis.

use rand::Rng;
use rand::distributions::Distribution;
use regex_syntax::hir::{
    Capture, Class, ClassBytes, ClassBytesRange, ClassUnicode, ClassUnicodeRange, Hir, HirKind,
    Repetition,
};
use tracing::debug;

/// Upper bound for unbounded repetition (`*`, `+`, `{n,}`).
pub const MAX_REPEAT: u32 = 8;

const METACHARACTERS: &str = r"^$.*+?{}[]\|()";

/// Lowest and highest printable, non-space ASCII characters.
const PRINTABLE: (u8, u8) = (b'!', b'~');

/// Draw a string matching `pattern`.
///
/// A leading `^` and trailing `$` are dropped since the output is always a
/// whole token. Every character class is narrowed to printable ASCII without
/// whitespace, so `.` and negated classes stay on one shell word. Returns
/// `None` when the pattern cannot be sampled (other anchors, lookaround,
/// classes with no printable member).
pub fn synthesize<R: Rng + ?Sized>(rng: &mut R, pattern: &str) -> Option<String> {
    let body = pattern.strip_prefix('^').unwrap_or(pattern);
    let body = body
        .strip_suffix('$')
        .filter(|rest| !rest.ends_with('\\'))
        .unwrap_or(body);

    let hir = match regex_syntax::parse(body) {
        Ok(hir) => hir,
        Err(err) => {
            debug!(pattern, error = %err, "pattern does not parse");
            return None;
        }
    };
    let Some(hir) = printable(hir) else {
        debug!(pattern, "pattern has no printable match");
        return None;
    };
    let regex = match rand_regex::Regex::with_hir(hir, MAX_REPEAT) {
        Ok(regex) => regex,
        Err(err) => {
            debug!(pattern, error = %err, "pattern cannot be sampled");
            return None;
        }
    };
    let sampled: Result<String, std::string::FromUtf8Error> = regex.sample(rng);
    sampled.ok()
}

/// Narrow every class in `hir` to [`PRINTABLE`]; `None` if one ends up empty.
fn printable(hir: Hir) -> Option<Hir> {
    let (low, high) = PRINTABLE;
    let hir = match hir.into_kind() {
        HirKind::Class(Class::Unicode(mut class)) => {
            class.intersect(&ClassUnicode::new([ClassUnicodeRange::new(
                char::from(low),
                char::from(high),
            )]));
            if class.ranges().is_empty() {
                return None;
            }
            Hir::class(Class::Unicode(class))
        }
        HirKind::Class(Class::Bytes(mut class)) => {
            class.intersect(&ClassBytes::new([ClassBytesRange::new(low, high)]));
            if class.ranges().is_empty() {
                return None;
            }
            Hir::class(Class::Bytes(class))
        }
        HirKind::Repetition(rep) => Hir::repetition(Repetition {
            min: rep.min,
            max: rep.max,
            greedy: rep.greedy,
            sub: Box::new(printable(*rep.sub)?),
        }),
        HirKind::Capture(cap) => Hir::capture(Capture {
            index: cap.index,
            name: cap.name,
            sub: Box::new(printable(*cap.sub)?),
        }),
        HirKind::Concat(subs) => Hir::concat(subs.into_iter().map(printable).collect::<Option<_>>()?),
        HirKind::Alternation(subs) => {
            Hir::alternation(subs.into_iter().map(printable).collect::<Option<_>>()?)
        }
        HirKind::Literal(literal) => Hir::literal(literal.0),
        HirKind::Look(look) => Hir::look(look),
        HirKind::Empty => Hir::empty(),
    };
    Some(hir)
}

/// Remove every regex metacharacter, leaving the literal residue.
pub fn strip_metacharacters(pattern: &str) -> String {
    pattern
        .chars()
        .filter(|ch| !METACHARACTERS.contains(*ch))
        .collect()
}
