//! Semantic-version range parsing and matching.
//!
//! Plugin constraint tables are written in the npm range grammar, so this
//! module implements that grammar on top of [`semver::Version`]:
//!
//! - Primitive comparators: `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3`, `=1.2.3`
//! - Bare versions are exact: `1.2.3` matches only `1.2.3`
//! - Partial versions and X-ranges: `1.2`, `1.x`, `1.2.*`, `*`
//! - Caret and tilde: `^1.2.3`, `~1.2.3`, `~>1.2`
//! - Hyphen ranges: `1.2.3 - 2.3`
//! - Whitespace-separated comparators are AND-ed, `||` separates alternatives
//!
//! A prerelease version only satisfies a comparator set when some comparator
//! in that set names a prerelease of the same `major.minor.patch`.
//!
//! # Examples
//!
//! ```
//! use plugin_resolve::version::VersionRange;
//!
//! let range = VersionRange::parse(">=7.0.0").unwrap();
//! assert!(range.satisfies_str("7.1.0"));
//! assert!(!range.satisfies_str("6.5.0"));
//!
//! let exact = VersionRange::parse("1.0.0").unwrap();
//! assert!(!exact.satisfies_str("1.5.0"));
//! ```

use semver::{BuildMetadata, Prerelease, Version};

use crate::error::{Error, Result};

/// Largest numeric component a range may name. Range bounds step one past a
/// component, so it must stay below `u64::MAX`.
const MAX_COMPONENT: u64 = 9_007_199_254_740_991;

/// A single version comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    /// `>=`
    Gte,
    /// `>`
    Gt,
    /// `<=`
    Lte,
    /// `<`
    Lt,
    /// `=`
    Eq,
}

/// A primitive comparator: an operator paired with a full version.
#[derive(Debug, Clone)]
struct Comparator {
    op: CompareOp,
    version: Version,
}

impl Comparator {
    fn new(op: CompareOp, version: Version) -> Self {
        Self { op, version }
    }

    fn matches(&self, candidate: &Version) -> bool {
        match self.op {
            CompareOp::Gte => candidate >= &self.version,
            CompareOp::Gt => candidate > &self.version,
            CompareOp::Lte => candidate <= &self.version,
            CompareOp::Lt => candidate < &self.version,
            CompareOp::Eq => candidate == &self.version,
        }
    }
}

/// Operators accepted in front of a (possibly partial) version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeOp {
    Exact,
    Gte,
    Gt,
    Lte,
    Lt,
    Tilde,
    Caret,
}

/// A version that may omit trailing components (`1`, `1.2`, `1.x`).
#[derive(Debug, Clone)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Prerelease,
}

impl Partial {
    fn floor(&self) -> Version {
        let mut v = Version::new(
            self.major.unwrap_or(0),
            self.minor.unwrap_or(0),
            self.patch.unwrap_or(0),
        );
        v.pre = self.pre.clone();
        v
    }
}

/// A parsed range that can be checked against concrete versions.
#[derive(Debug, Clone)]
pub struct VersionRange {
    /// Alternatives (`||`); each alternative is an AND-ed comparator set.
    sets: Vec<Vec<Comparator>>,
    /// The original range string for display.
    raw: String,
}

impl VersionRange {
    /// Parse a range expression.
    ///
    /// An empty string is equivalent to `*`.
    pub fn parse(range: &str) -> Result<Self> {
        let raw = range.trim().to_string();
        let mut sets = Vec::new();

        for alternative in raw.split("||") {
            sets.push(parse_set(alternative.trim()).map_err(|reason| Error::InvalidRange {
                range: raw.clone(),
                reason,
            })?);
        }

        Ok(Self { sets, raw })
    }

    /// Check a parsed version against this range.
    pub fn satisfies(&self, version: &Version) -> bool {
        self.sets
            .iter()
            .any(|set| set.iter().all(|c| c.matches(version)) && prerelease_allowed(set, version))
    }

    /// Check a version string against this range.
    ///
    /// Returns `false` if the version string cannot be parsed.
    pub fn satisfies_str(&self, version: &str) -> bool {
        match parse_version(version) {
            Ok(v) => self.satisfies(&v),
            Err(_) => false,
        }
    }

    /// Return the original range string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for VersionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for VersionRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Whether `range` is a syntactically valid range expression.
pub fn is_valid_range(range: &str) -> bool {
    VersionRange::parse(range).is_ok()
}

/// Parse a version leniently: surrounding whitespace and a leading `=` or `v`
/// are dropped, build metadata is discarded.
pub fn parse_version(version: &str) -> Result<Version> {
    let cleaned = version.trim().trim_start_matches('=').trim_start_matches('v');
    let mut parsed = Version::parse(cleaned).map_err(|source| Error::InvalidVersion {
        version: version.to_string(),
        source,
    })?;
    parsed.build = BuildMetadata::EMPTY;
    Ok(parsed)
}

/// The release after `version` at patch level, without prerelease tags.
///
/// `7.0.0-dev` becomes `7.0.1`.
pub fn next_patch(version: &Version) -> Version {
    Version::new(version.major, version.minor, version.patch.saturating_add(1))
}

/// Sort `(version, label)` pairs by descending semver precedence.
pub fn sort_descending<T>(versions: &mut [(Version, T)]) {
    versions.sort_by(|a, b| b.0.cmp(&a.0));
}

fn prerelease_allowed(set: &[Comparator], version: &Version) -> bool {
    if version.pre.is_empty() {
        return true;
    }
    set.iter().any(|c| {
        !c.version.pre.is_empty()
            && c.version.major == version.major
            && c.version.minor == version.minor
            && c.version.patch == version.patch
    })
}

fn parse_set(set: &str) -> std::result::Result<Vec<Comparator>, String> {
    if set.is_empty() {
        return Ok(Vec::new());
    }

    if let Some((low, high)) = split_hyphen(set) {
        return hyphen_range(low, high);
    }

    let mut comparators = Vec::new();
    let mut tokens = set.split_whitespace();
    while let Some(token) = tokens.next() {
        // Allow a space between operator and version: `>= 1.2.3`
        let token = if is_bare_operator(token) {
            let next = tokens
                .next()
                .ok_or_else(|| format!("operator '{token}' without a version"))?;
            format!("{token}{next}")
        } else {
            token.to_string()
        };
        let (op, rest) = split_operator(&token);
        let partial = parse_partial(rest)?;
        comparators.extend(desugar(op, &partial));
    }
    Ok(comparators)
}

fn split_hyphen(set: &str) -> Option<(&str, &str)> {
    let (low, high) = set.split_once(" - ")?;
    let (low, high) = (low.trim(), high.trim());
    if low.contains(char::is_whitespace) || high.contains(char::is_whitespace) {
        return None;
    }
    Some((low, high))
}

fn is_bare_operator(token: &str) -> bool {
    matches!(token, ">=" | "<=" | ">" | "<" | "=" | "~" | "~>" | "^")
}

fn split_operator(token: &str) -> (RangeOp, &str) {
    const OPERATORS: [(&str, RangeOp); 8] = [
        ("~>", RangeOp::Tilde),
        (">=", RangeOp::Gte),
        ("<=", RangeOp::Lte),
        (">", RangeOp::Gt),
        ("<", RangeOp::Lt),
        ("=", RangeOp::Exact),
        ("~", RangeOp::Tilde),
        ("^", RangeOp::Caret),
    ];
    for (prefix, op) in OPERATORS {
        if let Some(rest) = token.strip_prefix(prefix) {
            return (op, rest);
        }
    }
    (RangeOp::Exact, token)
}

fn parse_partial(s: &str) -> std::result::Result<Partial, String> {
    let s = s.trim().trim_start_matches('=').trim_start_matches('v');
    if s.is_empty() {
        return Err("missing version".to_string());
    }

    let s = s.split_once('+').map_or(s, |(core, _build)| core);
    let (core, pre) = match s.split_once('-') {
        Some((core, pre)) => (
            core,
            Prerelease::new(pre).map_err(|e| format!("invalid prerelease '{pre}': {e}"))?,
        ),
        None => (s, Prerelease::EMPTY),
    };

    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3 {
        return Err(format!("too many version components in '{s}'"));
    }

    let mut numbers = [None; 3];
    let mut wildcard = false;
    for (slot, part) in numbers.iter_mut().zip(parts.iter()) {
        if matches!(*part, "x" | "X" | "*") {
            wildcard = true;
            continue;
        }
        let n: u64 = part
            .parse()
            .map_err(|_| format!("invalid version component '{part}' in '{s}'"))?;
        if n > MAX_COMPONENT {
            return Err(format!("version component '{part}' is too large in '{s}'"));
        }
        if !wildcard {
            *slot = Some(n);
        }
    }

    let [major, minor, patch] = numbers;
    if !pre.is_empty() && patch.is_none() {
        return Err(format!("prerelease on a partial version '{s}'"));
    }

    Ok(Partial {
        major,
        minor,
        patch,
        pre,
    })
}

/// `M.m.p-0`: the lowest possible version of `M.m.p`, below all prereleases.
fn lowest(major: u64, minor: u64, patch: u64) -> Version {
    let mut v = Version::new(major, minor, patch);
    v.pre = Prerelease::new("0").unwrap_or(Prerelease::EMPTY);
    v
}

fn matches_nothing() -> Vec<Comparator> {
    vec![Comparator::new(CompareOp::Lt, lowest(0, 0, 0))]
}

fn desugar(op: RangeOp, p: &Partial) -> Vec<Comparator> {
    let Some(major) = p.major else {
        return match op {
            RangeOp::Gt | RangeOp::Lt => matches_nothing(),
            _ => Vec::new(),
        };
    };

    match (op, p.minor, p.patch) {
        (RangeOp::Exact, Some(_), Some(_)) => vec![Comparator::new(CompareOp::Eq, p.floor())],
        (RangeOp::Exact, Some(minor), None) | (RangeOp::Tilde, Some(minor), None) => vec![
            Comparator::new(CompareOp::Gte, p.floor()),
            Comparator::new(CompareOp::Lt, lowest(major, minor + 1, 0)),
        ],
        (RangeOp::Exact | RangeOp::Tilde | RangeOp::Caret, None, _) => vec![
            Comparator::new(CompareOp::Gte, p.floor()),
            Comparator::new(CompareOp::Lt, lowest(major + 1, 0, 0)),
        ],
        (RangeOp::Tilde, Some(minor), Some(_)) => vec![
            Comparator::new(CompareOp::Gte, p.floor()),
            Comparator::new(CompareOp::Lt, lowest(major, minor + 1, 0)),
        ],
        (RangeOp::Caret, Some(minor), patch) => {
            let upper = if major > 0 {
                lowest(major + 1, 0, 0)
            } else if minor > 0 || patch.is_none() {
                lowest(0, minor + 1, 0)
            } else {
                lowest(0, 0, patch.unwrap_or(0) + 1)
            };
            vec![Comparator::new(CompareOp::Gte, p.floor()), Comparator::new(CompareOp::Lt, upper)]
        }
        (RangeOp::Gte, _, _) => vec![Comparator::new(CompareOp::Gte, p.floor())],
        (RangeOp::Gt, Some(_), Some(_)) => vec![Comparator::new(CompareOp::Gt, p.floor())],
        (RangeOp::Gt, Some(minor), None) => {
            vec![Comparator::new(CompareOp::Gte, Version::new(major, minor + 1, 0))]
        }
        (RangeOp::Gt, None, _) => vec![Comparator::new(CompareOp::Gte, Version::new(major + 1, 0, 0))],
        (RangeOp::Lt, Some(_), Some(_)) => vec![Comparator::new(CompareOp::Lt, p.floor())],
        (RangeOp::Lt, minor, _) => {
            vec![Comparator::new(CompareOp::Lt, lowest(major, minor.unwrap_or(0), 0))]
        }
        (RangeOp::Lte, Some(_), Some(_)) => vec![Comparator::new(CompareOp::Lte, p.floor())],
        (RangeOp::Lte, Some(minor), None) => vec![Comparator::new(CompareOp::Lt, lowest(major, minor + 1, 0))],
        (RangeOp::Lte, None, _) => vec![Comparator::new(CompareOp::Lt, lowest(major + 1, 0, 0))],
    }
}

fn hyphen_range(low: &str, high: &str) -> std::result::Result<Vec<Comparator>, String> {
    let low = parse_partial(low)?;
    let high = parse_partial(high)?;
    let mut comparators = Vec::new();

    if low.major.is_some() {
        comparators.push(Comparator::new(CompareOp::Gte, low.floor()));
    }
    match (high.major, high.minor, high.patch) {
        (None, _, _) => {}
        (Some(major), None, _) => {
            comparators.push(Comparator::new(CompareOp::Lt, lowest(major + 1, 0, 0)))
        }
        (Some(major), Some(minor), None) => {
            comparators.push(Comparator::new(CompareOp::Lt, lowest(major, minor + 1, 0)))
        }
        (Some(_), Some(_), Some(_)) => {
            comparators.push(Comparator::new(CompareOp::Lte, high.floor()))
        }
    }
    Ok(comparators)
}
