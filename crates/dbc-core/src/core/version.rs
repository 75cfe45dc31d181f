use crate::core::error::{DbcError, DbcResult};
use semver::{Comparator, Op, Prerelease, Version, VersionReq};
use std::fmt;
use std::str::FromStr;

/// Characters that begin a constraint. Driver names may not contain them.
const OPERATOR_CHARS: &[char] = &['<', '>', '=', '~', '^', '!', ',', '|', '*'];

/// A version constraint on a driver, e.g. `>=1.0.0, <2.0.0` or `1.2 || ^2`.
///
/// A bare version (`1.8.0`) pins exactly that version. Whitespace and commas
/// both separate comparators; `||` separates alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConstraint {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl DriverConstraint {
    pub fn parse(input: &str) -> DbcResult<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(DbcError::Version(
                "Invalid version constraint '': empty".to_string(),
            ));
        }

        let alternatives = raw
            .split("||")
            .map(|alt| {
                let normalized = normalize_comparators(alt);
                VersionReq::parse(&normalized).map_err(|e| {
                    DbcError::Version(format!("Invalid version constraint '{}': {}", raw, e))
                })
            })
            .collect::<DbcResult<Vec<_>>>()?;

        Ok(Self {
            raw: raw.to_string(),
            alternatives,
        })
    }

    /// Constraint matching exactly one version
    pub fn exact(version: &Version) -> DbcResult<Self> {
        let mut pinned = format!("={}.{}.{}", version.major, version.minor, version.patch);
        if !version.pre.is_empty() {
            pinned.push('-');
            pinned.push_str(version.pre.as_str());
        }
        Self::parse(&pinned)
    }

    /// Check a version against the constraint.
    ///
    /// Prereleases only match when `allow_prerelease` is set (or when a
    /// comparator names that exact prerelease); an allowed prerelease matches
    /// when it falls inside every comparator's range by semver ordering.
    pub fn matches(&self, version: &Version, allow_prerelease: bool) -> bool {
        self.alternatives.iter().any(|req| {
            req.matches(version)
                || (allow_prerelease
                    && !version.pre.is_empty()
                    && req.comparators.iter().all(|c| comparator_contains(c, version)))
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for DriverConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DriverConstraint {
    type Err = DbcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse a version the way registries write them: `v1.2`, `1.0` and `2` are
/// accepted and padded with zeros; prerelease and build suffixes are kept.
pub fn parse_loose_version(input: &str) -> DbcResult<Version> {
    let trimmed = input.trim();
    let unprefixed = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
    let split_at = unprefixed.find(['-', '+']).unwrap_or(unprefixed.len());
    let (core, suffix) = unprefixed.split_at(split_at);

    let parts: Vec<&str> = core.split('.').collect();
    let numeric = parts
        .iter()
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    if parts.len() > 3 || !numeric {
        return Err(DbcError::Version(format!("Invalid version '{}'", input)));
    }

    let mut padded = parts.join(".");
    for _ in parts.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(suffix);

    Version::parse(&padded)
        .map_err(|e| DbcError::Version(format!("Invalid version '{}': {}", input, e)))
}

/// Split `name>=1.0` or `name >=1.0` into the driver name and its constraint.
pub fn parse_driver_constraint(input: &str) -> DbcResult<(String, Option<DriverConstraint>)> {
    let input = input.trim();
    let split_at = input
        .find(|c: char| OPERATOR_CHARS.contains(&c) || c.is_whitespace())
        .unwrap_or(input.len());

    let name = input[..split_at].trim();
    if name.is_empty() {
        return Err(DbcError::Package(format!(
            "driver name missing in '{}'",
            input
        )));
    }

    let rest = input[split_at..].trim();
    let constraint = if rest.is_empty() {
        None
    } else {
        Some(DriverConstraint::parse(rest)?)
    };

    Ok((name.to_string(), constraint))
}

/// Turn `>= 1.0 <2` and `>=1.0, <2` alike into `>=1.0, <2`; bare versions become exact.
fn normalize_comparators(alt: &str) -> String {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_op = String::new();

    for token in alt.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        if token.chars().all(|c| OPERATOR_CHARS.contains(&c)) && token != "*" {
            pending_op.push_str(token);
            continue;
        }

        let mut comparator = std::mem::take(&mut pending_op);
        comparator.push_str(token);
        if comparator.starts_with("==") {
            comparator.remove(0);
        }
        let bare = comparator.starts_with(|c: char| c.is_ascii_digit())
            && !comparator.contains(['*', 'x', 'X']);
        if bare {
            comparator.insert(0, '=');
        }
        tokens.push(comparator);
    }

    if !pending_op.is_empty() {
        // A dangling operator is kept so the parser reports it.
        tokens.push(pending_op);
    }

    if tokens.is_empty() {
        "*".to_string()
    } else {
        tokens.join(", ")
    }
}

fn lower_bound(c: &Comparator) -> Version {
    Version {
        major: c.major,
        minor: c.minor.unwrap_or(0),
        patch: c.patch.unwrap_or(0),
        pre: c.pre.clone(),
        build: semver::BuildMetadata::EMPTY,
    }
}

/// Smallest version above every release of the given prefix, below its prereleases too.
fn exclusive_upper(major: u64, minor: u64, patch: u64) -> Version {
    let mut v = Version::new(major, minor, patch);
    v.pre = Prerelease::new("0").unwrap_or(Prerelease::EMPTY);
    v
}

/// Upper bound for a partial version: `1` -> `2.0.0-0`, `1.2` -> `1.3.0-0`
fn partial_upper(c: &Comparator) -> Option<Version> {
    match (c.minor, c.patch) {
        (None, _) => Some(exclusive_upper(c.major + 1, 0, 0)),
        (Some(minor), None) => Some(exclusive_upper(c.major, minor + 1, 0)),
        _ => None,
    }
}

fn comparator_contains(c: &Comparator, v: &Version) -> bool {
    let lower = lower_bound(c);
    match c.op {
        Op::Exact | Op::Wildcard => match partial_upper(c) {
            Some(upper) => *v >= lower && *v < upper,
            None => v.cmp_precedence(&lower).is_eq(),
        },
        Op::Greater => match partial_upper(c) {
            Some(upper) => *v >= upper,
            None => *v > lower,
        },
        Op::GreaterEq => *v >= lower,
        Op::Less => *v < lower,
        Op::LessEq => match partial_upper(c) {
            Some(upper) => *v < upper,
            None => *v <= lower,
        },
        Op::Tilde => {
            let upper = match c.minor {
                Some(minor) => exclusive_upper(c.major, minor + 1, 0),
                None => exclusive_upper(c.major + 1, 0, 0),
            };
            *v >= lower && *v < upper
        }
        Op::Caret => {
            let upper = match (c.major, c.minor, c.patch) {
                (0, None, _) => exclusive_upper(1, 0, 0),
                (0, Some(0), None) => exclusive_upper(0, 1, 0),
                (0, Some(0), Some(patch)) => exclusive_upper(0, 0, patch + 1),
                (0, Some(minor), _) => exclusive_upper(0, minor + 1, 0),
                (major, _, _) => exclusive_upper(major + 1, 0, 0),
            };
            *v >= lower && *v < upper
        }
        _ => false,
    }
}
