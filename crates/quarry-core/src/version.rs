//! Maven version parsing, comparison, and constraint matching.
//!
//! Maven versions use a custom ordering that differs from semver:
//! - Segments are split on `.` and `-`
//! - Numeric segments compare as numbers
//! - String qualifiers have a special ordering:
//!   `alpha` < `beta` < `milestone` < `rc` < `snapshot` < `""` (release) < `sp`
//! - SNAPSHOT versions sort before their release equivalent
//!
//! A [`VersionConstraint`] is either a pinned version (`1.0`) or a union of
//! ranges (`[1.0,2.0),[3.0,)`).

use std::cmp::Ordering;
use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// A version or range string that cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("Invalid version specification {spec:?}: {reason}")]
#[diagnostic(help("Ranges look like [1.0,2.0), (,1.5] or [1.2]"))]
pub struct VersionSpecError {
    pub spec: String,
    pub reason: String,
}

impl VersionSpecError {
    fn new(spec: &str, reason: impl Into<String>) -> Self {
        Self {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}

/// A parsed Maven version with comparable segments.
#[derive(Debug, Clone)]
pub struct Version {
    pub original: String,
    segments: Vec<Segment>,
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    Numeric(u64),
    Qualifier(QualifierKind),
    Text(String),
}

/// Well-known Maven qualifiers with defined ordering.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
enum QualifierKind {
    Alpha,
    Beta,
    Milestone,
    Rc,
    Snapshot,
    Release,
    Sp,
}

impl Version {
    pub fn parse(version: &str) -> Self {
        let version = version.trim();
        Self {
            original: version.to_string(),
            segments: parse_segments(version),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }

    pub fn is_snapshot(&self) -> bool {
        self.original.ends_with("-SNAPSHOT")
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let max_len = self.segments.len().max(other.segments.len());
        for i in 0..max_len {
            let ord = compare_segments(self.segments.get(i), other.segments.get(i));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_segments(a: Option<&Segment>, b: Option<&Segment>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(s), None) => compare_segment_to_empty(s),
        (None, Some(s)) => compare_segment_to_empty(s).reverse(),
        (Some(a), Some(b)) => compare_two_segments(a, b),
    }
}

fn compare_segment_to_empty(seg: &Segment) -> Ordering {
    match seg {
        Segment::Numeric(0) => Ordering::Equal,
        Segment::Numeric(_) => Ordering::Greater,
        Segment::Qualifier(q) => q.cmp(&QualifierKind::Release),
        Segment::Text(s) if s.is_empty() => Ordering::Equal,
        Segment::Text(_) => Ordering::Less,
    }
}

fn compare_two_segments(a: &Segment, b: &Segment) -> Ordering {
    match (a, b) {
        (Segment::Numeric(a), Segment::Numeric(b)) => a.cmp(b),
        (Segment::Qualifier(a), Segment::Qualifier(b)) => a.cmp(b),
        (Segment::Numeric(_), Segment::Qualifier(_)) => Ordering::Greater,
        (Segment::Qualifier(_), Segment::Numeric(_)) => Ordering::Less,
        (Segment::Numeric(_), Segment::Text(_)) => Ordering::Greater,
        (Segment::Text(_), Segment::Numeric(_)) => Ordering::Less,
        (Segment::Text(a), Segment::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Segment::Qualifier(q), Segment::Text(_)) => {
            if *q >= QualifierKind::Release {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (Segment::Text(_), Segment::Qualifier(q)) => {
            if *q >= QualifierKind::Release {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
    }
}

fn parse_segments(version: &str) -> Vec<Segment> {
    version
        .split(['.', '-'])
        .filter(|token| !token.is_empty())
        .map(classify)
        .collect()
}

fn classify(token: &str) -> Segment {
    if let Ok(n) = token.parse::<u64>() {
        return Segment::Numeric(n);
    }
    match token.to_lowercase().as_str() {
        "alpha" | "a" => Segment::Qualifier(QualifierKind::Alpha),
        "beta" | "b" => Segment::Qualifier(QualifierKind::Beta),
        "milestone" | "m" => Segment::Qualifier(QualifierKind::Milestone),
        "rc" | "cr" => Segment::Qualifier(QualifierKind::Rc),
        "snapshot" => Segment::Qualifier(QualifierKind::Snapshot),
        "" | "ga" | "final" | "release" => Segment::Qualifier(QualifierKind::Release),
        "sp" => Segment::Qualifier(QualifierKind::Sp),
        _ => Segment::Text(token.to_string()),
    }
}

/// Whether a declared version uses range syntax.
pub fn is_range(spec: &str) -> bool {
    let s = spec.trim();
    s.starts_with('[') || s.starts_with('(')
}

/// A single interval of versions.
///
/// Supports: `[1.0,2.0)`, `[1.0,]`, `(,2.0)`, `[1.0]` (exact).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

impl VersionRange {
    /// Parse one bracketed range expression.
    pub fn parse(spec: &str) -> Result<Self, VersionSpecError> {
        let s = spec.trim();
        let lower_inclusive = match s.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(VersionSpecError::new(spec, "range must start with [ or (")),
        };
        let upper_inclusive = match s.chars().last() {
            Some(']') if s.len() > 1 => true,
            Some(')') if s.len() > 1 => false,
            _ => return Err(VersionSpecError::new(spec, "range must end with ] or )")),
        };
        let inner = &s[1..s.len() - 1];

        let Some((lower, upper)) = inner.split_once(',') else {
            // Exact version: [1.0] means exactly 1.0
            if !lower_inclusive || !upper_inclusive {
                return Err(VersionSpecError::new(
                    spec,
                    "a single version must be surrounded by []",
                ));
            }
            let exact = inner.trim();
            if exact.is_empty() {
                return Err(VersionSpecError::new(spec, "empty range"));
            }
            let v = Version::parse(exact);
            return Ok(VersionRange {
                lower: Some(Bound {
                    version: v.clone(),
                    inclusive: true,
                }),
                upper: Some(Bound {
                    version: v,
                    inclusive: true,
                }),
            });
        };

        if upper.contains(',') {
            return Err(VersionSpecError::new(spec, "ill-formed range"));
        }
        let bound = |text: &str, inclusive: bool| {
            let text = text.trim();
            (!text.is_empty()).then(|| Bound {
                version: Version::parse(text),
                inclusive,
            })
        };
        let range = VersionRange {
            lower: bound(lower, lower_inclusive),
            upper: bound(upper, upper_inclusive),
        };
        if let (Some(lo), Some(hi)) = (&range.lower, &range.upper) {
            if hi.version < lo.version {
                return Err(VersionSpecError::new(spec, "range defies version ordering"));
            }
        }
        Ok(range)
    }

    /// Check if a version satisfies this range.
    pub fn contains(&self, version: &Version) -> bool {
        if let Some(ref lower) = self.lower {
            let cmp = version.cmp(&lower.version);
            if lower.inclusive {
                if cmp == Ordering::Less {
                    return false;
                }
            } else if cmp != Ordering::Greater {
                return false;
            }
        }
        if let Some(ref upper) = self.upper {
            let cmp = version.cmp(&upper.version);
            if upper.inclusive {
                if cmp == Ordering::Greater {
                    return false;
                }
            } else if cmp != Ordering::Less {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(lo), Some(hi)) = (&self.lower, &self.upper) {
            if lo.inclusive && hi.inclusive && lo.version == hi.version {
                return write!(f, "[{}]", lo.version);
            }
        }
        match &self.lower {
            Some(lo) => write!(f, "{}{}", if lo.inclusive { '[' } else { '(' }, lo.version)?,
            None => write!(f, "(")?,
        }
        write!(f, ",")?;
        match &self.upper {
            Some(hi) => write!(f, "{}{}", hi.version, if hi.inclusive { ']' } else { ')' }),
            None => write!(f, ")"),
        }
    }
}

/// A declared version requirement: a union of ranges or a single pinned version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    pub ranges: Vec<VersionRange>,
    /// Set when no range was declared.
    pub version: Option<Version>,
}

impl VersionConstraint {
    /// Parse `1.0`, `[1.0,2.0)` or a comma separated union such as `[1,2),[3,4]`.
    pub fn parse(spec: &str) -> Result<Self, VersionSpecError> {
        let mut rest = spec.trim();
        let mut ranges = Vec::new();

        while rest.starts_with('[') || rest.starts_with('(') {
            let close = rest.find([')', ']']).ok_or_else(|| {
                VersionSpecError::new(spec, "unbounded version range")
            })?;
            ranges.push(VersionRange::parse(&rest[..=close])?);
            rest = rest[close + 1..].trim();
            if let Some(stripped) = rest.strip_prefix(',') {
                rest = stripped.trim();
            }
        }

        if !ranges.is_empty() {
            if !rest.is_empty() {
                return Err(VersionSpecError::new(
                    spec,
                    format!("expected [ or ( but got {rest:?}"),
                ));
            }
            return Ok(Self {
                ranges,
                version: None,
            });
        }
        if rest.is_empty() {
            return Err(VersionSpecError::new(spec, "empty version"));
        }
        if rest.contains([']', ')', ',']) {
            return Err(VersionSpecError::new(spec, "unbalanced range brackets"));
        }
        Ok(Self::exact(Version::parse(rest)))
    }

    /// A constraint pinned to one version.
    pub fn exact(version: Version) -> Self {
        Self {
            ranges: Vec::new(),
            version: Some(version),
        }
    }

    pub fn is_range(&self) -> bool {
        !self.ranges.is_empty()
    }

    pub fn contains_version(&self, version: &Version) -> bool {
        if self.ranges.is_empty() {
            return self.version.as_ref() == Some(version);
        }
        self.ranges.iter().any(|r| r.contains(version))
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ranges.is_empty() {
            return match &self.version {
                Some(v) => write!(f, "{v}"),
                None => Ok(()),
            };
        }
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{range}")?;
        }
        Ok(())
    }
}
