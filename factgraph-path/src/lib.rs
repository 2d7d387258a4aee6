//! Paths identify facts within a fact graph.
//!
//! A path is a sequence of segments, absolute (`"/filers/#f1/tin"`) or
//! relative (`"../spouse/tin"`). Four segment forms exist:
//!
//! ```plaintext
//! /returns/*/dependents/#a3f9/age
//! └─┬────┘ │ └───┬────┘ └┬──┘ └┬┘
//!  child   │   child   member child
//!       wildcard
//! ```
//!
//! - a **named child**, stepping into a fact or collection
//! - `..`, stepping to the parent
//! - `*`, a **wildcard** standing for every member of a collection
//! - `#<id>`, a single collection **member**
//!
//! A path containing a wildcard is *abstract*: it is a template which
//! [`populate`](Path::populate) expands into one concrete path per member
//! combination. A fully resolved path with no wildcards and no `..` is
//! *concrete* and names exactly one fact.
//!
//! ```rust
//! # use factgraph_path::Path;
//! let path: Path = "/returns/*/agi".parse().unwrap();
//! assert!(path.is_abstract());
//!
//! let relative: Path = "../spouse/tin".parse().unwrap();
//! let base: Path = "/filers/#f1/tin".parse().unwrap();
//! let resolved = relative.resolve(&base.parent().unwrap()).unwrap();
//! assert_eq!(resolved.to_string(), "/filers/spouse/tin");
//! ```

#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::return_self_not_must_use
)]

pub mod error;
pub use error::PathError;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Write};
use std::str::FromStr;

/// Identifier of a single collection member.
///
/// Ids are opaque to the engine; callers supply them (commonly UUIDs). Only
/// `[A-Za-z0-9_-]` is accepted so that ids embed losslessly in rendered
/// paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(String);

impl MemberId {
    /// Validates and constructs a `MemberId`.
    ///
    /// # Errors
    /// Returns [`PathError::InvalidMemberId`] if `id` is empty or contains a
    /// character outside of `[A-Za-z0-9_-]`.
    pub fn new(id: impl Into<String>) -> Result<Self, PathError> {
        let id = id.into();
        if id.is_empty() || !id.chars().all(is_name_char) {
            return Err(PathError::InvalidMemberId { id });
        }
        Ok(Self(id))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MemberId {
    type Err = PathError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// A single step within a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A named child fact.
    Child(String),
    /// `..`
    Parent,
    /// `*`, standing for every member of the enclosing collection.
    Wildcard,
    /// `#<id>`, one member of the enclosing collection.
    Member(MemberId),
}

impl Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Child(name) => f.write_str(name),
            Segment::Parent => f.write_str(".."),
            Segment::Wildcard => f.write_char('*'),
            Segment::Member(id) => write!(f, "#{id}"),
        }
    }
}

/// An absolute or relative fact path.
///
/// Equality, ordering and hashing are structural; two paths compare equal
/// iff they render identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    absolute: bool,
    segments: Vec<Segment>,
}

impl Path {
    /// The absolute root path, `"/"`.
    pub fn root() -> Self {
        Self {
            absolute: true,
            segments: Vec::new(),
        }
    }

    /// Parses `input`.
    ///
    /// Accepts absolute paths beginning with `/`, relative paths built from
    /// `.`, `..` and named segments, wildcards `*`, and members `#<id>`.
    /// The result is normalized: `.` is dropped and `..` is folded into any
    /// preceding segment.
    ///
    /// # Errors
    /// Returns a [`PathError`] for empty input, empty or malformed segments,
    /// or a `..` that would step above the root.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        if input.is_empty() {
            return Err(PathError::Empty);
        }
        let (absolute, rest) = match input.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, input),
        };
        let mut segments = Vec::new();
        if !rest.is_empty() {
            let mut offset = usize::from(absolute);
            for raw in rest.split('/') {
                let segment = match raw {
                    "" => {
                        return Err(PathError::EmptySegment {
                            path: input.to_string(),
                            offset,
                        })
                    }
                    "." => {
                        offset += raw.len() + 1;
                        continue;
                    }
                    ".." => Segment::Parent,
                    "*" => Segment::Wildcard,
                    _ => {
                        if let Some(id) = raw.strip_prefix('#') {
                            Segment::Member(MemberId::new(id)?)
                        } else {
                            parse_child(raw)?
                        }
                    }
                };
                segments.push(segment);
                offset += raw.len() + 1;
            }
        }
        Self { absolute, segments }.normalized()
    }

    /// Folds `..` segments into their preceding segments.
    ///
    /// Relative paths may retain leading `..`s; absolute paths may not.
    fn normalized(self) -> Result<Self, PathError> {
        let Self { absolute, segments } = self;
        let mut folded: Vec<Segment> = Vec::with_capacity(segments.len());
        for segment in segments {
            match segment {
                Segment::Parent => {
                    let absorbable =
                        matches!(folded.last(), Some(s) if !matches!(s, Segment::Parent));
                    if absorbable {
                        folded.pop();
                    } else if absolute {
                        return Err(PathError::EscapesRoot {
                            path: render(absolute, &folded) + "/..",
                        });
                    } else {
                        folded.push(Segment::Parent);
                    }
                }
                other => folded.push(other),
            }
        }
        Ok(Self {
            absolute,
            segments: folded,
        })
    }

    /// Whether the path begins at the root.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Whether the path contains a wildcard segment.
    pub fn is_abstract(&self) -> bool {
        self.segments.contains(&Segment::Wildcard)
    }

    /// Whether the path names exactly one fact: absolute, no wildcards, no
    /// unresolved `..`.
    pub fn is_concrete(&self) -> bool {
        self.absolute
            && !self
                .segments
                .iter()
                .any(|s| matches!(s, Segment::Wildcard | Segment::Parent))
    }

    /// The path's segments, in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The final segment, if any.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// The number of wildcard segments.
    pub fn wildcard_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Wildcard))
            .count()
    }

    /// The enclosing path, or `None` for the root and for empty relative
    /// paths.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self {
            absolute: self.absolute,
            segments,
        })
    }

    /// Appends a named child segment.
    ///
    /// # Errors
    /// Returns [`PathError::InvalidChar`] if `name` is not a valid segment
    /// name.
    pub fn child(&self, name: &str) -> Result<Self, PathError> {
        let segment = parse_child(name)?;
        Ok(self.with(segment))
    }

    /// Appends a member segment.
    pub fn member(&self, id: MemberId) -> Self {
        self.with(Segment::Member(id))
    }

    /// Appends a wildcard segment.
    pub fn wildcard(&self) -> Self {
        self.with(Segment::Wildcard)
    }

    fn with(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self {
            absolute: self.absolute,
            segments,
        }
    }

    /// Resolves `self` against an absolute `base`.
    ///
    /// Absolute paths resolve to themselves; relative paths are appended to
    /// `base` and normalized.
    ///
    /// # Errors
    /// Returns [`PathError::RelativeBase`] if `base` is relative, or
    /// [`PathError::EscapesRoot`] if the combined path steps above the root.
    pub fn resolve(&self, base: &Path) -> Result<Self, PathError> {
        if self.absolute {
            return Ok(self.clone());
        }
        if !base.absolute {
            return Err(PathError::RelativeBase {
                base: base.to_string(),
            });
        }
        let mut segments = base.segments.clone();
        segments.extend(self.segments.iter().cloned());
        Self {
            absolute: true,
            segments,
        }
        .normalized()
    }

    /// Replaces every member segment with a wildcard, producing the abstract
    /// template this path instantiates.
    pub fn to_abstract(&self) -> Self {
        Self {
            absolute: self.absolute,
            segments: self
                .segments
                .iter()
                .map(|s| match s {
                    Segment::Member(_) => Segment::Wildcard,
                    other => other.clone(),
                })
                .collect(),
        }
    }

    /// Whether `self` starts with every segment of `prefix`.
    ///
    /// Both paths must agree on absoluteness for a prefix match.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.absolute == prefix.absolute
            && self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// Expands each wildcard, in order, with the corresponding member list,
    /// producing the Cartesian enumeration of concrete paths.
    ///
    /// `lists[i]` supplies the members for the `i`-th wildcard. An empty
    /// list yields an empty enumeration.
    ///
    /// # Errors
    /// Returns [`PathError::PopulationMismatch`] if the number of lists does
    /// not equal the number of wildcards.
    pub fn populate(&self, lists: &[Vec<MemberId>]) -> Result<Vec<Path>, PathError> {
        let wildcards = self.wildcard_count();
        if wildcards != lists.len() {
            return Err(PathError::PopulationMismatch {
                wildcards,
                lists: lists.len(),
            });
        }
        let mut expanded = vec![Path {
            absolute: self.absolute,
            segments: Vec::with_capacity(self.segments.len()),
        }];
        let mut next_list = 0;
        for segment in &self.segments {
            if matches!(segment, Segment::Wildcard) {
                let members = &lists[next_list];
                next_list += 1;
                expanded = expanded
                    .into_iter()
                    .flat_map(|prefix| {
                        members
                            .iter()
                            .map(move |id| prefix.clone().pushed(Segment::Member(id.clone())))
                    })
                    .collect();
            } else {
                for path in &mut expanded {
                    path.segments.push(segment.clone());
                }
            }
        }
        Ok(expanded)
    }

    fn pushed(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }
}

fn parse_child(name: &str) -> Result<Segment, PathError> {
    if name.is_empty() {
        return Err(PathError::InvalidChar {
            segment: name.to_string(),
            character: '/',
        });
    }
    if let Some(character) = name.chars().find(|c| !is_name_char(*c)) {
        return Err(PathError::InvalidChar {
            segment: name.to_string(),
            character,
        });
    }
    Ok(Segment::Child(name.to_string()))
}

fn render(absolute: bool, segments: &[Segment]) -> String {
    if segments.is_empty() {
        return if absolute { "/".to_string() } else { ".".to_string() };
    }
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if absolute || i > 0 {
            out.push('/');
        }
        let _ = write!(out, "{segment}");
    }
    out
}

impl Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self.absolute, &self.segments))
    }
}

impl FromStr for Path {
    type Err = PathError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> Path {
        s.parse().unwrap()
    }

    fn member(s: &str) -> MemberId {
        MemberId::new(s).unwrap()
    }

    #[test]
    fn test_parse_roundtrip() {
        let tests = [
            ("/", "/"),
            ("/income", "/income"),
            ("/filers/#f1/tin", "/filers/#f1/tin"),
            ("/returns/*/agi", "/returns/*/agi"),
            ("/a/./b", "/a/b"),
            ("/a/b/..", "/a"),
            ("/a/b/../c", "/a/c"),
            ("..", ".."),
            ("../../x", "../../x"),
            ("a/b", "a/b"),
            (".", "."),
            ("/exp/*", "/exp/*"),
        ];
        for (input, expected) in tests {
            let parsed = path(input);
            assert_eq!(
                parsed.to_string(),
                expected,
                "\ninput:\t\t{input:?}\nexpected:\t{expected:?}\nresult:\t\t{parsed}\n"
            );
        }
    }

    #[test]
    fn test_parse_errors() {
        let tests = [
            ("", PathError::Empty),
            (
                "/a/../..",
                PathError::EscapesRoot {
                    path: "//..".to_string(),
                },
            ),
        ];
        for (input, _expected) in tests {
            assert!(Path::parse(input).is_err(), "expected error for {input:?}");
        }
        assert!(Path::parse("/a//b").is_err());
        assert!(Path::parse("/a b").is_err());
        assert!(Path::parse("/a/#").is_err());
        assert!(Path::parse("/a/#x y").is_err());
    }

    #[test]
    fn test_classification() {
        assert!(path("/a/*/b").is_abstract());
        assert!(!path("/a/#m/b").is_abstract());
        assert!(path("/a/#m/b").is_concrete());
        assert!(!path("../a").is_concrete());
        assert!(!path("/a/*").is_concrete());
        assert!(path("/").is_absolute());
        assert!(!path("a").is_absolute());
    }

    #[test]
    fn test_resolve() {
        let tests = [
            ("../spouse/tin", "/filers/#f1", "/filers/spouse/tin"),
            ("amount", "/exp/#a", "/exp/#a/amount"),
            ("/absolute", "/exp/#a", "/absolute"),
            ("..", "/a/b", "/a"),
        ];
        for (rel, base, expected) in tests {
            let resolved = path(rel).resolve(&path(base)).unwrap();
            assert_eq!(resolved.to_string(), expected);
        }
        assert!(matches!(
            path("..").resolve(&path("/")),
            Err(PathError::EscapesRoot { .. })
        ));
        assert!(matches!(
            path("a").resolve(&path("b")),
            Err(PathError::RelativeBase { .. })
        ));
    }

    #[test]
    fn test_to_abstract() {
        assert_eq!(path("/exp/#a/amount").to_abstract(), path("/exp/*/amount"));
        assert_eq!(path("/x/y").to_abstract(), path("/x/y"));
    }

    #[test]
    fn test_parent_and_builders() {
        assert_eq!(path("/a/b").parent().unwrap(), path("/a"));
        assert_eq!(path("/a").parent().unwrap(), Path::root());
        assert!(Path::root().parent().is_none());
        let built = Path::root()
            .child("exp")
            .unwrap()
            .member(member("a"))
            .child("amount")
            .unwrap();
        assert_eq!(built, path("/exp/#a/amount"));
        assert!(Path::root().child("bad name").is_err());
    }

    #[test]
    fn test_starts_with() {
        assert!(path("/exp/#a/amount").starts_with(&path("/exp/#a")));
        assert!(path("/exp/#a").starts_with(&path("/exp/#a")));
        assert!(!path("/exp/#a").starts_with(&path("/exp/#b")));
        assert!(!path("/expenses").starts_with(&path("/exp")));
    }

    #[test]
    fn test_populate() {
        let p = path("/exp/*/amount");
        let out = p.populate(&[vec![member("a"), member("b")]]).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].to_string(), "/exp/#a/amount");
        assert_eq!(out[1].to_string(), "/exp/#b/amount");

        // nested collections enumerate in Cartesian order
        let p = path("/a/*/b/*");
        let out = p
            .populate(&[vec![member("x"), member("y")], vec![member("m")]])
            .unwrap();
        let rendered: Vec<String> = out.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["/a/#x/b/#m", "/a/#y/b/#m"]);

        // trailing wildcard is legal
        let p = path("/exp/*");
        let out = p.populate(&[vec![member("a")]]).unwrap();
        assert_eq!(out[0].to_string(), "/exp/#a");

        assert!(matches!(
            path("/exp/*/amount").populate(&[]),
            Err(PathError::PopulationMismatch { .. })
        ));
    }

    #[test]
    fn test_populate_empty_list() {
        let out = path("/exp/*/amount").populate(&[vec![]]).unwrap();
        assert!(out.is_empty());
    }
}
