use thiserror::Error;

/// An error produced while parsing or manipulating a [`Path`](crate::Path).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The input was empty.
    #[error("path is empty")]
    Empty,

    /// A segment between two separators was empty (e.g. `"/a//b"`).
    #[error("empty segment at offset {offset} in \"{path}\"")]
    EmptySegment {
        /// The offending input.
        path: String,
        /// Byte offset of the empty segment.
        offset: usize,
    },

    /// A named segment contained a character outside of `[A-Za-z0-9_-]`.
    #[error("invalid character {character:?} in segment \"{segment}\"")]
    InvalidChar {
        /// The offending segment.
        segment: String,
        /// The character which caused the error.
        character: char,
    },

    /// A member id was empty or contained a character outside of
    /// `[A-Za-z0-9_-]`.
    #[error("invalid member id \"{id}\"")]
    InvalidMemberId {
        /// The offending id.
        id: String,
    },

    /// Normalization of an absolute path stepped above the root
    /// (e.g. `"/a/../../b"`).
    #[error("path \"{path}\" escapes above the root")]
    EscapesRoot {
        /// The offending path.
        path: String,
    },

    /// A relative path was resolved against a base which is itself relative.
    #[error("cannot resolve against relative base \"{base}\"")]
    RelativeBase {
        /// The offending base path.
        base: String,
    },

    /// [`Path::populate`](crate::Path::populate) was given a number of member
    /// lists different from the number of wildcards in the path.
    #[error("path has {wildcards} wildcard(s) but {lists} member list(s) were supplied")]
    PopulationMismatch {
        /// Wildcards present in the path.
        wildcards: usize,
        /// Member lists supplied by the caller.
        lists: usize,
    },
}
