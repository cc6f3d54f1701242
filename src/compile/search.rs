//! Finds template delimiters in the source.

/// A delimiter kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    BeginExpr,
    EndExpr,
    BeginExprTrim,
    EndExprTrim,
    BeginBlock,
    EndBlock,
    BeginBlockTrim,
    EndBlockTrim,
    BeginComment,
    EndComment,
    BeginCommentTrim,
    EndCommentTrim,
}

/// All delimiters, longest first so that trimmed variants win over their
/// plain counterparts at the same position.
const PATTERNS: &[(Kind, &str)] = &[
    (Kind::BeginExprTrim, "{{-"),
    (Kind::EndExprTrim, "-}}"),
    (Kind::BeginBlockTrim, "{%-"),
    (Kind::EndBlockTrim, "-%}"),
    (Kind::BeginCommentTrim, "{#-"),
    (Kind::EndCommentTrim, "-#}"),
    (Kind::BeginExpr, "{{"),
    (Kind::EndExpr, "}}"),
    (Kind::BeginBlock, "{%"),
    (Kind::EndBlock, "%}"),
    (Kind::BeginComment, "{#"),
    (Kind::EndComment, "#}"),
];

/// Returns the first delimiter at or after `at` with its start and end.
pub fn find_at(haystack: &str, at: usize) -> Option<(Kind, usize, usize)> {
    let bytes = haystack.as_bytes();
    (at..bytes.len())
        .filter(|&i| matches!(bytes[i], b'{' | b'}' | b'%' | b'#' | b'-'))
        .find_map(|i| starts_with(haystack, i).map(|(kind, j)| (kind, i, j)))
}

/// Returns the delimiter that starts exactly at `at` and its end.
pub fn starts_with(haystack: &str, at: usize) -> Option<(Kind, usize)> {
    let rest = haystack.as_bytes().get(at..)?;
    PATTERNS
        .iter()
        .find(|(_, pat)| rest.starts_with(pat.as_bytes()))
        .map(|(kind, pat)| (*kind, at + pat.len()))
}
