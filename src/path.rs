//! Container path resolution.
//!
//! A path handed to the layer may point *into* an archive, such as
//! `games/game.zip/disk1.adf`. The resolver scans such a path from the end
//! for a separator whose preceding component carries a container extension
//! and splits it into the container path (`games/game.zip`) and the member
//! name (`disk1.adf`).
//!
//! Both `/` and `\` are accepted as separators when splitting. Composite
//! paths produced by the layer use the platform's native separator.

use std::path::{MAIN_SEPARATOR, Path};

/// Extensions (lowercase, no dot) that mark a path component as a container.
pub const CONTAINER_EXTENSIONS: &[&str] = &["zip", "7z", "rar"];

/// A path split into a container and a member inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerPath<'a> {
    /// Path of the archive file itself.
    pub container: &'a str,
    /// Name of the member inside the archive. Never empty.
    pub member: &'a str,
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Returns the extension of the last path component, without the dot.
///
/// ```rust
/// use arcvfs::path::extension;
///
/// assert_eq!(extension("dir/disk.ADF"), Some("ADF"));
/// assert_eq!(extension("dir.d/README"), None);
/// ```
pub fn extension(path: &str) -> Option<&str> {
    let file_name = path.rsplit(is_separator).next().unwrap_or(path);
    let dot = file_name.rfind('.')?;
    Some(&file_name[dot + 1..])
}

/// Returns true if the component ends in one of the container extensions.
pub fn has_container_extension(component: &str) -> bool {
    CONTAINER_EXTENSIONS.iter().any(|ext| {
        let suffix_len = ext.len() + 1;
        component.len() >= suffix_len
            && component.is_char_boundary(component.len() - suffix_len)
            && component[component.len() - suffix_len..].starts_with('.')
            && component[component.len() - ext.len()..].eq_ignore_ascii_case(ext)
    })
}

/// Enumerates every plausible container split of `path`, rightmost first.
///
/// This is purely lexical; use [`locate_container`] to find the split whose
/// container exists on disk.
///
/// ```rust
/// use arcvfs::path::container_candidates;
///
/// let splits: Vec<_> = container_candidates("a.zip/b.7z/disk.adf").collect();
/// assert_eq!(splits[0].container, "a.zip/b.7z");
/// assert_eq!(splits[0].member, "disk.adf");
/// assert_eq!(splits[1].container, "a.zip");
/// assert_eq!(splits[1].member, "b.7z/disk.adf");
/// ```
pub fn container_candidates(path: &str) -> impl Iterator<Item = ContainerPath<'_>> {
    path.char_indices()
        .rev()
        .filter(|&(_, c)| is_separator(c))
        .filter_map(move |(i, _)| {
            let container = &path[..i];
            let member = &path[i + 1..];
            if container.is_empty() || member.is_empty() {
                return None;
            }
            let component = container.rsplit(is_separator).next().unwrap_or(container);
            has_container_extension(component).then_some(ContainerPath { container, member })
        })
}

/// Returns the first lexical container split of `path`, if any.
pub fn split_container_path(path: &str) -> Option<ContainerPath<'_>> {
    container_candidates(path).next()
}

/// Finds the rightmost split whose container is an existing regular file.
///
/// Returns `None` when no split applies, in which case the caller treats the
/// whole string as a direct filesystem path.
pub fn locate_container(path: &str) -> Option<ContainerPath<'_>> {
    container_candidates(path).find(|split| Path::new(split.container).is_file())
}

/// Builds the composite `container/member` path with the native separator.
pub fn join_member(container: &str, member: &str) -> String {
    let mut joined = String::with_capacity(container.len() + member.len() + 1);
    joined.push_str(container);
    joined.push(MAIN_SEPARATOR);
    joined.push_str(member);
    joined
}

/// Parses a `#<N>` member selector into its 1-based index.
///
/// ```rust
/// use arcvfs::path::parse_index_selector;
///
/// assert_eq!(parse_index_selector("#3"), Some(3));
/// assert_eq!(parse_index_selector("disk.adf"), None);
/// ```
pub fn parse_index_selector(member: &str) -> Option<usize> {
    let digits = member.strip_prefix('#')?;
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}
