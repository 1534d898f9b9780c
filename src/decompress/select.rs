//! Archive member selection and history reporting.

use crate::handle::VirtualFile;
use crate::options::LayerOptions;
use crate::path::{join_member, parse_index_selector};

use super::Context;

/// What the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Wanted {
    First,
    Named(String),
    Index(usize),
}

/// Picks one member out of an archive listing.
///
/// Without a member name the first eligible entry wins. A member name
/// matches case-insensitively, with `/` and `\` treated alike. A `#N`
/// selector matches the N-th non-empty file entry in archive order,
/// counting ignored entries too.
///
/// This is not a raw directory index: directories and empty entries do
/// not advance `#N`, so the same selector picks the same disk whether or
/// not an archiver stored directory entries.
#[derive(Debug)]
pub(crate) struct MemberSelector {
    wanted: Wanted,
    selected: bool,
}

impl MemberSelector {
    pub(crate) fn new(member: Option<&str>) -> Self {
        let wanted = match member {
            None => Wanted::First,
            Some(name) => match parse_index_selector(name) {
                Some(index) => Wanted::Index(index),
                None => Wanted::Named(normalize(name)),
            },
        };
        Self {
            wanted,
            selected: false,
        }
    }

    /// Returns true if the entry at 1-based `position` named `name` is the
    /// one asked for and nothing was selected yet.
    pub(crate) fn matches(&self, position: usize, name: &str) -> bool {
        if self.selected {
            return false;
        }
        match &self.wanted {
            Wanted::First => true,
            Wanted::Named(wanted) => normalize(name).eq_ignore_ascii_case(wanted),
            Wanted::Index(index) => *index == position,
        }
    }

    pub(crate) fn mark_selected(&mut self) {
        self.selected = true;
    }
}

fn normalize(name: &str) -> String {
    name.replace('\\', "/")
}

/// Reports eligible members to the history sink.
///
/// The first eligible member is held back. It is reported only when it is
/// a disk image and a second eligible member turns up; from then on every
/// eligible member is reported right away.
#[derive(Debug)]
pub(crate) struct HistoryTracker<'a> {
    cx: &'a Context,
    container: &'a str,
    pending: Option<String>,
    first: bool,
}

impl<'a> HistoryTracker<'a> {
    pub(crate) fn new(cx: &'a Context, container: &'a str) -> Self {
        Self {
            cx,
            container,
            pending: None,
            first: true,
        }
    }

    pub(crate) fn observe(&mut self, member: &str) {
        if let Some(pending) = self.pending.take() {
            self.cx.record_candidate(&pending);
            self.first = false;
        }
        let candidate = join_member(self.container, member);
        if !self.first {
            self.cx.record_candidate(&candidate);
        } else if self.cx.options().is_disk_image(member) {
            self.pending = Some(candidate);
        }
    }
}

/// Returns true if a member counts towards selection at all.
pub(crate) fn is_eligible(options: &LayerOptions, name: &str) -> bool {
    !options.is_ignored(name)
}

/// Path used as the container half of composite member names.
pub(crate) fn container_label(file: &VirtualFile) -> String {
    match file.real_path() {
        Some(path) => path.to_string_lossy().into_owned(),
        None => file.name().to_string(),
    }
}
