//! Configuration for the virtual file layer.
//!
//! All numeric safety bounds and extension tables live in [`LayerOptions`],
//! which is injected into a [`FileLayer`](crate::FileLayer) at construction.

/// Conventional double-density floppy image size (80 tracks, 2 sides, 11 sectors of 512 bytes).
pub const FLOPPY_IMAGE_SIZE: usize = 1760 * 512;

/// Member extensions that are never selected from, or visited in, an archive.
pub const DEFAULT_IGNORE_EXTENSIONS: &[&str] = &["gif", "jpg", "png", "xml", "pdf", "txt"];

/// Member extensions treated as disk images for history reporting.
pub const DEFAULT_DISK_IMAGE_EXTENSIONS: &[&str] = &["adf", "adz", "ipf", "fdi"];

/// Options controlling decompression bounds and member selection.
///
/// # Example
///
/// ```rust
/// use arcvfs::LayerOptions;
///
/// let options = LayerOptions::new()
///     .max_gzip_size(2 * 1024 * 1024)
///     .session_capacity(4);
/// assert_eq!(options.max_gzip_size, 2 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerOptions {
    /// Smallest uncompressed size a gzip trailer may declare.
    pub min_gzip_size: u64,
    /// Largest uncompressed size a gzip trailer may declare (inclusive).
    pub max_gzip_size: u64,
    /// Largest uncompressed size accepted for a single archive member.
    pub max_member_size: u64,
    /// Input chunk size used while streaming through the inflater.
    pub inflate_chunk_size: usize,
    /// Depth of the plugin extraction session arena.
    pub session_capacity: usize,
    /// How many times a member extracted from a ZIP may be re-classified.
    pub max_nesting_depth: usize,
    /// Output size produced by the DMS unpacker.
    pub dms_image_size: usize,
    /// Member extensions (lowercase, no dot) skipped during selection and iteration.
    pub ignore_extensions: Vec<String>,
    /// Member extensions (lowercase, no dot) that count as disk images.
    pub disk_image_extensions: Vec<String>,
}

impl Default for LayerOptions {
    /// Creates options with the following default values:
    ///
    /// | Option | Default Value |
    /// |--------|---------------|
    /// | `min_gzip_size` | 8 bytes |
    /// | `max_gzip_size` | 10,000,000 bytes |
    /// | `max_member_size` | 64 MiB |
    /// | `inflate_chunk_size` | 8 KiB |
    /// | `session_capacity` | 10 |
    /// | `max_nesting_depth` | 4 |
    /// | `dms_image_size` | 901,120 bytes |
    fn default() -> Self {
        Self {
            min_gzip_size: 8,
            max_gzip_size: 10_000_000,
            max_member_size: 64 << 20,
            inflate_chunk_size: crate::READ_BUFFER_SIZE,
            session_capacity: 10,
            max_nesting_depth: 4,
            dms_image_size: FLOPPY_IMAGE_SIZE,
            ignore_extensions: to_owned_list(DEFAULT_IGNORE_EXTENSIONS),
            disk_image_extensions: to_owned_list(DEFAULT_DISK_IMAGE_EXTENSIONS),
        }
    }
}

impl LayerOptions {
    /// Creates new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the smallest accepted gzip size.
    pub fn min_gzip_size(mut self, min: u64) -> Self {
        self.min_gzip_size = min;
        self
    }

    /// Sets the largest accepted gzip size.
    pub fn max_gzip_size(mut self, max: u64) -> Self {
        self.max_gzip_size = max;
        self
    }

    /// Sets the largest accepted member size.
    pub fn max_member_size(mut self, max: u64) -> Self {
        self.max_member_size = max;
        self
    }

    /// Sets the inflate input chunk size. Zero is raised to one byte.
    pub fn inflate_chunk_size(mut self, size: usize) -> Self {
        self.inflate_chunk_size = size.max(1);
        self
    }

    /// Sets the plugin session arena depth.
    pub fn session_capacity(mut self, capacity: usize) -> Self {
        self.session_capacity = capacity;
        self
    }

    /// Sets the member re-classification bound.
    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Sets the DMS output image size.
    pub fn dms_image_size(mut self, size: usize) -> Self {
        self.dms_image_size = size;
        self
    }

    /// Replaces the ignore list. Leading dots are stripped.
    pub fn ignore_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignore_extensions = normalize_list(extensions);
        self
    }

    /// Replaces the disk image extension list. Leading dots are stripped.
    pub fn disk_image_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.disk_image_extensions = normalize_list(extensions);
        self
    }

    /// Returns true if a member with this name is never selected.
    ///
    /// The name must be longer than the suffix, so a member called just
    /// `.txt` is not ignored.
    pub fn is_ignored(&self, member: &str) -> bool {
        has_listed_suffix(member, &self.ignore_extensions)
    }

    /// Returns true if a member with this name is a disk image.
    pub fn is_disk_image(&self, member: &str) -> bool {
        has_listed_suffix(member, &self.disk_image_extensions)
    }
}

fn to_owned_list(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

fn normalize_list<I, S>(extensions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    extensions
        .into_iter()
        .map(|s| s.as_ref().trim_start_matches('.').to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn has_listed_suffix(name: &str, extensions: &[String]) -> bool {
    extensions.iter().any(|ext| {
        let suffix_len = ext.len() + 1;
        if name.len() <= suffix_len || !name.is_char_boundary(name.len() - suffix_len) {
            return false;
        }
        let tail = &name[name.len() - suffix_len..];
        tail.starts_with('.') && tail[1..].eq_ignore_ascii_case(ext)
    })
}
