/// File categorization by extension.
///
/// Every file lands in exactly one of five categories. The lookup is a pure
/// function of the lower-cased extension; anything unknown, including files
/// without an extension, is `Other`.
///
/// # Examples
///
/// ```
/// use media_sorter::file_category::{Category, FileMapper};
///
/// let mapper = FileMapper::default();
/// assert_eq!(mapper.classify("holiday.JPG"), Category::Photo);
/// assert_eq!(mapper.classify("song.flac"), Category::Audio);
/// assert_eq!(mapper.classify("notes.txt"), Category::Other);
/// ```
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

const PHOTO_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "thm", "tiff", "heic", "heif", "webp", "arw", "nef", "cr2",
];
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "avi", "mkv", "wmv", "flv", "webm", "mpeg", "mpg", "m4v",
];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "aac", "flac", "ogg", "wav", "m4a", "wma"];
const PROGRAM_EXTENSIONS: &[&str] = &[
    "exe", "msi", "apk", "deb", "rpm", "dmg", "pkg", "app", "bat", "sh", "ps1", "jar",
];

/// Represents the destination category of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Still images, including camera RAW formats
    Photo,
    /// Video containers
    Video,
    /// Music and other audio
    Audio,
    /// Installers, packages and scripts
    Program,
    /// Everything else
    Other,
}

impl Category {
    /// All categories, in the order their directories are created.
    pub const ALL: [Category; 5] = [
        Category::Photo,
        Category::Video,
        Category::Audio,
        Category::Program,
        Category::Other,
    ];

    /// Returns the directory name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use media_sorter::file_category::Category;
    ///
    /// assert_eq!(Category::Photo.dir_name(), "photos");
    /// assert_eq!(Category::Other.dir_name(), "other");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Photo => "photos",
            Category::Video => "videos",
            Category::Audio => "audio",
            Category::Program => "programs",
            Category::Other => "other",
        }
    }

    /// Short lowercase label used in logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Photo => "photo",
            Category::Video => "video",
            Category::Audio => "audio",
            Category::Program => "program",
            Category::Other => "other",
        }
    }

    /// Whether files of this category get a date-based name.
    pub fn is_media(&self) -> bool {
        matches!(self, Category::Photo | Category::Video)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Maps file extensions to categories.
///
/// The table is fixed at construction and read-only afterwards, so a single
/// mapper can be shared across worker threads.
#[derive(Debug, Clone)]
pub struct FileMapper {
    extension_map: HashMap<String, Category>,
}

impl FileMapper {
    /// Creates a new `FileMapper` with the standard extension table.
    pub fn new() -> Self {
        let mut extension_map = HashMap::new();
        let groups = [
            (PHOTO_EXTENSIONS, Category::Photo),
            (VIDEO_EXTENSIONS, Category::Video),
            (AUDIO_EXTENSIONS, Category::Audio),
            (PROGRAM_EXTENSIONS, Category::Program),
        ];
        for (extensions, category) in groups {
            for ext in extensions {
                extension_map.insert((*ext).to_string(), category);
            }
        }
        Self { extension_map }
    }

    /// Maps a bare extension (without the dot) to a category.
    ///
    /// # Examples
    ///
    /// ```
    /// use media_sorter::file_category::{Category, FileMapper};
    ///
    /// let mapper = FileMapper::default();
    /// assert_eq!(mapper.extension_to_category("MOV"), Some(Category::Video));
    /// assert_eq!(mapper.extension_to_category("txt"), None);
    /// ```
    pub fn extension_to_category(&self, ext: &str) -> Option<Category> {
        self.extension_map.get(&ext.to_lowercase()).copied()
    }

    /// Determines the category of a file from its name.
    ///
    /// Total over all inputs: names without an extension and dotfiles such
    /// as `.bashrc` resolve to `Category::Other`.
    pub fn classify(&self, file_name: impl AsRef<Path>) -> Category {
        file_name
            .as_ref()
            .extension()
            .and_then(|ext| self.extension_to_category(&ext.to_string_lossy()))
            .unwrap_or(Category::Other)
    }
}

impl Default for FileMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_dir_names() {
        assert_eq!(Category::Photo.dir_name(), "photos");
        assert_eq!(Category::Video.dir_name(), "videos");
        assert_eq!(Category::Audio.dir_name(), "audio");
        assert_eq!(Category::Program.dir_name(), "programs");
        assert_eq!(Category::Other.dir_name(), "other");
    }

    #[test]
    fn test_dir_names_are_distinct() {
        let mut names: Vec<_> = Category::ALL.iter().map(|c| c.dir_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Category::ALL.len());
    }

    #[test]
    fn test_classify_each_category() {
        let mapper = FileMapper::default();
        assert_eq!(mapper.classify("a.jpg"), Category::Photo);
        assert_eq!(mapper.classify("a.cr2"), Category::Photo);
        assert_eq!(mapper.classify("a.thm"), Category::Photo);
        assert_eq!(mapper.classify("a.mkv"), Category::Video);
        assert_eq!(mapper.classify("a.mpg"), Category::Video);
        assert_eq!(mapper.classify("a.wma"), Category::Audio);
        assert_eq!(mapper.classify("a.apk"), Category::Program);
        assert_eq!(mapper.classify("a.ps1"), Category::Program);
        assert_eq!(mapper.classify("a.pdf"), Category::Other);
    }

    #[test]
    fn test_classify_case_insensitive() {
        let mapper = FileMapper::default();
        assert_eq!(mapper.classify("IMG_0001.JPEG"), Category::Photo);
        assert_eq!(mapper.classify("Clip.Mp4"), Category::Video);
    }

    #[test]
    fn test_classify_uses_last_extension() {
        let mapper = FileMapper::default();
        assert_eq!(mapper.classify("backup.jpg.zip"), Category::Other);
        assert_eq!(mapper.classify("archive.tar.mp3"), Category::Audio);
    }

    #[test]
    fn test_classify_without_extension() {
        let mapper = FileMapper::default();
        assert_eq!(mapper.classify("Makefile"), Category::Other);
        assert_eq!(mapper.classify(".jpg"), Category::Other);
        assert_eq!(mapper.classify(""), Category::Other);
        assert_eq!(mapper.classify("trailing."), Category::Other);
    }

    #[test]
    fn test_classify_accepts_full_paths() {
        let mapper = FileMapper::default();
        assert_eq!(
            mapper.classify(Path::new("/media/camera/DCIM/IMG_1.heic")),
            Category::Photo
        );
    }

    #[test]
    fn test_only_photo_and_video_are_media() {
        assert!(Category::Photo.is_media());
        assert!(Category::Video.is_media());
        assert!(!Category::Audio.is_media());
        assert!(!Category::Program.is_media());
        assert!(!Category::Other.is_media());
    }
}
