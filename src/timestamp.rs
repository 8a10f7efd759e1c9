//! # Timestamp Module
//!
//! Resolves the date used to name photo and video files.
//!
//! ## Fallback chain
//! 1. Capture-time sources, tried in order (photos only). The default chain
//!    holds a single EXIF reader looking at `DateTimeOriginal`, then `DateTime`.
//! 2. The file's last-modified time, which always exists for a readable file.
//!
//! Capture-time lookups are fallible but never fail the run: any problem
//! yields `None` and resolution moves on to the next step.
//!
//! Timestamps are opaque local wall-clock values; no timezone conversion is
//! applied to EXIF dates.

use crate::error::{MetadataError, OrganizeError, OrganizeResult};
use crate::file_category::Category;
use chrono::{DateTime, Local, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Layout used in destination file names: `YYYYMMDD_HHMMSS`.
pub const NAME_FORMAT: &str = "%Y%m%d_%H%M%S";

const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Bytes of a bare TIFF file (including TIFF-based RAW formats) parsed for
/// EXIF. Their IFDs sit near the start; the image data that follows is never
/// needed.
const TIFF_PREFIX_LIMIT: u64 = 1 << 20;

fn is_tiff(head: &[u8]) -> bool {
    head.starts_with(b"II*\0") || head.starts_with(b"MM\0*")
}

/// Where a resolved timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampOrigin {
    /// Embedded capture-time metadata
    Embedded,
    /// Filesystem last-modified time
    Modified,
}

/// Date-time used to build a media file's destination name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaTimestamp {
    pub value: NaiveDateTime,
    pub origin: TimestampOrigin,
}

impl MediaTimestamp {
    /// Renders the timestamp as `YYYYMMDD_HHMMSS`.
    pub fn name_part(&self) -> String {
        self.value.format(NAME_FORMAT).to_string()
    }
}

/// A fallible lookup of a file's embedded capture time.
pub trait CaptureTimeSource: Send + Sync {
    fn capture_time(&self, path: &Path) -> Option<NaiveDateTime>;
}

/// Reads capture time from EXIF blocks in JPEG, TIFF, HEIF, PNG and WebP files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifCaptureTime;

impl ExifCaptureTime {
    /// Reads `DateTimeOriginal`, falling back to `DateTime`.
    ///
    /// Bare TIFF files are read only up to `TIFF_PREFIX_LIMIT` bytes, so
    /// large RAW photos are not buffered whole.
    pub fn read(path: &Path) -> Result<NaiveDateTime, MetadataError> {
        let file = File::open(path)?;
        let mut bufreader = BufReader::new(file);
        let exif = if is_tiff(bufreader.fill_buf()?) {
            let mut prefix = Vec::new();
            bufreader.take(TIFF_PREFIX_LIMIT).read_to_end(&mut prefix)?;
            Reader::new().read_raw(prefix)?
        } else {
            Reader::new().read_from_container(&mut bufreader)?
        };

        let raw = [Tag::DateTimeOriginal, Tag::DateTime]
            .into_iter()
            .find_map(|tag| {
                exif.get_field(tag, In::PRIMARY)
                    .and_then(|field| ascii_value(&field.value))
            })
            .ok_or(MetadataError::MissingDate)?;

        NaiveDateTime::parse_from_str(&raw, EXIF_DATE_FORMAT)
            .map_err(|_| MetadataError::InvalidDate { value: raw })
    }
}

impl CaptureTimeSource for ExifCaptureTime {
    fn capture_time(&self, path: &Path) -> Option<NaiveDateTime> {
        match Self::read(path) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(path = %path.display(), reason = %e, "no EXIF capture time");
                None
            }
        }
    }
}

fn ascii_value(value: &Value) -> Option<String> {
    if let Value::Ascii(vec) = value
        && let Some(bytes) = vec.first()
        && let Ok(s) = std::str::from_utf8(bytes)
    {
        let trimmed = s.trim_end_matches('\0').trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    None
}

/// Reads the file's last-modified time as a local wall-clock value.
pub fn modified_time(path: &Path) -> OrganizeResult<NaiveDateTime> {
    let modified = std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|source| OrganizeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(DateTime::<Local>::from(modified).naive_local())
}

/// Resolves a `MediaTimestamp` through an ordered list of capture-time
/// sources, ending in the filesystem modification time.
pub struct DateResolver {
    sources: Vec<Box<dyn CaptureTimeSource>>,
}

impl DateResolver {
    pub fn new(sources: Vec<Box<dyn CaptureTimeSource>>) -> Self {
        Self { sources }
    }

    /// A resolver with no metadata reader; always uses the modification time.
    pub fn modified_only() -> Self {
        Self::new(Vec::new())
    }

    /// Resolves the timestamp for a file of the given category.
    ///
    /// Capture-time sources are consulted for photos only. Videos, and photos
    /// without usable metadata, get their last-modified time.
    pub fn resolve(&self, path: &Path, category: Category) -> OrganizeResult<MediaTimestamp> {
        if category == Category::Photo
            && let Some(value) = self.sources.iter().find_map(|s| s.capture_time(path))
        {
            return Ok(MediaTimestamp {
                value,
                origin: TimestampOrigin::Embedded,
            });
        }

        Ok(MediaTimestamp {
            value: modified_time(path)?,
            origin: TimestampOrigin::Modified,
        })
    }
}

impl Default for DateResolver {
    fn default() -> Self {
        Self::new(vec![Box::new(ExifCaptureTime)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use filetime::FileTime;
    use std::fs;
    use tempfile::TempDir;

    /// Builds a minimal big-endian TIFF block: IFD0 carries `DateTime` when
    /// given, and points at an Exif IFD carrying `DateTimeOriginal` when given.
    fn tiff_with_dates(original: Option<&str>, datetime: Option<&str>) -> Vec<u8> {
        fn entry(out: &mut Vec<u8>, tag: u16, typ: u16, count: u32, value: u32) {
            out.extend_from_slice(&tag.to_be_bytes());
            out.extend_from_slice(&typ.to_be_bytes());
            out.extend_from_slice(&count.to_be_bytes());
            out.extend_from_slice(&value.to_be_bytes());
        }

        let ifd0_entries = usize::from(datetime.is_some()) + usize::from(original.is_some());
        let ifd0_len = 2 + 12 * ifd0_entries + 4;
        let exif_ifd_offset = 8 + ifd0_len;
        let exif_ifd_len = if original.is_some() { 2 + 12 + 4 } else { 0 };
        let mut data_offset = exif_ifd_offset + exif_ifd_len;

        let mut out = b"MM\x00\x2a\x00\x00\x00\x08".to_vec();
        let mut data = Vec::new();

        out.extend_from_slice(&(ifd0_entries as u16).to_be_bytes());
        if let Some(dt) = datetime {
            let mut bytes = dt.as_bytes().to_vec();
            bytes.push(0);
            entry(&mut out, 0x0132, 2, bytes.len() as u32, data_offset as u32);
            data_offset += bytes.len();
            data.extend_from_slice(&bytes);
        }
        if original.is_some() {
            entry(&mut out, 0x8769, 4, 1, exif_ifd_offset as u32);
        }
        out.extend_from_slice(&0u32.to_be_bytes());

        if let Some(dt) = original {
            let mut bytes = dt.as_bytes().to_vec();
            bytes.push(0);
            out.extend_from_slice(&1u16.to_be_bytes());
            entry(&mut out, 0x9003, 2, bytes.len() as u32, data_offset as u32);
            out.extend_from_slice(&0u32.to_be_bytes());
            data.extend_from_slice(&bytes);
        }

        out.extend_from_slice(&data);
        out
    }

    /// Wraps a TIFF block in a JPEG APP1 segment.
    fn jpeg_with_exif(tiff: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
        out.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
        out.extend_from_slice(b"Exif\0\0");
        out.extend_from_slice(tiff);
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }

    fn set_local_mtime(path: &Path, y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) {
        let local = Local
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .single()
            .expect("unambiguous local time");
        filetime::set_file_mtime(path, FileTime::from_unix_time(local.timestamp(), 0)).unwrap();
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    struct Fixed(Option<NaiveDateTime>);

    impl CaptureTimeSource for Fixed {
        fn capture_time(&self, _path: &Path) -> Option<NaiveDateTime> {
            self.0
        }
    }

    #[test]
    fn test_reads_date_time_original() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("a.jpg");
        let tiff = tiff_with_dates(Some("2021:05:02 14:30:00"), Some("2019:01:01 00:00:00"));
        fs::write(&path, jpeg_with_exif(&tiff)).unwrap();

        assert_eq!(
            ExifCaptureTime::read(&path).unwrap(),
            at(2021, 5, 2, 14, 30, 0)
        );
    }

    #[test]
    fn test_falls_back_to_ifd0_date_time() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("a.jpg");
        let tiff = tiff_with_dates(None, Some("2018:12:24 18:05:09"));
        fs::write(&path, jpeg_with_exif(&tiff)).unwrap();

        assert_eq!(
            ExifCaptureTime::read(&path).unwrap(),
            at(2018, 12, 24, 18, 5, 9)
        );
    }

    #[test]
    fn test_large_tiff_read_from_prefix() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("a.nef");
        let mut raw = tiff_with_dates(Some("2021:05:02 14:30:00"), None);
        raw.resize(raw.len() + 3 * (1 << 20), 0);
        fs::write(&path, &raw).unwrap();

        assert_eq!(
            ExifCaptureTime::read(&path).unwrap(),
            at(2021, 5, 2, 14, 30, 0)
        );
    }

    #[test]
    fn test_tiff_ifd_past_prefix_is_not_read() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("a.cr2");
        // A well-formed TIFF whose only IFD, holding `DateTime`, starts at 2 MiB.
        let ifd_offset = 2u32 << 20;
        let mut value = b"2021:05:02 14:30:00".to_vec();
        value.push(0);
        let mut raw = b"MM\x00\x2a".to_vec();
        raw.extend_from_slice(&ifd_offset.to_be_bytes());
        raw.resize(ifd_offset as usize, 0);
        raw.extend_from_slice(&1u16.to_be_bytes());
        raw.extend_from_slice(&0x0132u16.to_be_bytes());
        raw.extend_from_slice(&2u16.to_be_bytes());
        raw.extend_from_slice(&(value.len() as u32).to_be_bytes());
        raw.extend_from_slice(&(ifd_offset + 18).to_be_bytes());
        raw.extend_from_slice(&0u32.to_be_bytes());
        raw.extend_from_slice(&value);
        fs::write(&path, &raw).unwrap();

        assert!(ExifCaptureTime::read(&path).is_err());
        assert_eq!(ExifCaptureTime.capture_time(&path), None);
    }

    #[test]
    fn test_malformed_date_is_rejected() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("a.jpg");
        let tiff = tiff_with_dates(Some("0000:00:00 00:00:00"), None);
        fs::write(&path, jpeg_with_exif(&tiff)).unwrap();

        assert!(matches!(
            ExifCaptureTime::read(&path),
            Err(MetadataError::InvalidDate { .. })
        ));
        assert_eq!(ExifCaptureTime.capture_time(&path), None);
    }

    #[test]
    fn test_non_image_yields_none() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("fake.jpg");
        fs::write(&path, b"not really a jpeg").unwrap();

        assert!(ExifCaptureTime::read(&path).is_err());
        assert_eq!(ExifCaptureTime.capture_time(&path), None);
    }

    #[test]
    fn test_photo_prefers_embedded_time() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("a.jpg");
        fs::write(&path, b"x").unwrap();
        set_local_mtime(&path, 2020, 1, 15, 9, 0, 0);

        let resolver = DateResolver::new(vec![Box::new(Fixed(Some(at(2021, 5, 2, 14, 30, 0))))]);
        let ts = resolver.resolve(&path, Category::Photo).unwrap();
        assert_eq!(ts.origin, TimestampOrigin::Embedded);
        assert_eq!(ts.name_part(), "20210502_143000");
    }

    #[test]
    fn test_sources_are_tried_in_order() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("a.jpg");
        fs::write(&path, b"x").unwrap();

        let resolver = DateResolver::new(vec![
            Box::new(Fixed(None)),
            Box::new(Fixed(Some(at(2001, 2, 3, 4, 5, 6)))),
            Box::new(Fixed(Some(at(1999, 1, 1, 0, 0, 0)))),
        ]);
        let ts = resolver.resolve(&path, Category::Photo).unwrap();
        assert_eq!(ts.value, at(2001, 2, 3, 4, 5, 6));
    }

    #[test]
    fn test_photo_without_metadata_uses_mtime() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("a.png");
        fs::write(&path, b"x").unwrap();
        set_local_mtime(&path, 2020, 1, 15, 9, 0, 0);

        let ts = DateResolver::default()
            .resolve(&path, Category::Photo)
            .unwrap();
        assert_eq!(ts.origin, TimestampOrigin::Modified);
        assert_eq!(ts.name_part(), "20200115_090000");
    }

    #[test]
    fn test_video_never_consults_metadata() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("clip.mp4");
        fs::write(&path, b"x").unwrap();
        set_local_mtime(&path, 2020, 1, 15, 9, 0, 0);

        let resolver = DateResolver::new(vec![Box::new(Fixed(Some(at(2021, 5, 2, 14, 30, 0))))]);
        let ts = resolver.resolve(&path, Category::Video).unwrap();
        assert_eq!(ts.origin, TimestampOrigin::Modified);
        assert_eq!(ts.name_part(), "20200115_090000");
    }

    #[test]
    fn test_missing_file_fails_with_read_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = DateResolver::modified_only()
            .resolve(&temp_dir.path().join("gone.mov"), Category::Video);
        assert!(matches!(result, Err(OrganizeError::Read { .. })));
    }
}
