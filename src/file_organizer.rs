/// Copies a source tree into category directories under a destination root.
///
/// For every regular file the organizer classifies, fingerprints and, unless
/// the content was already copied into the same category during this run,
/// names the file and copies it to a fresh path. The source tree is never
/// modified. A failure on one file is recorded and the run continues.
use crate::config::CompiledFilters;
use crate::dedup::{Claim, DedupIndex};
use crate::error::{OrganizeError, OrganizeResult};
use crate::file_category::{Category, FileMapper};
use crate::hasher;
use crate::naming;
use crate::path_allocator;
use crate::timestamp::DateResolver;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Writes a source file's bytes into an already-created destination.
///
/// The destination has been created exclusively by the caller; on error the
/// caller removes it.
pub trait FileCopier: Send + Sync {
    fn copy(&self, source: &Path, destination: &mut File, destination_path: &Path)
    -> std::io::Result<()>;
}

/// Copies content, then permissions and access/modification times.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreservingCopier;

impl FileCopier for PreservingCopier {
    fn copy(
        &self,
        source: &Path,
        destination: &mut File,
        destination_path: &Path,
    ) -> std::io::Result<()> {
        let mut input = File::open(source)?;
        let metadata = input.metadata()?;
        std::io::copy(&mut input, destination)?;
        destination.set_permissions(metadata.permissions())?;
        filetime::set_file_times(
            destination_path,
            filetime::FileTime::from_last_access_time(&metadata),
            filetime::FileTime::from_last_modification_time(&metadata),
        )
    }
}

/// What happened to one discovered file.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Copied (or, in a dry run, planned) to `destination`.
    Copied {
        source: PathBuf,
        destination: PathBuf,
        category: Category,
    },
    /// Same content already copied into this category during the run.
    Duplicate { source: PathBuf, category: Category },
    /// Could not be read, named or copied.
    Failed {
        source: PathBuf,
        category: Option<Category>,
        error: String,
    },
}

impl FileOutcome {
    pub fn source(&self) -> &Path {
        match self {
            Self::Copied { source, .. }
            | Self::Duplicate { source, .. }
            | Self::Failed { source, .. } => source,
        }
    }

    pub fn category(&self) -> Option<Category> {
        match self {
            Self::Copied { category, .. } | Self::Duplicate { category, .. } => Some(*category),
            Self::Failed { category, .. } => *category,
        }
    }

    pub fn destination(&self) -> Option<&Path> {
        match self {
            Self::Copied { destination, .. } => Some(destination),
            _ => None,
        }
    }
}

/// Per-category tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub copied: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// Everything a run did, in traversal order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub dry_run: bool,
    pub outcomes: Vec<FileOutcome>,
}

impl RunReport {
    pub fn copied_count(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Copied { .. }))
    }

    pub fn duplicate_count(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Duplicate { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    fn count(&self, predicate: impl Fn(&FileOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(o)).count()
    }

    /// Failures in traversal order.
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.outcomes.iter().filter_map(|o| match o {
            FileOutcome::Failed { source, error, .. } => Some((source.as_path(), error.as_str())),
            _ => None,
        })
    }

    /// Tallies by category. Failures that happened before classification
    /// (traversal errors) are not attributed to any category.
    pub fn category_counts(&self) -> BTreeMap<Category, CategoryCounts> {
        let mut counts = BTreeMap::new();
        for outcome in &self.outcomes {
            let Some(category) = outcome.category() else {
                continue;
            };
            let entry: &mut CategoryCounts = counts.entry(category).or_default();
            match outcome {
                FileOutcome::Copied { .. } => entry.copied += 1,
                FileOutcome::Duplicate { .. } => entry.duplicates += 1,
                FileOutcome::Failed { .. } => entry.failed += 1,
            }
        }
        counts
    }

    /// Writes the report, with a per-category summary, as pretty JSON.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        #[derive(Serialize)]
        struct ReportFile<'a> {
            #[serde(flatten)]
            report: &'a RunReport,
            summary: BTreeMap<Category, CategoryCounts>,
        }

        let file = ReportFile {
            report: self,
            summary: self.category_counts(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(std::io::Error::other)?;
        fs::write(path, json)
    }
}

/// State owned by one run and shared by every per-file step.
#[derive(Debug, Default)]
pub struct RunState {
    pub index: DedupIndex,
    planned: Mutex<HashSet<PathBuf>>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Organizes a source tree into category directories under a destination root.
pub struct Organizer {
    source: PathBuf,
    destination: PathBuf,
    mapper: FileMapper,
    resolver: DateResolver,
    copier: Box<dyn FileCopier>,
    filters: CompiledFilters,
    jobs: usize,
    dry_run: bool,
}

impl Organizer {
    /// Creates an organizer with the default extension table, EXIF date
    /// lookup, timestamp-preserving copy and no filters.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            mapper: FileMapper::default(),
            resolver: DateResolver::default(),
            copier: Box::new(PreservingCopier),
            filters: CompiledFilters::allow_all(),
            jobs: 1,
            dry_run: false,
        }
    }

    pub fn with_date_resolver(mut self, resolver: DateResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_copier(mut self, copier: impl FileCopier + 'static) -> Self {
        self.copier = Box::new(copier);
        self
    }

    pub fn with_filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Number of worker threads. `1` processes files sequentially in
    /// traversal order, which makes destination names reproducible.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Plan everything but create no directories and copy nothing.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Runs the whole pipeline.
    pub fn organize(&self) -> OrganizeResult<RunReport> {
        self.organize_with_progress(|_, _| {})
    }

    /// Runs the whole pipeline, calling `on_file(total, outcome)` as each
    /// file settles.
    ///
    /// Only precondition failures, an unwritable destination root and worker
    /// pool failures make this return `Err`; per-file problems are reported in
    /// the returned `RunReport`.
    pub fn organize_with_progress<F>(&self, on_file: F) -> OrganizeResult<RunReport>
    where
        F: Fn(usize, &FileOutcome) + Sync,
    {
        let started_at = Utc::now();
        let source = self.check_source()?;
        info!(
            source = %source.display(),
            destination = %self.destination.display(),
            dry_run = self.dry_run,
            "starting organization"
        );

        if !self.dry_run {
            self.create_category_dirs()?;
        }

        let discovered = self.discover_from(&source);
        let total = discovered.len();
        let state = RunState::new();
        let done = AtomicUsize::new(0);

        let handle = |entry: &Result<PathBuf, OrganizeError>| {
            let outcome = self.settle(entry, &state);
            done.fetch_add(1, Ordering::Relaxed);
            on_file(total, &outcome);
            outcome
        };

        let outcomes: Vec<FileOutcome> = if self.jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.jobs)
                .build()?;
            pool.install(|| discovered.par_iter().map(handle).collect())
        } else {
            discovered.iter().map(handle).collect()
        };

        let report = RunReport {
            started_at,
            source,
            destination: self.destination.clone(),
            dry_run: self.dry_run,
            outcomes,
        };
        info!(
            processed = done.load(Ordering::Relaxed),
            copied = report.copied_count(),
            duplicates = report.duplicate_count(),
            failed = report.failed_count(),
            "organization complete"
        );
        Ok(report)
    }

    fn check_source(&self) -> OrganizeResult<PathBuf> {
        match fs::metadata(&self.source) {
            Ok(meta) if meta.is_dir() => {
                let source = fs::canonicalize(&self.source).map_err(|e| OrganizeError::Read {
                    path: self.source.clone(),
                    source: e,
                })?;
                if fs::canonicalize(&self.destination).is_ok_and(|dest| dest == source) {
                    return Err(OrganizeError::DestinationIsSource { path: source });
                }
                Ok(source)
            }
            Ok(_) => Err(OrganizeError::SourceNotDirectory {
                path: self.source.clone(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OrganizeError::SourceMissing {
                    path: self.source.clone(),
                })
            }
            Err(source) => Err(OrganizeError::Read {
                path: self.source.clone(),
                source,
            }),
        }
    }

    /// Creates the destination root and one directory per category.
    pub fn create_category_dirs(&self) -> OrganizeResult<()> {
        for category in Category::ALL {
            let dir = self.destination.join(category.dir_name());
            fs::create_dir_all(&dir).map_err(|source| OrganizeError::DirectoryCreation {
                path: dir.clone(),
                source,
            })?;
            info!(category = %category, dir = %dir.display(), "category directory ready");
        }
        Ok(())
    }

    /// Lists the files a run would process, in traversal order.
    ///
    /// Directories and filtered-out files are skipped, as is the destination
    /// root when it lies inside the source. Symlinks are not descended into;
    /// a symlink to a regular file is listed and its target gets copied.
    pub fn discover(&self) -> OrganizeResult<Vec<Result<PathBuf, OrganizeError>>> {
        let source = self.check_source()?;
        Ok(self.discover_from(&source))
    }

    fn discover_from(&self, root: &Path) -> Vec<Result<PathBuf, OrganizeError>> {
        let destination = fs::canonicalize(&self.destination).ok();

        WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| destination.as_deref() != Some(entry.path()))
            .filter_map(|entry| match entry {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    if file_type.is_dir() {
                        return None;
                    }
                    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                    if !self.filters.should_include(relative) {
                        return None;
                    }
                    if file_type.is_symlink() {
                        match fs::metadata(entry.path()) {
                            Ok(meta) if meta.is_file() => {}
                            Ok(_) => {
                                debug!(path = %entry.path().display(), "skipping symlink to a non-file");
                                return None;
                            }
                            Err(source) => {
                                return Some(Err(OrganizeError::Read {
                                    path: entry.into_path(),
                                    source,
                                }));
                            }
                        }
                    } else if !file_type.is_file() {
                        return None;
                    }
                    Some(Ok(entry.into_path()))
                }
                Err(e) => Some(Err(OrganizeError::Walk {
                    path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
                    reason: e.to_string(),
                })),
            })
            .collect()
    }

    /// Turns one discovery entry into its outcome. Entries that failed during
    /// traversal become failures with no category.
    fn settle(&self, entry: &Result<PathBuf, OrganizeError>, state: &RunState) -> FileOutcome {
        match entry {
            Ok(path) => self.process_file(path, state),
            Err(e) => {
                warn!(error = %e, "traversal error");
                FileOutcome::Failed {
                    source: error_path(e),
                    category: None,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Carries one file from discovery to its final outcome.
    ///
    /// `state` holds the run's dedup index; pass the same state for every
    /// file of a run and a fresh one for each new run.
    pub fn process_file(&self, path: &Path, state: &RunState) -> FileOutcome {
        let category = self.mapper.classify(path);
        info!(path = %path.display(), category = %category, "processing file");

        let fingerprint = match hasher::fingerprint(path) {
            Ok(fingerprint) => fingerprint,
            Err(e) => return failed(path, category, &e),
        };

        if state.index.claim(category, fingerprint) == Claim::Duplicate {
            info!(path = %path.display(), category = %category, "skipping duplicate");
            return FileOutcome::Duplicate {
                source: path.to_path_buf(),
                category,
            };
        }

        let placed = self.place(path, category, state);
        state.index.complete(category, fingerprint, placed.is_ok());

        match placed {
            Ok(destination) => {
                info!(
                    source = %path.display(),
                    destination = %destination.display(),
                    dry_run = self.dry_run,
                    "copied"
                );
                FileOutcome::Copied {
                    source: path.to_path_buf(),
                    destination,
                    category,
                }
            }
            Err(e) => failed(path, category, &e),
        }
    }

    /// Names the file, reserves its destination and copies it there.
    fn place(&self, path: &Path, category: Category, state: &RunState) -> OrganizeResult<PathBuf> {
        let timestamp = if category.is_media() {
            Some(self.resolver.resolve(path, category)?)
        } else {
            None
        };
        let name = naming::destination_name(path, category, timestamp.as_ref());
        let dir = self.destination.join(category.dir_name());

        if self.dry_run {
            let mut planned = state
                .planned
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let destination = path_allocator::allocate_with(&dir, &name, |candidate| {
                planned.contains(candidate) || candidate.symlink_metadata().is_ok()
            });
            planned.insert(destination.clone());
            return Ok(destination);
        }

        let (destination, mut file) =
            path_allocator::create_unique(&dir, &name).map_err(|source| OrganizeError::Copy {
                from: path.to_path_buf(),
                to: dir.join(&name),
                source,
            })?;

        if let Err(source) = self.copier.copy(path, &mut file, &destination) {
            drop(file);
            let _ = fs::remove_file(&destination);
            return Err(OrganizeError::Copy {
                from: path.to_path_buf(),
                to: destination,
                source,
            });
        }
        Ok(destination)
    }
}

fn failed(path: &Path, category: Category, e: &OrganizeError) -> FileOutcome {
    error!(path = %path.display(), error = %e, "file failed");
    FileOutcome::Failed {
        source: path.to_path_buf(),
        category: Some(category),
        error: e.to_string(),
    }
}

fn error_path(e: &OrganizeError) -> PathBuf {
    match e {
        OrganizeError::Walk { path, .. } | OrganizeError::Read { path, .. } => path.clone(),
        _ => PathBuf::new(),
    }
}
