//! Storage naming for assembled pictures and their shots.

use super::PictureRef;
use crate::error::DeviceError;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SUFFIX: &str = ".jpg";
const COUNT_WIDTH: usize = 5;

/// Hands out numbered file names below a basename.
///
/// Names look like `<basename>00042.jpg`. Numbering resumes after the
/// highest picture already present in the target directory.
#[derive(Debug, Clone)]
pub struct PictureList {
    basename: String,
    counter: u32,
    shot_counter: u32,
}

impl PictureList {
    /// Create a list for `basename`, expanding `strftime` placeholders
    /// with the current local time and creating the directory.
    pub fn new(basename: &str) -> Result<Self, DeviceError> {
        Self::with_time(basename, Local::now())
    }

    /// Same as [`PictureList::new`] with an explicit timestamp
    pub fn with_time(basename: &str, now: DateTime<Local>) -> Result<Self, DeviceError> {
        let basename = expand_basename(basename, now);
        let (dir, _) = split_basename(&basename);

        fs::create_dir_all(&dir).map_err(|source| DeviceError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut list = Self {
            basename,
            counter: 0,
            shot_counter: 0,
        };
        list.find_existing_files();

        tracing::info!(
            basename = %list.basename,
            last = list.counter,
            "Picture list ready"
        );
        Ok(list)
    }

    /// Rescan the directory and set the counter to the highest existing number
    pub fn find_existing_files(&mut self) {
        let (dir, prefix) = split_basename(&self.basename);
        let pattern = format!(
            r"^{}(\d{{{}}}){}$",
            regex::escape(prefix),
            COUNT_WIDTH,
            regex::escape(SUFFIX)
        );
        let Ok(re) = Regex::new(&pattern) else {
            self.counter = 0;
            return;
        };

        self.counter = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                let captures = re.captures(&name)?;
                captures.get(1)?.as_str().parse::<u32>().ok()
            })
            .max()
            .unwrap_or(0);
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Number of the most recent picture, 0 if none exists yet
    pub fn count(&self) -> u32 {
        self.counter
    }

    /// File name of picture number `count`
    pub fn filename(&self, count: u32) -> String {
        format!("{}{:0width$}{}", self.basename, count, SUFFIX, width = COUNT_WIDTH)
    }

    pub fn thumbnail(&self, count: u32) -> String {
        format!(
            "{}{:0width$}.thumbnail{}",
            self.basename,
            count,
            SUFFIX,
            width = COUNT_WIDTH
        )
    }

    pub fn watermarked(&self, count: u32) -> String {
        format!(
            "{}{:0width$}.watermarked{}",
            self.basename,
            count,
            SUFFIX,
            width = COUNT_WIDTH
        )
    }

    /// File name of shot `shot` belonging to picture `count`
    pub fn shot_filename(&self, count: u32, shot: u32) -> String {
        format!(
            "{}{:0width$}_shot{:03}{}",
            self.basename,
            count,
            shot,
            SUFFIX,
            width = COUNT_WIDTH
        )
    }

    /// Reference to picture number `count`
    pub fn picture_ref(&self, count: u32) -> PictureRef {
        PictureRef::new(
            self.filename(count),
            self.watermarked(count),
            self.thumbnail(count),
        )
    }

    /// Reference to the most recent picture
    pub fn last(&self) -> Option<PictureRef> {
        (self.counter > 0).then(|| self.picture_ref(self.counter))
    }

    /// Advance to the next picture and return its names
    pub fn next_picture(&mut self) -> PictureRef {
        self.counter += 1;
        self.shot_counter = 0;
        self.picture_ref(self.counter)
    }

    /// Name for the next shot of the picture currently being taken
    ///
    /// Shots are taken before the picture is assembled, so they belong
    /// to the number after the current counter.
    pub fn next_shot(&mut self) -> String {
        self.shot_counter += 1;
        self.shot_filename(self.counter + 1, self.shot_counter)
    }
}

fn expand_basename(pattern: &str, now: DateTime<Local>) -> String {
    if !pattern.contains('%') {
        return pattern.to_string();
    }
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        tracing::warn!(pattern, "Invalid time placeholder in basename, using it verbatim");
        return pattern.to_string();
    }
    now.format_with_items(StrftimeItems::new(pattern)).to_string()
}

fn split_basename(basename: &str) -> (PathBuf, &str) {
    match basename.rsplit_once('/') {
        Some(("", prefix)) => (PathBuf::from("/"), prefix),
        Some((dir, prefix)) => (Path::new(dir).to_path_buf(), prefix),
        None => (PathBuf::from("."), basename),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn basename_in(dir: &TempDir) -> String {
        format!("{}/booth", dir.path().display())
    }

    #[test]
    fn numbering_starts_at_one_in_empty_directory() {
        let dir = TempDir::new().unwrap();
        let mut list = PictureList::new(&basename_in(&dir)).unwrap();

        assert_eq!(list.count(), 0);
        assert!(list.last().is_none());

        let first = list.next_picture();
        assert!(first.original.ends_with("booth00001.jpg"));
        assert!(first.thumbnail.ends_with("booth00001.thumbnail.jpg"));
        assert!(first.watermarked.ends_with("booth00001.watermarked.jpg"));
    }

    #[test]
    fn numbering_resumes_after_existing_pictures() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("booth00003.jpg"), b"x").unwrap();
        fs::write(dir.path().join("booth00007.jpg"), b"x").unwrap();
        fs::write(dir.path().join("booth00009.thumbnail.jpg"), b"x").unwrap();
        fs::write(dir.path().join("other00042.jpg"), b"x").unwrap();

        let mut list = PictureList::new(&basename_in(&dir)).unwrap();
        assert_eq!(list.count(), 7);
        assert!(list.next_picture().original.ends_with("booth00008.jpg"));
    }

    #[test]
    fn shots_belong_to_the_upcoming_picture() {
        let dir = TempDir::new().unwrap();
        let mut list = PictureList::new(&basename_in(&dir)).unwrap();

        assert!(list.next_shot().ends_with("booth00001_shot001.jpg"));
        assert!(list.next_shot().ends_with("booth00001_shot002.jpg"));

        list.next_picture();
        assert!(list.next_shot().ends_with("booth00002_shot001.jpg"));
    }

    #[test]
    fn time_placeholders_are_expanded() {
        let dir = TempDir::new().unwrap();
        let now = Local.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap();
        let pattern = format!("{}/%Y-%m-%d/booth", dir.path().display());

        let list = PictureList::with_time(&pattern, now).unwrap();

        assert!(list.basename().ends_with("2024-05-17/booth"));
        assert!(dir.path().join("2024-05-17").is_dir());
    }

    #[test]
    fn invalid_placeholder_is_kept_verbatim() {
        let now = Local.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap();
        assert_eq!(expand_basename("booth-%Q", now), "booth-%Q");
    }
}
