//! Satellite selection and segment file lookup.
//!
//! Archives mix acquisitions from several satellites. A [`SatelliteResolver`]
//! remembers which satellite last produced a file and falls back through the
//! other candidates when a file is missing.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::filename::{xrit_prologue_filename, xrit_strip_filename};
use crate::msg::channel::Channel;

/// Satellite numbers tried when no candidates are configured.
pub const DEFAULT_SATELLITES: [u8; 4] = [1, 2, 3, 4];

/// Candidate satellites and the current guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatelliteResolver {
    candidates: Vec<u8>,
    /// Index committed by the last successful lookup.
    start: usize,
    current: usize,
    /// Candidates tried since the last commit.
    tried: usize,
}

impl SatelliteResolver {
    /// Create a resolver over `candidates`, starting at the first one.
    ///
    /// An empty list falls back to [`DEFAULT_SATELLITES`].
    pub fn new(candidates: &[u8]) -> Self {
        let mut list: Vec<u8> = Vec::with_capacity(candidates.len());
        for &c in candidates {
            if !list.contains(&c) {
                list.push(c);
            }
        }
        if list.is_empty() {
            list = DEFAULT_SATELLITES.to_vec();
        }
        Self {
            candidates: list,
            start: 0,
            current: 0,
            tried: 0,
        }
    }

    /// Start from `satellite`, adding it in front if it is not a candidate.
    pub fn with_start(mut self, satellite: u8) -> Self {
        let index = match self.candidates.iter().position(|&c| c == satellite) {
            Some(index) => index,
            None => {
                self.candidates.insert(0, satellite);
                0
            }
        };
        self.start = index;
        self.current = index;
        self.tried = 0;
        self
    }

    /// Satellite currently guessed.
    pub fn current(&self) -> u8 {
        self.candidates[self.current]
    }

    pub fn candidates(&self) -> &[u8] {
        &self.candidates
    }

    /// Advance to the next candidate, wrapping around the list.
    ///
    /// Returns `None` once every candidate has been tried since the last
    /// [`commit`](Self::commit); the guess then returns to the committed one.
    pub fn try_next_candidate(&mut self) -> Option<u8> {
        self.tried += 1;
        if self.tried >= self.candidates.len() {
            self.current = self.start;
            self.tried = 0;
            return None;
        }
        self.current = (self.current + 1) % self.candidates.len();
        Some(self.current())
    }

    /// Keep the current guess for later lookups.
    pub fn commit(&mut self) {
        self.start = self.current;
        self.tried = 0;
    }

    /// Find the first candidate whose `path_for` exists, committing to it.
    pub fn resolve<F>(&mut self, mut path_for: F) -> Option<PathBuf>
    where
        F: FnMut(u8) -> PathBuf,
    {
        let first = self.current();
        let mut path = path_for(first);
        loop {
            if path.is_file() {
                if self.current() != first {
                    warn!(
                        "MSG{} file missing, using MSG{}: {}",
                        first,
                        self.current(),
                        path.display()
                    );
                }
                self.commit();
                return Some(path);
            }
            debug!("Not found: {}", path.display());
            let next = self.try_next_candidate()?;
            path = path_for(next);
        }
    }
}

impl Default for SatelliteResolver {
    fn default() -> Self {
        Self::new(&DEFAULT_SATELLITES)
    }
}

/// Builds segment paths for one acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocator {
    folder: PathBuf,
    timestamp: String,
}

impl FileLocator {
    /// Locator for files of `timestamp` (`YYYYMMDDhhmm`) in `folder`.
    pub fn new<P: AsRef<Path>>(folder: P, timestamp: &str) -> Self {
        Self {
            folder: folder.as_ref().to_path_buf(),
            timestamp: timestamp.to_string(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn prologue_path(&self, satellite: u8) -> PathBuf {
        self.folder
            .join(xrit_prologue_filename(satellite, &self.timestamp))
    }

    pub fn strip_path(&self, satellite: u8, channel: Channel, strip: usize) -> PathBuf {
        self.folder.join(xrit_strip_filename(
            satellite,
            channel,
            strip as u32,
            &self.timestamp,
        ))
    }

    /// Path of the prologue, trying satellites from `resolver`.
    pub fn find_prologue(&self, resolver: &mut SatelliteResolver) -> Option<PathBuf> {
        resolver.resolve(|satellite| self.prologue_path(satellite))
    }

    /// Path of a strip file, trying satellites from `resolver`.
    pub fn find_strip(
        &self,
        resolver: &mut SatelliteResolver,
        channel: Channel,
        strip: usize,
    ) -> Option<PathBuf> {
        resolver.resolve(|satellite| self.strip_path(satellite, channel, strip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_empty_candidates_use_defaults() {
        let resolver = SatelliteResolver::new(&[]);
        assert_eq!(resolver.candidates(), &DEFAULT_SATELLITES);
        assert_eq!(resolver.current(), 1);
    }

    #[test]
    fn test_try_next_wraps_and_exhausts() {
        let mut resolver = SatelliteResolver::new(&[1, 2, 3]).with_start(2);
        assert_eq!(resolver.current(), 2);
        assert_eq!(resolver.try_next_candidate(), Some(3));
        assert_eq!(resolver.try_next_candidate(), Some(1));
        assert_eq!(resolver.try_next_candidate(), None);
        // Exhaustion returns to the committed guess
        assert_eq!(resolver.current(), 2);
    }

    #[test]
    fn test_commit_moves_start() {
        let mut resolver = SatelliteResolver::new(&[1, 2]);
        assert_eq!(resolver.try_next_candidate(), Some(2));
        resolver.commit();
        assert_eq!(resolver.try_next_candidate(), Some(1));
        assert_eq!(resolver.try_next_candidate(), None);
        assert_eq!(resolver.current(), 2);
    }

    #[test]
    fn test_with_start_unknown_satellite() {
        let resolver = SatelliteResolver::new(&[1, 2]).with_start(4);
        assert_eq!(resolver.candidates(), &[4, 1, 2]);
        assert_eq!(resolver.current(), 4);
    }

    #[test]
    fn test_independent_resolvers() {
        let mut a = SatelliteResolver::new(&[1, 2]);
        let b = SatelliteResolver::new(&[1, 2]);
        a.try_next_candidate();
        a.commit();
        assert_eq!(a.current(), 2);
        assert_eq!(b.current(), 1);
    }

    #[test]
    fn test_find_prologue_falls_back() {
        let dir = TempDir::new().unwrap();
        let locator = FileLocator::new(dir.path(), "200501181200");
        fs::write(locator.prologue_path(2), b"x").unwrap();

        let mut resolver = SatelliteResolver::new(&[1, 2, 3]);
        let path = locator.find_prologue(&mut resolver).unwrap();
        assert_eq!(path, locator.prologue_path(2));
        assert_eq!(resolver.current(), 2);

        // Committed: the next lookup starts at satellite 2
        fs::write(locator.strip_path(2, Channel::Ir108, 1), b"x").unwrap();
        let strip = locator.find_strip(&mut resolver, Channel::Ir108, 1).unwrap();
        assert!(strip.ends_with("H-000-MSG2__-MSG2________-IR_108___-000001___-200501181200-C_"));
    }

    #[test]
    fn test_find_missing_file() {
        let dir = TempDir::new().unwrap();
        let locator = FileLocator::new(dir.path(), "200501181200");
        let mut resolver = SatelliteResolver::new(&[1, 2]);
        assert!(locator.find_prologue(&mut resolver).is_none());
        assert_eq!(resolver.current(), 1);
    }
}
