//! Download sources: the URL list and per-worker rotation.
//!
//! A list file is UTF-8 text with one URL per line; blank lines and lines
//! starting with `#` are skipped. Any problem with the file (missing,
//! unreadable, nothing usable in it) falls back to the built-in list; loading
//! never fails a run.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;

/// Public speed-test files. Plain HTTP to stay clear of certificate issues.
pub const DEFAULT_SOURCES: &[&str] = &[
    "http://speedtest.tele2.net/100MB.zip",
    "http://speedtest.tele2.net/1GB.zip",
    "http://speedtest.tele2.net/10GB.zip",
    "http://proof.ovh.net/files/100Mb.dat",
    "http://proof.ovh.net/files/1Gb.dat",
    "http://proof.ovh.net/files/10Gb.dat",
    "http://ash-speed.hetzner.com/100MB.bin",
    "http://ash-speed.hetzner.com/1GB.bin",
    "http://ash-speed.hetzner.com/10GB.bin",
    "http://ipv4.download.thinkbroadband.com/100MB.zip",
    "http://ipv4.download.thinkbroadband.com/1GB.zip",
    "http://speed.hetzner.de/100MB.bin",
    "http://speed.hetzner.de/1GB.bin",
    "http://speed.hetzner.de/10GB.bin",
];

/// Where the active list came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    BuiltIn,
    File(PathBuf),
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceOrigin::BuiltIn => f.write_str("built-in list"),
            SourceOrigin::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Ordered, non-empty, read-only list of URLs shared by all workers.
#[derive(Debug, Clone)]
pub struct SourceList {
    urls: Vec<String>,
    origin: SourceOrigin,
}

impl SourceList {
    pub fn builtin() -> Self {
        Self {
            urls: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            origin: SourceOrigin::BuiltIn,
        }
    }

    /// List from explicit URLs; `None` when `urls` is empty.
    pub fn from_urls(urls: Vec<String>, origin: SourceOrigin) -> Option<Self> {
        if urls.is_empty() {
            None
        } else {
            Some(Self { urls, origin })
        }
    }

    /// Loads `path`, falling back to the built-in list with a warning.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
            return Self::builtin();
        };
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "cannot read URL file, using built-in list"
                );
                return Self::builtin();
            }
        };
        match Self::from_urls(parse_source_lines(&text), SourceOrigin::File(path.to_path_buf())) {
            Some(list) => {
                tracing::info!(path = %path.display(), count = list.len(), "loaded URL list");
                list
            }
            None => {
                tracing::warn!(path = %path.display(), "URL file is empty, using built-in list");
                Self::builtin()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn origin(&self) -> &SourceOrigin {
        &self.origin
    }

    /// Rotation for one worker, starting at a random position so workers
    /// spread over different URLs from the first request.
    pub fn rotation_for(&self, worker_id: usize) -> Rotation {
        let start = rand::thread_rng().gen_range(0..self.urls.len());
        tracing::trace!(worker = worker_id, start, "worker rotation start");
        Rotation::starting_at(start)
    }
}

/// A worker's private cursor into a `SourceList`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation {
    cursor: usize,
}

impl Rotation {
    pub fn starting_at(offset: usize) -> Self {
        Self { cursor: offset }
    }

    /// Current URL, then advance by one (wrapping).
    pub fn next<'a>(&mut self, list: &'a SourceList) -> &'a str {
        let url = &list.urls[self.cursor % list.urls.len()];
        self.cursor = (self.cursor + 1) % list.urls.len();
        url
    }
}

/// Trimmed, non-comment lines that parse as http(s) URLs. Others are skipped
/// with a warning.
pub fn parse_source_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| match url::Url::parse(line) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => true,
            Ok(u) => {
                tracing::warn!(url = %line, scheme = u.scheme(), "skipping non-HTTP source");
                false
            }
            Err(e) => {
                tracing::warn!(url = %line, error = %e, "skipping invalid source URL");
                false
            }
        })
        .map(str::to_string)
        .collect()
}
