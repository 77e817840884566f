//! Rails detection: recognize a Rails manifest and extract the version.
//!
//! Detection is advisory: a missing Rails gem downgrades to a warning,
//! since the analyzer only needs `config/routes.rb` to exist.

use crate::vfs::VirtualFS;
use log::debug;
use regex::Regex;
use std::sync::OnceLock;

/// Framework detector for identifying Rails projects.
///
/// Looks at `Gemfile.lock` first (it carries the exact resolved version),
/// then falls back to the `gem 'rails'` / `gem 'railties'` declaration in
/// the `Gemfile`.
pub struct FrameworkDetector;

/// Result of framework detection.
pub struct DetectionResult {
    /// Whether a Rails (or railties) dependency was found.
    pub is_rails: bool,
    /// The declared or locked version, when one could be extracted.
    pub version: Option<String>,
}

fn lockfile_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s+rails \((\d+\.\d+[^)]*)\)").expect("lockfile pattern"))
}

fn gemfile_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"gem\s+['"](?:rails|railties)['"](?:\s*,\s*['"]([^'"]+)['"])?"#)
            .expect("gemfile pattern")
    })
}

impl FrameworkDetector {
    /// Detect Rails in the project tree.
    pub fn detect(vfs: &dyn VirtualFS) -> DetectionResult {
        if let Some(lock) = vfs.read("Gemfile.lock") {
            if let Some(caps) = lockfile_pattern().captures(&lock) {
                let version = caps.get(1).map(|m| m.as_str().to_string());
                debug!("Rails detected from Gemfile.lock: {:?}", version);
                return DetectionResult {
                    is_rails: true,
                    version,
                };
            }
        }

        if let Some(gemfile) = vfs.read("Gemfile") {
            if let Some(caps) = gemfile_pattern().captures(&gemfile) {
                let version = caps.get(1).map(|m| m.as_str().to_string());
                debug!("Rails detected from Gemfile: {:?}", version);
                return DetectionResult {
                    is_rails: true,
                    version,
                };
            }
        }

        debug!("No Rails dependency found");
        DetectionResult {
            is_rails: false,
            version: None,
        }
    }
}
