//! Build metadata embedded by the build script, reported by `pyver version`.

use serde::Serialize;

/// Short git commit hash, suffixed with `-dirty` for modified trees.
pub const GIT_HASH: &str = env!("PYVER_GIT_HASH");

/// Cargo profile (`debug` or `release`).
pub const BUILD_PROFILE: &str = env!("PYVER_BUILD_PROFILE");

/// Target triple the binary was compiled for.
pub const BUILD_TARGET: &str = env!("PYVER_BUILD_TARGET");

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build metadata in serializable form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub profile: &'static str,
    pub target: &'static str,
}

impl BuildInfo {
    pub const CURRENT: BuildInfo = BuildInfo {
        version: VERSION,
        git_hash: GIT_HASH,
        profile: BUILD_PROFILE,
        target: BUILD_TARGET,
    };
}

/// `"0.1.0 (abc1234, debug, x86_64-unknown-linux-gnu)"`
pub fn version_string() -> String {
    let info = BuildInfo::CURRENT;
    format!(
        "{} ({}, {}, {})",
        info.version, info.git_hash, info.profile, info.target
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_mentions_version_and_hash() {
        let v = version_string();
        assert!(v.starts_with(VERSION));
        assert!(v.contains(GIT_HASH));
    }

    #[test]
    fn test_build_info_is_populated() {
        let info = BuildInfo::CURRENT;
        assert!(!info.git_hash.is_empty());
        assert!(!info.target.is_empty());
        assert!(!info.profile.is_empty());
    }
}
