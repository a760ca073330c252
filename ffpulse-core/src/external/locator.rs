//! Resolution of the bundled ffmpeg/ffprobe executables.
//!
//! Binaries live under a resource root that depends on how the application is
//! deployed (development tree or packaged bundle), in a per-platform
//! subdirectory:
//!
//! ```text
//! <resources>/mac/ffmpeg      <resources>/win/ffmpeg.exe
//! <resources>/mac/ffprobe     <resources>/win/ffprobe.exe
//! ```
//!
//! Nothing here touches the filesystem beyond making paths absolute; a missing
//! binary surfaces when it is first spawned.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Platform families with bundled binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    MacOs,
    Windows,
}

impl Platform {
    /// Platform family of the running process.
    #[must_use]
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Maps an OS name (as in `std::env::consts::OS`) to a family.
    /// Everything that is not macOS uses the Windows bundle.
    #[must_use]
    pub fn from_os(os: &str) -> Self {
        if os == "macos" {
            Self::MacOs
        } else {
            Self::Windows
        }
    }

    fn resource_subdir(self) -> &'static str {
        match self {
            Self::MacOs => "mac",
            Self::Windows => "win",
        }
    }

    fn executable_name(self, stem: &str) -> String {
        match self {
            Self::MacOs => stem.to_string(),
            Self::Windows => format!("{stem}.exe"),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_subdir())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mac" | "macos" | "darwin" => Ok(Self::MacOs),
            "win" | "windows" | "win32" => Ok(Self::Windows),
            other => Err(format!("unknown platform '{other}' (expected 'mac' or 'win')")),
        }
    }
}

/// Absolute paths of the engine and probe executables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryPaths {
    pub engine: PathBuf,
    pub probe: PathBuf,
}

/// Maps platform and deployment mode to binary locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryLocator {
    dev_root: PathBuf,
    packaged_root: PathBuf,
}

impl BinaryLocator {
    pub fn new(dev_root: impl Into<PathBuf>, packaged_root: impl Into<PathBuf>) -> Self {
        Self {
            dev_root: dev_root.into(),
            packaged_root: packaged_root.into(),
        }
    }

    /// Resource directory used for the given deployment mode.
    #[must_use]
    pub fn resource_root(&self, packaged: bool) -> &Path {
        if packaged {
            &self.packaged_root
        } else {
            &self.dev_root
        }
    }

    #[must_use]
    pub fn locate(&self, platform: Platform, packaged: bool) -> BinaryPaths {
        let dir = absolutize(self.resource_root(packaged)).join(platform.resource_subdir());
        BinaryPaths {
            engine: dir.join(platform.executable_name("ffmpeg")),
            probe: dir.join(platform.executable_name("ffprobe")),
        }
    }
}

impl Default for BinaryLocator {
    fn default() -> Self {
        Self::new(default_dev_root(), default_packaged_root())
    }
}

/// `resources/` at the workspace root.
#[must_use]
pub fn default_dev_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("resources")
}

/// `resources/` next to the running executable.
#[must_use]
pub fn default_packaged_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("resources")
}

fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
