//! Finds a CMYK profile installed with the operating system,
//! used for CMYK documents without an embedded profile.

use std::path::{Path, PathBuf};


/// Which system profile CMYK documents without an embedded profile are calibrated with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum SystemProfile {

    /// Search the well-known locations of the operating system.
    #[default]
    Locate,

    /// Use this profile file.
    Path(PathBuf),

    /// Never calibrate without an embedded profile.
    Disabled,
}

impl SystemProfile {

    /// The profile file to use, if any exists.
    pub fn resolve(&self) -> Option<PathBuf> {
        match self {
            SystemProfile::Locate => locate_cmyk_profile(),
            SystemProfile::Path(path) => Some(path.clone()).filter(|path| path.is_file()),
            SystemProfile::Disabled => None,
        }
    }
}


/// Search the well-known profile locations of the current operating system.
pub fn locate_cmyk_profile() -> Option<PathBuf> {
    if cfg!(target_os = "macos") {
        let mut candidates = vec![
            PathBuf::from("/System/Library/ColorSync/Profiles/Generic CMYK Profile.icc"),
            PathBuf::from("/Library/ColorSync/Profiles/Generic CMYK Profile.icc"),
        ];

        if let Some(home) = std::env::var_os("HOME") {
            candidates.push(Path::new(&home).join("Library/ColorSync/Profiles/Generic CMYK Profile.icc"));
        }

        return candidates.into_iter().find(|path| path.is_file());
    }

    if cfg!(windows) {
        let windows = std::env::var_os("WINDIR")?;
        let directory = Path::new(&windows).join("System32").join("spool").join("drivers").join("color");

        return ["CoatedFOGRA39.icc", "ISOcoated_v2_300_eci.icc", "USWebCoatedSWOP.icc", "JapanColor2001Coated.icc"]
            .iter().map(|name| directory.join(name))
            .find(|path| path.is_file());
    }

    ["/usr/share/color/icc", "/usr/local/share/color/icc"]
        .iter().find_map(|directory| first_profile_in(Path::new(directory)))
}

/// The alphabetically first `.icc` file in a directory.
fn first_profile_in(directory: &Path) -> Option<PathBuf> {
    let mut profiles: Vec<PathBuf> = std::fs::read_dir(directory).ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().map_or(false, |extension| extension.eq_ignore_ascii_case("icc")))
        .collect();

    profiles.sort();
    profiles.into_iter().next()
}

/// The name shown for a profile file: its file name without extension.
pub fn display_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
