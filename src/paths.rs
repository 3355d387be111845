//! Locating the game's save database and server settings on disk.
//!
//! `config/path.ini` (`[paths] db_path` / `ss_path`) wins when it names an
//! existing file; otherwise the usual Windows and Steam/Proton locations are
//! probed.

use std::path::{Path, PathBuf};

use ini::Ini;
use log::{debug, warn};

const PATHS_SECTION: &str = "paths";
const DB_KEY: &str = "db_path";
const SERVER_SETTINGS_KEY: &str = "ss_path";

const STEAM_APP_ID: &str = "513710";
const PROTON_LOCAL_APPDATA: &str = "pfx/drive_c/users/steamuser/AppData/Local";
const DB_RELATIVE: &str = "SCUM/Saved/SaveFiles/SCUM.db";
const SERVER_SETTINGS_RELATIVE: &str = "Config/WindowsNoEditor/ServerSettings.ini";

/// Explicit path from `path.ini`, if present and pointing at an existing file.
fn override_from_path_ini(path_ini: &Path, key: &str) -> Option<PathBuf> {
    if !path_ini.exists() {
        return None;
    }

    let ini = match Ini::load_from_file_noescape(path_ini) {
        Ok(ini) => ini,
        Err(err) => {
            warn!("Failed to read {}: {err}", path_ini.display());
            return None;
        }
    };

    let candidate = PathBuf::from(ini.get_from(Some(PATHS_SECTION), key)?.trim());
    if candidate.exists() {
        Some(candidate)
    } else {
        debug!(
            "{key} in {} points at missing file {}",
            path_ini.display(),
            candidate.display()
        );
        None
    }
}

/// Proton prefixes of the game under the regular and Flatpak Steam installs.
fn proton_local_appdata_dirs() -> Vec<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };

    [
        home.join("Steam/steamapps/compatdata"),
        home.join(".var/app/com.valvesoftware.Steam/.steam/steam/steamapps/compatdata"),
    ]
    .into_iter()
    .map(|compat| compat.join(STEAM_APP_ID).join(PROTON_LOCAL_APPDATA))
    .collect()
}

fn local_appdata_dirs() -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir().into_iter().collect()
    } else if cfg!(target_os = "linux") {
        proton_local_appdata_dirs()
    } else {
        Vec::new()
    }
}

pub fn db_candidates() -> Vec<PathBuf> {
    local_appdata_dirs()
        .into_iter()
        .map(|base| base.join(DB_RELATIVE))
        .collect()
}

/// Candidates for `ServerSettings.ini`, including the one next to the save
/// directory of an already located database.
pub fn server_settings_candidates(db_path: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = local_appdata_dirs()
        .into_iter()
        .map(|base| {
            if cfg!(target_os = "windows") {
                base.join("SCUM/Saved").join(SERVER_SETTINGS_RELATIVE)
            } else {
                base.join("SCUM").join(SERVER_SETTINGS_RELATIVE)
            }
        })
        .collect();

    // <root>/Saved/SaveFiles/SCUM.db -> <root>/Saved/Config/...
    if let Some(save_root) = db_path.and_then(Path::parent).and_then(Path::parent) {
        candidates.push(save_root.join(SERVER_SETTINGS_RELATIVE));
    }

    candidates
}

fn first_existing(candidates: Vec<PathBuf>) -> Option<PathBuf> {
    candidates.into_iter().find(|path| path.exists())
}

pub fn detect_db_path(explicit: Option<&Path>, path_ini: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit.filter(|path| path.exists()) {
        return Some(path.to_path_buf());
    }

    let found = override_from_path_ini(path_ini, DB_KEY).or_else(|| first_existing(db_candidates()));
    if found.is_none() {
        warn!(
            "SCUM.db not found. Set [{PATHS_SECTION}] {DB_KEY} in {}",
            path_ini.display()
        );
    }
    found
}

pub fn detect_server_settings_path(
    explicit: Option<&Path>,
    path_ini: &Path,
    db_path: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = explicit.filter(|path| path.exists()) {
        return Some(path.to_path_buf());
    }

    let found = override_from_path_ini(path_ini, SERVER_SETTINGS_KEY)
        .or_else(|| first_existing(server_settings_candidates(db_path)));
    if found.is_none() {
        warn!(
            "ServerSettings.ini not found. Set [{PATHS_SECTION}] {SERVER_SETTINGS_KEY} in {}",
            path_ini.display()
        );
    }
    found
}
