// vsci-core/src/install/locate.rs
use std::fs::{self, File};
use std::io::Read;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

/// How many directory levels below the root are searched.
pub const MAX_DEPTH: usize = 3;

const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];
const SHEBANG: [u8; 2] = [b'#', b'!'];

/// Executables shipped alongside applications that are never the application.
const DENYLIST: &[&str] = &["sh", "bash", "chmod", "ln"];

/// Binary names mapped to the product name used for the install directory.
const CANONICAL_NAMES: &[(&str, &str)] = &[
    ("code", "VSCode"),
    ("vscode", "VSCode"),
    ("windsurf", "Windsurf"),
    ("cursor", "Cursor"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocateResult {
    pub exec_path: PathBuf,
    /// Directory holding the executable; this is what gets relocated.
    pub app_dir: PathBuf,
    pub app_name: String,
}

/// Searches `root` for the application executable. Directory entries are
/// visited in file-name order; hidden entries are never considered.
pub fn locate(root: &Path) -> Option<LocateResult> {
    let exec_path = search(root, 0)?;
    let app_dir = exec_path.parent()?.to_path_buf();
    let app_name = app_name_from_exec(&exec_path);
    if !is_valid_app_name(&app_name) {
        debug!(
            "Rejecting {}: no usable application name",
            exec_path.display()
        );
        return None;
    }
    debug!(
        "Located executable {} (app '{}')",
        exec_path.display(),
        app_name
    );
    Some(LocateResult {
        exec_path,
        app_dir,
        app_name,
    })
}

fn search(dir: &Path, depth: usize) -> Option<PathBuf> {
    trace!("Searching {} at depth {}", dir.display(), depth);
    let mut entries: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(rd) => rd
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .map(|e| e.path())
            .collect(),
        Err(e) => {
            debug!("Cannot list {}: {}", dir.display(), e);
            return None;
        }
    };
    entries.sort();

    let accepted = entries
        .iter()
        .filter(|p| is_executable_file(p))
        .filter(|p| !is_denylisted(p))
        .find(|p| has_application_header(p));
    if let Some(found) = accepted {
        return Some(found.clone());
    }

    if depth >= MAX_DEPTH {
        return None;
    }

    let subdirs: Vec<&PathBuf> = entries
        .iter()
        .filter(|p| {
            p.symlink_metadata()
                .map(|m| m.file_type().is_dir())
                .unwrap_or(false)
        })
        .collect();
    match subdirs.as_slice() {
        [] => None,
        [only] => {
            debug!("Descending into single subdirectory {}", only.display());
            search(only, depth + 1)
        }
        many => many.iter().find_map(|sub| search(sub, depth + 1)),
    }
}

fn is_executable_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

fn is_denylisted(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .is_some_and(|n| DENYLIST.contains(&n.as_str()))
}

/// True for ELF binaries and `#!` scripts.
pub fn has_application_header(path: &Path) -> bool {
    let mut header = [0u8; 4];
    let read = match File::open(path).and_then(|mut f| read_prefix(&mut f, &mut header)) {
        Ok(n) => n,
        Err(e) => {
            debug!("Cannot read {}: {}", path.display(), e);
            return false;
        }
    };
    let header = &header[..read];
    header == ELF_MAGIC || header.starts_with(&SHEBANG)
}

fn read_prefix(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// File name up to the first dot, with known product binaries renamed.
pub fn app_name_from_exec(exec_path: &Path) -> String {
    let file_name = exec_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = file_name.split('.').next().unwrap_or_default();
    CANONICAL_NAMES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(base))
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| base.to_string())
}

/// A name that joins onto the install root as exactly one new component.
pub fn is_valid_app_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/')
}
