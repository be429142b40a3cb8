// vsci-core/src/install/desktop.rs
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use vsci_common::error::Result;

const CATEGORIES: &str = "Development;";
const ICON_FILE: &str = "icon.png";

struct KnownProduct {
    needle: &'static str,
    display_name: &'static str,
    comment: &'static str,
    icon: &'static str,
}

// Order matters: the first substring match wins.
const KNOWN_PRODUCTS: &[KnownProduct] = &[
    KnownProduct {
        needle: "windsurf",
        display_name: "Windsurf",
        comment: "AI-powered code editor",
        icon: "windsurf",
    },
    KnownProduct {
        needle: "cursor",
        display_name: "Cursor",
        comment: "AI-powered IDE",
        icon: "cursor",
    },
    KnownProduct {
        needle: "code",
        display_name: "Visual Studio Code",
        comment: "Code editing. Redefined.",
        icon: "code",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopEntry {
    pub name: String,
    pub comment: String,
    pub exec: PathBuf,
    pub icon: String,
    pub startup_wm_class: String,
}

impl DesktopEntry {
    /// Builds the entry for `app_name`, preferring `<install_dir>/icon.png`
    /// over the product's themed icon name.
    pub fn for_app(app_name: &str, exec: &Path, install_dir: &Path) -> Self {
        let icon_file = install_dir.join(ICON_FILE);
        let bundled_icon = icon_file
            .is_file()
            .then(|| icon_file.to_string_lossy().into_owned());

        let lower = app_name.to_lowercase();
        let known = KNOWN_PRODUCTS.iter().find(|p| lower.contains(p.needle));
        let (name, comment, themed_icon) = match known {
            Some(p) => (p.display_name.to_string(), p.comment, p.icon),
            None => (app_name.to_string(), "Code Editor", ""),
        };

        Self {
            name,
            comment: comment.to_string(),
            exec: exec.to_path_buf(),
            icon: bundled_icon.unwrap_or_else(|| themed_icon.to_string()),
            startup_wm_class: app_name.to_string(),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "[Desktop Entry]\n\
             Name={}\n\
             Comment={}\n\
             Exec={}\n\
             Icon={}\n\
             Type=Application\n\
             Categories={}\n\
             Terminal=false\n\
             StartupWMClass={}\n",
            self.name,
            self.comment,
            self.exec.display(),
            self.icon,
            CATEGORIES,
            self.startup_wm_class
        )
    }

    /// Writes `<dir>/<file_stem>.desktop`, creating `dir` if needed.
    pub fn write_to(&self, dir: &Path, file_stem: &str) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{file_stem}.desktop"));
        fs::write(&path, self.render())?;
        debug!("Wrote desktop entry {}", path.display());
        Ok(path)
    }
}
