use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "MoodWall";
pub const DEFAULT_WALLPAPER: &str = "default.jpg";
pub const WALLPAPER_URL_PREFIX: &str = "/static/wallpapers";
// Most filesystems cap a name at 255 bytes; leave room for the extension.
const MAX_STEM_BYTES: usize = 200;

/// Resolves the data directory and creates the wallpaper and log folders.
pub fn init_app_data_dir(override_dir: Option<&Path>) -> Result<PathBuf, std::io::Error> {
    let app_data_path = if let Some(dir) = override_dir {
        dir.to_path_buf()
    } else if let Ok(s) = std::env::var("APPDATA") {
        PathBuf::from(s).join(APP_DIR_NAME)
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config").join(APP_DIR_NAME)
    } else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Failed to determine app data directory",
        ));
    };

    std::fs::create_dir_all(wallpaper_dir(&app_data_path))?;
    std::fs::create_dir_all(app_data_path.join("logs"))?;
    Ok(app_data_path)
}

pub fn wallpaper_dir(app_data_dir: &Path) -> PathBuf {
    app_data_dir.join("static").join("wallpapers")
}

/// `<trimmed prompt>.jpg`. Identical prompts share a file.
///
/// Characters that cannot appear in a file name are replaced with `_`, and
/// stems too long for common filesystems fall back to their SHA-256 digest.
pub fn wallpaper_filename(prompt: &str) -> String {
    let stem: String = prompt
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if stem.len() > MAX_STEM_BYTES {
        format!("{}.jpg", sha256::digest(prompt.trim()))
    } else {
        format!("{}.jpg", stem)
    }
}

/// The file name is percent-encoded so `#`, `%` and spaces survive as one path segment.
pub fn wallpaper_url(filename: &str) -> String {
    format!("{}/{}", WALLPAPER_URL_PREFIX, urlencoding::encode(filename))
}
