use crate::file_manager::{wallpaper_url, DEFAULT_WALLPAPER};
use crate::mood::Fingerprint;
use crate::sources::{Location, WeatherSnapshot};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Reported in place of a prompt before the first regeneration.
pub const NO_PROMPT: &str = "None";

#[derive(Debug, Clone, PartialEq)]
pub struct CachedWallpaper {
    pub fingerprint: Fingerprint,
    pub prompt: String,
    pub file_path: PathBuf,
    pub generated_at: DateTime<Local>,
}

impl CachedWallpaper {
    pub fn filename(&self) -> Option<String> {
        self.file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

/// Everything the monitor publishes. Always replaced or read as a unit.
#[derive(Debug, Clone, Default)]
pub struct CacheState {
    pub wallpaper: Option<CachedWallpaper>,
    /// Fingerprint observed on the latest tick.
    pub fingerprint: Option<Fingerprint>,
    /// `None` until a location has been resolved or configured.
    pub location: Option<Location>,
    /// `None` until the first weather refresh.
    pub weather: Option<WeatherSnapshot>,
}

#[derive(Default)]
pub struct CacheStore {
    inner: RwLock<CacheState>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> CacheState {
        self.inner.read().await.clone()
    }

    pub async fn location(&self) -> Option<Location> {
        self.inner.read().await.location.clone()
    }

    pub async fn weather(&self) -> Option<WeatherSnapshot> {
        self.inner.read().await.weather.clone()
    }

    pub async fn record_conditions(
        &self,
        location: Location,
        weather: WeatherSnapshot,
        fingerprint: Fingerprint,
    ) {
        let mut guard = self.inner.write().await;
        guard.location = Some(location);
        guard.weather = Some(weather);
        guard.fingerprint = Some(fingerprint);
    }

    pub async fn publish(&self, wallpaper: CachedWallpaper) {
        self.inner.write().await.wallpaper = Some(wallpaper);
    }
}

/// What the read path reports for the current wallpaper.
#[derive(Debug, Clone, PartialEq)]
pub struct WallpaperView {
    pub prompt: String,
    /// Empty when neither the cached image nor the default exists.
    pub image_url: String,
}

/// Cached image if it is still on disk, else the default image, else nothing.
pub fn resolve_view(state: &CacheState, wallpaper_dir: &Path) -> WallpaperView {
    let prompt = state
        .wallpaper
        .as_ref()
        .map(|w| w.prompt.clone())
        .unwrap_or_else(|| NO_PROMPT.to_string());

    let cached = state
        .wallpaper
        .as_ref()
        .filter(|w| w.file_path.exists())
        .and_then(CachedWallpaper::filename);

    let image_url = match cached {
        Some(filename) => wallpaper_url(&filename),
        None if wallpaper_dir.join(DEFAULT_WALLPAPER).exists() => wallpaper_url(DEFAULT_WALLPAPER),
        None => String::new(),
    };

    WallpaperView { prompt, image_url }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::{TimeMood, WeatherKey};
    use tempfile::TempDir;

    fn record(dir: &Path, prompt: &str) -> CachedWallpaper {
        CachedWallpaper {
            fingerprint: Fingerprint::new(TimeMood::Dawn, WeatherKey::Fog),
            prompt: prompt.to_string(),
            file_path: dir.join(format!("{}.jpg", prompt)),
            generated_at: Local::now(),
        }
    }

    #[test]
    fn empty_cache_reports_sentinel() {
        let tmp = TempDir::new().unwrap();
        let view = resolve_view(&CacheState::default(), tmp.path());
        assert_eq!(view.prompt, NO_PROMPT);
        assert_eq!(view.image_url, "");
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(DEFAULT_WALLPAPER), b"img").unwrap();
        let state = CacheState {
            wallpaper: Some(record(tmp.path(), "foggy dawn")),
            ..Default::default()
        };
        let view = resolve_view(&state, tmp.path());
        assert_eq!(view.prompt, "foggy dawn");
        assert_eq!(view.image_url, "/static/wallpapers/default.jpg");
    }

    #[test]
    fn present_file_is_served() {
        let tmp = TempDir::new().unwrap();
        let wallpaper = record(tmp.path(), "foggy dawn");
        std::fs::write(&wallpaper.file_path, b"img").unwrap();
        let state = CacheState {
            wallpaper: Some(wallpaper),
            ..Default::default()
        };
        assert_eq!(
            resolve_view(&state, tmp.path()).image_url,
            "/static/wallpapers/foggy%20dawn.jpg"
        );
    }

    #[tokio::test]
    async fn conditions_are_swapped_together() {
        let store = CacheStore::new();
        let fp = Fingerprint::new(TimeMood::Night, WeatherKey::Snow);
        store
            .record_conditions(Location::new("四川", "成都", "成华区"), WeatherSnapshot::placeholder(), fp)
            .await;
        let snap = store.snapshot().await;
        assert_eq!(snap.fingerprint, Some(fp));
        assert_eq!(snap.location.unwrap().city, "成都");
        assert_eq!(snap.weather.unwrap().weather, "未知");
        assert!(snap.wallpaper.is_none());
    }
}
