use crate::cache::CacheStore;
use crate::config::Config;
use crate::fetcher::{ImageSource, PollinationsImage, RetryPolicy};
use crate::file_manager::wallpaper_dir;
use crate::mood::{seasonal_solar_hours, SolarModel};
use crate::prompt::backend::{backends_for_models, TextBackend};
use crate::sources::{IpLocator, LocationResolver, QqWeather, WeatherResolver};
use crate::subscribers::SubscriberRegistry;
use chrono::{Local, NaiveDateTime};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

/// Local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// The external services the pipeline talks to.
pub struct Collaborators {
    pub locator: Arc<dyn LocationResolver>,
    pub weather: Arc<dyn WeatherResolver>,
    pub text_backends: Vec<Arc<dyn TextBackend>>,
    pub images: Arc<dyn ImageSource>,
}

impl Collaborators {
    pub fn from_config(config: &Config, client: &Client) -> Self {
        Self {
            locator: Arc::new(IpLocator::new(client.clone())),
            weather: Arc::new(QqWeather::new(client.clone())),
            text_backends: backends_for_models(client, &config.text_endpoint, &config.text_models),
            images: Arc::new(PollinationsImage::new(
                client.clone(),
                &config.image_endpoint,
                config.image.clone(),
            )),
        }
    }
}

pub struct AppState {
    pub app_data_dir: PathBuf,
    pub wallpaper_dir: PathBuf,
    pub config: Mutex<Config>,
    pub cache: CacheStore,
    pub subscribers: SubscriberRegistry,
    /// Held for the whole of a tick or a manual refresh.
    pub regen_lock: Mutex<()>,
    /// Wakes the monitor early, e.g. after the location settings change.
    pub monitor_notify: Notify,
    pub locator: Arc<dyn LocationResolver>,
    pub weather: Arc<dyn WeatherResolver>,
    pub text_backends: Vec<Arc<dyn TextBackend>>,
    pub images: Arc<dyn ImageSource>,
    pub retry: RetryPolicy,
    pub solar: SolarModel,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(app_data_dir: PathBuf, config: Config, collaborators: Collaborators) -> Self {
        let retry = RetryPolicy {
            max_retries: config.max_retries,
            ..RetryPolicy::default()
        };
        Self {
            wallpaper_dir: wallpaper_dir(&app_data_dir),
            app_data_dir,
            config: Mutex::new(config),
            cache: CacheStore::new(),
            subscribers: SubscriberRegistry::new(),
            regen_lock: Mutex::new(()),
            monitor_notify: Notify::new(),
            locator: collaborators.locator,
            weather: collaborators.weather,
            text_backends: collaborators.text_backends,
            images: collaborators.images,
            retry,
            solar: seasonal_solar_hours,
            clock: Arc::new(SystemClock),
        }
    }
}
