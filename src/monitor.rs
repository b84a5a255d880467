//! Change detection: samples conditions on a fixed tick and regenerates the
//! wallpaper when the fingerprint moves or the hourly heartbeat comes due.

use crate::cache::CachedWallpaper;
use crate::config::LocationConfig;
use crate::fetcher::fetch_and_cache;
use crate::file_manager::wallpaper_filename;
use crate::mood::{fingerprint_at, Fingerprint};
use crate::prompt::{generate_prompt, CalendarContext};
use crate::sources::{Location, LocationResolver, WeatherSnapshot};
use crate::state::AppState;
use crate::subscribers::RefreshEvent;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Timelike};
use futures_util::FutureExt;
use log::{debug, error, info, warn};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::time::sleep;

/// Minimum gap between a trigger and the next heartbeat.
const HEARTBEAT_COOLDOWN_SECS: i64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    WaitingForSubscribers,
    Polling,
    Regenerating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    FirstRun,
    TimeMoodChanged,
    WeatherChanged,
    Heartbeat,
}

/// Remembers the last fingerprint and when a regeneration was last started.
#[derive(Debug, Default)]
pub struct TriggerPolicy {
    last: Option<(Fingerprint, NaiveDateTime)>,
}

impl TriggerPolicy {
    /// Every reason that applies at `now`; empty means stay idle.
    pub fn reasons(&self, fingerprint: Fingerprint, now: NaiveDateTime) -> Vec<TriggerReason> {
        let Some((last_fp, last_at)) = self.last else {
            return vec![TriggerReason::FirstRun];
        };
        let mut reasons = Vec::new();
        if fingerprint.time_mood != last_fp.time_mood {
            reasons.push(TriggerReason::TimeMoodChanged);
        }
        if fingerprint.weather_key != last_fp.weather_key {
            reasons.push(TriggerReason::WeatherChanged);
        }
        if now.minute() == 0 && (now - last_at).num_seconds() > HEARTBEAT_COOLDOWN_SECS {
            reasons.push(TriggerReason::Heartbeat);
        }
        reasons
    }

    /// Called once a regeneration starts, whatever its outcome.
    pub fn record(&mut self, fingerprint: Fingerprint, now: NaiveDateTime) {
        self.last = Some((fingerprint, now));
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegenerationError {
    #[error("image download failed for prompt {prompt:?}")]
    DownloadFailed { prompt: String },
}

/// Conditions observed by one refresh.
#[derive(Debug, Clone)]
pub struct Conditions {
    pub location: Location,
    pub weather: WeatherSnapshot,
    pub fingerprint: Fingerprint,
    pub observed_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct Regeneration {
    pub prompt: String,
    pub filename: String,
    /// `false` when the file was already on disk and no download happened.
    pub downloaded: bool,
}

/// Auto mode asks the IP resolver and falls back to the last known location,
/// then to the manual one. Manual mode never touches the network.
pub async fn resolve_location(
    locator: &dyn LocationResolver,
    config: &LocationConfig,
    previous: Option<Location>,
) -> Location {
    if !config.auto_location {
        return config.manual_location.clone();
    }
    match locator.resolve().await {
        Ok(location) => location,
        Err(e) => {
            warn!("[monitor] location lookup failed: {}", e);
            match previous {
                Some(previous) => previous,
                None if config.manual_location.is_blank() => {
                    warn!("[monitor] no location known and manual location is empty");
                    Location::default()
                }
                None => {
                    info!("[monitor] falling back to manual location");
                    config.manual_location.clone()
                }
            }
        }
    }
}

/// Refreshes location and weather and stores them with the new fingerprint.
pub async fn refresh_conditions(state: &AppState) -> Conditions {
    let location_config = state.config.lock().await.location.clone();
    let previous = state.cache.location().await;
    let location = resolve_location(state.locator.as_ref(), &location_config, previous).await;

    let weather = match state.weather.lookup(&location).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("[monitor] weather lookup failed: {}", e);
            state
                .cache
                .weather()
                .await
                .unwrap_or_else(WeatherSnapshot::placeholder)
        }
    };

    let observed_at = state.clock.now();
    let fingerprint = fingerprint_at(observed_at, &weather.weather, state.solar);
    state
        .cache
        .record_conditions(location.clone(), weather.clone(), fingerprint)
        .await;
    debug!(
        "[monitor] conditions: {}/{} at {}",
        fingerprint.time_mood, fingerprint.weather_key, observed_at
    );

    Conditions {
        location,
        weather,
        fingerprint,
        observed_at,
    }
}

/// Generates a prompt, makes sure its image is on disk, then publishes it.
///
/// Callers must hold `regen_lock`.
pub async fn regenerate(
    state: &AppState,
    conditions: &Conditions,
) -> Result<Regeneration, RegenerationError> {
    let fingerprint = conditions.fingerprint;
    let ctx = CalendarContext::new(conditions.observed_at, &conditions.weather.weather, state.solar);
    let prompt = generate_prompt(fingerprint, &ctx, &state.text_backends).await;
    let filename = wallpaper_filename(&prompt);
    let path = state.wallpaper_dir.join(&filename);

    let downloaded = if path.exists() {
        info!("[monitor] {} already cached, skipping download", filename);
        false
    } else if fetch_and_cache(state.images.as_ref(), &prompt, &path, &state.retry).await {
        true
    } else {
        return Err(RegenerationError::DownloadFailed { prompt });
    };

    state
        .cache
        .publish(CachedWallpaper {
            fingerprint,
            prompt: prompt.clone(),
            file_path: path,
            generated_at: local_time(state.clock.now()),
        })
        .await;
    let receivers = state.subscribers.broadcast(RefreshEvent {
        time_mood: fingerprint.time_mood,
        weather: fingerprint.weather_key,
    });
    info!(
        "[monitor] published {} for {}/{} to {} client(s)",
        filename, fingerprint.time_mood, fingerprint.weather_key, receivers
    );

    Ok(Regeneration {
        prompt,
        filename,
        downloaded,
    })
}

/// Falls back to the system clock only for times skipped by a DST change.
fn local_time(now: NaiveDateTime) -> DateTime<Local> {
    Local
        .from_local_datetime(&now)
        .earliest()
        .unwrap_or_else(Local::now)
}

/// Manual refresh. Shares the monitor's lock so the two never overlap.
pub async fn force_refresh(state: &AppState) -> Result<Regeneration, RegenerationError> {
    let _guard = state.regen_lock.lock().await;
    let conditions = refresh_conditions(state).await;
    regenerate(state, &conditions).await
}

pub struct Monitor {
    state: Arc<AppState>,
    policy: TriggerPolicy,
    phase: MonitorPhase,
}

impl Monitor {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            policy: TriggerPolicy::default(),
            phase: MonitorPhase::WaitingForSubscribers,
        }
    }

    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    fn enter(&mut self, phase: MonitorPhase) {
        if self.phase != phase {
            debug!("[monitor] {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    /// Runs forever. A failing or panicking tick is logged and the loop goes on.
    pub async fn run(mut self) {
        loop {
            if !self.state.subscribers.is_active() {
                self.enter(MonitorPhase::WaitingForSubscribers);
                info!("[monitor] no push clients, waiting for ready_for_push");
                self.state.subscribers.wait_until_active().await;
                info!(
                    "[monitor] {} push client(s) connected, starting to poll",
                    self.state.subscribers.active()
                );
            }
            self.enter(MonitorPhase::Polling);

            match AssertUnwindSafe(self.tick()).catch_unwind().await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!("[monitor] regeneration failed: {}", e),
                Err(_) => error!("[monitor] tick panicked, continuing"),
            }
            self.enter(MonitorPhase::Polling);

            let interval = Duration::from_secs(self.state.config.lock().await.tick_interval_secs.max(1));
            self.wait_for_next_tick(interval).await;
        }
    }

    async fn wait_for_next_tick(&self, interval: Duration) {
        select! {
            _ = sleep(interval) => {}
            _ = self.state.monitor_notify.notified() => {
                info!("[monitor] settings changed, re-checking now");
            }
        }
    }

    /// One sample. Returns the regeneration if one was triggered.
    pub async fn tick(&mut self) -> Result<Option<Regeneration>, RegenerationError> {
        let state = self.state.clone();
        let _guard = state.regen_lock.lock().await;
        let conditions = refresh_conditions(&state).await;
        let fingerprint = conditions.fingerprint;

        let reasons = self.policy.reasons(fingerprint, conditions.observed_at);
        if reasons.is_empty() {
            debug!("[monitor] nothing changed");
            return Ok(None);
        }
        info!(
            "[monitor] regenerating for {}/{} ({:?})",
            fingerprint.time_mood, fingerprint.weather_key, reasons
        );
        self.policy.record(fingerprint, conditions.observed_at);

        self.enter(MonitorPhase::Regenerating);
        let outcome = regenerate(&state, &conditions).await;
        self.enter(MonitorPhase::Polling);
        outcome.map(Some)
    }
}
