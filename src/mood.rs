use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position within the day relative to sunrise and sunset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeMood {
    Midnight,
    Dawn,
    EarlyMorning,
    LateMorning,
    EarlyAfternoon,
    LateAfternoon,
    SunsetStart,
    SunsetPeak,
    SunsetEnd,
    Night,
}

impl TimeMood {
    /// Every label, in the order the bands occur from 00:00.
    pub const ALL: [TimeMood; 10] = [
        TimeMood::Midnight,
        TimeMood::Dawn,
        TimeMood::EarlyMorning,
        TimeMood::LateMorning,
        TimeMood::EarlyAfternoon,
        TimeMood::LateAfternoon,
        TimeMood::SunsetStart,
        TimeMood::SunsetPeak,
        TimeMood::SunsetEnd,
        TimeMood::Night,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeMood::Midnight => "midnight",
            TimeMood::Dawn => "dawn",
            TimeMood::EarlyMorning => "early_morning",
            TimeMood::LateMorning => "late_morning",
            TimeMood::EarlyAfternoon => "early_afternoon",
            TimeMood::LateAfternoon => "late_afternoon",
            TimeMood::SunsetStart => "sunset_start",
            TimeMood::SunsetPeak => "sunset_peak",
            TimeMood::SunsetEnd => "sunset_end",
            TimeMood::Night => "night",
        }
    }
}

impl fmt::Display for TimeMood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse weather category derived from free-text weather descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherKey {
    Clear,
    Rain,
    Cloud,
    Snow,
    Fog,
    Overcast,
}

impl WeatherKey {
    pub const ALL: [WeatherKey; 6] = [
        WeatherKey::Clear,
        WeatherKey::Rain,
        WeatherKey::Cloud,
        WeatherKey::Snow,
        WeatherKey::Fog,
        WeatherKey::Overcast,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherKey::Clear => "clear",
            WeatherKey::Rain => "rain",
            WeatherKey::Cloud => "cloud",
            WeatherKey::Snow => "snow",
            WeatherKey::Fog => "fog",
            WeatherKey::Overcast => "overcast",
        }
    }
}

impl fmt::Display for WeatherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pair whose changes drive regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub time_mood: TimeMood,
    pub weather_key: WeatherKey,
}

impl Fingerprint {
    pub fn new(time_mood: TimeMood, weather_key: WeatherKey) -> Self {
        Self {
            time_mood,
            weather_key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }
}

/// Sunrise and sunset as fractional hours of local time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarHours {
    pub sunrise: f64,
    pub sunset: f64,
}

/// Maps a calendar month (1-12) to that month's sunrise and sunset.
///
/// Swapping this for a real solar calculation does not touch the classifier
/// or the monitor; both only ever see the returned hours.
pub type SolarModel = fn(u32) -> SolarHours;

/// Four-bucket seasonal approximation.
pub fn seasonal_solar_hours(month: u32) -> SolarHours {
    match Season::from_month(month) {
        Season::Spring => SolarHours {
            sunrise: 6.0,
            sunset: 18.5,
        },
        Season::Summer => SolarHours {
            sunrise: 5.5,
            sunset: 19.0,
        },
        Season::Autumn => SolarHours {
            sunrise: 6.25,
            sunset: 17.75,
        },
        Season::Winter => SolarHours {
            sunrise: 7.0,
            sunset: 16.75,
        },
    }
}

pub fn fractional_hour(time: NaiveTime) -> f64 {
    time.hour() as f64 + time.minute() as f64 / 60.0
}

/// Bands are half-open; anything before 03:00 is `Midnight`.
pub fn classify_time(now: NaiveTime, sunset_hour: f64) -> TimeMood {
    let hour = fractional_hour(now);
    if (3.0..6.0).contains(&hour) {
        TimeMood::Dawn
    } else if (6.0..9.0).contains(&hour) {
        TimeMood::EarlyMorning
    } else if (9.0..12.0).contains(&hour) {
        TimeMood::LateMorning
    } else if (12.0..15.0).contains(&hour) {
        TimeMood::EarlyAfternoon
    } else if (15.0..sunset_hour - 1.0).contains(&hour) {
        TimeMood::LateAfternoon
    } else if (sunset_hour - 1.0..sunset_hour).contains(&hour) {
        TimeMood::SunsetStart
    } else if (sunset_hour..sunset_hour + 0.5).contains(&hour) {
        TimeMood::SunsetPeak
    } else if (sunset_hour + 0.5..sunset_hour + 1.0).contains(&hour) {
        TimeMood::SunsetEnd
    } else if (sunset_hour + 1.0..24.0).contains(&hour) {
        TimeMood::Night
    } else {
        TimeMood::Midnight
    }
}

// Order matters: text matching several categories resolves to the first.
const WEATHER_PRIORITY: [(WeatherKey, &str, &str); 5] = [
    (WeatherKey::Rain, "雨", "rain"),
    (WeatherKey::Cloud, "云", "cloud"),
    (WeatherKey::Snow, "雪", "snow"),
    (WeatherKey::Fog, "雾", "fog"),
    (WeatherKey::Overcast, "阴", "overcast"),
];

pub fn classify_weather(text: &str) -> WeatherKey {
    let lowered = text.to_lowercase();
    WEATHER_PRIORITY
        .iter()
        .find(|(_, glyph, word)| text.contains(glyph) || lowered.contains(word))
        .map(|(key, _, _)| *key)
        .unwrap_or(WeatherKey::Clear)
}

pub fn fingerprint_at(now: NaiveDateTime, weather_text: &str, solar: SolarModel) -> Fingerprint {
    let sunset = solar(now.month()).sunset;
    Fingerprint::new(classify_time(now.time(), sunset), classify_weather(weather_text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn bands_partition_the_day_for_every_season() {
        for month in [1, 4, 7, 10] {
            let sunset = seasonal_solar_hours(month).sunset;
            let mut runs: Vec<TimeMood> = Vec::new();
            for minute_of_day in 0..24 * 60 {
                let mood = classify_time(at(minute_of_day / 60, minute_of_day % 60), sunset);
                if runs.last() != Some(&mood) {
                    runs.push(mood);
                }
            }
            // One contiguous run per label, in day order, none missing.
            assert_eq!(runs, TimeMood::ALL.to_vec(), "month {month}");
        }
    }

    #[test]
    fn band_edges_are_half_open() {
        assert_eq!(classify_time(at(2, 59), 19.0), TimeMood::Midnight);
        assert_eq!(classify_time(at(3, 0), 19.0), TimeMood::Dawn);
        assert_eq!(classify_time(at(17, 59), 19.0), TimeMood::LateAfternoon);
        assert_eq!(classify_time(at(18, 0), 19.0), TimeMood::SunsetStart);
        assert_eq!(classify_time(at(19, 0), 19.0), TimeMood::SunsetPeak);
        assert_eq!(classify_time(at(19, 30), 19.0), TimeMood::SunsetEnd);
        assert_eq!(classify_time(at(20, 0), 19.0), TimeMood::Night);
        assert_eq!(classify_time(at(23, 59), 19.0), TimeMood::Night);
    }

    #[test]
    fn winter_sunset_shortens_the_afternoon() {
        let sunset = seasonal_solar_hours(12).sunset;
        assert_eq!(classify_time(at(15, 44), sunset), TimeMood::LateAfternoon);
        assert_eq!(classify_time(at(15, 45), sunset), TimeMood::SunsetStart);
        assert_eq!(classify_time(at(17, 45), sunset), TimeMood::Night);
    }

    #[test]
    fn weather_priority_prefers_rain_over_cloud() {
        assert_eq!(classify_weather("多云转小雨"), WeatherKey::Rain);
        assert_eq!(classify_weather("雨夹雪"), WeatherKey::Rain);
        assert_eq!(classify_weather("阴有雾"), WeatherKey::Fog);
    }

    #[test]
    fn weather_is_total() {
        assert_eq!(classify_weather(""), WeatherKey::Clear);
        assert_eq!(classify_weather("晴"), WeatherKey::Clear);
        assert_eq!(classify_weather("未知"), WeatherKey::Clear);
        assert_eq!(classify_weather("Light Rain"), WeatherKey::Rain);
        assert_eq!(classify_weather("Overcast"), WeatherKey::Overcast);
    }

    #[test]
    fn labels_serialize_as_wire_names() {
        let fp = Fingerprint::new(TimeMood::SunsetPeak, WeatherKey::Overcast);
        let json = serde_json::to_value(fp).unwrap();
        assert_eq!(json["time_mood"], "sunset_peak");
        assert_eq!(json["weather_key"], "overcast");
    }

    #[test]
    fn fingerprint_uses_the_month_for_sunset() {
        let summer = chrono::NaiveDate::from_ymd_opt(2025, 7, 1)
            .unwrap()
            .and_hms_opt(18, 15, 0)
            .unwrap();
        let winter = chrono::NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(18, 15, 0)
            .unwrap();
        assert_eq!(
            fingerprint_at(summer, "晴", seasonal_solar_hours).time_mood,
            TimeMood::SunsetStart
        );
        assert_eq!(
            fingerprint_at(winter, "晴", seasonal_solar_hours).time_mood,
            TimeMood::Night
        );
    }
}
