use super::catalogue::{weather_description, Scene, INSTRUCTION_SCENES};
use super::CalendarContext;
use crate::mood::{fractional_hour, Fingerprint, SolarHours};
use chrono::{Datelike, Timelike};
use rand::seq::SliceRandom;
use rand::Rng;

/// Lighting band derived from the seasonal sunrise and sunset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lighting {
    Night,
    Sunrise,
    Sunset,
    Daytime,
}

impl Lighting {
    pub fn at(hour: f64, solar: SolarHours) -> Self {
        if hour < solar.sunrise - 0.5 || hour >= solar.sunset + 1.0 {
            Lighting::Night
        } else if hour < solar.sunrise + 1.0 {
            Lighting::Sunrise
        } else if hour >= solar.sunset - 1.0 {
            Lighting::Sunset
        } else {
            Lighting::Daytime
        }
    }

    fn constraint(&self) -> &'static str {
        match self {
            Lighting::Night => "it is night; do not mention the sun, sunlight, sunrise, sunset, golden hour or daylight, light comes only from the moon, stars or lamps",
            Lighting::Sunrise => "early sunrise, low warm light rising on the horizon",
            Lighting::Sunset => "sunset approaching, low golden light and long shadows",
            Lighting::Daytime => "full daylight, natural even light",
        }
    }
}

pub fn build_instruction(fingerprint: Fingerprint, ctx: &CalendarContext) -> String {
    build_instruction_with(fingerprint, ctx, &mut rand::thread_rng())
}

pub fn build_instruction_with<R: Rng + ?Sized>(
    fingerprint: Fingerprint,
    ctx: &CalendarContext,
    rng: &mut R,
) -> String {
    let lighting = Lighting::at(fractional_hour(ctx.now.time()), ctx.solar);
    // Night instructions forbid solar wording, so the scene must not bring any.
    let candidates: Vec<&Scene> = INSTRUCTION_SCENES
        .iter()
        .filter(|scene| lighting != Lighting::Night || !scene.is_sunlit())
        .collect();
    let scene = candidates
        .choose(rng)
        .map(|scene| scene.render())
        .unwrap_or_default();
    let weather = if ctx.weather_text.trim().is_empty() {
        weather_description(fingerprint.weather_key).to_string()
    } else {
        format!(
            "{} (reported as \"{}\")",
            weather_description(fingerprint.weather_key),
            ctx.weather_text.trim()
        )
    };

    format!(
        "Write one English prompt for an AI image generator describing a desktop wallpaper. \
         Date: month {month}, day {day}. Local time {hour:02}:{minute:02}. \
         Weather: {weather}. Scene: {scene}. Lighting: {lighting}. \
         Output only the prompt as a single line of comma-separated English phrases, \
         no explanation, under 60 words.",
        month = ctx.now.month(),
        day = ctx.now.day(),
        hour = ctx.now.hour(),
        minute = ctx.now.minute(),
        lighting = lighting.constraint(),
    )
}
