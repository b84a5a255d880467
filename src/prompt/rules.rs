use super::catalogue::{combo_phrase, time_phrase, weather_phrase, Scene, BASE_SUFFIX, FALLBACK_SCENES};
use crate::mood::{Fingerprint, TimeMood};
use rand::seq::SliceRandom;
use rand::Rng;

/// Offline prompt built from fixed tables. Never fails.
pub fn rule_based_prompt(fingerprint: Fingerprint, sunset_hour: f64) -> String {
    rule_based_prompt_with(fingerprint, sunset_hour, &mut rand::thread_rng())
}

pub fn rule_based_prompt_with<R: Rng + ?Sized>(
    fingerprint: Fingerprint,
    sunset_hour: f64,
    rng: &mut R,
) -> String {
    let dark = matches!(fingerprint.time_mood, TimeMood::Night | TimeMood::Midnight);
    let candidates: Vec<&Scene> = FALLBACK_SCENES
        .iter()
        .filter(|scene| !dark || !scene.is_sunlit())
        .collect();
    let scene = candidates
        .choose(rng)
        .map(|scene| scene.render())
        .unwrap_or_default();
    match combo_phrase(fingerprint.time_mood, fingerprint.weather_key) {
        Some(combo) => format!("{}, {}, {}", scene, combo, BASE_SUFFIX),
        None => format!(
            "{}, {}, {}, {}",
            scene,
            time_phrase(fingerprint.time_mood, sunset_hour),
            weather_phrase(fingerprint.weather_key),
            BASE_SUFFIX
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::{TimeMood, WeatherKey};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn all_sixty_pairs_produce_a_prompt() {
        let mut rng = StdRng::seed_from_u64(42);
        for mood in TimeMood::ALL {
            for weather in WeatherKey::ALL {
                let prompt = rule_based_prompt_with(Fingerprint::new(mood, weather), 18.5, &mut rng);
                assert!(!prompt.trim().is_empty());
                assert!(prompt.ends_with(BASE_SUFFIX), "{mood}/{weather}: {prompt}");
            }
        }
    }

    #[test]
    fn dark_moods_skip_sunlit_scenes() {
        for seed in 0..300 {
            let mut rng = StdRng::seed_from_u64(seed);
            for mood in [TimeMood::Night, TimeMood::Midnight] {
                let prompt =
                    rule_based_prompt_with(Fingerprint::new(mood, WeatherKey::Clear), 17.75, &mut rng);
                assert!(
                    !FALLBACK_SCENES
                        .iter()
                        .filter(|s| s.is_sunlit())
                        .any(|s| prompt.starts_with(&s.render())),
                    "seed {seed}: {prompt}"
                );
            }
        }
    }

    #[test]
    fn combo_wins_over_composed_phrases() {
        let mut rng = StdRng::seed_from_u64(3);
        let prompt = rule_based_prompt_with(
            Fingerprint::new(TimeMood::Night, WeatherKey::Rain),
            18.5,
            &mut rng,
        );
        assert!(prompt.contains("rainy night, wet street"));
        assert!(!prompt.contains(&time_phrase(TimeMood::Night, 18.5)));
        assert!(!prompt.contains(weather_phrase(WeatherKey::Rain)));
    }

    #[test]
    fn missing_combo_composes_time_and_weather() {
        let mut rng = StdRng::seed_from_u64(3);
        let prompt = rule_based_prompt_with(
            Fingerprint::new(TimeMood::SunsetStart, WeatherKey::Clear),
            16.75,
            &mut rng,
        );
        assert!(prompt.contains("sun low at 15:00"));
        assert!(prompt.contains(weather_phrase(WeatherKey::Clear)));
    }
}
