//! Fixed phrase tables used by both prompt paths.

use crate::mood::{TimeMood, WeatherKey};

pub const BASE_SUFFIX: &str = "4K wallpaper, beautiful landscape";

const STYLIZED_TAG: &str = "studio ghibli-inspired magical realism";

/// Words that put the sun in a scene.
const SOLAR_WORDS: &[&str] = &["sun", "golden", "daylight", "dawn", "dusk"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneStyle {
    Nature,
    Stylized,
}

#[derive(Debug, Clone, Copy)]
pub struct Scene {
    pub description: &'static str,
    pub style: SceneStyle,
}

impl Scene {
    const fn nature(description: &'static str) -> Self {
        Self {
            description,
            style: SceneStyle::Nature,
        }
    }

    const fn stylized(description: &'static str) -> Self {
        Self {
            description,
            style: SceneStyle::Stylized,
        }
    }

    /// True when the description names the sun or its light.
    pub fn is_sunlit(&self) -> bool {
        let lowered = self.description.to_lowercase();
        SOLAR_WORDS.iter().any(|w| lowered.contains(w))
    }

    /// Description with the style tag appended for stylized scenes.
    pub fn render(&self) -> String {
        match self.style {
            SceneStyle::Nature => self.description.to_string(),
            SceneStyle::Stylized => format!("{}, {}", self.description, STYLIZED_TAG),
        }
    }
}

/// Scenes offered to the text backends.
pub const INSTRUCTION_SCENES: &[Scene] = &[
    Scene::nature("alpine lake ringed by pine forest, mirror-still water"),
    Scene::nature("terraced rice fields climbing a misty hillside"),
    Scene::nature("rolling tea plantation with narrow earthen paths"),
    Scene::nature("karst peaks rising from a slow green river"),
    Scene::nature("birch forest with a carpet of ferns"),
    Scene::nature("wide river delta braided with sandbars"),
    Scene::nature("granite coastline with tide pools and sea stacks"),
    Scene::nature("lavender fields stretching toward distant hills"),
    Scene::nature("high plateau grassland with grazing yaks"),
    Scene::nature("canyon of layered red sandstone"),
    Scene::nature("quiet fishing harbor with wooden boats"),
    Scene::nature("old stone bridge over a mountain stream"),
    Scene::nature("sunflower field beside a country road"),
    Scene::nature("volcanic black sand beach with rolling surf"),
    Scene::nature("glacier valley with turquoise meltwater"),
    Scene::nature("lotus pond beside a wooden pavilion"),
    Scene::nature("maple-lined lakeside trail"),
    Scene::nature("vast salt flat reflecting the sky"),
    Scene::nature("cypress swamp with hanging moss"),
    Scene::nature("snowy pine ridge above a frozen lake"),
    Scene::nature("desert oasis with date palms and a still pool"),
    Scene::nature("windswept heathland with standing stones"),
    Scene::nature("rooftops of an old riverside town"),
    Scene::nature("bamboo grove along a winding stone path"),
    Scene::stylized("floating islands linked by vine bridges"),
    Scene::stylized("hillside village of thatched roofs and paper lanterns"),
    Scene::stylized("tea house on stilts above a lotus lake"),
    Scene::stylized("sky railway crossing a sea of clouds"),
    Scene::stylized("overgrown clockwork tower in a meadow"),
    Scene::stylized("forest shrine with moss-covered stone foxes"),
    Scene::stylized("harbor of brass airships and wooden piers"),
    Scene::stylized("crystal cavern with glowing underground pools"),
];

/// Scenes for the rule-based path.
pub const FALLBACK_SCENES: &[Scene] = &[
    Scene::nature("classic library setting, wooden bookshelves, reading nooks"),
    Scene::nature("cozy café interior, rustic furniture, warm ambiance"),
    Scene::nature("grand museum hall, art displays, high ceilings"),
    Scene::nature("cozy indoor setting, warm lights, comfortable"),
    Scene::nature("deep mountain valley, rugged cliffs, untouched wilderness"),
    Scene::nature("winding mountain trail, rocky terrain, alpine vegetation"),
    Scene::nature("dormant volcano, crater formation, mineral-rich slopes"),
    Scene::nature("majestic mountains, serene"),
    Scene::nature("meandering river, smooth stones, gentle current"),
    Scene::nature("cascading waterfall, misty basin, moss-covered rocks"),
    Scene::nature("tranquil marshland, reeds, still waters"),
    Scene::nature("calm lake, reflections, peaceful water"),
    Scene::nature("dense bamboo grove, tall stalks, filtered light"),
    Scene::nature("deciduous forest, multicolored foliage, fallen leaves"),
    Scene::nature("tropical rainforest, dense canopy, vibrant vegetation"),
    Scene::nature("lush green forest"),
    Scene::nature("undulating sand dunes, smooth curves, wind patterns"),
    Scene::nature("deep canyon, stratified rock layers, narrow passages"),
    Scene::nature("desert oasis, palm cluster, still pool"),
    Scene::nature("vast desert, golden sands"),
    Scene::nature("vibrant coral reef, marine life, clear waters"),
    Scene::nature("dramatic coastal cliffs, eroded formations, sea spray"),
    Scene::nature("shallow lagoon, turquoise waters, sandy bottom"),
    Scene::nature("vast ocean, gentle waves, horizon, peaceful"),
    Scene::nature("orderly vineyard, grapevines, rolling hills"),
    Scene::nature("grazing pasture, wooden fences, grassy expanse"),
    Scene::nature("peaceful rural landscape, fields, farmhouses"),
    Scene::nature("vast green grasslands, cattle and sheep in the distance, sparse trees"),
    Scene::nature("open savanna, scattered acacia trees, golden grasses"),
    Scene::nature("arctic tundra, low vegetation, permafrost patterns"),
    Scene::nature("dirt path through dense woods, overgrown edges"),
    Scene::nature("high altitude mountain passage, rocky outcrops"),
    Scene::nature("winding road along seaside cliffs, ocean views"),
    Scene::stylized("stone lanterns, cobbled paths, petals floating on streams"),
    Scene::stylized("starry dome, glowing astronomical instruments, floating golden orrery"),
    Scene::stylized("hovering landmasses, waterfalls into mist, vine bridges"),
    Scene::stylized("gothic spires with runes, floating books, stained glass patterns"),
    Scene::stylized("bioluminescent crystals, underground pools, glowing formations"),
    Scene::stylized("crimson maple leaves, thatched roofs, paper lanterns"),
    Scene::stylized("brass airships, clockwork cranes, steam in golden sunset"),
    Scene::stylized("floating structure, lotus flowers, steaming teacups"),
    Scene::stylized("floating paper lanterns, fireworks on water, festival stalls"),
    Scene::stylized("glowing mushrooms, ancient trees, treehouse villages"),
    Scene::stylized("coral pillars, sunlight beams, tropical fish through arches"),
    Scene::stylized("silver light through bamboo, fox spirits, floating leaves"),
    Scene::stylized("marble on clouds, rainbow bridges, dragons around jade pillars"),
    Scene::stylized("snow houses with demon masks, hot springs, orange lights in twilight"),
];

/// Hand-tuned phrasing for specific time and weather pairs.
pub fn combo_phrase(mood: TimeMood, weather: WeatherKey) -> Option<&'static str> {
    use TimeMood::*;
    use WeatherKey::*;

    let phrase = match (mood, weather) {
        (Night, Rain) => "rainy night, wet street, city lights reflecting on puddles, umbrellas, no stars, no moon, dark sky, gentle rain, misty, moody atmosphere",
        (Night, Snow) => "snowy night, snow falling, quiet street, soft warm lights from windows, no stars, no moon, snow covered ground, peaceful",
        (Night, Fog) => "foggy night, street lamps glowing in mist, low visibility, mysterious, no stars, no moon",
        (Night, Overcast) => "overcast night, city lights, muted colors, no stars, no moon, calm",
        (Night, Cloud) => "cloudy night, clouds covering the sky, faint city lights, no stars, no moon, tranquil",

        (Midnight, Rain) => "midnight rain, empty street, wet asphalt, reflections, no stars, no moon, dark, gentle rain",
        (Midnight, Snow) => "midnight snow, quiet, snow covered, soft light, no stars, no moon, peaceful",
        (Midnight, Fog) => "midnight fog, mysterious, low visibility, street lights in mist, no stars, no moon",
        (Midnight, Overcast) => "overcast midnight, muted colors, no stars, no moon, calm",
        (Midnight, Cloud) => "cloudy midnight, clouds covering the sky, faint city lights, no stars, no moon, tranquil",

        (SunsetStart, Rain) => "rainy sunset, sun low behind clouds, wet ground, cozy lights, gentle rain, umbrellas",
        (SunsetPeak, Rain) => "rainy sunset, sun touching horizon behind rain clouds, wet ground, golden rain, umbrellas",
        (SunsetEnd, Rain) => "rainy twilight, afterglow through rain, wet ground, street lights, gentle rain, umbrellas",
        (SunsetStart, Snow) => "snowy sunset, snowflakes in golden light, warm windows, winter scene",
        (SunsetPeak, Snow) => "snowy sunset, sun on horizon, snowflakes glowing, winter scene",
        (SunsetEnd, Snow) => "snowy twilight, afterglow on snow, peaceful, winter scene",
        (SunsetStart, Fog) => "foggy sunset, sun low in mist, soft colors, mysterious",
        (SunsetPeak, Fog) => "foggy sunset, sun on horizon in mist, diffused light, mysterious",
        (SunsetEnd, Fog) => "foggy twilight, afterglow in mist, soft colors, mysterious",
        (SunsetStart, Overcast) => "overcast sunset, muted sun, calm",
        (SunsetPeak, Overcast) => "overcast sunset, sun on horizon behind clouds, calm",
        (SunsetEnd, Overcast) => "overcast twilight, afterglow behind clouds, calm",
        (SunsetStart, Cloud) => "cloudy sunset, dramatic clouds at golden hour, soft light",
        (SunsetPeak, Cloud) => "cloudy sunset, sun on horizon with clouds, dramatic sky",
        (SunsetEnd, Cloud) => "cloudy twilight, afterglow with clouds, soft light",

        (Dawn, Rain) => "rainy dawn, wet ground, soft light, gentle rain, misty, peaceful",
        (Dawn, Snow) => "snowy dawn, snow covered landscape, first light, quiet",
        (Dawn, Fog) => "foggy dawn, low visibility, mysterious, soft sunrise",
        (Dawn, Overcast) => "overcast dawn, muted sunrise, calm",
        (Dawn, Cloud) => "cloudy dawn, clouds with first light, tranquil",

        (EarlyMorning, Rain) => "rainy morning, wet streets, umbrellas, gentle rain, fresh air",
        (LateMorning, Rain) => "rainy late morning, lively city, wet ground, gentle rain",
        (EarlyAfternoon, Rain) => "rainy afternoon, wet city, gentle rain, people with umbrellas",
        (LateAfternoon, Rain) => "rainy late afternoon, golden hour light through rain, wet ground",
        (EarlyMorning, Snow) => "snowy morning, fresh snow, soft sunlight, peaceful",
        (LateMorning, Snow) => "snowy late morning, bright snow, lively",
        (EarlyAfternoon, Snow) => "snowy afternoon, winter scene, blue sky",
        (LateAfternoon, Snow) => "snowy late afternoon, golden hour on snow",
        (EarlyMorning, Fog) => "foggy morning, soft sunlight through mist, mysterious",
        (LateMorning, Fog) => "foggy late morning, diffused light, low visibility",
        (EarlyAfternoon, Fog) => "foggy afternoon, soft daylight, mysterious",
        (LateAfternoon, Fog) => "foggy late afternoon, golden hour in mist",
        (EarlyMorning, Overcast) => "overcast morning, muted colors, calm",
        (LateMorning, Overcast) => "overcast late morning, soft light, calm",
        (EarlyAfternoon, Overcast) => "overcast afternoon, muted colors, calm",
        (LateAfternoon, Overcast) => "overcast late afternoon, golden hour, calm",
        (EarlyMorning, Cloud) => "cloudy morning, soft clouds, fresh air",
        (LateMorning, Cloud) => "cloudy late morning, lively, clear sky with clouds",
        (EarlyAfternoon, Cloud) => "cloudy afternoon, blue sky with clouds",
        (LateAfternoon, Cloud) => "cloudy late afternoon, golden hour with clouds",

        (_, Clear) => return None,
    };
    Some(phrase)
}

pub fn time_phrase(mood: TimeMood, sunset_hour: f64) -> String {
    match mood {
        TimeMood::Dawn => "dawn, first light, cool sky, gentle sunrise, calm nature".to_string(),
        TimeMood::EarlyMorning => "early morning, fresh air, soft sunlight, dew, peaceful".to_string(),
        TimeMood::LateMorning => "late morning, bright sun, lively, clear sky, energetic".to_string(),
        TimeMood::EarlyAfternoon => "early afternoon, vibrant daylight, blue sky, active".to_string(),
        TimeMood::LateAfternoon => "late afternoon, warm sunlight, long shadows, golden hour".to_string(),
        TimeMood::SunsetStart => format!(
            "pre-sunset, sun low at {}:00, golden horizontal light",
            (sunset_hour - 1.0).floor() as u32
        ),
        TimeMood::SunsetPeak => "sun touching horizon, fiery sky, maximum color saturation".to_string(),
        TimeMood::SunsetEnd => "sun just disappeared, afterglow transitioning to twilight".to_string(),
        TimeMood::Night => "night, moonlight, stars, deep blue sky, quiet scene".to_string(),
        TimeMood::Midnight => "midnight, dark sky, starry, serene, calm night".to_string(),
    }
}

pub fn weather_phrase(weather: WeatherKey) -> &'static str {
    match weather {
        WeatherKey::Clear => "bright sunshine, clear weather",
        WeatherKey::Rain => "gentle rain, water drops, misty",
        WeatherKey::Cloud => "soft clouds, diffused light",
        WeatherKey::Overcast => "overcast sky, muted colors",
        WeatherKey::Fog => "foggy, low visibility, mysterious",
        WeatherKey::Snow => "snow flakes, winter scene",
    }
}

/// Plain-English weather description for backend instructions.
pub fn weather_description(weather: WeatherKey) -> &'static str {
    match weather {
        WeatherKey::Clear => "clear skies",
        WeatherKey::Rain => "rain",
        WeatherKey::Cloud => "partly cloudy",
        WeatherKey::Overcast => "overcast, grey sky",
        WeatherKey::Fog => "fog and mist",
        WeatherKey::Snow => "falling snow",
    }
}
