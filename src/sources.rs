use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const IP_LOCATION_URL: &str = "https://api.vore.top/api/IPdata";
pub const QQ_WEATHER_URL: &str = "https://wis.qq.com/weather/common";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub county: String,
}

impl Location {
    pub fn new(province: &str, city: &str, county: &str) -> Self {
        Self {
            province: province.to_string(),
            city: city.to_string(),
            county: county.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.province.trim().is_empty() && self.city.trim().is_empty() && self.county.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub weather: String,
    pub temperature: String,
    pub humidity: String,
    pub wind_direction: String,
    pub wind_power: String,
    pub update_time: String,
}

impl WeatherSnapshot {
    /// Stand-in used until the first successful lookup.
    pub fn placeholder() -> Self {
        Self {
            weather: "未知".to_string(),
            temperature: "--".to_string(),
            humidity: "--".to_string(),
            wind_direction: "--".to_string(),
            wind_power: "--".to_string(),
            update_time: "--".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    Service(String),
}

#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn resolve(&self) -> Result<Location, LookupError>;
}

#[async_trait]
pub trait WeatherResolver: Send + Sync {
    async fn lookup(&self, location: &Location) -> Result<WeatherSnapshot, LookupError>;
}

/// Resolves the caller's public IP to province/city/county.
pub struct IpLocator {
    client: Client,
    endpoint: String,
}

impl IpLocator {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            endpoint: IP_LOCATION_URL.to_string(),
        }
    }
}

#[async_trait]
impl LocationResolver for IpLocator {
    async fn resolve(&self) -> Result<Location, LookupError> {
        let body: Value = self
            .client
            .get(&self.endpoint)
            .query(&[("ip", "")])
            .timeout(LOOKUP_TIMEOUT)
            .send()
            .await?
            .json()
            .await?;
        debug!("[location] raw response: {}", body);
        parse_ip_location(&body)
    }
}

pub fn parse_ip_location(body: &Value) -> Result<Location, LookupError> {
    if body.get("code").and_then(Value::as_i64) != Some(200) {
        return Err(LookupError::Service(
            text_field(body, "msg").unwrap_or_else(|| "接口异常".to_string()),
        ));
    }
    let ipdata = body.get("ipdata").cloned().unwrap_or(Value::Null);
    let province = text_field(&ipdata, "info1").unwrap_or_default();
    let mut city = text_field(&ipdata, "info2").unwrap_or_default();
    let mut county = text_field(&ipdata, "info3").unwrap_or_default();
    // Municipalities report the district as info2 and leave info3 empty.
    if county.is_empty() {
        county = city;
        city = province.replace('省', "").replace('市', "");
    }
    Ok(Location {
        province,
        city,
        county,
    })
}

/// Current observation from the QQ weather service.
pub struct QqWeather {
    client: Client,
    endpoint: String,
}

impl QqWeather {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            endpoint: QQ_WEATHER_URL.to_string(),
        }
    }
}

#[async_trait]
impl WeatherResolver for QqWeather {
    async fn lookup(&self, location: &Location) -> Result<WeatherSnapshot, LookupError> {
        let body: Value = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("source", "pc"),
                ("weather_type", "observe"),
                ("province", location.province.as_str()),
                ("city", location.city.as_str()),
                ("county", location.county.as_str()),
            ])
            .timeout(LOOKUP_TIMEOUT)
            .send()
            .await?
            .json()
            .await?;
        parse_qq_weather(&body)
    }
}

pub fn parse_qq_weather(body: &Value) -> Result<WeatherSnapshot, LookupError> {
    if body.get("status").and_then(Value::as_i64) != Some(200) {
        return Err(LookupError::Service(
            text_field(body, "message").unwrap_or_else(|| "接口异常".to_string()),
        ));
    }
    let observe = body
        .get("data")
        .and_then(|data| data.get("observe"))
        .cloned()
        .unwrap_or(Value::Null);
    let weather = text_field(&observe, "weather").unwrap_or_default();
    let update_time = text_field(&observe, "update_time").unwrap_or_default();
    if weather.is_empty() && update_time.is_empty() {
        return Err(LookupError::Service("天气信息获取失败".to_string()));
    }
    let or_dash = |value: Option<String>| value.unwrap_or_else(|| "--".to_string());
    Ok(WeatherSnapshot {
        weather: if weather.is_empty() { "未知".to_string() } else { weather },
        temperature: format!("{}°C", or_dash(text_field(&observe, "degree"))),
        humidity: or_dash(text_field(&observe, "humidity")),
        wind_direction: or_dash(text_field(&observe, "wind_direction_name")),
        wind_power: or_dash(text_field(&observe, "wind_power")),
        update_time: if update_time.is_empty() { "--".to_string() } else { update_time },
    })
}

// The upstream APIs mix numbers and strings for the same field.
fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
