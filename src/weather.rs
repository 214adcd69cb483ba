use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Coordinates, Timestamp, WeatherRecord};

pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch weather data";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WeatherError {
    #[error("Weather data not available")]
    Unavailable { status: u16 },
    #[error("weather request failed: {0}")]
    Transport(String),
    #[error("invalid weather response: {0}")]
    Decode(String),
    #[error("failed to build http client: {0}")]
    Client(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WeatherQuery {
    City(String),
    Coordinates { lat: f64, lon: f64 },
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_weather(&self, query: &WeatherQuery) -> Result<WeatherRecord, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct ProviderMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct ProviderCondition {
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct ProviderWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct ProviderCoord {
    lat: f64,
    lon: f64,
}

/// Body of the provider's "current weather" endpoint.
#[derive(Debug, Deserialize)]
pub struct ProviderResponse {
    main: ProviderMain,
    weather: Vec<ProviderCondition>,
    wind: ProviderWind,
    name: String,
    coord: ProviderCoord,
}

impl ProviderResponse {
    pub fn parse(text: &str) -> Result<Self, WeatherError> {
        serde_json::from_str(text).map_err(|err| WeatherError::Decode(err.to_string()))
    }

    pub fn into_record(self, fetched_at: Timestamp) -> Result<WeatherRecord, WeatherError> {
        let condition = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::Decode("no weather conditions in response".to_string()))?;
        Ok(WeatherRecord {
            temperature: self.main.temp.round() as i64,
            condition: condition.main,
            description: condition.description,
            icon: condition.icon,
            location: self.name,
            humidity: self.main.humidity,
            wind_speed: self.wind.speed,
            coordinates: Coordinates {
                lat: self.coord.lat,
                lon: self.coord.lon,
            },
            timestamp: fetched_at,
            location_name: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherSlot {
    Current,
    Location(String),
}

/// Weather held in memory only. `loading` and `error` are shared by every request.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherState {
    pub data: Option<WeatherRecord>,
    pub location_weather: BTreeMap<String, WeatherRecord>,
    pub loading: bool,
    pub error: Option<String>,
    #[serde(skip)]
    latest_request: u64,
}

impl WeatherState {
    /// Marks a request as pending and returns its token.
    pub fn begin(&mut self) -> u64 {
        self.latest_request += 1;
        self.loading = true;
        self.error = None;
        self.latest_request
    }

    pub fn is_stale(&self, token: u64) -> bool {
        token < self.latest_request
    }

    pub fn fulfill(&mut self, slot: WeatherSlot, record: WeatherRecord) {
        self.loading = false;
        match slot {
            WeatherSlot::Current => self.data = Some(record),
            WeatherSlot::Location(name) => {
                self.location_weather.insert(name, record);
            }
        }
    }

    pub fn reject(&mut self, message: String) {
        self.loading = false;
        self.error = Some(if message.trim().is_empty() {
            FETCH_FAILED_MESSAGE.to_string()
        } else {
            message
        });
    }

    pub fn clear(&mut self) {
        self.data = None;
        self.error = None;
    }

    pub fn for_location(&self, name: &str) -> Option<&WeatherRecord> {
        self.location_weather.get(name)
    }
}

#[cfg(feature = "app")]
pub use client::OpenWeatherClient;

#[cfg(feature = "app")]
mod client {
    use async_trait::async_trait;
    use chrono::Utc;
    use reqwest::Client;

    use super::{ProviderResponse, WeatherError, WeatherProvider, WeatherQuery};
    use crate::models::WeatherRecord;
    use crate::settings::Settings;

    const WEATHER_PATH: &str = "/data/2.5/weather";

    #[derive(Debug, Clone)]
    pub struct OpenWeatherClient {
        http: Client,
        base_url: String,
        api_key: String,
    }

    impl OpenWeatherClient {
        pub fn from_settings(settings: &Settings) -> Result<Self, WeatherError> {
            let mut builder =
                Client::builder().user_agent(concat!("doit/", env!("CARGO_PKG_VERSION")));
            if let Some(timeout) = settings.weather_timeout() {
                builder = builder.timeout(timeout);
            }
            let http = builder
                .build()
                .map_err(|err| WeatherError::Client(err.to_string()))?;
            if settings.openweather_api_key.trim().is_empty() {
                log::warn!("no weather api key configured; requests will be rejected");
            }
            Ok(Self {
                http,
                base_url: settings.weather_base_url.trim_end_matches('/').to_string(),
                api_key: settings.openweather_api_key.clone(),
            })
        }

        fn endpoint(&self) -> String {
            format!("{}{WEATHER_PATH}", self.base_url)
        }
    }

    #[async_trait]
    impl WeatherProvider for OpenWeatherClient {
        async fn current_weather(
            &self,
            query: &WeatherQuery,
        ) -> Result<WeatherRecord, WeatherError> {
            let mut params: Vec<(&str, String)> = match query {
                WeatherQuery::City(city) => vec![("q", city.clone())],
                WeatherQuery::Coordinates { lat, lon } => {
                    vec![("lat", lat.to_string()), ("lon", lon.to_string())]
                }
            };
            params.push(("units", "imperial".to_string()));
            params.push(("appid", self.api_key.clone()));

            let resp = self
                .http
                .get(self.endpoint())
                .query(&params)
                .send()
                .await
                .map_err(|err| WeatherError::Transport(err.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                log::debug!("weather provider answered http {status}");
                return Err(WeatherError::Unavailable {
                    status: status.as_u16(),
                });
            }

            let text = resp
                .text()
                .await
                .map_err(|err| WeatherError::Transport(err.to_string()))?;
            ProviderResponse::parse(&text)?.into_record(Utc::now())
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(location: &str) -> WeatherRecord {
        WeatherRecord {
            temperature: 70,
            condition: "Clear".into(),
            description: "clear sky".into(),
            icon: "01d".into(),
            location: location.into(),
            humidity: 40.0,
            wind_speed: 3.0,
            coordinates: Coordinates { lat: 1.0, lon: 2.0 },
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
            location_name: None,
        }
    }

    #[test]
    fn provider_body_maps_to_a_rounded_record() {
        let body = r#"{
          "coord": { "lon": -74.006, "lat": 40.7143 },
          "weather": [
            { "main": "Rain", "description": "light rain", "icon": "10d" },
            { "main": "Mist", "description": "mist", "icon": "50d" }
          ],
          "main": { "temp": 54.5, "feels_like": 52.1, "humidity": 87 },
          "wind": { "speed": 9.22, "deg": 40 },
          "name": "New York"
        }"#;
        let fetched_at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let record = ProviderResponse::parse(body)
            .unwrap()
            .into_record(fetched_at)
            .unwrap();

        assert_eq!(record.temperature, 55);
        assert_eq!(record.condition, "Rain");
        assert_eq!(record.description, "light rain");
        assert_eq!(record.icon, "10d");
        assert_eq!(record.location, "New York");
        assert_eq!(record.humidity, 87.0);
        assert_eq!(record.wind_speed, 9.22);
        assert_eq!(record.coordinates, Coordinates { lat: 40.7143, lon: -74.006 });
        assert_eq!(record.timestamp, fetched_at);
    }

    #[test]
    fn provider_body_without_conditions_is_a_decode_error() {
        let body = r#"{
          "coord": { "lon": 0, "lat": 0 },
          "weather": [],
          "main": { "temp": 50, "humidity": 10 },
          "wind": { "speed": 1 },
          "name": "Nowhere"
        }"#;
        let err = ProviderResponse::parse(body)
            .unwrap()
            .into_record(Utc::now())
            .unwrap_err();
        assert!(matches!(err, WeatherError::Decode(_)));
        assert!(matches!(
            ProviderResponse::parse("<html>"),
            Err(WeatherError::Decode(_))
        ));
    }

    #[test]
    fn state_phases_share_loading_and_error() {
        let mut state = WeatherState::default();
        let first = state.begin();
        assert!(state.loading);
        state.reject("boom".into());
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some("boom"));

        let second = state.begin();
        assert!(second > first);
        assert!(state.is_stale(first));
        assert_eq!(state.error, None);
        state.fulfill(WeatherSlot::Current, record("Paris"));
        state.fulfill(WeatherSlot::Location("Lyon".into()), record("Lyon"));
        assert_eq!(state.data.as_ref().map(|r| r.location.as_str()), Some("Paris"));
        assert_eq!(state.for_location("Lyon").map(|r| r.location.as_str()), Some("Lyon"));

        state.begin();
        state.reject(String::new());
        assert_eq!(state.error.as_deref(), Some(FETCH_FAILED_MESSAGE));

        state.clear();
        assert_eq!(state.data, None);
        assert_eq!(state.error, None);
        assert!(state.for_location("Lyon").is_some());
    }
}
