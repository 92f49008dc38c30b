//! Weather proxy: zip code -> coordinates -> current conditions and forecast.

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use holochat_types::api::WeatherResponse;

use crate::AppState;
use crate::error::ApiError;

const KELVIN_OFFSET: f64 = 273.15;

#[derive(Debug, Clone)]
pub struct WeatherConfig {
    /// Base of the zip lookup API; `/{key}/info.json/{zip}/degrees` is appended.
    pub zip_api_url: String,
    pub zip_api_key: String,
    /// Full URL of the one-call weather endpoint.
    pub weather_api_url: String,
    pub weather_api_key: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            zip_api_url: "https://www.zipcodeapi.com/rest".into(),
            zip_api_key: String::new(),
            weather_api_url: "https://api.openweathermap.org/data/2.5/onecall".into(),
            weather_api_key: String::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Malformed request")]
    MalformedLocation,

    #[error("Error fetching url")]
    Fetch(#[from] reqwest::Error),

    #[error("Missing required information: either body lat, lng or city from zip code?")]
    IncompleteZip,

    #[error("Missing required body information to view weather info from openweather api")]
    IncompleteWeather,
}

impl From<WeatherError> for ApiError {
    fn from(e: WeatherError) -> Self {
        if let WeatherError::Fetch(source) = &e {
            warn!("Upstream weather request failed: {}", source);
        }
        ApiError::bad_request(e.to_string())
    }
}

/// Where the caller wants the weather for.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Zip(String),
    Coordinates { lat: f64, lon: f64 },
}

impl Location {
    /// Five characters is a zip code; anything longer is `lat:lon`.
    pub fn parse(raw: &str) -> Result<Self, WeatherError> {
        let raw = raw.trim();
        if raw.len() == 5 {
            if raw.chars().all(|c| c.is_ascii_digit()) {
                return Ok(Self::Zip(raw.to_string()));
            }
            return Err(WeatherError::MalformedLocation);
        }
        if raw.len() < 5 {
            return Err(WeatherError::MalformedLocation);
        }

        let (lat, lon) = raw.split_once(':').ok_or(WeatherError::MalformedLocation)?;
        Ok(Self::Coordinates {
            lat: coordinate(lat)?,
            lon: coordinate(lon)?,
        })
    }
}

/// `f64::from_str` takes `NaN` and `inf`, neither of which is a place.
fn coordinate(raw: &str) -> Result<f64, WeatherError> {
    raw.trim()
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
        .ok_or(WeatherError::MalformedLocation)
}

#[derive(Debug, Deserialize)]
struct ZipInfo {
    lat: f64,
    lng: f64,
    city: String,
}

#[derive(Debug, Deserialize)]
struct OneCall {
    lat: f64,
    lon: f64,
    current: Current,
    hourly: Value,
    daily: Value,
}

#[derive(Debug, Deserialize)]
struct Current {
    temp: f64,
    feels_like: f64,
    pressure: f64,
    humidity: f64,
    wind_speed: f64,
    #[serde(default)]
    weather: Value,
}

#[derive(Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    config: WeatherConfig,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub async fn lookup(&self, location: &Location) -> Result<WeatherResponse, WeatherError> {
        match location {
            Location::Zip(zip) => {
                let info = self.zip_info(zip).await?;
                let body = self.one_call(info.lat, info.lng).await?;
                Ok(shape(Some(info.city), body))
            }
            Location::Coordinates { lat, lon } => {
                let body = self.one_call(*lat, *lon).await?;
                Ok(shape(None, body))
            }
        }
    }

    async fn zip_info(&self, zip: &str) -> Result<ZipInfo, WeatherError> {
        let url = format!(
            "{}/{}/info.json/{}/degrees",
            self.config.zip_api_url.trim_end_matches('/'),
            self.config.zip_api_key,
            zip
        );
        fetch_json(self.http.get(url))
            .await?
            .ok_or(WeatherError::IncompleteZip)
    }

    async fn one_call(&self, lat: f64, lon: f64) -> Result<OneCall, WeatherError> {
        let request = self.http.get(&self.config.weather_api_url).query(&[
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("appid", self.config.weather_api_key.clone()),
        ]);
        fetch_json(request)
            .await?
            .ok_or(WeatherError::IncompleteWeather)
    }
}

/// Send the request and decode its body. `Ok(None)` means the upstream
/// answered but not with the fields we need.
async fn fetch_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<Option<T>, WeatherError> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    match serde_json::from_str(&text) {
        Ok(body) => Ok(Some(body)),
        Err(e) => {
            debug!("Upstream answered {} with an unusable body: {}", status, e);
            Ok(None)
        }
    }
}

fn shape(city: Option<String>, body: OneCall) -> WeatherResponse {
    let temp_c = body.current.temp - KELVIN_OFFSET;
    WeatherResponse {
        success: true,
        city,
        temp_c,
        temp_f: 1.8 * temp_c + 32.0,
        feel: body.current.feels_like,
        pressure: body.current.pressure,
        humidity: body.current.humidity,
        wind_speed: body.current.wind_speed,
        description: body.current.weather,
        latitude: body.lat,
        longitude: body.lon,
        hourly: body.hourly,
        daily: body.daily,
    }
}

/// GET /weather/{location}
pub async fn get_weather(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let location = Location::parse(&location)?;
    Ok(Json(state.weather.lookup(&location).await?))
}

/// GET /weather without a location.
pub async fn missing_location() -> ApiError {
    ApiError::missing_information()
}
