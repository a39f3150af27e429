//! Tools of the local deployment: arithmetic, the host clock and Open-Meteo
//! weather.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::context::ToolContext;
use crate::error::{ToolError, UpstreamError};

use super::handler::{decode_args, CallBudget, ToolDescriptor, ToolHandler};

const MAX_LOCATIONS: usize = 5;
const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,apparent_temperature,precipitation,weather_code,wind_speed_10m";

// --- calculator ---

pub struct Calculator;

#[derive(Deserialize)]
struct CalculatorArgs {
    num1: f64,
    num2: f64,
    operator: String,
}

impl Calculator {
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "calculator",
            "Basic arithmetic on two numbers.",
            json!({
                "type": "object",
                "properties": {
                    "num1": {"type": "number", "description": "First operand"},
                    "num2": {"type": "number", "description": "Second operand"},
                    "operator": {"type": "string", "enum": ["+", "-", "*", "/"]}
                },
                "required": ["num1", "num2", "operator"]
            }),
        )
    }

    pub fn budget() -> CallBudget {
        CallBudget::new(Duration::from_secs(5), "Timed out calculating.")
    }
}

pub fn calculate(num1: f64, num2: f64, operator: &str) -> Result<f64, ToolError> {
    match operator {
        "+" => Ok(num1 + num2),
        "-" => Ok(num1 - num2),
        "*" => Ok(num1 * num2),
        "/" if num2 == 0.0 => Err(ToolError::Reported("Division by zero is not allowed.".into())),
        "/" => Ok(num1 / num2),
        other => Err(ToolError::Reported(format!(
            "Unsupported operator: {other}. Use one of '+', '-', '*', '/'."
        ))),
    }
}

/// Whole results keep one decimal so callers can tell they are floats.
fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}

#[async_trait]
impl ToolHandler for Calculator {
    async fn call(&self, _ctx: &ToolContext, args: &Value) -> Result<String, ToolError> {
        let CalculatorArgs { num1, num2, operator } = decode_args(args)?;
        calculate(num1, num2, operator.trim()).map(format_number)
    }
}

// --- current_datetime ---

pub struct CurrentDatetime;

impl CurrentDatetime {
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "current_datetime",
            "Current date and time in the server's local timezone (YYYY-MM-DD HH:MM:SS).",
            json!({"type": "object", "properties": {}, "required": []}),
        )
    }

    pub fn budget() -> CallBudget {
        CallBudget::new(Duration::from_secs(5), "Timed out getting current date and time.")
    }
}

#[async_trait]
impl ToolHandler for CurrentDatetime {
    async fn call(&self, _ctx: &ToolContext, _args: &Value) -> Result<String, ToolError> {
        Ok(Local::now().format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

// --- get_weather ---

pub struct GetWeather;

#[derive(Deserialize)]
struct WeatherArgs {
    city: String,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<Place>,
}

#[derive(Debug, Deserialize)]
struct Place {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    admin1: Option<String>,
}

impl Place {
    fn label(&self) -> String {
        let mut label = self.name.clone();
        for part in [&self.admin1, &self.country].into_iter().flatten() {
            if !part.is_empty() {
                label.push_str(", ");
                label.push_str(part);
            }
        }
        label
    }
}

impl GetWeather {
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "get_weather",
            "Current weather for a city via Open-Meteo. Reports every matching city.",
            json!({
                "type": "object",
                "properties": {
                    "city": {"type": "string", "description": "City name"}
                },
                "required": ["city"]
            }),
        )
    }

    pub fn budget() -> CallBudget {
        CallBudget::new(Duration::from_secs(30), "Timed out getting weather.")
    }
}

/// WMO weather interpretation codes.
fn describe_weather_code(code: i64) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Foggy",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        71 => "Slight snow",
        73 => "Moderate snow",
        75 => "Heavy snow",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}

fn reading(current: &Value, key: &str) -> Option<String> {
    current.get(key).filter(|v| v.is_number()).map(Value::to_string)
}

/// One location's block, or `None` when the forecast lacks a reading.
fn format_current(label: &str, current: &Value) -> Option<String> {
    let code = current["weather_code"].as_i64().unwrap_or(0);
    Some(format!(
        "Location: {label}\n\
         Temperature: {}°C\n\
         Feels like: {}°C\n\
         Conditions: {}\n\
         Humidity: {}%\n\
         Wind speed: {} km/h\n\
         Precipitation: {} mm\n",
        reading(current, "temperature_2m")?,
        reading(current, "apparent_temperature")?,
        describe_weather_code(code),
        reading(current, "relative_humidity_2m")?,
        reading(current, "wind_speed_10m")?,
        reading(current, "precipitation")?,
    ))
}

async fn forecast(ctx: &ToolContext, place: &Place) -> Result<Value, UpstreamError> {
    let lat = place.latitude.to_string();
    let lon = place.longitude.to_string();
    ctx.http
        .get_json(
            &ctx.config.weather_forecast_url,
            &[
                ("latitude", lat.as_str()),
                ("longitude", lon.as_str()),
                ("current", CURRENT_FIELDS),
                ("temperature_unit", "celsius"),
                ("wind_speed_unit", "kmh"),
                ("timezone", "auto"),
            ],
        )
        .await
}

#[async_trait]
impl ToolHandler for GetWeather {
    async fn call(&self, ctx: &ToolContext, args: &Value) -> Result<String, ToolError> {
        let WeatherArgs { city } = decode_args(args)?;

        let count = MAX_LOCATIONS.to_string();
        let data = ctx
            .http
            .get_json(
                &ctx.config.weather_geocoding_url,
                &[
                    ("name", city.as_str()),
                    ("count", count.as_str()),
                    ("language", "en"),
                    ("format", "json"),
                ],
            )
            .await?;
        let geo: GeocodingResponse =
            serde_json::from_value(data).map_err(|e| UpstreamError::Decode(e.to_string()))?;
        if geo.results.is_empty() {
            return Ok(format!("No weather data found for city: {city}"));
        }

        let places = &geo.results[..geo.results.len().min(MAX_LOCATIONS)];
        let forecasts = join_all(places.iter().map(|p| forecast(ctx, p))).await;

        let blocks: Vec<String> = places
            .iter()
            .zip(forecasts)
            .filter_map(|(place, result)| match result {
                Ok(data) => format_current(&place.label(), &data["current"]),
                Err(e) => {
                    debug!(place = %place.label(), error = %e, "forecast skipped");
                    None
                }
            })
            .collect();

        match blocks.len() {
            0 => Ok(format!("Could not retrieve weather data for: {city}")),
            1 => Ok(blocks.into_iter().collect()),
            n => Ok(format!(
                "Found {n} cities named '{city}':\n\n{}",
                blocks.join("\n---\n")
            )),
        }
    }
}
