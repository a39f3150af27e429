//! TripAdvisor Content API lookups. Single endpoint, keyed by an API key
//! read at startup.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::context::ToolContext;
use crate::error::{ToolError, UpstreamError};

use super::handler::{decode_args, CallBudget, ToolDescriptor, ToolHandler};

const LANGUAGE: &str = "en";
const BODY_PREVIEW_CHARS: usize = 300;

fn missing_key() -> ToolError {
    ToolError::ConfigurationMissing(
        "TripAdvisor API key missing. Set environment variable TRIPADVISOR_API_KEY.\n\
         See: https://developer-tripadvisor.com/content-api/"
            .into(),
    )
}

fn api_key(ctx: &ToolContext) -> Result<&str, ToolError> {
    ctx.tripadvisor_key().ok_or_else(missing_key)
}

fn base_url(ctx: &ToolContext) -> &str {
    ctx.config.tripadvisor_base_url.trim_end_matches('/')
}

/// Location IDs arrive as strings or bare integers depending on the client.
#[derive(Deserialize)]
#[serde(untagged)]
enum LocationId {
    Text(String),
    Number(i64),
}

impl LocationId {
    /// The id as a path segment. Only plain digits are accepted, since the id
    /// is spliced into the URL that carries the API key.
    fn into_path_segment(self) -> Result<String, ToolError> {
        let id = match self {
            LocationId::Text(s) => s.trim().to_string(),
            LocationId::Number(n) => n.to_string(),
        };
        if is_location_id(&id) {
            Ok(id)
        } else {
            Err(ToolError::InvalidArguments(format!(
                "location_id must be numeric, got '{id}'"
            )))
        }
    }
}

fn is_location_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// Render a scalar field, or `N/A` when absent.
fn field(v: &Value, key: &str) -> String {
    match v.get(key) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => "N/A".into(),
    }
}

fn address(v: &Value) -> String {
    v["address_obj"]["address_string"]
        .as_str()
        .unwrap_or("N/A")
        .to_string()
}

/// `cuisine` is usually a list of `{name}` objects; normalize to a comma list.
fn format_cuisine(v: &Value) -> String {
    match v {
        Value::Array(items) => {
            let names: Vec<&str> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(_) => item["name"].as_str(),
                    _ => None,
                })
                .collect();
            if names.is_empty() {
                "N/A".into()
            } else {
                names.join(", ")
            }
        }
        Value::Object(_) => v["name"].as_str().unwrap_or("N/A").to_string(),
        Value::String(s) if !s.is_empty() => s.clone(),
        _ => "N/A".into(),
    }
}

fn has_content(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Object(m) => !m.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn format_hours(hours: &Value) -> String {
    serde_json::to_string_pretty(hours).unwrap_or_else(|_| hours.to_string())
}

fn truncated_body(body: &str) -> String {
    match body.char_indices().nth(BODY_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}

/// `HTTP error <status>: <body>` for status failures, `<context>: <err>` otherwise.
fn lookup_failure(err: UpstreamError, context: &str) -> ToolError {
    match err {
        UpstreamError::Http { status, body } => {
            ToolError::Reported(format!("HTTP error {status}: {}", truncated_body(&body)))
        }
        other => ToolError::Reported(format!("{context}: {other}")),
    }
}

async fn location_details(ctx: &ToolContext, key: &str, location_id: &str) -> Result<Value, UpstreamError> {
    let url = format!("{}/location/{location_id}/details", base_url(ctx));
    ctx.http
        .get_json(&url, &[("language", LANGUAGE), ("key", key)])
        .await
}

// --- search_tripadvisor_restaurants ---

pub struct SearchRestaurants;

#[derive(Deserialize)]
struct SearchArgs {
    latitude: f64,
    longitude: f64,
    #[serde(default = "default_search_limit")]
    limit: u32,
}

fn default_search_limit() -> u32 {
    10
}

impl SearchRestaurants {
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "search_tripadvisor_restaurants",
            "Search nearby restaurants using TripAdvisor Content API.",
            json!({
                "type": "object",
                "properties": {
                    "latitude": {"type": "number", "description": "Latitude of search center"},
                    "longitude": {"type": "number", "description": "Longitude of search center"},
                    "limit": {"type": "integer", "description": "Max results to return", "default": 10}
                },
                "required": ["latitude", "longitude"]
            }),
        )
    }

    pub fn budget() -> CallBudget {
        CallBudget::new(Duration::from_secs(30), "Timed out searching TripAdvisor restaurants.")
    }
}

#[async_trait]
impl ToolHandler for SearchRestaurants {
    async fn call(&self, ctx: &ToolContext, args: &Value) -> Result<String, ToolError> {
        let key = api_key(ctx)?;
        let SearchArgs { latitude: lat, longitude: lon, limit } = decode_args(args)?;

        let url = format!("{}/location/nearby_search", base_url(ctx));
        let lat_long = format!("{lat},{lon}");
        let limit_param = limit.to_string();
        let data = ctx
            .http
            .get_json(
                &url,
                &[
                    ("latLong", lat_long.as_str()),
                    ("category", "restaurants"),
                    ("limit", limit_param.as_str()),
                    ("language", LANGUAGE),
                    ("key", key),
                ],
            )
            .await
            .map_err(|e| match e {
                UpstreamError::Http { status, .. } => ToolError::Reported(format!(
                    "HTTP error {status}. Ensure your TripAdvisor API key is valid."
                )),
                other => ToolError::Reported(format!("Error searching restaurants: {other}")),
            })?;

        let results = data["data"].as_array().cloned().unwrap_or_default();
        if results.is_empty() {
            return Ok(format!("No restaurants found near {lat}, {lon}"));
        }

        // Enrichment is best-effort: lookups run together, each under its own
        // cap, and a slow or failed one only loses that entry's extra lines.
        let detail_timeout = ctx.config.tripadvisor_detail_timeout;
        let lookups = results.iter().map(move |r| {
            let location_id = field(r, "location_id");
            async move {
                if !is_location_id(&location_id) {
                    return None;
                }
                match tokio::time::timeout(detail_timeout, location_details(ctx, key, &location_id)).await {
                    Ok(Ok(detail)) => Some(detail),
                    Ok(Err(e)) => {
                        debug!(location_id = %location_id, error = %e, "detail enrichment skipped");
                        None
                    }
                    Err(_) => {
                        debug!(location_id = %location_id, "detail enrichment timed out");
                        None
                    }
                }
            }
        });
        let details = join_all(lookups).await;

        let mut lines = vec![format!("Found restaurants near {lat}, {lon}:\n")];
        for (idx, (r, detail)) in results.iter().zip(details).enumerate() {
            lines.push(format!("{}. {}", idx + 1, field(r, "name")));
            lines.push(format!("   Location ID: {}", field(r, "location_id")));
            lines.push(format!("   Address: {}", address(r)));
            lines.push(format!("   Rating: {}", field(r, "rating")));
            lines.push(format!("   Cuisine: {}", format_cuisine(&r["cuisine"])));
            lines.push(format!("   Price: {}", field(r, "price_level")));
            lines.push(format!("   URL: {}", field(r, "web_url")));

            if let Some(detail) = detail {
                lines.push(format!("   Phone: {}", field(&detail, "phone")));
                lines.push(format!("   Website: {}", field(&detail, "website")));
                let email = field(&detail, "email");
                if email != "N/A" {
                    lines.push(format!("   Email: {email}"));
                }
                if has_content(&detail["hours"]) {
                    lines.push(format!("   Hours: {}", format_hours(&detail["hours"])));
                }
            }
            lines.push(String::new());
        }

        Ok(lines.join("\n").trim().to_string())
    }
}

// --- get_restaurant_details ---

pub struct RestaurantDetails;

#[derive(Deserialize)]
struct DetailsArgs {
    location_id: LocationId,
}

impl RestaurantDetails {
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "get_restaurant_details",
            "Get detailed information for a TripAdvisor location_id.",
            json!({
                "type": "object",
                "properties": {
                    "location_id": {"type": "string", "description": "TripAdvisor location ID"}
                },
                "required": ["location_id"]
            }),
        )
    }

    pub fn budget() -> CallBudget {
        CallBudget::new(Duration::from_secs(30), "Timed out getting restaurant details.")
    }
}

#[async_trait]
impl ToolHandler for RestaurantDetails {
    async fn call(&self, ctx: &ToolContext, args: &Value) -> Result<String, ToolError> {
        let key = api_key(ctx)?;
        let DetailsArgs { location_id } = decode_args(args)?;
        let location_id = location_id.into_path_segment()?;

        let data = location_details(ctx, key, &location_id)
            .await
            .map_err(|e| lookup_failure(e, "Error getting restaurant details"))?;

        let name = data["name"].as_str().unwrap_or("Unknown");
        let mut lines = vec![
            format!("Details for {name}:"),
            String::new(),
            format!("Location ID: {location_id}"),
            format!("Description: {}", field(&data, "description")),
            format!("Phone: {}", field(&data, "phone")),
            format!("Website: {}", field(&data, "website")),
            format!("Email: {}", field(&data, "email")),
            format!("Address: {}", address(&data)),
            format!("Rating: {}", field(&data, "rating")),
            format!("Price Level: {}", field(&data, "price_level")),
            format!("Cuisine: {}", format_cuisine(&data["cuisine"])),
            format!("Web URL: {}", field(&data, "web_url")),
        ];
        if has_content(&data["hours"]) {
            lines.push(String::new());
            lines.push("Hours of Operation:".into());
            lines.push(format_hours(&data["hours"]));
        }
        Ok(lines.join("\n"))
    }
}

// --- get_restaurant_reviews ---

pub struct RestaurantReviews;

#[derive(Deserialize)]
struct ReviewsArgs {
    location_id: LocationId,
    #[serde(default = "default_review_limit")]
    limit: u32,
}

fn default_review_limit() -> u32 {
    5
}

impl RestaurantReviews {
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "get_restaurant_reviews",
            "Get reviews for a TripAdvisor location_id.",
            json!({
                "type": "object",
                "properties": {
                    "location_id": {"type": "string", "description": "TripAdvisor location ID"},
                    "limit": {"type": "integer", "description": "Max number of reviews", "default": 5}
                },
                "required": ["location_id"]
            }),
        )
    }

    pub fn budget() -> CallBudget {
        CallBudget::new(Duration::from_secs(30), "Timed out getting restaurant reviews.")
    }
}

#[async_trait]
impl ToolHandler for RestaurantReviews {
    async fn call(&self, ctx: &ToolContext, args: &Value) -> Result<String, ToolError> {
        let key = api_key(ctx)?;
        let ReviewsArgs { location_id, limit } = decode_args(args)?;
        let location_id = location_id.into_path_segment()?;

        let url = format!("{}/location/{location_id}/reviews", base_url(ctx));
        let limit_param = limit.to_string();
        let data = ctx
            .http
            .get_json(
                &url,
                &[("language", LANGUAGE), ("limit", limit_param.as_str()), ("key", key)],
            )
            .await
            .map_err(|e| lookup_failure(e, "Error getting reviews"))?;

        let reviews = data["data"].as_array().cloned().unwrap_or_default();
        if reviews.is_empty() {
            return Ok(format!("No reviews found for location {location_id}"));
        }

        let mut lines = vec![format!("Reviews for Location ID {location_id}:"), String::new()];
        for (i, review) in reviews.iter().enumerate() {
            let title = review["title"].as_str().unwrap_or("No title");
            let text = review["text"].as_str().unwrap_or("No text");
            let author = review["user"]["username"]
                .as_str()
                .filter(|s| !s.is_empty())
                .unwrap_or("Anonymous");

            lines.push(format!("{}. {title}", i + 1));
            lines.push(format!("   Author: {author}"));
            lines.push(format!("   Rating: {}/5", field(review, "rating")));
            lines.push(format!("   Date: {}", field(review, "published_date")));
            lines.push(format!("   Review: {text}"));
            lines.push(String::new());
        }
        Ok(lines.join("\n").trim().to_string())
    }
}
