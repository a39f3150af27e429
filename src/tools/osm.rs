//! OpenStreetMap lookups through the Overpass API mirrors.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::context::ToolContext;
use crate::error::{ToolError, UpstreamError};

use super::handler::{decode_args, CallBudget, ToolDescriptor, ToolHandler};

pub const DEFAULT_SEARCH_RADIUS_M: u32 = 1500;
const DEFAULT_LIMIT: u32 = 10;
const OSM_TYPES: [&str; 3] = ["node", "way", "relation"];

#[derive(Debug, Default, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(rename = "type", default = "default_element_type")]
    kind: String,
    id: Option<i64>,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<Center>,
    #[serde(default)]
    tags: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct Center {
    lat: Option<f64>,
    lon: Option<f64>,
}

fn default_element_type() -> String {
    "node".into()
}

impl Element {
    fn tags(&self) -> Tags<'_> {
        Tags(self.tags.as_ref())
    }

    /// The element's own position, else the center Overpass computed for it.
    fn coords(&self) -> String {
        let (lat, lon) = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => (Some(lat), Some(lon)),
            _ => self
                .center
                .as_ref()
                .map(|c| (c.lat, c.lon))
                .unwrap_or((None, None)),
        };
        format!("{}, {}", or_na(lat), or_na(lon))
    }
}

fn or_na(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "N/A".into())
}

fn osm_url(osm_type: &str, osm_id: i64) -> String {
    format!("https://www.openstreetmap.org/{osm_type}/{osm_id}")
}

/// Read-only view over an element's tag map.
struct Tags<'a>(Option<&'a Map<String, Value>>);

impl<'a> Tags<'a> {
    fn get(&self, key: &str) -> Option<&'a str> {
        self.0?
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// First non-empty tag among `keys`, or `N/A`.
    fn first(&self, keys: &[&str]) -> &'a str {
        keys.iter().find_map(|k| self.get(k)).unwrap_or("N/A")
    }

    fn name(&self) -> &'a str {
        self.get("name").unwrap_or("Unnamed")
    }

    fn address(&self) -> String {
        let parts = [
            self.get("addr:housenumber"),
            self.get("addr:street"),
            self.get("addr:postcode"),
            self.get("addr:city")
                .or_else(|| self.get("addr:town"))
                .or_else(|| self.get("addr:village")),
            self.get("addr:country"),
        ];
        let joined = parts.iter().flatten().copied().collect::<Vec<_>>().join(", ");
        if joined.is_empty() {
            "N/A".into()
        } else {
            joined
        }
    }

    /// `cuisine=pizza;italian` becomes `pizza, italian`.
    fn cuisine(&self) -> String {
        let joined = self
            .get("cuisine")
            .map(|c| {
                c.split(';')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        if joined.is_empty() {
            "N/A".into()
        } else {
            joined
        }
    }

    fn phone(&self) -> &'a str {
        self.first(&["phone", "contact:phone"])
    }

    fn website(&self) -> &'a str {
        self.first(&["website", "contact:website"])
    }

    fn opening_hours(&self) -> &'a str {
        self.first(&["opening_hours"])
    }

    fn pretty(&self) -> String {
        let map = self.0.cloned().unwrap_or_default();
        serde_json::to_string_pretty(&Value::Object(map)).unwrap_or_else(|_| "{}".into())
    }
}

/// Run one Overpass QL query through the mirror pool.
async fn overpass(ctx: &ToolContext, query: &str) -> Result<OverpassResponse, UpstreamError> {
    let http = &ctx.http;
    ctx.failover
        .execute(&ctx.overpass, move |url| async move {
            let value = http.post_form(&url, &[("data", query)]).await?;
            serde_json::from_value::<OverpassResponse>(value)
                .map_err(|e| UpstreamError::Decode(e.to_string()))
        })
        .await
}

fn overpass_failure(err: &UpstreamError, status_hint: &str) -> ToolError {
    match err.status() {
        Some(status) => ToolError::Reported(format!("Overpass error {status}.{status_hint}")),
        None => ToolError::Reported(format!("Error querying Overpass: {err}")),
    }
}

// --- search_osm_restaurants ---

pub struct SearchRestaurants;

#[derive(Deserialize)]
struct SearchArgs {
    latitude: f64,
    longitude: f64,
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default = "default_radius")]
    radius_m: u32,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

fn default_radius() -> u32 {
    DEFAULT_SEARCH_RADIUS_M
}

impl SearchRestaurants {
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "search_osm_restaurants",
            "Find nearby restaurants from OpenStreetMap (no API key needed).",
            json!({
                "type": "object",
                "properties": {
                    "latitude": {"type": "number", "description": "Latitude of search center"},
                    "longitude": {"type": "number", "description": "Longitude of search center"},
                    "limit": {"type": "integer", "description": "Max results to return", "default": DEFAULT_LIMIT},
                    "radius_m": {"type": "integer", "description": "Search radius in meters", "default": DEFAULT_SEARCH_RADIUS_M}
                },
                "required": ["latitude", "longitude"]
            }),
        )
    }

    pub fn budget() -> CallBudget {
        CallBudget::new(
            Duration::from_secs(25),
            "Timed out searching OSM restaurants. Try a smaller radius/limit.",
        )
    }
}

fn restaurant_query(lat: f64, lon: f64, radius_m: u32, limit: u32) -> String {
    let around = format!("(around:{radius_m},{lat},{lon})");
    format!(
        "[out:json][timeout:25];\n(\n  node[\"amenity\"=\"restaurant\"]{around};\n  way[\"amenity\"=\"restaurant\"]{around};\n  relation[\"amenity\"=\"restaurant\"]{around};\n);\nout tags center {limit};\n"
    )
}

#[async_trait]
impl ToolHandler for SearchRestaurants {
    async fn call(&self, ctx: &ToolContext, args: &Value) -> Result<String, ToolError> {
        let SearchArgs { latitude: lat, longitude: lon, limit, radius_m } = decode_args(args)?;

        let query = restaurant_query(lat, lon, radius_m, limit);
        let data = overpass(ctx, &query)
            .await
            .map_err(|e| overpass_failure(&e, " Try again later or reduce radius."))?;

        Ok(format_restaurants(&data.elements, lat, lon, radius_m, limit))
    }
}

fn format_restaurants(elements: &[Element], lat: f64, lon: f64, radius_m: u32, limit: u32) -> String {
    if elements.is_empty() {
        return format!("No OSM restaurants found near {lat}, {lon} within {radius_m} m.");
    }

    let mut lines = vec![
        format!("OSM restaurants near {lat}, {lon} (radius {radius_m} m):"),
        String::new(),
    ];
    for (idx, el) in elements.iter().take(limit as usize).enumerate() {
        let tags = el.tags();
        let url = el
            .id
            .map(|id| osm_url(&el.kind, id))
            .unwrap_or_else(|| "N/A".into());

        lines.push(format!("{}. {}", idx + 1, tags.name()));
        lines.push(format!("   OSM: {url}"));
        lines.push(format!("   Coords: {}", el.coords()));
        lines.push(format!("   Address: {}", tags.address()));
        lines.push(format!("   Cuisine: {}", tags.cuisine()));
        lines.push(format!("   Phone: {}", tags.phone()));
        lines.push(format!("   Website: {}", tags.website()));
        lines.push(format!("   Opening hours: {}", tags.opening_hours()));
        lines.push(String::new());
    }
    lines.join("\n").trim().to_string()
}

// --- get_osm_place_details ---

pub struct PlaceDetails;

#[derive(Deserialize)]
struct DetailsArgs {
    osm_type: String,
    osm_id: i64,
}

impl PlaceDetails {
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "get_osm_place_details",
            "Get detailed tags for an OpenStreetMap element.",
            json!({
                "type": "object",
                "properties": {
                    "osm_type": {"type": "string", "enum": OSM_TYPES, "description": "OSM element type"},
                    "osm_id": {"type": "integer", "description": "OSM element ID"}
                },
                "required": ["osm_type", "osm_id"]
            }),
        )
    }

    pub fn budget() -> CallBudget {
        CallBudget::new(Duration::from_secs(20), "Timed out getting OSM place details.")
    }
}

#[async_trait]
impl ToolHandler for PlaceDetails {
    async fn call(&self, ctx: &ToolContext, args: &Value) -> Result<String, ToolError> {
        let DetailsArgs { osm_type, osm_id } = decode_args(args)?;
        let osm_type = osm_type.trim().to_lowercase();
        if !OSM_TYPES.contains(&osm_type.as_str()) {
            return Err(ToolError::Reported(
                "osm_type must be one of: node, way, relation.".into(),
            ));
        }

        let query = format!("[out:json][timeout:25];\n{osm_type}({osm_id});\nout tags center;\n");
        let data = overpass(ctx, &query)
            .await
            .map_err(|e| overpass_failure(&e, ""))?;

        Ok(format_details(data.elements.first(), &osm_type, osm_id))
    }
}

fn format_details(element: Option<&Element>, osm_type: &str, osm_id: i64) -> String {
    let Some(el) = element else {
        return format!("No element found for {osm_type} {osm_id}.");
    };
    let tags = el.tags();
    let lines = [
        format!("Details for {}", tags.name()),
        String::new(),
        format!("OSM: {}", osm_url(osm_type, osm_id)),
        format!("Type/ID: {osm_type} {osm_id}"),
        format!("Coords: {}", el.coords()),
        format!("Address: {}", tags.address()),
        format!("Cuisine: {}", tags.cuisine()),
        format!("Phone: {}", tags.phone()),
        format!("Website: {}", tags.website()),
        format!("Opening hours: {}", tags.opening_hours()),
        String::new(),
        "All tags:".into(),
        tags.pretty(),
    ];
    lines.join("\n").trim().to_string()
}
