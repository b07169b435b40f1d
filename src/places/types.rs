//! Place records returned to the map page.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A search hit that can be plotted on a map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaceSummary {
    /// Display name.
    pub name: String,
    /// Backend place identifier.
    pub place_id: Option<String>,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Postal address.
    pub address: Option<String>,
    /// Average rating.
    pub rating: Option<f64>,
    /// Thumbnail URL.
    pub thumbnail: Option<String>,
}

/// Detail card for one place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetail {
    /// Display name.
    pub name: String,
    /// Postal address.
    pub address: Option<String>,
    /// Average rating.
    pub rating: Option<f64>,
    /// Opening hours as reported by the backend.
    pub hours: Option<Value>,
    /// First photo URL.
    pub image: Option<String>,
    /// Culture blurb.
    pub culture: String,
    /// Food blurb.
    pub food: String,
}
