//! SerpAPI Google Maps engine response parsing.

use serde_json::Value;

use crate::places::error::{PlacesError, PlacesResult};
use crate::places::types::{PlaceDetail, PlaceSummary};

/// Engine name for map searches.
pub const ENGINE: &str = "google_maps";

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Surface an `error` member of the response body.
///
/// # Errors
/// Returns [`PlacesError::Backend`] when the body carries an error.
pub fn check_error(json: &Value) -> PlacesResult<()> {
    match json.get("error").and_then(Value::as_str) {
        Some(message) => Err(PlacesError::Backend(message.to_string())),
        None => Ok(()),
    }
}

/// Parse `local_results`, keeping only entries with GPS coordinates.
#[must_use]
pub fn parse_search_results(json: &Value) -> Vec<PlaceSummary> {
    let Some(results) = json.get("local_results").and_then(Value::as_array) else {
        return Vec::new();
    };

    results
        .iter()
        .filter_map(|item| {
            let gps = item.get("gps_coordinates")?;
            let lat = gps.get("latitude").and_then(Value::as_f64)?;
            let lng = gps.get("longitude").and_then(Value::as_f64)?;
            Some(PlaceSummary {
                name: str_field(item, "title").unwrap_or_default(),
                place_id: str_field(item, "place_id"),
                lat,
                lng,
                address: str_field(item, "address"),
                rating: item.get("rating").and_then(Value::as_f64),
                thumbnail: str_field(item, "thumbnail"),
            })
        })
        .collect()
}

/// Parse `place_results` into a detail card; `fallback_name` is used when
/// the backend has no title.
#[must_use]
pub fn parse_place_detail(json: &Value, fallback_name: &str) -> PlaceDetail {
    let empty = Value::Null;
    let place = json.get("place_results").unwrap_or(&empty);
    let title = str_field(place, "title").unwrap_or_else(|| fallback_name.to_string());

    let image = place
        .get("photos")
        .and_then(Value::as_array)
        .and_then(|photos| photos.first())
        .and_then(|photo| str_field(photo, "image"))
        .or_else(|| str_field(place, "thumbnail"));

    PlaceDetail {
        culture: format!(
            "Văn hóa địa phương tại {title} phản ánh rõ nét đời sống và tín ngưỡng Việt Nam."
        ),
        food: format!("Ẩm thực {title} nổi bật với các món ăn mang bản sắc vùng miền."),
        address: str_field(place, "address"),
        rating: place.get("rating").and_then(Value::as_f64),
        hours: place.get("hours").filter(|h| !h.is_null()).cloned(),
        image,
        name: title,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_search_results() {
        let json = json!({
            "local_results": [
                {
                    "title": "Chợ Bến Thành",
                    "place_id": "ChIJ1",
                    "gps_coordinates": {"latitude": 10.7725, "longitude": 106.698},
                    "address": "Lê Lợi, Quận 1",
                    "rating": 4.1,
                    "thumbnail": "https://example.com/t.jpg"
                },
                {"title": "No coordinates"},
                {
                    "title": "Dinh Độc Lập",
                    "gps_coordinates": {"latitude": 10.777, "longitude": 106.695}
                }
            ]
        });

        let results = parse_search_results(&json);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "Chợ Bến Thành");
        assert_eq!(results[0].place_id.as_deref(), Some("ChIJ1"));
        assert!((results[0].rating.unwrap() - 4.1).abs() < f64::EPSILON);
        assert!(results[1].address.is_none());
    }

    #[test]
    fn test_parse_search_results_missing_section() {
        assert!(parse_search_results(&json!({})).is_empty());
    }

    #[test]
    fn test_parse_place_detail() {
        let json = json!({
            "place_results": {
                "title": "Nhà thờ Đức Bà",
                "address": "01 Công xã Paris",
                "rating": 4.5,
                "hours": [{"monday": "8–17"}],
                "photos": [{"image": "https://example.com/p.jpg"}]
            }
        });
        let detail = parse_place_detail(&json, "ignored");
        assert_eq!(detail.name, "Nhà thờ Đức Bà");
        assert_eq!(detail.image.as_deref(), Some("https://example.com/p.jpg"));
        assert!(detail.culture.contains("Nhà thờ Đức Bà"));
        assert!(detail.hours.is_some());
    }

    #[test]
    fn test_parse_place_detail_falls_back_to_name() {
        let detail = parse_place_detail(&json!({}), "Thành phố Hồ Chí Minh");
        assert_eq!(detail.name, "Thành phố Hồ Chí Minh");
        assert!(detail.food.contains("Thành phố Hồ Chí Minh"));
        assert!(detail.image.is_none());
    }

    #[test]
    fn test_check_error() {
        assert!(check_error(&json!({"error": "Invalid API key."})).is_err());
        assert!(check_error(&json!({"local_results": []})).is_ok());
    }
}
