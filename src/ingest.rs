use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    data_formats::lenient,
    models::{Cuisine, TruckStatus},
};

/// One element of an ingestion batch as the external pipeline sends it.
#[derive(Debug, Default, Deserialize)]
pub struct SourceRecord {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub cuisine: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub city: Option<String>,
    #[serde(default, alias = "current_location", deserialize_with = "lenient::string")]
    pub address: Option<String>,
    #[serde(default, alias = "average_price", deserialize_with = "lenient::number")]
    pub price_level: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub operating_hours: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub image: Option<String>,
}

/// A source record that passed the required-field check.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRecord {
    pub name: String,
    pub city: String,
    /// `None` keeps the stored cuisine on update and falls back to `other` on insert.
    pub cuisine: Option<Cuisine>,
    pub current_location: Option<String>,
    pub average_price: Option<f64>,
    pub operating_hours: Option<String>,
    pub image: Option<String>,
    pub menu: Option<String>,
    pub status: Option<TruckStatus>,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub total: usize,
    pub inserted: usize,
    pub updated: usize,
    pub errors: usize,
}

impl IngestStats {
    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
        }
    }
}

impl SourceRecord {
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn into_record(self) -> Result<IngestRecord, RecordError> {
        let name = self.name.ok_or(RecordError::MissingField("name"))?;
        let city = self.city.ok_or(RecordError::MissingField("city"))?;
        let cuisine = self
            .cuisine
            .map(|raw| raw.trim().to_lowercase().parse().unwrap_or(Cuisine::Other));

        Ok(IngestRecord {
            name,
            city,
            cuisine,
            current_location: self.address,
            average_price: self.price_level,
            operating_hours: self.operating_hours,
            image: self.image,
            menu: None,
            status: None,
        })
    }
}

/// Parses a raw batch element by element. A bad element becomes an `Err` in
/// its slot instead of failing the batch.
pub fn parse_batch(values: Vec<Value>) -> Vec<Result<IngestRecord, RecordError>> {
    values
        .into_iter()
        .map(|value| SourceRecord::from_value(value)?.into_record())
        .collect()
}

// ----------------- Scraper import -----------------

const CUISINE_KEYWORDS: [(Cuisine, &[&str]); 8] = [
    (Cuisine::Burger, &["burger", "hamburger", "grill"]),
    (Cuisine::Tacos, &["taco", "mexican", "burrito"]),
    (Cuisine::Pizza, &["pizza", "pizzeria"]),
    (
        Cuisine::Asian,
        &["asian", "chinese", "thai", "vietnamese", "sushi", "ramen"],
    ),
    (Cuisine::Italian, &["italian", "pasta", "trattoria"]),
    (
        Cuisine::French,
        &["french", "boulangerie", "patisserie", "crepe"],
    ),
    (Cuisine::American, &["american", "bbq", "barbecue", "diner"]),
    (
        Cuisine::Desserts,
        &["dessert", "ice cream", "gelato", "bakery", "cake"],
    ),
];

const HOURS_NOT_AVAILABLE: &str = "Hours not available";

/// A place as returned by the maps scraper.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrapedPlace {
    pub name: Option<String>,
    pub types: Vec<String>,
    pub address: Option<String>,
    pub price_level: Option<i64>,
    pub is_open: bool,
    pub opening_hours: Option<OpeningHours>,
    pub photos: Vec<String>,
    pub menu: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OpeningHours {
    pub weekday_text: Vec<String>,
}

impl ScrapedPlace {
    pub fn into_record(self) -> Result<IngestRecord, RecordError> {
        let name = self
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let city = self
            .address
            .as_deref()
            .map(extract_city)
            .filter(|city| !city.is_empty())
            .ok_or(RecordError::MissingField("city"))?;
        let menu = serde_json::json!({
            "items": self.menu,
            "description": self.description.unwrap_or_default(),
        });

        Ok(IngestRecord {
            cuisine: Some(detect_cuisine(&name, &self.types)),
            name,
            city,
            current_location: self.address,
            average_price: Some(estimate_price(self.price_level)),
            operating_hours: Some(format_hours(self.opening_hours.as_ref())),
            image: self.photos.into_iter().next(),
            menu: Some(menu.to_string()),
            status: Some(if self.is_open {
                TruckStatus::Active
            } else {
                TruckStatus::Inactive
            }),
        })
    }
}

/// First cuisine whose keyword occurs in the name or the place types.
pub fn detect_cuisine(name: &str, types: &[String]) -> Cuisine {
    let haystack = format!("{} {}", name, types.join(" ")).to_lowercase();
    CUISINE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(cuisine, _)| *cuisine)
        .unwrap_or(Cuisine::Other)
}

/// `"12 Rue X, Lyon, France"` -> `"Lyon"`.
pub fn extract_city(address: &str) -> String {
    let parts: Vec<&str> = address.split(',').collect();
    let city = if parts.len() >= 2 {
        parts[parts.len() - 2]
    } else {
        parts[0]
    };
    city.trim().to_string()
}

pub fn estimate_price(level: Option<i64>) -> f64 {
    match level {
        Some(0) => 5.0,
        Some(1) => 8.0,
        Some(2) => 12.0,
        Some(3) => 18.0,
        Some(4) => 25.0,
        _ => 10.0,
    }
}

pub fn format_hours(hours: Option<&OpeningHours>) -> String {
    match hours {
        Some(hours) if !hours.weekday_text.is_empty() => hours.weekday_text.join(", "),
        _ => HOURS_NOT_AVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn source_record_accepts_aliases_and_loose_types() {
        let record = SourceRecord::from_value(json!({
            "name": "Taco Loco",
            "city": "Paris",
            "current_location": "1 Rue A",
            "average_price": "12",
            "cuisine": "Tacos"
        }))
        .unwrap()
        .into_record()
        .unwrap();
        assert_eq!(record.current_location.as_deref(), Some("1 Rue A"));
        assert_eq!(record.average_price, Some(12.0));
        assert_eq!(record.cuisine, Some(Cuisine::Tacos));
        assert_eq!(record.status, None);
    }

    #[test]
    fn unknown_cuisine_becomes_other_and_missing_stays_unset() {
        let unknown = SourceRecord {
            name: Some("A".into()),
            city: Some("B".into()),
            cuisine: Some("fusion".into()),
            ..Default::default()
        };
        assert_eq!(unknown.into_record().unwrap().cuisine, Some(Cuisine::Other));

        let missing = SourceRecord {
            name: Some("A".into()),
            city: Some("B".into()),
            ..Default::default()
        };
        assert_eq!(missing.into_record().unwrap().cuisine, None);
    }

    #[test]
    fn missing_name_or_city_is_reported() {
        let err = SourceRecord::from_value(json!({"name": "Solo", "city": " "}))
            .unwrap()
            .into_record()
            .unwrap_err();
        assert!(matches!(err, RecordError::MissingField("city")));

        let err = SourceRecord::from_value(json!({"city": "Lyon"}))
            .unwrap()
            .into_record()
            .unwrap_err();
        assert!(matches!(err, RecordError::MissingField("name")));
    }

    #[test]
    fn one_malformed_element_does_not_poison_the_batch() {
        let results = parse_batch(vec![
            json!({"name": "A", "city": "Paris"}),
            json!({"name": "B", "city": "Paris", "price_level": "cheap"}),
            json!("not an object"),
            json!({"name": "C"}),
        ]);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(RecordError::Malformed(_))));
        assert!(matches!(results[2], Err(RecordError::Malformed(_))));
        assert!(matches!(results[3], Err(RecordError::MissingField("city"))));
    }

    #[test]
    fn cuisine_detection_uses_first_matching_keyword() {
        assert_eq!(detect_cuisine("Big Grill", &[]), Cuisine::Burger);
        assert_eq!(
            detect_cuisine("Chez Paul", &["Boulangerie".into(), "food".into()]),
            Cuisine::French
        );
        assert_eq!(detect_cuisine("Sweet Ice Cream Van", &[]), Cuisine::Desserts);
        assert_eq!(detect_cuisine("Mystery", &["food".into()]), Cuisine::Other);
    }

    #[test]
    fn city_is_second_to_last_address_part() {
        assert_eq!(extract_city("12 Rue Example, Lyon, France"), "Lyon");
        assert_eq!(extract_city("Marseille"), "Marseille");
    }

    #[test]
    fn price_and_hours_fallbacks() {
        assert_eq!(estimate_price(Some(3)), 18.0);
        assert_eq!(estimate_price(Some(7)), 10.0);
        assert_eq!(estimate_price(None), 10.0);
        assert_eq!(format_hours(None), "Hours not available");
        let hours = OpeningHours {
            weekday_text: vec!["Mon: 9-5".into(), "Tue: 9-5".into()],
        };
        assert_eq!(format_hours(Some(&hours)), "Mon: 9-5, Tue: 9-5");
    }

    #[test]
    fn scraped_place_maps_to_a_full_record() {
        let place: ScrapedPlace = serde_json::from_value(json!({
            "name": "Pizza Truck 1",
            "types": ["pizza", "food"],
            "address": "3 Rue Example, Nice, France",
            "priceLevel": 2,
            "isOpen": false,
            "openingHours": {"weekdayText": ["Monday: 11:00 AM - 10:00 PM"]},
            "photos": ["https://picsum.photos/seed/1/800/600"],
            "menu": ["Margherita"],
            "description": "Wood fired"
        }))
        .unwrap();
        let record = place.into_record().unwrap();
        assert_eq!(record.cuisine, Some(Cuisine::Pizza));
        assert_eq!(record.city, "Nice");
        assert_eq!(record.average_price, Some(12.0));
        assert_eq!(record.status, Some(TruckStatus::Inactive));
        assert_eq!(
            record.image.as_deref(),
            Some("https://picsum.photos/seed/1/800/600")
        );
        let menu: Value = serde_json::from_str(record.menu.as_deref().unwrap()).unwrap();
        assert_eq!(menu, json!({"items": ["Margherita"], "description": "Wood fired"}));
    }

    #[test]
    fn scraped_place_without_address_is_rejected() {
        let err = ScrapedPlace::default().into_record().unwrap_err();
        assert!(matches!(err, RecordError::MissingField("city")));
    }
}
