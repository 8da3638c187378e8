//! Amenity catalog loading and proximity lookup.
//!
//! Amenity datasets (public restrooms, accessible toilets, pharmacies and so
//! on) are plain CSV files. Only the name, category and coordinates are
//! required; common header variants such as `latitude`/`y` are recognised.
//! Rows with an empty coordinate are skipped, while rows whose coordinates do
//! not parse or lie out of range reject the whole file.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::geo::GeoPoint;

/// One point of interest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Amenity {
    pub name: String,
    pub category: String,
    pub location: GeoPoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<String>,
}

/// Amenity found near a query point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyAmenity<'a> {
    pub amenity: &'a Amenity,
    pub distance_km: f64,
}

/// Collection of amenities loaded from a CSV file.
#[derive(Debug, Clone, Default)]
pub struct AmenityCatalog {
    amenities: Vec<Amenity>,
    source: Option<PathBuf>,
}

/// Canonical column name and accepted header spellings. Headers match
/// ignoring case, spaces and punctuation.
const COLUMNS: &[(&str, &[&str])] = &[
    ("name", &["name", "facility", "facility_name", "title"]),
    ("category", &["category", "type", "kind", "amenity"]),
    ("lat", &["lat", "latitude", "y"]),
    ("lon", &["lon", "lng", "long", "longitude", "x"]),
    ("address", &["address", "addr", "street_address", "road_address"]),
    ("phone", &["phone", "telephone", "tel", "phone_number"]),
    ("hours", &["hours", "opening_hours", "open_hours"]),
];

const REQUIRED: &[&str] = &["name", "category", "lat", "lon"];

impl AmenityCatalog {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;
        let mut catalog = Self::from_reader(file)?;
        catalog.source = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            amenities = catalog.len(),
            "loaded amenity catalog"
        );
        Ok(catalog)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new().trim(Trim::Fields).from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let columns = resolve_columns(&headers)?;

        let mut amenities = Vec::new();
        let mut skipped = 0usize;
        for (offset, record) in csv_reader.records().enumerate() {
            let record = record?;
            // Line 1 holds the headers.
            let row = offset + 2;
            match parse_row(&columns, &record, row)? {
                Some(amenity) => amenities.push(amenity),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(skipped, "skipped amenity rows without coordinates");
        }

        Ok(Self {
            amenities,
            source: None,
        })
    }

    pub fn from_amenities(amenities: Vec<Amenity>) -> Self {
        Self {
            amenities,
            source: None,
        }
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.amenities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amenities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Amenity> {
        self.amenities.iter()
    }

    /// Distinct categories in the order they first appear.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for amenity in &self.amenities {
            if !seen.contains(&amenity.category.as_str()) {
                seen.push(&amenity.category);
            }
        }
        seen
    }

    /// Amenities within `radius_km` of `center`, nearest first.
    ///
    /// `category` matches case-insensitively. Equal distances keep catalog
    /// order.
    pub fn within_radius(
        &self,
        center: GeoPoint,
        radius_km: f64,
        category: Option<&str>,
    ) -> Result<Vec<NearbyAmenity<'_>>> {
        center.validate()?;
        if !radius_km.is_finite() || radius_km < 0.0 {
            return Err(Error::invalid(format!(
                "radius must be a non-negative number of kilometres, got {radius_km}"
            )));
        }

        let mut nearby: Vec<NearbyAmenity<'_>> = self
            .amenities
            .iter()
            .filter(|amenity| match category {
                Some(wanted) => amenity.category.eq_ignore_ascii_case(wanted),
                None => true,
            })
            .map(|amenity| NearbyAmenity {
                amenity,
                distance_km: center.distance_km(&amenity.location),
            })
            .filter(|candidate| candidate.distance_km <= radius_km)
            .collect();

        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        Ok(nearby)
    }
}

fn normalize(header: &str) -> String {
    header
        .to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn resolve_columns(headers: &StringRecord) -> Result<BTreeMap<&'static str, usize>> {
    let normalized: Vec<String> = headers.iter().map(normalize).collect();

    let mut columns = BTreeMap::new();
    for (canonical, spellings) in COLUMNS {
        let position = spellings
            .iter()
            .find_map(|spelling| normalized.iter().position(|h| *h == normalize(spelling)));
        if let Some(position) = position {
            columns.insert(*canonical, position);
        }
    }

    let missing: Vec<&str> = REQUIRED
        .iter()
        .copied()
        .filter(|column| !columns.contains_key(column))
        .collect();
    if !missing.is_empty() {
        return Err(Error::invalid(format!(
            "amenity CSV missing required columns: {}. Available: {}",
            missing.join(", "),
            headers.iter().collect::<Vec<_>>().join(", ")
        )));
    }

    Ok(columns)
}

fn parse_row(
    columns: &BTreeMap<&'static str, usize>,
    record: &StringRecord,
    row: usize,
) -> Result<Option<Amenity>> {
    let get = |field: &str| -> Option<String> {
        columns
            .get(field)
            .and_then(|&i| record.get(i))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let (Some(lat), Some(lon)) = (get("lat"), get("lon")) else {
        return Ok(None);
    };

    let name = get("name").unwrap_or_default();
    let parse = |field: &str, value: &str| {
        value.parse::<f64>().map_err(|err| {
            Error::invalid(format!(
                "invalid {field} '{value}' for amenity '{name}' at row {row}: {err}"
            ))
        })
    };
    let location = GeoPoint::new(parse("lat", &lat)?, parse("lon", &lon)?).map_err(|err| {
        Error::invalid(format!("amenity '{name}' at row {row}: {err}"))
    })?;

    Ok(Some(Amenity {
        category: get("category").unwrap_or_default(),
        location,
        address: get("address"),
        phone: get("phone"),
        hours: get("hours"),
        name,
    }))
}
