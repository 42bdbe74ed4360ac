//! Ground-motion points from a GeoJSON FeatureCollection.
//!
//! Each feature is a Point in lon/lat. Properties whose key is an eight-digit
//! date (`YYYYMMDD`) hold the displacement (mm) at that epoch; `null` or a
//! non-numeric value counts as missing. `Latitude` and `Elevation` are picked
//! up when present. The epoch set is the union of date keys over all features.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use inundation_core::{EpochSet, LatLon, MeasurementPoint};
use serde_json::Value;

fn is_epoch_key(key: &str) -> bool {
    key.len() == 8 && key.bytes().all(|b| b.is_ascii_digit())
}

pub fn load_points(path: &Path) -> Result<(EpochSet, Vec<MeasurementPoint>)> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_points(&text).with_context(|| format!("parsing {}", path.display()))
}

pub fn parse_points(text: &str) -> Result<(EpochSet, Vec<MeasurementPoint>)> {
    let root: Value = serde_json::from_str(text)?;
    let features = root
        .get("features")
        .and_then(Value::as_array)
        .context("expected a FeatureCollection with a `features` array")?;

    // YYYYMMDD keys sort chronologically as strings.
    let keys: BTreeSet<&str> = features
        .iter()
        .filter_map(|f| f.get("properties").and_then(Value::as_object))
        .flat_map(|props| props.keys().map(String::as_str).filter(|k| is_epoch_key(k)))
        .collect();
    if keys.is_empty() {
        bail!("no YYYYMMDD epoch properties found");
    }
    let keys: Vec<&str> = keys.into_iter().collect();
    let epochs = EpochSet::parse_keys(&keys)?;

    let mut points = Vec::with_capacity(features.len());
    for (i, feature) in features.iter().enumerate() {
        let coords = feature
            .pointer("/geometry/coordinates")
            .and_then(Value::as_array)
            .with_context(|| format!("feature {i}: missing point coordinates"))?;
        let (Some(lon), Some(lat)) = (coords.first().and_then(Value::as_f64), coords.get(1).and_then(Value::as_f64))
        else {
            bail!("feature {i}: coordinates must be [lon, lat]");
        };

        let props = feature.get("properties");
        let prop = |name: &str| props.and_then(|p| p.get(name)).and_then(Value::as_f64);

        let mut point = MeasurementPoint::new(LatLon::new(lat, lon), keys.iter().map(|k| prop(k)).collect());
        point.latitude = prop("Latitude");
        point.elevation = prop("Elevation");
        points.push(point);
    }

    Ok((epochs, points))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature",
              "geometry": { "type": "Point", "coordinates": [4.25, 51.9] },
              "properties": { "20180112": -0.4, "20180106": 0.0, "20180118": null,
                              "Latitude": 51.9, "Elevation": 1.2, "pid": "A1" } },
            { "type": "Feature",
              "geometry": { "type": "Point", "coordinates": [4.3, 51.8] },
              "properties": { "20180106": 0.1, "20180112": "n/a", "20180124": 0.3 } }
        ]
    }"#;

    #[test]
    fn epochs_are_the_sorted_union_of_date_keys() {
        let (epochs, points) = parse_points(SAMPLE).unwrap();
        let keys: Vec<String> = epochs.dates().iter().map(|d| d.format("%Y%m%d").to_string()).collect();
        assert_eq!(keys, ["20180106", "20180112", "20180118", "20180124"]);
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn values_align_with_epochs_and_gaps_are_missing() {
        let (_, points) = parse_points(SAMPLE).unwrap();
        assert_eq!(points[0].measurements, vec![Some(0.0), Some(-0.4), None, None]);
        assert_eq!(points[1].measurements, vec![Some(0.1), None, None, Some(0.3)]);
        assert_eq!(points[0].location, LatLon::new(51.9, 4.25));
        assert_eq!(points[0].latitude, Some(51.9));
        assert_eq!(points[0].elevation, Some(1.2));
        assert_eq!(points[1].latitude, None);
    }

    #[test]
    fn rejects_input_without_epochs_or_coordinates() {
        let no_epochs = r#"{ "features": [ { "geometry": { "coordinates": [1, 2] }, "properties": { "x": 1 } } ] }"#;
        assert!(parse_points(no_epochs).is_err());

        let bad_geom = r#"{ "features": [ { "geometry": null, "properties": { "20200101": 1 } } ] }"#;
        assert!(parse_points(bad_geom).is_err());
    }
}
