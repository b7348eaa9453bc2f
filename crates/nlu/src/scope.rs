//! Scope parsers
//!
//! Pure functions deriving spatial, temporal, and parameter constraints from
//! the analyzed text plus the extracted entities. Parsers never fail; a
//! fragment that cannot be interpreted is skipped.

use crate::types::{
    BoundingBox, DataMode, Entity, EntityLabel, ParameterScope, SpatialScope, TemporalScope,
};
use chrono::NaiveDate;
use tracing::warn;

/// Half-width in degrees of the box built around a bare coordinate pair
const POINT_BOX_HALF_WIDTH_DEG: f64 = 2.0;

/// Derive the spatial scope
pub fn parse_spatial(entities: &[Entity]) -> SpatialScope {
    let mut scope = SpatialScope::default();

    for entity in entities {
        match entity.label {
            EntityLabel::Basin => {
                push_unique(&mut scope.ocean_basins, entity.canonical());
            }
            EntityLabel::Region => {
                push_unique(&mut scope.regions, entity.canonical());
            }
            EntityLabel::Location => {
                push_unique(&mut scope.locations, entity.canonical());
            }
            EntityLabel::Coordinate => {
                if scope.coordinates.is_none() {
                    scope.coordinates = parse_point_box(entity);
                }
            }
            _ => {}
        }
    }

    scope
}

/// Derive the temporal scope
pub fn parse_temporal(entities: &[Entity]) -> TemporalScope {
    let mut scope = TemporalScope::default();
    let mut dates: Vec<(NaiveDate, NaiveDate)> = Vec::new();

    for entity in entities {
        match entity.label {
            EntityLabel::Date => {
                scope.time_expressions.push(entity.text.clone());
                match parse_date_token(&entity.canonical()) {
                    Some(range) => dates.push(range),
                    None => {
                        warn!(token = %entity.text, "Unparseable date token skipped");
                    }
                }
            }
            EntityLabel::TimeExpression => {
                scope.time_expressions.push(entity.text.clone());
                if scope.relative_time.is_none() {
                    scope.relative_time = Some(entity.canonical());
                }
            }
            _ => {}
        }
    }

    if !dates.is_empty() {
        scope.start_date = dates.iter().map(|(s, _)| *s).min();
        scope.end_date = dates.iter().map(|(_, e)| *e).max();
    }

    scope.normalize()
}

/// Derive the parameter scope
pub fn parse_parameters(entities: &[Entity]) -> ParameterScope {
    let mut scope = ParameterScope::default();

    for entity in entities {
        match entity.label {
            EntityLabel::Measurement => {
                push_unique(&mut scope.measurements, entity.canonical());
            }
            EntityLabel::DepthRange => {
                if scope.depth_range.is_none() {
                    scope.depth_range = parse_depth_range(&entity.canonical());
                }
            }
            EntityLabel::QualityFlag => {
                push_unique(&mut scope.quality_requirements, entity.canonical());
            }
            EntityLabel::DataMode => {
                if scope.data_mode.is_none() {
                    scope.data_mode = parse_data_mode(&entity.canonical());
                }
            }
            _ => {}
        }
    }

    scope
}

impl Entity {
    /// Normalized value when present, else the span text lowercased
    fn canonical(&self) -> String {
        self.normalized_value
            .clone()
            .unwrap_or_else(|| self.text.to_lowercase())
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn parse_point_box(entity: &Entity) -> Option<BoundingBox> {
    let canonical = entity.canonical();
    let (lat_str, lon_str) = canonical.split_once(',')?;
    let lat: f64 = lat_str.trim().parse().ok()?;
    let lon: f64 = lon_str.trim().parse().ok()?;
    BoundingBox::around(lat, lon, POINT_BOX_HALF_WIDTH_DEG)
}

/// Interpret a normalized date token as an inclusive calendar range.
///
/// "2024" spans the year, "2024-10" the month, "2024-10-07" the single day.
fn parse_date_token(token: &str) -> Option<(NaiveDate, NaiveDate)> {
    let parts: Vec<&str> = token.split('-').collect();
    match parts.as_slice() {
        [year] => {
            let y: i32 = year.parse().ok()?;
            Some((
                NaiveDate::from_ymd_opt(y, 1, 1)?,
                NaiveDate::from_ymd_opt(y, 12, 31)?,
            ))
        }
        [year, month] => {
            let y: i32 = year.parse().ok()?;
            let m: u32 = month.parse().ok()?;
            let start = NaiveDate::from_ymd_opt(y, m, 1)?;
            let end = last_day_of_month(y, m)?;
            Some((start, end))
        }
        [year, month, day] => {
            let y: i32 = year.parse().ok()?;
            let m: u32 = month.parse().ok()?;
            let d: u32 = day.parse().ok()?;
            let date = NaiveDate::from_ymd_opt(y, m, d)?;
            Some((date, date))
        }
        _ => None,
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    first_of_next.pred_opt()
}

fn parse_depth_range(canonical: &str) -> Option<(f64, f64)> {
    let (min_str, max_str) = canonical.split_once(':')?;
    let min: f64 = min_str.parse().ok()?;
    let max: f64 = max_str.parse().ok()?;
    if min <= max {
        Some((min, max))
    } else {
        Some((max, min))
    }
}

fn parse_data_mode(canonical: &str) -> Option<DataMode> {
    match canonical {
        "r" | "R" => Some(DataMode::RealTime),
        "a" | "A" => Some(DataMode::Adjusted),
        "d" | "D" => Some(DataMode::Delayed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityExtractor;

    fn entities(text: &str) -> Vec<Entity> {
        EntityExtractor::new().extract(text)
    }

    #[test]
    fn test_spatial_regions_and_basins() {
        let scope = parse_spatial(&entities("temperature in the Arabian Sea and the Indian Ocean"));
        assert!(scope.regions.contains(&"arabian sea".to_string()));
        assert!(scope.ocean_basins.contains(&"indian ocean".to_string()));
    }

    #[test]
    fn test_spatial_point_box() {
        let scope = parse_spatial(&entities("profiles near 15.5, 68.2"));
        let bbox = scope.coordinates.unwrap();
        assert!(bbox.west < bbox.east);
        assert!(bbox.south < bbox.north);
        assert!((bbox.south..bbox.north).contains(&15.5));
        assert!((bbox.west..bbox.east).contains(&68.2));
    }

    #[test]
    fn test_temporal_month_span() {
        let scope = parse_temporal(&entities("salinity in October 2024"));
        assert_eq!(scope.start_date, NaiveDate::from_ymd_opt(2024, 10, 1));
        assert_eq!(scope.end_date, NaiveDate::from_ymd_opt(2024, 10, 31));
    }

    #[test]
    fn test_temporal_year_span() {
        let scope = parse_temporal(&entities("profiles from 2023"));
        assert_eq!(scope.start_date, NaiveDate::from_ymd_opt(2023, 1, 1));
        assert_eq!(scope.end_date, NaiveDate::from_ymd_opt(2023, 12, 31));
    }

    #[test]
    fn test_temporal_relative() {
        let scope = parse_temporal(&entities("show recent measurements"));
        assert_eq!(scope.relative_time.as_deref(), Some("recent"));
        assert!(scope.start_date.is_none());
    }

    #[test]
    fn test_temporal_two_dates_ordered() {
        let scope = parse_temporal(&entities("between March 2023 and January 2023"));
        assert!(scope.start_date.unwrap() <= scope.end_date.unwrap());
    }

    #[test]
    fn test_parameters() {
        let scope = parse_parameters(&entities(
            "adjusted salinity and oxygen from 100 to 500 dbar",
        ));
        assert!(scope.measurements.contains(&"salinity".to_string()));
        assert!(scope.measurements.contains(&"oxygen".to_string()));
        assert_eq!(scope.depth_range, Some((100.0, 500.0)));
        assert_eq!(scope.data_mode, Some(DataMode::Adjusted));
    }
}
