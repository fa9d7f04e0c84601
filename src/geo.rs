//! Great-circle distances and radius rings for the distance filter

use serde_json::{Value, json};

use crate::models::Coordinate;

/// Kilometers per statute mile as used for the radius overlay
pub const KM_PER_MILE: f64 = 1.609;

/// Mean earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Great-circle distance in miles.
///
/// Symmetric in its arguments and zero for identical points. Any non-finite
/// component yields `f64::INFINITY` so threshold comparisons exclude it.
#[must_use]
pub fn distance_miles(a: &Coordinate, b: &Coordinate) -> f64 {
    if !(a.latitude.is_finite()
        && a.longitude.is_finite()
        && b.latitude.is_finite()
        && b.longitude.is_finite())
    {
        return f64::INFINITY;
    }
    if a == b {
        return 0.0;
    }

    // fixed argument order keeps the floating point result identical both ways
    let (from, to) = if (a.latitude, a.longitude) <= (b.latitude, b.longitude) {
        (a, b)
    } else {
        (b, a)
    };

    haversine::distance(
        haversine::Location {
            latitude: from.latitude,
            longitude: from.longitude,
        },
        haversine::Location {
            latitude: to.latitude,
            longitude: to.longitude,
        },
        haversine::Units::Miles,
    )
}

/// Point reached by travelling `distance_km` from `origin` on `bearing_deg`
fn destination(origin: &Coordinate, distance_km: f64, bearing_deg: f64) -> Coordinate {
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();
    let bearing = bearing_deg.to_radians();
    let delta = distance_km / EARTH_RADIUS_KM;

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    Coordinate::new(lat2.to_degrees(), lon2.to_degrees())
}

/// Closed ring approximating a circle of `radius_miles` around `center`.
///
/// Returns `steps + 1` points with the first repeated at the end, or an empty
/// ring when the inputs cannot describe a circle.
#[must_use]
pub fn radius_polygon(center: &Coordinate, radius_miles: f64, steps: usize) -> Vec<Coordinate> {
    if !center.is_valid() || !radius_miles.is_finite() || radius_miles <= 0.0 || steps < 3 {
        return Vec::new();
    }

    let radius_km = radius_miles * KM_PER_MILE;
    let mut ring: Vec<Coordinate> = (0..steps)
        .map(|i| {
            let bearing = (i as f64) * -360.0 / (steps as f64);
            destination(center, radius_km, bearing)
        })
        .collect();
    ring.push(ring[0]);
    ring
}

/// GeoJSON polygon feature for a ring, used as an overlay source payload
#[must_use]
pub fn ring_to_geojson(ring: &[Coordinate]) -> Value {
    let coordinates: Vec<[f64; 2]> = ring.iter().map(Coordinate::to_lon_lat).collect();
    json!({
        "type": "Feature",
        "properties": {},
        "geometry": {
            "type": "Polygon",
            "coordinates": [coordinates],
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const DENVER: Coordinate = Coordinate {
        latitude: 39.7392,
        longitude: -104.9903,
    };
    const VAIL: Coordinate = Coordinate {
        latitude: 39.6403,
        longitude: -106.3742,
    };

    #[rstest]
    #[case(DENVER, VAIL)]
    #[case(Coordinate { latitude: -33.9, longitude: 18.4 }, Coordinate { latitude: 51.5, longitude: -0.12 })]
    #[case(Coordinate { latitude: 10.0, longitude: 179.9 }, Coordinate { latitude: -10.0, longitude: -179.9 })]
    fn test_distance_is_symmetric(#[case] a: Coordinate, #[case] b: Coordinate) {
        assert_eq!(distance_miles(&a, &b), distance_miles(&b, &a));
        assert!(distance_miles(&a, &b) > 0.0);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(distance_miles(&DENVER, &DENVER), 0.0);
        assert_eq!(distance_miles(&VAIL, &VAIL), 0.0);
    }

    #[test]
    fn test_denver_to_vail() {
        let miles = distance_miles(&DENVER, &VAIL);
        // roughly 74 miles as the crow flies
        assert!(miles > 70.0 && miles < 80.0, "{miles}");
    }

    #[test]
    fn test_non_finite_is_infinitely_far() {
        let broken = Coordinate::new(f64::NAN, -105.0);
        assert_eq!(distance_miles(&broken, &DENVER), f64::INFINITY);
        assert_eq!(distance_miles(&DENVER, &broken), f64::INFINITY);
        let infinite = Coordinate::new(40.0, f64::NEG_INFINITY);
        assert_eq!(distance_miles(&DENVER, &infinite), f64::INFINITY);
    }

    #[test]
    fn test_radius_polygon_is_closed_ring() {
        let ring = radius_polygon(&DENVER, 50.0, 64);
        assert_eq!(ring.len(), 65);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_radius_polygon_points_lie_on_the_circle() {
        let ring = radius_polygon(&DENVER, 50.0, 32);
        for point in &ring {
            let miles = distance_miles(&DENVER, point);
            // 1.609 km per mile against the haversine mile radius
            assert!((miles - 50.0).abs() < 0.5, "{miles}");
        }
        // first bearing is due north
        assert!(ring[0].latitude > DENVER.latitude);
        assert!((ring[0].longitude - DENVER.longitude).abs() < 1e-9);
    }

    #[test]
    fn test_radius_polygon_is_deterministic() {
        assert_eq!(
            radius_polygon(&VAIL, 12.5, 64),
            radius_polygon(&VAIL, 12.5, 64)
        );
    }

    #[rstest]
    #[case(0.0, 64)]
    #[case(-5.0, 64)]
    #[case(f64::INFINITY, 64)]
    #[case(10.0, 2)]
    fn test_radius_polygon_degenerate_inputs(#[case] radius: f64, #[case] steps: usize) {
        assert!(radius_polygon(&DENVER, radius, steps).is_empty());
    }

    #[test]
    fn test_ring_to_geojson_uses_lon_lat() {
        let ring = radius_polygon(&DENVER, 5.0, 4);
        let feature = ring_to_geojson(&ring);
        let first = &feature["geometry"]["coordinates"][0][0];
        assert_eq!(first[0].as_f64().unwrap(), ring[0].longitude);
        assert_eq!(first[1].as_f64().unwrap(), ring[0].latitude);
        assert_eq!(feature["geometry"]["type"], "Polygon");
    }
}
