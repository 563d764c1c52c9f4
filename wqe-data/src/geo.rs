//! Great-circle ranking of locations.

use wqe_store::{GeoPoint, SampleStore};
use wqe_utils::links;

use crate::filter::LocationFilter;
use crate::models::Neighbor;
use crate::view::View;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Number of neighbours listed when no other count is configured.
pub const DEFAULT_NEAREST: usize = 5;

/// Haversine distance in kilometres between two degree coordinates.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lon1) = (a.latitude.to_radians(), a.longitude.to_radians());
    let (lat2, lon2) = (b.latitude.to_radians(), b.longitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// The `k` locations closest to `focal_id`, nearest first.
///
/// Only location-level filters apply. Equal distances are listed in id
/// order and the focal location is never listed. Locations without
/// coordinates are skipped.
pub fn nearest(
    store: &SampleStore,
    focal_id: &str,
    k: usize,
    filter: &LocationFilter,
) -> View<Vec<Neighbor>> {
    let Some(focal) = store.location(focal_id) else {
        return View::NotFound(focal_id.to_string());
    };
    let Some(origin) = focal.position else {
        log::debug!("[WQE] geo: location {} has no coordinates", focal_id);
        return View::NoData;
    };

    // locations are stored in id order, so the stable sort breaks ties by id
    let mut ranked: Vec<(f64, usize)> = store
        .locations()
        .iter()
        .enumerate()
        .filter(|(_, l)| l.id != focal.id && filter.admits(store, l))
        .filter_map(|(i, l)| l.position.map(|p| (haversine_km(origin, p), i)))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
    ranked.truncate(k);

    let neighbors: Vec<Neighbor> = ranked
        .into_iter()
        .map(|(distance_km, i)| {
            let l = &store.locations()[i];
            Neighbor {
                location_id: l.id.clone(),
                name: l.name.clone(),
                distance_km,
                test_types: l.test_types.clone(),
                sample_count: l.sample_count,
                link: links::location_link(&l.id),
            }
        })
        .collect();
    log::debug!("[WQE] geo: {} neighbours of {}", neighbors.len(), focal_id);
    View::from_items(neighbors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use wqe_store::TestTypeFilter;

    const CSV: &str = "\
Location_ID,Location_Name,Latitude,Longitude,Sample_Count,Test_Type,Date
F,Focal,51.00,0.00,50,River,2021-01-01
A,Alpha,51.00,0.10,50,River,2021-01-01
B,Bravo,51.01,0.00,50,Lake,2021-01-01
C,Charlie,51.00,-0.10,50,River,2021-01-01
D,Delta,51.50,0.00,2,River,2021-01-01
E,Echo,,,50,River,2021-01-01
";

    fn store() -> SampleStore {
        SampleStore::load_csv(CSV, &[] as &[&str]).unwrap()
    }

    fn ids(view: View<Vec<Neighbor>>) -> Vec<String> {
        view.data()
            .unwrap_or_default()
            .into_iter()
            .map(|n| n.location_id)
            .collect()
    }

    #[test]
    fn tenth_of_a_degree_is_about_ten_km() {
        let a = GeoPoint { latitude: 51.0, longitude: 0.0 };
        let b = GeoPoint { latitude: 51.09, longitude: 0.0 };
        let expected = 0.09_f64.to_radians() * EARTH_RADIUS_KM;
        assert_abs_diff_eq!(haversine_km(a, b), expected, epsilon = 0.1);
        assert_abs_diff_eq!(haversine_km(a, b), 10.0, epsilon = 0.1);
    }

    #[test]
    fn ranks_ascending_excluding_focal() {
        let store = store();
        let view = nearest(&store, "F", 5, &LocationFilter::default());
        let neighbors = view.clone().data().unwrap();
        assert!(neighbors.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
        // A and C are equidistant: id order breaks the tie
        assert_eq!(ids(view), ["B", "A", "C", "D"]);
    }

    #[test]
    fn ties_follow_id_order_not_row_order() {
        let csv = "\
Location_ID,Latitude,Longitude,Date
F,51.00,0.00,2021-01-01
Z9,51.00,0.05,2021-01-01
A1,51.00,0.05,2021-01-01
";
        let store = SampleStore::load_csv(csv, &[] as &[&str]).unwrap();
        assert_eq!(ids(nearest(&store, "F", 5, &LocationFilter::default())), ["A1", "Z9"]);
        assert_eq!(ids(nearest(&store, "F", 1, &LocationFilter::default())), ["A1"]);
    }

    #[test]
    fn applies_location_level_filters_and_k() {
        let store = store();
        let filter = LocationFilter {
            test_types: TestTypeFilter::new(["river"]),
            min_sample_count: 10,
        };
        assert_eq!(ids(nearest(&store, "F", 5, &filter)), ["A", "C"]);
        assert_eq!(ids(nearest(&store, "F", 1, &LocationFilter::default())), ["B"]);
    }

    #[test]
    fn unknown_focal_is_not_found() {
        let store = store();
        assert_eq!(
            nearest(&store, "ZZ", 5, &LocationFilter::default()),
            View::NotFound("ZZ".to_string())
        );
        assert_eq!(nearest(&store, "E", 5, &LocationFilter::default()), View::NoData);
    }
}
