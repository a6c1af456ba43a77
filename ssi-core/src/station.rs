use serde::{Deserialize, Serialize};

use crate::model::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A DWD weather station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub height_m: Option<f64>,
}

impl Station {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestStation {
    pub station: Station,
    pub distance_km: f64,
}

/// Stations around the Hamburg coastal area.
pub fn default_stations() -> Vec<Station> {
    [
        ("00954", "Hamburg-Fuhlsbüttel", 53.6332, 9.9881, 11.0),
        ("01975", "Hamburg-Neuwiedenthal", 53.4777, 9.8966, 3.0),
        ("05516", "Schleswig", 54.5276, 9.5490, 43.0),
        ("00691", "Bremen", 53.0475, 8.7981, 5.0),
        ("00891", "Cuxhaven", 53.8706, 8.7211, 5.0),
        ("03032", "Lübeck", 53.8072, 10.7083, 15.0),
        ("01757", "Kiel-Holtenau", 54.3774, 10.1424, 27.0),
    ]
    .into_iter()
    .map(|(id, name, latitude, longitude, height)| Station {
        id: id.to_string(),
        name: name.to_string(),
        latitude,
        longitude,
        height_m: Some(height),
    })
    .collect()
}

/// Great-circle distance in kilometres.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

pub fn nearest_station(stations: &[Station], point: GeoPoint) -> Option<NearestStation> {
    stations
        .iter()
        .map(|station| (station, distance_km(point, station.location())))
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(station, distance_km)| NearestStation { station: station.clone(), distance_km })
}
