//! Walk through the pure half of the matching filter: decode a driving
//! path and test rider points against it.
//!
//! Run with: cargo run --example path_proximity

use waypoint_matcher::{geo_utils, polyline, GeoPoint};

fn main() {
    // Overview polyline for a short trip, as a directions lookup returns it
    let encoded = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";
    let path = polyline::decode(encoded).expect("reference polyline decodes");

    println!("Path Proximity Example\n");
    println!("Decoded {} points from {:?}:", path.len(), encoded);
    for point in &path {
        println!("   ({:.5}, {:.5})", point.latitude, point.longitude);
    }
    println!("Path length: {:.1} km\n", geo_utils::path_length_km(&path));

    let tolerance_km = 5.0;
    let candidates = [
        ("first path vertex", path[0]),
        ("between the first two vertices", GeoPoint::new(39.6, -120.575)),
        ("well off the path", GeoPoint::new(44.43, 26.10)),
    ];

    for (label, point) in candidates {
        let near = geo_utils::is_point_near_path(&point, &path, tolerance_km);
        println!(
            "({:.3}, {:.3}) {} -> {}",
            point.latitude,
            point.longitude,
            label,
            if near { "on the path" } else { "too far" }
        );
    }
}
