//! Tests for surface classification of a parsed directions response.

use route_planner::directions::parse_response;
use route_planner::{SurfaceClassifier, SurfaceType};

const RESPONSE: &str = r#"{
  "code": "Ok",
  "routes": [{
    "distance": 1000.0,
    "duration": 300.0,
    "geometry": {"type": "LineString", "coordinates": [
      [7.000, 46.000], [7.001, 46.000], [7.002, 46.000], [7.003, 46.000],
      [7.004, 46.000], [7.005, 46.000]
    ]},
    "legs": [{"steps": [
      {
        "distance": 400.0,
        "name": "Seestrasse",
        "ref": "",
        "mode": "cycling",
        "geometry": {"type": "LineString", "coordinates": [[7.000, 46.000], [7.001, 46.000], [7.002, 46.000]]},
        "maneuver": {"type": "depart"},
        "intersections": [{"classes": ["primary"]}]
      },
      {
        "distance": 300.0,
        "name": "Waldweg",
        "mode": "cycling",
        "geometry": {"type": "LineString", "coordinates": [[7.002, 46.000], [7.003, 46.000]]},
        "maneuver": {"type": "turn", "modifier": "left"},
        "intersections": [{}, {"classes": ["track"]}]
      },
      {
        "distance": 200.0,
        "name": "Lake crossing",
        "mode": "ferry",
        "geometry": {"type": "LineString", "coordinates": [[7.003, 46.000], [7.004, 46.000]]},
        "maneuver": {"type": "notification"},
        "intersections": []
      },
      {
        "distance": 100.0,
        "name": "Uferpfad",
        "mode": "cycling",
        "geometry": {"type": "LineString", "coordinates": [[7.004, 46.000], [7.005, 46.000]]},
        "maneuver": {"type": "continue"},
        "intersections": [{"classes": ["tunnel"]}]
      },
      {
        "distance": 0.0,
        "name": "",
        "mode": "cycling",
        "geometry": {"type": "LineString", "coordinates": [[7.005, 46.000]]},
        "maneuver": {"type": "arrive"},
        "intersections": []
      }
    ]}]
  }]
}"#;

#[test]
fn test_classifies_each_step_in_order() {
    let route = parse_response(RESPONSE).unwrap();
    let breakdown = SurfaceClassifier::new().classify(&route);

    // the arrival step has a single point and is skipped
    assert_eq!(breakdown.segment_count(), 4);
    assert_eq!(breakdown.paved.len(), 1);
    assert_eq!(breakdown.paved[0].source_step_name, "Seestrasse");
    assert_eq!(breakdown.paved[0].coordinates.len(), 3);
    assert_eq!(breakdown.unpaved[0].source_step_name, "Waldweg");
    assert_eq!(breakdown.ferry[0].source_step_name, "Lake crossing");
    // class tags present but unknown: the name is not consulted
    assert_eq!(breakdown.unclassified[0].source_step_name, "Uferpfad");
    assert!(breakdown.path.is_empty());
}

#[test]
fn test_share_by_distance() {
    let route = parse_response(RESPONSE).unwrap();
    let breakdown = SurfaceClassifier::new().classify(&route);

    assert!((breakdown.share(SurfaceType::Paved) - 0.4).abs() < 1e-9);
    assert!((breakdown.share(SurfaceType::Unpaved) - 0.3).abs() < 1e-9);
    assert!((breakdown.share(SurfaceType::Ferry) - 0.2).abs() < 1e-9);
    assert!((breakdown.share(SurfaceType::Default) - 0.1).abs() < 1e-9);
    assert_eq!(breakdown.share(SurfaceType::Path), 0.0);
}

#[test]
fn test_classification_is_deterministic() {
    let route = parse_response(RESPONSE).unwrap();
    let classifier = SurfaceClassifier::new();
    assert_eq!(classifier.classify(&route), classifier.classify(&route));
}

#[test]
fn test_breakdown_serializes_with_type_names() {
    let route = parse_response(RESPONSE).unwrap();
    let breakdown = SurfaceClassifier::new().classify(&route);
    let value = serde_json::to_value(&breakdown).unwrap();
    assert_eq!(value["paved"][0]["type"], "paved");
    assert_eq!(value["default"][0]["type"], "default");
}

#[test]
fn test_classification_with_debug_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
    let classifier = SurfaceClassifier::new();

    let stepped = classifier.classify(&parse_response(RESPONSE).unwrap());
    assert_eq!(stepped.segment_count(), 4);

    let bare = parse_response(
        r#"{"code":"Ok","routes":[{"distance":150.0,"duration":40.0,
            "geometry":{"type":"LineString","coordinates":[[7.0,46.0],[7.002,46.0]]},
            "legs":[]}]}"#,
    )
    .unwrap();
    let whole = classifier.classify(&bare);
    assert_eq!(whole.segment_count(), 1);
    assert_eq!(whole.unclassified[0].distance, 150.0);
}
