use molelog::eventlog::{decode, parse_line, ParsedLine};
use molelog::{EventKind, Grid, MsRange, Settings};

const SAMPLE: &str = include_str!("fixtures/sample_game.log");

#[test]
fn sample_log_decodes_to_seven_hits() {
    let doc = decode(SAMPLE);

    assert_eq!(doc.game_id.as_deref(), Some("20250909-202300-172-6e68"));
    assert_eq!(doc.unknown_count(), 0);

    let scores: Vec<u32> = doc
        .events
        .iter()
        .filter_map(|e| match e.kind {
            EventKind::Hit { score, .. } => Some(score),
            _ => None,
        })
        .collect();
    assert_eq!(scores, (1..=7).collect::<Vec<_>>());

    let last = doc.events.last().unwrap();
    assert_eq!(last.kind, EventKind::SessionEnd { final_score: 7 });
    assert_eq!(doc.final_score(), Some(7));
}

#[test]
fn sample_log_recovers_settings() {
    let doc = decode(SAMPLE);
    let settings = doc.settings.and_then(|s| s.complete()).unwrap();
    assert_eq!(
        settings,
        Settings {
            grid: Grid::new(4, 4),
            duration_ms: 10_000,
            mole_up_ms: MsRange::new(650, 1200),
            idle_gap_ms: MsRange::new(220, 500),
        }
    );
    assert!(matches!(
        doc.events.first().unwrap().kind,
        EventKind::SessionStart { .. }
    ));
}

#[test]
fn sample_log_json_matches_dashboard_contract() {
    let doc = decode(SAMPLE);
    let json = serde_json::to_value(&doc).unwrap();

    assert_eq!(json["gameId"], "20250909-202300-172-6e68");
    assert_eq!(json["settings"]["grid"]["rows"], 4);
    assert_eq!(json["settings"]["duration_ms"], 10000);

    let events = json["events"].as_array().unwrap();
    for ev in events {
        assert!(ev["ts"].is_string());
        assert!(ev["t_rel_s"].is_number());
        assert!(ev["type"].is_string());
    }
    let first_hit = events.iter().find(|e| e["type"] == "HIT").unwrap();
    assert_eq!(first_hit["t_rel_s"], 0.712);
    assert_eq!(first_hit["cell"]["index"], 5);
    assert_eq!(first_hit["score"], 1);
    assert_eq!(events.last().unwrap()["type"], "GAME_END");
    assert_eq!(events.last().unwrap()["final_score"], 7);
}

#[test]
fn garbage_line_yields_nothing() {
    let doc = decode("garbage text");
    assert!(doc.events.is_empty());
    assert_eq!(doc.game_id, None);
    assert!(serde_json::to_value(&doc).unwrap()["gameId"].is_null());
}

#[test]
fn hit_missing_index_group_becomes_unknown() {
    let payload = "HIT   @ r2c2 | pos_rel=(0.412,0.530) | score=1";
    let line = format!(
        "2025-09-09T20:23:00.884Z | 0.712s | gameId=20250909-202300-172-6e68 | {}",
        payload
    );

    let doc = decode(&line);
    assert_eq!(doc.events.len(), 1);
    assert_eq!(
        doc.events[0].kind,
        EventKind::Unknown {
            raw: payload.to_string()
        }
    );
    assert!(matches!(parse_line(&line), ParsedLine::Unknown(_)));
}

#[test]
fn noise_between_lines_is_tolerated() {
    let noisy: String = SAMPLE
        .lines()
        .flat_map(|l| [l, "", "-- console noise --"])
        .collect::<Vec<_>>()
        .join("\r\n");
    assert_eq!(decode(&noisy), decode(SAMPLE));
}
