//! Service flows over a CSV data directory and a SQLite database in a
//! temp dir: track → monitor (live and replay), alerts, watchlists.

use chrono::{Duration, NaiveDate};
use std::path::Path;

use zonewatch_core::data::CsvSource;
use zonewatch_core::domain::{Candle, Timeframe, ZoneType};
use zonewatch_core::error::ErrorKind;
use zonewatch_core::timeline::Mode;
use zonewatch_runner::{
    AppConfig, DecodeRequest, ExtractionOutcome, MonitorStatus, NoProgress, Reaction, ServiceError,
    SourceKind, ZoneService,
};

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, m, day).unwrap()
}

fn candles(date: NaiveDate, rows: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    let open_time = date.and_hms_opt(9, 15, 0).unwrap();
    rows.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Candle {
            timestamp: open_time + Duration::minutes(15 * i as i64),
            open,
            high,
            low,
            close,
            volume: 10_000,
        })
        .collect()
}

/// Balanced base 708–712, rally to 730, calm tail (ATR 2.0).
fn rally_session(date: NaiveDate) -> Vec<Candle> {
    let mut rows = vec![(710.0, 712.0, 708.0, 710.0); 6];
    let mut prev = 710.0;
    for close in [716.0, 723.0, 730.0] {
        rows.push((prev, close, prev, close));
        prev = close;
    }
    rows.extend(vec![(730.0, 731.0, 729.0, 730.0); 14]);
    candles(date, &rows)
}

/// HINDZINC rallies on the fetch day and trades at 715.2 on the execute
/// day. FLATCO has data but no impulse. GHOST has no files at all.
fn seed(data_dir: &Path) {
    let csv = CsvSource::new(data_dir, d(1, 29));
    csv.write_session("HINDZINC", d(1, 27), Timeframe::Minute15, &rally_session(d(1, 27)))
        .unwrap();
    csv.write_session(
        "HINDZINC",
        d(1, 29),
        Timeframe::Minute15,
        &candles(d(1, 29), &[(714.0, 716.0, 713.5, 715.2)]),
    )
    .unwrap();
    csv.write_session(
        "FLATCO",
        d(1, 27),
        Timeframe::Minute15,
        &candles(d(1, 27), &[(50.0, 50.5, 49.5, 50.0); 23]),
    )
    .unwrap();
    csv.write_session(
        "FLATCO",
        d(1, 29),
        Timeframe::Minute15,
        &candles(d(1, 29), &[(50.0, 50.5, 49.5, 50.0)]),
    )
    .unwrap();
}

fn service(dir: &Path, today: NaiveDate) -> ZoneService {
    let mut config = AppConfig::default();
    config.database_path = dir.join("trading_zones.db");
    config.data.source = SourceKind::Csv;
    config.data.data_dir = dir.join("candles");
    ZoneService::from_config(config, today).unwrap()
}

fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn track_then_monitor_live() {
    let dir = tempfile::tempdir().unwrap();
    seed(&dir.path().join("candles"));
    let svc = service(dir.path(), d(1, 29));

    let tracked = svc
        .track(&symbols(&["hindzinc", "FLATCO", "GHOST"]), d(1, 29), d(1, 29), &NoProgress)
        .unwrap();
    assert_eq!(tracked.context.fetch_day, d(1, 27));
    assert_eq!(tracked.context.mode, Mode::Live);
    assert_eq!(tracked.added, 3);

    let labels: Vec<_> = tracked
        .extraction
        .outcomes
        .iter()
        .map(|o| (o.symbol.as_str(), o.outcome.label()))
        .collect();
    assert_eq!(labels, [("HINDZINC", "stored"), ("FLATCO", "no zone"), ("GHOST", "no data")]);

    let report = svc.evaluate(Some(d(1, 29)), d(1, 29)).unwrap();
    assert_eq!(report.rows.len(), 3);

    let hz = &report.rows[0];
    assert_eq!(hz.symbol, "HINDZINC");
    assert_eq!(hz.price, Some(715.2));
    let zone = hz.zone.as_ref().unwrap();
    assert_eq!(zone.zone_type, ZoneType::Bullish);
    assert_eq!((zone.zone_low, zone.zone_high), (708.0, 712.0));
    assert!((hz.distance_percent.unwrap() - 0.4494).abs() < 1e-3);
    assert_eq!(hz.status, MonitorStatus::Near);
    assert_eq!(hz.reaction, Some(Reaction::Holding));

    assert_eq!(report.rows[1].status, MonitorStatus::NoZone);
    assert_eq!(report.rows[2].status, MonitorStatus::PriceUnavailable);
    assert!(report.rows[2].note.is_some());

    let alerts = svc.alerts(Some(d(1, 29)), d(1, 29)).unwrap();
    assert_eq!(alerts.rows.len(), 1);
    assert_eq!(alerts.rows[0].symbol, "HINDZINC");
}

#[test]
fn tracking_twice_reuses_stored_zones() {
    let dir = tempfile::tempdir().unwrap();
    seed(&dir.path().join("candles"));
    let svc = service(dir.path(), d(1, 29));
    let list = symbols(&["HINDZINC"]);

    svc.track(&list, d(1, 29), d(1, 29), &NoProgress).unwrap();
    let again = svc.track(&list, d(1, 29), d(1, 29), &NoProgress).unwrap();
    assert_eq!(again.added, 0);
    assert!(matches!(
        again.extraction.outcomes[0].outcome,
        ExtractionOutcome::Skipped { existing: 1 }
    ));
    assert_eq!(svc.zones("hindzinc", d(1, 27)).unwrap().len(), 1);
    assert_eq!(svc.decode_entries(d(1, 29)).unwrap().len(), 1);
}

#[test]
fn replay_uses_execute_day_close() {
    let dir = tempfile::tempdir().unwrap();
    seed(&dir.path().join("candles"));
    service(dir.path(), d(1, 29))
        .track(&symbols(&["HINDZINC"]), d(1, 29), d(1, 29), &NoProgress)
        .unwrap();

    // a week later the same decode list replays against the stored close
    let later = service(dir.path(), d(2, 5));
    let report = later.evaluate(Some(d(1, 29)), d(2, 5)).unwrap();
    assert_eq!(report.context.mode, Mode::Replay);
    assert_eq!(report.rows[0].price, Some(715.2));
    assert_eq!(report.rows[0].status, MonitorStatus::Near);
}

#[test]
fn corrupt_session_file_is_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("candles");
    seed(&data_dir);
    let path = CsvSource::new(&data_dir, d(1, 29)).session_path("BROKEN", d(1, 27), Timeframe::Minute15);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        "timestamp,open,high,low,close,volume\n2026-01-27 09:15:00,100,abc,99,100,1000\n",
    )
    .unwrap();

    let report = service(dir.path(), d(1, 29))
        .extract(&symbols(&["HINDZINC", "BROKEN", "GHOST"]), d(1, 27), &NoProgress)
        .unwrap();
    assert!(matches!(
        report.outcomes[1].outcome,
        ExtractionOutcome::Failed { kind: ErrorKind::Data, .. }
    ));
    assert!(matches!(report.outcomes[2].outcome, ExtractionOutcome::NoData { .. }));
    assert_eq!(report.failed(), 1);
}

#[test]
fn rejected_requests_carry_kinds() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(dir.path(), d(1, 29));

    let future = svc.track(&symbols(&["TCS"]), d(1, 30), d(1, 29), &NoProgress).unwrap_err();
    assert_eq!(future.kind(), ErrorKind::FutureDate);

    let holiday = svc.evaluate(Some(d(1, 26)), d(1, 29)).unwrap_err();
    assert_eq!(holiday.kind(), ErrorKind::InvalidDate);

    let mismatch = svc
        .add_decode_entries(&DecodeRequest {
            decode_date: d(1, 29),
            symbols: symbols(&["TCS"]),
            fetch_date: d(1, 23),
        })
        .unwrap_err();
    assert!(matches!(mismatch, ServiceError::FetchDayMismatch { expected, .. } if expected == d(1, 27)));
}

#[test]
fn watchlist_round_trip_through_database() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(dir.path(), d(1, 29));

    let mut session = svc.session();
    session.set_execute_day(d(1, 29), d(1, 29)).unwrap();
    session.add_symbols(&["hindzinc", "tatasteel"]).unwrap();
    let saved = svc.save_watchlist("metals", "base metals", &session).unwrap();
    assert_eq!(saved.fetch_day, d(1, 27));

    // new process, later day
    let svc = service(dir.path(), d(2, 2));
    assert_eq!(svc.list_watchlists().unwrap().len(), 1);

    let mut fresh = svc.session();
    let ctx = svc.load_watchlist("metals", &mut fresh, d(2, 2)).unwrap();
    assert_eq!(ctx.mode, Mode::Replay);
    assert_eq!(fresh.symbols(), ["HINDZINC", "TATASTEEL"]);

    let report = svc.evaluate_session(&fresh).unwrap();
    assert_eq!(report.rows.len(), 2);
    assert!(report.rows.iter().all(|r| r.fetch_day == d(1, 27)));

    assert!(svc.delete_watchlist("metals").unwrap());
    assert!(!svc.delete_watchlist("metals").unwrap());
}
