use std::io::Write;
use std::sync::Arc;
use supply_kpi::store::SqliteStore;
use supply_kpi::{
    AppConfig, DataLoader, Granularity, KpiCalculator, Pipeline, PipelineError, SchemaValidator,
    ShipmentFilter, ShipmentStore, Turnover,
};

const HEADER: &str =
    "shipment_id,origin,destination,promised_date,actual_date,quantity_shipped,quantity_received,lane";

fn csv(rows: &[&str]) -> String {
    let mut out = String::from(HEADER);
    for row in rows {
        out.push('\n');
        out.push_str(row);
    }
    out.push('\n');
    out
}

fn pipeline() -> Pipeline {
    Pipeline::from_config(&AppConfig::default()).unwrap()
}

#[test]
fn two_row_lane_scenario() {
    let input = csv(&[
        "S1,Oslo,Bergen,2024-01-01,2024-01-01,10,10,A",
        "S2,Oslo,Bergen,2024-01-01,2024-01-05,5,5,A",
    ]);
    let report = pipeline().run_bytes(input.as_bytes()).unwrap();

    assert_eq!(report.kpis.on_time_rate, 0.5);
    assert_eq!(report.kpis.lane_volumes.len(), 1);
    assert_eq!(report.kpis.lane_volumes["A"], 15);
    assert_eq!(report.kpis.inventory_turnover, Turnover::Undefined);
}

#[test]
fn header_only_file_gives_neutral_kpis() {
    let report = pipeline().run_bytes(csv(&[]).as_bytes()).unwrap();

    assert_eq!(report.kpis.shipments, 0);
    assert_eq!(report.kpis.on_time_rate, 0.0);
    assert!(report.kpis.lane_volumes.is_empty());
    assert_eq!(report.kpis.inventory_turnover, Turnover::Undefined);
    assert!(report.trend.is_empty());
    assert!(report.delivery.is_none());
}

#[test]
fn missing_required_column_is_one_schema_error() {
    let input = "shipment_id,origin,destination,promised_date,actual_date,quantity_shipped,quantity_received\n\
                 S1,Oslo,Bergen,2024-01-01,2024-01-01,10,10\n";
    match pipeline().run_bytes(input.as_bytes()) {
        Err(PipelineError::Invalid(errors)) => {
            assert_eq!(errors.len(), 1);
            let error = errors.iter().next().unwrap();
            assert!(error.is_schema_level());
            assert_eq!(error.column, "lane");
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn every_bad_cell_is_reported_together() {
    let input = csv(&[
        "S1,Oslo,Bergen,not-a-date,2024-01-01,10,10,A",
        "S2,Oslo,Bergen,2024-01-01,2024-01-05,-5,5,A",
        "S3,Oslo,Bergen,2024-01-01,2024-01-05,5,5,",
    ]);
    let Err(PipelineError::Invalid(errors)) = pipeline().run_bytes(input.as_bytes()) else {
        panic!("expected validation failure");
    };
    let rows: Vec<Option<usize>> = errors.iter().map(|e| e.row).collect();
    assert!(rows.contains(&Some(0)));
    assert!(rows.contains(&Some(1)));
    assert!(rows.contains(&Some(2)));
}

#[test]
fn calculator_is_idempotent() {
    let input = csv(&[
        "S1,Oslo,Bergen,2024-01-03,2024-01-02,10,8,A",
        "S2,Oslo,Trondheim,2024-01-01,2024-01-04,5,5,B",
    ]);
    let table = DataLoader::default().load_bytes(input.as_bytes()).unwrap();
    let validated = SchemaValidator::default().validate(table).unwrap();

    let first = KpiCalculator::report(&validated, Granularity::Day);
    let second = KpiCalculator::report(&validated, Granularity::Day);
    assert_eq!(first, second);
}

#[test]
fn report_serializes_to_json() {
    let input = csv(&["S1,Oslo,Bergen,2024-01-01,2024-01-01,10,10,A"]);
    let report = pipeline().run_bytes(input.as_bytes()).unwrap();
    let json: serde_json::Value = serde_json::to_value(&report).unwrap();

    assert_eq!(json["kpis"]["inventory_turnover"]["kind"], "undefined");
    assert_eq!(json["granularity"], "week");
    assert_eq!(json["kpis"]["lane_volumes"]["A"], 10);
}

#[test]
fn sqlite_store_round_trips_through_pipeline() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(dir.path().join("shipments.sqlite3")).unwrap());
    let pipeline = pipeline().with_store(store.clone());

    let input = csv(&[
        "S1,Oslo,Bergen,2024-01-03,2024-01-02,10,8,A",
        "S2,Oslo,Trondheim,2024-01-01,2024-01-04,5,5,B",
        "S3,Bergen,Oslo,2024-01-02,2024-01-02,7,7,A",
    ]);
    pipeline.run_bytes(input.as_bytes()).unwrap();

    let lane_a = store.load(&ShipmentFilter::all().lane("A")).unwrap();
    let ids: Vec<&str> = lane_a.iter().map(|r| r.shipment_id.as_str()).collect();
    assert_eq!(ids, vec!["S3", "S1"]);
    assert_eq!(store.kpi_history(5).unwrap().len(), 1);
}

#[test]
fn run_path_reads_files() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", csv(&["S1,Oslo,Bergen,2024-01-01,2024-01-02,10,4,A"])).unwrap();

    let report = pipeline().run_path(file.path()).unwrap();
    assert_eq!(report.kpis.shipments, 1);
    assert_eq!(report.kpis.on_time_rate, 0.0);
    assert_eq!(report.kpis.inventory_turnover, Turnover::Ratio(10.0 / 6.0));
}

#[test]
fn missing_file_is_a_parse_error() {
    let result = pipeline().run_path("/definitely/not/here.csv");
    assert!(matches!(result, Err(PipelineError::Parse(_))));
}

#[test]
fn largest_accepted_quantities_still_produce_a_report() {
    let max = i64::MAX;
    let rows: Vec<String> = (1..=3)
        .map(|i| format!("S{i},Oslo,Bergen,2024-01-01,2024-01-01,{max},1,A"))
        .collect();
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();

    let report = pipeline().run_bytes(csv(&rows).as_bytes()).unwrap();

    assert_eq!(report.kpis.shipments, 3);
    assert_eq!(report.kpis.lane_volumes["A"], u64::MAX);
    assert!(matches!(report.kpis.inventory_turnover, Turnover::Ratio(r) if (r - 3.0).abs() < 1e-9));
}
