use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use tech_radar_ingest::auth::{ConsentError, ConsentProvider};
use tech_radar_ingest::config::{DefaultSheet, RadarConfig};
use tech_radar_ingest::loader::sheet::{export_url, spreadsheet_url, values_url};
use tech_radar_ingest::net::fake::FakeFetcher;
use tech_radar_ingest::presenter::{Phase, Presented, RecordingPresenter};
use tech_radar_ingest::{ErrorKind, LoadOutcome, Locator, Pipeline, SourceKind};

const API_BASE: &str = "http://sheets.test";
const SHEET_ID: &str = "private-sheet";
const HEADER: &str = "name,ring,quadrant,isNew,description";

/// Grants a fixed token on every interactive request and counts prompts.
struct ScriptedConsent {
    prompts: AtomicUsize,
}

impl ScriptedConsent {
    const fn new() -> Self {
        Self {
            prompts: AtomicUsize::new(0),
        }
    }

    fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsentProvider for ScriptedConsent {
    async fn silent_token(&self) -> Option<String> {
        None
    }

    async fn interactive_token(&self) -> Result<String, ConsentError> {
        let prompt = self.prompts.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("token-{prompt}"))
    }

    fn account(&self) -> Option<String> {
        Some("someone@example.com".to_string())
    }
}

fn sheet_config() -> RadarConfig {
    RadarConfig {
        api_key: Some("api-key".to_string()),
        sheets_api_base: API_BASE.to_string(),
        ..RadarConfig::default()
    }
}

fn sheet_locator() -> Locator {
    Locator::parse(&format!(
        "?sheetId=https://docs.google.com/spreadsheets/d/{SHEET_ID}/edit"
    ))
}

fn sheet_metadata() -> String {
    serde_json::json!({
        "properties": { "title": "Private Radar" },
        "sheets": [
            { "properties": { "title": "Current" } },
            { "properties": { "title": "Archive" } }
        ]
    })
    .to_string()
}

fn sheet_values() -> String {
    serde_json::json!({
        "values": [
            ["name", "ring", "quadrant", "isNew", "description"],
            ["Kafka", "Adopt", "Platforms", "FALSE", "Event streaming"],
            ["Backstage", "Trial", "Tools", "TRUE", "Developer portal"]
        ]
    })
    .to_string()
}

#[tokio::test]
async fn csv_not_found_is_classified_for_csv() {
    let url = "https://example.com/missing.csv";
    let fetcher = FakeFetcher::new().respond(url, 404, "Not Found");
    let mut pipeline = Pipeline::new(RadarConfig::default(), fetcher, ScriptedConsent::new());
    let mut presenter = RecordingPresenter::new();

    let outcome = pipeline.load(&Locator::parse(url), &mut presenter).await;

    let error = outcome.error().cloned();
    assert_eq!(error.as_ref().map(|error| error.kind), Some(ErrorKind::FileNotFound));
    assert_eq!(error.and_then(|error| error.source_kind), Some(SourceKind::Csv));
    assert_eq!(pipeline.fetcher().request_count(url), 1);
}

#[tokio::test]
async fn json_fetch_failures_are_classified_for_json() {
    let missing = "https://example.com/missing.json";
    let offline = "https://offline.example.com/radar.json";
    let fetcher = FakeFetcher::new()
        .respond(missing, 404, "Not Found")
        .fail(offline, "connection refused");
    let mut pipeline = Pipeline::new(RadarConfig::default(), fetcher, ScriptedConsent::new());
    let mut presenter = RecordingPresenter::new();

    for url in [missing, offline] {
        let outcome = pipeline.load(&Locator::parse(url), &mut presenter).await;

        let error = outcome.error().cloned();
        assert_eq!(error.as_ref().map(|error| error.kind), Some(ErrorKind::FileNotFound), "{url}");
        assert_eq!(error.and_then(|error| error.source_kind), Some(SourceKind::Json), "{url}");
    }
    assert_eq!(pipeline.fetcher().request_count(offline), 1);
}

#[tokio::test]
async fn backslash_header_is_repaired_before_validation() -> Result<(), Box<dyn std::error::Error>> {
    let url = "https://example.com/radar.csv";
    let body = "\\,ring,quadrant,isNew,description\n\
                Rust,Adopt,languages,true,Fast\n\
                Go,Trial,languages,false,Simple\n";
    let fetcher = FakeFetcher::new().respond(url, 200, body);
    let mut pipeline = Pipeline::new(RadarConfig::default(), fetcher, ScriptedConsent::new());
    let mut presenter = RecordingPresenter::new();

    let outcome = pipeline.load(&Locator::parse(url), &mut presenter).await;

    let radar = outcome.radar().ok_or("expected a rendered radar")?;
    let names: Vec<&str> = radar.blips().map(|(_, blip)| blip.name.as_str()).collect();
    assert_eq!(names, vec!["Rust", "Go"]);
    assert_eq!(radar.title, "radar");
    assert_eq!(radar.current_sheet, "CSV File");
    Ok(())
}

#[tokio::test]
async fn fifth_ring_fails_as_malformed_data() {
    let url = "https://example.com/too-many-rings.csv";
    let mut body = format!("{HEADER}\n");
    for ring in ["Adopt", "Trial", "Assess", "Hold", "Retire"] {
        body.push_str(&format!("Blip {ring},{ring},Tools,false,\n"));
    }
    let fetcher = FakeFetcher::new().respond(url, 200, body);
    let mut pipeline = Pipeline::new(RadarConfig::default(), fetcher, ScriptedConsent::new());
    let mut presenter = RecordingPresenter::new();

    let outcome = pipeline.load(&Locator::parse(url), &mut presenter).await;

    let error = outcome.error().cloned();
    assert_eq!(error.as_ref().map(|error| error.kind), Some(ErrorKind::MalformedData));
    assert_eq!(
        error.map(|error| error.message),
        Some("More than 4 rings.".to_string())
    );
    assert!(presenter.rendered().is_none());
}

#[tokio::test]
async fn private_sheet_escalates_then_recovers_by_switching_account(
) -> Result<(), Box<dyn std::error::Error>> {
    let metadata_url = spreadsheet_url(API_BASE, SHEET_ID, None)?;
    let fetcher = FakeFetcher::new()
        .respond(&metadata_url, 403, "")
        .respond(&metadata_url, 403, "")
        .respond(&metadata_url, 200, sheet_metadata())
        .respond(values_url(API_BASE, SHEET_ID, "Current", None)?, 200, sheet_values());
    let mut pipeline = Pipeline::new(sheet_config(), fetcher, ScriptedConsent::new());
    let mut presenter = RecordingPresenter::new();

    let outcome = pipeline.load(&sheet_locator(), &mut presenter).await;

    assert!(outcome.is_unauthorized());
    assert_eq!(pipeline.consent().prompts(), 1);
    assert!(pipeline.session().consent_attempted());
    assert_eq!(
        outcome.error().and_then(|error| error.account.clone()),
        Some("someone@example.com".to_string())
    );
    assert!(presenter.phases().contains(&Phase::Unauthorized));

    let outcome = pipeline.switch_account(&mut presenter).await;

    assert_eq!(pipeline.consent().prompts(), 2);
    let radar = outcome.radar().ok_or("expected a rendered radar")?;
    assert_eq!(radar.title, "Private Radar");
    assert_eq!(radar.current_sheet, "Current");
    assert_eq!(radar.alternatives, vec!["Archive"]);
    assert_eq!(radar.blip_count(), 2);
    assert!(presenter.events.contains(&Presented::ErrorCleared));

    let bearers: Vec<Option<String>> = pipeline
        .fetcher()
        .requests()
        .into_iter()
        .map(|request| request.bearer)
        .collect();
    assert_eq!(
        bearers,
        vec![
            None,
            Some("token-1".to_string()),
            Some("token-2".to_string()),
            Some("token-2".to_string()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn denied_sheet_is_not_prompted_for_again() -> Result<(), Box<dyn std::error::Error>> {
    let metadata_url = spreadsheet_url(API_BASE, SHEET_ID, None)?;
    let fetcher = FakeFetcher::new().respond(&metadata_url, 403, "");
    let mut pipeline = Pipeline::new(sheet_config(), fetcher, ScriptedConsent::new());
    let mut presenter = RecordingPresenter::new();

    let first = pipeline.load(&sheet_locator(), &mut presenter).await;
    let second = pipeline.load(&sheet_locator(), &mut presenter).await;

    assert!(first.is_unauthorized());
    assert!(second.is_unauthorized());
    assert_eq!(pipeline.consent().prompts(), 1);
    Ok(())
}

#[tokio::test]
async fn forbidden_values_after_public_metadata_are_unauthorized(
) -> Result<(), Box<dyn std::error::Error>> {
    let fetcher = FakeFetcher::new()
        .respond(spreadsheet_url(API_BASE, SHEET_ID, None)?, 200, sheet_metadata())
        .respond(values_url(API_BASE, SHEET_ID, "Current", None)?, 403, "");
    let mut pipeline = Pipeline::new(sheet_config(), fetcher, ScriptedConsent::new());
    let mut presenter = RecordingPresenter::new();

    let outcome = pipeline.load(&sheet_locator(), &mut presenter).await;

    assert!(outcome.is_unauthorized());
    assert_eq!(
        outcome.error().and_then(|error| error.source_kind),
        Some(SourceKind::Sheet)
    );
    assert_eq!(
        outcome.error().and_then(|error| error.account.clone()),
        Some("someone@example.com".to_string())
    );
    assert_eq!(pipeline.consent().prompts(), 0);
    assert_eq!(pipeline.fetcher().requests().len(), 2);
    assert!(presenter.phases().contains(&Phase::Unauthorized));
    Ok(())
}

#[tokio::test]
async fn fixed_tables_fold_conjunctions_and_drop_unknown_labels(
) -> Result<(), Box<dyn std::error::Error>> {
    let url = "https://example.com/radar.json";
    let body = serde_json::json!([
        { "name": "Pairing", "ring": "adopt", "quadrant": "Tools and Techniques", "isNew": "TRUE", "description": "" },
        { "name": "Linting", "ring": "Trial", "quadrant": "tools & techniques", "isNew": "false", "description": "" },
        { "name": "Katas", "ring": "Trial", "quadrant": "Tools-and-Techniques", "isNew": "false", "description": "" },
        { "name": "Mystery", "ring": "Adopt", "quadrant": "Somewhere Else", "isNew": "false", "description": "" },
        { "name": "Retired", "ring": "Retire", "quadrant": "Platforms", "isNew": "false", "description": "" }
    ])
    .to_string();
    let config = RadarConfig {
        fixed_tables: true,
        rings: vec!["Adopt".to_string(), "Trial".to_string()],
        quadrants: vec![
            "Tools & Techniques".to_string(),
            "Platforms".to_string(),
            "Languages & Frameworks".to_string(),
            "Infrastructure".to_string(),
        ],
        ..RadarConfig::default()
    };
    let fetcher = FakeFetcher::new().respond(url, 200, body);
    let mut pipeline = Pipeline::new(config, fetcher, ScriptedConsent::new());
    let mut presenter = RecordingPresenter::new();

    let outcome = pipeline.load(&Locator::parse(url), &mut presenter).await;

    let radar = outcome.radar().ok_or("expected a rendered radar")?;
    let techniques = radar
        .quadrant("Tools & Techniques")
        .ok_or("missing quadrant")?;
    let names: Vec<&str> = techniques.blips.iter().map(|blip| blip.name.as_str()).collect();
    assert_eq!(names, vec!["Pairing", "Linting", "Katas"]);
    assert_eq!(radar.blip_count(), 3);
    assert_eq!(radar.quadrants.len(), 4);
    Ok(())
}

#[tokio::test]
async fn invalid_config_disables_input() {
    let config = RadarConfig {
        rings: vec![
            "One".to_string(),
            "Two".to_string(),
            "Three".to_string(),
            "Four".to_string(),
            "Five".to_string(),
        ],
        ..RadarConfig::default()
    };
    let mut pipeline = Pipeline::new(config, FakeFetcher::new(), ScriptedConsent::new());
    let mut presenter = RecordingPresenter::new();

    let outcome = pipeline
        .load(&Locator::parse("https://example.com/radar.csv"), &mut presenter)
        .await;

    let error = outcome.error().cloned();
    assert_eq!(error.as_ref().map(|error| error.kind), Some(ErrorKind::InvalidConfig));
    assert_eq!(error.and_then(|error| error.source_kind), None);
    assert!(!pipeline.accepts_input());
    assert!(pipeline.fetcher().requests().is_empty());
}

#[tokio::test]
async fn default_sheet_loads_through_the_public_export() -> Result<(), Box<dyn std::error::Error>> {
    let config = RadarConfig {
        default_sheet: Some(DefaultSheet {
            sheet_id: "public-sheet".to_string(),
            sheet_name: None,
            title: "Platform Radar".to_string(),
        }),
        ..RadarConfig::default()
    };
    let body = format!("{HEADER}\nTerraform,Adopt,tools,false,IaC\n");
    let fetcher = FakeFetcher::new().respond(export_url("public-sheet", None)?, 200, body);
    let mut pipeline = Pipeline::new(config, fetcher, ScriptedConsent::new());
    let mut presenter = RecordingPresenter::new();

    let outcome = pipeline.load(&Locator::default(), &mut presenter).await;

    let radar = outcome.radar().ok_or("expected a rendered radar")?;
    assert_eq!(radar.title, "Platform Radar");
    assert_eq!(presenter.last_title(), Some("Platform Radar"));
    assert_eq!(pipeline.consent().prompts(), 0);
    assert!(matches!(outcome, LoadOutcome::Rendered(_)));
    Ok(())
}
