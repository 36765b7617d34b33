//! End-to-end tests for the works, entities and check stages
//!
//! Each test builds a small partition tree in a TempDir and runs the real
//! stages against it.

mod helpers;

use helpers::{pair, Fixture};
use semoa_common::config::FilterMode;
use semoa_common::tables::Table;
use semoa_common::{Error, FrontierSnapshot};
use semoa_extract::pipeline::{self, EntityStatus};
use semoa_extract::resolver::Entity;
use semoa_extract::PipelineError;
use serde_json::json;

fn w1_w2(fixture: &Fixture) {
    fixture.write_part(
        "works",
        "2024-01-01_part_000.jsonl.gz",
        &[
            json!({
                "id": "https://openalex.org/W1",
                "title": "Kept",
                "publication_year": 2021,
                "type": "journal-article",
                "authorships": [{"author": {"id": "A1"}}],
                "concepts": [{"id": "C1", "score": 0.9}]
            }),
            json!({
                "id": "W2",
                "publication_year": 2019,
                "type": "journal-article",
                "authorships": [{"author": {"id": "A2"}}],
                "concepts": [{"id": "C2", "score": 0.5}]
            }),
        ],
    );
}

#[tokio::test]
async fn test_year_filter_scenario() {
    let fixture = Fixture::new();
    w1_w2(&fixture);

    let mut options = fixture.options();
    options.works.filter = FilterMode::RecentJournalArticles;
    options.works.min_year = 2020;
    options.run_entities = false;
    options.run_check = false;

    let summary = pipeline::run(options).await.unwrap();
    let works = summary.works.unwrap();
    assert_eq!(works.stats.accepted, 1);
    assert_eq!(works.stats.filtered_out, 1);

    assert_eq!(fixture.column(Table::Works, "id"), vec!["W1"]);
    assert_eq!(fixture.rows(Table::AuthorWork), vec![pair("A1", "W1")]);
    assert_eq!(
        fixture.rows(Table::WorkConcept),
        vec![vec!["W1".to_string(), "C1".to_string(), "0.9".to_string()]]
    );

    let snapshot = FrontierSnapshot::load(&works.handoff).unwrap();
    assert_eq!(snapshot.author_ids.sorted(), vec!["A1"]);
    assert_eq!(snapshot.concept_ids.sorted(), vec!["C1"]);
    assert!(snapshot.run_id.is_some());
}

#[tokio::test]
async fn test_records_without_id_leave_no_trace() {
    let fixture = Fixture::new();
    fixture.write_part(
        "works",
        "part_000.gz",
        &[
            json!({"title": "No id", "authorships": [{"author": {"id": "A9"}}], "referenced_works": ["W5"]}),
            json!({"id": "", "concepts": [{"id": "C9"}]}),
            json!({"id": "W3"}),
        ],
    );
    let mut options = fixture.options();
    options.run_entities = false;
    options.run_check = false;

    let summary = pipeline::run(options).await.unwrap();
    let works = summary.works.unwrap();
    assert_eq!(works.stats.missing_id, 2);
    assert_eq!(fixture.column(Table::Works, "id"), vec!["W3"]);
    assert!(fixture.rows(Table::AuthorWork).is_empty());
    assert!(fixture.rows(Table::WorkConcept).is_empty());
    assert!(fixture.rows(Table::WorkCitation).is_empty());

    let snapshot = FrontierSnapshot::load(&works.handoff).unwrap();
    assert!(snapshot.author_ids.is_empty());
    assert!(snapshot.concept_ids.is_empty());
}

#[tokio::test]
async fn test_works_cap_is_exact_and_order_stable() {
    let fixture = Fixture::new();
    let first: Vec<_> = (0..4).map(|i| json!({"id": format!("W{}", i)})).collect();
    let second: Vec<_> = (4..8).map(|i| json!({"id": format!("W{}", i)})).collect();
    fixture.write_part("works", "part_001.gz", &second);
    fixture.write_part("works", "part_000.gz", &first);

    for (cap, expected) in [(Some(6), 6usize), (Some(2), 2), (Some(100), 8), (None, 8)] {
        let mut options = fixture.options();
        options.works.max_works = cap;
        options.run_entities = false;
        options.run_check = false;

        let summary = pipeline::run(options).await.unwrap();
        let ids = fixture.column(Table::Works, "id");
        assert_eq!(ids.len(), expected, "cap {:?}", cap);
        let want: Vec<String> = (0..expected).map(|i| format!("W{}", i)).collect();
        assert_eq!(ids, want);
        assert_eq!(summary.works.unwrap().stats.cap_reached, cap.map_or(false, |c| c as usize <= 8));
    }
}

#[tokio::test]
async fn test_full_run_resolves_every_kind() {
    let fixture = Fixture::new();
    fixture.write_part(
        "works",
        "updated_date_2024-03-01_part_000.jsonl.gz",
        &[json!({
            "id": "W1",
            "publication_year": 2022,
            "cited_by_count": 3,
            "host_venue": {"id": null},
            "primary_location": {"source": {"id": "https://openalex.org/S1", "host_organization_name": "Springer Nature"}},
            "authorships": [{"author": {"id": "A1"}, "institutions": [{"id": "I1"}]}],
            "concepts": [{"id": "C1", "score": 0.7}],
            "referenced_works": ["W99"]
        })],
    );
    fixture.write_part(
        "authors",
        "2024-03-01_part_000.jsonl.gz",
        &[
            json!({"id": "A0", "display_name": "Unrelated"}),
            json!({"id": "https://openalex.org/A1", "display_name": "Ada", "orcid": "0000-0001", "works_count": 5,
                   "last_known_institutions": [{"id": "https://openalex.org/I1"}, {"id": "I2"}]}),
        ],
    );
    fixture.write_part(
        "institutions",
        "part_000.gz",
        &[json!({"id": "I1", "display_name": "MIT", "country_code": "US", "type": "education"})],
    );
    fixture.write_part(
        "concepts",
        "part_000.gz",
        &[json!({"id": "C1", "display_name": "Physics", "level": 1, "ancestors": [{"id": "C0"}]}),
          json!({"id": "C0", "display_name": "Science", "level": 0})],
    );
    fixture.write_part(
        "sources",
        "part_000.gz",
        &[json!({"id": "S1", "display_name": "Nature", "issn_l": "0028-0836", "host_organization_name": "Springer Nature"})],
    );
    fixture.write_part(
        "publishers",
        "part_000.gz",
        &[
            json!({"display_name": "Springer Nature", "country_codes": ["DE", "GB"], "works_count": 10}),
            json!({"display_name": "springer nature"}),
        ],
    );

    let summary = pipeline::run(fixture.options()).await.unwrap();

    assert_eq!(fixture.rows(Table::WorkSource), vec![pair("W1", "S1")]);
    assert_eq!(fixture.rows(Table::WorkCitation), vec![pair("W1", "W99")]);
    assert_eq!(fixture.column(Table::Authors, "id"), vec!["A1"]);
    assert_eq!(fixture.rows(Table::AuthorInstitution), vec![pair("A1", "I1")]);
    assert_eq!(fixture.column(Table::Institutions, "display_name"), vec!["MIT"]);
    assert_eq!(fixture.column(Table::Concepts, "id"), vec!["C1", "C0"]);
    assert_eq!(fixture.rows(Table::ConceptAncestor), vec![pair("C1", "C0")]);
    assert_eq!(fixture.column(Table::Sources, "issn"), vec!["0028-0836"]);
    assert_eq!(fixture.rows(Table::SourcePublisher), vec![pair("S1", "Springer Nature")]);
    assert_eq!(
        fixture.rows(Table::Publishers),
        vec![vec!["Springer Nature".to_string(), "10".into(), "0".into(), "DE,GB".into()]]
    );

    let concepts = summary.entity(Entity::Concepts).unwrap().stats().unwrap();
    assert_eq!(concepts.discovered(), 1);

    // Only the citation of a work outside the dataset dangles
    let report = summary.integrity.unwrap();
    assert!(report.is_clean(), "{:?}", report.violations().collect::<Vec<_>>());
    assert!(fixture.output_dir().join("integrity_report.json").exists());
}

#[tokio::test]
async fn test_concept_closure_depends_on_record_order() {
    let fixture = Fixture::new();
    fixture.write_part("works", "part_000.gz", &[json!({"id": "W1", "concepts": [{"id": "C1"}]})]);
    // C0 is read before C1 adds it to the frontier; C2 after
    fixture.write_part(
        "concepts",
        "part_000.gz",
        &[
            json!({"id": "C0"}),
            json!({"id": "C1", "ancestors": [{"id": "C0"}, {"id": "C2"}]}),
            json!({"id": "C2"}),
        ],
    );
    let mut options = fixture.options();
    options.entities.parallel = false;

    let summary = pipeline::run(options).await.unwrap();

    assert_eq!(fixture.column(Table::Concepts, "id"), vec!["C1", "C2"]);
    assert_eq!(fixture.rows(Table::ConceptAncestor), vec![pair("C1", "C0"), pair("C1", "C2")]);

    let report = summary.integrity.unwrap();
    let ancestor = report
        .checks
        .iter()
        .find(|c| c.key.relation == Table::ConceptAncestor && c.key.column == "ancestor_id")
        .unwrap();
    assert_eq!(ancestor.dangling, 1);
    assert_eq!(ancestor.sample, vec!["C0"]);
    assert!(!ancestor.is_violation());
}

#[tokio::test]
async fn test_missing_entity_directory_is_isolated() {
    let fixture = Fixture::new();
    fixture.write_part(
        "works",
        "part_000.gz",
        &[json!({"id": "W1", "authorships": [{"author": {"id": "A1"}}], "concepts": [{"id": "C1"}]})],
    );
    fixture.write_part("concepts", "part_000.gz", &[json!({"id": "C1"})]);
    let mut options = fixture.options();
    options.run_check = false;

    let summary = pipeline::run(options).await.unwrap();

    let authors = summary.entity(Entity::Authors).unwrap();
    assert!(matches!(authors.status, EntityStatus::MissingDirectory { .. }));
    assert!(!fixture.table_path(Table::Authors).exists());
    assert!(!fixture.table_path(Table::AuthorInstitution).exists());

    assert_eq!(fixture.column(Table::Concepts, "id"), vec!["C1"]);
    assert!(summary.failed_entities().is_empty());
    assert_eq!(summary.entities.len(), 5);
}

#[tokio::test]
async fn test_unreadable_snapshot_aborts_entity_stage() {
    let fixture = Fixture::new();
    fixture.write_part("authors", "part_000.gz", &[json!({"id": "A1"})]);
    std::fs::create_dir_all(fixture.output_dir()).unwrap();
    std::fs::write(fixture.output_dir().join("entity_ids.json"), b"{\"author_ids\": [").unwrap();

    let mut options = fixture.options();
    options.run_works = false;

    match pipeline::run(options).await {
        Err(PipelineError::HandOff(Error::HandOff(_))) => {}
        other => panic!("Expected hand-off failure, got {:?}", other.map(|_| ())),
    }
    for table in Table::ALL {
        assert!(!fixture.table_path(table).exists(), "{} was written", table.name());
    }
}

#[tokio::test]
async fn test_missing_snapshot_aborts_entity_stage() {
    let fixture = Fixture::new();
    let mut options = fixture.options();
    options.run_works = false;
    options.run_check = false;

    let result = pipeline::run(options).await;
    assert!(matches!(result, Err(PipelineError::HandOff(_))));
}

#[tokio::test]
async fn test_legacy_snapshot_is_accepted() {
    let fixture = Fixture::new();
    fixture.write_part("sources", "part_000.gz", &[json!({"id": "S1", "publisher": "Wiley"})]);
    std::fs::create_dir_all(fixture.output_dir()).unwrap();
    std::fs::write(
        fixture.output_dir().join("entity_ids.json"),
        r#"{"author_ids": [], "concept_ids": [], "institution_ids": [],
            "source_ids": ["https://openalex.org/S1"], "publisher_names": ["Wiley"]}"#,
    )
    .unwrap();

    let mut options = fixture.options();
    options.run_works = false;
    options.run_check = false;

    pipeline::run(options).await.unwrap();
    assert_eq!(fixture.rows(Table::SourcePublisher), vec![pair("S1", "Wiley")]);
}

#[tokio::test]
async fn test_entity_cap_stops_after_current_file() {
    let fixture = Fixture::new();
    let works: Vec<_> = (0..4)
        .map(|i| json!({"id": format!("W{}", i), "authorships": [{"author": {"id": format!("A{}", i)}}]}))
        .collect();
    fixture.write_part("works", "part_000.gz", &works);
    fixture.write_part("authors", "part_000.gz", &[json!({"id": "A0"}), json!({"id": "A1"}), json!({"id": "A2"})]);
    fixture.write_part("authors", "part_001.gz", &[json!({"id": "A3"})]);

    let mut options = fixture.options();
    options.entities.caps.authors = Some(2);
    options.run_check = false;

    let summary = pipeline::run(options).await.unwrap();
    assert_eq!(fixture.column(Table::Authors, "id"), vec!["A0", "A1"]);

    let stats = summary.entity(Entity::Authors).unwrap().stats().unwrap();
    assert!(stats.cap_reached);
    assert_eq!(stats.matched, 3);
    assert_eq!(stats.suppressed_after_cap, 1);
    assert_eq!(stats.reader.files_opened, 1);
}

#[tokio::test]
async fn test_date_stamped_partitions_win_over_legacy() {
    let fixture = Fixture::new();
    fixture.write_part("works", "part_000.gz", &[json!({"id": "W-legacy"})]);
    fixture.write_part("works", "2024-02-01_part_001.jsonl.gz", &[json!({"id": "W-new-2"})]);
    fixture.write_part("works", "2024-01-01_part_000.jsonl.gz", &[json!({"id": "W-new-1"})]);

    let mut options = fixture.options();
    options.run_entities = false;
    options.run_check = false;

    let summary = pipeline::run(options).await.unwrap();
    assert_eq!(summary.works.unwrap().partitions, 2);
    assert_eq!(fixture.column(Table::Works, "id"), vec!["W-new-1", "W-new-2"]);
}

#[tokio::test]
async fn test_malformed_lines_are_skipped() {
    let fixture = Fixture::new();
    fixture.write_lines(
        "works",
        "part_000.gz",
        &[r#"{"id": "W1"}"#, "{not json", "", "[1, 2]", r#"{"id": "W2"}"#],
    );
    let mut options = fixture.options();
    options.run_entities = false;
    options.run_check = false;

    let summary = pipeline::run(options).await.unwrap();
    let stats = summary.works.unwrap().stats;
    assert_eq!(fixture.column(Table::Works, "id"), vec!["W1", "W2"]);
    assert_eq!(stats.reader.malformed_lines, 1);
    assert_eq!(stats.reader.blank_lines, 1);
    assert_eq!(stats.not_an_object, 1);
}

#[tokio::test]
async fn test_missing_works_directory_fails_works_stage() {
    let fixture = Fixture::new();
    let result = pipeline::run(fixture.options()).await;
    assert!(matches!(
        result,
        Err(PipelineError::Works(Error::MissingDirectory(_)))
    ));
}

#[tokio::test]
async fn test_parallel_and_sequential_agree() {
    let fixture = Fixture::new();
    w1_w2(&fixture);
    fixture.write_part("authors", "part_000.gz", &[json!({"id": "A1"}), json!({"id": "A2"})]);
    fixture.write_part(
        "concepts",
        "part_000.gz",
        &[json!({"id": "C1", "ancestors": [{"id": "C5"}]}), json!({"id": "C5"}), json!({"id": "C2"})],
    );

    let mut results = Vec::new();
    for parallel in [true, false] {
        let mut options = fixture.options();
        options.entities.parallel = parallel;
        options.run_check = false;
        pipeline::run(options).await.unwrap();
        results.push((
            fixture.rows(Table::Authors),
            fixture.rows(Table::Concepts),
            fixture.rows(Table::ConceptAncestor),
        ));
    }
    assert_eq!(results[0], results[1]);
    assert_eq!(results[0].1.len(), 3);
}
