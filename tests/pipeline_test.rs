use std::fs;
use std::sync::Arc;

use sema_scraper::error::ScraperError;
use sema_scraper::infra::http_client::ReqwestHttp;
use sema_scraper::pipeline::Pipeline;
use sema_scraper::storage::{BatchFile, InMemoryStorage, JsonFileStorage};
use sema_scraper::types::{BirthDateQuality, EntityType};
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FIXTURE: &str = include_str!("fixtures/sema-lmes.xml");

async fn serve(status: u16, body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sanctions/sema-lmes.xml"))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("content-type", "text/xml")
                .insert_header("etag", "\"sema-2024-03\"")
                .insert_header("last-modified", "Fri, 01 Mar 2024 12:00:00 GMT")
                .set_body_string(body),
        )
        .expect(1)
        .mount(&server)
        .await;
    server
}

fn http() -> Box<ReqwestHttp> {
    Box::new(ReqwestHttp::new(5, Some("sema-scraper-tests")).unwrap())
}

#[tokio::test]
async fn test_full_run_writes_normalized_batch() {
    let server = serve(200, FIXTURE).await;
    let out = tempdir().unwrap();
    let pipeline = Pipeline::new(http(), Arc::new(JsonFileStorage::new(out.path())));

    let url = format!("{}/sanctions/sema-lmes.xml", server.uri());
    let result = pipeline.run("dfatd-sema", &url).await.unwrap();

    assert_eq!(result.total_records, 4);
    assert_eq!(result.individuals, 2);
    assert_eq!(result.entities, 2);

    let files: Vec<_> = fs::read_dir(out.path()).unwrap().collect();
    assert_eq!(files.len(), 1);

    let output = result.output.expect("json sink reports its file");
    let batch: BatchFile = serde_json::from_str(&fs::read_to_string(output).unwrap()).unwrap();
    assert_eq!(batch.source, "dfatd-sema");
    assert_eq!(batch.entity_count, 4);
    let origin = batch.origin.as_ref().unwrap();
    assert_eq!(origin.url, url);
    assert_eq!(origin.content_type.as_deref(), Some("text/xml"));
    assert_eq!(origin.etag.as_deref(), Some("\"sema-2024-03\""));
    assert_eq!(origin.last_modified.as_deref(), Some("Fri, 01 Mar 2024 12:00:00 GMT"));

    let ids: Vec<_> = batch.entities.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["Burma-ind-1", "Russia-ind-14", "Syria-ent-3", "None-ent-9"]);

    let john = &batch.entities[0];
    assert_eq!(john.entity_type, EntityType::Individual);
    assert_eq!(john.name, "John Doe");
    assert_eq!(john.alias_names(), vec!["Johnny D", "J. Doe", "Jean Doe"]);
    assert_eq!(john.summary.as_deref(), Some("Schedule 1, Part 1"));
    let dob = john.birth_date.as_ref().unwrap();
    assert_eq!(dob.date.as_deref(), Some("1960-12-25"));
    assert_eq!(dob.quality, BirthDateQuality::Strong);

    let ivanova = &batch.entities[1];
    assert_eq!(ivanova.name, "Ivanova");
    assert_eq!(ivanova.summary, None);
    let dob = ivanova.birth_date.as_ref().unwrap();
    assert_eq!(dob.date.as_deref(), Some("1972"));
    assert_eq!(dob.quality, BirthDateQuality::Weak);

    let acme = &batch.entities[2];
    assert_eq!(acme.entity_type, EntityType::Entity);
    assert_eq!(acme.name, "ACME Corp");
    assert_eq!(acme.alias_names(), vec!["ACME Société", "ACME Trading"]);
    assert_eq!(
        acme.nationality.as_ref().unwrap().country.as_deref(),
        Some("Syria")
    );
    assert_eq!(acme.summary.as_deref(), Some("Schedule 2"));

    let stateless = &batch.entities[3];
    assert!(stateless.nationality.is_none());
    assert!(stateless.aliases.is_empty());
    assert!(stateless.summary.is_none());
}

#[tokio::test]
async fn test_server_error_aborts_run() {
    let server = serve(500, "oops").await;
    let storage = InMemoryStorage::new();
    let pipeline = Pipeline::new(http(), Arc::new(storage.clone()));

    let url = format!("{}/sanctions/sema-lmes.xml", server.uri());
    let err = pipeline.run("dfatd-sema", &url).await.unwrap_err();

    assert!(matches!(err, ScraperError::Status { status: 500, .. }));
    assert!(storage.batches().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_xml_aborts_run() {
    let server = serve(200, "<data-set><record><Item>1</Entity></record></data-set>").await;
    let out = tempdir().unwrap();
    let pipeline = Pipeline::new(http(), Arc::new(JsonFileStorage::new(out.path().join("batches"))));

    let url = format!("{}/sanctions/sema-lmes.xml", server.uri());
    let err = pipeline.run("dfatd-sema", &url).await.unwrap_err();

    assert!(matches!(err, ScraperError::Xml(_)));
    assert!(!out.path().join("batches").exists());
}

#[tokio::test]
async fn test_unreachable_host_is_http_error() {
    let server = MockServer::start().await;
    let url = format!("{}/sanctions/sema-lmes.xml", server.uri());
    drop(server);

    let pipeline = Pipeline::new(http(), Arc::new(InMemoryStorage::new()));
    let err = pipeline.run("dfatd-sema", &url).await.unwrap_err();
    assert!(matches!(err, ScraperError::Http(_)));
}
