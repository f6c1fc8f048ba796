use super::{MapSource, create_test_pipeline, test_config};
use crate::pipeline::Pipeline;
use std::sync::Arc;

const INDEX: &str = "\
listing header
200 s/SRR1.psummary
10 s/TINY.psummary
300 s/SRR2.psummary
250 s/GONE.psummary
";

fn source() -> MapSource {
    MapSource::default()
        .with("SRR1", "sra=SRR1;phy=pisu;phycvg=o")
        .with("SRR2", "sra=SRR2;fam=kiti.Tombus-1;famcvg=O")
}

#[tokio::test]
async fn test_fill_fetches_admitted_entries() {
    let source = Arc::new(source());
    let (pipeline, _temp_dir) = create_test_pipeline(INDEX, source.clone()).await;

    let report = pipeline.fill_cache().await.unwrap();

    assert_eq!(report.scanned_lines, 5);
    assert_eq!(report.submitted, 3);
    assert_eq!(report.fetched, 2);
    assert_eq!(report.absent, 1);
    assert_eq!(report.cached, 0);
    assert_eq!(report.failed, 0);
    assert_eq!(source.calls(), 3);

    assert!(pipeline.cache().has("SRR1").await.unwrap());
    assert!(pipeline.cache().has("SRR2").await.unwrap());
    assert!(!pipeline.cache().has("GONE").await.unwrap());
    assert!(!pipeline.cache().has("TINY").await.unwrap());
}

#[tokio::test]
async fn test_second_fill_only_retries_absent_entries() {
    let source = Arc::new(source());
    let (pipeline, _temp_dir) = create_test_pipeline(INDEX, source.clone()).await;

    pipeline.fill_cache().await.unwrap();
    let report = pipeline.fill_cache().await.unwrap();

    assert_eq!(report.cached, 2);
    assert_eq!(report.fetched, 0);
    assert_eq!(report.absent, 1);
    // Only GONE is fetched again
    assert_eq!(source.calls(), 4);
}

#[tokio::test]
async fn test_limit_stops_submission() {
    let source = Arc::new(source());
    let (mut config, _temp_dir) = test_config(INDEX);
    config.limit = Some(1);
    let pipeline = Pipeline::with_source(config, source.clone()).await.unwrap();

    let report = pipeline.fill_cache().await.unwrap();

    assert_eq!(report.submitted, 1);
    assert_eq!(source.calls(), 1);
    assert_eq!(pipeline.cache().len().await.unwrap(), 1);
    assert!(pipeline.cache().has("SRR1").await.unwrap());
}

#[tokio::test]
async fn test_duplicate_ids_leave_one_entry() {
    let index: String = (0..40).map(|_| "500 s/DUP.psummary\n").collect();
    let source = Arc::new(MapSource::default().with("DUP", "sra=DUP;vir=a.b.c:d;vircvg=o"));
    let (pipeline, _temp_dir) = create_test_pipeline(&index, source.clone()).await;

    let report = pipeline.fill_cache().await.unwrap();

    assert_eq!(report.submitted, 40);
    assert_eq!(report.failed, 0);
    assert_eq!(report.fetched + report.cached, 40);
    assert!(report.fetched >= 1);
    assert_eq!(pipeline.cache().len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_large_index_is_drained_completely() {
    // More than the submission window of 4 * 8 pending tasks
    let index: String = (0..200)
        .map(|i| format!("1000 s/R{:03}.psummary\n", i))
        .collect();
    let mut source = MapSource::default();
    for i in 0..200 {
        source = source.with(&format!("R{:03}", i), "sra=x;phycvg=o;phy=pisu");
    }
    let source = Arc::new(source);
    let (pipeline, _temp_dir) = create_test_pipeline(&index, source.clone()).await;

    let report = pipeline.fill_cache().await.unwrap();

    assert_eq!(report.fetched, 200);
    assert_eq!(source.calls(), 200);
    assert_eq!(pipeline.cache().len().await.unwrap(), 200);
}

#[tokio::test]
async fn test_missing_local_index_without_server_fails() {
    let (mut config, _temp_dir) = test_config("");
    std::fs::remove_file(config.index_file()).unwrap();
    // Nothing listens on port 9 of localhost
    config.endpoint = "http://127.0.0.1:9".into();
    let pipeline = Pipeline::with_source(config, Arc::new(MapSource::default()))
        .await
        .unwrap();

    assert!(pipeline.fill_cache().await.is_err());
}

#[tokio::test]
async fn test_empty_summary_counts_as_absent() {
    let source = Arc::new(MapSource::default().with("EMPTY", ""));
    let (pipeline, _temp_dir) = create_test_pipeline("500 s/EMPTY.psummary\n", source.clone()).await;

    let report = pipeline.fill_cache().await.unwrap();
    assert_eq!(report.fetched, 0);
    assert_eq!(report.absent, 1);
    assert!(!pipeline.cache().has("EMPTY").await.unwrap());

    // Retried on the next pass
    pipeline.fill_cache().await.unwrap();
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_undecodable_index_lines_are_skipped() {
    let source = Arc::new(
        MapSource::default()
            .with("A", "sra=A;phy=pisu;phycvg=o")
            .with("B", "sra=B;phy=kiti;phycvg=o"),
    );
    let (config, _temp_dir) = test_config("");
    std::fs::write(
        config.index_file(),
        b"500 s/A.psummary\njunk \xff\xfe line\n500 s/B.psummary\n",
    )
    .unwrap();
    let pipeline = Pipeline::with_source(config, source).await.unwrap();

    let report = pipeline.fill_cache().await.unwrap();

    assert_eq!(report.scanned_lines, 3);
    assert_eq!(report.submitted, 2);
    assert_eq!(report.fetched, 2);
    assert!(pipeline.cache().has("B").await.unwrap());
}
