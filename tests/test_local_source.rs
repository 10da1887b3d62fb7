//! Directory-backed document source and a dry run over it.

use std::fs;
use xml_unpack::{BatchCoordinator, DocumentSource, IngestConfig, LocalDirSource, MemorySession};

#[tokio::test]
async fn lists_matching_files_in_name_order() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("b.xml"), "<docList/>")?;
    fs::write(dir.path().join("a.xml"), "<docList/>")?;
    fs::write(dir.path().join("notes.txt"), "ignore me")?;
    fs::create_dir(dir.path().join("nested.xml"))?;

    let source = LocalDirSource::new(dir.path(), ".xml");
    assert_eq!(source.list_documents().await?, vec!["a.xml", "b.xml"]);
    assert_eq!(source.read_document("a.xml").await?, "<docList/>");
    assert!(source.read_document("missing.xml").await.is_err());
    Ok(())
}

#[tokio::test]
async fn dry_run_over_a_directory() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    fs::write(
        dir.path().join("sub-001.xml"),
        r#"<docList id="S-1">
             <fileName>sub-001.xml</fileName>
             <party refId="P-1"><name>Jane</name><role>buyer</role><role>payer</role></party>
           </docList>"#,
    )?;
    fs::write(dir.path().join("sub-002.xml"), "")?;

    let config = IngestConfig {
        source_dir: dir.path().to_path_buf(),
        dry_run: true,
        ..IngestConfig::default()
    };
    let source = LocalDirSource::new(config.source_dir.clone(), config.extension.clone());
    let mut batch = BatchCoordinator::new(config, source, MemorySession::dry_run());

    let err = batch.run().await.expect_err("sub-002.xml is empty");
    let report = err.report().expect("documents were attempted");
    assert_eq!(report.outcomes[0].rows_inserted, 2);
    assert_eq!(report.outcomes[1].message, "file is empty");

    let party = batch.session().rows("party");
    assert_eq!(party.len(), 1);
    assert!(party[0].contains(&(
        "role".to_string(),
        xml_unpack::Scalar::Text("buyer, payer".to_string())
    )));
    assert!(party[0].contains(&(
        "fk_submission".to_string(),
        xml_unpack::Scalar::Text("S-1".to_string())
    )));
    Ok(())
}

#[tokio::test]
async fn read_failures_keep_the_io_cause() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let source = LocalDirSource::new(dir.path(), ".xml");
    let mut batch = BatchCoordinator::new(IngestConfig::default(), source, MemorySession::new());

    let err = batch
        .run_batch(&["gone.xml".to_string()])
        .await
        .expect_err("gone.xml does not exist");
    let message = &err.report().expect("documents were attempted").outcomes[0].message;
    assert!(message.starts_with("cannot read "), "{}", message);
    assert!(message.contains("No such file or directory"), "{}", message);
    Ok(())
}
