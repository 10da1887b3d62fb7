//! End-to-end batch runs against the in-memory session: idempotency,
//! per-document rollback and aggregate failure reporting.

use xml_unpack::domain::node::Scalar;
use xml_unpack::{
    BatchCoordinator, BatchError, ForeignKeyDeriver, IngestConfig, MemorySession, MemorySource,
    OutcomeStatus, RelationalMapper,
};

fn doc(file_name: &str, inner: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<docList id="{file}-id">
  <fileName>{file}</fileName>
  {inner}
</docList>"#,
        file = file_name,
        inner = inner
    )
}

fn coordinator(source: MemorySource, session: MemorySession) -> BatchCoordinator<MemorySource, MemorySession> {
    BatchCoordinator::new(IngestConfig::default(), source, session)
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn flat_document_yields_one_ledger_row() -> Result<(), Box<dyn std::error::Error>> {
    let source = MemorySource::new().with_document(
        "flat.xml",
        "<docList><fileName>flat.xml</fileName></docList>",
    );
    let mut batch = coordinator(source, MemorySession::new());

    let report = batch.run().await?;
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].rows_inserted, 1);
    assert_eq!(report.outcomes[0].message, "");

    let rows = batch.session().rows("submission");
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0],
        vec![("fileName".to_string(), Scalar::Text("flat.xml".to_string()))]
    );
    Ok(())
}

#[tokio::test]
async fn nested_child_is_linked_to_the_root_identifier() -> Result<(), Box<dyn std::error::Error>> {
    let source = MemorySource::new().with_document(
        "a.xml",
        doc("a.xml", "<applicant><name>ACME</name></applicant>"),
    );
    let mut batch = coordinator(source, MemorySession::new());

    let report = batch.run().await?;
    assert_eq!(report.rows_inserted(), 2);

    let session = batch.session();
    let applicant = session.rows("applicant");
    assert_eq!(applicant.len(), 1);
    assert!(applicant[0].contains(&("fk_submission".to_string(), Scalar::Text("a.xml-id".to_string()))));
    assert!(applicant[0].contains(&("fileName".to_string(), Scalar::Text("a.xml".to_string()))));

    // `@id` is stored as `id` on the ledger row.
    let root = session.rows("submission");
    assert!(root[0].contains(&("id".to_string(), Scalar::Text("a.xml-id".to_string()))));
    Ok(())
}

#[tokio::test]
async fn second_run_skips_already_ingested_documents() -> Result<(), Box<dyn std::error::Error>> {
    let source = MemorySource::new().with_document(
        "a.xml",
        doc("a.xml", "<party refNumber=\"x\"><name>Jane</name></party>"),
    );
    let mut batch = coordinator(source, MemorySession::new());

    let first = batch.run().await?;
    assert_eq!(first.outcomes[0].rows_inserted, 2);
    let total = batch.session().total_rows();

    let second = batch.run().await?;
    let outcome = &second.outcomes[0];
    assert_eq!(outcome.rows_inserted, 0);
    assert_eq!(outcome.message, "file was already ingested times=1");
    assert_eq!(outcome.status, OutcomeStatus::Skipped { times: 1 });
    assert_eq!(batch.session().total_rows(), total);
    Ok(())
}

#[tokio::test]
async fn failed_insert_rolls_back_only_that_document() -> Result<(), Box<dyn std::error::Error>> {
    let source = MemorySource::new()
        .with_document(
            "bad.xml",
            doc(
                "bad.xml",
                "<item><v>1</v></item><item><v>2</v></item><item><v>3</v></item>",
            ),
        )
        .with_document("good.xml", doc("good.xml", "<item><v>9</v></item>"));

    // The third insert of every transaction fails; `good.xml` only needs two.
    let mut batch = coordinator(source, MemorySession::new().fail_on_nth_insert(3));

    let err = batch.run().await.expect_err("bad.xml must fail the batch");
    let report = err.report().expect("documents were attempted");

    assert_eq!(report.outcomes[0].status, OutcomeStatus::Failed);
    assert_eq!(report.outcomes[0].rows_inserted, 0);
    assert!(report.outcomes[0].message.contains("INSERT INTO item(v, fileName, fk_submission)"));
    assert_eq!(report.outcomes[1].status, OutcomeStatus::Ingested);
    assert_eq!(report.outcomes[1].rows_inserted, 2);

    let session = batch.session();
    assert!(!session.in_transaction());
    assert_eq!(session.count_where("fileName", "bad.xml"), 0);
    assert_eq!(session.count_where("fileName", "good.xml"), 2);
    assert!(session.statements().iter().any(|s| s == "ROLLBACK"));
    Ok(())
}

#[tokio::test]
async fn aggregate_error_lists_every_document() -> Result<(), Box<dyn std::error::Error>> {
    let source = MemorySource::new()
        .with_document("one.xml", doc("one.xml", "<a><x>1</x></a>"))
        .with_document("two.xml", doc("two.xml", "<audit><x>1</x></audit>"))
        .with_document("three.xml", doc("three.xml", ""));
    let session = MemorySession::new().fail_when(|stmt| stmt.table == "audit");
    let mut batch = coordinator(source, session);

    let err = batch.run().await.expect_err("two.xml cannot be written");
    match &err {
        BatchError::DocumentsFailed { failed, report } => {
            assert_eq!(*failed, 1);
            assert_eq!(report.failed(), 1);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let message = err.to_string();
    let lines: Vec<&str> = message.lines().collect();
    assert_eq!(lines[0], "Results:");
    assert_eq!(lines[1], "one.xml -> 2 rows | ");
    assert_eq!(
        lines[2],
        "two.xml -> 0 rows | injected failure on insert into audit: INSERT INTO audit(x, fileName, fk_submission) VALUES($1, $2, $3)"
    );
    assert_eq!(lines[3], "three.xml -> 1 rows | ");
    assert_eq!(lines[4], "3 documents, 3 rows inserted, 0 skipped, 1 failed");
    assert_eq!(batch.session().count_where("fileName", "two.xml"), 0);
    assert_eq!(batch.session().count_where("fileName", "three.xml"), 1);
    Ok(())
}

#[tokio::test]
async fn outcomes_follow_input_order() -> Result<(), Box<dyn std::error::Error>> {
    let source = MemorySource::new()
        .with_document("a.xml", doc("a.xml", ""))
        .with_document("b.xml", doc("b.xml", ""))
        .with_document("c.xml", doc("c.xml", ""));
    let mut batch = coordinator(source, MemorySession::new());

    let report = batch.run_batch(&ids(&["c.xml", "a.xml", "b.xml"])).await?;
    let order: Vec<&str> = report.outcomes.iter().map(|o| o.document_id.as_str()).collect();
    assert_eq!(order, vec!["c.xml", "a.xml", "b.xml"]);
    Ok(())
}

#[tokio::test]
async fn read_and_structure_failures_are_isolated() -> Result<(), Box<dyn std::error::Error>> {
    let source = MemorySource::new()
        .with_document("empty.xml", "")
        .with_document("noroot.xml", "<other><fileName>x</fileName></other>")
        .with_document("nofile.xml", "<docList><title>t</title></docList>")
        .with_document("ok.xml", doc("ok.xml", ""));
    let mut batch = coordinator(source, MemorySession::new());

    let ids = ids(&["missing.xml", "empty.xml", "noroot.xml", "nofile.xml", "ok.xml"]);
    let err = batch.run_batch(&ids).await.expect_err("four documents fail");
    let report = err.report().expect("documents were attempted");

    let messages: Vec<&str> = report.outcomes.iter().map(|o| o.message.as_str()).collect();
    assert_eq!(messages[0], "document not found: missing.xml");
    assert_eq!(messages[1], "file is empty");
    assert!(messages[2].contains("docList"));
    assert!(messages[3].contains("fileName"));
    assert_eq!(messages[4], "");
    assert_eq!(report.failed(), 4);
    assert_eq!(batch.session().rows("submission").len(), 1);
    Ok(())
}

#[tokio::test]
async fn constraint_violation_reports_the_statement() -> Result<(), Box<dyn std::error::Error>> {
    let source = MemorySource::new()
        .with_document("a.xml", doc("a.xml", "<party refNumber=\"P1\"><name>x</name></party>"))
        .with_document("b.xml", doc("b.xml", "<party refNumber=\"P1\"><name>x</name></party>"));
    let session = MemorySession::new().with_unique("party", "refNumber");
    let mut batch = coordinator(source, session);

    let err = batch.run().await.expect_err("duplicate party");
    let report = err.report().expect("documents were attempted");
    let message = &report.outcomes[1].message;
    assert!(message.starts_with("duplicate key value violates unique constraint on party.refNumber"));
    assert!(message.ends_with("INSERT INTO party(refNumber, name, fileName, fk_submission) VALUES($1, $2, $3, $4)"));
    assert_eq!(batch.session().count_where("fileName", "b.xml"), 0);
    Ok(())
}

#[tokio::test]
async fn invalid_identifiers_fail_the_document_before_any_insert() -> Result<(), Box<dyn std::error::Error>> {
    let source = MemorySource::new().with_document(
        "ns.xml",
        doc("ns.xml", "<meta><dc:title>x</dc:title></meta>"),
    );
    let mut batch = coordinator(source, MemorySession::new());

    let err = batch.run().await.expect_err("`dc:title` is not a column name");
    let report = err.report().expect("documents were attempted");
    assert_eq!(report.outcomes[0].message, "invalid SQL identifier `dc:title`");
    assert_eq!(batch.session().total_rows(), 0);
    Ok(())
}

#[tokio::test]
async fn identifiers_are_checked_before_the_transaction_opens() -> Result<(), Box<dyn std::error::Error>> {
    let source = MemorySource::new().with_document(
        "late.xml",
        doc("late.xml", "<ok><v>1</v></ok><bad><dc:t>x</dc:t></bad>"),
    );
    let mut batch = coordinator(source, MemorySession::new());

    let err = batch.run().await.expect_err("`dc:t` is not a column name");
    let report = err.report().expect("documents were attempted");
    assert_eq!(report.outcomes[0].message, "invalid SQL identifier `dc:t`");

    let statements = batch.session().statements();
    assert!(!statements.iter().any(|s| s.starts_with("INSERT")), "{:?}", statements);
    assert!(!statements.iter().any(|s| s == "BEGIN TRANSACTION"), "{:?}", statements);
    assert_eq!(batch.session().total_rows(), 0);
    Ok(())
}

#[tokio::test]
async fn custom_identifier_fields_link_children() -> Result<(), Box<dyn std::error::Error>> {
    let source = MemorySource::new().with_document(
        "m.xml",
        "<docList><fileName>m.xml</fileName><code>C-7</code><line><qty>2</qty></line></docList>",
    );
    let mapper = RelationalMapper::new(ForeignKeyDeriver::new(vec!["code".to_string()]));
    let mut batch = coordinator(source, MemorySession::new()).with_mapper(mapper);

    batch.run().await?;
    let line = batch.session().rows("line");
    assert_eq!(line.len(), 1);
    assert!(line[0].contains(&("fk_submission".to_string(), Scalar::Text("C-7".to_string()))));
    Ok(())
}

#[tokio::test]
async fn listing_failure_is_a_batch_error() {
    use xml_unpack::LocalDirSource;

    let source = LocalDirSource::new("/definitely/not/here", ".xml");
    let mut batch = BatchCoordinator::new(IngestConfig::default(), source, MemorySession::new());

    match batch.run().await {
        Err(BatchError::Listing(_)) => {}
        other => panic!("expected a listing error, got {:?}", other),
    }
}
