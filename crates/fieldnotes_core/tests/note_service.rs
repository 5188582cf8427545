use chrono::NaiveDate;
use fieldnotes_core::service::note_service::STUB_PLACEHOLDERS;
use fieldnotes_core::{
    parse_note, CreateNote, DeleteOptions, FsNoteRepository, IssueCode, NoteRepository,
    NoteService, NoteServiceError, TrailingRef,
};
use tempfile::TempDir;

fn service() -> (TempDir, NoteService<FsNoteRepository>) {
    let dir = tempfile::tempdir().unwrap();
    let service = NoteService::new(FsNoteRepository::new(dir.path().join("content")));
    (dir, service)
}

fn seed(service: &NoteService<FsNoteRepository>, uid: &str, address: &str, body: &str) {
    service
        .repo()
        .create_raw(
            uid,
            &format!("---\nuid: {uid}\naddress: \"{address}\"\ndate: 2024-01-01\n---\n\n{body}\n"),
        )
        .unwrap();
}

#[test]
fn create_writes_a_placeholder_note_at_a_fresh_address() {
    let (_dir, service) = service();
    let uid = service
        .create(CreateNote {
            address: " Hardware // Cache ".to_string(),
            name: None,
            date: NaiveDate::from_ymd_opt(2024, 2, 3),
            body: None,
        })
        .unwrap();
    assert_eq!(uid.len(), 8);

    let note = parse_note(&service.read_raw(&uid).unwrap()).unwrap();
    assert_eq!(note.uid(), uid);
    assert_eq!(note.address(), "Hardware//Cache");
    assert_eq!(note.name(), "Cache");
    assert_eq!(note.date(), NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());
    assert!(STUB_PLACEHOLDERS.contains(&note.body.as_str()));
}

#[test]
fn create_refuses_a_body_that_would_read_back_as_trailing_refs() {
    let (_dir, service) = service();
    let result = service.create(CreateNote {
        body: Some("Related reading:\n[[bbbb0001]]".to_string()),
        ..CreateNote::new("Reading")
    });
    assert!(matches!(
        result,
        Err(NoteServiceError::TrailingRefsInBody { uids }) if uids == vec!["bbbb0001"]
    ));
    assert!(service.load_corpus().unwrap().corpus.notes().is_empty());

    let uid = service
        .create(CreateNote {
            body: Some("Related reading: [[bbbb0001]] first.".to_string()),
            ..CreateNote::new("Reading")
        })
        .unwrap();
    let note = parse_note(&service.read_raw(&uid).unwrap()).unwrap();
    assert_eq!(note.body, "Related reading: [[bbbb0001]] first.");
    assert!(note.trailing_refs.is_empty());
}

#[test]
fn create_rejects_taken_and_malformed_addresses() {
    let (_dir, service) = service();
    seed(&service, "cache001", "Hardware//Cache", "SRAM.");

    assert!(matches!(
        service.create(CreateNote::new("Hardware//Cache")),
        Err(NoteServiceError::Conflict { address }) if address == "Hardware//Cache"
    ));
    assert!(matches!(
        service.create(CreateNote::new("Hardware////Cache")),
        Err(NoteServiceError::InvalidAddress(_))
    ));
    assert!(matches!(
        service.create(CreateNote::new("  ")),
        Err(NoteServiceError::InvalidAddress(_))
    ));
}

#[test]
fn save_reverts_uid_edits_and_reports_issues() {
    let (_dir, service) = service();
    seed(&service, "aaaa0001", "A", "Alpha.");

    let edited = "---\nuid: hijacked\naddress: A\ndate: 2024-01-01\n---\nNow cites [[nope0001]] here.\n";
    let outcome = service.save("aaaa0001", edited).unwrap();
    assert!(outcome.persisted);
    assert!(outcome.uid_restored);
    assert!(outcome
        .issues
        .iter()
        .any(|issue| issue.code == IssueCode::BrokenRef));

    let stored = parse_note(&service.read_raw("aaaa0001").unwrap()).unwrap();
    assert_eq!(stored.uid(), "aaaa0001");
    assert!(stored.body.contains("[[nope0001]]"));
}

#[test]
fn save_does_not_write_unparseable_text() {
    let (_dir, service) = service();
    seed(&service, "aaaa0001", "A", "Alpha.");
    let before = service.read_raw("aaaa0001").unwrap();

    let outcome = service
        .save("aaaa0001", "---\nuid: aaaa0001\naddress: A\n---\nno date\n")
        .unwrap();
    assert!(!outcome.persisted);
    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(outcome.issues[0].code, IssueCode::ParseFailure);
    assert_eq!(service.read_raw("aaaa0001").unwrap(), before);

    assert!(matches!(
        service.save("missing1", "x"),
        Err(NoteServiceError::NotFound(_))
    ));
}

#[test]
fn validate_checks_a_draft_without_writing() {
    let (_dir, service) = service();
    seed(&service, "aaaa0001", "A", "Alpha.");
    let before = service.read_raw("aaaa0001").unwrap();

    let issues = service
        .validate("---\nuid: aaaa0001\naddress: A\ndate: 2024-01-01\n---\nBody.\n\n---\n[[zzzz0001]]\n")
        .unwrap();
    let codes: Vec<_> = issues.iter().map(|issue| issue.code).collect();
    assert!(codes.contains(&IssueCode::BrokenTrailingRef));
    assert!(codes.contains(&IssueCode::BareTrailingRef));
    assert_eq!(service.read_raw("aaaa0001").unwrap(), before);
}

#[test]
fn converting_to_stub_is_idempotent_and_keeps_metadata() {
    let (_dir, service) = service();
    seed(&service, "bbbb0001", "B", "Beta.");
    seed(
        &service,
        "aaaa0001",
        "Topics//A",
        "Long text about [[bbbb0001]].\n\n---\n[[bbbb0001]] :: related work",
    );
    let original = parse_note(&service.read_raw("aaaa0001").unwrap()).unwrap();

    service.convert_to_stub("aaaa0001").unwrap();
    let first = parse_note(&service.read_raw("aaaa0001").unwrap()).unwrap();
    service.convert_to_stub("aaaa0001").unwrap();
    let second = parse_note(&service.read_raw("aaaa0001").unwrap()).unwrap();

    for stub in [&first, &second] {
        assert_eq!(stub.frontmatter, original.frontmatter);
        assert_eq!(stub.trailing_refs, original.trailing_refs);
        assert!(STUB_PLACEHOLDERS.contains(&stub.body.as_str()));
        assert!(stub.references.is_empty());
    }
}

#[test]
fn stub_and_delete_cleanup_keep_unmodelled_frontmatter_keys() {
    let (_dir, service) = service();
    seed(&service, "dead0001", "Old", "Obsolete.");
    service
        .repo()
        .create_raw(
            "keep0001",
            "---\nuid: keep0001\naddress: Keep\ndate: 2024/01/01\ntags: [x, y]\ncover: img.png\n---\nMentions [[dead0001]] inline.\n\n---\n[[dead0001]] :: predecessor\n",
        )
        .unwrap();

    service
        .delete_note(
            "dead0001",
            &DeleteOptions {
                cleanup_trailing_refs: true,
                target_uids: Vec::new(),
                unlink_body_refs: true,
            },
        )
        .unwrap();
    let cleaned = service.read_raw("keep0001").unwrap();
    assert!(cleaned.starts_with(
        "---\nuid: keep0001\naddress: Keep\ndate: 2024/01/01\ntags: [x, y]\ncover: img.png\n---\n"
    ));
    assert!(cleaned.contains("Mentions Old inline."));
    assert!(!cleaned.contains("name:"));

    service.convert_to_stub("keep0001").unwrap();
    let stubbed = service.read_raw("keep0001").unwrap();
    assert!(stubbed.contains("tags: [x, y]\ncover: img.png\n"));
    assert!(stubbed.contains("date: 2024/01/01\n"));
    let note = parse_note(&stubbed).unwrap();
    assert!(STUB_PLACEHOLDERS.contains(&note.body.as_str()));
}

#[test]
fn files_named_differently_from_their_uid_stay_out_of_the_corpus() {
    let (_dir, service) = service();
    seed(&service, "aaaa0001", "A", "Alpha.");
    service
        .repo()
        .create_raw(
            "renamed1",
            "---\nuid: bbbb0001\naddress: B\ndate: 2024-01-01\n---\nBeta [[aaaa0001]].\n",
        )
        .unwrap();

    let loaded = service.load_corpus().unwrap();
    assert!(loaded.corpus.get("bbbb0001").is_none());
    assert_eq!(loaded.skipped.len(), 1);
    assert_eq!(loaded.skipped[0].uid, "renamed1");
    assert!(loaded.skipped[0].reason.contains("bbbb0001"));

    let report = service
        .delete_note(
            "aaaa0001",
            &DeleteOptions {
                cleanup_trailing_refs: true,
                target_uids: Vec::new(),
                unlink_body_refs: true,
            },
        )
        .unwrap();
    assert!(report.rewritten.is_empty());
}

#[test]
fn impact_lists_referrers_trailing_declarers_and_children() {
    let (_dir, service) = service();
    seed(&service, "root0001", "Hardware", "Parts [[cpu00001]] overview.\n\n---\n[[ram00001]] :: main memory");
    seed(&service, "cpu00001", "Hardware//CPU", "Core.");
    seed(&service, "l1000001", "Hardware//CPU//L1", "First level.");
    seed(&service, "ram00001", "Hardware//RAM", "Uses [[root0001]] context.\n\n---\n[[root0001]] :: parent area");

    let impact = service.analyze_impact("root0001").unwrap();
    assert_eq!(impact.address, "Hardware");
    let uids = |list: &[fieldnotes_core::service::NoteSummary]| {
        list.iter().map(|summary| summary.uid.clone()).collect::<Vec<_>>()
    };
    assert_eq!(uids(&impact.body_refs), vec!["ram00001"]);
    assert_eq!(uids(&impact.trailing_refs), vec!["ram00001"]);
    assert_eq!(
        impact.own_trailing_refs,
        vec![TrailingRef::new("ram00001", "main memory")]
    );
    let mut children = uids(&impact.children);
    children.sort();
    assert_eq!(children, vec!["cpu00001", "l1000001", "ram00001"]);

    assert!(matches!(
        service.analyze_impact("nope0001"),
        Err(NoteServiceError::NotFound(_))
    ));
}

#[test]
fn delete_cleans_references_in_selected_notes() {
    let (_dir, service) = service();
    seed(&service, "dead0001", "Old", "Obsolete.");
    seed(
        &service,
        "keep0001",
        "Keep",
        "Mentions [[dead0001|the old one]] inline.\n\n---\n[[dead0001]] :: predecessor",
    );
    seed(
        &service,
        "skip0001",
        "Skip",
        "Also [[dead0001]] here.\n\n---\n[[dead0001]] :: predecessor",
    );

    let report = service
        .delete_note(
            "dead0001",
            &DeleteOptions {
                cleanup_trailing_refs: true,
                target_uids: vec!["keep0001".to_string()],
                unlink_body_refs: true,
            },
        )
        .unwrap();
    assert_eq!(report.deleted, "dead0001");
    assert_eq!(report.rewritten, vec!["keep0001"]);
    assert!(!service.repo().exists("dead0001").unwrap());

    let kept = parse_note(&service.read_raw("keep0001").unwrap()).unwrap();
    assert!(kept.trailing_refs.is_empty());
    assert_eq!(kept.body, "Mentions the old one inline.");

    let skipped = parse_note(&service.read_raw("skip0001").unwrap()).unwrap();
    assert_eq!(skipped.trailing_refs.len(), 1);
    assert!(skipped.body.contains("[[dead0001]]"));
}

#[test]
fn delete_without_options_only_removes_the_file() {
    let (_dir, service) = service();
    seed(&service, "dead0001", "Old", "Obsolete.");
    seed(&service, "keep0001", "Keep", "Cites [[dead0001]] still.");
    let before = service.read_raw("keep0001").unwrap();

    let report = service
        .delete_note("dead0001", &DeleteOptions::default())
        .unwrap();
    assert!(report.rewritten.is_empty());
    assert_eq!(service.read_raw("keep0001").unwrap(), before);
    assert!(matches!(
        service.read_raw("dead0001"),
        Err(NoteServiceError::NotFound(_))
    ));
}
