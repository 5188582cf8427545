use fieldnotes_core::service::rebuild_service::{CONTENT_DIR, INDEX_FILE};
use fieldnotes_core::{
    FsNoteRepository, IssueCode, MarkdownCompiler, NoteRepository, RebuildService,
};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_note(repo: &FsNoteRepository, uid: &str, address: &str, body: &str) {
    repo.create_raw(
        uid,
        &format!("---\nuid: {uid}\naddress: \"{address}\"\ndate: 2024-01-01\n---\n\n{body}\n"),
    )
    .unwrap();
}

fn setup() -> (TempDir, RebuildService<FsNoteRepository>) {
    let dir = tempfile::tempdir().unwrap();
    let repo = FsNoteRepository::new(dir.path().join("content"));
    write_note(&repo, "hw000001", "Hardware", "All the parts. See [[cpu00001]] first.");
    write_note(
        &repo,
        "cpu00001",
        "Hardware//CPU",
        "The core talks to [[ram00001|memory]].\n\n---\n[[ram00001]] :: see [[hw000001]] for *context*",
    );
    write_note(&repo, "ram00001", "Hardware//RAM", "Volatile storage.");
    let service = RebuildService::new(
        repo,
        MarkdownCompiler::new(),
        "/fieldnotes",
        dir.path().join("public"),
    );
    (dir, service)
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

fn entry<'a>(index: &'a Value, uid: &str) -> &'a Value {
    index
        .as_array()
        .unwrap()
        .iter()
        .find(|entry| entry["uid"] == uid)
        .unwrap()
}

#[test]
fn rebuild_writes_index_and_content_files() {
    let (dir, service) = setup();
    let output = service.rebuild_all().unwrap();
    assert_eq!(output.index.len(), 3);
    assert_eq!(output.contents.len(), 3);
    assert!(output.skipped.is_empty());

    let public = dir.path().join("public");
    let index = read_json(&public.join(INDEX_FILE));
    let ram = entry(&index, "ram00001");
    assert_eq!(ram["address"], "Hardware//RAM");
    assert_eq!(ram["description"], "Volatile storage.");
    assert_eq!(ram["backlinks"], serde_json::json!(["cpu00001"]));

    let cpu = entry(&index, "cpu00001");
    assert_eq!(cpu["references"], serde_json::json!(["ram00001"]));
    assert_eq!(cpu["trailing_refs"], serde_json::json!(["ram00001"]));

    let content = read_json(&public.join(CONTENT_DIR).join("cpu00001.json"));
    let html = content["html"].as_str().unwrap();
    assert!(html.contains(
        r#"<a class="fieldnote-link" href="/fieldnotes/ram00001" data-address="Hardware//RAM">memory</a>"#
    ));
    let trailing = &content["trailing_refs"][0];
    assert_eq!(trailing["uid"], "ram00001");
    assert_eq!(trailing["name"], "RAM");
    let annotation = trailing["annotation_html"].as_str().unwrap();
    assert!(annotation.contains(r#"href="/fieldnotes/hw000001""#));
    assert!(annotation.contains("<em>context</em>"));
}

#[test]
fn unparseable_and_unlinkable_notes_are_skipped_not_fatal() {
    let (dir, service) = setup();
    fs::write(dir.path().join("content").join("broken01.md"), "no frontmatter here\n").unwrap();
    write_note(
        &FsNoteRepository::new(dir.path().join("content")),
        "doc00001",
        "Docs",
        "Read [[guides/setup]] first.",
    );

    let output = service.rebuild_all().unwrap();
    let skipped: Vec<_> = output.skipped.iter().map(|s| s.uid.as_str()).collect();
    assert_eq!(skipped, vec!["broken01", "doc00001"]);

    assert!(output.index.iter().any(|entry| entry.uid == "doc00001"));
    assert!(output.contents.iter().all(|content| content.uid != "doc00001"));
    assert!(!dir
        .path()
        .join("public")
        .join(CONTENT_DIR)
        .join("doc00001.json")
        .exists());
}

#[test]
fn rebuild_prunes_content_for_deleted_notes() {
    let (dir, service) = setup();
    service.rebuild_all().unwrap();
    let content_dir = dir.path().join("public").join(CONTENT_DIR);
    assert!(content_dir.join("ram00001.json").exists());

    FsNoteRepository::new(dir.path().join("content"))
        .delete("ram00001")
        .unwrap();
    let output = service.rebuild_all().unwrap();

    assert!(!content_dir.join("ram00001.json").exists());
    assert!(content_dir.join("cpu00001.json").exists());
    assert!(output.report.with_code(IssueCode::BrokenRef).count() >= 1);
    let cpu = output
        .contents
        .iter()
        .find(|content| content.uid == "cpu00001")
        .unwrap();
    assert!(cpu.html.contains(r#"class="fieldnote-link broken" data-uid="ram00001""#));
    assert_eq!(cpu.trailing_refs[0].address, None);
}

#[test]
fn repeated_rebuilds_produce_identical_artifacts() {
    let (dir, service) = setup();
    let first = service.rebuild_all().unwrap();
    let index_first = fs::read(dir.path().join("public").join(INDEX_FILE)).unwrap();
    let second = service.rebuild_all().unwrap();
    let index_second = fs::read(dir.path().join("public").join(INDEX_FILE)).unwrap();

    assert_eq!(first, second);
    assert_eq!(index_first, index_second);
}

#[test]
fn missing_content_directory_builds_an_empty_site() {
    let dir = tempfile::tempdir().unwrap();
    let service = RebuildService::new(
        FsNoteRepository::new(dir.path().join("nothing")),
        MarkdownCompiler::new(),
        "/fieldnotes",
        dir.path().join("public"),
    );
    let output = service.rebuild_all().unwrap();
    assert!(output.index.is_empty());
    assert_eq!(read_json(&dir.path().join("public").join(INDEX_FILE)), serde_json::json!([]));
}
