use chrono::NaiveDate;
use fieldnotes_core::{
    parse_note, Corpus, LexicalHighlighter, LinkError, LinkResolver, MarkdownCompiler, Note,
};

fn published() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn note(uid: &str, address: &str, name: &str, body: &str) -> Note {
    parse_note(&format!(
        "---\nuid: {uid}\naddress: \"{address}\"\nname: {name}\ndate: 2024-01-01\n---\n{body}\n"
    ))
    .unwrap()
}

#[test]
fn custom_inline_syntax_becomes_html() {
    let html = MarkdownCompiler::new().compile(
        "This is ==hot== and {u}under{/u} with {kbd}Ctrl{/kbd}.",
        published(),
    );
    assert!(html.contains("<mark>hot</mark>"));
    assert!(html.contains("<u>under</u>"));
    assert!(html.contains("<kbd>Ctrl</kbd>"));
}

#[test]
fn code_is_never_rewritten_by_custom_syntax() {
    let html = MarkdownCompiler::new().compile(
        "Inline `==x==` stays.\n\n```text\n{u}raw{/u} {{a|b}}\n```\n",
        published(),
    );
    assert!(html.contains("<code>==x==</code>"));
    assert!(!html.contains("<mark>"));
    assert!(html.contains("{u}raw{/u} {{a|b}}"));
    assert!(!html.contains(r#"class="annotation""#));
}

#[test]
fn top_level_headings_are_numbered_with_anchor_ids() {
    let html = MarkdownCompiler::new().compile(
        "## Intro\n\ntext\n\n### Detail\n\nmore\n\n## Intro\n",
        published(),
    );
    assert!(html.contains(r#"<h2 id="intro">1. Intro</h2>"#));
    assert!(html.contains(r#"<h3 id="detail">Detail</h3>"#));
    assert!(html.contains(r#"<h2 id="intro-2">2. Intro</h2>"#));
}

#[test]
fn context_lines_render_relative_to_publication_date() {
    let html = MarkdownCompiler::new().compile(
        "Before.\n\n>> 24.01.01 - first draft\n>> 24.02.01 - review\n\nAfter.\n",
        published(),
    );
    assert_eq!(html.matches(r#"<div class="context-annotations">"#).count(), 1);
    assert!(html.contains(r#"datetime="2024-01-01""#));
    assert!(html.contains(r#"datetime="2024-02-01""#));
    assert!(html.contains("<p>After.</p>"));
}

#[test]
fn context_offsets_clamp_month_ends_instead_of_wrapping() {
    let html = MarkdownCompiler::new().compile(
        ">> 24.03.01 - after a short month\n",
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    );
    assert!(html.contains("1 month, 1 day later"));
    assert!(!html.contains("4294967295"));
}

#[test]
fn nested_annotations_expand_inside_out() {
    let html = MarkdownCompiler::new().compile(
        "Uses {{HTTP|HyperText {{TP|Transfer Protocol}}}} daily.",
        published(),
    );
    assert_eq!(html.matches(r#"<span class="annotation-ref">"#).count(), 2);
    assert!(!html.contains("{{"));
}

#[test]
fn compilation_is_deterministic_and_highlighter_keeps_shape() {
    let body = "# Title\n\n```rust\n// note\nlet s = \"x\";\n```\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";
    let plain = MarkdownCompiler::new();
    assert_eq!(plain.compile(body, published()), plain.compile(body, published()));

    let plain_html = plain.compile(body, published());
    let highlighted = MarkdownCompiler::with_highlighter(Box::new(LexicalHighlighter))
        .compile(body, published());
    for fragment in [
        r#"<div class="code-block" data-lang="rust">"#,
        r#"<button class="copy-button""#,
        r#"<div class="table-scroll"><table>"#,
    ] {
        assert!(plain_html.contains(fragment), "plain output missing {fragment}");
        assert!(highlighted.contains(fragment), "highlighted output missing {fragment}");
    }
}

#[test]
fn wiki_links_resolve_against_the_corpus_link_map() {
    let corpus = Corpus::new(vec![
        note("cpu00001", "Hardware//CPU", "CPU", "See [[ram00001]] and [[gone0001]]."),
        note("ram00001", "Hardware//RAM", "Main Memory", "Backs [[cpu00001|the core]]."),
    ]);
    let map = corpus.link_map();
    let resolver = LinkResolver::new(&map, "/fieldnotes");
    let compiler = MarkdownCompiler::new();

    let cpu = corpus.get("cpu00001").unwrap();
    let html = resolver
        .resolve(&compiler.compile(&cpu.body, cpu.date()))
        .unwrap();
    assert!(html.contains(
        r#"<a class="fieldnote-link" href="/fieldnotes/ram00001" data-address="Hardware//RAM">Main Memory</a>"#
    ));
    assert!(html.contains(r#"<span class="fieldnote-link broken" data-uid="gone0001">gone0001</span>"#));

    let again = resolver
        .resolve(&compiler.compile(&cpu.body, cpu.date()))
        .unwrap();
    assert_eq!(html, again);
}

#[test]
fn renaming_a_target_changes_only_default_display_text() {
    let body = "Linked [[ram00001]] and [[ram00001|memory]].";
    let before = Corpus::new(vec![note("ram00001", "Hardware//RAM", "RAM", "x")]);
    let after = Corpus::new(vec![note("ram00001", "Hardware//RAM", "DRAM", "x")]);
    let compiled = MarkdownCompiler::new().compile(body, published());

    let map_before = before.link_map();
    let map_after = after.link_map();
    let old = LinkResolver::new(&map_before, "/fieldnotes").resolve(&compiled).unwrap();
    let new = LinkResolver::new(&map_after, "/fieldnotes").resolve(&compiled).unwrap();
    assert!(old.contains(">RAM</a>"));
    assert!(new.contains(">DRAM</a>"));
    assert_eq!(old.matches(">memory</a>").count(), 1);
    assert_eq!(new.matches(">memory</a>").count(), 1);
}

#[test]
fn cross_category_links_without_label_fail() {
    let map = Corpus::default().link_map();
    let compiled = MarkdownCompiler::new().compile("Read [[projects/site]].", published());
    assert_eq!(
        LinkResolver::new(&map, "/fieldnotes").resolve(&compiled),
        Err(LinkError::MissingDisplay {
            target: "projects/site".to_string()
        })
    );
}
