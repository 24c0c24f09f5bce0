use std::fs;
use std::path::Path;

use tempfile::TempDir;

use super::*;
use crate::config::{CommitType, SemverWeight, TypeRegistry};
use crate::vcs::CommitLog;
use crate::version::{MockVersionProvider, VersionInfo};

fn registry(entries: &[(&str, &str, SemverWeight)]) -> TypeRegistry {
    TypeRegistry::new(
        entries
            .iter()
            .map(|(name, header, semver)| CommitType {
                name: name.to_string(),
                header: header.to_string(),
                semver: *semver,
            })
            .collect(),
    )
    .unwrap()
}

fn default_test_registry() -> TypeRegistry {
    registry(&[
        ("feat", "Features", SemverWeight::Minor),
        ("fix", "Bug fixes", SemverWeight::Patch),
        ("bug", "Bug fixes", SemverWeight::Patch),
    ])
}

fn setup_notes(root: &Path, notes: &[(&str, &str)]) {
    let dir = root.join("release_notes");
    fs::create_dir_all(&dir).unwrap();
    for (name, content) in notes {
        fs::write(dir.join(name), content).unwrap();
    }
}

fn commit_log(short_hash: &str, hash: &str, message: &str) -> CommitLog {
    CommitLog {
        short_hash: short_hash.to_string(),
        hash: hash.to_string(),
        message: message.to_string(),
    }
}

/// Version provider stub whose returned version string encodes the weight
/// it was asked to bump, so tests can assert the chosen weight.
fn provider(current: &str) -> MockVersionProvider {
    let current = current.to_string();
    let mut mock = MockVersionProvider::new();
    mock.expect_get_version_info().returning(move |weight| {
        let new = match weight {
            SemverWeight::Patch => "patch-bump",
            SemverWeight::Minor => "minor-bump",
            SemverWeight::Major => "major-bump",
        };
        Ok(VersionInfo {
            current: current.clone(),
            new: new.to_string(),
        })
    });
    mock
}

#[test]
fn extracts_note_files_into_configured_sections() {
    let tmp = TempDir::new().unwrap();
    setup_notes(
        tmp.path(),
        &[
            ("1.fix", "Detail 1\n"),
            ("2.feat", "Detail 2"),
            ("3.feat!", "  Detail 3  \n"),
        ],
    );

    let registry = default_test_registry();
    let extractor = Extractor::new(tmp.path(), &registry, false);
    let sections = extractor.extract(&[]).unwrap();

    assert_eq!(sections.len(), 2);

    let fixes = &sections["Bug fixes"];
    assert_eq!(fixes["1"].description, "Detail 1");
    assert!(!fixes["1"].breaking);
    assert_eq!(fixes["1"].commit_type, "fix");
    assert_eq!(fixes["1"].short_hash, None);

    let features = &sections["Features"];
    assert_eq!(features["2"].description, "Detail 2");
    assert_eq!(features["3"].description, "Detail 3");
    assert!(features["3"].breaking);
}

#[test]
fn missing_release_notes_directory_is_not_an_error() {
    let tmp = TempDir::new().unwrap();
    let registry = default_test_registry();
    let extractor = Extractor::new(tmp.path(), &registry, false);

    let sections = extractor.extract(&[]).unwrap();

    assert!(sections.is_empty());
}

#[test]
fn dotfiles_are_ignored() {
    let tmp = TempDir::new().unwrap();
    setup_notes(tmp.path(), &[(".gitkeep", ""), ("1.fix", "Detail 1")]);

    let registry = default_test_registry();
    let extractor = Extractor::new(tmp.path(), &registry, false);
    let sections = extractor.extract(&[]).unwrap();

    assert_eq!(sections["Bug fixes"].len(), 1);
}

#[test]
fn unknown_note_type_fails_extraction() {
    let tmp = TempDir::new().unwrap();
    setup_notes(tmp.path(), &[("4.unknown", "Detail 4")]);

    let registry = default_test_registry();
    let extractor = Extractor::new(tmp.path(), &registry, false);
    let result = extractor.extract(&[]);

    match result {
        Err(ChangelogError::InvalidReleaseNote { file, .. }) => {
            assert_eq!(file, "4.unknown");
        }
        other => panic!("expected InvalidReleaseNote, got {:?}", other),
    }
}

#[test]
fn malformed_note_filename_fails_extraction() {
    let tmp = TempDir::new().unwrap();
    setup_notes(tmp.path(), &[("no-separator", "Detail")]);

    let registry = default_test_registry();
    let extractor = Extractor::new(tmp.path(), &registry, false);

    assert!(matches!(
        extractor.extract(&[]),
        Err(ChangelogError::InvalidReleaseNote { .. })
    ));
}

#[test]
fn parses_conventional_commit_with_scope_breaking_and_refs() {
    let tmp = TempDir::new().unwrap();
    let registry = default_test_registry();
    let extractor = Extractor::new(tmp.path(), &registry, false);

    let logs =
        [commit_log("abc123", "abc123def", "feat(docs)!: Detail about 3\n\nRefs: #3\n")];
    let sections = extractor.extract(&logs).unwrap();

    let change = &sections["Features"]["3"];
    assert_eq!(change.issue_ref, "3");
    assert_eq!(change.commit_type, "feat");
    assert_eq!(change.scope.as_deref(), Some("(docs)"));
    assert!(change.breaking);
    assert_eq!(change.description, "Detail about 3");
    assert_eq!(change.short_hash.as_deref(), Some("abc123"));
    assert_eq!(change.commit_hash.as_deref(), Some("abc123def"));
}

#[test]
fn commit_without_refs_gets_positional_placeholder() {
    let tmp = TempDir::new().unwrap();
    let registry = default_test_registry();
    let extractor = Extractor::new(tmp.path(), &registry, false);

    let logs = [
        commit_log("aaa", "aaaa", "fix: first fix"),
        commit_log("bbb", "bbbb", "fix: second fix"),
    ];
    let sections = extractor.extract(&logs).unwrap();

    let fixes = &sections["Bug fixes"];
    assert!(fixes.contains_key("__0__"));
    assert!(fixes.contains_key("__1__"));
    assert!(fixes["__0__"].is_placeholder_ref());

    // placeholders never feed the notification fan-out
    assert!(extractor.unique_issues(&sections).is_empty());
}

#[test]
fn non_conventional_and_unregistered_commits_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let registry = default_test_registry();
    let extractor = Extractor::new(tmp.path(), &registry, false);

    let logs = [
        commit_log("aaa", "aaaa", "update things without discipline"),
        commit_log("bbb", "bbbb", "unknown: not a registered type"),
        commit_log("ccc", "cccc", "fix: registered"),
    ];
    let sections = extractor.extract(&logs).unwrap();

    assert_eq!(sections.len(), 1);
    assert_eq!(sections["Bug fixes"].len(), 1);
}

#[test]
fn breaking_change_detected_from_body_token() {
    let tmp = TempDir::new().unwrap();
    let registry = default_test_registry();
    let extractor = Extractor::new(tmp.path(), &registry, false);

    let logs = [commit_log(
        "aaa",
        "aaaa",
        "fix: repair api\n\nBREAKING CHANGE: removes the old endpoint\n",
    )];
    let sections = extractor.extract(&logs).unwrap();

    assert!(sections["Bug fixes"]["__0__"].breaking);
}

#[test]
fn authors_footer_extracted() {
    let tmp = TempDir::new().unwrap();
    let registry = default_test_registry();
    let extractor = Extractor::new(tmp.path(), &registry, false);

    let logs = [commit_log(
        "aaa",
        "aaaa",
        "feat: add thing\n\nRefs: #7\nAuthors: (tom, edgy)\n",
    )];
    let sections = extractor.extract(&logs).unwrap();

    let change = &sections["Features"]["7"];
    assert_eq!(change.authors.as_deref(), Some("(tom, edgy)"));
    assert_eq!(change.issue_ref, "7");
}

#[test]
fn unique_issues_returns_sorted_distinct_refs() {
    let tmp = TempDir::new().unwrap();
    setup_notes(tmp.path(), &[("10.fix", "Detail 10"), ("2.feat", "Detail 2")]);

    let registry = default_test_registry();
    let extractor = Extractor::new(tmp.path(), &registry, false);

    let logs = [
        commit_log("aaa", "aaaa", "fix: tracked fix\n\nRefs: #3\n"),
        commit_log("bbb", "bbbb", "fix: untracked fix"),
    ];
    let sections = extractor.extract(&logs).unwrap();

    assert_eq!(
        extractor.unique_issues(&sections),
        vec!["10".to_string(), "2".to_string(), "3".to_string()]
    );
}

#[test]
fn extraction_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    setup_notes(tmp.path(), &[("1.fix", "Detail 1"), ("2.feat!", "Detail 2")]);

    let registry = default_test_registry();
    let extractor = Extractor::new(tmp.path(), &registry, false);

    let logs = [commit_log("aaa", "aaaa", "fix: a fix\n\nRefs: #9\n")];
    let first = extractor.extract(&logs).unwrap();
    let second = extractor.extract(&logs).unwrap();

    assert_eq!(first, second);
}

fn change(issue_ref: &str, scope: Option<&str>, breaking: bool) -> Change {
    Change {
        issue_ref: issue_ref.to_string(),
        description: format!("change {}", issue_ref),
        commit_type: "feat".to_string(),
        scope: scope.map(|s| s.to_string()),
        breaking,
        authors: None,
        short_hash: None,
        commit_hash: None,
    }
}

#[test]
fn ordering_puts_breaking_first_and_scopeless_last() {
    let mut changes = vec![
        change("1", Some("aaa"), false),
        change("2", None, true),
        change("3", Some("BBB"), false),
        change("4", None, false),
    ];

    sort_changes(&mut changes);

    let refs: Vec<&str> =
        changes.iter().map(|c| c.issue_ref.as_str()).collect();

    // breaking with no scope still sorts before any non-breaking record
    assert_eq!(refs, vec!["2", "1", "3", "4"]);
}

#[test]
fn ordering_is_deterministic() {
    let mut a = vec![
        change("5", Some("zeta"), false),
        change("3", Some("alpha"), true),
        change("1", None, false),
        change("2", Some("alpha"), true),
    ];
    let mut b = a.clone();
    b.reverse();

    sort_changes(&mut a);
    sort_changes(&mut b);
    assert_eq!(a, b);

    // sorting twice yields the same sequence
    let snapshot = a.clone();
    sort_changes(&mut a);
    assert_eq!(a, snapshot);
}

#[test]
fn ordering_ties_break_on_case_insensitive_issue_ref() {
    let mut changes = vec![
        change("B", Some("api"), false),
        change("a", Some("API"), false),
    ];

    sort_changes(&mut changes);

    assert_eq!(changes[0].issue_ref, "a");
    assert_eq!(changes[1].issue_ref, "B");
}

fn sections_from(changes: Vec<Change>, registry: &TypeRegistry) -> SectionMap {
    let mut sections = SectionMap::new();
    for change in changes {
        let header = registry
            .get(&change.commit_type)
            .map(|t| t.header.clone())
            .unwrap_or_else(|| change.commit_type.clone());
        sections
            .entry(header)
            .or_default()
            .insert(change.issue_ref.clone(), change);
    }
    sections
}

fn typed_change(issue_ref: &str, commit_type: &str, breaking: bool) -> Change {
    Change {
        issue_ref: issue_ref.to_string(),
        description: format!("change {}", issue_ref),
        commit_type: commit_type.to_string(),
        scope: None,
        breaking,
        authors: None,
        short_hash: None,
        commit_hash: None,
    }
}

#[test]
fn breaking_change_resolves_major() {
    let registry = default_test_registry();
    let sections = sections_from(
        vec![
            typed_change("1", "fix", false),
            typed_change("2", "feat", false),
            typed_change("3", "fix", true),
        ],
        &registry,
    );

    assert_eq!(
        resolve_semver(&sections, &registry),
        SemverWeight::Major
    );

    let tag =
        extract_version_tag(&sections, &registry, &provider("1.2.3")).unwrap();
    assert_eq!(tag, "major-bump");
}

#[test]
fn feature_change_resolves_minor() {
    let registry = default_test_registry();
    let sections = sections_from(
        vec![
            typed_change("1", "fix", false),
            typed_change("2", "feat", false),
        ],
        &registry,
    );

    assert_eq!(
        resolve_semver(&sections, &registry),
        SemverWeight::Minor
    );

    let tag =
        extract_version_tag(&sections, &registry, &provider("1.2.3")).unwrap();
    assert_eq!(tag, "minor-bump");
}

#[test]
fn fix_only_changes_resolve_patch() {
    let registry = default_test_registry();
    let sections = sections_from(
        vec![
            typed_change("1", "fix", false),
            typed_change("2", "fix", false),
        ],
        &registry,
    );

    let tag =
        extract_version_tag(&sections, &registry, &provider("1.2.3")).unwrap();
    assert_eq!(tag, "patch-bump");
}

#[test]
fn empty_sections_resolve_patch() {
    let registry = default_test_registry();
    let sections = SectionMap::new();

    assert_eq!(
        resolve_semver(&sections, &registry),
        SemverWeight::Patch
    );

    let tag =
        extract_version_tag(&sections, &registry, &provider("1.2.3")).unwrap();
    assert_eq!(tag, "patch-bump");
}

#[test]
fn pre_one_zero_downgrades_major_to_minor() {
    let registry = default_test_registry();
    let sections =
        sections_from(vec![typed_change("1", "fix", true)], &registry);

    let tag =
        extract_version_tag(&sections, &registry, &provider("0.4.1")).unwrap();
    assert_eq!(tag, "minor-bump");
}

#[test]
fn pre_one_zero_downgrades_minor_to_patch() {
    let registry = default_test_registry();
    let sections =
        sections_from(vec![typed_change("1", "feat", false)], &registry);

    let tag =
        extract_version_tag(&sections, &registry, &provider("0.4.1")).unwrap();
    assert_eq!(tag, "patch-bump");
}

#[test]
fn pre_one_zero_keeps_patch() {
    let registry = default_test_registry();
    let sections =
        sections_from(vec![typed_change("1", "fix", false)], &registry);

    let tag =
        extract_version_tag(&sections, &registry, &provider("0.4.1")).unwrap();
    assert_eq!(tag, "patch-bump");
}

#[test]
fn note_file_scenario_resolves_major_and_groups_in_registry_order() {
    let tmp = TempDir::new().unwrap();
    setup_notes(
        tmp.path(),
        &[
            ("1.fix", "Detail 1"),
            ("2.feat", "Detail 2"),
            ("3.feat!", "Detail 3"),
        ],
    );

    let registry = registry(&[
        ("feat", "Features", SemverWeight::Minor),
        ("fix", "Bug fixes", SemverWeight::Patch),
    ]);
    let extractor = Extractor::new(tmp.path(), &registry, false);
    let sections = extractor.extract(&[]).unwrap();

    let tag =
        extract_version_tag(&sections, &registry, &provider("1.0.0")).unwrap();
    assert_eq!(tag, "major-bump");

    let groups = grouped_sections(&sections, &registry);
    assert_eq!(groups.len(), 2);

    let (header, features) = &groups[0];
    assert_eq!(header, "Features");
    // breaking record sorts first
    assert_eq!(features[0].issue_ref, "3");
    assert_eq!(features[1].issue_ref, "2");

    let (header, fixes) = &groups[1];
    assert_eq!(header, "Bug fixes");
    assert_eq!(fixes[0].issue_ref, "1");
}

#[test]
fn grouped_sections_render_shared_headers_once() {
    let registry = default_test_registry();
    let sections = sections_from(
        vec![
            typed_change("1", "fix", false),
            typed_change("2", "bug", false),
        ],
        &registry,
    );

    let groups = grouped_sections(&sections, &registry);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].0, "Bug fixes");
    assert_eq!(groups[0].1.len(), 2);
}

#[test]
fn clean_removes_note_files() {
    let tmp = TempDir::new().unwrap();
    setup_notes(tmp.path(), &[("1.fix", "Detail 1"), (".gitkeep", "")]);

    let registry = default_test_registry();
    let extractor = Extractor::new(tmp.path(), &registry, false);
    extractor.extract(&[]).unwrap();

    extractor.clean().unwrap();

    assert!(!tmp.path().join("release_notes/1.fix").exists());
    // dotfiles survive cleaning
    assert!(tmp.path().join("release_notes/.gitkeep").exists());

    // idempotent on an already-cleaned directory
    extractor.clean().unwrap();
}

#[test]
fn clean_is_noop_under_dry_run() {
    let tmp = TempDir::new().unwrap();
    setup_notes(tmp.path(), &[("1.fix", "Detail 1")]);

    let registry = default_test_registry();
    let extractor = Extractor::new(tmp.path(), &registry, true);
    extractor.clean().unwrap();

    assert!(tmp.path().join("release_notes/1.fix").exists());
}

#[test]
fn clean_is_safe_on_missing_directory() {
    let tmp = TempDir::new().unwrap();
    let registry = default_test_registry();
    let extractor = Extractor::new(tmp.path(), &registry, false);

    extractor.clean().unwrap();
}
