use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use typer_engine::{fingerprint, load_content, ContentError, ContentPayload, SourcePosition, DEFAULT_SEPARATOR};

#[test]
fn files_are_joined_with_the_separator() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a.txt");
    let b = temp.path().join("b.txt");
    fs::write(&a, "first").unwrap();
    fs::write(&b, "second").unwrap();

    let payload = load_content(&[a.clone(), b.clone()], DEFAULT_SEPARATOR).unwrap();

    assert_eq!(payload.text(), "first\n\nsecond");
    assert_eq!(payload.len(), 13);
    assert_eq!(payload.fingerprint(), fingerprint("first\n\nsecond"));
    assert_eq!(payload.sources().len(), 2);
    assert_eq!(payload.sources()[1].start, 7);
    assert_eq!(payload.source_names(), vec![a.display().to_string(), b.display().to_string()]);
}

#[test]
fn offsets_map_back_to_files_and_separators() {
    let payload = ContentPayload::from_parts(
        vec![
            ("a.txt".into(), "UTF-8".into(), "abc".into()),
            ("b.txt".into(), "UTF-8".into(), "de".into()),
        ],
        "--",
    );

    assert_eq!(payload.text(), "abc--de");
    assert_eq!(payload.locate(0), SourcePosition::File { file: 0, offset: 0 });
    assert_eq!(payload.locate(2), SourcePosition::File { file: 0, offset: 2 });
    assert_eq!(
        payload.locate(3),
        SourcePosition::Separator {
            after_file: 0,
            offset: 0
        }
    );
    assert_eq!(payload.locate(6), SourcePosition::File { file: 1, offset: 1 });
    assert_eq!(payload.locate(7), SourcePosition::End);
    assert_eq!(payload.suffix(5), "de");
}

#[test]
fn separator_changes_the_fingerprint() {
    let parts = || {
        vec![
            ("a".into(), "UTF-8".into(), "x".to_string()),
            ("b".into(), "UTF-8".into(), "y".to_string()),
        ]
    };
    let one = ContentPayload::from_parts(parts(), "\n");
    let two = ContentPayload::from_parts(parts(), "\n\n");
    assert_ne!(one.fingerprint(), two.fingerprint());
}

#[test]
fn lengths_count_characters_not_bytes() {
    let payload = ContentPayload::from_text("héllo wörld");
    assert_eq!(payload.len(), 11);
    assert_eq!(payload.suffix(6), "wörld");
}

#[test]
fn fingerprint_is_lowercase_sha256_hex() {
    assert_eq!(
        fingerprint(""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn non_utf8_file_is_decoded() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("latin1.txt");
    fs::write(&path, b"caf\xe9 cr\xe8me br\xfbl\xe9e").unwrap();

    let payload = load_content(&[path], DEFAULT_SEPARATOR).unwrap();
    assert_eq!(payload.text(), "café crème brûlée");
    assert_ne!(payload.sources()[0].encoding_label, "UTF-8");
}

#[test]
fn missing_file_names_the_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nope.txt");

    let err = load_content(&[path.clone()], DEFAULT_SEPARATOR).unwrap_err();
    assert!(matches!(err, ContentError::NotFound(ref p) if *p == path));
    assert!(err.to_string().contains("nope.txt"));
}

#[test]
fn no_files_is_an_error() {
    assert!(matches!(load_content(&[], DEFAULT_SEPARATOR), Err(ContentError::NoInput)));
}
