use std::fs;
use std::io::Write;
use tempfile::TempDir;

use kbase_core::chunking::{normalize_whitespace, Chunker, ChunkingConfig};
use kbase_core::config::{Config, EmbedderStrategy};
use kbase_core::loader::TextLoader;
use kbase_core::types::non_empty_trimmed;
use kbase_core::Error;

#[test]
fn load_dir_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let mut f = fs::File::create(dir.join("a.txt")).unwrap();
    writeln!(f, "Short text").unwrap();

    let docs = TextLoader::new().load_dir(dir).expect("load");

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].source_name, "a.txt");
    assert_eq!(docs[0].text.trim(), "Short text");
}

#[test]
fn load_dir_skips_empty_and_unsupported_files() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir(dir.join("nested")).unwrap();
    fs::write(dir.join("b.md"), "bravo").unwrap();
    fs::write(dir.join("nested/a.csv"), "x,y\n1,2").unwrap();
    fs::write(dir.join("empty.txt"), "   \n").unwrap();
    fs::write(dir.join("report.pdf"), "%PDF-1.4").unwrap();

    let docs = TextLoader::new().load_dir(dir).expect("load");
    let names: Vec<&str> = docs.iter().map(|d| d.source_name.as_str()).collect();

    assert_eq!(names, vec!["b.md", "nested/a.csv"], "sorted, empty and pdf skipped");
}

#[cfg(unix)]
#[test]
fn load_dir_skips_unreadable_subdirectory() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("top.txt"), "visible").unwrap();
    let locked = dir.join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("hidden.txt"), "hidden").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    let result = TextLoader::new().load_dir(dir);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    // Root can still read the locked dir; either way the walk must not fail.
    let docs = result.expect("walk errors are logged and skipped");
    assert!(docs.iter().any(|d| d.source_name == "top.txt"));
}

#[test]
fn load_dir_rejects_missing_directory() {
    let tmp = TempDir::new().unwrap();
    assert!(TextLoader::new().load_dir(&tmp.path().join("missing")).is_err());
}

#[test]
fn chunker_packs_short_paragraphs_together() {
    let chunker = Chunker::new(ChunkingConfig { chunk_words: 5, overlap_words: 0 }).unwrap();
    let chunks = chunker.chunk("one two\n\nthree   four\n\nfive six seven");
    assert_eq!(chunks, vec!["one two three four", "five six seven"]);
}

#[test]
fn chunker_splits_long_paragraph_with_overlap() {
    let chunker = Chunker::new(ChunkingConfig { chunk_words: 3, overlap_words: 1 }).unwrap();
    let chunks = chunker.chunk("a b c d e");
    assert_eq!(chunks, vec!["a b c", "c d e"]);
}

#[test]
fn chunker_yields_nothing_for_blank_text() {
    let chunker = Chunker::default();
    assert!(chunker.chunk(" \n\t\n ").is_empty());
}

#[test]
fn chunker_rejects_overlap_not_smaller_than_window() {
    let err = Chunker::new(ChunkingConfig { chunk_words: 3, overlap_words: 3 }).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn normalize_whitespace_collapses_runs() {
    assert_eq!(normalize_whitespace("  a\t\tb \n c  "), "a b c");
}

#[test]
fn non_empty_trimmed_rejects_blank() {
    assert!(matches!(non_empty_trimmed("   "), Err(Error::EmptyInput)));
    assert_eq!(non_empty_trimmed("  text  ").unwrap(), "text");
}

#[test]
fn config_merges_toml_over_defaults() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("config.toml"),
        concat!(
            "[embedding]\ndimension = 64\nstrategy = \"semantic\"\nmodel_dir = \"models/e5\"\n\n",
            "[retrieval]\ntop_k = 5\n",
        ),
    )
    .unwrap();

    let settings = Config::load_from(tmp.path(), None).unwrap().settings().unwrap();

    assert_eq!(settings.embedding.dimension, 64);
    assert_eq!(settings.embedding.strategy, EmbedderStrategy::Semantic);
    let expected_dir = tmp.path().join("models/e5").to_string_lossy().into_owned();
    assert_eq!(settings.embedding.model_dir, Some(expected_dir));
    assert!(settings.embedding.allow_fallback, "unset keys keep defaults");
    assert_eq!(settings.retrieval.top_k, 5);
    assert_eq!(settings.chunking, ChunkingConfig::default());
}

#[test]
fn config_extra_file_overrides_base_file() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[chunking]\nchunk_words = 200\n").unwrap();
    let extra = tmp.path().join("override.toml");
    fs::write(&extra, "[chunking]\nchunk_words = 50\noverlap_words = 10\n").unwrap();

    let settings = Config::load_from(tmp.path(), Some(&extra)).unwrap().settings().unwrap();

    assert_eq!(settings.chunking, ChunkingConfig { chunk_words: 50, overlap_words: 10 });
}

#[test]
fn config_rejects_invalid_settings() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[embedding]\ndimension = 0\n").unwrap();
    assert!(Config::load_from(tmp.path(), None).unwrap().settings().is_err());
}

#[test]
fn config_get_reads_single_key() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[retrieval]\nmin_score = 0.25\n").unwrap();
    let config = Config::load_from(tmp.path(), None).unwrap();
    let min: f32 = config.get("retrieval.min_score").unwrap();
    assert!((min - 0.25).abs() < 1e-6);
}
