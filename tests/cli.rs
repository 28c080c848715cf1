use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;
use wordvec::{Model, VectorFormat, Vectors};

fn temp_workspace() -> TempDir {
    let dir = tempfile::tempdir().expect("create tempdir");
    let text = "one two three four five six\nsix five four three two one\n".repeat(20);
    fs::write(dir.path().join("corpus.txt"), text).expect("write corpus");
    dir
}

fn wordvec() -> Command {
    let mut cmd = Command::cargo_bin("wordvec").expect("binary exists");
    cmd.args(["--quiet", "--no-progress"]);
    cmd
}

#[test]
fn writes_text_vectors() {
    let workspace = temp_workspace();
    let output = workspace.path().join("vectors.txt");
    wordvec()
        .current_dir(workspace.path())
        .args([
            "--train",
            "corpus.txt",
            "--output",
            "vectors.txt",
            "--size",
            "8",
            "--min-count",
            "1",
            "--threads",
            "2",
        ])
        .assert()
        .success();

    let text = fs::read_to_string(&output).expect("read vectors");
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("6 8"));
    for line in lines {
        assert_eq!(line.split_whitespace().count(), 9, "{line:?}");
    }
    let vectors = Vectors::load(&output, VectorFormat::Text).expect("load vectors");
    assert!(vectors.lookup_word("three").is_some());
}

#[test]
fn writes_binary_vectors_and_vocabulary() {
    let workspace = temp_workspace();
    wordvec()
        .current_dir(workspace.path())
        .args([
            "--train",
            ".",
            "--prefix",
            "corpus",
            "--output",
            "vectors.bin",
            "--binary",
            "--skipgram",
            "--size",
            "5",
            "--min-count",
            "1",
            "--save-vocab",
            "vocab.txt",
        ])
        .assert()
        .success();

    let vectors = Vectors::load(&workspace.path().join("vectors.bin"), VectorFormat::Binary)
        .expect("load vectors");
    assert_eq!(vectors.num_words(), 6);
    assert_eq!(vectors.size(), 5);

    let vocab = fs::read_to_string(workspace.path().join("vocab.txt")).expect("read vocab");
    assert_eq!(vocab.lines().count(), 6);
    assert!(vocab.lines().all(|line| line.ends_with(" 40")));
}

#[test]
fn writes_full_model() {
    let workspace = temp_workspace();
    fs::write(workspace.path().join("vocab.txt"), "one 5\ntwo 3\nthree 1\n").unwrap();
    wordvec()
        .current_dir(workspace.path())
        .args([
            "--train",
            "corpus.txt",
            "--read-vocab",
            "vocab.txt",
            "--output",
            "model.bin",
            "--bincode",
            "--size",
            "3",
            "--min-count",
            "2",
        ])
        .assert()
        .success();

    let model = Model::load(&workspace.path().join("model.bin")).expect("load model");
    assert_eq!(model.size, 3);
    let words: Vec<&str> = model.vocab.iter().map(|vw| vw.word.as_str()).collect();
    assert_eq!(words, ["one", "two"]);
    assert_eq!(model.embeddings.len(), 2 * 3);
    assert_eq!(model.weights.len(), 3);
    assert!(model
        .vocab
        .iter()
        .all(|vw| vw.path.len() == vw.code.len() + 1));
}

#[test]
fn binary_and_bincode_conflict() {
    let workspace = temp_workspace();
    wordvec()
        .current_dir(workspace.path())
        .args(["--train", "corpus.txt", "--binary", "--bincode"])
        .assert()
        .failure();
}

#[test]
fn rejects_bad_settings() {
    let workspace = temp_workspace();
    wordvec()
        .current_dir(workspace.path())
        .args(["--train", "corpus.txt", "--size", "0"])
        .assert()
        .failure();
    wordvec()
        .current_dir(workspace.path())
        .args(["--train", "missing.txt"])
        .assert()
        .failure();
    wordvec()
        .current_dir(workspace.path())
        .args(["--train", "corpus.txt", "--min-count", "1000"])
        .assert()
        .failure();
}

#[test]
fn warns_when_there_is_nowhere_to_write() {
    let workspace = temp_workspace();
    let assert = wordvec()
        .current_dir(workspace.path())
        .args(["--train", "corpus.txt", "--min-count", "1"])
        .assert()
        .success();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("skipping training"), "{stderr}");
    assert_eq!(fs::read_dir(workspace.path()).unwrap().count(), 1);
}
