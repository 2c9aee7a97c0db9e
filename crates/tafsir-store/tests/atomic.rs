//! Crash-safety of DocumentStore::save

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tafsir_store::{Document, DocumentStore, LayerKey};
use tempfile::TempDir;

const CHILD_ENV: &str = "TAFSIR_ATOMIC_CHILD_DIR";

fn big_document(round: u32) -> Document {
    let mut doc = Document::new();
    for sub in 1..=200 {
        for layer in 1..=4 {
            doc.put(
                sub,
                &LayerKey::base(layer),
                format!("round {round} verse {sub} layer {layer} ").repeat(40),
            );
        }
    }
    doc
}

/// Writer half of `killed_writer_leaves_readable_document`. Does nothing
/// unless launched by that test.
#[test]
#[ignore]
fn atomic_writer_child() {
    let Ok(dir) = std::env::var(CHILD_ENV) else {
        return;
    };
    let store = DocumentStore::new(Path::new(&dir)).unwrap();
    let deadline = Instant::now() + Duration::from_secs(30);
    let mut round = 0;
    while Instant::now() < deadline {
        store.save(1, &big_document(round)).unwrap();
        round += 1;
    }
}

#[test]
fn killed_writer_leaves_readable_document() {
    let dir = TempDir::new().unwrap();
    let store = DocumentStore::new(dir.path()).unwrap();

    let mut child = Command::new(std::env::current_exe().unwrap())
        .args(["--ignored", "--exact", "atomic_writer_child", "--nocapture"])
        .env(CHILD_ENV, dir.path())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let wait_until = Instant::now() + Duration::from_secs(20);
    while !store.exists(1) && Instant::now() < wait_until {
        std::thread::sleep(Duration::from_millis(10));
    }
    // let it get a few saves in, then kill it mid-stream
    std::thread::sleep(Duration::from_millis(150));
    child.kill().unwrap();
    child.wait().unwrap();

    let doc = store.load(1).expect("document must parse after a kill");
    assert_eq!(doc.sub_unit_ids().len(), 200);
    assert!(doc.has_key(200, &LayerKey::base(4)));
}

#[test]
fn partial_tmp_does_not_shadow_prior_version() {
    let dir = TempDir::new().unwrap();
    let store = DocumentStore::new(dir.path()).unwrap();

    let mut v1 = Document::new();
    v1.put(1, &LayerKey::base(1), "Prior version.");
    store.save(2, &v1).unwrap();

    // a writer that died between create and rename
    std::fs::write(dir.path().join("tafsir_2.json.tmp"), "{\"1\": {\"layer1\": \"Pri").unwrap();

    assert_eq!(store.load(2).unwrap(), v1);
    assert_eq!(store.cleanup_tmp_files().unwrap(), 1);

    let mut v2 = v1.clone();
    v2.put(1, &LayerKey::base(2), "Next layer.");
    store.save(2, &v2).unwrap();
    assert_eq!(store.load(2).unwrap(), v2);
}
