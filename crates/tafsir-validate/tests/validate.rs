//! Validation over a store laid out on disk

use tafsir_generate::{ReferenceCorpus, Section, SubUnit};
use tafsir_store::{Document, DocumentStore, LayerKey};
use tafsir_validate::{ValidationPass, ValidationReport};
use tempfile::TempDir;

fn commentary() -> String {
    "A measured explanation of the verse in plain prose. ".repeat(4)
}

fn complete_doc(subs: u32) -> Document {
    let mut doc = Document::new();
    for sub in 1..=subs {
        for l in 1..=4 {
            doc.put(sub, &LayerKey::base(l), commentary());
        }
    }
    doc
}

fn store() -> (TempDir, DocumentStore) {
    let dir = TempDir::new().unwrap();
    let store = DocumentStore::new(dir.path()).unwrap();
    (dir, store)
}

#[test]
fn full_corpus_of_complete_sections_passes() {
    let (_dir, store) = store();
    for section in 1..=114 {
        store.save(section, &complete_doc(section % 7 + 3)).unwrap();
    }

    let reports = ValidationPass::default().run(&store, 1, 114).unwrap();
    let report = ValidationReport::build(1, 114, reports, 3.0);

    assert_eq!(report.totals.sections_checked, 114);
    assert_eq!(report.totals.complete, 114);
    assert_eq!(report.totals.incomplete_sub_units, 0);
    assert!(report.size.outliers.is_empty());
    assert!(report.recommendations.is_empty());
    assert!(report.is_success());
}

#[test]
fn missing_and_unparsable_sections_fail() {
    let (dir, store) = store();
    store.save(1, &complete_doc(2)).unwrap();
    std::fs::write(dir.path().join("tafsir_2.json"), "{ not json").unwrap();

    let reports = ValidationPass::default().run(&store, 1, 3).unwrap();
    let report = ValidationReport::build(1, 3, reports, 3.0);

    assert_eq!(report.totals.complete, 1);
    assert_eq!(report.totals.unparsable, 1);
    assert_eq!(report.totals.missing, 1);
    assert!(report.sections[1].parse_error.is_some());
    assert!(!report.is_success());
    assert!(report
        .recommendations
        .iter()
        .any(|r| r == "Missing 1 tafsir files - generation incomplete"));
}

#[test]
fn corpus_reveals_absent_sub_units() {
    let (_dir, store) = store();
    store.save(1, &complete_doc(2)).unwrap();
    let corpus = ReferenceCorpus::from_sections(vec![Section {
        number: 1,
        name: "Al-Fatiha".into(),
        arabic_name: String::new(),
        sub_units: (1..=3)
            .map(|n| SubUnit {
                number: n,
                source_text: String::new(),
                translation: String::new(),
            })
            .collect(),
    }]);

    let pass = ValidationPass::default().with_corpus(&corpus);
    let report = pass.check_section(&store, 1);
    assert_eq!(report.incomplete.keys().copied().collect::<Vec<_>>(), vec![3]);
    assert!(!report.is_complete());
}

#[test]
fn validation_never_writes() {
    let (dir, store) = store();
    store.save(1, &complete_doc(1)).unwrap();
    let before = std::fs::read(dir.path().join("tafsir_1.json")).unwrap();
    ValidationPass::default().run(&store, 1, 1).unwrap();
    assert_eq!(std::fs::read(dir.path().join("tafsir_1.json")).unwrap(), before);
}
