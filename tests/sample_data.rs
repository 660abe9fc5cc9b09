//! The bundled model artifact and corpus load with the default settings

use std::path::PathBuf;

use policy_verdict::{
    corpus::{CorpusOptions, PolicyIndex},
    model::{Label, ModelAdapter},
};

fn bundled(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(relative)
}

#[test]
fn test_bundled_corpus_decodes_latin1() {
    let options = CorpusOptions::new("latin1", ';').unwrap();
    let index = PolicyIndex::load(&bundled("data/politicas.csv"), &options).unwrap();

    assert_eq!(index.len(), 12);
    assert_eq!(index.group_count(), 5);
    assert_eq!(index.successful_in_group("Salud").len(), 2);
    assert_eq!(index.successful_in_group("Educación").len(), 2);

    // Narrative without any outcome marker is neither a success nor a rationale
    let transporte: Vec<_> = index.in_group("Transporte").collect();
    assert_eq!(transporte.len(), 2);
    assert!(transporte.iter().any(|r| r.rationale().is_none()));
}

#[test]
fn test_bundled_model_scores() {
    let adapter = ModelAdapter::load(&bundled("model/policy_model.json")).unwrap();

    let good = adapter
        .classify("Ampliar la cobertura de vacunación", "Salud")
        .unwrap();
    assert_eq!(good.label, Label::Success);
    assert!(good.success_probability > 50.0 && good.success_probability <= 100.0);

    let bad = adapter
        .classify("Subsidiar el arriendo", "Vivienda")
        .unwrap();
    assert_eq!(bad.label, Label::Failure);
    assert!(bad.success_probability >= 0.0 && bad.success_probability < 50.0);
}
