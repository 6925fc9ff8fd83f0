use dermaclass::knowledge::{default_class_names, UNKNOWN_DISEASE};
use dermaclass::{get_disease_info, Disease};

#[test]
fn test_lookup_is_total() {
    assert_eq!(
        get_disease_info("Acne").description,
        "Acne is a common skin condition caused by clogged hair follicles."
    );
    assert_eq!(get_disease_info("nonexistent-xyz"), &UNKNOWN_DISEASE);
    assert_eq!(get_disease_info("").description, "Information not available");
}

#[test]
fn test_every_default_label_has_a_record() {
    for label in default_class_names() {
        let disease: Disease = label.parse().unwrap();
        assert_eq!(get_disease_info(&label), disease.record());
        assert_ne!(get_disease_info(&label), &UNKNOWN_DISEASE);
    }
}
