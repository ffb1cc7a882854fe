//! Registry properties of `System`.

use glu::{GluError, Metadata, Pipeline, System};
use proptest::prelude::*;
use std::collections::HashMap;

proptest! {
    #[test]
    fn prop_last_registration_wins(
        registrations in prop::collection::vec(("[a-d]{1,2}", 0u32..100), 0..40)
    ) {
        let mut system = System::new(Metadata::new("prop"));
        let mut expected: HashMap<String, u32> = HashMap::new();

        for (name, revision) in &registrations {
            system.add_pipeline(
                Pipeline::new(Metadata::new(name.clone()).with_label("revision", revision.to_string())),
            );
            expected.insert(name.clone(), *revision);
        }

        prop_assert_eq!(system.len(), expected.len());
        prop_assert_eq!(system.pipelines().count(), expected.len());

        for (name, revision) in &expected {
            let pipeline = system.get_pipeline(name).unwrap();
            prop_assert_eq!(&pipeline.metadata().labels["revision"], &revision.to_string());
        }
    }

    #[test]
    fn prop_unregistered_names_are_not_found(name in "[e-z]{1,8}") {
        let mut system = System::new(Metadata::new("prop"));
        system.add_pipeline(Pipeline::new(Metadata::new("a")));

        let is_not_found = matches!(system.get_pipeline(&name), Err(GluError::NotFound(ref n)) if n == &name);
        prop_assert!(is_not_found);
    }
}

#[test]
fn test_pipelines_iterates_every_name_once() {
    let mut system = System::new(Metadata::new("sys"));
    for name in ["checkout", "billing", "search"] {
        system.add_pipeline(Pipeline::new(Metadata::new(name)));
    }

    let mut names: Vec<&str> = system.pipelines().map(|(name, _)| name).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["billing", "checkout", "search"]);
}
