use std::collections::BTreeSet;

use super::collection::SampleCollection;
use super::model::Sample;

// ---------------------------------------------------------------------------
// Blank samples: water-only wells used for the absorbance background
// ---------------------------------------------------------------------------

/// Plate-map comments that mark a well as containing water only.
pub const DEFAULT_BLANK_COMMENTS: [&str; 7] = [
    "no sample in eppendorfrör (analysis is of water only)",
    "sample missing (analysis is of water only)",
    "Eppendorfrör empty - analysis is of water only",
    "sample and protokoll missing (analysis is of water only)",
    "sample missing - analysis is of water only",
    "No sample, synthesis did not work - analysis is of water only",
    "reference sample with only water",
];

pub fn default_blank_comments() -> Vec<String> {
    DEFAULT_BLANK_COMMENTS.iter().map(|s| s.to_string()).collect()
}

/// Samples whose comment is exactly one of `comments`.
pub fn blank_samples<'a>(collection: &'a SampleCollection, comments: &[String]) -> Vec<&'a Sample> {
    collection
        .samples
        .iter()
        .filter(|s| {
            s.comment
                .as_deref()
                .is_some_and(|c| comments.iter().any(|b| b == c))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Class selection for reporting
// ---------------------------------------------------------------------------

/// Indices of samples belonging to one of `classes`.
///
/// An empty selection means "no filter" and keeps every sample. Class names
/// are compared upper-cased, the way the plate map stores them.
pub fn filtered_indices(collection: &SampleCollection, classes: &BTreeSet<String>) -> Vec<usize> {
    let selected: BTreeSet<String> = classes.iter().map(|c| c.trim().to_uppercase()).collect();
    collection
        .samples
        .iter()
        .enumerate()
        .filter(|(_, s)| selected.is_empty() || selected.contains(&s.class))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection() -> SampleCollection {
        SampleCollection::new(vec![
            Sample::new("a", 1, 1, "7B", Some("reference sample with only water".into()), vec![]),
            Sample::new("b", 1, 2, "7B", None, vec![]),
            Sample::new("c", 1, 3, "8A", Some("spilled".into()), vec![]),
            Sample::new("d", 1, 4, "8A", Some("sample missing (analysis is of water only)".into()), vec![]),
        ])
    }

    #[test]
    fn test_blank_samples_by_comment() {
        let c = collection();
        let blanks = blank_samples(&c, &default_blank_comments());
        let labels: Vec<&str> = blanks.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "d"]);

        assert!(blank_samples(&c, &[]).is_empty());
    }

    #[test]
    fn test_class_filter() {
        let c = collection();
        assert_eq!(filtered_indices(&c, &BTreeSet::new()), vec![0, 1, 2, 3]);
        let only_8a = BTreeSet::from(["8a".to_string()]);
        assert_eq!(filtered_indices(&c, &only_8a), vec![2, 3]);
    }
}
