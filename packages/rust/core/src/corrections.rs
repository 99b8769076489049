//! Literal fact-correction application.

use tracing::debug;

use copyforge_shared::Correction;

/// Counts from one application pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrectionReport {
    pub applied: usize,
    pub skipped: usize,
}

/// Apply each correction as an exact first-occurrence substring
/// replacement, in list order. A correction whose `original` text is
/// absent from the current content is skipped and counted; approximate
/// matches from the fact-check stage are expected, not exceptional.
pub fn apply_corrections(
    content: &str,
    corrections: &[Correction],
) -> (String, CorrectionReport) {
    let mut result = content.to_string();
    let mut report = CorrectionReport::default();

    for correction in corrections {
        // An empty pattern would match at offset 0 and insert text.
        if correction.original.is_empty() {
            report.skipped += 1;
            continue;
        }
        match result.find(&correction.original) {
            Some(pos) => {
                result.replace_range(
                    pos..pos + correction.original.len(),
                    &correction.corrected,
                );
                report.applied += 1;
            }
            None => {
                debug!(original = %correction.original, "correction text not found, skipped");
                report.skipped += 1;
            }
        }
    }

    (result, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use copyforge_shared::Severity;

    fn correction(original: &str, corrected: &str) -> Correction {
        Correction {
            original: original.into(),
            corrected: corrected.into(),
            source: String::new(),
            severity: Severity::Minor,
        }
    }

    #[test]
    fn replaces_first_occurrence_only() {
        let (result, report) =
            apply_corrections("costs 4000 notes, then 4000 more", &[correction("4000", "5000")]);
        assert_eq!(result, "costs 5000 notes, then 4000 more");
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn applies_in_list_order() {
        let corrections = vec![correction("alpha", "beta"), correction("beta", "gamma")];
        let (result, report) = apply_corrections("alpha beta", &corrections);
        // The first correction produces "beta beta"; the second then hits
        // the leading occurrence.
        assert_eq!(result, "gamma beta");
        assert_eq!(report.applied, 2);
    }

    #[test]
    fn missing_original_is_skipped_silently() {
        let (result, report) =
            apply_corrections("nothing to fix here", &[correction("absent text", "x")]);
        assert_eq!(result, "nothing to fix here");
        assert_eq!(report.applied, 0);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn empty_original_is_skipped() {
        let (result, report) = apply_corrections("body", &[correction("", "inserted")]);
        assert_eq!(result, "body");
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn idempotent_on_a_normal_correction_set() {
        let corrections = vec![
            correction("in 2019", "in 2021"),
            correction("12 kW", "16 kW"),
        ];
        let content = "Installed in 2019 with a 12 kW unit.";

        let (once, first) = apply_corrections(content, &corrections);
        let (twice, second) = apply_corrections(&once, &corrections);

        assert_eq!(once, twice);
        assert_eq!(first.applied, 2);
        assert_eq!(second.applied, 0);
        assert_eq!(second.skipped, 2);
    }

    #[test]
    fn handles_multibyte_content() {
        let (result, report) = apply_corrections(
            "L'audit énergétique coûte 500 €.",
            &[correction("500 €", "800 €")],
        );
        assert_eq!(result, "L'audit énergétique coûte 800 €.");
        assert_eq!(report.applied, 1);
    }

    #[test]
    fn mixed_set_counts_both_outcomes() {
        let corrections = vec![
            correction("old fact", "new fact"),
            correction("never present", "x"),
            correction("stale figure", "fresh figure"),
        ];
        let (result, report) =
            apply_corrections("old fact and stale figure", &corrections);
        assert_eq!(result, "new fact and fresh figure");
        assert_eq!(report, CorrectionReport { applied: 2, skipped: 1 });
    }
}
