use crate::models::assessment::TargetCohort;

/// Single source of truth for cohort eligibility, used by both the
/// availability listing and the start gate.
///
/// A student is eligible when some target matches their grade and that
/// target's section list either names their section or restricts nothing.
/// Empty-string section entries are treated as absent, so `[""]` and `[]`
/// both mean "all sections"; a student without a section passes any
/// restriction.
pub fn is_eligible(grade: &str, section: Option<&str>, targets: &[TargetCohort]) -> bool {
    targets.iter().any(|target| {
        if target.grade != grade {
            return false;
        }
        let sections: Vec<&str> = target
            .sections
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        match section {
            _ if sections.is_empty() => true,
            None => true,
            Some(s) => sections.contains(&s),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cohort(grade: &str, sections: &[&str]) -> TargetCohort {
        TargetCohort {
            grade: grade.to_string(),
            sections: sections.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn empty_sections_means_all_sections_of_the_grade() {
        let targets = [cohort("Grade 7", &[])];
        assert!(is_eligible("Grade 7", Some("B"), &targets));
        assert!(is_eligible("Grade 7", None, &targets));
        assert!(!is_eligible("Grade 8", Some("B"), &targets));
    }

    #[test]
    fn section_restriction_excludes_other_sections() {
        let targets = [cohort("Grade 7", &["A"])];
        assert!(is_eligible("Grade 7", Some("A"), &targets));
        assert!(!is_eligible("Grade 7", Some("B"), &targets));
    }

    #[test]
    fn student_without_section_passes_any_restriction() {
        let targets = [cohort("Grade 7", &["A"])];
        assert!(is_eligible("Grade 7", None, &targets));
    }

    #[test]
    fn empty_string_sentinel_collapses_to_all_sections() {
        let targets = [cohort("Grade 7", &[""])];
        assert!(is_eligible("Grade 7", Some("B"), &targets));
        let mixed = [cohort("Grade 7", &["", "A"])];
        assert!(!is_eligible("Grade 7", Some("B"), &mixed));
        assert!(is_eligible("Grade 7", Some("A"), &mixed));
    }

    #[test]
    fn any_matching_cohort_grants_eligibility() {
        let targets = [cohort("Grade 6", &[]), cohort("Grade 7", &["A", "B"])];
        assert!(is_eligible("Grade 7", Some("B"), &targets));
        assert!(is_eligible("Grade 6", Some("C"), &targets));
        assert!(!is_eligible("Grade 7", Some("C"), &targets));
    }

    #[test]
    fn no_targets_means_no_one_is_eligible() {
        assert!(!is_eligible("Grade 7", Some("A"), &[]));
    }
}
