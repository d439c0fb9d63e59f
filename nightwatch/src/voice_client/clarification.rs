//! **[ADDED]** Ported from `original_source/services/nlp/clarification.py`:
//! a small fixed library of clarification prompts chosen by last-known
//! context, grounded in that module's single-purpose helper function.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbiguityType {
    NoTarget,
    AmbiguousTarget,
}

pub fn classify(last_target: Option<&str>) -> AmbiguityType {
    match last_target {
        None => AmbiguityType::NoTarget,
        Some(_) => AmbiguityType::AmbiguousTarget,
    }
}

pub fn prompt(last_target: Option<&str>) -> String {
    match classify(last_target) {
        AmbiguityType::NoTarget => {
            "I didn't catch a target. Which object would you like to observe?".to_string()
        }
        AmbiguityType::AmbiguousTarget => format!(
            "Did you still mean {}, or something else? Please say the target name again.",
            last_target.expect("AmbiguousTarget implies a last target")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_last_target_asks_for_a_target() {
        assert_eq!(classify(None), AmbiguityType::NoTarget);
        assert!(prompt(None).contains("target"));
    }

    #[test]
    fn existing_last_target_asks_for_confirmation() {
        assert_eq!(classify(Some("M31")), AmbiguityType::AmbiguousTarget);
        assert!(prompt(Some("M31")).contains("M31"));
    }
}
