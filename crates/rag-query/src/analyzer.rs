//! Query intent classification.

use regex::Regex;
use std::sync::LazyLock;

use rag_core::{Intent, Query};

use crate::concepts::extract_concepts;

static HOWTO: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*how\b|\bhow\s+(?:to|do|does|can|could|should|would|is|are)\b|\bwhat\s+steps\b|\bprocedure\s+for\b|\bmethod\s+to\b|\bsteps\s+to\b",
    )
    .ok()
});

static TROUBLESHOOTING: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:errors?|fail(?:s|ed|ing|ure)?|broken|problems?|issues?|fix|troubleshoot(?:ing)?|crash(?:es|ed|ing)?|malfunction(?:s|ing)?)\b|\b(?:not|isn['’]?t|doesn['’]?t|won['’]?t|can['’]?t|stopped)\s+(?:\w+\s+)?work(?:ing|s)?\b",
    )
    .ok()
});

static DEFINITION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bwhat\s+(?:is|are)\b|\bwhat['’]s\b|\bdefine\b|\bdefinition\b|\bexplain\b|\bmeaning\s+of\b",
    )
    .ok()
});

fn is_match(re: &LazyLock<Option<Regex>>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

/// Classify a query. Total: unmatched text is `General`.
pub fn classify_intent(text: &str) -> Intent {
    // priority order
    let rules: [(&LazyLock<Option<Regex>>, Intent); 3] = [
        (&HOWTO, Intent::HowTo),
        (&TROUBLESHOOTING, Intent::Troubleshooting),
        (&DEFINITION, Intent::Definition),
    ];

    rules
        .iter()
        .find(|(re, _)| is_match(re, text))
        .map(|(_, intent)| *intent)
        .unwrap_or(Intent::General)
}

/// Analyze a raw query string into its intent and concept set.
pub fn analyze(text: &str) -> Query {
    Query {
        text: text.to_string(),
        intent: classify_intent(text),
        concepts: extract_concepts(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_core::PromptStyle;

    #[test]
    fn test_howto() {
        for q in [
            "How do I install the widget?",
            "how to reset the X200",
            "What steps are needed to pair it?",
            "Procedure for replacing the filter",
        ] {
            assert_eq!(classify_intent(q), Intent::HowTo, "{}", q);
        }
    }

    #[test]
    fn test_troubleshooting() {
        for q in [
            "Why isn't it working?",
            "The display is broken",
            "Error E42 after update",
            "charger fails to start",
            "it is not working anymore",
        ] {
            assert_eq!(classify_intent(q), Intent::Troubleshooting, "{}", q);
        }
    }

    #[test]
    fn test_definition() {
        assert_eq!(classify_intent("What is eco mode?"), Intent::Definition);
        assert_eq!(classify_intent("Explain the LED codes"), Intent::Definition);
        assert_eq!(classify_intent("define standby"), Intent::Definition);
    }

    #[test]
    fn test_priority_order() {
        // how beats failure vocabulary
        assert_eq!(classify_intent("How do I fix error E3?"), Intent::HowTo);
        // failure beats definition
        assert_eq!(classify_intent("What is error E3?"), Intent::Troubleshooting);
    }

    #[test]
    fn test_general_fallback() {
        assert_eq!(classify_intent(""), Intent::General);
        assert_eq!(classify_intent("warranty period"), Intent::General);
        assert_eq!(classify_intent("¿Dónde está?"), Intent::General);
    }

    #[test]
    fn test_analyze() {
        let query = analyze("How do I install the widget?");
        assert_eq!(query.intent, Intent::HowTo);
        assert_eq!(query.intent.prompt_style(), PromptStyle::StepByStep);
        assert!(query.concepts.contains("install"));

        let empty = analyze("");
        assert_eq!(empty.intent, Intent::General);
        assert!(empty.concepts.is_empty());
    }
}
