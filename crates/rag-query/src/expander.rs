//! Pattern-based query expansion.
//!
//! Each intent owns a table of trigger phrases, each mapped to a fixed list
//! of rewrites. The first trigger found in the query is substituted in
//! place; at most [`MAX_VARIANTS`] distinct paraphrases are produced.

use regex::{NoExpand, Regex};
use std::sync::{Arc, LazyLock};

use rag_core::{Intent, Query, QueryVariant};

/// Upper bound on variants per query.
pub const MAX_VARIANTS: usize = 3;

/// A trigger phrase and its replacements.
#[derive(Debug, Clone, Copy)]
pub struct RewriteRule {
    pub trigger: &'static str,
    pub rewrites: &'static [&'static str],
}

const HOWTO_REWRITES: &[&str] = &["what steps for", "procedure for", "method to"];

const HOWTO_RULES: &[RewriteRule] = &[
    RewriteRule { trigger: "how do i", rewrites: HOWTO_REWRITES },
    RewriteRule { trigger: "how can i", rewrites: HOWTO_REWRITES },
    RewriteRule { trigger: "how should i", rewrites: HOWTO_REWRITES },
    RewriteRule { trigger: "how do you", rewrites: HOWTO_REWRITES },
    RewriteRule { trigger: "how to", rewrites: HOWTO_REWRITES },
];

const TROUBLESHOOTING_RULES: &[RewriteRule] = &[
    RewriteRule {
        trigger: "not working",
        rewrites: &["fails to work", "stopped working", "malfunctioning"],
    },
    RewriteRule {
        trigger: "working",
        rewrites: &["functioning", "operating", "responding"],
    },
    RewriteRule {
        trigger: "error",
        rewrites: &["fault", "error code", "failure"],
    },
    RewriteRule {
        trigger: "problem",
        rewrites: &["issue", "fault", "malfunction"],
    },
    RewriteRule {
        trigger: "issue",
        rewrites: &["problem", "fault", "malfunction"],
    },
    RewriteRule {
        trigger: "broken",
        rewrites: &["damaged", "not working", "faulty"],
    },
    RewriteRule {
        trigger: "fails",
        rewrites: &["does not work", "stops working", "errors"],
    },
];

const DEFINITION_RULES: &[RewriteRule] = &[
    RewriteRule {
        trigger: "what is",
        rewrites: &["define", "explain", "meaning of"],
    },
    RewriteRule {
        trigger: "what are",
        rewrites: &["define", "explain", "describe"],
    },
    RewriteRule {
        trigger: "define",
        rewrites: &["what is", "explain", "meaning of"],
    },
    RewriteRule {
        trigger: "explain",
        rewrites: &["what is", "describe", "define"],
    },
];

/// Rewrite table for an intent, in match priority order.
pub fn rules_for(intent: Intent) -> &'static [RewriteRule] {
    match intent {
        Intent::HowTo => HOWTO_RULES,
        Intent::Troubleshooting => TROUBLESHOOTING_RULES,
        Intent::Definition => DEFINITION_RULES,
        Intent::General => &[],
    }
}

struct CompiledRule {
    intent: Intent,
    pattern: Regex,
    rule: RewriteRule,
}

static COMPILED: LazyLock<Vec<CompiledRule>> = LazyLock::new(|| {
    [Intent::HowTo, Intent::Troubleshooting, Intent::Definition]
        .into_iter()
        .flat_map(|intent| rules_for(intent).iter().map(move |rule| (intent, *rule)))
        .filter_map(|(intent, rule)| {
            let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(rule.trigger))).ok()?;
            Some(CompiledRule {
                intent,
                pattern,
                rule,
            })
        })
        .collect()
});

fn tidy(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Produce paraphrases of `query` using its intent's rewrite table.
///
/// Returns an empty list when no trigger matches.
pub fn expand(query: &Query) -> Vec<QueryVariant> {
    let Some(compiled) = COMPILED
        .iter()
        .filter(|c| c.intent == query.intent)
        .find(|c| c.pattern.is_match(&query.text))
    else {
        return Vec::new();
    };

    let origin: Arc<str> = Arc::from(query.text.as_str());
    let original = tidy(&query.text).to_lowercase();
    let mut variants: Vec<QueryVariant> = Vec::with_capacity(MAX_VARIANTS);

    for &rewrite in compiled.rule.rewrites {
        let text = tidy(&compiled.pattern.replace(&query.text, NoExpand(rewrite)));
        if text.is_empty()
            || text.to_lowercase() == original
            || variants.iter().any(|v| v.text.eq_ignore_ascii_case(&text))
        {
            continue;
        }
        variants.push(QueryVariant {
            text,
            trigger: compiled.rule.trigger.to_string(),
            origin: Arc::clone(&origin),
        });
        if variants.len() == MAX_VARIANTS {
            break;
        }
    }

    variants
}
