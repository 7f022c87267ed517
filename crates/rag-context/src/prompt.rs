//! Prompt assembly from a style template, combined context and question.

use serde::{Deserialize, Serialize};

use rag_core::{Language, PromptPlan, PromptStyle};

use crate::combiner::NO_CONTEXT;

/// Fixed instruction scaffold for one style.
struct Template {
    system: &'static str,
    /// User message; `{context}` and `{question}` are substituted.
    user: &'static str,
}

const BASIC: Template = Template {
    system: "You are a helpful assistant that answers questions using only the provided context. \
Answer accurately and concisely. If the context does not contain the answer, say that the \
information is not available in the documents.",
    user: "Context:\n{context}\n\nQuestion: {question}\n\nAnswer:",
};

const DETAILED: Template = Template {
    system: "You are an expert assistant for product manuals and technical documentation.\n\
Guidelines:\n\
- Base every statement on the provided context only\n\
- If the context lacks information needed for a full answer, state exactly what is missing\n\
- Include relevant details and specifications when available\n\
- Use clear, professional language",
    user: "Context Information:\n{context}\n\nUser Question: {question}\n\n\
Provide a comprehensive answer based on the context above. Indicate clearly any information \
the context does not cover.",
};

const STEP_BY_STEP: Template = Template {
    system: "You are a technical support specialist. Answer only from the provided context and:\n\
1. Break procedures into clear numbered steps\n\
2. Highlight safety warnings or precautions mentioned in the context\n\
3. List any required tools or materials\n\
4. If a step is not covered by the context, say so instead of guessing",
    user: "Based on this context:\n{context}\n\nQuestion: {question}\n\nProvide a step-by-step answer:",
};

const TROUBLESHOOTING: Template = Template {
    system: "You are a troubleshooting expert. Using only the provided context:\n\
1. Identify the most likely cause from the described symptoms\n\
2. Give diagnostic steps in order\n\
3. Offer solutions, simplest first\n\
4. Include safety warnings where applicable\n\
5. If the context does not describe the problem, state that it is not covered",
    user: "Context:\n{context}\n\nProblem: {question}\n\nHelp troubleshoot this issue:",
};

const CHAIN_OF_THOUGHT: &str = "\n\nBefore answering, reason in stages:\n\
1. Identify which parts of the context are relevant to the question.\n\
2. Extract the key facts from those parts.\n\
3. Note anything the question asks that the context does not cover.\n\
4. Only then write the final answer.\n\n\
Reasoning:";

const FEW_SHOT_SYSTEM: &str = "You are a helpful assistant that answers questions from product \
documentation. Follow the pattern shown in the examples. Use only the given context and say \
when the answer is not in it.";

/// Instruction text for a non-English output language.
struct LanguagePack {
    system: &'static str,
    /// Answer guidance placed before the context.
    instructions: &'static str,
    not_found: &'static str,
}

const HINDI: LanguagePack = LanguagePack {
    system: "आप एक उत्पाद मैनुअल के लिए सहायक हैं। नीचे दिए गए संदर्भ का उपयोग करके सटीक और \
पूर्ण विवरण के साथ प्रश्न का उत्तर दें।",
    instructions: "- अपने उत्तर को स्पष्ट चरण-दर-चरण निर्देशों में तोड़ें।\n\
- यदि किसी चरण में सुरक्षा या सावधानी शामिल है, तो उसका उल्लेख करें।\n\
- यदि जानकारी उपलब्ध नहीं है, तो कहें 'दस्तावेज़ में नहीं मिला।'",
    not_found: "क्षमा करें, मुझे दस्तावेज़ में प्रासंगिक जानकारी नहीं मिली।",
};

const MARATHI: LanguagePack = LanguagePack {
    system: "तुम्ही उत्पाद मॅन्युअलसाठी सहाय्यक आहात. खाली दिलेल्या संदर्भाचा वापर करून प्रश्नाचे \
अचूक आणि पूर्ण तपशीलासह उत्तर द्या.",
    instructions: "- तुमचे उत्तर स्पष्ट पायऱ्यांमध्ये विभाजित करा.\n\
- जर एखाद्या पायरीमध्ये सुरक्षा किंवा काळजी असेल तर त्याचा उल्लेख करा.\n\
- जर माहिती उपलब्ध नसेल तर 'दस्तऐवजात सापडले नाही' असे सांगा.",
    not_found: "माफ करा, मला दस्तऐवजात संबंधित माहिती सापडली नाही.",
};

const GUJARATI: LanguagePack = LanguagePack {
    system: "તમે પ્રોડક્ટ મેન્યુઅલ માટે સહાયક છો. નીચે આપેલા સંદર્ભનો ઉપયોગ કરીને પ્રશ્નનો જવાબ \
ચોક્કસ અને સંપૂર્ણ વિગતો સાથે આપો.",
    instructions: "- તમારા જવાબને સ્પષ્ટ પગલાં-દર-પગલાં સૂચનોમાં વિભાજિત કરો.\n\
- જો કોઈ પગલામાં સલામતી અથવા સાવધાની સમાવેશ થાય છે, તો તેનો ઉલ્લેખ કરો.\n\
- જો માહિતી ઉપલબ્ધ નથી, તો કહો 'દસ્તાવેજમાં મળ્યું નથી.'",
    not_found: "માફ કરો, મને દસ્તાવેજમાં સંબંધિત માહિતી મળી નથી.",
};

const BENGALI: LanguagePack = LanguagePack {
    system: "আপনি একটি পণ্য ম্যানুয়ালের জন্য সহায়ক। নীচে দেওয়া প্রসঙ্গ ব্যবহার করে প্রশ্নের উত্তর \
সঠিক এবং সম্পূর্ণ বিবরণ সহ দিন।",
    instructions: "- আপনার উত্তরকে স্পষ্ট ধাপে-ধাপে নির্দেশাবলীতে ভাগ করুন।\n\
- যদি কোন ধাপে নিরাপত্তা বা সতর্কতা জড়িত থাকে, তবে উল্লেখ করুন।\n\
- যদি তথ্য অনুপলব্ধ হয়, তবে বলুন 'নথিতে পাওয়া যায়নি।'",
    not_found: "দুঃখিত, আমি নথিতে প্রাসঙ্গিক তথ্য খুঁজে পাইনি।",
};

/// User message of every non-English language.
const LOCALIZED_USER: &str = "{instructions}\n\nContext:\n{context}\n\nQuestion:\n{question}";

/// English is served by the style templates.
fn language_pack(language: Language) -> Option<&'static LanguagePack> {
    match language {
        Language::English => None,
        Language::Hindi => Some(&HINDI),
        Language::Marathi => Some(&MARATHI),
        Language::Gujarati => Some(&GUJARATI),
        Language::Bengali => Some(&BENGALI),
    }
}

/// Notice used as the context when nothing relevant was retrieved.
pub fn not_found_notice(language: Language) -> &'static str {
    language_pack(language).map_or(NO_CONTEXT, |pack| pack.not_found)
}

/// Substitute each placeholder of `template` in one pass.
///
/// Inserted values are never rescanned, so braces inside them survive
/// literally.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        let found = values.iter().find_map(|(name, value)| {
            tail.strip_prefix('{')
                .and_then(|t| t.strip_prefix(*name))
                .and_then(|t| t.strip_prefix('}'))
                .map(|after| (*value, after))
        });

        match found {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn template(style: PromptStyle) -> &'static Template {
    match style {
        PromptStyle::Basic => &BASIC,
        PromptStyle::Detailed => &DETAILED,
        PromptStyle::StepByStep => &STEP_BY_STEP,
        PromptStyle::Troubleshooting => &TROUBLESHOOTING,
    }
}

/// A worked example prefixed to few-shot prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FewShotExample {
    pub context: String,
    pub question: String,
    pub answer: String,
}

/// Size report for one style, for comparing templates side by side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleComparison {
    pub style: PromptStyle,
    pub system_chars: usize,
    pub user_chars: usize,
    pub total_chars: usize,
}

/// Builds literal prompt text. Performs no model invocation.
#[derive(Debug, Clone, Default)]
pub struct PromptAssembler {
    chain_of_thought: bool,
    language: Language,
}

impl PromptAssembler {
    pub fn new(chain_of_thought: bool) -> Self {
        Self {
            chain_of_thought,
            language: Language::English,
        }
    }

    /// Write the instructions in another language.
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Assemble a prompt in the given style.
    ///
    /// Non-English output replaces the style template with the language's
    /// own instructions; the style is still recorded on the plan.
    pub fn assemble(&self, style: PromptStyle, context: &str, question: &str) -> PromptPlan {
        let question = question.trim();
        let (system, mut user) = match language_pack(self.language) {
            None => {
                let template = template(style);
                let user = fill(
                    template.user,
                    &[("context", context), ("question", question)],
                );
                (template.system, user)
            }
            Some(pack) => {
                let user = fill(
                    LOCALIZED_USER,
                    &[
                        ("instructions", pack.instructions),
                        ("context", context),
                        ("question", question),
                    ],
                );
                (pack.system, user)
            }
        };

        if self.chain_of_thought {
            user.push_str(CHAIN_OF_THOUGHT);
        }

        self.finish(style, system.to_string(), user)
    }

    /// Assemble a prompt that shows worked examples before the live question.
    ///
    /// With no examples this is the basic template.
    pub fn assemble_few_shot(
        &self,
        context: &str,
        question: &str,
        examples: &[FewShotExample],
    ) -> PromptPlan {
        if examples.is_empty() {
            return self.assemble(PromptStyle::Basic, context, question);
        }

        let mut user = String::new();
        for (i, example) in examples.iter().enumerate() {
            user.push_str(&format!(
                "Example {}:\nContext: {}\nQuestion: {}\nAnswer: {}\n\n",
                i + 1,
                example.context.trim(),
                example.question.trim(),
                example.answer.trim()
            ));
        }
        user.push_str(&format!(
            "Context:\n{}\n\nQuestion: {}\n\nAnswer:",
            context,
            question.trim()
        ));

        if self.chain_of_thought {
            user.push_str(CHAIN_OF_THOUGHT);
        }

        let system = language_pack(self.language).map_or(FEW_SHOT_SYSTEM, |pack| pack.system);
        self.finish(PromptStyle::Basic, system.to_string(), user)
    }

    /// Render the same context and question in every style.
    pub fn compare_styles(&self, context: &str, question: &str) -> Vec<StyleComparison> {
        PromptStyle::ALL
            .iter()
            .map(|&style| {
                let plan = self.assemble(style, context, question);
                StyleComparison {
                    style,
                    system_chars: plan.system.chars().count(),
                    user_chars: plan.user.chars().count(),
                    total_chars: plan.text.chars().count(),
                }
            })
            .collect()
    }

    fn finish(&self, style: PromptStyle, system: String, user: String) -> PromptPlan {
        let text = format!("{}\n\n{}", system, user);
        PromptPlan {
            style,
            language: self.language,
            chain_of_thought: self.chain_of_thought,
            system,
            user,
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_style_restricts_to_context() {
        let assembler = PromptAssembler::default();
        for style in PromptStyle::ALL {
            let plan = assembler.assemble(style, "## Procedures\nPress reset.", "How do I reset it?");
            assert_eq!(plan.style, style);
            assert!(!plan.chain_of_thought);
            assert!(plan.system.to_lowercase().contains("context"));
            assert!(plan.text.contains("Press reset."));
            assert!(plan.text.contains("How do I reset it?"));
            assert!(plan.text.starts_with(&plan.system));
            assert!(plan.text.ends_with(&plan.user));
        }
    }

    #[test]
    fn test_chain_of_thought_scaffold() {
        let plain = PromptAssembler::new(false).assemble(PromptStyle::Basic, "ctx", "q");
        let cot = PromptAssembler::new(true).assemble(PromptStyle::Basic, "ctx", "q");
        assert!(cot.chain_of_thought);
        assert!(cot.user.starts_with(&plain.user));
        assert!(cot.user.ends_with("Reasoning:"));
        assert!(!plain.text.contains("Reasoning:"));
    }

    #[test]
    fn test_no_context_notice_carried_through() {
        let plan = PromptAssembler::default().assemble(
            PromptStyle::Troubleshooting,
            NO_CONTEXT,
            "Why isn't it working?",
        );
        assert!(plan.text.contains(NO_CONTEXT));
        assert!(plan.user.contains("Problem: Why isn't it working?"));
    }

    #[test]
    fn test_few_shot() {
        let examples = vec![FewShotExample {
            context: "The LED blinks red when the battery is low.".to_string(),
            question: "What does a red LED mean?".to_string(),
            answer: "The battery is low.".to_string(),
        }];
        let plan = PromptAssembler::default().assemble_few_shot("ctx", "What does blue mean?", &examples);
        assert!(plan.user.starts_with("Example 1:"));
        assert!(plan.user.ends_with("Question: What does blue mean?\n\nAnswer:"));

        let fallback = PromptAssembler::default().assemble_few_shot("ctx", "q", &[]);
        assert_eq!(fallback, PromptAssembler::default().assemble(PromptStyle::Basic, "ctx", "q"));
    }

    #[test]
    fn test_placeholders_in_values_survive() {
        let context = "Set the template to {question} and keep {context} as is.";
        let question = "What does {context} mean here?";
        for style in PromptStyle::ALL {
            let plan = PromptAssembler::default().assemble(style, context, question);
            assert!(plan.user.contains(context));
            assert!(plan.user.contains(question));
        }
    }

    #[test]
    fn test_fill_leaves_unknown_braces() {
        let filled = fill("{a} {b} {{a}} {", &[("a", "1")]);
        assert_eq!(filled, "1 {b} {1} {");
    }

    #[test]
    fn test_hindi_rendering() {
        let plan = PromptAssembler::new(false)
            .with_language(Language::Hindi)
            .assemble(PromptStyle::StepByStep, "## Procedures\nPress reset.", "रीसेट कैसे करें?");

        assert_eq!(plan.language, Language::Hindi);
        assert_eq!(plan.style, PromptStyle::StepByStep);
        assert_eq!(plan.system, HINDI.system);
        assert!(plan.user.starts_with(HINDI.instructions));
        assert!(plan
            .user
            .ends_with("Context:\n## Procedures\nPress reset.\n\nQuestion:\nरीसेट कैसे करें?"));
        assert!(!plan.text.contains("technical support specialist"));
    }

    #[test]
    fn test_every_language_has_its_own_text() {
        for language in Language::ALL {
            let plan = PromptAssembler::default()
                .with_language(language)
                .assemble(PromptStyle::Basic, "ctx", "q");
            assert_eq!(plan.language, language);
            assert!(plan.text.contains("ctx"));
            if language != Language::English {
                assert_ne!(not_found_notice(language), NO_CONTEXT);
                assert!(plan.user.ends_with("Question:\nq"));
            }
        }
        assert_eq!(not_found_notice(Language::English), NO_CONTEXT);
    }

    #[test]
    fn test_localized_few_shot_and_chain_of_thought() {
        let examples = vec![FewShotExample {
            context: "The LED blinks red when the battery is low.".to_string(),
            question: "What does a red LED mean?".to_string(),
            answer: "The battery is low.".to_string(),
        }];
        let assembler = PromptAssembler::new(true).with_language(Language::Bengali);

        let few_shot = assembler.assemble_few_shot("ctx", "q", &examples);
        assert_eq!(few_shot.system, BENGALI.system);
        assert!(few_shot.user.ends_with("Reasoning:"));

        let plan = assembler.assemble(PromptStyle::Detailed, "ctx", "q");
        assert!(plan.chain_of_thought);
        assert!(plan.user.ends_with("Reasoning:"));
    }

    #[test]
    fn test_few_shot_examples_from_json() {
        let json = r#"[{"context": "c", "question": "q", "answer": "a"}]"#;
        let examples: Vec<FewShotExample> = serde_json::from_str(json).unwrap();
        assert_eq!(examples[0].answer, "a");
    }

    #[test]
    fn test_compare_styles() {
        let report = PromptAssembler::default().compare_styles("ctx", "q");
        assert_eq!(report.len(), 4);
        assert_eq!(report[2].style, PromptStyle::StepByStep);
        for entry in &report {
            assert_eq!(entry.total_chars, entry.system_chars + entry.user_chars + 2);
        }
    }
}
