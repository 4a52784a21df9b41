//! Prompt composition: template + briefing + task directive.

use crisisdesk_shared::Briefing;

use crate::template::InstructionTemplate;

/// Closing instruction for report requests.
pub const REPORT_DIRECTIVE: &str = "Based on this briefing, analyze the most plausible \
scenario and produce a report with perceptions and detailed recommendations.";

/// Builds prompts against a loaded template. Prompts are built fresh for
/// each request.
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder<'a> {
    template: &'a InstructionTemplate,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(template: &'a InstructionTemplate) -> Self {
        Self { template }
    }

    /// Report prompt.
    ///
    /// ```text
    /// {template}
    ///
    /// Context and scenarios:
    /// {briefing}
    ///
    /// {REPORT_DIRECTIVE}
    /// ```
    pub fn report(&self, briefing: &Briefing) -> String {
        format!(
            "{}\n\nContext and scenarios:\n{}\n\n{REPORT_DIRECTIVE}\n",
            self.template.as_str(),
            briefing.as_str()
        )
    }

    /// Follow-up question prompt. The briefing section is kept, possibly
    /// empty, so the model always sees the same layout.
    pub fn question(&self, briefing: &Briefing, question: &str) -> String {
        format!(
            "{}\n\nBriefing:\n{}\n\nQuestion:\n{}\n",
            self.template.as_str(),
            briefing.as_str(),
            question.trim()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> InstructionTemplate {
        InstructionTemplate::from_text("You are a crisis advisor.").unwrap()
    }

    #[test]
    fn report_prompt_layout() {
        let template = template();
        let prompt = PromptBuilder::new(&template).report(&Briefing::new("Factory fire at dawn."));
        assert_eq!(
            prompt,
            format!(
                "You are a crisis advisor.\n\nContext and scenarios:\nFactory fire at dawn.\n\n{REPORT_DIRECTIVE}\n"
            )
        );
    }

    #[test]
    fn question_prompt_layout() {
        let template = template();
        let prompt = PromptBuilder::new(&template)
            .question(&Briefing::new("Data leak."), "  Who speaks first?\n");
        assert_eq!(
            prompt,
            "You are a crisis advisor.\n\nBriefing:\nData leak.\n\nQuestion:\nWho speaks first?\n"
        );
    }

    #[test]
    fn question_without_briefing_keeps_section() {
        let template = template();
        let prompt = PromptBuilder::new(&template).question(&Briefing::default(), "Next steps?");
        assert!(prompt.contains("Briefing:\n\n\nQuestion:\nNext steps?"));
    }
}
