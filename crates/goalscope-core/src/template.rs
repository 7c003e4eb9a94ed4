use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ai::TemplateRequest;
use crate::error::ValidationError;
use crate::goal::DeadlineBucket;

/// Preset goal kinds the assistant can draft a whole goal from. The wire
/// value is the label itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalTemplate {
    #[serde(rename = "Похудеть")]
    LoseWeight,
    #[serde(rename = "Заработать")]
    EarnMoney,
    #[serde(rename = "Купить ценную вещь")]
    BuyValuable,
    #[serde(rename = "Путешествие")]
    Travel,
    #[serde(rename = "Изучить что то новое")]
    LearnSomethingNew,
}

impl GoalTemplate {
    pub const ALL: &[GoalTemplate] = &[
        GoalTemplate::LoseWeight,
        GoalTemplate::EarnMoney,
        GoalTemplate::BuyValuable,
        GoalTemplate::Travel,
        GoalTemplate::LearnSomethingNew,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            GoalTemplate::LoseWeight => "Похудеть",
            GoalTemplate::EarnMoney => "Заработать",
            GoalTemplate::BuyValuable => "Купить ценную вещь",
            GoalTemplate::Travel => "Путешествие",
            GoalTemplate::LearnSomethingNew => "Изучить что то новое",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.label() == label)
    }

    /// Cycle through "no template" and each template in turn.
    pub fn cycle(current: Option<Self>) -> Option<Self> {
        match current {
            None => Some(Self::ALL[0]),
            Some(t) => {
                let pos = Self::ALL.iter().position(|x| *x == t).unwrap_or(0);
                Self::ALL.get(pos + 1).copied()
            }
        }
    }
}

impl fmt::Display for GoalTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pending state of the "generate goal from template" action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateGeneration {
    generating: bool,
    has_generated: bool,
}

impl TemplateGeneration {
    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn has_generated(&self) -> bool {
        self.has_generated
    }

    pub fn begin(
        &mut self,
        template: Option<GoalTemplate>,
        bucket: DeadlineBucket,
        short_description: &str,
    ) -> Result<TemplateRequest, ValidationError> {
        let template = template.ok_or(ValidationError::NoTemplate)?;
        if self.generating {
            return Err(ValidationError::AlreadyPending("template generation"));
        }
        self.generating = true;
        let short_description = short_description.trim();
        Ok(TemplateRequest {
            template,
            deadline: bucket.hint().to_string(),
            short_description: (!short_description.is_empty())
                .then(|| short_description.to_string()),
        })
    }

    pub fn succeeded(&mut self) {
        self.generating = false;
        self.has_generated = true;
    }

    pub fn failed(&mut self) {
        self.generating = false;
    }

    pub fn button_label(&self) -> &'static str {
        if self.generating {
            "Generating..."
        } else if self.has_generated {
            "Generate again"
        } else {
            "Generate goal"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_value_is_label() {
        for template in GoalTemplate::ALL {
            let json = serde_json::to_string(template).unwrap();
            assert_eq!(json, format!("\"{}\"", template.label()));
            assert_eq!(GoalTemplate::from_label(template.label()), Some(*template));
        }
    }

    #[test]
    fn cycle_visits_all_then_none() {
        let mut current = None;
        let mut seen = Vec::new();
        loop {
            current = GoalTemplate::cycle(current);
            match current {
                Some(t) => seen.push(t),
                None => break,
            }
        }
        assert_eq!(seen, GoalTemplate::ALL);
    }

    #[test]
    fn begin_requires_template_and_blocks_repeats() {
        let mut flow = TemplateGeneration::default();
        assert_eq!(
            flow.begin(None, DeadlineBucket::SixMonths, ""),
            Err(ValidationError::NoTemplate)
        );
        let req = flow
            .begin(Some(GoalTemplate::Travel), DeadlineBucket::SixMonths, "  ")
            .unwrap();
        assert_eq!(req.deadline, "6 месяцев");
        assert_eq!(req.short_description, None);
        assert_eq!(flow.button_label(), "Generating...");
        assert!(flow
            .begin(Some(GoalTemplate::Travel), DeadlineBucket::SixMonths, "")
            .is_err());
        flow.failed();
        assert_eq!(flow.button_label(), "Generate goal");
        flow.begin(Some(GoalTemplate::Travel), DeadlineBucket::SixMonths, "Japan")
            .unwrap();
        flow.succeeded();
        assert_eq!(flow.button_label(), "Generate again");
    }
}
