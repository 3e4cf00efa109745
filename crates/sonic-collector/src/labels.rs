use regex::Regex;

use crate::scanner::KeyRecord;

pub const DEFAULT_SLOT: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLabels {
    pub slot: String,
    pub name: String,
}

/// One strategy for deriving labels from a record.
#[derive(Debug, Clone)]
pub enum LabelRule {
    /// Named groups `slot` and/or `name` matched against the key.
    RegexMatch(Regex),
    /// The `index`th segment of the key becomes the name; slot stays default.
    PositionalSplit { separator: char, index: usize },
    /// A field that supersedes the derived slot unless it holds `placeholder`.
    FieldOverride {
        field: &'static str,
        placeholder: &'static str,
    },
}

impl LabelRule {
    fn is_structural(&self) -> bool {
        !matches!(self, Self::FieldOverride { .. })
    }
}

/// Ordered label rules. Structural rules are tried in order and the first
/// one that matches wins; field overrides are then applied in order.
#[derive(Debug, Clone, Default)]
pub struct LabelChain {
    rules: Vec<LabelRule>,
}

impl LabelChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regex(mut self, regex: Regex) -> Self {
        self.rules.push(LabelRule::RegexMatch(regex));
        self
    }

    pub fn split(mut self, separator: char, index: usize) -> Self {
        self.rules.push(LabelRule::PositionalSplit { separator, index });
        self
    }

    pub fn field_override(mut self, field: &'static str, placeholder: &'static str) -> Self {
        self.rules.push(LabelRule::FieldOverride { field, placeholder });
        self
    }

    pub fn extract(&self, record: &KeyRecord) -> ExtractedLabels {
        let mut labels = self
            .rules
            .iter()
            .filter(|rule| rule.is_structural())
            .find_map(|rule| apply_structural(rule, &record.key))
            .unwrap_or_else(|| ExtractedLabels {
                slot: DEFAULT_SLOT.to_string(),
                name: record.key.clone(),
            });

        for rule in &self.rules {
            if let LabelRule::FieldOverride { field, placeholder } = rule
                && let Some(value) = record.field(field)
                && value != *placeholder
            {
                labels.slot = value.to_string();
            }
        }

        labels
    }
}

fn apply_structural(rule: &LabelRule, key: &str) -> Option<ExtractedLabels> {
    match rule {
        LabelRule::RegexMatch(regex) => {
            let captures = regex.captures(key)?;
            let slot = captures.name("slot").map(|group| group.as_str());
            let name = captures.name("name").map(|group| group.as_str());
            if slot.is_none() && name.is_none() {
                return None;
            }

            Some(ExtractedLabels {
                slot: slot.unwrap_or(DEFAULT_SLOT).to_string(),
                name: name.or(slot).unwrap_or_default().to_string(),
            })
        }
        LabelRule::PositionalSplit { separator, index } => {
            key.split(*separator)
                .nth(*index)
                .map(|segment| ExtractedLabels {
                    slot: DEFAULT_SLOT.to_string(),
                    name: segment.to_string(),
                })
        }
        LabelRule::FieldOverride { .. } => None,
    }
}
