//! Device match rules and the ordered rule set used to pick a channel map
//! for a connected device.


use glob_match::glob_match;

use crate::config::{
    ConditionConfig, ConditionFieldsConfig, DeviceRulesConfig, LoadError, MatchConfig,
    RuleConfig, BUILTIN_RULES_JSON,
};
use crate::decode::{ChannelDefinition, ChannelMap};
use crate::hid::HidDescriptor;

/// Version of the device rules document format this build understands
const SUPPORTED_VERSION: u32 = 1;

/// A single validated match condition. Vendor and product ids match
/// exactly; the string fields are glob patterns. Every field that is
/// present must match; absent fields are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Condition {
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
}

impl Condition {
    /// Returns whether the condition holds for the given descriptor
    pub fn matches(&self, descriptor: &HidDescriptor) -> bool {
        if let Some(vid) = self.vid {
            if descriptor.vid != vid {
                return false;
            }
        }
        if let Some(pid) = self.pid {
            if descriptor.pid != pid {
                return false;
            }
        }
        let globs = [
            (&self.manufacturer, &descriptor.manufacturer),
            (&self.product, &descriptor.product),
            (&self.serial_number, &descriptor.serial_number),
        ];
        for (pattern, value) in globs {
            if let Some(pattern) = pattern {
                if !glob_match(pattern.as_str(), value.as_str()) {
                    return false;
                }
            }
        }

        true
    }
}

impl TryFrom<&ConditionConfig> for Condition {
    type Error = LoadError;

    fn try_from(config: &ConditionConfig) -> Result<Self, Self::Error> {
        match config {
            // A bare string is shorthand for a product name pattern
            ConditionConfig::Product(product) => Ok(Self {
                product: Some(product.clone()),
                ..Default::default()
            }),
            ConditionConfig::Fields(fields) => Self::try_from(fields),
        }
    }
}

impl TryFrom<&ConditionFieldsConfig> for Condition {
    type Error = LoadError;

    fn try_from(fields: &ConditionFieldsConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            vid: fields.vid.as_ref().map(|id| id.as_u16()).transpose()?,
            pid: fields.pid.as_ref().map(|id| id.as_u16()).transpose()?,
            manufacturer: fields.manufacturer.clone(),
            product: fields.product.clone(),
            serial_number: fields.serial_number.clone(),
        })
    }
}

/// A single entry that describes a device family and the mapping from its
/// HID reports to remote-control channels. The rule applies when at least
/// one of its conditions matches; a rule with no conditions never matches.
#[derive(Debug, Clone)]
pub struct Rule {
    conditions: Vec<Condition>,
    channels: ChannelMap,
}

impl Rule {
    pub fn new(conditions: Vec<Condition>, channels: ChannelMap) -> Self {
        Self {
            conditions,
            channels,
        }
    }

    /// Returns whether the rule matches the given HID descriptor
    pub fn matches(&self, descriptor: &HidDescriptor) -> bool {
        self.conditions
            .iter()
            .any(|condition| condition.matches(descriptor))
    }

    /// The channel map to apply to reports from a matched device
    pub fn channels(&self) -> &[ChannelDefinition] {
        &self.channels
    }
}

impl TryFrom<&RuleConfig> for Rule {
    type Error = LoadError;

    fn try_from(config: &RuleConfig) -> Result<Self, Self::Error> {
        let conditions = match config.matches.as_ref() {
            None => Vec::new(),
            Some(MatchConfig::Single(condition)) => vec![Condition::try_from(condition)?],
            Some(MatchConfig::Multiple(conditions)) => conditions
                .iter()
                .map(Condition::try_from)
                .collect::<Result<Vec<_>, _>>()?,
        };

        let channels = config
            .controls
            .iter()
            .map(ChannelDefinition::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(conditions, channels))
    }
}

/// Ordered list of device rules with first-match-wins semantics. Built-in
/// rules can be extended or overridden by externally supplied documents;
/// prepended documents take priority over everything loaded before them.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Creates an empty rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a rule set pre-populated with the bundled device rules
    pub fn with_builtins() -> Result<Self, LoadError> {
        let config = DeviceRulesConfig::from_json(BUILTIN_RULES_JSON)?;
        let mut rules = Self::new();
        rules.extend_from_config(&config, false)?;
        Ok(rules)
    }

    /// Adds the given rule to the end of the rule set
    pub fn append(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Adds the given rule to the start of the rule set
    pub fn prepend(&mut self, rule: Rule) {
        self.rules.insert(0, rule);
    }

    /// Removes all rules from the rule set
    pub fn clear(&mut self) {
        self.rules.clear();
    }

    /// Extends the rule set from a parsed rules document. The whole
    /// document is validated before anything is added, so a malformed rule
    /// leaves the existing rule set untouched. Prepended rules are inserted
    /// as a block, keeping their relative document order, ahead of all
    /// previously loaded rules. Returns the number of rules added.
    pub fn extend_from_config(
        &mut self,
        config: &DeviceRulesConfig,
        prepend: bool,
    ) -> Result<usize, LoadError> {
        if config.version != SUPPORTED_VERSION {
            return Err(LoadError::UnsupportedVersion(config.version));
        }

        let rules = config
            .rules
            .iter()
            .map(Rule::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let count = rules.len();
        if prepend {
            self.rules.splice(0..0, rules);
        } else {
            self.rules.extend(rules);
        }

        Ok(count)
    }

    /// Returns the first rule that matches the given HID descriptor
    pub fn match_descriptor(&self, descriptor: &HidDescriptor) -> Option<&Rule> {
        self.rules.iter().find(|rule| {
            let matched = rule.matches(descriptor);
            log::trace!(
                "Checking {:04x}:{:04x} against rule {rule:?}: {matched}",
                descriptor.vid,
                descriptor.pid
            );
            matched
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }
}
