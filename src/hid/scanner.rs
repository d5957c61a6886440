//! Scans the USB bus for HID devices that match the loaded device rules.

use std::collections::HashSet;
use std::error::Error;
use std::sync::Arc;

use hidapi::HidApi;

use crate::decode::ChannelMap;
use crate::hid::{HidDescriptor, GENERIC_USAGE_PAGES};
use crate::rules::RuleSet;

/// Scans connected HID devices for the first one covered by the rule set
pub struct Scanner {
    rules: Arc<RuleSet>,
}

impl Scanner {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    /// The rule set used to decide whether a device is supported
    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    /// Enumerates connected HID devices and returns the first one that
    /// matches a rule, together with the channel map of that rule. The
    /// blocking enumeration runs on a worker thread so it cannot stall the
    /// scheduler; it has no side effects, so cancelling it is safe.
    pub async fn scan(
        &self,
    ) -> Result<Option<(HidDescriptor, ChannelMap)>, Box<dyn Error + Send + Sync>> {
        let rules = self.rules.clone();
        let result = tokio::task::spawn_blocking(move || scan_blocking(&rules)).await??;
        Ok(result)
    }
}

/// Blocking core of [Scanner::scan]
fn scan_blocking(
    rules: &RuleSet,
) -> Result<Option<(HidDescriptor, ChannelMap)>, hidapi::HidError> {
    let api = HidApi::new()?;
    let descriptors = api
        .device_list()
        .filter(|info| GENERIC_USAGE_PAGES.contains(&info.usage_page()))
        .map(HidDescriptor::from_device_info);

    Ok(find_supported(rules, descriptors))
}

/// Returns the first descriptor covered by the rule set, paired with the
/// channel map of the matching rule. A device may appear once per usage
/// entry, so descriptors are deduplicated within the pass.
pub fn find_supported(
    rules: &RuleSet,
    descriptors: impl Iterator<Item = HidDescriptor>,
) -> Option<(HidDescriptor, ChannelMap)> {
    let mut seen: HashSet<HidDescriptor> = HashSet::new();
    for descriptor in descriptors {
        if !seen.insert(descriptor.clone()) {
            continue;
        }

        if let Some(rule) = rules.match_descriptor(&descriptor) {
            log::debug!("Found supported device: {descriptor}");
            return Some((descriptor, rule.channels().to_vec()));
        }
    }

    None
}
