use std::collections::HashSet;
use std::ffi::CString;

use crate::config::DeviceRulesConfig;
use crate::rules::RuleSet;

use super::scanner::find_supported;
use super::HidDescriptor;

fn descriptor(product: &str) -> HidDescriptor {
    HidDescriptor {
        path: CString::new("/dev/hidraw3").unwrap(),
        vid: 0x045e,
        pid: 0x02ea,
        manufacturer: "Microsoft".to_string(),
        product: product.to_string(),
        serial_number: "0123".to_string(),
    }
}

fn ruleset(json: &str) -> RuleSet {
    let config = DeviceRulesConfig::from_json(json).unwrap();
    let mut rules = RuleSet::new();
    rules.extend_from_config(&config, false).unwrap();
    rules
}

#[test]
fn test_descriptor_value_equality() {
    // A device that shows up once per usage entry produces identical
    // descriptors, which deduplicate to a single candidate
    let mut seen = HashSet::new();
    seen.insert(descriptor("Xbox One Controller"));
    seen.insert(descriptor("Xbox One Controller"));
    assert_eq!(seen.len(), 1);

    seen.insert(descriptor("Xbox Elite Controller"));
    assert_eq!(seen.len(), 2);
}

#[test]
fn test_descriptor_display() {
    assert_eq!(
        descriptor("Xbox One Controller").to_string(),
        "Microsoft Xbox One Controller (S/N: 0123)"
    );

    let anonymous = HidDescriptor {
        path: CString::new("/dev/hidraw0").unwrap(),
        vid: 0,
        pid: 0,
        manufacturer: String::new(),
        product: String::new(),
        serial_number: String::new(),
    };
    assert_eq!(anonymous.to_string(), "unknown HID device");
}

#[test]
fn test_find_supported_returns_first_match() {
    let rules = ruleset(
        r#"{ "version": 1, "rules": [
            { "match": "Xbox*", "controls": [ { "channel": 1, "type": "axis" } ] }
        ] }"#,
    );

    let devices = vec![
        descriptor("Some Keyboard"),
        descriptor("Xbox One Controller"),
        descriptor("Xbox Elite Controller"),
    ];
    let (device, channel_map) = find_supported(&rules, devices.into_iter()).unwrap();
    assert_eq!(device.product, "Xbox One Controller");
    assert_eq!(channel_map.len(), 1);
}

#[test]
fn test_find_supported_deduplicates_descriptors() {
    let rules = ruleset(
        r#"{ "version": 1, "rules": [
            { "match": "Xbox*", "controls": [ { "channel": 1, "type": "axis" } ] }
        ] }"#,
    );

    // The same device listed under two usage entries
    let devices = vec![
        descriptor("Xbox One Controller"),
        descriptor("Xbox One Controller"),
    ];
    assert!(find_supported(&rules, devices.into_iter()).is_some());
}

#[test]
fn test_find_supported_without_match() {
    let rules = ruleset(r#"{ "version": 1, "rules": [] }"#);
    let devices = vec![descriptor("Xbox One Controller")];
    assert!(find_supported(&rules, devices.into_iter()).is_none());
}
