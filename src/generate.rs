use std::fs::File;
use std::io::Write;

use rcpad::config::DeviceRulesConfig;
use schemars::schema_for;

fn main() {
    let device_rules_schema = schema_for!(DeviceRulesConfig);
    std::fs::create_dir_all("./rootfs/usr/share/rcpad/schema")
        .expect("Failed to create schema directory");
    let mut file = File::create("./rootfs/usr/share/rcpad/schema/device_rules_v1.json")
        .expect("Failed to create schema file");
    write!(
        file,
        "{}",
        serde_json::to_string_pretty(&device_rules_schema).unwrap()
    )
    .expect("Failed to write schema");
}
