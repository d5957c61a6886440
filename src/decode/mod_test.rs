use serde_json::json;

use crate::config::ChannelConfig;

use super::{channel_count, ChannelDefinition, Scaler};

/// Builds a channel definition from its JSON document representation
fn definition(doc: serde_json::Value) -> ChannelDefinition {
    let config: ChannelConfig = serde_json::from_value(doc).unwrap();
    ChannelDefinition::try_from(&config).unwrap()
}

#[test]
fn test_scaler_interpolates_linearly() {
    let scaler = Scaler::new((0, 255), (0, 65535), false);
    assert_eq!(scaler.scale(0.0), 0.0);
    assert_eq!(scaler.scale(255.0), 65535.0);
    assert_eq!(scaler.scale(128.0), 32896.0);
}

#[test]
fn test_scaler_clamps_to_output_range() {
    let scaler = Scaler::new((0, 255), (0, 65535), false);
    assert_eq!(scaler.scale(-42.0), 0.0);
    assert_eq!(scaler.scale(300.0), 65535.0);

    let inverted = Scaler::new((0, 255), (0, 65535), true);
    assert_eq!(inverted.scale(-42.0), 65535.0);
    assert_eq!(inverted.scale(300.0), 0.0);
    assert_eq!(inverted.scale(0.0), 65535.0);
    assert_eq!(inverted.scale(255.0), 0.0);
}

#[test]
fn test_scaler_degenerate_input_range() {
    let scaler = Scaler::new((42, 42), (0, 65535), false);
    assert_eq!(scaler.scale(0.0), 0.0);
    assert_eq!(scaler.scale(42.0), 0.0);
    assert_eq!(scaler.scale(10000.0), 0.0);
}

#[test]
fn test_axis_decode() {
    let axis = definition(json!({ "channel": 1, "type": "axis", "offset": 0 }));
    let mut channels = vec![0];

    axis.update(&mut channels, &[0]);
    assert_eq!(channels[0], 0);
    axis.update(&mut channels, &[255]);
    assert_eq!(channels[0], 65535);
    axis.update(&mut channels, &[128]);
    assert_eq!(channels[0], 32896);
}

#[test]
fn test_signed_axis_decode() {
    // Identity ranges make the two's complement reinterpretation visible
    let axis = definition(json!({
        "channel": 1,
        "type": "axis",
        "offset": 0,
        "signed": true,
        "out_range": [-128, 127]
    }));
    let mut channels = vec![0];

    axis.update(&mut channels, &[0x80]);
    assert_eq!(channels[0], -128);
    axis.update(&mut channels, &[0x7F]);
    assert_eq!(channels[0], 127);
    axis.update(&mut channels, &[0x00]);
    assert_eq!(channels[0], 0);
}

#[test]
fn test_signed_axis_default_in_range() {
    let axis = definition(json!({
        "channel": 1,
        "type": "axis",
        "offset": 0,
        "signed": true
    }));
    let mut channels = vec![0];

    axis.update(&mut channels, &[0x80]);
    assert_eq!(channels[0], 0);
    axis.update(&mut channels, &[0x7F]);
    assert_eq!(channels[0], 65535);
}

#[test]
fn test_button_decode() {
    let button = definition(json!({ "channel": 1, "type": "button", "offset": 1, "bit": 3 }));
    let mut channels = vec![0];

    button.update(&mut channels, &[0x00, 0x08]);
    assert_eq!(channels[0], 65535);
    button.update(&mut channels, &[0x00, 0xF7]);
    assert_eq!(channels[0], 0);

    let inverted = definition(json!({
        "channel": 1,
        "type": "button",
        "offset": 1,
        "bit": 3,
        "invert": true
    }));
    inverted.update(&mut channels, &[0x00, 0x08]);
    assert_eq!(channels[0], 0);
}

#[test]
fn test_hat_decode() {
    let hat_y = definition(json!({ "channel": 1, "type": "hat", "offset": 0, "axis": "y" }));
    let mut channels = vec![1234];

    // North is the most negative y component
    hat_y.update(&mut channels, &[0]);
    assert_eq!(channels[0], 0);

    // South
    hat_y.update(&mut channels, &[4]);
    assert_eq!(channels[0], 65535);

    // East has no y component; the previous value stays
    channels[0] = 1234;
    hat_y.update(&mut channels, &[2]);
    assert_eq!(channels[0], 1234);

    // Released states leave the channel untouched
    hat_y.update(&mut channels, &[8]);
    assert_eq!(channels[0], 1234);
    hat_y.update(&mut channels, &[15]);
    assert_eq!(channels[0], 1234);
}

#[test]
fn test_hat_decode_bit_offset_and_invert() {
    let hat_x = definition(json!({
        "channel": 1,
        "type": "hat",
        "offset": 0,
        "bit": 4,
        "axis": "x",
        "invert": true
    }));
    let mut channels = vec![0];

    // Upper nibble holds the hat state; Northeast inverted points west
    hat_x.update(&mut channels, &[0x10]);
    assert_eq!(channels[0], 0);
    hat_x.update(&mut channels, &[0x50]);
    assert_eq!(channels[0], 65535);
}

#[test]
fn test_multi_button_decode() {
    let multi = definition(json!({
        "channel": 1,
        "type": "multibutton",
        "buttons": [
            { "offset": 0, "bit": 0, "value": 10 },
            { "offset": 0, "bit": 1, "value": 20 }
        ]
    }));
    let mut channels = vec![0];

    multi.update(&mut channels, &[0b10]);
    assert_eq!(channels[0], 20);

    // The first matching entry wins
    multi.update(&mut channels, &[0b11]);
    assert_eq!(channels[0], 10);

    // No match keeps the previous value
    multi.update(&mut channels, &[0b00]);
    assert_eq!(channels[0], 10);
}

#[test]
fn test_out_of_range_offset_is_skipped() {
    let axis = definition(json!({ "channel": 1, "type": "axis", "offset": 8 }));
    let mut channels = vec![1234];

    axis.update(&mut channels, &[0, 0, 0]);
    assert_eq!(channels[0], 1234);
}

#[test]
fn test_invalid_channel_index_is_rejected() {
    let config: ChannelConfig =
        serde_json::from_value(json!({ "channel": 0, "type": "axis" })).unwrap();
    assert!(ChannelDefinition::try_from(&config).is_err());
}

#[test]
fn test_invalid_bit_index_is_rejected() {
    let config: ChannelConfig =
        serde_json::from_value(json!({ "channel": 1, "type": "button", "bit": 8 })).unwrap();
    assert!(ChannelDefinition::try_from(&config).is_err());
}

#[test]
fn test_channel_count() {
    let map = vec![
        definition(json!({ "channel": 3, "type": "axis" })),
        definition(json!({ "channel": 1, "type": "axis" })),
    ];
    assert_eq!(channel_count(&map), 3);
    assert_eq!(channel_count(&Vec::new()), 0);
}
