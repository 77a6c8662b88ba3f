mod common;

use common::{context_720p, flat_stats, grid_720p};
use iris_core::algorithms::awb::Awb;
use iris_core::algorithms::Algorithm;
use iris_core::tuning::Tuning;

fn configured_awb() -> (Awb, iris_core::context::IpaContext) {
    let mut awb = Awb::new();
    let mut context = context_720p();
    awb.configure(&mut context, &Tuning::default()).unwrap();
    (awb, context)
}

#[test]
fn red_cast_scene_yields_grey_world_gains() {
    let (mut awb, mut context) = configured_awb();
    let stats = flat_stats(&grid_720p(), 200, 100, 50);

    awb.process(&mut context, &stats);

    assert!((context.awb.red_gain - 0.5).abs() < 1e-6);
    assert!((context.awb.blue_gain - 2.0).abs() < 1e-6);
    assert_eq!(context.awb.green_gain, 1.0);
    let cct = context.awb.temperature_k;
    assert!(
        (1000.0..3500.0).contains(&cct),
        "red cast should read warm, got {cct}K"
    );
}

#[test]
fn grey_scene_yields_unity_gains() {
    let (mut awb, mut context) = configured_awb();
    let stats = flat_stats(&grid_720p(), 128, 128, 128);

    awb.process(&mut context, &stats);

    assert!((context.awb.red_gain - 1.0).abs() < 1e-6);
    assert!((context.awb.blue_gain - 1.0).abs() < 1e-6);
}

#[test]
fn too_few_valid_zones_keep_previous_result() {
    let (mut awb, mut context) = configured_awb();

    let stats = flat_stats(&grid_720p(), 200, 100, 50);
    awb.process(&mut context, &stats);
    let before = context.awb;

    // Green below the zone floor invalidates every zone.
    let dark = flat_stats(&grid_720p(), 200, 8, 50);
    awb.process(&mut context, &dark);

    assert_eq!(context.awb.red_gain, before.red_gain);
    assert_eq!(context.awb.blue_gain, before.blue_gain);
    assert_eq!(context.awb.temperature_k, before.temperature_k);
}

#[test]
fn zero_channel_clamps_to_maximum_gain() {
    let (mut awb, mut context) = configured_awb();
    let stats = flat_stats(&grid_720p(), 0, 100, 0);

    awb.process(&mut context, &stats);

    assert_eq!(context.awb.red_gain, 8.0);
    assert_eq!(context.awb.blue_gain, 8.0);
}

#[test]
fn gains_stay_inside_hardware_range() {
    let (mut awb, mut context) = configured_awb();
    // Extremely red and bright relative to green.
    let stats = flat_stats(&grid_720p(), 255, 16, 255);

    awb.process(&mut context, &stats);

    assert!(context.awb.red_gain >= 0.125);
    assert!(context.awb.blue_gain >= 0.125);
    assert!(context.awb.red_gain <= 8.0);
    assert!(context.awb.blue_gain <= 8.0);
}

#[test]
fn disabled_awb_keeps_previous_gains() {
    let (mut awb, mut context) = configured_awb();
    context.frame.awb_enable = false;

    let stats = flat_stats(&grid_720p(), 200, 100, 50);
    awb.process(&mut context, &stats);

    assert_eq!(context.awb.red_gain, 1.0);
    assert_eq!(context.awb.blue_gain, 1.0);
}

#[test]
fn manual_colour_gains_pause_the_algorithm() {
    let (mut awb, mut context) = configured_awb();
    context.frame.manual_colour_gains = Some((1.8, 1.2));

    let stats = flat_stats(&grid_720p(), 200, 100, 50);
    awb.process(&mut context, &stats);

    // The algorithm result is untouched; the assembler applies the
    // manual gains directly.
    assert_eq!(context.awb.red_gain, 1.0);
    assert_eq!(context.awb.blue_gain, 1.0);
}
