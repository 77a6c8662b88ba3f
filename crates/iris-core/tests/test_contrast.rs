mod common;

use common::{context_720p, flat_stats, grid_720p};
use iris_core::algorithms::contrast::{Contrast, GAMMA_MAX, GAMMA_MIN};
use iris_core::algorithms::Algorithm;
use iris_core::tuning::Tuning;

fn configured_contrast() -> (Contrast, iris_core::context::IpaContext) {
    let mut contrast = Contrast::new();
    let mut context = context_720p();
    contrast.configure(&mut context, &Tuning::default()).unwrap();
    (contrast, context)
}

#[test]
fn configure_publishes_the_tuned_gamma() {
    let (_, context) = configured_contrast();
    assert_eq!(context.gamma, 1.1);
}

#[test]
fn scene_gamma_flows_into_the_published_exponent() {
    let (mut contrast, mut context) = configured_contrast();
    let stats = flat_stats(&grid_720p(), 60, 60, 60);

    context.agc.scene_gamma = Some(1.25);
    contrast.process(&mut context, &stats);
    assert_eq!(context.gamma, 1.25);

    // The next parameter fill sees the same exponent.
    context.gamma = 0.0;
    contrast.prepare(&mut context);
    assert_eq!(context.gamma, 1.25);
}

#[test]
fn scene_gamma_is_clamped_to_the_supported_band() {
    let (mut contrast, mut context) = configured_contrast();
    let stats = flat_stats(&grid_720p(), 60, 60, 60);

    context.agc.scene_gamma = Some(3.0);
    contrast.process(&mut context, &stats);
    assert_eq!(context.gamma, GAMMA_MAX);

    context.agc.scene_gamma = Some(0.5);
    contrast.process(&mut context, &stats);
    assert_eq!(context.gamma, GAMMA_MIN);
}

#[test]
fn without_a_suggestion_the_tuned_value_stays() {
    let (mut contrast, mut context) = configured_contrast();
    let stats = flat_stats(&grid_720p(), 60, 60, 60);

    context.agc.scene_gamma = None;
    contrast.process(&mut context, &stats);
    assert_eq!(context.gamma, 1.1);
}

#[test]
fn lut_tracks_the_exponent() {
    let linear = Contrast::lut(1.0);
    let lifted = Contrast::lut(1.4);
    assert_eq!(linear[0], 0);
    assert_eq!(linear[255], 8191);
    assert!(lifted[128] > linear[128]);
}
