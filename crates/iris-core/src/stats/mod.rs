//! Conversion of raw ISP statistics into canonical analysis forms.

pub mod grid;
pub mod histogram;
pub mod zones;
