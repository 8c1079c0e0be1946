//! Signal-level acoustics: directivity, octave filtering, convolution and
//! room acoustic metrics.

pub mod convolve;
pub mod filters;
pub mod metrics;
pub mod source;
