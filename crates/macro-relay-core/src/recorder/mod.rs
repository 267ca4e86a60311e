mod options;
#[allow(clippy::module_inception)]
mod recorder;

pub use {
    options::RecorderOptions,
    recorder::{Recorder, RecorderChannel, RecorderStatus},
};
