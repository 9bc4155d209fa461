pub mod intent;
pub mod synth;
