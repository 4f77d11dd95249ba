pub mod hands_up;

pub use hands_up::{ArmCosines, ArmPoints, GestureError, HandsUpClassifier};
