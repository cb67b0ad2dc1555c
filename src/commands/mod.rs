//! Control-facing command handlers
//!
//! Each mounted recording control holds one [`ObserverBinding`]. It is the
//! only surface UI code needs: it derives the control's view from the
//! coordinator's notices and forwards user intent back to it.

pub mod recording;

pub use recording::{BindingView, ObserverBinding};
