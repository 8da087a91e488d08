//! Rendering: side panel, top bar, metric header and the three tabs.

pub mod panels;
pub mod plot;
pub mod scatter;
