//! Report renderers for scored organizations.
//!
//! - [`terminal`] prints the run summary as colored tables; respects `--verbose` / `--quiet`.
//! - [`pdf`] writes one two-page document per company, with a bar chart from [`chart`].

pub mod chart;
pub mod pdf;
pub mod terminal;
