//! Data layer: sheets, spectra, samples and the background model.
//!
//! Architecture:
//! ```text
//!  measurement sheet (.csv / .json)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ locator  │  column A → LabelBlock (label, markers, data rows)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ builder  │  block cells → Spectrum (vector extraction per row)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌────────────┐
//!   │ collection │  (plate, well) → Sample, attach spectrum
//!   └────────────┘
//!        │
//!        ▼
//!   ┌────────────┐
//!   │ background │  blank mean / gain-interpolated baselines → corrected
//!   └────────────┘
//! ```

pub mod background;
pub mod builder;
pub mod collection;
pub mod filter;
pub mod loader;
pub mod locator;
pub mod model;
pub mod sheet;
pub mod vector;
