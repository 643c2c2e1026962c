/// Data layer: core types and file loading.
///
/// Architecture:
/// ```text
///  BPASS outputs (hrs-*, spectra-*, numbers-*, ...)     observations (.csv / .json / .parquet)
///        │                                                     │
///        ▼                                                     ▼
///   ┌──────────┐                                        ┌──────────────┐
///   │  loader   │  parse file → ModelOutput              │ observations  │  parse → ObservationTable
///   └──────────┘                                        └──────────────┘
///        │                                                     │
///        ▼                                                     ▼
///   HrDiagram / Spectra / OutputTable  ─────────►  age fitting (crate::age)
/// ```

pub mod loader;
pub mod model;
pub mod observations;
