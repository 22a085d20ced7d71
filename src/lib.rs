//! # WXR Convert
//!
//! Turns a WordPress eXtended RSS export into per-entity field maps: one
//! site record, the author directory, every post and page, and every
//! attachment.
//!
//! The conversion itself lives in [`wxr_convert_core`]; this crate adds the
//! configuration file, the JSON export and the `wxr` command line.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────────┐   ┌────────────┐
//! │ export.xml   │──▶│ wxr-convert-core   │──▶│  JsonSink  │──▶ export.json
//! │ + wxr.toml   │   │ walk, route, build │   │ (export)   │
//! └──────────────┘   └─────────┬──────────┘   └────────────┘
//!                              ▼
//!                     summary + diagnostics
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! wxr config > wxr.toml                  # start from the defaults
//! wxr check export.xml                   # summary and diagnostics only
//! wxr convert export.xml -o export.json  # write the JSON export
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`convert`] | `convert` and `check` commands |
//! | [`export`] | JSON sink for converted entities |

pub mod config;
pub mod convert;
pub mod export;
