//! Configuration for the Kifi background page.
//!
//! Two layers live here:
//!
//! - [`ConfigStore`] reads and writes the user-facing [`Config`] record in a
//!   [`KeyValueStore`](kifi_store::KeyValueStore), namespacing every key by the
//!   active [`Env`](kifi_types::Env). Reads never fail; a missing or corrupt
//!   field falls back to its own default.
//! - [`BackgroundSettings`] holds process-level knobs (extension version,
//!   flush timing, popup geometry, script manifest) loaded from TOML.

pub mod config;
pub mod error;
pub mod parse;
pub mod settings;
pub mod store;

pub use config::{keys, Config};
pub use error::{ConfigError, ConfigResult};
pub use parse::{parse_bool_or, parse_json_obj_or, parse_non_neg_int_or};
pub use settings::{BackgroundSettings, MagicQuery, PopupGeometry, ScriptManifest};
pub use store::ConfigStore;
