//! Anatomy - template and root resolution for studio pipelines
//!
//! This library turns studio-configurable path and name templates plus
//! per-call context data into concrete, validated, re-rootable strings.
//! Templates support bracket-path placeholders (`{project[name]}`), padding
//! specs (`{frame:0>4}`), optional groups (`<_{comment}>`) elided when their
//! data is absent, and load-time inner references (`{@key}`) between
//! template keys. Root prefixes are defined per platform and can be
//! stripped, filled and remapped independently of template resolution.
//!
//! # Example
//!
//! ```rust
//! use anatomy::{Anatomy, AnatomyConfig, Context, Platform, Value};
//!
//! let config = AnatomyConfig::from_str(r#"
//!     [roots.work]
//!     windows = "P:/proj"
//!     linux = "/mnt/proj"
//!
//!     [templates.work]
//!     folder = "{root[work]}/{project[name]}"
//! "#).unwrap();
//!
//! let anatomy = Anatomy::with_platform(config, Platform::Windows).unwrap();
//! let context = Context::new().with("project", Value::map([("name", Value::from("demo"))]));
//!
//! let resolved = anatomy.resolve_all(&context);
//! let folder = resolved.template(&["work", "folder"]).unwrap();
//! assert_eq!(folder.text(), "P:/proj/demo");
//! assert_eq!(folder.rootless_text(), "{root[work]}/demo");
//! ```

pub mod anatomy;
pub mod config;
pub mod context;
pub mod error;
pub mod parser;
pub mod roots;
pub mod template;

pub use anatomy::Anatomy;
pub use config::AnatomyConfig;
pub use context::{Context, Value};
pub use error::{AnatomyError, ConfigError, TemplateParseError};
pub use roots::{Platform, RootItem, RootTree, ROOT_ENV_PREFIX};
pub use template::{
    ResolvedNode, ResolvedTemplate, ResolvedTree, TemplateEntry, TemplateString, TemplateTree,
};
