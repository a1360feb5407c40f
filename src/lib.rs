//! # crudgen
//!
//! **crudgen** is a spec-driven CRUD code generator. It reads a JSON entity
//! spec and writes a layered Python backend: SQLAlchemy models, Pydantic
//! schemas, CRUD services and FastAPI routers, plus one aggregate router the
//! host application mounts.
//!
//! ## Architecture
//!
//! - **[`spec`]** - spec loading, normalization and validation into an immutable IR
//! - **[`config`]** - output layout, import targets and route templates
//! - **[`generator`]** - naming, type mapping, template rendering, safe regeneration
//! - **[`permission`]** - permission matching rules shared with the generated guard
//! - **[`cli`]** - the `crudgen` command-line surface
//! - **[`logging`]** - `tracing` subscriber setup
//!
//! ### Generation Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant User
//!     participant CLI as CLI<br/>(crudgen)
//!     participant Spec as spec::load_spec
//!     participant Config as config::GenConfig
//!     participant Gen as generator::generate
//!     participant FS as File System
//!
//!     User->>CLI: crudgen --spec shop.json
//!     CLI->>Config: GenConfig::load(--config)
//!     CLI->>Spec: load_spec("shop.json")
//!     Spec-->>CLI: Spec (validated)
//!     CLI->>Gen: generate(&spec, &config, &opts)
//!     Gen->>Gen: resolve import targets
//!     opt --clean
//!         Gen->>FS: remove this spec's generated files
//!     end
//!     Gen->>FS: shared files (enums, mixins, common, base, perm)
//!     Gen->>FS: per entity: model, schema, service, api
//!     Gen->>FS: aggregate router
//!     Gen-->>CLI: GenerationReport
//!     CLI-->>User: Codegen done. + mount import
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crudgen::{generate, load_spec, GenConfig, GenerateOptions};
//! use std::path::PathBuf;
//!
//! let spec = load_spec("specs/shop.json".as_ref())?;
//! let report = generate(
//!     &spec,
//!     &GenConfig::default(),
//!     &GenerateOptions {
//!         root: PathBuf::from("backend"),
//!         spec_path: PathBuf::from("specs/shop.json"),
//!         clean: false,
//!         dry_run: false,
//!     },
//! )?;
//! println!("{}", report.mount_import);
//! ```
//!
//! ## Ownership Rules
//!
//! Generated files start with `# generated - DO NOT EDIT`. Files without that
//! line are never overwritten or deleted, so hand-written service extensions
//! and customized package `__init__.py` files survive every regeneration.

pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod logging;
pub mod permission;
pub mod spec;

pub use config::GenConfig;
pub use error::{GenError, Result};
pub use generator::{generate, GenerateOptions, GenerationReport};
pub use spec::{load_spec, parse_spec, Spec};
