//! # Generator Module
//!
//! Turns a loaded [`Spec`](crate::spec::Spec) into a layered Python backend:
//! SQLAlchemy models, Pydantic schemas, CRUD services and FastAPI routers.
//!
//! ## Architecture
//!
//! ```text
//! Spec IR → Naming & Type Mapping → Template Rendering → Output Writer
//! ```
//!
//! 1. **Naming & Type Mapping** (`schema`) - snake/title casing, enum
//!    symbols, Python type hints and SQLAlchemy column expressions
//! 2. **Template Rendering** (`templates`) - one Askama template per
//!    artifact kind, rendered from plain view structs
//! 3. **Output Writer** (`writer`) - marker-aware writes with dry-run
//! 4. **Safe Regeneration** (`clean`) - deletes only what a previous run
//!    of the same spec produced
//!
//! [`generate`] drives all of it.
//!
//! ## Generated Structure
//!
//! With the default configuration:
//!
//! ```text
//! app/
//! ├── enums/enums.py                  # every spec enum
//! ├── models/
//! │   ├── _gen_mixins.py              # IdMixin, TimeMixin, SoftDeleteMixin
//! │   └── {module}/{stem}.py          # one model per entity
//! ├── schemas/
//! │   ├── _gen_common.py              # PageQuery, PageResult, IdsReq
//! │   └── {module}/{stem}.py
//! ├── services/
//! │   ├── _gen_base.py                # CRUDService, ServiceExtension
//! │   └── {module}/{stem}_service.py
//! └── api/
//!     ├── _gen_perm.py                # permission matching
//!     ├── router.py                   # aggregate router
//!     └── {module}/{stem}.py
//! ```
//!
//! Every generated file starts with [`GENERATED_MARKER`]; every per-module
//! directory carries a [`DIR_MARKER`] naming the spec it was generated from.
//!
//! ## Templates
//!
//! Templates live in the crate's `templates/` directory and are compiled in
//! by Askama:
//!
//! - `model.py.txt`, `schema.py.txt`, `service.py.txt`, `api.py.txt` - per entity
//! - `service_impl.py.txt` - user-owned extension scaffold
//! - `enums.py.txt`, `mixins.py.txt`, `common.py.txt`, `service_base.py.txt`,
//!   `perm.py.txt`, `router.py.txt` - shared

mod clean;
mod order;
mod project;
mod schema;
mod templates;
mod writer;

pub use clean::*;
pub use order::*;
pub use project::*;
pub use schema::*;
pub use templates::*;
pub use writer::*;
