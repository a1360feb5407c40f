use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::clean::{apply_clean, plan_clean};
use super::templates::{
    render_api, render_common, render_enums, render_mixins, render_model, render_perm,
    render_router, render_schema, render_service, render_service_base, render_service_impl,
    RouterMount,
};
use super::writer::{OutputWriter, WriteOutcome};
use crate::config::GenConfig;
use crate::error::Result;
use crate::spec::{EntityDef, Spec};

pub const ENUMS_FILE: &str = "enums.py";
pub const MIXINS_FILE: &str = "_gen_mixins.py";
pub const COMMON_FILE: &str = "_gen_common.py";
pub const SERVICE_BASE_FILE: &str = "_gen_base.py";
pub const PERM_FILE: &str = "_gen_perm.py";
pub const ROUTER_FILE: &str = "router.py";

/// Where every artifact lands on disk and which Python module path it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub app_dir: PathBuf,
    pub enums_dir: PathBuf,
    pub models_dir: PathBuf,
    pub schemas_dir: PathBuf,
    pub services_dir: PathBuf,
    pub api_dir: PathBuf,
    pub enums_pkg: String,
    pub models_pkg: String,
    pub schemas_pkg: String,
    pub services_pkg: String,
    pub api_pkg: String,
}

/// Output paths of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFiles {
    pub model: PathBuf,
    pub schema: PathBuf,
    pub service: PathBuf,
    pub service_impl: PathBuf,
    pub api: PathBuf,
}

impl OutputLayout {
    pub fn new(root: &Path, config: &GenConfig) -> Self {
        let app_dir = root.join(&config.app_dir);
        let paths = &config.gen_paths;
        Self {
            enums_dir: app_dir.join(&paths.enums),
            models_dir: app_dir.join(&paths.models),
            schemas_dir: app_dir.join(&paths.schemas),
            services_dir: app_dir.join(&paths.services),
            api_dir: app_dir.join(&paths.api),
            enums_pkg: config.package_of(&paths.enums),
            models_pkg: config.package_of(&paths.models),
            schemas_pkg: config.package_of(&paths.schemas),
            services_pkg: config.package_of(&paths.services),
            api_pkg: config.package_of(&paths.api),
            app_dir,
        }
    }

    pub fn enums_module(&self) -> String {
        format!("{}.enums", self.enums_pkg)
    }

    pub fn mixins_module(&self) -> String {
        format!("{}._gen_mixins", self.models_pkg)
    }

    pub fn common_module(&self) -> String {
        format!("{}._gen_common", self.schemas_pkg)
    }

    pub fn service_base_module(&self) -> String {
        format!("{}._gen_base", self.services_pkg)
    }

    pub fn router_module(&self) -> String {
        format!("{}.router", self.api_pkg)
    }

    pub fn model_module(&self, entity: &EntityDef) -> String {
        format!("{}.{}.{}", self.models_pkg, entity.module_name, entity.file_stem())
    }

    pub fn schema_module(&self, entity: &EntityDef) -> String {
        format!("{}.{}.{}", self.schemas_pkg, entity.module_name, entity.file_stem())
    }

    pub fn service_module(&self, entity: &EntityDef) -> String {
        format!(
            "{}.{}.{}_service",
            self.services_pkg,
            entity.module_name,
            entity.file_stem()
        )
    }

    pub fn api_module(&self, entity: &EntityDef) -> String {
        format!("{}.{}.{}", self.api_pkg, entity.module_name, entity.file_stem())
    }

    /// Shared marker-stamped files, in generation order.
    pub fn shared_files(&self) -> Vec<PathBuf> {
        vec![
            self.enums_dir.join(ENUMS_FILE),
            self.models_dir.join(MIXINS_FILE),
            self.schemas_dir.join(COMMON_FILE),
            self.services_dir.join(SERVICE_BASE_FILE),
            self.api_dir.join(PERM_FILE),
            self.api_dir.join(ROUTER_FILE),
        ]
    }

    /// Roots whose subdirectories hold per-module output.
    pub fn module_roots(&self) -> [&Path; 4] {
        [
            self.models_dir.as_path(),
            self.schemas_dir.as_path(),
            self.services_dir.as_path(),
            self.api_dir.as_path(),
        ]
    }

    /// Per-module output directories of `entity`.
    pub fn module_dirs(&self, entity: &EntityDef) -> [PathBuf; 4] {
        self.module_roots()
            .map(|root| root.join(&entity.module_name))
    }

    pub fn entity_files(&self, entity: &EntityDef) -> EntityFiles {
        let stem = entity.file_stem();
        let module = &entity.module_name;
        EntityFiles {
            model: self.models_dir.join(module).join(format!("{stem}.py")),
            schema: self.schemas_dir.join(module).join(format!("{stem}.py")),
            service: self
                .services_dir
                .join(module)
                .join(format!("{stem}_service.py")),
            service_impl: self
                .services_dir
                .join(module)
                .join(format!("{stem}_service_impl.py")),
            api: self.api_dir.join(module).join(format!("{stem}.py")),
        }
    }
}

/// Options of one generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Project root the app dir is resolved against.
    pub root: PathBuf,
    /// Spec path recorded in directory markers.
    pub spec_path: PathBuf,
    /// Run safe clean before generating.
    pub clean: bool,
    /// Render everything but write nothing.
    pub dry_run: bool,
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// Generated files and markers written.
    pub written: Vec<PathBuf>,
    /// Existing files left alone because they lack the generated marker.
    pub skipped: Vec<PathBuf>,
    /// Extension scaffolds created this run.
    pub scaffolded: Vec<PathBuf>,
    /// Paths removed by clean.
    pub removed: Vec<PathBuf>,
    /// Import line that mounts the aggregate router in the host app.
    pub mount_import: String,
}

impl GenerationReport {
    fn record(&mut self, outcomes: Vec<WriteOutcome>) {
        for outcome in outcomes {
            match outcome {
                WriteOutcome::Written(p) => self.written.push(p),
                WriteOutcome::SkippedUserFile(p) => self.skipped.push(p),
                WriteOutcome::Scaffolded(p) => self.scaffolded.push(p),
                WriteOutcome::ScaffoldKept(_) => {}
            }
        }
    }
}

/// Generate the full output tree for `spec`.
///
/// Import targets are checked before anything touches the filesystem. A
/// filesystem failure aborts the run; files written before it stay.
///
/// # Errors
///
/// `ConfigImportTarget` for malformed import targets, `Filesystem` for write
/// and delete failures, `Render` for template failures.
pub fn generate(spec: &Spec, config: &GenConfig, opts: &GenerateOptions) -> Result<GenerationReport> {
    let imports = config.resolve_imports()?;
    let layout = OutputLayout::new(&opts.root, config);
    let mut report = GenerationReport {
        mount_import: format!("from {} import api_router", layout.router_module()),
        ..Default::default()
    };

    warn_unknown_extensions(spec, config);

    if opts.clean {
        let plan = plan_clean(&layout, &opts.spec_path)?;
        report.removed = apply_clean(&plan, opts.dry_run)?;
        info!(removed = report.removed.len(), "cleaned generated output");
    }

    let mut writer = OutputWriter::new(opts.dry_run);
    for dir in [
        &layout.enums_dir,
        &layout.models_dir,
        &layout.schemas_dir,
        &layout.services_dir,
        &layout.api_dir,
    ] {
        writer.ensure_package(dir)?;
    }

    let shared = [
        render_enums(spec)?,
        render_mixins()?,
        render_common()?,
        render_service_base()?,
        render_perm()?,
    ];
    // router.py comes last, once every entity is mounted
    for (path, content) in layout.shared_files().iter().zip(shared.iter()) {
        writer.write_generated(path, content)?;
    }

    let mut mounts = Vec::with_capacity(spec.entities.len());
    let mut marked: HashSet<PathBuf> = HashSet::new();
    for entity in &spec.entities {
        debug!(entity = %entity.class_name, module = %entity.module_name, "generating entity");
        for dir in layout.module_dirs(entity) {
            writer.ensure_package(&dir)?;
            if marked.insert(dir.clone()) {
                writer.mark_dir(&dir, &opts.spec_path)?;
            }
        }

        let files = layout.entity_files(entity);
        let has_extension = config.has_extension(entity);
        writer.write_generated(&files.model, &render_model(entity, &layout, &imports)?)?;
        writer.write_generated(&files.schema, &render_schema(entity, &layout)?)?;
        writer.write_generated(
            &files.service,
            &render_service(entity, &layout, has_extension)?,
        )?;
        if has_extension {
            writer.write_scaffold(&files.service_impl, &render_service_impl(entity, &layout)?)?;
        }
        writer.write_generated(
            &files.api,
            &render_api(entity, &layout, &imports, &config.api)?,
        )?;

        mounts.push(RouterMount {
            module: layout.api_module(entity),
            alias: format!("{}_{}", entity.module_name, entity.file_stem()),
        });
    }

    let router_path = layout.api_dir.join(ROUTER_FILE);
    writer.write_generated(&router_path, &render_router(&mounts)?)?;

    report.record(writer.into_outcomes());
    info!(
        written = report.written.len(),
        skipped = report.skipped.len(),
        scaffolded = report.scaffolded.len(),
        dry_run = opts.dry_run,
        "generation finished"
    );
    Ok(report)
}

fn warn_unknown_extensions(spec: &Spec, config: &GenConfig) {
    for ext in &config.extensions {
        let known = spec.entities.iter().any(|e| {
            *ext == e.class_name || *ext == format!("{}.{}", e.module_name, e.class_name)
        });
        if !known {
            warn!(extension = %ext, "registered extension names no entity in the spec");
        }
    }
}
