//! Generator configuration.
//!
//! An optional JSON overlay is merged onto built-in defaults. The merge is
//! shallow: object-valued keys (`gen_paths`, `imports`, `api`) overlay per
//! sub-key, scalars and lists replace the default wholesale, and unknown keys
//! are ignored.

use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use crate::error::{GenError, Result};
use crate::spec::EntityDef;

const DEFAULT_APP: &str = "app";
const DEFAULT_PREFIX_TEMPLATE: &str = "/{module}/{entity}";
const DEFAULT_TAG_TEMPLATE: &str = "{module}:{entity}";
const DEFAULT_DEPS: &str =
    "get_db,get_ctx,get_ctx_required,require_perm,provide_service,provide_service_optional";

/// Output directory names (relative to the app dir) per artifact kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenPaths {
    pub enums: String,
    pub models: String,
    pub schemas: String,
    pub services: String,
    pub api: String,
}

impl Default for GenPaths {
    fn default() -> Self {
        Self {
            enums: "enums".to_string(),
            models: "models".to_string(),
            schemas: "schemas".to_string(),
            services: "services".to_string(),
            api: "api".to_string(),
        }
    }
}

/// Raw `module:Name[,Name...]` strings for the foundation imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTargets {
    /// Declarative base of persisted records; exactly one name.
    pub base: String,
    /// Dependency-provider symbols.
    pub deps: String,
    /// Uniform response wrapper; exactly one name.
    pub res: String,
}

impl ImportTargets {
    fn for_package(pkg: &str) -> Self {
        Self {
            base: format!("{pkg}.models.base:Base"),
            deps: format!("{pkg}.deps:{DEFAULT_DEPS}"),
            res: format!("{pkg}.common.res:Res"),
        }
    }
}

/// URL prefix / tag templates with `{module}`, `{entity}`, `{className}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiTemplates {
    pub prefix_template: String,
    pub tag_template: String,
}

impl Default for ApiTemplates {
    fn default() -> Self {
        Self {
            prefix_template: DEFAULT_PREFIX_TEMPLATE.to_string(),
            tag_template: DEFAULT_TAG_TEMPLATE.to_string(),
        }
    }
}

/// Fully resolved generator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenConfig {
    /// App directory relative to the project root.
    pub app_dir: String,
    /// Python package name of the app directory.
    pub app_pkg: String,
    pub gen_paths: GenPaths,
    pub imports: ImportTargets,
    pub api: ApiTemplates,
    /// Entities whose host project provides a `{Class}ServiceImpl`
    /// (`ClassName` or `module.ClassName`).
    pub extensions: Vec<String>,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            app_dir: DEFAULT_APP.to_string(),
            app_pkg: DEFAULT_APP.to_string(),
            gen_paths: GenPaths::default(),
            imports: ImportTargets::for_package(DEFAULT_APP),
            api: ApiTemplates::default(),
            extensions: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    app_dir: Option<String>,
    app_pkg: Option<String>,
    gen_paths: Option<GenPathsOverlay>,
    imports: Option<ImportsOverlay>,
    api: Option<ApiOverlay>,
    extensions: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct GenPathsOverlay {
    enums: Option<String>,
    models: Option<String>,
    schemas: Option<String>,
    services: Option<String>,
    api: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ImportsOverlay {
    base: Option<String>,
    deps: Option<String>,
    res: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiOverlay {
    prefix_template: Option<String>,
    tag_template: Option<String>,
}

fn overlay(slot: &mut String, value: Option<String>) {
    if let Some(v) = value {
        *slot = v;
    }
}

impl GenConfig {
    /// Load the overlay at `path` (if any) onto the defaults.
    ///
    /// # Errors
    ///
    /// `Filesystem` if the file cannot be read, `Config` if it is not a JSON
    /// object or a known key has the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|e| GenError::fs(path, e))?;
        let cfg = Self::from_json_str(&content)
            .map_err(|e| match e {
                GenError::Config(msg) => GenError::Config(format!("{}: {msg}", path.display())),
                other => other,
            })?;
        debug!(path = %path.display(), ?cfg, "loaded config overlay");
        Ok(cfg)
    }

    /// Merge overlay JSON text onto the defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| GenError::Config(e.to_string()))?;
        if !value.is_object() {
            return Err(GenError::Config(
                "top level must be a JSON object".to_string(),
            ));
        }
        let raw: ConfigOverlay =
            serde_json::from_value(value).map_err(|e| GenError::Config(e.to_string()))?;
        Ok(Self::default().merged(raw))
    }

    fn merged(mut self, raw: ConfigOverlay) -> Self {
        overlay(&mut self.app_dir, raw.app_dir);
        overlay(&mut self.app_pkg, raw.app_pkg);
        // import defaults follow the resolved package name
        self.imports = ImportTargets::for_package(&self.app_pkg);

        if let Some(gp) = raw.gen_paths {
            overlay(&mut self.gen_paths.enums, gp.enums);
            overlay(&mut self.gen_paths.models, gp.models);
            overlay(&mut self.gen_paths.schemas, gp.schemas);
            overlay(&mut self.gen_paths.services, gp.services);
            overlay(&mut self.gen_paths.api, gp.api);
        }
        if let Some(im) = raw.imports {
            overlay(&mut self.imports.base, im.base);
            overlay(&mut self.imports.deps, im.deps);
            overlay(&mut self.imports.res, im.res);
        }
        if let Some(api) = raw.api {
            overlay(&mut self.api.prefix_template, api.prefix_template);
            overlay(&mut self.api.tag_template, api.tag_template);
        }
        if let Some(ext) = raw.extensions {
            self.extensions = ext.into_iter().map(|e| e.trim().to_string()).collect();
        }
        self
    }

    /// Python package path of a generated directory, e.g. `app.models`.
    pub fn package_of(&self, gen_path: &str) -> String {
        let rel = gen_path.trim_matches('/').replace('/', ".");
        if rel.is_empty() {
            self.app_pkg.clone()
        } else {
            format!("{}.{rel}", self.app_pkg)
        }
    }

    /// Whether the host project registered a service extension for `entity`.
    pub fn has_extension(&self, entity: &EntityDef) -> bool {
        let qualified = format!("{}.{}", entity.module_name, entity.class_name);
        self.extensions
            .iter()
            .any(|e| *e == entity.class_name || *e == qualified)
    }

    /// Parse and check the three foundation import targets.
    ///
    /// # Errors
    ///
    /// `ConfigImportTarget` when a target is malformed, or when `base`/`res`
    /// name other than exactly one symbol.
    pub fn resolve_imports(&self) -> Result<ResolvedImports> {
        let base = ImportTarget::parse("base", &self.imports.base)?.single("base")?;
        let deps = ImportTarget::parse("deps", &self.imports.deps)?;
        let res = ImportTarget::parse("res", &self.imports.res)?.single("res")?;
        Ok(ResolvedImports { base, deps, res })
    }
}

/// Expand `{module}`, `{entity}` and `{className}` in a template.
pub fn expand_template(template: &str, module: &str, entity: &str, class_name: &str) -> String {
    template
        .replace("{module}", module)
        .replace("{entity}", entity)
        .replace("{className}", class_name)
}

/// A parsed `module:Name[,Name...]` import target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTarget {
    pub module: String,
    pub names: Vec<String>,
}

impl ImportTarget {
    /// Split `module:a,b,c`. Blank names are dropped; a target without `:`,
    /// with an empty module, or with no names is rejected.
    pub fn parse(key: &str, value: &str) -> Result<Self> {
        let Some((module, names)) = value.split_once(':') else {
            return Err(GenError::import_target(key, value, "expected module:Name"));
        };
        let module = module.trim();
        let names: Vec<String> = names
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();
        if module.is_empty() {
            return Err(GenError::import_target(key, value, "empty module path"));
        }
        if names.is_empty() {
            return Err(GenError::import_target(key, value, "no names to import"));
        }
        Ok(Self {
            module: module.to_string(),
            names,
        })
    }

    fn single(self, key: &str) -> Result<SingleImport> {
        match self.names.as_slice() {
            [name] => Ok(SingleImport {
                name: name.clone(),
                module: self.module,
            }),
            names => Err(GenError::import_target(
                key,
                &format!("{}:{}", self.module, names.join(",")),
                format!("must name exactly one symbol, got {}", names.len()),
            )),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// An import target that resolves to exactly one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleImport {
    pub module: String,
    pub name: String,
}

/// The three foundation imports, checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImports {
    pub base: SingleImport,
    pub deps: ImportTarget,
    pub res: SingleImport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = GenConfig::default();
        assert_eq!(cfg.app_dir, "app");
        assert_eq!(cfg.imports.base, "app.models.base:Base");
        assert_eq!(cfg.api.prefix_template, "/{module}/{entity}");
        let imports = cfg.resolve_imports().unwrap();
        assert_eq!(imports.base.name, "Base");
        assert_eq!(imports.deps.names.len(), 6);
        assert!(imports.deps.has("require_perm"));
        assert_eq!(imports.res.module, "app.common.res");
    }

    #[test]
    fn test_overlay_is_shallow_per_key() {
        let cfg = GenConfig::from_json_str(
            r#"{
                "app_pkg": "backend",
                "gen_paths": {"api": "http/routes", "bogus": "x"},
                "api": {"tag_template": "{className}"},
                "unknown": 42
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.app_dir, "app");
        assert_eq!(cfg.gen_paths.api, "http/routes");
        assert_eq!(cfg.gen_paths.models, "models");
        assert_eq!(cfg.api.tag_template, "{className}");
        assert_eq!(cfg.api.prefix_template, "/{module}/{entity}");
        assert_eq!(cfg.imports.res, "backend.common.res:Res");
        assert_eq!(cfg.package_of(&cfg.gen_paths.api), "backend.http.routes");
    }

    #[test]
    fn test_explicit_imports_win_over_package_defaults() {
        let cfg = GenConfig::from_json_str(
            r#"{"app_pkg": "svc", "imports": {"base": "svc.db:Model"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.imports.base, "svc.db:Model");
        assert_eq!(cfg.imports.deps, format!("svc.deps:{DEFAULT_DEPS}"));
    }

    #[test]
    fn test_non_object_and_wrong_types_are_config_errors() {
        assert!(matches!(
            GenConfig::from_json_str("[1, 2]"),
            Err(GenError::Config(_))
        ));
        assert!(matches!(
            GenConfig::from_json_str(r#"{"gen_paths": "models"}"#),
            Err(GenError::Config(_))
        ));
        assert!(matches!(
            GenConfig::from_json_str("not json"),
            Err(GenError::Config(_))
        ));
    }

    #[test]
    fn test_import_target_parse() {
        let t = ImportTarget::parse("deps", "app.deps: get_db , ,get_ctx").unwrap();
        assert_eq!(t.module, "app.deps");
        assert_eq!(t.names, vec!["get_db", "get_ctx"]);
        for bad in ["app.deps", ":Base", "app.deps:", "app.deps: , "] {
            assert!(matches!(
                ImportTarget::parse("deps", bad),
                Err(GenError::ConfigImportTarget { .. })
            ));
        }
    }

    #[test]
    fn test_base_and_res_must_be_single() {
        let mut cfg = GenConfig::default();
        cfg.imports.base = "app.models.base:Base,Other".to_string();
        let err = cfg.resolve_imports().unwrap_err();
        assert!(err.to_string().contains("imports.base"));

        let mut cfg = GenConfig::default();
        cfg.imports.res = "app.common.res".to_string();
        let err = cfg.resolve_imports().unwrap_err();
        assert!(err.to_string().contains("imports.res"));
    }

    #[test]
    fn test_expand_template() {
        assert_eq!(
            expand_template("/{module}/{entity}", "biz", "order_item", "OrderItem"),
            "/biz/order_item"
        );
        assert_eq!(
            expand_template("{module}:{className}", "sys", "user", "SysUser"),
            "sys:SysUser"
        );
    }
}
