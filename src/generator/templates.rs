use askama::Template;
use std::collections::HashSet;
use tracing::warn;

use super::order::ORDER_BY_PATTERN;
use super::project::OutputLayout;
use super::schema::{
    enum_symbol, py_comment, py_ident, py_quote, python_default, snake_case, title_case,
    type_hint, unique_name, ResolvedField,
};
use crate::config::{expand_template, ApiTemplates, ResolvedImports};
use crate::error::Result;
use crate::permission::{ADMIN_ROLE, SEPARATOR, WILDCARD};
use crate::spec::{
    ApiDef, ApiParamDef, EntityDef, FieldDef, ParamMode, Spec, ID_COLUMN, SOFT_DELETE_COLUMN,
    TIMESTAMP_COLUMNS,
};

/// Default page size of paged queries.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Upper bound on the requested page size.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Symbols the API renderer knows how to use from the deps import, in
/// import order.
const KNOWN_DEPS: [&str; 6] = [
    "get_db",
    "get_ctx",
    "get_ctx_required",
    "require_perm",
    "provide_service",
    "provide_service_optional",
];

/// One member of a generated enum class
#[derive(Debug, Clone)]
pub struct EnumMember {
    /// Sanitized member symbol
    pub symbol: String,
    /// Python string literal of the raw value
    pub literal: String,
    /// Trailing `  # label` comment, empty when there is no label
    pub comment: String,
}

/// One generated enum class
#[derive(Debug, Clone)]
pub struct EnumView {
    pub name: String,
    pub members: Vec<EnumMember>,
}

/// Template data for `enums.py`
#[derive(Template)]
#[template(path = "enums.py.txt", escape = "none")]
pub struct EnumsTemplateData {
    /// Enums in declaration order
    pub enums: Vec<EnumView>,
}

/// Template for the shared model mixins
#[derive(Template)]
#[template(path = "mixins.py.txt", escape = "none")]
pub struct MixinsTemplate;

/// Template data for the shared schema scaffolding
#[derive(Template)]
#[template(path = "common.py.txt", escape = "none")]
pub struct CommonTemplateData {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

/// Template data for the generic CRUD service base
#[derive(Template)]
#[template(path = "service_base.py.txt", escape = "none")]
pub struct ServiceBaseTemplateData {
    /// Order-by pattern shared with [`super::order`]
    pub order_by_pattern: &'static str,
    pub id_column: &'static str,
    pub created_at_column: &'static str,
    pub soft_delete_column: &'static str,
    pub default_page_size: u32,
}

/// Template data for the permission helper
#[derive(Template)]
#[template(path = "perm.py.txt", escape = "none")]
pub struct PermTemplateData {
    pub admin_role: String,
    pub wildcard: String,
    pub separator: String,
}

/// Template data for one persisted-record module
#[derive(Template)]
#[template(path = "model.py.txt", escape = "none")]
pub struct ModelTemplateData {
    pub enums_module: String,
    pub base_module: String,
    pub base_name: String,
    pub mixins_module: String,
    /// Mixins the record composes, sorted
    pub mixins: Vec<String>,
    /// Class bases: mixins then the declarative base
    pub bases: Vec<String>,
    pub class_name: String,
    /// Docstring text, already escaped
    pub doc: String,
    /// Table name as a Python literal
    pub table_name: String,
    /// `UniqueConstraint(...)` expressions
    pub unique_constraints: Vec<String>,
    /// Column declaration lines without indentation
    pub columns: Vec<String>,
}

/// Template data for one schema module
#[derive(Template)]
#[template(path = "schema.py.txt", escape = "none")]
pub struct SchemaTemplateData {
    pub enums_module: String,
    pub common_module: String,
    pub class_name: String,
    /// Create fields: required ones mandatory, others default to `None`
    pub create_fields: Vec<String>,
    /// Every field as `Optional[...] = None`
    pub optional_fields: Vec<String>,
}

/// Template data for one generated service module
#[derive(Template)]
#[template(path = "service.py.txt", escape = "none")]
pub struct ServiceTemplateData {
    pub service_base_module: String,
    pub model_module: String,
    pub class_name: String,
    pub stem: String,
    /// Whether the host registered a `{Class}ServiceImpl`
    pub has_extension: bool,
    /// `True` / `False`
    pub soft_delete: String,
    /// `True` / `False`
    pub timestamps: String,
    /// Python set literal of the record's columns
    pub columns: String,
}

/// Template data for the user-owned extension scaffold
#[derive(Template)]
#[template(path = "service_impl.py.txt", escape = "none")]
pub struct ServiceImplTemplateData {
    pub service_base_module: String,
    pub class_name: String,
    /// Stub method names, one per CUSTOM API
    pub methods: Vec<String>,
}

/// One route handler in an API module
#[derive(Debug, Clone)]
pub struct HandlerView {
    /// Whether a purpose-built request model precedes the handler
    pub has_dto: bool,
    pub dto_name: String,
    pub dto_fields: Vec<String>,
    /// Route path literal
    pub path: String,
    /// Summary literal
    pub summary: String,
    /// `, dependencies=[...]` or empty
    pub dependencies: String,
    /// Python function name
    pub func: String,
    pub request_type: String,
    /// Service parameter(s) of the handler signature
    pub service_param: String,
    /// Body lines without indentation
    pub body: Vec<String>,
}

/// Template data for one API router module
#[derive(Template)]
#[template(path = "api.py.txt", escape = "none")]
pub struct ApiTemplateData {
    pub res_module: String,
    pub res_name: String,
    pub deps_module: String,
    pub deps_names: Vec<String>,
    pub enums_module: String,
    pub schema_module: String,
    pub common_module: String,
    pub service_module: String,
    pub class_name: String,
    /// Router prefix literal
    pub prefix: String,
    /// Router tag literal
    pub tag: String,
    pub handlers: Vec<HandlerView>,
}

/// One router mounted by the aggregate router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterMount {
    /// Module path of the per-entity API module
    pub module: String,
    /// `{module}_{stem}`
    pub alias: String,
}

/// Template data for the aggregate router
#[derive(Template)]
#[template(path = "router.py.txt", escape = "none")]
pub struct RouterTemplateData {
    pub mounts: Vec<RouterMount>,
}

fn finish(rendered: String) -> String {
    let mut out = rendered.trim_end().to_string();
    out.push('\n');
    out
}

fn py_bool(b: bool) -> String {
    if b { "True" } else { "False" }.to_string()
}

/// Render `enums.py`: one `str`-valued enum class per declared enum.
pub fn render_enums(spec: &Spec) -> Result<String> {
    let enums = spec
        .enums
        .values()
        .map(|def| {
            // Distinct values may sanitize to the same symbol.
            let mut seen = HashSet::new();
            let members = def
                .values
                .iter()
                .map(|v| {
                    let label = py_comment(&v.label);
                    EnumMember {
                        symbol: unique_name(&mut seen, &enum_symbol(&v.value), &def.name),
                        literal: py_quote(&v.value),
                        comment: if label.is_empty() {
                            String::new()
                        } else {
                            format!("  # {label}")
                        },
                    }
                })
                .collect();
            EnumView {
                name: def.name.clone(),
                members,
            }
        })
        .collect();
    Ok(finish(EnumsTemplateData { enums }.render()?))
}

pub fn render_mixins() -> Result<String> {
    Ok(finish(MixinsTemplate.render()?))
}

pub fn render_common() -> Result<String> {
    Ok(finish(
        CommonTemplateData {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
        .render()?,
    ))
}

pub fn render_service_base() -> Result<String> {
    Ok(finish(
        ServiceBaseTemplateData {
            order_by_pattern: ORDER_BY_PATTERN,
            id_column: ID_COLUMN,
            created_at_column: TIMESTAMP_COLUMNS[0],
            soft_delete_column: SOFT_DELETE_COLUMN,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
        .render()?,
    ))
}

pub fn render_perm() -> Result<String> {
    Ok(finish(
        PermTemplateData {
            admin_role: py_quote(ADMIN_ROLE),
            wildcard: py_quote(WILDCARD),
            separator: py_quote(&SEPARATOR.to_string()),
        }
        .render()?,
    ))
}

/// Mixins an entity composes, in base-class order.
pub fn entity_mixins(entity: &EntityDef) -> Vec<String> {
    let mut mixins = vec!["IdMixin".to_string()];
    if entity.capabilities.timestamps {
        mixins.push("TimeMixin".to_string());
    }
    if entity.capabilities.soft_delete {
        mixins.push("SoftDeleteMixin".to_string());
    }
    mixins
}

fn column_line(field: &FieldDef) -> String {
    let resolved = ResolvedField::from_field(field);
    let mut args = vec![
        resolved.column.clone(),
        format!("nullable={}", py_bool(resolved.nullable)),
    ];
    if let Some(dv) = &field.default_value {
        args.push(format!("default={}", python_default(dv)));
    }
    if let Some(comment) = field.comment.as_deref().filter(|c| !c.is_empty()) {
        args.push(format!("comment={}", py_quote(comment)));
    }
    format!(
        "{}: Mapped[{}] = mapped_column({})",
        resolved.name,
        resolved.mapped_hint(),
        args.join(", ")
    )
}

/// Render the persisted-record module of `entity`.
pub fn render_model(
    entity: &EntityDef,
    layout: &OutputLayout,
    imports: &ResolvedImports,
) -> Result<String> {
    let mixins = entity_mixins(entity);
    let mut sorted_mixins = mixins.clone();
    sorted_mixins.sort();
    let mut bases = mixins;
    bases.push(imports.base.name.clone());

    let unique_constraints = entity
        .unique_constraints
        .iter()
        .filter(|uc| !uc.columns.is_empty())
        .map(|uc| {
            let cols: Vec<String> = uc.columns.iter().map(|c| py_quote(c)).collect();
            format!("UniqueConstraint({}, name={})", cols.join(", "), py_quote(&uc.name))
        })
        .collect();

    let doc = py_comment(&entity.comment)
        .replace('\\', "\\\\")
        .replace('"', "\\\"");

    let data = ModelTemplateData {
        enums_module: layout.enums_module(),
        base_module: imports.base.module.clone(),
        base_name: imports.base.name.clone(),
        mixins_module: layout.mixins_module(),
        mixins: sorted_mixins,
        bases,
        class_name: entity.class_name.clone(),
        doc,
        table_name: py_quote(&entity.table_name),
        unique_constraints,
        columns: entity.fields.iter().map(column_line).collect(),
    };
    Ok(finish(data.render()?))
}

/// Render the Create/Update/Query/Read schema module of `entity`.
pub fn render_schema(entity: &EntityDef, layout: &OutputLayout) -> Result<String> {
    let resolved: Vec<ResolvedField> = entity.fields.iter().map(ResolvedField::from_field).collect();
    let optional = |f: &ResolvedField| format!("{}: Optional[{}] = None", f.name, f.hint);
    let create_fields = resolved
        .iter()
        .map(|f| {
            if f.nullable {
                optional(f)
            } else {
                format!("{}: {}", f.name, f.hint)
            }
        })
        .collect();
    let data = SchemaTemplateData {
        enums_module: layout.enums_module(),
        common_module: layout.common_module(),
        class_name: entity.class_name.clone(),
        create_fields,
        optional_fields: resolved.iter().map(optional).collect(),
    };
    Ok(finish(data.render()?))
}

/// Render the generated service module of `entity`.
pub fn render_service(
    entity: &EntityDef,
    layout: &OutputLayout,
    has_extension: bool,
) -> Result<String> {
    let columns: Vec<String> = entity.column_names().iter().map(|c| py_quote(c)).collect();
    let data = ServiceTemplateData {
        service_base_module: layout.service_base_module(),
        model_module: layout.model_module(entity),
        class_name: entity.class_name.clone(),
        stem: entity.file_stem(),
        has_extension,
        soft_delete: py_bool(entity.capabilities.soft_delete),
        timestamps: py_bool(entity.capabilities.timestamps),
        columns: format!("{{{}}}", columns.join(", ")),
    };
    Ok(finish(data.render()?))
}

/// Render the one-time extension scaffold of `entity`.
pub fn render_service_impl(entity: &EntityDef, layout: &OutputLayout) -> Result<String> {
    let mut methods: Vec<String> = entity.custom_apis().map(|a| py_ident(&a.name)).collect();
    methods.dedup();
    let data = ServiceImplTemplateData {
        service_base_module: layout.service_base_module(),
        class_name: entity.class_name.clone(),
        methods,
    };
    Ok(finish(data.render()?))
}

/// How handlers obtain their service, given the deps symbols available.
struct DepsWiring<'a> {
    imports: &'a ResolvedImports,
    service_class: String,
}

impl DepsWiring<'_> {
    fn has(&self, name: &str) -> bool {
        self.imports.deps.has(name)
    }

    fn import_names(&self) -> Vec<String> {
        KNOWN_DEPS
            .iter()
            .filter(|n| self.has(n))
            .map(|n| n.to_string())
            .collect()
    }

    fn dependencies(&self, api: &ApiDef) -> String {
        if !api.requires_auth() {
            return String::new();
        }
        let mut deps = Vec::new();
        if self.has("get_ctx_required") {
            deps.push("Depends(get_ctx_required)".to_string());
        } else if self.has("get_ctx") {
            deps.push("Depends(get_ctx)".to_string());
        }
        if self.has("require_perm") {
            deps.extend(
                api.required_perms
                    .iter()
                    .map(|p| format!("Depends(require_perm({}))", py_quote(p))),
            );
        } else if !api.required_perms.is_empty() {
            warn!(api = %api.name, "deps import lacks require_perm; permissions not enforced");
        }
        if deps.is_empty() {
            String::new()
        } else {
            format!(", dependencies=[{}]", deps.join(", "))
        }
    }

    /// Service parameter plus, for the db/ctx fallback, the line that
    /// constructs the service.
    fn service_param(&self, api: &ApiDef) -> (String, Option<String>) {
        let svc = &self.service_class;
        let login = api.requires_auth();
        if login && self.has("provide_service") {
            return (format!("svc: {svc} = Depends(provide_service({svc}))"), None);
        }
        if !login && self.has("provide_service_optional") {
            return (
                format!("svc: {svc} = Depends(provide_service_optional({svc}))"),
                None,
            );
        }
        let ctx = if login { "get_ctx_required" } else { "get_ctx" };
        if self.has("get_db") && self.has(ctx) {
            return (
                format!("db=Depends(get_db), ctx=Depends({ctx})"),
                Some(format!("svc = {svc}(db, ctx)")),
            );
        }
        if self.has("get_db") {
            return (
                "db=Depends(get_db)".to_string(),
                Some(format!("svc = {svc}(db, None)")),
            );
        }
        (format!("svc: {svc} = None"), None)
    }
}

fn dto_field(param: &ApiParamDef) -> String {
    let name = snake_case(&param.name);
    let hint = type_hint(&param.ty, param.enum_name.as_deref());
    let comment = param
        .comment
        .as_deref()
        .map(py_comment)
        .filter(|c| !c.is_empty())
        .map(|c| format!("  # {c}"))
        .unwrap_or_default();
    if param.required {
        format!("{name}: {hint}{comment}")
    } else {
        format!("{name}: Optional[{hint}] = None{comment}")
    }
}

/// Render the API router module of `entity`.
pub fn render_api(
    entity: &EntityDef,
    layout: &OutputLayout,
    imports: &ResolvedImports,
    templates: &ApiTemplates,
) -> Result<String> {
    let class = &entity.class_name;
    let res = &imports.res.name;
    let read = format!("{class}Read");
    let stem = entity.file_stem();
    let wiring = DepsWiring {
        imports,
        service_class: format!("{class}Service"),
    };
    let filters =
        "filters = req.model_dump(exclude={\"page\", \"size\", \"order_by\"}, exclude_none=True)"
            .to_string();

    let mut seen = HashSet::new();
    let mut handlers = Vec::new();
    for api in &entity.apis {
        let (func, request_type, mut body, dto) = match &api.mode {
            ParamMode::Entity => match api.name.as_str() {
                "save" => (
                    "save",
                    format!("{class}Create"),
                    vec![
                        "obj = svc.create(req.model_dump())".to_string(),
                        format!("return {res}.success({read}.model_validate(obj))"),
                    ],
                    None,
                ),
                "update" => (
                    "update",
                    format!("{class}Update"),
                    vec![
                        "obj = svc.update(req.id, req.model_dump(exclude={\"id\"}))".to_string(),
                        "if obj is None:".to_string(),
                        "    raise HTTPException(status_code=404, detail=\"not found\")"
                            .to_string(),
                        format!("return {res}.success({read}.model_validate(obj))"),
                    ],
                    None,
                ),
                "list" => (
                    "list_",
                    format!("{class}Query"),
                    vec![
                        filters.clone(),
                        "items = svc.list(filters, order_by=req.order_by)".to_string(),
                        format!("return {res}.success([{read}.model_validate(x) for x in items])"),
                    ],
                    None,
                ),
                other => {
                    warn!(entity = %class, api = other, "ENTITY api must be save, update or list; skipped");
                    continue;
                }
            },
            ParamMode::Ids => (
                "delete",
                "IdsReq".to_string(),
                vec![
                    "n = svc.delete_many(req.ids)".to_string(),
                    format!("return {res}.success({{\"deleted\": n}})"),
                ],
                None,
            ),
            ParamMode::Query => (
                "paging",
                format!("{class}Query"),
                vec![
                    filters.clone(),
                    "total, items = svc.paging(filters, page=req.page, size=req.size, order_by=req.order_by)"
                        .to_string(),
                    format!(
                        "return {res}.success({{\"total\": total, \"items\": [{read}.model_validate(x) for x in items]}})"
                    ),
                ],
                None,
            ),
            ParamMode::Custom { dto_name, params } => {
                let method = py_ident(&api.name);
                let dto = dto_name
                    .clone()
                    .unwrap_or_else(|| format!("{class}{}Req", title_case(&api.name)));
                (
                    "",
                    dto.clone(),
                    vec![
                        format!("out = svc.{method}(req.model_dump())"),
                        format!("return {res}.success(out)"),
                    ],
                    Some((dto, params.iter().map(dto_field).collect::<Vec<_>>())),
                )
            }
        };
        let func = if func.is_empty() {
            py_ident(&api.name)
        } else {
            func.to_string()
        };
        let (service_param, construct) = wiring.service_param(api);
        if let Some(line) = construct {
            body.insert(0, line);
        }
        let (has_dto, dto_name, dto_fields) = match dto {
            Some((name, fields)) => (true, name, fields),
            None => (false, String::new(), Vec::new()),
        };
        handlers.push(HandlerView {
            has_dto,
            dto_name,
            dto_fields,
            path: py_quote(&api.path),
            summary: py_quote(&api.summary),
            dependencies: wiring.dependencies(api),
            func: unique_name(&mut seen, &func, "handler"),
            request_type,
            service_param,
            body,
        });
    }

    let data = ApiTemplateData {
        res_module: imports.res.module.clone(),
        res_name: res.clone(),
        deps_module: imports.deps.module.clone(),
        deps_names: wiring.import_names(),
        enums_module: layout.enums_module(),
        schema_module: layout.schema_module(entity),
        common_module: layout.common_module(),
        service_module: layout.service_module(entity),
        class_name: class.clone(),
        prefix: py_quote(&expand_template(
            &templates.prefix_template,
            &entity.module_name,
            &stem,
            class,
        )),
        tag: py_quote(&expand_template(
            &templates.tag_template,
            &entity.module_name,
            &stem,
            class,
        )),
        handlers,
    };
    Ok(finish(data.render()?))
}

/// Render the aggregate router mounting every per-entity router.
pub fn render_router(mounts: &[RouterMount]) -> Result<String> {
    Ok(finish(
        RouterTemplateData {
            mounts: mounts.to_vec(),
        }
        .render()?,
    ))
}
