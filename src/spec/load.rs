use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use super::types::{
    ApiDef, ApiParamDef, EntityCapabilities, EntityDef, EnumDef, EnumValue, FieldDef, FieldType,
    ParamMode, ParamModeKind, Spec, UniqueConstraint,
};
use crate::error::{GenError, Result};
use crate::generator::snake_case;

/// The two accepted top-level shapes, resolved once.
#[derive(Debug)]
enum RawSpec {
    /// A bare list of entity descriptors.
    EntityList(Vec<RawEntity>),
    /// `{ "enums": {...}, "entities" | "modules": [...] }`
    Document {
        enums: IndexMap<String, Vec<RawEnumValue>>,
        entities: Vec<RawEntity>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntity {
    class_name: String,
    table_name: String,
    module_name: Option<String>,
    comment: Option<String>,
    zn_name: Option<String>,
    display_name: Option<String>,
    fields: Option<Vec<RawField>>,
    unique_constraints: Option<Vec<RawUnique>>,
    apis: Option<Vec<RawApi>>,
    soft_delete: Option<bool>,
    timestamps: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    not_null: Option<bool>,
    length: Option<RawLength>,
    enum_name: Option<String>,
    enum_values: Option<Vec<RawEnumValue>>,
    default_value: Option<Value>,
    comment: Option<String>,
}

/// `64` or `"64"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLength {
    Int(i64),
    Text(String),
}

/// Any object is an entry; its shape is checked in [`enum_def`].
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEnumValue {
    Entry {
        value: Option<Value>,
        comment: Option<Value>,
        label: Option<Value>,
    },
    Bare(Value),
}

#[derive(Debug, Deserialize)]
struct RawUnique {
    name: Option<String>,
    columns: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawApi {
    name: String,
    summary: Option<String>,
    path: Option<String>,
    param_mode: Option<String>,
    dto_name: Option<String>,
    params: Option<Vec<RawParam>>,
    required_perms: Option<Vec<Value>>,
    auth_required: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParam {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    required: Option<bool>,
    comment: Option<String>,
    enum_name: Option<String>,
}

/// Load and normalize a spec file.
pub fn load_spec(path: &Path) -> Result<Spec> {
    let content = std::fs::read_to_string(path).map_err(|e| GenError::fs(path, e))?;
    let spec = parse_spec(&content)
        .map_err(|e| match e {
            GenError::SpecFormat(msg) => {
                GenError::SpecFormat(format!("{}: {msg}", path.display()))
            }
            other => other,
        })?;
    debug!(
        path = %path.display(),
        enums = spec.enums.len(),
        entities = spec.entities.len(),
        "loaded spec"
    );
    Ok(spec)
}

/// Parse and normalize spec JSON text.
pub fn parse_spec(json: &str) -> Result<Spec> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| GenError::SpecFormat(e.to_string()))?;
    spec_from_value(value)
}

/// Normalize an already-parsed JSON value into the IR.
pub fn spec_from_value(value: Value) -> Result<Spec> {
    let raw = classify(value)?;
    let (declared, entities) = match raw {
        RawSpec::EntityList(entities) => (IndexMap::new(), entities),
        RawSpec::Document { enums, entities } => (enums, entities),
    };

    // Declared enums win; inline enums only fill gaps.
    let mut enums: IndexMap<String, EnumDef> = declared
        .into_iter()
        .map(|(name, values)| {
            let def = enum_def(&name, &values)?;
            Ok((name, def))
        })
        .collect::<Result<_>>()?;
    for (name, def) in collect_inline_enums(&entities)? {
        enums.entry(name).or_insert(def);
    }

    let entities = entities
        .into_iter()
        .map(normalize_entity)
        .collect::<Result<Vec<_>>>()?;

    let spec = Spec { enums, entities };
    validate(&spec)?;
    Ok(spec)
}

fn classify(value: Value) -> Result<RawSpec> {
    match value {
        Value::Array(_) => {
            let entities: Vec<RawEntity> = serde_json::from_value(value)
                .map_err(|e| GenError::SpecFormat(format!("entity list: {e}")))?;
            Ok(RawSpec::EntityList(entities))
        }
        Value::Object(mut obj) => {
            let enums = match obj.remove("enums") {
                None | Some(Value::Null) => IndexMap::new(),
                Some(v @ Value::Object(_)) => serde_json::from_value(v)
                    .map_err(|e| GenError::SpecFormat(format!("enums: {e}")))?,
                Some(_) => {
                    return Err(GenError::SpecFormat(
                        "\"enums\" must be an object of name -> value list".to_string(),
                    ))
                }
            };
            let list = match (obj.remove("entities"), obj.remove("modules")) {
                (Some(v), _) if !is_empty_like(&v) => v,
                (_, Some(v)) if !is_empty_like(&v) => v,
                _ => Value::Array(vec![]),
            };
            if !list.is_array() {
                return Err(GenError::SpecFormat(
                    "\"entities\" must be a list of entity descriptors".to_string(),
                ));
            }
            let entities: Vec<RawEntity> = serde_json::from_value(list)
                .map_err(|e| GenError::SpecFormat(format!("entities: {e}")))?;
            Ok(RawSpec::Document { enums, entities })
        }
        _ => Err(GenError::SpecFormat(
            "expected a list of entities or an object {enums, entities}".to_string(),
        )),
    }
}

fn is_empty_like(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_scalar(v: &Value) -> bool {
    matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn enum_def(name: &str, values: &[RawEnumValue]) -> Result<EnumDef> {
    let values = values
        .iter()
        .enumerate()
        .map(|(i, v)| match v {
            RawEnumValue::Entry {
                value: Some(value),
                comment,
                label,
            } if is_scalar(value) => {
                // `comment` wins over `label`; either may be any scalar.
                let label = [comment, label]
                    .into_iter()
                    .flatten()
                    .find(|l| !l.is_null())
                    .map(value_text)
                    .unwrap_or_default();
                Ok(EnumValue {
                    value: value_text(value),
                    label,
                })
            }
            RawEnumValue::Bare(value) if is_scalar(value) => Ok(EnumValue {
                value: value_text(value),
                label: String::new(),
            }),
            RawEnumValue::Entry { .. } => Err(GenError::SpecInvalid(format!(
                "enum {name}: entry #{i} needs a scalar \"value\""
            ))),
            RawEnumValue::Bare(other) => Err(GenError::SpecInvalid(format!(
                "enum {name}: entry #{i} must be a scalar or {{value, comment}}, got {other}"
            ))),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(EnumDef {
        name: name.to_string(),
        values,
    })
}

fn collect_inline_enums(entities: &[RawEntity]) -> Result<IndexMap<String, EnumDef>> {
    let mut enums = IndexMap::new();
    for entity in entities {
        for field in entity.fields.iter().flatten() {
            if field.ty.trim() != "enum" {
                continue;
            }
            let (Some(name), Some(values)) = (non_blank(&field.enum_name), &field.enum_values)
            else {
                continue;
            };
            if !enums.contains_key(&name) {
                let def = enum_def(&name, values)?;
                enums.insert(name, def);
            }
        }
    }
    Ok(enums)
}

fn field_length(field: &str, raw: Option<&RawLength>) -> Result<Option<i64>> {
    match raw {
        None => Ok(None),
        Some(RawLength::Int(n)) => Ok(Some(*n)),
        Some(RawLength::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(RawLength::Text(s)) => s.trim().parse().map(Some).map_err(|_| {
            GenError::SpecInvalid(format!("field {field}: length {s:?} is not an integer"))
        }),
    }
}

fn non_blank(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn normalize_entity(raw: RawEntity) -> Result<EntityDef> {
    let class_name = raw.class_name.trim().to_string();
    let fields = raw
        .fields
        .unwrap_or_default()
        .into_iter()
        .map(|f| {
            let ty = FieldType::parse(&f.ty);
            let enum_name = if ty.is_enum() {
                non_blank(&f.enum_name)
            } else {
                None
            };
            let length = field_length(&f.name, f.length.as_ref())?;
            Ok(FieldDef {
                name: f.name,
                ty,
                not_null: f.not_null.unwrap_or(false),
                length,
                enum_name,
                default_value: f.default_value.as_ref().and_then(|v| match v {
                    Value::Null => None,
                    other => Some(value_text(other)),
                }),
                comment: f.comment,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let unique_constraints = raw
        .unique_constraints
        .unwrap_or_default()
        .into_iter()
        .map(|uc| UniqueConstraint {
            name: uc.name.unwrap_or_default(),
            columns: uc
                .columns
                .unwrap_or_default()
                .iter()
                .map(|c| snake_case(c))
                .collect(),
        })
        .collect();

    let apis = raw
        .apis
        .unwrap_or_default()
        .into_iter()
        .map(|a| normalize_api(&class_name, a))
        .collect::<Result<Vec<_>>>()?;

    let defaults = EntityCapabilities::default();
    Ok(EntityDef {
        display_name: non_blank(&raw.display_name)
            .or_else(|| non_blank(&raw.zn_name))
            .unwrap_or_else(|| class_name.clone()),
        class_name,
        table_name: raw.table_name,
        module_name: non_blank(&raw.module_name).unwrap_or_else(|| "biz".to_string()),
        comment: raw.comment.unwrap_or_default(),
        fields,
        unique_constraints,
        apis,
        capabilities: EntityCapabilities {
            soft_delete: raw.soft_delete.unwrap_or(defaults.soft_delete),
            timestamps: raw.timestamps.unwrap_or(defaults.timestamps),
        },
    })
}

fn normalize_api(class_name: &str, raw: RawApi) -> Result<ApiDef> {
    let kind: ParamModeKind = raw
        .param_mode
        .as_deref()
        .unwrap_or("ENTITY")
        .parse()
        .map_err(|e| GenError::SpecInvalid(format!("{class_name}.{}: {e}", raw.name)))?;

    let mode = match kind {
        ParamModeKind::Entity => ParamMode::Entity,
        ParamModeKind::Query => ParamMode::Query,
        ParamModeKind::Ids => ParamMode::Ids,
        ParamModeKind::Custom => ParamMode::Custom {
            dto_name: non_blank(&raw.dto_name),
            params: raw
                .params
                .unwrap_or_default()
                .into_iter()
                .map(|p| {
                    let ty = FieldType::parse(&p.ty);
                    let enum_name = if ty.is_enum() {
                        non_blank(&p.enum_name)
                    } else {
                        None
                    };
                    ApiParamDef {
                        name: p.name,
                        ty,
                        required: p.required.unwrap_or(false),
                        comment: p.comment,
                        enum_name,
                    }
                })
                .collect(),
        },
    };

    let required_perms = raw
        .required_perms
        .unwrap_or_default()
        .iter()
        .map(|p| value_text(p).trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    Ok(ApiDef {
        summary: non_blank(&raw.summary).unwrap_or_else(|| raw.name.clone()),
        path: non_blank(&raw.path).unwrap_or_else(|| format!("/{}", raw.name)),
        name: raw.name,
        mode,
        required_perms,
        auth_required: raw.auth_required.unwrap_or(false),
    })
}

fn validate(spec: &Spec) -> Result<()> {
    let mut seen = HashSet::new();
    for entity in &spec.entities {
        let key = (entity.module_name.clone(), entity.file_stem());
        if !seen.insert(key) {
            return Err(GenError::SpecInvalid(format!(
                "entity {} collides with another entity in module {:?} (file stem {:?})",
                entity.class_name,
                entity.module_name,
                entity.file_stem()
            )));
        }

        for field in &entity.fields {
            if field.ty.is_enum() {
                check_enum_ref(spec, &entity.class_name, &field.name, &field.enum_name)?;
            }
        }
        for api in &entity.apis {
            if let ParamMode::Custom { params, .. } = &api.mode {
                for p in params {
                    if p.ty.is_enum() {
                        let owner = format!("{}.{}", entity.class_name, api.name);
                        check_enum_ref(spec, &owner, &p.name, &p.enum_name)?;
                    }
                }
            }
        }

        let columns: HashSet<String> = entity.column_names().into_iter().collect();
        for uc in &entity.unique_constraints {
            if let Some(missing) = uc.columns.iter().find(|c| !columns.contains(*c)) {
                return Err(GenError::SpecInvalid(format!(
                    "{}: unique constraint {:?} names undeclared column {missing:?}",
                    entity.class_name, uc.name
                )));
            }
        }
    }
    Ok(())
}

fn check_enum_ref(
    spec: &Spec,
    owner: &str,
    field: &str,
    enum_name: &Option<String>,
) -> Result<()> {
    match enum_name {
        Some(name) if spec.enums.contains_key(name) => Ok(()),
        Some(name) => Err(GenError::SpecInvalid(format!(
            "{owner}.{field}: enum {name:?} is not declared"
        ))),
        None => Err(GenError::SpecInvalid(format!(
            "{owner}.{field}: type enum requires enumName"
        ))),
    }
}
