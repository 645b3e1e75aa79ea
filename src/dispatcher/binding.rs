use crate::error::DispatchError;
use crate::handler::{Args, ParamKind, ParamSource, ParamSpec};
use crate::server::ParsedRequest;
use serde_json::Value;

/// `true` when the media type essence is `application/json` or a `+json` suffix type
#[must_use]
pub fn is_json_media_type(content_type: Option<&str>) -> bool {
    let Some(ct) = content_type else {
        return false;
    };
    let essence = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// Bind every declared parameter of a route, all or nothing.
///
/// Positional parameters take, in order of precedence: the path parameter (first
/// parameter only), the query value of the same name while the parameter's position
/// after the path parameter is below the number of query entries, then the whole body.
/// Explicit sources bind from that source only. A missing optional parameter binds `null`.
pub fn bind_args(
    params: &[ParamSpec],
    parsed: &ParsedRequest,
    content_type: Option<&str>,
) -> Result<Args, DispatchError> {
    let path_slot = parsed.path_param.is_some()
        && params
            .first()
            .is_some_and(|p| p.source == ParamSource::Positional);
    let query_offset = usize::from(path_slot);

    let mut args = Args::with_capacity(params.len());
    for (i, spec) in params.iter().enumerate() {
        let bound = match spec.source {
            ParamSource::Positional => {
                if i == 0 && path_slot {
                    from_path(spec, parsed)?
                } else if i - query_offset < parsed.query_params.len() {
                    from_query(spec, parsed)?
                } else {
                    from_body(spec, parsed, content_type)?
                }
            }
            ParamSource::Path => from_path(spec, parsed)?,
            ParamSource::Query => from_query(spec, parsed)?,
            ParamSource::Body => from_body(spec, parsed, content_type)?,
        };
        let value = match bound {
            Some(v) => v,
            None if !spec.required => Value::Null,
            None => {
                return Err(DispatchError::bad_request(format!(
                    "missing required parameter '{}'",
                    spec.name
                )))
            }
        };
        args.push(&spec.name, value);
    }
    Ok(args)
}

fn convert(spec: &ParamSpec, text: &str) -> Result<Value, DispatchError> {
    spec.kind
        .convert_text(text)
        .map_err(|e| DispatchError::bad_request(format!("parameter '{}': {e}", spec.name)))
}

fn from_path(spec: &ParamSpec, parsed: &ParsedRequest) -> Result<Option<Value>, DispatchError> {
    parsed
        .path_param
        .as_deref()
        .map(|text| convert(spec, text))
        .transpose()
}

fn from_query(spec: &ParamSpec, parsed: &ParsedRequest) -> Result<Option<Value>, DispatchError> {
    parsed
        .query(&spec.name)
        .map(|text| convert(spec, text))
        .transpose()
}

fn from_body(
    spec: &ParamSpec,
    parsed: &ParsedRequest,
    content_type: Option<&str>,
) -> Result<Option<Value>, DispatchError> {
    if parsed.body.is_empty() {
        return Ok(None);
    }
    if !is_json_media_type(content_type) {
        return convert(spec, &parsed.body).map(Some);
    }
    let value: Value = serde_json::from_str(&parsed.body)
        .map_err(|e| DispatchError::bad_request(format!("malformed JSON body: {e}")))?;
    accept_decoded(&spec.kind, value)
        .map(Some)
        .map_err(|e| DispatchError::bad_request(format!("parameter '{}': {e}", spec.name)))
}

/// Check a decoded JSON body against a parameter kind
fn accept_decoded(kind: &ParamKind, value: Value) -> Result<Value, String> {
    let ok = match kind {
        ParamKind::Integer => value.is_i64(),
        ParamKind::Number => value.is_number(),
        ParamKind::Boolean => value.is_boolean(),
        ParamKind::Text => value.is_string(),
        ParamKind::Json { .. } => {
            kind.check_json(&value)?;
            true
        }
    };
    if ok {
        Ok(value)
    } else {
        Err(format!("JSON body {value} is not a {}", kind.name()))
    }
}
