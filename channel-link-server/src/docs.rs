//! OpenAPI doc generation.

use crate::{
    error::AppError,
    routes::{health, interactions, ping},
};
use channel_link_core::common::{
    CallbackType, CommandData, CommandOption, Interaction, InteractionResponse, InteractionType,
    MessageData,
};
use utoipa::OpenApi;

/// API documentation generator.
#[derive(OpenApi)]
#[openapi(
    paths(health::healthcheck, ping::get, interactions::post),
    components(
        schemas(
            AppError,
            Interaction,
            InteractionType,
            CommandData,
            CommandOption,
            InteractionResponse,
            CallbackType,
            MessageData,
            health::HealthcheckResponse
        )
    )
)]

/// Tied to OpenAPI documentation.
#[derive(Debug)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use testresult::TestResult;

    fn collect_refs<'a>(value: &'a Value, refs: &mut Vec<&'a str>) {
        match value {
            Value::Object(map) => {
                for (key, value) in map {
                    match (key.as_str(), value) {
                        ("$ref", Value::String(reference)) => refs.push(reference),
                        _ => collect_refs(value, refs),
                    }
                }
            }
            Value::Array(values) => values.iter().for_each(|value| collect_refs(value, refs)),
            _ => {}
        }
    }

    #[test]
    fn test_all_schema_refs_resolve() -> TestResult {
        let doc = serde_json::to_value(ApiDoc::openapi())?;
        let schemas = &doc["components"]["schemas"];

        let mut refs = Vec::new();
        collect_refs(&doc, &mut refs);
        assert!(!refs.is_empty());

        for reference in refs {
            let name = reference.trim_start_matches("#/components/schemas/");
            assert!(schemas.get(name).is_some(), "dangling reference {reference}");
        }
        Ok(())
    }
}
