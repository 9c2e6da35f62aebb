//! Recipe parsing.
//!
//! Turns an [`EnvironmentConfig`] into the engine-shaped
//! [`DockerEnvironment`], then applies machine attributes on top of the
//! parsed containers.

use std::collections::BTreeMap;

use berth_common::constants::{DEFAULT_MACHINE_NAME, MEMORY_LIMIT_ATTRIBUTE};
use berth_common::error::{BerthError, Result};
use serde::Deserialize;

use crate::environment::{EnvironmentConfig, Recipe};
use crate::model::{BuildContext, ContainerConfig, DockerEnvironment};

/// Recipe types understood by [`parse_environment`].
pub const SUPPORTED_RECIPE_TYPES: [&str; 3] = ["compose", "dockerimage", "dockerfile"];

/// Top level of a compose recipe. Other top-level keys are ignored.
#[derive(Debug, Deserialize)]
struct ComposeFile {
    #[serde(default)]
    services: BTreeMap<String, ContainerConfig>,
}

/// Parses the recipe of `config` and applies machine attributes.
///
/// # Errors
///
/// Returns [`BerthError::InvalidEnvironment`] if the recipe type is unknown,
/// the recipe has neither content nor location, the compose content is not
/// valid YAML, a configured machine is not declared by the recipe, or a
/// machine attribute is illegal.
pub fn parse_environment(config: &EnvironmentConfig) -> Result<DockerEnvironment> {
    let recipe = &config.recipe;
    let mut environment = match recipe.kind.as_str() {
        "compose" => parse_compose(recipe)?,
        "dockerimage" => single_container(config, image_container(recipe)?),
        "dockerfile" => single_container(config, dockerfile_container(recipe)?),
        other => {
            return Err(invalid(format!(
                "environment type '{other}' is not supported. Supported environment types: {}",
                SUPPORTED_RECIPE_TYPES.join(", ")
            )));
        }
    };

    for (name, machine) in &config.machines {
        let Some(container) = environment.containers.get_mut(name) else {
            return Err(invalid(format!(
                "machine '{name}' is configured but not declared by the recipe"
            )));
        };
        if let Some(value) = machine.attributes.get(MEMORY_LIMIT_ATTRIBUTE) {
            container.mem_limit = Some(parse_memory_limit(name, value)?);
        }
    }

    tracing::debug!(
        kind = %recipe.kind,
        containers = environment.len(),
        "environment recipe parsed"
    );
    Ok(environment)
}

fn parse_compose(recipe: &Recipe) -> Result<DockerEnvironment> {
    let content = recipe
        .content
        .as_deref()
        .ok_or_else(|| invalid("compose recipe must contain content".into()))?;
    let file: ComposeFile = serde_yaml::from_str(content)
        .map_err(|e| invalid(format!("parsing of compose recipe failed: {e}")))?;
    if file.services.is_empty() {
        return Err(invalid("compose recipe declares no services".into()));
    }
    Ok(DockerEnvironment::from_containers(file.services))
}

fn image_container(recipe: &Recipe) -> Result<ContainerConfig> {
    let image = recipe
        .location
        .as_deref()
        .or(recipe.content.as_deref())
        .filter(|image| !image.trim().is_empty())
        .ok_or_else(|| invalid("dockerimage recipe must contain location".into()))?;
    Ok(ContainerConfig::image(image.trim()))
}

fn dockerfile_container(recipe: &Recipe) -> Result<ContainerConfig> {
    let build = match (&recipe.content, &recipe.location) {
        (Some(content), _) => BuildContext {
            dockerfile_content: Some(content.clone()),
            ..BuildContext::default()
        },
        (None, Some(location)) => BuildContext {
            context: Some(location.clone()),
            ..BuildContext::default()
        },
        (None, None) => {
            return Err(invalid(
                "dockerfile recipe must contain location or content".into(),
            ));
        }
    };
    Ok(ContainerConfig {
        build: Some(build),
        ..ContainerConfig::default()
    })
}

/// Names the single container after the only configured machine.
fn single_container(config: &EnvironmentConfig, container: ContainerConfig) -> DockerEnvironment {
    let name = match config.machines.keys().next() {
        Some(name) if config.machines.len() == 1 => name.clone(),
        _ => DEFAULT_MACHINE_NAME.to_owned(),
    };
    DockerEnvironment::from_containers([(name, container)])
}

fn parse_memory_limit(machine: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|bytes| *bytes > 0)
        .ok_or_else(|| {
            invalid(format!(
                "Value of attribute '{MEMORY_LIMIT_ATTRIBUTE}' of machine '{machine}' is illegal"
            ))
        })
}

const fn invalid(message: String) -> BerthError {
    BerthError::InvalidEnvironment { message }
}
