use super::document::{NodeSpec, PipelineDocument};
use super::params;
use crate::engine::{ModuleInstance, Pipeline, PipelineName};
use crate::error::{Error, Result};
use crate::registry::{ModuleDescriptor, ModuleFactory};
use serde_yaml::Value;
use std::collections::HashMap;

/// Builds validated pipelines from YAML documents
pub struct ConfigReader;

impl ConfigReader {
    /// Render `config` with `parameters`, parse it and assemble the pipeline.
    ///
    /// `parameters` must be a flat mapping of placeholder names to scalars
    /// (`None` when the document has no placeholders). `name`, when given,
    /// overrides the document's `name` field and must be a string or a number.
    pub async fn read(
        config: &str,
        factory: &ModuleFactory,
        parameters: Option<Value>,
        name: Option<Value>,
    ) -> Result<Pipeline> {
        let rendered = params::resolve(config, parameters.as_ref())?;
        let tree: Value = serde_yaml::from_str(&rendered)?;
        let document = PipelineDocument::from_yaml(&tree)?;

        let name = match (name, &document.name) {
            (Some(name), _) => PipelineName::from_override(name)?,
            (None, Some(name)) => PipelineName::from_document(name)?,
            (None, None) => PipelineName::generate(),
        };

        Self::build(name, document, factory).await
    }

    /// Read a document from disk; see [`ConfigReader::read`]
    pub async fn read_file(
        path: impl AsRef<std::path::Path>,
        factory: &ModuleFactory,
        parameters: Option<Value>,
        name: Option<Value>,
    ) -> Result<Pipeline> {
        let path = path.as_ref();
        let config = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| Error::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::read(&config, factory, parameters, name).await
    }

    async fn build(
        name: PipelineName,
        document: PipelineDocument,
        factory: &ModuleFactory,
    ) -> Result<Pipeline> {
        let PipelineDocument {
            shared_parameters,
            modules: specs,
            ..
        } = document;

        let mut modules: Vec<ModuleInstance> = Vec::with_capacity(specs.len());
        let mut positions: HashMap<String, usize> = HashMap::new();

        for spec in specs {
            if positions.contains_key(&spec.name) {
                return Err(Error::DuplicateModuleName { name: spec.name });
            }

            let descriptor = &factory.lookup(&spec.name, &spec.type_name)?.descriptor;

            // Only already-declared modules can be depended upon
            let inputs = spec
                .depends_on
                .iter()
                .map(|dependency| {
                    positions
                        .get(dependency)
                        .copied()
                        .ok_or_else(|| Error::UnknownDependency {
                            module: spec.name.clone(),
                            dependency: dependency.clone(),
                        })
                })
                .collect::<Result<Vec<_>>>()?;

            for &input in &inputs {
                check_edge(&modules[input], &spec, descriptor)?;
            }

            let exposed = spec
                .expose
                .resolve(&spec.name, descriptor.declared_expose());

            let mut parameters = shared_parameters.clone();
            parameters.extend(spec.parameters);

            let (module, descriptor) = factory
                .create(
                    &spec.name,
                    &spec.type_name,
                    serde_json::Value::Object(parameters),
                )
                .await?;

            tracing::debug!(
                module = %spec.name,
                type_name = %spec.type_name,
                inputs = ?spec.depends_on,
                exposed = ?exposed,
                "module.created"
            );

            positions.insert(spec.name.clone(), modules.len());
            modules.push(ModuleInstance::new(
                spec.name,
                spec.type_name,
                spec.group,
                descriptor.produces(),
                spec.depends_on,
                inputs,
                exposed,
                module,
            ));
        }

        check_labels(&modules)?;

        tracing::info!(pipeline = %name, modules = modules.len(), "pipeline.built");
        Ok(Pipeline::new(name, modules))
    }
}

/// Exposure labels must be unique across the pipeline
fn check_labels(modules: &[ModuleInstance]) -> Result<()> {
    let mut labels: HashMap<&str, &str> = HashMap::new();
    for instance in modules {
        let Some(label) = instance.exposed() else {
            continue;
        };
        if let Some(first) = labels.insert(label, instance.name()) {
            return Err(Error::DuplicateExposeLabel {
                label: label.to_string(),
                first: first.to_string(),
                second: instance.name().to_string(),
            });
        }
    }
    Ok(())
}

/// The dependent must accept the dependency's produced interface or a supertype of it
fn check_edge(
    dependency: &ModuleInstance,
    spec: &NodeSpec,
    descriptor: &ModuleDescriptor,
) -> Result<()> {
    let incompatible = |reason: String| Error::IncompatibleInterface {
        module: spec.name.clone(),
        dependency: dependency.name().to_string(),
        reason,
    };

    let produced = dependency.interface().ok_or_else(|| {
        incompatible(format!(
            "`{}` ({}) produces no output",
            dependency.name(),
            dependency.type_name()
        ))
    })?;

    if descriptor.accepts().is_empty() {
        return Err(incompatible(format!(
            "`{}` ({}) accepts no input",
            spec.name, spec.type_name
        )));
    }

    if !descriptor.accepts_interface(produced) {
        let accepted: Vec<&str> = descriptor.accepts().iter().map(|i| i.name()).collect();
        return Err(incompatible(format!(
            "{produced} is not accepted by `{}` (accepts {})",
            spec.name,
            accepted.join(", ")
        )));
    }

    Ok(())
}
