//! YAML spec documents
//!
//! Reads a spec, with the validation errors already found for it, from a
//! YAML file and compiles it into the step tree and validation maps the
//! executor works on.

mod schema;

pub use schema::*;

use std::path::Path;

use crate::common::{Error, Result};
use crate::model::{Item, Scenario, Spec, Step, ValidationErrMaps, ValidationError};

/// Load a spec document from `path`
pub fn load(path: &Path) -> Result<SpecDocument> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    parse(&content, &path.display().to_string())
}

/// Parse a spec document; `path` is only used in errors
pub fn parse(content: &str, path: &str) -> Result<SpecDocument> {
    let document: SpecDocument =
        serde_yaml::from_str(content).map_err(|e| Error::invalid_document(path, e.to_string()))?;
    if document.name.trim().is_empty() {
        return Err(Error::invalid_document(path, "spec name is empty"));
    }
    Ok(document)
}

impl SpecDocument {
    /// Build the step tree and file every recorded validation error
    ///
    /// Step errors are filed under the step's pattern and against every
    /// scenario that runs the step. Errors on contexts and teardowns reach
    /// every scenario.
    pub fn compile(self, default_file: &str) -> (Spec, ValidationErrMaps) {
        let err_map = ValidationErrMaps::new();
        let file = self.file.unwrap_or_else(|| default_file.to_string());
        let compiler = Compiler {
            file: &file,
            err_map: &err_map,
        };

        let mut shared_errors = Vec::new();
        let contexts = compiler.steps(self.contexts, &mut shared_errors);
        let teardowns = compiler.steps(self.teardowns, &mut shared_errors);

        let scenarios = self
            .scenarios
            .into_iter()
            .map(|doc| compiler.scenario(doc, &shared_errors))
            .collect();

        let spec = Spec {
            name: self.name,
            file_name: file.clone(),
            tags: self.tags,
            contexts,
            teardowns,
            scenarios,
        };
        (spec, err_map)
    }
}

struct Compiler<'a> {
    file: &'a str,
    err_map: &'a ValidationErrMaps,
}

impl Compiler<'_> {
    fn scenario(&self, doc: ScenarioDocument, shared_errors: &[ValidationError]) -> Scenario {
        let mut errors = shared_errors.to_vec();
        let items = doc
            .items
            .into_iter()
            .filter_map(|item| self.item(item, &mut errors))
            .collect();

        let mut scenario = Scenario::new(doc.heading, doc.line, items);
        scenario.tags = doc.tags;

        let heading = Step::new(
            scenario.heading.text.clone(),
            scenario.heading.text.clone(),
            scenario.heading.line_no,
        );
        errors.extend(
            doc.errors
                .iter()
                .map(|e| ValidationError::new(&heading, self.file, e.message(), e.kind)),
        );
        for error in errors {
            self.err_map.add_scenario_error(scenario.key(), error);
        }
        scenario
    }

    /// Steps only; comments and tables are dropped
    fn steps(&self, docs: Vec<ItemDocument>, errors: &mut Vec<ValidationError>) -> Vec<Step> {
        docs.into_iter()
            .filter_map(|doc| self.step(doc, errors))
            .collect()
    }

    fn item(&self, doc: ItemDocument, errors: &mut Vec<ValidationError>) -> Option<Item> {
        match doc {
            ItemDocument::Comment { comment } => Some(Item::Comment(comment)),
            ItemDocument::Table { table } => Some(Item::Table(table)),
            step => self.step(step, errors).map(Item::Step),
        }
    }

    fn step(&self, doc: ItemDocument, errors: &mut Vec<ValidationError>) -> Option<Step> {
        let (step, error) = match doc {
            ItemDocument::Step {
                step,
                pattern,
                args,
                line,
                error,
            } => {
                let pattern = pattern.unwrap_or_else(|| step.clone());
                (Step::new(step, pattern, line).with_args(args), error)
            }
            ItemDocument::Concept {
                concept,
                pattern,
                args,
                line,
                steps,
                error,
            } => {
                let pattern = pattern.unwrap_or_else(|| concept.clone());
                let children = self.steps(steps, errors);
                (
                    Step::concept(concept, pattern, line, children).with_args(args),
                    error,
                )
            }
            ItemDocument::Comment { .. } | ItemDocument::Table { .. } => return None,
        };

        if let Some(doc) = error {
            let error = ValidationError::new(&step, self.file, doc.message(), doc.kind);
            self.err_map
                .add_step_error(error.clone(), step.parameterized_text.clone());
            errors.push(error);
        }
        Some(step)
    }
}
