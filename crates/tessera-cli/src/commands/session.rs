//! Loaded inputs plus the compiler objects built over them.

use std::path::Path;

use tessera_compiler::{Diagnostics, Settings, ShaderIntrinsics, ShaderProject};
use tessera_core::Project;

use super::CommandError;
use super::loader::{load_project, load_settings};

pub struct Session {
    pub project: Project,
    settings: Settings,
    intrinsics: ShaderIntrinsics,
    color: bool,
}

impl Session {
    pub fn open(
        project_path: &Path,
        settings_path: Option<&Path>,
        color: bool,
    ) -> Result<Self, CommandError> {
        let project = load_project(project_path)?;
        let settings = load_settings(settings_path)?;
        let intrinsics = ShaderIntrinsics::new().map_err(tessera_compiler::Error::from)?;
        log::info!(
            "project '{}': {} sources, {} classes",
            project.name,
            project.sources.len(),
            project.classes().count()
        );
        Ok(Self {
            project,
            settings,
            intrinsics,
            color,
        })
    }

    pub fn shader_project(&self) -> Result<ShaderProject<'_>, CommandError> {
        Ok(ShaderProject::new(&self.settings, &self.intrinsics)?)
    }

    pub fn render(&self, diagnostics: &Diagnostics) -> String {
        diagnostics
            .printer()
            .sources(&self.project.sources)
            .colored(self.color)
            .render()
    }

    /// Attaches the diagnostics `shaders` collected so far to a failed step.
    pub fn reject(
        &self,
        shaders: &ShaderProject<'_>,
        err: tessera_compiler::Error,
    ) -> CommandError {
        if shaders.diagnostics().is_empty() {
            return err.into();
        }
        CommandError::Rejected {
            message: err.to_string(),
            rendered: self.render(shaders.diagnostics()),
        }
    }
}
