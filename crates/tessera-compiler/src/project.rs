//! One-stop compile of fragments into per-stage SPIR-V.
//!
//! ```text
//! Project ──translate──▶ fragment Library ──composite──▶ stage classes
//!         ──translate──▶ composite Library ──emit──▶ one module per stage
//! ```
//!
//! Diagnostics of every step accumulate on the project, so a failed step
//! can still be rendered after its error is returned.

use std::sync::Arc;

use serde::Serialize;
use tessera_core::Project;
use tessera_ir::{FragmentType, Library, Module};

use crate::compositor::{CompositeShader, Compositor, ShaderDefinition};
use crate::diagnostics::Diagnostics;
use crate::emit::{EmittedModule, emit};
use crate::frontend::translate;
use crate::intrinsics::ShaderIntrinsics;
use crate::settings::Settings;
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize)]
pub struct BuiltStage {
    pub stage: FragmentType,
    pub class_name: String,
    pub module: EmittedModule,
}

#[derive(Debug, Clone)]
pub struct BuiltShader {
    pub name: String,
    pub composite: CompositeShader,
    /// The translated stage classes.
    pub library: Arc<Library>,
    pub stages: Vec<BuiltStage>,
}

impl BuiltShader {
    pub fn stage(&self, stage: FragmentType) -> Option<&BuiltStage> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

pub struct ShaderProject<'a> {
    settings: &'a Settings,
    intrinsics: &'a ShaderIntrinsics,
    dependencies: Module,
    diagnostics: Diagnostics,
}

impl<'a> ShaderProject<'a> {
    pub fn new(settings: &'a Settings, intrinsics: &'a ShaderIntrinsics) -> Result<Self> {
        settings.finalize()?;
        Ok(Self {
            settings,
            intrinsics,
            dependencies: Module::default(),
            diagnostics: Diagnostics::new(),
        })
    }

    /// Translated libraries the fragments may reference.
    pub fn with_dependencies(mut self, dependencies: Module) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    /// Translates fragment classes. Any error diagnostic fails the compile.
    pub fn compile_fragments(&mut self, project: &Project) -> Result<Arc<Library>> {
        let lib = self.translate(project, &self.dependencies.clone())?;
        Ok(Arc::new(lib))
    }

    pub fn composite(
        &mut self,
        fragments: &Library,
        def: &ShaderDefinition,
    ) -> Result<CompositeShader> {
        let compositor = Compositor::new(self.settings, fragments);
        Ok(compositor.composite(def, &mut self.diagnostics)?)
    }

    /// Composites `def`, translates the stage classes and emits one module
    /// per stage.
    pub fn build(
        &mut self,
        fragments: Arc<Library>,
        def: &ShaderDefinition,
    ) -> Result<BuiltShader> {
        let composite = self.composite(&fragments, def)?;

        let mut deps = Module::new([fragments]);
        for lib in self.dependencies.iter() {
            deps.push(lib.clone());
        }
        let library = Arc::new(self.translate(&composite.project(), &deps)?);

        let mut stages = Vec::with_capacity(composite.stages.len());
        for description in &composite.stages {
            let ty = library.find_type(&description.class_name, false).ok_or_else(|| {
                Error::Emit(crate::emit::EmitError::NoEntryPoint(description.class_name.clone()))
            })?;
            let module = emit(&library, &[ty])?;
            log::info!(
                "built {} stage of '{}': {} words",
                description.stage.name(),
                composite.name,
                module.words.len()
            );
            stages.push(BuiltStage {
                stage: description.stage,
                class_name: description.class_name.clone(),
                module,
            });
        }
        Ok(BuiltShader {
            name: composite.name.clone(),
            composite,
            library,
            stages,
        })
    }

    fn translate(&mut self, project: &Project, deps: &Module) -> Result<Library> {
        let result = translate(project, self.settings, self.intrinsics, deps);
        let (lib, diag) = match result {
            Ok(ok) => ok,
            Err(Error::Recursion(diag)) => {
                self.diagnostics.extend(diag.clone());
                return Err(Error::Recursion(diag));
            }
            Err(err) => return Err(err),
        };
        let failed = diag.has_errors();
        if failed {
            self.diagnostics.extend(diag.clone());
            return Err(Error::TranslationFailed(diag));
        }
        self.diagnostics.extend(diag);
        Ok(lib)
    }
}
