use tessera_core::{FieldKey, TypeRef};
use tessera_ir::FragmentType;

use super::linking::StageLinking;
use crate::settings::Settings;

/// What a composite callback sees of a stage before its class is
/// generated. Fields added here end up on the stage class even when no
/// fragment asks for them.
pub struct CompositorCallbackData<'a> {
    settings: &'a Settings,
    stage: &'a mut StageLinking,
}

impl<'a> CompositorCallbackData<'a> {
    pub(crate) fn new(settings: &'a Settings, stage: &'a mut StageLinking) -> Self {
        Self { settings, stage }
    }

    pub fn settings(&self) -> &'a Settings {
        self.settings
    }

    pub fn stage(&self) -> FragmentType {
        self.stage.stage
    }

    pub fn fragment_names(&self) -> impl Iterator<Item = &str> {
        self.stage.fragments.iter().map(|f| f.name())
    }

    /// Reads a hardware built-in into the per-vertex data.
    pub fn add_hardware_input(&mut self, key: FieldKey) {
        let ty = type_of(&key);
        self.stage
            .vertex
            .add_hardware_input(&key, &ty, &self.settings.names);
    }

    /// Writes a hardware built-in from the per-vertex data.
    pub fn add_hardware_output(&mut self, key: FieldKey) {
        let ty = type_of(&key);
        self.stage
            .vertex
            .add_hardware_output(&key, &ty, &self.settings.names);
    }

    /// Exposes an app built-in to the stage's per-primitive data.
    pub fn add_app_built_in_input(&mut self, key: FieldKey) {
        let ty = type_of(&key);
        self.stage
            .primitive
            .add_app_built_in(&key, &ty, &self.settings.names);
    }

    pub fn has_hardware_input(&self, key: &FieldKey) -> bool {
        self.stage.vertex.hardware_inputs.contains(key)
    }

    pub fn has_hardware_output(&self, key: &FieldKey) -> bool {
        self.stage.vertex.hardware_outputs.contains(key)
    }
}

fn type_of(key: &FieldKey) -> TypeRef {
    key.type_name
        .parse()
        .unwrap_or_else(|_| TypeRef::named(key.type_name.clone()))
}
