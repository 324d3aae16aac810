use tessera_core::{Expr, FunctionDecl, FunctionKey, Stmt};
use tessera_ir::FragmentType;

use crate::compositor::{CompositorError, ShaderDefinition};
use crate::diagnostics::DiagnosticKind;
use crate::emit::MAGIC;
use crate::intrinsics::ShaderIntrinsics;
use crate::settings::{Settings, SettingsError};
use crate::test_utils::{fragment, pass_through, project, ty};
use crate::{Error, ShaderProject};

#[test]
fn build_emits_every_stage() {
    let settings = Settings::default();
    let intrinsics = ShaderIntrinsics::new().unwrap();
    let mut shaders = ShaderProject::new(&settings, &intrinsics).unwrap();
    let (fragments, def) = pass_through();

    let fragments = shaders.compile_fragments(&project(fragments)).unwrap();
    let built = shaders.build(fragments, &def).unwrap();

    assert!(shaders.diagnostics().is_empty(), "{}", shaders.diagnostics().render());
    assert_eq!(built.name, "Flat");
    let classes: Vec<_> = built.stages.iter().map(|s| (s.stage, s.class_name.as_str())).collect();
    assert_eq!(
        classes,
        [(FragmentType::Vertex, "Flat_Vertex"), (FragmentType::Pixel, "Flat_Pixel")]
    );
    for stage in &built.stages {
        assert_eq!(stage.module.words[0], MAGIC);
        assert_eq!(stage.module.stages, [stage.stage]);
    }
    let pixel = built.stage(FragmentType::Pixel).unwrap();
    assert_eq!(pixel.module.specialization.spec_id("Shade_Strength"), Some(1));
}

#[test]
fn failed_translation_keeps_diagnostics() {
    let settings = Settings::default();
    let intrinsics = ShaderIntrinsics::new().unwrap();
    let mut shaders = ShaderProject::new(&settings, &intrinsics).unwrap();
    let nope = FunctionKey::new(ty("Math"), "Nope", Vec::new());
    let broken = fragment("Broken", "Pixel").with_function(
        FunctionDecl::new("Helper")
            .with_body(vec![Stmt::expr(Expr::static_call(nope, Vec::new(), ty("Real")))]),
    );

    let err = shaders.compile_fragments(&project([broken])).unwrap_err();
    match err {
        Error::TranslationFailed(diag) => assert!(diag.contains(DiagnosticKind::UnresolvedSymbol)),
        other => panic!("expected a translation failure, got {other:?}"),
    }
    assert!(shaders.diagnostics().has_errors());
}

#[test]
fn composite_failure_keeps_diagnostics() {
    let settings = Settings::default();
    let intrinsics = ShaderIntrinsics::new().unwrap();
    let mut shaders = ShaderProject::new(&settings, &intrinsics).unwrap();
    let (fragments, _) = pass_through();
    let fragments = shaders.compile_fragments(&project(fragments)).unwrap();

    let def = ShaderDefinition::new("NoVertex").with_fragment("Shade");
    let err = shaders.build(fragments, &def).unwrap_err();

    assert!(matches!(err, Error::Compositor(CompositorError::MissingStage("Vertex"))));
    assert!(shaders.diagnostics().contains(DiagnosticKind::MissingStage));
    assert!(shaders.take_diagnostics().has_errors());
    assert!(shaders.diagnostics().is_empty());
}

#[test]
fn settings_are_validated_up_front() {
    let mut settings = Settings::default();
    settings.max_render_targets = 2;
    let intrinsics = ShaderIntrinsics::new().unwrap();

    let Err(err) = ShaderProject::new(&settings, &intrinsics) else {
        panic!("settings should be rejected");
    };
    assert!(matches!(
        err,
        Error::Settings(SettingsError::TooManyRenderTargets { count: 8, max: 2 })
    ));
}
