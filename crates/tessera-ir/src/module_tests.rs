use std::sync::Arc;

use crate::{Library, Module, TypeKind};

fn locked(name: &str, deps: Module, types: &[&str]) -> Arc<Library> {
    let mut lib = Library::new(name, deps).unwrap();
    for ty in types {
        lib.add_type(*ty, TypeKind::Struct).unwrap();
    }
    lib.lock();
    Arc::new(lib)
}

#[test]
fn flattens_transitive_dependencies_once() {
    let core = locked("core", Module::default(), &["Real"]);
    let a = locked("a", Module::new([core.clone()]), &["A"]);
    let b = locked("b", Module::new([core.clone()]), &["B"]);

    let module = Module::new([a.clone(), b.clone()]);
    let names: Vec<&str> = module.iter().map(|l| l.name()).collect();
    assert_eq!(names, vec!["a", "core", "b"]);
    assert!(module.contains(core.id()));
}

#[test]
fn first_library_wins() {
    let first = locked("first", Module::default(), &["Shared"]);
    let second = locked("second", Module::default(), &["Shared"]);

    let module = Module::new([first.clone(), second]);
    let found = module.find_type("Shared").unwrap();
    assert_eq!(found.library, first.id());
}

#[test]
fn library_lookup_by_id() {
    let core = locked("core", Module::default(), &[]);
    let module = Module::new([core.clone()]);

    assert_eq!(module.library(core.id()).map(|l| l.name()), Some("core"));
    assert_eq!(module.len(), 1);
    assert!(Module::default().is_empty());
}
