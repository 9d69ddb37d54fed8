use cinderir::{error::Error, function::Function, module::Module};

#[test]
fn unprefixed_names_count_up() {
    let mut f = Function::new("f");
    assert_eq!(f.make_name(None), "1");
    assert_eq!(f.make_name(None), "2");
    assert_eq!(f.make_name(None), "3");
}

#[test]
fn prefixed_names_disambiguate_through_the_shared_counter() {
    let mut f = Function::new("f");
    assert_eq!(f.make_name(None), "1");
    assert_eq!(f.make_name(Some("x")), "x");
    assert_eq!(
        f.make_name(Some("x")),
        "x.2",
        "disambiguation numbers come from the single function-wide counter"
    );
    assert_eq!(f.make_name(None), "3");
    assert_eq!(f.make_name(Some("y")), "y");
    assert_eq!(f.make_name(Some("x")), "x.4");
}

#[test]
fn the_empty_prefix_is_reserved_from_the_start() {
    let mut f = Function::new("f");
    assert_eq!(f.make_name(Some("")), ".1");
}

#[test]
fn make_name_never_repeats() {
    let mut f = Function::new("f");
    let mut seen = std::collections::HashSet::new();
    for i in 0..100 {
        let name = if i % 3 == 0 {
            f.make_name(None)
        } else {
            f.make_name(Some("v"))
        };
        assert!(seen.insert(name), "allocator returned a duplicate name");
    }
}

#[test]
fn colliding_functions_are_uniquified() {
    let mut module = Module::new();
    module.add(Function::new("foo"), None);
    module.add(Function::new("foo"), None);

    assert!(module.contains("foo"));
    assert!(module.contains("foo;1"));
    assert_eq!(module.len(), 2);

    let renamed = module.get("foo;1").unwrap();
    assert_eq!(renamed.name(), Some("foo;1"));
    assert_eq!(renamed.original_name(), Some("foo"));
}

#[test]
fn anonymous_functions_get_the_fallback_base() {
    let mut module = Module::new();
    module.add(Function::anonymous(), None);
    assert!(module.contains("function;1"));
}

#[test]
fn a_name_prefix_forces_renaming() {
    let mut module = Module::new();
    module.add(Function::new("foo"), Some("init"));
    assert!(module.contains("init;1"));
    assert!(!module.contains("foo"));
}

#[test]
fn existing_uniquifier_suffixes_do_not_stack() {
    let mut module = Module::new();
    module.add(Function::new("foo;7"), None);
    module.add(Function::new("foo;7"), None);

    assert!(module.contains("foo;7"), "a unique name is kept verbatim");
    assert!(module.contains("foo;1"), "the suffix is stripped before uniquifying");
}

#[test]
fn registration_replaces_a_previous_entry_at_the_same_key() {
    let mut module = Module::new();
    module.add(Function::new("baz;1"), None);
    module.add(Function::new("baz"), None);
    // collides with "baz", renamed to "baz;1", replacing the first entry
    module.add(Function::new("baz"), None);

    assert_eq!(module.len(), 2);
    assert_eq!(module.get("baz;1").unwrap().original_name(), Some("baz"));
}

#[test]
fn lookup_of_a_missing_function_reports_not_found() {
    let module = Module::new();
    let err = module.get("nope").unwrap_err();
    assert_eq!(err, Error::FunctionNotFound("nope".to_string()));
}

#[test]
fn remove_is_idempotent() {
    let mut module = Module::new();
    module.add(Function::new("foo"), None);
    assert!(module.remove("foo").is_some());
    assert!(module.remove("foo").is_none());
    assert!(!module.contains("foo"));
    assert!(module.is_empty());
}

#[test]
fn module_ids_are_never_reused() {
    let mut module = Module::new();
    module.add(Function::anonymous(), None);
    module.remove("function;1");
    module.add(Function::anonymous(), None);

    assert!(module.contains("function;2"));
    assert!(!module.contains("function;1"));
}
