use std::sync::Arc;

use serde_json::json;
use veneer_packages::NodeResolver;
use veneer_rewrite::{OverlayPackage, OverlayResolver};

use super::fixture::{write_file, write_index, write_package, App};

/// `foo` is rewritten to `foo.1a2b`; `bar` is left alone.
fn app_with_rewritten_foo() -> App {
    let app = App::new();
    write_package(&app.root, "app", &["foo", "bar"]);
    write_package(&app.path("node_modules/foo"), "foo", &["baz"]);
    write_package(&app.path("node_modules/foo/node_modules/baz"), "baz", &[]);
    write_package(&app.path("node_modules/bar"), "bar", &[]);
    write_package(&app.rewritten("foo.1a2b"), "foo", &["baz"]);
    write_index(
        &app.root,
        json!({
            "packages": { "../../foo": "foo.1a2b" },
            "extraResolutions": {}
        }),
    );
    app
}

#[test]
fn rewritten_dependency_is_served_from_its_new_root() {
    let app = app_with_rewritten_foo();
    let resolver = app.resolver();
    let app_pkg = resolver.get(&app.root).expect("app");
    assert!(!app_pkg.is_moved());

    let foo = resolver.resolve("foo", &app_pkg).expect("foo");
    assert!(foo.is_moved());
    assert_eq!(foo.root(), app.rewritten("foo.1a2b"));
    assert_eq!(
        foo.as_moved().map(|moved| moved.original_root().to_path_buf()),
        Some(app.path("node_modules/foo"))
    );

    let bar = resolver.resolve("bar", &app_pkg).expect("bar");
    assert!(matches!(bar, OverlayPackage::Plain(_)));
    assert_eq!(bar.root(), app.path("node_modules/bar"));
}

#[test]
fn repeated_lookups_return_the_same_handle() {
    let app = app_with_rewritten_foo();
    let resolver = app.resolver();
    let app_pkg = resolver.get(&app.root).expect("app");

    let first = resolver.resolve("foo", &app_pkg).expect("foo");
    let second = resolver.resolve("foo", &app_pkg).expect("foo again");
    let by_old_root = resolver.get(&app.path("node_modules/foo")).expect("by old root");
    let by_new_root = resolver.get(&app.rewritten("foo.1a2b")).expect("by new root");

    assert_eq!(first, second);
    assert_eq!(first, by_old_root);
    assert_eq!(first, by_new_root);
    assert_eq!(resolver.moved_package_count(), 1);
}

#[test]
fn moved_package_resolves_from_its_original_location() {
    let app = app_with_rewritten_foo();
    let resolver = app.resolver();
    let foo = resolver.get(&app.rewritten("foo.1a2b")).expect("foo");

    // baz only exists nested under the original foo.
    let baz = resolver.resolve("baz", &foo).expect("baz");
    assert_eq!(baz.root(), app.path("node_modules/foo/node_modules/baz"));
}

#[test]
fn resolving_from_an_old_root_substitutes_the_result() {
    let app = App::new();
    write_package(&app.root, "app", &["foo"]);
    write_package(&app.path("node_modules/foo"), "foo", &["bar"]);
    write_package(&app.path("node_modules/bar"), "bar", &[]);
    write_package(&app.rewritten("bar.9f"), "bar", &[]);
    write_index(
        &app.root,
        json!({
            "packages": { "../../bar": "bar.9f" },
            "extraResolutions": {}
        }),
    );

    let resolver = app.resolver();
    let foo = resolver.get(&app.path("node_modules/foo")).expect("foo");
    assert!(!foo.is_moved());

    let bar = resolver.resolve("bar", &foo).expect("bar");
    assert!(bar.is_moved());
    assert_eq!(bar.root(), app.rewritten("bar.9f"));
}

#[test]
fn extra_resolutions_add_and_shadow_edges_of_rewritten_packages() {
    let app = App::new();
    write_package(&app.root, "app", &["foo"]);
    write_package(&app.path("node_modules/foo"), "foo", &["bar"]);
    write_package(&app.path("node_modules/bar"), "bar", &[]);
    write_package(&app.path("node_modules/helper"), "helper", &[]);
    write_package(&app.path("vendor/bar"), "bar", &[]);
    write_package(&app.rewritten("foo.1"), "foo", &["bar"]);
    write_index(
        &app.root,
        json!({
            "packages": { "../../foo": "foo.1" },
            "extraResolutions": { "foo.1": ["../../helper", "../../../vendor/bar"] }
        }),
    );

    let resolver = app.resolver();
    let foo = resolver.get(&app.rewritten("foo.1")).expect("foo");

    // Not declared by foo at all.
    let helper = resolver.resolve("helper", &foo).expect("helper");
    assert_eq!(helper.root(), app.path("node_modules/helper"));

    // Declared organically, but the extra edge wins.
    let bar = resolver.resolve("bar", &foo).expect("bar");
    assert_eq!(bar.root(), app.path("vendor/bar"));

    // Extra edges do not show up in the declared dependency list.
    assert!(!foo.has_dependency("helper"));
    let deps = resolver.dependencies(&foo).expect("deps");
    let roots: Vec<_> = deps.iter().map(|dep| dep.root().to_path_buf()).collect();
    assert_eq!(roots, vec![app.path("vendor/bar")]);
}

#[test]
fn original_and_owner_of_file_see_through_the_overlay() {
    let app = app_with_rewritten_foo();
    write_file(&app.rewritten("foo.1a2b").join("index.js"), "");
    write_file(&app.path("node_modules/bar/lib/bar.js"), "");

    let resolver = app.resolver();

    let owner = resolver
        .owner_of_file(&app.rewritten("foo.1a2b").join("index.js"))
        .expect("owner lookup")
        .expect("owned");
    assert!(owner.is_moved());
    assert_eq!(owner.name(), "foo");

    let original = resolver
        .original(&owner)
        .expect("original lookup")
        .expect("rewritten packages have an original");
    assert!(!original.is_moved());
    assert_eq!(original.root(), app.path("node_modules/foo"));

    let bar_owner = resolver
        .owner_of_file(&app.path("node_modules/bar/lib/bar.js"))
        .expect("owner lookup")
        .expect("owned");
    assert_eq!(bar_owner.name(), "bar");
    assert!(resolver.original(&bar_owner).expect("lookup").is_none());
}

#[test]
fn missing_index_leaves_everything_plain() {
    let app = App::new();
    write_package(&app.root, "app", &["foo"]);
    write_package(&app.path("node_modules/foo"), "foo", &[]);

    let resolver = app.resolver();
    assert!(resolver.index().is_empty());

    let app_pkg = resolver.get(&app.root).expect("app");
    let foo = resolver.resolve("foo", &app_pkg).expect("foo");
    assert!(!foo.is_moved());
    assert_eq!(foo.root(), app.path("node_modules/foo"));
    assert_eq!(resolver.moved_package_count(), 0);
}

#[cfg(unix)]
#[test]
fn app_root_reached_through_a_symlink_still_substitutes() {
    let app = app_with_rewritten_foo();
    let link = app.root.with_file_name("link");
    std::os::unix::fs::symlink(&app.root, &link).expect("symlink app root");

    let resolver = OverlayResolver::new(Arc::new(NodeResolver::new(&link))).expect("load index");
    assert_eq!(resolver.app_root(), app.root);

    let app_pkg = resolver.get(&link).expect("app");
    assert!(app_pkg.is_app());

    let foo = resolver.resolve("foo", &app_pkg).expect("foo");
    assert!(foo.is_moved());
    assert_eq!(foo.root(), app.rewritten("foo.1a2b"));

    let via_link = resolver
        .get(&link.join("node_modules/foo"))
        .expect("foo through the link");
    assert_eq!(foo, via_link);
}
