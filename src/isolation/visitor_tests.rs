use super::*;
use crate::core::namespace::NamespaceSet;
use indexmap::indexmap;
use tempfile::tempdir;

const PREFIX: &str = "Custom\\VendorPrefix";

fn checker_for(namespaces: &[&str]) -> NamespaceChecker {
    let set: NamespaceSet = namespaces.iter().collect();
    NamespaceChecker::new(set.with_ancestors(), PREFIX)
}

fn rewrite_with(checker: &NamespaceChecker, source: &str) -> FileRewrite {
    let mut parser = PhpParser::new().unwrap();
    NamespaceRewriter::new(checker)
        .rewrite_source(&mut parser, source, "test.php")
        .unwrap()
}

fn text(rewrite: &FileRewrite) -> &str {
    std::str::from_utf8(&rewrite.contents).unwrap()
}

fn rewrite(source: &str) -> FileRewrite {
    rewrite_with(&checker_for(&["Vendor1\\Package"]), source)
}

#[test]
fn test_reference_scenario() {
    let source = r#"<?php
namespace Vendor1\Package;

use \Vendor1\Package\ExplicitRoot;

class Test
{
    public function run()
    {
        $a = new Vendor1\Package\AssumedRoot();
        $b = new \Vendor1\Package\ExplicitRoot();
        $c = new ExplicitRoot();
        return \Vendor1\Package\Classy::SOMETHING;
    }
}
"#;
    let expected = r#"<?php
namespace Custom\VendorPrefix\Vendor1\Package;

use Custom\VendorPrefix\Vendor1\Package\ExplicitRoot;

class Test
{
    public function run()
    {
        $a = new Vendor1\Package\AssumedRoot();
        $b = new \Custom\VendorPrefix\Vendor1\Package\ExplicitRoot();
        $c = new ExplicitRoot();
        return \Custom\VendorPrefix\Vendor1\Package\Classy::SOMETHING;
    }
}
"#;

    let result = rewrite(source);
    assert!(result.mutated);
    assert_eq!(text(&result), expected);
}

#[test]
fn test_second_pass_changes_nothing() {
    let source = r#"<?php
namespace Vendor1\Package;

use Vendor1\Package\Sub\Helper;

function make() {
    return [\Vendor1\Package\Sub\Helper::class, 'Vendor1\Package\Sub\Helper'];
}
"#;
    let checker = checker_for(&["Vendor1\\Package", "Vendor1\\Package\\Sub"]);
    let first = rewrite_with(&checker, source);
    assert!(first.mutated);

    // Rediscover from the rewritten output, as a second run would.
    let mut parser = PhpParser::new().unwrap();
    let declared = parser
        .parse_source(text(&first), "test.php")
        .unwrap()
        .declared_namespaces();
    let mut namespaces: Vec<&str> = declared.iter().map(String::as_str).collect();
    namespaces.push("Vendor1\\Package\\Sub");
    let second_checker = checker_for(&namespaces);

    let second = rewrite_with(&second_checker, text(&first));
    assert!(!second.mutated);
    assert_eq!(text(&second), text(&first));
}

#[test]
fn test_unmatched_file_is_byte_identical() {
    let source = "<?php\n// comment \\Vendor1\\Package\\Foo\nnamespace Other\\Lib;\n\n$x  =  new \\Other\\Lib\\Thing( 'hello' );\n";
    let result = rewrite(source);
    assert!(!result.mutated);
    assert_eq!(result.edits, 0);
    assert_eq!(text(&result), source);
}

#[test]
fn test_global_scope_rewrites_relative_names() {
    let source = "<?php\n$x = new Vendor1\\Package\\Foo();\n$y = Vendor1\\Package\\helper();\n";
    let result = rewrite(source);
    assert_eq!(
        text(&result),
        "<?php\n$x = new Custom\\VendorPrefix\\Vendor1\\Package\\Foo();\n$y = Custom\\VendorPrefix\\Vendor1\\Package\\helper();\n"
    );
}

#[test]
fn test_namespace_relative_names_are_left_alone() {
    let source = "<?php\n$x = new namespace\\Vendor1\\Package\\Foo();\n";
    let result = rewrite(source);
    assert!(!result.mutated);
}

#[test]
fn test_aliased_leading_segment_is_left_alone() {
    let source = "<?php\nuse Other\\Thing as Vendor1;\n\n$x = new Vendor1\\Package\\Foo();\n";
    let result = rewrite(source);
    assert!(!result.mutated, "got:\n{}", text(&result));
}

#[test]
fn test_single_segment_imports_are_untouched() {
    let source = "<?php\nuse Vendor1;\nuse Vendor1\\Package;\n";
    let result = rewrite(source);
    assert_eq!(
        text(&result),
        "<?php\nuse Vendor1;\nuse Custom\\VendorPrefix\\Vendor1\\Package;\n"
    );
}

#[test]
fn test_function_and_const_imports() {
    let source = "<?php\nuse function Vendor1\\Package\\helper;\nuse const Vendor1\\Package\\VERSION;\n";
    let result = rewrite(source);
    assert_eq!(
        text(&result),
        "<?php\nuse function Custom\\VendorPrefix\\Vendor1\\Package\\helper;\nuse const Custom\\VendorPrefix\\Vendor1\\Package\\VERSION;\n"
    );
}

#[test]
fn test_group_import_prefix_and_aliases() {
    let source = "<?php\nuse Vendor1\\Package\\{Foo, Bar as Vendor1};\n\n$x = new Vendor1\\Package\\Baz();\n";
    let result = rewrite(source);
    assert_eq!(
        text(&result),
        "<?php\nuse Custom\\VendorPrefix\\Vendor1\\Package\\{Foo, Bar as Vendor1};\n\n$x = new Vendor1\\Package\\Baz();\n"
    );
}

#[test]
fn test_string_literals() {
    let source = r#"<?php
$a = 'Vendor1\Package\Foo';
$b = "\\Vendor1\\Package\\Foo";
$c = 'Vendor1\Package';
$d = 'Something\Else';
$e = 'hello';
$f = "Vendor1\\{$name}";
"#;
    let expected = r#"<?php
$a = 'Custom\VendorPrefix\Vendor1\Package\Foo';
$b = "\\Custom\\VendorPrefix\\Vendor1\\Package\\Foo";
$c = 'Custom\VendorPrefix\Vendor1\Package';
$d = 'Something\Else';
$e = 'hello';
$f = "Vendor1\\{$name}";
"#;
    let result = rewrite(source);
    assert_eq!(text(&result), expected);
}

#[test]
fn test_braced_namespaces_restore_scope() {
    let source = r#"<?php
namespace Vendor1\Package {
    use Other\Lib as Vendor1;
    $a = new Vendor1\Package\Inner();
}
namespace {
    $b = new Vendor1\Package\Outer();
    $c = new \Vendor1\Package\Rooted();
}
"#;
    let expected = r#"<?php
namespace Custom\VendorPrefix\Vendor1\Package {
    use Other\Lib as Vendor1;
    $a = new Vendor1\Package\Inner();
}
namespace {
    $b = new Vendor1\Package\Outer();
    $c = new \Vendor1\Package\Rooted();
}
"#;
    // The alias bound in the first block is still visible in the second.
    let result = rewrite(source);
    assert_eq!(text(&result), expected);
}

#[test]
fn test_global_block_without_aliases() {
    let source = "<?php\nnamespace {\n    $b = new Vendor1\\Package\\Outer();\n}\n";
    let result = rewrite(source);
    assert_eq!(
        text(&result),
        "<?php\nnamespace {\n    $b = new Custom\\VendorPrefix\\Vendor1\\Package\\Outer();\n}\n"
    );
}

#[test]
fn test_prefixed_names_are_never_prefixed_again() {
    let checker = checker_for(&["Custom\\VendorPrefix\\Vendor1\\Package"]);
    let source = "<?php\nnamespace Custom\\VendorPrefix\\Vendor1\\Package;\n\n$x = \\Custom\\VendorPrefix\\Vendor1\\Package\\Foo::class;\n";
    let result = rewrite_with(&checker, source);
    assert!(!result.mutated);
}

#[test]
fn test_parse_error_is_returned() {
    let checker = checker_for(&["Vendor1\\Package"]);
    let mut parser = PhpParser::new().unwrap();
    let result = NamespaceRewriter::new(&checker).rewrite_source(
        &mut parser,
        "<?php\nnamespace Vendor1\\Package;\nclass {",
        "broken.php",
    );
    assert!(result.is_err());
}

#[test]
fn test_rewrite_file_applies_replacements_after_rewrite() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Container.php");
    std::fs::write(
        &path,
        "<?php\nnamespace Vendor1\\Package;\n\nconst LABEL = 'legacy';\n",
    )
    .unwrap();

    let checker = checker_for(&["Vendor1\\Package"]);
    let mut parser = PhpParser::new().unwrap();
    let table: ReplacementTable = indexmap! {
        "'legacy'".to_string() => "'isolated'".to_string(),
    };

    let result = NamespaceRewriter::new(&checker)
        .rewrite_file(&mut parser, &path, Some(&table))
        .unwrap();
    assert!(result.mutated);
    assert_eq!(
        text(&result),
        "<?php\nnamespace Custom\\VendorPrefix\\Vendor1\\Package;\n\nconst LABEL = 'isolated';\n"
    );
}

#[test]
fn test_replacements_alone_mark_mutation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plain.php");
    std::fs::write(&path, "<?php\necho 'a';\n").unwrap();

    let checker = checker_for(&["Vendor1\\Package"]);
    let mut parser = PhpParser::new().unwrap();
    let table: ReplacementTable = indexmap! { "'a'".to_string() => "'b'".to_string() };
    let rewriter = NamespaceRewriter::new(&checker);

    let result = rewriter.rewrite_file(&mut parser, &path, Some(&table)).unwrap();
    assert!(result.mutated);
    assert_eq!(result.edits, 0);

    let untouched = rewriter.rewrite_file(&mut parser, &path, None).unwrap();
    assert!(!untouched.mutated);
}

#[test]
fn test_alias_table() {
    let mut table = AliasTable::default();
    assert!(table.is_empty());
    table.bind("Pkg", "Vendor1\\Package");
    assert!(table.is_alias("Pkg"));
    assert!(!table.is_alias("pkg"));
    assert_eq!(table.len(), 1);
}

#[test]
fn test_rewrite_file_preserves_non_utf8_bytes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Legacy.php");
    std::fs::write(
        &path,
        b"<?php namespace Vendor1\\Package; $s = 'caf\xE9';\n",
    )
    .unwrap();

    let checker = checker_for(&["Vendor1\\Package"]);
    let mut parser = PhpParser::new().unwrap();
    let rewriter = NamespaceRewriter::new(&checker);
    let result = rewriter.rewrite_file(&mut parser, &path, None).unwrap();
    assert!(result.mutated);
    assert!(FileReader::write_if_changed(&path, &result.contents).unwrap());

    assert_eq!(
        std::fs::read(&path).unwrap(),
        b"<?php namespace Custom\\VendorPrefix\\Vendor1\\Package; $s = 'caf\xE9';\n"
    );
    let again = rewriter.rewrite_file(&mut parser, &path, None).unwrap();
    assert!(!again.mutated);
}
