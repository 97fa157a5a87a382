use super::*;
use std::fs;
use tempfile::tempdir;

const FILES_ARTIFACT: &str = r#"<?php

// autoload_files.php @generated by Composer

$vendorDir = dirname(__DIR__);
$baseDir = dirname($vendorDir);

return array(
    '320cde22f66dd4f5d3fd621d3e88b98f' => $vendorDir . '/symfony/polyfill-ctype/bootstrap.php',
    '0e6d7bf4a5811bfa5cf40c5ccd6fae6a' => $vendorDir . '/symfony/polyfill-mbstring/bootstrap.php',
);
"#;

const STATIC_ARTIFACT: &str = r#"<?php

// autoload_static.php @generated by Composer

namespace Composer\Autoload;

class ComposerStaticInitabc123
{
    public static $files = array (
        '320cde22f66dd4f5d3fd621d3e88b98f' => __DIR__ . '/..' . '/symfony/polyfill-ctype/bootstrap.php',
    );

    public static $prefixLengthsPsr4 = array (
        'S' =>
        array (
            'Symfony\\Polyfill\\Ctype\\' => 23,
        ),
    );
}
"#;

fn rewriter() -> AutoloadCacheRewriter {
    AutoloadCacheRewriter::new(Path::new("/home/u/project/vendor"))
}

#[test]
fn test_cache_key_uses_vendor_tail_and_value() {
    let key = rewriter().cache_key(
        "$vendorDir . '/symfony/polyfill-ctype/bootstrap.php'",
        "320cde22f66dd4f5d3fd621d3e88b98f",
    );
    assert_eq!(
        key,
        "isolated-u-project-vendor-symfony-polyfill-ctype-bootstrap-320cde22f66dd4f5d3fd621d3e88b98f"
    );
}

#[test]
fn test_cache_key_differs_between_vendor_dirs() {
    let value = "$vendorDir . '/symfony/polyfill-ctype/bootstrap.php'";
    let first = AutoloadCacheRewriter::new(Path::new("/srv/plugin-a/vendor")).cache_key(value, "k");
    let second = AutoloadCacheRewriter::new(Path::new("/srv/plugin-b/vendor")).cache_key(value, "k");
    assert_ne!(first, second);
}

#[test]
fn test_rewrites_returned_array_keys() {
    let mut parser = PhpParser::new().unwrap();
    let (output, keys) = rewriter()
        .rewrite_source(&mut parser, FILES_ARTIFACT, CacheArtifact::Files, "autoload_files.php")
        .unwrap();
    let output = String::from_utf8(output).unwrap();

    assert_eq!(keys, 2);
    assert!(output.contains(
        "'isolated-u-project-vendor-symfony-polyfill-mbstring-bootstrap-0e6d7bf4a5811bfa5cf40c5ccd6fae6a' => $vendorDir . '/symfony/polyfill-mbstring/bootstrap.php'"
    ));
    assert!(!output.contains("'320cde22f66dd4f5d3fd621d3e88b98f'"));
    assert!(output.starts_with("<?php\n\n// autoload_files.php @generated by Composer"));

    let (again, keys) = rewriter()
        .rewrite_source(&mut parser, &output, CacheArtifact::Files, "autoload_files.php")
        .unwrap();
    assert_eq!(keys, 0);
    assert_eq!(again, output.as_bytes());
}

#[test]
fn test_rewrites_only_files_property() {
    let mut parser = PhpParser::new().unwrap();
    let (output, keys) = rewriter()
        .rewrite_source(&mut parser, STATIC_ARTIFACT, CacheArtifact::Static, "autoload_static.php")
        .unwrap();
    let output = String::from_utf8(output).unwrap();

    assert_eq!(keys, 1);
    assert!(output.contains(
        "'isolated-u-project-vendor-symfony-polyfill-ctype-bootstrap-320cde22f66dd4f5d3fd621d3e88b98f' => __DIR__"
    ));
    assert!(output.contains("'S' =>"));
    assert!(output.contains("'Symfony\\\\Polyfill\\\\Ctype\\\\' => 23"));
}

#[test]
fn test_rewrite_all_skips_missing_and_records_broken_artifacts() {
    let vendor = tempdir().unwrap();
    fs::create_dir_all(vendor.path().join("composer")).unwrap();
    let files_path = vendor.path().join("composer/autoload_files.php");
    fs::write(&files_path, FILES_ARTIFACT).unwrap();

    let rewriter = AutoloadCacheRewriter::new(vendor.path());
    let report = rewriter.rewrite_all().unwrap();
    assert_eq!(report.keys_rewritten, 2);
    assert_eq!(report.artifacts_rewritten, vec![files_path.clone()]);
    assert!(report.failures.is_empty());
    assert!(fs::read_to_string(&files_path).unwrap().contains("'isolated-"));

    fs::write(
        vendor.path().join("composer/autoload_static.php"),
        "<?php\nclass Broken {\n",
    )
    .unwrap();
    let report = rewriter.rewrite_all().unwrap();
    assert_eq!(report.keys_rewritten, 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage, FailureStage::AutoloadCache);
}
