//! End-to-end isolation of a Composer project on disk.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};
use vendor_isolator::{ComposerProject, IsolationEngine, IsolatorConfig};
use walkdir::WalkDir;

const PREFIX: &str = "Custom\\Prefix";

const FACTORY: &str = r#"<?php
namespace Acme\Toolkit {
    use Acme\Toolkit\Contracts\Maker as MakerContract;

    class Factory implements MakerContract
    {
        const HANDLER = 'Acme\Toolkit\Handlers\Fallback';
        const LABEL = "just text";

        public function build()
        {
            return new \Acme\Toolkit\Handlers\Console();
        }
    }
}

namespace {
    function acme_toolkit()
    {
        return new Acme\Toolkit\Factory();
    }
}
"#;

const FACTORY_ISOLATED: &str = r#"<?php
namespace Custom\Prefix\Acme\Toolkit {
    use Custom\Prefix\Acme\Toolkit\Contracts\Maker as MakerContract;

    class Factory implements MakerContract
    {
        const HANDLER = 'Custom\Prefix\Acme\Toolkit\Handlers\Fallback';
        const LABEL = "just text";

        public function build()
        {
            return new \Custom\Prefix\Acme\Toolkit\Handlers\Console();
        }
    }
}

namespace {
    function acme_toolkit()
    {
        return new Custom\Prefix\Acme\Toolkit\Factory();
    }
}
"#;

const CONSOLE: &str = r#"<?php
namespace Acme\Toolkit\Handlers;

use Acme\Toolkit\Contracts\{Maker, Other as Alt};

class Console implements Maker
{
}
"#;

const BIN: &str = "#!/usr/bin/env php\n<?php\nrequire __DIR__ . '/../src/Factory.php';\n\\Acme\\Toolkit\\Factory::run();\n";

const DEV_TOOL: &str = "<?php\nnamespace Dev\\Tool;\n\nclass Runner extends \\Acme\\Toolkit\\Factory {}\n";

const STATIC_ARTIFACT: &str = r#"<?php

namespace Composer\Autoload;

class ComposerStaticInit0123
{
    public static $files = array (
        'deadbeef' => __DIR__ . '/..' . '/acme/toolkit/src/helpers.php',
    );

    public static $prefixLengthsPsr4 = array (
        'A' =>
        array (
            'Acme\\Toolkit\\' => 13,
        ),
    );
}
"#;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn create_project() -> TempDir {
    let dir = tempdir().unwrap();
    let root = dir.path();

    write(
        root,
        "composer.json",
        &json!({
            "require": {"acme/toolkit": "^3.0"},
            "require-dev": {"dev/tool": "^1.0"},
            "config": {"vendor-isolator": {"prefix": "\\Custom\\Prefix\\"}}
        })
        .to_string(),
    );
    write(
        root,
        "vendor/composer/installed.json",
        &serde_json::to_string_pretty(&json!({
            "packages": [
                {
                    "name": "acme/toolkit",
                    "version": "3.1.0",
                    "autoload": {"psr-4": {"Acme\\Toolkit\\": "src/"}},
                    "bin": ["bin/toolkit"],
                    "install-path": "../acme/toolkit"
                },
                {
                    "name": "dev/tool",
                    "version": "1.0.0",
                    "require": {"acme/toolkit": "^3.0"},
                    "autoload": {"psr-4": {"Dev\\Tool\\": "src/"}},
                    "install-path": "../dev/tool"
                }
            ],
            "dev": true,
            "dev-package-names": ["dev/tool"]
        }))
        .unwrap(),
    );

    write(root, "vendor/acme/toolkit/src/Factory.php", FACTORY);
    write(root, "vendor/acme/toolkit/src/Handlers/Console.php", CONSOLE);
    write(
        root,
        "vendor/acme/toolkit/src/Contracts/Maker.php",
        "<?php\nnamespace Acme\\Toolkit\\Contracts;\n\ninterface Maker {}\n",
    );
    write(root, "vendor/acme/toolkit/bin/toolkit", BIN);
    write(root, "vendor/acme/toolkit/README.md", "namespace Acme\\Toolkit;\n");
    write(root, "vendor/dev/tool/src/Runner.php", DEV_TOOL);
    write(root, "vendor/composer/autoload_static.php", STATIC_ARTIFACT);
    dir
}

fn open_engine(root: &Path) -> IsolationEngine {
    let project = ComposerProject::open(root).unwrap();
    let config = project.manifest_config().unwrap().unwrap();
    IsolationEngine::new(config, project).unwrap()
}

fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).unwrap()
}

fn snapshot(root: &Path) -> BTreeMap<String, String> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap();
            (
                relative.display().to_string(),
                fs::read_to_string(entry.path()).unwrap(),
            )
        })
        .collect()
}

#[test]
fn test_full_isolation_of_project() {
    let dir = create_project();
    let root = dir.path();

    let report = open_engine(root).run().unwrap();
    assert_eq!(report.prefix, PREFIX);
    assert_eq!(report.eligible_packages, vec!["acme/toolkit"]);
    assert!(!report.has_failures(), "{:?}", report.failures);

    assert_eq!(read(root, "vendor/acme/toolkit/src/Factory.php"), FACTORY_ISOLATED);

    let console = read(root, "vendor/acme/toolkit/src/Handlers/Console.php");
    assert!(console.contains("namespace Custom\\Prefix\\Acme\\Toolkit\\Handlers;"));
    assert!(console.contains("use Custom\\Prefix\\Acme\\Toolkit\\Contracts\\{Maker, Other as Alt};"));
    assert!(console.contains("class Console implements Maker"));

    assert_eq!(
        read(root, "vendor/acme/toolkit/bin/toolkit"),
        "#!/usr/bin/env php\n<?php\nrequire __DIR__ . '/../src/Factory.php';\n\\Custom\\Prefix\\Acme\\Toolkit\\Factory::run();\n"
    );
    assert_eq!(
        read(root, "vendor/acme/toolkit/README.md"),
        "namespace Acme\\Toolkit;\n"
    );

    // Development-only packages keep their code, even references to isolated classes.
    assert_eq!(read(root, "vendor/dev/tool/src/Runner.php"), DEV_TOOL);

    let static_artifact = read(root, "vendor/composer/autoload_static.php");
    assert!(!static_artifact.contains("'deadbeef'"));
    assert!(static_artifact.contains("acme-toolkit-src-helpers-deadbeef' => __DIR__"));
    assert!(static_artifact.contains("'Acme\\\\Toolkit\\\\' => 13"));

    let installed: Value =
        serde_json::from_str(&read(root, "vendor/composer/installed.json")).unwrap();
    let toolkit = &installed["packages"][0];
    assert_eq!(
        toolkit["autoload"]["psr-4"],
        json!({"Custom\\Prefix\\Acme\\Toolkit\\": "src/"})
    );
    assert_eq!(toolkit["bin"], json!(["bin/toolkit"]));
    assert_eq!(
        installed["packages"][1]["autoload"]["psr-4"],
        json!({"Dev\\Tool\\": "src/"})
    );
    assert_eq!(installed["dev-package-names"], json!(["dev/tool"]));
}

#[test]
fn test_isolation_is_idempotent() {
    let dir = create_project();
    let root = dir.path();

    open_engine(root).run().unwrap();
    let first = snapshot(root);

    let report = open_engine(root).run().unwrap();
    assert!(report.files_rewritten.is_empty());
    assert_eq!(report.autoload_keys_rewritten, 0);
    assert_eq!(report.cache_keys_rewritten, 0);
    assert_eq!(snapshot(root), first);
}

#[test]
fn test_require_dev_isolates_dev_packages_too() {
    let dir = create_project();
    let root = dir.path();

    let project = ComposerProject::open(root).unwrap();
    let mut config = project.manifest_config().unwrap().unwrap();
    config.require_dev = true;
    IsolationEngine::new(config, project).unwrap().run().unwrap();

    assert_eq!(
        read(root, "vendor/dev/tool/src/Runner.php"),
        "<?php\nnamespace Custom\\Prefix\\Dev\\Tool;\n\nclass Runner extends \\Custom\\Prefix\\Acme\\Toolkit\\Factory {}\n"
    );
}

#[test]
fn test_psr0_package_is_relocated() {
    let dir = create_project();
    let root = dir.path();

    write(
        root,
        "composer.json",
        &json!({"require": {"old/lib": "*"}}).to_string(),
    );
    write(
        root,
        "vendor/composer/installed.json",
        &json!([{
            "name": "old/lib",
            "version": "0.9.0",
            "autoload": {
                "psr-0": {"Old\\Lib\\": "src/"},
                "files": ["src/Old/functions.php"]
            }
        }])
        .to_string(),
    );
    write(
        root,
        "vendor/old/lib/src/Old/Lib/Thing.php",
        "<?php\nnamespace Old\\Lib;\n\nclass Thing {}\n",
    );
    write(
        root,
        "vendor/old/lib/src/Old/functions.php",
        "<?php\nfunction old_lib() { return new \\Old\\Lib\\Thing(); }\n",
    );

    let project = ComposerProject::open(root).unwrap();
    let report = IsolationEngine::new(IsolatorConfig::with_prefix(PREFIX), project)
        .unwrap()
        .mutate_namespaces()
        .unwrap();

    assert_eq!(report.directories_moved.len(), 1);
    assert_eq!(report.files_restored.len(), 1);
    assert!(read(root, "vendor/old/lib/src/Custom/Prefix/Old/Lib/Thing.php")
        .contains("namespace Custom\\Prefix\\Old\\Lib;"));
    assert_eq!(
        read(root, "vendor/old/lib/src/Old/functions.php"),
        "<?php\nfunction old_lib() { return new \\Custom\\Prefix\\Old\\Lib\\Thing(); }\n"
    );

    let installed: Value =
        serde_json::from_str(&read(root, "vendor/composer/installed.json")).unwrap();
    assert!(installed.is_array());
    assert_eq!(
        installed[0]["autoload"]["psr-0"],
        json!({"Custom\\Prefix\\Old\\Lib\\": "src/"})
    );
}
