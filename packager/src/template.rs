//! PHP bootstrap code for the legacy host.
//!
//! The packaged module needs three pieces of host code: a runonce aggregator
//! that runs the copied runonce scripts, and two overlays appended to the
//! module's `config/autoload.php` and `config/config.php` that hook
//! Composer's vendor autoloader into the host. [`HostTemplate`] keeps that
//! code swappable; [`ContaoTemplate`] is the template set for Contao 2.x and
//! 3.x hosts.

use crate::classmap::ClassMap;
use crate::module_path::ModulePath;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Generates host bootstrap code.
pub trait HostTemplate {
    /// Identifies the template set, for status output.
    fn version(&self) -> &str;

    /// Returns the aggregator script declaring `class_name`.
    fn runonce_aggregator(&self, class_name: &str) -> String;

    /// Returns `config/autoload.php` with the vendor autoloader appended.
    ///
    /// `existing` is the current file content, if the module ships one.
    fn autoload_overlay(&self, existing: Option<&str>, module: &ModulePath) -> String;

    /// Returns `config/config.php` with the legacy bootstrap block appended.
    fn config_overlay(
        &self,
        existing: Option<&str>,
        module: &ModulePath,
        classes: &ClassMap,
    ) -> String;
}

/// Template set for Contao 2.11 to 3.x hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContaoTemplate;

impl ContaoTemplate {
    /// Version of the bundled template set.
    pub const VERSION: &'static str = "contao-legacy-1";
}

impl HostTemplate for ContaoTemplate {
    fn version(&self) -> &str {
        Self::VERSION
    }

    fn runonce_aggregator(&self, class_name: &str) -> String {
        format!(
            r#"<?php

class {class_name} extends System
{{
	public function __construct()
	{{
		parent::__construct();
	}}

	public function run()
	{{
		for ($i=0; file_exists(__DIR__ . '/runonce_' . $i . '.php'); $i++) {{
			try {{
				require_once(__DIR__ . '/runonce_' . $i . '.php');
			}}
			catch (\Exception $e) {{
				// first trigger an error to write this into the log file
				trigger_error(
					$e->getMessage() . "\n" . $e->getTraceAsString(),
					E_USER_ERROR
				);
				// now log into the system log
				$this->log(
					$e->getMessage() . "\n" . $e->getTraceAsString(),
					'RunonceExecutor run()',
					'ERROR'
				);
			}}
		}}
	}}
}}

$executor = new {class_name}();
$executor->run();
"#
        )
    }

    fn autoload_overlay(&self, existing: Option<&str>, module: &ModulePath) -> String {
        let mut content = overlay_base(existing);
        content.push_str(&format!(
            "\nrequire_once(TL_ROOT . '/{module}/classes/vendor/autoload.php');\n"
        ));
        content
    }

    fn config_overlay(
        &self,
        existing: Option<&str>,
        module: &ModulePath,
        classes: &ClassMap,
    ) -> String {
        let literals: Vec<String> = classes.class_names().map(php_string_literal).collect();
        let class_list = literals.join(",");

        let mut content = overlay_base(existing);
        content.push_str(&format!(
            r"

if (version_compare(VERSION, '3', '<')) {{
	spl_autoload_unregister('__autoload');
	require_once(TL_ROOT . '/{module}/classes/vendor/autoload.php');
	spl_autoload_register('__autoload');

	$classes = array({class_list});
	$cache = FileCache::getInstance('classes');
	foreach ($classes as $class) {{
		if (!$cache->$class) {{
			$cache->$class = true;
		}}
	}}
}}
"
        ));
        content
    }
}

/// Existing overlay content without its closing tag, or a fresh header.
fn overlay_base(existing: Option<&str>) -> String {
    existing.map_or_else(
        || "<?php\n".to_owned(),
        |content| strip_closing_tag(content).to_owned(),
    )
}

/// Strips a trailing `?>` and the whitespace after it.
///
/// # Examples
///
/// ```
/// use contao_packager::template::strip_closing_tag;
///
/// assert_eq!(strip_closing_tag("<?php\n$a = 1;\n?>\n\n"), "<?php\n$a = 1;\n");
/// assert_eq!(strip_closing_tag("<?php\n$a = 1;\n"), "<?php\n$a = 1;\n");
/// ```
#[must_use]
pub fn strip_closing_tag(content: &str) -> &str {
    content
        .trim_end()
        .strip_suffix("?>")
        .unwrap_or(content)
}

/// Quotes `value` as a single-quoted PHP string literal.
///
/// # Examples
///
/// ```
/// use contao_packager::template::php_string_literal;
///
/// assert_eq!(php_string_literal("Acme\\Widget"), r"'Acme\\Widget'");
/// assert_eq!(php_string_literal("it's"), r"'it\'s'");
/// ```
#[must_use]
pub fn php_string_literal(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('\'');
    for c in value.chars() {
        if matches!(c, '\\' | '\'') {
            literal.push('\\');
        }
        literal.push(c);
    }
    literal.push('\'');
    literal
}

static CLASS_NAME_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generates a unique aggregator class name, `runonce_` followed by 32 hex
/// characters.
#[must_use]
pub fn runonce_class_name() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos());
    let mut hasher = Sha256::new();
    hasher.update(nanos.to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(CLASS_NAME_COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes());

    let mut name = String::from("runonce_");
    for byte in hasher.finalize().iter().take(16) {
        if write!(name, "{byte:02x}").is_err() {
            // Writing to a String cannot fail.
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_path::name_derived_path;
    use rstest::{fixture, rstest};

    #[fixture]
    fn module() -> ModulePath {
        name_derived_path("acme/widget")
    }

    #[test]
    fn class_names_are_unique_hex() {
        let first = runonce_class_name();
        let second = runonce_class_name();

        assert_ne!(first, second);
        let suffix = first.strip_prefix("runonce_").expect("prefix present");
        assert_eq!(suffix.len(), 32);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn aggregator_loops_over_numbered_scripts_and_logs_failures() {
        let script = ContaoTemplate.runonce_aggregator("runonce_abc");

        assert!(script.starts_with("<?php\n\nclass runonce_abc extends System\n"));
        assert!(script.contains("file_exists(__DIR__ . '/runonce_' . $i . '.php'); $i++"));
        assert!(script.contains("catch (\\Exception $e)"));
        assert!(script.contains("E_USER_ERROR"));
        assert!(script.contains("'RunonceExecutor run()',\n\t\t\t\t\t'ERROR'"));
        assert!(script.ends_with("$executor = new runonce_abc();\n$executor->run();\n"));
    }

    #[rstest]
    fn autoload_overlay_starts_fresh_without_existing_file(module: ModulePath) {
        let content = ContaoTemplate.autoload_overlay(None, &module);
        assert_eq!(
            content,
            "<?php\n\nrequire_once(TL_ROOT . '/system/modules/widget/classes/vendor/autoload.php');\n"
        );
    }

    #[rstest]
    fn autoload_overlay_strips_closing_tag(module: ModulePath) {
        let existing = "<?php\nClassLoader::addClasses(array());\n?>\n";
        let content = ContaoTemplate.autoload_overlay(Some(existing), &module);
        assert!(content.starts_with("<?php\nClassLoader::addClasses(array());\n\nrequire_once"));
        assert!(!content.contains("?>"));
    }

    #[rstest]
    fn config_overlay_lists_every_class(module: ModulePath) {
        let mut classes = ClassMap::new();
        classes.insert("Acme\\Widget", "src/Widget.php");
        classes.insert("LegacyHelper", "classes/LegacyHelper.php");

        let content = ContaoTemplate.config_overlay(None, &module, &classes);
        assert!(content.starts_with("<?php\n\n\nif (version_compare(VERSION, '3', '<')) {\n"));
        assert!(content.contains("\tspl_autoload_unregister('__autoload');\n"));
        assert!(content.contains(
            "\trequire_once(TL_ROOT . '/system/modules/widget/classes/vendor/autoload.php');\n"
        ));
        assert!(content.contains("$classes = array('Acme\\\\Widget','LegacyHelper');"));
        assert!(content.contains("FileCache::getInstance('classes')"));
        assert!(content.ends_with("}\n"));
    }

    #[rstest]
    fn config_overlay_with_empty_map_emits_empty_array(module: ModulePath) {
        let content = ContaoTemplate.config_overlay(Some("<?php\n"), &module, &ClassMap::new());
        assert!(content.contains("$classes = array();"));
    }

    #[rstest]
    #[case::closing_tag_with_whitespace("<?php\n?>  \n\n", "<?php\n")]
    #[case::no_closing_tag("<?php\n$a = 1;\n\n", "<?php\n$a = 1;\n\n")]
    #[case::tag_mid_file("<?php ?><p>x</p>", "<?php ?><p>x</p>")]
    fn closing_tag_stripping(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_closing_tag(input), expected);
    }
}
