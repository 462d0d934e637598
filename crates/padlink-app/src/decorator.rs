//! Bootstrap script synthesis
//!
//! Compiled DDC output cannot run on its own inside the frame: it needs
//! `print`/error forwarding to the host and a module-loader kick-off.
//! [`decorate`] wraps it accordingly. The function is pure; identical inputs
//! always produce byte-identical output.

use padlink_core::CompilerGeneration;

/// Library whose `main` the new module loader starts
pub const BOOTSTRAP_LIBRARY: &str = "package:dartpad_sample/bootstrap.dart";

/// Variable the compiled body is assigned to under the new module loader
pub const INIT_FUNCTION: &str = "__ddcInitCode";

/// Seconds the module loader waits for a module before failing
pub const LOADER_WAIT_SECONDS: u32 = 60;

/// Inputs that shape the bootstrap script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecorateOptions<'a> {
    /// Base URL the loader resolves SDK modules against
    pub modules_base_url: Option<&'a str>,
    /// Hot-reload delivery: the service already emitted an executable patch
    pub reload: bool,
    /// Load the Flutter web runtime alongside the Dart SDK
    pub flutter: bool,
    pub generation: CompilerGeneration,
}

/// Wrap compiled JavaScript in the frame bootstrap
pub fn decorate(js: &str, options: &DecorateOptions<'_>) -> String {
    if options.reload {
        return js.to_string();
    }

    match options.generation {
        CompilerGeneration::NewDdc => decorate_new_ddc(js, options),
        CompilerGeneration::Legacy => decorate_legacy(js, options),
    }
}

fn decorate_new_ddc(js: &str, options: &DecorateOptions<'_>) -> String {
    let mut script = String::with_capacity(js.len() + 1024);

    script.push_str(&print_shim(true));
    script.push_str(&error_handler("jserr"));
    if let Some(base_url) = options.modules_base_url {
        script.push_str(&require_config(base_url));
    }

    script.push_str(&format!("let {} = function() {{{}}};\n", INIT_FUNCTION, js));
    script.push_str(&format!(
        "\nfunction contextLoaded() {{\n  {}();\n  dartDevEmbedder.runMain('{}', {{}});\n}}\n",
        INIT_FUNCTION, BOOTSTRAP_LIBRARY
    ));

    let modules = if options.flutter {
        r#"["dart_sdk_new", "flutter_web_new"]"#
    } else {
        r#"["dart_sdk_new"]"#
    };
    script.push_str(&format!(
        "\nfunction moduleLoaderLoaded() {{\n  require({}, contextLoaded);\n}}\n",
        modules
    ));
    script.push_str("require([\"ddc_module_loader\"], moduleLoaderLoaded);\n");

    script
}

fn decorate_legacy(js: &str, options: &DecorateOptions<'_>) -> String {
    let mut script = String::with_capacity(js.len() + 1024);

    script.push_str(&print_shim(false));
    script.push_str("\nrequire.undef('dartpad_main');\n");
    script.push_str(&error_handler("stderr"));
    if let Some(base_url) = options.modules_base_url {
        script.push_str(&require_config(base_url));
    }

    script.push_str(js);
    script.push('\n');
    script.push_str(LEGACY_BOOTSTRAP);

    script
}

fn print_shim(trailing_comma: bool) -> String {
    format!(
        "\nfunction dartPrint(message) {{\n  parent.postMessage({{\n    'sender': 'frame',\n    'type': 'stdout',\n    'message': message.toString(){}\n  }}, '*');\n}}\n",
        if trailing_comma { "," } else { "" }
    )
}

fn error_handler(message_type: &str) -> String {
    format!(
        "\nwindow.onerror = function(message, url, line, column, error) {{\n  var errorMessage = error == null ? '' : ', error: ' + error;\n  parent.postMessage({{\n    'sender': 'frame',\n    'type': '{}',\n    'message': message + errorMessage\n  }}, '*');\n}};\n",
        message_type
    )
}

fn require_config(base_url: &str) -> String {
    // JSON string escaping keeps an odd URL from breaking out of the literal
    let base_url = serde_json::Value::from(base_url).to_string();
    format!(
        "\nrequire.config({{\n  \"baseUrl\": {},\n  \"waitSeconds\": {},\n  \"onNodeCreated\": function(node, config, id, url) {{ node.setAttribute('crossorigin', 'anonymous'); }}\n}});\n",
        base_url, LOADER_WAIT_SECONDS
    )
}

const LEGACY_BOOTSTRAP: &str = r#"
require(['dart_sdk'],
  function(sdk) {
    'use strict';
    sdk.developer._extensions.clear();
    sdk.dart.hotRestart();
  }
);

require(["dartpad_main", "dart_sdk"], function(dartpad_main, dart_sdk) {
  dart_sdk.dart.setStartAsyncSynchronously(true);
  dart_sdk._isolate_helper.startRootIsolate(() => {}, []);
  for (var prop in dartpad_main) {
    if (prop.endsWith("bootstrap")) {
      dartpad_main[prop].main();
    }
  }
});
"#;

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_MODULES: &str = r#"require(["dart_sdk_new", "flutter_web_new"], contextLoaded);"#;
    const ONE_MODULE: &str = r#"require(["dart_sdk_new"], contextLoaded);"#;

    fn flutter_full(base: Option<&str>) -> DecorateOptions<'_> {
        DecorateOptions {
            modules_base_url: base,
            reload: false,
            flutter: true,
            generation: CompilerGeneration::NewDdc,
        }
    }

    #[test]
    fn test_decorate_is_deterministic() {
        let options = flutter_full(Some("https://x/"));
        assert_eq!(
            decorate("console.log(1);", &options),
            decorate("console.log(1);", &options)
        );
    }

    #[test]
    fn test_reload_passes_script_through() {
        for generation in [CompilerGeneration::NewDdc, CompilerGeneration::Legacy] {
            for flutter in [true, false] {
                let options = DecorateOptions {
                    modules_base_url: Some("https://x/"),
                    reload: true,
                    flutter,
                    generation,
                };
                assert_eq!(decorate("patch();", &options), "patch();");
                assert_eq!(decorate("", &options), "");
            }
        }
    }

    #[test]
    fn test_full_flutter_bootstrap() {
        let script = decorate("// js", &flutter_full(Some("https://x/")));

        assert!(script.contains("require.config({\n  \"baseUrl\": \"https://x/\""));
        assert!(script.contains("\"waitSeconds\": 60"));
        assert!(script.contains("node.setAttribute('crossorigin', 'anonymous')"));
        assert!(script.contains("let __ddcInitCode = function() {// js};"));
        assert!(script.contains(
            "dartDevEmbedder.runMain('package:dartpad_sample/bootstrap.dart', {});"
        ));
        assert!(script.contains(TWO_MODULES));
        assert!(!script.contains(ONE_MODULE));
        assert!(script.ends_with("require([\"ddc_module_loader\"], moduleLoaderLoaded);\n"));
    }

    #[test]
    fn test_dart_only_loads_single_module() {
        let options = DecorateOptions {
            flutter: false,
            ..flutter_full(None)
        };
        let script = decorate("// js", &options);
        assert!(script.contains(ONE_MODULE));
        assert!(!script.contains("flutter_web_new"));
    }

    #[test]
    fn test_sections_in_order() {
        let script = decorate("BODY", &flutter_full(Some("https://x/")));
        let order = [
            "function dartPrint",
            "window.onerror",
            "require.config",
            "let __ddcInitCode",
            "function contextLoaded",
            "function moduleLoaderLoaded",
            "require([\"ddc_module_loader\"]",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|needle| script.find(needle).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_no_require_config_without_base_url() {
        let script = decorate("// js", &flutter_full(None));
        assert!(!script.contains("require.config"));
    }

    #[test]
    fn test_error_handler_forwards_error_object() {
        let script = decorate("// js", &flutter_full(None));
        assert!(script.contains("var errorMessage = error == null ? '' : ', error: ' + error;"));
        assert!(script.contains("'type': 'jserr'"));
        assert!(script.contains("'type': 'stdout'"));
        assert!(script.contains("'sender': 'frame'"));
    }

    #[test]
    fn test_base_url_is_escaped() {
        let script = decorate("// js", &flutter_full(Some("https://x/\");alert(1);//")));
        assert!(script.contains(r#""baseUrl": "https://x/\");alert(1);//""#));
    }

    #[test]
    fn test_legacy_bootstrap() {
        let options = DecorateOptions {
            modules_base_url: Some("https://legacy/"),
            reload: false,
            flutter: true,
            generation: CompilerGeneration::Legacy,
        };
        let script = decorate("define('dartpad_main', [], function() {});", &options);

        assert!(script.contains("require.undef('dartpad_main');"));
        assert!(script.contains("'type': 'stderr'"));
        assert!(script.contains("\"baseUrl\": \"https://legacy/\""));
        assert!(script.contains("define('dartpad_main', [], function() {});\n"));
        assert!(script.contains("sdk.dart.hotRestart();"));
        assert!(script.contains("dartpad_main[prop].main();"));
        assert!(!script.contains(INIT_FUNCTION));
        assert!(!script.contains("ddc_module_loader"));
    }
}
