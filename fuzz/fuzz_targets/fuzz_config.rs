#![no_main]

use libfuzzer_sys::fuzz_target;

use domain::deployment::compiler::DeploymentCompiler;
use infrastructure::config::CompilerConfig;

// Fuzz the configuration parser with arbitrary YAML input.
//
// Exercises serde_yaml_ng deserialization, CompilerConfig::validate(), the
// conversion to domain types and a full compilation pass.
// Must never panic: only Ok or Err.
fuzz_target!(|data: &[u8]| {
    // Only try UTF-8 valid strings (YAML requires valid text)
    if let Ok(yaml) = std::str::from_utf8(data) {
        // Limit input size to avoid excessive parsing time
        if yaml.len() <= 64 * 1024
            && let Ok(config) = CompilerConfig::from_yaml(yaml)
            && let Ok(spec) = config.to_deployment_spec()
        {
            let _ = DeploymentCompiler::compile(&spec);
        }
    }
});
