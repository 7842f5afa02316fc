//! Test Case Synthesis
//!
//! Produces unit tests for a piece of code through the same generative
//! capability used for code generation. Code that does not parse never
//! reaches the model.

use crate::debugging::SyntaxDebugger;
use crate::generation::{CodeGenerator, GenerationRequest};
use appdev_shared::{AppDevError, Result, SourceLanguage, SynthesisConfig};
use handlebars::Handlebars;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

const TEMPLATE_NAME: &str = "unit_tests";

/// Prompt used unless configuration provides one
pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"Write {{framework}} unit tests in {{language}} for the code below.
The code is described as: {{description}}

```
{{code}}
```
"#;

/// Variables available to the prompt template
#[derive(Serialize, Debug)]
struct PromptContext<'a> {
    code: &'a str,
    description: &'a str,
    language: String,
    framework: &'static str,
}

/// Generates test source for code and a description of its behavior
pub struct TestCaseSynthesizer {
    generator: Arc<CodeGenerator>,
    debugger: Arc<SyntaxDebugger>,
    language: SourceLanguage,
    max_length: usize,
    handlebars: Handlebars<'static>,
}

impl TestCaseSynthesizer {
    /// Create a synthesizer for code written in `language`
    pub fn new(
        generator: Arc<CodeGenerator>,
        debugger: Arc<SyntaxDebugger>,
        language: SourceLanguage,
        config: &SynthesisConfig,
    ) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape); // Don't escape code content

        let template = config
            .prompt_template
            .as_deref()
            .unwrap_or(DEFAULT_PROMPT_TEMPLATE);
        handlebars
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| AppDevError::Template {
                message: e.to_string(),
            })?;

        Ok(Self {
            generator,
            debugger,
            language,
            max_length: config.max_length,
            handlebars,
        })
    }

    /// Render the generation prompt for `code`
    pub fn render_prompt(&self, code: &str, description: &str) -> Result<String> {
        let context = PromptContext {
            code,
            description,
            language: self.language.to_string(),
            framework: self.language.test_framework(),
        };

        self.handlebars
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| AppDevError::Template {
                message: e.to_string(),
            })
    }

    /// Generate tests for `code`.
    ///
    /// Returns an empty string when the code does not parse or when any
    /// later step fails.
    #[instrument(skip_all, fields(language = %self.language))]
    pub async fn create_test_cases(&self, code: &str, description: &str) -> String {
        let report = self.debugger.diagnose(code);
        if !report.is_clean() {
            info!("Not generating tests: {}", report);
            return String::new();
        }

        let prompt = match self.render_prompt(code, description) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("Failed to render test prompt: {}", e);
                return String::new();
            }
        };

        let request = GenerationRequest::new(prompt, self.language.to_string(), self.max_length);
        match self.generator.generate(&request).await {
            Ok(tests) => tests,
            Err(e) => {
                warn!(request_id = %request.id, "Test generation failed: {}", e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{MockModelLoader, MockSeq2SeqModel, MockTokenizer, ModelHandles};
    use crate::logging::TracingErrorSink;
    use appdev_shared::{GenerationConfig, GenerationError};

    const ADD: &str = "def add(a, b):\n    return a + b";
    const ADD_TESTS: &str = "import unittest\n\n\
        class TestAdd(unittest.TestCase):\n\
        \x20   def test_add_positive_numbers(self):\n\
        \x20       self.assertEqual(add(2, 3), 5)\n";

    fn synthesizer(loader: MockModelLoader, config: &SynthesisConfig) -> Result<TestCaseSynthesizer> {
        let generator = Arc::new(CodeGenerator::new(Arc::new(loader), GenerationConfig::default()));
        let debugger = Arc::new(SyntaxDebugger::for_language(
            SourceLanguage::Python,
            Arc::new(TracingErrorSink),
        ));
        TestCaseSynthesizer::new(generator, debugger, SourceLanguage::Python, config)
    }

    #[tokio::test]
    async fn test_create_test_cases_valid_code() {
        let mut tokenizer = MockTokenizer::new();
        tokenizer
            .expect_encode()
            .withf(|prompt| {
                prompt.contains(ADD)
                    && prompt.contains("Adds two numbers together.")
                    && prompt.contains("unittest")
            })
            .times(1)
            .returning(|_| Ok(vec![7, 8, 9]));
        tokenizer
            .expect_decode()
            .returning(|_| Ok(ADD_TESTS.to_string()));

        let mut model = MockSeq2SeqModel::new();
        model
            .expect_generate()
            .withf(|_, max_length| *max_length == 512)
            .returning(|_, _| Ok(vec![vec![10, 11]]));

        let handles = ModelHandles {
            tokenizer: Arc::new(tokenizer),
            model: Arc::new(model),
        };
        let mut loader = MockModelLoader::new();
        loader.expect_load().returning(move |_| Ok(handles.clone()));

        let synthesizer = synthesizer(loader, &SynthesisConfig::default()).unwrap();
        let result = synthesizer
            .create_test_cases(ADD, "Adds two numbers together.")
            .await;
        assert!(result.contains("class TestAdd(unittest.TestCase):"));
    }

    #[tokio::test]
    async fn test_create_test_cases_invalid_code() {
        let mut loader = MockModelLoader::new();
        loader.expect_load().never();

        let synthesizer = synthesizer(loader, &SynthesisConfig::default()).unwrap();
        for code in [
            "def add(a, b)\n    return a + b",
            "print \"hello\"",
            "del f()",
            "x = 1\n  y = 2",
        ] {
            let result = synthesizer
                .create_test_cases(code, "Adds two numbers together.")
                .await;
            assert_eq!(result, "", "{:?}", code);
        }
    }

    #[tokio::test]
    async fn test_generation_failure_returns_empty() {
        let mut loader = MockModelLoader::new();
        loader.expect_load().returning(|name| {
            Err(GenerationError::ModelLoad {
                model: name.to_string(),
                message: "unavailable".to_string(),
            })
        });

        let synthesizer = synthesizer(loader, &SynthesisConfig::default()).unwrap();
        assert_eq!(synthesizer.create_test_cases(ADD, "Adds").await, "");
    }

    #[test]
    fn test_custom_template() {
        let config = SynthesisConfig {
            prompt_template: Some("{{framework}}|{{language}}|{{description}}|{{code}}".to_string()),
            ..Default::default()
        };

        let synthesizer = synthesizer(MockModelLoader::new(), &config).unwrap();
        let prompt = synthesizer.render_prompt("x = a < b", "compare").unwrap();
        assert_eq!(prompt, "unittest|Python|compare|x = a < b");
    }

    #[test]
    fn test_invalid_template_rejected() {
        let config = SynthesisConfig {
            prompt_template: Some("{{#if}}".to_string()),
            ..Default::default()
        };

        assert!(matches!(
            synthesizer(MockModelLoader::new(), &config),
            Err(AppDevError::Template { .. })
        ));
    }

    #[test]
    fn test_unknown_template_variable_fails_render() {
        let config = SynthesisConfig {
            prompt_template: Some("{{signature}}".to_string()),
            ..Default::default()
        };

        let synthesizer = synthesizer(MockModelLoader::new(), &config).unwrap();
        assert!(synthesizer.render_prompt(ADD, "Adds").is_err());
    }
}
