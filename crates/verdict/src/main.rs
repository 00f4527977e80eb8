//! A simple program demonstrates how to use `verdict` as a library.
//!
//! Every line typed in is handed to a [`verdict::FunctionCaller`]. The
//! program then runs the selected function itself and prints the result.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::pin::pin;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use schemars::JsonSchema;
use serde::Deserialize;
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::time::sleep;
use verdict::openai::{OpenAIConfigBuilder, OpenAIProvider};
use verdict::{Function, FunctionCallerBuilder, FunctionRegistry, NoParameters};

const BAR_CHAR: &str = "▎";

#[derive(Deserialize, JsonSchema)]
struct Operands {
    a: f64,
    b: f64,
}

struct Add;

impl Function for Add {
    type Input = Operands;
    type Output = f64;

    fn name(&self) -> &str {
        "add"
    }

    fn doc(&self) -> &str {
        "Adds two numbers.\n\n\
         Args:\n    a: the first summand\n    b: the second summand"
    }

    fn call(&self, input: Operands) -> f64 {
        input.a + input.b
    }
}

struct Multiply;

impl Function for Multiply {
    type Input = Operands;
    type Output = f64;

    fn name(&self) -> &str {
        "multiply"
    }

    fn doc(&self) -> &str {
        "Multiplies two numbers.\n\n\
         Args:\n    a: the multiplicand\n    b: the multiplier"
    }

    fn call(&self, input: Operands) -> f64 {
        input.a * input.b
    }
}

struct CurrentTime;

impl Function for CurrentTime {
    type Input = NoParameters;
    type Output = u64;

    fn name(&self) -> &str {
        "current_time"
    }

    fn doc(&self) -> &str {
        "Returns the current time as seconds since the Unix epoch."
    }

    fn call(&self, _input: NoParameters) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Ok(api_key) = env::var("OPENAI_API_KEY") else {
        eprintln!("OPENAI_API_KEY environment variable is not set");
        return;
    };
    let mut config = OpenAIConfigBuilder::with_api_key(api_key);
    if let Ok(base_url) = env::var("OPENAI_BASE_URL") {
        config = config.with_base_url(base_url);
    }
    if let Ok(model) = env::var("OPENAI_MODEL") {
        config = config.with_model(model);
    }
    let model_provider = OpenAIProvider::new(config.build());

    let registry = FunctionRegistry::builder()
        .with_function(Add)
        .with_function(Multiply)
        .with_function(CurrentTime)
        .build();
    let mut caller = match registry.and_then(|registry| {
        FunctionCallerBuilder::with_model_provider(model_provider)
            .with_registry(registry)
            .with_temperature(0.2)
            .build()
    }) {
        Ok(caller) => caller,
        Err(err) => {
            eprintln!("failed to set up the function caller: {err}");
            return;
        }
    };

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .expect("spinner template is valid")
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line().await else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("🤔 Thinking...");

        let mut dispatch_fut = pin!(caller.get_function(question, None));
        let dispatch = loop {
            select! {
                dispatch = &mut dispatch_fut => break dispatch,
                _ = sleep(Duration::from_millis(100)) => progress_bar.inc(1),
            }
        };

        // Finish the progress bar before printing anything else.
        progress_bar.finish_and_clear();

        let Some(dispatch) = dispatch else {
            println!(
                "{}🤷 {}",
                BAR_CHAR.bright_yellow(),
                "No function fits the question.".bright_white()
            );
            continue;
        };

        let parameters = serde_json::Value::Object(dispatch.parameters.clone());
        println!(
            "{}🔧 {}({})",
            BAR_CHAR.bright_cyan(),
            dispatch.function.name().bright_white().bold(),
            parameters
        );
        match dispatch.invoke() {
            Ok(result) => println!(
                "{}🤖 {}",
                BAR_CHAR.bright_cyan(),
                result.bright_white()
            ),
            Err(err) => println!("{}⚠️  {}", BAR_CHAR.bright_red(), err),
        }
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
