//! FairMeta CLI - Command-line interface for repository metadata extraction

use clap::{Args, Parser, Subcommand, ValueEnum};
use fairmeta::{
    interpret_reply, response_from_reply, AnalysisData, AnalysisResponse, AnalyzeRequest, Tool,
    ToolBuilder, TOOL_LLMTXT,
};
use serde_json::Value;
use std::io::{self, Read, Write};
use tracing_subscriber::EnvFilter;

/// Output format for analyze subcommand
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Markdown with YAML frontmatter
    #[default]
    Md,
    /// JSON format
    Json,
}

/// FairMeta - research software metadata extraction
#[derive(Parser, Debug)]
#[command(name = "fairmeta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Print full help with examples (llmtxt)
    #[arg(long)]
    llmtxt: bool,
}

/// Credentials and endpoints shared by network subcommands
#[derive(Args, Debug)]
struct ConnectionArgs {
    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// GitLab token
    #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true)]
    gitlab_token: Option<String>,

    /// Inference endpoint URL
    #[arg(long, env = "LLM_API_URL")]
    llm_url: Option<String>,

    /// Model name
    #[arg(long, env = "LLM_MODEL_NAME")]
    model: Option<String>,

    /// Custom User-Agent
    #[arg(long)]
    user_agent: Option<String>,

    /// GitHub API base URL
    #[arg(long)]
    github_api_base: Option<String>,
}

impl ConnectionArgs {
    fn into_tool(self) -> Tool {
        let mut builder = ToolBuilder::new();
        if let Some(token) = self.github_token {
            builder = builder.github_token(token);
        }
        if let Some(token) = self.gitlab_token {
            builder = builder.gitlab_token(token);
        }
        if let Some(url) = self.llm_url {
            builder = builder.llm_endpoint(url);
        }
        if let Some(model) = self.model {
            builder = builder.llm_model(model);
        }
        if let Some(ua) = self.user_agent {
            builder = builder.user_agent(ua);
        }
        if let Some(base) = self.github_api_base {
            builder = builder.github_api_base(base);
        }
        builder.build()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a repository and print its metadata
    Analyze {
        /// GitHub or GitLab repository URL
        url: String,

        /// Output format
        #[arg(long, short, default_value = "md")]
        output: OutputFormat,

        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Print the text that would be sent to the model
    Collect {
        /// GitHub or GitLab repository URL
        url: String,

        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Repair and normalize a raw model reply (from FILE or stdin)
    Repair {
        /// File holding the reply; stdin when omitted
        file: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    // Handle --llmtxt flag
    if cli.llmtxt {
        writeln_safe(TOOL_LLMTXT);
        std::process::exit(0);
    }

    match cli.command {
        Some(Commands::Analyze {
            url,
            output,
            connection,
        }) => {
            run_analyze(&url, output, connection.into_tool()).await;
        }
        Some(Commands::Collect { url, connection }) => {
            run_collect(&url, connection.into_tool()).await;
        }
        Some(Commands::Repair { file }) => {
            run_repair(file.as_deref());
        }
        None => {
            eprintln!("Usage: fairmeta analyze <URL>");
            eprintln!("   or: fairmeta collect <URL>");
            eprintln!("   or: fairmeta repair [FILE]");
            eprintln!("   or: fairmeta --help");
            std::process::exit(1);
        }
    }
}

/// Log to stderr, filtered by RUST_LOG (default: warn)
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run_analyze(url: &str, output: OutputFormat, tool: Tool) {
    match tool.execute(AnalyzeRequest::new(url)).await {
        Ok(response) => match output {
            OutputFormat::Md => writeln_safe(&format_md_report(&response, url)),
            OutputFormat::Json => print_json(&response),
        },
        Err(e) => fail(e),
    }
}

async fn run_collect(url: &str, tool: Tool) {
    match fairmeta::collect(url, tool.options()).await {
        Ok(content) => writeln_safe(&content.text()),
        Err(e) => fail(e),
    }
}

fn run_repair(file: Option<&str>) {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).map(|_| buf)
        }
    };
    let raw = raw.unwrap_or_else(|e| fail(e));

    let response = response_from_reply(&interpret_reply(&raw));
    print_json(&response);
}

fn print_json(response: &AnalysisResponse) {
    let json = serde_json::to_string_pretty(response).unwrap_or_else(|e| {
        eprintln!("Error serializing response: {}", e);
        std::process::exit(1);
    });
    writeln_safe(&json);
}

fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", e);
    std::process::exit(1);
}

/// Format response as markdown with YAML frontmatter
fn format_md_report(response: &AnalysisResponse, url: &str) -> String {
    let mut output = String::new();

    output.push_str("---\n");
    output.push_str(&format!("url: {}\n", url));
    output.push_str(&format!("success: {}\n", response.success));
    output.push_str("---\n");

    match &response.data {
        AnalysisData::Metadata(record) => {
            let sections: Vec<String> = record
                .as_map()
                .iter()
                .map(|(field, value)| format!("## {}\n\n{}", field, format_md_value(value)))
                .collect();
            output.push_str(&sections.join("\n\n"));
        }
        AnalysisData::ParsingError(data) => {
            output.push_str(&data.message);
            output.push_str("\n\n```\n");
            output.push_str(&data.raw_response);
            output.push_str("\n```");
        }
    }

    output
}

fn format_md_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => format!("- {}", text),
                other => format!("- {}", other),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}
