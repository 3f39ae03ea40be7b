use std::io::Write;
use std::path::Path;

use aac_translator::{
    Config, Gemini, RenderedOutput, TranslationMode, TranslationSession, data, logging,
};
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(
    name = "aac-translator",
    version,
    about = "Translate, simplify or convert text into AAC keywords"
)]
struct Cli {
    /// API key (overrides GEMINI_API_KEY / GOOGLE_API_KEY)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Gemini model name
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// Initial target language code
    #[arg(short = 'l', long = "target-lang")]
    target_lang: Option<String>,

    /// Initial mode (normal, easy-read, aac)
    #[arg(long = "mode", default_value = "normal")]
    mode: String,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let mode = TranslationMode::parse(&cli.mode)
        .ok_or_else(|| anyhow!("unknown mode '{}' (expected normal, easy-read, aac)", cli.mode))?;
    let session = aac_translator::build_session(&Config {
        key: cli.key,
        model: cli.model,
        target_lang: cli.target_lang,
    })?;
    session.set_mode(mode);

    println!("Type text to set the input, /go to run it. /help lists commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.starts_with('/') {
            match handle_command(input, &session).await {
                Ok(true) => break,
                Ok(false) => {}
                Err(err) => eprintln!("{:#}", err),
            }
            continue;
        }
        session.set_input_text(input);
        print_status(&session);
    }
    Ok(())
}

async fn handle_command(input: &str, session: &TranslationSession<Gemini>) -> Result<bool> {
    let (command, arg) = match input.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (input, ""),
    };
    match command {
        "/quit" | "/exit" => return Ok(true),
        "/help" => print_help(),
        "/state" => print_status(session),
        "/langs" => {
            for language in session.source_options() {
                println!("{}\t{}", language.code, language.name);
            }
        }
        "/mode" => {
            let mode = TranslationMode::parse(arg)
                .ok_or_else(|| anyhow!("expected normal, easy-read or aac"))?;
            session.set_mode(mode);
            print_status(session);
        }
        "/source" => {
            session.set_source_lang(arg)?;
            print_status(session);
        }
        "/target" => {
            session.set_target_lang(arg)?;
            print_status(session);
        }
        "/level" => {
            let level = arg
                .parse::<u8>()
                .with_context(|| format!("invalid level '{}'", arg))?;
            session.set_easy_read_level(level);
            print_status(session);
        }
        "/swap" => {
            if !session.swap_languages() {
                println!("swap needs normal mode and a concrete source language");
            }
            print_status(session);
        }
        "/image" => {
            let path = Path::new(arg);
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read image: {}", path.display()))?;
            let mime = path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(data::mime_from_extension)
                .unwrap_or("auto");
            session.upload_image(bytes, mime).await;
            print_status(session);
        }
        "/go" => {
            session.generate().await;
            print_output(session);
        }
        _ => return Err(anyhow!("unknown command: {}", command)),
    }
    Ok(false)
}

fn print_status(session: &TranslationSession<Gemini>) {
    let state = session.snapshot();
    let catalog = session.catalog();
    let mut line = format!(
        "[{}] {} -> {}",
        state.mode.as_str(),
        catalog.display_name(&state.source_lang),
        catalog.display_name(&state.target_lang)
    );
    if state.mode == TranslationMode::EasyRead {
        line.push_str(&format!(" (level {})", state.easy_read_level));
    }
    if state.is_detecting_language {
        line.push_str(" detecting...");
    }
    println!("{}", line);
    if let Some(error) = state.error.as_deref() {
        eprintln!("error: {}", error);
    }
}

fn print_output(session: &TranslationSession<Gemini>) {
    match session.rendered_output() {
        RenderedOutput::Empty => print_status(session),
        RenderedOutput::Text(text) => println!("{}", text),
        RenderedOutput::Keywords(keywords) => {
            let chips = keywords
                .iter()
                .map(|keyword| format!("[{}]", keyword))
                .collect::<Vec<_>>();
            println!("{}", chips.join(" "));
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  <text>                 Set the input text");
    println!("  /go                    Translate, simplify or convert the input");
    println!("  /mode <mode>           normal, easy-read or aac");
    println!("  /source <code|auto>    Set the source language");
    println!("  /target <code>         Set the target language");
    println!("  /level <1-15>          Easy Read simplicity level");
    println!("  /swap                  Swap source and target languages");
    println!("  /image <path>          Extract text from a png/jpeg/webp image");
    println!("  /langs                 List languages");
    println!("  /state                 Show the current state");
    println!("  /quit, /exit           Exit");
}
