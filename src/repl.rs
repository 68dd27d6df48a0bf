//! Interactive console and one-shot mode.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use console::{Term, style};
use tokio::io::{AsyncBufReadExt, BufReader};

use chat_relay::Error;
use chat_relay::chat::{Attachment, Message, MessageRole, catalog};
use chat_relay::config::AppInfo;
use chat_relay::session::{ChatSession, Outcome};

const HELP: &str = "\
Type a message and press Enter to send it.

  /attach <path>...  stage files for the next message
  /detach <n>        remove staged file number n
  /files             list staged files
  /suggestions       list suggested prompts
  /suggest <n>       send suggested prompt number n
  /history           show recent conversations
  /new               start a new chat
  /help              show this help
  /quit              exit";

/// A parsed console line.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Send(&'a str),
    Attach(Vec<&'a str>),
    Detach(Option<usize>),
    Files,
    Suggestions,
    Suggest(Option<usize>),
    History,
    New,
    Help,
    Quit,
    Unknown(&'a str),
    Empty,
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Send(line);
        };

        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default();
        match name {
            "attach" => Self::Attach(words.collect()),
            "detach" => Self::Detach(words.next().and_then(|n| n.parse().ok())),
            "files" => Self::Files,
            "suggestions" => Self::Suggestions,
            "suggest" => Self::Suggest(words.next().and_then(|n| n.parse().ok())),
            "history" => Self::History,
            "new" => Self::New,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(name),
        }
    }
}

/// Send one prompt with the given files and print the reply.
pub async fn run_once(
    session: &ChatSession,
    prompt: &str,
    files: &[PathBuf],
) -> anyhow::Result<ExitCode> {
    if !files.is_empty() {
        let mut attachments = Vec::with_capacity(files.len());
        for path in files {
            attachments.push(Attachment::from_path(path).await?);
        }
        session.stage_attachments(attachments)?;
    }

    match session.submit(prompt).await? {
        Outcome::Replied(reply) => {
            println!("{reply}");
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Failed(detail) => {
            eprintln!("{}", style(format!("error: {detail}")).red());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Run the interactive console until EOF or `/quit`.
pub async fn run(session: &ChatSession, app: &AppInfo) -> anyhow::Result<ExitCode> {
    // Indicator goes to stderr so piped transcripts stay clean.
    let term = Term::stderr();

    println!(
        "{} {}",
        style("Chat Relay").bold(),
        style(format!("{} · v{}", app.environment, app.version)).dim()
    );
    println!("{}", style(format!("endpoint: {}", session.endpoint())).dim());
    println!("{}", style("Type /help for commands.").dim());
    println!();
    print_transcript(session);
    print_suggestions();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Empty => {}
            Command::Send(text) => {
                session.set_input(text);
                let result = with_typing_indicator(&term, session.submit_input()).await?;
                report(session, result);
            }
            Command::Attach(paths) => attach(session, &paths).await,
            Command::Detach(Some(n)) if n > 0 => match session.remove_attachment(n - 1) {
                Some(file) => println!("Removed {}", file.name()),
                None => println!("No staged file #{n}"),
            },
            Command::Detach(_) => println!("Usage: /detach <n>"),
            Command::Files => print_files(session),
            Command::Suggestions => print_suggestions(),
            Command::Suggest(n) => {
                let Some(text) = n
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| catalog::suggestions().get(i))
                else {
                    println!("Usage: /suggest <n> (see /suggestions)");
                    continue;
                };
                print_message(&Message::user(*text));
                let result = with_typing_indicator(&term, session.select_suggestion(text)).await?;
                report(session, result);
            }
            Command::History => print_history(),
            Command::New => {
                session.reset();
                println!("{}", style("Started a new chat.").dim());
                print_transcript(session);
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
            Command::Unknown(name) => println!("Unknown command /{name}. Type /help for commands."),
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Show a typing line while `fut` runs, then erase it. Skipped when `term`
/// is not an interactive terminal.
async fn with_typing_indicator<F, T>(term: &Term, fut: F) -> std::io::Result<T>
where
    F: std::future::Future<Output = T>,
{
    if !term.is_term() {
        return Ok(fut.await);
    }
    term.write_line(&style("assistant is typing...").dim().italic().to_string())?;
    let out = fut.await;
    term.clear_last_lines(1)?;
    Ok(out)
}

fn report(session: &ChatSession, result: chat_relay::Result<Outcome>) {
    match result {
        Ok(_) => {
            if let Some(message) = session.last_message() {
                print_message(&message);
            }
            if let Some(error) = session.error() {
                eprintln!("{}", style(format!("error: {error}")).red());
            }
        }
        Err(Error::InFlight) => println!("Still waiting on the previous message."),
        Err(err) => println!("{}", style(err).yellow()),
    }
}

async fn attach(session: &ChatSession, paths: &[&str]) {
    if paths.is_empty() {
        println!("Usage: /attach <path>...");
        return;
    }

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match Attachment::from_path(Path::new(path)).await {
            Ok(file) => files.push(file),
            Err(err) => eprintln!("{}", style(err).red()),
        }
    }

    match session.stage_attachments(files) {
        Ok(0) => {}
        Ok(added) => println!(
            "Staged {added} file(s); {} ready to send.",
            session.attachments().len()
        ),
        Err(err) => println!("{}", style(err).yellow()),
    }
}

fn print_message(message: &Message) {
    let label = match message.role {
        MessageRole::User => style("you").cyan().bold(),
        MessageRole::Assistant => style("assistant").green().bold(),
    };
    println!("{label}: {}", message.content);
}

fn print_transcript(session: &ChatSession) {
    for message in session.messages() {
        print_message(&message);
    }
}

fn print_files(session: &ChatSession) {
    let staged = session.attachments();
    if staged.is_empty() {
        println!("No files staged.");
        return;
    }
    for (i, file) in staged.iter().enumerate() {
        println!(
            "  {}. {} ({} bytes, {})",
            i + 1,
            file.name(),
            file.size(),
            file.content_type()
        );
    }
    println!("  total: {} bytes", staged.total_size());
}

fn print_suggestions() {
    println!("{}", style("Try one of these (/suggest <n>):").dim());
    for (i, text) in catalog::suggestions().iter().enumerate() {
        println!("  {}. {text}", i + 1);
    }
}

fn print_history() {
    for entry in catalog::history() {
        println!(
            "{} {} {}",
            style(entry.title).bold(),
            style(format!("[{}]", entry.channel)).dim(),
            style(entry.updated).dim()
        );
        println!("    {}", entry.summary);
    }
}
