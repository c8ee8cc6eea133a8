use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quiz_core::{
    FlowError, FlowEvent, FlowInput, FlowPhase, HttpScoringService, QuestionFlowController,
    ResultView, ScoringService,
};
use shared::domain::ResultId;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines},
    sync::broadcast::{self, error::RecvError},
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, Settings};
use render::{render_event, render_result};

#[derive(Parser, Debug)]
#[command(about = "Take the aptitude quiz or view a stored result")]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer the questionnaire interactively (default).
    Take,
    /// Render a stored result.
    Show {
        #[arg(long)]
        id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliInput {
    Flow(FlowInput),
    Quit,
}

fn parse_input(line: &str) -> CliInput {
    let trimmed = line.trim().to_ascii_lowercase();
    match trimmed.as_str() {
        "q" | "quit" | "exit" => CliInput::Quit,
        "n" | "next" => CliInput::Flow(FlowInput::Next),
        "p" | "prev" | "back" => CliInput::Flow(FlowInput::Prev),
        "s" | "submit" => CliInput::Flow(FlowInput::Submit),
        other => match other.parse::<u8>() {
            Ok(value) => CliInput::Flow(FlowInput::Answer(value)),
            Err(_) => CliInput::Flow(FlowInput::Activity),
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let service = Arc::new(
        HttpScoringService::with_timeout(&settings.server_url, settings.request_timeout())
            .context("failed to configure scoring service client")?,
    );

    match args.command.unwrap_or(Command::Take) {
        Command::Take => run_quiz(service, &settings).await,
        Command::Show { id } => show_result(service.as_ref(), &ResultId::new(id), &settings).await,
    }
}

async fn run_quiz(service: Arc<HttpScoringService>, settings: &Settings) -> Result<()> {
    let controller = QuestionFlowController::new(service.clone(), settings.flow_options());
    let mut events = controller.subscribe_events();

    if let Err(err) = controller.load().await {
        while let Ok(event) = events.try_recv() {
            print_event(&event);
        }
        return Err(err).context("quiz could not start");
    }
    println!("Answer with 1-5, [n] next, [p] back, [s] submit, [q] quit.");

    let lines = BufReader::new(tokio::io::stdin()).lines();
    let completed = drive_quiz(&controller, events, lines).await?;

    controller.shutdown().await;

    match completed {
        Some(result_id) => {
            info!(result_id = %result_id, "quiz completed");
            show_result(service.as_ref(), &result_id, settings).await
        }
        None => {
            println!("Quiz ended without submitting.");
            Ok(())
        }
    }
}

/// Feeds input lines to the controller and prints its events until the quiz
/// completes or the player leaves. Closing the input while a submission is in
/// flight keeps draining events until that submission settles.
async fn drive_quiz<R>(
    controller: &Arc<QuestionFlowController>,
    mut events: broadcast::Receiver<FlowEvent>,
    mut lines: Lines<R>,
) -> Result<Option<ResultId>>
where
    R: AsyncBufRead + Unpin,
{
    let mut input_open = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(FlowEvent::Completed(link)) => {
                    print_event(&FlowEvent::Completed(link.clone()));
                    return Ok(Some(link.result_id));
                }
                Ok(event) => {
                    print_event(&event);
                    if !input_open && matches!(event, FlowEvent::Notice(_)) {
                        return Ok(None);
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "dropped flow events"),
                Err(RecvError::Closed) => return Ok(None),
            },
            line = lines.next_line(), if input_open => {
                let input = line.context("failed to read input")?.map(|line| parse_input(&line));
                match input {
                    Some(CliInput::Flow(input)) => match controller.dispatch(input).await {
                        Ok(_) => {}
                        Err(FlowError::InvalidAnswer(value)) => {
                            println!("{value} is not an option; answer with a number from 1 to 5.");
                        }
                        Err(err) => debug!(error = %err, ?input, "input not applied"),
                    },
                    None | Some(CliInput::Quit) => {
                        if controller.snapshot().await.phase != FlowPhase::Submitting {
                            return Ok(None);
                        }
                        info!("input closed; waiting for the pending submission");
                        input_open = false;
                    }
                }
            }
        }
    }
}

async fn show_result(
    service: &dyn ScoringService,
    result_id: &ResultId,
    settings: &Settings,
) -> Result<()> {
    let payload = match service.fetch_result(result_id).await {
        Ok(payload) => payload,
        Err(err) if err.is_not_found() => {
            anyhow::bail!("no stored result with id '{result_id}'");
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to load result '{result_id}'"));
        }
    };

    let view = ResultView::build(&payload, &settings.share_origin);
    println!("{}", render_result(&view));
    Ok(())
}

fn print_event(event: &FlowEvent) {
    if let Some(text) = render_event(event) {
        println!("{text}");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use quiz_core::{FlowOptions, ServiceError};
    use shared::{
        domain::{Likert, Question},
        protocol::ResultPayload,
    };
    use tokio::{io::AsyncWriteExt, sync::Mutex};

    use super::*;

    struct SlowScoringService {
        submit_delay: Duration,
        submissions: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl ScoringService for SlowScoringService {
        async fn fetch_questions(&self) -> Result<Vec<Question>, ServiceError> {
            Ok(vec![Question::new(Some(1), "I like solving puzzles")])
        }

        async fn submit_answers(&self, answers: &[Likert]) -> Result<ResultId, ServiceError> {
            tokio::time::sleep(self.submit_delay).await;
            self.submissions
                .lock()
                .await
                .push(answers.iter().map(|a| a.value()).collect());
            Ok(ResultId::new("r1"))
        }

        async fn fetch_result(&self, id: &ResultId) -> Result<ResultPayload, ServiceError> {
            Err(ServiceError::Decode(format!("no result {id}")))
        }
    }

    async fn started(
        submit_delay: Duration,
    ) -> (Arc<SlowScoringService>, Arc<QuestionFlowController>) {
        let service = Arc::new(SlowScoringService {
            submit_delay,
            submissions: Mutex::new(Vec::new()),
        });
        let controller = QuestionFlowController::new(service.clone(), FlowOptions::default());
        controller.load().await.expect("load");
        (service, controller)
    }

    #[tokio::test(start_paused = true)]
    async fn closing_input_waits_for_in_flight_submission() {
        let (service, controller) = started(Duration::from_secs(1)).await;
        let events = controller.subscribe_events();
        let (mut writer, reader) = tokio::io::duplex(64);

        let feed = async move {
            writer.write_all(b"3\n").await.expect("write");
            // past the auto-advance delay, so the submission is running
            tokio::time::sleep(Duration::from_millis(450)).await;
            drop(writer);
        };
        let (outcome, ()) = tokio::join!(
            drive_quiz(&controller, events, BufReader::new(reader).lines()),
            feed
        );

        assert_eq!(outcome.expect("drive"), Some(ResultId::new("r1")));
        assert_eq!(service.submissions.lock().await.as_slice(), &[vec![3]]);
    }

    #[tokio::test(start_paused = true)]
    async fn closing_input_before_submission_ends_the_quiz() {
        let (service, controller) = started(Duration::from_secs(1)).await;
        let events = controller.subscribe_events();
        let lines = BufReader::new(&b"q\n"[..]).lines();

        let outcome = drive_quiz(&controller, events, lines).await.expect("drive");
        assert_eq!(outcome, None);
        controller.shutdown().await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(service.submissions.lock().await.is_empty());
    }

    #[test]
    fn input_lines_map_to_flow_inputs() {
        assert_eq!(parse_input(" 3 "), CliInput::Flow(FlowInput::Answer(3)));
        assert_eq!(parse_input("9"), CliInput::Flow(FlowInput::Answer(9)));
        assert_eq!(parse_input("N"), CliInput::Flow(FlowInput::Next));
        assert_eq!(parse_input("back"), CliInput::Flow(FlowInput::Prev));
        assert_eq!(parse_input("submit"), CliInput::Flow(FlowInput::Submit));
        assert_eq!(parse_input("q"), CliInput::Quit);
        assert_eq!(parse_input("hello"), CliInput::Flow(FlowInput::Activity));
    }

    #[test]
    fn show_is_parsed_with_id() {
        let args = Args::parse_from(["quiz_cli", "--server-url", "http://x", "show", "--id", "r1"]);
        assert_eq!(args.server_url.as_deref(), Some("http://x"));
        assert!(matches!(args.command, Some(Command::Show { id }) if id == "r1"));
    }
}
