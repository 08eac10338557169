use async_trait::async_trait;
use nanogen::{
    credentials::{CredentialHost, KeyStore},
    logger::{self, LogLevel, LoggerConfig},
    shell::{self, Reaction},
    studio::{BatchResult, Studio},
    ImageClient, StudioConfig, StudioError,
};
use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;
use tokio_stream::{wrappers::LinesStream, StreamExt};

type InputLines = Arc<Mutex<LinesStream<BufReader<Stdin>>>>;
type InFlight = Pin<Box<dyn Future<Output = BatchResult>>>;

/// Key picker that reads the key from the same stdin the shell uses.
struct TerminalKeyPicker {
    store: KeyStore,
    input: InputLines,
}

#[async_trait]
impl CredentialHost for TerminalKeyPicker {
    async fn has_selected_credential(&self) -> bool {
        self.store.get().is_some()
    }

    async fn prompt_select_credential(&self) -> nanogen::Result<()> {
        print!("Paste a Gemini API key (empty keeps the current one): ");
        let _ = std::io::stdout().flush();

        let line = self.input.lock().await.next().await;
        match line {
            Some(Ok(key)) if !key.trim().is_empty() => {
                self.store.set_key(key);
                log::info!("🔑 API key updated");
                Ok(())
            }
            Some(Ok(_)) if self.store.get().is_some() => Ok(()),
            Some(Ok(_)) => Err(StudioError::CredentialError("no key entered".into())),
            Some(Err(e)) => Err(e.into()),
            None => Err(StudioError::CredentialError("input closed".into())),
        }
    }

    fn api_key(&self) -> Option<String> {
        self.store.get()
    }
}

async fn next_line(input: &InputLines) -> Option<String> {
    match input.lock().await.next().await {
        Some(Ok(line)) => Some(line),
        Some(Err(e)) => {
            log::error!("Failed to read input: {}", e);
            None
        }
        None => None,
    }
}

async fn settle(in_flight: &mut Option<InFlight>) -> BatchResult {
    match in_flight.as_mut() {
        Some(batch) => batch.await,
        None => std::future::pending().await,
    }
}

fn show(text: &str) {
    if !text.is_empty() {
        println!("{}\n", text);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let config = StudioConfig::from_env();
    let level = config
        .log_level
        .as_deref()
        .map(str::parse::<LogLevel>)
        .transpose()?
        .unwrap_or(LogLevel::Warn);
    let mut logger_config = LoggerConfig::default().with_level(level);
    if let Some(path) = config.log_file.as_deref() {
        logger_config = logger_config.with_file_output(path);
    }
    logger::init_with_config(logger_config)?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded");
    } else {
        log::debug!("No .env file found, using process environment");
    }

    let input: InputLines = Arc::new(Mutex::new(LinesStream::new(
        BufReader::new(io::stdin()).lines(),
    )));
    let store = match config.gemini.api_key.as_deref() {
        Some(key) => KeyStore::with_key(key),
        None => KeyStore::new(),
    };
    let host = Arc::new(TerminalKeyPicker {
        store,
        input: Arc::clone(&input),
    });
    let client = Arc::new(ImageClient::new(&config.gemini, host.clone()));

    let mut studio = Studio::new(client, host, config.settings.clone());
    studio.init().await;

    show(&shell::render_sidebar(studio.state()));
    show(&shell::render_feed(studio.state()));
    show("Type /help for commands.");

    let mut in_flight: Option<InFlight> = None;

    loop {
        tokio::select! {
            result = settle(&mut in_flight) => {
                in_flight = None;
                let outcome = studio.finish_submit(result).await;
                show(&shell::render_outcome(&outcome, studio.state()));
            }
            line = next_line(&input) => {
                let Some(line) = line else { break };
                let command = match shell::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(message) => {
                        show(&message);
                        continue;
                    }
                };
                match shell::dispatch(&mut studio, command, &config.download_dir).await {
                    Reaction::Show(text) => show(&text),
                    Reaction::Dispatched(batch) => {
                        show(&shell::render_status(studio.state()));
                        in_flight = Some(Box::pin(batch.run(studio.generator())));
                    }
                    Reaction::Quit => break,
                }
            }
        }
    }

    if let Some(batch) = in_flight.take() {
        log::info!("Waiting for the running batch before exit");
        let outcome = studio.finish_submit(batch.await).await;
        show(&shell::render_outcome(&outcome, studio.state()));
    }

    Ok(())
}
